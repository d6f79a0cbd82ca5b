use std::fmt::Debug;

use checkout_common::{Cents, DEFAULT_CURRENCY_CODE};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    api::errors::CheckoutError,
    fees::{compute_fees, FeeSchedule},
    traits::{IntentMetadata, PaymentIntentRequest, PaymentProvider},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentCreated {
    pub payment_intent_id: String,
    pub client_secret: String,
    pub application_fee: Cents,
}

/// Creates provider-side charge authorisations with the platform fee split out.
///
/// The gateway never touches the session store. Whoever calls it is responsible for making sure `amount` matches the
/// session being paid for.
pub struct PaymentIntentGateway<P> {
    provider: P,
    fees: FeeSchedule,
    currency: String,
}

impl<P> Debug for PaymentIntentGateway<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentIntentGateway ({}, platform fee {})", self.currency, self.fees.platform_fee_rate)
    }
}

impl<P> PaymentIntentGateway<P> {
    pub fn new(provider: P, fees: FeeSchedule) -> Self {
        Self { provider, fees, currency: DEFAULT_CURRENCY_CODE.to_string() }
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }
}

impl<P> PaymentIntentGateway<P>
where P: PaymentProvider
{
    pub async fn create_intent(
        &self,
        amount: Cents,
        destination_account_id: Option<&str>,
        session_id: Option<&str>,
        user_id: &str,
    ) -> Result<IntentCreated, CheckoutError> {
        if !amount.is_positive() {
            return Err(CheckoutError::Validation(format!("Payment amount must be positive. Got {amount}")));
        }
        let destination = destination_account_id
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| CheckoutError::Validation("A destination account is required".into()))?;
        let session_id = session_id
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| CheckoutError::Validation("A session id is required".into()))?;
        let split = compute_fees(amount, self.fees.platform_fee_rate)
            .map_err(|e| CheckoutError::Validation(e.to_string()))?;
        let request = PaymentIntentRequest {
            amount,
            currency: self.currency.clone(),
            application_fee: split.application_fee,
            destination_account_id: destination.to_string(),
            metadata: IntentMetadata { session_id: session_id.to_string(), user_id: user_id.to_string() },
        };
        let intent = self.provider.create_payment_intent(request).await?;
        info!(
            "💳️ Payment intent {} created for session {session_id}. Amount {amount}, application fee {}",
            intent.id, split.application_fee
        );
        Ok(IntentCreated {
            payment_intent_id: intent.id,
            client_secret: intent.client_secret,
            application_fee: split.application_fee,
        })
    }
}
