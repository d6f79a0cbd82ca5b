use checkout_common::Cents;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PaymentProviderError {
    #[error("Could not reach the payment provider: {0}")]
    Transport(String),
    #[error("The payment provider rejected the request: {0}")]
    Rejected(String),
    #[error("Unexpected response from the payment provider: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentMetadata {
    pub session_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentRequest {
    pub amount: Cents,
    pub currency: String,
    /// Withheld by the platform when funds are transferred to the destination account
    pub application_fee: Cents,
    pub destination_account_id: String,
    pub metadata: IntentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

/// The narrow slice of a payment provider the engine needs: create a charge authorisation whose confirmation will
/// later arrive via webhook carrying `metadata`.
#[allow(async_fn_in_trait)]
pub trait PaymentProvider: Clone {
    async fn create_payment_intent(&self, request: PaymentIntentRequest)
        -> Result<PaymentIntent, PaymentProviderError>;
}
