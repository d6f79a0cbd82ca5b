use checkout_common::Cents;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentParams {
    pub amount: Cents,
    #[serde(default)]
    pub seller_stripe_account_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

/// The acknowledgement returned to the payment provider for every delivery that should not be retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub received: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orders_created: Option<usize>,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self { received: true, orders_created: None }
    }

    pub fn processed(orders_created: usize) -> Self {
        Self { received: true, orders_created: Some(orders_created) }
    }
}
