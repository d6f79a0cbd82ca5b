//! Stripe adapter.
//!
//! Only the two touch points the checkout needs are covered: creating a payment intent with a destination charge, and
//! reading the confirmation events that Stripe posts to the webhook.
use std::{collections::HashMap, sync::Arc};

use checkout_common::Secret;
use checkout_engine::{
    reconcile_objects::{ConfirmationEvent, EventKind},
    traits::{PaymentIntent, PaymentIntentRequest, PaymentProvider, PaymentProviderError},
};
use log::*;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::StripeConfig;

/// The only Stripe event type that materialises orders.
pub const PAYMENT_SUCCEEDED_EVENT: &str = "payment_intent.succeeded";

#[derive(Clone)]
pub struct StripeClient {
    api_url: String,
    secret_key: Secret<String>,
    client: Arc<Client>,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentProviderError> {
        let client = Client::builder().build().map_err(|e| PaymentProviderError::Transport(e.to_string()))?;
        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            client: Arc::new(client),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }
}

/// Form parameters for `POST /v1/payment_intents`. Stripe expects nested fields in bracket notation.
pub fn intent_form_params(request: &PaymentIntentRequest) -> Vec<(String, String)> {
    vec![
        ("amount".into(), request.amount.value().to_string()),
        ("currency".into(), request.currency.clone()),
        ("application_fee_amount".into(), request.application_fee.value().to_string()),
        ("transfer_data[destination]".into(), request.destination_account_id.clone()),
        ("automatic_payment_methods[enabled]".into(), "true".into()),
        ("metadata[sessionId]".into(), request.metadata.session_id.clone()),
        ("metadata[userId]".into(), request.metadata.user_id.clone()),
    ]
}

#[derive(Debug, Deserialize)]
struct StripePaymentIntent {
    id: String,
    client_secret: Option<String>,
}

impl PaymentProvider for StripeClient {
    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentProviderError> {
        let url = self.url("/v1/payment_intents");
        trace!("💳️ Creating payment intent for session {}", request.metadata.session_id);
        let response = self
            .client
            .post(url)
            .basic_auth(self.secret_key.reveal(), Some(""))
            .form(&intent_form_params(&request))
            .send()
            .await
            .map_err(|e| PaymentProviderError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            let intent = response
                .json::<StripePaymentIntent>()
                .await
                .map_err(|e| PaymentProviderError::InvalidResponse(e.to_string()))?;
            let client_secret = intent.client_secret.ok_or_else(|| {
                PaymentProviderError::InvalidResponse(format!("Payment intent {} has no client secret", intent.id))
            })?;
            Ok(PaymentIntent { id: intent.id, client_secret })
        } else {
            let body = response.text().await.map_err(|e| PaymentProviderError::Transport(e.to_string()))?;
            let message = stripe_error_message(&body);
            warn!("💳️ Stripe responded with {status} when creating a payment intent. {message}");
            if status.is_client_error() {
                Err(PaymentProviderError::Rejected(message))
            } else {
                Err(PaymentProviderError::Transport(format!("{status}: {message}")))
            }
        }
    }
}

fn stripe_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}

//--------------------------------------      Webhook events      ------------------------------------------------------
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

impl From<StripeEvent> for ConfirmationEvent {
    fn from(event: StripeEvent) -> Self {
        let kind = match event.event_type.as_str() {
            PAYMENT_SUCCEEDED_EVENT => EventKind::ChargeSucceeded,
            other => EventKind::Other(other.to_string()),
        };
        let object = &event.data.object;
        let payment_reference = object["id"].as_str().map(String::from);
        let metadata = object["metadata"]
            .as_object()
            .map(|m| m.iter().filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string()))).collect())
            .unwrap_or_else(HashMap::new);
        ConfirmationEvent { event_id: event.id, kind, payment_reference, metadata }
    }
}
