use std::sync::Arc;

use checkout_engine::traits::{Mailer, MailerError};
use log::*;
use reqwest::Client;
use serde_json::{json, Value};

/// Hands templated emails to an external mail service. Rendering the template is the mail service's job.
///
/// Without a configured endpoint, emails are logged instead of sent.
#[derive(Clone)]
pub struct MailServiceClient {
    endpoint: Option<String>,
    client: Arc<Client>,
}

impl MailServiceClient {
    pub fn new(endpoint: Option<String>) -> Self {
        Self { endpoint, client: Arc::new(Client::new()) }
    }
}

pub fn mail_request_body(template: &str, to: &str, data: Value) -> Value {
    json!({ "template": template, "to": to, "data": data })
}

impl Mailer for MailServiceClient {
    async fn send(&self, template: &str, to: &str, data: Value) -> Result<(), MailerError> {
        let Some(endpoint) = &self.endpoint else {
            info!("📧️ (not sent) {template} email to {to}: {data}");
            return Ok(());
        };
        let response = self
            .client
            .post(endpoint)
            .json(&mail_request_body(template, to, data))
            .send()
            .await
            .map_err(|e| MailerError::SendFailed(e.to_string()))?;
        if response.status().is_success() {
            trace!("📧️ {template} email to {to} accepted by the mail service");
            Ok(())
        } else {
            Err(MailerError::SendFailed(format!("Mail service responded with {}", response.status())))
        }
    }
}
