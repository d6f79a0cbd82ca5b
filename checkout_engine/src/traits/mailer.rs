use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum MailerError {
    #[error("Could not send email: {0}")]
    SendFailed(String),
}

/// Sends a templated email. Rendering the template is the mail service's job; the engine only supplies the template
/// name and a bag of values.
#[allow(async_fn_in_trait)]
pub trait Mailer: Clone {
    async fn send(&self, template: &str, to: &str, data: serde_json::Value) -> Result<(), MailerError>;
}
