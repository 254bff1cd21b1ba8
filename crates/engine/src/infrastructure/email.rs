//! Email adapter that writes messages to the log instead of delivering them.

use async_trait::async_trait;

use crate::infrastructure::ports::{EmailError, EmailMessage, EmailPort};

pub const DEFAULT_EMAIL_FROM: &str = "turns@playbymail.local";

#[derive(Debug, Clone)]
pub struct LogEmailSender {
    from: String,
}

impl LogEmailSender {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

impl Default for LogEmailSender {
    fn default() -> Self {
        Self::new(DEFAULT_EMAIL_FROM)
    }
}

#[async_trait]
impl EmailPort for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        if !message.to.contains('@') {
            return Err(EmailError::InvalidRecipient(message.to.clone()));
        }
        tracing::info!(
            from = %self.from,
            to = %message.to,
            subject = %message.subject,
            body_len = message.body.len(),
            "Email queued for delivery"
        );
        tracing::debug!(body = %message.body, "Email body");
        Ok(())
    }
}
