// src/notify/log.rs
use chrono::Utc;

use super::{recipient_hash, MailTransport};
use crate::error::TransportError;

/// Dry-run transport: logs the message instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailTransport;

#[async_trait::async_trait]
impl MailTransport for LogMailTransport {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<Option<String>, TransportError> {
        tracing::info!(
            target: "dispatcher",
            recipient = %recipient_hash(recipient),
            subject,
            bytes = body.len(),
            "dry run: report not sent"
        );
        tracing::debug!(target: "dispatcher", "{body}");
        Ok(Some(format!("dry-run-{}", Utc::now().timestamp())))
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
