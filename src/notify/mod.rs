// src/notify/mod.rs
//! Dispatcher stage: deliver the report through a mail transport.
//!
//! Exactly one attempt per run. Transport failures end up in the
//! [`DeliveryResult`]; retry policy belongs to whoever schedules the run.

pub mod email;
pub mod log;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::TransportError;
use crate::report::Report;

pub use crate::notify::email::SmtpMailTransport;
pub use crate::notify::log::LogMailTransport;

/// `send(recipient, subject, body) -> confirmation or failure`.
/// A confirmation id is returned when the transport provides one.
#[async_trait::async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<Option<String>, TransportError>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub success: bool,
    pub recipient: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryResult {
    pub fn delivered(recipient: &str, confirmation: Option<String>) -> Self {
        Self {
            success: true,
            recipient: recipient.to_string(),
            confirmation,
            error: None,
        }
    }

    pub fn failed(recipient: &str, err: &TransportError) -> Self {
        Self {
            success: false,
            recipient: recipient.to_string(),
            confirmation: None,
            error: Some(err.to_string()),
        }
    }
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("dispatch_attempts_total", "Report delivery attempts.");
        describe_counter!("dispatch_failures_total", "Report deliveries that failed.");
    });
}

/// Short, non-reversible id for a recipient, safe to log.
pub fn recipient_hash(recipient: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(recipient.trim().to_lowercase().as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn MailTransport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    pub async fn deliver(&self, report: &Report, recipient: &str) -> DeliveryResult {
        ensure_metrics_described();
        counter!("dispatch_attempts_total").increment(1);

        let rid = recipient_hash(recipient);
        let subject = report.subject();
        let body = report.to_text();

        match self.transport.send(recipient, &subject, &body).await {
            Ok(confirmation) => {
                tracing::info!(
                    target: "dispatcher",
                    transport = self.transport.name(),
                    recipient = %rid,
                    confirmation = confirmation.as_deref().unwrap_or("-"),
                    "report delivered"
                );
                DeliveryResult::delivered(recipient, confirmation)
            }
            Err(e) => {
                counter!("dispatch_failures_total").increment(1);
                tracing::warn!(
                    target: "dispatcher",
                    transport = self.transport.name(),
                    recipient = %rid,
                    error = %e,
                    "report delivery failed"
                );
                DeliveryResult::failed(recipient, &e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_hash_is_stable_and_case_insensitive() {
        let a = recipient_hash("Pricing@Example.test");
        let b = recipient_hash(" pricing@example.test ");
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
        assert!(!a.contains('@'));
    }

    #[test]
    fn failed_result_carries_error_detail() {
        let r = DeliveryResult::failed("x@y.test", &TransportError::auth("535 bad credentials"));
        assert!(!r.success);
        assert_eq!(r.error.as_deref(), Some("authentication failed: 535 bad credentials"));
        assert_eq!(r.confirmation, None);
    }
}
