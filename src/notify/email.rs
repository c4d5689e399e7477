// src/notify/email.rs
use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};
use std::error::Error as _;
use std::time::Duration;

use super::MailTransport;
use crate::config::mail::{parse_mailbox, MailConfig, SmtpSecurity};
use crate::error::{TransportError, TransportErrorKind};

/// SMTP delivery through `lettre`'s async tokio transport.
pub struct SmtpMailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailTransport {
    /// Expects secrets already resolved (see `MailConfig::resolve_secrets`).
    pub fn from_config(cfg: &MailConfig) -> Result<Self> {
        let from = parse_mailbox(&cfg.from)?;

        let builder = match cfg.security {
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
                .with_context(|| format!("invalid SMTP host {}", cfg.host))?,
            SmtpSecurity::Starttls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
                    .with_context(|| format!("invalid SMTP host {}", cfg.host))?
            }
            SmtpSecurity::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&cfg.host),
        };

        let mut builder = builder
            .port(cfg.effective_port())
            .timeout(Some(Duration::from_secs(cfg.timeout_secs)));
        if let (Some(user), Some(pass)) = (&cfg.username, &cfg.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
            from,
        })
    }
}

/// Map an SMTP error onto the transport taxonomy.
fn classify(e: &lettre::transport::smtp::Error) -> TransportError {
    let detail = e.to_string();
    if e.is_timeout() {
        return TransportError::new(TransportErrorKind::Timeout, detail);
    }
    if let Some(code) = e.status() {
        // 530 auth required, 534 mechanism too weak, 535 credentials invalid
        let kind = match code.to_string().as_str() {
            "530" | "534" | "535" => TransportErrorKind::Authentication,
            _ => TransportErrorKind::Rejected,
        };
        return TransportError::new(kind, detail);
    }

    let mut source = e.source();
    while let Some(inner) = source {
        if let Some(io) = inner.downcast_ref::<std::io::Error>() {
            let kind = match io.kind() {
                std::io::ErrorKind::ConnectionRefused => TransportErrorKind::ConnectionRefused,
                std::io::ErrorKind::TimedOut => TransportErrorKind::Timeout,
                _ => TransportErrorKind::Other,
            };
            return TransportError::new(kind, detail);
        }
        source = inner.source();
    }
    TransportError::new(TransportErrorKind::Other, detail)
}

#[async_trait::async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<Option<String>, TransportError> {
        let to = parse_mailbox(recipient)
            .map_err(|e| TransportError::new(TransportErrorKind::InvalidAddress, e.to_string()))?;

        let msg = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| TransportError::new(TransportErrorKind::Other, format!("build email: {e}")))?;

        let resp = self.mailer.send(msg).await.map_err(|e| classify(&e))?;
        let confirmation = resp.message().collect::<Vec<_>>().join(" ");
        Ok(Some(confirmation).filter(|c| !c.is_empty()))
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}
