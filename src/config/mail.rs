// src/config/mail.rs
use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};
use std::env;

use crate::error::ConfigError;

pub const ENV_SMTP_USERNAME: &str = "SMTP_USERNAME";
pub const ENV_SMTP_PASSWORD: &str = "SMTP_PASSWORD";
pub const ENV_REPORT_RECIPIENT: &str = "REPORT_RECIPIENT";

/// Marker meaning "read this value from the environment".
const ENV_MARKER: &str = "ENV";

fn default_transport() -> String {
    "smtp".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Implicit TLS (usually port 465).
    Tls,
    /// STARTTLS upgrade (usually port 587).
    #[default]
    Starttls,
    /// Plain connection, for local relays and test servers only.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailConfig {
    /// "smtp" | "log" (case-insensitive)
    #[serde(default = "default_transport")]
    pub transport: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub security: SmtpSecurity,
    /// "ENV" means: read from SMTP_USERNAME
    #[serde(default)]
    pub username: Option<String>,
    /// "ENV" means: read from SMTP_PASSWORD. Literal passwords are rejected.
    #[serde(default)]
    pub password: Option<String>,
    pub from: String,
    /// "ENV" means: read from REPORT_RECIPIENT
    pub to: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            host: String::new(),
            port: None,
            security: SmtpSecurity::default(),
            username: None,
            password: None,
            from: String::new(),
            to: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn from_env(var: &str) -> Result<String, ConfigError> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnv(var.to_string()))
}

fn is_env_marker(v: &str) -> bool {
    v.trim().eq_ignore_ascii_case(ENV_MARKER)
}

/// `Name <addr@host>` or a bare address.
pub fn parse_mailbox(address: &str) -> Result<Mailbox, ConfigError> {
    address
        .trim()
        .parse()
        .map_err(|e: lettre::address::AddressError| ConfigError::InvalidAddress {
            address: address.to_string(),
            detail: e.to_string(),
        })
}

impl MailConfig {
    pub fn is_dry_run(&self) -> bool {
        self.transport.eq_ignore_ascii_case("log")
    }

    /// Normalize the transport name and replace every "ENV" marker with its env value.
    /// For SMTP, also checks both addresses and that credentials come as a pair.
    pub fn resolve_secrets(&mut self) -> Result<(), ConfigError> {
        self.transport = self.transport.trim().to_lowercase();
        if !matches!(self.transport.as_str(), "smtp" | "log") {
            return Err(ConfigError::UnknownTransport(self.transport.clone()));
        }

        if is_env_marker(&self.to) {
            self.to = from_env(ENV_REPORT_RECIPIENT)?;
        }
        if self.username.as_deref().is_some_and(is_env_marker) {
            self.username = Some(from_env(ENV_SMTP_USERNAME)?);
        }
        match self.password.as_deref() {
            Some(p) if is_env_marker(p) => {
                self.password = Some(from_env(ENV_SMTP_PASSWORD)?);
            }
            Some(_) => return Err(ConfigError::LiteralSecret("mail.password")),
            None => {}
        }

        if !self.is_dry_run() {
            if self.username.is_some() != self.password.is_some() {
                return Err(ConfigError::IncompleteCredentials);
            }
            parse_mailbox(&self.from)?;
            parse_mailbox(&self.to)?;
        }
        Ok(())
    }

    /// Port by security mode unless set explicitly.
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(match self.security {
            SmtpSecurity::Tls => 465,
            SmtpSecurity::Starttls => 587,
            SmtpSecurity::None => 25,
        })
    }
}
