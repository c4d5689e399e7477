// src/error.rs
//! Error taxonomy for the pipeline stages.
//!
//! Only delivery can end a run badly, and even that is reported through
//! `DeliveryResult` rather than propagated. Everything else degrades:
//! an unavailable source yields an empty batch, a malformed entry is skipped,
//! and missing comparison data becomes a finding.

use std::fmt;
use thiserror::Error;

/// A source could not be fetched. Non-fatal: that source's batch is empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceUnavailable {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("request to {url} failed: {detail}")]
    Network { url: String, detail: String },
    #[error("could not read body from {url}: {detail}")]
    Body { url: String, detail: String },
}

/// Page structure or a single entry could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Whole-source failure: the configured selector does not compile.
    #[error("invalid selector `{selector}`: {detail}")]
    InvalidSelector { selector: String, detail: String },
    #[error("missing product name")]
    MissingName,
    #[error("missing price")]
    MissingPrice,
    #[error("unparsable price `{0}`")]
    InvalidPrice(String),
    #[error("negative price `{0}`")]
    NegativePrice(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    ConnectionRefused,
    Authentication,
    Timeout,
    Rejected,
    InvalidAddress,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ConnectionRefused => "connection refused",
            Self::Authentication => "authentication failed",
            Self::Timeout => "timed out",
            Self::Rejected => "message rejected",
            Self::InvalidAddress => "invalid address",
            Self::Other => "transport error",
        };
        f.write_str(s)
    }
}

/// Failure reported by a mail transport for a single send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub detail: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn auth(detail: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Authentication, detail)
    }
}

/// Invalid pipeline configuration, detected at load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no sources configured")]
    NoSources,
    #[error("source #{index} has an empty `{field}`")]
    EmptyField { index: usize, field: &'static str },
    #[error("duplicate source name `{0}`")]
    DuplicateSource(String),
    #[error("invalid url for source `{name}`: {detail}")]
    InvalidUrl { name: String, detail: String },
    #[error("missing environment variable {0}")]
    MissingEnv(String),
    #[error("`{0}` must not be a literal value; set it to \"ENV\"")]
    LiteralSecret(&'static str),
    #[error("mail.username and mail.password must be set together")]
    IncompleteCredentials,
    #[error("invalid mail address `{address}`: {detail}")]
    InvalidAddress { address: String, detail: String },
    #[error("unsupported mail transport `{0}` (expected \"smtp\" or \"log\")")]
    UnknownTransport(String),
}
