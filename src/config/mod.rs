// src/config/mod.rs
//! Pipeline configuration, loaded from TOML.
//!
//! Lookup order:
//! 1) $PRICE_SCOUT_CONFIG
//! 2) config/pipeline.toml
//!
//! Secrets and the recipient address are never literals in the file; see
//! [`mail::MailConfig::resolve_secrets`].

pub mod mail;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analyze::AnalyzerConfig;
use crate::collect::http::DEFAULT_USER_AGENT;
use crate::collect::types::SourceConfig;
use crate::collect::DEFAULT_CONCURRENCY;
use crate::config::mail::MailConfig;
use crate::error::ConfigError;
use crate::report::DEFAULT_TITLE;

pub const ENV_CONFIG_PATH: &str = "PRICE_SCOUT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}
fn default_fetch_timeout_secs() -> u64 {
    20
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub report: ReportConfig,
    pub mail: MailConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl PipelineConfig {
    /// Parse and validate TOML text. Does not touch the environment.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: PipelineConfig = toml::from_str(s).context("parsing pipeline config")?;
        cfg.collector.concurrency = cfg.collector.concurrency.max(1);
        cfg.analyzer.min_sources = cfg.analyzer.min_sources.max(2);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse and validate a file without resolving "ENV" markers.
    pub fn read_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load from an explicit path and resolve "ENV" markers.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = Self::read_from(path)?;
        cfg.mail.resolve_secrets()?;
        Ok(cfg)
    }

    /// $PRICE_SCOUT_CONFIG if set (must exist), else `config/pipeline.toml`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Ok(pb);
        }
        Ok(PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn load_default() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        let mut seen = BTreeSet::new();
        for (index, s) in self.sources.iter().enumerate() {
            for (field, value) in [
                ("name", s.name.as_str()),
                ("url", s.url.as_str()),
                ("selectors.item", s.selectors.item.as_str()),
                ("selectors.name", s.selectors.name.as_str()),
                ("selectors.price", s.selectors.price.as_str()),
            ] {
                if value.trim().is_empty() {
                    return Err(ConfigError::EmptyField { index, field });
                }
            }
            reqwest::Url::parse(&s.url).map_err(|e| ConfigError::InvalidUrl {
                name: s.name.clone(),
                detail: e.to_string(),
            })?;
            if !seen.insert(s.name.trim().to_lowercase()) {
                return Err(ConfigError::DuplicateSource(s.name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[collector]
concurrency = 0

[analyzer]
own_source = "our-shop"

[mail]
transport = "log"
from = "reports@example.test"
to = "ENV"

[[sources]]
name = "our-shop"
url = "https://our-shop.test/widgets"
[sources.selectors]
item = ".product"
name = ".title"
price = ".price"

[[sources]]
name = "rival"
url = "https://rival.test/c/widgets"
currency = "EUR"
[sources.selectors]
item = "li.item"
name = "h3"
price = ".amount"
rating = ".stars"
"#;

    #[test]
    fn parses_sample_with_defaults() {
        let cfg = PipelineConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.collector.concurrency, 1);
        assert_eq!(cfg.collector.timeout_secs, 20);
        assert_eq!(cfg.analyzer.min_sources, 2);
        assert_eq!(cfg.report.title, DEFAULT_TITLE);
        assert_eq!(cfg.sources.len(), 2);
        assert_eq!(cfg.sources[0].currency, "USD");
        assert_eq!(cfg.sources[1].selectors.rating.as_deref(), Some(".stars"));
    }

    #[test]
    fn rejects_duplicate_and_bad_sources() {
        let dup = SAMPLE.replace("name = \"rival\"", "name = \"Our-Shop\"");
        let err = PipelineConfig::from_toml_str(&dup).unwrap_err();
        assert!(err.to_string().contains("duplicate source"), "{err:#}");

        let bad_url = SAMPLE.replace("https://rival.test/c/widgets", "not a url");
        assert!(PipelineConfig::from_toml_str(&bad_url).is_err());

        let no_price = SAMPLE.replace("price = \".amount\"", "price = \"  \"");
        let err = PipelineConfig::from_toml_str(&no_price).unwrap_err();
        assert!(err.to_string().contains("selectors.price"), "{err:#}");
    }
}
