// src/collect/types.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, SourceUnavailable};

fn default_currency() -> String {
    "USD".to_string()
}

/// One monitored site: where to fetch and how to find product entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    /// Currency assumed when the price text carries no symbol or code.
    #[serde(default = "default_currency")]
    pub currency: String,
    pub selectors: Selectors,
}

/// CSS selectors. `item` matches one product entry; the rest are
/// evaluated relative to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Selectors {
    pub item: String,
    pub name: String,
    pub price: String,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Raw field texts for one entry, as found on the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields {
    pub name: Option<String>,
    pub price: Option<String>,
    pub rating: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    amount: Decimal,
    currency: String,
}

impl Price {
    /// Rejects negative amounts. Currency is upper-cased.
    pub fn new(amount: Decimal, currency: &str) -> Result<Self, ParseError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ParseError::NegativePrice(amount.to_string()));
        }
        Ok(Self {
            amount: amount.normalize().max(Decimal::ZERO),
            currency: currency.trim().to_ascii_uppercase(),
        })
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Two decimal places, e.g. `12.00`.
    pub fn amount_str(&self) -> String {
        format_amount(self.amount)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount_str(), self.currency)
    }
}

pub(crate) fn format_amount(d: Decimal) -> String {
    format!("{:.2}", d.round_dp(2))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    source: String,
    name: String,
    price: Price,
    rating: Option<f32>,
    category: Option<String>,
}

impl ProductRecord {
    /// Validating constructor: the name must contain at least one letter or digit.
    pub fn new(
        source: impl Into<String>,
        name: impl Into<String>,
        price: Price,
    ) -> Result<Self, ParseError> {
        let name = name.into().trim().to_string();
        if !name.chars().any(char::is_alphanumeric) {
            return Err(ParseError::MissingName);
        }
        Ok(Self {
            source: source.into(),
            name,
            price,
            rating: None,
            category: None,
        })
    }

    /// Ratings that are not finite or are negative are dropped.
    pub fn with_rating(mut self, rating: Option<f32>) -> Self {
        self.rating = rating.filter(|r| r.is_finite() && *r >= 0.0);
        self
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> &Price {
        &self.price
    }

    pub fn rating(&self) -> Option<f32> {
        self.rating
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

/// Everything one source yielded in one run. Built once by the collector.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionBatch {
    source: String,
    records: Vec<ProductRecord>,
    skipped: usize,
    unavailable: Option<SourceUnavailable>,
    parse_failure: Option<ParseError>,
}

impl CollectionBatch {
    pub fn new(source: impl Into<String>, records: Vec<ProductRecord>, skipped: usize) -> Self {
        Self {
            source: source.into(),
            records,
            skipped,
            unavailable: None,
            parse_failure: None,
        }
    }

    pub fn unavailable(source: impl Into<String>, err: SourceUnavailable) -> Self {
        Self {
            source: source.into(),
            records: Vec::new(),
            skipped: 0,
            unavailable: Some(err),
            parse_failure: None,
        }
    }

    pub fn unparsable(source: impl Into<String>, err: ParseError) -> Self {
        Self {
            source: source.into(),
            records: Vec::new(),
            skipped: 0,
            unavailable: None,
            parse_failure: Some(err),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn unavailable_reason(&self) -> Option<&SourceUnavailable> {
        self.unavailable.as_ref()
    }

    pub fn parse_failure(&self) -> Option<&ParseError> {
        self.parse_failure.as_ref()
    }

    pub fn has_data(&self) -> bool {
        !self.records.is_empty()
    }
}

/// `fetch(url) -> raw document`.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, SourceUnavailable>;
}

/// `extract(document, pattern) -> raw field tuples`.
pub trait RecordExtractor: Send + Sync {
    fn extract(&self, document: &str, selectors: &Selectors) -> Result<Vec<RawFields>, ParseError>;
}
