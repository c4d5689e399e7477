// src/analyze/insight.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Insight categories, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    Summary,
    LowestPrice,
    HighestPrice,
    PriceDelta,
    RatingGap,
    Availability,
    DataQuality,
    Recommendation,
}

impl InsightCategory {
    pub const ALL: [InsightCategory; 8] = [
        Self::Summary,
        Self::LowestPrice,
        Self::HighestPrice,
        Self::PriceDelta,
        Self::RatingGap,
        Self::Availability,
        Self::DataQuality,
        Self::Recommendation,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::LowestPrice => "lowest price",
            Self::HighestPrice => "highest price",
            Self::PriceDelta => "price delta",
            Self::RatingGap => "rating gap",
            Self::Availability => "availability",
            Self::DataQuality => "data quality",
            Self::Recommendation => "recommendation",
        }
    }
}

/// Category -> findings. Ordered map, so iteration and JSON output are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightSet {
    findings: BTreeMap<InsightCategory, Vec<String>>,
}

impl InsightSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, category: InsightCategory, finding: impl Into<String>) {
        self.findings.entry(category).or_default().push(finding.into());
    }

    /// Findings for one category; empty slice when there are none.
    pub fn findings(&self, category: InsightCategory) -> &[String] {
        self.findings
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (InsightCategory, &[String])> {
        self.findings.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.findings.values().all(Vec::is_empty)
    }

    pub fn len(&self) -> usize {
        self.findings.values().map(Vec::len).sum()
    }

    /// Canonical JSON form; identical sets give identical bytes.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
