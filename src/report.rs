// src/report.rs
//! Reporter stage: render an [`InsightSet`] into a plain-text report.
//!
//! Section order is fixed. The body depends only on the insight set;
//! the timestamp is supplied by the caller and appears in the header only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyze::{InsightCategory, InsightSet};

pub const DEFAULT_TITLE: &str = "Competitor pricing report";
pub const EMPTY_SECTION: &str = "No findings.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    ExecutiveSummary,
    PriceComparison,
    AvailabilityNotes,
    Recommendations,
}

impl SectionKind {
    pub const ORDER: [SectionKind; 4] = [
        Self::ExecutiveSummary,
        Self::PriceComparison,
        Self::AvailabilityNotes,
        Self::Recommendations,
    ];

    pub fn heading(self) -> &'static str {
        match self {
            Self::ExecutiveSummary => "Executive Summary",
            Self::PriceComparison => "Price Comparison",
            Self::AvailabilityNotes => "Availability Notes",
            Self::Recommendations => "Recommendations",
        }
    }

    /// Insight categories rendered in this section, in order.
    pub fn categories(self) -> &'static [InsightCategory] {
        use InsightCategory::*;
        match self {
            Self::ExecutiveSummary => &[Summary],
            Self::PriceComparison => &[LowestPrice, HighestPrice, PriceDelta, RatingGap],
            Self::AvailabilityNotes => &[Availability, DataQuality],
            Self::Recommendations => &[Recommendation],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    pub kind: SectionKind,
    pub lines: Vec<String>,
}

impl ReportSection {
    pub fn heading(&self) -> &'static str {
        self.kind.heading()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub sections: Vec<ReportSection>,
}

impl Report {
    pub fn section(&self, kind: SectionKind) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// E.g. `Competitor pricing report (2025-09-06)`.
    pub fn subject(&self) -> String {
        format!("{} ({})", self.title, self.generated_at.format("%Y-%m-%d"))
    }

    /// Sections only, no title or timestamp.
    pub fn body_text(&self) -> String {
        let mut out = String::new();
        for (i, s) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(s.heading());
            out.push('\n');
            out.push_str(&"-".repeat(s.heading().len()));
            out.push('\n');
            if s.lines.is_empty() {
                out.push_str(EMPTY_SECTION);
                out.push('\n');
            }
            for line in &s.lines {
                out.push_str("- ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }

    /// Full message: title, timestamp, then the body.
    pub fn to_text(&self) -> String {
        format!(
            "{}\nGenerated at {}\n\n{}",
            self.title,
            self.generated_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            self.body_text()
        )
    }
}

pub fn render(insights: &InsightSet, title: &str, generated_at: DateTime<Utc>) -> Report {
    let sections = SectionKind::ORDER
        .iter()
        .map(|&kind| ReportSection {
            kind,
            lines: kind
                .categories()
                .iter()
                .flat_map(|c| insights.findings(*c).iter().cloned())
                .collect(),
        })
        .collect();

    let report = Report {
        title: title.to_string(),
        generated_at,
        sections,
    };
    tracing::debug!(target: "reporter", findings = insights.len(), "report rendered");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap()
    }

    #[test]
    fn sections_always_in_fixed_order() {
        let r = render(&InsightSet::new(), DEFAULT_TITLE, at());
        let kinds: Vec<SectionKind> = r.sections.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, SectionKind::ORDER);
        assert!(r.body_text().contains(EMPTY_SECTION));
    }

    #[test]
    fn body_ignores_timestamp() {
        let mut s = InsightSet::new();
        s.push(InsightCategory::Summary, "3 products collected from 2 of 2 sources");
        let a = render(&s, DEFAULT_TITLE, at());
        let b = render(&s, DEFAULT_TITLE, at() + chrono::Duration::hours(5));
        assert_eq!(a.body_text(), b.body_text());
        assert_ne!(a.to_text(), b.to_text());
    }

    #[test]
    fn subject_has_date() {
        let r = render(&InsightSet::new(), "Weekly prices", at());
        assert_eq!(r.subject(), "Weekly prices (2025-09-06)");
        assert!(r.to_text().starts_with("Weekly prices\nGenerated at 2025-09-06T09:00:00Z"));
    }
}
