// src/analyze/mod.rs
//! Analyzer stage: cross-source price comparison.
//!
//! Pure and deterministic. Products are matched across sources by
//! normalized name; all grouping goes through ordered maps and the input
//! batch order, never through hash iteration.

pub mod insight;
pub mod matching;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use crate::analyze::insight::{InsightCategory, InsightSet};
use crate::analyze::matching::{index_products, ProductGroup};
use crate::collect::types::{format_amount, CollectionBatch, ProductRecord};

pub const UNCATEGORIZED: &str = "uncategorized";
pub const INSUFFICIENT_DATA: &str = "insufficient data for comparison";
pub const NO_DATA: &str = "no data available";

fn default_min_sources() -> usize {
    2
}
fn default_rating_gap() -> f32 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Sources with data required before cross-source comparisons run. Never below 2.
    #[serde(default = "default_min_sources")]
    pub min_sources: usize,
    /// Smallest rating spread worth reporting.
    #[serde(default = "default_rating_gap")]
    pub rating_gap_threshold: f32,
    /// Our own shop, if it is one of the sources. Enables undercut recommendations.
    #[serde(default)]
    pub own_source: Option<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_sources: default_min_sources(),
            rating_gap_threshold: default_rating_gap(),
            own_source: None,
        }
    }
}

/// Cheapest vs priciest entry of one product within one currency.
struct Spread<'a> {
    name: &'a str,
    low: &'a ProductRecord,
    high: &'a ProductRecord,
}

impl Spread<'_> {
    fn delta(&self) -> Decimal {
        self.high.price().amount() - self.low.price().amount()
    }
}

/// Build the insight set for one run's batches.
pub fn analyze(batches: &[CollectionBatch], cfg: &AnalyzerConfig) -> InsightSet {
    let mut out = InsightSet::new();
    let min_sources = cfg.min_sources.max(2);

    let with_data = batches.iter().filter(|b| b.has_data()).count();
    let records: usize = batches.iter().map(|b| b.records().len()).sum();
    let skipped: usize = batches.iter().map(|b| b.skipped()).sum();

    summarize(&mut out, batches.len(), with_data, records, skipped);
    data_quality(&mut out, batches);
    price_extremes(&mut out, batches);

    let comparable = with_data >= min_sources;
    let mut spreads = Vec::new();
    let groups = index_products(batches);

    if comparable {
        let shared = groups.iter().filter(|g| g.source_count() >= 2).count();
        out.push(
            InsightCategory::Summary,
            format!("{shared} products listed at two or more sources"),
        );
        for g in &groups {
            spreads.extend(price_deltas(&mut out, g));
            rating_gap(&mut out, g, cfg.rating_gap_threshold);
        }
        availability(&mut out, &groups, batches);
    } else {
        out.push(
            InsightCategory::DataQuality,
            format!(
                "{INSUFFICIENT_DATA}: {with_data} of {min_sources} required sources returned products"
            ),
        );
    }

    recommend(&mut out, cfg, &groups, &spreads, records, comparable);

    tracing::debug!(
        target: "analyzer",
        findings = out.len(),
        comparable,
        products = groups.len(),
        "analysis finished"
    );
    out
}

fn summarize(out: &mut InsightSet, sources: usize, with_data: usize, records: usize, skipped: usize) {
    if records == 0 {
        out.push(
            InsightCategory::Summary,
            format!("{NO_DATA}: none of the {sources} configured sources returned products"),
        );
        return;
    }
    let mut line = format!("{records} products collected from {with_data} of {sources} sources");
    if skipped > 0 {
        line.push_str(&format!("; {skipped} malformed entries skipped"));
    }
    out.push(InsightCategory::Summary, line);
}

fn data_quality(out: &mut InsightSet, batches: &[CollectionBatch]) {
    for b in batches {
        if let Some(e) = b.unavailable_reason() {
            out.push(
                InsightCategory::DataQuality,
                format!("{}: source unavailable ({e})", b.source()),
            );
        } else if let Some(e) = b.parse_failure() {
            out.push(
                InsightCategory::DataQuality,
                format!("{}: page could not be parsed ({e})", b.source()),
            );
        } else if !b.has_data() {
            out.push(
                InsightCategory::DataQuality,
                format!("{}: no products found", b.source()),
            );
        }
        if b.skipped() > 0 {
            out.push(
                InsightCategory::DataQuality,
                format!("{}: {} malformed entries skipped", b.source(), b.skipped()),
            );
        }
    }
}

/// Lowest and highest price per (category, currency).
fn price_extremes(out: &mut InsightSet, batches: &[CollectionBatch]) {
    let mut by_cat: BTreeMap<(&str, &str), Vec<&ProductRecord>> = BTreeMap::new();
    for r in batches.iter().flat_map(|b| b.records()) {
        let cat = r.category().unwrap_or(UNCATEGORIZED);
        by_cat.entry((cat, r.price().currency())).or_default().push(r);
    }

    for ((cat, _), recs) in &by_cat {
        // reduce keeps the earliest of equal prices for both ends
        let low = recs
            .iter()
            .copied()
            .reduce(|a, b| if b.price().amount() < a.price().amount() { b } else { a });
        let high = recs
            .iter()
            .copied()
            .reduce(|a, b| if b.price().amount() > a.price().amount() { b } else { a });

        if let Some(low) = low {
            out.push(
                InsightCategory::LowestPrice,
                format!(
                    "{cat}: lowest price {} for \"{}\" at {}",
                    low.price(),
                    low.name(),
                    low.source()
                ),
            );
        }
        if let Some(high) = high.filter(|_| recs.len() >= 2) {
            out.push(
                InsightCategory::HighestPrice,
                format!(
                    "{cat}: highest price {} for \"{}\" at {}",
                    high.price(),
                    high.name(),
                    high.source()
                ),
            );
        }
    }
}

/// Cheapest source vs every other source, per currency. Returns the spreads found.
fn price_deltas<'a>(out: &mut InsightSet, g: &'a ProductGroup<'a>) -> Vec<Spread<'a>> {
    let mut spreads = Vec::new();
    if g.source_count() < 2 {
        return spreads;
    }

    let by_currency = g.by_currency();
    if by_currency.len() > 1 {
        let codes: Vec<&str> = by_currency.keys().copied().collect();
        out.push(
            InsightCategory::DataQuality,
            format!(
                "\"{}\": listed in different currencies ({}), compared per currency only",
                g.display_name(),
                codes.join(", ")
            ),
        );
    }

    for entries in by_currency.values() {
        if entries.len() < 2 {
            continue;
        }
        let cheapest = entries
            .iter()
            .copied()
            .reduce(|a, b| if b.price().amount() < a.price().amount() { b } else { a });
        let priciest = entries
            .iter()
            .copied()
            .reduce(|a, b| if b.price().amount() > a.price().amount() { b } else { a });
        let (Some(low), Some(high)) = (cheapest, priciest) else {
            continue;
        };

        for other in entries.iter().copied().filter(|r| !std::ptr::eq(*r, low)) {
            let delta = other.price().amount() - low.price().amount();
            let line = if delta.is_zero() {
                format!(
                    "\"{}\" is priced identically at {} and {} ({})",
                    g.display_name(),
                    low.source(),
                    other.source(),
                    low.price()
                )
            } else {
                format!(
                    "{} is cheaper than {} by {} {} for \"{}\" ({} vs {})",
                    low.source(),
                    other.source(),
                    format_amount(delta),
                    low.price().currency(),
                    g.display_name(),
                    low.price().amount_str(),
                    other.price().amount_str()
                )
            };
            out.push(InsightCategory::PriceDelta, line);
        }

        spreads.push(Spread {
            name: g.display_name(),
            low,
            high,
        });
    }
    spreads
}

fn rating_gap(out: &mut InsightSet, g: &ProductGroup<'_>, threshold: f32) {
    let rated: Vec<(&ProductRecord, f32)> = g
        .entries()
        .filter_map(|r| r.rating().map(|x| (r, x)))
        .collect();
    if rated.len() < 2 {
        return;
    }
    let hi = rated
        .iter()
        .copied()
        .reduce(|a, b| if b.1 > a.1 { b } else { a });
    let lo = rated
        .iter()
        .copied()
        .reduce(|a, b| if b.1 < a.1 { b } else { a });
    let (Some((hi_r, hi)), Some((lo_r, lo))) = (hi, lo) else {
        return;
    };
    let gap = hi - lo;
    if gap > 0.0 && gap + f32::EPSILON >= threshold {
        out.push(
            InsightCategory::RatingGap,
            format!(
                "\"{}\": rating gap {:.1} ({} {:.1} vs {} {:.1})",
                g.display_name(),
                gap,
                hi_r.source(),
                hi,
                lo_r.source(),
                lo
            ),
        );
    }
}

fn availability(out: &mut InsightSet, groups: &[ProductGroup<'_>], batches: &[CollectionBatch]) {
    let live: Vec<&str> = batches
        .iter()
        .filter(|b| b.has_data())
        .map(|b| b.source())
        .collect();

    for g in groups {
        if g.source_count() == live.len() {
            continue;
        }
        let present: Vec<&str> = g.entries().map(|r| r.source()).collect();
        let missing: Vec<&str> = live
            .iter()
            .copied()
            .filter(|s| !present.contains(s))
            .collect();
        out.push(
            InsightCategory::Availability,
            format!(
                "\"{}\" listed at {} only; missing from {}",
                g.display_name(),
                present.join(", "),
                missing.join(", ")
            ),
        );
    }
}

fn recommend(
    out: &mut InsightSet,
    cfg: &AnalyzerConfig,
    groups: &[ProductGroup<'_>],
    spreads: &[Spread<'_>],
    records: usize,
    comparable: bool,
) {
    if records == 0 {
        out.push(
            InsightCategory::Recommendation,
            "Check the source configuration: no products were collected in this run.",
        );
        return;
    }
    if !comparable {
        out.push(
            InsightCategory::Recommendation,
            "Add or repair sources to enable cross-site price comparison.",
        );
        return;
    }

    if let Some(own) = cfg.own_source.as_deref() {
        own_price_recommendations(out, own, groups);
        return;
    }

    let widest = spreads
        .iter()
        .filter(|s| !s.delta().is_zero())
        .reduce(|a, b| if b.delta() > a.delta() { b } else { a });
    match widest {
        Some(s) => out.push(
            InsightCategory::Recommendation,
            format!(
                "Largest price spread: \"{}\" ({} {} between {} and {})",
                s.name,
                format_amount(s.delta()),
                s.low.price().currency(),
                s.low.source(),
                s.high.source()
            ),
        ),
        None => out.push(
            InsightCategory::Recommendation,
            "No price differences found across shared products.",
        ),
    }
}

fn own_price_recommendations(out: &mut InsightSet, own: &str, groups: &[ProductGroup<'_>]) {
    let mut shared = 0usize;
    let mut undercut = 0usize;

    for g in groups {
        let Some(mine) = g.entry_for(own) else {
            continue;
        };
        let competitors: Vec<&ProductRecord> = g
            .entries()
            .filter(|r| r.source() != own && r.price().currency() == mine.price().currency())
            .collect();
        if competitors.is_empty() {
            continue;
        }
        shared += 1;

        let best = competitors
            .iter()
            .copied()
            .reduce(|a, b| if b.price().amount() < a.price().amount() { b } else { a });
        if let Some(best) = best.filter(|b| b.price().amount() < mine.price().amount()) {
            undercut += 1;
            out.push(
                InsightCategory::Recommendation,
                format!(
                    "Review \"{}\": {} undercuts {} by {} {}",
                    g.display_name(),
                    best.source(),
                    own,
                    format_amount(mine.price().amount() - best.price().amount()),
                    mine.price().currency()
                ),
            );
        }
    }

    if shared == 0 {
        out.push(
            InsightCategory::Recommendation,
            format!("{own} shares no products with competitors; own-price recommendations unavailable"),
        );
    } else if undercut == 0 {
        out.push(
            InsightCategory::Recommendation,
            format!("{own} matches or beats competitor pricing on all {shared} shared products"),
        );
    }
}
