// src/collect/mod.rs
//! Collector stage: fetch each source page, extract entries, build records.
//!
//! A failing source never aborts the others. It produces an empty batch that
//! carries the reason, so the analyzer can report it.

pub mod css;
pub mod http;
pub mod price;
pub mod types;

use futures::stream::{self, StreamExt};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Instant;

use crate::collect::css::CssExtractor;
use crate::collect::price::{parse_price, parse_rating};
use crate::collect::types::{
    CollectionBatch, PageFetcher, ProductRecord, RawFields, RecordExtractor, SourceConfig,
};
use crate::error::ParseError;

pub const DEFAULT_CONCURRENCY: usize = 4;

/// One-time metrics registration (so series show up in the exposition).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("collector_records_total", "Product records kept per run.");
        describe_counter!(
            "collector_skipped_total",
            "Entries skipped for a missing name or unparsable price."
        );
        describe_counter!(
            "collector_source_errors_total",
            "Sources that were unavailable or whose page could not be parsed."
        );
        describe_histogram!("collector_fetch_ms", "Per-source fetch time in milliseconds.");
    });
}

/// Normalize field text: decode entities, strip tags, fold quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Turn one raw entry into a record. Rating problems are not fatal.
pub fn record_from_raw(source: &SourceConfig, raw: RawFields) -> Result<ProductRecord, ParseError> {
    let name = raw.name.ok_or(ParseError::MissingName)?;
    let price_text = raw.price.ok_or(ParseError::MissingPrice)?;
    let price = parse_price(&price_text, &source.currency)?;
    Ok(ProductRecord::new(&source.name, name, price)?
        .with_rating(raw.rating.as_deref().and_then(parse_rating))
        .with_category(raw.category))
}

/// Build a batch from extracted rows, skipping and counting malformed ones.
pub fn build_batch(source: &SourceConfig, rows: Vec<RawFields>) -> CollectionBatch {
    let mut records = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;
    for raw in rows {
        match record_from_raw(source, raw) {
            Ok(r) => records.push(r),
            Err(e) => {
                tracing::debug!(target: "collector", source = %source.name, error = %e, "entry skipped");
                skipped += 1;
            }
        }
    }
    CollectionBatch::new(&source.name, records, skipped)
}

pub struct Collector {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn RecordExtractor>,
    concurrency: usize,
}

impl Collector {
    /// Uses [`CssExtractor`] and the default concurrency.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            extractor: Arc::new(CssExtractor),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn RecordExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Values below 1 are treated as 1.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// One batch per source, in the same order as `sources`.
    pub async fn collect(&self, sources: &[SourceConfig]) -> Vec<CollectionBatch> {
        ensure_metrics_described();

        let batches: Vec<CollectionBatch> = stream::iter(sources)
            .map(|src| self.collect_one(src))
            .buffered(self.concurrency)
            .collect()
            .await;

        let kept: usize = batches.iter().map(|b| b.records().len()).sum();
        let skipped: usize = batches.iter().map(|b| b.skipped()).sum();
        counter!("collector_records_total").increment(kept as u64);
        counter!("collector_skipped_total").increment(skipped as u64);

        tracing::info!(
            target: "collector",
            sources = sources.len(),
            with_data = batches.iter().filter(|b| b.has_data()).count(),
            kept,
            skipped,
            "collection finished"
        );
        batches
    }

    async fn collect_one(&self, src: &SourceConfig) -> CollectionBatch {
        let t0 = Instant::now();
        let fetched = self.fetcher.fetch(&src.url).await;
        histogram!("collector_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let body = match fetched {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(target: "collector", source = %src.name, error = %e, "source unavailable");
                counter!("collector_source_errors_total").increment(1);
                return CollectionBatch::unavailable(&src.name, e);
            }
        };

        match self.extractor.extract(&body, &src.selectors) {
            Ok(rows) => build_batch(src, rows),
            Err(e) => {
                tracing::warn!(target: "collector", source = %src.name, error = %e, "page could not be parsed");
                counter!("collector_source_errors_total").increment(1);
                CollectionBatch::unparsable(&src.name, e)
            }
        }
    }
}
