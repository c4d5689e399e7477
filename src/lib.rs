// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod report;

// Stage 1: fetch + extract product listings
pub mod collect;
// Stage 2: cross-source comparison
pub mod analyze;
// Stage 4: report delivery
pub mod notify;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{analyze, AnalyzerConfig, InsightCategory, InsightSet};
pub use crate::collect::types::{
    CollectionBatch, PageFetcher, Price, ProductRecord, RecordExtractor, Selectors, SourceConfig,
};
pub use crate::collect::Collector;
pub use crate::config::PipelineConfig;
pub use crate::notify::{DeliveryResult, Dispatcher, MailTransport};
pub use crate::pipeline::{Pipeline, RunOutcome, Stage};
pub use crate::report::{render, Report, SectionKind};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Stage log targets at info, everything else at warn.
const DEFAULT_LOG_FILTER: &str =
    "price_scout=info,collector=info,analyzer=info,reporter=info,dispatcher=info,pipeline=info,warn";

/// Initialize tracing for the binaries.
/// `RUST_LOG` controls the filter; `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if let Err(e) = res {
        eprintln!("tracing already initialized: {e}");
    }
}
