//! price-scout: batch entrypoint.
//! Loads config, runs the pipeline once, logs the delivery result.
//!
//! Environment:
//!   PRICE_SCOUT_CONFIG   config path (default `config/pipeline.toml`)
//!   METRICS_TEXTFILE     write Prometheus exposition here after the run
//!   RUST_LOG, LOG_FORMAT logging filter / `json`

use std::path::PathBuf;
use std::process::ExitCode;

use price_scout::metrics::{Metrics, ENV_METRICS_TEXTFILE};
use price_scout::{Pipeline, PipelineConfig, RunOutcome};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    price_scout::init_tracing();

    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = ?e, "metrics disabled");
            None
        }
    };

    let cfg = match PipelineConfig::load_default() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    let pipeline = match Pipeline::from_config(&cfg) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "pipeline setup failed");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling run");
                cancel.cancel();
            }
        });
    }

    let outcome = pipeline.run(&cancel).await;

    if let (Some(m), Ok(path)) = (&metrics, std::env::var(ENV_METRICS_TEXTFILE)) {
        if let Err(e) = m.write_textfile(&PathBuf::from(path)) {
            tracing::warn!(error = %format!("{e:#}"), "metrics textfile not written");
        }
    }

    match outcome {
        RunOutcome::Completed(result) if result.success => {
            tracing::info!(
                confirmation = result.confirmation.as_deref().unwrap_or("-"),
                "delivery succeeded"
            );
            ExitCode::SUCCESS
        }
        RunOutcome::Completed(result) => {
            tracing::error!(
                error = result.error.as_deref().unwrap_or("unknown"),
                "delivery failed"
            );
            ExitCode::FAILURE
        }
        RunOutcome::Cancelled { stage } => {
            tracing::warn!(%stage, "run cancelled, nothing delivered");
            ExitCode::from(130)
        }
    }
}
