// src/pipeline.rs
//! Sequential driver: collect -> analyze -> report -> dispatch.
//!
//! Each stage starts only after the previous one has finished. `run`
//! consumes the pipeline, so a stage cannot execute twice per invocation.
//! Cancellation is checked before every stage and raced against the
//! collector's network work. Once delivery has started it is not interrupted.

use anyhow::{Context, Result};
use chrono::Utc;
use metrics::{describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::analyze::{analyze, AnalyzerConfig};
use crate::collect::http::HttpFetcher;
use crate::collect::types::SourceConfig;
use crate::collect::Collector;
use crate::config::PipelineConfig;
use crate::notify::{DeliveryResult, Dispatcher, LogMailTransport, MailTransport, SmtpMailTransport};
use crate::report::{render, Report, DEFAULT_TITLE};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_gauge!(
            "pipeline_last_run_ts",
            "Unix time of the last run that reached delivery."
        );
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Collect,
    Analyze,
    Report,
    Dispatch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Collect => "collect",
            Self::Analyze => "analyze",
            Self::Report => "report",
            Self::Dispatch => "dispatch",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(DeliveryResult),
    /// Cancelled before or during `stage`; nothing was delivered.
    Cancelled { stage: Stage },
}

impl RunOutcome {
    pub fn delivery(&self) -> Option<&DeliveryResult> {
        match self {
            Self::Completed(d) => Some(d),
            Self::Cancelled { .. } => None,
        }
    }
}

pub struct Pipeline {
    sources: Vec<SourceConfig>,
    collector: Collector,
    analyzer: AnalyzerConfig,
    title: String,
    dispatcher: Dispatcher,
    recipient: String,
}

impl Pipeline {
    pub fn new(
        sources: Vec<SourceConfig>,
        collector: Collector,
        dispatcher: Dispatcher,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            sources,
            collector,
            analyzer: AnalyzerConfig::default(),
            title: DEFAULT_TITLE.to_string(),
            dispatcher,
            recipient: recipient.into(),
        }
    }

    pub fn with_analyzer(mut self, cfg: AnalyzerConfig) -> Self {
        self.analyzer = cfg;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Production wiring: HTTP fetcher + CSS extraction + SMTP or log transport.
    pub fn from_config(cfg: &PipelineConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(
            Duration::from_secs(cfg.collector.timeout_secs),
            &cfg.collector.user_agent,
        )?;
        let collector =
            Collector::new(Arc::new(fetcher)).with_concurrency(cfg.collector.concurrency);

        let transport: Arc<dyn MailTransport> = if cfg.mail.is_dry_run() {
            Arc::new(LogMailTransport)
        } else {
            Arc::new(SmtpMailTransport::from_config(&cfg.mail).context("building SMTP transport")?)
        };

        Ok(Self::new(
            cfg.sources.clone(),
            collector,
            Dispatcher::new(transport),
            cfg.mail.to.clone(),
        )
        .with_analyzer(cfg.analyzer.clone())
        .with_title(cfg.report.title.clone()))
    }

    async fn produce_report(&self, cancel: &CancellationToken) -> Result<Report, Stage> {
        tracing::info!(target: "pipeline", sources = self.sources.len(), "run started");

        if cancel.is_cancelled() {
            return Err(Stage::Collect);
        }
        let batches = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Stage::Collect),
            b = self.collector.collect(&self.sources) => b,
        };

        if cancel.is_cancelled() {
            return Err(Stage::Analyze);
        }
        let insights = analyze(&batches, &self.analyzer);

        if cancel.is_cancelled() {
            return Err(Stage::Report);
        }
        Ok(render(&insights, &self.title, Utc::now()))
    }

    /// Collect, analyze and render without delivering.
    pub async fn preview(self, cancel: &CancellationToken) -> Result<Report, Stage> {
        self.produce_report(cancel).await
    }

    pub async fn run(self, cancel: &CancellationToken) -> RunOutcome {
        let report = match self.produce_report(cancel).await {
            Ok(r) => r,
            Err(stage) => return cancelled(stage),
        };

        if cancel.is_cancelled() {
            return cancelled(Stage::Dispatch);
        }
        let result = self.dispatcher.deliver(&report, &self.recipient).await;

        ensure_metrics_described();
        gauge!("pipeline_last_run_ts").set(Utc::now().timestamp() as f64);
        tracing::info!(target: "pipeline", success = result.success, "run finished");
        RunOutcome::Completed(result)
    }
}

fn cancelled(stage: Stage) -> RunOutcome {
    tracing::warn!(target: "pipeline", %stage, "run cancelled");
    RunOutcome::Cancelled { stage }
}
