//! Runs collect -> analyze -> report and prints the report to stdout.
//! Nothing is delivered; useful for checking selectors against live pages.

use price_scout::{Pipeline, PipelineConfig};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    price_scout::init_tracing();

    // Mail secrets are not needed for a preview, so "ENV" markers stay unresolved.
    let cfg = match PipelineConfig::default_path().and_then(|p| PipelineConfig::read_from(&p)) {
        Ok(mut c) => {
            c.mail.transport = "log".to_string();
            c
        }
        Err(e) => {
            eprintln!("invalid configuration: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    let pipeline = match Pipeline::from_config(&cfg) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("pipeline setup failed: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match pipeline.preview(&CancellationToken::new()).await {
        Ok(report) => {
            println!("{}", report.to_text());
            ExitCode::SUCCESS
        }
        Err(stage) => {
            eprintln!("cancelled during {stage}");
            ExitCode::FAILURE
        }
    }
}
