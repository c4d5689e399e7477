// src/collect/http.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use super::types::PageFetcher;
use crate::error::SourceUnavailable;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) price-scout/0.1";

/// Plain HTTP GET fetcher. Non-2xx responses count as unavailable.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("building HTTP client")?;
        Ok(Self { client })
    }
}

fn classify(url: &str, e: reqwest::Error) -> SourceUnavailable {
    if e.is_timeout() {
        SourceUnavailable::Timeout {
            url: url.to_string(),
        }
    } else {
        SourceUnavailable::Network {
            url: url.to_string(),
            detail: e.without_url().to_string(),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, SourceUnavailable> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceUnavailable::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        resp.text().await.map_err(|e| SourceUnavailable::Body {
            url: url.to_string(),
            detail: e.without_url().to_string(),
        })
    }
}
