// tests/collector_mock.rs
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use price_scout::error::SourceUnavailable;
use price_scout::{Collector, PageFetcher, Selectors, SourceConfig};

/// Serves fixed pages; later sources answer faster to shuffle completion order.
struct MockFetcher {
    pages: HashMap<String, (u64, Result<String, SourceUnavailable>)>,
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, SourceUnavailable> {
        let (delay_ms, page) = self.pages.get(url).cloned().unwrap_or((
            0,
            Err(SourceUnavailable::Status {
                url: url.to_string(),
                status: 404,
            }),
        ));
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        page
    }
}

fn source(name: &str) -> SourceConfig {
    SourceConfig {
        name: name.to_string(),
        url: format!("https://{name}.test/list"),
        currency: "USD".to_string(),
        selectors: Selectors {
            item: ".p".into(),
            name: ".n".into(),
            price: ".v".into(),
            rating: None,
            category: None,
        },
    }
}

fn page(items: &[(&str, &str)]) -> String {
    let mut html = String::from("<html><body>");
    for (n, v) in items {
        html.push_str(&format!(r#"<div class="p"><b class="n">{n}</b><i class="v">{v}</i></div>"#));
    }
    html.push_str("</body></html>");
    html
}

#[tokio::test]
async fn one_batch_per_source_in_input_order() {
    let names = ["alpha", "bravo", "charlie", "delta", "echo"];
    let mut pages = HashMap::new();
    for (i, n) in names.iter().enumerate() {
        let delay = (names.len() - i) as u64 * 15;
        pages.insert(
            format!("https://{n}.test/list"),
            (delay, Ok(page(&[("Widget", "10.00"), (n, "1.00")]))),
        );
    }
    let collector = Collector::new(Arc::new(MockFetcher { pages })).with_concurrency(3);
    let sources: Vec<SourceConfig> = names.iter().map(|n| source(n)).collect();

    let batches = collector.collect(&sources).await;

    assert_eq!(batches.len(), sources.len());
    for (b, s) in batches.iter().zip(&sources) {
        assert_eq!(b.source(), s.name);
        assert_eq!(b.records().len(), 2);
        assert!(b.records().iter().all(|r| r.source() == s.name));
    }
}

#[tokio::test]
async fn unavailable_source_does_not_affect_others() {
    let mut pages = HashMap::new();
    pages.insert(
        "https://alpha.test/list".to_string(),
        (0, Ok(page(&[("Widget", "$10.00"), ("Broken", "n/a")]))),
    );
    pages.insert(
        "https://bravo.test/list".to_string(),
        (
            0,
            Err(SourceUnavailable::Timeout {
                url: "https://bravo.test/list".into(),
            }),
        ),
    );
    let collector = Collector::new(Arc::new(MockFetcher { pages }));
    let batches = collector
        .collect(&[source("alpha"), source("bravo"), source("charlie")])
        .await;

    assert_eq!(batches.len(), 3);
    assert_eq!(batches[0].records().len(), 1);
    assert_eq!(batches[0].skipped(), 1);
    assert!(batches[0].unavailable_reason().is_none());

    assert!(batches[1].records().is_empty());
    assert!(matches!(
        batches[1].unavailable_reason(),
        Some(SourceUnavailable::Timeout { .. })
    ));
    // unknown url -> mock 404
    assert!(matches!(
        batches[2].unavailable_reason(),
        Some(SourceUnavailable::Status { status: 404, .. })
    ));
}

#[tokio::test]
async fn bad_selector_yields_empty_batch_with_parse_failure() {
    let mut pages = HashMap::new();
    pages.insert(
        "https://alpha.test/list".to_string(),
        (0, Ok(page(&[("Widget", "1")]))),
    );
    let mut s = source("alpha");
    s.selectors.item = "div[".into();
    let batches = Collector::new(Arc::new(MockFetcher { pages }))
        .collect(&[s])
        .await;
    assert_eq!(batches.len(), 1);
    assert!(!batches[0].has_data());
    assert!(batches[0].parse_failure().is_some());
}
