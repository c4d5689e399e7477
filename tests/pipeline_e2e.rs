// tests/pipeline_e2e.rs
//
// Whole runs with a mock fetcher and a recording transport.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use price_scout::analyze::NO_DATA;
use price_scout::error::{SourceUnavailable, TransportError};
use price_scout::{
    Collector, Dispatcher, MailTransport, PageFetcher, Pipeline, RunOutcome, Selectors,
    SourceConfig, Stage,
};

const RECIPIENT: &str = "pricing@example.test";

struct StaticFetcher {
    pages: HashMap<String, String>,
    hang: bool,
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String, SourceUnavailable> {
        if self.hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| SourceUnavailable::Network {
                url: url.to_string(),
                detail: "connection reset".into(),
            })
    }
}

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<(String, String, String)>>,
    fail_with: Option<TransportError>,
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<Option<String>, TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.into(), subject.into(), body.into()));
        match &self.fail_with {
            Some(e) => Err(e.clone()),
            None => Ok(Some("msg-1".into())),
        }
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

fn source(name: &str) -> SourceConfig {
    SourceConfig {
        name: name.into(),
        url: format!("https://{name}.test/"),
        currency: "USD".into(),
        selectors: Selectors {
            item: ".p".into(),
            name: ".n".into(),
            price: ".v".into(),
            rating: None,
            category: None,
        },
    }
}

fn listing(name: &str, price: &str) -> String {
    format!(r#"<div class="p"><span class="n">{name}</span><span class="v">{price}</span></div>"#)
}

fn pipeline(
    pages: HashMap<String, String>,
    hang: bool,
    transport: Arc<RecordingTransport>,
) -> Pipeline {
    let collector = Collector::new(Arc::new(StaticFetcher { pages, hang }));
    Pipeline::new(
        vec![source("shop-a"), source("shop-b")],
        collector,
        Dispatcher::new(transport),
        RECIPIENT,
    )
}

#[tokio::test]
async fn full_run_delivers_comparison_report() {
    let pages = HashMap::from([
        ("https://shop-a.test/".to_string(), listing("Widget", "$10.00")),
        ("https://shop-b.test/".to_string(), listing("widget", "$12.00")),
    ]);
    let transport = Arc::new(RecordingTransport::default());
    let outcome = pipeline(pages, false, transport.clone())
        .with_title("Weekly prices")
        .run(&CancellationToken::new())
        .await;

    let delivery = outcome.delivery().expect("completed");
    assert!(delivery.success);
    assert_eq!(delivery.confirmation.as_deref(), Some("msg-1"));

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let (to, subject, body) = &sent[0];
    assert_eq!(to, RECIPIENT);
    assert!(subject.starts_with("Weekly prices ("));
    assert!(body.contains("shop-a is cheaper than shop-b by 2.00 USD for \"Widget\""), "{body}");
}

#[tokio::test]
async fn zero_data_run_still_delivers() {
    let transport = Arc::new(RecordingTransport::default());
    let outcome = pipeline(HashMap::new(), false, transport.clone())
        .run(&CancellationToken::new())
        .await;

    assert!(outcome.delivery().expect("completed").success);
    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].2.contains(NO_DATA), "{}", sent[0].2);
    assert!(sent[0].2.contains("shop-a: source unavailable"));
}

#[tokio::test]
async fn auth_failure_is_reported_not_raised() {
    let transport = Arc::new(RecordingTransport {
        fail_with: Some(TransportError::auth("535 5.7.8 bad credentials")),
        ..Default::default()
    });
    let outcome = pipeline(HashMap::new(), false, transport.clone())
        .run(&CancellationToken::new())
        .await;

    let delivery = outcome.delivery().expect("completed");
    assert!(!delivery.success);
    assert_eq!(delivery.recipient, RECIPIENT);
    assert!(delivery
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("authentication failed"));
    assert_eq!(transport.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn cancelled_before_start_sends_nothing() {
    let transport = Arc::new(RecordingTransport::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = pipeline(HashMap::new(), false, transport.clone())
        .run(&cancel)
        .await;

    assert_eq!(outcome, RunOutcome::Cancelled { stage: Stage::Collect });
    assert!(transport.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn cancel_interrupts_hanging_collection() {
    let transport = Arc::new(RecordingTransport::default());
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });
    }

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        pipeline(HashMap::new(), true, transport.clone()).run(&cancel),
    )
    .await
    .expect("run returned after cancellation");

    assert_eq!(outcome, RunOutcome::Cancelled { stage: Stage::Collect });
    assert!(outcome.delivery().is_none());
    assert!(transport.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn preview_renders_without_sending() {
    let pages = HashMap::from([("https://shop-a.test/".to_string(), listing("Widget", "4.00"))]);
    let transport = Arc::new(RecordingTransport::default());
    let report = pipeline(pages, false, transport.clone())
        .preview(&CancellationToken::new())
        .await
        .expect("not cancelled");

    assert!(report.to_text().contains("1 products collected from 1 of 2 sources"));
    assert!(transport.sent.lock().unwrap().is_empty());
}
