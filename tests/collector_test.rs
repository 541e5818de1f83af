use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use motorsport_scraper::apis::base::BaseAdapter;
use motorsport_scraper::apis::parsers::TextBlockParser;
use motorsport_scraper::app::ports::{HttpClientPort, HttpGetResult};
use motorsport_scraper::{
    CandidateEvent, CollectConfig, Collector, RawDocument, Result, ScraperError, SourceAdapter, SourceErrorKind,
};

/// HTTP stub answering every request with the same status and body
struct FixedHttp {
    status: u16,
    body: &'static str,
    calls: AtomicU32,
}

impl FixedHttp {
    fn new(status: u16, body: &'static str) -> Arc<Self> {
        Arc::new(Self { status, body, calls: AtomicU32::new(0) })
    }
}

#[async_trait]
impl HttpClientPort for FixedHttp {
    async fn get(&self, _url: &str) -> Result<HttpGetResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(HttpGetResult {
            status: self.status,
            bytes: self.body.as_bytes().to_vec(),
            content_type: "text/plain".into(),
        })
    }
}

enum Behaviour {
    Names(Vec<&'static str>),
    SleepThen(Duration, Vec<&'static str>),
    Panic,
    NotFound,
}

struct Scripted {
    id: &'static str,
    priority: i32,
    behaviour: Behaviour,
    calls: AtomicU32,
}

impl Scripted {
    fn new(id: &'static str, behaviour: Behaviour) -> Self {
        Self { id, priority: 0, behaviour, calls: AtomicU32::new(0) }
    }
}

#[async_trait]
impl SourceAdapter for Scripted {
    fn source_id(&self) -> &str {
        self.id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn fetch(&self) -> Result<RawDocument> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let names = match &self.behaviour {
            Behaviour::Names(names) => names.clone(),
            Behaviour::SleepThen(delay, names) => {
                tokio::time::sleep(*delay).await;
                names.clone()
            }
            Behaviour::Panic => panic!("adapter bug"),
            Behaviour::NotFound => {
                return Err(ScraperError::HttpStatus { status: 404, url: "https://example.com".into() })
            }
        };
        Ok(RawDocument {
            source_id: self.id.into(),
            url: "https://example.com".into(),
            body: names.join("\n"),
            fetched_at: Utc.with_ymd_and_hms(2025, 7, 30, 12, 0, 0).unwrap(),
        })
    }

    fn parse(&self, document: &RawDocument) -> Result<Vec<CandidateEvent>> {
        document.body.lines().map(|line| CandidateEvent::new(self.id, line)).collect()
    }
}

fn text_adapter(id: &str, http: Arc<FixedHttp>) -> Arc<dyn SourceAdapter> {
    Arc::new(BaseAdapter::new(id, "https://example.com/programacao", http, Box::new(TextBlockParser::new())))
}

const GUIDE: &str = "SÁBADO – 02/08/2025\n10h30 – Fórmula 1 – Treino Livre 3 – Hungaroring, Hungria\n";

#[tokio::test(start_paused = true)]
async fn test_server_errors_exhaust_retries_without_affecting_other_sources() {
    let failing = FixedHttp::new(500, "");
    let healthy = FixedHttp::new(200, GUIDE);
    let adapters = vec![text_adapter("broken", failing.clone()), text_adapter("guide", healthy.clone())];

    let config = CollectConfig { max_retries: 2, ..CollectConfig::default() };
    let outcome = Collector::new(config).collect(&adapters).await.unwrap();

    assert_eq!(failing.calls.load(Ordering::SeqCst), 3);
    assert_eq!(outcome.errors.len(), 1);
    let error = &outcome.errors[0];
    assert_eq!(error.source_id, "broken");
    assert_eq!(error.attempts, 3);
    assert_eq!(error.kind, SourceErrorKind::Transient);
    assert!(error.last_error.contains("500"));

    assert_eq!(outcome.per_source_fetched.get("broken"), Some(&0));
    assert_eq!(outcome.per_source_fetched.get("guide"), Some(&1));
    assert_eq!(outcome.candidates.len(), 1);
    assert_eq!(outcome.candidates[0].source_id, "guide");
}

#[tokio::test(start_paused = true)]
async fn test_client_errors_are_not_retried() {
    let adapter = Arc::new(Scripted::new("gone", Behaviour::NotFound));
    let healthy: Arc<dyn SourceAdapter> = Arc::new(Scripted::new("ok", Behaviour::Names(vec!["Race"])));
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![adapter.clone(), healthy];

    let outcome = Collector::new(CollectConfig::default()).collect(&adapters).await.unwrap();
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.errors[0].kind, SourceErrorKind::Permanent);
    assert_eq!(outcome.errors[0].attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_body_is_permanent() {
    let http = FixedHttp::new(200, "   ");
    let adapters = vec![text_adapter("blank", http.clone())];
    let outcome = Collector::new(CollectConfig::default()).collect(&adapters).await.unwrap();
    assert_eq!(http.calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.errors[0].kind, SourceErrorKind::Permanent);
}

#[tokio::test(start_paused = true)]
async fn test_per_source_timeout_is_retried() {
    let slow = Arc::new(Scripted::new("slow", Behaviour::SleepThen(Duration::from_secs(60), vec!["Race"])));
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![slow.clone()];

    let outcome = Collector::new(CollectConfig::default()).collect(&adapters).await.unwrap();
    assert_eq!(slow.calls.load(Ordering::SeqCst), 3);
    assert!(outcome.candidates.is_empty());
    assert_eq!(outcome.errors[0].kind, SourceErrorKind::Transient);
    assert_eq!(outcome.errors[0].attempts, 3);
}

#[tokio::test(start_paused = true)]
async fn test_collection_timeout_cancels_backoff_and_keeps_finished_sources() {
    let failing = FixedHttp::new(503, "");
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        text_adapter("flaky", failing.clone()),
        Arc::new(Scripted::new("quick", Behaviour::Names(vec!["Race"]))),
    ];
    let config = CollectConfig {
        collection_timeout_seconds: 5.0,
        retry_backoff_seconds: 10.0,
        ..CollectConfig::default()
    };

    let started = tokio::time::Instant::now();
    let outcome = Collector::new(config).collect(&adapters).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(10));

    assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].kind, SourceErrorKind::Cancelled);
    assert_eq!(outcome.errors[0].attempts, 1);
    assert_eq!(outcome.candidates.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_collection_timeout_cancels_running_fetch() {
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(Scripted::new(
        "hung",
        Behaviour::SleepThen(Duration::from_secs(1000), vec!["Race"]),
    ))];
    let config = CollectConfig {
        per_source_timeout_seconds: 500.0,
        collection_timeout_seconds: 10.0,
        ..CollectConfig::default()
    };
    let outcome = Collector::new(config).collect(&adapters).await.unwrap();
    assert_eq!(outcome.errors[0].kind, SourceErrorKind::Cancelled);
    assert!(outcome.candidates.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_panicking_adapter_is_isolated() {
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(Scripted::new("buggy", Behaviour::Panic)),
        Arc::new(Scripted::new("ok", Behaviour::Names(vec!["Race"]))),
    ];
    let outcome = Collector::new(CollectConfig::default()).collect(&adapters).await.unwrap();
    assert_eq!(outcome.errors[0].source_id, "buggy");
    assert_eq!(outcome.errors[0].kind, SourceErrorKind::Panicked);
    assert!(outcome.errors[0].last_error.contains("adapter bug"));
    assert_eq!(outcome.candidates.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_every_adapter_panicking_is_fatal() {
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(Scripted::new("a", Behaviour::Panic)),
        Arc::new(Scripted::new("b", Behaviour::Panic)),
    ];
    let result = Collector::new(CollectConfig::default()).collect(&adapters).await;
    assert!(matches!(result, Err(ScraperError::AllSourcesPanicked(2))));
}

#[tokio::test]
async fn test_zero_adapters_is_fatal() {
    let result = Collector::new(CollectConfig::default()).collect(&[]).await;
    assert!(matches!(result, Err(ScraperError::NoSources)));
}

#[tokio::test(start_paused = true)]
async fn test_fetch_order_follows_adapter_order_not_completion() {
    let mut slow = Scripted::new("slow", Behaviour::SleepThen(Duration::from_secs(5), vec!["A", "B"]));
    slow.priority = 7;
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(slow),
        Arc::new(Scripted::new("fast", Behaviour::Names(vec!["C"]))),
    ];

    let outcome = Collector::new(CollectConfig::default()).collect(&adapters).await.unwrap();
    let order: Vec<(&str, u64, i32)> = outcome
        .candidates
        .iter()
        .map(|c| (c.raw_name.as_str(), c.fetch_order, c.source_priority))
        .collect();
    assert_eq!(order, vec![("A", 0, 7), ("B", 1, 7), ("C", 2, 0)]);
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_limit_of_one_still_collects_everything() {
    let adapters: Vec<Arc<dyn SourceAdapter>> = (0..3)
        .map(|_| {
            Arc::new(Scripted::new("s", Behaviour::SleepThen(Duration::from_secs(1), vec!["Race"])))
                as Arc<dyn SourceAdapter>
        })
        .collect();
    let config = CollectConfig { max_concurrent_sources: 1, ..CollectConfig::default() };
    let started = tokio::time::Instant::now();
    let outcome = Collector::new(config).collect(&adapters).await.unwrap();
    assert_eq!(outcome.candidates.len(), 3);
    assert!(started.elapsed() >= Duration::from_secs(3));
}
