//! End-to-end pipeline tests over the in-memory graph store
//!
//! Bus, resolver, enumeration tool and notification API are replaced by
//! recording doubles; everything between them is the production code path.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use scan_fleet::db::schemas::{
    ClaimDoc, DetailTables, DmarcSummaryDoc, DomainDoc, FullPassRow, OrgDetails, OrgDoc, OrgLocale, SelectorDoc,
};
use scan_fleet::dns::LivenessProbe;
use scan_fleet::graph::{GraphStore, InMemoryGraphStore, Upserted};
use scan_fleet::nats::{ChangeAlert, DiscoveryRequest, Publisher, ScanRequest};
use scan_fleet::notify::{DeliveryReport, NotificationDispatcher, Notifier};
use scan_fleet::reconcile::{DiscoveryReconciler, EnumerationOutcome, Enumerator, SelectorReconciler};
use scan_fleet::scan::{DomainScanner, ScanDispatcher};
use scan_fleet::services::{ChangeAlertService, DnsScanService, DomainDiscoveryService};
use scan_fleet::worker::{serve, Delivery, MessageHandler};
use scan_fleet::{Result, WorkerError};

// ============================================================================
// Test doubles
// ============================================================================

struct StaticProbe(HashSet<String>);

impl StaticProbe {
    fn live(names: &[&str]) -> Arc<Self> {
        Arc::new(Self(names.iter().map(|s| s.to_string()).collect()))
    }
}

#[async_trait]
impl LivenessProbe for StaticProbe {
    async fn is_live(&self, hostname: &str) -> bool {
        self.0.contains(hostname)
    }
}

#[derive(Default)]
struct RecordingPublisher {
    published: Mutex<Vec<(String, Value)>>,
}

impl RecordingPublisher {
    async fn published(&self) -> Vec<(String, Value)> {
        self.published.lock().await.clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<()> {
        let value = serde_json::from_slice(&payload)?;
        self.published.lock().await.push((subject.to_string(), value));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingScanner {
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

#[async_trait]
impl DomainScanner for RecordingScanner {
    async fn scan_domain(&self, domain: &str, dkim_selectors: &[String]) -> Result<Value> {
        self.calls
            .lock()
            .await
            .push((domain.to_string(), dkim_selectors.to_vec()));
        Ok(json!({
            "dmarc": { "records": ["v=DMARC1; p=reject"] },
            "spf": { "records": ["v=spf1 -all"] },
            "mx": { "error": "missing" },
            "dkim": {},
        }))
    }
}

struct FixedEnumerator(&'static str);

#[async_trait]
impl Enumerator for FixedEnumerator {
    async fn enumerate(&self, _root: &str, output: &Path) -> EnumerationOutcome {
        match tokio::fs::write(output, self.0).await {
            Ok(()) => EnumerationOutcome::Completed,
            Err(e) => EnumerationOutcome::ToolFailed(e.to_string()),
        }
    }
}

#[derive(Default)]
struct FlakyNotifier {
    failing: Vec<String>,
    attempts: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for FlakyNotifier {
    async fn send_email(&self, email: &str, _template_id: &str, _personalisation: &Value) -> Result<String> {
        self.attempts.lock().await.push(email.to_string());
        if self.failing.iter().any(|f| f == email) {
            return Err(WorkerError::Notification(format!("{} rejected", email)));
        }
        Ok(format!("receipt-{}", email))
    }
}

/// In-memory store whose Nth `link_selector` or `claim_domain` call fails
struct FailingStore {
    inner: InMemoryGraphStore,
    fail_link_on: Option<usize>,
    fail_claim_on: Option<usize>,
    link_calls: AtomicUsize,
    claim_calls: AtomicUsize,
}

impl FailingStore {
    fn new(inner: &InMemoryGraphStore) -> Self {
        Self {
            inner: inner.clone(),
            fail_link_on: None,
            fail_claim_on: None,
            link_calls: AtomicUsize::new(0),
            claim_calls: AtomicUsize::new(0),
        }
    }

    fn fails_at(calls: &AtomicUsize, fail_on: Option<usize>) -> Result<()> {
        let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
        if fail_on == Some(call) {
            return Err(WorkerError::Database("connection reset".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl GraphStore for FailingStore {
    async fn find_domain(&self, hostname: &str) -> Result<Option<DomainDoc>> {
        self.inner.find_domain(hostname).await
    }

    async fn tracked_selectors(&self, domain_id: &str) -> Result<Vec<SelectorDoc>> {
        self.inner.tracked_selectors(domain_id).await
    }

    async fn summary_selector_entries(&self, domain_id: &str) -> Result<Vec<String>> {
        self.inner.summary_selector_entries(domain_id).await
    }

    async fn upsert_selector(&self, selector: &str) -> Result<Upserted<SelectorDoc>> {
        self.inner.upsert_selector(selector).await
    }

    async fn link_selector(&self, domain_id: &str, selector_id: &str) -> Result<bool> {
        Self::fails_at(&self.link_calls, self.fail_link_on)?;
        self.inner.link_selector(domain_id, selector_id).await
    }

    async fn claimed_domains(&self, org_id: &str) -> Result<HashSet<String>> {
        self.inner.claimed_domains(org_id).await
    }

    async fn find_or_insert_domain(&self, hostname: &str) -> Result<Upserted<DomainDoc>> {
        self.inner.find_or_insert_domain(hostname).await
    }

    async fn claim_domain(&self, org_id: &str, domain_id: &str) -> Result<Upserted<ClaimDoc>> {
        Self::fails_at(&self.claim_calls, self.fail_claim_on)?;
        self.inner.claim_domain(org_id, domain_id).await
    }
}

fn is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

fn summary(entries: &[&str]) -> DmarcSummaryDoc {
    DmarcSummaryDoc {
        id: "dmarcSummaries/1".into(),
        detail_tables: DetailTables {
            full_pass: entries
                .iter()
                .map(|e| FullPassRow {
                    dkim_selectors: Some(e.to_string()),
                })
                .collect(),
        },
    }
}

fn delivery<T: serde::Serialize>(subject: &str, body: &T) -> Delivery {
    Delivery::new(subject, serde_json::to_vec(body).unwrap())
}

// ============================================================================
// Scan pipeline
// ============================================================================

struct ScanFixture {
    store: InMemoryGraphStore,
    scanner: Arc<RecordingScanner>,
    publisher: Arc<RecordingPublisher>,
    service: Arc<DnsScanService>,
}

async fn scan_fixture(live: &[&str]) -> ScanFixture {
    let store = InMemoryGraphStore::new();
    let domain = store.insert_domain("example.org").await;
    store
        .add_dmarc_summary(&domain.id, "2024-02-01", summary(&["sel1"]))
        .await;

    let scanner = Arc::new(RecordingScanner::default());
    let publisher = Arc::new(RecordingPublisher::default());
    let service = Arc::new(DnsScanService::new(
        SelectorReconciler::new(Arc::new(store.clone()), StaticProbe::live(live)),
        ScanDispatcher::new(scanner.clone(), publisher.clone(), "domains", Duration::from_secs(5)),
    ));

    ScanFixture {
        store,
        scanner,
        publisher,
        service,
    }
}

fn scan_request() -> ScanRequest {
    ScanRequest {
        domain: "example.org".into(),
        user_key: Some("u1".into()),
        shared_id: Some("s1".into()),
    }
}

#[tokio::test]
async fn test_scan_new_summary_selector_is_tracked_and_scanned() {
    let fixture = scan_fixture(&["sel1._domainkey.example.org", "*._domainkey.example.org"]).await;
    let domain = fixture.store.find_domain("example.org").await.unwrap().unwrap();

    fixture
        .service
        .handle(delivery("domains.example", &scan_request()))
        .await
        .unwrap();

    assert_eq!(fixture.store.selectors_for("example.org").await, vec!["*", "sel1"]);
    assert_eq!(fixture.store.domain_selector_edge_count().await, 2);

    let calls = fixture.scanner.calls.lock().await.clone();
    assert_eq!(calls.len(), 1);
    let scanned: BTreeSet<_> = calls[0].1.iter().cloned().collect();
    assert_eq!(scanned, BTreeSet::from(["*".to_string(), "sel1".to_string()]));

    let published = fixture.publisher.published().await;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, format!("domains.{}.dns", domain.key));
    assert_eq!(published[0].1["domain"], "example.org");
    assert_eq!(published[0].1["domain_key"], domain.key);
    assert_eq!(published[0].1["user_key"], "u1");
    assert_eq!(published[0].1["shared_id"], "s1");
}

#[tokio::test]
async fn test_scan_non_live_selector_is_not_persisted() {
    let fixture = scan_fixture(&["sel1._domainkey.example.org"]).await;

    fixture.service.process(&scan_request()).await.unwrap();

    assert_eq!(fixture.store.selectors_for("example.org").await, vec!["sel1"]);
    let calls = fixture.scanner.calls.lock().await.clone();
    assert_eq!(calls[0].1, vec!["sel1"]);
}

#[tokio::test]
async fn test_scan_replay_never_duplicates_selectors_or_edges() {
    let fixture = scan_fixture(&["sel1._domainkey.example.org", "*._domainkey.example.org"]).await;

    let deliveries: Vec<Delivery> = (0..5)
        .map(|_| delivery("domains.example", &scan_request()))
        .collect();
    let handler: Arc<dyn MessageHandler> = fixture.service.clone();
    let stats = serve(
        futures_util::stream::iter(deliveries),
        handler,
        std::future::pending::<()>(),
    )
    .await;

    assert_eq!(stats.received, 5);
    assert_eq!(stats.succeeded, 5);
    assert_eq!(fixture.store.selector_count().await, 2);
    assert_eq!(fixture.store.domain_selector_edge_count().await, 2);
    assert_eq!(fixture.publisher.published().await.len(), 5);
}

#[tokio::test]
async fn test_scan_unknown_domain_publishes_nothing() {
    let fixture = scan_fixture(&[]).await;
    let request = ScanRequest {
        domain: "unknown.org".into(),
        user_key: None,
        shared_id: None,
    };

    let err = fixture.service.process(&request).await.unwrap_err();

    assert!(matches!(err, WorkerError::NotFound(_)));
    assert!(fixture.publisher.published().await.is_empty());
    assert!(fixture.scanner.calls.lock().await.is_empty());
}

#[tokio::test]
async fn test_scan_store_failure_keeps_earlier_links_and_publishes_nothing() {
    let store = InMemoryGraphStore::new();
    let domain = store.insert_domain("example.org").await;
    store
        .add_dmarc_summary(&domain.id, "2024-02-01", summary(&["sel1,sel2"]))
        .await;

    // Candidates are probed in order "*", "sel1", "sel2"; the second link fails
    let failing = FailingStore {
        fail_link_on: Some(2),
        ..FailingStore::new(&store)
    };
    let scanner = Arc::new(RecordingScanner::default());
    let publisher = Arc::new(RecordingPublisher::default());
    let service = DnsScanService::new(
        SelectorReconciler::new(
            Arc::new(failing),
            StaticProbe::live(&[
                "*._domainkey.example.org",
                "sel1._domainkey.example.org",
                "sel2._domainkey.example.org",
            ]),
        ),
        ScanDispatcher::new(scanner.clone(), publisher.clone(), "domains", Duration::from_secs(5)),
    );

    let err = service.process(&scan_request()).await.unwrap_err();

    assert!(matches!(err, WorkerError::Database(_)));
    assert_eq!(store.selectors_for("example.org").await, vec!["*"]);
    assert_eq!(store.domain_selector_edge_count().await, 1);
    assert!(scanner.calls.lock().await.is_empty());
    assert!(publisher.published().await.is_empty());
}

#[tokio::test]
async fn test_malformed_payload_does_not_stop_the_worker() {
    let fixture = scan_fixture(&["sel1._domainkey.example.org"]).await;
    let deliveries = vec![
        Delivery::new("domains.example", "not json"),
        delivery("domains.example", &scan_request()),
    ];

    let handler: Arc<dyn MessageHandler> = fixture.service.clone();
    let stats = serve(
        futures_util::stream::iter(deliveries),
        handler,
        std::future::pending::<()>(),
    )
    .await;

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.succeeded, 1);
    assert_eq!(fixture.publisher.published().await.len(), 1);
}

// ============================================================================
// Discovery pipeline
// ============================================================================

fn discovery_service(
    store: &InMemoryGraphStore,
    probe: Arc<StaticProbe>,
    output: &'static str,
    dir: &Path,
    publisher: Arc<RecordingPublisher>,
) -> DomainDiscoveryService {
    let reconciler = DiscoveryReconciler::new(
        Arc::new(store.clone()),
        probe,
        Arc::new(FixedEnumerator(output)),
        dir,
    );
    DomainDiscoveryService::new(reconciler, publisher, "domains")
}

#[tokio::test]
async fn test_discovery_claimed_and_dead_candidates_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let store = InMemoryGraphStore::new();
    let a = store.insert_domain("a.gc.ca").await;
    store.claim_domain("orgs/5", &a.id).await.unwrap();

    let publisher = Arc::new(RecordingPublisher::default());
    let service = discovery_service(
        &store,
        StaticProbe::live(&["a.gc.ca"]),
        "a.gc.ca\nb.gc.ca\n",
        dir.path(),
        publisher.clone(),
    );

    let request = DiscoveryRequest {
        domain: "gc.ca".into(),
        org_id: "orgs/5".into(),
    };
    let published = service.process(&request).await.unwrap();

    assert_eq!(published, 0);
    assert_eq!(store.domain_count().await, 1);
    assert_eq!(store.claims().await.len(), 1);
    assert!(publisher.published().await.is_empty());
    assert!(is_empty(dir.path()));
}

#[tokio::test]
async fn test_discovery_publishes_each_admitted_domain() {
    let dir = tempfile::tempdir().unwrap();
    let store = InMemoryGraphStore::new();
    let publisher = Arc::new(RecordingPublisher::default());
    let service = discovery_service(
        &store,
        StaticProbe::live(&["a.gc.ca", "b.gc.ca"]),
        "a.gc.ca\nb.gc.ca\nc.gc.ca\n",
        dir.path(),
        publisher.clone(),
    );

    let handled = service
        .handle(delivery(
            "domains.gc.discovery",
            &json!({ "domain": "gc.ca", "orgId": "5" }),
        ))
        .await;
    assert!(handled.is_ok());

    let published = publisher.published().await;
    assert_eq!(published.len(), 2);
    for (subject, body) in &published {
        let key = body["domain_key"].as_str().unwrap();
        assert_eq!(subject, &format!("domains.{}", key));
        assert_eq!(body["selectors"], json!([]));
    }

    let claims = store.claims().await;
    assert_eq!(claims.len(), 2);
    assert!(claims.iter().all(|c| c.from == "orgs/5" && !c.hidden));
    assert!(claims.iter().all(|c| c.tags[0].en == "NEW" && c.tags[0].fr == "NOUVEAU"));
}

#[tokio::test]
async fn test_discovery_replay_never_duplicates_domains_or_claims() {
    let dir = tempfile::tempdir().unwrap();
    let store = InMemoryGraphStore::new();
    let publisher = Arc::new(RecordingPublisher::default());
    let service = discovery_service(
        &store,
        StaticProbe::live(&["a.gc.ca"]),
        "a.gc.ca\n",
        dir.path(),
        publisher.clone(),
    );
    let request = DiscoveryRequest {
        domain: "gc.ca".into(),
        org_id: "orgs/5".into(),
    };

    assert_eq!(service.process(&request).await.unwrap(), 1);
    assert_eq!(service.process(&request).await.unwrap(), 0);

    assert_eq!(store.domain_count().await, 1);
    assert_eq!(store.claims().await.len(), 1);
    assert_eq!(publisher.published().await.len(), 1);
}

#[tokio::test]
async fn test_discovery_store_failure_keeps_earlier_domains_and_removes_output() {
    let dir = tempfile::tempdir().unwrap();
    let store = InMemoryGraphStore::new();
    let failing = FailingStore {
        fail_claim_on: Some(2),
        ..FailingStore::new(&store)
    };
    let publisher = Arc::new(RecordingPublisher::default());
    let reconciler = DiscoveryReconciler::new(
        Arc::new(failing),
        StaticProbe::live(&["a.gc.ca", "b.gc.ca"]),
        Arc::new(FixedEnumerator("a.gc.ca\nb.gc.ca\n")),
        dir.path(),
    );
    let service = DomainDiscoveryService::new(reconciler, publisher.clone(), "domains");

    let request = DiscoveryRequest {
        domain: "gc.ca".into(),
        org_id: "orgs/5".into(),
    };
    let err = service.process(&request).await.unwrap_err();

    assert!(matches!(err, WorkerError::Database(_)));
    assert_eq!(store.domain_count().await, 2);
    assert_eq!(store.claims().await.len(), 1);
    assert_eq!(store.claims().await[0].from, "orgs/5");
    assert!(publisher.published().await.is_empty());
    assert!(is_empty(dir.path()));
}

#[tokio::test]
async fn test_discovery_invalid_org_id_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = InMemoryGraphStore::new();
    let publisher = Arc::new(RecordingPublisher::default());
    let service = discovery_service(&store, StaticProbe::live(&[]), "", dir.path(), publisher);

    let request = DiscoveryRequest {
        domain: "gc.ca".into(),
        org_id: "domains/5".into(),
    };
    let err = service.process(&request).await.unwrap_err();

    assert!(matches!(err, WorkerError::BadRequest(_)));
}

// ============================================================================
// Change alerts
// ============================================================================

fn change_alert() -> ChangeAlert {
    ChangeAlert {
        domain: "mail.gc.ca".into(),
        record_type: "MX".into(),
        org: OrgDoc {
            id: "orgs/5".into(),
            key: "5".into(),
            org_details: OrgDetails {
                en: OrgLocale {
                    name: "Org".into(),
                    acronym: "ORG".into(),
                },
                fr: OrgLocale {
                    name: "Org FR".into(),
                    acronym: "ORGFR".into(),
                },
            },
        },
        prev_val: json!("good-value 0"),
        current_val: json!("other-value 0"),
    }
}

#[tokio::test]
async fn test_change_alert_failure_isolated_to_one_recipient() {
    let notifier = Arc::new(FlakyNotifier {
        failing: vec!["two@gc.ca".into()],
        ..Default::default()
    });
    let service = ChangeAlertService::new(NotificationDispatcher::new(
        notifier.clone(),
        vec!["one@gc.ca".into(), "two@gc.ca".into(), "three@gc.ca".into()],
        "template-1",
    ));

    let report = service.process(&change_alert()).await;

    assert_eq!(report, DeliveryReport { sent: 2, failed: 1 });
    assert_eq!(
        *notifier.attempts.lock().await,
        vec!["one@gc.ca", "two@gc.ca", "three@gc.ca"]
    );
}

#[tokio::test]
async fn test_change_alert_handler_accepts_bus_payload() {
    let notifier = Arc::new(FlakyNotifier::default());
    let service = ChangeAlertService::new(NotificationDispatcher::new(
        notifier.clone(),
        vec!["one@gc.ca".into()],
        "template-1",
    ));

    service
        .handle(delivery("domains.mail.asset-change", &change_alert()))
        .await
        .unwrap();

    assert_eq!(notifier.attempts.lock().await.len(), 1);
}
