use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use rand::Rng;
use rust_decimal::{dec, Decimal};
use costscope::collectors::{Collector, CollectorRegistry, FixtureCollector};
use costscope::db::{Database, MemoryReportStore, ReportKey, ReportStore, StoredReport};
use costscope::errors::{CostscopeError, FailureKind, RetryConfig};
use costscope::models::{
    AnalysisMode, AnalysisRequest, CollectedData, ConsolidatedReport, PartitionKey, Priority,
    Recommendation, RunStatus, ServiceCost, ServiceScope, TimeWindow,
};
use costscope::pipeline::{AnalysisEngine, EngineConfig, RunState};

fn window() -> TimeWindow {
    TimeWindow::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
    )
}

fn fast_config(concurrency: usize) -> EngineConfig {
    EngineConfig {
        concurrency,
        retry: RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            attempt_timeout: Duration::from_millis(200),
        },
        ..EngineConfig::default()
    }
}

fn request(services: &[&str], regions: &[&str]) -> AnalysisRequest {
    AnalysisRequest::new(
        ServiceScope::services(services.iter().copied()),
        regions.iter().copied(),
        window(),
        AnalysisMode::Full,
    )
}

fn engine_with(collector: Arc<dyn Collector>, store: Arc<dyn ReportStore>, concurrency: usize) -> AnalysisEngine {
    AnalysisEngine::new(fast_config(concurrency), CollectorRegistry::new().with_default(collector), store)
}

fn fixture(json: &str) -> Arc<FixtureCollector> {
    Arc::new(FixtureCollector::from_json(json).unwrap())
}

const THREE_PARTITIONS: &str = r#"{
    "ec2@us-east-1": {"costs": [{"service_id": "ec2", "region_id": "us-east-1", "amount": 100, "currency": "USD"}]},
    "s3@us-east-1": {"costs": [{"service_id": "s3", "region_id": "us-east-1", "amount": 50, "currency": "USD"}]},
    "rds@us-east-1": {"error": {"kind": "permission_denied", "message": "AccessDenied"}}
}"#;

#[tokio::test]
async fn test_three_partition_partial_run() {
    let store = Arc::new(MemoryReportStore::new());
    let collector = fixture(THREE_PARTITIONS);
    let engine = engine_with(collector.clone(), store.clone(), 4);

    let outcome = engine
        .orchestrator(request(&["ec2", "s3", "rds"], &["us-east-1"]))
        .run()
        .await
        .unwrap();

    let report = &outcome.report;
    assert_eq!(outcome.status, RunStatus::Partial);
    assert_eq!(report.total_cost, dec!(150));
    assert_eq!(report.services_analyzed, 2);
    assert_eq!(report.partitions_total, 3);
    let failed: Vec<PartitionKey> = report.partitions_failed.iter().map(|p| p.key()).collect();
    assert_eq!(failed, vec![PartitionKey::new("rds", "us-east-1")]);
    assert_eq!(report.errors[0].kind, FailureKind::PermissionDenied);

    // Permanent failures are never retried
    assert_eq!(collector.calls("rds", "us-east-1"), 1);

    let latest = store.latest().unwrap().unwrap();
    assert_eq!(Some(&latest.key), outcome.key.as_ref());
    let document = latest.document().unwrap();
    assert_eq!(document.status, "partial");
    assert_eq!(document.summary.total_cost, dec!(150));
    assert_eq!(document.summary.partitions_failed, 1);
}

#[tokio::test]
async fn test_every_partition_reports_exactly_once() {
    let services = ["ec2", "s3", "rds", "lambda", "dynamodb", "sqs", "sns", "kms"];
    let regions = ["us-east-1", "us-west-2", "eu-west-1", "ap-south-1"];
    let store = Arc::new(MemoryReportStore::new());
    let collector = fixture("{}");
    let engine = engine_with(collector.clone(), store, 5);

    let orchestrator = engine.orchestrator(request(&services, &regions));
    let outcome = orchestrator.run().await.unwrap();

    assert_eq!(outcome.report.partitions_total, 32);
    assert!(outcome.report.partitions_failed.is_empty());
    let progress = orchestrator.progress().await;
    assert_eq!(progress.partitions_completed, 32);
    for service in services {
        for region in regions {
            assert_eq!(collector.calls(service, region), 1, "{}@{}", service, region);
        }
    }
}

#[tokio::test]
async fn test_transient_failures_recover() {
    let store = Arc::new(MemoryReportStore::new());
    let collector = fixture(
        r#"{
            "ec2@us-east-1": {
                "error": {"kind": "throttled"},
                "transient_attempts": 2,
                "then": {"costs": [{"service_id": "ec2", "region_id": "us-east-1", "amount": 7, "currency": "USD"}]}
            }
        }"#,
    );
    let engine = engine_with(collector.clone(), store, 2);

    let outcome = engine.orchestrator(request(&["ec2"], &["us-east-1"])).run().await.unwrap();
    assert_eq!(outcome.status, RunStatus::Succeeded);
    assert_eq!(outcome.report.total_cost, dec!(7));
    assert_eq!(collector.calls("ec2", "us-east-1"), 3);
}

struct Slow;

#[async_trait]
impl Collector for Slow {
    async fn collect(&self, service_id: &str, region_id: &str, _window: &TimeWindow) -> Result<CollectedData, CostscopeError> {
        if service_id == "glue" {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        Ok(CollectedData {
            costs: vec![ServiceCost::new(service_id, region_id, dec!(1), "USD")],
            ..CollectedData::default()
        })
    }

    fn name(&self) -> &str {
        "slow"
    }
}

#[tokio::test]
async fn test_timeouts_are_retried_then_reported() {
    let store = Arc::new(MemoryReportStore::new());
    let engine = engine_with(Arc::new(Slow), store, 2);

    let outcome = engine
        .orchestrator(request(&["athena", "glue"], &["us-east-1"]))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Partial);
    let error = &outcome.report.errors[0];
    assert_eq!(error.service_id, "glue");
    assert_eq!(error.kind, FailureKind::Exhausted);
    assert_eq!(error.attempts, 3);
    assert!(error.message.contains("did not respond"));
}

#[tokio::test]
async fn test_all_partitions_failing_keeps_previous_latest() {
    let store = Arc::new(MemoryReportStore::new());
    let good = engine_with(fixture(THREE_PARTITIONS), store.clone(), 2);
    let first = good.orchestrator(request(&["ec2"], &["us-east-1"])).run().await.unwrap();
    let first_key = first.key.unwrap();

    let bad = engine_with(
        fixture(r#"{
            "ec2@us-east-1": {"error": {"kind": "unsupported_region"}},
            "s3@us-east-1": {"error": {"kind": "permission_denied"}}
        }"#),
        store.clone(),
        2,
    );
    let orchestrator = bad.orchestrator(request(&["ec2", "s3"], &["us-east-1"]));
    let err = orchestrator.run().await.unwrap_err();

    assert!(matches!(err, CostscopeError::NoDataAvailable(_)));
    assert_eq!(orchestrator.progress().await.status, RunStatus::Failed);
    assert_eq!(store.latest().unwrap().unwrap().key, first_key);
    let saved = store.get_run(orchestrator.run_id()).unwrap().unwrap();
    assert_eq!(saved.status, RunStatus::Failed);
    assert_eq!(saved.partitions_failed, 2);
}

#[tokio::test]
async fn test_cost_beyond_decimal_range_fails_run() {
    let store = Arc::new(MemoryReportStore::new());
    let good = engine_with(fixture(THREE_PARTITIONS), store.clone(), 2);
    let first_key = good.orchestrator(request(&["ec2"], &["us-east-1"])).run().await.unwrap().key.unwrap();

    let huge = engine_with(
        fixture(r#"{
            "ec2@us-east-1": {"costs": [{"service_id": "ec2", "region_id": "us-east-1", "amount": "50000000000000000000000000000", "currency": "USD"}]},
            "ec2@eu-west-1": {"costs": [{"service_id": "ec2", "region_id": "eu-west-1", "amount": "50000000000000000000000000000", "currency": "USD"}]}
        }"#),
        store.clone(),
        2,
    );
    let orchestrator = huge.orchestrator(request(&["ec2"], &["us-east-1", "eu-west-1"]));
    let err = orchestrator.run().await.unwrap_err();

    assert!(matches!(err, CostscopeError::AmountOverflow(_)));
    assert_eq!(orchestrator.progress().await.status, RunStatus::Failed);
    assert_eq!(store.latest().unwrap().unwrap().key, first_key);
    assert_eq!(store.get_run(orchestrator.run_id()).unwrap().unwrap().status, RunStatus::Failed);
}

#[tokio::test]
async fn test_duplicate_recommendations_keep_highest_savings() {
    let store = Arc::new(MemoryReportStore::new());
    let collector = fixture(
        r#"{
            "ec2@us-east-1": {"recommendations": [{
                "resource_id": "i-1", "service_id": "ec2", "region_id": "us-east-1", "kind": "rightsizing",
                "estimated_monthly_savings": 10, "priority": "LOW", "finding": "oversized"
            }]},
            "ec2@eu-west-1": {"recommendations": [{
                "resource_id": "i-1", "service_id": "ec2", "region_id": "eu-west-1", "kind": "rightsizing",
                "estimated_monthly_savings": 25, "priority": "MEDIUM", "finding": "oversized"
            }]}
        }"#,
    );
    let engine = engine_with(collector, store, 2);

    let outcome = engine
        .orchestrator(request(&["ec2"], &["us-east-1", "eu-west-1"]))
        .run()
        .await
        .unwrap();

    let report = &outcome.report;
    assert_eq!(report.recommendations.len(), 1);
    assert_eq!(report.recommendations[0].estimated_monthly_savings, dec!(25));
    assert_eq!(report.total_potential_savings, dec!(25));
}

/// Returns a random spread of costs and recommendations after a random delay.
struct Jittery;

#[async_trait]
impl Collector for Jittery {
    async fn collect(&self, service_id: &str, region_id: &str, _window: &TimeWindow) -> Result<CollectedData, CostscopeError> {
        let delay = rand::thread_rng().gen_range(0..15);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        let seed = (service_id.len() * 31 + region_id.len() * 7) as i64;
        Ok(CollectedData {
            costs: vec![ServiceCost::new(service_id, region_id, Decimal::new(seed * 113, 2), "USD")],
            usage: vec![],
            recommendations: vec![Recommendation {
                resource_id: format!("{}-shared", service_id),
                service_id: service_id.to_string(),
                region_id: region_id.to_string(),
                kind: "idle".into(),
                estimated_monthly_savings: Decimal::new(seed * 17 % 50, 0),
                priority: Priority::Medium,
                finding: format!("idle in {}", region_id),
            }],
        })
    }

    fn name(&self) -> &str {
        "jittery"
    }
}

fn comparable(report: &ConsolidatedReport) -> ConsolidatedReport {
    let mut report = report.clone();
    report.run_id = String::new();
    report.generated_at = Utc.timestamp_opt(0, 0).unwrap();
    report
}

#[tokio::test]
async fn test_report_is_independent_of_completion_order() {
    let services = ["ec2", "s3", "rds", "lambda", "athena", "cloudfront"];
    let regions = ["us-east-1", "eu-west-1", "ap-south-1"];

    let mut reports = Vec::new();
    for concurrency in [1, 3, 18] {
        let engine = engine_with(Arc::new(Jittery), Arc::new(MemoryReportStore::new()), concurrency);
        let outcome = engine.orchestrator(request(&services, &regions)).run().await.unwrap();
        reports.push(comparable(&outcome.report));
    }

    assert_eq!(reports[0], reports[1]);
    assert_eq!(reports[1], reports[2]);
}

#[tokio::test]
async fn test_top_services_are_capped_and_descending() {
    let services = [
        "ec2", "lambda", "ecs", "eks", "batch", "s3", "ebs", "efs", "backup", "rds", "dynamodb", "elasticache",
    ];
    let entries: Vec<String> = services
        .iter()
        .enumerate()
        .map(|(i, svc)| {
            format!(
                r#""{svc}@us-east-1": {{"costs": [{{"service_id": "{svc}", "region_id": "us-east-1", "amount": {}, "currency": "USD"}}]}}"#,
                (i + 1) * 10
            )
        })
        .collect();
    let collector = fixture(&format!("{{{}}}", entries.join(",")));
    let engine = engine_with(collector, Arc::new(MemoryReportStore::new()), 4);

    let outcome = engine.orchestrator(request(&services, &["us-east-1"])).run().await.unwrap();
    let top = &outcome.report.top_cost_services;
    assert_eq!(top.len(), 10);
    assert!(top.windows(2).all(|w| w[0].amount > w[1].amount));
    assert_eq!(top[0].service_id, "elasticache");
    assert_eq!(outcome.report.by_service.len(), 12);
}

/// Records the highest number of simultaneous calls.
#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl Collector for Gauge {
    async fn collect(&self, _service_id: &str, _region_id: &str, _window: &TimeWindow) -> Result<CollectedData, CostscopeError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(CollectedData::default())
    }

    fn name(&self) -> &str {
        "gauge"
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_ceiling_holds_across_runs() {
    let gauge = Arc::new(Gauge::default());
    let engine = Arc::new(engine_with(gauge.clone(), Arc::new(MemoryReportStore::new()), 3));

    let first = engine.orchestrator(request(&["ec2", "s3", "rds", "sqs", "sns"], &["us-east-1", "eu-west-1"]));
    let second = engine.orchestrator(request(&["lambda", "ecs", "eks", "kms"], &["us-east-1", "eu-west-1"]));
    let (a, b) = tokio::join!(first.run(), second.run());

    assert_eq!(a.unwrap().status, RunStatus::Succeeded);
    assert_eq!(b.unwrap().status, RunStatus::Succeeded);
    let peak = gauge.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak concurrency {} exceeded ceiling", peak);
    assert!(peak >= 1);
}

/// Never finishes until the test drops it.
struct Stuck;

#[async_trait]
impl Collector for Stuck {
    async fn collect(&self, service_id: &str, region_id: &str, _window: &TimeWindow) -> Result<CollectedData, CostscopeError> {
        if service_id == "ec2" {
            return Ok(CollectedData {
                costs: vec![ServiceCost::new(service_id, region_id, dec!(1), "USD")],
                ..CollectedData::default()
            });
        }
        std::future::pending().await
    }

    fn name(&self) -> &str {
        "stuck"
    }
}

#[tokio::test]
async fn test_cancellation_discards_results_and_keeps_latest() {
    let store = Arc::new(MemoryReportStore::new());
    let previous = engine_with(fixture(THREE_PARTITIONS), store.clone(), 2)
        .orchestrator(request(&["s3"], &["us-east-1"]))
        .run()
        .await
        .unwrap();

    let mut config = fast_config(4);
    config.retry.attempt_timeout = Duration::from_secs(30);
    let engine = AnalysisEngine::new(
        config,
        CollectorRegistry::new().with_default(Arc::new(Stuck)),
        store.clone(),
    );
    let orchestrator = Arc::new(engine.orchestrator(request(&["ec2", "s3", "rds"], &["us-east-1"])));

    let runner = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.run().await })
    };
    // Wait for the one quick partition, then cancel while the others hang
    for _ in 0..200 {
        if orchestrator.progress().await.partitions_completed >= 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    orchestrator.cancel();

    let err = runner.await.unwrap().unwrap_err();
    assert!(matches!(err, CostscopeError::Cancelled(_)));
    assert_eq!(orchestrator.progress().await.status, RunStatus::Cancelled);
    assert!(RunStatus::Cancelled.is_failure());
    assert_eq!(store.latest().unwrap().unwrap().key, previous.key.unwrap());
    assert!(store.get_report(orchestrator.run_id()).unwrap().is_none());
}

/// A store whose publish always fails.
#[derive(Default)]
struct BrokenStore {
    inner: MemoryReportStore,
}

impl ReportStore for BrokenStore {
    fn publish(&self, _report: &ConsolidatedReport) -> Result<ReportKey, CostscopeError> {
        Err(CostscopeError::StoreUnavailable("disk full".into()))
    }

    fn replace_latest(&self, run_id: &str) -> Result<ReportKey, CostscopeError> {
        self.inner.replace_latest(run_id)
    }

    fn latest(&self) -> Result<Option<StoredReport>, CostscopeError> {
        self.inner.latest()
    }

    fn get_report(&self, run_id: &str) -> Result<Option<StoredReport>, CostscopeError> {
        self.inner.get_report(run_id)
    }

    fn save_run(&self, state: &RunState) -> Result<(), CostscopeError> {
        self.inner.save_run(state)
    }

    fn get_run(&self, run_id: &str) -> Result<Option<RunState>, CostscopeError> {
        self.inner.get_run(run_id)
    }

    fn list_runs(&self, limit: usize, offset: usize) -> Result<Vec<RunState>, CostscopeError> {
        self.inner.list_runs(limit, offset)
    }
}

#[tokio::test]
async fn test_store_failure_fails_run_but_returns_report() {
    let store = Arc::new(BrokenStore::default());
    let engine = engine_with(fixture(THREE_PARTITIONS), store.clone(), 2);

    let orchestrator = engine.orchestrator(request(&["ec2", "s3"], &["us-east-1"]));
    let outcome = orchestrator.run().await.unwrap();

    assert_eq!(outcome.status, RunStatus::Failed);
    assert!(outcome.key.is_none());
    assert!(outcome.store_error.unwrap().contains("disk full"));
    assert_eq!(outcome.report.total_cost, dec!(150));
    assert!(store.latest().unwrap().is_none());

    let saved = store.get_run(orchestrator.run_id()).unwrap().unwrap();
    assert_eq!(saved.status, RunStatus::Failed);
    assert!(saved.error.unwrap().contains("disk full"));
}

#[tokio::test]
async fn test_sqlite_store_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("runs.db");

    let run_id = {
        let store = Arc::new(Database::new(&path).unwrap());
        let engine = engine_with(fixture(THREE_PARTITIONS), store, 3);
        let orchestrator = engine.orchestrator(request(&["ec2", "s3", "rds"], &["us-east-1"]));
        orchestrator.run().await.unwrap();
        orchestrator.run_id().to_string()
    };

    let db = Database::new(&path).unwrap();
    let latest = db.latest().unwrap().unwrap();
    assert_eq!(latest.key.run_id, run_id);
    assert_eq!(latest.report.total_cost, dec!(150));
    let runs = db.list_runs(10, 0).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Partial);
    assert_eq!(runs[0].report_version, Some(latest.key.version));
}
