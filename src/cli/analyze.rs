use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use crate::cli::commands::AnalyzeArgs;
use crate::cli::progress::RunProgressDisplay;
use crate::collectors::{CollectorRegistry, FixtureCollector};
use crate::config::CostscopeConfig;
use crate::db::{Database, MemoryReportStore, ReportStore};
use crate::errors::CostscopeError;
use crate::models::{AnalysisRequest, ServiceScope, TimeWindow};
use crate::pipeline::{AnalysisEngine, EngineConfig};
use crate::reporting::{atomic_write, export_report, format_report_markdown, format_report_terminal, PersistedReport};

pub async fn handle_analyze(args: AnalyzeArgs, config: CostscopeConfig, quiet: bool) -> Result<(), CostscopeError> {
    let mut engine_config = EngineConfig::from_config(&config);
    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 {
            return Err(CostscopeError::InvalidRequest("--concurrency must be at least 1".into()));
        }
        engine_config.concurrency = concurrency;
    }

    let collectors = match &args.fixture {
        Some(path) => CollectorRegistry::new().with_default(Arc::new(FixtureCollector::load(Path::new(path))?)),
        None => CollectorRegistry::from_config(&config)?,
    };

    let store: Arc<dyn ReportStore> = if args.no_store {
        Arc::new(MemoryReportStore::new())
    } else {
        let path = args.db.clone().map(Into::into).unwrap_or_else(|| config.database_path());
        Arc::new(Database::new(&path)?)
    };

    let engine = AnalysisEngine::new(engine_config, collectors, store);
    let request = build_request(&args, engine.config())?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let orchestrator = engine
        .orchestrator(request)
        .with_cancel_token(cancel.clone())
        .with_event_channel(event_tx);

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling analysis");
            interrupt.cancel();
        }
    });

    let renderer = tokio::spawn(async move {
        let mut display = (!quiet).then(RunProgressDisplay::new);
        while let Some(event) = event_rx.recv().await {
            if let Some(display) = display.as_mut() {
                display.handle_event(&event);
            }
        }
    });

    let result = orchestrator.run().await;
    // Closing the event channel lets the renderer finish drawing
    drop(orchestrator);
    let _ = renderer.await;
    let outcome = result?;

    if let Some(path) = &args.output {
        export_report(&outcome.report, Path::new(path)).await?;
        info!(path = %path, "Wrote report");
    }
    if let Some(path) = &args.markdown {
        atomic_write(Path::new(path), &format_report_markdown(&outcome.report)).await?;
        info!(path = %path, "Wrote markdown summary");
    }

    if args.json {
        println!("{}", PersistedReport::from(&outcome.report).to_json_pretty()?);
    } else if !quiet {
        println!("{}", format_report_terminal(&outcome.report));
    }

    if let Some(key) = &outcome.key {
        info!(run_id = %key.run_id, version = key.version, hash = %key.content_hash, "Report published");
    }
    match outcome.store_error {
        Some(error) => Err(CostscopeError::StoreUnavailable(error)),
        None => Ok(()),
    }
}

fn build_request(args: &AnalyzeArgs, engine: &EngineConfig) -> Result<AnalysisRequest, CostscopeError> {
    let regions = (!args.regions.is_empty()).then(|| args.regions.clone());
    let window = match (args.start, args.end) {
        (Some(start), Some(end)) => Some(TimeWindow::new(start, end)),
        (None, None) => args.days.map(|days| TimeWindow::last_days(i64::from(days))),
        _ => {
            return Err(CostscopeError::InvalidRequest(
                "--start and --end must be given together".into(),
            ))
        }
    };
    Ok(engine.resolve_request(Some(ServiceScope::parse(&args.services)), regions, window, args.mode))
}
