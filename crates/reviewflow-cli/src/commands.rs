use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, info_span};

use reviewflow_cli::config::{CollectorSource, Config, NotifyConfig};
use reviewflow_model::{PipelineRun, ScoredRestaurant, StagingReport};
use reviewflow_pipeline::{
    FanOutSink, FileSink, GooglePlacesCollector, LocalTransformEngine, LogSink, Orchestrator,
    SharedCollector, SharedEngine, SnapshotCollector, TransformEngine, WebhookSink,
};
use reviewflow_score::stage_and_score;

use crate::cli::{RunArgs, ScoreArgs};

/// Everything `reviewflow run` prints after the pipeline returns.
pub struct RunReport {
    pub run: PipelineRun,
    pub city: String,
    pub top_n: usize,
    pub mart: Vec<ScoredRestaurant>,
    pub staging: Option<StagingReport>,
}

pub struct ScoreReport {
    pub city: String,
    pub limit: usize,
    pub mart: Vec<ScoredRestaurant>,
    pub staging: StagingReport,
}

pub fn run_pipeline(args: &RunArgs) -> Result<RunReport> {
    let mut config = Config::load_or_default(args.config.as_deref())?;
    config.apply(args.overrides());
    config.validate()?;

    let collector = build_collector(&config)?;
    let engine = Arc::new(LocalTransformEngine::new());
    let sink = build_sink(&config.notify)?;
    let shared_engine: SharedEngine = engine.clone();
    let mut orchestrator = Orchestrator::new(
        config.pipeline.clone(),
        collector,
        shared_engine,
        Arc::new(sink),
    )
    .context("invalid pipeline options")?;

    let run = orchestrator.run();
    // A failed collect or transform leaves no mart to show.
    let mart = engine.mart().ok().unwrap_or_default();
    let staging = engine.staging_report().ok().flatten();
    Ok(RunReport {
        run,
        city: config.pipeline.city,
        top_n: config.pipeline.top_n,
        mart,
        staging,
    })
}

pub fn score_snapshot(args: &ScoreArgs) -> Result<ScoreReport> {
    let span = info_span!("score", snapshot = %args.snapshot.display());
    let _guard = span.enter();
    let start = Instant::now();
    let batch = read_snapshot(&args.snapshot)?;
    let output = stage_and_score(&batch.restaurants, &batch.reviews);
    info!(
        restaurants = output.mart.len(),
        reviews = output.report.reviews_kept,
        duration_ms = start.elapsed().as_millis(),
        "snapshot scored"
    );
    Ok(ScoreReport {
        city: batch.city,
        limit: args.limit,
        mart: output.mart,
        staging: output.report,
    })
}

fn read_snapshot(path: &Path) -> Result<reviewflow_pipeline::CollectedBatch> {
    SnapshotCollector::new(path)
        .read()
        .with_context(|| format!("failed to load snapshot {}", path.display()))
}

fn build_collector(config: &Config) -> Result<SharedCollector> {
    match config.collector.source {
        CollectorSource::Snapshot => {
            let path = config
                .collector
                .snapshot
                .clone()
                .context("snapshot source selected without a path")?;
            Ok(Arc::new(SnapshotCollector::new(path)))
        }
        CollectorSource::GooglePlaces => {
            let collector = GooglePlacesCollector::from_env()
                .context("Google Places collector unavailable")?
                .with_language(config.collector.language.clone());
            Ok(Arc::new(collector))
        }
    }
}

fn build_sink(config: &NotifyConfig) -> Result<FanOutSink> {
    let mut sink = FanOutSink::new();
    if config.log {
        sink = sink.with(LogSink);
    }
    if let Some(dir) = &config.directory {
        sink = sink.with(FileSink::new(dir.clone()));
    }
    if let Some(url) = &config.webhook_url {
        let webhook = WebhookSink::new(url.clone())
            .with_context(|| format!("invalid webhook url {url}"))?;
        sink = sink.with(webhook);
    }
    if sink.is_empty() {
        anyhow::bail!("no notification target configured");
    }
    Ok(sink)
}
