//! cable_detect - classify USB cable photos
//!
//! Each path is captured through the file source (local paths or
//! `stub://<cable type>`), classified, gated and stored. Prints one line per
//! image, or a JSON report with `--json`.

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use cable_detect::capture::shared;
use cable_detect::{
    DetectionOutcome, DetectionResult, DetectionSession, DetectorConfig, FileImageSource,
    ImageSource, StoreSummary,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Image files (JPEG/PNG) or stub://<cable type>.
    #[arg(required = true)]
    images: Vec<String>,
    /// Config file (JSON or TOML). Defaults to CABLE_DETECT_CONFIG.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Confidence threshold override (0.0 - 1.0).
    #[arg(long)]
    threshold: Option<f32>,
    /// Backend override (simulated, mock, tract).
    #[arg(long)]
    backend: Option<String>,
    /// Deterministic seed for the simulated backend.
    #[arg(long)]
    seed: Option<u64>,
    /// Print a JSON report instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ImageReport {
    image: String,
    outcome: &'static str,
    message: String,
    result: Option<DetectionResult>,
}

#[derive(Serialize)]
struct Report {
    backend: &'static str,
    confidence_threshold: f32,
    images: Vec<ImageReport>,
    featured: Option<DetectionResult>,
    recent: Vec<DetectionResult>,
    summary: StoreSummary,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = build_config(&args)?;
    let session = DetectionSession::from_config(&config)?;

    log::info!(
        "classifier backend {} (threshold {:.2})",
        session.classifier().backend_name(),
        session.classifier().confidence_threshold()
    );
    session.classifier().warm_up().await?;

    let source = shared(FileImageSource::new(args.images.iter().cloned())?);
    let mut images = Vec::with_capacity(args.images.len());
    for image in &args.images {
        let outcome = session.capture_and_detect(&source).await;
        if !args.json {
            println!("{}: {}", image, outcome.user_message());
        }
        images.push(ImageReport {
            image: image.clone(),
            outcome: outcome_label(&outcome),
            message: outcome.user_message(),
            result: outcome.result().cloned().map(snapshot),
        });
    }
    {
        let source = source.lock();
        log::debug!("{} captured {:?}", source.name(), source.stats());
    }

    let store = session.store();
    if args.json {
        let report = Report {
            backend: session.classifier().backend_name(),
            confidence_threshold: session.classifier().confidence_threshold(),
            images,
            featured: store.featured().map(snapshot),
            recent: store.recent_default().into_iter().map(snapshot).collect(),
            summary: store.summary(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match store.featured() {
        Some(featured) => println!(
            "featured: {} ({})",
            featured.detected_type(),
            featured.confidence_percentage()
        ),
        None => println!("featured: none"),
    }
    let summary = store.summary();
    println!(
        "stored: {} (high {}, medium {}, low {})",
        summary.total, summary.high, summary.medium, summary.low
    );
    Ok(())
}

fn build_config(args: &Args) -> Result<DetectorConfig> {
    let mut config = match &args.config {
        Some(path) => DetectorConfig::load_with(Some(path))?,
        None => DetectorConfig::load()?,
    };
    if let Some(threshold) = args.threshold {
        config.confidence_threshold = threshold;
    }
    if let Some(backend) = &args.backend {
        config.backend.name = backend.to_ascii_lowercase();
    }
    if args.seed.is_some() {
        config.backend.seed = args.seed;
    }
    config.validate()?;
    Ok(config)
}

fn snapshot(result: Arc<DetectionResult>) -> DetectionResult {
    Arc::unwrap_or_clone(result)
}

fn outcome_label(outcome: &DetectionOutcome) -> &'static str {
    match outcome {
        DetectionOutcome::Detected(_) => "detected",
        DetectionOutcome::NoConfidentDetection { .. } => "low_confidence",
        DetectionOutcome::NoCableFound => "no_cable",
        DetectionOutcome::CaptureFailed(_) => "capture_failed",
        DetectionOutcome::Failed(_) => "failed",
    }
}
