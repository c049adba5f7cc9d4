//! demo - end-to-end synthetic run of the cable detection pipeline

use anyhow::{anyhow, Result};
use clap::Parser;
use std::time::Duration;

use cable_detect::capture::shared;
use cable_detect::{CableType, DetectionOutcome, DetectionSession, DetectorConfig, MockCamera};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of captures to run.
    #[arg(long, default_value_t = 12)]
    captures: usize,
    /// Confidence threshold for admission.
    #[arg(long, default_value_t = 0.6)]
    threshold: f32,
    /// Store capacity.
    #[arg(long, default_value_t = 8)]
    capacity: usize,
    /// Optional deterministic seed for the simulated backend.
    #[arg(long)]
    seed: Option<u64>,
    /// Simulated camera latency per capture in milliseconds.
    #[arg(long, default_value_t = 0)]
    capture_delay_ms: u64,
    /// Simulated model warm-up in milliseconds.
    #[arg(long, default_value_t = 200)]
    warm_up_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    if args.captures == 0 {
        return Err(anyhow!("captures must be >= 1"));
    }

    stage("configure simulated classifier + store");
    let mut config = DetectorConfig::default();
    config.confidence_threshold = args.threshold;
    config.store.capacity = args.capacity.max(1);
    config.backend.seed = args.seed;
    config.backend.warm_up = Duration::from_millis(args.warm_up_ms);
    config.validate()?;
    let session = DetectionSession::from_config(&config)?;

    stage("warm up model");
    session.classifier().warm_up().await?;

    stage("open camera");
    let camera = shared(
        MockCamera::new(CableType::UsbC)
            .with_capture_delay(Duration::from_millis(args.capture_delay_ms))
            .ready()?,
    );

    stage("capture + classify");
    let mut detected = 0usize;
    let mut rejected = 0usize;
    for i in 0..args.captures {
        let subject = CableType::ALL[i % CableType::ALL.len()];
        camera.lock().point_at(subject);
        let outcome = session.capture_and_detect(&camera).await;
        match &outcome {
            DetectionOutcome::Detected(result) => {
                detected += 1;
                let alternatives: Vec<String> = result
                    .alternatives()
                    .iter()
                    .map(|alt| format!("{} {:.0}%", alt.cable_type(), alt.confidence() * 100.0))
                    .collect();
                eprintln!(
                    "  #{:02} {}: {} [{}]",
                    i + 1,
                    result.detected_type(),
                    result.confidence_percentage(),
                    alternatives.join(", ")
                );
            }
            other => {
                rejected += 1;
                eprintln!("  #{:02} {}", i + 1, other.user_message());
            }
        }
    }
    camera.lock().stop();

    let store = session.store();
    let summary = store.summary();
    println!("demo summary:");
    println!("  captures: {}", args.captures);
    println!("  admitted: {}", detected);
    println!("  rejected: {}", rejected);
    println!("  stored: {} (capacity {})", summary.total, store.capacity());
    println!(
        "  bands: high {}, medium {}, low {}",
        summary.high, summary.medium, summary.low
    );
    match store.featured() {
        Some(featured) => println!(
            "  featured: {} ({})",
            featured.detected_type(),
            featured.confidence_percentage()
        ),
        None => println!("  featured: none"),
    }
    println!("  recent:");
    for result in store.recent_default() {
        println!(
            "    {} ({})",
            result.detected_type(),
            result.confidence_percentage()
        );
    }
    println!("next steps:");
    println!("  cargo run --bin cable_detect -- stub://usb-c stub://lightning --json");

    Ok(())
}

fn stage(msg: &str) {
    eprintln!("demo: {}", msg);
}
