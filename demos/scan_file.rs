//! Example: Scan a single upload against the configured platforms
//!
//! Usage:
//!   SPOTIFY_CLIENT_ID=... SPOTIFY_CLIENT_SECRET=... YOUTUBE_API_KEY=... \
//!   cargo run --example scan_file -- [--deep] [--config scan.json] <file>
//!
//! No fingerprint oracle is wired in; matches come from the filename hints
//! and platform searches.

use beatscan::{scan_upload, MatchAggregator, MetadataHints, PlatformCredentials, ScanConfig};
use std::env;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let mut config = ScanConfig::default();
    let mut deep = false;
    let mut file: Option<String> = None;

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--deep" => deep = true,
            "--config" => {
                let path = args.first().ok_or("--config requires a path")?.clone();
                args.remove(0);
                config = ScanConfig::from_json(&std::fs::read_to_string(path)?)?;
            }
            _ => file = Some(a),
        }
    }
    config.deep_scan |= deep;

    let Some(file) = file else {
        eprintln!("Usage: scan_file [--deep] [--config scan.json] <file>");
        std::process::exit(2);
    };

    let bytes = std::fs::read(&file)?;
    let extension = Path::new(&file)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_string);
    let hints = MetadataHints::from_filename(&file);

    let aggregator = MatchAggregator::from_credentials(&PlatformCredentials::from_env(), None, &config)?;
    let result = scan_upload(bytes, extension, &hints, &aggregator, &config).await?;

    println!("Scan Results:");
    println!("  Duration: {:.1}s", result.metrics.duration_seconds);
    println!("  Quality: {:.2}", result.metrics.quality_score);
    if let Some(bpm) = result.metrics.bpm {
        println!("  Tempo: {:.0} BPM", bpm);
    }
    println!("  Segments: {}", result.segments.len());
    println!("  Processing time: {} ms", result.metrics.processing_time_ms);

    for candidate in &result.matches {
        println!(
            "  {:5.1}  {} - {} [{}]{}",
            candidate.confidence,
            candidate.artist,
            candidate.title,
            candidate.source,
            candidate.url.as_deref().map(|u| format!(" {u}")).unwrap_or_default()
        );
    }
    for failure in &result.metrics.failures {
        eprintln!("  skipped {} ({}): {}", failure.source, failure.context, failure.message);
    }

    Ok(())
}
