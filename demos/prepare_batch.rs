//! Example: Prepare multiple uploads in parallel
//!
//! Usage:
//!   cargo run --release --example prepare_batch -- [--jobs N] [--json] [--deep] <file1> <file2> ...
//!
//! Runs the synchronous half of a scan (preprocessing, segment selection,
//! features) and prints per-file diagnostics. No network access.
//!
//! Notes:
//! - Parallelism is across files. Each file is still prepared on one thread.
//! - Default workers: (available CPU threads - 1), keeping one core free for the system.

use beatscan::{prepare_scan, ScanConfig};
use rayon::prelude::*;
use serde::Serialize;
use std::env;
use std::path::Path;
use std::time::Instant;

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1).max(1))
        .unwrap_or(1)
}

#[derive(Serialize)]
struct ItemOut {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_seconds: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bpm: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality_score: Option<f32>,
    segments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    processing_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn prepare_file(path: &str, config: &ScanConfig) -> ItemOut {
    let started = Instant::now();
    let extension = Path::new(path).extension().and_then(|e| e.to_str());

    let result = std::fs::read(path)
        .map_err(|e| format!("read failed: {e}"))
        .and_then(|bytes| prepare_scan(&bytes, extension, config).map_err(|e| format!("prepare failed: {e}")));

    match result {
        Ok(prepared) => ItemOut {
            file: path.to_string(),
            duration_seconds: Some(prepared.metrics.duration_seconds),
            bpm: prepared.metrics.bpm,
            quality_score: Some(prepared.metrics.quality_score),
            segments: prepared.segments.iter().map(|p| p.segment.name.clone()).collect(),
            processing_ms: Some(started.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => ItemOut {
            file: path.to_string(),
            duration_seconds: None,
            bpm: None,
            quality_score: None,
            segments: Vec::new(),
            processing_ms: None,
            error: Some(e),
        },
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut json = false;
    let mut jobs: Option<usize> = None;
    let mut config = ScanConfig::default();
    let mut paths: Vec<String> = Vec::new();

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--deep" => config.deep_scan = true,
            "--jobs" => {
                let v = args
                    .first()
                    .ok_or("--jobs requires a value")?
                    .parse::<usize>()?;
                args.remove(0);
                jobs = Some(std::cmp::max(1, v));
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: prepare_batch [--jobs N] [--json] [--deep] <file1> <file2> ...\n\
                     \n\
                     --jobs N   Parallel workers (default: CPU-1)\n\
                     --json     Emit one JSON object per line (JSONL)\n\
                     --deep     Select the deep-scan segment set\n"
                );
                return Ok(());
            }
            _ => paths.push(a),
        }
    }

    if paths.is_empty() {
        eprintln!("ERROR: Provide at least one audio file path. Use --help for usage.");
        std::process::exit(2);
    }

    let jobs = jobs.unwrap_or_else(default_jobs);
    eprintln!("Batch: {} files, jobs={}", paths.len(), jobs);

    let t0 = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;

    let outs: Vec<ItemOut> = pool.install(|| paths.par_iter().map(|path| prepare_file(path, &config)).collect());

    for (idx, o) in outs.iter().enumerate() {
        if json {
            println!("{}", serde_json::to_string(o)?);
        } else if let Some(error) = &o.error {
            println!("[{}/{}] {}: ERROR: {}", idx + 1, outs.len(), o.file, error);
        } else {
            println!(
                "[{}/{}] {}: {:.1}s BPM={} quality={:.2} segments={}",
                idx + 1,
                outs.len(),
                o.file,
                o.duration_seconds.unwrap_or(0.0),
                o.bpm.map(|b| format!("{b:.0}")).unwrap_or_else(|| "-".to_string()),
                o.quality_score.unwrap_or(0.0),
                o.segments.join(",")
            );
        }
    }

    let ok = outs.iter().filter(|o| o.error.is_none()).count();
    eprintln!(
        "Done: ok={}/{} wall={:.0}ms",
        ok,
        outs.len(),
        t0.elapsed().as_secs_f64() * 1000.0
    );

    Ok(())
}
