//! sift-worker: cleans every file under an input directory into chunk shards.
//!
//! Environment:
//! - `SIFT_CONFIG`: optional TOML config file (env overrides still apply)
//! - `SIFT_INPUT_DIR`: directory walked recursively for input files
//! - `SIFT_OUTPUT_DIR`: shard directory, default `cleaned_data`
//!
//! Writes `output_<partition>` shards and `run_report.json` to the output
//! directory. Ctrl-C stops admitting documents and finishes pending batches.

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use anyhow::Context;
use tracing::{info, warn};
use walkdir::WalkDir;

use sift_clean::OracleRegistry;
use sift_core::config::load_dotenv;
use sift_core::CleanerConfig;
use sift_pipeline::Orchestrator;

const DEFAULT_OUTPUT_DIR: &str = "cleaned_data";
const REPORT_FILE: &str = "run_report.json";

fn input_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::var("SIFT_CONFIG") {
        Ok(path) if !path.is_empty() => {
            let config = CleanerConfig::from_file(&path)
                .with_context(|| format!("failed to load config from {path}"))?;
            info!(path = %path, "loaded cleaner config");
            config
        }
        _ => CleanerConfig::from_env().context("invalid cleaner configuration")?,
    };
    config.log_summary();

    let input_dir = std::env::var("SIFT_INPUT_DIR").context("SIFT_INPUT_DIR is not set")?;
    let output_dir = PathBuf::from(
        std::env::var("SIFT_OUTPUT_DIR")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
    );

    let files = input_files(Path::new(&input_dir));
    anyhow::ensure!(!files.is_empty(), "no input files under {input_dir}");
    info!(input = %input_dir, files = files.len(), "discovered input files");

    let registry = OracleRegistry::from_config(&config);
    let orchestrator = Orchestrator::from_config(config, registry)?;

    let shutdown = orchestrator.shutdown_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, finishing pending batches");
            shutdown.store(true, Ordering::Relaxed);
        }
    });

    let report = orchestrator.run(files, &output_dir).await?;
    let report_path = output_dir.join(REPORT_FILE);
    report
        .write_json(&report_path)
        .with_context(|| format!("failed to write {}", report_path.display()))?;

    info!(
        report = %report_path.display(),
        kept = report.stats.final_count,
        chunks = report.stats.chunks_written,
        cancelled = report.cancelled,
        "sift-worker exited cleanly"
    );
    Ok(())
}
