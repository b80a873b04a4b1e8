use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use sift_clean::{Deduplicator, SharedFingerprints};
use sift_core::{DedupScope, PipelineStats, SiftError};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::worker::PartitionWorker;
use super::Orchestrator;
use crate::partition::partition_files;
use crate::report::{PartitionReport, RunReport};
use crate::shard::shard_file_name;

impl Orchestrator {
    /// Clean `files` into `output_dir/output_<partition>`.
    ///
    /// Fails only before processing starts (no files, unusable output
    /// directory). Problems with individual files or documents are counted
    /// in the report instead.
    pub async fn run(&self, files: Vec<PathBuf>, output_dir: &Path) -> Result<RunReport, SiftError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let config = self.cleaner.config();

        let partitions = partition_files(files, config.partitions)?;
        tokio::fs::create_dir_all(output_dir).await?;

        for stage in self.cleaner.degraded_stages() {
            warn!(%stage, "no oracle configured, stage runs degraded");
        }

        let permits = match config.max_concurrent_partitions {
            0 => partitions.len(),
            n => n.min(partitions.len()),
        };
        let semaphore = Arc::new(Semaphore::new(permits));
        let shared = match config.dedup_scope {
            DedupScope::Global => Some(SharedFingerprints::new()),
            DedupScope::Partition => None,
        };

        info!(
            %run_id,
            partitions = partitions.len(),
            concurrency = permits,
            dedup_scope = ?config.dedup_scope,
            output = %output_dir.display(),
            "pipeline run starting"
        );

        let mut handles = Vec::with_capacity(partitions.len());
        for partition in partitions {
            let worker = PartitionWorker {
                cleaner: Arc::clone(&self.cleaner),
                shutdown: Arc::clone(&self.shutdown),
                output_dir: output_dir.to_path_buf(),
                dedup: match &shared {
                    Some(fingerprints) => Deduplicator::shared(fingerprints.clone()),
                    None => Deduplicator::new(),
                },
            };
            let semaphore = Arc::clone(&semaphore);
            let meta = (partition.index, partition.files.len());
            let handle = tokio::spawn(async move {
                // The semaphore is never closed, so acquiring cannot fail.
                let _permit = semaphore.acquire_owned().await.ok();
                worker.run(partition).await
            });
            handles.push((meta, handle));
        }

        // Join barrier: every partition finishes before stats are merged.
        let mut reports = Vec::with_capacity(handles.len());
        for ((index, files), handle) in handles {
            let report = match handle.await {
                Ok(report) => report,
                Err(e) => {
                    error!(partition = index, error = %e, "partition task failed");
                    PartitionReport::failed(index, output_dir.join(shard_file_name(index)), files, e.to_string())
                }
            };
            reports.push(report);
        }

        let mut stats = PipelineStats::default();
        for report in &reports {
            stats.merge(&report.stats);
        }
        let cancelled = self.is_shutdown() || reports.iter().any(|r| r.cancelled);

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            stats,
            partitions: reports,
            cancelled,
        };

        info!(
            %run_id,
            original = report.stats.original_count,
            duplicates = report.stats.duplicates_removed,
            short = report.stats.short_texts_removed,
            low_quality = report.stats.low_quality_removed,
            other = report.stats.other_removed,
            kept = report.stats.final_count,
            failed_partitions = report.failed_partitions(),
            cancelled,
            "pipeline run finished"
        );
        if !report.stats.is_balanced() {
            error!(%run_id, "stats do not balance");
        }

        Ok(report)
    }
}
