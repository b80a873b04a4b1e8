use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sift_core::{PipelineStats, SiftError};
use uuid::Uuid;

/// What one partition did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionReport {
    pub index: usize,
    pub shard: PathBuf,
    pub files: usize,
    pub stats: PipelineStats,
    /// Stopped early because shutdown was requested.
    pub cancelled: bool,
    /// Set when the partition failed as a whole and contributed nothing.
    pub error: Option<String>,
}

impl PartitionReport {
    pub fn failed(index: usize, shard: PathBuf, files: usize, error: impl Into<String>) -> Self {
        Self {
            index,
            shard,
            files,
            stats: PipelineStats::default(),
            cancelled: false,
            error: Some(error.into()),
        }
    }
}

/// Summary of a whole run, written as `run_report.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stats: PipelineStats,
    pub partitions: Vec<PartitionReport>,
    pub cancelled: bool,
}

impl RunReport {
    pub fn failed_partitions(&self) -> usize {
        self.partitions.iter().filter(|p| p.error.is_some()).count()
    }

    pub fn write_json(&self, path: &Path) -> Result<(), SiftError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
