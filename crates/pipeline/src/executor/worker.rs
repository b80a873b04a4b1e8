use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use sift_clean::Deduplicator;
use sift_core::{Document, DropReason, PipelineStats, SourceRef};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::cleaner::Cleaner;
use crate::partition::Partition;
use crate::report::PartitionReport;
use crate::shard::{shard_file_name, ShardWriter};

/// State owned by one partition task.
pub(super) struct PartitionWorker {
    pub cleaner: Arc<Cleaner>,
    pub shutdown: Arc<AtomicBool>,
    pub output_dir: PathBuf,
    pub dedup: Deduplicator,
}

#[derive(Debug, PartialEq, Eq)]
pub(super) enum FileOutcome {
    Done,
    Cancelled,
    Failed,
}

/// Documents prepared from one input file, held until the file has been read
/// to the end so that a failed read contributes nothing.
#[derive(Default)]
struct FileBatch {
    docs: Vec<Document>,
    stats: PipelineStats,
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

impl PartitionWorker {
    pub async fn run(mut self, partition: Partition) -> PartitionReport {
        let index = partition.index;
        let shard_path = self.output_dir.join(shard_file_name(index));

        let mut shard = match ShardWriter::create(&self.output_dir, index).await {
            Ok(shard) => shard,
            Err(e) => {
                error!(partition = index, shard = %shard_path.display(), error = %e, "cannot create shard");
                return PartitionReport::failed(index, shard_path, partition.files.len(), e.to_string());
            }
        };

        let mut stats = PipelineStats::default();
        let mut pending: Vec<Document> = Vec::with_capacity(self.cleaner.batch_size());
        let mut cancelled = false;

        for path in &partition.files {
            let outcome = match File::open(path).await {
                Ok(file) => {
                    self.ingest(index, path, BufReader::new(file), &mut pending, &mut shard, &mut stats)
                        .await
                }
                Err(e) => {
                    warn!(partition = index, file = %path.display(), error = %e, "unreadable input file, skipping");
                    FileOutcome::Failed
                }
            };
            match outcome {
                FileOutcome::Done => stats.files_read += 1,
                FileOutcome::Failed => stats.files_failed += 1,
                FileOutcome::Cancelled => {
                    cancelled = true;
                    break;
                }
            }
        }

        // Documents already admitted are finished even when cancelled.
        self.flush(&mut pending, &mut shard, &mut stats, true).await;

        let error = match shard.finish().await {
            Ok(_) => None,
            Err(e) => {
                error!(partition = index, error = %e, "failed to flush shard");
                Some(e.to_string())
            }
        };

        info!(
            partition = index,
            admitted = stats.original_count,
            kept = stats.final_count,
            chunks = stats.chunks_written,
            cancelled,
            "partition finished"
        );

        PartitionReport {
            index,
            shard: shard_path,
            files: partition.files.len(),
            stats,
            cancelled,
            error,
        }
    }

    /// Read one file and commit its documents to `pending` and `stats`,
    /// flushing full quality batches. A file that fails partway contributes
    /// nothing.
    pub(super) async fn ingest<R>(
        &mut self,
        index: usize,
        path: &Path,
        reader: R,
        pending: &mut Vec<Document>,
        shard: &mut ShardWriter,
        stats: &mut PipelineStats,
    ) -> FileOutcome
    where
        R: AsyncBufRead + Unpin,
    {
        let mut batch = FileBatch::default();
        let outcome = self.read_lines(index, path, reader, &mut batch).await;
        if outcome == FileOutcome::Failed {
            if batch.stats.original_count > 0 {
                warn!(
                    partition = index,
                    file = %path.display(),
                    discarded = batch.stats.original_count,
                    "discarding documents of partially read file"
                );
            }
            return outcome;
        }

        stats.merge(&batch.stats);
        pending.extend(batch.docs);
        self.flush(pending, shard, stats, false).await;
        outcome
    }

    /// Admit every non-blank line of `reader` into `batch`.
    async fn read_lines<R>(
        &mut self,
        index: usize,
        path: &Path,
        reader: R,
        batch: &mut FileBatch,
    ) -> FileOutcome
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.split(b'\n');
        let mut line = 0;
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return FileOutcome::Cancelled;
            }
            let raw = match lines.next_segment().await {
                Ok(Some(raw)) => raw,
                Ok(None) => return FileOutcome::Done,
                Err(e) => {
                    warn!(partition = index, file = %path.display(), line, error = %e, "read failed, skipping file");
                    return FileOutcome::Failed;
                }
            };
            line += 1;

            let text = String::from_utf8_lossy(&raw);
            if text.trim().is_empty() {
                continue;
            }

            batch.stats.record_admitted();
            let source = SourceRef {
                path: path.to_path_buf(),
                line,
            };
            let doc = Document::new(text.into_owned(), source.clone());
            match AssertUnwindSafe(self.cleaner.prepare(doc, &mut self.dedup))
                .catch_unwind()
                .await
            {
                Ok(Ok(doc)) => batch.docs.push(doc),
                Ok(Err(dropped)) => batch.stats.record_drop(dropped.reason),
                Err(panic) => {
                    warn!(%source, panic = panic_message(panic.as_ref()), "stage panicked, dropping document");
                    batch.stats.record_drop(DropReason::StageFailure);
                }
            }
        }
    }

    /// Score, chunk and write pending documents one quality batch at a time.
    /// Without `partial`, a trailing batch smaller than the batch size stays
    /// pending.
    async fn flush(
        &self,
        pending: &mut Vec<Document>,
        shard: &mut ShardWriter,
        stats: &mut PipelineStats,
        partial: bool,
    ) {
        let size = self.cleaner.batch_size();
        while pending.len() >= size || (partial && !pending.is_empty()) {
            let take = pending.len().min(size);
            let batch: Vec<Document> = pending.drain(..take).collect();
            self.finish_batch(batch, shard, stats).await;
        }
    }

    async fn finish_batch(&self, batch: Vec<Document>, shard: &mut ShardWriter, stats: &mut PipelineStats) {
        let count = batch.len();
        debug!(documents = count, "finishing batch");

        let outcomes = match AssertUnwindSafe(self.cleaner.finish(batch)).catch_unwind().await {
            Ok(outcomes) => outcomes,
            Err(panic) => {
                warn!(documents = count, panic = panic_message(panic.as_ref()), "batch panicked, dropping its documents");
                for _ in 0..count {
                    stats.record_drop(DropReason::StageFailure);
                }
                return;
            }
        };

        for outcome in outcomes {
            match outcome {
                Ok(doc) => match shard.write_chunks(&doc.chunks).await {
                    Ok(()) => stats.record_kept(doc.chunks.len()),
                    Err(e) => {
                        warn!(source = %doc.source, shard = %shard.path().display(), error = %e, "shard write failed");
                        stats.record_drop(DropReason::StageFailure);
                    }
                },
                Err(dropped) => stats.record_drop(dropped.reason),
            }
        }
    }
}
