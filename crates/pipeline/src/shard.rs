use std::path::{Path, PathBuf};

use sift_core::{Chunk, SiftError};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Output file name for a partition.
pub fn shard_file_name(index: usize) -> String {
    format!("output_{index}")
}

/// Buffered writer for one partition's shard, one chunk per line.
pub struct ShardWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    lines: u64,
}

impl ShardWriter {
    pub async fn create(output_dir: &Path, index: usize) -> Result<Self, SiftError> {
        let path = output_dir.join(shard_file_name(index));
        let file = File::create(&path).await?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            lines: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Chunk text never holds a newline after normalization, so one chunk
    /// is exactly one line.
    pub async fn write_chunks(&mut self, chunks: &[Chunk]) -> Result<(), SiftError> {
        for chunk in chunks {
            self.writer.write_all(chunk.content.as_bytes()).await?;
            self.writer.write_all(b"\n").await?;
            self.lines += 1;
        }
        Ok(())
    }

    pub async fn finish(mut self) -> Result<u64, SiftError> {
        self.writer.flush().await?;
        Ok(self.lines)
    }
}
