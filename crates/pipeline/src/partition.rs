use std::path::PathBuf;

use sift_core::SiftError;

/// A disjoint share of the input files, processed by one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub index: usize,
    pub files: Vec<PathBuf>,
}

/// Deal `paths` round-robin into `min(n, paths.len())` partitions.
pub fn partition_files(paths: Vec<PathBuf>, n: usize) -> Result<Vec<Partition>, SiftError> {
    if paths.is_empty() {
        return Err(SiftError::InvalidConfig("no input files".into()));
    }
    if n == 0 {
        return Err(SiftError::InvalidConfig("partition count must be positive".into()));
    }

    let count = n.min(paths.len());
    let mut partitions: Vec<Partition> = (0..count)
        .map(|index| Partition {
            index,
            files: Vec::new(),
        })
        .collect();
    for (i, path) in paths.into_iter().enumerate() {
        partitions[i % count].files.push(path);
    }
    Ok(partitions)
}
