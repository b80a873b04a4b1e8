//! Parallel cleaning pipeline: partitions input files, runs every document
//! through the [`Cleaner`] stage chain and writes chunk shards.

pub mod cleaner;
pub mod executor;
pub mod partition;
pub mod report;
pub mod shard;
pub mod stage;

pub use cleaner::Cleaner;
pub use executor::Orchestrator;
pub use partition::{partition_files, Partition};
pub use report::{PartitionReport, RunReport};
pub use shard::{shard_file_name, ShardWriter};
pub use stage::{Dropped, Stage, StageOutcome};
