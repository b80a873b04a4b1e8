//! Parallel execution over file partitions.
//!
//! Split into focused submodules:
//! - `core`: Orchestrator struct, constructor and shutdown signalling
//! - `execution`: partitioning, task spawning, join barrier and stats merge
//! - `worker`: the per-partition read/clean/write loop

mod core;
mod execution;
mod worker;

pub use self::core::Orchestrator;
