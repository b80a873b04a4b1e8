use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sift_clean::OracleRegistry;
use sift_core::{CleanerConfig, SiftError};
use tracing::info;

use crate::cleaner::Cleaner;

/// Runs the cleaner over many files in parallel partitions.
pub struct Orchestrator {
    pub(super) cleaner: Arc<Cleaner>,
    /// Shutdown signal, checked by every partition before each document.
    pub(super) shutdown: Arc<AtomicBool>,
}

impl Orchestrator {
    pub fn new(cleaner: Cleaner) -> Self {
        Self {
            cleaner: Arc::new(cleaner),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use an externally owned shutdown flag.
    pub fn with_shutdown(cleaner: Cleaner, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            cleaner: Arc::new(cleaner),
            shutdown,
        }
    }

    pub fn from_config(config: CleanerConfig, registry: OracleRegistry) -> Result<Self, SiftError> {
        Ok(Self::new(Cleaner::new(config, registry)?))
    }

    pub fn cleaner(&self) -> &Cleaner {
        &self.cleaner
    }

    /// Ask every partition to stop after its current document.
    pub fn shutdown(&self) {
        info!("pipeline shutdown requested");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Get an Arc to the shutdown flag (for signal handlers).
    pub fn shutdown_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}
