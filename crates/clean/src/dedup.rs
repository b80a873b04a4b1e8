//! Exact-duplicate elimination over content fingerprints.
//!
//! Memory grows with the number of distinct fingerprints (16 bytes each),
//! never with the volume of text seen.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};

/// First 128 bits of SHA-256 over the trimmed, lower-cased text.
pub type Fingerprint = u128;

/// Case-insensitive, surrounding-whitespace-insensitive content fingerprint.
pub fn fingerprint(text: &str) -> Fingerprint {
    let normalized = text.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    u128::from_be_bytes(bytes)
}

/// Fingerprint set shared by every partition of a run.
#[derive(Debug, Clone, Default)]
pub struct SharedFingerprints {
    inner: Arc<Mutex<HashSet<Fingerprint>>>,
}

impl SharedFingerprints {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, fp: Fingerprint) -> bool {
        // A poisoned set is still a valid set of fingerprints.
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(fp)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
enum Store {
    Local(HashSet<Fingerprint>),
    Shared(SharedFingerprints),
}

/// Streaming deduplicator. The first occurrence of a text wins.
#[derive(Debug)]
pub struct Deduplicator {
    store: Store,
    removed: usize,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Deduplicator {
    /// Deduplicator with its own private fingerprint set.
    pub fn new() -> Self {
        Self {
            store: Store::Local(HashSet::new()),
            removed: 0,
        }
    }

    /// Deduplicator backed by a set other deduplicators also write to.
    pub fn shared(fingerprints: SharedFingerprints) -> Self {
        Self {
            store: Store::Shared(fingerprints),
            removed: 0,
        }
    }

    /// Record `text` and report whether it was seen for the first time.
    pub fn is_first_occurrence(&mut self, text: &str) -> bool {
        let fp = fingerprint(text);
        let fresh = match &mut self.store {
            Store::Local(seen) => seen.insert(fp),
            Store::Shared(shared) => shared.insert(fp),
        };
        if !fresh {
            self.removed += 1;
        }
        fresh
    }

    /// Drop every text whose fingerprint was already seen, preserving order.
    /// Returns the survivors and how many were removed by this call.
    pub fn deduplicate(&mut self, texts: Vec<String>) -> (Vec<String>, usize) {
        let before = self.removed;
        let unique: Vec<String> = texts
            .into_iter()
            .filter(|text| self.is_first_occurrence(text))
            .collect();
        (unique, self.removed - before)
    }

    /// Total duplicates rejected over the lifetime of this deduplicator.
    pub fn removed(&self) -> usize {
        self.removed
    }

    /// Number of distinct fingerprints recorded.
    pub fn distinct(&self) -> usize {
        match &self.store {
            Store::Local(seen) => seen.len(),
            Store::Shared(shared) => shared.len(),
        }
    }
}
