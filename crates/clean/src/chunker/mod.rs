//! Sentence-aligned chunking under a token budget.
//!
//! Chunks never cut a sentence: joining a document's chunks with single
//! spaces gives back its segmented sentences joined the same way.

mod helpers;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sift_core::{Chunk, CleanerConfig, DocId};
use tracing::debug;

pub use helpers::estimate_tokens;
use helpers::{pack_sentences, Packed};

use crate::oracle::{guarded, OracleRegistry, SentenceSegmenter};

#[derive(Clone)]
pub struct Chunker {
    segmenters: HashMap<String, Arc<dyn SentenceSegmenter>>,
    max_tokens: usize,
    timeout: Option<Duration>,
}

impl Chunker {
    pub fn new(config: &CleanerConfig, registry: &OracleRegistry) -> Self {
        Self {
            segmenters: registry.segmenters.clone(),
            max_tokens: config.max_chunk_tokens,
            timeout: registry.timeout,
        }
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn supports(&self, language: &str) -> bool {
        self.segmenters.contains_key(&language.to_lowercase())
    }

    /// Split `text` into chunks for `doc_id`. Without a usable segmenter the
    /// whole text becomes one chunk flagged `degraded`.
    pub async fn chunk(&self, text: &str, language: &str, doc_id: DocId) -> Vec<Chunk> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let sentences = match self.segmenters.get(&language.to_lowercase()) {
            Some(segmenter) => match guarded(self.timeout, segmenter.split(text, language)).await {
                Ok(sentences) => sentences
                    .into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>(),
                Err(e) => {
                    debug!(%doc_id, language, error = %e, "segmenter failed, emitting single chunk");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        if sentences.is_empty() {
            return vec![self.whole(text, doc_id)];
        }

        pack_sentences(sentences, self.max_tokens)
            .into_iter()
            .enumerate()
            .map(|(index, Packed { content, tokens, oversized })| Chunk {
                index,
                content,
                token_estimate: tokens,
                doc_id,
                oversized,
                degraded: false,
            })
            .collect()
    }

    fn whole(&self, text: &str, doc_id: DocId) -> Chunk {
        let tokens = estimate_tokens(text);
        Chunk {
            index: 0,
            content: text.to_string(),
            token_estimate: tokens,
            doc_id,
            oversized: tokens > self.max_tokens,
            degraded: true,
        }
    }
}
