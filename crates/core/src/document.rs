use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique document identifier, assigned at ingestion.
pub type DocId = Uuid;

/// Language code used before detection has run or when every oracle failed.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Where a document came from: input file and 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub path: PathBuf,
    pub line: usize,
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

/// A single line of raw corpus text moving through the cleaning stages.
///
/// Stages rewrite `text` in place and annotate `language`/`confidence`.
/// Chunks are attached by the final stage right before the shard write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub source: SourceRef,
    pub text: String,
    /// `None` until language detection has run.
    pub language: Option<String>,
    pub confidence: f64,
    pub chunks: Vec<Chunk>,
}

impl Document {
    pub fn new(text: impl Into<String>, source: SourceRef) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            text: text.into(),
            language: None,
            confidence: 0.0,
            chunks: Vec::new(),
        }
    }

    /// Detected language, or `"unknown"` when detection has not produced one.
    pub fn language_or_unknown(&self) -> &str {
        self.language.as_deref().unwrap_or(UNKNOWN_LANGUAGE)
    }
}

/// A length-bounded piece of a document's cleaned text.
///
/// Chunks only carry their parent's id; they are written independently of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// 0-based index within the parent document.
    pub index: usize,
    pub content: String,
    pub token_estimate: usize,
    pub doc_id: DocId,
    /// A single sentence larger than the token budget.
    pub oversized: bool,
    /// Produced without a sentence segmenter (whole text as one chunk).
    pub degraded: bool,
}
