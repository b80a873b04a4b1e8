//! Contracts for the external models the cleaning stages consult.
//!
//! An oracle is an opaque function (language identifier, entity recognizer,
//! quality classifier, sentence segmenter). Stages hold them as
//! `Arc<dyn …>` and share them read-only across partitions.

pub mod heuristic;
pub mod http;
mod registry;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use registry::OracleRegistry;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    #[error("oracle call timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("expected {expected} results, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("malformed oracle response: {0}")]
    Malformed(String),
}

/// Top-1 language label with its probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub language: String,
    pub confidence: f64,
}

/// A named entity found in text, e.g. `("Beijing", "GPE")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub category: String,
}

/// One classifier decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub score: f64,
}

/// What a stage needs from the oracle registry to run at full strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    LanguageDetection,
    EntityRecognition,
    QualityClassification,
    SentenceSegmentation,
}

#[async_trait]
pub trait LanguageOracle: Send + Sync {
    async fn detect(&self, text: &str) -> Result<Detection, OracleError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

#[async_trait]
pub trait EntityOracle: Send + Sync {
    async fn recognize(&self, text: &str, language: &str) -> Result<Vec<Entity>, OracleError>;
}

/// Binary text classifier. Returns one result per input text, in order.
#[async_trait]
pub trait QualityOracle: Send + Sync {
    async fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Classification>, OracleError>;
}

/// Splits text into sentences. The output covers the whole input, in order.
#[async_trait]
pub trait SentenceSegmenter: Send + Sync {
    async fn split(&self, text: &str, language: &str) -> Result<Vec<String>, OracleError>;
}

/// Await an oracle call, failing with [`OracleError::Timeout`] once `limit`
/// elapses. `None` waits indefinitely.
pub async fn guarded<T, F>(limit: Option<Duration>, call: F) -> Result<T, OracleError>
where
    F: Future<Output = Result<T, OracleError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(OracleError::Timeout(limit))),
        None => call.await,
    }
}
