//! Cleaning stages for raw corpus text.
//!
//! Each stage is a standalone component that the pipeline wires together in
//! a fixed order:
//!
//! - [`normalize`]: URL/markup/control-character removal, whitespace collapse.
//! - [`dedup`]: exact duplicate elimination over 128-bit content fingerprints.
//! - [`language`]: language detection with a primary and a fallback oracle.
//! - [`redact`]: pattern and entity redaction plus the harmful-keyword veto.
//! - [`noise`]: cross-language noise removal, short and low-information filters.
//! - [`quality`]: batched semantic-quality classification.
//! - [`chunker`]: sentence-aligned, token-budgeted chunking.
//!
//! Models are never implemented here. Stages call them through the traits in
//! [`oracle`] and degrade gracefully when one is not configured.

pub mod chunker;
pub mod dedup;
pub mod language;
pub mod noise;
pub mod normalize;
pub mod oracle;
pub mod quality;
pub mod redact;
pub mod script;

pub use chunker::{estimate_tokens, Chunker};
pub use dedup::{fingerprint, Deduplicator, Fingerprint, SharedFingerprints};
pub use language::LanguageDetector;
pub use noise::NoiseFilter;
pub use normalize::{normalize, Normalizer};
pub use oracle::{
    Capability, Classification, Detection, Entity, EntityOracle, LanguageOracle, OracleError,
    OracleRegistry, QualityOracle, SentenceSegmenter,
};
pub use quality::{QualityScorer, QualityVerdict};
pub use redact::{PatternError, Redactor, SensitivePatternSet};
