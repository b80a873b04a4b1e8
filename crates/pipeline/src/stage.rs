use std::fmt;

use serde::{Deserialize, Serialize};
use sift_clean::Capability;
use sift_core::{Document, DropReason};

/// Cleaning stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Normalize,
    Deduplicate,
    DetectLanguage,
    Redact,
    FilterNoise,
    ScoreQuality,
    Chunk,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Normalize,
        Stage::Deduplicate,
        Stage::DetectLanguage,
        Stage::Redact,
        Stage::FilterNoise,
        Stage::ScoreQuality,
        Stage::Chunk,
    ];

    /// Oracle capability the stage needs to run at full strength. Stages
    /// without one are pure.
    pub fn required_capability(self) -> Option<Capability> {
        match self {
            Stage::DetectLanguage => Some(Capability::LanguageDetection),
            Stage::Redact => Some(Capability::EntityRecognition),
            Stage::ScoreQuality => Some(Capability::QualityClassification),
            Stage::Chunk => Some(Capability::SentenceSegmentation),
            Stage::Normalize | Stage::Deduplicate | Stage::FilterNoise => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Normalize => "normalize",
            Stage::Deduplicate => "deduplicate",
            Stage::DetectLanguage => "detect_language",
            Stage::Redact => "redact",
            Stage::FilterNoise => "filter_noise",
            Stage::ScoreQuality => "score_quality",
            Stage::Chunk => "chunk",
        };
        f.write_str(s)
    }
}

/// A document that left the pipeline, and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dropped {
    pub stage: Stage,
    pub reason: DropReason,
}

impl Dropped {
    pub fn new(stage: Stage, reason: DropReason) -> Self {
        Self { stage, reason }
    }
}

pub type StageOutcome = Result<Document, Dropped>;
