use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a document left the pipeline before reaching a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DropReason {
    /// Fingerprint already seen.
    Duplicate,
    /// Shorter than the configured minimum (includes text emptied by normalization).
    TooShort,
    /// Too much punctuation relative to content.
    LowInformation,
    /// Rejected by the quality classifier.
    LowSemanticQuality,
    /// Harmful keyword veto during redaction.
    HarmfulContent,
    /// Language confidence below the configured minimum.
    LowLanguageConfidence,
    /// An oracle failed, timed out or panicked, or the shard write failed.
    StageFailure,
}

/// Accounting bucket a [`DropReason`] is counted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DropCategory {
    Duplicate,
    Short,
    LowQuality,
    Other,
}

impl DropReason {
    pub fn category(self) -> DropCategory {
        match self {
            DropReason::Duplicate => DropCategory::Duplicate,
            DropReason::TooShort => DropCategory::Short,
            DropReason::LowInformation | DropReason::LowSemanticQuality => DropCategory::LowQuality,
            DropReason::HarmfulContent
            | DropReason::LowLanguageConfidence
            | DropReason::StageFailure => DropCategory::Other,
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DropReason::Duplicate => "duplicate",
            DropReason::TooShort => "too_short",
            DropReason::LowInformation => "low_information",
            DropReason::LowSemanticQuality => "low_semantic_quality",
            DropReason::HarmfulContent => "harmful_content",
            DropReason::LowLanguageConfidence => "low_language_confidence",
            DropReason::StageFailure => "stage_failure",
        };
        f.write_str(s)
    }
}

/// Per-category document counters for one partition or a whole run.
///
/// `original_count == final_count + duplicates_removed + short_texts_removed
/// + low_quality_removed + other_removed` holds after every update, and
/// `other_removed` equals the sum of its three breakdown counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub original_count: u64,
    pub duplicates_removed: u64,
    pub short_texts_removed: u64,
    pub low_quality_removed: u64,
    pub other_removed: u64,
    pub final_count: u64,

    // Breakdown of `other_removed`.
    pub redaction_removed: u64,
    pub language_rejected: u64,
    pub stage_failures: u64,

    pub chunks_written: u64,
    pub files_read: u64,
    pub files_failed: u64,
}

impl PipelineStats {
    /// A document entered the pipeline.
    pub fn record_admitted(&mut self) {
        self.original_count += 1;
    }

    /// An admitted document was dropped.
    pub fn record_drop(&mut self, reason: DropReason) {
        match reason.category() {
            DropCategory::Duplicate => self.duplicates_removed += 1,
            DropCategory::Short => self.short_texts_removed += 1,
            DropCategory::LowQuality => self.low_quality_removed += 1,
            DropCategory::Other => {
                self.other_removed += 1;
                match reason {
                    DropReason::HarmfulContent => self.redaction_removed += 1,
                    DropReason::LowLanguageConfidence => self.language_rejected += 1,
                    _ => self.stage_failures += 1,
                }
            }
        }
    }

    /// An admitted document reached a shard as `chunks` lines.
    pub fn record_kept(&mut self, chunks: usize) {
        self.final_count += 1;
        self.chunks_written += chunks as u64;
    }

    pub fn total_removed(&self) -> u64 {
        self.duplicates_removed + self.short_texts_removed + self.low_quality_removed + self.other_removed
    }

    /// Whether the accounting identity holds.
    pub fn is_balanced(&self) -> bool {
        self.original_count == self.final_count + self.total_removed()
            && self.other_removed == self.redaction_removed + self.language_rejected + self.stage_failures
    }

    /// Fold another partition's counters into this one.
    pub fn merge(&mut self, other: &PipelineStats) {
        self.original_count += other.original_count;
        self.duplicates_removed += other.duplicates_removed;
        self.short_texts_removed += other.short_texts_removed;
        self.low_quality_removed += other.low_quality_removed;
        self.other_removed += other.other_removed;
        self.final_count += other.final_count;
        self.redaction_removed += other.redaction_removed;
        self.language_rejected += other.language_rejected;
        self.stage_failures += other.stage_failures;
        self.chunks_written += other.chunks_written;
        self.files_read += other.files_read;
        self.files_failed += other.files_failed;
    }
}
