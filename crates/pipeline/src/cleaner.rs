//! The stage chain applied to every document.
//!
//! Per-document stages run in [`Cleaner::prepare`]; quality scoring and
//! chunking run over a buffered batch in [`Cleaner::finish`], since the
//! quality classifier is called in batches.

use std::collections::HashSet;
use std::path::PathBuf;

use sift_clean::{
    Capability, Chunker, Deduplicator, LanguageDetector, NoiseFilter, Normalizer, OracleRegistry,
    QualityScorer, QualityVerdict, Redactor,
};
use sift_core::{CleanerConfig, Document, DropReason, PipelineStats, SiftError, SourceRef};
use tracing::{debug, warn};

use crate::stage::{Dropped, Stage, StageOutcome};

/// Every stage object of a run, built once and shared by all partitions.
pub struct Cleaner {
    config: CleanerConfig,
    normalizer: Normalizer,
    detector: LanguageDetector,
    redactor: Redactor,
    noise: NoiseFilter,
    quality: QualityScorer,
    chunker: Chunker,
    capabilities: HashSet<Capability>,
}

impl Cleaner {
    pub fn new(config: CleanerConfig, registry: OracleRegistry) -> Result<Self, SiftError> {
        config.validate()?;
        let redactor = Redactor::new(&config, &registry)
            .map_err(|e| SiftError::InvalidConfig(e.to_string()))?;
        let capabilities = [
            Capability::LanguageDetection,
            Capability::EntityRecognition,
            Capability::QualityClassification,
            Capability::SentenceSegmentation,
        ]
        .into_iter()
        .filter(|c| registry.has(*c))
        .collect();

        Ok(Self {
            normalizer: Normalizer::new(config.strip_special_chars).with_lowercase(config.lowercase),
            detector: LanguageDetector::from_registry(&registry),
            redactor,
            noise: NoiseFilter::new(&config),
            quality: QualityScorer::new(&config, &registry),
            chunker: Chunker::new(&config, &registry),
            capabilities,
            config,
        })
    }

    pub fn config(&self) -> &CleanerConfig {
        &self.config
    }

    /// Documents buffered before a quality batch is flushed.
    pub fn batch_size(&self) -> usize {
        self.quality.batch_size()
    }

    /// Stages whose oracle is missing and that will run in degraded mode.
    pub fn degraded_stages(&self) -> Vec<Stage> {
        Stage::ALL
            .into_iter()
            .filter(|stage| {
                stage
                    .required_capability()
                    .is_some_and(|c| !self.capabilities.contains(&c))
            })
            .collect()
    }

    fn reject(&self, doc: &Document, stage: Stage, reason: DropReason) -> Dropped {
        debug!(source = %doc.source, %stage, %reason, "document dropped");
        Dropped::new(stage, reason)
    }

    /// Normalize, deduplicate, detect, redact, denoise and apply the cheap
    /// filters. Stops at the first drop.
    pub async fn prepare(&self, mut doc: Document, dedup: &mut Deduplicator) -> StageOutcome {
        doc.text = self.normalizer.normalize(&doc.text);
        if doc.text.is_empty() {
            return Err(self.reject(&doc, Stage::Normalize, DropReason::TooShort));
        }

        if !dedup.is_first_occurrence(&doc.text) {
            return Err(self.reject(&doc, Stage::Deduplicate, DropReason::Duplicate));
        }

        let detection = self.detector.detect(&doc.text).await;
        doc.language = Some(detection.language);
        doc.confidence = detection.confidence;
        let min_confidence = self.config.min_language_confidence;
        if min_confidence > 0.0 && doc.confidence < min_confidence {
            return Err(self.reject(&doc, Stage::DetectLanguage, DropReason::LowLanguageConfidence));
        }

        match self.redactor.redact(&doc.text, doc.language_or_unknown()).await {
            Ok(redacted) if redacted.is_empty() => {
                return Err(self.reject(&doc, Stage::Redact, DropReason::HarmfulContent));
            }
            Ok(redacted) => doc.text = redacted,
            Err(e) => {
                warn!(source = %doc.source, error = %e, "entity redaction failed");
                return Err(self.reject(&doc, Stage::Redact, DropReason::StageFailure));
            }
        }

        doc.text = self.noise.remove_noise(&doc.text, doc.language_or_unknown());
        doc.text = self.noise.remove_stopwords(&doc.text, doc.language_or_unknown());
        if self.noise.is_too_short(&doc.text) {
            return Err(self.reject(&doc, Stage::FilterNoise, DropReason::TooShort));
        }
        if self.noise.is_low_information(&doc.text) {
            return Err(self.reject(&doc, Stage::FilterNoise, DropReason::LowInformation));
        }

        Ok(doc)
    }

    /// Quality-score a batch of prepared documents and chunk the survivors.
    /// Outcomes come back in input order.
    pub async fn finish(&self, docs: Vec<Document>) -> Vec<StageOutcome> {
        let verdicts = {
            let texts: Vec<&str> = docs.iter().map(|d| d.text.as_str()).collect();
            self.quality.score(&texts).await
        };

        let mut outcomes = Vec::with_capacity(docs.len());
        for (mut doc, verdict) in docs.into_iter().zip(verdicts) {
            let outcome = match verdict {
                QualityVerdict::Keep => {
                    doc.chunks = self.chunker.chunk(&doc.text, doc.language_or_unknown(), doc.id).await;
                    Ok(doc)
                }
                QualityVerdict::Reject => {
                    Err(self.reject(&doc, Stage::ScoreQuality, DropReason::LowSemanticQuality))
                }
                QualityVerdict::Failed => {
                    Err(self.reject(&doc, Stage::ScoreQuality, DropReason::StageFailure))
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Run the whole chain over in-memory texts with a private deduplicator.
    /// Returns the chunk contents in order and the run's counters.
    pub async fn process_texts(&self, texts: Vec<String>) -> (Vec<String>, PipelineStats) {
        let mut stats = PipelineStats::default();
        let mut dedup = Deduplicator::new();
        let mut prepared = Vec::new();

        for (i, text) in texts.into_iter().enumerate() {
            stats.record_admitted();
            let source = SourceRef {
                path: PathBuf::from("<memory>"),
                line: i + 1,
            };
            match self.prepare(Document::new(text, source), &mut dedup).await {
                Ok(doc) => prepared.push(doc),
                Err(dropped) => stats.record_drop(dropped.reason),
            }
        }

        let mut chunks = Vec::new();
        for batch in prepared.chunks(self.batch_size()) {
            for outcome in self.finish(batch.to_vec()).await {
                match outcome {
                    Ok(doc) => {
                        stats.record_kept(doc.chunks.len());
                        chunks.extend(doc.chunks.into_iter().map(|c| c.content));
                    }
                    Err(dropped) => stats.record_drop(dropped.reason),
                }
            }
        }
        (chunks, stats)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use sift_clean::{Classification, Entity, EntityOracle, OracleError, QualityOracle};

    use super::*;

    struct Names;

    #[async_trait]
    impl EntityOracle for Names {
        async fn recognize(&self, text: &str, _language: &str) -> Result<Vec<Entity>, OracleError> {
            Ok(["Alice", "Bob"]
                .iter()
                .filter(|n| text.contains(*n))
                .map(|n| Entity {
                    text: n.to_string(),
                    category: "PERSON".into(),
                })
                .collect())
        }
    }

    struct Down;

    #[async_trait]
    impl EntityOracle for Down {
        async fn recognize(&self, _text: &str, _language: &str) -> Result<Vec<Entity>, OracleError> {
            Err(OracleError::Unavailable("down".into()))
        }
    }

    struct RejectShort;

    #[async_trait]
    impl QualityOracle for RejectShort {
        async fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Classification>, OracleError> {
            Ok(texts
                .iter()
                .map(|t| Classification {
                    label: if t.len() > 40 { "LABEL_1" } else { "LABEL_0" }.into(),
                    score: 0.99,
                })
                .collect())
        }
    }

    fn local() -> OracleRegistry {
        OracleRegistry::from_config(&CleanerConfig::default())
    }

    fn cleaner(registry: OracleRegistry) -> Cleaner {
        Cleaner::new(CleanerConfig::default(), registry).unwrap()
    }

    fn doc(text: &str) -> Document {
        Document::new(
            text,
            SourceRef {
                path: PathBuf::from("unit.txt"),
                line: 1,
            },
        )
    }

    #[tokio::test]
    async fn prepare_cleans_and_annotates() {
        let c = cleaner(local());
        let mut dedup = Deduplicator::new();
        let out = c
            .prepare(doc("<p>Contact me at john@example.com today</p>"), &mut dedup)
            .await
            .unwrap();
        assert_eq!(out.text, "Contact me at [email_REDACTED] today");
        assert_eq!(out.language.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn drop_reasons_per_stage() {
        let c = cleaner(local());
        let mut dedup = Deduplicator::new();
        let cases = [
            ("<br/>   ", Stage::Normalize, DropReason::TooShort),
            ("Hi there", Stage::FilterNoise, DropReason::TooShort),
            ("a.b.c.d.e.f.g.h.i.j.!!!!!!!!!!!!!!", Stage::FilterNoise, DropReason::LowInformation),
            ("Incitement to violence is never acceptable", Stage::Redact, DropReason::HarmfulContent),
        ];
        for (text, stage, reason) in cases {
            let dropped = c.prepare(doc(text), &mut dedup).await.unwrap_err();
            assert_eq!(dropped, Dropped::new(stage, reason), "for {text:?}");
        }

        let text = "A perfectly ordinary sentence about weather.";
        assert!(c.prepare(doc(text), &mut dedup).await.is_ok());
        let dup = c.prepare(doc(text), &mut dedup).await.unwrap_err();
        assert_eq!(dup.reason, DropReason::Duplicate);
    }

    #[tokio::test]
    async fn entity_failure_is_stage_failure() {
        let c = cleaner(local().with_entities("en", Arc::new(Down)));
        let mut dedup = Deduplicator::new();
        let dropped = c
            .prepare(doc("Alice met someone in the park yesterday."), &mut dedup)
            .await
            .unwrap_err();
        assert_eq!(dropped, Dropped::new(Stage::Redact, DropReason::StageFailure));
    }

    #[tokio::test]
    async fn low_language_confidence_rejected() {
        let config = CleanerConfig {
            min_language_confidence: 0.9,
            ..CleanerConfig::default()
        };
        let c = Cleaner::new(config, local()).unwrap();
        let mut dedup = Deduplicator::new();
        // The script fallback always reports 0.8.
        let dropped = c
            .prepare(doc("Some plain English text that is long enough."), &mut dedup)
            .await
            .unwrap_err();
        assert_eq!(dropped.reason, DropReason::LowLanguageConfidence);
    }

    #[tokio::test]
    async fn process_texts_balances_stats() {
        let c = cleaner(local().with_entities("en", Arc::new(Names)).with_quality(Arc::new(RejectShort)));
        let texts = vec![
            "Alice and Bob walked along the river for a long while.".to_string(),
            "Alice and Bob walked along the river for a long while.".to_string(),
            "Short one".to_string(),
            "Medium length line of text.".to_string(),
            "Terrorism is discussed here at great length by experts.".to_string(),
        ];
        let (chunks, stats) = c.process_texts(texts).await;

        assert_eq!(
            chunks,
            vec!["[PERSON_REDACTED] and [PERSON_REDACTED] walked along the river for a long while."]
        );
        assert_eq!(stats.original_count, 5);
        assert_eq!(stats.final_count, 1);
        assert_eq!(stats.duplicates_removed, 1);
        assert_eq!(stats.short_texts_removed, 1);
        assert_eq!(stats.low_quality_removed, 1);
        assert_eq!(stats.redaction_removed, 1);
        assert!(stats.is_balanced());
    }

    #[test]
    fn degraded_stages_follow_registry() {
        let bare = cleaner(OracleRegistry::new());
        assert_eq!(
            bare.degraded_stages(),
            vec![Stage::DetectLanguage, Stage::Redact, Stage::ScoreQuality, Stage::Chunk]
        );
        let local = cleaner(local());
        assert_eq!(local.degraded_stages(), vec![Stage::Redact, Stage::ScoreQuality]);
    }

    #[test]
    fn invalid_config_rejected() {
        let config = CleanerConfig {
            max_chunk_tokens: 0,
            ..CleanerConfig::default()
        };
        assert!(matches!(
            Cleaner::new(config, OracleRegistry::new()),
            Err(SiftError::InvalidConfig(_))
        ));
    }
}
