//! Batched semantic-quality classification.

use std::sync::Arc;
use std::time::Duration;

use sift_core::CleanerConfig;
use tracing::warn;

use crate::oracle::{guarded, Classification, OracleError, OracleRegistry, QualityOracle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityVerdict {
    Keep,
    Reject,
    /// The batch holding this text could not be classified.
    Failed,
}

#[derive(Clone)]
pub struct QualityScorer {
    oracle: Option<Arc<dyn QualityOracle>>,
    threshold: f64,
    batch_size: usize,
    positive_label: String,
    timeout: Option<Duration>,
}

impl QualityScorer {
    pub fn new(config: &CleanerConfig, registry: &OracleRegistry) -> Self {
        Self {
            oracle: registry.quality.clone(),
            threshold: config.quality_threshold,
            batch_size: config.quality_batch_size.max(1),
            positive_label: config.quality_positive_label.clone(),
            timeout: registry.timeout,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn is_degraded(&self) -> bool {
        self.oracle.is_none()
    }

    fn decide(&self, c: &Classification) -> QualityVerdict {
        // NaN compares false, so it rejects.
        if c.label == self.positive_label && c.score >= self.threshold {
            QualityVerdict::Keep
        } else {
            QualityVerdict::Reject
        }
    }

    /// One verdict per input, in order. Texts are sent in batches of at most
    /// `batch_size`; a failed batch fails every text in it.
    pub async fn score(&self, texts: &[&str]) -> Vec<QualityVerdict> {
        let Some(oracle) = &self.oracle else {
            return vec![QualityVerdict::Keep; texts.len()];
        };

        let mut verdicts = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let result = guarded(self.timeout, oracle.classify_batch(batch))
                .await
                .and_then(|labels| {
                    if labels.len() == batch.len() {
                        Ok(labels)
                    } else {
                        Err(OracleError::LengthMismatch {
                            expected: batch.len(),
                            actual: labels.len(),
                        })
                    }
                });
            match result {
                Ok(labels) => verdicts.extend(labels.iter().map(|c| self.decide(c))),
                Err(e) => {
                    warn!(batch = batch.len(), error = %e, "quality batch failed");
                    verdicts.extend(std::iter::repeat(QualityVerdict::Failed).take(batch.len()));
                }
            }
        }
        verdicts
    }

    /// Keep texts judged high quality. Returns the survivors and how many
    /// were removed, failed batches included.
    pub async fn filter(&self, texts: Vec<String>) -> (Vec<String>, usize) {
        let verdicts = {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            self.score(&refs).await
        };
        let before = texts.len();
        let kept: Vec<String> = texts
            .into_iter()
            .zip(verdicts)
            .filter(|(_, v)| *v == QualityVerdict::Keep)
            .map(|(t, _)| t)
            .collect();
        let removed = before - kept.len();
        (kept, removed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    /// Positive with high confidence iff the text mentions "good".
    struct KeywordClassifier {
        calls: AtomicUsize,
        largest_batch: AtomicUsize,
    }

    impl KeywordClassifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                largest_batch: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl QualityOracle for KeywordClassifier {
        async fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Classification>, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.largest_batch.fetch_max(texts.len(), Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("good") {
                        Classification { label: "LABEL_1".into(), score: 0.9 }
                    } else if t.contains("meh") {
                        Classification { label: "LABEL_1".into(), score: 0.5 }
                    } else {
                        Classification { label: "LABEL_0".into(), score: 0.95 }
                    }
                })
                .collect())
        }
    }

    struct ShortChanged;

    #[async_trait]
    impl QualityOracle for ShortChanged {
        async fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Classification>, OracleError> {
            Ok(texts
                .iter()
                .skip(1)
                .map(|_| Classification { label: "LABEL_1".into(), score: 1.0 })
                .collect())
        }
    }

    fn scorer(oracle: Arc<dyn QualityOracle>, batch_size: usize) -> QualityScorer {
        let config = CleanerConfig {
            quality_batch_size: batch_size,
            ..CleanerConfig::default()
        };
        QualityScorer::new(&config, &OracleRegistry::new().with_quality(oracle))
    }

    fn corpus() -> Vec<String> {
        (0..70)
            .map(|i| match i % 3 {
                0 => format!("good document {i}"),
                1 => format!("meh document {i}"),
                _ => format!("bad document {i}"),
            })
            .collect()
    }

    #[tokio::test]
    async fn decision_rule() {
        let s = scorer(KeywordClassifier::new(), 32);
        let verdicts = s.score(&["good", "meh", "bad"]).await;
        assert_eq!(
            verdicts,
            vec![QualityVerdict::Keep, QualityVerdict::Reject, QualityVerdict::Reject]
        );
    }

    #[tokio::test]
    async fn batches_respect_size() {
        let oracle = KeywordClassifier::new();
        let s = scorer(oracle.clone(), 32);
        let (kept, removed) = s.filter(corpus()).await;
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 3);
        assert_eq!(oracle.largest_batch.load(Ordering::SeqCst), 32);
        assert_eq!(kept.len() + removed, 70);
        assert!(kept.iter().all(|t| t.starts_with("good")));
    }

    #[tokio::test]
    async fn verdicts_independent_of_batching() {
        let texts = corpus();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let baseline = scorer(KeywordClassifier::new(), 1).score(&refs).await;
        for size in [2, 7, 32, 100] {
            let verdicts = scorer(KeywordClassifier::new(), size).score(&refs).await;
            assert_eq!(verdicts, baseline, "batch size {size}");
        }
    }

    #[tokio::test]
    async fn no_oracle_keeps_everything() {
        let s = QualityScorer::new(&CleanerConfig::default(), &OracleRegistry::new());
        assert!(s.is_degraded());
        let (kept, removed) = s.filter(corpus()).await;
        assert_eq!(kept.len(), 70);
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn length_mismatch_fails_batch() {
        let s = scorer(Arc::new(ShortChanged), 4);
        let verdicts = s.score(&["a", "b", "c", "d", "e"]).await;
        assert_eq!(verdicts.len(), 5);
        assert!(verdicts.iter().all(|v| *v == QualityVerdict::Failed));
    }
}
