use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sift_core::CleanerConfig;

use super::heuristic::{RuleSegmenter, ScriptDetector};
use super::http::{HttpClassifier, HttpEntityRecognizer};
use super::{Capability, EntityOracle, LanguageOracle, QualityOracle, SentenceSegmenter};

/// Every oracle available to a run. Entity recognizers and segmenters are
/// keyed by language code; a missing key means the stage degrades for
/// that language.
#[derive(Clone, Default)]
pub struct OracleRegistry {
    pub language: Option<Arc<dyn LanguageOracle>>,
    pub language_fallback: Option<Arc<dyn LanguageOracle>>,
    pub entities: HashMap<String, Arc<dyn EntityOracle>>,
    pub quality: Option<Arc<dyn QualityOracle>>,
    pub segmenters: HashMap<String, Arc<dyn SentenceSegmenter>>,
    /// Per-call limit applied by every stage.
    pub timeout: Option<Duration>,
}

impl OracleRegistry {
    /// A registry with no oracles at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire up the oracles named in the configuration.
    pub fn from_config(config: &CleanerConfig) -> Self {
        let oracles = &config.oracles;
        let token = oracles.api_token.clone();
        let mut registry = Self::new();

        if let Some(url) = &oracles.language_url {
            registry.language = Some(Arc::new(HttpClassifier::new(url.clone(), token.clone())));
        }
        if oracles.script_fallback {
            registry.language_fallback = Some(Arc::new(ScriptDetector::new()));
        }
        if let Some(url) = &oracles.quality_url {
            registry.quality = Some(Arc::new(HttpClassifier::new(url.clone(), token.clone())));
        }
        for (language, url) in &oracles.entity_urls {
            registry.entities.insert(
                language.to_lowercase(),
                Arc::new(HttpEntityRecognizer::new(url.clone(), token.clone())),
            );
        }
        let segmenter: Arc<dyn SentenceSegmenter> = Arc::new(RuleSegmenter::new());
        for language in &config.segmenter_languages {
            registry.segmenters.insert(language.to_lowercase(), segmenter.clone());
        }
        if config.oracle_timeout_ms > 0 {
            registry.timeout = Some(Duration::from_millis(config.oracle_timeout_ms));
        }
        registry
    }

    pub fn with_language(mut self, oracle: Arc<dyn LanguageOracle>) -> Self {
        self.language = Some(oracle);
        self
    }

    pub fn with_language_fallback(mut self, oracle: Arc<dyn LanguageOracle>) -> Self {
        self.language_fallback = Some(oracle);
        self
    }

    pub fn with_entities(mut self, language: &str, oracle: Arc<dyn EntityOracle>) -> Self {
        self.entities.insert(language.to_lowercase(), oracle);
        self
    }

    pub fn with_quality(mut self, oracle: Arc<dyn QualityOracle>) -> Self {
        self.quality = Some(oracle);
        self
    }

    pub fn with_segmenter(mut self, language: &str, segmenter: Arc<dyn SentenceSegmenter>) -> Self {
        self.segmenters.insert(language.to_lowercase(), segmenter);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Whether at least one oracle provides `capability`.
    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::LanguageDetection => self.language.is_some() || self.language_fallback.is_some(),
            Capability::EntityRecognition => !self.entities.is_empty(),
            Capability::QualityClassification => self.quality.is_some(),
            Capability::SentenceSegmentation => !self.segmenters.is_empty(),
        }
    }
}

impl std::fmt::Debug for OracleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut entity_languages: Vec<_> = self.entities.keys().collect();
        entity_languages.sort();
        let mut segmenter_languages: Vec<_> = self.segmenters.keys().collect();
        segmenter_languages.sort();
        f.debug_struct("OracleRegistry")
            .field("language", &self.language.as_ref().map(|o| o.name().to_string()))
            .field("language_fallback", &self.language_fallback.as_ref().map(|o| o.name().to_string()))
            .field("entities", &entity_languages)
            .field("quality", &self.quality.is_some())
            .field("segmenters", &segmenter_languages)
            .field("timeout", &self.timeout)
            .finish()
    }
}
