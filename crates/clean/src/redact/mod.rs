//! Sensitive-information redaction and the harmful-content veto.
//!
//! Order per document: pattern redaction, then entity redaction for the
//! document's language, then the keyword check on the redacted text. A
//! vetoed document comes back as the empty string.

mod patterns;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use sift_core::CleanerConfig;

pub use patterns::{placeholder, PatternError, SensitivePatternSet};
pub(crate) use patterns::PLACEHOLDER;

use patterns::replace_outside_placeholders;

use crate::oracle::{guarded, EntityOracle, OracleError, OracleRegistry};

pub struct Redactor {
    patterns: Arc<SensitivePatternSet>,
    entities: HashMap<String, Arc<dyn EntityOracle>>,
    categories: HashSet<String>,
    harmful_keywords: Vec<String>,
    timeout: Option<Duration>,
}

impl Redactor {
    pub fn new(config: &CleanerConfig, registry: &OracleRegistry) -> Result<Self, PatternError> {
        Ok(Self {
            patterns: Arc::new(SensitivePatternSet::compile(&config.sensitive_patterns)?),
            entities: registry.entities.clone(),
            categories: config.redact_entity_categories.iter().cloned().collect(),
            harmful_keywords: config
                .harmful_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            timeout: registry.timeout,
        })
    }

    /// Languages with an entity recognizer.
    pub fn entity_languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.entities.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }

    pub fn redact_patterns(&self, text: &str) -> String {
        self.patterns.apply(text)
    }

    /// Replace every entity of a redacted category with its placeholder.
    /// Text in a language without a recognizer is returned unchanged.
    pub async fn redact_entities(&self, text: &str, language: &str) -> Result<String, OracleError> {
        let Some(oracle) = self.entities.get(&language.to_lowercase()) else {
            return Ok(text.to_string());
        };
        let found = guarded(self.timeout, oracle.recognize(text, language)).await?;

        let mut targets: Vec<(String, String)> = found
            .into_iter()
            .filter(|e| !e.text.trim().is_empty() && self.categories.contains(&e.category))
            .map(|e| (e.text, placeholder(&e.category)))
            .collect();
        // Longest first so "New York City" wins over "New York".
        targets.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()).then_with(|| a.0.cmp(&b.0)));
        targets.dedup_by(|a, b| a.0 == b.0);

        let mut out = text.to_string();
        for (entity, replacement) in targets {
            out = replace_outside_placeholders(&out, &entity, &replacement);
        }
        Ok(out)
    }

    /// Case-insensitive substring match against the keyword list.
    pub fn is_harmful(&self, text: &str) -> bool {
        if self.harmful_keywords.is_empty() {
            return false;
        }
        let lowered = text.to_lowercase();
        self.harmful_keywords.iter().any(|k| lowered.contains(k.as_str()))
    }

    /// Full redaction. `Ok("")` means the document was vetoed.
    pub async fn redact(&self, text: &str, language: &str) -> Result<String, OracleError> {
        let redacted = self.redact_patterns(text);
        let redacted = self.redact_entities(&redacted, language).await?;
        if self.is_harmful(&redacted) {
            return Ok(String::new());
        }
        Ok(redacted)
    }
}
