use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SiftError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Prefix for per-language entity recognizer endpoints, e.g. `SIFT_ENTITY_URL_EN`.
const ENTITY_URL_PREFIX: &str = "SIFT_ENTITY_URL_";

// ── Top-level config ──────────────────────────────────────────

/// Every tunable of the cleaning pipeline. All fields have defaults, so an
/// empty TOML document is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanerConfig {
    /// Texts with fewer characters are dropped as short.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    /// Minimum ratio of non-punctuation characters.
    #[serde(default = "default_low_quality_threshold")]
    pub low_quality_threshold: f64,
    /// Minimum positive-class score from the quality classifier.
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,
    #[serde(default = "default_quality_batch_size")]
    pub quality_batch_size: usize,
    /// Label the quality classifier uses for "keep".
    #[serde(default = "default_quality_positive_label")]
    pub quality_positive_label: String,
    /// Token budget per chunk (soft ceiling: lone long sentences may exceed it).
    #[serde(default = "default_max_chunk_tokens")]
    pub max_chunk_tokens: usize,
    /// Number of input partitions.
    #[serde(default = "default_partitions")]
    pub partitions: usize,
    /// Partitions processed at once. 0 = all of them.
    #[serde(default)]
    pub max_concurrent_partitions: usize,
    /// Documents with lower language confidence are dropped. 0.0 disables the check.
    #[serde(default)]
    pub min_language_confidence: f64,
    /// Per oracle call timeout in milliseconds. 0 = no timeout.
    #[serde(default)]
    pub oracle_timeout_ms: u64,
    #[serde(default)]
    pub dedup_scope: DedupScope,
    /// Drop everything except letters, digits, whitespace and `.,!?'"-_` during
    /// normalization. Disables e-mail redaction, since `@` is removed.
    #[serde(default)]
    pub strip_special_chars: bool,
    /// Fold text to lower case during normalization.
    #[serde(default)]
    pub lowercase: bool,
    /// Drop English stop words after noise removal.
    #[serde(default)]
    pub remove_stopwords: bool,
    #[serde(default = "default_harmful_keywords")]
    pub harmful_keywords: Vec<String>,
    /// Entity categories replaced by placeholders.
    #[serde(default = "default_redact_entity_categories")]
    pub redact_entity_categories: Vec<String>,
    /// Applied in order; the first rule to match a span wins.
    #[serde(default = "default_sensitive_patterns")]
    pub sensitive_patterns: Vec<PatternSpec>,
    #[serde(default = "default_noise_rules")]
    pub noise_rules: Vec<NoiseRule>,
    /// Languages that get the built-in punctuation sentence segmenter.
    #[serde(default = "default_segmenter_languages")]
    pub segmenter_languages: Vec<String>,
    #[serde(default)]
    pub oracles: OracleConfig,
}

/// Whether duplicate fingerprints are tracked per partition or across the run.
///
/// Only `Global` makes the kept set independent of how files are
/// partitioned when the same text appears in more than one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupScope {
    #[default]
    Partition,
    Global,
}

/// A named sensitive-data pattern, e.g. `email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub name: String,
    pub pattern: String,
}

impl PatternSpec {
    pub fn new(name: &str, pattern: &str) -> Self {
        Self { name: name.to_string(), pattern: pattern.to_string() }
    }
}

/// Unicode script a noise rule looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    Latin,
    Han,
    Cyrillic,
    Greek,
    Arabic,
    Hangul,
    Kana,
}

/// Cross-language noise rule: in `primary_language` text, runs of
/// `foreign_script` shorter than `min_run_length` are removed unless
/// allow-listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoiseRule {
    pub primary_language: String,
    pub foreign_script: Script,
    #[serde(default = "default_min_run_length")]
    pub min_run_length: usize,
    /// Case-insensitive.
    #[serde(default)]
    pub allow_list: Vec<String>,
}

/// Endpoints of the external model services. Absent endpoints leave the
/// corresponding stage in degraded mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    pub language_url: Option<String>,
    pub quality_url: Option<String>,
    /// Language code → token-classification endpoint.
    #[serde(default)]
    pub entity_urls: BTreeMap<String, String>,
    /// Bearer token sent to every endpoint.
    pub api_token: Option<String>,
    /// Use the Unicode-script heuristic when the language endpoint fails.
    #[serde(default = "default_true")]
    pub script_fallback: bool,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            language_url: None,
            quality_url: None,
            entity_urls: BTreeMap::new(),
            api_token: None,
            script_fallback: true,
        }
    }
}

fn default_min_length() -> usize { 10 }
fn default_low_quality_threshold() -> f64 { 0.3 }
fn default_quality_threshold() -> f64 { 0.7 }
fn default_quality_batch_size() -> usize { 32 }
fn default_quality_positive_label() -> String { "LABEL_1".into() }
fn default_max_chunk_tokens() -> usize { 512 }
fn default_partitions() -> usize { 8 }
fn default_min_run_length() -> usize { 3 }
fn default_true() -> bool { true }

fn default_harmful_keywords() -> Vec<String> {
    ["violence", "discrimination", "hate", "terrorism"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_redact_entity_categories() -> Vec<String> {
    ["PERSON", "GPE", "ORG", "DATE"].iter().map(|s| s.to_string()).collect()
}

fn default_sensitive_patterns() -> Vec<PatternSpec> {
    vec![
        PatternSpec::new("email", r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}"),
        PatternSpec::new("phone", r"(?:\+86|\b86|\b)1[3-9]\d{9}\b"),
        PatternSpec::new("id_card", r"\b\d{17}[\dXx]\b"),
        PatternSpec::new("credit_card", r"\b(?:\d{4}[-\s]?){3}\d{4}\b"),
    ]
}

fn default_noise_rules() -> Vec<NoiseRule> {
    vec![NoiseRule {
        primary_language: "zh".into(),
        foreign_script: Script::Latin,
        min_run_length: default_min_run_length(),
        allow_list: vec!["ai".into(), "it".into(), "gdp".into()],
    }]
}

fn default_segmenter_languages() -> Vec<String> {
    vec!["en".into(), "zh".into()]
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            low_quality_threshold: default_low_quality_threshold(),
            quality_threshold: default_quality_threshold(),
            quality_batch_size: default_quality_batch_size(),
            quality_positive_label: default_quality_positive_label(),
            max_chunk_tokens: default_max_chunk_tokens(),
            partitions: default_partitions(),
            max_concurrent_partitions: 0,
            min_language_confidence: 0.0,
            oracle_timeout_ms: 0,
            dedup_scope: DedupScope::default(),
            strip_special_chars: false,
            lowercase: false,
            remove_stopwords: false,
            harmful_keywords: default_harmful_keywords(),
            redact_entity_categories: default_redact_entity_categories(),
            sensitive_patterns: default_sensitive_patterns(),
            noise_rules: default_noise_rules(),
            segmenter_languages: default_segmenter_languages(),
            oracles: OracleConfig::default(),
        }
    }
}

// ── Loading & Validation ────────────────────────────────────────────

impl CleanerConfig {
    /// Parse config from a TOML string, then apply env overrides and validate.
    pub fn from_toml(toml_str: &str) -> Result<Self, SiftError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SiftError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Defaults plus env overrides (call `load_dotenv()` first).
    pub fn from_env() -> Result<Self, SiftError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Convention: `SIFT_<FIELD>` overrides `<field>`, e.g. `SIFT_MIN_LENGTH`.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok().filter(|s| !s.is_empty()));
        for (key, value) in env::vars() {
            if let Some(lang) = key.strip_prefix(ENTITY_URL_PREFIX) {
                if !lang.is_empty() && !value.is_empty() {
                    self.oracles.entity_urls.insert(lang.to_lowercase(), value);
                }
            }
        }
    }

    /// Apply overrides from any key/value source. Unparseable values are
    /// logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn parsed<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Option<T> {
            let raw = raw?;
            match raw.trim().parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(key, value = %raw, "ignoring unparseable config override");
                    None
                }
            }
        }

        if let Some(v) = parsed("SIFT_MIN_LENGTH", lookup("SIFT_MIN_LENGTH")) {
            self.min_length = v;
        }
        if let Some(v) = parsed("SIFT_LOW_QUALITY_THRESHOLD", lookup("SIFT_LOW_QUALITY_THRESHOLD")) {
            self.low_quality_threshold = v;
        }
        if let Some(v) = parsed("SIFT_QUALITY_THRESHOLD", lookup("SIFT_QUALITY_THRESHOLD")) {
            self.quality_threshold = v;
        }
        if let Some(v) = parsed("SIFT_QUALITY_BATCH_SIZE", lookup("SIFT_QUALITY_BATCH_SIZE")) {
            self.quality_batch_size = v;
        }
        if let Some(v) = parsed("SIFT_MAX_CHUNK_TOKENS", lookup("SIFT_MAX_CHUNK_TOKENS")) {
            self.max_chunk_tokens = v;
        }
        if let Some(v) = parsed("SIFT_PARTITIONS", lookup("SIFT_PARTITIONS")) {
            self.partitions = v;
        }
        if let Some(v) = parsed("SIFT_MAX_CONCURRENT_PARTITIONS", lookup("SIFT_MAX_CONCURRENT_PARTITIONS")) {
            self.max_concurrent_partitions = v;
        }
        if let Some(v) = parsed("SIFT_MIN_LANGUAGE_CONFIDENCE", lookup("SIFT_MIN_LANGUAGE_CONFIDENCE")) {
            self.min_language_confidence = v;
        }
        if let Some(v) = parsed("SIFT_ORACLE_TIMEOUT_MS", lookup("SIFT_ORACLE_TIMEOUT_MS")) {
            self.oracle_timeout_ms = v;
        }
        if let Some(v) = lookup("SIFT_DEDUP_SCOPE") {
            match v.to_lowercase().as_str() {
                "partition" => self.dedup_scope = DedupScope::Partition,
                "global" => self.dedup_scope = DedupScope::Global,
                other => tracing::warn!(value = other, "ignoring unknown SIFT_DEDUP_SCOPE"),
            }
        }
        if let Some(v) = lookup("SIFT_HARMFUL_KEYWORDS") {
            self.harmful_keywords = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = lookup("SIFT_LANGUAGE_URL") {
            self.oracles.language_url = Some(v);
        }
        if let Some(v) = lookup("SIFT_QUALITY_URL") {
            self.oracles.quality_url = Some(v);
        }
        if let Some(v) = lookup("SIFT_ORACLE_TOKEN") {
            self.oracles.api_token = Some(v);
        }
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), SiftError> {
        if self.max_chunk_tokens == 0 {
            return Err(invalid("max_chunk_tokens must be positive"));
        }
        if self.partitions == 0 {
            return Err(invalid("partitions must be positive"));
        }
        if self.quality_batch_size == 0 {
            return Err(invalid("quality_batch_size must be positive"));
        }
        for (name, value) in [
            ("low_quality_threshold", self.low_quality_threshold),
            ("quality_threshold", self.quality_threshold),
            ("min_language_confidence", self.min_language_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(&format!("{name} must be within [0, 1], got {value}")));
            }
        }
        let mut names = std::collections::HashSet::new();
        for spec in &self.sensitive_patterns {
            if spec.name.is_empty() || spec.pattern.is_empty() {
                return Err(invalid("sensitive patterns need a name and a pattern"));
            }
            if !names.insert(spec.name.as_str()) {
                return Err(invalid(&format!("duplicate sensitive pattern '{}'", spec.name)));
            }
        }
        for rule in &self.noise_rules {
            if rule.primary_language.is_empty() {
                return Err(invalid("noise rule needs a primary_language"));
            }
        }
        Ok(())
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Cleaner config loaded:");
        tracing::info!(
            "  filters:    min_length={}, low_quality_threshold={}, min_language_confidence={}",
            self.min_length,
            self.low_quality_threshold,
            self.min_language_confidence
        );
        tracing::info!(
            "  quality:    threshold={}, batch_size={}, positive_label={}",
            self.quality_threshold,
            self.quality_batch_size,
            self.quality_positive_label
        );
        tracing::info!(
            "  text:       strip_special_chars={}, lowercase={}, remove_stopwords={}",
            self.strip_special_chars,
            self.lowercase,
            self.remove_stopwords
        );
        tracing::info!("  chunking:   max_tokens={}", self.max_chunk_tokens);
        tracing::info!(
            "  execution:  partitions={}, max_concurrent={}, dedup_scope={:?}",
            self.partitions,
            self.max_concurrent_partitions,
            self.dedup_scope
        );
        tracing::info!(
            "  redaction:  patterns={}, harmful_keywords={}, entity_categories={:?}",
            self.sensitive_patterns.len(),
            self.harmful_keywords.len(),
            self.redact_entity_categories
        );
        tracing::info!(
            "  oracles:    language={}, quality={}, entity_langs={:?}, token={}",
            self.oracles.language_url.as_deref().unwrap_or("(none)"),
            self.oracles.quality_url.as_deref().unwrap_or("(none)"),
            self.oracles.entity_urls.keys().collect::<Vec<_>>(),
            if self.oracles.api_token.is_some() { "set" } else { "unset" }
        );
    }
}

fn invalid(msg: &str) -> SiftError {
    SiftError::InvalidConfig(msg.to_string())
}
