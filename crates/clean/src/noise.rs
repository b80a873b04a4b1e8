//! Cross-language noise removal and the cheap length/punctuation filters.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use sift_core::{CleanerConfig, NoiseRule, Script, UNKNOWN_LANGUAGE};

use crate::language::LanguageDetector;
use crate::redact::PLACEHOLDER;
use crate::script::script_of;

/// English stop words (the NLTK list).
const ENGLISH_STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
    "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| ENGLISH_STOPWORDS.iter().copied().collect());

#[derive(Debug, Clone)]
struct CompiledRule {
    primary_language: String,
    foreign_script: Script,
    min_run_length: usize,
    allow_list: Vec<String>,
}

impl CompiledRule {
    fn new(rule: &NoiseRule) -> Self {
        Self {
            primary_language: rule.primary_language.to_lowercase(),
            foreign_script: rule.foreign_script,
            min_run_length: rule.min_run_length,
            allow_list: rule.allow_list.iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    fn is_noise(&self, run: &str) -> bool {
        run.chars().count() < self.min_run_length && !self.allow_list.contains(&run.to_lowercase())
    }

    /// Drop every short, non-allow-listed run of the foreign script.
    fn strip(&self, segment: &str, out: &mut String) {
        let mut run_start: Option<usize> = None;
        for (i, c) in segment.char_indices() {
            let foreign = script_of(c) == Some(self.foreign_script);
            match (foreign, run_start) {
                (true, None) => run_start = Some(i),
                (false, Some(start)) => {
                    self.flush_run(&segment[start..i], out);
                    run_start = None;
                    out.push(c);
                }
                (false, None) => out.push(c),
                (true, Some(_)) => {}
            }
        }
        if let Some(start) = run_start {
            self.flush_run(&segment[start..], out);
        }
    }

    fn flush_run(&self, run: &str, out: &mut String) {
        if !self.is_noise(run) {
            out.push_str(run);
        }
    }
}

pub struct NoiseFilter {
    rules: Vec<CompiledRule>,
    strip_stopwords: bool,
    min_length: usize,
    low_quality_threshold: f64,
}

impl NoiseFilter {
    pub fn new(config: &CleanerConfig) -> Self {
        Self {
            rules: config.noise_rules.iter().map(CompiledRule::new).collect(),
            strip_stopwords: config.remove_stopwords,
            min_length: config.min_length,
            low_quality_threshold: config.low_quality_threshold,
        }
    }

    /// Apply the rules whose primary language is `language`. Redaction
    /// placeholders are left intact.
    pub fn remove_noise(&self, text: &str, language: &str) -> String {
        let language = language.to_lowercase();
        let rules: Vec<&CompiledRule> = self
            .rules
            .iter()
            .filter(|r| r.primary_language == language)
            .collect();
        if rules.is_empty() || language == UNKNOWN_LANGUAGE {
            return text.to_string();
        }

        let mut current = text.to_string();
        for rule in rules {
            let mut out = String::with_capacity(current.len());
            let mut last = 0;
            for m in PLACEHOLDER.find_iter(&current) {
                rule.strip(&current[last..m.start()], &mut out);
                out.push_str(m.as_str());
                last = m.end();
            }
            rule.strip(&current[last..], &mut out);
            current = out;
        }
        current.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Like [`remove_noise`](Self::remove_noise), detecting the language
    /// first when the caller does not know it.
    pub async fn remove_noise_detecting(
        &self,
        text: &str,
        language: Option<&str>,
        detector: &LanguageDetector,
    ) -> String {
        match language {
            Some(language) => self.remove_noise(text, language),
            None => {
                let detection = detector.detect(text).await;
                self.remove_noise(text, &detection.language)
            }
        }
    }

    /// Drop English stop words when enabled. Punctuation attached to a
    /// dropped word stays behind as its own token; placeholders and other
    /// languages are left alone.
    pub fn remove_stopwords(&self, text: &str, language: &str) -> String {
        if !self.strip_stopwords || !language.eq_ignore_ascii_case("en") {
            return text.to_string();
        }
        let is_punct = |c: char| c.is_ascii_punctuation();
        let mut out: Vec<&str> = Vec::new();
        for token in text.split_whitespace() {
            let core = token.trim_matches(is_punct);
            if core.is_empty() || PLACEHOLDER.is_match(token) || !STOPWORDS.contains(core.to_lowercase().as_str()) {
                out.push(token);
                continue;
            }
            let lead = token.len() - token.trim_start_matches(is_punct).len();
            let (leading, trailing) = (&token[..lead], &token[lead + core.len()..]);
            out.extend([leading, trailing].into_iter().filter(|p| !p.is_empty()));
        }
        out.join(" ")
    }

    pub fn is_too_short(&self, text: &str) -> bool {
        text.trim().chars().count() < self.min_length
    }

    /// Mostly punctuation. Empty text always counts as low-information.
    pub fn is_low_information(&self, text: &str) -> bool {
        if text.is_empty() {
            return true;
        }
        non_punctuation_ratio(text) < self.low_quality_threshold
    }

    pub fn filter_short(&self, texts: Vec<String>) -> (Vec<String>, usize) {
        partition_count(texts, |t| !self.is_too_short(t))
    }

    pub fn filter_low_quality(&self, texts: Vec<String>) -> (Vec<String>, usize) {
        partition_count(texts, |t| !self.is_low_information(t))
    }
}

/// Share of characters that are not ASCII punctuation.
pub fn non_punctuation_ratio(text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let kept = text.chars().filter(|c| !c.is_ascii_punctuation()).count();
    kept as f64 / total as f64
}

fn partition_count(texts: Vec<String>, keep: impl Fn(&str) -> bool) -> (Vec<String>, usize) {
    let before = texts.len();
    let kept: Vec<String> = texts.into_iter().filter(|t| keep(t)).collect();
    let removed = before - kept.len();
    (kept, removed)
}
