//! Model-free oracles: a script-based language guesser and a punctuation
//! sentence segmenter.

use std::collections::HashMap;

use async_trait::async_trait;
use sift_core::Script;

use super::{Detection, LanguageOracle, OracleError, SentenceSegmenter};
use crate::script::script_of;

/// Guesses the language from the dominant Unicode script.
///
/// Coarse: every Latin-script text is `en`. Meant as the fallback behind a
/// statistical model, where the detector assigns it a fixed confidence.
#[derive(Debug, Clone, Default)]
pub struct ScriptDetector;

impl ScriptDetector {
    pub fn new() -> Self {
        Self
    }
}

const TIE_ORDER: [Script; 6] = [
    Script::Han,
    Script::Hangul,
    Script::Latin,
    Script::Cyrillic,
    Script::Greek,
    Script::Arabic,
];

fn language_for(script: Script) -> &'static str {
    match script {
        Script::Latin => "en",
        Script::Han => "zh",
        Script::Kana => "ja",
        Script::Hangul => "ko",
        Script::Cyrillic => "ru",
        Script::Greek => "el",
        Script::Arabic => "ar",
    }
}

#[async_trait]
impl LanguageOracle for ScriptDetector {
    async fn detect(&self, text: &str) -> Result<Detection, OracleError> {
        let mut counts: HashMap<Script, usize> = HashMap::new();
        for script in text.chars().filter_map(script_of) {
            *counts.entry(script).or_default() += 1;
        }
        let total: usize = counts.values().sum();
        if total == 0 {
            return Err(OracleError::Unavailable("no letters to classify".into()));
        }
        // Any kana means Japanese, even when kanji outnumber it.
        if let Some(&kana) = counts.get(&Script::Kana) {
            let han = counts.get(&Script::Han).copied().unwrap_or(0);
            return Ok(Detection {
                language: "ja".into(),
                confidence: (kana + han) as f64 / total as f64,
            });
        }
        // Ties go to the script listed first.
        let (script, count) = TIE_ORDER
            .iter()
            .map(|script| (*script, counts.get(script).copied().unwrap_or(0)))
            .fold((Script::Latin, 0), |best, cur| if cur.1 > best.1 { cur } else { best });
        Ok(Detection {
            language: language_for(script).into(),
            confidence: count as f64 / total as f64,
        })
    }

    fn name(&self) -> &str {
        "script-heuristic"
    }
}

/// Abbreviations that end in a period without ending the sentence.
static ABBREVIATIONS: &[&str] = &[
    "dr.", "mr.", "mrs.", "ms.", "prof.", "sr.", "jr.", "st.", "vs.", "etc.", "e.g.", "i.e.",
    "no.", "fig.", "inc.", "ltd.", "co.", "approx.",
];

/// Splits on `.`, `!`, `?` followed by whitespace (or end of text) and on
/// the full-width `。！？` anywhere. Closing quotes and brackets stay with
/// the sentence they close.
#[derive(Debug, Clone, Default)]
pub struct RuleSegmenter;

impl RuleSegmenter {
    pub fn new() -> Self {
        Self
    }

    pub fn split_sentences(text: &str) -> Vec<String> {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut sentences = Vec::new();
        let mut start = 0;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i].1;
            let wide = is_wide_terminal(c);
            if !wide && !is_latin_terminal(c) {
                i += 1;
                continue;
            }
            let mut j = i + 1;
            while j < chars.len() && (is_terminal(chars[j].1) || is_closer(chars[j].1)) {
                j += 1;
            }
            let end = chars.get(j).map(|(pos, _)| *pos).unwrap_or(text.len());
            let at_break = wide || j == chars.len() || chars[j].1.is_whitespace();
            if at_break && !(c == '.' && ends_with_abbreviation(&text[start..end])) {
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                start = end;
            }
            i = j;
        }

        let tail = text[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }
        sentences
    }
}

#[async_trait]
impl SentenceSegmenter for RuleSegmenter {
    async fn split(&self, text: &str, _language: &str) -> Result<Vec<String>, OracleError> {
        Ok(Self::split_sentences(text))
    }
}

fn is_latin_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_wide_terminal(c: char) -> bool {
    matches!(c, '。' | '！' | '？')
}

fn is_terminal(c: char) -> bool {
    is_latin_terminal(c) || is_wide_terminal(c)
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '”' | '’' | '」' | '』' | '）')
}

fn ends_with_abbreviation(fragment: &str) -> bool {
    fragment
        .split_whitespace()
        .last()
        .map(|word| ABBREVIATIONS.contains(&word.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn detects_dominant_script() {
        let detector = ScriptDetector::new();
        let en = detector.detect("The quick brown fox").await.unwrap();
        assert_eq!(en.language, "en");
        assert_eq!(en.confidence, 1.0);

        let zh = detector.detect("这是一段包含英文单词的中文文本 short").await.unwrap();
        assert_eq!(zh.language, "zh");
        assert!(zh.confidence > 0.5 && zh.confidence < 1.0);

        assert_eq!(detector.detect("Привет мир").await.unwrap().language, "ru");
        assert_eq!(detector.detect("これは日本語です").await.unwrap().language, "ja");
    }

    #[tokio::test]
    async fn fails_without_letters() {
        let detector = ScriptDetector::new();
        assert!(detector.detect("12345 !!! ...").await.is_err());
    }

    #[test]
    fn splits_latin_sentences() {
        let s = RuleSegmenter::split_sentences("Hello there. How are you? I am fine!");
        assert_eq!(s, vec!["Hello there.", "How are you?", "I am fine!"]);
    }

    #[test]
    fn keeps_decimals_and_abbreviations() {
        let s = RuleSegmenter::split_sentences("Dr. Smith paid 3.50 dollars. Then he left.");
        assert_eq!(s, vec!["Dr. Smith paid 3.50 dollars.", "Then he left."]);
    }

    #[test]
    fn splits_cjk_without_spaces() {
        let s = RuleSegmenter::split_sentences("今天天气很好。我们去公园吧！好吗？");
        assert_eq!(s, vec!["今天天气很好。", "我们去公园吧！", "好吗？"]);
    }

    #[test]
    fn closers_stay_with_sentence() {
        let s = RuleSegmenter::split_sentences("He said \"stop.\" Then silence... The end");
        assert_eq!(s, vec!["He said \"stop.\"", "Then silence...", "The end"]);
    }

    #[test]
    fn no_terminal_is_one_sentence() {
        assert_eq!(RuleSegmenter::split_sentences("no punctuation here"), vec!["no punctuation here"]);
        assert!(RuleSegmenter::split_sentences("   ").is_empty());
    }
}
