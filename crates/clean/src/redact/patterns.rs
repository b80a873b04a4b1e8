use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use sift_core::PatternSpec;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid regex for pattern '{name}': {source}")]
    InvalidRegex {
        name: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug)]
struct SensitivePattern {
    regex: Regex,
    placeholder: String,
}

/// Named regular expressions whose matches are replaced by
/// `[<name>_REDACTED]`, applied in configuration order.
#[derive(Debug, Default)]
pub struct SensitivePatternSet {
    patterns: Vec<SensitivePattern>,
}

/// Matches any text produced by [`placeholder`].
pub(crate) static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[A-Za-z0-9_]+_REDACTED\]").unwrap());

/// Placeholder text for a pattern or entity category.
pub fn placeholder(name: &str) -> String {
    format!("[{name}_REDACTED]")
}

/// `str::replace` that leaves placeholder spans untouched.
pub(crate) fn replace_outside_placeholders(text: &str, from: &str, to: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in PLACEHOLDER.find_iter(text) {
        out.push_str(&text[last..m.start()].replace(from, to));
        out.push_str(m.as_str());
        last = m.end();
    }
    out.push_str(&text[last..].replace(from, to));
    out
}

impl SensitivePatternSet {
    pub fn compile(specs: &[PatternSpec]) -> Result<Self, PatternError> {
        let patterns = specs
            .iter()
            .map(|spec| {
                let regex = Regex::new(&spec.pattern).map_err(|source| PatternError::InvalidRegex {
                    name: spec.name.clone(),
                    source,
                })?;
                Ok(SensitivePattern {
                    regex,
                    placeholder: placeholder(&spec.name),
                })
            })
            .collect::<Result<Vec<_>, PatternError>>()?;
        Ok(Self { patterns })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for pattern in &self.patterns {
            if pattern.regex.is_match(&out) {
                out = pattern
                    .regex
                    .replace_all(&out, NoExpand(&pattern.placeholder))
                    .into_owned();
            }
        }
        out
    }
}
