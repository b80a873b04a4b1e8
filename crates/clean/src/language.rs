//! Language identification with fallback.

use std::sync::Arc;
use std::time::Duration;

use sift_core::UNKNOWN_LANGUAGE;
use tracing::debug;

use crate::oracle::{guarded, Detection, LanguageOracle, OracleRegistry};

/// Confidence reported for any answer that came from the fallback oracle.
pub const FALLBACK_CONFIDENCE: f64 = 0.8;

/// Asks the primary oracle, then the fallback, then gives up with
/// `("unknown", 0.0)`. Never fails.
#[derive(Clone, Default)]
pub struct LanguageDetector {
    primary: Option<Arc<dyn LanguageOracle>>,
    fallback: Option<Arc<dyn LanguageOracle>>,
    timeout: Option<Duration>,
}

impl LanguageDetector {
    pub fn new(
        primary: Option<Arc<dyn LanguageOracle>>,
        fallback: Option<Arc<dyn LanguageOracle>>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            primary,
            fallback,
            timeout,
        }
    }

    pub fn from_registry(registry: &OracleRegistry) -> Self {
        Self::new(
            registry.language.clone(),
            registry.language_fallback.clone(),
            registry.timeout,
        )
    }

    pub fn is_degraded(&self) -> bool {
        self.primary.is_none() && self.fallback.is_none()
    }

    pub async fn detect(&self, text: &str) -> Detection {
        if text.trim().is_empty() {
            return unknown();
        }

        if let Some(primary) = &self.primary {
            match guarded(self.timeout, primary.detect(text)).await {
                Ok(detection) => {
                    if let Some(found) = sanitize(detection, None) {
                        return found;
                    }
                }
                Err(e) => debug!(oracle = primary.name(), error = %e, "primary language oracle failed"),
            }
        }

        if let Some(fallback) = &self.fallback {
            match guarded(self.timeout, fallback.detect(text)).await {
                Ok(detection) => {
                    if let Some(found) = sanitize(detection, Some(FALLBACK_CONFIDENCE)) {
                        return found;
                    }
                }
                Err(e) => debug!(oracle = fallback.name(), error = %e, "fallback language oracle failed"),
            }
        }

        unknown()
    }
}

fn unknown() -> Detection {
    Detection {
        language: UNKNOWN_LANGUAGE.to_string(),
        confidence: 0.0,
    }
}

/// Normalize the label and clamp the confidence. `None` when the label is
/// unusable.
fn sanitize(detection: Detection, fixed_confidence: Option<f64>) -> Option<Detection> {
    let language = normalize_label(&detection.language)?;
    let confidence = fixed_confidence.unwrap_or(detection.confidence);
    let confidence = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) };
    Some(Detection { language, confidence })
}

/// `"__label__zh-CN"` → `"zh"`, `"en_US"` → `"en"`.
pub fn normalize_label(raw: &str) -> Option<String> {
    let label = raw.trim();
    let label = label.strip_prefix("__label__").unwrap_or(label);
    let primary = label.split(['-', '_']).next().unwrap_or_default().to_lowercase();
    if primary.is_empty() || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(primary)
}
