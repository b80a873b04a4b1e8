//! Token estimation and greedy sentence packing.

use crate::script::is_logographic;

/// Approximate token count: one per CJK ideograph, kana or hangul
/// syllable, plus one per whitespace-delimited run of anything else.
pub fn estimate_tokens(text: &str) -> usize {
    let mut count = 0;
    let mut in_run = false;
    for c in text.chars() {
        if is_logographic(c) {
            count += 1;
            in_run = false;
        } else if c.is_whitespace() {
            in_run = false;
        } else if !in_run {
            count += 1;
            in_run = true;
        }
    }
    count
}

/// One packed chunk before it is attached to a document.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Packed {
    pub content: String,
    pub tokens: usize,
    pub oversized: bool,
}

/// Greedily join consecutive sentences with a single space while the running
/// estimate stays within `max_tokens`. A sentence over budget on its own is
/// emitted alone and flagged.
pub(crate) fn pack_sentences(sentences: Vec<String>, max_tokens: usize) -> Vec<Packed> {
    let mut packed = Vec::new();
    let mut buf = String::new();
    let mut buf_tokens = 0;

    for sentence in sentences {
        let tokens = estimate_tokens(&sentence);
        if !buf.is_empty() && buf_tokens + tokens > max_tokens {
            packed.push(Packed {
                content: std::mem::take(&mut buf),
                tokens: buf_tokens,
                oversized: false,
            });
            buf_tokens = 0;
        }
        if buf.is_empty() && tokens > max_tokens {
            packed.push(Packed {
                content: sentence,
                tokens,
                oversized: true,
            });
            continue;
        }
        if !buf.is_empty() {
            buf.push(' ');
        }
        buf.push_str(&sentence);
        buf_tokens += tokens;
    }

    if !buf.is_empty() {
        packed.push(Packed {
            content: buf,
            tokens: buf_tokens,
            oversized: false,
        });
    }
    packed
}
