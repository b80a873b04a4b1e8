//! Character-level text normalization.
//!
//! Runs before every other stage, so the output must be stable under
//! re-application: `normalize(normalize(x)) == normalize(x)`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Characters kept by the optional special-character filter, besides
/// letters, digits and whitespace.
const KEPT_PUNCTUATION: &str = ".,!?'\"-_";

/// Configurable normalizer. [`normalize`] is the default instance.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    strip_special_chars: bool,
    lowercase: bool,
}

impl Normalizer {
    pub fn new(strip_special_chars: bool) -> Self {
        Self {
            strip_special_chars,
            lowercase: false,
        }
    }

    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    pub fn normalize(&self, text: &str) -> String {
        if !self.strip_special_chars && !self.lowercase {
            return normalize(text);
        }
        // Dropping punctuation can splice a new URL together ("w@ww.x") and
        // lower-casing can emit combining marks ("İ"), so repeat until stable.
        let mut current = self.pass(text);
        loop {
            let next = self.pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn pass(&self, text: &str) -> String {
        let mut out = normalize(text);
        if self.strip_special_chars {
            out = normalize(&strip_special_characters(&out));
        }
        if self.lowercase {
            out = out.to_lowercase();
        }
        out
    }
}

/// Remove control characters, markup and URLs; collapse whitespace; trim.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let cleaned = remove_control_characters(text);
    let cleaned = strip_tags(&cleaned);
    let cleaned = remove_urls(&cleaned);
    collapse_whitespace(&cleaned)
}

/// Control characters become spaces when they are whitespace (`\t`, `\n`)
/// and vanish otherwise; zero-width format characters vanish.
fn remove_control_characters(input: &str) -> String {
    input
        .chars()
        .filter_map(|c| match c {
            '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{FEFF}' => None,
            c if c.is_control() => c.is_whitespace().then_some(' '),
            c => Some(c),
        })
        .collect()
}

/// Replace HTML/XML tags with a space. Repeats until no tag is left, since
/// removing `<b>` from `<p<b>>` exposes `<p >`.
fn strip_tags(input: &str) -> String {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[A-Za-z/!?][^<>]*>").unwrap());
    let mut current = input.to_string();
    while RE.is_match(&current) {
        current = RE.replace_all(&current, " ").into_owned();
    }
    current
}

fn remove_urls(input: &str) -> String {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)\b[a-z][a-z0-9+.-]*://[^\s<>]*|\bwww\.[^\s<>]+").unwrap()
    });
    RE.replace_all(input, " ").into_owned()
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_special_characters(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || KEPT_PUNCTUATION.contains(*c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_scheme_urls() {
        assert_eq!(normalize("Visit http://x.com now for info"), "Visit now for info");
        assert_eq!(normalize("see https://a.b/c?d=e&f=g."), "see");
        assert_eq!(normalize("ftp://files.example.org/pub ok"), "ok");
    }

    #[test]
    fn removes_www_urls() {
        assert_eq!(normalize("go to www.example.com today"), "go to today");
    }

    #[test]
    fn strips_tags_keeping_word_boundaries() {
        assert_eq!(normalize("<p>Hello</p><p>World</p>"), "Hello World");
        assert_eq!(normalize("<div class=\"x\">text</div>"), "text");
        assert_eq!(normalize("<!-- note -->body"), "body");
    }

    #[test]
    fn keeps_comparisons() {
        assert_eq!(normalize("a < b and c > d"), "a < b and c > d");
    }

    #[test]
    fn collapses_whitespace_and_controls() {
        assert_eq!(normalize("  hello \t\n  world  "), "hello world");
        assert_eq!(normalize("a\u{0000}b\u{200B}c"), "abc");
        assert_eq!(normalize("line\r\nbreak"), "line break");
    }

    #[test]
    fn empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("http://only.url"), "");
    }

    #[test]
    fn idempotent_on_tricky_inputs() {
        let inputs = [
            "Hello   world!",
            "<p<b>>nested</p>",
            "ww<b>w.example.com hidden",
            "<p http://a<> c>",
            "  <a href='http://x.y'>link</a> www.z.org  tail ",
            "中文文本 https://例子.中国/路径 结束",
            "tab\tand\u{000B}vertical",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn special_char_filter_is_idempotent() {
        let normalizer = Normalizer::new(true);
        for input in ["w@ww.example.com x", "price: $5 (approx)", "a@b.com writes"] {
            let once = normalizer.normalize(input);
            assert_eq!(normalizer.normalize(&once), once, "not idempotent for {input:?}");
        }
        assert_eq!(normalizer.normalize("price: $5 (approx)!"), "price 5 approx!");
    }

    #[test]
    fn lowercase_folds_after_cleanup() {
        let normalizer = Normalizer::new(false).with_lowercase(true);
        assert_eq!(normalizer.normalize("<b>Hello</b>  WORLD"), "hello world");
        assert_eq!(normalizer.normalize("Mail A@B.COM"), "mail a@b.com");
        assert_eq!(Normalizer::default().normalize("Hello"), "Hello");
    }

    #[test]
    fn combined_options_are_idempotent() {
        let normalizer = Normalizer::new(true).with_lowercase(true);
        for input in ["İstanbul Ünİversİtesİ", "ÀÉÎ www.X.com ok", "Straße & ΣΊΣΥΦΟΣ"] {
            let once = normalizer.normalize(input);
            assert_eq!(normalizer.normalize(&once), once, "not idempotent for {input:?}");
        }
    }
}
