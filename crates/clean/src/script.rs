//! Unicode script classification for single characters.

use sift_core::Script;

/// Script of a letter, or `None` for digits, punctuation, whitespace and
/// scripts no rule or heuristic cares about.
pub fn script_of(c: char) -> Option<Script> {
    match c {
        'A'..='Z' | 'a'..='z' => Some(Script::Latin),
        '\u{00C0}'..='\u{024F}' if c.is_alphabetic() => Some(Script::Latin),
        '\u{0370}'..='\u{03FF}' if c.is_alphabetic() => Some(Script::Greek),
        '\u{0400}'..='\u{04FF}' if c.is_alphabetic() => Some(Script::Cyrillic),
        '\u{0600}'..='\u{06FF}' | '\u{0750}'..='\u{077F}' if c.is_alphabetic() => Some(Script::Arabic),
        '\u{1100}'..='\u{11FF}' | '\u{3130}'..='\u{318F}' | '\u{AC00}'..='\u{D7AF}' => Some(Script::Hangul),
        '\u{3040}'..='\u{30FF}' | '\u{31F0}'..='\u{31FF}' => Some(Script::Kana),
        '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2A6DF}' => Some(Script::Han),
        _ => None,
    }
}

/// Scripts written without spaces between words, where every character is
/// roughly one token.
pub fn is_logographic(c: char) -> bool {
    matches!(script_of(c), Some(Script::Han | Script::Kana | Script::Hangul))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_scripts() {
        assert_eq!(script_of('a'), Some(Script::Latin));
        assert_eq!(script_of('é'), Some(Script::Latin));
        assert_eq!(script_of('中'), Some(Script::Han));
        assert_eq!(script_of('か'), Some(Script::Kana));
        assert_eq!(script_of('한'), Some(Script::Hangul));
        assert_eq!(script_of('ж'), Some(Script::Cyrillic));
        assert_eq!(script_of('λ'), Some(Script::Greek));
        assert_eq!(script_of('ع'), Some(Script::Arabic));
    }

    #[test]
    fn ignores_non_letters() {
        assert_eq!(script_of('1'), None);
        assert_eq!(script_of('.'), None);
        assert_eq!(script_of('。'), None);
        assert_eq!(script_of(' '), None);
    }

    #[test]
    fn logographic_chars() {
        assert!(is_logographic('文'));
        assert!(is_logographic('한'));
        assert!(!is_logographic('w'));
    }
}
