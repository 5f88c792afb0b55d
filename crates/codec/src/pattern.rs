//! Exactness classification and syntax checking.
//!
//! The matching engine has no notion of an "exact" pattern: a filter fires
//! wherever its regex matches. The find/exact split is purely an editing
//! convention. A pattern wrapped in `.*` on both sides is presented as a
//! *find* (substring) pattern with the wrapper stripped; anything else is
//! presented verbatim as an *exact* pattern. The wrapper is applied to raw
//! bytes right before transport encoding and stripped right after display
//! rendering, so exactness is never stored anywhere.

use std::fmt;

use regex::Regex;

/// How a pattern is presented for editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Pattern used verbatim.
    Exact,
    /// Pattern wrapped in `.*` on both sides before submission.
    Find,
}

impl MatchKind {
    /// Label shown next to a listed pattern.
    pub fn label(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Find => "find",
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Split a display-form pattern into its kind and editable text.
///
/// A string of length >= 4 that starts and ends with `.*` is a find pattern
/// with the wrapper stripped; everything else is exact and comes back
/// unchanged, so classifying an unwrapped pattern is idempotent.
pub fn classify(display: &str) -> (MatchKind, &str) {
    if display.len() >= 4 && display.starts_with(".*") && display.ends_with(".*") {
        (MatchKind::Find, &display[2..display.len() - 2])
    } else {
        (MatchKind::Exact, display)
    }
}

/// Apply the submission wrapper to raw pattern bytes.
///
/// Runs after percent-decoding and before transport encoding; wrapping the
/// display text instead would corrupt escapes.
pub fn wrap_for_submission(raw: &[u8], kind: MatchKind) -> Vec<u8> {
    match kind {
        MatchKind::Exact => raw.to_vec(),
        MatchKind::Find => {
            let mut wrapped = Vec::with_capacity(raw.len() + 4);
            wrapped.extend_from_slice(b".*");
            wrapped.extend_from_slice(raw);
            wrapped.extend_from_slice(b".*");
            wrapped
        },
    }
}

/// Check that pattern text compiles, without running a match.
///
/// Text may use the `/pattern/flags` convention: when a slash is present the
/// second segment is the pattern and the third the flags. Recognized flags
/// (`i`, `m`, `s`, `x`, `U`) become inline modifiers; anything else in the
/// flags position is ignored. Never panics.
pub fn validate_syntax(text: &str) -> bool {
    let (pattern, flags) = split_flags(text);
    let inline: String = flags
        .chars()
        .filter(|c| matches!(c, 'i' | 'm' | 's' | 'x' | 'U'))
        .collect();
    if inline.is_empty() {
        Regex::new(pattern).is_ok()
    } else {
        Regex::new(&format!("(?{inline}){pattern}")).is_ok()
    }
}

fn split_flags(text: &str) -> (&str, &str) {
    let parts: Vec<&str> = text.split('/').collect();
    if parts.len() > 1 {
        (parts[1], parts.get(2).copied().unwrap_or(""))
    } else {
        (text, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwrapped_pattern_is_exact_and_unchanged() {
        assert_eq!(classify("A="), (MatchKind::Exact, "A="));
    }

    #[test]
    fn wrapped_pattern_is_find_with_wrapper_stripped() {
        assert_eq!(classify(".*flag{.*"), (MatchKind::Find, "flag{"));
    }

    #[test]
    fn bare_wrapper_is_too_short_to_strip() {
        assert_eq!(classify(".*"), (MatchKind::Exact, ".*"));
        // Shortest find pattern: empty inner text.
        assert_eq!(classify(".*.*"), (MatchKind::Find, ""));
    }

    #[test]
    fn classify_is_idempotent_on_exact_patterns() {
        let (_, inner) = classify("flag=");
        assert_eq!(classify(inner), (MatchKind::Exact, "flag="));
    }

    #[test]
    fn match_kind_labels_pad_in_tables() {
        assert_eq!(MatchKind::Exact.label(), "exact");
        assert_eq!(format!("{:<5}", MatchKind::Find), "find ");
    }

    #[test]
    fn wrap_then_classify_recovers_the_pattern() {
        let wrapped = wrap_for_submission(b"A=", MatchKind::Find);
        assert_eq!(wrapped, b".*A=.*");
        let display = crate::to_display(&wrapped);
        assert_eq!(classify(&display), (MatchKind::Find, "A="));
    }

    #[test]
    fn exact_wrap_is_a_copy() {
        let raw = b"^USER \\w+$";
        assert_eq!(wrap_for_submission(raw, MatchKind::Exact), raw);
    }

    #[test]
    fn validates_plain_patterns() {
        assert!(validate_syntax("flag\\{[a-zA-Z0-9]+\\}"));
        assert!(!validate_syntax("f(lag"));
    }

    #[test]
    fn validates_slash_flag_convention() {
        assert!(validate_syntax("/flag/i"));
        assert!(validate_syntax("/^a+$/imsxU"));
        // Unknown flags are dropped rather than failing the check.
        assert!(validate_syntax("/abc/g"));
        assert!(!validate_syntax("/f(lag/i"));
    }

    #[test]
    fn validation_never_panics_on_odd_input() {
        assert!(validate_syntax(""));
        assert!(!validate_syntax("("));
        assert!(validate_syntax("//"));
        assert!(validate_syntax("///"));
    }
}
