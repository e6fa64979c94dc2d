//! Helpers for putting untrusted values into messages.
//!
//! Issuer strings come from tokens and remote metadata, so anything that ends
//! up in a rendered message goes through [`sanitize`] first:
//!
//! - Length is bounded to [`MAX_SANITIZED_LEN`] bytes, cut on a UTF-8 boundary
//! - Control characters become `?`; an ANSI CSI sequence (`ESC [ ... final`)
//!   collapses to one `?`, a lone `ESC` is just a control character
//! - Input made only of control characters renders as `[INVALID_INPUT]`
//!
//! The raw value is still available to code that needs it (for example
//! `InvalidIssuerError::invalid_issuer`); only the message text is bounded.

use crate::logging::TRUNCATION_INDICATOR;
use std::borrow::Cow;

/// Maximum length for sanitized strings in messages.
pub const MAX_SANITIZED_LEN: usize = 256;

/// Placeholder for input with no printable content.
pub const INVALID_INPUT: &str = "[INVALID_INPUT]";

/// Rendering of an empty issuer list.
pub const EMPTY_LIST: &str = "empty";

/// Bound and neutralize an untrusted value for inclusion in a message.
///
/// Borrows when the input is already clean and short enough.
///
/// ```rust
/// use palisade_validation::convenience::{sanitize, MAX_SANITIZED_LEN};
///
/// assert_eq!(sanitize("https://issuer.example"), "https://issuer.example");
/// assert_eq!(sanitize("evil\r\nINFO forged"), "evil??INFO forged");
///
/// let long = "A".repeat(300);
/// let cut = sanitize(&long);
/// assert!(cut.len() <= MAX_SANITIZED_LEN);
/// assert!(cut.ends_with("[TRUNCATED]"));
/// ```
pub fn sanitize(value: &str) -> Cow<'_, str> {
    if value.is_empty() {
        return Cow::Borrowed(value);
    }
    if value.len() <= MAX_SANITIZED_LEN && !value.chars().any(char::is_control) {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(MAX_SANITIZED_LEN.min(value.len()));
    let mut truncated = false;
    let mut saw_printable = false;
    let mut in_csi = false;
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        // CSI: parameter and intermediate bytes (0x20..=0x3F), then one final
        // byte (0x40..=0x7E). Anything else ends the sequence and is kept.
        if in_csi {
            match c {
                '\u{20}'..='\u{3f}' => continue,
                '\u{40}'..='\u{7e}' => {
                    in_csi = false;
                    continue;
                }
                _ => in_csi = false,
            }
        }

        let replacement = if c == '\u{1b}' {
            if chars.next_if_eq(&'[').is_some() {
                in_csi = true;
            }
            '?'
        } else if c.is_control() {
            '?'
        } else {
            saw_printable = true;
            c
        };

        if out.len() + replacement.len_utf8() > MAX_SANITIZED_LEN {
            truncated = true;
            break;
        }
        out.push(replacement);
    }

    if !saw_printable {
        return Cow::Borrowed(INVALID_INPUT);
    }

    if truncated {
        let mut cut = MAX_SANITIZED_LEN.saturating_sub(TRUNCATION_INDICATOR.len());
        while cut > 0 && !out.is_char_boundary(cut) {
            cut -= 1;
        }
        out.truncate(cut);
        out.push_str(TRUNCATION_INDICATOR);
    }

    Cow::Owned(out)
}

/// Comma-join the non-empty entries of an issuer list, sanitized.
///
/// Returns [`EMPTY_LIST`] when nothing remains.
///
/// ```rust
/// use palisade_validation::convenience::join_issuers;
///
/// let list = vec!["a".to_string(), String::new(), "b".to_string()];
/// assert_eq!(join_issuers(&list), "a,b");
/// assert_eq!(join_issuers(&[]), "empty");
/// ```
pub fn join_issuers(issuers: &[String]) -> String {
    let mut joined = String::new();
    for issuer in issuers.iter().filter(|issuer| !issuer.is_empty()) {
        if !joined.is_empty() {
            joined.push(',');
        }
        joined.push_str(&sanitize(issuer));
    }

    if joined.is_empty() {
        joined.push_str(EMPTY_LIST);
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_input_is_borrowed() {
        assert!(matches!(sanitize("issuer"), Cow::Borrowed("issuer")));
        assert!(matches!(sanitize(""), Cow::Borrowed("")));
    }

    #[test]
    fn control_characters_are_replaced() {
        assert_eq!(sanitize("a\tb\0c"), "a?b?c");
    }

    #[test]
    fn ansi_sequences_collapse() {
        assert_eq!(sanitize("\u{1b}[31mred\u{1b}[0m"), "?red?");
        assert_eq!(sanitize("a\u{1b}[2Jb"), "a?b");
        assert_eq!(sanitize("a\u{1b}[1;31;40Hb"), "a?b");
    }

    #[test]
    fn bare_escape_keeps_following_text() {
        assert_eq!(
            sanitize("https://evil.example\u{1b}/tenant-that-is-hidden"),
            "https://evil.example?/tenant-that-is-hidden"
        );
        assert_eq!(sanitize("issuer\u{1b}"), "issuer?");
        assert_eq!(sanitize("\u{1b}\u{1b}[0mok"), "??ok");
    }

    #[test]
    fn unterminated_csi_drops_only_its_parameters() {
        assert_eq!(sanitize("ok\u{1b}[12;34"), "ok?");
        assert_eq!(sanitize("ok\u{1b}[12é"), "ok?é");
    }

    #[test]
    fn control_only_input_is_invalid() {
        assert_eq!(sanitize("\u{1}\u{2}\u{3}"), INVALID_INPUT);
    }

    #[test]
    fn truncation_is_bounded_and_marked() {
        let long = "x".repeat(1000);
        let out = sanitize(&long);
        assert!(out.len() <= MAX_SANITIZED_LEN);
        assert!(out.ends_with(TRUNCATION_INDICATOR));
    }

    #[test]
    fn truncation_respects_utf8() {
        let wide = "🔥".repeat(200);
        let out = sanitize(&wide);
        assert!(out.len() <= MAX_SANITIZED_LEN);
        assert!(out.ends_with(TRUNCATION_INDICATOR));
    }

    #[test]
    fn exactly_at_limit_is_kept() {
        let value = "y".repeat(MAX_SANITIZED_LEN);
        assert_eq!(sanitize(&value), value);
    }

    #[test]
    fn join_skips_empty_entries() {
        let list = vec!["a".to_string(), String::new(), "b".to_string()];
        assert_eq!(join_issuers(&list), "a,b");
        assert_eq!(join_issuers(&[String::new()]), EMPTY_LIST);
    }

    #[test]
    fn join_sanitizes_entries() {
        let list = vec!["a\nb".to_string(), "c".to_string()];
        assert_eq!(join_issuers(&list), "a?b,c");
    }
}
