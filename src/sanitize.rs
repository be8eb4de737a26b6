//! Text scrubbing for user-supplied `name`/`description` fields.
//!
//! Not a substitute for parameterized SQL (all storage here already binds
//! parameters) — this exists to keep stored and displayed text free of
//! control characters and the usual injection-adjacent punctuation before
//! it round-trips through logs, JSON responses, and the entity tables.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Control chars, quoting/escape characters, statement and comment
/// delimiters, angle brackets, template-injection markers, and logical
/// chaining operators.
static DANGEROUS_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)[\x00-\x1F\x7F]|['"`\\]|;|--|/\*|\*/|<|>|\$\{|\|\||&&|\b(eval|exec|import|require|process|os|sys)\b"#,
    )
    .expect("DANGEROUS_CHARS pattern is a fixed literal")
});

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("WHITESPACE_RUN pattern is a fixed literal"));

/// Scrub `value` for storage/display: NFKC-normalize, strip the characters
/// in [`DANGEROUS_CHARS`], drop remaining Unicode control/formatting
/// characters, collapse whitespace runs, and optionally clamp length.
pub fn sanitize(value: &str, max_length: Option<usize>) -> String {
    let normalized: String = value.nfkc().collect();
    let stripped = DANGEROUS_CHARS.replace_all(&normalized, "");
    let no_control: String = stripped
        .chars()
        .filter(|c| !c.is_control() && !is_unicode_format(*c))
        .collect();
    let collapsed = WHITESPACE_RUN.replace_all(&no_control, " ");
    let trimmed = collapsed.trim();

    match max_length {
        Some(limit) => trimmed.chars().take(limit).collect(),
        None => trimmed.to_string(),
    }
}

/// Unicode general category "Cf" (format) — not covered by
/// `char::is_control`, which only matches "Cc".
fn is_unicode_format(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{FEFF}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_quotes_and_statement_chaining() {
        assert_eq!(sanitize("Robert'); DROP TABLE users;--", None), "Robert DROP TABLE users");
    }

    #[test]
    fn strips_html_and_template_injection() {
        assert_eq!(sanitize("<script>${evil}</script>", None), "scriptevilscript");
    }

    #[test]
    fn collapses_whitespace_and_trims() {
        assert_eq!(sanitize("  too   much   space  ", None), "too much space");
    }

    #[test]
    fn clamps_to_max_length() {
        assert_eq!(sanitize("abcdefgh", Some(3)), "abc");
    }

    #[test]
    fn leaves_plain_unicode_text_alone() {
        assert_eq!(sanitize("Café Münchën", None), "Café Münchën");
    }
}
