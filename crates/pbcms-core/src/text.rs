//! Small text helpers shared by validation and content normalization.

use regex::Regex;
use std::sync::LazyLock;

static SLUG_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug separator pattern"));

/// Matches a well-formed slug.
pub static SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("valid slug pattern"));

/// Derive a URL slug from a title: lowercase, runs of anything outside
/// `[a-z0-9]` collapse into one hyphen, leading/trailing hyphens dropped.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    SLUG_SEPARATORS
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Escape HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '`' => out.push_str("&#96;"),
            _ => out.push(c),
        }
    }
    out
}

/// First `max` characters of `input` (not bytes).
pub fn truncate_chars(input: &str, max: usize) -> String {
    input.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Market Research & Analysis"), "market-research-analysis");
        assert_eq!(slugify("  --Hello, World!--  "), "hello-world");
        assert_eq!(slugify("UX 2.0"), "ux-2-0");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn slug_pattern_matches_generated_slugs() {
        assert!(SLUG_PATTERN.is_match(&slugify("Data Collection Services")));
        assert!(!SLUG_PATTERN.is_match("Has Spaces"));
        assert!(!SLUG_PATTERN.is_match(""));
    }

    #[test]
    fn escape_html_replaces_markup() {
        assert_eq!(
            escape_html("<b>Tom & \"Jerry\"</b>"),
            "&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;&#x2F;b&gt;"
        );
        assert_eq!(escape_html("plain name"), "plain name");
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
