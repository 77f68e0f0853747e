//! Name normalization for matching.
//!
//! Both the indexed names and incoming queries go through [`normalize`], so
//! matching is insensitive to case, accents and spacing.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lower-cases, strips diacritics and collapses whitespace.
///
/// Decomposes to NFD and drops combining marks, so "José" and "Jose" both
/// become "jose". Never fails; an empty or blank input yields "".
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits normalized text into its whitespace-separated tokens.
pub fn tokens(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_accents_and_case() {
        assert_eq!(normalize("José"), "jose");
        assert_eq!(normalize("JOSE"), "jose");
        assert_eq!(normalize("Gödel, Kurt"), "godel, kurt");
        assert_eq!(normalize("Erdős"), "erdos");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(normalize("  Ada \t  Lovelace\n"), "ada lovelace");
    }

    #[test]
    fn test_precomposed_and_decomposed_agree() {
        // "é" as one code point vs "e" + combining acute accent
        assert_eq!(normalize("Jos\u{00e9}"), normalize("Jose\u{0301}"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_tokens() {
        let n = normalize("Numbers,  Ronald L.");
        assert_eq!(tokens(&n), vec!["numbers,", "ronald", "l."]);
    }
}
