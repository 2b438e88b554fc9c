use std::sync::LazyLock;

use regex::Regex;

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\p{Arabic}\s-]").expect("valid slug filter regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static HYPHENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-{2,}").expect("valid hyphen regex"));

/// Derive a URL-safe slug from a display title or name.
///
/// Lowercases the input, drops every character that is not a word character,
/// Arabic letter, whitespace or hyphen, turns whitespace runs into single
/// hyphens and trims hyphens from both ends. Arabic text is kept verbatim,
/// never transliterated.
///
/// The result is not guaranteed to be unique: the storage layer's unique
/// index rejects collisions.
pub fn derive_slug(input: &str) -> String {
    let lowered = input.to_lowercase();
    let filtered = DISALLOWED.replace_all(&lowered, "");
    let hyphenated = WHITESPACE.replace_all(&filtered, "-");
    let collapsed = HYPHENS.replace_all(&hyphenated, "-");
    collapsed.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_well_formed(slug: &str) {
        assert!(!slug.starts_with('-'), "leading hyphen in {slug:?}");
        assert!(!slug.ends_with('-'), "trailing hyphen in {slug:?}");
        assert!(!slug.contains("--"), "consecutive hyphens in {slug:?}");
        assert!(!slug.chars().any(char::is_whitespace), "whitespace in {slug:?}");
    }

    #[test]
    fn test_latin_title() {
        assert_eq!(derive_slug("Roof Insulation Guide"), "roof-insulation-guide");
    }

    #[test]
    fn test_arabic_title_is_preserved() {
        let slug = derive_slug("دليل العزل الحراري");
        assert_eq!(slug, "دليل-العزل-الحراري");
    }

    #[test]
    fn test_mixed_script_and_punctuation() {
        assert_eq!(
            derive_slug("  عزل الأسطح: Water-Proofing 2024!! "),
            "عزل-الأسطح-water-proofing-2024"
        );
    }

    #[test]
    fn test_repeated_hyphens_collapse() {
        assert_eq!(derive_slug("a -- b --- c"), "a-b-c");
        assert_eq!(derive_slug("---edge---"), "edge");
    }

    #[test]
    fn test_only_punctuation_yields_empty() {
        assert_eq!(derive_slug("!!! ??? ..."), "");
    }

    #[test]
    fn test_underscore_is_a_word_character() {
        assert_eq!(derive_slug("snake_case Title"), "snake_case-title");
    }

    #[test]
    fn test_idempotent_and_well_formed() {
        let inputs = [
            "Roof Insulation Guide",
            "دليل العزل الحراري",
            "  -- Hello,   World -- ",
            "عزل الأسطح: Water-Proofing 2024!!",
            "Tabs\tand\nnewlines",
            "ÉCOLE Öffentlich",
            "-",
            "",
            "a-",
            "العزل - المائي -- للأسطح",
        ];

        for input in inputs {
            let once = derive_slug(input);
            let twice = derive_slug(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
            assert_well_formed(&once);
            assert_eq!(once, once.to_lowercase());
        }
    }
}
