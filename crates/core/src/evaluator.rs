//! Answer checking.
//!
//! Input and accepted answer are both lowercased and trimmed, then compared
//! exactly. Accented letters are distinct: `a` does not match `á`.

/// Normalized form used for comparison.
#[must_use]
pub fn normalize_answer(raw: &str) -> String {
    raw.to_lowercase().trim().to_owned()
}

/// Returns true when `input` matches `accepted` after normalization.
#[must_use]
pub fn is_correct(input: &str, accepted: &str) -> bool {
    normalize_answer(input) == normalize_answer(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_case_and_surrounding_whitespace() {
        assert!(is_correct("  Hestinn ", "hestinn"));
        assert!(is_correct("ÞÚ", "þú"));
    }

    #[test]
    fn inner_whitespace_is_significant() {
        assert!(!is_correct("hest inn", "hestinn"));
    }

    #[test]
    fn accents_are_not_folded() {
        assert!(!is_correct("a", "á"));
        assert!(!is_correct("hus", "hús"));
    }

    #[test]
    fn empty_input_never_matches() {
        assert!(!is_correct("", "hestinn"));
        assert!(!is_correct("   ", "hestinn"));
    }
}
