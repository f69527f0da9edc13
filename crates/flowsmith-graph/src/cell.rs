//! Cell normalization
//!
//! Sheet exports use a grab-bag of placeholder tokens for "no value": em
//! dashes, lone hyphens, underscore runs, `N/A`, `None`, `nan`. Everything
//! downstream works on the normalized form, so the rules live in one place.

/// Placeholder words that mean "no value", compared case-insensitively.
const EMPTY_WORDS: &[&str] = &["n/a", "none", "nan"];

/// Normalize a raw cell value.
///
/// Returns the trimmed string, or `None` when the cell is blank or holds one
/// of the recognized empty indicators (em dash, hyphen, a run of
/// underscores, or a case-insensitive `n/a` / `none` / `nan`).
///
/// Normalization is idempotent: feeding an already-normalized value back in
/// returns it unchanged, and absent stays absent.
pub fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed == "\u{2014}" || trimmed == "-" {
        return None;
    }
    if trimmed.chars().all(|c| c == '_') {
        return None;
    }
    let lowered = trimmed.to_lowercase();
    if EMPTY_WORDS.contains(&lowered.as_str()) {
        return None;
    }
    Some(trimmed.to_string())
}

/// Normalize an optional raw cell value. Absent-in yields absent-out.
pub fn normalize_opt(raw: Option<&str>) -> Option<String> {
    raw.and_then(normalize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_are_absent() {
        for token in ["\u{2014}", "-", "__", "_", "", "N/A", "n/a", "nan", "None"] {
            assert_eq!(normalize(token), None, "token {:?} should be absent", token);
        }
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(normalize("  hello  "), Some("hello".to_string()));
    }

    #[test]
    fn test_case_insensitive_words() {
        assert_eq!(normalize("NONE"), None);
        assert_eq!(normalize("NaN"), None);
        assert_eq!(normalize("n/A"), None);
    }

    #[test]
    fn test_underscore_runs() {
        assert_eq!(normalize("_____"), None);
        assert_eq!(normalize("_x_"), Some("_x_".to_string()));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let once = normalize("  Confirm Order  ").unwrap();
        assert_eq!(normalize(&once), Some(once.clone()));
        assert_eq!(normalize_opt(None), None);
    }

    #[test]
    fn test_sentinel_surrounded_by_spaces() {
        assert_eq!(normalize("  -  "), None);
    }
}
