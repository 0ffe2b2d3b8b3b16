//! Canonical matching form for cell text.

use unicode_normalization::UnicodeNormalization;

use crate::grid::CellValue;

/// Canonical form of a cell value: trimmed, uppercased, diacritics removed.
///
/// Empty cells normalize to the empty string. Raw display text is kept
/// elsewhere for output; this form is only used for comparisons.
pub fn normalize(value: &CellValue) -> String {
    normalize_str(&value.display())
}

/// [`normalize`] for plain strings.
pub fn normalize_str(text: &str) -> String {
    text.trim()
        .to_uppercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Nonspacing marks left behind by NFD decomposition.
const fn is_combining_mark(c: char) -> bool {
    matches!(c,
        '\u{0300}'..='\u{036F}' |
        '\u{1AB0}'..='\u{1AFF}' |
        '\u{1DC0}'..='\u{1DFF}' |
        '\u{20D0}'..='\u{20FF}' |
        '\u{FE20}'..='\u{FE2F}'
    )
}

/// True when `needle` occurs in `haystack` delimited by non-alphanumeric
/// characters (or the string ends). Both sides are expected normalized.
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_accents_case_and_padding_share_one_key() {
        let keys: Vec<String> = ["Condición", "CONDICION", "  condicion  "]
            .iter()
            .map(|s| normalize(&CellValue::from(*s)))
            .collect();
        assert_eq!(keys, vec!["CONDICION", "CONDICION", "CONDICION"]);
    }

    #[test]
    fn test_enye_and_empty() {
        assert_eq!(normalize_str("Año"), "ANO");
        assert_eq!(normalize(&CellValue::Empty), "");
        assert_eq!(normalize(&CellValue::Number(5.0)), "5");
    }

    #[test]
    fn test_contains_word() {
        assert!(contains_word("TOTAL FOB", "FOB"));
        assert!(contains_word("EXP", "EXP"));
        assert!(contains_word("EXP N°", "EXP"));
        assert!(contains_word("REF: EXP-123", "EXP"));
        assert!(!contains_word("EXPORTACION", "EXP"));
        assert!(!contains_word("FOBRA", "FOB"));
        assert!(!contains_word("DIAS", "DIA"));
    }
}
