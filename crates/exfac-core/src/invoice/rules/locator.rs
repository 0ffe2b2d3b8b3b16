//! Label location by fuzzy keyword match.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::normalize::{contains_word, normalize, normalize_str};
use crate::grid::{Coord, Grid, ScanBounds};

/// How a keyword is compared against normalized cell text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Keyword is any substring of the cell.
    #[default]
    Substring,
    /// Keyword equals the cell or appears with word boundaries.
    WholeWord,
}

/// Ordered candidate labels for one logical field, stored normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| normalize_str(k.as_ref()))
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// First keyword matching already-normalized `text`.
    pub fn find(&self, text: &str, mode: MatchMode) -> Option<&str> {
        if text.is_empty() {
            return None;
        }
        self.keywords
            .iter()
            .find(|k| match mode {
                MatchMode::Substring => text.contains(k.as_str()),
                MatchMode::WholeWord => text == k.as_str() || contains_word(text, k),
            })
            .map(String::as_str)
    }

    pub fn matches(&self, text: &str, mode: MatchMode) -> bool {
        self.find(text, mode).is_some()
    }

    /// True when already-normalized `text` is itself one of the labels rather
    /// than a value that happens to mention one.
    ///
    /// That is the keyword alone, or the keyword followed by a short tail
    /// ("EXP N°") or by anything ending in a colon ("FECHA DE EMISION:").
    pub fn is_label_text(&self, text: &str) -> bool {
        let text = text.trim();
        let ends_with_colon = text.ends_with(':');
        let stripped = text.trim_end_matches(|c: char| c == ':' || c.is_whitespace());
        if stripped.is_empty() {
            return false;
        }

        self.keywords.iter().any(|keyword| {
            let Some(rest) = stripped.strip_prefix(keyword.as_str()) else {
                return false;
            };
            if rest.is_empty() {
                return true;
            }
            let at_boundary = rest.chars().next().is_some_and(|c| !c.is_alphanumeric());
            at_boundary && (ends_with_colon || rest.chars().count() <= LABEL_TAIL_CHARS)
        })
    }
}

/// Longest tail after a keyword that still reads as part of the label.
const LABEL_TAIL_CHARS: usize = 6;

/// Coordinate of the first cell matching a keyword set.
pub type LabelMatch = Coord;

/// Scan `bounds` row-major and return the first cell whose normalized text
/// matches any keyword. Absence is an expected outcome, not an error.
pub fn find_label(
    grid: &Grid,
    keywords: &KeywordSet,
    bounds: ScanBounds,
    mode: MatchMode,
) -> Option<LabelMatch> {
    let found = grid
        .cells_in(bounds)
        .find(|(_, value)| keywords.matches(&normalize(value), mode))
        .map(|(coord, _)| coord);

    trace!("label {:?} -> {:?}", keywords.keywords(), found);
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_match_in_scan_order_wins() {
        let grid = Grid::from_text_rows(&[
            &["", "Customer", ""],
            &["Cliente", "", ""],
        ]);
        let keywords = KeywordSet::new(["CLIENTE", "CUSTOMER"]);
        // Row-major order dominates keyword order.
        assert_eq!(
            find_label(&grid, &keywords, ScanBounds::all(), MatchMode::Substring),
            Some(Coord::new(1, 2))
        );
    }

    #[test]
    fn test_whole_word_rejects_embedded_keyword() {
        let grid = Grid::from_text_rows(&[
            &["FACTURA DE EXPORTACION"],
            &["Exp N°"],
        ]);
        let keywords = KeywordSet::new(["EXP"]);

        assert_eq!(
            find_label(&grid, &keywords, ScanBounds::all(), MatchMode::Substring),
            Some(Coord::new(1, 1))
        );
        assert_eq!(
            find_label(&grid, &keywords, ScanBounds::all(), MatchMode::WholeWord),
            Some(Coord::new(2, 1))
        );
    }

    #[test]
    fn test_bounds_limit_the_search() {
        let grid = Grid::from_text_rows(&[&["x"], &["x"], &["Moneda"]]);
        let keywords = KeywordSet::new(["MONEDA"]);
        assert_eq!(
            find_label(&grid, &keywords, ScanBounds::rows(2), MatchMode::Substring),
            None
        );
    }

    #[test]
    fn test_no_match_is_none() {
        let grid = Grid::from_text_rows(&[&["a", "b"]]);
        let keywords = KeywordSet::new(["CLIENTE"]);
        assert_eq!(
            find_label(&grid, &keywords, ScanBounds::all(), MatchMode::WholeWord),
            None
        );
    }

    #[test]
    fn test_accented_keywords_are_normalized() {
        let keywords = KeywordSet::new(["AÑO", "Condición"]);
        assert_eq!(keywords.keywords(), &["ANO".to_string(), "CONDICION".to_string()]);
    }

    #[test]
    fn test_label_text_is_the_label_not_a_mention() {
        let keywords = KeywordSet::new(["CLIENTE", "EXP", "FECHA"]);
        let is_label = |s: &str| keywords.is_label_text(&normalize_str(s));

        assert!(is_label("Cliente"));
        assert!(is_label("Cliente:"));
        assert!(is_label("EXP N°"));
        assert!(is_label("Fecha de emisión:"));

        assert!(!is_label("Entregar al cliente en bodega central"));
        assert!(!is_label("Exp. Frutícola del Sur Ltda"));
        assert!(!is_label("Exportadora"));
        assert!(!is_label("Observaciones: cliente retira"));
        assert!(!is_label(""));
    }
}
