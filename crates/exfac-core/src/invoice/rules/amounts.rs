//! Lenient numeric parsing for quantity, price and total cells.

use super::patterns::NON_NUMERIC;
use crate::grid::CellValue;

/// Parse a loosely formatted amount ("USD 1.234,50", "1,234.50", "12.5").
///
/// Everything except digits, `.`, `,` and `-` is stripped first. When both
/// separators appear the last one is the decimal mark; a separator repeated
/// on its own is a thousands mark; a single lone comma is a decimal comma.
pub fn parse_amount(s: &str) -> Option<f64> {
    let cleaned = NON_NUMERIC.replace_all(s, "");
    let negative = cleaned.starts_with('-');
    let digits: String = cleaned.chars().filter(|c| *c != '-').collect();

    if !digits.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let commas = digits.matches(',').count();
    let dots = digits.matches('.').count();

    let normalized = match (commas, dots) {
        (0, 0) => digits,
        (_, 0) if commas > 1 => digits.replace(',', ""),
        (_, 0) => digits.replace(',', "."),
        (0, _) if dots > 1 => digits.replace('.', ""),
        (0, _) => digits,
        _ => {
            let last_comma = digits.rfind(',');
            let last_dot = digits.rfind('.');
            match (last_comma, last_dot) {
                (Some(c), Some(d)) if c > d => digits.replace('.', "").replace(',', "."),
                _ => digits.replace(',', ""),
            }
        }
    };

    let value: f64 = normalized.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Numeric value of a cell, 0.0 when blank or unparseable.
pub fn cell_amount(value: Option<&CellValue>) -> f64 {
    match value {
        Some(CellValue::Number(n)) => *n,
        Some(CellValue::Text(s)) => parse_amount(s).unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount("12.5"), Some(12.5));
        assert_eq!(parse_amount("12,5"), Some(12.5));
        assert_eq!(parse_amount("1.234,56"), Some(1234.56));
        assert_eq!(parse_amount("1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("1.234.567"), Some(1234567.0));
        assert_eq!(parse_amount("1,234,567"), Some(1234567.0));
        assert_eq!(parse_amount("US$ 2.500,00"), Some(2500.0));
        assert_eq!(parse_amount("-15"), Some(-15.0));
    }

    #[test]
    fn test_non_numeric_is_none() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("N/A"), None);
        assert_eq!(parse_amount("-"), None);
    }

    #[test]
    fn test_cell_amount_defaults_to_zero() {
        assert_eq!(cell_amount(Some(&CellValue::Number(3.0))), 3.0);
        assert_eq!(cell_amount(Some(&CellValue::from("abc"))), 0.0);
        assert_eq!(cell_amount(Some(&CellValue::Empty)), 0.0);
        assert_eq!(cell_amount(None), 0.0);
    }
}
