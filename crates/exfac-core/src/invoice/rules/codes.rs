//! Currency and incoterm code detection.
//!
//! Codes are terse and often sit loose in the sheet ("TOTAL FOB", "US$"), so
//! a bounded scan of every cell against a closed vocabulary runs first. The
//! label next to the code is only consulted when the scan finds nothing.

use tracing::debug;

use super::normalize::{contains_word, normalize, normalize_str};
use super::resolver::{resolve_label, LabelSpec, NeighborSearch};
use super::{FieldExtractor, SheetContext};
use crate::grid::{CellValue, Grid, ScanBounds};

const CURRENCY_TERMS: &[(&str, &str)] = &[
    ("DOLARES AMERICANOS", "USD"),
    ("DOLARES", "USD"),
    ("DOLAR", "USD"),
    ("US DOLLAR", "USD"),
    ("US$", "USD"),
    ("USD", "USD"),
    ("EUROS", "EUR"),
    ("EURO", "EUR"),
    ("EUR", "EUR"),
    ("PESOS CHILENOS", "CLP"),
    ("PESO CHILENO", "CLP"),
    ("CLP", "CLP"),
    ("LIBRAS ESTERLINAS", "GBP"),
    ("LIBRA ESTERLINA", "GBP"),
    ("GBP", "GBP"),
    ("YEN", "JPY"),
    ("JPY", "JPY"),
    ("YUAN", "CNY"),
    ("RMB", "CNY"),
    ("CNY", "CNY"),
];

const INCOTERMS: &[&str] = &[
    "EXW", "FCA", "FAS", "FOB", "CFR", "CIF", "CPT", "CIP", "DAP", "DPU", "DAT", "DDP",
];

/// Closed term list mapping whole-word matches to a canonical code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeVocabulary {
    entries: Vec<(String, String)>,
}

impl CodeVocabulary {
    pub fn new<I, T, C>(entries: I) -> Self
    where
        I: IntoIterator<Item = (T, C)>,
        T: AsRef<str>,
        C: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(term, code)| (normalize_str(term.as_ref()), code.into()))
                .filter(|(term, _)| !term.is_empty())
                .collect(),
        }
    }

    /// Currency names, symbols and ISO codes.
    pub fn currencies() -> Self {
        Self::new(CURRENCY_TERMS.iter().copied())
    }

    /// Incoterms 2010/2020 codes.
    pub fn incoterms() -> Self {
        Self::new(INCOTERMS.iter().map(|code| (*code, *code)))
    }

    /// Code of the first vocabulary term found in normalized `text`.
    pub fn lookup(&self, text: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(term, _)| contains_word(text, term))
            .map(|(_, code)| code.as_str())
    }

    /// Scan `bounds` row-major; the first cell carrying a term wins.
    pub fn scan(&self, grid: &Grid, bounds: ScanBounds) -> Option<&str> {
        grid.cells_in(bounds).find_map(|(coord, value)| {
            let code = self.lookup(&normalize(value))?;
            debug!("Code {} found at {:?}", code, coord);
            Some(code)
        })
    }
}

/// Vocabulary scan with a label fallback.
#[derive(Debug, Clone)]
pub struct CodeExtractor {
    vocabulary: CodeVocabulary,
    label: LabelSpec,
    search: NeighborSearch,
    scan_bounds: ScanBounds,
}

impl CodeExtractor {
    pub fn new(vocabulary: CodeVocabulary, label: LabelSpec, search: NeighborSearch) -> Self {
        Self {
            vocabulary,
            label,
            search,
            scan_bounds: ScanBounds::rows(150),
        }
    }

    pub fn currency(search: NeighborSearch) -> Self {
        Self::new(
            CodeVocabulary::currencies(),
            LabelSpec::substring(["MONEDA", "CURRENCY", "DIVISA"]),
            search,
        )
    }

    pub fn incoterm(search: NeighborSearch) -> Self {
        Self::new(
            CodeVocabulary::incoterms(),
            LabelSpec::whole_word(["INCOTERM", "INCOTERMS"]),
            search,
        )
    }

    pub fn with_scan_bounds(mut self, bounds: ScanBounds) -> Self {
        self.scan_bounds = bounds;
        self
    }

    pub fn label(&self) -> &LabelSpec {
        &self.label
    }

    /// Canonical code for a free value, or the value itself when no term matches.
    pub fn canonicalize(&self, value: CellValue) -> CellValue {
        match self.vocabulary.lookup(&normalize(&value)) {
            Some(code) => CellValue::Text(code.to_string()),
            None => value,
        }
    }
}

impl FieldExtractor for CodeExtractor {
    type Output = CellValue;

    fn extract(&self, ctx: &SheetContext<'_>) -> Option<CellValue> {
        if let Some(code) = self.vocabulary.scan(ctx.grid, self.scan_bounds) {
            return Some(CellValue::Text(code.to_string()));
        }

        let resolved = resolve_label(ctx.grid, &self.label, ctx.bounds, &self.search, |v| {
            !ctx.is_label(v)
        })?;
        debug!("Code resolved from label at {:?}", resolved.coord);
        Some(self.canonicalize(resolved.value))
    }
}
