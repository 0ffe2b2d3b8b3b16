//! Label-anchored field extraction rules for invoice sheets.

pub mod amounts;
pub mod codes;
pub mod dates;
pub mod labeled;
pub mod locator;
pub mod normalize;
pub mod observations;
pub mod patterns;
pub mod rescue;
pub mod resolver;

pub use amounts::{cell_amount, parse_amount};
pub use codes::{CodeExtractor, CodeVocabulary};
pub use dates::DateExtractor;
pub use labeled::{LabeledField, ValuePart};
pub use locator::{find_label, KeywordSet, LabelMatch, MatchMode};
pub use normalize::{contains_word, normalize, normalize_str};
pub use observations::ObservationsExtractor;
pub use patterns::*;
pub use rescue::{PhraseRescue, RescueStrategy};
pub use resolver::{
    any_value, reject_labels, resolve_label, resolve_value, Direction, LabelSpec, NeighborSearch,
    Resolved,
};

use crate::grid::{CellValue, Grid, ScanBounds};
use crate::invoice::table::TableExtraction;

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from one sheet. `None` means the field is absent.
    fn extract(&self, ctx: &SheetContext<'_>) -> Option<Self::Output>;
}

/// Everything a field extractor may read for one document.
#[derive(Debug, Clone, Copy)]
pub struct SheetContext<'a> {
    pub grid: &'a Grid,
    /// Region searched for header labels.
    pub bounds: ScanBounds,
    /// Labels a resolved value must not look like.
    pub known_labels: &'a [LabelSpec],
    /// Text of drawing shapes, fallback only.
    pub embedded_text: &'a [String],
    /// Print header/footer text, fallback only.
    pub print_text: &'a [String],
    /// Product table of the sheet, when one was found.
    pub table: Option<&'a TableExtraction>,
}

impl<'a> SheetContext<'a> {
    pub fn new(grid: &'a Grid) -> Self {
        Self {
            grid,
            bounds: ScanBounds::all(),
            known_labels: &[],
            embedded_text: &[],
            print_text: &[],
            table: None,
        }
    }

    pub fn with_bounds(mut self, bounds: ScanBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_known_labels(mut self, labels: &'a [LabelSpec]) -> Self {
        self.known_labels = labels;
        self
    }

    pub fn with_embedded_text(mut self, text: &'a [String]) -> Self {
        self.embedded_text = text;
        self
    }

    pub fn with_print_text(mut self, text: &'a [String]) -> Self {
        self.print_text = text;
        self
    }

    pub fn with_table(mut self, table: Option<&'a TableExtraction>) -> Self {
        self.table = table;
        self
    }

    /// True when `value` is one of the known labels. Values that merely
    /// mention a label word are not labels.
    pub fn is_label(&self, value: &CellValue) -> bool {
        let text = normalize(value);
        self.known_labels.iter().any(|label| label.is_label_text(&text))
    }
}
