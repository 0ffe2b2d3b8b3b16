//! Plain label fields: locate, resolve, optionally split.

use super::patterns::DASH_SEPARATOR;
use super::resolver::{resolve_label, LabelSpec, NeighborSearch};
use super::{FieldExtractor, SheetContext};
use crate::grid::CellValue;

/// Which part of a `"<a> - <b>"` value a field keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValuePart {
    #[default]
    Whole,
    BeforeDash,
    AfterDash,
}

impl ValuePart {
    /// Apply to a resolved value. Non-text values only survive `Whole`
    /// and `BeforeDash`; a missing second part is absent.
    pub fn apply(self, value: CellValue) -> Option<CellValue> {
        match self {
            ValuePart::Whole => Some(value),
            ValuePart::BeforeDash | ValuePart::AfterDash => {
                let CellValue::Text(text) = &value else {
                    return (self == ValuePart::BeforeDash).then_some(value);
                };
                let mut parts = DASH_SEPARATOR.splitn(text, 2);
                let part = match self {
                    ValuePart::AfterDash => parts.nth(1),
                    _ => parts.next(),
                }?;
                let part = part.trim();
                (!part.is_empty()).then(|| CellValue::Text(part.to_string()))
            }
        }
    }
}

/// A header field resolved from one label.
#[derive(Debug, Clone)]
pub struct LabeledField {
    pub label: LabelSpec,
    pub search: NeighborSearch,
    pub part: ValuePart,
}

impl LabeledField {
    pub fn new(label: LabelSpec, search: NeighborSearch) -> Self {
        Self {
            label,
            search,
            part: ValuePart::Whole,
        }
    }

    pub fn with_part(mut self, part: ValuePart) -> Self {
        self.part = part;
        self
    }
}

impl FieldExtractor for LabeledField {
    type Output = CellValue;

    fn extract(&self, ctx: &SheetContext<'_>) -> Option<CellValue> {
        let resolved = resolve_label(ctx.grid, &self.label, ctx.bounds, &self.search, |v| {
            !ctx.is_label(v)
        })?;
        self.part.apply(resolved.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::invoice::rules::resolver::Direction;
    use pretty_assertions::assert_eq;

    fn text(value: Option<CellValue>) -> Option<String> {
        value.map(|v| v.display())
    }

    #[test]
    fn test_dash_split() {
        let value = CellValue::from("Venta firme – FOB");
        assert_eq!(
            text(ValuePart::BeforeDash.apply(value.clone())),
            Some("Venta firme".to_string())
        );
        assert_eq!(
            text(ValuePart::AfterDash.apply(value.clone())),
            Some("FOB".to_string())
        );
        assert_eq!(
            text(ValuePart::Whole.apply(value)),
            Some("Venta firme – FOB".to_string())
        );
    }

    #[test]
    fn test_missing_second_part_is_absent() {
        let value = CellValue::from("Venta firme");
        assert_eq!(ValuePart::AfterDash.apply(value.clone()), None);
        assert_eq!(
            text(ValuePart::BeforeDash.apply(value)),
            Some("Venta firme".to_string())
        );
        assert_eq!(ValuePart::AfterDash.apply(CellValue::Number(3.0)), None);
    }

    #[test]
    fn test_known_labels_are_not_values() {
        let grid = Grid::from_text_rows(&[
            &["CLIENTE", "PUERTO EMBARQUE"],
            &["", "San Antonio"],
        ]);
        let labels = vec![
            LabelSpec::substring(["CLIENTE"]),
            LabelSpec::substring(["PUERTO EMBARQUE"]),
        ];
        let field = LabeledField::new(
            LabelSpec::substring(["CLIENTE"]),
            NeighborSearch::new(&[Direction::Below, Direction::Right], 5),
        );

        let ctx = SheetContext::new(&grid).with_known_labels(&labels);
        assert_eq!(field.extract(&ctx), None);

        let port = LabeledField::new(
            LabelSpec::substring(["PUERTO EMBARQUE"]),
            NeighborSearch::default(),
        );
        assert_eq!(text(port.extract(&ctx)), Some("San Antonio".to_string()));
    }

    #[test]
    fn test_value_mentioning_a_label_word_is_kept() {
        let grid = Grid::from_text_rows(&[&["CLIENTE"], &["Exp. Frutícola del Sur Ltda"]]);
        let labels = vec![
            LabelSpec::substring(["CLIENTE"]),
            LabelSpec::whole_word(["EXP", "EXP N°"]),
        ];
        let field = LabeledField::new(
            LabelSpec::substring(["CLIENTE"]),
            NeighborSearch::new(&[Direction::Below, Direction::Right], 5),
        );

        let ctx = SheetContext::new(&grid).with_known_labels(&labels);
        assert_eq!(
            text(field.extract(&ctx)),
            Some("Exp. Frutícola del Sur Ltda".to_string())
        );
    }
}
