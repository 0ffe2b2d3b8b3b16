//! Observations: free text near the bottom of the sheet.
//!
//! Strategies run in order until one yields text:
//! 1. the value to the right of the label,
//! 2. the block of lines below the label,
//! 3. the longest sentence in the footer region,
//! 4. print header/footer text,
//! 5. the longest drawing text.

use tracing::debug;

use super::amounts::cell_amount;
use super::normalize::{normalize, normalize_str};
use super::patterns::FOOTER_MARKER;
use super::resolver::{resolve_value, Direction, LabelSpec, NeighborSearch};
use super::{FieldExtractor, SheetContext};
use crate::grid::{CellValue, Coord, ScanBounds};
use crate::invoice::table::ColumnRole;

#[derive(Debug, Clone)]
pub struct ObservationsExtractor {
    label: LabelSpec,
    /// Right-hand search for `OBSERVACIONES: <value>` layouts.
    beside: NeighborSearch,
    /// Blank rows tolerated between the label and the first line.
    block_steps: u32,
    footer_rows: u32,
    min_length: usize,
    use_embedded_text: bool,
}

impl ObservationsExtractor {
    pub fn new() -> Self {
        Self {
            label: LabelSpec::substring([
                "OBSERVACIONES",
                "OBSERVACION",
                "OBSERVATIONS",
                "COMENTARIOS",
                "REMARKS",
                "NOTES",
                "NOTAS",
            ]),
            beside: NeighborSearch::new(&[Direction::Right], 5).with_inline(true),
            block_steps: 25,
            footer_rows: 30,
            min_length: 20,
            use_embedded_text: true,
        }
    }

    pub fn with_beside_steps(mut self, steps: u32) -> Self {
        self.beside.max_steps = steps;
        self
    }

    pub fn with_block_steps(mut self, steps: u32) -> Self {
        self.block_steps = steps;
        self
    }

    pub fn with_footer_rows(mut self, rows: u32) -> Self {
        self.footer_rows = rows;
        self
    }

    pub fn with_min_length(mut self, length: usize) -> Self {
        self.min_length = length;
        self
    }

    pub fn with_embedded_text(mut self, enabled: bool) -> Self {
        self.use_embedded_text = enabled;
        self
    }

    pub fn label(&self) -> &LabelSpec {
        &self.label
    }

    /// Lines below the label, joined with spaces.
    ///
    /// Leading blanks up to `block_steps` are skipped. Once text has started,
    /// a single blank row is tolerated; a second one, a footer line or
    /// another label ends the block.
    fn block_below(&self, ctx: &SheetContext<'_>, origin: Coord) -> Option<String> {
        let mut lines: Vec<String> = Vec::new();
        let mut blanks = 0u32;
        let mut row = origin.row + 1;

        while row <= ctx.grid.max_row() {
            match ctx.grid.value(row, origin.col) {
                None => {
                    blanks += 1;
                    let limit = if lines.is_empty() { self.block_steps } else { 1 };
                    if blanks > limit {
                        break;
                    }
                }
                Some(value) => {
                    let key = normalize(value);
                    if FOOTER_MARKER.is_match(&key) || ctx.is_label(value) {
                        break;
                    }
                    lines.push(value.display());
                    blanks = 0;
                }
            }
            row += 1;
        }

        (!lines.is_empty()).then(|| lines.join(" "))
    }

    fn qualifies(&self, text: &str) -> bool {
        text.chars().count() >= self.min_length && !FOOTER_MARKER.is_match(&normalize_str(text))
    }

    /// Longest qualifying text cell in the last `footer_rows` rows.
    ///
    /// With a product table the region starts after the table's last row,
    /// and description cells that carry a unit price are product lines.
    fn footer_scan(&self, ctx: &SheetContext<'_>) -> Option<String> {
        let last = ctx.grid.max_row();
        let mut first = last.saturating_sub(self.footer_rows.saturating_sub(1)).max(1);
        if let Some(table) = ctx.table {
            first = first.max(table.end_row.saturating_add(1));
        }
        let mut best: Option<String> = None;

        for (coord, value) in ctx.grid.cells_in(ScanBounds::row_range(first, last)) {
            if !matches!(value, CellValue::Text(_))
                || ctx.is_label(value)
                || is_product_line(ctx, coord)
            {
                continue;
            }
            let text = value.display();
            if self.qualifies(&text) && best.as_ref().is_none_or(|b| text.len() > b.len()) {
                best = Some(text);
            }
        }
        best
    }

    fn longest_of(&self, texts: &[String]) -> Option<String> {
        let mut best: Option<&str> = None;
        for text in texts.iter().map(|t| t.trim()) {
            if self.qualifies(text) && best.is_none_or(|b| text.len() > b.len()) {
                best = Some(text);
            }
        }
        best.map(str::to_string)
    }
}

fn is_product_line(ctx: &SheetContext<'_>, coord: Coord) -> bool {
    let Some(columns) = ctx.table.map(|t| &t.columns) else {
        return false;
    };
    columns.get(ColumnRole::Description) == Some(coord.col)
        && columns
            .get(ColumnRole::UnitPrice)
            .is_some_and(|col| cell_amount(ctx.grid.get(coord.row, col)) > 0.0)
}

impl Default for ObservationsExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for ObservationsExtractor {
    type Output = CellValue;

    fn extract(&self, ctx: &SheetContext<'_>) -> Option<CellValue> {
        if let Some(origin) = self.label.locate(ctx.grid, ScanBounds::all()) {
            if let Some(resolved) =
                resolve_value(ctx.grid, origin, &self.beside, |v| !ctx.is_label(v))
            {
                debug!("Observations beside label at {:?}", resolved.coord);
                return Some(resolved.value);
            }
            if let Some(block) = self.block_below(ctx, origin) {
                debug!("Observations block below label at {:?}", origin);
                return Some(CellValue::Text(block));
            }
        }

        if let Some(text) = self.footer_scan(ctx) {
            debug!("Observations from footer region");
            return Some(CellValue::Text(text));
        }

        if let Some(text) = self.longest_of(ctx.print_text) {
            debug!("Observations from print header/footer");
            return Some(CellValue::Text(text));
        }

        if self.use_embedded_text {
            if let Some(text) = self.longest_of(ctx.embedded_text) {
                debug!("Observations from drawing text");
                return Some(CellValue::Text(text));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::invoice::table::TableExtractor;
    use pretty_assertions::assert_eq;

    fn extract(grid: &Grid) -> Option<String> {
        ObservationsExtractor::default()
            .extract(&SheetContext::new(grid))
            .map(|v| v.display())
    }

    #[test]
    fn test_value_beside_label() {
        let grid = Grid::from_text_rows(&[&["OBSERVACIONES", "", "Pallets fumigados"]]);
        assert_eq!(extract(&grid), Some("Pallets fumigados".to_string()));
    }

    #[test]
    fn test_inline_label_value() {
        let grid = Grid::from_text_rows(&[&["Observaciones: entregar en bodega 3"]]);
        assert_eq!(extract(&grid), Some("entregar en bodega 3".to_string()));
    }

    #[test]
    fn test_block_below_skips_leading_blanks_and_one_gap() {
        let grid = Grid::from_text_rows(&[
            &["OBSERVACIONES"],
            &[""],
            &[""],
            &["Carga consolidada"],
            &[""],
            &["en contenedor 40HC"],
            &[""],
            &[""],
            &["unrelated trailing note"],
        ]);
        assert_eq!(
            extract(&grid),
            Some("Carga consolidada en contenedor 40HC".to_string())
        );
    }

    #[test]
    fn test_block_stops_at_footer_marker() {
        let grid = Grid::from_text_rows(&[
            &["Notes"],
            &["Handle with care"],
            &["TOTAL FOB USD"],
            &["after the total"],
        ]);
        assert_eq!(extract(&grid), Some("Handle with care".to_string()));
    }

    #[test]
    fn test_footer_region_longest_text() {
        let grid = Grid::from_text_rows(&[
            &["CLIENTE", "ACME"],
            &["short note", ""],
            &["Mercadería viaja por cuenta y riesgo del comprador", ""],
            &["TOTAL GENERAL DE LA FACTURA EN DOLARES", ""],
        ]);
        assert_eq!(
            extract(&grid),
            Some("Mercadería viaja por cuenta y riesgo del comprador".to_string())
        );
    }

    #[test]
    fn test_print_then_embedded_fallbacks() {
        let grid = Grid::from_text_rows(&[&["CLIENTE", "ACME"]]);
        let print = vec!["Embarque sujeto a confirmacion de naviera".to_string()];
        let embedded = vec!["Documento válido sin firma ni timbre".to_string()];
        let extractor = ObservationsExtractor::default();

        let ctx = SheetContext::new(&grid)
            .with_print_text(&print)
            .with_embedded_text(&embedded);
        assert_eq!(
            extractor.extract(&ctx).map(|v| v.display()),
            Some("Embarque sujeto a confirmacion de naviera".to_string())
        );

        let ctx = SheetContext::new(&grid).with_embedded_text(&embedded);
        assert_eq!(extractor.extract(&ctx), None);

        let embedded = vec!["Mercadería sujeta a inspección SAG".to_string()];
        let ctx = SheetContext::new(&grid).with_embedded_text(&embedded);
        assert_eq!(
            extractor.extract(&ctx).map(|v| v.display()),
            Some("Mercadería sujeta a inspección SAG".to_string())
        );
    }

    #[test]
    fn test_nothing_found_is_none() {
        let grid = Grid::from_text_rows(&[&["CLIENTE", "ACME"]]);
        assert_eq!(extract(&grid), None);
    }

    #[test]
    fn test_text_mentioning_a_label_word_is_observation() {
        let grid = Grid::from_text_rows(&[
            &["CLIENTE", "ACME"],
            &["OBSERVACIONES", ""],
            &["Entregar al cliente en bodega central", ""],
        ]);
        let labels = vec![LabelSpec::substring(["CLIENTE"])];
        let ctx = SheetContext::new(&grid).with_known_labels(&labels);

        assert_eq!(
            ObservationsExtractor::default()
                .extract(&ctx)
                .map(|v| v.display()),
            Some("Entregar al cliente en bodega central".to_string())
        );
    }

    #[test]
    fn test_block_continues_past_words_starting_with_total() {
        let grid = Grid::from_text_rows(&[
            &["OBSERVACIONES"],
            &["Mercadería totalmente inspeccionada"],
            &["en origen"],
        ]);
        assert_eq!(
            extract(&grid),
            Some("Mercadería totalmente inspeccionada en origen".to_string())
        );
    }

    #[test]
    fn test_footer_region_skips_product_table() {
        let rows: Vec<Vec<CellValue>> = vec![
            vec!["CANTIDAD".into(), "DESCRIPCION".into(), "PRECIO UNITARIO".into()],
            vec![
                CellValue::Number(10.0),
                "Uva red globe calibre XL en cajas de 8,2 kg".into(),
                CellValue::Number(12.5),
            ],
            vec![CellValue::Empty, "TOTAL".into(), CellValue::Number(125.0)],
        ];
        let grid = Grid::from_rows(rows);
        let table = TableExtractor::default().extract(&grid);
        assert!(table.is_some());

        let ctx = SheetContext::new(&grid).with_table(table.as_ref());
        assert_eq!(ObservationsExtractor::default().extract(&ctx), None);

        let mut rows = grid_rows_with_note();
        rows.insert(
            1,
            vec![
                CellValue::Number(10.0),
                "Uva red globe calibre XL en cajas de 8,2 kg".into(),
                CellValue::Number(12.5),
            ],
        );
        let grid = Grid::from_rows(rows);
        let table = TableExtractor::default().extract(&grid);
        let ctx = SheetContext::new(&grid).with_table(table.as_ref());
        assert_eq!(
            ObservationsExtractor::default()
                .extract(&ctx)
                .map(|v| v.display()),
            Some("Fruta sujeta a inspeccion fitosanitaria".to_string())
        );
    }

    fn grid_rows_with_note() -> Vec<Vec<CellValue>> {
        vec![
            vec!["CANTIDAD".into(), "DESCRIPCION".into(), "PRECIO UNITARIO".into()],
            vec![CellValue::Empty, "TOTAL".into(), CellValue::Number(125.0)],
            vec![CellValue::Empty, "Fruta sujeta a inspeccion fitosanitaria".into()],
        ]
    }
}
