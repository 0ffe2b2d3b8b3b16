//! Product table detection and row streaming.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::rules::{cell_amount, normalize, normalize_str, KeywordSet, MatchMode};
use crate::grid::{Grid, ScanBounds};
use crate::models::config::{StopRule, TableConfig};
use crate::models::record::ProductRow;

/// Meaning of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Quantity,
    Description,
    UnitPrice,
    LineTotal,
}

/// Column index (1-based) per role within the header row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub quantity: Option<u32>,
    pub description: Option<u32>,
    pub unit_price: Option<u32>,
    pub line_total: Option<u32>,
}

impl ColumnMap {
    pub fn get(&self, role: ColumnRole) -> Option<u32> {
        match role {
            ColumnRole::Quantity => self.quantity,
            ColumnRole::Description => self.description,
            ColumnRole::UnitPrice => self.unit_price,
            ColumnRole::LineTotal => self.line_total,
        }
    }

    /// Assign `col` to `role` unless the role is already taken.
    fn assign(&mut self, role: ColumnRole, col: u32) {
        let slot = match role {
            ColumnRole::Quantity => &mut self.quantity,
            ColumnRole::Description => &mut self.description,
            ColumnRole::UnitPrice => &mut self.unit_price,
            ColumnRole::LineTotal => &mut self.line_total,
        };
        slot.get_or_insert(col);
    }
}

/// Why row streaming ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A description matched a stop marker; that row is excluded.
    StopRow,
    /// More consecutive blank descriptions than the patience allows.
    BlankPatience,
    /// The last grid row was reached.
    EndOfGrid,
}

/// Outcome of a table scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableExtraction {
    pub header_row: u32,
    pub columns: ColumnMap,
    pub products: Vec<ProductRow>,
    pub stopped_by: StopReason,
    /// Last row the scan examined; later rows are outside the table.
    pub end_row: u32,
}

/// Locates the product table and streams its rows.
#[derive(Debug, Clone)]
pub struct TableExtractor {
    config: TableConfig,
    quantity: KeywordSet,
    description: KeywordSet,
    unit_price: KeywordSet,
    line_total: KeywordSet,
    footer_totals: KeywordSet,
    stop_markers: KeywordSet,
}

impl TableExtractor {
    pub fn new(config: TableConfig) -> Self {
        let stop_markers = KeywordSet::new(&config.stop_markers);
        Self {
            quantity: KeywordSet::new(["CANT", "QTY", "QUANTITY", "UNIDADES"]),
            description: KeywordSet::new([
                "DESCRIP",
                "DETALLE",
                "PRODUCTO",
                "GOODS",
                "MERCADERIA",
                "MERCHANDISE",
            ]),
            unit_price: KeywordSet::new(["UNIT", "PRECIO", "PRICE", "P.U", "VALOR UNIT"]),
            line_total: KeywordSet::new([
                "TOTAL",
                "SUBTOTAL",
                "IMPORTE",
                "AMOUNT",
                "MONTO",
                "VALOR TOTAL",
            ]),
            // Summary cells that sit in the header row but are not a per-row total.
            footer_totals: KeywordSet::new([
                "TOTAL CASES",
                "TOTAL CAJAS",
                "TOTAL BOXES",
                "TOTAL BULTOS",
                "TOTAL FOB",
                "TOTAL CIF",
            ]),
            stop_markers,
            config,
        }
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Role of a header cell from its normalized text.
    pub fn classify_header(&self, text: &str) -> Option<ColumnRole> {
        if self.quantity.matches(text, MatchMode::Substring) {
            return Some(ColumnRole::Quantity);
        }
        if self.description.matches(text, MatchMode::Substring) {
            return Some(ColumnRole::Description);
        }

        let is_unit = self.unit_price.matches(text, MatchMode::Substring);
        let is_total = self.line_total.matches(text, MatchMode::Substring)
            && !self.footer_totals.matches(text, MatchMode::Substring);

        match (is_unit, is_total) {
            (true, true) if text.contains("UNIT") => Some(ColumnRole::UnitPrice),
            (_, true) => Some(ColumnRole::LineTotal),
            (true, false) => Some(ColumnRole::UnitPrice),
            (false, false) => None,
        }
    }

    fn map_row(&self, grid: &Grid, row: u32) -> ColumnMap {
        let mut columns = ColumnMap::default();
        for (coord, value) in grid.cells_in(ScanBounds::row_range(row, row)) {
            if let Some(role) = self.classify_header(&normalize(value)) {
                columns.assign(role, coord.col);
            }
        }
        columns
    }

    /// First row with both a description and a quantity header.
    pub fn locate_header(&self, grid: &Grid) -> Option<(u32, ColumnMap)> {
        let last = self.config.header_rows.min(grid.max_row());
        (1..=last).find_map(|row| {
            let columns = self.map_row(grid, row);
            (columns.description.is_some() && columns.quantity.is_some()).then_some((row, columns))
        })
    }

    fn is_stop_row(&self, key: &str) -> bool {
        self.stop_markers.keywords().iter().any(|marker| match self.config.stop_rule {
            StopRule::StartsWith => key.starts_with(marker.as_str()),
            StopRule::Contains => key.contains(marker.as_str()),
        })
    }

    /// Detect the table and collect accepted rows. `None` when no header row
    /// qualifies.
    pub fn extract(&self, grid: &Grid) -> Option<TableExtraction> {
        let (header_row, columns) = self.locate_header(grid)?;
        let description_col = columns.description?;
        debug!("Table header at row {} with columns {:?}", header_row, columns);

        let amount = |row: u32, role: ColumnRole| {
            cell_amount(columns.get(role).and_then(|col| grid.get(row, col)))
        };

        let mut products = Vec::new();
        let mut blanks = 0u32;
        let mut stopped_by = StopReason::EndOfGrid;
        let mut end_row = header_row;

        for row in header_row + 1..=grid.max_row() {
            end_row = row;
            let Some(description) = grid.text(row, description_col) else {
                blanks += 1;
                if blanks > self.config.blank_patience {
                    stopped_by = StopReason::BlankPatience;
                    break;
                }
                continue;
            };

            if self.is_stop_row(&normalize_str(&description)) {
                trace!("Stop row {}: {}", row, description);
                stopped_by = StopReason::StopRow;
                break;
            }
            blanks = 0;

            let quantity = amount(row, ColumnRole::Quantity);
            let unit_price = amount(row, ColumnRole::UnitPrice);
            let mut line_total = amount(row, ColumnRole::LineTotal);

            if unit_price <= 0.0 {
                trace!("Row {} rejected, no unit price", row);
                continue;
            }
            if line_total == 0.0 {
                line_total = quantity * unit_price;
            }

            products.push(ProductRow {
                description: description.trim().to_string(),
                quantity,
                unit_price,
                line_total,
            });
        }

        debug!(
            "Table yielded {} products, stopped by {:?}",
            products.len(),
            stopped_by
        );
        Some(TableExtraction {
            header_row,
            columns,
            products,
            stopped_by,
            end_row,
        })
    }
}

impl Default for TableExtractor {
    fn default() -> Self {
        Self::new(TableConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellValue;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> CellValue {
        CellValue::from(s)
    }

    fn num(n: f64) -> CellValue {
        CellValue::Number(n)
    }

    fn header() -> Vec<CellValue> {
        vec![
            text("CANTIDAD"),
            text("DESCRIPCIÓN"),
            text("PRECIO UNITARIO"),
            text("TOTAL"),
        ]
    }

    fn descriptions(extraction: &TableExtraction) -> Vec<&str> {
        extraction
            .products
            .iter()
            .map(|p| p.description.as_str())
            .collect()
    }

    #[test]
    fn test_header_roles() {
        let extractor = TableExtractor::default();
        let classify = |s: &str| extractor.classify_header(&normalize(&text(s)));

        assert_eq!(classify("Cant."), Some(ColumnRole::Quantity));
        assert_eq!(classify("Descripción"), Some(ColumnRole::Description));
        assert_eq!(classify("Precio Unitario"), Some(ColumnRole::UnitPrice));
        assert_eq!(classify("Unit Price USD"), Some(ColumnRole::UnitPrice));
        assert_eq!(classify("Precio Total"), Some(ColumnRole::LineTotal));
        assert_eq!(classify("Amount"), Some(ColumnRole::LineTotal));
        assert_eq!(classify("TOTAL CASES"), None);
        assert_eq!(classify("Peso Neto"), None);
    }

    #[test]
    fn test_header_needs_description_and_quantity() {
        let grid = Grid::from_rows(vec![
            vec![text("DESCRIPCION DE LA EMPRESA"), CellValue::Empty],
            vec![text("QTY"), text("GOODS")],
        ]);
        let (row, columns) = TableExtractor::default().locate_header(&grid).unwrap();
        assert_eq!(row, 2);
        assert_eq!(columns.quantity, Some(1));
        assert_eq!(columns.description, Some(2));
    }

    #[test]
    fn test_no_table_is_none() {
        let grid = Grid::from_text_rows(&[&["CLIENTE", "ACME"], &["DESCRIPCION", ""]]);
        assert_eq!(TableExtractor::default().extract(&grid), None);
    }

    #[test]
    fn test_price_must_be_positive() {
        let grid = Grid::from_rows(vec![
            header(),
            vec![num(10.0), text("Widget A"), num(0.0), num(50.0)],
            vec![num(4.0), text("Widget B"), num(12.5), CellValue::Empty],
        ]);
        let extraction = TableExtractor::default().extract(&grid).unwrap();

        assert_eq!(descriptions(&extraction), vec!["Widget B"]);
        assert_eq!(extraction.products[0].line_total, 50.0);
        assert_eq!(extraction.stopped_by, StopReason::EndOfGrid);
    }

    #[test]
    fn test_stop_row_is_excluded() {
        let grid = Grid::from_rows(vec![
            header(),
            vec![num(1.0), text("Widget A"), num(3.0), num(3.0)],
            vec![num(2.0), text("Widget B"), num(4.0), num(8.0)],
            vec![num(3.0), text("TOTAL GENERAL"), num(1.0), num(11.0)],
            vec![num(5.0), text("Widget C"), num(1.0), num(5.0)],
        ]);
        let extraction = TableExtractor::default().extract(&grid).unwrap();

        assert_eq!(descriptions(&extraction), vec!["Widget A", "Widget B"]);
        assert_eq!(extraction.stopped_by, StopReason::StopRow);
        assert_eq!(extraction.end_row, 4);
    }

    #[test]
    fn test_stop_rule_starts_with_versus_contains() {
        let rows = vec![
            header(),
            vec![num(1.0), text("Caja con total de 12 unidades"), num(3.0), CellValue::Empty],
            vec![num(1.0), text("Widget B"), num(4.0), CellValue::Empty],
        ];
        let grid = Grid::from_rows(rows);

        let starts_with = TableExtractor::default().extract(&grid).unwrap();
        assert_eq!(starts_with.products.len(), 2);

        let contains = TableExtractor::new(TableConfig {
            stop_rule: StopRule::Contains,
            ..TableConfig::default()
        })
        .extract(&grid)
        .unwrap();
        assert!(contains.products.is_empty());
        assert_eq!(contains.stopped_by, StopReason::StopRow);
    }

    fn grid_with_gap(gap: usize) -> Grid {
        let mut rows = vec![
            header(),
            vec![num(1.0), text("Widget A"), num(2.0), CellValue::Empty],
        ];
        rows.extend((0..gap).map(|_| vec![CellValue::Empty; 4]));
        rows.push(vec![num(1.0), text("Widget B"), num(3.0), CellValue::Empty]);
        Grid::from_rows(rows)
    }

    #[test]
    fn test_blank_patience_boundary() {
        let extractor = TableExtractor::new(TableConfig {
            blank_patience: 3,
            ..TableConfig::default()
        });

        let within = extractor.extract(&grid_with_gap(3)).unwrap();
        assert_eq!(descriptions(&within), vec!["Widget A", "Widget B"]);

        let beyond = extractor.extract(&grid_with_gap(4)).unwrap();
        assert_eq!(descriptions(&beyond), vec!["Widget A"]);
        assert_eq!(beyond.stopped_by, StopReason::BlankPatience);
    }

    #[test]
    fn test_text_amounts_and_existing_total() {
        let grid = Grid::from_rows(vec![
            header(),
            vec![text("1000"), text("Cajas de uva"), text("US$ 12,50"), text("12.500,00")],
        ]);
        let extraction = TableExtractor::default().extract(&grid).unwrap();
        assert_eq!(
            extraction.products,
            vec![ProductRow {
                description: "Cajas de uva".to_string(),
                quantity: 1000.0,
                unit_price: 12.5,
                line_total: 12500.0,
            }]
        );
    }

    #[test]
    fn test_extraction_is_repeatable() {
        let grid = grid_with_gap(2);
        let extractor = TableExtractor::default();
        assert_eq!(extractor.extract(&grid), extractor.extract(&grid));
    }
}
