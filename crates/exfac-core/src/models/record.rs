//! Extracted invoice data and the flat output table.

use serde::{Deserialize, Serialize};

use crate::grid::CellValue;

/// Output columns, in order, before any other field.
pub const PREFERRED_COLUMNS: &[&str] = &[
    "file",
    "client",
    "expedient",
    "date",
    "sale_condition",
    "incoterm",
    "payment_terms",
    "currency",
    "exchange_rate",
    "loading_port",
    "destination_port",
    "quantity",
    "description",
    "unit_price",
    "line_total",
    "observations",
];

/// Document-level fields. `None` means the field was not found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceHeader {
    /// Source document identifier.
    pub file: String,
    pub client: Option<CellValue>,
    pub expedient: Option<CellValue>,
    pub date: Option<CellValue>,
    pub sale_condition: Option<CellValue>,
    pub incoterm: Option<CellValue>,
    pub payment_terms: Option<CellValue>,
    pub currency: Option<CellValue>,
    pub exchange_rate: Option<CellValue>,
    pub loading_port: Option<CellValue>,
    pub destination_port: Option<CellValue>,
    pub observations: Option<CellValue>,
    pub tax_id: Option<CellValue>,
}

impl InvoiceHeader {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Default::default()
        }
    }

    /// Header fields by output column name, in declaration order.
    pub fn fields(&self) -> [(&'static str, Option<&CellValue>); 12] {
        [
            ("client", self.client.as_ref()),
            ("expedient", self.expedient.as_ref()),
            ("date", self.date.as_ref()),
            ("sale_condition", self.sale_condition.as_ref()),
            ("incoterm", self.incoterm.as_ref()),
            ("payment_terms", self.payment_terms.as_ref()),
            ("currency", self.currency.as_ref()),
            ("exchange_rate", self.exchange_rate.as_ref()),
            ("loading_port", self.loading_port.as_ref()),
            ("destination_port", self.destination_port.as_ref()),
            ("observations", self.observations.as_ref()),
            ("tax_id", self.tax_id.as_ref()),
        ]
    }

    /// Names of header fields that were not resolved.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.fields()
            .into_iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| name)
            .collect()
    }
}

/// One accepted table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub line_total: f64,
}

/// One flat output row: the document header plus at most one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub header: InvoiceHeader,
    pub product: Option<ProductRow>,
}

impl InvoiceRecord {
    /// Every field of this record as `(column, value)`, absent values as
    /// [`CellValue::Empty`].
    pub fn columns(&self) -> Vec<(&'static str, CellValue)> {
        let mut columns = Vec::with_capacity(17);
        columns.push(("file", CellValue::Text(self.header.file.clone())));
        for (name, value) in self.header.fields() {
            columns.push((name, value.cloned().unwrap_or_default()));
        }

        let product = self.product.as_ref();
        columns.push((
            "quantity",
            product.map_or(CellValue::Empty, |p| CellValue::Number(p.quantity)),
        ));
        columns.push((
            "description",
            product.map_or(CellValue::Empty, |p| CellValue::Text(p.description.clone())),
        ));
        columns.push((
            "unit_price",
            product.map_or(CellValue::Empty, |p| CellValue::Number(p.unit_price)),
        ));
        columns.push((
            "line_total",
            product.map_or(CellValue::Empty, |p| CellValue::Number(p.line_total)),
        ));
        columns
    }
}

/// Cross the header with the products: one record per product, or a single
/// header-only record when there are none.
pub fn assemble_records(header: &InvoiceHeader, products: &[ProductRow]) -> Vec<InvoiceRecord> {
    if products.is_empty() {
        return vec![InvoiceRecord {
            header: header.clone(),
            product: None,
        }];
    }
    products
        .iter()
        .map(|product| InvoiceRecord {
            header: header.clone(),
            product: Some(product.clone()),
        })
        .collect()
}

/// Records laid out as a table with a fixed column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RecordTable {
    /// Preferred columns first, then any other field in the order first seen.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a InvoiceRecord>) -> Self {
        let mut columns: Vec<String> = PREFERRED_COLUMNS.iter().map(|c| c.to_string()).collect();
        let mut keyed: Vec<Vec<(&'static str, CellValue)>> = Vec::new();

        for record in records {
            let fields = record.columns();
            for (name, _) in &fields {
                if !columns.iter().any(|c| c == name) {
                    columns.push(name.to_string());
                }
            }
            keyed.push(fields);
        }

        let rows = keyed
            .into_iter()
            .map(|fields| {
                columns
                    .iter()
                    .map(|column| {
                        fields
                            .iter()
                            .find(|(name, _)| name == column)
                            .map(|(_, value)| value.clone())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_json(&self) -> serde_json::Value {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let object: serde_json::Map<String, serde_json::Value> = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(column, value)| {
                        let json = match value {
                            CellValue::Empty => serde_json::Value::Null,
                            CellValue::Bool(b) => serde_json::Value::Bool(*b),
                            CellValue::Number(n) => serde_json::json!(n),
                            other => serde_json::Value::String(other.display()),
                        };
                        (column.clone(), json)
                    })
                    .collect();
                serde_json::Value::Object(object)
            })
            .collect();
        serde_json::Value::Array(rows)
    }
}
