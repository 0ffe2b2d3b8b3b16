//! Sheet invoice parser combining label rules and table extraction.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::grid::{CellValue, ScanBounds, SheetDocument};
use crate::models::config::{ExfacConfig, ExtractionConfig};
use crate::models::record::{assemble_records, InvoiceHeader, InvoiceRecord, ProductRow};

use super::rules::{
    CodeExtractor, DateExtractor, FieldExtractor, LabelSpec, LabeledField, NeighborSearch,
    ObservationsExtractor, PhraseRescue, RescueStrategy, SheetContext, ValuePart,
};
use super::table::{TableExtraction, TableExtractor};

/// Result of invoice extraction.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    /// Document-level fields.
    pub header: InvoiceHeader,
    /// Accepted product rows.
    pub products: Vec<ProductRow>,
    /// Table diagnostics, `None` when no header row was found.
    pub table: Option<TableExtraction>,
    /// Flat output rows; never empty.
    pub records: Vec<InvoiceRecord>,
    /// Extraction warnings.
    pub warnings: Vec<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Trait for invoice parsing.
pub trait InvoiceParser {
    /// Parse one decoded document. Missing fields are warnings, not errors.
    fn parse(&self, document: &SheetDocument) -> ExtractionResult;
}

/// Label-anchored parser for invoice worksheets.
#[derive(Debug)]
pub struct SheetInvoiceParser {
    config: ExtractionConfig,
    client: LabeledField,
    expedient: LabeledField,
    date: DateExtractor,
    sale_condition: LabeledField,
    /// Incoterm half of a `"<sale type> - <incoterm>"` sale condition.
    sale_incoterm: LabeledField,
    incoterm: CodeExtractor,
    payment_terms: LabeledField,
    currency: CodeExtractor,
    exchange_rate: LabeledField,
    loading_port: LabeledField,
    destination_port: LabeledField,
    tax_id: LabeledField,
    observations: ObservationsExtractor,
    rescue: Box<dyn RescueStrategy>,
    table: TableExtractor,
    /// Every header label; values reading like one of these are skipped.
    known_labels: Vec<LabelSpec>,
}

impl SheetInvoiceParser {
    /// Create a parser from configuration.
    pub fn new(config: &ExfacConfig) -> Self {
        let extraction = config.extraction.clone();
        let search = NeighborSearch::new(&extraction.label_directions, extraction.label_steps)
            .with_inline(extraction.inline_values);
        let field = |label: LabelSpec| LabeledField::new(label, search.clone());

        let sale_labels = LabelSpec::substring([
            "CONDICION DE VENTA",
            "CONDICION VENTA",
            "CONDICIONES DE VENTA",
            "TERMS OF SALE",
            "SALE CONDITION",
            "MODALIDAD DE VENTA",
        ]);
        let code_bounds = ScanBounds::rows(extraction.code_scan_rows);

        let mut parser = Self {
            client: field(LabelSpec::substring([
                "CLIENTE",
                "CUSTOMER",
                "CONSIGNEE",
                "SOLD TO",
                "BUYER",
            ])),
            expedient: field(LabelSpec::whole_word([
                "EXP",
                "EXP N°",
                "REF EXP",
                "NRO EXP",
                "EXPEDIENTE",
                "EXPORT NR",
            ])),
            date: DateExtractor::new(search.clone()),
            sale_condition: field(sale_labels.clone()).with_part(ValuePart::BeforeDash),
            sale_incoterm: field(sale_labels).with_part(ValuePart::AfterDash),
            incoterm: CodeExtractor::incoterm(search.clone()).with_scan_bounds(code_bounds),
            payment_terms: field(LabelSpec::substring([
                "FORMA DE PAGO",
                "CONDICION DE PAGO",
                "CONDICIONES DE PAGO",
                "PAYMENT TERMS",
                "TERMS OF PAYMENT",
            ])),
            currency: CodeExtractor::currency(search.clone()).with_scan_bounds(code_bounds),
            exchange_rate: field(LabelSpec::substring(["TIPO DE CAMBIO", "EXCHANGE RATE"])),
            loading_port: field(LabelSpec::substring([
                "PUERTO EMBARQUE",
                "PUERTO DE EMBARQUE",
                "PORT OF LOADING",
            ])),
            destination_port: field(LabelSpec::substring([
                "PUERTO DESTINO",
                "PUERTO DE DESTINO",
                "PORT OF DESTINATION",
                "PORT OF DISCHARGE",
                "DISCHARGING PORT",
            ])),
            tax_id: field(LabelSpec::whole_word(["RUT", "R.U.T", "TAX ID"])),
            observations: ObservationsExtractor::new()
                .with_beside_steps(extraction.observation_beside_steps)
                .with_block_steps(extraction.observation_steps)
                .with_footer_rows(extraction.footer_rows)
                .with_min_length(extraction.observation_min_length)
                .with_embedded_text(extraction.use_embedded_text),
            rescue: Box::new(
                PhraseRescue::new(&extraction.rescue_phrases)
                    .with_embedded_text(extraction.use_embedded_text),
            ),
            table: TableExtractor::new(config.table.clone()),
            known_labels: Vec::new(),
            config: extraction,
        };
        parser.known_labels = parser.collect_labels();
        parser
    }

    /// Replace the sale condition override.
    pub fn with_rescue(mut self, rescue: impl RescueStrategy + 'static) -> Self {
        self.rescue = Box::new(rescue);
        self
    }

    fn collect_labels(&self) -> Vec<LabelSpec> {
        let mut labels: Vec<LabelSpec> = [
            &self.client,
            &self.expedient,
            &self.sale_condition,
            &self.payment_terms,
            &self.exchange_rate,
            &self.loading_port,
            &self.destination_port,
            &self.tax_id,
        ]
        .iter()
        .map(|field| field.label.clone())
        .collect();
        labels.extend(self.date.labels().into_iter().cloned());
        labels.push(self.incoterm.label().clone());
        labels.push(self.currency.label().clone());
        labels.push(self.observations.label().clone());
        labels
    }

    fn extract_header(
        &self,
        document: &SheetDocument,
        table: Option<&TableExtraction>,
    ) -> InvoiceHeader {
        let embedded: &[String] = if self.config.use_embedded_text {
            &document.embedded_text
        } else {
            &[]
        };
        let ctx = SheetContext::new(&document.grid)
            .with_bounds(ScanBounds::rows(self.config.metadata_rows))
            .with_known_labels(&self.known_labels)
            .with_embedded_text(embedded)
            .with_print_text(&document.print_text)
            .with_table(table);

        let sale_condition = match self.rescue.rescue(&ctx) {
            Some(text) => {
                debug!("Sale condition taken from rescue phrase");
                Some(CellValue::Text(text))
            }
            None => self.sale_condition.extract(&ctx),
        };

        let incoterm = self.incoterm.extract(&ctx).or_else(|| {
            self.sale_incoterm
                .extract(&ctx)
                .map(|value| self.incoterm.canonicalize(value))
        });

        InvoiceHeader {
            file: document.name.clone(),
            client: self.client.extract(&ctx),
            expedient: self.expedient.extract(&ctx),
            date: self.date.extract(&ctx),
            sale_condition,
            incoterm,
            payment_terms: self.payment_terms.extract(&ctx),
            currency: self.currency.extract(&ctx),
            exchange_rate: self.exchange_rate.extract(&ctx),
            loading_port: self.loading_port.extract(&ctx),
            destination_port: self.destination_port.extract(&ctx),
            observations: self.observations.extract(&ctx),
            tax_id: self.tax_id.extract(&ctx),
        }
    }
}

impl Default for SheetInvoiceParser {
    fn default() -> Self {
        Self::new(&ExfacConfig::default())
    }
}

impl InvoiceParser for SheetInvoiceParser {
    fn parse(&self, document: &SheetDocument) -> ExtractionResult {
        let start = Instant::now();
        let mut warnings = Vec::new();

        info!(
            "Parsing {} ({} rows x {} columns)",
            document.name,
            document.grid.max_row(),
            document.grid.max_col()
        );

        let table = self.table.extract(&document.grid);
        let header = self.extract_header(document, table.as_ref());
        for field in header.missing_fields() {
            warnings.push(format!("Could not extract {}", field));
        }

        match &table {
            None => warnings.push("No product table found".to_string()),
            Some(t) if t.products.is_empty() => warnings.push(format!(
                "Product table at row {} has no rows with a unit price",
                t.header_row
            )),
            Some(_) => {}
        }

        let products = table
            .as_ref()
            .map(|t| t.products.clone())
            .unwrap_or_default();
        let records = assemble_records(&header, &products);

        let processing_time_ms = start.elapsed().as_millis() as u64;
        debug!(
            "Extracted {} records with {} warnings in {}ms",
            records.len(),
            warnings.len(),
            processing_time_ms
        );

        ExtractionResult {
            header,
            products,
            table,
            records,
            warnings,
            processing_time_ms,
        }
    }
}
