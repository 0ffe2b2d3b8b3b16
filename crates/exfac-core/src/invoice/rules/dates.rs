//! Document date assembly from split or combined date labels.

use tracing::debug;

use super::normalize::normalize;
use super::resolver::{resolve_label, LabelSpec, NeighborSearch};
use super::{FieldExtractor, SheetContext};
use crate::grid::CellValue;

/// Date field extractor.
#[derive(Debug, Clone)]
pub struct DateExtractor {
    day: LabelSpec,
    month: LabelSpec,
    year: LabelSpec,
    combined: LabelSpec,
    search: NeighborSearch,
}

impl DateExtractor {
    pub fn new(search: NeighborSearch) -> Self {
        Self {
            // Short labels need word boundaries: "DIA" must not hit "DIAS".
            day: LabelSpec::whole_word(["DIA", "DAY"]),
            month: LabelSpec::whole_word(["MES", "MONTH"]),
            year: LabelSpec::whole_word(["AÑO", "YEAR"]),
            combined: LabelSpec::whole_word(["FECHA DOCUMENTO", "FECHA", "DATE"]),
            search,
        }
    }

    /// Every label this extractor knows, for value rejection elsewhere.
    pub fn labels(&self) -> [&LabelSpec; 4] {
        [&self.day, &self.month, &self.year, &self.combined]
    }

    fn is_own_label(&self, value: &CellValue) -> bool {
        let text = normalize(value);
        self.labels().iter().any(|label| label.is_label_text(&text))
    }
}

impl FieldExtractor for DateExtractor {
    type Output = CellValue;

    /// Resolve the document date.
    ///
    /// Split day/month/year cells are assembled as `DD/MM/YYYY`. Otherwise a
    /// combined date label is used: calendar values are formatted the same
    /// way, anything else is returned as found. `None` when neither works.
    fn extract(&self, ctx: &SheetContext<'_>) -> Option<CellValue> {
        let accept = |value: &CellValue| !self.is_own_label(value) && !ctx.is_label(value);
        let component = |label: &LabelSpec| {
            resolve_label(ctx.grid, label, ctx.bounds, &self.search, accept).map(|r| r.value)
        };

        if let (Some(day), Some(month), Some(year)) = (
            component(&self.day),
            component(&self.month),
            component(&self.year),
        ) {
            let assembled = format!(
                "{}/{}/{}",
                normalize_day(&day),
                normalize_month(&month),
                year.display()
            );
            debug!("Assembled date {} from split labels", assembled);
            return Some(CellValue::Text(assembled));
        }

        let combined = component(&self.combined)?;
        Some(match combined {
            CellValue::Date(dt) => CellValue::Text(dt.format("%d/%m/%Y").to_string()),
            other => other,
        })
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new(NeighborSearch::default())
    }
}

/// Zero-pad a numeric day; leave anything else alone.
fn normalize_day(day: &CellValue) -> String {
    let text = day.display();
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) && text.len() < 2 {
        format!("0{}", text)
    } else {
        text
    }
}

/// Two-digit month from a number or a Spanish/English month name.
fn normalize_month(month: &CellValue) -> String {
    let key = normalize(month);
    if let Ok(n) = key.parse::<u32>() {
        if (1..=12).contains(&n) {
            return format!("{:02}", n);
        }
    }
    month_number(&key)
        .map(|n| format!("{:02}", n))
        .unwrap_or_else(|| month.display())
}

fn month_number(name: &str) -> Option<u32> {
    let n = match name.trim_end_matches('.') {
        "ENERO" | "ENE" | "JANUARY" | "JAN" => 1,
        "FEBRERO" | "FEBRUARY" | "FEB" => 2,
        "MARZO" | "MARCH" | "MAR" => 3,
        "ABRIL" | "ABR" | "APRIL" | "APR" => 4,
        "MAYO" | "MAY" => 5,
        "JUNIO" | "JUNE" | "JUN" => 6,
        "JULIO" | "JULY" | "JUL" => 7,
        "AGOSTO" | "AGO" | "AUGUST" | "AUG" => 8,
        "SEPTIEMBRE" | "SETIEMBRE" | "SEPTEMBER" | "SEPT" | "SEP" | "SET" => 9,
        "OCTUBRE" | "OCTOBER" | "OCT" => 10,
        "NOVIEMBRE" | "NOVEMBER" | "NOV" => 11,
        "DICIEMBRE" | "DECEMBER" | "DIC" | "DEC" => 12,
        _ => return None,
    };
    Some(n)
}
