//! Directional neighborhood search from a label to its value.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::locator::{find_label, KeywordSet, LabelMatch, MatchMode};
use super::normalize::normalize;
use super::patterns::INLINE_VALUE;
use crate::grid::{CellValue, Coord, Grid, ScanBounds};

/// Search direction relative to a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Below,
    Right,
}

impl Direction {
    fn step(self, origin: Coord, distance: u32) -> Coord {
        match self {
            Direction::Below => Coord::new(origin.row.saturating_add(distance), origin.col),
            Direction::Right => Coord::new(origin.row, origin.col.saturating_add(distance)),
        }
    }
}

/// Search radius and direction order for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborSearch {
    /// Tried in order; the first direction yielding a value wins.
    pub directions: Vec<Direction>,
    /// Steps searched per direction, starting at 1.
    pub max_steps: u32,
    /// Accept `LABEL: value` written inside the label cell itself.
    pub inline: bool,
}

impl NeighborSearch {
    pub fn new(directions: &[Direction], max_steps: u32) -> Self {
        Self {
            directions: directions.to_vec(),
            max_steps,
            inline: false,
        }
    }

    pub fn with_inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }
}

impl Default for NeighborSearch {
    fn default() -> Self {
        Self::new(&[Direction::Below, Direction::Right], 5)
    }
}

/// A value found next to a label.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub coord: Coord,
    pub value: CellValue,
}

/// Search the neighborhood of `origin` and return the first non-empty value
/// accepted by `accept`. `None` means the field is absent.
pub fn resolve_value(
    grid: &Grid,
    origin: Coord,
    search: &NeighborSearch,
    accept: impl Fn(&CellValue) -> bool,
) -> Option<Resolved> {
    if search.inline {
        if let Some(value) = inline_value(grid, origin).filter(|v| accept(v)) {
            trace!("inline value at {:?}", origin);
            return Some(Resolved {
                coord: origin,
                value,
            });
        }
    }

    for direction in &search.directions {
        for distance in 1..=search.max_steps {
            let coord = direction.step(origin, distance);
            let Some(value) = grid.value(coord.row, coord.col) else {
                continue;
            };
            if accept(value) {
                trace!("{:?} from {:?} resolved at {:?}", direction, origin, coord);
                return Some(Resolved {
                    coord,
                    value: value.clone(),
                });
            }
        }
    }
    None
}

fn inline_value(grid: &Grid, origin: Coord) -> Option<CellValue> {
    let text = grid.text(origin.row, origin.col)?;
    let caps = INLINE_VALUE.captures(&text)?;
    Some(CellValue::Text(caps[1].trim().to_string()))
}

/// Keyword set plus the matcher configuration it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSpec {
    pub keywords: KeywordSet,
    pub mode: MatchMode,
}

impl LabelSpec {
    pub fn substring<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: KeywordSet::new(keywords),
            mode: MatchMode::Substring,
        }
    }

    pub fn whole_word<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: KeywordSet::new(keywords),
            mode: MatchMode::WholeWord,
        }
    }

    pub fn locate(&self, grid: &Grid, bounds: ScanBounds) -> Option<LabelMatch> {
        find_label(grid, &self.keywords, bounds, self.mode)
    }

    /// True when normalized `text` contains this label.
    pub fn matches(&self, text: &str) -> bool {
        self.keywords.matches(text, self.mode)
    }

    /// True when normalized `text` is this label itself.
    pub fn is_label_text(&self, text: &str) -> bool {
        self.keywords.is_label_text(text)
    }
}

/// Accept any non-empty value.
pub fn any_value(_: &CellValue) -> bool {
    true
}

/// Reject values that are themselves one of the known labels, so a sparse
/// header does not hand "FECHA" to the neighboring "CLIENTE".
pub fn reject_labels(labels: &[LabelSpec]) -> impl Fn(&CellValue) -> bool + '_ {
    move |value| {
        let text = normalize(value);
        !labels.iter().any(|label| label.is_label_text(&text))
    }
}

/// Locate `label` within `bounds` and resolve its value.
pub fn resolve_label(
    grid: &Grid,
    label: &LabelSpec,
    bounds: ScanBounds,
    search: &NeighborSearch,
    accept: impl Fn(&CellValue) -> bool,
) -> Option<Resolved> {
    let origin = label.locate(grid, bounds)?;
    resolve_value(grid, origin, search, accept)
}
