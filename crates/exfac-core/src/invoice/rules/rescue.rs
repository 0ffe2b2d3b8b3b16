//! Free-text rescue phrases that override label-based resolution.

use std::fmt::Debug;

use tracing::debug;

use super::locator::{KeywordSet, MatchMode};
use super::normalize::{normalize, normalize_str};
use super::SheetContext;
use crate::grid::ScanBounds;

/// Phrases that identify a consignment-style sale condition.
pub const DEFAULT_RESCUE_PHRASES: &[&str] = &[
    "BAJO CONDICION",
    "UNDER CONDITION",
    "A CONSIGNACION",
    "EN CONSIGNACION",
    "ON CONSIGNMENT",
];

/// A priority override for one field.
///
/// Returning `Some` skips label-based resolution for that field entirely.
pub trait RescueStrategy: Debug + Send + Sync {
    fn rescue(&self, ctx: &SheetContext<'_>) -> Option<String>;
}

/// Searches cell text, then drawing text, for a closed phrase list and
/// returns the containing text verbatim.
#[derive(Debug, Clone)]
pub struct PhraseRescue {
    phrases: KeywordSet,
    use_embedded_text: bool,
}

impl PhraseRescue {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            phrases: KeywordSet::new(phrases),
            use_embedded_text: true,
        }
    }

    pub fn with_embedded_text(mut self, enabled: bool) -> Self {
        self.use_embedded_text = enabled;
        self
    }

    pub fn phrases(&self) -> &[String] {
        self.phrases.keywords()
    }
}

impl Default for PhraseRescue {
    fn default() -> Self {
        Self::new(DEFAULT_RESCUE_PHRASES.iter().copied())
    }
}

impl RescueStrategy for PhraseRescue {
    fn rescue(&self, ctx: &SheetContext<'_>) -> Option<String> {
        if self.phrases.keywords().is_empty() {
            return None;
        }

        let from_cells = ctx.grid.cells_in(ScanBounds::all()).find_map(|(coord, value)| {
            let phrase = self.phrases.find(&normalize(value), MatchMode::Substring)?;
            debug!("Rescue phrase {} at {:?}", phrase, coord);
            Some(value.display())
        });
        if from_cells.is_some() {
            return from_cells;
        }

        if !self.use_embedded_text {
            return None;
        }
        ctx.embedded_text
            .iter()
            .find(|text| {
                self.phrases
                    .matches(&normalize_str(text), MatchMode::Substring)
            })
            .map(|text| {
                debug!("Rescue phrase found in drawing text");
                text.trim().to_string()
            })
    }
}
