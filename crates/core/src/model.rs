//! Boxes, tables and anonymization methods shared across the pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ReaderError;
use crate::geometry::Rect;

/// How a document's publisher redacted sensitive spans.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnonymizationMethod {
    /// No redactions; text comes from the external extractor.
    #[default]
    None,
    /// A line drawn beneath the hidden span.
    Underline,
    /// A solid box drawn over the hidden span.
    Box,
}

impl fmt::Display for AnonymizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnonymizationMethod::None => "none",
            AnonymizationMethod::Underline => "underline",
            AnonymizationMethod::Box => "box",
        })
    }
}

impl FromStr for AnonymizationMethod {
    type Err = ReaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(AnonymizationMethod::None),
            "underline" => Ok(AnonymizationMethod::Underline),
            "box" => Ok(AnonymizationMethod::Box),
            other => Err(ReaderError::Config(format!(
                "unknown anonymization method: {other}"
            ))),
        }
    }
}

/// Where a box came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Underline,
    #[serde(rename = "box")]
    BoxFill,
    Prose,
}

impl Origin {
    /// Anonymized boxes are wrapped in the marker once read.
    pub fn is_anonymized(self) -> bool {
        !matches!(self, Origin::Prose)
    }
}

/// A word or anonymized span on the page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextBox {
    pub rect: Rect,
    pub origin: Origin,
    pub text: Option<String>,
}

impl TextBox {
    pub fn new(rect: Rect, origin: Origin) -> Self {
        Self {
            rect,
            origin,
            text: None,
        }
    }

    pub fn with_text(rect: Rect, origin: Origin, text: impl Into<String>) -> Self {
        Self {
            rect,
            origin,
            text: Some(text.into()),
        }
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// A ruled table found on the page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Table {
    pub rect: Rect,
    /// `(rows, cols)` of the cell grid.
    pub shape: (usize, usize),
    /// Cell texts in row-major order.
    pub cells: Vec<Vec<String>>,
    /// Cells joined by a space within a row and a newline between rows.
    pub text: String,
}

impl Table {
    pub fn new(rect: Rect, shape: (usize, usize), cells: Vec<Vec<String>>) -> Self {
        let text = cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.trim())
                    .filter(|cell| !cell.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|row| !row.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            rect,
            shape,
            cells,
            text,
        }
    }
}
