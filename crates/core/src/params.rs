//! Reader parameters.
//!
//! Contains [`ReaderParams`] and one parameter struct per pipeline stage.
//! Defaults are calibrated for 300 DPI scans of A4 pages. Every struct
//! deserializes with `#[serde(default)]`, so a TOML file only needs to name
//! the values it overrides.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ReaderError, Result};

/// Parameters for boundary-noise and logo removal.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PreprocessParams {
    /// Pixels of the ink image above this value count as ink.
    pub binary_threshold: u8,

    /// Solid border bands are stripped at most this fraction of the page
    /// dimension inward from each edge.
    pub max_border_fraction: f32,

    /// Optional publisher logo to blank before analysis.
    pub logo: Option<LogoParams>,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            binary_threshold: 127,
            max_border_fraction: 0.25,
            logo: None,
        }
    }
}

/// Location and matching tolerance of a publisher logo.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogoParams {
    /// Path to the logo image, stored dark-on-light like a scan.
    pub template: PathBuf,

    /// Relative (row, column) positions of the logo's top-left corner.
    pub anchors: Vec<(f32, f32)>,

    /// Mean absolute pixel difference below which the region is the logo.
    pub tolerance: f32,

    /// Pixels searched around each anchor to absorb scan offsets.
    pub search_radius: u32,
}

impl Default for LogoParams {
    fn default() -> Self {
        Self {
            template: PathBuf::new(),
            anchors: vec![(0.0, 0.0)],
            tolerance: 30.0,
            search_radius: 12,
        }
    }
}

/// Parameters for connected-component extraction and blob classification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BlobParams {
    /// Components with fewer ink pixels are noise.
    pub min_area: u32,

    /// Components with more ink pixels are page-scale artifacts.
    pub max_area: u32,

    /// Underlines are at most this many pixels tall.
    pub underline_max_height: u32,

    /// Underlines are at least this many pixels wide.
    pub underline_min_width: u32,

    /// Underlines are at least this many times wider than tall.
    pub underline_min_aspect: f32,

    /// Solid boxes fill at least this fraction of their bounding area.
    pub box_min_fill: f32,

    /// Solid boxes are at least this many pixels tall.
    pub box_min_height: u32,

    /// Solid boxes taller than this are images, not redactions.
    pub box_max_height: u32,

    /// Solid boxes are at least this many pixels wide.
    pub box_min_width: u32,

    /// Grid blobs span at least this many pixels in both directions.
    pub table_min_extent: u32,

    /// Grid blobs fill at most this fraction of their bounding area.
    pub table_max_fill: f32,
}

impl Default for BlobParams {
    fn default() -> Self {
        Self {
            min_area: 10,
            max_area: 1_000_000,
            underline_max_height: 10,
            underline_min_width: 40,
            underline_min_aspect: 5.0,
            box_min_fill: 0.85,
            box_min_height: 20,
            box_max_height: 400,
            box_min_width: 15,
            table_min_extent: 150,
            table_max_fill: 0.2,
        }
    }
}

/// Parameters for turning underlines into boxes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UnderlineParams {
    /// Farthest a synthesized box reaches above its underline.
    pub max_extension: u32,

    /// Blank rows tolerated between the underline and the word above it.
    pub ink_gap: u32,

    /// Blank rows tolerated inside the word, between letter bodies and the
    /// dots or accents above them.
    pub glyph_gap: u32,

    /// Boxes overlapping more than this IOU are duplicates.
    pub duplicate_iou: f64,
}

impl Default for UnderlineParams {
    fn default() -> Self {
        Self {
            max_extension: 60,
            ink_gap: 8,
            glyph_gap: 8,
            duplicate_iou: 0.5,
        }
    }
}

/// Parameters for refining and splitting boxes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SplitParams {
    /// A row or column needs this many ink pixels to stop refinement.
    pub refine_min_pixels: u32,

    /// Background column runs at least this wide separate two words.
    pub min_word_gap: u32,

    /// Rows with ink density at or below this are background.
    pub row_background_density: f32,

    /// Boxes taller than this are checked for stacked lines.
    pub max_line_height: u32,
}

impl Default for SplitParams {
    fn default() -> Self {
        Self {
            refine_min_pixels: 1,
            min_word_gap: 25,
            row_background_density: 0.02,
            max_line_height: 70,
        }
    }
}

/// Parameters for grid-line table detection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TableParams {
    /// Shortest ink run that counts as a grid line.
    pub min_line_length: u32,

    /// Thickest run cluster that still counts as a line.
    pub max_line_thickness: u32,

    /// Slack when testing whether two lines cross.
    pub intersection_tolerance: u32,

    /// Line positions within this distance are the same grid edge.
    pub snap_tolerance: u32,

    /// Pixels trimmed from each cell side before reading it.
    pub cell_inset: u32,

    /// Run OCR over table cells.
    pub read_tables: bool,
}

impl Default for TableParams {
    fn default() -> Self {
        Self {
            min_line_length: 100,
            max_line_thickness: 8,
            intersection_tolerance: 6,
            snap_tolerance: 6,
            cell_inset: 4,
            read_tables: true,
        }
    }
}

/// Parameters for cropping regions before OCR.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RegionParams {
    /// Margin added around each region crop.
    pub crop_margin: u32,
}

impl Default for RegionParams {
    fn default() -> Self {
        Self { crop_margin: 4 }
    }
}

/// Parameters for segmenting prose into words.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProseParams {
    /// Horizontal gaps narrower than this are closed inside a word.
    pub word_gap: u32,

    /// Vertical gaps narrower than this join accents and dots to letters.
    pub line_join: u32,

    /// Word boxes with a smaller bounding area are dropped.
    pub min_word_area: u32,
}

impl Default for ProseParams {
    fn default() -> Self {
        Self {
            word_gap: 12,
            line_join: 8,
            min_word_area: 20,
        }
    }
}

/// Parameters for reading-order text assembly.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AssembleParams {
    /// Boxes whose tops differ by at most this share a row.
    pub row_tolerance: u32,

    /// Vertical gaps wider than this start a new paragraph.
    pub paragraph_gap: u32,

    /// A final row this far below all other content may be a page number or
    /// stamp.
    pub isolated_row_gap: u32,

    /// Such a row must start below this fraction of the page height.
    pub footer_band: f32,

    /// Such a row is at most this many pixels wide.
    pub footer_max_width: u32,
}

impl Default for AssembleParams {
    fn default() -> Self {
        Self {
            row_tolerance: 20,
            paragraph_gap: 80,
            isolated_row_gap: 1000,
            footer_band: 0.85,
            footer_max_width: 400,
        }
    }
}

/// All parameters for reading a page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReaderParams {
    pub preprocess: PreprocessParams,
    pub blobs: BlobParams,
    pub underline: UnderlineParams,
    pub split: SplitParams,
    pub table: TableParams,
    pub region: RegionParams,
    pub prose: ProseParams,
    pub assemble: AssembleParams,
}

impl ReaderParams {
    /// Parse parameters from TOML, falling back to defaults for missing keys.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let params: ReaderParams =
            toml::from_str(source).map_err(|e| ReaderError::Config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Read parameters from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Reject thresholds that cannot describe a real page.
    pub fn validate(&self) -> Result<()> {
        fn ratio(name: &str, value: f32) -> Result<()> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ReaderError::Config(format!(
                    "{name} must be between 0 and 1, got {value}"
                )))
            }
        }

        if self.blobs.min_area > self.blobs.max_area {
            return Err(ReaderError::Config(format!(
                "blobs.min_area ({}) exceeds blobs.max_area ({})",
                self.blobs.min_area, self.blobs.max_area
            )));
        }
        if self.blobs.box_min_height > self.blobs.box_max_height {
            return Err(ReaderError::Config(
                "blobs.box_min_height exceeds blobs.box_max_height".to_string(),
            ));
        }
        ratio("blobs.box_min_fill", self.blobs.box_min_fill)?;
        ratio("blobs.table_max_fill", self.blobs.table_max_fill)?;
        ratio("split.row_background_density", self.split.row_background_density)?;
        ratio("preprocess.max_border_fraction", self.preprocess.max_border_fraction)?;
        ratio("assemble.footer_band", self.assemble.footer_band)?;
        if !(0.0..=1.0).contains(&self.underline.duplicate_iou) {
            return Err(ReaderError::Config(format!(
                "underline.duplicate_iou must be between 0 and 1, got {}",
                self.underline.duplicate_iou
            )));
        }
        if self.table.min_line_length <= self.table.max_line_thickness {
            return Err(ReaderError::Config(
                "table.min_line_length must exceed table.max_line_thickness".to_string(),
            ));
        }
        if let Some(logo) = &self.preprocess.logo {
            for &(row, col) in &logo.anchors {
                ratio("preprocess.logo.anchors", row)?;
                ratio("preprocess.logo.anchors", col)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let params = ReaderParams::from_toml_str(
            r#"
            [blobs]
            min_area = 25

            [assemble]
            paragraph_gap = 120
            "#,
        )
        .unwrap();
        assert_eq!(params.blobs.min_area, 25);
        assert_eq!(params.blobs.max_area, BlobParams::default().max_area);
        assert_eq!(params.assemble.paragraph_gap, 120);
        assert_eq!(params.table, TableParams::default());
    }

    #[test]
    fn rejects_inverted_area_bounds() {
        let err =
            ReaderParams::from_toml_str("[blobs]\nmin_area = 10\nmax_area = 5\n").unwrap_err();
        assert!(err.to_string().contains("min_area"));
    }

    #[test]
    fn rejects_out_of_range_ratio() {
        let err = ReaderParams::from_toml_str("[blobs]\nbox_min_fill = 1.5\n").unwrap_err();
        assert!(matches!(err, ReaderError::Config(_)));
    }

    #[test]
    fn logo_section_parses_anchors() {
        let params = ReaderParams::from_toml_str(
            r#"
            [preprocess.logo]
            template = "logo.png"
            anchors = [[0.0, 0.0], [0.45, 0.4]]
            "#,
        )
        .unwrap();
        let logo = params.preprocess.logo.unwrap();
        assert_eq!(logo.anchors, vec![(0.0, 0.0), (0.45, 0.4)]);
        assert_eq!(logo.search_radius, LogoParams::default().search_radius);
    }
}
