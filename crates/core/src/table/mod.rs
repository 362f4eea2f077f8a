//! Ruled table detection and reading.
//!
//! Tables are found from grid lines alone, before any blob classification,
//! so their borders are never read as underlines and their cells never as
//! anonymized boxes. Cell text is read with the same OCR engine as the rest
//! of the page.

mod grid;
mod lines;

pub use grid::{Grid, build_grids, count_crossings};
pub use lines::{Line, Orientation, find_lines, run_mask};

use image::GrayImage;
use rayon::prelude::*;
use tracing::debug;

use crate::blobs::binarize;
use crate::error::Result;
use crate::model::{Origin, Table};
use crate::ocr::{OcrEngine, read_region};
use crate::params::TableParams;

/// Find ruled grids on an ink image.
pub fn find_grids(ink: &GrayImage, threshold: u8, params: &TableParams) -> Vec<Grid> {
    let binary = binarize(ink, threshold);
    let lines = find_lines(&binary, params);
    let grids = build_grids(&lines, params);
    debug!(lines = lines.len(), grids = grids.len(), "table grids");
    grids
}

/// Read the cells of a grid into a [`Table`].
///
/// Cells are inset to stay clear of the ruling. Without an engine, or with
/// `read_tables` off, cell texts are empty and only the shape is reported.
pub fn read_grid(
    ink: &GrayImage,
    grid: &Grid,
    threshold: u8,
    params: &TableParams,
    engine: Option<&dyn OcrEngine>,
) -> Result<Table> {
    let cells = grid.cells();
    let texts: Vec<Vec<String>> = match engine.filter(|_| params.read_tables) {
        Some(engine) => cells
            .par_iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell.shrink(params.cell_inset) {
                        Some(inner) => {
                            read_region(ink, &inner, Origin::Prose, engine, 0, threshold)
                        }
                        None => Ok(String::new()),
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?,
        None => cells
            .iter()
            .map(|row| vec![String::new(); row.len()])
            .collect(),
    };
    Ok(Table::new(grid.rect, grid.shape(), texts))
}

/// Find and read every table on an ink image.
pub fn find_tables(
    ink: &GrayImage,
    threshold: u8,
    params: &TableParams,
    engine: Option<&dyn OcrEngine>,
) -> Result<Vec<Table>> {
    find_grids(ink, threshold, params)
        .iter()
        .map(|grid| read_grid(ink, grid, threshold, params, engine))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect as DrawRect;

    use crate::geometry::Rect;

    struct Fixed;

    impl OcrEngine for Fixed {
        fn recognize(&self, _crop: &GrayImage) -> Result<String> {
            Ok("cell".to_string())
        }
    }

    fn fill(image: &mut GrayImage, top: i32, left: i32, height: u32, width: u32) {
        draw_filled_rect_mut(image, DrawRect::at(left, top).of_size(width, height), Luma([255u8]));
    }

    /// A 2x2 grid with text in the top-left and bottom-right cells.
    fn table_ink() -> GrayImage {
        let mut ink = GrayImage::new(500, 400);
        for y in [50, 150, 250] {
            fill(&mut ink, y, 50, 3, 403);
        }
        for x in [50, 250, 450] {
            fill(&mut ink, 50, x, 203, 3);
        }
        fill(&mut ink, 90, 90, 20, 60);
        fill(&mut ink, 190, 300, 20, 60);
        ink
    }

    #[test]
    fn finds_grid_shape() {
        let grids = find_grids(&table_ink(), 127, &TableParams::default());
        assert_eq!(grids.len(), 1);
        assert_eq!(grids[0].shape(), (2, 2));
        assert_eq!(grids[0].rect, Rect::new(50, 50, 253, 453));
    }

    #[test]
    fn reads_only_cells_with_ink() {
        let engine = Fixed;
        let tables =
            find_tables(&table_ink(), 127, &TableParams::default(), Some(&engine)).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0].cells,
            vec![
                vec!["cell".to_string(), String::new()],
                vec![String::new(), "cell".to_string()],
            ]
        );
        assert_eq!(tables[0].text, "cell\ncell");
    }

    #[test]
    fn without_engine_reports_shape_only() {
        let tables = find_tables(&table_ink(), 127, &TableParams::default(), None).unwrap();
        assert_eq!(tables[0].shape, (2, 2));
        assert!(tables[0].text.is_empty());
    }

    #[test]
    fn page_without_rules_has_no_tables() {
        let mut ink = GrayImage::new(500, 400);
        fill(&mut ink, 100, 100, 30, 200);
        fill(&mut ink, 140, 100, 3, 200);
        assert!(find_tables(&ink, 127, &TableParams::default(), None).unwrap().is_empty());
    }
}
