//! Connected-component extraction and blob classification.
//!
//! A blob is a maximal 8-connected region of ink on a binarized ink image.
//! Classification into underline, solid box, table grid or noise is a pure
//! function of the blob's geometry so it can be tested without pixels.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};
use rustc_hash::FxHashMap;

use crate::geometry::Rect;
use crate::params::BlobParams;

/// Label image produced by connected-component labelling.
pub type LabelImage = ImageBuffer<Luma<u32>, Vec<u32>>;

/// A connected ink region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Blob {
    pub label: u32,
    pub rect: Rect,
    /// Number of ink pixels.
    pub area: u32,
}

impl Blob {
    /// Ink pixels divided by bounding area.
    pub fn fill_ratio(&self) -> f64 {
        let bbox = self.rect.area();
        if bbox == 0 {
            0.0
        } else {
            self.area as f64 / bbox as f64
        }
    }
}

/// What a blob looks like on an anonymized page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlobKind {
    Underline,
    BoxFill,
    TableCell,
    Noise,
}

/// Threshold an ink image: pixels above `threshold` become 255, the rest 0.
pub fn binarize(ink: &GrayImage, threshold: u8) -> GrayImage {
    let mut binary = ink.clone();
    for pixel in binary.pixels_mut() {
        pixel[0] = if pixel[0] > threshold { 255 } else { 0 };
    }
    binary
}

/// Label every 8-connected component of a binary image.
///
/// Returns the label image and one unfiltered blob per label, sorted by
/// position.
pub fn label_components(binary: &GrayImage) -> (LabelImage, Vec<Blob>) {
    let labels = connected_components(binary, Connectivity::Eight, Luma([0u8]));

    let mut stats: FxHashMap<u32, (u32, u32, u32, u32, u32)> = FxHashMap::default();
    for (x, y, pixel) in labels.enumerate_pixels() {
        let label = pixel[0];
        if label == 0 {
            continue;
        }
        let entry = stats.entry(label).or_insert((y, x, y, x, 0));
        entry.0 = entry.0.min(y);
        entry.1 = entry.1.min(x);
        entry.2 = entry.2.max(y);
        entry.3 = entry.3.max(x);
        entry.4 += 1;
    }

    let mut blobs: Vec<Blob> = stats
        .into_iter()
        .map(|(label, (top, left, bottom, right, area))| Blob {
            label,
            rect: Rect::new(top, left, bottom + 1, right + 1),
            area,
        })
        .collect();
    blobs.sort_by_key(|b| (b.rect, b.label));
    (labels, blobs)
}

/// Find blobs on a binary image, dropping specks and page-scale artifacts.
pub fn find_blobs(binary: &GrayImage, params: &BlobParams) -> Vec<Blob> {
    let (_, blobs) = label_components(binary);
    blobs
        .into_iter()
        .filter(|b| b.area >= params.min_area && b.area <= params.max_area)
        .collect()
}

/// Classify a blob by shape and ink density.
///
/// Grid structures take priority so table borders are never mistaken for
/// underlines.
pub fn classify(blob: &Blob, params: &BlobParams) -> BlobKind {
    let width = blob.rect.width();
    let height = blob.rect.height();
    let fill = blob.fill_ratio();

    if width >= params.table_min_extent
        && height >= params.table_min_extent
        && fill <= params.table_max_fill as f64
    {
        return BlobKind::TableCell;
    }

    if height <= params.underline_max_height
        && width >= params.underline_min_width
        && width as f32 >= height as f32 * params.underline_min_aspect
    {
        return BlobKind::Underline;
    }

    if fill >= params.box_min_fill as f64
        && (params.box_min_height..=params.box_max_height).contains(&height)
        && width >= params.box_min_width
    {
        return BlobKind::BoxFill;
    }

    BlobKind::Noise
}

/// Blobs of one kind, in position order.
pub fn blobs_of_kind(blobs: &[Blob], kind: BlobKind, params: &BlobParams) -> Vec<Blob> {
    blobs
        .iter()
        .filter(|b| classify(b, params) == kind)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect as DrawRect;

    fn blob(width: u32, height: u32, area: u32) -> Blob {
        Blob {
            label: 1,
            rect: Rect::new(100, 100, 100 + height, 100 + width),
            area,
        }
    }

    #[test]
    fn classify_thin_stroke_as_underline() {
        let params = BlobParams::default();
        assert_eq!(classify(&blob(200, 4, 800), &params), BlobKind::Underline);
    }

    #[test]
    fn classify_short_stroke_as_noise() {
        let params = BlobParams::default();
        assert_eq!(classify(&blob(20, 3, 60), &params), BlobKind::Noise);
    }

    #[test]
    fn classify_solid_fill_as_box() {
        let params = BlobParams::default();
        assert_eq!(classify(&blob(180, 40, 7000), &params), BlobKind::BoxFill);
    }

    #[test]
    fn classify_sparse_large_region_as_table() {
        let params = BlobParams::default();
        assert_eq!(classify(&blob(600, 300, 9000), &params), BlobKind::TableCell);
    }

    #[test]
    fn classify_letter_as_noise() {
        let params = BlobParams::default();
        assert_eq!(classify(&blob(25, 35, 300), &params), BlobKind::Noise);
    }

    #[test]
    fn four_rectangles_give_four_blobs() {
        let mut image = GrayImage::new(200, 120);
        for (x, y) in [(10, 10), (100, 10), (10, 70), (100, 70)] {
            draw_filled_rect_mut(&mut image, DrawRect::at(x, y).of_size(40, 30), Luma([255u8]));
        }
        let blobs = find_blobs(&image, &BlobParams::default());
        assert_eq!(blobs.len(), 4);
        assert!(blobs.iter().all(|b| b.area == 1200));
    }

    #[test]
    fn diagonal_pixels_are_one_blob() {
        let mut image = GrayImage::new(10, 10);
        for i in 0..6 {
            image.put_pixel(i, i, Luma([255]));
        }
        let (_, blobs) = label_components(&image);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].rect, Rect::new(0, 0, 6, 6));
    }

    #[test]
    fn area_filter_drops_specks() {
        let mut image = GrayImage::new(50, 50);
        image.put_pixel(2, 2, Luma([255]));
        draw_filled_rect_mut(&mut image, DrawRect::at(20, 20).of_size(10, 10), Luma([255u8]));
        let blobs = find_blobs(&image, &BlobParams::default());
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].rect, Rect::new(20, 20, 30, 30));
    }

    #[test]
    fn binarize_splits_on_threshold() {
        let image = GrayImage::from_raw(3, 1, vec![100, 127, 128]).unwrap();
        let binary = binarize(&image, 127);
        assert_eq!(binary.into_raw(), vec![0, 0, 255]);
    }
}
