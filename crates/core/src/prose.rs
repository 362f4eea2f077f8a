//! Prose word segmentation and masking of non-prose regions.

use image::{GrayImage, Luma};
use tracing::debug;

use crate::blobs::{binarize, label_components};
use crate::geometry::Rect;
use crate::params::ProseParams;
use crate::preprocess::blank_rect;

/// Fill background runs shorter than `gap` that lie between two ink pixels.
fn close_gaps(binary: &mut GrayImage, gap: u32, horizontal: bool) {
    let (width, height) = binary.dimensions();
    let (lanes, len) = if horizontal { (height, width) } else { (width, height) };
    let at = |lane: u32, pos: u32| if horizontal { (pos, lane) } else { (lane, pos) };

    for lane in 0..lanes {
        let mut last_ink: Option<u32> = None;
        for pos in 0..len {
            let (x, y) = at(lane, pos);
            if binary.get_pixel(x, y)[0] == 0 {
                continue;
            }
            if let Some(prev) = last_ink
                && pos - prev > 1
                && pos - prev - 1 < gap
            {
                for fill in prev + 1..pos {
                    let (fx, fy) = at(lane, fill);
                    binary.put_pixel(fx, fy, Luma([255]));
                }
            }
            last_ink = Some(pos);
        }
    }
}

/// Word rectangles of an ink image, in reading position order.
///
/// Letters are joined along rows across gaps narrower than `word_gap`, and
/// accents or dots are joined to their letters across vertical gaps narrower
/// than `line_join`.
pub fn word_boxes(ink: &GrayImage, threshold: u8, params: &ProseParams) -> Vec<Rect> {
    let mut binary = binarize(ink, threshold);
    close_gaps(&mut binary, params.word_gap, true);
    close_gaps(&mut binary, params.line_join, false);

    let (_, blobs) = label_components(&binary);
    let words: Vec<Rect> = blobs
        .into_iter()
        .map(|b| b.rect)
        .filter(|r| r.area() >= params.min_word_area as u64)
        .collect();
    debug!(count = words.len(), "prose words");
    words
}

/// Blank anonymized boxes, their underlines and tables out of an ink image.
pub fn mask_regions(ink: &mut GrayImage, boxes: &[Rect], underlines: &[Rect], tables: &[Rect]) {
    for rect in boxes.iter().chain(underlines).chain(tables) {
        blank_rect(ink, rect);
    }
}
