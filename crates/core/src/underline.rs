//! Underline-style redactions.
//!
//! Each underline gets a box synthesized above it covering the hidden words.
//! Underlines broken into several components, or doubled, produce boxes that
//! overlap heavily; only the widest of such a group survives.

use image::GrayImage;
use tracing::{debug, warn};

use crate::blobs::{Blob, BlobKind, binarize, blobs_of_kind, find_blobs};
use crate::geometry::Rect;
use crate::params::{BlobParams, UnderlineParams};

/// True if the row has ink in `left..right` that is not part of another underline.
fn row_has_word_ink(
    ink: &GrayImage,
    row: u32,
    left: u32,
    right: u32,
    threshold: u8,
    strokes: &[Rect],
) -> bool {
    (left..right).any(|x| {
        ink.get_pixel(x, row)[0] > threshold
            && !strokes
                .iter()
                .any(|s| (s.top..s.bottom).contains(&row) && (s.left..s.right).contains(&x))
    })
}

/// Synthesize the box covering the words above an underline.
///
/// Walks upward from the underline's top edge. Blank rows directly above the
/// line are skipped (up to `ink_gap`); once ink is met the box grows until a
/// blank run longer than `glyph_gap`, so i-dots, rings and accents above the
/// letter bodies stay inside. Rows crossed by `others` (neighbouring
/// underline strokes) are stepped over, so a doubled underline reaches the
/// same word.
/// Without ink the box takes the full `max_extension`. Returns `None` when
/// the underline sits on the top edge of the page.
pub fn synthesize_box(
    ink: &GrayImage,
    underline: &Rect,
    others: &[Rect],
    threshold: u8,
    params: &UnderlineParams,
) -> Option<Rect> {
    let floor = underline.top.saturating_sub(params.max_extension);
    let left = underline.left;
    let right = underline.right.min(ink.width());
    let search = Rect::new(floor, left, underline.top, right);
    let strokes: Vec<Rect> = others
        .iter()
        .filter(|o| *o != underline && o.intersects(&search))
        .copied()
        .collect();

    let mut last_ink: Option<u32> = None;
    let mut blank_run = 0;

    for row in (floor..underline.top).rev() {
        let on_stroke = strokes.iter().any(|s| (s.top..s.bottom).contains(&row));
        if row_has_word_ink(ink, row, left, right, threshold, &strokes) {
            last_ink = Some(row);
            blank_run = 0;
        } else if on_stroke && last_ink.is_none() {
            continue;
        } else {
            blank_run += 1;
            let limit = if last_ink.is_some() {
                params.glyph_gap
            } else {
                params.ink_gap
            };
            if blank_run > limit {
                break;
            }
        }
    }

    Rect::non_empty(last_ink.unwrap_or(floor), left, underline.top, right)
}

/// Drop boxes that duplicate a wider box, keeping underlines paired.
///
/// Pairs are visited widest first; a box whose IOU with an already kept box
/// exceeds `duplicate_iou` is suppressed along with its underline. The
/// survivors come back in position order.
pub fn deduplicate(pairs: Vec<(Rect, Rect)>, duplicate_iou: f64) -> (Vec<Rect>, Vec<Rect>) {
    let mut pairs = pairs;
    pairs.sort_by(|a, b| b.0.width().cmp(&a.0.width()).then(a.0.cmp(&b.0)));

    let mut kept: Vec<(Rect, Rect)> = Vec::with_capacity(pairs.len());
    for (candidate, underline) in pairs {
        let duplicate = kept
            .iter()
            .any(|(existing, _)| existing.iou(&candidate) > duplicate_iou);
        if duplicate {
            debug!(?candidate, "suppressed duplicate underline box");
        } else {
            kept.push((candidate, underline));
        }
    }

    kept.sort_by_key(|(rect, _)| *rect);
    kept.into_iter().unzip()
}

/// Turn underline blobs into `(boxes, underlines)` of equal length.
pub fn underlines_to_boxes(
    ink: &GrayImage,
    underlines: &[Blob],
    threshold: u8,
    params: &UnderlineParams,
) -> (Vec<Rect>, Vec<Rect>) {
    let strokes: Vec<Rect> = underlines.iter().map(|b| b.rect).collect();
    let mut pairs = Vec::with_capacity(underlines.len());
    for blob in underlines {
        match synthesize_box(ink, &blob.rect, &strokes, threshold, params) {
            Some(rect) => pairs.push((rect, blob.rect)),
            None => warn!(underline = ?blob.rect, "underline has no room for a box"),
        }
    }
    deduplicate(pairs, params.duplicate_iou)
}

/// Find underlines on an ink image and return `(boxes, underlines)`.
pub fn line_anonymization_to_boxes(
    ink: &GrayImage,
    threshold: u8,
    blob_params: &BlobParams,
    params: &UnderlineParams,
) -> (Vec<Rect>, Vec<Rect>) {
    let binary = binarize(ink, threshold);
    let blobs = find_blobs(&binary, blob_params);
    let underlines = blobs_of_kind(&blobs, BlobKind::Underline, blob_params);
    let (boxes, underlines) = underlines_to_boxes(ink, &underlines, threshold, params);
    debug!(count = boxes.len(), "underline boxes");
    (boxes, underlines)
}
