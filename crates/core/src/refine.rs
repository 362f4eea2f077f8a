//! Tightening, word splitting and row splitting of anonymized boxes.
//!
//! All profiles are computed on a "content crop": the part of the box that
//! holds readable strokes rendered bright on dark. For underline and prose
//! boxes that is the ink image itself; a box-fill region is solid ink with
//! the replacement text left as holes, so its crop is inverted first.

use image::{GrayImage, imageops};
use tracing::{debug, warn};

use crate::geometry::{Rect, connected_groups};
use crate::model::Origin;
use crate::params::SplitParams;

/// Crop `rect` from the ink image with content bright.
pub fn content_crop(ink: &GrayImage, rect: &Rect, origin: Origin) -> GrayImage {
    let rect = rect.clamp(ink.width(), ink.height());
    let mut crop =
        imageops::crop_imm(ink, rect.left, rect.top, rect.width(), rect.height()).to_image();
    if origin == Origin::BoxFill {
        imageops::invert(&mut crop);
    }
    crop
}

/// Ink pixels per row.
pub fn row_profile(image: &GrayImage, threshold: u8) -> Vec<u32> {
    let mut rows = vec![0u32; image.height() as usize];
    for (_, y, pixel) in image.enumerate_pixels() {
        if pixel[0] > threshold {
            rows[y as usize] += 1;
        }
    }
    rows
}

/// Ink pixels per column.
pub fn column_profile(image: &GrayImage, threshold: u8) -> Vec<u32> {
    let mut cols = vec![0u32; image.width() as usize];
    for (x, _, pixel) in image.enumerate_pixels() {
        if pixel[0] > threshold {
            cols[x as usize] += 1;
        }
    }
    cols
}

fn first_last(profile: &[u32], min_pixels: u32) -> Option<(u32, u32)> {
    let first = profile.iter().position(|&n| n >= min_pixels)?;
    let last = profile.iter().rposition(|&n| n >= min_pixels)?;
    Some((first as u32, last as u32 + 1))
}

/// Bounding rectangle of the content in a crop, in crop coordinates.
pub fn ink_extent(crop: &GrayImage, threshold: u8, min_pixels: u32) -> Option<Rect> {
    let min_pixels = min_pixels.max(1);
    let (top, bottom) = first_last(&row_profile(crop, threshold), min_pixels)?;
    let (left, right) = first_last(&column_profile(crop, threshold), min_pixels)?;
    Rect::non_empty(top, left, bottom, right)
}

/// Tighten a box to its content, or `None` if it holds no content at all.
pub fn refine_checked(
    ink: &GrayImage,
    rect: &Rect,
    origin: Origin,
    threshold: u8,
    min_pixels: u32,
) -> Option<Rect> {
    let crop = content_crop(ink, rect, origin);
    ink_extent(&crop, threshold, min_pixels).map(|extent| extent.offset(rect))
}

/// Tighten a box to its content. An empty box comes back unchanged.
pub fn refine(
    ink: &GrayImage,
    rect: &Rect,
    origin: Origin,
    threshold: u8,
    min_pixels: u32,
) -> Rect {
    refine_checked(ink, rect, origin, threshold, min_pixels).unwrap_or(*rect)
}

/// Column offsets at which a content crop separates into words.
///
/// Background column runs between the first and last content column that
/// are at least `min_gap` wide split at their midpoint. Offsets are
/// ascending.
pub fn split_indices(crop: &GrayImage, threshold: u8, min_gap: u32) -> Vec<u32> {
    let cols = column_profile(crop, threshold);
    let Some((first, last)) = first_last(&cols, 1) else {
        return Vec::new();
    };

    let mut splits = Vec::new();
    let mut run_start: Option<u32> = None;
    for x in first..last {
        let blank = cols[x as usize] == 0;
        match (blank, run_start) {
            (true, None) => run_start = Some(x),
            (false, Some(start)) => {
                let len = x - start;
                if len >= min_gap.max(1) {
                    splits.push(start + len / 2);
                }
                run_start = None;
            }
            _ => {}
        }
    }
    splits
}

/// Split a box covering several words into one box per word, left to right.
///
/// Each piece is tightened to its content; pieces that collapse are dropped.
pub fn split_box(
    ink: &GrayImage,
    rect: &Rect,
    origin: Origin,
    threshold: u8,
    params: &SplitParams,
) -> Vec<Rect> {
    let crop = content_crop(ink, rect, origin);
    let splits = split_indices(&crop, threshold, params.min_word_gap);
    if splits.is_empty() {
        return vec![*rect];
    }

    let mut edges = Vec::with_capacity(splits.len() + 2);
    edges.push(0);
    edges.extend(splits);
    edges.push(crop.width());

    let pieces: Vec<Rect> = edges
        .windows(2)
        .filter_map(|w| {
            let local = Rect::new(0, w[0], crop.height(), w[1]);
            let sub = imageops::crop_imm(&crop, local.left, 0, local.width(), local.height());
            match ink_extent(&sub.to_image(), threshold, params.refine_min_pixels) {
                Some(extent) => Some(extent.offset(&local).offset(rect)),
                None => {
                    warn!(?rect, column = w[0], "dropping empty split piece");
                    None
                }
            }
        })
        .collect();
    debug!(?rect, pieces = pieces.len(), "split box");
    pieces
}

/// Row offsets where the content density drops to background after a
/// cluster of content rows, ordered top to bottom.
pub fn row_split_indices(crop: &GrayImage, threshold: u8, max_density: f32) -> Vec<u32> {
    let width = crop.width().max(1) as f32;
    let mut splits = Vec::new();
    let mut in_ink = false;
    for (y, count) in row_profile(crop, threshold).into_iter().enumerate() {
        let background = count as f32 / width <= max_density;
        if in_ink && background {
            splits.push(y as u32);
        }
        in_ink = !background;
    }
    splits
}

/// Cut a tall box into one band per line of content.
///
/// Bands without content are dropped; a box with a single line comes back
/// as is.
pub fn split_rows(
    ink: &GrayImage,
    rect: &Rect,
    origin: Origin,
    threshold: u8,
    params: &SplitParams,
) -> Vec<Rect> {
    let crop = content_crop(ink, rect, origin);
    let rows = row_split_indices(&crop, threshold, params.row_background_density);
    let profile = row_profile(&crop, threshold);

    let mut edges = Vec::with_capacity(rows.len() + 2);
    edges.push(0);
    edges.extend(rows.into_iter().filter(|&r| r > 0 && r < crop.height()));
    edges.push(crop.height());
    edges.dedup();

    let bands: Vec<Rect> = edges
        .windows(2)
        .filter(|w| profile[w[0] as usize..w[1] as usize].iter().any(|&n| n > 0))
        .filter_map(|w| Rect::non_empty(rect.top + w[0], rect.left, rect.top + w[1], rect.right))
        .collect();

    if bands.len() <= 1 {
        vec![*rect]
    } else {
        debug!(?rect, bands = bands.len(), "split stacked box");
        bands
    }
}

/// Resolve boxes stacked on top of each other into one box per line.
///
/// Overlapping boxes are grouped; a group, or a single box taller than
/// `max_line_height`, is split at the row boundaries of its union. The result
/// is sorted by position.
pub fn resolve_row_overlaps(
    ink: &GrayImage,
    boxes: Vec<Rect>,
    origin: Origin,
    threshold: u8,
    params: &SplitParams,
) -> Vec<Rect> {
    let mut resolved = Vec::with_capacity(boxes.len());
    for group in connected_groups(&boxes, |a, b| a.intersects(b)) {
        let Some(union) = group.iter().map(|&i| boxes[i]).reduce(|a, b| a.union(&b)) else {
            continue;
        };
        if group.len() == 1 && union.height() <= params.max_line_height {
            resolved.push(union);
        } else {
            resolved.extend(split_rows(ink, &union, origin, threshold, params));
        }
    }
    resolved.sort();
    resolved
}
