//! Grid-line extraction.
//!
//! A grid line is a long, thin run of ink. Runs are collected per
//! orientation into a mask, and each connected stroke of the mask becomes one
//! [`Line`] if it is thin enough. Solid fills produce long runs too but fail
//! the thickness test.

use image::{GrayImage, Luma};

use crate::blobs::label_components;
use crate::geometry::Rect;
use crate::params::TableParams;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A ruled line on the page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Line {
    pub orientation: Orientation,
    pub rect: Rect,
}

impl Line {
    /// Center row of a horizontal line or center column of a vertical one.
    pub fn position(&self) -> u32 {
        match self.orientation {
            Orientation::Horizontal => (self.rect.top + self.rect.bottom) / 2,
            Orientation::Vertical => (self.rect.left + self.rect.right) / 2,
        }
    }

    pub fn thickness(&self) -> u32 {
        match self.orientation {
            Orientation::Horizontal => self.rect.height(),
            Orientation::Vertical => self.rect.width(),
        }
    }

    pub fn length(&self) -> u32 {
        match self.orientation {
            Orientation::Horizontal => self.rect.width(),
            Orientation::Vertical => self.rect.height(),
        }
    }

    /// True if a horizontal and a vertical line cross within `tolerance`.
    pub fn crosses(&self, other: &Line, tolerance: u32) -> bool {
        self.orientation != other.orientation
            && self
                .rect
                .expand(tolerance, u32::MAX, u32::MAX)
                .intersects(&other.rect)
    }
}

/// Keep only ink runs of at least `min_len` pixels along one orientation.
pub fn run_mask(binary: &GrayImage, orientation: Orientation, min_len: u32) -> GrayImage {
    let (width, height) = binary.dimensions();
    let horizontal = orientation == Orientation::Horizontal;
    let (lanes, len) = if horizontal { (height, width) } else { (width, height) };
    let at = |lane: u32, pos: u32| if horizontal { (pos, lane) } else { (lane, pos) };

    let mut mask = GrayImage::new(width, height);
    for lane in 0..lanes {
        let mut pos = 0;
        while pos < len {
            let (x, y) = at(lane, pos);
            if binary.get_pixel(x, y)[0] == 0 {
                pos += 1;
                continue;
            }
            let start = pos;
            while pos < len {
                let (x, y) = at(lane, pos);
                if binary.get_pixel(x, y)[0] == 0 {
                    break;
                }
                pos += 1;
            }
            if pos - start >= min_len {
                for run in start..pos {
                    let (x, y) = at(lane, run);
                    mask.put_pixel(x, y, Luma([255]));
                }
            }
        }
    }
    mask
}

/// Ruled lines of one orientation on a binary ink image.
pub fn find_lines_oriented(
    binary: &GrayImage,
    orientation: Orientation,
    params: &TableParams,
) -> Vec<Line> {
    let mask = run_mask(binary, orientation, params.min_line_length);
    let (_, strokes) = label_components(&mask);
    strokes
        .into_iter()
        .map(|blob| Line {
            orientation,
            rect: blob.rect,
        })
        .filter(|line| {
            line.thickness() <= params.max_line_thickness && line.length() >= params.min_line_length
        })
        .collect()
}

/// Horizontal then vertical ruled lines on a binary ink image.
pub fn find_lines(binary: &GrayImage, params: &TableParams) -> Vec<Line> {
    let mut lines = find_lines_oriented(binary, Orientation::Horizontal, params);
    lines.extend(find_lines_oriented(binary, Orientation::Vertical, params));
    lines
}
