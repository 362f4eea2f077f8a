//! Synthetic scans and a deterministic OCR engine for integration tests.
//!
//! Pages are drawn in scan polarity: black ink on a white page. A "word" is
//! a run of 4px letter bars on a 10px pitch, and the fake engine reads a crop
//! by counting the dark bars in it.

#![allow(dead_code)]

use anonread_core::{OcrEngine, Page, Result};
use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect as DrawRect;

pub const LETTER_HEIGHT: u32 = 25;

pub fn blank_scan(width: u32, height: u32) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([255]))
}

pub fn fill(scan: &mut GrayImage, top: i32, left: i32, height: u32, width: u32, value: u8) {
    draw_filled_rect_mut(scan, DrawRect::at(left, top).of_size(width, height), Luma([value]));
}

/// Draw `letters` bars starting at `(top, left)`; returns the right edge.
pub fn word(scan: &mut GrayImage, top: i32, left: i32, letters: u32, value: u8) -> i32 {
    for i in 0..letters as i32 {
        fill(scan, top, left + i * 10, LETTER_HEIGHT, 4, value);
    }
    left + letters as i32 * 10 - 6
}

/// A word with an underline stroke 4px below it.
pub fn underlined_word(scan: &mut GrayImage, top: i32, left: i32, letters: u32) {
    let right = word(scan, top, left, letters, 0);
    fill(scan, top + LETTER_HEIGHT as i32 + 4, left - 4, 3, (right - left + 8) as u32, 0);
}

/// A solid box with the word left as white holes inside it.
pub fn boxed_word(scan: &mut GrayImage, top: i32, left: i32, width: u32, letters: u32) {
    fill(scan, top, left, 44, width, 0);
    word(scan, top + 8, left + 10, letters, 255);
}

/// Draw a ruled grid with edges at the given rows and columns.
pub fn grid(scan: &mut GrayImage, rows: &[i32], cols: &[i32]) {
    let (top, bottom) = (rows[0], rows[rows.len() - 1]);
    let (left, right) = (cols[0], cols[cols.len() - 1]);
    for &y in rows {
        fill(scan, y, left, 3, (right - left + 3) as u32, 0);
    }
    for &x in cols {
        fill(scan, top, x, (bottom - top + 3) as u32, 3, 0);
    }
}

pub fn page(index: usize, scan: GrayImage) -> Page {
    Page::from_gray(index, scan).expect("valid page")
}

/// Reads a dark-on-light crop by counting its letter bars.
pub struct BarOcr {
    vocabulary: Vec<(usize, &'static str)>,
}

impl BarOcr {
    pub fn new(vocabulary: &[(usize, &'static str)]) -> Self {
        Self {
            vocabulary: vocabulary.to_vec(),
        }
    }
}

pub fn count_bars(crop: &GrayImage) -> usize {
    let dark_column = |x: u32| (0..crop.height()).any(|y| crop.get_pixel(x, y)[0] < 128);
    let mut bars = 0;
    let mut in_bar = false;
    for x in 0..crop.width() {
        let dark = dark_column(x);
        if dark && !in_bar {
            bars += 1;
        }
        in_bar = dark;
    }
    bars
}

impl OcrEngine for BarOcr {
    fn recognize(&self, crop: &GrayImage) -> Result<String> {
        let bars = count_bars(crop);
        Ok(self
            .vocabulary
            .iter()
            .find(|(n, _)| *n == bars)
            .map(|(_, text)| text.to_string())
            .unwrap_or_else(|| format!("?{bars}")))
    }
}

pub fn vocabulary() -> BarOcr {
    BarOcr::new(&[
        (2, "P1"),
        (3, "vil"),
        (4, "hvor"),
        (5, "Noget"),
        (6, "Person 5"),
        (8, "Tiltalte"),
    ])
}
