//! Page preprocessing: ink conversion, boundary noise and logo removal.
//!
//! Scans are dark-on-light. Analysis runs on the *ink image*, the inverted
//! scan, where ink is bright and paper is dark, so every threshold reads as
//! "more ink above this value".

use image::{GrayImage, Luma, imageops};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::blobs::{binarize, label_components};
use crate::error::Result;
use crate::geometry::Rect;
use crate::page::Page;
use crate::params::{LogoParams, PreprocessParams};

/// Invert a scan into an ink image.
pub fn to_ink(scan: &GrayImage) -> GrayImage {
    let mut ink = scan.clone();
    imageops::invert(&mut ink);
    ink
}

/// Set every pixel inside `rect` to background.
pub fn blank_rect(image: &mut GrayImage, rect: &Rect) {
    let rect = rect.clamp(image.width(), image.height());
    for y in rect.top..rect.bottom {
        for x in rect.left..rect.right {
            image.put_pixel(x, y, Luma([0]));
        }
    }
}

/// Remove scanner border noise from an ink image.
///
/// Solid bands along each edge are stripped first, moving inward until the
/// first row or column whose mean is at or below `threshold`. Any remaining
/// ink component touching the border is then erased. Afterwards every border
/// pixel is at or below `threshold`, and a second pass changes nothing.
pub fn remove_boundary_noise(image: &mut GrayImage, threshold: u8, max_border_fraction: f32) {
    let stripped = strip_border_bands(image, threshold, max_border_fraction);
    let cleared = clear_border_components(image, threshold);
    if stripped > 0 || cleared > 0 {
        debug!(stripped, cleared, "removed boundary noise");
    }
}

fn row_mean(image: &GrayImage, y: u32) -> f64 {
    let sum: u64 = (0..image.width()).map(|x| image.get_pixel(x, y)[0] as u64).sum();
    sum as f64 / image.width() as f64
}

fn col_mean(image: &GrayImage, x: u32) -> f64 {
    let sum: u64 = (0..image.height()).map(|y| image.get_pixel(x, y)[0] as u64).sum();
    sum as f64 / image.height() as f64
}

fn strip_border_bands(image: &mut GrayImage, threshold: u8, max_border_fraction: f32) -> u32 {
    let (width, height) = image.dimensions();
    let max_rows = (height as f32 * max_border_fraction) as u32;
    let max_cols = (width as f32 * max_border_fraction) as u32;
    let limit = threshold as f64;
    let mut stripped = 0;

    let mut band = |image: &mut GrayImage, lines: Vec<u32>, horizontal: bool| {
        for line in lines {
            let mean = if horizontal {
                row_mean(image, line)
            } else {
                col_mean(image, line)
            };
            if mean <= limit {
                break;
            }
            let rect = if horizontal {
                Rect::new(line, 0, line + 1, width)
            } else {
                Rect::new(0, line, height, line + 1)
            };
            blank_rect(image, &rect);
            stripped += 1;
        }
    };

    band(image, (0..max_rows).collect(), true);
    band(image, (height.saturating_sub(max_rows)..height).rev().collect(), true);
    band(image, (0..max_cols).collect(), false);
    band(image, (width.saturating_sub(max_cols)..width).rev().collect(), false);
    stripped
}

fn clear_border_components(image: &mut GrayImage, threshold: u8) -> usize {
    let (width, height) = image.dimensions();
    let binary = binarize(image, threshold);
    let (labels, _) = label_components(&binary);

    let mut touching: FxHashSet<u32> = FxHashSet::default();
    for x in 0..width {
        touching.insert(labels.get_pixel(x, 0)[0]);
        touching.insert(labels.get_pixel(x, height - 1)[0]);
    }
    for y in 0..height {
        touching.insert(labels.get_pixel(0, y)[0]);
        touching.insert(labels.get_pixel(width - 1, y)[0]);
    }
    touching.remove(&0);
    if touching.is_empty() {
        return 0;
    }

    for (x, y, label) in labels.enumerate_pixels() {
        if touching.contains(&label[0]) {
            image.put_pixel(x, y, Luma([0]));
        }
    }
    touching.len()
}

/// A publisher logo stamped at fixed relative positions.
#[derive(Clone, Debug)]
pub struct LogoTemplate {
    /// Logo in ink polarity.
    ink: GrayImage,
    anchors: Vec<(f32, f32)>,
    tolerance: f32,
    search_radius: u32,
}

impl LogoTemplate {
    /// Build from a scan-polarity logo image.
    pub fn new(
        scan: &GrayImage,
        anchors: Vec<(f32, f32)>,
        tolerance: f32,
        search_radius: u32,
    ) -> Self {
        Self {
            ink: to_ink(scan),
            anchors,
            tolerance,
            search_radius,
        }
    }

    /// Load the logo image named by the parameters.
    pub fn load(params: &LogoParams) -> Result<Self> {
        let scan = image::open(&params.template)?.into_luma8();
        Ok(Self::new(
            &scan,
            params.anchors.clone(),
            params.tolerance,
            params.search_radius,
        ))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.ink.dimensions()
    }

    /// Blank the logo wherever it appears; returns true if anything changed.
    ///
    /// Pages smaller than the template are returned untouched.
    pub fn remove(&self, image: &mut GrayImage) -> bool {
        let (tw, th) = self.ink.dimensions();
        let (width, height) = image.dimensions();
        if tw == 0 || th == 0 || tw > width || th > height {
            return false;
        }

        let mut removed = false;
        for &(rel_row, rel_col) in &self.anchors {
            let row = ((height as f32 * rel_row) as u32).min(height - th);
            let col = ((width as f32 * rel_col) as u32).min(width - tw);
            if let Some((top, left)) = self.best_match(image, row, col) {
                blank_rect(image, &Rect::new(top, left, top + th, left + tw));
                debug!(top, left, "removed logo");
                removed = true;
            }
        }
        removed
    }

    /// Position near `(row, col)` whose mean absolute difference to the
    /// template is below tolerance, if any.
    fn best_match(&self, image: &GrayImage, row: u32, col: u32) -> Option<(u32, u32)> {
        let (tw, th) = self.ink.dimensions();
        let (width, height) = image.dimensions();
        let r = self.search_radius;
        let mut best: Option<(f32, u32, u32)> = None;

        for top in row.saturating_sub(r)..=(row + r).min(height - th) {
            for left in col.saturating_sub(r)..=(col + r).min(width - tw) {
                let diff = self.mean_abs_diff(image, top, left);
                if best.is_none_or(|(d, ..)| diff < d) {
                    best = Some((diff, top, left));
                }
            }
        }

        best.filter(|(diff, ..)| *diff <= self.tolerance)
            .map(|(_, top, left)| (top, left))
    }

    fn mean_abs_diff(&self, image: &GrayImage, top: u32, left: u32) -> f32 {
        let mut total: u64 = 0;
        for (x, y, pixel) in self.ink.enumerate_pixels() {
            let page = image.get_pixel(left + x, top + y)[0];
            total += page.abs_diff(pixel[0]) as u64;
        }
        total as f32 / (self.ink.width() * self.ink.height()) as f32
    }
}

/// Produce the cleaned ink image for a page.
pub fn preprocess(
    page: &Page,
    params: &PreprocessParams,
    logo: Option<&LogoTemplate>,
) -> GrayImage {
    let mut ink = to_ink(page.image());
    remove_boundary_noise(&mut ink, params.binary_threshold, params.max_border_fraction);
    if let Some(logo) = logo {
        logo.remove(&mut ink);
    }
    ink
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect as DrawRect;

    fn noisy_page() -> GrayImage {
        let mut ink = GrayImage::new(120, 100);
        // Solid scanner band along the left edge.
        draw_filled_rect_mut(&mut ink, DrawRect::at(0, 0).of_size(6, 100), Luma([255u8]));
        // Blob touching the bottom edge.
        draw_filled_rect_mut(&mut ink, DrawRect::at(50, 90).of_size(10, 10), Luma([230u8]));
        // Speck on the top edge.
        ink.put_pixel(80, 0, Luma([210]));
        // Real content.
        draw_filled_rect_mut(&mut ink, DrawRect::at(40, 40).of_size(30, 10), Luma([255u8]));
        ink
    }

    fn border_max(image: &GrayImage) -> u8 {
        let (w, h) = image.dimensions();
        let mut max = 0;
        for x in 0..w {
            max = max.max(image.get_pixel(x, 0)[0]).max(image.get_pixel(x, h - 1)[0]);
        }
        for y in 0..h {
            max = max.max(image.get_pixel(0, y)[0]).max(image.get_pixel(w - 1, y)[0]);
        }
        max
    }

    #[test]
    fn boundary_noise_leaves_clean_borders() {
        let mut ink = noisy_page();
        remove_boundary_noise(&mut ink, 200, 0.25);
        assert!(border_max(&ink) <= 200);
        // Interior content survives.
        assert_eq!(ink.get_pixel(55, 45)[0], 255);
    }

    #[test]
    fn boundary_noise_is_idempotent() {
        let mut once = noisy_page();
        remove_boundary_noise(&mut once, 200, 0.25);
        let mut twice = once.clone();
        remove_boundary_noise(&mut twice, 200, 0.25);
        assert_eq!(once, twice);
    }

    #[test]
    fn dark_border_below_threshold_is_kept() {
        let mut ink = GrayImage::from_pixel(20, 20, Luma([150]));
        let before = ink.clone();
        remove_boundary_noise(&mut ink, 200, 0.25);
        assert_eq!(ink, before);
    }

    fn logo_scan() -> GrayImage {
        let mut logo = GrayImage::from_pixel(20, 10, Luma([255]));
        draw_filled_rect_mut(&mut logo, DrawRect::at(2, 2).of_size(16, 2), Luma([0u8]));
        draw_filled_rect_mut(&mut logo, DrawRect::at(2, 6).of_size(6, 3), Luma([0u8]));
        logo
    }

    fn page_with_logo_at(top: i32, left: i32) -> GrayImage {
        let logo = to_ink(&logo_scan());
        let mut ink = GrayImage::new(200, 150);
        imageops::replace(&mut ink, &logo, left as i64, top as i64);
        ink
    }

    #[test]
    fn logo_at_anchor_is_removed() {
        let template = LogoTemplate::new(&logo_scan(), vec![(0.1, 0.1)], 10.0, 4);
        let mut ink = page_with_logo_at(16, 22);
        let before = ink.clone();
        assert!(template.remove(&mut ink));
        assert_ne!(ink, before);
        assert!(ink.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn centered_logo_is_removed() {
        let template = LogoTemplate::new(&logo_scan(), vec![(0.0, 0.0), (0.5, 0.45)], 10.0, 4);
        let mut ink = page_with_logo_at(75, 90);
        assert!(template.remove(&mut ink));
        assert!(ink.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn page_without_logo_is_untouched() {
        let template = LogoTemplate::new(&logo_scan(), vec![(0.1, 0.1)], 10.0, 4);
        let mut ink = GrayImage::new(200, 150);
        draw_filled_rect_mut(&mut ink, DrawRect::at(100, 100).of_size(40, 10), Luma([255u8]));
        let before = ink.clone();
        assert!(!template.remove(&mut ink));
        assert_eq!(ink, before);
    }

    #[test]
    fn logo_removal_is_idempotent() {
        let template = LogoTemplate::new(&logo_scan(), vec![(0.1, 0.1)], 10.0, 4);
        let mut ink = page_with_logo_at(15, 20);
        template.remove(&mut ink);
        let after_once = ink.clone();
        assert!(!template.remove(&mut ink));
        assert_eq!(ink, after_once);
    }

    #[test]
    fn page_smaller_than_logo_is_unchanged() {
        let template = LogoTemplate::new(&logo_scan(), vec![(0.0, 0.0)], 10.0, 4);
        let mut ink = GrayImage::from_pixel(8, 8, Luma([255]));
        let before = ink.clone();
        assert!(!template.remove(&mut ink));
        assert_eq!(ink, before);
    }
}
