//! Rasterized pages and input validation.

use std::path::Path;

use image::{DynamicImage, GrayImage};

use crate::error::{ReaderError, Result};

/// A single rasterized PDF page in scan polarity (dark ink on light paper).
#[derive(Clone, Debug)]
pub struct Page {
    index: usize,
    image: GrayImage,
}

impl Page {
    /// Wrap a grayscale image, rejecting zero-sized pages.
    pub fn from_gray(index: usize, image: GrayImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ReaderError::EmptyImage { width, height });
        }
        Ok(Self { index, image })
    }

    /// Build a page from a raw single-channel pixel buffer.
    pub fn from_raw(
        index: usize,
        width: u32,
        height: u32,
        channels: u8,
        pixels: Vec<u8>,
    ) -> Result<Self> {
        if channels != 1 {
            return Err(ReaderError::UnsupportedChannels(channels));
        }
        if width == 0 || height == 0 {
            return Err(ReaderError::EmptyImage { width, height });
        }
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(ReaderError::BufferSize {
                expected,
                got: pixels.len(),
            });
        }
        let image = GrayImage::from_raw(width, height, pixels).ok_or(ReaderError::BufferSize {
            expected,
            got: 0,
        })?;
        Self::from_gray(index, image)
    }

    /// Convert any decoded image to grayscale.
    pub fn from_dynamic(index: usize, image: DynamicImage) -> Result<Self> {
        Self::from_gray(index, image.into_luma8())
    }

    /// Decode a page image from disk.
    pub fn open(index: usize, path: impl AsRef<Path>) -> Result<Self> {
        let image = image::open(path)?;
        Self::from_dynamic(index, image)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_sized_page() {
        let err = Page::from_gray(0, GrayImage::new(0, 10)).unwrap_err();
        assert!(matches!(err, ReaderError::EmptyImage { width: 0, height: 10 }));
    }

    #[test]
    fn rejects_wrong_channel_count() {
        let err = Page::from_raw(0, 2, 2, 3, vec![0; 12]).unwrap_err();
        assert!(matches!(err, ReaderError::UnsupportedChannels(3)));
    }

    #[test]
    fn rejects_short_buffer() {
        let err = Page::from_raw(0, 4, 4, 1, vec![0; 10]).unwrap_err();
        assert!(matches!(err, ReaderError::BufferSize { expected: 16, got: 10 }));
    }

    #[test]
    fn accepts_rgb_via_dynamic() {
        let rgb = image::RgbImage::from_pixel(3, 2, image::Rgb([255, 255, 255]));
        let page = Page::from_dynamic(4, DynamicImage::ImageRgb8(rgb)).unwrap();
        assert_eq!((page.width(), page.height(), page.index()), (3, 2, 4));
        assert_eq!(page.image().get_pixel(0, 0)[0], 255);
    }
}
