//! OCR engine boundary and region reading.
//!
//! The engine itself is external. The core hands it crops prepared as dark
//! text on a light background and never asks it about blank regions.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use image::{GrayImage, Luma, imageops};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{ReaderError, Result};
use crate::geometry::Rect;
use crate::model::{Origin, TextBox};
use crate::params::{ProseParams, RegionParams};
use crate::prose::word_boxes;

/// Opening anonymization marker.
pub const ANONYM_START: &str = "<anonym>";
/// Closing anonymization marker.
pub const ANONYM_END: &str = "</anonym>";

/// A synchronous text recognizer.
pub trait OcrEngine: Send + Sync {
    /// Recognize the text in a dark-on-light crop.
    ///
    /// Blank or near-blank crops must produce an empty string, not an error.
    fn recognize(&self, crop: &GrayImage) -> Result<String>;

    /// Find and read the prose words of an ink image.
    ///
    /// The default segments words geometrically and recognizes each crop.
    /// Engines with their own layout analysis may override it.
    fn read_words(
        &self,
        ink: &GrayImage,
        threshold: u8,
        params: &ProseParams,
    ) -> Result<Vec<TextBox>> {
        let rects = word_boxes(ink, threshold, params);
        let words = rects
            .par_iter()
            .map(|rect| {
                let text = read_region(ink, rect, Origin::Prose, self, 0, threshold)?;
                Ok(TextBox::with_text(*rect, Origin::Prose, text))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(words.into_iter().filter(|w| !w.text().is_empty()).collect())
    }
}

impl<E: OcrEngine + ?Sized> OcrEngine for &E {
    fn recognize(&self, crop: &GrayImage) -> Result<String> {
        (**self).recognize(crop)
    }

    fn read_words(
        &self,
        ink: &GrayImage,
        threshold: u8,
        params: &ProseParams,
    ) -> Result<Vec<TextBox>> {
        (**self).read_words(ink, threshold, params)
    }
}

impl<E: OcrEngine + ?Sized> OcrEngine for Arc<E> {
    fn recognize(&self, crop: &GrayImage) -> Result<String> {
        (**self).recognize(crop)
    }

    fn read_words(
        &self,
        ink: &GrayImage,
        threshold: u8,
        params: &ProseParams,
    ) -> Result<Vec<TextBox>> {
        (**self).read_words(ink, threshold, params)
    }
}

impl<E: OcrEngine + ?Sized> OcrEngine for Box<E> {
    fn recognize(&self, crop: &GrayImage) -> Result<String> {
        (**self).recognize(crop)
    }

    fn read_words(
        &self,
        ink: &GrayImage,
        threshold: u8,
        params: &ProseParams,
    ) -> Result<Vec<TextBox>> {
        (**self).read_words(ink, threshold, params)
    }
}

/// Wrap recovered text in the anonymization marker.
pub fn wrap_anonym(text: &str) -> String {
    format!("{ANONYM_START}{text}{ANONYM_END}")
}

/// Crop a region of the ink image and turn it into dark text on white.
///
/// Box-fill regions already read dark on light inside the fill, so they are
/// padded with white instead of inverted. Everything else is cropped with
/// `margin` of surrounding page and inverted.
pub fn ocr_crop(ink: &GrayImage, rect: &Rect, origin: Origin, margin: u32) -> GrayImage {
    let (width, height) = ink.dimensions();
    match origin {
        Origin::BoxFill => {
            let rect = rect.clamp(width, height);
            let inner = imageops::crop_imm(ink, rect.left, rect.top, rect.width(), rect.height())
                .to_image();
            let mut canvas = GrayImage::from_pixel(
                rect.width() + 2 * margin,
                rect.height() + 2 * margin,
                Luma([255]),
            );
            imageops::replace(&mut canvas, &inner, margin as i64, margin as i64);
            canvas
        }
        Origin::Underline | Origin::Prose => {
            let rect = rect.expand(margin, width, height);
            let mut crop =
                imageops::crop_imm(ink, rect.left, rect.top, rect.width(), rect.height())
                    .to_image();
            imageops::invert(&mut crop);
            crop
        }
    }
}

/// True if a dark-on-light crop holds no pixel dark enough to be ink.
pub fn is_blank(crop: &GrayImage, threshold: u8) -> bool {
    crop.width() == 0
        || crop.height() == 0
        || !crop.pixels().any(|p| 255 - p[0] > threshold)
}

/// Recognize the text in one region, trimmed. Blank regions read as "".
pub fn read_region<E: OcrEngine + ?Sized>(
    ink: &GrayImage,
    rect: &Rect,
    origin: Origin,
    engine: &E,
    margin: u32,
    threshold: u8,
) -> Result<String> {
    let crop = ocr_crop(ink, rect, origin, margin);
    if is_blank(&crop, threshold) {
        debug!(?rect, "blank region, skipping OCR");
        return Ok(String::new());
    }
    Ok(engine.recognize(&crop)?.trim().to_string())
}

/// Read an anonymized box and wrap a non-empty result in the marker.
pub fn read_anonymized_box<E: OcrEngine + ?Sized>(
    ink: &GrayImage,
    text_box: &TextBox,
    engine: &E,
    params: &RegionParams,
    threshold: u8,
) -> Result<String> {
    let text = read_region(
        ink,
        &text_box.rect,
        text_box.origin,
        engine,
        params.crop_margin,
        threshold,
    )?;
    if text.is_empty() {
        debug!(rect = ?text_box.rect, "anonymized box has no recoverable text");
        Ok(text)
    } else {
        Ok(wrap_anonym(&text))
    }
}

/// Bounds every call to an inner engine by a fixed duration.
///
/// Each call runs on its own thread. A call that does not answer in time is
/// abandoned and reads as empty text.
#[derive(Debug)]
pub struct TimeoutOcr<E> {
    inner: Arc<E>,
    timeout: Duration,
}

impl<E: OcrEngine + 'static> TimeoutOcr<E> {
    pub fn new(engine: E, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(engine),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Recognize a crop, failing with [`ReaderError::OcrTimeout`] on expiry.
    pub fn try_recognize(&self, crop: &GrayImage) -> Result<String> {
        let (tx, rx) = mpsc::channel();
        let engine = Arc::clone(&self.inner);
        let crop = crop.clone();
        thread::Builder::new()
            .name("ocr-call".into())
            .spawn(move || {
                let _ = tx.send(engine.recognize(&crop));
            })?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(ReaderError::OcrTimeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(ReaderError::Ocr(
                "OCR worker exited without a result".to_string(),
            )),
        }
    }
}

impl<E: OcrEngine + 'static> OcrEngine for TimeoutOcr<E> {
    fn recognize(&self, crop: &GrayImage) -> Result<String> {
        match self.try_recognize(crop) {
            Err(ReaderError::OcrTimeout(limit)) => {
                warn!(?limit, "OCR call timed out, using empty text");
                Ok(String::new())
            }
            other => other,
        }
    }
}
