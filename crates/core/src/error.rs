//! Error types for anonread page reconstruction.

use thiserror::Error;

/// Primary error type for page reading operations.
#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("page image has no pixels: {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    #[error("unsupported channel count: expected 1, got {0}")]
    UnsupportedChannels(u8),

    #[error("pixel buffer size mismatch: expected {expected} bytes, got {got}")]
    BufferSize { expected: usize, got: usize },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR engine failed: {0}")]
    Ocr(String),

    #[error("OCR call exceeded {0:?}")]
    OcrTimeout(std::time::Duration),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("thread pool error: {0}")]
    ThreadPool(String),

    #[error("anonymization method `none` bypasses page reconstruction")]
    Bypassed,
}

/// Convenience Result type alias for ReaderError.
pub type Result<T> = std::result::Result<T, ReaderError>;
