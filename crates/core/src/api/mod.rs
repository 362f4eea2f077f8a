//! High-level API for reconstructing anonymized page text.
//!
//! # Example
//!
//! ```ignore
//! use anonread_core::api::Reader;
//! use anonread_core::{AnonymizationMethod, Page, ReaderParams};
//!
//! let reader = Reader::new(engine, ReaderParams::default())?;
//! let page = Page::open(0, "page-001.png")?;
//! let result = reader.read_page(&page, AnonymizationMethod::Underline)?;
//! println!("{}", result.text);
//! ```

pub mod high_level;
pub mod result;

pub use high_level::{
    Detection, Reader, choose_method, count_redaction_blobs, find_anonymized_boxes,
};
pub use result::{DocumentResult, PAGE_SEPARATOR, PageResult, ProcessInfo, join_pages};
