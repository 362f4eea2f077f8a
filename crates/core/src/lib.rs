//! anonread - Reconstruction of anonymized text on scanned legal documents.
//!
//! Pages arrive as raster images. Redacted spans (underlined or covered by a
//! solid box) are located geometrically, read with an external OCR engine,
//! wrapped in `<anonym>` markers and merged with the page's prose and tables
//! into reading-order text.

pub mod api;
pub mod assemble;
pub mod blobs;
pub mod error;
pub mod geometry;
pub mod model;
pub mod ocr;
pub mod page;
pub mod params;
pub mod preprocess;
pub mod prose;
pub mod refine;
pub mod table;
pub mod underline;

pub use api::{DocumentResult, PageResult, ProcessInfo, Reader};
pub use error::{ReaderError, Result};
pub use geometry::Rect;
pub use model::{AnonymizationMethod, Origin, Table, TextBox};
pub use ocr::{ANONYM_END, ANONYM_START, OcrEngine, TimeoutOcr};
pub use page::Page;
pub use params::ReaderParams;
