//! Per-page and per-document results.

use serde::Serialize;

use crate::model::{AnonymizationMethod, Table, TextBox};

/// Separator between page texts in a document.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Everything read from one page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PageResult {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    /// Reading-order text with anonymized spans marked.
    pub text: String,
    /// Anonymized boxes with their (possibly empty) recovered text.
    pub anonymized: Vec<TextBox>,
    pub tables: Vec<Table>,
    /// Number of prose words read.
    pub words: usize,
}

impl PageResult {
    /// Anonymized boxes that produced text.
    pub fn recovered_spans(&self) -> usize {
        self.anonymized
            .iter()
            .filter(|b| !b.text().is_empty())
            .count()
    }
}

/// Summary counters for a processed document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProcessInfo {
    pub pages: usize,
    pub anonymized_spans: usize,
    pub tables: usize,
    pub elapsed_ms: u64,
}

/// All pages of a document, in page order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DocumentResult {
    pub method: AnonymizationMethod,
    pub text: String,
    pub pages: Vec<PageResult>,
    pub info: ProcessInfo,
}

impl DocumentResult {
    /// Build a document from page results already sorted by index.
    pub fn from_pages(
        method: AnonymizationMethod,
        pages: Vec<PageResult>,
        elapsed_ms: u64,
    ) -> Self {
        let text = join_pages(pages.iter().map(|p| p.text.as_str()));
        let info = ProcessInfo {
            pages: pages.len(),
            anonymized_spans: pages.iter().map(PageResult::recovered_spans).sum(),
            tables: pages.iter().map(|p| p.tables.len()).sum(),
            elapsed_ms,
        };
        Self {
            method,
            text,
            pages,
            info,
        }
    }

    /// A document that needed no reconstruction; its text comes from elsewhere.
    pub fn passthrough(text: impl Into<String>, page_count: usize, elapsed_ms: u64) -> Self {
        Self {
            method: AnonymizationMethod::None,
            text: text.into(),
            pages: Vec::new(),
            info: ProcessInfo {
                pages: page_count,
                elapsed_ms,
                ..ProcessInfo::default()
            },
        }
    }
}

/// Join page texts with a blank line between pages.
pub fn join_pages<'a>(texts: impl IntoIterator<Item = &'a str>) -> String {
    texts.into_iter().collect::<Vec<_>>().join(PAGE_SEPARATOR)
}
