//! High-level page and document reading.
//!
//! Provides the main public API:
//! - [`find_anonymized_boxes`] - Detect anonymized spans on an ink image
//! - [`Reader::read_page`] - Reconstruct the text of one page
//! - [`Reader::read_document`] - Reconstruct every page in parallel
//! - [`Reader::detect_method`] - Guess how a document was anonymized

use std::time::Instant;

use image::GrayImage;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::api::result::{DocumentResult, PageResult};
use crate::assemble::assemble_page_text;
use crate::blobs::{BlobKind, binarize, blobs_of_kind, classify, find_blobs};
use crate::error::{ReaderError, Result};
use crate::geometry::Rect;
use crate::model::{AnonymizationMethod, Origin, TextBox};
use crate::ocr::{OcrEngine, read_anonymized_box};
use crate::page::Page;
use crate::params::ReaderParams;
use crate::preprocess::{LogoTemplate, preprocess};
use crate::prose::mask_regions;
use crate::refine::{refine, resolve_row_overlaps, split_box};
use crate::table::{find_grids, read_grid};
use crate::underline::line_anonymization_to_boxes;

pub(crate) fn default_thread_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Anonymized boxes found on a page, before any text is read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Detection {
    /// One box per anonymized span, sorted by position.
    pub boxes: Vec<TextBox>,
    /// Underline strokes paired with underline boxes.
    pub underlines: Vec<Rect>,
    /// Page area taken by the redactions themselves, blanked before prose
    /// is read.
    pub covered: Vec<Rect>,
}

fn keep_non_degenerate(rects: impl IntoIterator<Item = Rect>, origin: Origin) -> Vec<TextBox> {
    rects
        .into_iter()
        .filter_map(|rect| {
            if rect.is_empty() {
                warn!(?rect, ?origin, "dropping degenerate box");
                None
            } else {
                Some(TextBox::new(rect, origin))
            }
        })
        .collect()
}

/// Detect anonymized boxes on an ink image whose tables are already masked.
pub fn find_anonymized_boxes(
    ink: &GrayImage,
    method: AnonymizationMethod,
    params: &ReaderParams,
) -> Detection {
    let threshold = params.preprocess.binary_threshold;
    let min_pixels = params.split.refine_min_pixels;

    let detection = match method {
        AnonymizationMethod::None => Detection::default(),
        AnonymizationMethod::Underline => {
            let (boxes, underlines) =
                line_anonymization_to_boxes(ink, threshold, &params.blobs, &params.underline);
            let refined = boxes
                .iter()
                .map(|rect| refine(ink, rect, Origin::Underline, threshold, min_pixels));
            Detection {
                boxes: keep_non_degenerate(refined, Origin::Underline),
                underlines,
                covered: boxes,
            }
        }
        AnonymizationMethod::Box => {
            let binary = binarize(ink, threshold);
            let blobs = find_blobs(&binary, &params.blobs);
            let fills: Vec<Rect> = blobs_of_kind(&blobs, BlobKind::BoxFill, &params.blobs)
                .iter()
                .map(|b| b.rect)
                .collect();
            let lines =
                resolve_row_overlaps(ink, fills.clone(), Origin::BoxFill, threshold, &params.split);
            let words = lines
                .iter()
                .flat_map(|rect| split_box(ink, rect, Origin::BoxFill, threshold, &params.split));
            Detection {
                boxes: keep_non_degenerate(words, Origin::BoxFill),
                underlines: Vec::new(),
                covered: fills,
            }
        }
    };
    debug!(%method, boxes = detection.boxes.len(), "anonymized boxes");
    detection
}

/// Count `(underline, box-fill)` blobs on an ink image.
pub fn count_redaction_blobs(ink: &GrayImage, params: &ReaderParams) -> (usize, usize) {
    let binary = binarize(ink, params.preprocess.binary_threshold);
    find_blobs(&binary, &params.blobs)
        .iter()
        .fold((0, 0), |(lines, fills), blob| match classify(blob, &params.blobs) {
            BlobKind::Underline => (lines + 1, fills),
            BlobKind::BoxFill => (lines, fills + 1),
            BlobKind::TableCell | BlobKind::Noise => (lines, fills),
        })
}

/// Pick the method matching the more frequent redaction style.
pub fn choose_method(underlines: usize, fills: usize) -> AnonymizationMethod {
    match (underlines, fills) {
        (0, 0) => AnonymizationMethod::None,
        (u, f) if u > f => AnonymizationMethod::Underline,
        _ => AnonymizationMethod::Box,
    }
}

/// Reads anonymized pages with one OCR engine and one set of parameters.
pub struct Reader<E> {
    params: ReaderParams,
    logo: Option<LogoTemplate>,
    engine: E,
    threads: usize,
}

impl<E: OcrEngine> Reader<E> {
    /// Validate parameters and load the logo template, if one is configured.
    pub fn new(engine: E, params: ReaderParams) -> Result<Self> {
        params.validate()?;
        let logo = params
            .preprocess
            .logo
            .as_ref()
            .map(LogoTemplate::load)
            .transpose()?;
        Ok(Self {
            params,
            logo,
            engine,
            threads: default_thread_count(),
        })
    }

    /// Use an already built logo template.
    pub fn with_logo(mut self, logo: LogoTemplate) -> Self {
        self.logo = Some(logo);
        self
    }

    /// Number of worker threads for [`Reader::read_document`].
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn params(&self) -> &ReaderParams {
        &self.params
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The cleaned ink image of a page.
    pub fn ink_image(&self, page: &Page) -> GrayImage {
        preprocess(page, &self.params.preprocess, self.logo.as_ref())
    }

    /// Guess the anonymization method of a single page.
    pub fn detect_page_method(&self, page: &Page) -> AnonymizationMethod {
        let (underlines, fills) = self.page_blob_counts(page);
        choose_method(underlines, fills)
    }

    /// Guess the anonymization method of a document from all its pages.
    pub fn detect_method(&self, pages: &[Page]) -> AnonymizationMethod {
        let (underlines, fills) = pages
            .par_iter()
            .map(|page| self.page_blob_counts(page))
            .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1));
        let method = choose_method(underlines, fills);
        info!(underlines, fills, %method, "detected anonymization method");
        method
    }

    fn page_blob_counts(&self, page: &Page) -> (usize, usize) {
        let mut ink = self.ink_image(page);
        let threshold = self.params.preprocess.binary_threshold;
        let tables: Vec<Rect> = find_grids(&ink, threshold, &self.params.table)
            .iter()
            .map(|g| g.rect)
            .collect();
        mask_regions(&mut ink, &[], &[], &tables);
        count_redaction_blobs(&ink, &self.params)
    }

    /// Reconstruct the text of one page.
    ///
    /// `AnonymizationMethod::None` fails with [`ReaderError::Bypassed`]:
    /// such pages are read by the external text extractor instead.
    pub fn read_page(&self, page: &Page, method: AnonymizationMethod) -> Result<PageResult> {
        if method == AnonymizationMethod::None {
            return Err(ReaderError::Bypassed);
        }
        let params = &self.params;
        let threshold = params.preprocess.binary_threshold;

        let ink = self.ink_image(page);
        let grids = find_grids(&ink, threshold, &params.table);
        let table_rects: Vec<Rect> = grids.iter().map(|g| g.rect).collect();

        let mut work = ink.clone();
        mask_regions(&mut work, &[], &[], &table_rects);
        let detection = find_anonymized_boxes(&work, method, params);

        let engine: &dyn OcrEngine = &self.engine;
        let (anonymized, tables) = rayon::join(
            || {
                detection
                    .boxes
                    .par_iter()
                    .map(|b| {
                        let text =
                            read_anonymized_box(&work, b, engine, &params.region, threshold)?;
                        Ok(TextBox::with_text(b.rect, b.origin, text))
                    })
                    .collect::<Result<Vec<_>>>()
            },
            || {
                grids
                    .iter()
                    .map(|g| read_grid(&ink, g, threshold, &params.table, Some(engine)))
                    .collect::<Result<Vec<_>>>()
            },
        );
        let anonymized = anonymized?;
        let tables = tables?;

        mask_regions(&mut work, &detection.covered, &detection.underlines, &[]);
        let words = self.engine.read_words(&work, threshold, &params.prose)?;

        let mut boxes = Vec::with_capacity(words.len() + anonymized.len());
        boxes.extend(words.iter().cloned());
        boxes.extend(anonymized.iter().cloned());
        let text = assemble_page_text(
            &boxes,
            &tables,
            page.width(),
            page.height(),
            &params.assemble,
        );

        info!(
            page = page.index(),
            words = words.len(),
            anonymized = anonymized.len(),
            tables = tables.len(),
            "page read"
        );
        Ok(PageResult {
            index: page.index(),
            width: page.width(),
            height: page.height(),
            text,
            anonymized,
            tables,
            words: words.len(),
        })
    }

    /// Reconstruct every page of a document, pages in parallel.
    ///
    /// Results come back in page-index order regardless of scheduling.
    pub fn read_document(
        &self,
        pages: &[Page],
        method: AnonymizationMethod,
    ) -> Result<DocumentResult> {
        if method == AnonymizationMethod::None {
            return Err(ReaderError::Bypassed);
        }
        let start = Instant::now();
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
            .map_err(|e| ReaderError::ThreadPool(e.to_string()))?;

        let mut results: Vec<(usize, Result<PageResult>)> = pool.install(|| {
            pages
                .par_iter()
                .map(|page| (page.index(), self.read_page(page, method)))
                .collect()
        });
        results.sort_by_key(|(idx, _)| *idx);

        let pages = results
            .into_iter()
            .map(|(_, result)| result)
            .collect::<Result<Vec<_>>>()?;
        Ok(DocumentResult::from_pages(
            method,
            pages,
            start.elapsed().as_millis() as u64,
        ))
    }
}
