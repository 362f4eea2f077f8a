//! Reading-order assembly of page text.
//!
//! Words and anonymized spans are grouped into visual rows with a tolerance
//! band on their top edge, then rows and tables are laid out top to bottom.

use tracing::debug;

use crate::geometry::{Rect, cluster_by};
use crate::model::{Table, TextBox};
use crate::params::AssembleParams;

/// One laid-out block: a row of words or a whole table.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Block {
    rect: Rect,
    text: String,
    is_table: bool,
}

/// Group boxes into rows, each sorted left to right.
pub fn group_rows<'a>(boxes: Vec<&'a TextBox>, row_tolerance: u32) -> Vec<Vec<&'a TextBox>> {
    let mut rows = cluster_by(boxes, |b| b.rect.top, row_tolerance);
    for row in &mut rows {
        row.sort_by_key(|b| (b.rect.left, b.rect.top));
    }
    rows
}

fn row_block(row: &[&TextBox]) -> Option<Block> {
    let rect = row.iter().map(|b| b.rect).reduce(|a, b| a.union(&b))?;
    let text = row.iter().map(|b| b.text()).collect::<Vec<_>>().join(" ");
    Some(Block {
        rect,
        text,
        is_table: false,
    })
}

/// Assemble the text of one page.
///
/// Boxes without text, outside the page, or overlapping a table are skipped.
/// Rows are joined with a newline, or a blank line across a gap wider than
/// `paragraph_gap`. A narrow last row in the footer band, further than
/// `isolated_row_gap` below the rest of the page, is a page number or stamp
/// and is left out.
pub fn assemble_page_text(
    boxes: &[TextBox],
    tables: &[Table],
    width: u32,
    height: u32,
    params: &AssembleParams,
) -> String {
    let words: Vec<&TextBox> = boxes
        .iter()
        .filter(|b| !b.text().is_empty())
        .filter(|b| b.rect.fits_within(width, height))
        .filter(|b| !tables.iter().any(|t| t.rect.intersects(&b.rect)))
        .collect();

    let mut blocks: Vec<Block> = group_rows(words, params.row_tolerance)
        .iter()
        .filter_map(|row| row_block(row))
        .collect();
    blocks.extend(
        tables
            .iter()
            .filter(|t| !t.text.is_empty())
            .map(|t| Block {
                rect: t.rect,
                text: t.text.clone(),
                is_table: true,
            }),
    );
    blocks.sort_by_key(|b| (b.rect.top, b.rect.left));

    if blocks.len() >= 2
        && let Some(last) = blocks.last()
        && !last.is_table
    {
        let above = blocks[..blocks.len() - 1]
            .iter()
            .map(|b| b.rect.bottom)
            .max()
            .unwrap_or(0);
        let footer_top = (height as f32 * params.footer_band) as u32;
        if last.rect.top.saturating_sub(above) > params.isolated_row_gap
            && last.rect.top >= footer_top
            && last.rect.width() <= params.footer_max_width
        {
            debug!(rect = ?last.rect, "dropping isolated footer row");
            blocks.pop();
        }
    }

    let mut text = String::new();
    let mut bottom: Option<u32> = None;
    for block in &blocks {
        if let Some(prev) = bottom {
            if block.rect.top.saturating_sub(prev) > params.paragraph_gap {
                text.push_str("\n\n");
            } else {
                text.push('\n');
            }
        }
        text.push_str(&block.text);
        bottom = Some(bottom.map_or(block.rect.bottom, |b| b.max(block.rect.bottom)));
    }
    text
}
