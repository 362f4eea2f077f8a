//! Grid construction from crossing lines.
//!
//! Lines that cross (directly or through other lines) form one candidate
//! grid. Row and column edges are the tolerance-clustered line positions, so
//! a grid with `r + 1` horizontal edges and `c + 1` vertical edges has shape
//! `(r, c)`.

use itertools::Itertools;
use tracing::debug;

use super::lines::{Line, Orientation};
use crate::geometry::{Rect, cluster_centers, connected_groups};
use crate::params::TableParams;

/// A ruled grid of cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    pub rect: Rect,
    /// Row edges, top to bottom.
    pub rows: Vec<u32>,
    /// Column edges, left to right.
    pub cols: Vec<u32>,
}

impl Grid {
    /// `(rows, cols)` of cells.
    pub fn shape(&self) -> (usize, usize) {
        (
            self.rows.len().saturating_sub(1),
            self.cols.len().saturating_sub(1),
        )
    }

    /// Cell rectangles in row-major order, edge to edge.
    pub fn cells(&self) -> Vec<Vec<Rect>> {
        self.rows
            .iter()
            .tuple_windows()
            .map(|(&top, &bottom)| {
                self.cols
                    .iter()
                    .tuple_windows()
                    .map(|(&left, &right)| Rect::new(top, left, bottom, right))
                    .collect()
            })
            .collect()
    }
}

/// Number of horizontal/vertical line pairs that cross.
pub fn count_crossings(lines: &[Line], tolerance: u32) -> usize {
    let (horizontal, vertical): (Vec<&Line>, Vec<&Line>) = lines
        .iter()
        .partition(|l| l.orientation == Orientation::Horizontal);
    horizontal
        .iter()
        .cartesian_product(vertical.iter())
        .filter(|(h, v)| h.crosses(v, tolerance))
        .count()
}

/// Group crossing lines into grids.
///
/// A group needs at least two distinct row edges, two distinct column edges
/// and four crossings to close a single cell.
pub fn build_grids(lines: &[Line], params: &TableParams) -> Vec<Grid> {
    let rects: Vec<Rect> = lines.iter().map(|l| l.rect).collect();
    let tolerance = params.intersection_tolerance;
    let groups = connected_groups(&rects, |a, b| {
        a.expand(tolerance, u32::MAX, u32::MAX).intersects(b)
    });

    let mut grids = Vec::new();
    for group in groups {
        let members: Vec<Line> = group.iter().map(|&i| lines[i]).collect();
        let crossings = count_crossings(&members, tolerance);
        if crossings < 4 {
            continue;
        }

        let positions = |orientation| {
            members
                .iter()
                .filter(|l| l.orientation == orientation)
                .map(Line::position)
                .collect::<Vec<_>>()
        };
        let rows = cluster_centers(positions(Orientation::Horizontal), params.snap_tolerance);
        let cols = cluster_centers(positions(Orientation::Vertical), params.snap_tolerance);
        if rows.len() < 2 || cols.len() < 2 {
            continue;
        }

        let Some(rect) = members.iter().map(|l| l.rect).reduce(|a, b| a.union(&b)) else {
            continue;
        };
        debug!(?rect, crossings, rows = rows.len() - 1, cols = cols.len() - 1, "grid");
        grids.push(Grid { rect, rows, cols });
    }
    grids.sort_by_key(|g| g.rect);
    grids
}
