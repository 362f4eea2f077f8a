//! Pixel-space rectangles and tolerance clustering.
//!
//! All coordinates are page pixels with the origin in the top-left corner.
//! A [`Rect`] is half-open: `bottom` and `right` are exclusive, matching how
//! rows and columns are sliced out of an image buffer.

use serde::Serialize;

/// An axis-aligned pixel rectangle `(top, left, bottom, right)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Rect {
    pub top: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
}

impl Rect {
    pub const fn new(top: u32, left: u32, bottom: u32, right: u32) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    /// Build a rectangle, returning `None` when it has no area.
    pub fn non_empty(top: u32, left: u32, bottom: u32, right: u32) -> Option<Self> {
        let rect = Self::new(top, left, bottom, right);
        (!rect.is_empty()).then_some(rect)
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bottom <= self.top || self.right <= self.left
    }

    pub fn center_row(&self) -> f64 {
        (self.top as f64 + self.bottom as f64) / 2.0
    }

    /// True when the rectangle lies entirely inside a `width` x `height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right <= width && self.bottom <= height
    }

    pub fn contains(&self, other: &Rect) -> bool {
        self.top <= other.top
            && self.left <= other.left
            && self.bottom >= other.bottom
            && self.right >= other.right
    }

    /// Overlapping region of two rectangles, if any.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        Rect::non_empty(
            self.top.max(other.top),
            self.left.max(other.left),
            self.bottom.min(other.bottom),
            self.right.min(other.right),
        )
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection(other).is_some()
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.top.min(other.top),
            self.left.min(other.left),
            self.bottom.max(other.bottom),
            self.right.max(other.right),
        )
    }

    /// Intersection-over-union; 0.0 for disjoint rectangles.
    pub fn iou(&self, other: &Rect) -> f64 {
        let Some(inter) = self.intersection(other) else {
            return 0.0;
        };
        let inter = inter.area() as f64;
        let union = self.area() as f64 + other.area() as f64 - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }

    /// Grow by `margin` on every side, clamped to a `width` x `height` image.
    pub fn expand(&self, margin: u32, width: u32, height: u32) -> Rect {
        Rect::new(
            self.top.saturating_sub(margin),
            self.left.saturating_sub(margin),
            self.bottom.saturating_add(margin).min(height),
            self.right.saturating_add(margin).min(width),
        )
    }

    /// Shrink by `margin` on every side, or `None` if nothing is left.
    pub fn shrink(&self, margin: u32) -> Option<Rect> {
        Rect::non_empty(
            self.top.saturating_add(margin),
            self.left.saturating_add(margin),
            self.bottom.saturating_sub(margin),
            self.right.saturating_sub(margin),
        )
    }

    /// Clamp to a `width` x `height` image.
    pub fn clamp(&self, width: u32, height: u32) -> Rect {
        Rect::new(
            self.top.min(height),
            self.left.min(width),
            self.bottom.min(height),
            self.right.min(width),
        )
    }

    /// Translate a rectangle expressed relative to `origin` back into page space.
    pub fn offset(&self, origin: &Rect) -> Rect {
        Rect::new(
            self.top + origin.top,
            self.left + origin.left,
            self.bottom + origin.top,
            self.right + origin.left,
        )
    }
}

/// Cluster sorted values where each value is within `tolerance` of the previous one.
pub fn cluster_list(mut xs: Vec<u32>, tolerance: u32) -> Vec<Vec<u32>> {
    xs.sort_unstable();
    let mut groups: Vec<Vec<u32>> = Vec::new();
    let mut current: Vec<u32> = Vec::new();
    for x in xs {
        match current.last().copied() {
            Some(last) if x <= last + tolerance => current.push(x),
            Some(_) => groups.push(std::mem::replace(&mut current, vec![x])),
            None => current.push(x),
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

/// Cluster objects on a key with a single tolerance band.
///
/// Objects are sorted by key; a new cluster starts whenever the gap to the
/// previous key exceeds `tolerance`. Objects keep their sorted order inside
/// each cluster.
pub fn cluster_by<T, F>(mut items: Vec<T>, key_fn: F, tolerance: u32) -> Vec<Vec<T>>
where
    F: Fn(&T) -> u32,
{
    items.sort_by_key(|item| key_fn(item));
    let mut groups: Vec<Vec<T>> = Vec::new();
    let mut last_key: Option<u32> = None;
    for item in items {
        let key = key_fn(&item);
        let joins = matches!(last_key, Some(last) if key <= last + tolerance);
        if joins && let Some(group) = groups.last_mut() {
            group.push(item);
        } else {
            groups.push(vec![item]);
        }
        last_key = Some(key);
    }
    groups
}

/// Mean of each tolerance cluster, rounded to the nearest pixel.
pub fn cluster_centers(xs: Vec<u32>, tolerance: u32) -> Vec<u32> {
    cluster_list(xs, tolerance)
        .into_iter()
        .map(|group| {
            let sum: u64 = group.iter().map(|&x| x as u64).sum();
            ((sum as f64) / (group.len() as f64)).round() as u32
        })
        .collect()
}

/// Group rectangles into connected sets where each member intersects another.
pub fn connected_groups(
    rects: &[Rect],
    connects: impl Fn(&Rect, &Rect) -> bool,
) -> Vec<Vec<usize>> {
    let mut visited = vec![false; rects.len()];
    let mut groups = Vec::new();
    for start in 0..rects.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut queue = vec![start];
        let mut group = Vec::new();
        while let Some(idx) = queue.pop() {
            group.push(idx);
            for (other, seen) in visited.iter_mut().enumerate() {
                if !*seen && connects(&rects[idx], &rects[other]) {
                    *seen = true;
                    queue.push(other);
                }
            }
        }
        group.sort_unstable();
        groups.push(group);
    }
    groups
}
