//! Range search over a sealed grid.
//!
//! Search enumerates the Cartesian product of per-axis bucket ranges in
//! ascending cell order, then walks each populated cell with a binary
//! search on the sorted last axis seeded at the cell's interpolation
//! hint. Boundary cells re-check the flagged axes per row; interior
//! cells emit unfiltered.

use crate::grid::{GridCell, SimpleGrid, axis_bucket};

impl SimpleGrid {
    /// A lazy sequence of global point indices whose points fall inside
    /// the inclusive box `[min, max]`.
    ///
    /// A query extent disjoint from the grid on some axis yields an empty
    /// sequence, not an error. Within a cell indices ascend; across
    /// cells, enumeration follows ascending cell index. Dropping the
    /// iterator terminates the search early.
    ///
    /// # Panics
    /// Panics when `min` or `max` does not have arity `k`.
    #[must_use]
    pub fn range_search<'a>(&'a self, min: &[i64], max: &[i64]) -> RangeSearch<'a> {
        assert_eq!(min.len(), self.k, "range arity must match the grid");
        assert_eq!(max.len(), self.k, "range arity must match the grid");

        if self.total == 0 {
            return RangeSearch::empty(self);
        }
        let leading = self.k - 1;
        let mut low_bucket = Vec::with_capacity(leading);
        let mut high_bucket = Vec::with_capacity(leading);
        let mut low_partial = Vec::with_capacity(leading);
        let mut high_partial = Vec::with_capacity(leading);
        for axis in 0..leading {
            if min[axis] > max[axis]
                || max[axis] < self.mins[axis]
                || min[axis] > self.maxs[axis]
            {
                return RangeSearch::empty(self);
            }
            low_bucket.push(axis_bucket(&self.scales[axis], min[axis]));
            high_bucket.push(axis_bucket(&self.scales[axis], max[axis]));
            low_partial.push(min[axis] > self.mins[axis]);
            high_partial.push(max[axis] < self.maxs[axis]);
        }
        if min[leading] > max[leading]
            || max[leading] < self.mins[leading]
            || min[leading] > self.maxs[leading]
        {
            return RangeSearch::empty(self);
        }

        RangeSearch {
            grid: self,
            min: min.to_vec(),
            max: max.to_vec(),
            cursor: low_bucket.clone(),
            low_bucket,
            high_bucket,
            low_partial,
            high_partial,
            last_axis_partial: min[leading] > self.mins[leading]
                || max[leading] < self.maxs[leading],
            exhausted: false,
            cell: None,
        }
    }
}

/// Lazy iterator of global point indices produced by
/// [`SimpleGrid::range_search`].
#[derive(Clone)]
pub struct RangeSearch<'a> {
    grid: &'a SimpleGrid,
    min: Vec<i64>,
    max: Vec<i64>,
    // Inclusive bucket ranges over the leading axes, and whether each
    // endpoint bucket straddles the query boundary.
    low_bucket: Vec<usize>,
    high_bucket: Vec<usize>,
    low_partial: Vec<bool>,
    high_partial: Vec<bool>,
    last_axis_partial: bool,
    // Odometer over bucket combinations, axis 0 fastest.
    cursor: Vec<usize>,
    exhausted: bool,
    cell: Option<CellCursor<'a>>,
}

#[derive(Clone)]
struct CellCursor<'a> {
    cell: &'a GridCell,
    head: i64,
    mask: u64,
    next: usize,
    end: usize,
}

impl<'a> RangeSearch<'a> {
    fn empty(grid: &'a SimpleGrid) -> RangeSearch<'a> {
        RangeSearch {
            grid,
            min: Vec::new(),
            max: Vec::new(),
            low_bucket: Vec::new(),
            high_bucket: Vec::new(),
            low_partial: Vec::new(),
            high_partial: Vec::new(),
            last_axis_partial: false,
            cursor: Vec::new(),
            exhausted: true,
            cell: None,
        }
    }

    // Step the odometer to the next bucket combination, returning the
    // current cell index and its boundary mask.
    fn advance_cell(&mut self) -> (usize, u64) {
        let mut cell_index = 0usize;
        for axis in (0..self.cursor.len()).rev() {
            cell_index = (cell_index << self.grid.axis_shift) | self.cursor[axis];
        }
        let mut mask = 0u64;
        for axis in 0..self.cursor.len() {
            let at_low = self.cursor[axis] == self.low_bucket[axis] && self.low_partial[axis];
            let at_high = self.cursor[axis] == self.high_bucket[axis] && self.high_partial[axis];
            if at_low || at_high {
                mask |= 1 << axis;
            }
        }
        let mut axis = 0;
        loop {
            if axis == self.cursor.len() {
                self.exhausted = true;
                break;
            }
            if self.cursor[axis] < self.high_bucket[axis] {
                self.cursor[axis] += 1;
                break;
            }
            self.cursor[axis] = self.low_bucket[axis];
            axis += 1;
        }
        (cell_index, mask)
    }
}

impl Iterator for RangeSearch<'_> {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        loop {
            if let Some(cursor) = self.cell.as_mut() {
                let k = self.grid.k;
                let coords = cursor.cell.coords();
                while cursor.next < cursor.end {
                    let row = cursor.next;
                    cursor.next += 1;
                    let mut keep = true;
                    let mut mask = cursor.mask;
                    while mask != 0 {
                        let axis = mask.trailing_zeros() as usize;
                        mask &= mask - 1;
                        let coordinate = coords[row * k + axis];
                        if coordinate < self.min[axis] || coordinate > self.max[axis] {
                            keep = false;
                            break;
                        }
                    }
                    if keep {
                        return Some(cursor.head | row as i64);
                    }
                }
                self.cell = None;
            }
            if self.exhausted {
                return None;
            }
            let (cell_index, mask) = self.advance_cell();
            let Some(cell) = self.grid.cells[cell_index].as_ref() else {
                continue;
            };
            let (start, end) = if self.last_axis_partial {
                let last = self.grid.k - 1;
                (
                    lower_bound(cell, self.grid.k, self.min[last]),
                    upper_bound(cell, self.grid.k, self.max[last]),
                )
            } else {
                (0, cell.len())
            };
            if start < end {
                self.cell = Some(CellCursor {
                    cell,
                    head: (cell_index as i64) << self.grid.cell_shift,
                    mask,
                    next: start,
                    end,
                });
            }
        }
    }
}

// First row whose last-axis coordinate is >= target, seeded at the
// cell's interpolation hint and narrowed conventionally.
fn lower_bound(cell: &GridCell, k: usize, target: i64) -> usize {
    let coords = cell.coords();
    let rows = cell.len();
    let mut low = 0usize;
    let mut high = rows;
    let mut probe = hint(cell, rows, target);
    while low < high {
        if coords[probe * k + k - 1] < target {
            low = probe + 1;
        } else {
            high = probe;
        }
        probe = low + (high - low) / 2;
    }
    low
}

// One past the last row whose last-axis coordinate is <= target.
fn upper_bound(cell: &GridCell, k: usize, target: i64) -> usize {
    let coords = cell.coords();
    let rows = cell.len();
    let mut low = 0usize;
    let mut high = rows;
    let mut probe = hint(cell, rows, target);
    while low < high {
        if coords[probe * k + k - 1] <= target {
            low = probe + 1;
        } else {
            high = probe;
        }
        probe = low + (high - low) / 2;
    }
    low
}

fn hint(cell: &GridCell, rows: usize, target: i64) -> usize {
    let estimate = cell.slope * target as f64 + cell.base;
    (estimate as i64).clamp(0, rows as i64 - 1) as usize
}
