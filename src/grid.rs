//! The learned grid index: a static, histogram-calibrated spatial index
//! over fixed-arity integer points.
//!
//! The first `k - 1` axes partition space into equi-count cells via
//! per-axis quantile scales; the last axis is kept sorted within each
//! cell and searched with an interpolation-seeded binary search. A point
//! is addressed globally as `(cell_idx << cell_shift) | intra_cell_idx`.

use std::sync::Arc;

use arrow_array::{Array, FixedSizeListArray, Int64Array, cast::AsArray, types::Int64Type};
use arrow_buffer::ScalarBuffer;
use arrow_schema::{DataType, Field};

use crate::{
    alloc::{BufferAllocator, Reservation},
    error::{Error, Result},
    histogram::Histogram,
};

/// Build-time options for [`SimpleGrid`].
#[derive(Clone, Copy, Debug)]
pub struct GridOptions {
    /// Centroid budget of each axis-calibration histogram.
    pub max_histogram_bins: usize,
    /// Target points per cell; must be a power of two.
    pub cell_size: usize,
}

impl Default for GridOptions {
    fn default() -> GridOptions {
        GridOptions {
            max_histogram_bins: 128,
            cell_size: 1024,
        }
    }
}

/// A finite, re-visitable source of k-dimensional integer points.
pub trait PointSource {
    /// The arity `k` of every point.
    fn arity(&self) -> usize;

    /// Call `visitor` once per point, in a stable order.
    fn visit(&self, visitor: &mut dyn FnMut(&[i64]));
}

impl<const K: usize> PointSource for [[i64; K]] {
    fn arity(&self) -> usize {
        K
    }

    fn visit(&self, visitor: &mut dyn FnMut(&[i64])) {
        for point in self {
            visitor(point);
        }
    }
}

/// A flat row-major `i64` buffer viewed as points of a given arity.
#[derive(Clone, Copy, Debug)]
pub struct FlatPoints<'a> {
    arity: usize,
    values: &'a [i64],
}

impl<'a> FlatPoints<'a> {
    /// View `values` as `values.len() / arity` points.
    ///
    /// # Errors
    /// Returns [`Error::InvalidOptions`] when `arity` is zero or does not
    /// divide the buffer length.
    pub fn new(arity: usize, values: &'a [i64]) -> Result<FlatPoints<'a>> {
        if arity == 0 || values.len() % arity != 0 {
            return Err(Error::InvalidOptions {
                message: format!(
                    "flat point buffer of {} values is not a multiple of arity {arity}",
                    values.len()
                ),
            });
        }
        Ok(FlatPoints { arity, values })
    }
}

impl PointSource for FlatPoints<'_> {
    fn arity(&self) -> usize {
        self.arity
    }

    fn visit(&self, visitor: &mut dyn FnMut(&[i64])) {
        for point in self.values.chunks_exact(self.arity) {
            visitor(point);
        }
    }
}

// One populated cell: k-tuples sealed as a fixed-size list, sorted
// ascending on the last axis, plus the interpolation coefficients for
// that axis.
#[derive(Debug)]
pub(crate) struct GridCell {
    points: FixedSizeListArray,
    pub(crate) slope: f64,
    pub(crate) base: f64,
}

impl GridCell {
    /// Row count of this cell.
    pub(crate) fn len(&self) -> usize {
        self.points.len()
    }

    /// The flat row-major coordinates of this cell.
    pub(crate) fn coords(&self) -> &[i64] {
        self.points.values().as_primitive::<Int64Type>().values()
    }
}

/// A sealed spatial index over `total` k-dimensional integer points.
#[derive(Debug)]
pub struct SimpleGrid {
    pub(crate) k: usize,
    pub(crate) cells_per_dimension: usize,
    pub(crate) axis_shift: u32,
    pub(crate) cell_shift: u32,
    // Quantile upper bounds for each of the first k-1 axes.
    pub(crate) scales: Vec<Vec<f64>>,
    pub(crate) mins: Vec<i64>,
    pub(crate) maxs: Vec<i64>,
    pub(crate) cells: Vec<Option<GridCell>>,
    pub(crate) total: usize,
    _reservation: Reservation,
}

impl SimpleGrid {
    /// Build a sealed grid from `source`, calibrating cell boundaries
    /// with per-axis streaming histograms.
    ///
    /// # Errors
    /// Returns [`Error::InvalidOptions`] for `arity < 2`, a zero
    /// histogram budget, or a `cell_size` that is not a power of two;
    /// [`Error::AllocationFailed`] when the point stores cannot be
    /// admitted.
    pub fn build<P: PointSource + ?Sized>(
        allocator: &BufferAllocator,
        source: &P,
        options: &GridOptions,
    ) -> Result<SimpleGrid> {
        let k = source.arity();
        if k < 2 {
            return Err(Error::InvalidOptions {
                message: format!("grid arity must be at least 2, got {k}"),
            });
        }
        if !options.cell_size.is_power_of_two() {
            return Err(Error::InvalidOptions {
                message: format!("cell size {} is not a power of two", options.cell_size),
            });
        }
        if options.max_histogram_bins == 0 {
            return Err(Error::InvalidOptions {
                message: "histogram bin budget must be positive".to_string(),
            });
        }

        let mut histograms: Vec<Histogram> = (0..k)
            .map(|_| Histogram::new(options.max_histogram_bins))
            .collect();
        let mut total = 0usize;
        source.visit(&mut |point| {
            debug_assert_eq!(point.len(), k);
            for (histogram, &coordinate) in histograms.iter_mut().zip(point) {
                histogram.update(coordinate as f64);
            }
            total += 1;
        });

        let cell_shift = (options.cell_size << 12).trailing_zeros();
        if total == 0 {
            return Ok(SimpleGrid {
                k,
                cells_per_dimension: 1,
                axis_shift: 0,
                cell_shift,
                scales: vec![Vec::new(); k - 1],
                mins: vec![0; k],
                maxs: vec![0; k],
                cells: vec![None],
                total: 0,
                _reservation: allocator.reserve(0)?,
            });
        }

        let target_cells = total.div_ceil(options.cell_size).max(1);
        let per_dimension = (target_cells as f64)
            .powf(1.0 / (k - 1) as f64)
            .ceil() as usize;
        let cells_per_dimension = per_dimension.next_power_of_two().max(1);
        let number_of_cells = cells_per_dimension.pow((k - 1) as u32);
        let axis_shift = cells_per_dimension.trailing_zeros();

        let scales: Vec<Vec<f64>> = histograms[..k - 1]
            .iter()
            .map(|h| h.uniform(cells_per_dimension))
            .collect();
        let mins: Vec<i64> = histograms.iter().map(|h| h.min().floor() as i64).collect();
        let maxs: Vec<i64> = histograms.iter().map(|h| h.max().ceil() as i64).collect();

        let mut reservation = allocator.reserve(0)?;
        reservation.grow(total * k * std::mem::size_of::<i64>())?;

        let mut stores: Vec<Option<Vec<i64>>> = Vec::new();
        stores.resize_with(number_of_cells, || None);
        source.visit(&mut |point| {
            let mut cell_index = 0usize;
            for axis in (0..k - 1).rev() {
                cell_index =
                    (cell_index << axis_shift) | axis_bucket(&scales[axis], point[axis]);
            }
            stores[cell_index]
                .get_or_insert_with(Vec::new)
                .extend_from_slice(point);
        });

        let last_extent = (maxs[k - 1] - mins[k - 1]) as f64;
        let cells = stores
            .into_iter()
            .map(|store| {
                store.map(|mut coordinates| {
                    sort_by_last_axis(&mut coordinates, k);
                    let rows = coordinates.len() / k;
                    let slope = if last_extent == 0.0 {
                        0.0
                    } else {
                        rows as f64 / last_extent
                    };
                    seal_cell(k, coordinates, slope, -slope * mins[k - 1] as f64)
                })
            })
            .collect();

        tracing::debug!(
            total,
            k,
            cells_per_dimension,
            number_of_cells,
            axis_shift,
            cell_shift,
            "calibrated grid"
        );
        Ok(SimpleGrid {
            k,
            cells_per_dimension,
            axis_shift,
            cell_shift,
            scales,
            mins,
            maxs,
            cells,
            total,
            _reservation: reservation,
        })
    }

    /// The arity of every indexed point.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Points indexed by this grid.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Cells along each of the first `k - 1` axes (a power of two).
    #[must_use]
    pub fn cells_per_dimension(&self) -> usize {
        self.cells_per_dimension
    }

    /// Width in bits of the intra-cell part of a global index.
    #[must_use]
    pub fn cell_shift(&self) -> u32 {
        self.cell_shift
    }

    /// Number of addressable cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// The flat row-major coordinates of cell `cell_index`, sorted
    /// ascending on the last axis; `None` for an empty cell.
    #[must_use]
    pub fn cell_points(&self, cell_index: usize) -> Option<&[i64]> {
        self.cells[cell_index].as_ref().map(GridCell::coords)
    }

    /// The point addressed by `global_index`, as a borrowed k-slice.
    ///
    /// # Panics
    /// Panics when the index does not address a populated row.
    #[must_use]
    pub fn get_point(&self, global_index: i64) -> &[i64] {
        let cell_index = (global_index >> self.cell_shift) as usize;
        let row = (global_index & ((1_i64 << self.cell_shift) - 1)) as usize;
        let cell = self.cells[cell_index]
            .as_ref()
            .expect("global index addresses a populated cell");
        &cell.coords()[row * self.k..(row + 1) * self.k]
    }

    /// All global indices, in ascending cell order, ascending within each
    /// cell.
    pub fn points(&self) -> impl Iterator<Item = i64> + '_ {
        let shift = self.cell_shift;
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(cell_index, cell)| cell.as_ref().map(|c| (cell_index, c)))
            .flat_map(move |(cell_index, cell)| {
                let head = (cell_index as i64) << shift;
                (0..cell.len() as i64).map(move |row| head | row)
            })
    }

    /// The grid is sealed at build time.
    ///
    /// # Errors
    /// Always returns [`Error::OperationNotSupported`].
    pub fn insert(&mut self, _point: &[i64]) -> Result<()> {
        Err(Error::OperationNotSupported {
            operation: "grid insert",
        })
    }

    /// The grid is sealed at build time.
    ///
    /// # Errors
    /// Always returns [`Error::OperationNotSupported`].
    pub fn delete(&mut self, _point: &[i64]) -> Result<()> {
        Err(Error::OperationNotSupported {
            operation: "grid delete",
        })
    }
}

impl PointSource for SimpleGrid {
    fn arity(&self) -> usize {
        self.k
    }

    fn visit(&self, visitor: &mut dyn FnMut(&[i64])) {
        for cell in self.cells.iter().flatten() {
            for point in cell.coords().chunks_exact(self.k) {
                visitor(point);
            }
        }
    }
}

/// The axis bucket of `value`: its insertion position in the sorted
/// scale, clamped into the addressable range.
pub(crate) fn axis_bucket(scale: &[f64], value: i64) -> usize {
    let value = value as f64;
    scale
        .partition_point(|&upper_bound| upper_bound < value)
        .min(scale.len() - 1)
}

fn seal_cell(k: usize, coordinates: Vec<i64>, slope: f64, base: f64) -> GridCell {
    let values = Int64Array::new(ScalarBuffer::from(coordinates), None);
    let field = Arc::new(Field::new("item", DataType::Int64, false));
    GridCell {
        points: FixedSizeListArray::new(field, k as i32, Arc::new(values), None),
        slope,
        base,
    }
}

// Three-way (Dutch-flag) quicksort of k-wide rows on the last axis,
// recursing into the smaller partition and looping on the larger.
fn sort_by_last_axis(coordinates: &mut [i64], k: usize) {
    let rows = coordinates.len() / k;
    sort_rows(coordinates, k, 0, rows);
}

fn sort_rows(coordinates: &mut [i64], k: usize, mut low: usize, mut high: usize) {
    while high - low > 1 {
        let pivot = coordinates[((low + high) / 2) * k + k - 1];
        let mut below = low;
        let mut above = high;
        let mut row = low;
        while row < above {
            let coordinate = coordinates[row * k + k - 1];
            if coordinate < pivot {
                swap_rows(coordinates, k, below, row);
                below += 1;
                row += 1;
            } else if coordinate > pivot {
                above -= 1;
                swap_rows(coordinates, k, row, above);
            } else {
                row += 1;
            }
        }
        if below - low < high - above {
            sort_rows(coordinates, k, low, below);
            low = above;
        } else {
            sort_rows(coordinates, k, above, high);
            high = below;
        }
    }
}

fn swap_rows(coordinates: &mut [i64], k: usize, a: usize, b: usize) {
    if a != b {
        for offset in 0..k {
            coordinates.swap(a * k + offset, b * k + offset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dutch_flag_sort_orders_rows_on_last_axis() {
        let mut coordinates = vec![9, 3, 1, 7, 5, 5, 2, 1, 8, 2, 0, 3];
        sort_by_last_axis(&mut coordinates, 2);
        let keys: Vec<i64> = coordinates.chunks_exact(2).map(|row| row[1]).collect();
        assert_eq!(keys, vec![1, 2, 3, 3, 5, 7]);
        assert_eq!(&coordinates[0..2], &[2, 1]);
        assert_eq!(&coordinates[10..12], &[1, 7]);
    }

    #[test]
    fn sort_keeps_rows_intact() {
        let mut coordinates = vec![10, 30, 11, 20, 12, 10];
        sort_by_last_axis(&mut coordinates, 2);
        assert_eq!(coordinates, vec![12, 10, 11, 20, 10, 30]);
    }

    #[test]
    fn axis_bucket_clamps_to_last_scale_entry() {
        let scale = [2.0, 5.0, 9.0, 9.0];
        assert_eq!(axis_bucket(&scale, 1), 0);
        assert_eq!(axis_bucket(&scale, 2), 0);
        assert_eq!(axis_bucket(&scale, 3), 1);
        assert_eq!(axis_bucket(&scale, 9), 2);
        assert_eq!(axis_bucket(&scale, 50), 3);
    }
}
