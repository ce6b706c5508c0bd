#![deny(missing_docs)]
//! Columnar relation runtime and temporal grid index for a bitemporal,
//! append-only storage engine.
//!
//! Two subsystems live here. The relation layer provides zero-copy read
//! columns over arrow vectors (direct, index-selected, dense-union, and
//! materialized forms) paired with single-producer append columns. The
//! grid index is a static, histogram-calibrated spatial structure over
//! fixed-arity integer points, searched cell by cell on a sorted last
//! axis.
//!
//! # Quick Start
//!
//! ```
//! use tempora::{AppendRelation, BufferAllocator, ColumnFactory, Value};
//!
//! # fn main() -> tempora::Result<()> {
//! let allocator = BufferAllocator::unbounded();
//! let mut relation = AppendRelation::new(allocator, ColumnFactory::Fresh);
//! let prices = relation.append_column("price")?;
//! prices.append_long(42)?;
//! prices.append_double(2.5)?;
//!
//! let snapshot = relation.read()?;
//! assert_eq!(snapshot.row_count(), 2);
//! let prices = snapshot.column("price").unwrap();
//! assert_eq!(prices.get_object(0), Value::Long(42));
//! assert_eq!(prices.get_object(1), Value::Double(2.5));
//! # Ok(())
//! # }
//! ```

mod alloc;
mod append;
mod error;
mod grid;
mod histogram;
mod read;
mod relation;
mod search;
mod types;

pub use alloc::{BufferAllocator, Reservation};
pub use append::{
    AppendColumn, ColumnFactory, FreshAppendColumn, IndirectAppendColumn, VectorAppendColumn,
};
pub use error::{Error, Result};
pub use grid::{FlatPoints, GridOptions, PointSource, SimpleGrid};
pub use histogram::Histogram;
pub use read::ReadColumn;
pub use relation::{AppendRelation, ReadRelation, RowCopier, copy_rel_from, row_copier, select};
pub use search::RangeSearch;
pub use types::{MinorType, Value, value_at};
