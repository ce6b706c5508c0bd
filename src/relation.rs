//! Relations: insertion-ordered named collections of columns, plus the
//! row-wise copy utilities operators are built from.

use arrow_array::RecordBatch;

use crate::{
    alloc::BufferAllocator,
    append::{AppendColumn, ColumnFactory, IndirectAppendColumn},
    error::{Error, Result},
    read::ReadColumn,
};

/// An immutable, insertion-ordered collection of read columns sharing one
/// row count.
///
/// Cloning is cheap (columns share their backing storage); the backing
/// vectors are released when the last clone drops.
#[derive(Clone, Debug)]
pub struct ReadRelation {
    columns: Vec<ReadColumn>,
    row_count: usize,
}

impl ReadRelation {
    /// Build a relation from columns, validating that they agree on a row
    /// count.
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] naming the first disagreeing
    /// column.
    pub fn try_new(columns: Vec<ReadColumn>) -> Result<ReadRelation> {
        let mut row_count = None;
        for column in &columns {
            let count = column.value_count();
            match row_count {
                None => row_count = Some(count),
                Some(expected) if expected != count => {
                    return Err(Error::ShapeMismatch {
                        column: column.name().to_string(),
                        expected,
                        got: count,
                    });
                }
                Some(_) => {}
            }
        }
        Ok(ReadRelation {
            columns,
            row_count: row_count.unwrap_or(0),
        })
    }

    /// Wrap an arrow record batch, preserving field order, each field
    /// vector as a direct (or dense-union) column.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedValueType`] for a field whose arrow
    /// type is outside the registry.
    pub fn from_batch(batch: &RecordBatch) -> Result<ReadRelation> {
        let columns = batch
            .schema()
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, vector)| ReadColumn::from_vector(field.name().as_str(), vector.clone()))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(
            columns = columns.len(),
            rows = batch.num_rows(),
            "wrapped record batch"
        );
        Ok(ReadRelation {
            columns,
            row_count: batch.num_rows(),
        })
    }

    /// The shared row count.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// The columns in insertion order.
    #[must_use]
    pub fn columns(&self) -> &[ReadColumn] {
        &self.columns
    }

    /// Look a column up by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ReadColumn> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// A relation over the named columns only, in the requested order.
    /// Cheap: the projected columns share this relation's storage.
    ///
    /// # Errors
    /// Returns [`Error::ColumnNotFound`] for a name this relation does not
    /// carry.
    pub fn project(&self, names: &[&str]) -> Result<ReadRelation> {
        let columns = names
            .iter()
            .map(|name| {
                self.column(name).cloned().ok_or_else(|| Error::ColumnNotFound {
                    name: (*name).to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ReadRelation {
            columns,
            row_count: self.row_count,
        })
    }
}

/// A mutable, insertion-ordered collection of append columns manufactured
/// by one [`ColumnFactory`].
pub struct AppendRelation {
    allocator: BufferAllocator,
    factory: ColumnFactory,
    columns: Vec<Box<dyn AppendColumn>>,
}

impl AppendRelation {
    /// An empty append relation writing through `allocator`.
    #[must_use]
    pub fn new(allocator: BufferAllocator, factory: ColumnFactory) -> AppendRelation {
        AppendRelation {
            allocator,
            factory,
            columns: Vec::new(),
        }
    }

    /// The append column named `name`, creating it through the factory on
    /// first use. This is the only way to extend the relation's schema.
    ///
    /// # Errors
    /// Returns [`Error::AllocationFailed`] when a new column cannot be
    /// admitted.
    pub fn append_column(&mut self, name: &str) -> Result<&mut dyn AppendColumn> {
        let position = match self.columns.iter().position(|c| c.name() == name) {
            Some(position) => position,
            None => {
                let column = self.factory.new_column(&self.allocator, name)?;
                self.columns.push(column);
                self.columns.len() - 1
            }
        };
        Ok(&mut *self.columns[position])
    }

    /// The columns in insertion order.
    #[must_use]
    pub fn columns(&self) -> &[Box<dyn AppendColumn>] {
        &self.columns
    }

    /// Whether no column has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Snapshot every column into a new read relation.
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] when the columns disagree on a
    /// value count.
    pub fn read(&self) -> Result<ReadRelation> {
        ReadRelation::try_new(self.columns.iter().map(|c| c.read()).collect())
    }
}

/// Materialize an indirect relation over the chosen rows: for each
/// column, an indirect append column fed `append_from(column, index)` in
/// order, so nothing is copied.
///
/// # Errors
/// Returns [`Error::RowOutOfBounds`] for an index outside the source
/// relation, or [`Error::AllocationFailed`].
pub fn select(
    relation: &ReadRelation,
    allocator: &BufferAllocator,
    indices: &[i32],
) -> Result<ReadRelation> {
    if let Some(&bad) = indices
        .iter()
        .find(|&&i| i < 0 || i as usize >= relation.row_count())
    {
        return Err(Error::RowOutOfBounds {
            index: bad.max(0) as usize,
            count: relation.row_count(),
        });
    }
    let mut columns = Vec::with_capacity(relation.columns().len());
    for column in relation.columns() {
        let mut builder = IndirectAppendColumn::new(allocator, column.name())?;
        for &index in indices {
            builder.append_from(column, index as usize)?;
        }
        columns.push(builder.read());
    }
    Ok(ReadRelation {
        columns,
        row_count: indices.len(),
    })
}

/// Append `length` rows of every source column, starting at `offset`,
/// into the same-named target column (created on demand).
///
/// # Errors
/// Returns [`Error::RowOutOfBounds`] when the range exceeds the source,
/// or any append-side error.
pub fn copy_rel_from(
    target: &mut AppendRelation,
    source: &ReadRelation,
    offset: usize,
    length: usize,
) -> Result<()> {
    let end = offset
        .checked_add(length)
        .filter(|&end| end <= source.row_count())
        .ok_or(Error::RowOutOfBounds {
            index: offset.saturating_add(length),
            count: source.row_count(),
        })?;
    for column in source.columns() {
        let out = target.append_column(column.name())?;
        for index in offset..end {
            out.append_from(column, index)?;
        }
    }
    Ok(())
}

/// Appends one source row at a time across all paired columns; used by
/// row-driven operators.
pub struct RowCopier<'a> {
    pairs: Vec<(&'a mut (dyn AppendColumn + 'a), &'a ReadColumn)>,
}

/// Pair every source column with the same-named target column (created on
/// demand) for repeated row-wise copying.
///
/// # Errors
/// Returns [`Error::AllocationFailed`] when a target column cannot be
/// admitted.
pub fn row_copier<'a>(
    target: &'a mut AppendRelation,
    source: &'a ReadRelation,
) -> Result<RowCopier<'a>> {
    for column in source.columns() {
        target.append_column(column.name())?;
    }
    let mut pairs: Vec<(&'a mut (dyn AppendColumn + 'a), &'a ReadColumn)> =
        Vec::with_capacity(source.columns().len());
    let slice: &'a mut [Box<dyn AppendColumn>] = &mut target.columns[..];
    for column in slice.iter_mut() {
        let Some(paired) = source.column(column.name()) else {
            continue;
        };
        let target_column: &'a mut (dyn AppendColumn + 'a) = &mut **column;
        pairs.push((target_column, paired));
    }
    Ok(RowCopier { pairs })
}

impl RowCopier<'_> {
    /// Append source row `index` across all paired columns.
    ///
    /// # Errors
    /// Propagates the first failing column append.
    pub fn copy_row(&mut self, index: usize) -> Result<()> {
        for (target, source) in &mut self.pairs {
            target.append_from(source, index)?;
        }
        Ok(())
    }
}
