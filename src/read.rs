//! Read-only columns: zero-copy views over arrow vectors.
//!
//! A read column unifies four physical layouts (plus the materialized
//! form) behind one contract. All variants share their backing storage
//! through reference counts; `rename` and `clone` never copy data, and
//! the backing vectors are released when the last view drops.

use std::{collections::BTreeSet, sync::Arc};

use arrow_array::{
    Array, ArrayRef, UnionArray,
    cast::AsArray,
    types::{DurationMillisecondType, Float64Type, Int8Type, Int64Type, TimestampMillisecondType},
};
use arrow_schema::{DataType, UnionMode};

use crate::{
    error::{Error, Result},
    types::{MinorType, Value, slot_is_null, value_at},
};

/// A logical, read-only, named sequence of values.
#[derive(Clone, Debug)]
pub struct ReadColumn {
    name: Arc<str>,
    repr: Repr,
}

#[derive(Clone, Debug)]
enum Repr {
    /// One vector, rows 1:1.
    Direct { vector: ArrayRef, minor: MinorType },
    /// One vector read through an i32 selection.
    Indirect {
        vector: ArrayRef,
        minor: MinorType,
        indices: Arc<[i32]>,
    },
    /// A dense tagged-union vector.
    DenseUnion { vector: UnionArray },
    /// A dense union read through an i32 selection.
    IndirectDenseUnion {
        vector: UnionArray,
        indices: Arc<[i32]>,
    },
    /// One (vector, row) pair per logical row.
    Materialized {
        minor_types: Arc<BTreeSet<MinorType>>,
        vectors: Arc<[ArrayRef]>,
        indices: Arc<[usize]>,
    },
}

impl ReadColumn {
    /// Wrap a vector 1:1 as a direct column, or as a dense-union column
    /// when the vector is a dense union.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedValueType`] for sparse unions and for
    /// vectors (or union children) whose arrow type is outside the
    /// registry.
    pub fn from_vector(name: impl Into<Arc<str>>, vector: ArrayRef) -> Result<ReadColumn> {
        let repr = match vector.data_type() {
            DataType::Union(_, UnionMode::Dense) => Repr::DenseUnion {
                vector: dense_union(&vector)?,
            },
            DataType::Union(_, UnionMode::Sparse) => {
                return Err(unregistered("sparse union vector", &vector));
            }
            _ => {
                let minor = MinorType::from_arrow(vector.data_type())
                    .ok_or_else(|| unregistered("vector", &vector))?;
                Repr::Direct { vector, minor }
            }
        };
        Ok(ReadColumn {
            name: name.into(),
            repr,
        })
    }

    /// Wrap a vector read through `indices` as an indirect column (or
    /// indirect dense-union column).
    ///
    /// # Errors
    /// Same registry validation as [`ReadColumn::from_vector`].
    pub fn from_vector_with_indices(
        name: impl Into<Arc<str>>,
        vector: ArrayRef,
        indices: impl Into<Arc<[i32]>>,
    ) -> Result<ReadColumn> {
        let indices = indices.into();
        let repr = match vector.data_type() {
            DataType::Union(_, UnionMode::Dense) => Repr::IndirectDenseUnion {
                vector: dense_union(&vector)?,
                indices,
            },
            DataType::Union(_, UnionMode::Sparse) => {
                return Err(unregistered("sparse union vector", &vector));
            }
            _ => {
                let minor = MinorType::from_arrow(vector.data_type())
                    .ok_or_else(|| unregistered("vector", &vector))?;
                Repr::Indirect {
                    vector,
                    minor,
                    indices,
                }
            }
        };
        Ok(ReadColumn {
            name: name.into(),
            repr,
        })
    }

    /// A materialized column: one `(vector, row)` pair per logical row.
    ///
    /// The view keeps every referenced vector alive for its lifetime.
    /// `minor_types` is the producer's observed-content set.
    #[must_use]
    pub fn materialized(
        name: impl Into<Arc<str>>,
        minor_types: BTreeSet<MinorType>,
        vectors: Vec<ArrayRef>,
        indices: Vec<usize>,
    ) -> ReadColumn {
        debug_assert_eq!(vectors.len(), indices.len());
        ReadColumn {
            name: name.into(),
            repr: Repr::Materialized {
                minor_types: Arc::new(minor_types),
                vectors: vectors.into(),
                indices: indices.into(),
            },
        }
    }

    /// The column's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A same-backing view under another name. O(1), copies nothing.
    #[must_use]
    pub fn rename(&self, name: impl Into<Arc<str>>) -> ReadColumn {
        ReadColumn {
            name: name.into(),
            repr: self.repr.clone(),
        }
    }

    /// The logical row count of this view.
    #[must_use]
    pub fn value_count(&self) -> usize {
        match &self.repr {
            Repr::Direct { vector, .. } => vector.len(),
            Repr::Indirect { indices, .. } => indices.len(),
            Repr::DenseUnion { vector } => vector.len(),
            Repr::IndirectDenseUnion { indices, .. } => indices.len(),
            Repr::Materialized { indices, .. } => indices.len(),
        }
    }

    /// The set of minor types observed in this view.
    ///
    /// A singleton for vector-backed variants; for union variants, the
    /// minor types of children with a positive value count (a cache of
    /// observed content, not the union's declared schema).
    #[must_use]
    pub fn minor_types(&self) -> BTreeSet<MinorType> {
        match &self.repr {
            Repr::Direct { minor, .. } | Repr::Indirect { minor, .. } => {
                BTreeSet::from([*minor])
            }
            Repr::DenseUnion { vector } | Repr::IndirectDenseUnion { vector, .. } => {
                union_minor_types(vector)
            }
            Repr::Materialized { minor_types, .. } => (**minor_types).clone(),
        }
    }

    /// Whether the slot at `index` is absent.
    #[must_use]
    pub fn is_null(&self, index: usize) -> bool {
        slot_is_null(self.internal_vector(index).as_ref(), self.internal_index(index))
    }

    /// The leaf boolean at `index`.
    ///
    /// # Panics
    /// Panics when the leaf minor type is not [`MinorType::Bit`]; callers
    /// consult [`ReadColumn::minor_types`] first.
    #[must_use]
    pub fn get_bool(&self, index: usize) -> bool {
        self.internal_vector(index)
            .as_boolean()
            .value(self.internal_index(index))
    }

    /// The leaf 8-bit integer at `index`.
    ///
    /// # Panics
    /// Panics when the leaf minor type is not [`MinorType::TinyInt`].
    #[must_use]
    pub fn get_byte(&self, index: usize) -> i8 {
        self.internal_vector(index)
            .as_primitive::<Int8Type>()
            .value(self.internal_index(index))
    }

    /// The leaf 64-bit integer at `index`.
    ///
    /// # Panics
    /// Panics when the leaf minor type is not [`MinorType::BigInt`].
    #[must_use]
    pub fn get_long(&self, index: usize) -> i64 {
        self.internal_vector(index)
            .as_primitive::<Int64Type>()
            .value(self.internal_index(index))
    }

    /// The leaf 64-bit float at `index`.
    ///
    /// # Panics
    /// Panics when the leaf minor type is not [`MinorType::Float8`].
    #[must_use]
    pub fn get_double(&self, index: usize) -> f64 {
        self.internal_vector(index)
            .as_primitive::<Float64Type>()
            .value(self.internal_index(index))
    }

    /// The leaf epoch-millisecond timestamp at `index`.
    ///
    /// # Panics
    /// Panics when the leaf minor type is not [`MinorType::TimestampMilli`].
    #[must_use]
    pub fn get_date(&self, index: usize) -> i64 {
        self.internal_vector(index)
            .as_primitive::<TimestampMillisecondType>()
            .value(self.internal_index(index))
    }

    /// The leaf millisecond duration at `index`.
    ///
    /// # Panics
    /// Panics when the leaf minor type is not [`MinorType::Duration`].
    #[must_use]
    pub fn get_duration(&self, index: usize) -> i64 {
        self.internal_vector(index)
            .as_primitive::<DurationMillisecondType>()
            .value(self.internal_index(index))
    }

    /// The leaf string at `index`.
    ///
    /// # Panics
    /// Panics when the leaf minor type is not UTF-8 backed.
    #[must_use]
    pub fn get_str(&self, index: usize) -> &str {
        self.internal_vector(index)
            .as_string::<i32>()
            .value(self.internal_index(index))
    }

    /// The leaf bytes at `index`.
    ///
    /// # Panics
    /// Panics when the leaf minor type is not [`MinorType::Varbinary`].
    #[must_use]
    pub fn get_bytes(&self, index: usize) -> &[u8] {
        self.internal_vector(index)
            .as_binary::<i32>()
            .value(self.internal_index(index))
    }

    /// The canonical host value at `index`, dispatched on the leaf type.
    #[must_use]
    pub fn get_object(&self, index: usize) -> Value {
        value_at(self.internal_vector(index), self.internal_index(index))
    }

    /// The leaf vector backing row `index`, after unwrapping indirection
    /// and union dispatch. Vector-backed variants ignore `index`.
    #[must_use]
    pub fn internal_vector(&self, index: usize) -> &ArrayRef {
        match &self.repr {
            Repr::Direct { vector, .. } | Repr::Indirect { vector, .. } => vector,
            Repr::DenseUnion { vector } => vector.child(vector.type_id(index)),
            Repr::IndirectDenseUnion { vector, indices } => {
                vector.child(vector.type_id(indices[index] as usize))
            }
            Repr::Materialized { vectors, .. } => &vectors[index],
        }
    }

    /// The row within [`ReadColumn::internal_vector`] backing row `index`.
    #[must_use]
    pub fn internal_index(&self, index: usize) -> usize {
        match &self.repr {
            Repr::Direct { .. } => index,
            Repr::Indirect { indices, .. } => indices[index] as usize,
            Repr::DenseUnion { vector } => vector.value_offset(index),
            Repr::IndirectDenseUnion { vector, indices } => {
                vector.value_offset(indices[index] as usize)
            }
            Repr::Materialized { indices, .. } => indices[index],
        }
    }
}

fn dense_union(vector: &ArrayRef) -> Result<UnionArray> {
    let union = vector
        .as_any()
        .downcast_ref::<UnionArray>()
        .expect("union data type backed by a union array");
    let DataType::Union(fields, _) = vector.data_type() else {
        unreachable!("checked by caller");
    };
    for (type_id, field) in fields.iter() {
        if MinorType::from_arrow(field.data_type()).is_none() {
            return Err(unregistered("union child", union.child(type_id)));
        }
    }
    Ok(union.clone())
}

fn union_minor_types(vector: &UnionArray) -> BTreeSet<MinorType> {
    let DataType::Union(fields, _) = vector.data_type() else {
        unreachable!("dense union backing");
    };
    fields
        .iter()
        .filter(|(type_id, _)| !vector.child(*type_id).is_empty())
        .filter_map(|(_, field)| MinorType::from_arrow(field.data_type()))
        .collect()
}

fn unregistered(kind: &str, vector: &dyn Array) -> Error {
    Error::UnsupportedValueType {
        kind: kind.to_string(),
        arrow_type: vector.data_type().clone(),
    }
}
