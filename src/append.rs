//! Append-side column builders.
//!
//! Append columns are single-producer write surfaces over arrow builders.
//! `read()` snapshots what has been appended so far into an immutable
//! [`ReadColumn`] without resetting the builder, so producers can keep
//! appending after a snapshot is taken.

use std::{collections::BTreeSet, sync::Arc};

use arrow_array::{
    Array, ArrayRef,
    builder::{
        ArrayBuilder, BinaryBuilder, BooleanBuilder, DurationMillisecondBuilder, Float64Builder,
        Int8Builder, Int64Builder, NullBuilder, StringBuilder, TimestampMillisecondBuilder,
    },
    cast::AsArray,
    types::{DurationMillisecondType, Float64Type, Int8Type, Int64Type, TimestampMillisecondType},
};

use crate::{
    alloc::{BufferAllocator, Reservation},
    error::{Error, Result},
    read::ReadColumn,
    types::{MinorType, Value, slot_is_null},
};

/// Object-safe append surface shared by every builder variant.
///
/// Marked `Send` so trait objects can be moved across threads without
/// repeating `+ Send` everywhere; a single column is still single-producer.
pub trait AppendColumn: Send {
    /// The column's name.
    fn name(&self) -> &str;

    /// Logical rows appended so far.
    fn value_count(&self) -> usize;

    /// Append an absent value.
    ///
    /// # Errors
    /// Returns [`Error::AllocationFailed`] when the budget is exhausted.
    fn append_null(&mut self) -> Result<()>;

    /// Append a boolean.
    ///
    /// # Errors
    /// Returns [`Error::TypeMismatch`] on a homogeneous column of another
    /// type, or [`Error::AllocationFailed`].
    fn append_bool(&mut self, value: bool) -> Result<()>;

    /// Append an 8-bit signed integer.
    ///
    /// # Errors
    /// As [`AppendColumn::append_bool`].
    fn append_byte(&mut self, value: i8) -> Result<()>;

    /// Append a 64-bit signed integer.
    ///
    /// # Errors
    /// As [`AppendColumn::append_bool`].
    fn append_long(&mut self, value: i64) -> Result<()>;

    /// Append a 64-bit float.
    ///
    /// # Errors
    /// As [`AppendColumn::append_bool`].
    fn append_double(&mut self, value: f64) -> Result<()>;

    /// Append a UTF-8 string.
    ///
    /// # Errors
    /// As [`AppendColumn::append_bool`].
    fn append_string(&mut self, value: &str) -> Result<()>;

    /// Append arbitrary bytes.
    ///
    /// # Errors
    /// As [`AppendColumn::append_bool`].
    fn append_bytes(&mut self, value: &[u8]) -> Result<()>;

    /// Append an epoch-millisecond timestamp.
    ///
    /// # Errors
    /// As [`AppendColumn::append_bool`].
    fn append_date(&mut self, millis: i64) -> Result<()>;

    /// Append a millisecond duration.
    ///
    /// # Errors
    /// As [`AppendColumn::append_bool`].
    fn append_duration(&mut self, millis: i64) -> Result<()>;

    /// Copy the slot at `source[index]` into a newly appended row, reading
    /// through the source's leaf capability accessors.
    ///
    /// # Errors
    /// Returns [`Error::TypeMismatch`] on a homogeneous column whose type
    /// differs from the source leaf, [`Error::UnsupportedValueType`] for
    /// an unregistered leaf, or [`Error::AllocationFailed`].
    fn append_from(&mut self, source: &ReadColumn, index: usize) -> Result<()>;

    /// Snapshot everything appended so far as an immutable read column.
    fn read(&self) -> ReadColumn;

    /// Append a host value, dispatched on its runtime type id.
    ///
    /// The dispatch table covers NULL, BIGINT, FLOAT8, VARBINARY, VARCHAR,
    /// BIT, TIMESTAMP_MILLI, and DURATION; any other type id fails.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedValueType`] for a value outside the
    /// table, otherwise as the matching typed append.
    fn append_object(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.append_null(),
            Value::Long(v) => self.append_long(*v),
            Value::Double(v) => self.append_double(*v),
            Value::Bytes(v) => self.append_bytes(v),
            Value::Str(v) => self.append_string(v),
            Value::Bool(v) => self.append_bool(*v),
            Value::Date(v) => self.append_date(*v),
            Value::Duration(v) => self.append_duration(*v),
            other => Err(Error::UnsupportedValueType {
                kind: other.kind().to_string(),
                arrow_type: other.minor_type().arrow_type(),
            }),
        }
    }
}

/// Chooses how an append relation manufactures missing columns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColumnFactory {
    /// Allocator-backed builders that copy every appended slot.
    #[default]
    Fresh,
    /// Builders that record `(vector, row)` pairs without copying.
    Indirect,
}

impl ColumnFactory {
    /// Manufacture an append column for `name`.
    ///
    /// # Errors
    /// Returns [`Error::AllocationFailed`] when the budget cannot admit
    /// the builder overhead.
    pub fn new_column(
        self,
        allocator: &BufferAllocator,
        name: impl Into<Arc<str>>,
    ) -> Result<Box<dyn AppendColumn>> {
        Ok(match self {
            ColumnFactory::Fresh => Box::new(FreshAppendColumn::new(allocator, name)?),
            ColumnFactory::Indirect => Box::new(IndirectAppendColumn::new(allocator, name)?),
        })
    }
}

// One arrow builder per minor type; the append-side half of the registry.
enum TypedBuilder {
    Null(NullBuilder),
    Bit(BooleanBuilder),
    TinyInt(Int8Builder),
    BigInt(Int64Builder),
    Float8(Float64Builder),
    Varchar(StringBuilder),
    Varbinary(BinaryBuilder),
    TimestampMilli(TimestampMillisecondBuilder),
    Duration(DurationMillisecondBuilder),
}

impl TypedBuilder {
    fn for_minor(minor: MinorType) -> TypedBuilder {
        match minor {
            MinorType::Null => TypedBuilder::Null(NullBuilder::new()),
            MinorType::Bit => TypedBuilder::Bit(BooleanBuilder::new()),
            MinorType::TinyInt => TypedBuilder::TinyInt(Int8Builder::new()),
            MinorType::BigInt => TypedBuilder::BigInt(Int64Builder::new()),
            MinorType::Float8 => TypedBuilder::Float8(Float64Builder::new()),
            MinorType::Varchar | MinorType::Keyword => TypedBuilder::Varchar(StringBuilder::new()),
            MinorType::Varbinary => TypedBuilder::Varbinary(BinaryBuilder::new()),
            MinorType::TimestampMilli => {
                TypedBuilder::TimestampMilli(TimestampMillisecondBuilder::new())
            }
            MinorType::Duration => TypedBuilder::Duration(DurationMillisecondBuilder::new()),
        }
    }

    fn minor(&self) -> MinorType {
        match self {
            TypedBuilder::Null(_) => MinorType::Null,
            TypedBuilder::Bit(_) => MinorType::Bit,
            TypedBuilder::TinyInt(_) => MinorType::TinyInt,
            TypedBuilder::BigInt(_) => MinorType::BigInt,
            TypedBuilder::Float8(_) => MinorType::Float8,
            TypedBuilder::Varchar(_) => MinorType::Varchar,
            TypedBuilder::Varbinary(_) => MinorType::Varbinary,
            TypedBuilder::TimestampMilli(_) => MinorType::TimestampMilli,
            TypedBuilder::Duration(_) => MinorType::Duration,
        }
    }

    fn len(&self) -> usize {
        match self {
            TypedBuilder::Null(b) => ArrayBuilder::len(b),
            TypedBuilder::Bit(b) => ArrayBuilder::len(b),
            TypedBuilder::TinyInt(b) => ArrayBuilder::len(b),
            TypedBuilder::BigInt(b) => ArrayBuilder::len(b),
            TypedBuilder::Float8(b) => ArrayBuilder::len(b),
            TypedBuilder::Varchar(b) => ArrayBuilder::len(b),
            TypedBuilder::Varbinary(b) => ArrayBuilder::len(b),
            TypedBuilder::TimestampMilli(b) => ArrayBuilder::len(b),
            TypedBuilder::Duration(b) => ArrayBuilder::len(b),
        }
    }

    fn finish_cloned(&self) -> ArrayRef {
        match self {
            TypedBuilder::Null(b) => ArrayBuilder::finish_cloned(b),
            TypedBuilder::Bit(b) => ArrayBuilder::finish_cloned(b),
            TypedBuilder::TinyInt(b) => ArrayBuilder::finish_cloned(b),
            TypedBuilder::BigInt(b) => ArrayBuilder::finish_cloned(b),
            TypedBuilder::Float8(b) => ArrayBuilder::finish_cloned(b),
            TypedBuilder::Varchar(b) => ArrayBuilder::finish_cloned(b),
            TypedBuilder::Varbinary(b) => ArrayBuilder::finish_cloned(b),
            TypedBuilder::TimestampMilli(b) => ArrayBuilder::finish_cloned(b),
            TypedBuilder::Duration(b) => ArrayBuilder::finish_cloned(b),
        }
    }

    fn append_null(&mut self) {
        match self {
            TypedBuilder::Null(b) => b.append_null(),
            TypedBuilder::Bit(b) => b.append_null(),
            TypedBuilder::TinyInt(b) => b.append_null(),
            TypedBuilder::BigInt(b) => b.append_null(),
            TypedBuilder::Float8(b) => b.append_null(),
            TypedBuilder::Varchar(b) => b.append_null(),
            TypedBuilder::Varbinary(b) => b.append_null(),
            TypedBuilder::TimestampMilli(b) => b.append_null(),
            TypedBuilder::Duration(b) => b.append_null(),
        }
    }

    fn append_bool(&mut self, value: bool) -> Result<()> {
        match self {
            TypedBuilder::Bit(b) => {
                b.append_value(value);
                Ok(())
            }
            other => Err(other.mismatch(MinorType::Bit)),
        }
    }

    fn append_byte(&mut self, value: i8) -> Result<()> {
        match self {
            TypedBuilder::TinyInt(b) => {
                b.append_value(value);
                Ok(())
            }
            other => Err(other.mismatch(MinorType::TinyInt)),
        }
    }

    fn append_long(&mut self, value: i64) -> Result<()> {
        match self {
            TypedBuilder::BigInt(b) => {
                b.append_value(value);
                Ok(())
            }
            other => Err(other.mismatch(MinorType::BigInt)),
        }
    }

    fn append_double(&mut self, value: f64) -> Result<()> {
        match self {
            TypedBuilder::Float8(b) => {
                b.append_value(value);
                Ok(())
            }
            other => Err(other.mismatch(MinorType::Float8)),
        }
    }

    fn append_string(&mut self, value: &str) -> Result<()> {
        match self {
            TypedBuilder::Varchar(b) => {
                b.append_value(value);
                Ok(())
            }
            other => Err(other.mismatch(MinorType::Varchar)),
        }
    }

    fn append_bytes(&mut self, value: &[u8]) -> Result<()> {
        match self {
            TypedBuilder::Varbinary(b) => {
                b.append_value(value);
                Ok(())
            }
            other => Err(other.mismatch(MinorType::Varbinary)),
        }
    }

    fn append_date(&mut self, millis: i64) -> Result<()> {
        match self {
            TypedBuilder::TimestampMilli(b) => {
                b.append_value(millis);
                Ok(())
            }
            other => Err(other.mismatch(MinorType::TimestampMilli)),
        }
    }

    fn append_duration(&mut self, millis: i64) -> Result<()> {
        match self {
            TypedBuilder::Duration(b) => {
                b.append_value(millis);
                Ok(())
            }
            other => Err(other.mismatch(MinorType::Duration)),
        }
    }

    // The safe one-slot copy: null-preserving, typed at the leaf.
    fn append_from_vector(&mut self, vector: &ArrayRef, index: usize) -> Result<()> {
        if slot_is_null(vector.as_ref(), index) {
            self.append_null();
            return Ok(());
        }
        let minor = MinorType::from_arrow(vector.data_type()).ok_or_else(|| {
            Error::UnsupportedValueType {
                kind: "source vector".to_string(),
                arrow_type: vector.data_type().clone(),
            }
        })?;
        match minor {
            MinorType::Null => {
                self.append_null();
                Ok(())
            }
            MinorType::Bit => self.append_bool(vector.as_boolean().value(index)),
            MinorType::TinyInt => self.append_byte(vector.as_primitive::<Int8Type>().value(index)),
            MinorType::BigInt => self.append_long(vector.as_primitive::<Int64Type>().value(index)),
            MinorType::Float8 => {
                self.append_double(vector.as_primitive::<Float64Type>().value(index))
            }
            MinorType::Varchar | MinorType::Keyword => {
                self.append_string(vector.as_string::<i32>().value(index))
            }
            MinorType::Varbinary => self.append_bytes(vector.as_binary::<i32>().value(index)),
            MinorType::TimestampMilli => {
                self.append_date(vector.as_primitive::<TimestampMillisecondType>().value(index))
            }
            MinorType::Duration => self.append_duration(
                vector
                    .as_primitive::<DurationMillisecondType>()
                    .value(index),
            ),
        }
    }

    fn mismatch(&self, found: MinorType) -> Error {
        Error::TypeMismatch {
            column: String::new(),
            expected: self.minor(),
            found,
        }
    }
}

// Rough per-append admission cost: data plus validity for fixed-width
// slots, offset plus payload for variable-width ones.
fn append_cost(minor: MinorType, payload: usize) -> usize {
    match minor {
        MinorType::Null | MinorType::Bit | MinorType::TinyInt => 2,
        MinorType::Varchar | MinorType::Keyword | MinorType::Varbinary => 5 + payload,
        _ => 9,
    }
}

/// Homogeneous append column: bound to one minor type with its own
/// freshly allocated vector.
pub struct VectorAppendColumn {
    name: Arc<str>,
    minor: MinorType,
    builder: TypedBuilder,
    reservation: Reservation,
}

impl VectorAppendColumn {
    /// A homogeneous builder for `minor` charged against `allocator`.
    ///
    /// # Errors
    /// Returns [`Error::AllocationFailed`] when the budget cannot admit
    /// the builder overhead.
    pub fn new(
        allocator: &BufferAllocator,
        name: impl Into<Arc<str>>,
        minor: MinorType,
    ) -> Result<VectorAppendColumn> {
        Ok(VectorAppendColumn {
            name: name.into(),
            minor,
            builder: TypedBuilder::for_minor(minor),
            reservation: allocator.reserve(64)?,
        })
    }

    /// The minor type this column is bound to.
    #[must_use]
    pub fn minor_type(&self) -> MinorType {
        self.minor
    }

    fn charge(&mut self, payload: usize) -> Result<()> {
        self.reservation.grow(append_cost(self.minor, payload))
    }

    fn attributed(&self, error: Error) -> Error {
        error.for_column(&self.name)
    }
}

impl AppendColumn for VectorAppendColumn {
    fn name(&self) -> &str {
        &self.name
    }

    fn value_count(&self) -> usize {
        self.builder.len()
    }

    fn append_null(&mut self) -> Result<()> {
        self.charge(0)?;
        self.builder.append_null();
        Ok(())
    }

    fn append_bool(&mut self, value: bool) -> Result<()> {
        self.charge(0)?;
        self.builder.append_bool(value).map_err(|e| self.attributed(e))
    }

    fn append_byte(&mut self, value: i8) -> Result<()> {
        self.charge(0)?;
        self.builder.append_byte(value).map_err(|e| self.attributed(e))
    }

    fn append_long(&mut self, value: i64) -> Result<()> {
        self.charge(0)?;
        self.builder.append_long(value).map_err(|e| self.attributed(e))
    }

    fn append_double(&mut self, value: f64) -> Result<()> {
        self.charge(0)?;
        self.builder
            .append_double(value)
            .map_err(|e| self.attributed(e))
    }

    fn append_string(&mut self, value: &str) -> Result<()> {
        self.charge(value.len())?;
        self.builder
            .append_string(value)
            .map_err(|e| self.attributed(e))
    }

    fn append_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.charge(value.len())?;
        self.builder
            .append_bytes(value)
            .map_err(|e| self.attributed(e))
    }

    fn append_date(&mut self, millis: i64) -> Result<()> {
        self.charge(0)?;
        self.builder
            .append_date(millis)
            .map_err(|e| self.attributed(e))
    }

    fn append_duration(&mut self, millis: i64) -> Result<()> {
        self.charge(0)?;
        self.builder
            .append_duration(millis)
            .map_err(|e| self.attributed(e))
    }

    fn append_from(&mut self, source: &ReadColumn, index: usize) -> Result<()> {
        let vector = source.internal_vector(index);
        let leaf_index = source.internal_index(index);
        if slot_is_null(vector.as_ref(), leaf_index) {
            return self.append_null();
        }
        self.charge(8)?;
        let vector = vector.clone();
        let result = self.builder.append_from_vector(&vector, leaf_index);
        result.map_err(|e| self.attributed(e))
    }

    fn read(&self) -> ReadColumn {
        ReadColumn::from_vector(self.name.clone(), self.builder.finish_cloned())
            .expect("registry-backed builder output")
    }
}

// Shared mechanics of the two multi-vector builders: one lazily created
// builder per minor type encountered.
struct BuilderSet {
    builders: Vec<TypedBuilder>,
}

impl BuilderSet {
    fn new() -> BuilderSet {
        BuilderSet {
            builders: Vec::new(),
        }
    }

    fn slot_for(&mut self, minor: MinorType) -> usize {
        if let Some(slot) = self.builders.iter().position(|b| b.minor() == minor) {
            return slot;
        }
        self.builders.push(TypedBuilder::for_minor(minor));
        self.builders.len() - 1
    }

    fn snapshots(&self) -> Vec<ArrayRef> {
        self.builders.iter().map(TypedBuilder::finish_cloned).collect()
    }

    fn observed_minor_types(&self) -> BTreeSet<MinorType> {
        self.builders
            .iter()
            .filter(|b| b.len() > 0)
            .map(TypedBuilder::minor)
            .collect()
    }
}

/// Heterogeneous append column: one vector per minor type encountered,
/// with a per-append trail of `(vector, row)` pairs.
pub struct FreshAppendColumn {
    name: Arc<str>,
    builders: BuilderSet,
    // Parallel to logical rows: which builder, and which row within it.
    trail: Vec<(usize, usize)>,
    reservation: Reservation,
}

impl FreshAppendColumn {
    /// A heterogeneous builder charged against `allocator`.
    ///
    /// # Errors
    /// Returns [`Error::AllocationFailed`] when the budget cannot admit
    /// the builder overhead.
    pub fn new(
        allocator: &BufferAllocator,
        name: impl Into<Arc<str>>,
    ) -> Result<FreshAppendColumn> {
        Ok(FreshAppendColumn {
            name: name.into(),
            builders: BuilderSet::new(),
            trail: Vec::new(),
            reservation: allocator.reserve(64)?,
        })
    }

    fn append_with(
        &mut self,
        minor: MinorType,
        payload: usize,
        append: impl FnOnce(&mut TypedBuilder) -> Result<()>,
    ) -> Result<()> {
        self.reservation
            .grow(append_cost(minor, payload) + std::mem::size_of::<(usize, usize)>())?;
        let slot = self.builders.slot_for(minor);
        let builder = &mut self.builders.builders[slot];
        append(builder).map_err(|e| e.for_column(&self.name))?;
        self.trail.push((slot, builder.len() - 1));
        Ok(())
    }
}

impl AppendColumn for FreshAppendColumn {
    fn name(&self) -> &str {
        &self.name
    }

    fn value_count(&self) -> usize {
        self.trail.len()
    }

    fn append_null(&mut self) -> Result<()> {
        self.append_with(MinorType::Null, 0, |b| {
            b.append_null();
            Ok(())
        })
    }

    fn append_bool(&mut self, value: bool) -> Result<()> {
        self.append_with(MinorType::Bit, 0, |b| b.append_bool(value))
    }

    fn append_byte(&mut self, value: i8) -> Result<()> {
        self.append_with(MinorType::TinyInt, 0, |b| b.append_byte(value))
    }

    fn append_long(&mut self, value: i64) -> Result<()> {
        self.append_with(MinorType::BigInt, 0, |b| b.append_long(value))
    }

    fn append_double(&mut self, value: f64) -> Result<()> {
        self.append_with(MinorType::Float8, 0, |b| b.append_double(value))
    }

    fn append_string(&mut self, value: &str) -> Result<()> {
        self.append_with(MinorType::Varchar, value.len(), |b| b.append_string(value))
    }

    fn append_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.append_with(MinorType::Varbinary, value.len(), |b| b.append_bytes(value))
    }

    fn append_date(&mut self, millis: i64) -> Result<()> {
        self.append_with(MinorType::TimestampMilli, 0, |b| b.append_date(millis))
    }

    fn append_duration(&mut self, millis: i64) -> Result<()> {
        self.append_with(MinorType::Duration, 0, |b| b.append_duration(millis))
    }

    fn append_from(&mut self, source: &ReadColumn, index: usize) -> Result<()> {
        let vector = source.internal_vector(index).clone();
        let leaf_index = source.internal_index(index);
        let minor = MinorType::from_arrow(vector.data_type()).ok_or_else(|| {
            Error::UnsupportedValueType {
                kind: "source vector".to_string(),
                arrow_type: vector.data_type().clone(),
            }
        })?;
        self.append_with(minor, 8, |b| b.append_from_vector(&vector, leaf_index))
    }

    fn read(&self) -> ReadColumn {
        let arrays = self.builders.snapshots();
        let vectors = self
            .trail
            .iter()
            .map(|(slot, _)| arrays[*slot].clone())
            .collect();
        let indices = self.trail.iter().map(|(_, row)| *row).collect();
        ReadColumn::materialized(
            self.name.clone(),
            self.builders.observed_minor_types(),
            vectors,
            indices,
        )
    }
}

// One logical row of an indirect builder: either a row in one of our own
// builders, or a borrowed slot in someone else's vector.
enum Slot {
    Owned { slot: usize, row: usize },
    Shared { vector: ArrayRef, index: usize },
}

/// Indirect append column: `append_from` records the source leaf
/// `(vector, row)` pair without copying; typed appends fall back to owned
/// builders.
pub struct IndirectAppendColumn {
    name: Arc<str>,
    builders: BuilderSet,
    trail: Vec<Slot>,
    reservation: Reservation,
}

impl IndirectAppendColumn {
    /// An indirect builder charged against `allocator`.
    ///
    /// # Errors
    /// Returns [`Error::AllocationFailed`] when the budget cannot admit
    /// the builder overhead.
    pub fn new(
        allocator: &BufferAllocator,
        name: impl Into<Arc<str>>,
    ) -> Result<IndirectAppendColumn> {
        Ok(IndirectAppendColumn {
            name: name.into(),
            builders: BuilderSet::new(),
            trail: Vec::new(),
            reservation: allocator.reserve(64)?,
        })
    }

    fn append_with(
        &mut self,
        minor: MinorType,
        payload: usize,
        append: impl FnOnce(&mut TypedBuilder) -> Result<()>,
    ) -> Result<()> {
        self.reservation
            .grow(append_cost(minor, payload) + std::mem::size_of::<Slot>())?;
        let slot = self.builders.slot_for(minor);
        let builder = &mut self.builders.builders[slot];
        append(builder).map_err(|e| e.for_column(&self.name))?;
        self.trail.push(Slot::Owned {
            slot,
            row: builder.len() - 1,
        });
        Ok(())
    }
}

impl AppendColumn for IndirectAppendColumn {
    fn name(&self) -> &str {
        &self.name
    }

    fn value_count(&self) -> usize {
        self.trail.len()
    }

    fn append_null(&mut self) -> Result<()> {
        self.append_with(MinorType::Null, 0, |b| {
            b.append_null();
            Ok(())
        })
    }

    fn append_bool(&mut self, value: bool) -> Result<()> {
        self.append_with(MinorType::Bit, 0, |b| b.append_bool(value))
    }

    fn append_byte(&mut self, value: i8) -> Result<()> {
        self.append_with(MinorType::TinyInt, 0, |b| b.append_byte(value))
    }

    fn append_long(&mut self, value: i64) -> Result<()> {
        self.append_with(MinorType::BigInt, 0, |b| b.append_long(value))
    }

    fn append_double(&mut self, value: f64) -> Result<()> {
        self.append_with(MinorType::Float8, 0, |b| b.append_double(value))
    }

    fn append_string(&mut self, value: &str) -> Result<()> {
        self.append_with(MinorType::Varchar, value.len(), |b| b.append_string(value))
    }

    fn append_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.append_with(MinorType::Varbinary, value.len(), |b| b.append_bytes(value))
    }

    fn append_date(&mut self, millis: i64) -> Result<()> {
        self.append_with(MinorType::TimestampMilli, 0, |b| b.append_date(millis))
    }

    fn append_duration(&mut self, millis: i64) -> Result<()> {
        self.append_with(MinorType::Duration, 0, |b| b.append_duration(millis))
    }

    fn append_from(&mut self, source: &ReadColumn, index: usize) -> Result<()> {
        let vector = source.internal_vector(index);
        MinorType::from_arrow(vector.data_type()).ok_or_else(|| Error::UnsupportedValueType {
            kind: "source vector".to_string(),
            arrow_type: vector.data_type().clone(),
        })?;
        self.reservation.grow(std::mem::size_of::<Slot>())?;
        self.trail.push(Slot::Shared {
            vector: vector.clone(),
            index: source.internal_index(index),
        });
        Ok(())
    }

    fn read(&self) -> ReadColumn {
        let arrays = self.builders.snapshots();
        let mut minor_types = self.builders.observed_minor_types();
        let mut vectors = Vec::with_capacity(self.trail.len());
        let mut indices = Vec::with_capacity(self.trail.len());
        for slot in &self.trail {
            match slot {
                Slot::Owned { slot, row } => {
                    vectors.push(arrays[*slot].clone());
                    indices.push(*row);
                }
                Slot::Shared { vector, index } => {
                    if let Some(minor) = MinorType::from_arrow(vector.data_type()) {
                        minor_types.insert(minor);
                    }
                    vectors.push(vector.clone());
                    indices.push(*index);
                }
            }
        }
        ReadColumn::materialized(self.name.clone(), minor_types, vectors, indices)
    }
}
