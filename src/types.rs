//! Minor types, tagged-union discriminants, and host values.
//!
//! The minor type is the closed enumeration identifying the physical
//! representation of a column slot; its stable `i8` type id doubles as the
//! dense-union discriminant and as the key of the append dispatch table.

use arrow_array::{
    Array, ArrayRef,
    cast::AsArray,
    types::{DurationMillisecondType, Float64Type, Int8Type, Int64Type, TimestampMillisecondType},
};
use arrow_schema::{DataType, TimeUnit};

/// Physical representation of one column slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MinorType {
    /// The null type (all slots absent).
    Null,
    /// Boolean.
    Bit,
    /// 8-bit signed integer.
    TinyInt,
    /// 64-bit signed integer.
    BigInt,
    /// 64-bit floating point.
    Float8,
    /// UTF-8 string.
    Varchar,
    /// Arbitrary bytes.
    Varbinary,
    /// Millisecond-precision epoch timestamp.
    TimestampMilli,
    /// Millisecond-precision duration.
    Duration,
    /// Extension family: interned keyword, physically UTF-8.
    Keyword,
}

impl MinorType {
    /// Stable type id used as dense-union discriminant and dispatch key.
    #[must_use]
    pub const fn type_id(self) -> i8 {
        match self {
            MinorType::Null => 1,
            MinorType::BigInt => 2,
            MinorType::Float8 => 3,
            MinorType::Varbinary => 4,
            MinorType::Varchar => 5,
            MinorType::Bit => 6,
            MinorType::TinyInt => 7,
            MinorType::TimestampMilli => 10,
            MinorType::Keyword => 12,
            MinorType::Duration => 18,
        }
    }

    /// Inverse of [`MinorType::type_id`].
    #[must_use]
    pub const fn from_type_id(id: i8) -> Option<MinorType> {
        match id {
            1 => Some(MinorType::Null),
            2 => Some(MinorType::BigInt),
            3 => Some(MinorType::Float8),
            4 => Some(MinorType::Varbinary),
            5 => Some(MinorType::Varchar),
            6 => Some(MinorType::Bit),
            7 => Some(MinorType::TinyInt),
            10 => Some(MinorType::TimestampMilli),
            12 => Some(MinorType::Keyword),
            18 => Some(MinorType::Duration),
            _ => None,
        }
    }

    /// The arrow type descriptor this minor type is laid out as.
    #[must_use]
    pub fn arrow_type(self) -> DataType {
        match self {
            MinorType::Null => DataType::Null,
            MinorType::Bit => DataType::Boolean,
            MinorType::TinyInt => DataType::Int8,
            MinorType::BigInt => DataType::Int64,
            MinorType::Float8 => DataType::Float64,
            MinorType::Varchar | MinorType::Keyword => DataType::Utf8,
            MinorType::Varbinary => DataType::Binary,
            MinorType::TimestampMilli => DataType::Timestamp(TimeUnit::Millisecond, None),
            MinorType::Duration => DataType::Duration(TimeUnit::Millisecond),
        }
    }

    /// Map an arrow type back into the registry.
    ///
    /// `Utf8` maps to [`MinorType::Varchar`]; the keyword extension only
    /// arises by explicit construction. Types outside the registry return
    /// `None`.
    #[must_use]
    pub fn from_arrow(data_type: &DataType) -> Option<MinorType> {
        match data_type {
            DataType::Null => Some(MinorType::Null),
            DataType::Boolean => Some(MinorType::Bit),
            DataType::Int8 => Some(MinorType::TinyInt),
            DataType::Int64 => Some(MinorType::BigInt),
            DataType::Float64 => Some(MinorType::Float8),
            DataType::Utf8 => Some(MinorType::Varchar),
            DataType::Binary => Some(MinorType::Varbinary),
            DataType::Timestamp(TimeUnit::Millisecond, _) => Some(MinorType::TimestampMilli),
            DataType::Duration(TimeUnit::Millisecond) => Some(MinorType::Duration),
            _ => None,
        }
    }
}

/// Canonical host value of one column slot.
///
/// Nulls are the distinguished [`Value::Null`] variant, never an `Option`
/// wrapper, so heterogeneous consumers can dispatch on a single enum.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// 8-bit signed integer.
    Byte(i8),
    /// 64-bit signed integer.
    Long(i64),
    /// 64-bit floating point.
    Double(f64),
    /// UTF-8 string.
    Str(String),
    /// Arbitrary bytes.
    Bytes(Vec<u8>),
    /// Epoch milliseconds.
    Date(i64),
    /// Duration milliseconds.
    Duration(i64),
}

impl Value {
    /// The minor type this value is represented as.
    #[must_use]
    pub fn minor_type(&self) -> MinorType {
        match self {
            Value::Null => MinorType::Null,
            Value::Bool(_) => MinorType::Bit,
            Value::Byte(_) => MinorType::TinyInt,
            Value::Long(_) => MinorType::BigInt,
            Value::Double(_) => MinorType::Float8,
            Value::Str(_) => MinorType::Varchar,
            Value::Bytes(_) => MinorType::Varbinary,
            Value::Date(_) => MinorType::TimestampMilli,
            Value::Duration(_) => MinorType::Duration,
        }
    }

    /// A short, human-readable kind name for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Byte(_) => "byte",
            Value::Long(_) => "long",
            Value::Double(_) => "double",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Duration(_) => "duration",
        }
    }
}

/// Whether the slot at `index` is absent.
///
/// `DataType::Null` vectors report no validity buffer in arrow, so they are
/// special-cased as all-null.
pub(crate) fn slot_is_null(vector: &dyn Array, index: usize) -> bool {
    matches!(vector.data_type(), DataType::Null) || vector.is_null(index)
}

/// Registry read of one slot as its canonical host value.
///
/// # Panics
/// Panics when the vector's arrow type is outside the registry. The
/// relation boundary validates membership, so interior code never observes
/// one.
#[must_use]
pub fn value_at(vector: &ArrayRef, index: usize) -> Value {
    let minor = MinorType::from_arrow(vector.data_type())
        .unwrap_or_else(|| panic!("vector type {:?} outside the registry", vector.data_type()));
    if slot_is_null(vector.as_ref(), index) {
        return Value::Null;
    }
    match minor {
        MinorType::Null => Value::Null,
        MinorType::Bit => Value::Bool(vector.as_boolean().value(index)),
        MinorType::TinyInt => Value::Byte(vector.as_primitive::<Int8Type>().value(index)),
        MinorType::BigInt => Value::Long(vector.as_primitive::<Int64Type>().value(index)),
        MinorType::Float8 => Value::Double(vector.as_primitive::<Float64Type>().value(index)),
        MinorType::Varchar | MinorType::Keyword => {
            Value::Str(vector.as_string::<i32>().value(index).to_string())
        }
        MinorType::Varbinary => Value::Bytes(vector.as_binary::<i32>().value(index).to_vec()),
        MinorType::TimestampMilli => {
            Value::Date(vector.as_primitive::<TimestampMillisecondType>().value(index))
        }
        MinorType::Duration => Value::Duration(
            vector
                .as_primitive::<DurationMillisecondType>()
                .value(index),
        ),
    }
}
