use std::{collections::BTreeSet, sync::Arc};

use arrow_array::{Array, ArrayRef, Int64Array, StringArray, UnionArray};
use arrow_buffer::ScalarBuffer;
use arrow_schema::{DataType, Field, UnionFields};
use tempora::{
    AppendColumn, BufferAllocator, Error, FreshAppendColumn, MinorType, ReadColumn, Value,
    VectorAppendColumn, value_at,
};

fn dense_union() -> ArrayRef {
    let fields: UnionFields = [
        (2_i8, Arc::new(Field::new("long", DataType::Int64, true))),
        (5_i8, Arc::new(Field::new("utf8", DataType::Utf8, true))),
    ]
    .into_iter()
    .collect();
    let type_ids: ScalarBuffer<i8> = vec![2, 5, 2].into();
    let offsets: ScalarBuffer<i32> = vec![0, 0, 1].into();
    let children: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(vec![7, 9])),
        Arc::new(StringArray::from(vec!["tail"])),
    ];
    Arc::new(UnionArray::try_new(fields, type_ids, Some(offsets), children).unwrap())
}

#[test]
fn homogeneous_round_trip() {
    let allocator = BufferAllocator::unbounded();
    let mut column =
        VectorAppendColumn::new(&allocator, "n", MinorType::BigInt).unwrap();
    column.append_long(1).unwrap();
    column.append_long(2).unwrap();
    column.append_null().unwrap();
    column.append_long(3).unwrap();

    let read = column.read();
    assert_eq!(read.value_count(), 4);
    assert_eq!(read.minor_types(), BTreeSet::from([MinorType::BigInt]));
    assert_eq!(read.get_long(0), 1);
    assert_eq!(read.get_long(1), 2);
    assert!(read.is_null(2));
    assert_eq!(read.get_object(2), Value::Null);
    assert_eq!(read.get_long(3), 3);

    // The snapshot stays valid while the producer keeps appending.
    column.append_long(4).unwrap();
    assert_eq!(read.value_count(), 4);
    assert_eq!(column.read().value_count(), 5);
}

#[test]
fn homogeneous_string_round_trip() {
    let allocator = BufferAllocator::unbounded();
    let mut column =
        VectorAppendColumn::new(&allocator, "s", MinorType::Varchar).unwrap();
    for value in ["alpha", "", "gamma"] {
        column.append_string(value).unwrap();
    }
    let read = column.read();
    assert_eq!(read.value_count(), 3);
    assert_eq!(read.get_str(0), "alpha");
    assert_eq!(read.get_str(1), "");
    assert_eq!(read.get_object(2), Value::Str("gamma".to_string()));
}

#[test]
fn homogeneous_rejects_mismatched_append() {
    let allocator = BufferAllocator::unbounded();
    let mut column =
        VectorAppendColumn::new(&allocator, "n", MinorType::BigInt).unwrap();
    let err = column.append_double(1.5).unwrap_err();
    match err {
        Error::TypeMismatch {
            column,
            expected,
            found,
        } => {
            assert_eq!(column, "n");
            assert_eq!(expected, MinorType::BigInt);
            assert_eq!(found, MinorType::Float8);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn heterogeneous_append_tracks_every_row() {
    let allocator = BufferAllocator::unbounded();
    let mut column = FreshAppendColumn::new(&allocator, "v").unwrap();
    column.append_long(1).unwrap();
    column.append_string("hi").unwrap();
    column.append_null().unwrap();
    column.append_double(2.5).unwrap();
    column.append_long(1).unwrap();

    let read = column.read();
    assert_eq!(read.value_count(), 5);
    assert_eq!(read.get_object(0), Value::Long(1));
    assert_eq!(read.get_object(1), Value::Str("hi".to_string()));
    assert_eq!(read.get_object(2), Value::Null);
    assert_eq!(read.get_object(3), Value::Double(2.5));
    assert_eq!(read.get_object(4), Value::Long(1));
    assert_eq!(
        read.minor_types(),
        BTreeSet::from([
            MinorType::Null,
            MinorType::BigInt,
            MinorType::Float8,
            MinorType::Varchar,
        ])
    );
}

#[test]
fn object_dispatch_covers_the_table_and_rejects_the_rest() {
    let allocator = BufferAllocator::unbounded();
    let mut column = FreshAppendColumn::new(&allocator, "v").unwrap();
    for value in [
        Value::Null,
        Value::Long(12),
        Value::Double(0.25),
        Value::Bytes(vec![1, 2]),
        Value::Str("k".to_string()),
        Value::Bool(true),
        Value::Date(1_700_000_000_000),
        Value::Duration(86_400_000),
    ] {
        column.append_object(&value).unwrap();
    }
    let read = column.read();
    assert_eq!(read.value_count(), 8);
    assert_eq!(read.get_object(3), Value::Bytes(vec![1, 2]));
    assert_eq!(read.get_date(6), 1_700_000_000_000);
    assert_eq!(read.get_duration(7), 86_400_000);

    let err = column.append_object(&Value::Byte(3)).unwrap_err();
    assert!(
        matches!(
            &err,
            Error::UnsupportedValueType { kind, arrow_type }
                if kind == "byte" && *arrow_type == DataType::Int8
        ),
        "unexpected error: {err:?}"
    );
    assert_eq!(column.value_count(), 8);
}

#[test]
fn rename_shares_backing_and_preserves_content() {
    let allocator = BufferAllocator::unbounded();
    let mut column = FreshAppendColumn::new(&allocator, "before").unwrap();
    column.append_long(10).unwrap();
    column.append_string("x").unwrap();
    let read = column.read();
    let renamed = read.rename("after");
    assert_eq!(renamed.name(), "after");
    assert_eq!(read.name(), "before");
    for index in 0..read.value_count() {
        assert_eq!(renamed.get_object(index), read.get_object(index));
    }
}

#[test]
fn internal_accessors_locate_the_leaf_slot() {
    let vector: ArrayRef = Arc::new(Int64Array::from(vec![10, 20, 30, 40]));
    let direct = ReadColumn::from_vector("a", vector.clone()).unwrap();
    let indirect =
        ReadColumn::from_vector_with_indices("a", vector, vec![3, 0, 2]).unwrap();
    for column in [&direct, &indirect] {
        for index in 0..column.value_count() {
            assert_eq!(
                value_at(column.internal_vector(index), column.internal_index(index)),
                column.get_object(index)
            );
        }
    }
    assert_eq!(indirect.value_count(), 3);
    assert_eq!(indirect.get_long(0), 40);
    assert_eq!(indirect.get_long(1), 10);
    assert_eq!(indirect.get_long(2), 30);
}

#[test]
fn dense_union_column_reads_through_type_dispatch() {
    let column = ReadColumn::from_vector("u", dense_union()).unwrap();
    assert_eq!(column.value_count(), 3);
    assert_eq!(
        column.minor_types(),
        BTreeSet::from([MinorType::BigInt, MinorType::Varchar])
    );
    assert_eq!(column.get_object(0), Value::Long(7));
    assert_eq!(column.get_object(1), Value::Str("tail".to_string()));
    assert_eq!(column.get_object(2), Value::Long(9));
    assert_eq!(column.get_long(2), 9);
    assert_eq!(column.internal_index(2), 1);
    assert_eq!(column.internal_vector(2).data_type(), &DataType::Int64);
}

#[test]
fn indirect_dense_union_column_applies_the_selection_first() {
    let column =
        ReadColumn::from_vector_with_indices("u", dense_union(), vec![2, 2, 0]).unwrap();
    assert_eq!(column.value_count(), 3);
    assert_eq!(column.get_object(0), Value::Long(9));
    assert_eq!(column.get_object(1), Value::Long(9));
    assert_eq!(column.get_object(2), Value::Long(7));
    for index in 0..column.value_count() {
        assert_eq!(
            value_at(column.internal_vector(index), column.internal_index(index)),
            column.get_object(index)
        );
    }
}

#[test]
fn sparse_unions_are_rejected_at_the_boundary() {
    let fields: UnionFields = [
        (0_i8, Arc::new(Field::new("a", DataType::Int64, true))),
        (1_i8, Arc::new(Field::new("b", DataType::Utf8, true))),
    ]
    .into_iter()
    .collect();
    let type_ids: ScalarBuffer<i8> = vec![0, 1].into();
    let children: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(vec![1, 2])),
        Arc::new(StringArray::from(vec!["x", "y"])),
    ];
    let sparse: ArrayRef =
        Arc::new(UnionArray::try_new(fields, type_ids, None, children).unwrap());
    let err = ReadColumn::from_vector("u", sparse).unwrap_err();
    assert!(matches!(err, Error::UnsupportedValueType { .. }));
}

#[test]
fn append_from_resolves_union_leaves() {
    let allocator = BufferAllocator::unbounded();
    let source = ReadColumn::from_vector("u", dense_union()).unwrap();
    let mut target = FreshAppendColumn::new(&allocator, "u").unwrap();
    for index in 0..source.value_count() {
        target.append_from(&source, index).unwrap();
    }
    let read = target.read();
    assert_eq!(read.value_count(), 3);
    for index in 0..read.value_count() {
        assert_eq!(read.get_object(index), source.get_object(index));
    }
}
