use std::sync::Arc;

use arrow_array::{ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray};
use tempora::{
    AppendRelation, BufferAllocator, ColumnFactory, Error, ReadRelation, Value, copy_rel_from,
    row_copier, select,
};

fn batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
    RecordBatch::try_from_iter(columns).unwrap()
}

#[test]
fn select_materializes_the_chosen_rows() {
    let relation = ReadRelation::from_batch(&batch(vec![(
        "a",
        Arc::new(Int64Array::from(vec![10, 20, 30, 40])) as ArrayRef,
    )]))
    .unwrap();
    let allocator = BufferAllocator::unbounded();

    let selected = select(&relation, &allocator, &[3, 1, 1]).unwrap();
    assert_eq!(selected.row_count(), 3);
    let column = selected.column("a").unwrap();
    assert_eq!(column.get_object(0), Value::Long(40));
    assert_eq!(column.get_object(1), Value::Long(20));
    assert_eq!(column.get_object(2), Value::Long(20));

    // Selection is positional against the source, per column.
    let source = relation.column("a").unwrap();
    for (out_row, src_row) in [(0_usize, 3_usize), (1, 1), (2, 1)] {
        assert_eq!(column.get_object(out_row), source.get_object(src_row));
    }
}

#[test]
fn select_rejects_out_of_range_indices() {
    let relation = ReadRelation::from_batch(&batch(vec![(
        "a",
        Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef,
    )]))
    .unwrap();
    let allocator = BufferAllocator::unbounded();
    let err = select(&relation, &allocator, &[0, 2]).unwrap_err();
    assert!(matches!(
        err,
        Error::RowOutOfBounds { index: 2, count: 2 }
    ));
}

#[test]
fn copy_round_trips_a_wrapped_batch() {
    let relation = ReadRelation::from_batch(&batch(vec![(
        "x",
        Arc::new(Int64Array::from(vec![7, 8, 9])) as ArrayRef,
    )]))
    .unwrap();
    let allocator = BufferAllocator::unbounded();
    let mut fresh = AppendRelation::new(allocator, ColumnFactory::Fresh);

    copy_rel_from(&mut fresh, &relation, 0, relation.row_count()).unwrap();
    let copied = fresh.read().unwrap();
    assert_eq!(copied.row_count(), 3);
    let column = copied.column("x").unwrap();
    for index in 0..3 {
        assert_eq!(
            column.get_object(index),
            relation.column("x").unwrap().get_object(index)
        );
    }
}

#[test]
fn copy_honors_offset_and_length() {
    let relation = ReadRelation::from_batch(&batch(vec![(
        "x",
        Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5])) as ArrayRef,
    )]))
    .unwrap();
    let allocator = BufferAllocator::unbounded();
    let mut target = AppendRelation::new(allocator, ColumnFactory::Fresh);

    copy_rel_from(&mut target, &relation, 1, 3).unwrap();
    let copied = target.read().unwrap();
    assert_eq!(copied.row_count(), 3);
    let column = copied.column("x").unwrap();
    assert_eq!(column.get_long(0), 2);
    assert_eq!(column.get_long(2), 4);

    let err = copy_rel_from(&mut target, &relation, 4, 2).unwrap_err();
    assert!(matches!(err, Error::RowOutOfBounds { index: 6, count: 5 }));
}

#[test]
fn row_copier_appends_across_all_paired_columns() {
    let relation = ReadRelation::from_batch(&batch(vec![
        ("id", Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef),
        (
            "name",
            Arc::new(StringArray::from(vec!["ada", "brent", "cy"])) as ArrayRef,
        ),
    ]))
    .unwrap();
    let allocator = BufferAllocator::unbounded();
    let mut target = AppendRelation::new(allocator, ColumnFactory::Fresh);

    let mut copier = row_copier(&mut target, &relation).unwrap();
    copier.copy_row(2).unwrap();
    copier.copy_row(0).unwrap();
    drop(copier);

    let copied = target.read().unwrap();
    assert_eq!(copied.row_count(), 2);
    assert_eq!(copied.column("id").unwrap().get_long(0), 3);
    assert_eq!(
        copied.column("name").unwrap().get_object(1),
        Value::Str("ada".to_string())
    );
}

#[test]
fn append_relation_read_reports_shape_mismatch() {
    let allocator = BufferAllocator::unbounded();
    let mut relation = AppendRelation::new(allocator, ColumnFactory::Fresh);
    relation.append_column("a").unwrap().append_long(1).unwrap();
    relation.append_column("a").unwrap().append_long(2).unwrap();
    relation.append_column("b").unwrap().append_long(3).unwrap();

    let err = relation.read().unwrap_err();
    match err {
        Error::ShapeMismatch {
            column,
            expected,
            got,
        } => {
            assert_eq!(column, "b");
            assert_eq!(expected, 2);
            assert_eq!(got, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn append_column_returns_the_existing_column() {
    let allocator = BufferAllocator::unbounded();
    let mut relation = AppendRelation::new(allocator, ColumnFactory::Fresh);
    relation.append_column("a").unwrap().append_long(1).unwrap();
    relation.append_column("a").unwrap().append_long(2).unwrap();
    assert_eq!(relation.columns().len(), 1);
    assert_eq!(relation.read().unwrap().row_count(), 2);
}

#[test]
fn projection_is_cheap_and_validates_names() {
    let relation = ReadRelation::from_batch(&batch(vec![
        ("a", Arc::new(Int64Array::from(vec![1])) as ArrayRef),
        ("b", Arc::new(Float64Array::from(vec![0.5])) as ArrayRef),
    ]))
    .unwrap();

    let projected = relation.project(&["b"]).unwrap();
    assert_eq!(projected.row_count(), 1);
    assert_eq!(projected.columns().len(), 1);
    assert_eq!(projected.column("b").unwrap().get_double(0), 0.5);

    let err = relation.project(&["missing"]).unwrap_err();
    assert!(matches!(err, Error::ColumnNotFound { name } if name == "missing"));
}

#[test]
fn clones_share_backing_and_drop_independently() {
    let relation = ReadRelation::from_batch(&batch(vec![(
        "x",
        Arc::new(Int64Array::from(vec![7, 8, 9])) as ArrayRef,
    )]))
    .unwrap();
    let clone = relation.clone();
    let renamed = relation.column("x").unwrap().rename("y");
    drop(relation);

    // Readers outlive the dropped view; releasing twice is unrepresentable.
    assert_eq!(clone.column("x").unwrap().get_long(1), 8);
    assert_eq!(renamed.get_long(2), 9);
    drop(clone);
    assert_eq!(renamed.get_long(0), 7);
}

#[test]
fn indirect_relations_select_without_copying_buffers() {
    let source = ReadRelation::from_batch(&batch(vec![(
        "a",
        Arc::new(Int64Array::from((0..1024).collect::<Vec<i64>>())) as ArrayRef,
    )]))
    .unwrap();
    // A budget far below the source payload still admits the selection,
    // because indirect columns record (vector, row) pairs only.
    let allocator = BufferAllocator::with_budget(4096);
    let selected = select(&source, &allocator, &[1023, 0]).unwrap();
    assert_eq!(selected.row_count(), 2);
    assert_eq!(selected.column("a").unwrap().get_long(0), 1023);
}
