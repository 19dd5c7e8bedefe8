//! # Source Composition Test Suite
//!
//! Full query plans assembled from public building blocks and executed
//! against an in-memory journal: filter, computed columns, ordering, output.
//!
//! ## Test Categories
//!
//! 1. **Pipelines**: filter -> virtual columns -> sort -> printer
//! 2. **Latest By**: newest row per key, optionally filtered
//! 3. **Materialization**: arena-backed row collection
//! 4. **Failures**: storage faults and cancellation crossing node boundaries
//!
//! ## Usage
//!
//! ```sh
//! cargo test --test composition
//! ```

use chronodb::execution::format_timestamp;
use chronodb::ops::{AndOperator, Constant};
use chronodb::prelude::*;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn quotes() -> MemoryStorage {
    let storage = MemoryStorage::new();
    storage.register(
        Journal::builder("quotes")
            .indexed_symbol("sym", 4)
            .double("bid")
            .int("qty")
            .timestamp("ts")
            .build()
            .unwrap(),
    );
    let rows = [
        ("AUD", 1.5, 10),
        ("EUR", 2.5, 20),
        ("AUD", 3.5, 30),
        ("GBP", 4.5, 40),
        ("EUR", 5.5, 50),
    ];
    for (i, (sym, bid, qty)) in rows.into_iter().enumerate() {
        storage
            .append(
                "quotes",
                &[
                    Value::sym(sym),
                    Value::Double(bid),
                    Value::Int(qty),
                    Value::Timestamp((i as i64 + 1) * 1000),
                ],
            )
            .unwrap();
    }
    storage
}

fn qty_above(meta: &RecordMetadata, min: i32) -> Box<dyn VirtualColumn> {
    let f = FunctionFactory::new();
    f.create(">", vec![f.column(meta, "qty").unwrap(), Box::new(Constant::int(min))], meta)
        .unwrap()
}

/// `quotes where qty > 15`, plus `label = sym + ' desk'` and
/// `notional = bid + qty`, ordered by notional descending.
fn desk_report(storage: &MemoryStorage) -> SortedRecordSource {
    let f = FunctionFactory::new();
    let scan: Box<dyn RecordSource> = Box::new(JournalRecordSource::new(storage, "quotes").unwrap());
    let meta = scan.metadata().clone();
    let filtered = with_filter(scan, qty_above(&meta, 15)).unwrap();

    let label = f
        .create(
            "+",
            vec![f.column(&meta, "sym").unwrap(), Box::new(Constant::str(" desk"))],
            &meta,
        )
        .unwrap();
    let notional = f
        .create(
            "+",
            vec![f.column(&meta, "bid").unwrap(), f.column(&meta, "qty").unwrap()],
            &meta,
        )
        .unwrap();
    let computed = VirtualColumnRecordSource::new(
        filtered,
        vec![("label".to_string(), label), ("notional".to_string(), notional)],
    )
    .unwrap();

    let cmp = ColumnComparator::by_names(computed.metadata(), &[("notional", true)]).unwrap();
    SortedRecordSource::new(Box::new(computed), Box::new(cmp), QueryConfig::default()).unwrap()
}

fn print(source: &mut dyn RecordSource, storage: &MemoryStorage) -> String {
    RecordPrinter::new()
        .print(source, storage, &CancellationHandle::never())
        .unwrap()
}

// ============================================================================
// PIPELINE TESTS
// ============================================================================

mod pipelines {
    use super::*;

    #[test]
    fn filter_compute_sort_print() {
        let storage = quotes();
        let mut report = desk_report(&storage);
        assert!(report.by_row_id());

        let expected = "\
sym\tbid\tqty\tts\tlabel\tnotional
EUR\t5.5\t50\t1970-01-01T00:00:05.000Z\tEUR desk\t55.5
GBP\t4.5\t40\t1970-01-01T00:00:04.000Z\tGBP desk\t44.5
AUD\t3.5\t30\t1970-01-01T00:00:03.000Z\tAUD desk\t33.5
EUR\t2.5\t20\t1970-01-01T00:00:02.000Z\tEUR desk\t22.5
";
        assert_eq!(print(&mut report, &storage), expected);
    }

    #[test]
    fn plan_reflects_the_tree() {
        let storage = quotes();
        let report = desk_report(&storage);
        let plan = report.plan();
        assert_eq!(plan["op"], "SortedRecordSource");
        assert_eq!(plan["src"]["op"], "VirtualColumnRecordSource");
        assert_eq!(plan["src"]["columns"].as_array().map(Vec::len), Some(2));
        assert_eq!(plan["src"]["src"]["op"], "FilteredRecordSource");
        assert_eq!(plan["src"]["src"]["src"]["op"], "JournalRecordSource");
    }

    #[test]
    fn re_execution_sees_new_rows() {
        let storage = quotes();
        let mut report = desk_report(&storage);
        assert_eq!(print(&mut report, &storage).lines().count(), 5);

        storage
            .append(
                "quotes",
                &[Value::sym("JPY"), Value::Double(0.5), Value::Int(99), Value::Timestamp(6000)],
            )
            .unwrap();
        let out = print(&mut report, &storage);
        assert_eq!(out.lines().count(), 6);
        assert!(out.lines().nth(1).unwrap().starts_with("JPY\t0.5\t99\t"));
    }

    #[test]
    fn constant_false_filter_prints_only_the_header() {
        let storage = quotes();
        let scan: Box<dyn RecordSource> =
            Box::new(JournalRecordSource::new(&storage, "quotes").unwrap());
        let meta = scan.metadata().clone();
        let never = Box::new(AndOperator::new(
            qty_above(&meta, 0),
            Box::new(Constant::bool(false)),
        ));
        let mut source = with_filter(scan, never).unwrap();
        assert_eq!(source.plan()["op"], "NoOpRecordSource");
        assert_eq!(print(&mut *source, &storage), "sym\tbid\tqty\tts\n");
    }

    #[test]
    fn cross_join_then_filter() {
        let storage = quotes();
        let master: Box<dyn RecordSource> =
            Box::new(JournalRecordSource::new(&storage, "quotes").unwrap());
        let slave: Box<dyn RecordSource> =
            Box::new(JournalRecordSource::new(&storage, "quotes").unwrap());
        let join = CrossJoinRecordSource::new(master, slave).unwrap();
        let meta = join.metadata().clone();

        let f = FunctionFactory::new();
        // AUD and EUR pair up four ways each, GBP once
        let same_sym = f
            .create(
                "=",
                vec![
                    Box::new(chronodb::ops::RecordColumn::at(&meta, 0).unwrap()),
                    Box::new(chronodb::ops::RecordColumn::at(&meta, 4).unwrap()),
                ],
                &meta,
            )
            .unwrap();
        let mut source = with_filter(Box::new(join), same_sym).unwrap();
        let out = RecordPrinter::new()
            .with_header(false)
            .print(&mut *source, &storage, &CancellationHandle::never())
            .unwrap();
        assert_eq!(out.lines().count(), 9);
    }
}

// ============================================================================
// LATEST BY TESTS
// ============================================================================

mod latest_by {
    use super::*;

    #[test]
    fn newest_row_per_value_in_row_order() {
        let storage = quotes();
        let mut latest = LatestByValuesRecordSource::new(
            &storage,
            "quotes",
            "sym",
            vec!["EUR".to_string(), "AUD".to_string(), "JPY".to_string()],
            None,
        )
        .unwrap();
        let out = RecordPrinter::new()
            .with_header(false)
            .print(&mut latest, &storage, &CancellationHandle::never())
            .unwrap();
        assert_eq!(
            out,
            format!(
                "AUD\t3.5\t30\t{}\nEUR\t5.5\t50\t{}\n",
                format_timestamp(3000),
                format_timestamp(5000)
            )
        );
    }

    #[test]
    fn filter_skips_to_older_rows() {
        let storage = quotes();
        let meta = storage.metadata("quotes").unwrap();
        let f = FunctionFactory::new();
        let small = f
            .create("<", vec![f.column(&meta, "qty").unwrap(), Box::new(Constant::int(25))], &meta)
            .unwrap();
        let latest = LatestByValuesRecordSource::new(
            &storage,
            "quotes",
            "sym",
            vec!["EUR".to_string(), "AUD".to_string(), "GBP".to_string()],
            Some(small),
        )
        .unwrap();

        let cmp = ColumnComparator::by_names(latest.metadata(), &[("qty", true)]).unwrap();
        let mut sorted =
            SortedRecordSource::new(Box::new(latest), Box::new(cmp), QueryConfig::default())
                .unwrap();
        let ctx = ExecutionContext::default();
        let rows = collect_rows(&ctx, &mut sorted, &storage).unwrap();
        let qty: Vec<_> = rows.iter().map(|r| r.get(2).cloned()).collect();
        assert_eq!(qty, vec![Some(Value::Int(20)), Some(Value::Int(10))]);
    }

    #[test]
    fn column_must_be_indexed_text() {
        let storage = quotes();
        let err = LatestByValuesRecordSource::new(&storage, "quotes", "qty", vec![], None)
            .err()
            .unwrap();
        assert!(matches!(err, PlanError::TypeMismatch { .. }));

        let plain = MemoryStorage::new();
        plain.register(Journal::builder("t").symbol("sym").build().unwrap());
        let err = LatestByValuesRecordSource::new(&plain, "t", "sym", vec![], None)
            .err()
            .unwrap();
        assert!(matches!(err, PlanError::InvalidConfig { .. }));
    }
}

// ============================================================================
// MATERIALIZATION TESTS
// ============================================================================

mod materialization {
    use super::*;

    #[test]
    fn rows_outlive_the_cursor() {
        let storage = quotes();
        let mut report = desk_report(&storage);
        let mut ctx = ExecutionContext::default();
        {
            let rows = collect_rows(&ctx, &mut report, &storage).unwrap();
            assert_eq!(rows.len(), 4);
            assert_eq!(rows[0].get(4), Some(&Value::str("EUR desk")));
            assert_eq!(rows[0].get(5), Some(&Value::Double(55.5)));
            assert_eq!(rows[3].get(3), Some(&Value::Timestamp(2000)));
        }
        assert!(ctx.allocated_bytes() > 0);
        ctx.reset();
        let rows = collect_rows(&ctx, &mut report, &storage).unwrap();
        assert_eq!(rows.len(), 4);
    }
}

// ============================================================================
// FAILURE TESTS
// ============================================================================

mod failures {
    use super::*;

    #[test]
    fn storage_fault_surfaces_through_the_pipeline() {
        let storage = quotes();
        let mut report = desk_report(&storage);
        storage
            .update("quotes", |j| {
                j.set_read_fault(Some(3));
                Ok(())
            })
            .unwrap();

        let err = report
            .prepare_cursor(&storage, &CancellationHandle::never())
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "building sort tree");
        match err.downcast_ref::<StorageError>() {
            Some(StorageError::ReadFailed { journal, .. }) => assert_eq!(journal, "quotes"),
            other => panic!("unexpected cause {:?}", other),
        }
    }

    #[test]
    fn unknown_journal_fails_at_bind() {
        let storage = quotes();
        let mut scan = JournalRecordSource::new(&storage, "quotes").unwrap();
        let empty = MemoryStorage::new();
        let err = scan
            .prepare_cursor(&empty, &CancellationHandle::never())
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "opening journal 'quotes'");
    }

    #[test]
    fn cancelled_context_aborts_collection() {
        let storage = quotes();
        let cancel = CancellationHandle::new();
        cancel.cancel();
        let ctx = ExecutionContext::default().with_cancellation(cancel);
        let mut report = desk_report(&storage);
        let err = collect_rows(&ctx, &mut report, &storage).err().unwrap();
        assert!(chronodb::error::is_cancellation(&err));
    }
}
