//! Newest row per value of an indexed column.
//!
//! For each requested value the index bucket of that value is walked from
//! the newest row backwards:
//!
//! ```text
//! bucket("AUD") = [0, 2, 7, 9]     (oldest first, shared with collisions)
//!                           ◄──── walk
//! row 9: sym = "CHF"  -> collision, skip
//! row 7: sym = "AUD"  -> filter false, keep walking
//! row 2: sym = "AUD"  -> filter true, emit row 2
//! ```
//!
//! Collected rows are emitted in ascending row-id order.

use std::sync::Arc;

use eyre::{bail, Result, WrapErr};
use serde_json::json;
use tracing::debug;

use crate::error::{PlanError, StorageError};
use crate::ops::VirtualColumn;
use crate::record::{CancellationHandle, Record, RecordCursor, RecordSource};
use super::journal::check_schema;
use crate::storage::{JournalCursor, StorageFacade, StorageFactory};
use crate::types::{ColumnType, RecordMetadata};

pub struct LatestByValuesRecordSource {
    journal: String,
    metadata: RecordMetadata,
    column: usize,
    values: Vec<String>,
    filter: Option<Box<dyn VirtualColumn>>,
    rows: Vec<i64>,
}

impl LatestByValuesRecordSource {
    /// `column` must be an indexed STRING or SYMBOL column of `journal`; a
    /// filter, when present, must be BOOLEAN and is optimized once here.
    pub fn new(
        factory: &dyn StorageFactory,
        journal: impl Into<String>,
        column: &str,
        values: Vec<String>,
        filter: Option<Box<dyn VirtualColumn>>,
    ) -> Result<Self, PlanError> {
        let journal = journal.into();
        let metadata = factory.metadata(&journal)?;
        let index = metadata.column_index(column)?;
        let descriptor = metadata.column(index)?;
        if !descriptor.column_type().is_text() {
            return Err(PlanError::TypeMismatch {
                column: column.to_string(),
                expected: "STRING or SYMBOL",
                found: descriptor.column_type(),
            });
        }
        if !descriptor.is_indexed() {
            return Err(PlanError::InvalidConfig {
                setting: "latest by column",
                reason: format!("column '{}' is not indexed", column),
            });
        }
        let filter = match filter {
            Some(f) if f.column_type() != ColumnType::Boolean => {
                return Err(PlanError::TypeMismatch {
                    column: "filter".to_string(),
                    expected: "BOOLEAN",
                    found: f.column_type(),
                })
            }
            Some(f) => Some(f.optimize()),
            None => None,
        };
        Ok(Self {
            journal,
            metadata,
            column: index,
            values,
            filter,
            rows: Vec::new(),
        })
    }
}

fn column_equals(rec: &dyn Record, col: usize, column_type: ColumnType, value: &str) -> bool {
    match column_type {
        ColumnType::Symbol => rec.get_sym(col) == Some(value),
        _ => rec.get_flyweight_str(col).is_some_and(|s| s == value),
    }
}

impl RecordSource for LatestByValuesRecordSource {
    fn metadata(&self) -> &RecordMetadata {
        &self.metadata
    }

    fn prepare_cursor(
        &mut self,
        factory: &dyn StorageFactory,
        cancel: &CancellationHandle,
    ) -> Result<Box<dyn RecordCursor + '_>> {
        self.rows.clear();
        let journal = factory
            .journal(&self.journal)
            .ok_or_else(|| StorageError::JournalNotFound(self.journal.clone()))
            .wrap_err_with(|| format!("opening journal '{}'", self.journal))?;
        check_schema(&self.journal, &self.metadata, journal.metadata())?;
        // Index buckets and row reads come from the same snapshot.
        let mut cursor = JournalCursor::new(Arc::clone(&journal));
        if let Some(filter) = &mut self.filter {
            filter.prepare(cursor.storage_facade());
        }

        let column_type = self.metadata.column_type(self.column);
        for value in &self.values {
            cancel.check()?;
            let Some(bucket) = journal.index_bucket(self.column, value) else {
                continue;
            };
            for &row in bucket.iter().rev() {
                let rec = cursor
                    .record_at(row)
                    .wrap_err_with(|| format!("reading latest '{}' from '{}'", value, self.journal))?;
                if !column_equals(rec, self.column, column_type, value) {
                    continue;
                }
                if self.filter.as_ref().map_or(true, |f| f.get_bool(rec)) {
                    self.rows.push(row);
                    break;
                }
            }
        }
        self.rows.sort_unstable();
        self.rows.dedup();
        debug!(journal = %self.journal, rows = self.rows.len(), "latest rows resolved");

        Ok(Box::new(LatestCursor {
            inner: cursor,
            rows: &self.rows,
            pos: 0,
        }))
    }

    fn supports_row_id_access(&self) -> bool {
        true
    }

    fn close(&mut self) {
        self.rows = Vec::new();
    }

    fn plan(&self) -> serde_json::Value {
        json!({
            "op": "LatestByValuesRecordSource",
            "journal": self.journal,
            "column": self.metadata.columns()[self.column].name(),
            "values": self.values,
            "filter": self.filter.as_ref().map(|f| f.plan()),
        })
    }
}

struct LatestCursor<'a> {
    inner: JournalCursor,
    rows: &'a [i64],
    pos: usize,
}

impl RecordCursor for LatestCursor<'_> {
    fn metadata(&self) -> &RecordMetadata {
        self.inner.metadata()
    }

    fn storage_facade(&self) -> &dyn StorageFacade {
        self.inner.storage_facade()
    }

    fn has_next(&mut self) -> Result<bool> {
        Ok(self.pos < self.rows.len())
    }

    fn next(&mut self) -> Result<&dyn Record> {
        let Some(&row) = self.rows.get(self.pos) else {
            bail!("latest-by cursor advanced past its last row");
        };
        self.pos += 1;
        self.inner.record_at(row)
    }

    fn record(&self) -> &dyn Record {
        self.inner.record()
    }

    fn record_at(&mut self, row_id: i64) -> Result<&dyn Record> {
        self.inner.record_at(row_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{CompareOp, CompareOperator, Constant, RecordColumn};
    use crate::sources::testing::quotes;

    fn latest(
        storage: &crate::storage::MemoryStorage,
        values: &[&str],
        filter: Option<Box<dyn VirtualColumn>>,
    ) -> Vec<(i64, i32)> {
        let mut source = LatestByValuesRecordSource::new(
            storage,
            "quotes",
            "sym",
            values.iter().map(|v| v.to_string()).collect(),
            filter,
        )
        .unwrap();
        let mut cursor = source
            .prepare_cursor(storage, &CancellationHandle::never())
            .unwrap();
        let mut out = Vec::new();
        while cursor.has_next().unwrap() {
            let rec = cursor.next().unwrap();
            out.push((rec.row_id(), rec.get_int(2)));
        }
        out
    }

    #[test]
    fn picks_newest_row_per_value_in_row_order() {
        let storage = quotes();
        assert_eq!(latest(&storage, &["EUR", "AUD"], None), vec![(2, 30), (4, 50)]);
    }

    #[test]
    fn unknown_and_repeated_values_are_ignored() {
        let storage = quotes();
        assert_eq!(
            latest(&storage, &["GBP", "XYZ", "GBP"], None),
            vec![(3, 40)]
        );
    }

    #[test]
    fn filter_walks_to_older_rows() {
        let storage = quotes();
        let meta = storage.journal("quotes").unwrap().metadata().clone();
        let filter = CompareOperator::new(
            CompareOp::Lt,
            Box::new(RecordColumn::new(&meta, "qty").unwrap()),
            Box::new(Constant::int(25)),
        );
        assert_eq!(
            latest(&storage, &["AUD", "EUR"], Some(Box::new(filter))),
            vec![(0, 10), (1, 20)]
        );
    }

    #[test]
    fn rebind_resolves_against_the_current_snapshot() {
        let storage = quotes();
        let mut source = LatestByValuesRecordSource::new(
            &storage,
            "quotes",
            "sym",
            vec!["EUR".to_string()],
            None,
        )
        .unwrap();
        let cancel = CancellationHandle::never();
        {
            let mut cursor = source.prepare_cursor(&storage, &cancel).unwrap();
            assert_eq!(cursor.next().unwrap().get_int(2), 50);
        }
        storage
            .append(
                "quotes",
                &[
                    crate::types::Value::sym("EUR"),
                    crate::types::Value::Double(6.5),
                    crate::types::Value::Int(60),
                    crate::types::Value::Timestamp(6000),
                ],
            )
            .unwrap();
        let mut cursor = source.prepare_cursor(&storage, &cancel).unwrap();
        let rec = cursor.next().unwrap();
        assert_eq!((rec.row_id(), rec.get_int(2)), (5, 60));
        assert!(!cursor.has_next().unwrap());
    }

    #[test]
    fn schema_change_after_planning_is_detected() {
        let storage = quotes();
        let mut source = LatestByValuesRecordSource::new(
            &storage,
            "quotes",
            "sym",
            vec!["EUR".to_string()],
            None,
        )
        .unwrap();
        storage.register(
            crate::storage::Journal::builder("quotes")
                .indexed_symbol("sym", 4)
                .int("qty")
                .build()
                .unwrap(),
        );
        let err = source
            .prepare_cursor(&storage, &CancellationHandle::never())
            .err()
            .unwrap();
        assert_eq!(
            err.downcast_ref::<StorageError>(),
            Some(&StorageError::ReadFailed {
                journal: "quotes".to_string(),
                reason: "schema changed after planning".to_string(),
            })
        );
    }

    #[test]
    fn unindexed_column_is_rejected() {
        let storage = quotes();
        let err = LatestByValuesRecordSource::new(&storage, "quotes", "bid", vec![], None)
            .err()
            .unwrap();
        assert!(matches!(err, PlanError::TypeMismatch { found: ColumnType::Double, .. }));
    }
}
