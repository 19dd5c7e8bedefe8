//! Computed columns appended to an inner source.

use eyre::Result;
use serde_json::json;
use tracing::trace;

use crate::error::PlanError;
use crate::ops::VirtualColumn;
use crate::record::{CancellationHandle, Record, RecordCursor, RecordSource};
use crate::storage::{StorageFacade, StorageFactory};
use crate::types::{ColumnMetadata, RecordMetadata};

/// Projects the inner source's columns followed by one column per virtual
/// column. Computed values are evaluated on each getter call against the
/// inner record and never materialized.
pub struct VirtualColumnRecordSource {
    source: Box<dyn RecordSource>,
    columns: Vec<Box<dyn VirtualColumn>>,
    metadata: RecordMetadata,
    split: usize,
}

impl VirtualColumnRecordSource {
    /// Each column is optimized once here.
    pub fn new(
        source: Box<dyn RecordSource>,
        columns: Vec<(String, Box<dyn VirtualColumn>)>,
    ) -> Result<Self, PlanError> {
        let split = source.metadata().column_count();
        let mut computed = Vec::with_capacity(columns.len());
        let mut extra = Vec::with_capacity(columns.len());
        for (name, column) in columns {
            if source.metadata().column_index_quiet(&name).is_some()
                || extra.iter().any(|c: &ColumnMetadata| c.name().eq_ignore_ascii_case(&name))
            {
                return Err(PlanError::DuplicateColumn(name));
            }
            let column = column.optimize();
            extra.push(ColumnMetadata::new(name, column.column_type()));
            computed.push(column);
        }
        let metadata = source.metadata().concat(&RecordMetadata::new(extra));
        Ok(Self {
            source,
            columns: computed,
            metadata,
            split,
        })
    }
}

impl RecordSource for VirtualColumnRecordSource {
    fn metadata(&self) -> &RecordMetadata {
        &self.metadata
    }

    fn prepare_cursor(
        &mut self,
        factory: &dyn StorageFactory,
        cancel: &CancellationHandle,
    ) -> Result<Box<dyn RecordCursor + '_>> {
        let inner = self.source.prepare_cursor(factory, cancel)?;
        for column in &mut self.columns {
            column.prepare(inner.storage_facade());
        }
        trace!(columns = self.columns.len(), "virtual columns rebound");
        Ok(Box::new(VirtualColumnCursor {
            inner,
            columns: &self.columns,
            metadata: &self.metadata,
            split: self.split,
        }))
    }

    fn supports_row_id_access(&self) -> bool {
        self.source.supports_row_id_access()
    }

    fn close(&mut self) {
        self.source.close();
    }

    fn plan(&self) -> serde_json::Value {
        let columns: Vec<_> = self.columns.iter().map(|c| c.plan()).collect();
        json!({
            "op": "VirtualColumnRecordSource",
            "columns": columns,
            "src": self.source.plan(),
        })
    }
}

struct VirtualColumnCursor<'a> {
    inner: Box<dyn RecordCursor + 'a>,
    columns: &'a [Box<dyn VirtualColumn>],
    metadata: &'a RecordMetadata,
    split: usize,
}

split_record!(VirtualColumnCursor<'_>, |self, idx| {
    split: self.split,
    base: self.inner.record(),
    computed: self.columns[idx],
    args: (self.inner.record())
});

impl RecordCursor for VirtualColumnCursor<'_> {
    fn metadata(&self) -> &RecordMetadata {
        self.metadata
    }

    fn storage_facade(&self) -> &dyn StorageFacade {
        self.inner.storage_facade()
    }

    fn has_next(&mut self) -> Result<bool> {
        self.inner.has_next()
    }

    fn next(&mut self) -> Result<&dyn Record> {
        self.inner.next()?;
        Ok(self)
    }

    fn record(&self) -> &dyn Record {
        self
    }

    fn record_at(&mut self, row_id: i64) -> Result<&dyn Record> {
        self.inner.record_at(row_id)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{AddOperator, Constant, RecordColumn, StrConcatOperator};
    use crate::sources::testing::quotes;
    use crate::sources::JournalRecordSource;
    use crate::types::ColumnType;

    fn projected() -> (crate::storage::MemoryStorage, VirtualColumnRecordSource) {
        let storage = quotes();
        let scan = JournalRecordSource::new(&storage, "quotes").unwrap();
        let meta = scan.metadata().clone();
        let qty_plus = AddOperator::new(
            Box::new(RecordColumn::new(&meta, "qty").unwrap()),
            Box::new(Constant::int(1)),
        )
        .unwrap();
        let label = StrConcatOperator::new(
            Box::new(RecordColumn::new(&meta, "sym").unwrap()),
            Box::new(Constant::str("/USD")),
        )
        .unwrap();
        let source = VirtualColumnRecordSource::new(
            Box::new(scan),
            vec![
                ("qty1".to_string(), Box::new(qty_plus) as Box<dyn VirtualColumn>),
                ("pair".to_string(), Box::new(label) as Box<dyn VirtualColumn>),
            ],
        )
        .unwrap();
        (storage, source)
    }

    #[test]
    fn metadata_appends_computed_columns() {
        let (_, source) = projected();
        let meta = source.metadata();
        assert_eq!(meta.column_count(), 6);
        assert_eq!(meta.column_index("qty1").unwrap(), 4);
        assert_eq!(meta.column_type(4), ColumnType::Int);
        assert_eq!(meta.column_type(5), ColumnType::String);
    }

    #[test]
    fn computed_columns_follow_the_base_record() {
        let (storage, mut source) = projected();
        let mut cursor = source
            .prepare_cursor(&storage, &CancellationHandle::never())
            .unwrap();
        let mut rows = Vec::new();
        while cursor.has_next().unwrap() {
            let rec = cursor.next().unwrap();
            let mut pair = String::new();
            rec.write_str(5, &mut pair);
            rows.push((rec.get_int(2), rec.get_int(4), pair));
        }
        assert_eq!(rows[0], (10, 11, "AUD/USD".to_string()));
        assert_eq!(rows[3], (40, 41, "GBP/USD".to_string()));
        assert_eq!(rows.len(), 5);
    }

    #[test]
    fn random_access_repositions_computed_columns() {
        let (storage, mut source) = projected();
        let mut cursor = source
            .prepare_cursor(&storage, &CancellationHandle::never())
            .unwrap();
        let rec = cursor.record_at(4).unwrap();
        assert_eq!(rec.get_int(4), 51);
        assert_eq!(rec.get_str_len(5), 7);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let storage = quotes();
        let scan = JournalRecordSource::new(&storage, "quotes").unwrap();
        let err = VirtualColumnRecordSource::new(
            Box::new(scan),
            vec![("QTY".to_string(), Box::new(Constant::int(1)) as Box<dyn VirtualColumn>)],
        )
        .err()
        .unwrap();
        assert_eq!(err, PlanError::DuplicateColumn("QTY".to_string()));
    }
}
