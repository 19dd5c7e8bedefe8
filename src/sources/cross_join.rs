//! Nested-loop cross join.

use eyre::{bail, Result};
use serde_json::json;
use tracing::debug;

use crate::error::PlanError;
use crate::record::{CancellationHandle, Record, RecordCursor, RecordSource};
use crate::storage::{NoStorage, StorageFacade, StorageFactory};
use crate::types::RecordMetadata;

/// Pairs every master row with every slave row. Master columns come first.
///
/// The slave is scanned once per binding to collect its row ids, then
/// replayed through `record_at` for each master row, so it must support
/// row-id access. Output order is master order, then slave order.
pub struct CrossJoinRecordSource {
    master: Box<dyn RecordSource>,
    slave: Box<dyn RecordSource>,
    metadata: RecordMetadata,
    slave_rows: Vec<i64>,
}

impl CrossJoinRecordSource {
    pub fn new(master: Box<dyn RecordSource>, slave: Box<dyn RecordSource>) -> Result<Self, PlanError> {
        if !slave.supports_row_id_access() {
            return Err(PlanError::RowIdAccessRequired {
                node: "CrossJoinRecordSource",
            });
        }
        let metadata = master.metadata().concat(slave.metadata());
        Ok(Self {
            master,
            slave,
            metadata,
            slave_rows: Vec::new(),
        })
    }
}

impl RecordSource for CrossJoinRecordSource {
    fn metadata(&self) -> &RecordMetadata {
        &self.metadata
    }

    fn prepare_cursor(
        &mut self,
        factory: &dyn StorageFactory,
        cancel: &CancellationHandle,
    ) -> Result<Box<dyn RecordCursor + '_>> {
        self.slave_rows.clear();
        let mut slave = self.slave.prepare_cursor(factory, cancel)?;
        while slave.has_next()? {
            cancel.check()?;
            self.slave_rows.push(slave.next()?.row_id());
        }
        let master = self.master.prepare_cursor(factory, cancel)?;
        debug!(slave_rows = self.slave_rows.len(), "cross join slave buffered");
        Ok(Box::new(CrossJoinCursor {
            split: master.metadata().column_count(),
            master,
            slave,
            slave_rows: &self.slave_rows,
            metadata: &self.metadata,
            master_ready: false,
            slave_pos: 0,
        }))
    }

    fn supports_row_id_access(&self) -> bool {
        false
    }

    fn close(&mut self) {
        self.slave_rows = Vec::new();
        self.master.close();
        self.slave.close();
    }

    fn plan(&self) -> serde_json::Value {
        json!({
            "op": "CrossJoinRecordSource",
            "master": self.master.plan(),
            "slave": self.slave.plan(),
        })
    }
}

struct CrossJoinCursor<'a> {
    master: Box<dyn RecordCursor + 'a>,
    slave: Box<dyn RecordCursor + 'a>,
    slave_rows: &'a [i64],
    metadata: &'a RecordMetadata,
    split: usize,
    /// The master cursor sits on a row with slave rows left to pair.
    master_ready: bool,
    slave_pos: usize,
}

split_record!(CrossJoinCursor<'_>, |self, idx| {
    split: self.split,
    base: self.master.record(),
    computed: self.slave.record(),
    args: (idx)
});

impl RecordCursor for CrossJoinCursor<'_> {
    fn metadata(&self) -> &RecordMetadata {
        self.metadata
    }

    /// Joined columns span two storages; operators cannot cache symbol keys.
    fn storage_facade(&self) -> &dyn StorageFacade {
        &NoStorage
    }

    fn has_next(&mut self) -> Result<bool> {
        loop {
            if self.master_ready && self.slave_pos < self.slave_rows.len() {
                return Ok(true);
            }
            if self.slave_rows.is_empty() || !self.master.has_next()? {
                return Ok(false);
            }
            self.master.next()?;
            self.master_ready = true;
            self.slave_pos = 0;
        }
    }

    fn next(&mut self) -> Result<&dyn Record> {
        if !self.has_next()? {
            bail!("cross join cursor advanced past its last row");
        }
        let row_id = self.slave_rows[self.slave_pos];
        self.slave_pos += 1;
        self.slave.record_at(row_id)?;
        Ok(self)
    }

    fn record(&self) -> &dyn Record {
        self
    }

    fn record_at(&mut self, _row_id: i64) -> Result<&dyn Record> {
        Err(PlanError::RowIdAccessRequired {
            node: "CrossJoinRecordSource",
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::quotes;
    use crate::sources::JournalRecordSource;
    use crate::storage::Journal;
    use crate::types::Value;

    fn with_venues() -> crate::storage::MemoryStorage {
        let storage = quotes();
        storage.register(Journal::builder("venues").string("venue").int("fee").build().unwrap());
        storage.append("venues", &[Value::str("LSE"), Value::Int(3)]).unwrap();
        storage.append("venues", &[Value::Null, Value::Int(7)]).unwrap();
        storage
    }

    #[test]
    fn pairs_every_master_row_with_every_slave_row() {
        let storage = with_venues();
        let mut join = CrossJoinRecordSource::new(
            Box::new(JournalRecordSource::new(&storage, "quotes").unwrap()),
            Box::new(JournalRecordSource::new(&storage, "venues").unwrap()),
        )
        .unwrap();
        assert_eq!(join.metadata().column_count(), 6);

        let mut cursor = join
            .prepare_cursor(&storage, &CancellationHandle::never())
            .unwrap();
        let mut rows = Vec::new();
        while cursor.has_next().unwrap() {
            let rec = cursor.next().unwrap();
            rows.push((
                rec.get_int(2),
                rec.get_flyweight_str(4).map(|s| s.to_string()),
                rec.get_int(5),
            ));
        }
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0], (10, Some("LSE".to_string()), 3));
        assert_eq!(rows[1], (10, None, 7));
        assert_eq!(rows[9], (50, None, 7));
    }

    #[test]
    fn empty_slave_yields_nothing() {
        let storage = quotes();
        storage.register(Journal::builder("venues").string("venue").build().unwrap());
        let mut join = CrossJoinRecordSource::new(
            Box::new(JournalRecordSource::new(&storage, "quotes").unwrap()),
            Box::new(JournalRecordSource::new(&storage, "venues").unwrap()),
        )
        .unwrap();
        let mut cursor = join
            .prepare_cursor(&storage, &CancellationHandle::never())
            .unwrap();
        assert!(!cursor.has_next().unwrap());
    }

    #[test]
    fn slave_without_row_ids_is_rejected() {
        let storage = with_venues();
        let slave = CrossJoinRecordSource::new(
            Box::new(JournalRecordSource::new(&storage, "quotes").unwrap()),
            Box::new(JournalRecordSource::new(&storage, "venues").unwrap()),
        )
        .unwrap();
        let err = CrossJoinRecordSource::new(
            Box::new(JournalRecordSource::new(&storage, "venues").unwrap()),
            Box::new(slave),
        )
        .err()
        .unwrap();
        assert_eq!(
            err,
            PlanError::RowIdAccessRequired {
                node: "CrossJoinRecordSource"
            }
        );
    }
}
