//! Empty result with the schema of a delegate source.

use eyre::{bail, Result};
use serde_json::json;
use tracing::trace;

use crate::record::{CancellationHandle, OwnedRecord, Record, RecordCursor, RecordSource};
use crate::storage::{StorageFacade, StorageFactory};
use crate::types::RecordMetadata;

/// Produces no rows. Everything except iteration is delegated: metadata,
/// row-id support, random access and detached records all behave as the
/// delegate's, so the node can stand in for a provably empty filter.
pub struct NoOpRecordSource {
    delegate: Box<dyn RecordSource>,
}

impl NoOpRecordSource {
    pub fn new(delegate: Box<dyn RecordSource>) -> Self {
        Self { delegate }
    }
}

impl RecordSource for NoOpRecordSource {
    fn metadata(&self) -> &RecordMetadata {
        self.delegate.metadata()
    }

    fn prepare_cursor(
        &mut self,
        factory: &dyn StorageFactory,
        cancel: &CancellationHandle,
    ) -> Result<Box<dyn RecordCursor + '_>> {
        let inner = self.delegate.prepare_cursor(factory, cancel)?;
        trace!("no-op source bound, emitting nothing");
        Ok(Box::new(NoOpCursor { inner }))
    }

    fn supports_row_id_access(&self) -> bool {
        self.delegate.supports_row_id_access()
    }

    fn close(&mut self) {
        self.delegate.close();
    }

    fn plan(&self) -> serde_json::Value {
        json!({ "op": "NoOpRecordSource", "src": self.delegate.plan() })
    }
}

struct NoOpCursor<'a> {
    inner: Box<dyn RecordCursor + 'a>,
}

impl RecordCursor for NoOpCursor<'_> {
    fn metadata(&self) -> &RecordMetadata {
        self.inner.metadata()
    }

    fn storage_facade(&self) -> &dyn StorageFacade {
        self.inner.storage_facade()
    }

    fn has_next(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn next(&mut self) -> Result<&dyn Record> {
        bail!("no-op cursor has no rows")
    }

    fn record(&self) -> &dyn Record {
        self.inner.record()
    }

    fn record_at(&mut self, row_id: i64) -> Result<&dyn Record> {
        self.inner.record_at(row_id)
    }

    fn new_record(&self) -> OwnedRecord {
        self.inner.new_record()
    }

    fn record_at_into(&mut self, record: &mut OwnedRecord, row_id: i64) -> Result<()> {
        self.inner.record_at_into(record, row_id)
    }
}
