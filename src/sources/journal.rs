//! Full scan of a named journal.

use eyre::{Result, WrapErr};
use serde_json::json;
use tracing::debug;

use crate::error::{PlanError, StorageError};
use crate::record::{CancellationHandle, RecordCursor, RecordSource};
use crate::storage::StorageFactory;
use crate::types::RecordMetadata;

/// Yields every row of a journal in append order. Metadata is resolved once
/// at construction; each `prepare_cursor` opens a fresh snapshot.
pub struct JournalRecordSource {
    journal: String,
    metadata: RecordMetadata,
}

impl JournalRecordSource {
    pub fn new(factory: &dyn StorageFactory, journal: impl Into<String>) -> Result<Self, PlanError> {
        let journal = journal.into();
        let metadata = factory.metadata(&journal)?;
        Ok(Self { journal, metadata })
    }

    pub fn journal(&self) -> &str {
        &self.journal
    }
}

/// Fails with `ReadFailed` when the journal schema no longer matches the
/// one captured at planning.
pub(crate) fn check_schema(
    journal: &str,
    planned: &RecordMetadata,
    current: &RecordMetadata,
) -> Result<(), StorageError> {
    if current != planned {
        return Err(StorageError::ReadFailed {
            journal: journal.to_string(),
            reason: "schema changed after planning".to_string(),
        });
    }
    Ok(())
}

impl RecordSource for JournalRecordSource {
    fn metadata(&self) -> &RecordMetadata {
        &self.metadata
    }

    fn prepare_cursor(
        &mut self,
        factory: &dyn StorageFactory,
        _cancel: &CancellationHandle,
    ) -> Result<Box<dyn RecordCursor + '_>> {
        let cursor = factory
            .open_cursor(&self.journal)
            .wrap_err_with(|| format!("opening journal '{}'", self.journal))?;
        check_schema(&self.journal, &self.metadata, cursor.metadata())?;
        debug!(journal = %self.journal, "journal cursor opened");
        Ok(cursor)
    }

    fn supports_row_id_access(&self) -> bool {
        true
    }

    fn plan(&self) -> serde_json::Value {
        json!({ "op": "JournalRecordSource", "journal": self.journal })
    }
}
