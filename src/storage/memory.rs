//! Journal registry.

use std::sync::Arc;

use eyre::{Result, WrapErr};
use hashbrown::HashMap;
use parking_lot::RwLock;

use super::journal::{Journal, JournalCursor};
use super::StorageFactory;
use crate::error::{PlanError, StorageError};
use crate::record::RecordCursor;
use crate::types::{RecordMetadata, Value};

/// Named journals shared between writers and concurrent queries.
///
/// Readers get an `Arc<Journal>` snapshot. Appends go through
/// `Arc::make_mut`, which clones a journal only while a reader still holds
/// the previous snapshot.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    journals: RwLock<HashMap<String, Arc<Journal>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `journal`, replacing any journal with the same name.
    pub fn register(&self, journal: Journal) {
        self.journals
            .write()
            .insert(journal.name().to_string(), Arc::new(journal));
    }

    pub fn journal(&self, name: &str) -> Option<Arc<Journal>> {
        self.journals.read().get(name).cloned()
    }

    pub fn append(&self, name: &str, values: &[Value<'_>]) -> Result<()> {
        let mut journals = self.journals.write();
        let journal = journals
            .get_mut(name)
            .ok_or_else(|| StorageError::JournalNotFound(name.to_string()))?;
        Arc::make_mut(journal).append(values)?;
        Ok(())
    }

    /// Applies `f` to the writable journal `name`.
    pub fn update<F>(&self, name: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Journal) -> Result<()>,
    {
        let mut journals = self.journals.write();
        let journal = journals
            .get_mut(name)
            .ok_or_else(|| StorageError::JournalNotFound(name.to_string()))?;
        f(Arc::make_mut(journal)).wrap_err_with(|| format!("updating journal '{}'", name))
    }
}

impl StorageFactory for MemoryStorage {
    fn metadata(&self, journal: &str) -> Result<RecordMetadata, PlanError> {
        self.journal(journal)
            .map(|j| j.metadata().clone())
            .ok_or_else(|| PlanError::UnknownJournal(journal.to_string()))
    }

    fn open_cursor(&self, journal: &str) -> Result<Box<dyn RecordCursor>> {
        let journal = self
            .journal(journal)
            .ok_or_else(|| StorageError::JournalNotFound(journal.to_string()))?;
        Ok(Box::new(JournalCursor::new(journal)))
    }

    fn journal(&self, name: &str) -> Option<Arc<Journal>> {
        MemoryStorage::journal(self, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> MemoryStorage {
        let storage = MemoryStorage::new();
        storage.register(Journal::builder("trades").int("qty").build().unwrap());
        storage
    }

    #[test]
    fn open_cursor_snapshots_current_rows() {
        let storage = storage();
        storage.append("trades", &[Value::Int(1)]).unwrap();

        let mut cursor = storage.open_cursor("trades").unwrap();
        storage.append("trades", &[Value::Int(2)]).unwrap();

        let mut rows = 0;
        while cursor.has_next().unwrap() {
            cursor.next().unwrap();
            rows += 1;
        }
        assert_eq!(rows, 1);
        assert_eq!(storage.journal("trades").unwrap().row_count(), 2);
    }

    #[test]
    fn unknown_journal_errors() {
        let storage = storage();
        assert_eq!(
            storage.metadata("quotes").unwrap_err(),
            PlanError::UnknownJournal("quotes".into())
        );
        let err = storage.open_cursor("quotes").err().unwrap();
        assert_eq!(
            err.downcast_ref::<StorageError>(),
            Some(&StorageError::JournalNotFound("quotes".into()))
        );
    }

    #[test]
    fn update_wraps_failures_with_journal_name() {
        let storage = storage();
        let err = storage
            .update("trades", |j| {
                j.append(&[Value::str("x")])?;
                Ok(())
            })
            .unwrap_err();
        assert!(format!("{:?}", err).contains("updating journal 'trades'"));
        assert!(err.downcast_ref::<StorageError>().is_some());
    }
}
