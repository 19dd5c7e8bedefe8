//! Sorting record source.

use eyre::{bail, eyre, Result};
use serde_json::json;
use tracing::debug;

use super::record_tree::{RecordTree, TreeWalk};
use crate::config::QueryConfig;
use crate::error::{is_cancellation, PlanError};
use crate::record::{
    CancellationHandle, ListRecord, Record, RecordComparator, RecordCursor, RecordSource,
    NO_ENTRY,
};
use crate::storage::{NoStorage, StorageFacade, StorageFactory};
use crate::types::RecordMetadata;

/// Emits the rows of `source` ordered by `comparator`, equal rows in source
/// order.
///
/// When the source supports row-id access the tree stores row ids only and
/// emission repositions the source cursor; otherwise it stores full record
/// copies. Every `prepare_cursor` clears the tree and bulk-loads it again.
/// A load that fails or is cancelled leaves the tree empty.
pub struct SortedRecordSource {
    source: Box<dyn RecordSource>,
    comparator: Box<dyn RecordComparator>,
    metadata: RecordMetadata,
    tree: RecordTree,
    by_row_id: bool,
}

impl SortedRecordSource {
    pub fn new(
        source: Box<dyn RecordSource>,
        comparator: Box<dyn RecordComparator>,
        config: QueryConfig,
    ) -> Result<Self, PlanError> {
        config.validate()?;
        let by_row_id = source.supports_row_id_access();
        let stored = if by_row_id {
            RecordMetadata::row_id()
        } else {
            source.metadata().clone()
        };
        let tree = RecordTree::new(&stored, config.key_page_size(), config.value_page_size());
        tree.list().check_fits()?;
        Ok(Self {
            tree,
            metadata: source.metadata().clone(),
            source,
            comparator,
            by_row_id,
        })
    }

    pub fn by_row_id(&self) -> bool {
        self.by_row_id
    }

    /// Tree built by the last `prepare_cursor`.
    pub fn tree(&self) -> &RecordTree {
        &self.tree
    }
}

fn load(
    tree: &mut RecordTree,
    cursor: &mut dyn RecordCursor,
    cmp: &mut dyn RecordComparator,
    by_row_id: bool,
    cancel: &CancellationHandle,
) -> Result<()> {
    while cursor.has_next()? {
        cancel.check()?;
        if by_row_id {
            let row_id = cursor.next()?.row_id();
            tree.put_row_id(row_id, cursor, cmp)?;
        } else {
            let rec = cursor.next()?;
            tree.put_record(rec, cmp)?;
        }
    }
    Ok(())
}

impl RecordSource for SortedRecordSource {
    fn metadata(&self) -> &RecordMetadata {
        &self.metadata
    }

    fn prepare_cursor(
        &mut self,
        factory: &dyn StorageFactory,
        cancel: &CancellationHandle,
    ) -> Result<Box<dyn RecordCursor + '_>> {
        self.tree.clear();
        let mut inner = self.source.prepare_cursor(factory, cancel)?;
        let loaded = load(
            &mut self.tree,
            &mut *inner,
            &mut *self.comparator,
            self.by_row_id,
            cancel,
        );
        if let Err(err) = loaded {
            self.tree.clear();
            if is_cancellation(&err) {
                debug!("sort load cancelled");
                return Err(err);
            }
            return Err(err.wrap_err("building sort tree"));
        }
        debug!(
            keys = self.tree.key_count(),
            bytes = self.tree.list().bytes_used(),
            by_row_id = self.by_row_id,
            "sort tree built"
        );

        let tree = &self.tree;
        if self.by_row_id {
            Ok(Box::new(RowIdSortCursor {
                walk: tree.walk(),
                tree,
                inner,
            }))
        } else {
            drop(inner);
            Ok(Box::new(CopySortCursor {
                walk: tree.walk(),
                tree,
                metadata: &self.metadata,
                current: tree.entry(NO_ENTRY),
            }))
        }
    }

    fn supports_row_id_access(&self) -> bool {
        true
    }

    fn close(&mut self) {
        self.tree.release();
        self.source.close();
    }

    fn plan(&self) -> serde_json::Value {
        json!({
            "op": "SortedRecordSource",
            "byRowId": self.by_row_id,
            "src": self.source.plan(),
        })
    }
}

/// Emits source rows by repositioning the source cursor. Row ids are the
/// source's.
struct RowIdSortCursor<'a> {
    walk: TreeWalk<'a>,
    tree: &'a RecordTree,
    inner: Box<dyn RecordCursor + 'a>,
}

impl RecordCursor for RowIdSortCursor<'_> {
    fn metadata(&self) -> &RecordMetadata {
        self.inner.metadata()
    }

    fn storage_facade(&self) -> &dyn StorageFacade {
        self.inner.storage_facade()
    }

    fn has_next(&mut self) -> Result<bool> {
        Ok(self.walk.has_next())
    }

    fn next(&mut self) -> Result<&dyn Record> {
        let addr = self
            .walk
            .advance()
            .ok_or_else(|| eyre!("sort cursor advanced past its last row"))?;
        let row_id = self.tree.list().get_long(addr, 0);
        self.inner.record_at(row_id)
    }

    fn record(&self) -> &dyn Record {
        self.inner.record()
    }

    fn record_at(&mut self, row_id: i64) -> Result<&dyn Record> {
        self.inner.record_at(row_id)
    }
}

/// Emits stored copies. Row ids are list addresses. Symbols were copied by
/// value, so there is no symbol table to expose.
struct CopySortCursor<'a> {
    walk: TreeWalk<'a>,
    tree: &'a RecordTree,
    metadata: &'a RecordMetadata,
    current: ListRecord<'a>,
}

impl RecordCursor for CopySortCursor<'_> {
    fn metadata(&self) -> &RecordMetadata {
        self.metadata
    }

    fn storage_facade(&self) -> &dyn StorageFacade {
        &NoStorage
    }

    fn has_next(&mut self) -> Result<bool> {
        Ok(self.walk.has_next())
    }

    fn next(&mut self) -> Result<&dyn Record> {
        let addr = self
            .walk
            .advance()
            .ok_or_else(|| eyre!("sort cursor advanced past its last row"))?;
        self.current = self.tree.entry(addr);
        Ok(&self.current)
    }

    fn record(&self) -> &dyn Record {
        &self.current
    }

    fn record_at(&mut self, row_id: i64) -> Result<&dyn Record> {
        if !self.tree.list().is_entry(row_id) {
            bail!("row id {} is not a sorted entry", row_id);
        }
        self.current = self.tree.entry(row_id);
        Ok(&self.current)
    }
}
