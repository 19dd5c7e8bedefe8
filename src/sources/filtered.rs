//! Row filtering by a BOOLEAN virtual column.

use eyre::{bail, Result};
use serde_json::json;
use tracing::trace;

use super::NoOpRecordSource;
use crate::error::PlanError;
use crate::ops::{fold_if_constant, is_constant_false, is_constant_true, VirtualColumn};
use crate::record::{CancellationHandle, Record, RecordCursor, RecordSource};
use crate::storage::{StorageFacade, StorageFactory};
use crate::types::{ColumnType, RecordMetadata};

/// Yields the rows of `source` for which `filter` is true, in source order.
///
/// The filter is optimized once at construction. Unlike [`with_filter`] the
/// node is kept even when the filter folds to a constant.
pub struct FilteredRecordSource {
    source: Box<dyn RecordSource>,
    filter: Box<dyn VirtualColumn>,
}

impl FilteredRecordSource {
    pub fn new(
        source: Box<dyn RecordSource>,
        filter: Box<dyn VirtualColumn>,
    ) -> Result<Self, PlanError> {
        check_boolean(&*filter)?;
        let filter = fold_if_constant(filter.optimize());
        Ok(Self { source, filter })
    }
}

fn check_boolean(filter: &dyn VirtualColumn) -> Result<(), PlanError> {
    if filter.column_type() != ColumnType::Boolean {
        return Err(PlanError::TypeMismatch {
            column: "filter".to_string(),
            expected: "BOOLEAN",
            found: filter.column_type(),
        });
    }
    Ok(())
}

/// Wraps `source` in a filter after folding constants out of `filter`.
///
/// A filter folding to constant false yields a [`NoOpRecordSource`]; one
/// folding to constant true returns `source` unwrapped.
pub fn with_filter(
    source: Box<dyn RecordSource>,
    filter: Box<dyn VirtualColumn>,
) -> Result<Box<dyn RecordSource>, PlanError> {
    check_boolean(&*filter)?;
    let filter = fold_if_constant(filter.optimize());
    if is_constant_false(&*filter) {
        return Ok(Box::new(NoOpRecordSource::new(source)));
    }
    if is_constant_true(&*filter) {
        return Ok(source);
    }
    Ok(Box::new(FilteredRecordSource { source, filter }))
}

impl RecordSource for FilteredRecordSource {
    fn metadata(&self) -> &RecordMetadata {
        self.source.metadata()
    }

    fn prepare_cursor(
        &mut self,
        factory: &dyn StorageFactory,
        cancel: &CancellationHandle,
    ) -> Result<Box<dyn RecordCursor + '_>> {
        let inner = self.source.prepare_cursor(factory, cancel)?;
        self.filter.prepare(inner.storage_facade());
        trace!("filter rebound");
        Ok(Box::new(FilteredCursor {
            inner,
            filter: &*self.filter,
            ready: false,
        }))
    }

    fn supports_row_id_access(&self) -> bool {
        self.source.supports_row_id_access()
    }

    fn close(&mut self) {
        self.source.close();
    }

    fn plan(&self) -> serde_json::Value {
        json!({
            "op": "FilteredRecordSource",
            "filter": self.filter.plan(),
            "src": self.source.plan(),
        })
    }
}

struct FilteredCursor<'a> {
    inner: Box<dyn RecordCursor + 'a>,
    filter: &'a dyn VirtualColumn,
    /// The inner cursor sits on a row that passed the filter and has not
    /// been returned yet.
    ready: bool,
}

impl RecordCursor for FilteredCursor<'_> {
    fn metadata(&self) -> &RecordMetadata {
        self.inner.metadata()
    }

    fn storage_facade(&self) -> &dyn StorageFacade {
        self.inner.storage_facade()
    }

    fn has_next(&mut self) -> Result<bool> {
        if self.ready {
            return Ok(true);
        }
        while self.inner.has_next()? {
            let rec = self.inner.next()?;
            if self.filter.get_bool(rec) {
                self.ready = true;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn next(&mut self) -> Result<&dyn Record> {
        if !self.has_next()? {
            bail!("filtered cursor advanced past its last row");
        }
        self.ready = false;
        Ok(self.inner.record())
    }

    fn record(&self) -> &dyn Record {
        self.inner.record()
    }

    fn record_at(&mut self, row_id: i64) -> Result<&dyn Record> {
        self.inner.record_at(row_id)
    }
}
