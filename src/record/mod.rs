//! # Records, Cursors and Sources
//!
//! The pull-based execution model every plan node implements.
//!
//! ## Contracts
//!
//! ```text
//! RecordSource (one per plan node, reused across executions)
//!     │ prepare_cursor(factory, cancel)      binds to fresh storage
//!     ▼
//! RecordCursor (one per execution, borrows its source)
//!     │ has_next() / next()                  forward iteration
//!     │ record_at(row_id)                    random access (if supported)
//!     ▼
//! &dyn Record (flyweight, valid until the cursor moves)
//!     get_int(col) / get_double(col) / get_flyweight_str(col) / ...
//! ```
//!
//! A cursor borrows its source mutably, so the borrow checker guarantees a
//! previous cursor is gone before `prepare_cursor` rebinds the source. The
//! record returned by `next` borrows the cursor, so it cannot outlive an
//! advance. Call [`RecordCursor::new_record`] and
//! [`RecordCursor::record_at_into`] for a detached copy.
//!
//! ## Errors
//!
//! Every cursor operation returns `eyre::Result`. Storage failures are
//! wrapped with context by the layer that observes them; cancellation is
//! raised as [`QueryCancelled`](crate::error::QueryCancelled) and must pass
//! through untouched.
//!
//! ## Typed Getters
//!
//! Records expose one getter per primitive type. Calling a getter a record
//! does not support is a programming error and panics with the record kind,
//! the getter and the column.

mod cancel;
mod comparator;
mod list;
mod owned;

pub use cancel::CancellationHandle;
pub use comparator::{ColumnComparator, RecordComparator, SortKey};
pub use list::{ListRecord, RecordList, NO_ENTRY};
pub use owned::{OwnedRecord, RowIdRecord};

use eyre::Result;

use crate::storage::{StorageFacade, StorageFactory};
use crate::types::{FlyweightStr, RecordMetadata, NULL_LEN};

#[cold]
#[track_caller]
pub(crate) fn unsupported(kind: &str, getter: &str, col: usize) -> ! {
    panic!("{} does not support {} on column {}", kind, getter, col)
}

/// A positional view over one logical row.
pub trait Record {
    /// Opaque row identifier, valid for `record_at` on the producing cursor.
    fn row_id(&self) -> i64;

    fn get_bool(&self, col: usize) -> bool {
        unsupported(std::any::type_name::<Self>(), "get_bool", col)
    }

    fn get_byte(&self, col: usize) -> i8 {
        unsupported(std::any::type_name::<Self>(), "get_byte", col)
    }

    fn get_short(&self, col: usize) -> i16 {
        unsupported(std::any::type_name::<Self>(), "get_short", col)
    }

    fn get_int(&self, col: usize) -> i32 {
        unsupported(std::any::type_name::<Self>(), "get_int", col)
    }

    fn get_long(&self, col: usize) -> i64 {
        unsupported(std::any::type_name::<Self>(), "get_long", col)
    }

    fn get_float(&self, col: usize) -> f32 {
        unsupported(std::any::type_name::<Self>(), "get_float", col)
    }

    fn get_double(&self, col: usize) -> f64 {
        unsupported(std::any::type_name::<Self>(), "get_double", col)
    }

    /// DATE and TIMESTAMP columns, epoch milliseconds.
    fn get_date(&self, col: usize) -> i64 {
        unsupported(std::any::type_name::<Self>(), "get_date", col)
    }

    /// STRING column view, `None` for null.
    fn get_flyweight_str(&self, col: usize) -> Option<FlyweightStr<'_>> {
        unsupported(std::any::type_name::<Self>(), "get_flyweight_str", col)
    }

    /// Second independent view of the same column, for comparing a column
    /// with itself across two records.
    fn get_flyweight_str_b(&self, col: usize) -> Option<FlyweightStr<'_>> {
        self.get_flyweight_str(col)
    }

    fn write_str(&self, col: usize, sink: &mut String) {
        if let Some(s) = self.get_flyweight_str(col) {
            s.write_to(sink);
        }
    }

    /// Character length, `NULL_LEN` for null.
    fn get_str_len(&self, col: usize) -> i32 {
        match self.get_flyweight_str(col) {
            Some(s) => s.len() as i32,
            None => NULL_LEN,
        }
    }

    fn get_sym(&self, col: usize) -> Option<&str> {
        unsupported(std::any::type_name::<Self>(), "get_sym", col)
    }

    fn get_bin(&self, col: usize) -> Option<&[u8]> {
        unsupported(std::any::type_name::<Self>(), "get_bin", col)
    }

    fn get_bin_len(&self, col: usize) -> i64 {
        self.get_bin(col).map_or(NULL_LEN as i64, |b| b.len() as i64)
    }
}

/// Iteration state of one bound execution of a [`RecordSource`].
pub trait RecordCursor {
    fn metadata(&self) -> &RecordMetadata;

    /// Symbol tables and other storage state for operator preparation.
    fn storage_facade(&self) -> &dyn StorageFacade;

    fn has_next(&mut self) -> Result<bool>;

    /// Advances and returns the flyweight record at the new position.
    fn next(&mut self) -> Result<&dyn Record>;

    /// The flyweight record at the last position set by `next` or `record_at`.
    fn record(&self) -> &dyn Record;

    /// Positions the flyweight record on `row_id` without moving iteration.
    fn record_at(&mut self, row_id: i64) -> Result<&dyn Record>;

    fn new_record(&self) -> OwnedRecord {
        OwnedRecord::new(self.metadata())
    }

    /// Copies the row at `row_id` into a detached record.
    fn record_at_into(&mut self, record: &mut OwnedRecord, row_id: i64) -> Result<()> {
        let source = self.record_at(row_id)?;
        record.copy_from(source);
        Ok(())
    }
}

/// A composable plan node producing records.
pub trait RecordSource {
    /// Output schema; identical before and after every rebind.
    fn metadata(&self) -> &RecordMetadata;

    /// Binds the node to fresh storage and resets internal buffers.
    fn prepare_cursor(
        &mut self,
        factory: &dyn StorageFactory,
        cancel: &CancellationHandle,
    ) -> Result<Box<dyn RecordCursor + '_>>;

    /// Whether cursors of this source honour `record_at`.
    fn supports_row_id_access(&self) -> bool;

    /// Releases owned buffers. Idempotent; closes inner sources too.
    fn close(&mut self) {}

    /// Diagnostic plan tree: `{"op": ..., "src": ...}`.
    fn plan(&self) -> serde_json::Value;
}

impl<T: RecordSource + ?Sized> RecordSource for Box<T> {
    fn metadata(&self) -> &RecordMetadata {
        (**self).metadata()
    }

    fn prepare_cursor(
        &mut self,
        factory: &dyn StorageFactory,
        cancel: &CancellationHandle,
    ) -> Result<Box<dyn RecordCursor + '_>> {
        (**self).prepare_cursor(factory, cancel)
    }

    fn supports_row_id_access(&self) -> bool {
        (**self).supports_row_id_access()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn plan(&self) -> serde_json::Value {
        (**self).plan()
    }
}
