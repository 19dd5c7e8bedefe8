//! # Storage Collaborator
//!
//! The execution core consumes storage through two narrow traits:
//!
//! - [`StorageFactory`]: resolves a journal name to its metadata and opens a
//!   fresh cursor over it. Passed to every `prepare_cursor` call.
//! - [`StorageFacade`]: per-cursor access to storage state operators may
//!   cache during `prepare`, currently symbol tables.
//!
//! [`MemoryStorage`] is the in-memory implementation: columnar journals with
//! symbol dictionaries and optional bucketed value indexes.

mod journal;
mod memory;
mod symbol;

use std::sync::Arc;

use eyre::Result;

use crate::error::PlanError;
use crate::record::RecordCursor;
use crate::types::RecordMetadata;

pub use journal::{bounded_hash, Journal, JournalBuilder, JournalCursor};
pub use memory::MemoryStorage;
pub use symbol::{SymbolTable, VALUE_IS_NULL, VALUE_NOT_FOUND};

pub trait StorageFactory {
    fn metadata(&self, journal: &str) -> Result<RecordMetadata, PlanError>;

    fn open_cursor(&self, journal: &str) -> Result<Box<dyn RecordCursor>>;

    /// Direct journal access for index-driven sources.
    fn journal(&self, name: &str) -> Option<Arc<Journal>>;
}

pub trait StorageFacade {
    fn symbol_table(&self, col: usize) -> Option<&SymbolTable>;
}

/// Facade for cursors not backed by storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStorage;

impl StorageFacade for NoStorage {
    fn symbol_table(&self, _col: usize) -> Option<&SymbolTable> {
        None
    }
}
