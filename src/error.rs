//! # Error Taxonomy
//!
//! Query execution distinguishes four kinds of failure:
//!
//! | Kind               | Type              | Raised                          |
//! |--------------------|-------------------|---------------------------------|
//! | Configuration      | [`PlanError`]     | before the first row is read    |
//! | Storage access     | [`StorageError`]  | mid-cursor, wrapped with context|
//! | Cancellation       | [`QueryCancelled`]| at a cancellation check point   |
//! | Evaluation misuse  | panic             | wrong typed getter called       |
//!
//! Every cursor operation returns `eyre::Result`, so the typed causes travel
//! inside an `eyre::Report` through arbitrary nesting. Wrapping layers add
//! context with `wrap_err`; the outermost boundary recovers the cause with
//! `Report::downcast_ref`.

use thiserror::Error;

use crate::types::ColumnType;

/// Malformed plan or schema detected before execution starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("column index {index} out of range for {count} columns")]
    ColumnOutOfRange { index: usize, count: usize },

    #[error("type mismatch for '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: ColumnType,
    },

    #[error("unknown function '{name}' for argument types ({args})")]
    UnknownFunction { name: String, args: String },

    #[error("{node} requires a source with row id access")]
    RowIdAccessRequired { node: &'static str },

    #[error("record of {size} bytes does not fit in a {page_size} byte page")]
    RecordTooLarge { size: usize, page_size: usize },

    #[error("invalid {setting}: {reason}")]
    InvalidConfig { setting: &'static str, reason: String },

    #[error("journal '{0}' is not defined")]
    UnknownJournal(String),

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),
}

/// Failure reported by the storage collaborator while a cursor is active.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("journal '{0}' not found")]
    JournalNotFound(String),

    #[error("row id {row_id} out of range in '{journal}' ({rows} rows)")]
    RowOutOfRange {
        journal: String,
        row_id: i64,
        rows: usize,
    },

    #[error("read failed in '{journal}': {reason}")]
    ReadFailed { journal: String, reason: String },

    #[error("append to '{journal}' rejected: {reason}")]
    AppendRejected { journal: String, reason: String },
}

/// Cooperative abort requested through a
/// [`CancellationHandle`](crate::record::CancellationHandle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("query cancelled")]
pub struct QueryCancelled;

/// True when the report was raised by a cancellation check, at any wrapping depth.
pub fn is_cancellation(report: &eyre::Report) -> bool {
    report.downcast_ref::<QueryCancelled>().is_some()
}
