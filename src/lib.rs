//! # ChronoDB - Query Execution Core
//!
//! The pull-based execution engine of an embedded time-series database:
//! record sources composed into plan trees, lazily evaluated virtual columns,
//! sorted materialization over a red-black tree arena, and analytic (window)
//! functions composited onto base records.
//!
//! ## Quick Start
//!
//! ```ignore
//! use chronodb::prelude::*;
//!
//! let storage = MemoryStorage::new();
//! storage.register(
//!     Journal::builder("quotes")
//!         .indexed_symbol("sym", 16)
//!         .double("bid")
//!         .timestamp("ts")
//!         .build()?,
//! );
//! storage.append("quotes", &[Value::sym("EUR"), Value::Double(1.08), Value::Timestamp(0)])?;
//!
//! let scan = JournalRecordSource::new(&storage, "quotes")?;
//! let cmp = ColumnComparator::by_names(scan.metadata(), &[("bid", true)])?;
//! let mut sorted = SortedRecordSource::new(Box::new(scan), Box::new(cmp), QueryConfig::default())?;
//!
//! let text = RecordPrinter::new().print(&mut sorted, &storage, &CancellationHandle::never())?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  execution: collect_rows / RecordPrinter      │
//! ├──────────────────────────────────────────────┤
//! │  sort │ analytic │ sources (filter, join, …)  │  RecordSource / RecordCursor
//! ├───────┴──────────┴───────────────────────────┤
//! │  ops: virtual columns (typed getters)         │
//! ├──────────────────────────────────────────────┤
//! │  record: Record, RecordList, comparators      │
//! ├──────────────────────────────────────────────┤
//! │  memory: page arena │ types: Value, metadata  │
//! ├──────────────────────────────────────────────┤
//! │  storage: StorageFactory + in-memory journals │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Execution Model
//!
//! A plan is built once and executed many times. Every execution calls
//! `prepare_cursor`, which rebinds the whole tree to fresh storage, resets
//! internal buffers and returns a cursor borrowing the plan. Execution is
//! single-threaded per query; cancellation is cooperative through a shared
//! [`CancellationHandle`](record::CancellationHandle).
//!
//! ## Module Overview
//!
//! - [`types`]: column types, the `Value` sum type, metadata
//! - [`record`]: record/cursor/source contracts, record list, comparators
//! - [`ops`]: virtual column operators and the function factory
//! - [`sources`]: journal scans, filters, projections, joins, latest-by
//! - [`sort`]: red-black tree materialization
//! - [`analytic`]: window functions
//! - [`execution`]: execution context and terminal consumers
//! - [`storage`]: storage collaborator traits and in-memory journals

#[macro_use]
mod macros;

pub mod analytic;
pub mod config;
pub mod error;
pub mod execution;
pub mod memory;
pub mod ops;
pub mod record;
pub mod sort;
pub mod sources;
pub mod storage;
pub mod types;

pub use error::{PlanError, QueryCancelled, StorageError};

/// Common imports for building and running plans.
pub mod prelude {
    pub use crate::analytic::{
        AnalyticFunction, AnalyticPass, AnalyticRecordSource, NextValueFunction,
        PrevValueFunction, RankFunction, RowNumberFunction,
    };
    pub use crate::config::QueryConfig;
    pub use crate::error::{PlanError, QueryCancelled, StorageError};
    pub use crate::execution::{collect_rows, ExecutionContext, RecordPrinter};
    pub use crate::ops::{FunctionFactory, VirtualColumn};
    pub use crate::record::{
        CancellationHandle, ColumnComparator, Record, RecordComparator, RecordCursor,
        RecordSource, SortKey,
    };
    pub use crate::sort::SortedRecordSource;
    pub use crate::sources::{
        with_filter, CrossJoinRecordSource, FilteredRecordSource, JournalRecordSource,
        LatestByValuesRecordSource, NoOpRecordSource, VirtualColumnRecordSource,
    };
    pub use crate::storage::{Journal, MemoryStorage, StorageFactory};
    pub use crate::types::{ColumnMetadata, ColumnType, RecordMetadata, Value};
}
