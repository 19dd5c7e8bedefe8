//! # Execution
//!
//! Terminal consumers driving a plan to completion:
//!
//! - [`ExecutionContext`]: per-execution scratch (arena, cancellation handle,
//!   sizing) created once per worker and reset between queries.
//! - [`collect_rows`]: materializes every row into the context's arena.
//! - [`RecordPrinter`]: renders rows as tab-separated text.

mod context;
mod printer;

pub use context::{collect_rows, ExecutionContext, ResultRow};
pub use printer::{format_timestamp, RecordPrinter};
