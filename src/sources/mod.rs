//! # Record Sources
//!
//! Composable plan nodes implementing [`RecordSource`]:
//!
//! | Source                         | Produces                                  | Row ids |
//! |--------------------------------|-------------------------------------------|---------|
//! | [`JournalRecordSource`]        | every row of a journal, append order      | yes     |
//! | [`FilteredRecordSource`]       | inner rows passing a BOOLEAN expression   | inner   |
//! | [`NoOpRecordSource`]           | nothing, with the delegate's schema       | inner   |
//! | [`VirtualColumnRecordSource`]  | inner rows plus computed columns          | inner   |
//! | [`CrossJoinRecordSource`]      | master x slave pairs                      | no      |
//! | [`LatestByValuesRecordSource`] | newest row per indexed value              | yes     |
//!
//! Sorting and window functions live in [`crate::sort`] and
//! [`crate::analytic`].
//!
//! Wrapper sources preserve the order of their inner source. Composite
//! cursors implement [`Record`](crate::record::Record) themselves, splitting
//! columns between the inner record and their own computed columns.

mod cross_join;
mod filtered;
mod journal;
mod latest_by;
mod noop;
mod virtual_columns;

pub use cross_join::CrossJoinRecordSource;
pub use filtered::{with_filter, FilteredRecordSource};
pub use journal::JournalRecordSource;
pub use latest_by::LatestByValuesRecordSource;
pub use noop::NoOpRecordSource;
pub use virtual_columns::VirtualColumnRecordSource;
