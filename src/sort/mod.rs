//! # Sorted Materialization
//!
//! ORDER BY over sources whose storage order differs from the requested
//! one. Rows are bulk-loaded into a red-black tree whose nodes live in an
//! index arena, with one node per distinct key and duplicates chained in a
//! record list:
//!
//! ```text
//!                 RBTree (node arena)
//!                  ┌──────┐
//!                  │ 3 (B)│
//!                  └──┬───┘
//!           ┌─────────┴─────────┐
//!       ┌───┴──┐            ┌───┴──┐
//!       │ 1 (R)│            │ 5 (R)│
//!       └───┬──┘            └───┬──┘
//!           │ top               │ top
//!           ▼                   ▼
//!        [1a]               [5a] ─► [5b]      RecordList (page arena)
//! ```
//!
//! ## Modes
//!
//! | Mode     | List entry             | Emission                         |
//! |----------|------------------------|----------------------------------|
//! | row id   | source row id (8 B)    | `record_at` on the source cursor |
//! | copy     | full record copy       | read from the list               |
//!
//! Row-id mode is chosen whenever the inner source supports row-id access.
//! Both modes produce the same rows in the same order.

mod rb_tree;
mod record_tree;
mod source;

pub use rb_tree::{Colour, Probe, RBTree, NIL};
pub use record_tree::{RecordTree, TreeWalk};
pub use source::SortedRecordSource;
