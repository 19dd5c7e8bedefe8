//! # Value Model
//!
//! Typed values and schema descriptors shared by every layer of the query
//! execution core.
//!
//! ## Key Types
//!
//! | Type              | Purpose                                        |
//! |-------------------|------------------------------------------------|
//! | `ColumnType`      | Closed set of column kinds with storage widths |
//! | `Value<'a>`       | Generic runtime value, borrowed where possible |
//! | `FlyweightStr<'a>`| Multi-span read-only character view            |
//! | `ColumnMetadata`  | Name, type, size, distinct hint, index flag    |
//! | `RecordMetadata`  | Ordered columns with name lookup               |

mod column_type;
mod flyweight;
mod metadata;
mod value;

pub use column_type::ColumnType;
pub use flyweight::FlyweightStr;
pub use metadata::{ColumnMetadata, RecordMetadata, ROW_ID_COLUMN};
pub use value::Value;

/// Null INT and null SYMBOL key sentinel for 32-bit slots.
pub const INT_NULL: i32 = i32::MIN;

/// Null LONG, DATE and TIMESTAMP sentinel.
pub const LONG_NULL: i64 = i64::MIN;

/// Length reported for a null STRING or BINARY value.
pub const NULL_LEN: i32 = -1;
