//! # ChronoDB Configuration Constants
//!
//! Defaults for the arena-backed structures used during query execution. The
//! sorted materialization tree keeps two growable areas: a node arena (one
//! fixed-size slot per distinct key) and a value area holding record copies.
//!
//! ## Dependency Graph
//!
//! ```text
//! MIN_PAGE_SIZE (64 bytes)
//!       │
//!       └─> DEFAULT_VALUE_PAGE_SIZE (4 MiB, must be >= and a power of two)
//!             A single materialized record must fit inside one page;
//!             allocations never span pages.
//!
//! DEFAULT_KEY_PAGE_SIZE (4096 nodes)
//!       │
//!       └─> initial node arena reservation, grows by doubling
//!
//! DEFAULT_INDEX_BUCKETS (256)
//!       │
//!       └─> used when a column carries no distinct-count hint
//! ```
//!
//! ## Critical Invariants
//!
//! 1. Page sizes are powers of two (offset arithmetic uses shifts and masks)
//! 2. `DEFAULT_VALUE_PAGE_SIZE >= MIN_PAGE_SIZE`
//! 3. `DEFAULT_INDEX_BUCKETS` is non-zero

// ============================================================================
// VALUE AREA CONFIGURATION
// ============================================================================

/// Smallest accepted page size for the record list value area.
/// A record header (the 8-byte chain link) plus a few slots must fit.
pub const MIN_PAGE_SIZE: usize = 64;

/// Default value-area page size in bytes (4 MiB).
pub const DEFAULT_VALUE_PAGE_SIZE: usize = 4 * 1024 * 1024;

/// Size of the chain link stored in front of every record list entry.
pub const RECORD_LINK_SIZE: usize = 8;

/// Width of the per-column slot used for variable-length columns
/// (relative offset of the payload inside the entry).
pub const VAR_SLOT_SIZE: usize = 4;

/// Width of the length prefix written before string and binary payloads.
pub const VAR_LEN_PREFIX: usize = 4;

const _: () = assert!(
    DEFAULT_VALUE_PAGE_SIZE.is_power_of_two(),
    "DEFAULT_VALUE_PAGE_SIZE must be a power of two"
);

const _: () = assert!(
    MIN_PAGE_SIZE.is_power_of_two() && DEFAULT_VALUE_PAGE_SIZE >= MIN_PAGE_SIZE,
    "DEFAULT_VALUE_PAGE_SIZE must be at least MIN_PAGE_SIZE"
);

const _: () = assert!(
    RECORD_LINK_SIZE < MIN_PAGE_SIZE,
    "a record link must fit in the smallest page"
);

// ============================================================================
// NODE ARENA CONFIGURATION
// ============================================================================

/// Initial node capacity reserved by a sorted tree.
pub const DEFAULT_KEY_PAGE_SIZE: usize = 4096;

const _: () = assert!(
    DEFAULT_KEY_PAGE_SIZE.is_power_of_two(),
    "DEFAULT_KEY_PAGE_SIZE must be a power of two"
);

// ============================================================================
// INDEX CONFIGURATION
// ============================================================================

/// Bucket count for a value index when the column has no distinct-count hint.
pub const DEFAULT_INDEX_BUCKETS: usize = 256;

const _: () = assert!(DEFAULT_INDEX_BUCKETS > 0, "index needs at least one bucket");

// ============================================================================
// ANALYTIC CONFIGURATION
// ============================================================================

/// Initial capacity of the row-id buffer used by multi-pass analytic sources.
pub const ANALYTIC_ROW_BUFFER_CAPACITY: usize = 1024;
