//! # Query Memory
//!
//! Arena storage for structures that live for one query execution. The
//! sorted materialization tree keeps record copies in [`MemoryPages`]; node
//! links live in a plain vector owned by the tree itself.

mod pages;

pub use pages::MemoryPages;
