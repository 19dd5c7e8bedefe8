//! Cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::QueryCancelled;

/// Shared cancellation flag checked by long-running traversals.
///
/// Clones share the flag: the caller keeps one clone to request
/// cancellation while the executing query checks another.
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle nobody else holds, for queries that cannot be cancelled.
    pub fn never() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns `Err(QueryCancelled)` once cancellation was requested.
    #[inline]
    pub fn check(&self) -> Result<(), QueryCancelled> {
        if self.is_cancelled() {
            Err(QueryCancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let handle = CancellationHandle::new();
        let worker = handle.clone();
        assert!(worker.check().is_ok());

        handle.cancel();
        assert_eq!(worker.check(), Err(QueryCancelled));
    }
}
