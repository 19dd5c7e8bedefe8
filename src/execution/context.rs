//! Per-execution scratch and row collection.

use bumpalo::Bump;
use eyre::Result;
use tracing::debug;

use crate::config::QueryConfig;
use crate::record::{CancellationHandle, RecordSource};
use crate::storage::StorageFactory;
use crate::types::{ColumnType, Value};

/// Scratch state for one worker. Rows collected through the context borrow
/// its arena, so [`ExecutionContext::reset`] cannot run while they are alive.
pub struct ExecutionContext {
    arena: Bump,
    cancel: CancellationHandle,
    config: QueryConfig,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(QueryConfig::default())
    }
}

impl ExecutionContext {
    pub fn new(config: QueryConfig) -> Self {
        Self {
            arena: Bump::new(),
            cancel: CancellationHandle::new(),
            config,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn arena(&self) -> &Bump {
        &self.arena
    }

    pub fn cancellation(&self) -> &CancellationHandle {
        &self.cancel
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn allocated_bytes(&self) -> usize {
        self.arena.allocated_bytes()
    }

    /// Frees every arena allocation and arms a fresh cancellation handle.
    pub fn reset(&mut self) {
        self.arena.reset();
        self.cancel = CancellationHandle::new();
    }
}

/// One materialized row. Payloads live in the context arena.
#[derive(Debug, Clone, Copy)]
pub struct ResultRow<'a> {
    values: &'a [Value<'a>],
}

impl<'a> ResultRow<'a> {
    pub fn values(&self) -> &'a [Value<'a>] {
        self.values
    }

    pub fn get(&self, col: usize) -> Option<&'a Value<'a>> {
        self.values.get(col)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Runs `source` to completion and copies every row into `ctx`'s arena.
pub fn collect_rows<'a>(
    ctx: &'a ExecutionContext,
    source: &mut dyn RecordSource,
    factory: &dyn StorageFactory,
) -> Result<Vec<ResultRow<'a>>> {
    let types: Vec<ColumnType> = source
        .metadata()
        .columns()
        .iter()
        .map(|c| c.column_type())
        .collect();
    let mut cursor = source.prepare_cursor(factory, &ctx.cancel)?;
    let mut rows = Vec::new();
    while cursor.has_next()? {
        ctx.cancel.check()?;
        let rec = cursor.next()?;
        let mut values = bumpalo::collections::Vec::with_capacity_in(types.len(), &ctx.arena);
        for (col, column_type) in types.iter().enumerate() {
            values.push(Value::read(rec, *column_type, col).clone_to_arena(&ctx.arena));
        }
        rows.push(ResultRow {
            values: values.into_bump_slice(),
        });
    }
    debug!(rows = rows.len(), arena_bytes = ctx.allocated_bytes(), "rows collected");
    Ok(rows)
}
