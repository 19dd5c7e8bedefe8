//! Analytic record source.
//!
//! Multi-pass functions see every base row before the first one is emitted.
//! The first pass buffers either source row ids, replayed through
//! `record_at`, or record copies in a [`RecordList`] when the source cannot
//! reposition. Replayed copies carry their list address as row id.

use eyre::{bail, Result};
use serde_json::json;
use tracing::debug;

use super::{AnalyticFunction, AnalyticPass};
use crate::config::{QueryConfig, ANALYTIC_ROW_BUFFER_CAPACITY};
use crate::error::{is_cancellation, PlanError};
use crate::record::{
    CancellationHandle, ListRecord, Record, RecordCursor, RecordList, RecordSource, NO_ENTRY,
};
use crate::storage::{NoStorage, StorageFacade, StorageFactory};
use crate::types::RecordMetadata;

pub struct AnalyticRecordSource {
    source: Box<dyn RecordSource>,
    functions: Vec<Box<dyn AnalyticFunction>>,
    metadata: RecordMetadata,
    split: usize,
    multi_pass: bool,
    by_row_id: bool,
    rows: Vec<i64>,
    copies: RecordList,
}

impl AnalyticRecordSource {
    pub fn new(
        source: Box<dyn RecordSource>,
        functions: Vec<Box<dyn AnalyticFunction>>,
    ) -> Result<Self, PlanError> {
        Self::with_config(source, functions, QueryConfig::default())
    }

    /// `config` sizes the copy buffer used when the source has no row ids.
    pub fn with_config(
        source: Box<dyn RecordSource>,
        functions: Vec<Box<dyn AnalyticFunction>>,
        config: QueryConfig,
    ) -> Result<Self, PlanError> {
        config.validate()?;
        let multi_pass = functions.iter().any(|f| f.pass() != AnalyticPass::Stream);
        let by_row_id = source.supports_row_id_access();
        let base = source.metadata();
        let mut computed = Vec::with_capacity(functions.len());
        for f in &functions {
            let name = f.metadata().name();
            if base.column_index_quiet(name).is_some()
                || computed
                    .iter()
                    .any(|c: &crate::types::ColumnMetadata| c.name().eq_ignore_ascii_case(name))
            {
                return Err(PlanError::DuplicateColumn(name.to_string()));
            }
            computed.push(f.metadata().clone());
        }
        let copies = RecordList::new(base, config.value_page_size());
        if multi_pass && !by_row_id {
            copies.check_fits()?;
        }
        let metadata = base.concat(&RecordMetadata::new(computed));
        Ok(Self {
            split: base.column_count(),
            metadata,
            source,
            functions,
            multi_pass,
            by_row_id,
            rows: Vec::new(),
            copies,
        })
    }

    /// Whether emission waits for a full first pass.
    pub fn is_multi_pass(&self) -> bool {
        self.multi_pass
    }

    /// Whether a multi-pass replay repositions the source instead of
    /// reading record copies.
    pub fn by_row_id(&self) -> bool {
        self.by_row_id
    }
}

fn feed_first_pass(functions: &mut [Box<dyn AnalyticFunction>], record: &dyn Record) {
    for f in functions.iter_mut() {
        if f.pass() != AnalyticPass::Stream {
            f.add(record);
        }
    }
}

fn accumulate(
    cursor: &mut dyn RecordCursor,
    functions: &mut [Box<dyn AnalyticFunction>],
    rows: &mut Vec<i64>,
    copies: &mut RecordList,
    by_row_id: bool,
    cancel: &CancellationHandle,
) -> Result<()> {
    while cursor.has_next()? {
        cancel.check()?;
        let rec = cursor.next()?;
        if by_row_id {
            rows.push(rec.row_id());
            feed_first_pass(functions, rec);
        } else {
            let addr = copies.append(rec, NO_ENTRY)?;
            rows.push(addr);
            feed_first_pass(functions, &copies.record_at(addr));
        }
    }
    for f in functions.iter_mut() {
        if f.pass() != AnalyticPass::Stream {
            f.finish();
        }
    }
    Ok(())
}

impl RecordSource for AnalyticRecordSource {
    fn metadata(&self) -> &RecordMetadata {
        &self.metadata
    }

    fn prepare_cursor(
        &mut self,
        factory: &dyn StorageFactory,
        cancel: &CancellationHandle,
    ) -> Result<Box<dyn RecordCursor + '_>> {
        self.rows.clear();
        self.copies.clear();
        for f in &mut self.functions {
            f.reset();
        }
        let mut inner = self.source.prepare_cursor(factory, cancel)?;
        for f in &mut self.functions {
            f.prepare(&*inner);
        }

        if self.multi_pass {
            self.rows.reserve(ANALYTIC_ROW_BUFFER_CAPACITY);
            let loaded = accumulate(
                &mut *inner,
                &mut self.functions,
                &mut self.rows,
                &mut self.copies,
                self.by_row_id,
                cancel,
            );
            if let Err(err) = loaded {
                self.rows.clear();
                self.copies.clear();
                for f in &mut self.functions {
                    f.reset();
                }
                if is_cancellation(&err) {
                    return Err(err);
                }
                return Err(err.wrap_err("materializing analytic rows"));
            }
            debug!(
                rows = self.rows.len(),
                bytes = self.copies.bytes_used(),
                by_row_id = self.by_row_id,
                "analytic rows buffered"
            );
        }

        let copies = if self.multi_pass && !self.by_row_id {
            Some(&self.copies)
        } else {
            None
        };
        Ok(Box::new(AnalyticCursor {
            inner,
            functions: &mut self.functions,
            rows: &self.rows,
            copies,
            current: None,
            metadata: &self.metadata,
            split: self.split,
            multi_pass: self.multi_pass,
            pos: 0,
        }))
    }

    /// Computed values depend on emission order, so rows cannot be revisited.
    fn supports_row_id_access(&self) -> bool {
        false
    }

    fn close(&mut self) {
        self.rows = Vec::new();
        self.copies.release();
        for f in &mut self.functions {
            f.reset();
        }
        self.source.close();
    }

    fn plan(&self) -> serde_json::Value {
        let functions: Vec<_> = self.functions.iter().map(|f| f.plan()).collect();
        json!({
            "op": "AnalyticRecordSource",
            "functions": functions,
            "byRowId": self.by_row_id,
            "src": self.source.plan(),
        })
    }
}

struct AnalyticCursor<'a> {
    inner: Box<dyn RecordCursor + 'a>,
    functions: &'a mut [Box<dyn AnalyticFunction>],
    rows: &'a [i64],
    /// Set when replay reads record copies.
    copies: Option<&'a RecordList>,
    current: Option<ListRecord<'a>>,
    metadata: &'a RecordMetadata,
    split: usize,
    multi_pass: bool,
    pos: usize,
}

impl AnalyticCursor<'_> {
    fn base(&self) -> &dyn Record {
        match &self.current {
            Some(copy) => copy as &dyn Record,
            None => self.inner.record(),
        }
    }
}

split_record!(AnalyticCursor<'_>, |self, idx| {
    split: self.split,
    base: self.base(),
    computed: self.functions[idx],
    args: ()
});

fn feed_replay(functions: &mut [Box<dyn AnalyticFunction>], record: &dyn Record) {
    for f in functions.iter_mut() {
        if f.pass() == AnalyticPass::Stream {
            f.add(record);
        } else {
            f.prepare_for(record);
        }
    }
}

impl RecordCursor for AnalyticCursor<'_> {
    fn metadata(&self) -> &RecordMetadata {
        self.metadata
    }

    /// Copies hold symbols by value, so there is no symbol table to expose.
    fn storage_facade(&self) -> &dyn StorageFacade {
        match self.copies {
            Some(_) => &NoStorage,
            None => self.inner.storage_facade(),
        }
    }

    fn has_next(&mut self) -> Result<bool> {
        if self.multi_pass {
            Ok(self.pos < self.rows.len())
        } else {
            self.inner.has_next()
        }
    }

    fn next(&mut self) -> Result<&dyn Record> {
        if self.multi_pass {
            let Some(&row_id) = self.rows.get(self.pos) else {
                bail!("analytic cursor advanced past its last row");
            };
            self.pos += 1;
            match self.copies {
                Some(list) => {
                    let copy = list.record_at(row_id);
                    feed_replay(self.functions, &copy);
                    self.current = Some(copy);
                }
                None => {
                    let rec = self.inner.record_at(row_id)?;
                    feed_replay(self.functions, rec);
                }
            }
        } else {
            let rec = self.inner.next()?;
            for f in self.functions.iter_mut() {
                f.add(rec);
            }
        }
        Ok(self)
    }

    fn record(&self) -> &dyn Record {
        self
    }

    fn record_at(&mut self, _row_id: i64) -> Result<&dyn Record> {
        Err(PlanError::RowIdAccessRequired {
            node: "AnalyticRecordSource",
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytic::{NextValueFunction, RankFunction, RowNumberFunction};
    use crate::error::QueryCancelled;
    use crate::sources::testing::quotes;
    use crate::sources::{CrossJoinRecordSource, JournalRecordSource};

    fn scan(storage: &crate::storage::MemoryStorage) -> Box<dyn RecordSource> {
        Box::new(JournalRecordSource::new(storage, "quotes").unwrap())
    }

    #[test]
    fn streaming_functions_follow_source_order() {
        let storage = quotes();
        let base = scan(&storage);
        let rn = RowNumberFunction::new("rn", base.metadata(), &["sym"]).unwrap();
        let mut source = AnalyticRecordSource::new(base, vec![Box::new(rn)]).unwrap();
        assert!(!source.is_multi_pass());
        assert_eq!(source.metadata().column_index("rn").unwrap(), 4);

        let mut cursor = source
            .prepare_cursor(&storage, &CancellationHandle::never())
            .unwrap();
        let mut seen = Vec::new();
        while cursor.has_next().unwrap() {
            let rec = cursor.next().unwrap();
            seen.push((rec.get_int(2), rec.get_long(4)));
        }
        assert_eq!(seen, vec![(10, 1), (20, 1), (30, 2), (40, 1), (50, 2)]);
    }

    #[test]
    fn multi_pass_replays_buffered_rows() {
        let storage = quotes();
        let base = scan(&storage);
        let meta = base.metadata().clone();
        let functions: Vec<Box<dyn AnalyticFunction>> = vec![
            Box::new(RowNumberFunction::new("rn", &meta, &[]).unwrap()),
            Box::new(NextValueFunction::new("next_qty", &meta, "qty", &["sym"]).unwrap()),
            Box::new(RankFunction::new("rk", &meta, "bid", true, &[]).unwrap()),
        ];
        let mut source = AnalyticRecordSource::new(base, functions).unwrap();
        assert!(source.is_multi_pass());

        let cancel = CancellationHandle::never();
        for _ in 0..2 {
            let mut cursor = source.prepare_cursor(&storage, &cancel).unwrap();
            let mut seen = Vec::new();
            while cursor.has_next().unwrap() {
                let rec = cursor.next().unwrap();
                seen.push((rec.get_long(4), rec.get_int(5), rec.get_long(6)));
            }
            let null = crate::types::INT_NULL;
            assert_eq!(
                seen,
                vec![(1, 30, 5), (2, 50, 4), (3, null, 3), (4, null, 2), (5, null, 1)]
            );
        }
    }

    #[test]
    fn multi_pass_copies_rows_without_row_ids() {
        let storage = quotes();
        let join = CrossJoinRecordSource::new(scan(&storage), scan(&storage)).unwrap();
        let meta = join.metadata().clone();
        let functions: Vec<Box<dyn AnalyticFunction>> = vec![
            Box::new(RowNumberFunction::new("rn", &meta, &[]).unwrap()),
            Box::new(RankFunction::new("rk", &meta, "qty", false, &[]).unwrap()),
        ];
        let mut source = AnalyticRecordSource::new(Box::new(join), functions).unwrap();
        assert!(source.is_multi_pass());
        assert!(!source.by_row_id());
        assert_eq!(source.plan()["byRowId"], false);

        let mut cursor = source
            .prepare_cursor(&storage, &CancellationHandle::never())
            .unwrap();
        let mut seen = Vec::new();
        while cursor.has_next().unwrap() {
            let rec = cursor.next().unwrap();
            seen.push((rec.get_int(2), rec.get_long(8), rec.get_long(9)));
        }
        assert_eq!(seen.len(), 25);
        let expected: Vec<(i32, i64, i64)> = (0..25)
            .map(|i| (10 * (i / 5 + 1), i as i64 + 1, (i / 5) as i64 * 5 + 1))
            .collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn copy_buffer_wider_than_a_page_is_a_plan_error() {
        let storage = quotes();
        let pair = CrossJoinRecordSource::new(scan(&storage), scan(&storage)).unwrap();
        let join = CrossJoinRecordSource::new(Box::new(pair), scan(&storage)).unwrap();
        let meta = join.metadata().clone();
        let next = NextValueFunction::new("n", &meta, "qty", &[]).unwrap();
        let config = QueryConfig::default().with_value_page_size(64);
        let err = AnalyticRecordSource::with_config(Box::new(join), vec![Box::new(next)], config)
            .err()
            .unwrap();
        assert!(matches!(err, PlanError::RecordTooLarge { page_size: 64, .. }));
    }

    #[test]
    fn cancelled_materialization_passes_through() {
        let storage = quotes();
        let base = scan(&storage);
        let meta = base.metadata().clone();
        let next = NextValueFunction::new("n", &meta, "qty", &[]).unwrap();
        let mut source = AnalyticRecordSource::new(base, vec![Box::new(next)]).unwrap();
        let cancel = CancellationHandle::new();
        cancel.cancel();
        let err = source.prepare_cursor(&storage, &cancel).err().unwrap();
        assert!(err.downcast_ref::<QueryCancelled>().is_some());
        assert_eq!(err.to_string(), "query cancelled");
    }

    #[test]
    fn duplicate_output_name_is_rejected() {
        let storage = quotes();
        let base = scan(&storage);
        let rn = RowNumberFunction::new("qty", base.metadata(), &[]).unwrap();
        let err = AnalyticRecordSource::new(base, vec![Box::new(rn)]).err().unwrap();
        assert_eq!(err, PlanError::DuplicateColumn("qty".to_string()));
    }
}
