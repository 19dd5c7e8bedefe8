//! # In-Memory Journals
//!
//! A `Journal` is an append-only columnar table. Each column is a typed
//! vector; symbol columns store dictionary keys; string and binary columns
//! store optional owned payloads. Row ids are row numbers.
//!
//! Columns declared `indexed` keep a bucketed value index: every row is
//! appended to bucket `bounded_hash(value, buckets)`, so a bucket lists rows
//! oldest to newest and a "latest value" lookup walks it backwards.
//!
//! Journals are snapshots: [`MemoryStorage`](super::MemoryStorage) hands out
//! `Arc<Journal>` and appends copy-on-write, so an open cursor never observes
//! rows appended after it was opened.

use std::sync::Arc;

use eyre::Result;
use smallvec::SmallVec;

use super::symbol::{SymbolTable, VALUE_IS_NULL};
use super::StorageFacade;
use crate::config::DEFAULT_INDEX_BUCKETS;
use crate::error::{PlanError, StorageError};
use crate::record::{unsupported, Record, RecordCursor};
use crate::types::{ColumnMetadata, ColumnType, FlyweightStr, RecordMetadata, Value, INT_NULL, LONG_NULL};

/// Bucket for `value` among `buckets` (string hash folded to a positive int).
pub fn bounded_hash(value: &str, buckets: usize) -> usize {
    let mut h: i32 = 0;
    for c in value.encode_utf16() {
        h = h.wrapping_mul(31).wrapping_add(c as i32);
    }
    (h & i32::MAX) as usize % buckets.max(1)
}

#[derive(Debug, Clone)]
enum ColumnData {
    Bool(Vec<bool>),
    Byte(Vec<i8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Str(Vec<Option<String>>),
    Sym(Vec<i32>),
    Bin(Vec<Option<Vec<u8>>>),
    Date(Vec<i64>),
    Param,
}

impl ColumnData {
    fn for_type(t: ColumnType) -> Self {
        match t {
            ColumnType::Boolean => ColumnData::Bool(Vec::new()),
            ColumnType::Byte => ColumnData::Byte(Vec::new()),
            ColumnType::Short => ColumnData::Short(Vec::new()),
            ColumnType::Int => ColumnData::Int(Vec::new()),
            ColumnType::Long => ColumnData::Long(Vec::new()),
            ColumnType::Float => ColumnData::Float(Vec::new()),
            ColumnType::Double => ColumnData::Double(Vec::new()),
            ColumnType::String => ColumnData::Str(Vec::new()),
            ColumnType::Symbol => ColumnData::Sym(Vec::new()),
            ColumnType::Binary => ColumnData::Bin(Vec::new()),
            ColumnType::Date | ColumnType::Timestamp => ColumnData::Date(Vec::new()),
            ColumnType::Parameter => ColumnData::Param,
        }
    }

    fn truncate(&mut self, len: usize) {
        match self {
            ColumnData::Bool(v) => v.truncate(len),
            ColumnData::Byte(v) => v.truncate(len),
            ColumnData::Short(v) => v.truncate(len),
            ColumnData::Int(v) => v.truncate(len),
            ColumnData::Long(v) => v.truncate(len),
            ColumnData::Float(v) => v.truncate(len),
            ColumnData::Double(v) => v.truncate(len),
            ColumnData::Str(v) => v.truncate(len),
            ColumnData::Sym(v) => v.truncate(len),
            ColumnData::Bin(v) => v.truncate(len),
            ColumnData::Date(v) => v.truncate(len),
            ColumnData::Param => {}
        }
    }
}

#[derive(Debug, Clone)]
struct ValueIndex {
    buckets: Vec<Vec<i64>>,
}

impl ValueIndex {
    fn new(buckets: usize) -> Self {
        Self {
            buckets: vec![Vec::new(); buckets.max(1)],
        }
    }

    fn bucket(&self, value: &str) -> &[i64] {
        &self.buckets[bounded_hash(value, self.buckets.len())]
    }
}

/// Declares the columns of a new journal.
#[derive(Debug)]
pub struct JournalBuilder {
    name: String,
    columns: Vec<ColumnMetadata>,
    timestamp: Option<String>,
}

impl JournalBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            timestamp: None,
        }
    }

    pub fn column(mut self, column: ColumnMetadata) -> Self {
        self.columns.push(column);
        self
    }

    pub fn of_type(self, name: &str, column_type: ColumnType) -> Self {
        self.column(ColumnMetadata::new(name, column_type))
    }

    pub fn int(self, name: &str) -> Self {
        self.of_type(name, ColumnType::Int)
    }

    pub fn long(self, name: &str) -> Self {
        self.of_type(name, ColumnType::Long)
    }

    pub fn double(self, name: &str) -> Self {
        self.of_type(name, ColumnType::Double)
    }

    pub fn string(self, name: &str) -> Self {
        self.of_type(name, ColumnType::String)
    }

    pub fn symbol(self, name: &str) -> Self {
        self.of_type(name, ColumnType::Symbol)
    }

    /// Symbol column with a value index sized for `distinct_count` values.
    pub fn indexed_symbol(self, name: &str, distinct_count: usize) -> Self {
        self.column(
            ColumnMetadata::new(name, ColumnType::Symbol)
                .with_distinct_count_hint(distinct_count)
                .indexed(true),
        )
    }

    pub fn date(self, name: &str) -> Self {
        self.of_type(name, ColumnType::Date)
    }

    /// Designated timestamp column.
    pub fn timestamp(mut self, name: &str) -> Self {
        self.timestamp = Some(name.to_string());
        self.of_type(name, ColumnType::Timestamp)
    }

    pub fn build(self) -> Result<Journal, PlanError> {
        for (i, c) in self.columns.iter().enumerate() {
            if self.columns[..i]
                .iter()
                .any(|p| p.name().eq_ignore_ascii_case(c.name()))
            {
                return Err(PlanError::DuplicateColumn(c.name().to_string()));
            }
            if c.is_indexed() && !c.column_type().is_text() {
                return Err(PlanError::TypeMismatch {
                    column: c.name().to_string(),
                    expected: "STRING or SYMBOL for an indexed column",
                    found: c.column_type(),
                });
            }
        }
        let mut metadata = RecordMetadata::new(self.columns);
        if let Some(ts) = self.timestamp {
            let index = metadata.column_index(&ts)?;
            metadata = metadata.with_timestamp_index(index)?;
        }
        let columns = metadata
            .columns()
            .iter()
            .map(|c| ColumnData::for_type(c.column_type()))
            .collect();
        let symbols = metadata
            .columns()
            .iter()
            .map(|c| (c.column_type() == ColumnType::Symbol).then(SymbolTable::new))
            .collect();
        let indexes = metadata
            .columns()
            .iter()
            .map(|c| {
                c.is_indexed().then(|| {
                    let hint = c.distinct_count_hint();
                    ValueIndex::new(if hint == 0 { DEFAULT_INDEX_BUCKETS } else { hint })
                })
            })
            .collect();
        Ok(Journal {
            name: self.name,
            metadata,
            columns,
            symbols,
            indexes,
            rows: 0,
            fault_after: None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Journal {
    name: String,
    metadata: RecordMetadata,
    columns: Vec<ColumnData>,
    symbols: Vec<Option<SymbolTable>>,
    indexes: Vec<Option<ValueIndex>>,
    rows: usize,
    fault_after: Option<usize>,
}

impl Journal {
    pub fn builder(name: impl Into<String>) -> JournalBuilder {
        JournalBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &RecordMetadata {
        &self.metadata
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Makes cursors fail with `StorageError::ReadFailed` once they try to
    /// read past `rows` rows. Simulates a storage fault.
    pub fn set_read_fault(&mut self, rows: Option<usize>) {
        self.fault_after = rows;
    }

    /// Appends one row. The row is rejected as a whole when any value does
    /// not fit its column.
    pub fn append(&mut self, values: &[Value<'_>]) -> Result<(), StorageError> {
        if values.len() != self.metadata.column_count() {
            return Err(self.rejected(format!(
                "expected {} values, got {}",
                self.metadata.column_count(),
                values.len()
            )));
        }
        let interned: SmallVec<[usize; 8]> = self
            .symbols
            .iter()
            .map(|t| t.as_ref().map_or(0, SymbolTable::size))
            .collect();
        for (col, value) in values.iter().enumerate() {
            if let Err(reason) = self.push_value(col, value) {
                for data in &mut self.columns {
                    data.truncate(self.rows);
                }
                for (table, size) in self.symbols.iter_mut().zip(&interned) {
                    if let Some(table) = table {
                        table.truncate(*size);
                    }
                }
                return Err(self.rejected(reason));
            }
        }
        let row_id = self.rows as i64;
        for (col, index) in self.indexes.iter_mut().enumerate() {
            if let Some(index) = index {
                if let Some(key) = values[col].as_str() {
                    let bucket = bounded_hash(key, index.buckets.len());
                    index.buckets[bucket].push(row_id);
                }
            }
        }
        self.rows += 1;
        Ok(())
    }

    fn rejected(&self, reason: String) -> StorageError {
        StorageError::AppendRejected {
            journal: self.name.clone(),
            reason,
        }
    }

    fn push_value(&mut self, col: usize, value: &Value<'_>) -> Result<(), String> {
        let column = &self.metadata.columns()[col];
        let mismatch = || {
            format!(
                "column '{}' of type {} cannot store {:?}",
                column.name(),
                column.column_type(),
                value
            )
        };
        match (&mut self.columns[col], value) {
            (ColumnData::Bool(v), Value::Bool(b)) => v.push(*b),
            (ColumnData::Byte(v), Value::Byte(b)) => v.push(*b),
            (ColumnData::Short(v), Value::Short(s)) => v.push(*s),
            (ColumnData::Short(v), Value::Byte(b)) => v.push(*b as i16),
            (ColumnData::Int(v), Value::Null) => v.push(INT_NULL),
            (ColumnData::Int(v), Value::Int(_) | Value::Short(_) | Value::Byte(_)) => {
                v.push(value.to_int())
            }
            (ColumnData::Long(v) | ColumnData::Date(v), Value::Null) => v.push(LONG_NULL),
            (
                ColumnData::Long(v) | ColumnData::Date(v),
                Value::Long(_)
                | Value::Int(_)
                | Value::Short(_)
                | Value::Byte(_)
                | Value::Date(_)
                | Value::Timestamp(_),
            ) => v.push(value.to_long()),
            (ColumnData::Float(v), Value::Null) => v.push(f32::NAN),
            (ColumnData::Float(v), Value::Float(f)) => v.push(*f),
            (ColumnData::Double(v), Value::Null) => v.push(f64::NAN),
            (
                ColumnData::Double(v),
                Value::Double(_) | Value::Float(_) | Value::Int(_) | Value::Long(_),
            ) => v.push(value.to_double()),
            (ColumnData::Str(v), Value::Null) => v.push(None),
            (ColumnData::Str(v), Value::Str(s) | Value::Sym(s)) => v.push(Some(s.to_string())),
            (ColumnData::Sym(v), Value::Null) => v.push(VALUE_IS_NULL),
            (ColumnData::Sym(v), Value::Str(s) | Value::Sym(s)) => {
                let key = match &mut self.symbols[col] {
                    Some(table) => table.put(s),
                    None => return Err(mismatch()),
                };
                v.push(key)
            }
            (ColumnData::Bin(v), Value::Null) => v.push(None),
            (ColumnData::Bin(v), Value::Bin(b)) => v.push(Some(b.to_vec())),
            (ColumnData::Param, Value::Null) => {}
            _ => return Err(mismatch()),
        }
        Ok(())
    }

    /// Rows whose indexed column `col` hashes to the bucket of `value`,
    /// oldest first. Callers must re-check the value: buckets are shared by
    /// colliding values.
    pub fn index_bucket(&self, col: usize, value: &str) -> Option<&[i64]> {
        self.indexes.get(col)?.as_ref().map(|i| i.bucket(value))
    }

    fn data(&self, col: usize) -> &ColumnData {
        &self.columns[col]
    }

    pub fn symbol_table(&self, col: usize) -> Option<&SymbolTable> {
        self.symbols.get(col)?.as_ref()
    }
}

impl StorageFacade for Journal {
    fn symbol_table(&self, col: usize) -> Option<&SymbolTable> {
        Journal::symbol_table(self, col)
    }
}

/// Cursor over one journal snapshot. The cursor is also the flyweight
/// record for its current row.
pub struct JournalCursor {
    journal: Arc<Journal>,
    next_row: usize,
    current: usize,
}

impl JournalCursor {
    pub fn new(journal: Arc<Journal>) -> Self {
        Self {
            journal,
            next_row: 0,
            current: 0,
        }
    }

    fn check_fault(&self, row: usize) -> Result<(), StorageError> {
        match self.journal.fault_after {
            Some(limit) if row >= limit => Err(StorageError::ReadFailed {
                journal: self.journal.name.clone(),
                reason: format!("simulated fault reading row {}", row),
            }),
            _ => Ok(()),
        }
    }
}

impl RecordCursor for JournalCursor {
    fn metadata(&self) -> &RecordMetadata {
        &self.journal.metadata
    }

    fn storage_facade(&self) -> &dyn StorageFacade {
        &*self.journal
    }

    fn has_next(&mut self) -> Result<bool> {
        if self.next_row >= self.journal.rows {
            return Ok(false);
        }
        self.check_fault(self.next_row)?;
        Ok(true)
    }

    fn next(&mut self) -> Result<&dyn Record> {
        self.check_fault(self.next_row)?;
        self.current = self.next_row;
        self.next_row += 1;
        Ok(self)
    }

    fn record(&self) -> &dyn Record {
        self
    }

    fn record_at(&mut self, row_id: i64) -> Result<&dyn Record> {
        if row_id < 0 || row_id as usize >= self.journal.rows {
            return Err(StorageError::RowOutOfRange {
                journal: self.journal.name.clone(),
                row_id,
                rows: self.journal.rows,
            }
            .into());
        }
        self.current = row_id as usize;
        Ok(self)
    }
}

impl Record for JournalCursor {
    fn row_id(&self) -> i64 {
        self.current as i64
    }

    fn get_bool(&self, col: usize) -> bool {
        match self.journal.data(col) {
            ColumnData::Bool(v) => v[self.current],
            _ => unsupported("JournalCursor", "get_bool", col),
        }
    }

    fn get_byte(&self, col: usize) -> i8 {
        match self.journal.data(col) {
            ColumnData::Byte(v) => v[self.current],
            _ => unsupported("JournalCursor", "get_byte", col),
        }
    }

    fn get_short(&self, col: usize) -> i16 {
        match self.journal.data(col) {
            ColumnData::Short(v) => v[self.current],
            _ => unsupported("JournalCursor", "get_short", col),
        }
    }

    fn get_int(&self, col: usize) -> i32 {
        match self.journal.data(col) {
            ColumnData::Int(v) | ColumnData::Sym(v) => v[self.current],
            _ => unsupported("JournalCursor", "get_int", col),
        }
    }

    fn get_long(&self, col: usize) -> i64 {
        match self.journal.data(col) {
            ColumnData::Long(v) | ColumnData::Date(v) => v[self.current],
            _ => unsupported("JournalCursor", "get_long", col),
        }
    }

    fn get_float(&self, col: usize) -> f32 {
        match self.journal.data(col) {
            ColumnData::Float(v) => v[self.current],
            _ => unsupported("JournalCursor", "get_float", col),
        }
    }

    fn get_double(&self, col: usize) -> f64 {
        match self.journal.data(col) {
            ColumnData::Double(v) => v[self.current],
            _ => unsupported("JournalCursor", "get_double", col),
        }
    }

    fn get_date(&self, col: usize) -> i64 {
        match self.journal.data(col) {
            ColumnData::Date(v) | ColumnData::Long(v) => v[self.current],
            _ => unsupported("JournalCursor", "get_date", col),
        }
    }

    fn get_flyweight_str(&self, col: usize) -> Option<FlyweightStr<'_>> {
        match self.journal.data(col) {
            ColumnData::Str(v) => v[self.current].as_deref().map(FlyweightStr::new),
            ColumnData::Sym(_) => self.get_sym(col).map(FlyweightStr::new),
            _ => unsupported("JournalCursor", "get_flyweight_str", col),
        }
    }

    fn get_sym(&self, col: usize) -> Option<&str> {
        match (self.journal.data(col), self.journal.symbol_table(col)) {
            (ColumnData::Sym(v), Some(table)) => table.value_of(v[self.current]),
            _ => unsupported("JournalCursor", "get_sym", col),
        }
    }

    fn get_bin(&self, col: usize) -> Option<&[u8]> {
        match self.journal.data(col) {
            ColumnData::Bin(v) => v[self.current].as_deref(),
            _ => unsupported("JournalCursor", "get_bin", col),
        }
    }
}
