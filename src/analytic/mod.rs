//! # Analytic Functions
//!
//! Window functions composited onto the rows of an inner source. Output
//! columns below the split index come from the base record; column
//! `split + i` is the value of function `i` for the row being emitted.
//!
//! ## Pass Requirements
//!
//! | Pass        | Protocol                                                  |
//! |-------------|-----------------------------------------------------------|
//! | Stream      | `add(row)` then read, row by row                          |
//! | TwoPass     | `add` every row, `finish`, then `prepare_for(row)` + read |
//! | ThreePass   | as TwoPass; `finish` runs an extra pass over its buffer   |
//!
//! [`AnalyticRecordSource`] streams when every function is `Stream`.
//! Otherwise it needs row-id access: the first pass buffers row ids while
//! feeding multi-pass functions, and emission replays the buffer through
//! `record_at`. Stream functions are fed during replay, which visits rows in
//! source order, so they see the same sequence either way.
//!
//! Functions are reset at every cursor rebind; a plan can be executed any
//! number of times.

mod functions;
mod source;

pub use functions::{NextValueFunction, PrevValueFunction, RankFunction, RowNumberFunction};
pub use source::AnalyticRecordSource;

use serde::Serialize;
use smallvec::SmallVec;

use crate::error::PlanError;
use crate::ops::misuse;
use crate::record::{Record, RecordCursor};
use crate::types::{
    ColumnMetadata, ColumnType, FlyweightStr, RecordMetadata, Value, INT_NULL, LONG_NULL,
    NULL_LEN,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalyticPass {
    Stream,
    TwoPass,
    ThreePass,
}

pub trait AnalyticFunction {
    /// Name and type of the output column.
    fn metadata(&self) -> &ColumnMetadata;

    fn pass(&self) -> AnalyticPass;

    /// Called once per cursor bind, after `reset`.
    fn prepare(&mut self, _cursor: &dyn RecordCursor) {}

    /// Folds one row into the running state.
    fn add(&mut self, record: &dyn Record);

    /// Ends accumulation for multi-pass functions.
    fn finish(&mut self) {}

    /// Stages the computed value of a buffered row for the getters.
    fn prepare_for(&mut self, _record: &dyn Record) {}

    /// Drops all accumulated state.
    fn reset(&mut self);

    /// Value staged for the current row.
    fn value(&self) -> &Value<'static>;

    fn plan(&self) -> serde_json::Value;

    fn get_bool(&self) -> bool {
        match self.value() {
            Value::Bool(v) => *v,
            Value::Null if self.column_type() == ColumnType::Boolean => false,
            _ => misuse(self.metadata().name(), self.column_type(), "get_bool"),
        }
    }

    fn get_byte(&self) -> i8 {
        match self.value() {
            Value::Byte(v) => *v,
            Value::Null if self.column_type() == ColumnType::Byte => 0,
            _ => misuse(self.metadata().name(), self.column_type(), "get_byte"),
        }
    }

    fn get_short(&self) -> i16 {
        match self.value() {
            Value::Short(v) => *v,
            Value::Null if self.column_type() == ColumnType::Short => 0,
            _ => misuse(self.metadata().name(), self.column_type(), "get_short"),
        }
    }

    fn get_int(&self) -> i32 {
        match self.value() {
            Value::Int(v) => *v,
            Value::Null if self.column_type() == ColumnType::Int => INT_NULL,
            _ => misuse(self.metadata().name(), self.column_type(), "get_int"),
        }
    }

    fn get_long(&self) -> i64 {
        match self.value() {
            Value::Long(v) => *v,
            Value::Null if self.column_type() == ColumnType::Long => LONG_NULL,
            _ => misuse(self.metadata().name(), self.column_type(), "get_long"),
        }
    }

    fn get_float(&self) -> f32 {
        match self.value() {
            Value::Float(v) => *v,
            Value::Null if self.column_type() == ColumnType::Float => f32::NAN,
            _ => misuse(self.metadata().name(), self.column_type(), "get_float"),
        }
    }

    fn get_double(&self) -> f64 {
        match self.value() {
            Value::Double(v) => *v,
            Value::Null if self.column_type() == ColumnType::Double => f64::NAN,
            _ => misuse(self.metadata().name(), self.column_type(), "get_double"),
        }
    }

    fn get_date(&self) -> i64 {
        match self.value() {
            Value::Date(v) | Value::Timestamp(v) => *v,
            Value::Null
                if matches!(self.column_type(), ColumnType::Date | ColumnType::Timestamp) =>
            {
                LONG_NULL
            }
            _ => misuse(self.metadata().name(), self.column_type(), "get_date"),
        }
    }

    fn get_flyweight_str(&self) -> Option<FlyweightStr<'_>> {
        self.get_sym().map(FlyweightStr::new)
    }

    fn get_flyweight_str_b(&self) -> Option<FlyweightStr<'_>> {
        self.get_flyweight_str()
    }

    fn write_str(&self, sink: &mut String) {
        if let Some(s) = self.get_sym() {
            sink.push_str(s);
        }
    }

    fn get_str_len(&self) -> i32 {
        self.get_sym().map_or(NULL_LEN, |s| s.chars().count() as i32)
    }

    fn get_sym(&self) -> Option<&str> {
        match self.value() {
            Value::Str(s) | Value::Sym(s) => Some(s.as_ref()),
            Value::Null if self.column_type().is_text() => None,
            _ => misuse(self.metadata().name(), self.column_type(), "get_sym"),
        }
    }

    fn get_bin(&self) -> Option<&[u8]> {
        match self.value() {
            Value::Bin(b) => Some(b.as_ref()),
            Value::Null if self.column_type() == ColumnType::Binary => None,
            _ => misuse(self.metadata().name(), self.column_type(), "get_bin"),
        }
    }

    fn column_type(&self) -> ColumnType {
        self.metadata().column_type()
    }
}

/// Read-only view composing a base record with staged function values.
pub struct AnalyticRecord<'a> {
    base: &'a dyn Record,
    functions: &'a [Box<dyn AnalyticFunction>],
    split: usize,
}

impl<'a> AnalyticRecord<'a> {
    pub fn new(base: &'a dyn Record, functions: &'a [Box<dyn AnalyticFunction>], split: usize) -> Self {
        Self {
            base,
            functions,
            split,
        }
    }
}

split_record!(AnalyticRecord<'_>, |self, idx| {
    split: self.split,
    base: self.base,
    computed: self.functions[idx],
    args: ()
});

/// Encodes the partition columns of a row into a hashable key.
#[derive(Debug, Clone)]
pub(crate) struct PartitionKey {
    columns: SmallVec<[(usize, ColumnType); 2]>,
    buf: Vec<u8>,
}

impl PartitionKey {
    pub(crate) fn new(metadata: &RecordMetadata, names: &[&str]) -> Result<Self, PlanError> {
        let mut columns = SmallVec::new();
        for name in names {
            let index = metadata.column_index(name)?;
            columns.push((index, metadata.column_type(index)));
        }
        Ok(Self {
            columns,
            buf: Vec::new(),
        })
    }

    pub(crate) fn encode(&mut self, record: &dyn Record) -> &[u8] {
        self.buf.clear();
        for (col, column_type) in &self.columns {
            Value::read(record, *column_type, *col).encode_key(&mut self.buf);
        }
        &self.buf
    }

    pub(crate) fn column_names<'m>(&self, metadata: &'m RecordMetadata) -> Vec<&'m str> {
        self.columns
            .iter()
            .map(|(c, _)| metadata.columns()[*c].name())
            .collect()
    }
}
