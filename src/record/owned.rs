//! Detached records.

use crate::record::{unsupported, Record};
use crate::types::{ColumnType, FlyweightStr, RecordMetadata, Value};

/// Materialized copy of a row; stays valid across cursor advances.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedRecord {
    types: Vec<ColumnType>,
    values: Vec<Value<'static>>,
    row_id: i64,
}

impl OwnedRecord {
    pub fn new(metadata: &RecordMetadata) -> Self {
        let types: Vec<ColumnType> = metadata.columns().iter().map(|c| c.column_type()).collect();
        let values = vec![Value::Null; types.len()];
        Self {
            types,
            values,
            row_id: -1,
        }
    }

    /// Builds a record from values in column order. Missing trailing values
    /// are null.
    pub fn from_values(metadata: &RecordMetadata, values: Vec<Value<'_>>) -> Self {
        let mut record = Self::new(metadata);
        for (slot, value) in record.values.iter_mut().zip(values) {
            *slot = value.into_owned();
        }
        record
    }

    pub fn with_row_id(mut self, row_id: i64) -> Self {
        self.row_id = row_id;
        self
    }

    pub fn copy_from(&mut self, record: &dyn Record) {
        for (col, column_type) in self.types.iter().enumerate() {
            self.values[col] = Value::read(record, *column_type, col).into_owned();
        }
        self.row_id = record.row_id();
    }

    pub fn values(&self) -> &[Value<'static>] {
        &self.values
    }

    pub fn value(&self, col: usize) -> &Value<'static> {
        &self.values[col]
    }
}

impl Record for OwnedRecord {
    fn row_id(&self) -> i64 {
        self.row_id
    }

    fn get_bool(&self, col: usize) -> bool {
        self.values[col].to_bool()
    }

    fn get_byte(&self, col: usize) -> i8 {
        match self.values[col] {
            Value::Byte(v) => v,
            Value::Null => 0,
            _ => unsupported("OwnedRecord", "get_byte", col),
        }
    }

    fn get_short(&self, col: usize) -> i16 {
        match self.values[col] {
            Value::Short(v) => v,
            Value::Byte(v) => v as i16,
            Value::Null => 0,
            _ => unsupported("OwnedRecord", "get_short", col),
        }
    }

    fn get_int(&self, col: usize) -> i32 {
        self.values[col].to_int()
    }

    fn get_long(&self, col: usize) -> i64 {
        self.values[col].to_long()
    }

    fn get_float(&self, col: usize) -> f32 {
        match self.values[col] {
            Value::Float(v) => v,
            Value::Null => f32::NAN,
            _ => unsupported("OwnedRecord", "get_float", col),
        }
    }

    fn get_double(&self, col: usize) -> f64 {
        self.values[col].to_double()
    }

    fn get_date(&self, col: usize) -> i64 {
        self.values[col].to_long()
    }

    fn get_flyweight_str(&self, col: usize) -> Option<FlyweightStr<'_>> {
        self.values[col].as_str().map(FlyweightStr::new)
    }

    fn get_sym(&self, col: usize) -> Option<&str> {
        self.values[col].as_str()
    }

    fn get_bin(&self, col: usize) -> Option<&[u8]> {
        match &self.values[col] {
            Value::Bin(b) => Some(b),
            Value::Null => None,
            _ => unsupported("OwnedRecord", "get_bin", col),
        }
    }
}

/// Single-column record carrying a row id, used when a tree stores row ids
/// instead of record copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowIdRecord(pub i64);

impl Record for RowIdRecord {
    fn row_id(&self) -> i64 {
        self.0
    }

    fn get_long(&self, col: usize) -> i64 {
        match col {
            0 => self.0,
            _ => unsupported("RowIdRecord", "get_long", col),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnMetadata, INT_NULL};

    #[test]
    fn copy_detaches_from_source() {
        let meta = RecordMetadata::new(vec![
            ColumnMetadata::new("id", ColumnType::Int),
            ColumnMetadata::new("name", ColumnType::String),
        ]);
        let source = OwnedRecord::from_values(&meta, vec![Value::Int(7), Value::str("seven")])
            .with_row_id(3);

        let mut copy = OwnedRecord::new(&meta);
        copy.copy_from(&source);
        drop(source);

        assert_eq!(copy.get_int(0), 7);
        assert_eq!(copy.get_flyweight_str(1).unwrap(), "seven");
        assert_eq!(copy.get_str_len(1), 5);
        assert_eq!(copy.row_id(), 3);
    }

    #[test]
    fn null_values_read_as_sentinels() {
        let meta = RecordMetadata::new(vec![
            ColumnMetadata::new("i", ColumnType::Int),
            ColumnMetadata::new("s", ColumnType::String),
        ]);
        let record = OwnedRecord::new(&meta);
        assert_eq!(record.get_int(0), INT_NULL);
        assert!(record.get_flyweight_str(1).is_none());
        assert_eq!(record.get_str_len(1), crate::types::NULL_LEN);
    }

    #[test]
    #[should_panic(expected = "RowIdRecord does not support get_long on column 1")]
    fn row_id_record_has_one_column() {
        RowIdRecord(5).get_long(1);
    }
}
