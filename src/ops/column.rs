//! Column references.

use serde_json::json;

use super::VirtualColumn;
use crate::error::PlanError;
use crate::record::Record;
use crate::storage::{StorageFacade, VALUE_NOT_FOUND};
use crate::types::{ColumnType, FlyweightStr, RecordMetadata};

/// Reads one column of the current record.
#[derive(Debug, Clone)]
pub struct RecordColumn {
    name: String,
    index: usize,
    column_type: ColumnType,
}

impl RecordColumn {
    pub fn new(metadata: &RecordMetadata, name: &str) -> Result<Self, PlanError> {
        let index = metadata.column_index(name)?;
        Self::at(metadata, index)
    }

    pub fn at(metadata: &RecordMetadata, index: usize) -> Result<Self, PlanError> {
        let column = metadata.column(index)?;
        Ok(Self {
            name: column.name().to_string(),
            index,
            column_type: column.column_type(),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl VirtualColumn for RecordColumn {
    fn column_type(&self) -> ColumnType {
        self.column_type
    }

    fn optimize(self: Box<Self>) -> Box<dyn VirtualColumn> {
        self
    }

    fn column_index(&self) -> Option<usize> {
        Some(self.index)
    }

    fn get_bool(&self, rec: &dyn Record) -> bool {
        rec.get_bool(self.index)
    }

    fn get_byte(&self, rec: &dyn Record) -> i8 {
        rec.get_byte(self.index)
    }

    fn get_short(&self, rec: &dyn Record) -> i16 {
        rec.get_short(self.index)
    }

    fn get_int(&self, rec: &dyn Record) -> i32 {
        rec.get_int(self.index)
    }

    fn get_long(&self, rec: &dyn Record) -> i64 {
        rec.get_long(self.index)
    }

    fn get_float(&self, rec: &dyn Record) -> f32 {
        rec.get_float(self.index)
    }

    fn get_double(&self, rec: &dyn Record) -> f64 {
        rec.get_double(self.index)
    }

    fn get_date(&self, rec: &dyn Record) -> i64 {
        rec.get_date(self.index)
    }

    fn get_flyweight_str<'a>(&'a self, rec: &'a dyn Record) -> Option<FlyweightStr<'a>> {
        match self.column_type {
            ColumnType::Symbol => rec.get_sym(self.index).map(FlyweightStr::new),
            _ => rec.get_flyweight_str(self.index),
        }
    }

    fn get_flyweight_str_b<'a>(&'a self, rec: &'a dyn Record) -> Option<FlyweightStr<'a>> {
        match self.column_type {
            ColumnType::Symbol => rec.get_sym(self.index).map(FlyweightStr::new),
            _ => rec.get_flyweight_str_b(self.index),
        }
    }

    fn get_str_len(&self, rec: &dyn Record) -> i32 {
        match self.column_type {
            ColumnType::Symbol => rec
                .get_sym(self.index)
                .map_or(crate::types::NULL_LEN, |s| s.chars().count() as i32),
            _ => rec.get_str_len(self.index),
        }
    }

    fn get_sym<'a>(&'a self, rec: &'a dyn Record) -> Option<&'a str> {
        rec.get_sym(self.index)
    }

    fn plan(&self) -> serde_json::Value {
        json!({ "op": "Column", "name": self.name, "index": self.index })
    }
}

/// `symbol_column = 'value'`, comparing dictionary keys when the cursor
/// exposes the column's symbol table and strings otherwise.
#[derive(Debug, Clone)]
pub struct SymEqualsOperator {
    column: RecordColumn,
    value: Option<String>,
    key: Option<i32>,
}

impl SymEqualsOperator {
    pub fn new(column: RecordColumn, value: Option<String>) -> Result<Self, PlanError> {
        if column.column_type != ColumnType::Symbol {
            return Err(PlanError::TypeMismatch {
                column: column.name.clone(),
                expected: "SYMBOL",
                found: column.column_type,
            });
        }
        Ok(Self {
            column,
            value,
            key: None,
        })
    }
}

impl VirtualColumn for SymEqualsOperator {
    fn column_type(&self) -> ColumnType {
        ColumnType::Boolean
    }

    fn prepare(&mut self, facade: &dyn StorageFacade) {
        self.key = facade
            .symbol_table(self.column.index)
            .map(|table| table.key_of(self.value.as_deref()));
    }

    fn optimize(self: Box<Self>) -> Box<dyn VirtualColumn> {
        self
    }

    fn get_bool(&self, rec: &dyn Record) -> bool {
        match self.key {
            Some(VALUE_NOT_FOUND) => false,
            Some(key) => rec.get_int(self.column.index) == key,
            None => rec.get_sym(self.column.index) == self.value.as_deref(),
        }
    }

    fn plan(&self) -> serde_json::Value {
        json!({
            "op": "SymEquals",
            "lhs": self.column.plan(),
            "value": self.value,
        })
    }
}
