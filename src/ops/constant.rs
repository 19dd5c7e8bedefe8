//! Constant expressions.

use serde_json::json;

use super::{misuse, VirtualColumn};
use crate::record::Record;
use crate::types::{ColumnType, FlyweightStr, Value};

/// A value known at plan time, including typed nulls.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    value: Value<'static>,
    column_type: ColumnType,
}

impl Constant {
    /// Constant of the value's natural type. A bare null is typed STRING;
    /// use [`Constant::null`] for other null types.
    pub fn new(value: Value<'static>) -> Self {
        let column_type = value.column_type().unwrap_or(ColumnType::String);
        Self { value, column_type }
    }

    pub fn typed(value: Value<'static>, column_type: ColumnType) -> Self {
        Self { value, column_type }
    }

    pub fn null(column_type: ColumnType) -> Self {
        Self::typed(Value::Null, column_type)
    }

    pub fn bool(v: bool) -> Self {
        Self::new(Value::Bool(v))
    }

    pub fn int(v: i32) -> Self {
        Self::new(Value::int(v))
    }

    pub fn long(v: i64) -> Self {
        Self::typed(Value::long(v), ColumnType::Long)
    }

    pub fn double(v: f64) -> Self {
        Self::typed(Value::double(v), ColumnType::Double)
    }

    pub fn str(s: impl Into<String>) -> Self {
        Self::new(Value::Str(s.into().into()))
    }

    pub fn value(&self) -> &Value<'static> {
        &self.value
    }
}

impl VirtualColumn for Constant {
    fn column_type(&self) -> ColumnType {
        self.column_type
    }

    fn is_constant(&self) -> bool {
        true
    }

    fn optimize(self: Box<Self>) -> Box<dyn VirtualColumn> {
        self
    }

    fn get_bool(&self, _rec: &dyn Record) -> bool {
        self.value.to_bool()
    }

    fn get_byte(&self, _rec: &dyn Record) -> i8 {
        match self.value {
            Value::Byte(v) => v,
            Value::Null => 0,
            _ => misuse("Constant", self.column_type, "get_byte"),
        }
    }

    fn get_short(&self, _rec: &dyn Record) -> i16 {
        match self.value {
            Value::Short(v) => v,
            Value::Byte(v) => v as i16,
            Value::Null => 0,
            _ => misuse("Constant", self.column_type, "get_short"),
        }
    }

    fn get_int(&self, _rec: &dyn Record) -> i32 {
        self.value.to_int()
    }

    fn get_long(&self, _rec: &dyn Record) -> i64 {
        self.value.to_long()
    }

    fn get_float(&self, _rec: &dyn Record) -> f32 {
        match self.value {
            Value::Float(v) => v,
            Value::Null => f32::NAN,
            _ => self.value.to_double() as f32,
        }
    }

    fn get_double(&self, _rec: &dyn Record) -> f64 {
        self.value.to_double()
    }

    fn get_date(&self, _rec: &dyn Record) -> i64 {
        self.value.to_long()
    }

    fn get_flyweight_str<'a>(&'a self, _rec: &'a dyn Record) -> Option<FlyweightStr<'a>> {
        self.value.as_str().map(FlyweightStr::new)
    }

    fn get_sym<'a>(&'a self, _rec: &'a dyn Record) -> Option<&'a str> {
        self.value.as_str()
    }

    fn plan(&self) -> serde_json::Value {
        json!({
            "op": "Constant",
            "type": self.column_type,
            "value": format!("{:?}", self.value),
        })
    }
}
