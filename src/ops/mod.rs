//! # Virtual Columns
//!
//! Lazily evaluated scalar expressions bound to the current record. An
//! expression tree is built once per plan, optimized once, prepared once per
//! cursor rebind and then evaluated per row through typed getters:
//!
//! ```text
//! build ──> optimize() ──> prepare(facade) ──> get_bool(record) ...
//!  (once)     (once)        (per rebind)        (per row)
//! ```
//!
//! ## Typed Getters
//!
//! A node implements the getters matching its declared [`ColumnType`], which
//! never changes after construction. Calling any other getter is a
//! programming error and panics with the node kind and type.
//!
//! ## Constant Folding
//!
//! `is_constant()` is a pure question. Folding happens only in
//! `optimize(self: Box<Self>)`, which consumes the node and returns its
//! replacement. Boolean AND inspects its right operand first: a constant
//! `false` on the right replaces the node without touching the left operand;
//! a constant `false` on the left replaces it without optimizing or
//! evaluating the right operand.

mod arithmetic;
mod column;
mod compare;
mod concat;
mod constant;
mod factory;
mod logical;

pub use arithmetic::{AddOperator, NegativeOperator};
pub use column::{RecordColumn, SymEqualsOperator};
pub use compare::{CompareOp, CompareOperator};
pub use concat::StrConcatOperator;
pub use constant::Constant;
pub use factory::FunctionFactory;
pub use logical::{AndOperator, NotOperator, OrOperator};
pub(crate) use logical::fold_if_constant;

use std::borrow::Cow;

use crate::record::Record;
use crate::storage::StorageFacade;
use crate::types::{ColumnType, FlyweightStr, Value, NULL_LEN};

#[cold]
#[track_caller]
pub(crate) fn misuse(kind: &str, column_type: ColumnType, getter: &str) -> ! {
    panic!("{} of type {} does not support {}", kind, column_type, getter)
}

pub trait VirtualColumn {
    fn column_type(&self) -> ColumnType;

    /// Whether the value is independent of the record. Never mutates.
    fn is_constant(&self) -> bool {
        false
    }

    /// Caches storage-dependent state. Called once per cursor rebind.
    fn prepare(&mut self, _facade: &dyn StorageFacade) {}

    /// Consumes the node and returns its folded replacement.
    fn optimize(self: Box<Self>) -> Box<dyn VirtualColumn>;

    /// Record column this node reads verbatim, if any.
    fn column_index(&self) -> Option<usize> {
        None
    }

    fn get_bool(&self, _rec: &dyn Record) -> bool {
        misuse(std::any::type_name::<Self>(), self.column_type(), "get_bool")
    }

    fn get_byte(&self, _rec: &dyn Record) -> i8 {
        misuse(std::any::type_name::<Self>(), self.column_type(), "get_byte")
    }

    fn get_short(&self, _rec: &dyn Record) -> i16 {
        misuse(std::any::type_name::<Self>(), self.column_type(), "get_short")
    }

    fn get_int(&self, _rec: &dyn Record) -> i32 {
        misuse(std::any::type_name::<Self>(), self.column_type(), "get_int")
    }

    fn get_long(&self, _rec: &dyn Record) -> i64 {
        misuse(std::any::type_name::<Self>(), self.column_type(), "get_long")
    }

    fn get_float(&self, _rec: &dyn Record) -> f32 {
        misuse(std::any::type_name::<Self>(), self.column_type(), "get_float")
    }

    fn get_double(&self, _rec: &dyn Record) -> f64 {
        misuse(std::any::type_name::<Self>(), self.column_type(), "get_double")
    }

    fn get_date(&self, _rec: &dyn Record) -> i64 {
        misuse(std::any::type_name::<Self>(), self.column_type(), "get_date")
    }

    fn get_flyweight_str<'a>(&'a self, _rec: &'a dyn Record) -> Option<FlyweightStr<'a>> {
        misuse(
            std::any::type_name::<Self>(),
            self.column_type(),
            "get_flyweight_str",
        )
    }

    fn get_flyweight_str_b<'a>(&'a self, rec: &'a dyn Record) -> Option<FlyweightStr<'a>> {
        self.get_flyweight_str(rec)
    }

    fn write_str(&self, rec: &dyn Record, sink: &mut String) {
        if let Some(s) = self.get_flyweight_str(rec) {
            s.write_to(sink);
        }
    }

    fn get_str_len(&self, rec: &dyn Record) -> i32 {
        match self.get_flyweight_str(rec) {
            Some(s) => s.len() as i32,
            None => NULL_LEN,
        }
    }

    fn get_sym<'a>(&'a self, _rec: &'a dyn Record) -> Option<&'a str> {
        misuse(std::any::type_name::<Self>(), self.column_type(), "get_sym")
    }

    fn get_bin<'a>(&'a self, _rec: &'a dyn Record) -> Option<&'a [u8]> {
        misuse(std::any::type_name::<Self>(), self.column_type(), "get_bin")
    }

    /// Diagnostic form of the expression.
    fn plan(&self) -> serde_json::Value;
}

/// Record used to evaluate constant expressions. Any column access panics.
pub struct NoRecord;

pub static NO_RECORD: NoRecord = NoRecord;

impl Record for NoRecord {
    fn row_id(&self) -> i64 {
        -1
    }
}

/// Evaluates `column` against `rec` through the getter matching its type.
pub fn evaluate<'a>(column: &'a dyn VirtualColumn, rec: &'a dyn Record) -> Value<'a> {
    match column.column_type() {
        ColumnType::Boolean => Value::Bool(column.get_bool(rec)),
        ColumnType::Byte => Value::Byte(column.get_byte(rec)),
        ColumnType::Short => Value::Short(column.get_short(rec)),
        ColumnType::Int => Value::int(column.get_int(rec)),
        ColumnType::Long => Value::long(column.get_long(rec)),
        ColumnType::Float => Value::float(column.get_float(rec)),
        ColumnType::Double => Value::double(column.get_double(rec)),
        ColumnType::Date => Value::long(column.get_date(rec)).into_time(ColumnType::Date),
        ColumnType::Timestamp => Value::long(column.get_date(rec)).into_time(ColumnType::Timestamp),
        ColumnType::String => match column.get_flyweight_str(rec) {
            Some(s) => Value::Str(s.to_cow()),
            None => Value::Null,
        },
        ColumnType::Symbol => match column.get_sym(rec) {
            Some(s) => Value::Sym(Cow::Borrowed(s)),
            None => Value::Null,
        },
        ColumnType::Binary | ColumnType::Parameter => Value::Null,
    }
}

/// Replaces a constant expression with its value.
pub fn fold_constant(column: &dyn VirtualColumn) -> Box<dyn VirtualColumn> {
    let value = evaluate(column, &NO_RECORD).into_owned();
    Box::new(Constant::typed(value, column.column_type()))
}

/// True for a constant BOOLEAN expression evaluating to false.
pub(crate) fn is_constant_false(column: &dyn VirtualColumn) -> bool {
    column.column_type() == ColumnType::Boolean
        && column.is_constant()
        && !column.get_bool(&NO_RECORD)
}

/// True for a constant BOOLEAN expression evaluating to true.
pub(crate) fn is_constant_true(column: &dyn VirtualColumn) -> bool {
    column.column_type() == ColumnType::Boolean
        && column.is_constant()
        && column.get_bool(&NO_RECORD)
}
