//! Arithmetic operators. A null operand makes the result null.

use serde_json::json;

use super::{fold_constant, misuse, VirtualColumn};
use crate::error::PlanError;
use crate::record::Record;
use crate::storage::StorageFacade;
use crate::types::{ColumnType, INT_NULL, LONG_NULL};

/// Result type of adding two numeric or time operands, `None` if the
/// combination is not supported.
pub(crate) fn addition_type(lhs: ColumnType, rhs: ColumnType) -> Option<ColumnType> {
    use ColumnType::*;
    let integral = |t: ColumnType| matches!(t, Byte | Short | Int | Long);
    match (lhs, rhs) {
        (Date | Timestamp, r) if integral(r) => Some(lhs),
        (l, Date | Timestamp) if integral(l) => Some(rhs),
        (l, r) if !l.is_numeric() || !r.is_numeric() => None,
        (Double | Float, _) | (_, Double | Float) => Some(Double),
        (Long, _) | (_, Long) => Some(Long),
        _ => Some(Int),
    }
}

pub struct AddOperator {
    lhs: Box<dyn VirtualColumn>,
    rhs: Box<dyn VirtualColumn>,
    column_type: ColumnType,
}

impl AddOperator {
    pub fn new(lhs: Box<dyn VirtualColumn>, rhs: Box<dyn VirtualColumn>) -> Result<Self, PlanError> {
        let column_type = addition_type(lhs.column_type(), rhs.column_type()).ok_or_else(|| {
            PlanError::UnknownFunction {
                name: "+".to_string(),
                args: format!("{}, {}", lhs.column_type(), rhs.column_type()),
            }
        })?;
        Ok(Self {
            lhs,
            rhs,
            column_type,
        })
    }

    fn long_operand(column: &dyn VirtualColumn, rec: &dyn Record) -> i64 {
        match column.column_type() {
            ColumnType::Byte => column.get_byte(rec) as i64,
            ColumnType::Short => column.get_short(rec) as i64,
            ColumnType::Int => match column.get_int(rec) {
                INT_NULL => LONG_NULL,
                v => v as i64,
            },
            ColumnType::Date | ColumnType::Timestamp => column.get_date(rec),
            _ => column.get_long(rec),
        }
    }

    fn double_operand(column: &dyn VirtualColumn, rec: &dyn Record) -> f64 {
        match column.column_type() {
            ColumnType::Double => column.get_double(rec),
            ColumnType::Float => column.get_float(rec) as f64,
            _ => match Self::long_operand(column, rec) {
                LONG_NULL => f64::NAN,
                v => v as f64,
            },
        }
    }
}

impl VirtualColumn for AddOperator {
    fn column_type(&self) -> ColumnType {
        self.column_type
    }

    fn is_constant(&self) -> bool {
        self.lhs.is_constant() && self.rhs.is_constant()
    }

    fn prepare(&mut self, facade: &dyn StorageFacade) {
        self.lhs.prepare(facade);
        self.rhs.prepare(facade);
    }

    fn optimize(self: Box<Self>) -> Box<dyn VirtualColumn> {
        let AddOperator {
            lhs,
            rhs,
            column_type,
        } = *self;
        let node = AddOperator {
            lhs: lhs.optimize(),
            rhs: rhs.optimize(),
            column_type,
        };
        if node.is_constant() {
            fold_constant(&node)
        } else {
            Box::new(node)
        }
    }

    fn get_int(&self, rec: &dyn Record) -> i32 {
        if self.column_type != ColumnType::Int {
            misuse("AddOperator", self.column_type, "get_int");
        }
        match (self.lhs.get_int(rec), self.rhs.get_int(rec)) {
            (INT_NULL, _) | (_, INT_NULL) => INT_NULL,
            (l, r) => l.wrapping_add(r),
        }
    }

    fn get_long(&self, rec: &dyn Record) -> i64 {
        match (
            Self::long_operand(&*self.lhs, rec),
            Self::long_operand(&*self.rhs, rec),
        ) {
            (LONG_NULL, _) | (_, LONG_NULL) => LONG_NULL,
            (l, r) => l.wrapping_add(r),
        }
    }

    fn get_date(&self, rec: &dyn Record) -> i64 {
        self.get_long(rec)
    }

    fn get_double(&self, rec: &dyn Record) -> f64 {
        Self::double_operand(&*self.lhs, rec) + Self::double_operand(&*self.rhs, rec)
    }

    fn plan(&self) -> serde_json::Value {
        json!({ "op": "Add", "lhs": self.lhs.plan(), "rhs": self.rhs.plan() })
    }
}

/// Unary minus over INT, LONG and DOUBLE operands.
pub struct NegativeOperator {
    operand: Box<dyn VirtualColumn>,
}

impl NegativeOperator {
    pub fn new(operand: Box<dyn VirtualColumn>) -> Result<Self, PlanError> {
        match operand.column_type() {
            ColumnType::Int | ColumnType::Long | ColumnType::Double => Ok(Self { operand }),
            other => Err(PlanError::UnknownFunction {
                name: "-".to_string(),
                args: other.to_string(),
            }),
        }
    }
}

impl VirtualColumn for NegativeOperator {
    fn column_type(&self) -> ColumnType {
        self.operand.column_type()
    }

    fn is_constant(&self) -> bool {
        self.operand.is_constant()
    }

    fn prepare(&mut self, facade: &dyn StorageFacade) {
        self.operand.prepare(facade);
    }

    fn optimize(self: Box<Self>) -> Box<dyn VirtualColumn> {
        let node = NegativeOperator {
            operand: self.operand.optimize(),
        };
        if node.is_constant() {
            fold_constant(&node)
        } else {
            Box::new(node)
        }
    }

    fn get_int(&self, rec: &dyn Record) -> i32 {
        match self.operand.get_int(rec) {
            INT_NULL => INT_NULL,
            v => v.wrapping_neg(),
        }
    }

    fn get_long(&self, rec: &dyn Record) -> i64 {
        match self.operand.get_long(rec) {
            LONG_NULL => LONG_NULL,
            v => v.wrapping_neg(),
        }
    }

    fn get_double(&self, rec: &dyn Record) -> f64 {
        -self.operand.get_double(rec)
    }

    fn plan(&self) -> serde_json::Value {
        json!({ "op": "Negative", "operand": self.operand.plan() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{Constant, RecordColumn, NO_RECORD};
    use crate::record::OwnedRecord;
    use crate::types::{ColumnMetadata, RecordMetadata, Value};

    #[test]
    fn result_type_widens() {
        assert_eq!(addition_type(ColumnType::Int, ColumnType::Int), Some(ColumnType::Int));
        assert_eq!(addition_type(ColumnType::Int, ColumnType::Long), Some(ColumnType::Long));
        assert_eq!(addition_type(ColumnType::Long, ColumnType::Double), Some(ColumnType::Double));
        assert_eq!(
            addition_type(ColumnType::Timestamp, ColumnType::Long),
            Some(ColumnType::Timestamp)
        );
        assert_eq!(addition_type(ColumnType::String, ColumnType::Int), None);
    }

    #[test]
    fn null_operand_propagates() {
        let meta = RecordMetadata::new(vec![ColumnMetadata::new("qty", ColumnType::Int)]);
        let add = AddOperator::new(
            Box::new(RecordColumn::new(&meta, "qty").unwrap()),
            Box::new(Constant::long(10)),
        )
        .unwrap();

        let null_row = OwnedRecord::from_values(&meta, vec![Value::Null]);
        let row = OwnedRecord::from_values(&meta, vec![Value::Int(5)]);
        assert_eq!(add.column_type(), ColumnType::Long);
        assert_eq!(add.get_long(&null_row), LONG_NULL);
        assert_eq!(add.get_long(&row), 15);
    }

    #[test]
    fn timestamp_plus_offset() {
        let add = AddOperator::new(
            Box::new(Constant::typed(Value::Timestamp(1_000), ColumnType::Timestamp)),
            Box::new(Constant::int(500)),
        )
        .unwrap();
        assert_eq!(add.get_date(&NO_RECORD), 1_500);
        let folded = Box::new(add).optimize();
        assert!(folded.is_constant());
        assert_eq!(folded.column_type(), ColumnType::Timestamp);
        assert_eq!(folded.get_date(&NO_RECORD), 1_500);
    }

    #[test]
    fn negative_folds_and_keeps_nulls() {
        let neg = Box::new(NegativeOperator::new(Box::new(Constant::double(2.5))).unwrap()).optimize();
        assert!(neg.is_constant());
        assert_eq!(neg.get_double(&NO_RECORD), -2.5);

        let null = NegativeOperator::new(Box::new(Constant::null(ColumnType::Int))).unwrap();
        assert_eq!(null.get_int(&NO_RECORD), INT_NULL);
    }

    #[test]
    fn unsupported_operands_are_plan_errors() {
        let err = NegativeOperator::new(Box::new(Constant::str("x"))).err().unwrap();
        assert_eq!(
            err,
            PlanError::UnknownFunction {
                name: "-".into(),
                args: "STRING".into()
            }
        );
    }
}
