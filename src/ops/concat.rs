//! String concatenation.
//!
//! Concatenation absorbs nulls: `NULL + x` is `x`, `x + NULL` is `x`, and
//! only `NULL + NULL` is null (length `NULL_LEN`). The result is a two-span
//! flyweight over the operands, nothing is copied.

use serde_json::json;

use super::{fold_constant, VirtualColumn};
use crate::error::PlanError;
use crate::record::Record;
use crate::storage::StorageFacade;
use crate::types::{ColumnType, FlyweightStr, NULL_LEN};

pub struct StrConcatOperator {
    lhs: Box<dyn VirtualColumn>,
    rhs: Box<dyn VirtualColumn>,
}

impl StrConcatOperator {
    pub fn new(lhs: Box<dyn VirtualColumn>, rhs: Box<dyn VirtualColumn>) -> Result<Self, PlanError> {
        for operand in [&lhs, &rhs] {
            if !operand.column_type().is_text() {
                return Err(PlanError::UnknownFunction {
                    name: "concat".to_string(),
                    args: format!("{}, {}", lhs.column_type(), rhs.column_type()),
                });
            }
        }
        Ok(Self { lhs, rhs })
    }
}

impl VirtualColumn for StrConcatOperator {
    fn column_type(&self) -> ColumnType {
        ColumnType::String
    }

    fn is_constant(&self) -> bool {
        self.lhs.is_constant() && self.rhs.is_constant()
    }

    fn prepare(&mut self, facade: &dyn StorageFacade) {
        self.lhs.prepare(facade);
        self.rhs.prepare(facade);
    }

    fn optimize(self: Box<Self>) -> Box<dyn VirtualColumn> {
        let node = StrConcatOperator {
            lhs: self.lhs.optimize(),
            rhs: self.rhs.optimize(),
        };
        if node.is_constant() {
            fold_constant(&node)
        } else {
            Box::new(node)
        }
    }

    fn get_flyweight_str<'a>(&'a self, rec: &'a dyn Record) -> Option<FlyweightStr<'a>> {
        FlyweightStr::concat(self.lhs.get_flyweight_str(rec), self.rhs.get_flyweight_str(rec))
    }

    fn get_flyweight_str_b<'a>(&'a self, rec: &'a dyn Record) -> Option<FlyweightStr<'a>> {
        FlyweightStr::concat(
            self.lhs.get_flyweight_str_b(rec),
            self.rhs.get_flyweight_str_b(rec),
        )
    }

    fn write_str(&self, rec: &dyn Record, sink: &mut String) {
        self.lhs.write_str(rec, sink);
        self.rhs.write_str(rec, sink);
    }

    fn get_str_len(&self, rec: &dyn Record) -> i32 {
        let ll = self.lhs.get_str_len(rec);
        let rl = self.rhs.get_str_len(rec);
        if ll == NULL_LEN {
            return rl;
        }
        if rl == NULL_LEN {
            return ll;
        }
        ll + rl
    }

    fn plan(&self) -> serde_json::Value {
        json!({ "op": "StrConcat", "lhs": self.lhs.plan(), "rhs": self.rhs.plan() })
    }
}
