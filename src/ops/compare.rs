//! Comparison operators.

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::json;

use super::{evaluate, fold_constant, VirtualColumn};
use crate::record::Record;
use crate::storage::StorageFacade;
use crate::types::ColumnType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "=" => CompareOp::Eq,
            "!=" | "<>" => CompareOp::Ne,
            "<" => CompareOp::Lt,
            "<=" => CompareOp::Le,
            ">" => CompareOp::Gt,
            ">=" => CompareOp::Ge,
            _ => return None,
        })
    }

    #[inline]
    pub fn test(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
        }
    }
}

/// Binary comparison; any null operand yields false.
pub struct CompareOperator {
    op: CompareOp,
    lhs: Box<dyn VirtualColumn>,
    rhs: Box<dyn VirtualColumn>,
}

impl CompareOperator {
    pub fn new(op: CompareOp, lhs: Box<dyn VirtualColumn>, rhs: Box<dyn VirtualColumn>) -> Self {
        Self { op, lhs, rhs }
    }
}

impl VirtualColumn for CompareOperator {
    fn column_type(&self) -> ColumnType {
        ColumnType::Boolean
    }

    fn is_constant(&self) -> bool {
        self.lhs.is_constant() && self.rhs.is_constant()
    }

    fn prepare(&mut self, facade: &dyn StorageFacade) {
        self.lhs.prepare(facade);
        self.rhs.prepare(facade);
    }

    fn optimize(self: Box<Self>) -> Box<dyn VirtualColumn> {
        let CompareOperator { op, lhs, rhs } = *self;
        let node = CompareOperator {
            op,
            lhs: lhs.optimize(),
            rhs: rhs.optimize(),
        };
        if node.is_constant() {
            fold_constant(&node)
        } else {
            Box::new(node)
        }
    }

    fn get_bool(&self, rec: &dyn Record) -> bool {
        let lhs = evaluate(&*self.lhs, rec);
        let rhs = evaluate(&*self.rhs, rec);
        lhs.compare(&rhs).map_or(false, |ord| self.op.test(ord))
    }

    fn plan(&self) -> serde_json::Value {
        json!({
            "op": "Compare",
            "cmp": self.op,
            "lhs": self.lhs.plan(),
            "rhs": self.rhs.plan(),
        })
    }
}
