//! Boolean operators.

use serde_json::json;

use super::{fold_constant, is_constant_false, is_constant_true, Constant, VirtualColumn, NO_RECORD};
use crate::record::Record;
use crate::storage::StorageFacade;
use crate::types::ColumnType;

pub struct AndOperator {
    lhs: Box<dyn VirtualColumn>,
    rhs: Box<dyn VirtualColumn>,
}

impl AndOperator {
    pub fn new(lhs: Box<dyn VirtualColumn>, rhs: Box<dyn VirtualColumn>) -> Self {
        Self { lhs, rhs }
    }
}

impl VirtualColumn for AndOperator {
    fn column_type(&self) -> ColumnType {
        ColumnType::Boolean
    }

    fn is_constant(&self) -> bool {
        is_constant_false(&*self.rhs)
            || is_constant_false(&*self.lhs)
            || (self.lhs.is_constant() && self.rhs.is_constant())
    }

    fn prepare(&mut self, facade: &dyn StorageFacade) {
        self.lhs.prepare(facade);
        self.rhs.prepare(facade);
    }

    fn optimize(self: Box<Self>) -> Box<dyn VirtualColumn> {
        let AndOperator { lhs, rhs } = *self;
        // right operand first, the left one is never touched when it folds
        if is_constant_false(&*rhs) || is_constant_false(&*lhs) {
            return Box::new(Constant::bool(false));
        }
        let rhs = rhs.optimize();
        if is_constant_false(&*rhs) {
            return Box::new(Constant::bool(false));
        }
        let lhs = lhs.optimize();
        if is_constant_false(&*lhs) {
            return Box::new(Constant::bool(false));
        }
        if is_constant_true(&*rhs) {
            return lhs;
        }
        if is_constant_true(&*lhs) {
            return rhs;
        }
        Box::new(AndOperator { lhs, rhs })
    }

    fn get_bool(&self, rec: &dyn Record) -> bool {
        self.lhs.get_bool(rec) && self.rhs.get_bool(rec)
    }

    fn plan(&self) -> serde_json::Value {
        json!({ "op": "And", "lhs": self.lhs.plan(), "rhs": self.rhs.plan() })
    }
}

pub struct OrOperator {
    lhs: Box<dyn VirtualColumn>,
    rhs: Box<dyn VirtualColumn>,
}

impl OrOperator {
    pub fn new(lhs: Box<dyn VirtualColumn>, rhs: Box<dyn VirtualColumn>) -> Self {
        Self { lhs, rhs }
    }
}

impl VirtualColumn for OrOperator {
    fn column_type(&self) -> ColumnType {
        ColumnType::Boolean
    }

    fn is_constant(&self) -> bool {
        is_constant_true(&*self.rhs)
            || is_constant_true(&*self.lhs)
            || (self.lhs.is_constant() && self.rhs.is_constant())
    }

    fn prepare(&mut self, facade: &dyn StorageFacade) {
        self.lhs.prepare(facade);
        self.rhs.prepare(facade);
    }

    fn optimize(self: Box<Self>) -> Box<dyn VirtualColumn> {
        let OrOperator { lhs, rhs } = *self;
        if is_constant_true(&*rhs) || is_constant_true(&*lhs) {
            return Box::new(Constant::bool(true));
        }
        let rhs = rhs.optimize();
        if is_constant_true(&*rhs) {
            return Box::new(Constant::bool(true));
        }
        let lhs = lhs.optimize();
        if is_constant_true(&*lhs) {
            return Box::new(Constant::bool(true));
        }
        if is_constant_false(&*rhs) {
            return lhs;
        }
        if is_constant_false(&*lhs) {
            return rhs;
        }
        Box::new(OrOperator { lhs, rhs })
    }

    fn get_bool(&self, rec: &dyn Record) -> bool {
        self.lhs.get_bool(rec) || self.rhs.get_bool(rec)
    }

    fn plan(&self) -> serde_json::Value {
        json!({ "op": "Or", "lhs": self.lhs.plan(), "rhs": self.rhs.plan() })
    }
}

pub struct NotOperator {
    operand: Box<dyn VirtualColumn>,
}

impl NotOperator {
    pub fn new(operand: Box<dyn VirtualColumn>) -> Self {
        Self { operand }
    }
}

impl VirtualColumn for NotOperator {
    fn column_type(&self) -> ColumnType {
        ColumnType::Boolean
    }

    fn is_constant(&self) -> bool {
        self.operand.is_constant()
    }

    fn prepare(&mut self, facade: &dyn StorageFacade) {
        self.operand.prepare(facade);
    }

    fn optimize(self: Box<Self>) -> Box<dyn VirtualColumn> {
        let operand = self.operand.optimize();
        if operand.is_constant() {
            return Box::new(Constant::bool(!operand.get_bool(&NO_RECORD)));
        }
        Box::new(NotOperator { operand })
    }

    fn get_bool(&self, rec: &dyn Record) -> bool {
        !self.operand.get_bool(rec)
    }

    fn plan(&self) -> serde_json::Value {
        json!({ "op": "Not", "operand": self.operand.plan() })
    }
}

/// Folds a fully constant boolean tree in one step.
pub(crate) fn fold_if_constant(column: Box<dyn VirtualColumn>) -> Box<dyn VirtualColumn> {
    if column.is_constant() {
        fold_constant(&*column)
    } else {
        column
    }
}
