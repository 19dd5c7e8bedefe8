//! # Virtual Column Operator Test Suite
//!
//! Operator semantics observed through the public expression API.
//!
//! ## Test Categories
//!
//! 1. **Concatenation**: null absorption, lengths, flyweight views
//! 2. **Boolean Folding**: AND short-circuits during optimization
//! 3. **Null Propagation**: arithmetic and comparisons over nulls
//! 4. **Factory Resolution**: plan-time errors for unsupported operands
//!
//! ## Usage
//!
//! ```sh
//! cargo test --test operators
//! ```

use std::cell::Cell;
use std::rc::Rc;

use chronodb::ops::{
    evaluate, AddOperator, AndOperator, Constant, OrOperator, StrConcatOperator, NO_RECORD,
};
use chronodb::prelude::*;
use chronodb::types::{INT_NULL, NULL_LEN};
use serde_json::json;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// BOOLEAN node that must never be optimized or evaluated. Counts how often
/// its constness is queried.
struct Explosive {
    probes: Rc<Cell<usize>>,
}

impl Explosive {
    fn boxed() -> (Box<dyn VirtualColumn>, Rc<Cell<usize>>) {
        let probes = Rc::new(Cell::new(0));
        (
            Box::new(Explosive {
                probes: probes.clone(),
            }),
            probes,
        )
    }
}

impl VirtualColumn for Explosive {
    fn column_type(&self) -> ColumnType {
        ColumnType::Boolean
    }

    fn is_constant(&self) -> bool {
        self.probes.set(self.probes.get() + 1);
        false
    }

    fn optimize(self: Box<Self>) -> Box<dyn VirtualColumn> {
        panic!("explosive operand was optimized")
    }

    fn get_bool(&self, _rec: &dyn Record) -> bool {
        panic!("explosive operand was evaluated")
    }

    fn plan(&self) -> serde_json::Value {
        json!({ "op": "Explosive" })
    }
}

fn text(s: Option<&str>) -> Box<dyn VirtualColumn> {
    match s {
        Some(s) => Box::new(Constant::str(s)),
        None => Box::new(Constant::null(ColumnType::String)),
    }
}

fn concat(lhs: Option<&str>, rhs: Option<&str>) -> StrConcatOperator {
    StrConcatOperator::new(text(lhs), text(rhs)).unwrap()
}

fn notes() -> MemoryStorage {
    let storage = MemoryStorage::new();
    storage.register(
        Journal::builder("notes")
            .string("a")
            .symbol("b")
            .int("n")
            .build()
            .unwrap(),
    );
    let rows = [
        (Some("x"), Some("AUD"), 1),
        (None, Some("EUR"), 2),
        (Some("y"), None, 3),
        (None, None, 4),
    ];
    for (a, b, n) in rows {
        storage
            .append(
                "notes",
                &[
                    a.map_or(Value::Null, Value::str),
                    b.map_or(Value::Null, Value::sym),
                    Value::Int(n),
                ],
            )
            .unwrap();
    }
    storage
}

// ============================================================================
// CONCATENATION TESTS
// ============================================================================

mod concatenation {
    use super::*;

    #[test]
    fn nulls_are_absorbed() {
        let cases = [
            (Some("ab"), Some("cd"), Some("abcd")),
            (None, Some("cd"), Some("cd")),
            (Some("ab"), None, Some("ab")),
            (Some(""), None, Some("")),
        ];
        for (lhs, rhs, expected) in cases {
            let op = concat(lhs, rhs);
            let got = op.get_flyweight_str(&NO_RECORD).map(|s| s.to_cow().into_owned());
            assert_eq!(got.as_deref(), expected, "{:?} + {:?}", lhs, rhs);
            assert_eq!(op.get_str_len(&NO_RECORD), expected.map_or(NULL_LEN, |s| s.len() as i32));
        }
    }

    #[test]
    fn null_plus_null_is_null() {
        let op = concat(None, None);
        assert!(op.get_flyweight_str(&NO_RECORD).is_none());
        assert_eq!(op.get_str_len(&NO_RECORD), NULL_LEN);

        let mut sink = String::from("<");
        op.write_str(&NO_RECORD, &mut sink);
        assert_eq!(sink, "<");
    }

    #[test]
    fn flyweight_spans_both_operands() {
        let op = concat(Some("héllo "), Some("wörld"));
        let s = op.get_flyweight_str(&NO_RECORD).unwrap();
        assert_eq!(s.len(), 11);
        assert_eq!(s.char_at(1), Some('é'));
        assert_eq!(s.char_at(7), Some('ö'));
        assert_eq!(s.chars().collect::<String>(), "héllo wörld");
    }

    #[test]
    fn constant_operands_fold() {
        let folded = Box::new(concat(Some("a"), None)).optimize();
        assert!(folded.is_constant());
        assert_eq!(evaluate(&*folded, &NO_RECORD), Value::str("a"));
    }

    #[test]
    fn column_operands_follow_the_cursor() {
        let storage = notes();
        let meta = storage.metadata("notes").unwrap();
        let factory = FunctionFactory::new();
        let node = factory
            .create(
                "concat",
                vec![
                    factory.column(&meta, "a").unwrap(),
                    factory.column(&meta, "b").unwrap(),
                ],
                &meta,
            )
            .unwrap()
            .optimize();

        let mut cursor = storage.open_cursor("notes").unwrap();
        let mut out = Vec::new();
        while cursor.has_next().unwrap() {
            let rec = cursor.next().unwrap();
            let mut sink = String::new();
            node.write_str(rec, &mut sink);
            out.push((sink, node.get_str_len(rec)));
        }
        assert_eq!(
            out,
            vec![
                ("xAUD".to_string(), 4),
                ("EUR".to_string(), 3),
                ("y".to_string(), 1),
                (String::new(), NULL_LEN),
            ]
        );
    }
}

// ============================================================================
// BOOLEAN FOLDING TESTS
// ============================================================================

mod boolean_folding {
    use super::*;

    #[test]
    fn and_with_false_right_never_touches_left() {
        let (explosive, probes) = Explosive::boxed();
        let node = Box::new(AndOperator::new(explosive, Box::new(Constant::bool(false)))).optimize();
        assert!(node.is_constant());
        assert!(!node.get_bool(&NO_RECORD));
        assert_eq!(probes.get(), 0);
    }

    #[test]
    fn and_with_false_left_never_optimizes_right() {
        let (explosive, probes) = Explosive::boxed();
        let node = Box::new(AndOperator::new(Box::new(Constant::bool(false)), explosive)).optimize();
        assert!(node.is_constant());
        assert!(!node.get_bool(&NO_RECORD));
        assert!(probes.get() <= 1);
    }

    #[test]
    fn folding_reaches_through_nested_expressions() {
        let (explosive, _) = Explosive::boxed();
        let never = Box::new(AndOperator::new(
            Box::new(Constant::bool(true)),
            Box::new(Constant::bool(false)),
        ));
        let node = Box::new(AndOperator::new(explosive, never)).optimize();
        assert!(node.is_constant());
        assert!(!node.get_bool(&NO_RECORD));
    }

    #[test]
    fn and_with_true_keeps_the_other_side() {
        let storage = notes();
        let meta = storage.metadata("notes").unwrap();
        let factory = FunctionFactory::new();
        let gt = factory
            .create(
                ">",
                vec![factory.column(&meta, "n").unwrap(), Box::new(Constant::int(2))],
                &meta,
            )
            .unwrap();
        let expected = gt.plan();
        let node = Box::new(AndOperator::new(Box::new(Constant::bool(true)), gt)).optimize();
        assert_eq!(node.plan(), expected);
    }

    #[test]
    fn or_with_constant_operands_folds() {
        let node = Box::new(OrOperator::new(
            Box::new(Constant::bool(false)),
            Box::new(Constant::bool(true)),
        ))
        .optimize();
        assert!(node.is_constant());
        assert!(node.get_bool(&NO_RECORD));
    }
}

// ============================================================================
// NULL PROPAGATION TESTS
// ============================================================================

mod null_propagation {
    use super::*;

    #[test]
    fn addition_with_null_is_null() {
        let op = AddOperator::new(
            Box::new(Constant::int(1)),
            Box::new(Constant::null(ColumnType::Int)),
        )
        .unwrap();
        assert_eq!(op.column_type(), ColumnType::Int);
        assert_eq!(op.get_int(&NO_RECORD), INT_NULL);
    }

    #[test]
    fn comparison_with_null_is_false() {
        let storage = notes();
        let meta = storage.metadata("notes").unwrap();
        let factory = FunctionFactory::new();
        for symbol in ["=", "!=", "<", ">="] {
            let op = factory
                .create(
                    symbol,
                    vec![Box::new(Constant::int(1)), Box::new(Constant::null(ColumnType::Int))],
                    &meta,
                )
                .unwrap();
            assert!(!op.get_bool(&NO_RECORD), "1 {} NULL", symbol);
        }
    }
}

// ============================================================================
// FACTORY RESOLUTION TESTS
// ============================================================================

mod factory_resolution {
    use super::*;

    fn meta() -> RecordMetadata {
        notes().metadata("notes").unwrap()
    }

    #[test]
    fn unknown_name_reports_operand_types() {
        let meta = meta();
        let factory = FunctionFactory::new();
        let err = factory
            .create(
                "median",
                vec![factory.column(&meta, "n").unwrap(), factory.column(&meta, "a").unwrap()],
                &meta,
            )
            .err()
            .unwrap();
        assert_eq!(
            err,
            PlanError::UnknownFunction {
                name: "median".to_string(),
                args: "INT, STRING".to_string(),
            }
        );
    }

    #[test]
    fn concat_rejects_numbers() {
        let meta = meta();
        let factory = FunctionFactory::new();
        let err = factory
            .create(
                "concat",
                vec![factory.column(&meta, "a").unwrap(), factory.column(&meta, "n").unwrap()],
                &meta,
            )
            .err()
            .unwrap();
        assert!(matches!(err, PlanError::UnknownFunction { ref name, .. } if name == "concat"));
    }

    #[test]
    fn and_rejects_non_boolean_operands() {
        let meta = meta();
        let factory = FunctionFactory::new();
        let err = factory
            .create(
                "AND",
                vec![factory.column(&meta, "n").unwrap(), Box::new(Constant::bool(true))],
                &meta,
            )
            .err()
            .unwrap();
        assert!(matches!(err, PlanError::UnknownFunction { .. }));
    }

    #[test]
    fn unknown_column_is_a_plan_error() {
        let meta = meta();
        let err = FunctionFactory::new().column(&meta, "missing").err().unwrap();
        assert!(matches!(err, PlanError::UnknownColumn(_)));
    }
}
