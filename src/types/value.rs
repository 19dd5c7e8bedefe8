//! # Runtime Value Representation
//!
//! `Value<'a>` is the tagged union over every [`ColumnType`]. Records keep
//! their wide typed-getter interface for hot paths; `Value` is the generic
//! accessor used where the column type is only known at runtime (comparators,
//! constants, partition keys, result materialization).
//!
//! ## Null Semantics
//!
//! Storage encodes nulls in-band with per-type sentinels:
//!
//! | Type                    | Null sentinel  |
//! |-------------------------|----------------|
//! | INT, SYMBOL key         | `i32::MIN` / -1|
//! | LONG, DATE, TIMESTAMP   | `i64::MIN`     |
//! | FLOAT, DOUBLE           | NaN            |
//! | STRING, BINARY          | absent (`None`), length `NULL_LEN` |
//! | BOOLEAN, BYTE, SHORT    | not nullable   |
//!
//! [`Value::read`] maps every sentinel to `Value::Null`, and the `to_*`
//! conversions map `Value::Null` back to the sentinel of the requested type.
//!
//! ## Ordering
//!
//! [`Value::compare_for_sort`] is a total order: nulls first, integers and
//! floats compared numerically (mixed operands promoted to `f64`), strings
//! and symbols by character, binaries bytewise. [`Value::compare`] is the
//! predicate flavour and returns `None` whenever a null is involved.

use std::borrow::Cow;
use std::cmp::Ordering;

use super::{ColumnType, INT_NULL, LONG_NULL};
use crate::record::Record;

#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(Cow<'a, str>),
    Sym(Cow<'a, str>),
    Bin(Cow<'a, [u8]>),
    Date(i64),
    Timestamp(i64),
}

impl<'a> Value<'a> {
    /// Reads column `col` of `record` as a value of type `column_type`.
    pub fn read(record: &'a dyn Record, column_type: ColumnType, col: usize) -> Value<'a> {
        match column_type {
            ColumnType::Boolean => Value::Bool(record.get_bool(col)),
            ColumnType::Byte => Value::Byte(record.get_byte(col)),
            ColumnType::Short => Value::Short(record.get_short(col)),
            ColumnType::Int => Value::int(record.get_int(col)),
            ColumnType::Long => Value::long(record.get_long(col)),
            ColumnType::Float => Value::float(record.get_float(col)),
            ColumnType::Double => Value::double(record.get_double(col)),
            ColumnType::String => match record.get_flyweight_str(col) {
                Some(s) => Value::Str(s.to_cow()),
                None => Value::Null,
            },
            ColumnType::Symbol => match record.get_sym(col) {
                Some(s) => Value::Sym(Cow::Borrowed(s)),
                None => Value::Null,
            },
            ColumnType::Binary => match record.get_bin(col) {
                Some(b) => Value::Bin(Cow::Borrowed(b)),
                None => Value::Null,
            },
            ColumnType::Date => match record.get_date(col) {
                LONG_NULL => Value::Null,
                v => Value::Date(v),
            },
            ColumnType::Timestamp => match record.get_date(col) {
                LONG_NULL => Value::Null,
                v => Value::Timestamp(v),
            },
            ColumnType::Parameter => Value::Null,
        }
    }

    pub fn int(v: i32) -> Self {
        if v == INT_NULL {
            Value::Null
        } else {
            Value::Int(v)
        }
    }

    pub fn long(v: i64) -> Self {
        if v == LONG_NULL {
            Value::Null
        } else {
            Value::Long(v)
        }
    }

    pub fn float(v: f32) -> Self {
        if v.is_nan() {
            Value::Null
        } else {
            Value::Float(v)
        }
    }

    pub fn double(v: f64) -> Self {
        if v.is_nan() {
            Value::Null
        } else {
            Value::Double(v)
        }
    }

    pub fn str(s: &'a str) -> Self {
        Value::Str(Cow::Borrowed(s))
    }

    pub fn sym(s: &'a str) -> Self {
        Value::Sym(Cow::Borrowed(s))
    }

    /// Retags an integral value as DATE or TIMESTAMP; null stays null.
    pub fn into_time(self, column_type: ColumnType) -> Self {
        match (self, column_type) {
            (Value::Null, _) => Value::Null,
            (v, ColumnType::Date) => Value::Date(v.to_long()),
            (v, ColumnType::Timestamp) => Value::Timestamp(v.to_long()),
            (v, _) => v,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Natural column type of a non-null value.
    pub fn column_type(&self) -> Option<ColumnType> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => ColumnType::Boolean,
            Value::Byte(_) => ColumnType::Byte,
            Value::Short(_) => ColumnType::Short,
            Value::Int(_) => ColumnType::Int,
            Value::Long(_) => ColumnType::Long,
            Value::Float(_) => ColumnType::Float,
            Value::Double(_) => ColumnType::Double,
            Value::Str(_) => ColumnType::String,
            Value::Sym(_) => ColumnType::Symbol,
            Value::Bin(_) => ColumnType::Binary,
            Value::Date(_) => ColumnType::Date,
            Value::Timestamp(_) => ColumnType::Timestamp,
        })
    }

    pub fn to_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Null => false,
            other => panic!("value {:?} is not BOOLEAN", other),
        }
    }

    pub fn to_long(&self) -> i64 {
        match self {
            Value::Null => LONG_NULL,
            Value::Byte(v) => *v as i64,
            Value::Short(v) => *v as i64,
            Value::Int(v) => *v as i64,
            Value::Long(v) | Value::Date(v) | Value::Timestamp(v) => *v,
            other => panic!("value {:?} is not integral", other),
        }
    }

    pub fn to_int(&self) -> i32 {
        match self {
            Value::Null => INT_NULL,
            Value::Byte(v) => *v as i32,
            Value::Short(v) => *v as i32,
            Value::Int(v) => *v,
            other => panic!("value {:?} does not fit INT", other),
        }
    }

    pub fn to_double(&self) -> f64 {
        match self {
            Value::Null => f64::NAN,
            Value::Float(v) => *v as f64,
            Value::Double(v) => *v,
            Value::Byte(_) | Value::Short(_) | Value::Int(_) | Value::Long(_) => self.to_long() as f64,
            other => panic!("value {:?} is not numeric", other),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Sym(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_owned(self) -> Value<'static> {
        match self {
            Value::Null => Value::Null,
            Value::Bool(v) => Value::Bool(v),
            Value::Byte(v) => Value::Byte(v),
            Value::Short(v) => Value::Short(v),
            Value::Int(v) => Value::Int(v),
            Value::Long(v) => Value::Long(v),
            Value::Float(v) => Value::Float(v),
            Value::Double(v) => Value::Double(v),
            Value::Str(s) => Value::Str(Cow::Owned(s.into_owned())),
            Value::Sym(s) => Value::Sym(Cow::Owned(s.into_owned())),
            Value::Bin(b) => Value::Bin(Cow::Owned(b.into_owned())),
            Value::Date(v) => Value::Date(v),
            Value::Timestamp(v) => Value::Timestamp(v),
        }
    }

    /// Copies borrowed payloads into `arena`.
    pub fn clone_to_arena<'b>(&self, arena: &'b bumpalo::Bump) -> Value<'b> {
        match self {
            Value::Str(s) => Value::Str(Cow::Borrowed(arena.alloc_str(s))),
            Value::Sym(s) => Value::Sym(Cow::Borrowed(arena.alloc_str(s))),
            Value::Bin(b) => Value::Bin(Cow::Borrowed(arena.alloc_slice_copy(b))),
            other => other.clone().into_owned(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Byte(_)
            | Value::Short(_)
            | Value::Int(_)
            | Value::Long(_)
            | Value::Date(_)
            | Value::Timestamp(_)
            | Value::Float(_)
            | Value::Double(_) => 2,
            Value::Str(_) | Value::Sym(_) => 3,
            Value::Bin(_) => 4,
        }
    }

    fn is_floating(&self) -> bool {
        matches!(self, Value::Float(_) | Value::Double(_))
    }

    /// SQL comparison: `None` when either side is null.
    pub fn compare(&self, other: &Value<'_>) -> Option<Ordering> {
        if self.is_null() || other.is_null() {
            return None;
        }
        match (self.rank(), other.rank()) {
            (2, 2) if self.is_floating() || other.is_floating() => {
                self.to_double().partial_cmp(&other.to_double())
            }
            (2, 2) => Some(self.to_long().cmp(&other.to_long())),
            _ => Some(self.compare_for_sort(other)),
        }
    }

    /// Total order used by sort comparators. Nulls sort first.
    pub fn compare_for_sort(&self, other: &Value<'_>) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Str(a) | Value::Sym(a), Value::Str(b) | Value::Sym(b)) => {
                a.chars().cmp(b.chars())
            }
            (Value::Bin(a), Value::Bin(b)) => a.cmp(b),
            _ if self.rank() == 2 && other.rank() == 2 => {
                if self.is_floating() || other.is_floating() {
                    self.to_double().total_cmp(&other.to_double())
                } else {
                    self.to_long().cmp(&other.to_long())
                }
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Appends a self-delimiting encoding used as a hash-map key for
    /// partitioning. Integral values of any width encode identically.
    pub fn encode_key(&self, buf: &mut Vec<u8>) {
        match self {
            Value::Null => buf.push(0),
            Value::Bool(b) => {
                buf.push(1);
                buf.push(*b as u8);
            }
            Value::Float(_) | Value::Double(_) => {
                buf.push(3);
                buf.extend(self.to_double().to_bits().to_be_bytes());
            }
            Value::Str(s) | Value::Sym(s) => {
                buf.push(4);
                buf.extend((s.len() as u32).to_be_bytes());
                buf.extend(s.as_bytes());
            }
            Value::Bin(b) => {
                buf.push(5);
                buf.extend((b.len() as u32).to_be_bytes());
                buf.extend(b.iter());
            }
            _ => {
                buf.push(2);
                buf.extend(self.to_long().to_be_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_become_null() {
        assert_eq!(Value::int(INT_NULL), Value::Null);
        assert_eq!(Value::long(LONG_NULL), Value::Null);
        assert_eq!(Value::double(f64::NAN), Value::Null);
        assert_eq!(Value::float(f32::NAN), Value::Null);
        assert_eq!(Value::int(7), Value::Int(7));
    }

    #[test]
    fn null_converts_back_to_sentinel() {
        assert_eq!(Value::Null.to_int(), INT_NULL);
        assert_eq!(Value::Null.to_long(), LONG_NULL);
        assert!(Value::Null.to_double().is_nan());
    }

    #[test]
    fn sort_order_puts_nulls_first_and_promotes_numerics() {
        let mut values = vec![
            Value::Double(2.5),
            Value::Null,
            Value::Int(3),
            Value::Long(-1),
            Value::Int(2),
        ];
        values.sort_by(|a, b| a.compare_for_sort(b));

        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Long(-1),
                Value::Int(2),
                Value::Double(2.5),
                Value::Int(3),
            ]
        );
    }

    #[test]
    fn predicate_compare_is_unknown_for_null() {
        assert_eq!(Value::Int(1).compare(&Value::Null), None);
        assert_eq!(Value::Int(1).compare(&Value::Long(1)), Some(Ordering::Equal));
        assert_eq!(
            Value::str("abc").compare(&Value::sym("abd")),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn integral_widths_share_key_encoding() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        Value::Int(42).encode_key(&mut a);
        Value::Long(42).encode_key(&mut b);
        assert_eq!(a, b);

        let mut c = Vec::new();
        Value::str("42").encode_key(&mut c);
        assert_ne!(a, c);
    }

    #[test]
    fn into_owned_detaches_borrowed_text() {
        let owned = {
            let text = String::from("BHP");
            Value::str(&text).into_owned()
        };
        assert_eq!(owned.as_str(), Some("BHP"));
    }

    #[test]
    fn clone_to_arena_copies_text() {
        let arena = bumpalo::Bump::new();
        let text = String::from("AUD");
        let v = Value::sym(&text).clone_to_arena(&arena);
        drop(text);
        assert_eq!(v.as_str(), Some("AUD"));
    }
}
