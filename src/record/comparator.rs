//! # Record Comparators
//!
//! A comparator orders the record being inserted ("left") against records
//! already in a structure ("right"). `set_left` snapshots the key columns of
//! the left record once, so the right side can be produced by repositioning
//! the very cursor the left record came from.

use std::cmp::Ordering;

use smallvec::SmallVec;

use crate::error::PlanError;
use crate::record::Record;
use crate::types::{ColumnType, RecordMetadata, Value};

pub trait RecordComparator {
    fn set_left(&mut self, record: &dyn Record);

    /// Orders the current left record against `right`.
    fn compare(&self, right: &dyn Record) -> Ordering;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: usize,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(column: usize) -> Self {
        Self {
            column,
            descending: false,
        }
    }

    pub fn desc(column: usize) -> Self {
        Self {
            column,
            descending: true,
        }
    }
}

/// Multi-column ordering using [`Value::compare_for_sort`]; nulls first
/// (last when descending).
#[derive(Debug, Clone)]
pub struct ColumnComparator {
    keys: SmallVec<[(SortKey, ColumnType); 4]>,
    left: SmallVec<[Value<'static>; 4]>,
}

impl ColumnComparator {
    pub fn new(metadata: &RecordMetadata, keys: &[SortKey]) -> Result<Self, PlanError> {
        let mut resolved = SmallVec::with_capacity(keys.len());
        for key in keys {
            let column = metadata.column(key.column)?;
            if column.column_type() == ColumnType::Parameter {
                return Err(PlanError::TypeMismatch {
                    column: column.name().to_string(),
                    expected: "a comparable column",
                    found: column.column_type(),
                });
            }
            resolved.push((*key, column.column_type()));
        }
        Ok(Self {
            keys: resolved,
            left: SmallVec::new(),
        })
    }

    /// Resolves `(name, descending)` pairs against `metadata`.
    pub fn by_names(metadata: &RecordMetadata, names: &[(&str, bool)]) -> Result<Self, PlanError> {
        let keys = names
            .iter()
            .map(|(name, descending)| {
                metadata.column_index(name).map(|column| SortKey {
                    column,
                    descending: *descending,
                })
            })
            .collect::<Result<SmallVec<[SortKey; 4]>, _>>()?;
        Self::new(metadata, &keys)
    }

    pub fn keys(&self) -> impl Iterator<Item = SortKey> + '_ {
        self.keys.iter().map(|(k, _)| *k)
    }
}

impl RecordComparator for ColumnComparator {
    fn set_left(&mut self, record: &dyn Record) {
        self.left.clear();
        for (key, column_type) in &self.keys {
            self.left
                .push(Value::read(record, *column_type, key.column).into_owned());
        }
    }

    fn compare(&self, right: &dyn Record) -> Ordering {
        for ((key, column_type), left) in self.keys.iter().zip(&self.left) {
            let right = Value::read(right, *column_type, key.column);
            let ord = left.compare_for_sort(&right);
            if ord != Ordering::Equal {
                return if key.descending { ord.reverse() } else { ord };
            }
        }
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::OwnedRecord;
    use crate::types::ColumnMetadata;

    fn meta() -> RecordMetadata {
        RecordMetadata::new(vec![
            ColumnMetadata::new("sym", ColumnType::Symbol),
            ColumnMetadata::new("px", ColumnType::Double),
        ])
    }

    fn row(sym: Option<&'static str>, px: f64) -> OwnedRecord {
        OwnedRecord::from_values(
            &meta(),
            vec![sym.map_or(Value::Null, Value::sym), Value::double(px)],
        )
    }

    #[test]
    fn compares_columns_in_key_order() {
        let mut cmp = ColumnComparator::new(&meta(), &[SortKey::asc(0), SortKey::desc(1)]).unwrap();

        cmp.set_left(&row(Some("A"), 1.0));
        assert_eq!(cmp.compare(&row(Some("B"), 0.0)), Ordering::Less);
        assert_eq!(cmp.compare(&row(Some("A"), 2.0)), Ordering::Greater);
        assert_eq!(cmp.compare(&row(Some("A"), 1.0)), Ordering::Equal);
    }

    #[test]
    fn nulls_sort_first() {
        let mut cmp = ColumnComparator::by_names(&meta(), &[("sym", false)]).unwrap();
        cmp.set_left(&row(None, 0.0));
        assert_eq!(cmp.compare(&row(Some("A"), 0.0)), Ordering::Less);
    }

    #[test]
    fn unknown_sort_column_is_a_plan_error() {
        let err = ColumnComparator::by_names(&meta(), &[("ask", false)]).unwrap_err();
        assert_eq!(err, PlanError::UnknownColumn("ask".into()));
    }
}
