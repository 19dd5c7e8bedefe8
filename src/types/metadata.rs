//! # Record Metadata
//!
//! Ordered column descriptors shared by every record source. A source's
//! metadata is fixed at construction and never changes across cursor
//! rebinds, so downstream nodes may resolve column indexes once.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::ColumnType;
use crate::error::PlanError;

/// Name of the single column exposed by row-id records.
pub const ROW_ID_COLUMN: &str = "rowid";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    name: String,
    column_type: ColumnType,
    size: usize,
    distinct_count_hint: usize,
    indexed: bool,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            size: column_type.size_of(),
            distinct_count_hint: 0,
            indexed: false,
        }
    }

    /// Declared maximum size for variable-width columns.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_distinct_count_hint(mut self, hint: usize) -> Self {
        self.distinct_count_hint = hint;
        self
    }

    pub fn indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn distinct_count_hint(&self) -> usize {
        self.distinct_count_hint
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordMetadata {
    columns: Vec<ColumnMetadata>,
    by_name: HashMap<String, usize>,
    timestamp_index: Option<usize>,
}

impl RecordMetadata {
    /// Builds metadata from ordered columns. When names repeat, lookup
    /// resolves to the first occurrence.
    pub fn new(columns: Vec<ColumnMetadata>) -> Self {
        let mut by_name = HashMap::with_capacity(columns.len());
        for (i, c) in columns.iter().enumerate() {
            by_name.entry(c.name.to_ascii_lowercase()).or_insert(i);
        }
        Self {
            columns,
            by_name,
            timestamp_index: None,
        }
    }

    /// Schema of a row-id record: a single LONG column.
    pub fn row_id() -> Self {
        Self::new(vec![ColumnMetadata::new(ROW_ID_COLUMN, ColumnType::Long)])
    }

    pub fn with_timestamp_index(mut self, index: usize) -> Result<Self, PlanError> {
        let column = self.column(index)?;
        if column.column_type() != ColumnType::Timestamp && column.column_type() != ColumnType::Date {
            return Err(PlanError::TypeMismatch {
                column: column.name().to_string(),
                expected: "TIMESTAMP",
                found: column.column_type(),
            });
        }
        self.timestamp_index = Some(index);
        Ok(self)
    }

    /// Columns of `self` followed by columns of `other`.
    pub fn concat(&self, other: &RecordMetadata) -> Self {
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        let mut meta = Self::new(columns);
        meta.timestamp_index = self.timestamp_index;
        meta
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Result<&ColumnMetadata, PlanError> {
        self.columns
            .get(index)
            .ok_or(PlanError::ColumnOutOfRange {
                index,
                count: self.columns.len(),
            })
    }

    /// Type of column `index`. Panics on an out-of-range index, which is a
    /// plan construction bug rather than a data condition.
    #[inline]
    pub fn column_type(&self, index: usize) -> ColumnType {
        self.columns[index].column_type
    }

    /// Case-insensitive name lookup.
    pub fn column_index(&self, name: &str) -> Result<usize, PlanError> {
        self.column_index_quiet(name)
            .ok_or_else(|| PlanError::UnknownColumn(name.to_string()))
    }

    pub fn column_index_quiet(&self, name: &str) -> Option<usize> {
        match self.by_name.get(name) {
            Some(i) => Some(*i),
            None => self.by_name.get(&name.to_ascii_lowercase()).copied(),
        }
    }

    pub fn timestamp_index(&self) -> Option<usize> {
        self.timestamp_index
    }

    /// Bytes used by the fixed slots of one materialized record.
    pub fn fixed_slot_size(&self) -> usize {
        self.columns.iter().map(|c| c.column_type.slot_size()).sum()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.columns
                .iter()
                .map(|c| serde_json::json!({ "name": c.name, "type": c.column_type }))
                .collect(),
        )
    }
}
