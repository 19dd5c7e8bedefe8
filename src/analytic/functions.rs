//! Built-in analytic functions.

use std::cmp::Ordering;

use hashbrown::HashMap;
use serde_json::json;

use super::{AnalyticFunction, AnalyticPass, PartitionKey};
use crate::error::PlanError;
use crate::record::Record;
use crate::types::{ColumnMetadata, ColumnType, RecordMetadata, Value};

/// Position of the row within its partition, starting at 1.
pub struct RowNumberFunction {
    metadata: ColumnMetadata,
    partition: PartitionKey,
    partition_names: Vec<String>,
    counters: HashMap<Vec<u8>, i64>,
    current: Value<'static>,
}

impl RowNumberFunction {
    pub fn new(name: &str, source: &RecordMetadata, partition_by: &[&str]) -> Result<Self, PlanError> {
        let partition = PartitionKey::new(source, partition_by)?;
        Ok(Self {
            metadata: ColumnMetadata::new(name, ColumnType::Long),
            partition_names: partition.column_names(source).iter().map(|s| s.to_string()).collect(),
            partition,
            counters: HashMap::new(),
            current: Value::Null,
        })
    }
}

impl AnalyticFunction for RowNumberFunction {
    fn metadata(&self) -> &ColumnMetadata {
        &self.metadata
    }

    fn pass(&self) -> AnalyticPass {
        AnalyticPass::Stream
    }

    fn add(&mut self, record: &dyn Record) {
        let key = self.partition.encode(record);
        let counter = self.counters.entry_ref(key).or_insert(0);
        *counter += 1;
        self.current = Value::Long(*counter);
    }

    fn reset(&mut self) {
        self.counters.clear();
        self.current = Value::Null;
    }

    fn value(&self) -> &Value<'static> {
        &self.current
    }

    fn plan(&self) -> serde_json::Value {
        json!({ "fn": "row_number", "partitionBy": self.partition_names })
    }
}

/// Resolved argument column of a value function.
struct ValueColumn {
    index: usize,
    column_type: ColumnType,
    name: String,
}

impl ValueColumn {
    fn new(source: &RecordMetadata, name: &str) -> Result<Self, PlanError> {
        let index = source.column_index(name)?;
        let column_type = source.column_type(index);
        if matches!(column_type, ColumnType::Binary | ColumnType::Parameter) {
            return Err(PlanError::TypeMismatch {
                column: name.to_string(),
                expected: "a scalar column",
                found: column_type,
            });
        }
        Ok(Self {
            index,
            column_type,
            name: source.columns()[index].name().to_string(),
        })
    }

    fn read(&self, record: &dyn Record) -> Value<'static> {
        Value::read(record, self.column_type, self.index).into_owned()
    }

    /// Output type: symbols are emitted by value.
    fn output_type(&self) -> ColumnType {
        match self.column_type {
            ColumnType::Symbol => ColumnType::String,
            t => t,
        }
    }
}

fn as_output(value: Value<'static>) -> Value<'static> {
    match value {
        Value::Sym(s) => Value::Str(s),
        v => v,
    }
}

/// Value of a column on the previous row of the same partition, null on
/// the first.
pub struct PrevValueFunction {
    metadata: ColumnMetadata,
    column: ValueColumn,
    partition: PartitionKey,
    last: HashMap<Vec<u8>, Value<'static>>,
    current: Value<'static>,
}

impl PrevValueFunction {
    pub fn new(
        name: &str,
        source: &RecordMetadata,
        column: &str,
        partition_by: &[&str],
    ) -> Result<Self, PlanError> {
        let column = ValueColumn::new(source, column)?;
        Ok(Self {
            metadata: ColumnMetadata::new(name, column.output_type()),
            partition: PartitionKey::new(source, partition_by)?,
            column,
            last: HashMap::new(),
            current: Value::Null,
        })
    }
}

impl AnalyticFunction for PrevValueFunction {
    fn metadata(&self) -> &ColumnMetadata {
        &self.metadata
    }

    fn pass(&self) -> AnalyticPass {
        AnalyticPass::Stream
    }

    fn add(&mut self, record: &dyn Record) {
        let value = as_output(self.column.read(record));
        let key = self.partition.encode(record);
        self.current = match self.last.get_mut(key) {
            Some(slot) => std::mem::replace(slot, value),
            None => {
                self.last.insert(key.to_vec(), value);
                Value::Null
            }
        };
    }

    fn reset(&mut self) {
        self.last.clear();
        self.current = Value::Null;
    }

    fn value(&self) -> &Value<'static> {
        &self.current
    }

    fn plan(&self) -> serde_json::Value {
        json!({ "fn": "prev", "column": self.column.name })
    }
}

/// Value of a column on the next row of the same partition, null on the
/// last. Needs the whole input before the first value is known.
pub struct NextValueFunction {
    metadata: ColumnMetadata,
    column: ValueColumn,
    partition: PartitionKey,
    /// Last row id seen per partition.
    tails: HashMap<Vec<u8>, i64>,
    next: HashMap<i64, Value<'static>>,
    current: Value<'static>,
}

impl NextValueFunction {
    pub fn new(
        name: &str,
        source: &RecordMetadata,
        column: &str,
        partition_by: &[&str],
    ) -> Result<Self, PlanError> {
        let column = ValueColumn::new(source, column)?;
        Ok(Self {
            metadata: ColumnMetadata::new(name, column.output_type()),
            partition: PartitionKey::new(source, partition_by)?,
            column,
            tails: HashMap::new(),
            next: HashMap::new(),
            current: Value::Null,
        })
    }
}

impl AnalyticFunction for NextValueFunction {
    fn metadata(&self) -> &ColumnMetadata {
        &self.metadata
    }

    fn pass(&self) -> AnalyticPass {
        AnalyticPass::TwoPass
    }

    fn add(&mut self, record: &dyn Record) {
        let row_id = record.row_id();
        let value = as_output(self.column.read(record));
        let key = self.partition.encode(record);
        let previous = match self.tails.get_mut(key) {
            Some(tail) => Some(std::mem::replace(tail, row_id)),
            None => {
                self.tails.insert(key.to_vec(), row_id);
                None
            }
        };
        if let Some(previous) = previous {
            self.next.insert(previous, value);
        }
    }

    fn prepare_for(&mut self, record: &dyn Record) {
        self.current = self
            .next
            .get(&record.row_id())
            .cloned()
            .unwrap_or(Value::Null);
    }

    fn reset(&mut self) {
        self.tails.clear();
        self.next.clear();
        self.current = Value::Null;
    }

    fn value(&self) -> &Value<'static> {
        &self.current
    }

    fn plan(&self) -> serde_json::Value {
        json!({ "fn": "next", "column": self.column.name })
    }
}

/// SQL `RANK()` over one order column within a partition: equal values
/// share a rank and leave a gap after them.
///
/// Accumulation buffers `(partition, order value, row id)`; `finish` sorts
/// the buffer and assigns ranks; replay looks ranks up by row id.
pub struct RankFunction {
    metadata: ColumnMetadata,
    order: ValueColumn,
    descending: bool,
    partition: PartitionKey,
    entries: Vec<(Vec<u8>, Value<'static>, i64)>,
    ranks: HashMap<i64, i64>,
    current: Value<'static>,
}

impl RankFunction {
    pub fn new(
        name: &str,
        source: &RecordMetadata,
        order_by: &str,
        descending: bool,
        partition_by: &[&str],
    ) -> Result<Self, PlanError> {
        Ok(Self {
            metadata: ColumnMetadata::new(name, ColumnType::Long),
            order: ValueColumn::new(source, order_by)?,
            descending,
            partition: PartitionKey::new(source, partition_by)?,
            entries: Vec::new(),
            ranks: HashMap::new(),
            current: Value::Null,
        })
    }

    fn order(&self, a: &Value<'_>, b: &Value<'_>) -> Ordering {
        let ord = a.compare_for_sort(b);
        if self.descending {
            ord.reverse()
        } else {
            ord
        }
    }
}

impl AnalyticFunction for RankFunction {
    fn metadata(&self) -> &ColumnMetadata {
        &self.metadata
    }

    fn pass(&self) -> AnalyticPass {
        AnalyticPass::ThreePass
    }

    fn add(&mut self, record: &dyn Record) {
        let value = self.order.read(record);
        let key = self.partition.encode(record).to_vec();
        self.entries.push((key, value, record.row_id()));
    }

    fn finish(&mut self) {
        let mut entries = std::mem::take(&mut self.entries);
        entries.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| self.order(&a.1, &b.1)));

        self.ranks.clear();
        self.ranks.reserve(entries.len());
        let mut rank = 0i64;
        let mut position = 0i64;
        for (i, (key, value, row_id)) in entries.iter().enumerate() {
            let same_partition = i > 0 && entries[i - 1].0 == *key;
            position = if same_partition { position + 1 } else { 1 };
            if !same_partition || self.order(&entries[i - 1].1, value) != Ordering::Equal {
                rank = position;
            }
            self.ranks.insert(*row_id, rank);
        }
    }

    fn prepare_for(&mut self, record: &dyn Record) {
        self.current = match self.ranks.get(&record.row_id()) {
            Some(rank) => Value::Long(*rank),
            None => Value::Null,
        };
    }

    fn reset(&mut self) {
        self.entries.clear();
        self.ranks.clear();
        self.current = Value::Null;
    }

    fn value(&self) -> &Value<'static> {
        &self.current
    }

    fn plan(&self) -> serde_json::Value {
        json!({
            "fn": "rank",
            "orderBy": self.order.name,
            "descending": self.descending,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::OwnedRecord;

    fn meta() -> RecordMetadata {
        RecordMetadata::new(vec![
            ColumnMetadata::new("sym", ColumnType::Symbol),
            ColumnMetadata::new("px", ColumnType::Int),
        ])
    }

    fn rows(items: &[(&str, i32)]) -> Vec<OwnedRecord> {
        items
            .iter()
            .enumerate()
            .map(|(i, (s, p))| {
                OwnedRecord::from_values(&meta(), vec![Value::sym(s), Value::Int(*p)])
                    .with_row_id(i as i64)
            })
            .collect()
    }

    #[test]
    fn row_number_counts_per_partition() {
        let mut f = RowNumberFunction::new("rn", &meta(), &["sym"]).unwrap();
        let mut seen = Vec::new();
        for r in rows(&[("a", 1), ("b", 2), ("a", 3), ("a", 4)]) {
            f.add(&r);
            seen.push(f.get_long());
        }
        assert_eq!(seen, vec![1, 1, 2, 3]);

        f.reset();
        f.add(&rows(&[("a", 1)])[0]);
        assert_eq!(f.get_long(), 1);
    }

    #[test]
    fn prev_value_is_null_on_partition_start() {
        let mut f = PrevValueFunction::new("prev", &meta(), "px", &["sym"]).unwrap();
        let mut seen = Vec::new();
        for r in rows(&[("a", 1), ("b", 2), ("a", 3)]) {
            f.add(&r);
            seen.push(f.value().clone());
        }
        assert_eq!(seen, vec![Value::Null, Value::Null, Value::Int(1)]);
    }

    #[test]
    fn prev_symbol_is_emitted_as_string() {
        let mut f = PrevValueFunction::new("prev", &meta(), "sym", &[]).unwrap();
        assert_eq!(f.metadata().column_type(), ColumnType::String);
        let input = rows(&[("a", 1), ("b", 2)]);
        f.add(&input[0]);
        assert!(f.get_flyweight_str().is_none());
        f.add(&input[1]);
        assert_eq!(f.get_flyweight_str().unwrap(), "a");
    }

    #[test]
    fn next_value_needs_the_full_partition() {
        let mut f = NextValueFunction::new("next", &meta(), "px", &["sym"]).unwrap();
        let input = rows(&[("a", 1), ("b", 2), ("a", 3)]);
        for r in &input {
            f.add(r);
        }
        f.finish();
        let mut seen = Vec::new();
        for r in &input {
            f.prepare_for(r);
            seen.push(f.get_int());
        }
        assert_eq!(seen, vec![3, crate::types::INT_NULL, crate::types::INT_NULL]);
    }

    #[test]
    fn rank_shares_ties_and_leaves_gaps() {
        let mut f = RankFunction::new("rk", &meta(), "px", true, &["sym"]).unwrap();
        let input = rows(&[("a", 5), ("a", 9), ("b", 1), ("a", 9), ("a", 2)]);
        for r in &input {
            f.add(r);
        }
        f.finish();
        let mut seen = Vec::new();
        for r in &input {
            f.prepare_for(r);
            seen.push(f.get_long());
        }
        assert_eq!(seen, vec![3, 1, 1, 1, 4]);
    }

    #[test]
    fn unknown_columns_are_plan_errors() {
        assert!(matches!(
            PrevValueFunction::new("p", &meta(), "nope", &[]),
            Err(PlanError::UnknownColumn(_))
        ));
        assert!(RowNumberFunction::new("rn", &meta(), &["nope"]).is_err());
    }
}
