//! # Tab-Separated Record Printer
//!
//! Renders a cursor as text, one line per row, fields separated by tabs:
//!
//! ```text
//! sym	bid	qty	ts
//! AUD	1.5	10	1970-01-01T00:00:01.000Z
//! EUR	NaN	NaN	
//! ```
//!
//! ## Null Rendering
//!
//! | Type                        | Null prints |
//! |-----------------------------|-------------|
//! | INT, LONG, FLOAT, DOUBLE    | `NaN`       |
//! | STRING, SYMBOL, BINARY      | `null`      |
//! | DATE, TIMESTAMP             | (empty)     |
//!
//! Dates and timestamps are epoch milliseconds rendered as ISO-8601 UTC
//! with millisecond precision.

use std::fmt::Write;

use eyre::Result;

use crate::record::{CancellationHandle, Record, RecordCursor, RecordSource};
use crate::storage::StorageFactory;
use crate::types::{ColumnType, RecordMetadata, Value, LONG_NULL};

const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Clone, Copy)]
pub struct RecordPrinter {
    header: bool,
}

impl Default for RecordPrinter {
    fn default() -> Self {
        Self { header: true }
    }
}

impl RecordPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn print_header(&self, metadata: &RecordMetadata, sink: &mut String) {
        for (i, column) in metadata.columns().iter().enumerate() {
            if i > 0 {
                sink.push('\t');
            }
            sink.push_str(column.name());
        }
        sink.push('\n');
    }

    pub fn print_record(&self, record: &dyn Record, metadata: &RecordMetadata, sink: &mut String) {
        for (col, column) in metadata.columns().iter().enumerate() {
            if col > 0 {
                sink.push('\t');
            }
            print_field(record, column.column_type(), col, sink);
        }
        sink.push('\n');
    }

    /// Prints every remaining row of `cursor`; returns the row count.
    pub fn print_cursor(&self, cursor: &mut dyn RecordCursor, sink: &mut String) -> Result<usize> {
        let metadata = cursor.metadata().clone();
        if self.header {
            self.print_header(&metadata, sink);
        }
        let mut rows = 0;
        while cursor.has_next()? {
            let rec = cursor.next()?;
            self.print_record(rec, &metadata, sink);
            rows += 1;
        }
        Ok(rows)
    }

    /// Binds `source` and prints all of its rows.
    pub fn print(
        &self,
        source: &mut dyn RecordSource,
        factory: &dyn StorageFactory,
        cancel: &CancellationHandle,
    ) -> Result<String> {
        let mut sink = String::new();
        let mut cursor = source.prepare_cursor(factory, cancel)?;
        self.print_cursor(&mut *cursor, &mut sink)?;
        Ok(sink)
    }
}

fn print_field(record: &dyn Record, column_type: ColumnType, col: usize, sink: &mut String) {
    match column_type {
        ColumnType::Date | ColumnType::Timestamp => {
            let millis = record.get_date(col);
            if millis != LONG_NULL {
                sink.push_str(&format_timestamp(millis));
            }
        }
        ColumnType::String => match record.get_flyweight_str(col) {
            Some(s) => s.write_to(sink),
            None => sink.push_str("null"),
        },
        ColumnType::Symbol => sink.push_str(record.get_sym(col).unwrap_or("null")),
        ColumnType::Binary => match record.get_bin(col) {
            Some(bytes) => {
                for b in bytes {
                    let _ = write!(sink, "{:02x}", b);
                }
            }
            None => sink.push_str("null"),
        },
        ColumnType::Parameter => {}
        _ => match Value::read(record, column_type, col) {
            Value::Null => sink.push_str("NaN"),
            Value::Bool(v) => {
                let _ = write!(sink, "{}", v);
            }
            Value::Float(v) => {
                let _ = write!(sink, "{:?}", v);
            }
            Value::Double(v) => {
                let _ = write!(sink, "{:?}", v);
            }
            other => {
                let _ = write!(sink, "{}", other.to_long());
            }
        },
    }
}

/// ISO-8601 UTC rendering of epoch milliseconds:
/// `1970-01-01T00:00:00.000Z`.
pub fn format_timestamp(millis: i64) -> String {
    let days = millis.div_euclid(MILLIS_PER_DAY);
    let time_of_day = millis.rem_euclid(MILLIS_PER_DAY);
    let (year, month, day) = days_to_ymd(days);

    let hours = time_of_day / 3_600_000;
    let minutes = (time_of_day % 3_600_000) / 60_000;
    let seconds = (time_of_day % 60_000) / 1000;
    let ms = time_of_day % 1000;
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        year, month, day, hours, minutes, seconds, ms
    )
}

/// Civil date of a day count relative to 1970-01-01, proleptic Gregorian.
fn days_to_ymd(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;

    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);

    (year, month, day)
}
