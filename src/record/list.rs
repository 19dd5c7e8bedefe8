//! # Record List
//!
//! Append-only storage for record copies, chained per key by the sorted
//! materialization tree.
//!
//! ## Entry Layout
//!
//! ```text
//! +-----------+------------------------------+--------------------------+
//! | next: i64 | fixed slots (column order)   | variable payloads        |
//! +-----------+------------------------------+--------------------------+
//!               BOOLEAN/BYTE 1, SHORT 2,        [len: i32][utf8 / bytes]
//!               INT/FLOAT 4, LONG/DOUBLE/
//!               DATE/TIMESTAMP 8,
//!               STRING/SYMBOL/BINARY 4 =
//!               payload offset from entry start
//! ```
//!
//! `next` is `-1` for the last entry of a chain. `append(record, prev)` writes
//! the new entry and links `prev.next` to it, so a chain is read in insertion
//! order. Symbols are stored by value so list reads never go back to the
//! source's symbol table. An entry never spans pages; a record larger than a
//! page is rejected with `PlanError::RecordTooLarge`.
//!
//! Entry start addresses are kept in allocation order, so a caller-supplied
//! address can be checked with [`RecordList::is_entry`] before it is read.

use eyre::Result;
use smallvec::SmallVec;

use crate::config::{RECORD_LINK_SIZE, VAR_LEN_PREFIX};
use crate::error::PlanError;
use crate::memory::MemoryPages;
use crate::record::{unsupported, Record};
use crate::types::{ColumnType, FlyweightStr, RecordMetadata, NULL_LEN};

/// Absent chain link.
pub const NO_ENTRY: i64 = -1;

#[derive(Debug)]
pub struct RecordList {
    mem: MemoryPages,
    types: Vec<ColumnType>,
    slots: Vec<usize>,
    fixed_size: usize,
    var_columns: usize,
    /// Entry start addresses, ascending.
    entries: Vec<i64>,
}

impl RecordList {
    pub fn new(metadata: &RecordMetadata, page_size: usize) -> Self {
        let mut slots = Vec::with_capacity(metadata.column_count());
        let mut offset = RECORD_LINK_SIZE;
        let types: Vec<ColumnType> = metadata.columns().iter().map(|c| c.column_type()).collect();
        for t in &types {
            slots.push(offset);
            offset += t.slot_size();
        }
        let var_columns = types
            .iter()
            .filter(|t| matches!(t, ColumnType::String | ColumnType::Symbol | ColumnType::Binary))
            .count();
        Self {
            mem: MemoryPages::new(page_size),
            types,
            slots,
            fixed_size: offset,
            var_columns,
            entries: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.mem.clear();
        self.entries.clear();
    }

    pub fn release(&mut self) {
        self.mem.release();
        self.entries = Vec::new();
    }

    /// Size of an entry whose variable columns are all null.
    pub fn min_entry_size(&self) -> usize {
        self.fixed_size + self.var_columns * VAR_LEN_PREFIX
    }

    /// Fails when even the smallest entry cannot fit in one page.
    pub fn check_fits(&self) -> Result<(), PlanError> {
        let size = self.min_entry_size();
        if size > self.mem.page_size() {
            return Err(PlanError::RecordTooLarge {
                size,
                page_size: self.mem.page_size(),
            });
        }
        Ok(())
    }

    /// True when `addr` is the start of an entry appended since the last clear.
    pub fn is_entry(&self, addr: i64) -> bool {
        self.entries.binary_search(&addr).is_ok()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn bytes_used(&self) -> usize {
        self.mem.used()
    }

    pub fn column_count(&self) -> usize {
        self.types.len()
    }

    /// Copies `record` into the list and links it after `prev`.
    /// Returns the address of the new entry.
    pub fn append(&mut self, record: &dyn Record, prev: i64) -> Result<i64> {
        let mut var: SmallVec<[(usize, Option<std::borrow::Cow<'_, [u8]>>); 4]> = SmallVec::new();
        let mut size = self.fixed_size;
        for (col, t) in self.types.iter().enumerate() {
            let payload = match t {
                ColumnType::String => record
                    .get_flyweight_str(col)
                    .map(|s| match s.to_cow() {
                        std::borrow::Cow::Borrowed(b) => std::borrow::Cow::Borrowed(b.as_bytes()),
                        std::borrow::Cow::Owned(o) => std::borrow::Cow::Owned(o.into_bytes()),
                    }),
                ColumnType::Symbol => record.get_sym(col).map(|s| std::borrow::Cow::Borrowed(s.as_bytes())),
                ColumnType::Binary => record.get_bin(col).map(std::borrow::Cow::Borrowed),
                _ => continue,
            };
            size += VAR_LEN_PREFIX + payload.as_ref().map_or(0, |p| p.len());
            var.push((col, payload));
        }

        let addr = self.mem.allocate(size)?;
        self.mem.put_i64(addr, NO_ENTRY);

        for (col, t) in self.types.iter().enumerate() {
            let slot = addr + self.slots[col] as i64;
            match t {
                ColumnType::Boolean => self.mem.put_u8(slot, record.get_bool(col) as u8),
                ColumnType::Byte => self.mem.put_u8(slot, record.get_byte(col) as u8),
                ColumnType::Short => self.mem.put_i16(slot, record.get_short(col)),
                ColumnType::Int => self.mem.put_i32(slot, record.get_int(col)),
                ColumnType::Float => self.mem.put_f32(slot, record.get_float(col)),
                ColumnType::Long => self.mem.put_i64(slot, record.get_long(col)),
                ColumnType::Double => self.mem.put_f64(slot, record.get_double(col)),
                ColumnType::Date | ColumnType::Timestamp => {
                    self.mem.put_i64(slot, record.get_date(col))
                }
                ColumnType::String
                | ColumnType::Symbol
                | ColumnType::Binary
                | ColumnType::Parameter => {}
            }
        }

        let mut tail = self.fixed_size;
        for (col, payload) in &var {
            let slot = addr + self.slots[*col] as i64;
            self.mem.put_i32(slot, tail as i32);
            let at = addr + tail as i64;
            match payload {
                Some(bytes) => {
                    self.mem.put_i32(at, bytes.len() as i32);
                    self.mem.write_bytes(at + VAR_LEN_PREFIX as i64, bytes);
                    tail += VAR_LEN_PREFIX + bytes.len();
                }
                None => {
                    self.mem.put_i32(at, NULL_LEN);
                    tail += VAR_LEN_PREFIX;
                }
            }
        }

        if prev != NO_ENTRY {
            self.mem.put_i64(prev, addr);
        }
        self.entries.push(addr);
        Ok(addr)
    }

    /// Following entry in the chain of `addr`, `NO_ENTRY` at the end.
    #[inline]
    pub fn next_of(&self, addr: i64) -> i64 {
        self.mem.get_i64(addr)
    }

    /// Read-only record view of the entry at `addr`.
    pub fn record_at(&self, addr: i64) -> ListRecord<'_> {
        ListRecord { list: self, addr }
    }

    #[inline]
    fn slot(&self, addr: i64, col: usize) -> i64 {
        addr + self.slots[col] as i64
    }

    fn payload(&self, addr: i64, col: usize) -> Option<&[u8]> {
        let at = addr + self.mem.get_i32(self.slot(addr, col)) as i64;
        let len = self.mem.get_i32(at);
        if len == NULL_LEN {
            return None;
        }
        Some(self.mem.slice(at + VAR_LEN_PREFIX as i64, len as usize))
    }

    fn expect_type(&self, col: usize, getter: &str, accepted: &[ColumnType]) {
        if !accepted.contains(&self.types[col]) {
            unsupported("RecordList", getter, col);
        }
    }

    pub fn get_bool(&self, addr: i64, col: usize) -> bool {
        self.expect_type(col, "get_bool", &[ColumnType::Boolean]);
        self.mem.get_u8(self.slot(addr, col)) != 0
    }

    pub fn get_byte(&self, addr: i64, col: usize) -> i8 {
        self.expect_type(col, "get_byte", &[ColumnType::Byte]);
        self.mem.get_u8(self.slot(addr, col)) as i8
    }

    pub fn get_short(&self, addr: i64, col: usize) -> i16 {
        self.expect_type(col, "get_short", &[ColumnType::Short]);
        self.mem.get_i16(self.slot(addr, col))
    }

    pub fn get_int(&self, addr: i64, col: usize) -> i32 {
        self.expect_type(col, "get_int", &[ColumnType::Int]);
        self.mem.get_i32(self.slot(addr, col))
    }

    pub fn get_long(&self, addr: i64, col: usize) -> i64 {
        self.expect_type(
            col,
            "get_long",
            &[ColumnType::Long, ColumnType::Date, ColumnType::Timestamp],
        );
        self.mem.get_i64(self.slot(addr, col))
    }

    pub fn get_float(&self, addr: i64, col: usize) -> f32 {
        self.expect_type(col, "get_float", &[ColumnType::Float]);
        self.mem.get_f32(self.slot(addr, col))
    }

    pub fn get_double(&self, addr: i64, col: usize) -> f64 {
        self.expect_type(col, "get_double", &[ColumnType::Double]);
        self.mem.get_f64(self.slot(addr, col))
    }

    pub fn get_date(&self, addr: i64, col: usize) -> i64 {
        self.expect_type(
            col,
            "get_date",
            &[ColumnType::Date, ColumnType::Timestamp, ColumnType::Long],
        );
        self.mem.get_i64(self.slot(addr, col))
    }

    pub fn get_str(&self, addr: i64, col: usize) -> Option<&str> {
        self.expect_type(col, "get_str", &[ColumnType::String, ColumnType::Symbol]);
        std::str::from_utf8(self.payload(addr, col)?).ok()
    }

    pub fn get_bin(&self, addr: i64, col: usize) -> Option<&[u8]> {
        self.expect_type(col, "get_bin", &[ColumnType::Binary]);
        self.payload(addr, col)
    }
}

/// Flyweight over one list entry. Its row id is the entry address.
#[derive(Clone, Copy)]
pub struct ListRecord<'a> {
    list: &'a RecordList,
    addr: i64,
}

impl ListRecord<'_> {
    pub fn address(&self) -> i64 {
        self.addr
    }
}

impl Record for ListRecord<'_> {
    fn row_id(&self) -> i64 {
        self.addr
    }

    fn get_bool(&self, col: usize) -> bool {
        self.list.get_bool(self.addr, col)
    }

    fn get_byte(&self, col: usize) -> i8 {
        self.list.get_byte(self.addr, col)
    }

    fn get_short(&self, col: usize) -> i16 {
        self.list.get_short(self.addr, col)
    }

    fn get_int(&self, col: usize) -> i32 {
        self.list.get_int(self.addr, col)
    }

    fn get_long(&self, col: usize) -> i64 {
        self.list.get_long(self.addr, col)
    }

    fn get_float(&self, col: usize) -> f32 {
        self.list.get_float(self.addr, col)
    }

    fn get_double(&self, col: usize) -> f64 {
        self.list.get_double(self.addr, col)
    }

    fn get_date(&self, col: usize) -> i64 {
        self.list.get_date(self.addr, col)
    }

    fn get_flyweight_str(&self, col: usize) -> Option<FlyweightStr<'_>> {
        self.list.get_str(self.addr, col).map(FlyweightStr::new)
    }

    fn get_sym(&self, col: usize) -> Option<&str> {
        self.list.get_str(self.addr, col)
    }

    fn get_bin(&self, col: usize) -> Option<&[u8]> {
        self.list.get_bin(self.addr, col)
    }
}
