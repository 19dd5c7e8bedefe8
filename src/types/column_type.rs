//! # Column Types
//!
//! `ColumnType` is the closed set of value kinds a column or expression can
//! carry. Each variant has a bit-flag code so type sets (function signatures,
//! operand masks) can be expressed as a plain `u16` union.
//!
//! ## Widths
//!
//! | Type      | Code | Bytes    |
//! |-----------|------|----------|
//! | BOOLEAN   | 1    | 1        |
//! | BYTE      | 2    | 1        |
//! | DOUBLE    | 4    | 8        |
//! | FLOAT     | 8    | 4        |
//! | INT       | 16   | 4        |
//! | LONG      | 32   | 8        |
//! | SHORT     | 64   | 2        |
//! | STRING    | 128  | variable |
//! | SYMBOL    | 256  | 4 (key)  |
//! | BINARY    | 512  | variable |
//! | DATE      | 1024 | 8        |
//! | PARAMETER | 2048 | 0        |
//! | TIMESTAMP | 4096 | 8        |
//!
//! Variable-width types report a size of zero; their payload is stored out of
//! line with a length prefix. A symbol is stored as its dictionary key.

use std::fmt;

use serde::{Deserialize, Serialize};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Boolean = 1,
    Byte = 2,
    Double = 4,
    Float = 8,
    Int = 16,
    Long = 32,
    Short = 64,
    String = 128,
    Symbol = 256,
    Binary = 512,
    Date = 1024,
    Parameter = 2048,
    Timestamp = 4096,
}

impl ColumnType {
    pub const ALL: [ColumnType; 13] = [
        ColumnType::Boolean,
        ColumnType::Byte,
        ColumnType::Double,
        ColumnType::Float,
        ColumnType::Int,
        ColumnType::Long,
        ColumnType::Short,
        ColumnType::String,
        ColumnType::Symbol,
        ColumnType::Binary,
        ColumnType::Date,
        ColumnType::Parameter,
        ColumnType::Timestamp,
    ];

    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.code() == code)
    }

    /// Fixed storage width in bytes, zero for variable-width types.
    #[inline]
    pub fn size_of(self) -> usize {
        match self {
            ColumnType::Boolean | ColumnType::Byte => 1,
            ColumnType::Short => 2,
            ColumnType::Int | ColumnType::Float | ColumnType::Symbol => 4,
            ColumnType::Long | ColumnType::Double | ColumnType::Date | ColumnType::Timestamp => 8,
            ColumnType::String | ColumnType::Binary | ColumnType::Parameter => 0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Byte => "BYTE",
            ColumnType::Double => "DOUBLE",
            ColumnType::Float => "FLOAT",
            ColumnType::Int => "INT",
            ColumnType::Long => "LONG",
            ColumnType::Short => "SHORT",
            ColumnType::String => "STRING",
            ColumnType::Symbol => "SYMBOL",
            ColumnType::Binary => "BINARY",
            ColumnType::Date => "DATE",
            ColumnType::Parameter => "PARAMETER",
            ColumnType::Timestamp => "TIMESTAMP",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    #[inline]
    pub fn is_variable(self) -> bool {
        matches!(self, ColumnType::String | ColumnType::Binary)
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ColumnType::Byte
                | ColumnType::Short
                | ColumnType::Int
                | ColumnType::Long
                | ColumnType::Float
                | ColumnType::Double
        )
    }

    /// String-like columns readable through the flyweight string getters.
    pub fn is_text(self) -> bool {
        matches!(self, ColumnType::String | ColumnType::Symbol)
    }

    /// Width of the slot this type occupies in a materialized record.
    /// Variable-width types use a fixed slot holding the payload offset.
    pub(crate) fn slot_size(self) -> usize {
        if self.is_variable() {
            crate::config::VAR_SLOT_SIZE
        } else {
            self.size_of()
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct_bit_flags() {
        let mut seen = 0u16;
        for t in ColumnType::ALL {
            assert_eq!(t.code().count_ones(), 1, "{} is not a single bit", t);
            assert_eq!(seen & t.code(), 0);
            seen |= t.code();
        }
    }

    #[test]
    fn name_lookup_is_case_insensitive() {
        assert_eq!(ColumnType::from_name("symbol"), Some(ColumnType::Symbol));
        assert_eq!(ColumnType::from_name("TimeStamp"), Some(ColumnType::Timestamp));
        assert_eq!(ColumnType::from_name("VARCHAR"), None);
    }

    #[test]
    fn code_lookup_round_trips() {
        for t in ColumnType::ALL {
            assert_eq!(ColumnType::from_code(t.code()), Some(t));
        }
        assert_eq!(ColumnType::from_code(3), None);
    }

    #[test]
    fn fixed_widths_match_storage_layout() {
        assert_eq!(ColumnType::Boolean.size_of(), 1);
        assert_eq!(ColumnType::Short.size_of(), 2);
        assert_eq!(ColumnType::Symbol.size_of(), 4);
        assert_eq!(ColumnType::Date.size_of(), 8);
        assert_eq!(ColumnType::Timestamp.size_of(), 8);
        assert_eq!(ColumnType::String.size_of(), 0);
        assert!(ColumnType::Binary.is_variable());
        assert!(!ColumnType::Symbol.is_variable());
    }
}
