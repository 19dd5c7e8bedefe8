//! # Internal Macros
//!
//! ## split_record!
//!
//! Implements [`Record`](crate::record::Record) for a composed record whose
//! columns below a split index come from a base record and whose remaining
//! columns are computed elsewhere. Every typed getter dispatches on the
//! column index:
//!
//! ```text
//! col <  split  ->  base.get_x(col)
//! col >= split  ->  computed[col - split].get_x(args..)
//! ```
//!
//! ### Usage
//!
//! ```ignore
//! split_record!(AnalyticCursor<'_>, |self, idx| {
//!     split: self.split,
//!     base: self.base.record(),
//!     computed: self.functions[idx],
//!     args: ()
//! });
//! ```
//!
//! `args` are passed to the computed getter ahead of any getter-specific
//! argument (the string sink of `write_str`). Row ids always come from the
//! base record.

macro_rules! split_record {
    (
        $ty:ty,
        |$this:ident, $idx:ident| {
            split: $split:expr,
            base: $base:expr,
            computed: $target:expr,
            args: ($($arg:expr),*)
        }
    ) => {
        impl $crate::record::Record for $ty {
            fn row_id(&$this) -> i64 {
                $base.row_id()
            }

            fn get_bool(&$this, col: usize) -> bool {
                let split = $split;
                if col < split {
                    return $base.get_bool(col);
                }
                let $idx = col - split;
                $target.get_bool($($arg),*)
            }

            fn get_byte(&$this, col: usize) -> i8 {
                let split = $split;
                if col < split {
                    return $base.get_byte(col);
                }
                let $idx = col - split;
                $target.get_byte($($arg),*)
            }

            fn get_short(&$this, col: usize) -> i16 {
                let split = $split;
                if col < split {
                    return $base.get_short(col);
                }
                let $idx = col - split;
                $target.get_short($($arg),*)
            }

            fn get_int(&$this, col: usize) -> i32 {
                let split = $split;
                if col < split {
                    return $base.get_int(col);
                }
                let $idx = col - split;
                $target.get_int($($arg),*)
            }

            fn get_long(&$this, col: usize) -> i64 {
                let split = $split;
                if col < split {
                    return $base.get_long(col);
                }
                let $idx = col - split;
                $target.get_long($($arg),*)
            }

            fn get_float(&$this, col: usize) -> f32 {
                let split = $split;
                if col < split {
                    return $base.get_float(col);
                }
                let $idx = col - split;
                $target.get_float($($arg),*)
            }

            fn get_double(&$this, col: usize) -> f64 {
                let split = $split;
                if col < split {
                    return $base.get_double(col);
                }
                let $idx = col - split;
                $target.get_double($($arg),*)
            }

            fn get_date(&$this, col: usize) -> i64 {
                let split = $split;
                if col < split {
                    return $base.get_date(col);
                }
                let $idx = col - split;
                $target.get_date($($arg),*)
            }

            fn get_flyweight_str(&$this, col: usize) -> Option<$crate::types::FlyweightStr<'_>> {
                let split = $split;
                if col < split {
                    return $base.get_flyweight_str(col);
                }
                let $idx = col - split;
                $target.get_flyweight_str($($arg),*)
            }

            fn get_flyweight_str_b(&$this, col: usize) -> Option<$crate::types::FlyweightStr<'_>> {
                let split = $split;
                if col < split {
                    return $base.get_flyweight_str_b(col);
                }
                let $idx = col - split;
                $target.get_flyweight_str_b($($arg),*)
            }

            fn write_str(&$this, col: usize, sink: &mut String) {
                let split = $split;
                if col < split {
                    return $base.write_str(col, sink);
                }
                let $idx = col - split;
                $target.write_str($($arg,)* sink)
            }

            fn get_str_len(&$this, col: usize) -> i32 {
                let split = $split;
                if col < split {
                    return $base.get_str_len(col);
                }
                let $idx = col - split;
                $target.get_str_len($($arg),*)
            }

            fn get_sym(&$this, col: usize) -> Option<&str> {
                let split = $split;
                if col < split {
                    return $base.get_sym(col);
                }
                let $idx = col - split;
                $target.get_sym($($arg),*)
            }

            fn get_bin(&$this, col: usize) -> Option<&[u8]> {
                let split = $split;
                if col < split {
                    return $base.get_bin(col);
                }
                let $idx = col - split;
                $target.get_bin($($arg),*)
            }
        }
    };
}
