//! # Flyweight Strings
//!
//! A `FlyweightStr` is a read-only character window over one or more borrowed
//! spans. Concatenation produces a two-span view instead of a new allocation;
//! the view lives exactly as long as the records it borrows from, so a cursor
//! advance invalidates it at compile time.
//!
//! ```text
//! lhs span          rhs span
//! +-----------+     +---------+
//! | "EURUSD"  |  +  | ".spot" |   => FlyweightStr { spans: [lhs, rhs] }
//! +-----------+     +---------+
//! ```
//!
//! Length and indexing are in characters, not bytes.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use smallvec::SmallVec;

#[derive(Clone, Debug, Default)]
pub struct FlyweightStr<'a> {
    spans: SmallVec<[&'a str; 2]>,
}

impl<'a> FlyweightStr<'a> {
    pub fn new(s: &'a str) -> Self {
        let mut spans = SmallVec::new();
        spans.push(s);
        Self { spans }
    }

    /// Null-absorbing concatenation: a missing side yields the other side
    /// verbatim and only two missing sides yield a missing result.
    pub fn concat(lhs: Option<Self>, rhs: Option<Self>) -> Option<Self> {
        match (lhs, rhs) {
            (None, None) => None,
            (Some(l), None) => Some(l),
            (None, Some(r)) => Some(r),
            (Some(mut l), Some(r)) => {
                l.spans.extend(r.spans);
                Some(l)
            }
        }
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.spans.iter().map(|s| s.chars().count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.iter().all(|s| s.is_empty())
    }

    pub fn char_at(&self, index: usize) -> Option<char> {
        self.chars().nth(index)
    }

    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.spans.iter().flat_map(|s| s.chars())
    }

    /// The borrowed text when the view is a single contiguous span.
    pub fn as_str(&self) -> Option<&'a str> {
        let mut non_empty = self.spans.iter().filter(|s| !s.is_empty());
        match (non_empty.next(), non_empty.next()) {
            (None, _) => Some(""),
            (Some(s), None) => Some(s),
            _ => None,
        }
    }

    pub fn write_to(&self, sink: &mut String) {
        for span in &self.spans {
            sink.push_str(span);
        }
    }

    pub fn to_cow(&self) -> Cow<'a, str> {
        match self.as_str() {
            Some(s) => Cow::Borrowed(s),
            None => {
                let mut out = String::with_capacity(self.spans.iter().map(|s| s.len()).sum());
                self.write_to(&mut out);
                Cow::Owned(out)
            }
        }
    }
}

impl fmt::Display for FlyweightStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for span in &self.spans {
            f.write_str(span)?;
        }
        Ok(())
    }
}

impl PartialEq for FlyweightStr<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.chars().eq(other.chars())
    }
}

impl Eq for FlyweightStr<'_> {}

impl PartialEq<str> for FlyweightStr<'_> {
    fn eq(&self, other: &str) -> bool {
        self.chars().eq(other.chars())
    }
}

impl PartialEq<&str> for FlyweightStr<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.chars().eq(other.chars())
    }
}

impl PartialOrd for FlyweightStr<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FlyweightStr<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.chars().cmp(other.chars())
    }
}
