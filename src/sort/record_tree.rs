//! Red-black tree keyed by record comparison, with duplicate chains kept in
//! a [`RecordList`].
//!
//! Each tree node owns one distinct key. `top` is the list address of the
//! first record inserted with that key and `reference` the address of the
//! last, so a duplicate is appended to the chain in O(1) and the chain reads
//! back in insertion order:
//!
//! ```text
//! node(5): top ──► [5a] ──next──► [5b] ◄── reference
//! ```

use eyre::Result;

use super::rb_tree::{Probe, RBTree, NIL};
use crate::record::{
    ListRecord, Record, RecordComparator, RecordCursor, RecordList, RowIdRecord, NO_ENTRY,
};
use crate::types::RecordMetadata;

#[derive(Debug)]
pub struct RecordTree {
    tree: RBTree,
    list: RecordList,
}

impl RecordTree {
    /// `metadata` is the shape of the stored entries: the source schema for
    /// record copies, [`RecordMetadata::row_id`] for row ids.
    pub fn new(metadata: &RecordMetadata, key_capacity: usize, value_page_size: usize) -> Self {
        Self {
            tree: RBTree::new(key_capacity),
            list: RecordList::new(metadata, value_page_size),
        }
    }

    pub fn clear(&mut self) {
        self.tree.clear();
        self.list.clear();
    }

    /// Releases list memory as well as entries.
    pub fn release(&mut self) {
        self.tree = RBTree::default();
        self.list.release();
    }

    pub fn tree(&self) -> &RBTree {
        &self.tree
    }

    pub fn list(&self) -> &RecordList {
        &self.list
    }

    /// Distinct keys in the tree.
    pub fn key_count(&self) -> usize {
        self.tree.len()
    }

    /// Stores a copy of `record`.
    pub fn put_record(&mut self, record: &dyn Record, cmp: &mut dyn RecordComparator) -> Result<()> {
        cmp.set_left(record);
        let list = &self.list;
        let tree = &self.tree;
        let probe = tree.search(|n| Ok(cmp.compare(&list.record_at(tree.top_of(n)))))?;
        self.link(probe, record)
    }

    /// Stores `row_id` only. Keys already in the tree are compared by
    /// repositioning `cursor` on their row ids.
    pub fn put_row_id(
        &mut self,
        row_id: i64,
        cursor: &mut dyn RecordCursor,
        cmp: &mut dyn RecordComparator,
    ) -> Result<()> {
        cmp.set_left(cursor.record_at(row_id)?);
        let list = &self.list;
        let tree = &self.tree;
        let probe = tree.search(|n| {
            let other = list.get_long(tree.top_of(n), 0);
            Ok(cmp.compare(cursor.record_at(other)?))
        })?;
        self.link(probe, &RowIdRecord(row_id))
    }

    fn link(&mut self, probe: Probe, record: &dyn Record) -> Result<()> {
        match probe {
            Probe::Found(n) => {
                let addr = self.list.append(record, self.tree.ref_of(n))?;
                self.tree.set_ref(n, addr);
            }
            Probe::Vacant { parent, left } => {
                let addr = self.list.append(record, NO_ENTRY)?;
                self.tree.insert(parent, left, addr);
            }
        }
        Ok(())
    }

    /// Record view of a list entry.
    pub fn entry(&self, addr: i64) -> ListRecord<'_> {
        self.list.record_at(addr)
    }

    pub fn walk(&self) -> TreeWalk<'_> {
        TreeWalk {
            tree: self,
            node: None,
            next_addr: NO_ENTRY,
        }
    }
}

/// In-order traversal yielding list addresses: every entry of a node's
/// chain, then the successor node.
pub struct TreeWalk<'a> {
    tree: &'a RecordTree,
    /// `None` before the first step, `Some(NIL)` once exhausted.
    node: Option<i64>,
    next_addr: i64,
}

impl TreeWalk<'_> {
    pub fn has_next(&mut self) -> bool {
        if self.next_addr != NO_ENTRY {
            return true;
        }
        let next = match self.node {
            None => self.tree.tree.first(),
            Some(NIL) => return false,
            Some(n) => self.tree.tree.successor(n),
        };
        self.node = Some(next);
        if next == NIL {
            return false;
        }
        self.next_addr = self.tree.tree.top_of(next);
        true
    }

    /// Address of the next entry, `None` when exhausted.
    pub fn advance(&mut self) -> Option<i64> {
        if !self.has_next() {
            return None;
        }
        let addr = self.next_addr;
        self.next_addr = self.tree.list.next_of(addr);
        Some(addr)
    }
}
