//! # Red-Black Tree over a Node Arena
//!
//! Insert-only red-black tree whose nodes live in one growable vector and
//! link to each other by index. The tree stores no keys: callers search with
//! a closure that compares their key against a node, and each node carries
//! two opaque payload slots (`top`, `reference`) the caller uses to chain
//! duplicate keys.
//!
//! ## Node Layout
//!
//! ```text
//! +--------+------+-------+--------+-----------+-----+
//! | parent | left | right | colour | reference | top |
//! +--------+------+-------+--------+-----------+-----+
//!   index    index  index   R / B    last dup    first dup
//! ```
//!
//! [`NIL`] (`-1`) marks an absent link and the root of an empty tree. Absent
//! children count as BLACK.
//!
//! ## Invariants
//!
//! After every insertion:
//! 1. The root is BLACK.
//! 2. No RED node has a RED parent.
//! 3. Every path from the root to an absent child crosses the same number of
//!    BLACK nodes.
//!
//! [`RBTree::check_invariants`] verifies all three and returns the black
//! height.
//!
//! ## Reuse
//!
//! There is no deletion. [`RBTree::clear`] empties the tree while keeping
//! the node vector's capacity for the next query.

use std::cmp::Ordering;

use eyre::{ensure, Result};

/// Absent node link.
pub const NIL: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colour {
    Red,
    Black,
}

#[derive(Debug, Clone, Copy)]
struct Node {
    parent: i64,
    left: i64,
    right: i64,
    colour: Colour,
    reference: i64,
    top: i64,
}

/// Outcome of [`RBTree::search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// A node with an equal key.
    Found(i64),
    /// Where a new node for the key belongs.
    Vacant { parent: i64, left: bool },
}

#[derive(Debug)]
pub struct RBTree {
    nodes: Vec<Node>,
    root: i64,
}

impl Default for RBTree {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RBTree {
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            root: NIL,
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = NIL;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root == NIL
    }

    pub fn root(&self) -> i64 {
        self.root
    }

    #[inline]
    fn node(&self, n: i64) -> &Node {
        &self.nodes[n as usize]
    }

    #[inline]
    fn node_mut(&mut self, n: i64) -> &mut Node {
        &mut self.nodes[n as usize]
    }

    #[inline]
    fn parent(&self, n: i64) -> i64 {
        self.node(n).parent
    }

    #[inline]
    fn left(&self, n: i64) -> i64 {
        self.node(n).left
    }

    #[inline]
    fn right(&self, n: i64) -> i64 {
        self.node(n).right
    }

    #[inline]
    fn colour(&self, n: i64) -> Colour {
        if n == NIL {
            Colour::Black
        } else {
            self.node(n).colour
        }
    }

    #[inline]
    fn set_colour(&mut self, n: i64, colour: Colour) {
        if n != NIL {
            self.node_mut(n).colour = colour;
        }
    }

    pub fn top_of(&self, n: i64) -> i64 {
        self.node(n).top
    }

    pub fn ref_of(&self, n: i64) -> i64 {
        self.node(n).reference
    }

    pub fn set_ref(&mut self, n: i64, reference: i64) {
        self.node_mut(n).reference = reference;
    }

    /// Walks from the root. `cmp(node)` orders the searched key against the
    /// key of `node`.
    pub fn search<F>(&self, mut cmp: F) -> Result<Probe>
    where
        F: FnMut(i64) -> Result<Ordering>,
    {
        let mut parent = NIL;
        let mut left = false;
        let mut n = self.root;
        while n != NIL {
            parent = n;
            match cmp(n)? {
                Ordering::Less => {
                    left = true;
                    n = self.left(n);
                }
                Ordering::Greater => {
                    left = false;
                    n = self.right(n);
                }
                Ordering::Equal => return Ok(Probe::Found(n)),
            }
        }
        Ok(Probe::Vacant { parent, left })
    }

    /// Links a new RED node at a vacant position, rebalances, and returns the
    /// node. `payload` seeds both `top` and `reference`.
    pub fn insert(&mut self, parent: i64, left: bool, payload: i64) -> i64 {
        let n = self.nodes.len() as i64;
        self.nodes.push(Node {
            parent,
            left: NIL,
            right: NIL,
            colour: Colour::Red,
            reference: payload,
            top: payload,
        });
        if parent == NIL {
            self.root = n;
        } else if left {
            self.node_mut(parent).left = n;
        } else {
            self.node_mut(parent).right = n;
        }
        self.fix(n);
        n
    }

    fn fix(&mut self, mut x: i64) {
        while x != self.root && self.colour(self.parent(x)) == Colour::Red {
            let p = self.parent(x);
            let g = self.parent(p);
            if p == self.left(g) {
                let uncle = self.right(g);
                if self.colour(uncle) == Colour::Red {
                    self.set_colour(p, Colour::Black);
                    self.set_colour(uncle, Colour::Black);
                    self.set_colour(g, Colour::Red);
                    x = g;
                } else {
                    if x == self.right(p) {
                        x = p;
                        self.rotate_left(x);
                    }
                    let p = self.parent(x);
                    let g = self.parent(p);
                    self.set_colour(p, Colour::Black);
                    self.set_colour(g, Colour::Red);
                    self.rotate_right(g);
                }
            } else {
                let uncle = self.left(g);
                if self.colour(uncle) == Colour::Red {
                    self.set_colour(p, Colour::Black);
                    self.set_colour(uncle, Colour::Black);
                    self.set_colour(g, Colour::Red);
                    x = g;
                } else {
                    if x == self.left(p) {
                        x = p;
                        self.rotate_right(x);
                    }
                    let p = self.parent(x);
                    let g = self.parent(p);
                    self.set_colour(p, Colour::Black);
                    self.set_colour(g, Colour::Red);
                    self.rotate_left(g);
                }
            }
        }
        let root = self.root;
        self.set_colour(root, Colour::Black);
    }

    fn rotate_left(&mut self, x: i64) {
        let y = self.right(x);
        let y_left = self.left(y);
        self.node_mut(x).right = y_left;
        if y_left != NIL {
            self.node_mut(y_left).parent = x;
        }
        self.replace_child(x, y);
        self.node_mut(y).left = x;
        self.node_mut(x).parent = y;
    }

    fn rotate_right(&mut self, x: i64) {
        let y = self.left(x);
        let y_right = self.right(y);
        self.node_mut(x).left = y_right;
        if y_right != NIL {
            self.node_mut(y_right).parent = x;
        }
        self.replace_child(x, y);
        self.node_mut(y).right = x;
        self.node_mut(x).parent = y;
    }

    /// Makes `y` take the place of `x` under `x`'s parent.
    fn replace_child(&mut self, x: i64, y: i64) {
        let p = self.parent(x);
        self.node_mut(y).parent = p;
        if p == NIL {
            self.root = y;
        } else if x == self.left(p) {
            self.node_mut(p).left = y;
        } else {
            self.node_mut(p).right = y;
        }
    }

    fn leftmost(&self, mut n: i64) -> i64 {
        while n != NIL && self.left(n) != NIL {
            n = self.left(n);
        }
        n
    }

    /// Smallest node, `NIL` when empty.
    pub fn first(&self) -> i64 {
        self.leftmost(self.root)
    }

    /// In-order successor, `NIL` after the largest node.
    pub fn successor(&self, n: i64) -> i64 {
        if n == NIL {
            return NIL;
        }
        if self.right(n) != NIL {
            return self.leftmost(self.right(n));
        }
        let mut x = n;
        let mut p = self.parent(x);
        while p != NIL && x == self.right(p) {
            x = p;
            p = self.parent(p);
        }
        p
    }

    /// Verifies parent links and the red-black invariants. Returns the black
    /// height of the tree, counting absent leaves.
    pub fn check_invariants(&self) -> Result<usize> {
        ensure!(self.colour(self.root) == Colour::Black, "root is red");
        if self.root != NIL {
            ensure!(self.parent(self.root) == NIL, "root has a parent");
        }
        self.black_height(self.root)
    }

    fn black_height(&self, n: i64) -> Result<usize> {
        if n == NIL {
            return Ok(1);
        }
        let (l, r) = (self.left(n), self.right(n));
        for child in [l, r] {
            if child != NIL {
                ensure!(self.parent(child) == n, "node {} has a stale parent link", child);
                ensure!(
                    !(self.colour(n) == Colour::Red && self.colour(child) == Colour::Red),
                    "red node {} has a red child {}",
                    n,
                    child
                );
            }
        }
        let lh = self.black_height(l)?;
        let rh = self.black_height(r)?;
        ensure!(lh == rh, "black height differs under node {}: {} vs {}", n, lh, rh);
        Ok(lh + usize::from(self.colour(n) == Colour::Black))
    }
}
