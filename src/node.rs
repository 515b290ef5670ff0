//! Filepath: src/node.rs
//!
//! Fixed-fanout node storage for [`AugBTree`](crate::AugBTree).
//!
//! A node is either a leaf or an internal node, distinguished by a flag
//! rather than by type. Items within a node are strictly increasing; an
//! internal node with `k` items has exactly `k + 1` children, and every item
//! in `children[i]` sorts below `items[i]`, every item in `children[i + 1]`
//! above it.
//!
//! Nodes are shared between logically independent trees through [`Arc`]: the
//! per-node reference count is the `Arc` strong count, and the
//! copy-on-write discipline is [`Arc::make_mut`] applied to a child slot.
//! Every structural primitive below therefore takes `&mut self`, which the
//! CoW layer guarantees implies exclusive ownership.

use std::fmt;
use std::sync::Arc;

use arrayvec::ArrayVec;

use crate::augment::{Augment, NodeView};
use crate::tracing_helpers::trace_log;

/// Tree degree `D`. A non-root node holds between `D - 1` and `2D - 1` items.
pub const TREE_DEGREE: usize = 16;

/// Maximum items per node (`2D - 1`).
pub(crate) const MAX_ITEMS: usize = 2 * TREE_DEGREE - 1;

/// Minimum items per non-root node (`D - 1`).
pub(crate) const MIN_ITEMS: usize = TREE_DEGREE - 1;

/// Maximum children per node (`MAX_ITEMS + 1`).
pub(crate) const MAX_CHILDREN: usize = MAX_ITEMS + 1;

/// Shared handle to a node. Strong count 1 means exclusively owned by a
/// single parent link or tree root; anything above means logically immutable
/// for every owner.
pub(crate) type SharedNode<T, A> = Arc<Node<T, A>>;

// ============================================================================
//  Node
// ============================================================================

/// A single B-tree node.
///
/// Only `items[0..len]` are live; for internal nodes only
/// `children[0..=len]` are live. `ArrayVec` keeps both inline at fixed
/// capacity and releases ownership of removed slots eagerly.
pub(crate) struct Node<T, A> {
    /// Whether this node has no children.
    pub(crate) leaf: bool,

    /// Ordered item storage.
    pub(crate) items: ArrayVec<T, MAX_ITEMS>,

    /// Child links; empty for leaves.
    pub(crate) children: ArrayVec<SharedNode<T, A>, MAX_CHILDREN>,

    /// The augmentation value, owned inline.
    pub(crate) aug: A,
}

impl<T, A: Default> Node<T, A> {
    pub(crate) fn new(leaf: bool) -> Self {
        Self {
            leaf,
            items: ArrayVec::new(),
            children: ArrayVec::new(),
            aug: A::default(),
        }
    }

    pub(crate) fn new_leaf() -> Self {
        Self::new(true)
    }

    pub(crate) fn new_internal() -> Self {
        Self::new(false)
    }
}

impl<T, A> Node<T, A> {
    /// Number of live items.
    #[inline]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether this node has no children.
    #[inline]
    #[must_use]
    pub(crate) const fn is_leaf(&self) -> bool {
        self.leaf
    }

    /// Child `i` (`0 <= i <= len`), borrowed through its shared handle.
    #[inline]
    pub(crate) fn child(&self, i: usize) -> &Node<T, A> {
        self.children[i].as_ref()
    }
}

// ============================================================================
//  Search
// ============================================================================

impl<T: Ord, A> Node<T, A> {
    /// Binary search over the live items.
    ///
    /// Returns `(index, found)`: the position of an equal item, or the
    /// position where one would be inserted.
    #[inline]
    pub(crate) fn search(&self, item: &T) -> (usize, bool) {
        match self.items.binary_search(item) {
            Ok(i) => (i, true),
            Err(i) => (i, false),
        }
    }
}

// ============================================================================
//  Structural Primitives
// ============================================================================

impl<T, A> Node<T, A> {
    /// Insert `item` at position `i`, with `child` becoming the new right
    /// child of that position for internal nodes.
    ///
    /// The caller guarantees spare capacity (children of full nodes are split
    /// before descent) and is responsible for the augmentation update.
    pub(crate) fn insert_at(&mut self, i: usize, item: T, child: Option<SharedNode<T, A>>) {
        self.items.insert(i, item);
        if let Some(child) = child {
            self.children.insert(i + 1, child);
        }
    }

    /// Remove the item at position `i`; for internal nodes also detaches and
    /// returns the right child of that position.
    pub(crate) fn remove_at(&mut self, i: usize) -> (T, Option<SharedNode<T, A>>) {
        let item = self.items.remove(i);
        let child = if self.leaf {
            None
        } else {
            Some(self.children.remove(i + 1))
        };
        (item, child)
    }

    /// Append `(item, child)` at the back. Rebalancing form.
    pub(crate) fn push_back(&mut self, item: T, child: Option<SharedNode<T, A>>) {
        self.items.push(item);
        if let Some(child) = child {
            self.children.push(child);
        }
    }

    /// Prepend `(item, child)` at the front. Rebalancing form.
    pub(crate) fn push_front(&mut self, item: T, child: Option<SharedNode<T, A>>) {
        self.items.insert(0, item);
        if let Some(child) = child {
            self.children.insert(0, child);
        }
    }

    /// Detach the last item and (for internals) the last child.
    #[expect(clippy::expect_used, reason = "caller guarantees a non-empty node")]
    pub(crate) fn pop_back(&mut self) -> (T, Option<SharedNode<T, A>>) {
        let child = if self.leaf { None } else { self.children.pop() };
        let item = self.items.pop().expect("pop_back on an empty node");
        (item, child)
    }

    /// Detach the first item and (for internals) the first child.
    pub(crate) fn pop_front(&mut self) -> (T, Option<SharedNode<T, A>>) {
        let child = if self.leaf {
            None
        } else {
            Some(self.children.remove(0))
        };
        let item = self.items.remove(0);
        (item, child)
    }
}

// ============================================================================
//  Split
// ============================================================================

impl<T, A> Node<T, A> {
    /// Split this node at `mid`, producing the separator item and a fresh
    /// right sibling of the same leaf flag holding everything above `mid`.
    ///
    /// Both halves get a full augmentation recompute: bulk movement makes
    /// incremental accounting unprofitable.
    #[expect(clippy::expect_used, reason = "split point is inside the node")]
    pub(crate) fn split(&mut self, mid: usize) -> (T, Node<T, A>)
    where
        A: Augment<T>,
    {
        trace_log!(mid, len = self.len(), leaf = self.leaf, "splitting node");

        let mut right = Node::new(self.leaf);
        right.items.extend(self.items.drain(mid + 1..));
        if !self.leaf {
            right.children.extend(self.children.drain(mid + 1..));
        }
        let separator = self.items.pop().expect("split point inside the node");

        self.refresh_aug();
        right.refresh_aug();
        (separator, right)
    }
}

// ============================================================================
//  Augmentation Plumbing
// ============================================================================

impl<T, A: Augment<T>> Node<T, A> {
    /// Recompute this node's augmentation from scratch.
    pub(crate) fn refresh_aug(&mut self) {
        let view = NodeView::new(&self.items, &self.children);
        self.aug.recompute(view);
    }

    /// Fire the insert hook against a node decomposed into its fields.
    ///
    /// Decomposed form so call sites can borrow the item out of the same
    /// node's storage while the augmentation is updated.
    pub(crate) fn notify_insert(
        aug: &mut A,
        items: &[T],
        children: &[SharedNode<T, A>],
        item: &T,
        moved: Option<&A>,
    ) -> bool {
        aug.on_insert(item, NodeView::new(items, children), moved)
    }

    /// Fire the removal hook. See [`Node::notify_insert`].
    pub(crate) fn notify_remove(
        aug: &mut A,
        items: &[T],
        children: &[SharedNode<T, A>],
        item: &T,
        moved: Option<&A>,
    ) -> bool {
        aug.on_remove(item, NodeView::new(items, children), moved)
    }
}

// ============================================================================
//  Copy-on-Write
// ============================================================================

impl<T: Clone, A: Clone> Node<T, A> {
    /// Mutable access to child `i` under the copy-on-write discipline.
    ///
    /// A uniquely-owned child is returned as-is. A shared child is first
    /// value-copied (bumping each grandchild's refcount) and the slot is
    /// redirected to the copy, leaving other owners on the original.
    #[inline]
    pub(crate) fn child_mut(&mut self, i: usize) -> &mut Node<T, A> {
        Arc::make_mut(&mut self.children[i])
    }
}

impl<T: Clone, A: Clone> Clone for Node<T, A> {
    fn clone(&self) -> Self {
        trace_log!(len = self.len(), leaf = self.leaf, "copy-on-write node clone");
        Self {
            leaf: self.leaf,
            items: self.items.clone(),
            children: self.children.clone(),
            aug: self.aug.clone(),
        }
    }
}

impl<T, A> fmt::Debug for Node<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("leaf", &self.leaf)
            .field("len", &self.len())
            .field("children", &self.children.len())
            .finish()
    }
}
