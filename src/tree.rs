//! Filepath: src/tree.rs
//!
//! `AugBTree` - an in-memory, ordered, copy-on-write B-tree with a pluggable
//! per-node augmentation.
//!
//! The tree owns a root handle plus a length counter and hosts the recursive
//! insert/remove/rebalance algorithms on top of the structural primitives in
//! [`node`](crate::node). Cloning a tree is O(1): both handles share every
//! node until one of them writes, at which point the write path is lazily
//! copied node by node (see [`Node::child_mut`]).
//!
//! Writers must be externally serialized, which `&mut self` enforces.
//! Readers on other handles may run in parallel: a shared node is never
//! mutated in place, only replaced in its owner's slot.

use std::cmp::Ordering;
use std::fmt;
use std::mem;
use std::sync::Arc;

use crate::augment::{Augment, NoAug, SubtreeCount};
use crate::iter::Iter;
use crate::node::{MAX_ITEMS, MIN_ITEMS, Node, SharedNode};
use crate::tracing_helpers::{debug_log, trace_log};

// ============================================================================
//  Outcome Types
// ============================================================================

/// Result of an insertion into a subtree.
struct InsertOutcome<T> {
    /// The previous item displaced by an order-equal insert, if any.
    replaced: Option<T>,

    /// Whether this subtree's augmentation changed. Ancestors stop updating
    /// once a level reports `false`.
    aug_changed: bool,
}

/// Result of a removal from a subtree.
struct RemoveOutcome<T> {
    /// The item taken out of the subtree, if it was present.
    removed: Option<T>,

    /// Whether this subtree's augmentation changed.
    aug_changed: bool,
}

// ============================================================================
//  AugBTree
// ============================================================================

/// An ordered, copy-on-write B-tree with a per-node augmentation.
///
/// Items are kept in strict `Ord` order with no duplicates: inserting an
/// order-equal item replaces the stored one in place. `A` is the monoidal
/// summary maintained at every node; use [`NoAug`] for a plain ordered set
/// or [`SubtreeCount`] for order statistics.
///
/// # Example
///
/// ```
/// use augbtree::OrderedSet;
///
/// let mut tree = OrderedSet::new();
/// for x in [3, 1, 2] {
///     tree.set(x);
/// }
///
/// let snapshot = tree.clone(); // O(1), shares all nodes
/// tree.delete(&2);
///
/// assert_eq!(tree.len(), 2);
/// assert_eq!(snapshot.len(), 3);
/// assert!(snapshot.contains(&2));
/// ```
pub struct AugBTree<T, A = NoAug> {
    /// Root handle; `None` iff the tree is empty.
    root: Option<SharedNode<T, A>>,

    /// Total number of items.
    length: usize,
}

/// Plain ordered set: an [`AugBTree`] with the no-op augmentation.
pub type OrderedSet<T> = AugBTree<T, NoAug>;

/// Order-statistic set: an [`AugBTree`] counting items per subtree. Its
/// iterator additionally offers [`nth`](Iter::nth).
pub type CountedSet<T> = AugBTree<T, SubtreeCount>;

impl<T, A> AugBTree<T, A> {
    /// Create an empty tree.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root: None,
            length: 0,
        }
    }

    /// Number of items in the tree.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Whether the tree holds no items.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Number of levels on the path from the root to a leaf; 0 when empty.
    #[must_use]
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut node = self.root.as_deref();
        while let Some(n) = node {
            height += 1;
            node = n.children.first().map(|child| child.as_ref());
        }
        height
    }

    /// Drop every item, releasing this handle's share of all nodes.
    pub fn reset(&mut self) {
        self.root = None;
        self.length = 0;
    }

    /// Cursor over the tree. The borrow pins the tree: mutation while an
    /// iterator is alive is rejected at compile time.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, T, A> {
        Iter::new(self.root.as_deref())
    }

    pub(crate) fn root(&self) -> Option<&SharedNode<T, A>> {
        self.root.as_ref()
    }
}

impl<T: Ord, A> AugBTree<T, A> {
    /// Look up the stored item order-equal to `item`.
    #[must_use]
    pub fn get(&self, item: &T) -> Option<&T> {
        let mut node = self.root.as_deref()?;
        loop {
            let (idx, found) = node.search(item);
            if found {
                return Some(&node.items[idx]);
            }
            if node.is_leaf() {
                return None;
            }
            node = node.child(idx);
        }
    }

    /// Whether an order-equal item is present.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.get(item).is_some()
    }
}

impl<T: Ord + Clone, A: Augment<T>> AugBTree<T, A> {
    /// Insert `item`, replacing any order-equal item in place.
    ///
    /// Replacement does not fire any augmentation hook: summaries track item
    /// presence, not payload. An augmentation that depends on payload must be
    /// refreshed by a delete-then-set pair.
    pub fn set(&mut self, item: T) {
        let mut root = self
            .root
            .take()
            .unwrap_or_else(|| Arc::new(Node::new_leaf()));

        if root.len() == MAX_ITEMS {
            debug_log!(len = self.length, "splitting full root");
            let (separator, right) = Arc::make_mut(&mut root).split(MAX_ITEMS / 2);
            let mut new_root = Node::new_internal();
            new_root.items.push(separator);
            new_root.children.push(root);
            new_root.children.push(Arc::new(right));
            new_root.refresh_aug();
            root = Arc::new(new_root);
        }

        let outcome = Arc::make_mut(&mut root).insert(item);
        if outcome.replaced.is_none() {
            self.length += 1;
        }
        self.root = Some(root);
    }

    /// Remove the item order-equal to `item`, if present.
    pub fn delete(&mut self, item: &T) {
        let Some(mut root) = self.root.take() else {
            return;
        };

        let outcome = Arc::make_mut(&mut root).remove(item);
        if outcome.removed.is_some() {
            self.length -= 1;
        }

        if root.len() == 0 {
            if root.is_leaf() {
                // Tree is now empty; the root handle is released.
                return;
            }
            // The sole remaining child becomes the root. Detaching it first
            // keeps it alive past the old root's release.
            trace_log!("collapsing empty root");
            self.root = Arc::make_mut(&mut root).children.pop();
            return;
        }
        self.root = Some(root);
    }
}

// ============================================================================
//  Recursive Insert
// ============================================================================

impl<T: Ord + Clone, A: Augment<T>> Node<T, A> {
    fn insert(&mut self, item: T) -> InsertOutcome<T> {
        let (mut idx, found) = self.search(&item);

        if found {
            // Order-equal insert replaces in place; no augmentation hook.
            let replaced = mem::replace(&mut self.items[idx], item);
            return InsertOutcome {
                replaced: Some(replaced),
                aug_changed: false,
            };
        }

        if self.is_leaf() {
            self.insert_at(idx, item, None);
            let aug_changed = Self::notify_insert(
                &mut self.aug,
                &self.items,
                &self.children,
                &self.items[idx],
                None,
            );
            return InsertOutcome {
                replaced: None,
                aug_changed,
            };
        }

        if self.children[idx].len() == MAX_ITEMS {
            // Split the full child before descending so the recursion below
            // always has a slot to insert into.
            let (separator, right) = self.child_mut(idx).split(MAX_ITEMS / 2);
            self.insert_at(idx, separator, Some(Arc::new(right)));

            // Re-decide which side of the promoted separator the item
            // belongs to.
            match item.cmp(&self.items[idx]) {
                Ordering::Less => {}
                Ordering::Greater => idx += 1,
                Ordering::Equal => {
                    let replaced = mem::replace(&mut self.items[idx], item);
                    return InsertOutcome {
                        replaced: Some(replaced),
                        aug_changed: false,
                    };
                }
            }
        }

        let probe = item.clone();
        let outcome = self.child_mut(idx).insert(item);
        let aug_changed = outcome.aug_changed
            && Self::notify_insert(&mut self.aug, &self.items, &self.children, &probe, None);
        InsertOutcome {
            replaced: outcome.replaced,
            aug_changed,
        }
    }
}

// ============================================================================
//  Recursive Remove
// ============================================================================

impl<T: Ord + Clone, A: Augment<T>> Node<T, A> {
    fn remove(&mut self, item: &T) -> RemoveOutcome<T> {
        loop {
            let (idx, found) = self.search(item);

            if self.is_leaf() {
                if !found {
                    return RemoveOutcome {
                        removed: None,
                        aug_changed: false,
                    };
                }
                let (removed, _) = self.remove_at(idx);
                let aug_changed = Self::notify_remove(
                    &mut self.aug,
                    &self.items,
                    &self.children,
                    &removed,
                    None,
                );
                return RemoveOutcome {
                    removed: Some(removed),
                    aug_changed,
                };
            }

            if self.children[idx].len() <= MIN_ITEMS {
                // The target child cannot afford to lose an item. Refill it
                // and retry: the rebalance may have shifted the target into a
                // different slot or merged it into a sibling.
                self.rebalance_or_merge(idx);
                continue;
            }

            if found {
                // Replace the separator with its in-order predecessor pulled
                // out of the left child.
                let (predecessor, _) = self.child_mut(idx).remove_max();
                let removed = mem::replace(&mut self.items[idx], predecessor);
                let aug_changed = Self::notify_remove(
                    &mut self.aug,
                    &self.items,
                    &self.children,
                    &removed,
                    None,
                );
                return RemoveOutcome {
                    removed: Some(removed),
                    aug_changed,
                };
            }

            let RemoveOutcome {
                removed,
                aug_changed,
            } = self.child_mut(idx).remove(item);
            let Some(removed) = removed else {
                return RemoveOutcome {
                    removed: None,
                    aug_changed: false,
                };
            };
            let aug_changed = aug_changed
                && Self::notify_remove(&mut self.aug, &self.items, &self.children, &removed, None);
            return RemoveOutcome {
                removed: Some(removed),
                aug_changed,
            };
        }
    }

    /// Detach the maximum item of this subtree, keeping every node on the
    /// rightmost path above `MIN_ITEMS` on the way down.
    fn remove_max(&mut self) -> (T, bool) {
        if self.is_leaf() {
            let (item, _) = self.pop_back();
            let aug_changed =
                Self::notify_remove(&mut self.aug, &self.items, &self.children, &item, None);
            return (item, aug_changed);
        }

        if self.children[self.len()].len() <= MIN_ITEMS {
            self.rebalance_or_merge(self.len());
            return self.remove_max();
        }

        let last = self.len();
        let (item, changed_below) = self.child_mut(last).remove_max();
        let aug_changed = changed_below
            && Self::notify_remove(&mut self.aug, &self.items, &self.children, &item, None);
        (item, aug_changed)
    }
}

// ============================================================================
//  Rebalance / Merge
// ============================================================================

impl<T: Ord + Clone, A: Augment<T>> Node<T, A> {
    /// Refill child `i`, which sits at `MIN_ITEMS` and is about to shrink:
    /// rotate an item in from a richer sibling, or merge with one.
    ///
    /// This node's own augmentation is not refreshed here; the retried
    /// removal updates it once the item actually leaves the subtree.
    fn rebalance_or_merge(&mut self, i: usize) {
        if i > 0 && self.children[i - 1].len() > MIN_ITEMS {
            self.rotate_from_left(i);
        } else if i < self.len() && self.children[i + 1].len() > MIN_ITEMS {
            self.rotate_from_right(i);
        } else {
            // Clamp so both the separator and a right sibling exist.
            self.merge_children(i.min(self.len() - 1));
        }
    }

    /// Move the left sibling's last item up into the separator slot and the
    /// old separator down onto the front of child `i`, carrying the
    /// sibling's detached last child along.
    fn rotate_from_left(&mut self, i: usize) {
        trace_log!(index = i, "rotating item in from left sibling");

        let (up, carried) = {
            let left = self.child_mut(i - 1);
            let (up, carried) = left.pop_back();
            Self::notify_remove(
                &mut left.aug,
                &left.items,
                &left.children,
                &up,
                carried.as_ref().map(|c| &c.aug),
            );
            (up, carried)
        };

        let down = mem::replace(&mut self.items[i - 1], up);

        let child = self.child_mut(i);
        child.push_front(down, carried);
        let moved = if child.is_leaf() {
            None
        } else {
            Some(&child.children[0].aug)
        };
        Self::notify_insert(
            &mut child.aug,
            &child.items,
            &child.children,
            &child.items[0],
            moved,
        );
    }

    /// Mirror image of [`Node::rotate_from_left`].
    fn rotate_from_right(&mut self, i: usize) {
        trace_log!(index = i, "rotating item in from right sibling");

        let (up, carried) = {
            let right = self.child_mut(i + 1);
            let (up, carried) = right.pop_front();
            Self::notify_remove(
                &mut right.aug,
                &right.items,
                &right.children,
                &up,
                carried.as_ref().map(|c| &c.aug),
            );
            (up, carried)
        };

        let down = mem::replace(&mut self.items[i], up);

        let child = self.child_mut(i);
        child.push_back(down, carried);
        let moved = if child.is_leaf() {
            None
        } else {
            Some(&child.children[child.len()].aug)
        };
        let back = child.items.len() - 1;
        Self::notify_insert(
            &mut child.aug,
            &child.items,
            &child.children,
            &child.items[back],
            moved,
        );
    }

    /// Fuse child `i`, the separator at `i`, and child `i + 1` into a single
    /// child. Both children are at `MIN_ITEMS`, so the result fits exactly.
    #[expect(clippy::expect_used, reason = "merge only runs on internal nodes")]
    fn merge_children(&mut self, i: usize) {
        debug_log!(index = i, "merging children around separator");

        // Make the right sibling exclusive before its children are moved out.
        let _ = self.child_mut(i + 1);
        let (separator, right) = self.remove_at(i);
        let right = right.expect("internal node has a right child to merge");
        let right = Arc::unwrap_or_clone(right);
        let moved = right.aug.clone();

        let child = self.child_mut(i);
        let separator_idx = child.len();
        child.items.push(separator);
        child.items.extend(right.items);
        child.children.extend(right.children);
        Self::notify_insert(
            &mut child.aug,
            &child.items,
            &child.children,
            &child.items[separator_idx],
            Some(&moved),
        );
    }
}

// ============================================================================
//  Trait Impls
// ============================================================================

impl<T, A> Clone for AugBTree<T, A> {
    /// Lazy O(1) clone: shares the whole structure until either side writes.
    fn clone(&self) -> Self {
        trace_log!(len = self.length, "lazy tree clone, sharing root");
        Self {
            root: self.root.clone(),
            length: self.length,
        }
    }
}

impl<T, A> Default for AugBTree<T, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A> fmt::Debug for AugBTree<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AugBTree")
            .field("len", &self.length)
            .field("height", &self.height())
            .finish()
    }
}

impl<T: Ord + Clone, A: Augment<T>> FromIterator<T> for AugBTree<T, A> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<T: Ord + Clone, A: Augment<T>> Extend<T> for AugBTree<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.set(item);
        }
    }
}

/// Newick-like rendering: `;` for the empty tree, otherwise
/// `(subtree)item(subtree)item…(subtree)` recursively, with leaves as
/// comma-separated items.
impl<T: fmt::Display, A> fmt::Display for AugBTree<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root.as_deref() {
            None => f.write_str(";"),
            Some(root) => fmt_subtree(root, f),
        }
    }
}

fn fmt_subtree<T: fmt::Display, A>(node: &Node<T, A>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if node.is_leaf() {
        for (i, item) in node.items.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{item}")?;
        }
        return Ok(());
    }
    for (i, item) in node.items.iter().enumerate() {
        f.write_str("(")?;
        fmt_subtree(node.child(i), f)?;
        f.write_str(")")?;
        write!(f, "{item}")?;
    }
    f.write_str("(")?;
    fmt_subtree(node.child(node.len()), f)?;
    f.write_str(")")
}
