//! Filepath: src/iter.rs
//!
//! Bidirectional cursor over an [`AugBTree`](crate::AugBTree).
//!
//! The cursor keeps an explicit descent stack of `(ancestor, child index)`
//! frames instead of parent pointers; the stack is inline up to three frames
//! (a tree of degree 16 holds hundreds of thousands of items at that depth)
//! and spills to the heap beyond.
//!
//! Every positioning operation returns whether the cursor now rests on a
//! valid item. The cursor borrows the tree, so mutating the tree while a
//! cursor is alive is a compile error.

use smallvec::SmallVec;

use crate::augment::SubtreeCount;
use crate::node::Node;

/// Frames kept inline before the descent stack spills to the heap.
const INLINE_DEPTH: usize = 3;

/// One suspended level of the descent: the ancestor node and the index of
/// the child the cursor went down into.
struct Frame<'a, T, A> {
    node: &'a Node<T, A>,
    child_idx: usize,
}

/// Stateful bidirectional cursor. Created by
/// [`AugBTree::iter`](crate::AugBTree::iter); starts unpositioned.
pub struct Iter<'a, T, A> {
    root: Option<&'a Node<T, A>>,
    node: Option<&'a Node<T, A>>,
    pos: usize,
    stack: SmallVec<[Frame<'a, T, A>; INLINE_DEPTH]>,
}

impl<'a, T, A> Iter<'a, T, A> {
    pub(crate) fn new(root: Option<&'a Node<T, A>>) -> Self {
        Self {
            root,
            node: None,
            pos: 0,
            stack: SmallVec::new(),
        }
    }

    /// Whether the cursor rests on an item.
    #[inline]
    #[must_use]
    pub fn valid(&self) -> bool {
        self.node.is_some_and(|node| self.pos < node.len())
    }

    /// The item under the cursor, or `None` when not [`valid`](Iter::valid).
    #[inline]
    #[must_use]
    pub fn cur(&self) -> Option<&'a T> {
        let node = self.node?;
        node.items.get(self.pos)
    }

    /// Forget the current position. The cursor is invalid until the next
    /// positioning call.
    pub fn reset(&mut self) {
        self.node = None;
        self.pos = 0;
        self.stack.clear();
    }

    /// Position on the smallest item. Returns false on an empty tree.
    pub fn first(&mut self) -> bool {
        self.rewind();
        self.walk_leftmost()
    }

    /// Position on the largest item. Returns false on an empty tree.
    pub fn last(&mut self) -> bool {
        self.rewind();
        self.walk_rightmost()
    }

    /// Advance to the next item in order.
    #[allow(
        clippy::should_implement_trait,
        reason = "cursor positioning API, not an Iterator"
    )]
    pub fn next(&mut self) -> bool {
        let Some(node) = self.node else {
            return false;
        };
        if node.is_leaf() {
            self.pos += 1;
            self.ascend_past_exhausted()
        } else {
            // The successor of a separator is the leftmost item of the
            // child just to its right.
            self.descend(self.pos + 1);
            self.walk_leftmost()
        }
    }

    /// Step back to the previous item in order.
    pub fn prev(&mut self) -> bool {
        let Some(node) = self.node else {
            return false;
        };
        if node.is_leaf() {
            loop {
                if self.pos > 0 {
                    self.pos -= 1;
                    return true;
                }
                // Front of this leaf; the predecessor is the separator left
                // of the child link we came down through.
                let Some(frame) = self.stack.pop() else {
                    self.node = None;
                    return false;
                };
                self.node = Some(frame.node);
                self.pos = frame.child_idx;
            }
        } else {
            self.descend(self.pos);
            self.walk_rightmost()
        }
    }

    /// Restart at the root with a clean stack.
    fn rewind(&mut self) {
        self.stack.clear();
        self.node = self.root;
        self.pos = 0;
    }

    /// Push the current frame and move into child `child_idx`.
    fn descend(&mut self, child_idx: usize) {
        if let Some(node) = self.node {
            self.stack.push(Frame { node, child_idx });
            self.node = Some(node.child(child_idx));
            self.pos = 0;
        }
    }

    /// From the current node, run down first-child links to the leftmost
    /// leaf and rest on its first item.
    fn walk_leftmost(&mut self) -> bool {
        loop {
            let Some(node) = self.node else {
                return false;
            };
            if node.is_leaf() {
                self.pos = 0;
                return node.len() > 0;
            }
            self.descend(0);
        }
    }

    /// Mirror image of [`Iter::walk_leftmost`].
    fn walk_rightmost(&mut self) -> bool {
        loop {
            let Some(node) = self.node else {
                return false;
            };
            if node.is_leaf() {
                if node.len() == 0 {
                    self.node = None;
                    return false;
                }
                self.pos = node.len() - 1;
                return true;
            }
            self.descend(node.len());
        }
    }

    /// With `pos` run off the end of the current node, pop frames until the
    /// cursor rests on the separator just crossed, or run out of tree.
    fn ascend_past_exhausted(&mut self) -> bool {
        loop {
            let Some(node) = self.node else {
                return false;
            };
            if self.pos < node.len() {
                return true;
            }
            let Some(frame) = self.stack.pop() else {
                self.node = None;
                return false;
            };
            self.node = Some(frame.node);
            self.pos = frame.child_idx;
        }
    }
}

impl<'a, T: Ord, A> Iter<'a, T, A> {
    /// Position on the least item `>= target`, or invalidate if none exists.
    pub fn seek_ge(&mut self, target: &T) -> bool {
        self.rewind();
        loop {
            let Some(node) = self.node else {
                return false;
            };
            let (pos, found) = node.search(target);
            self.pos = pos;
            if found {
                return true;
            }
            if node.is_leaf() {
                // Everything here is below the target; the answer, if any,
                // is a separator on the way back up.
                return self.ascend_past_exhausted();
            }
            self.descend(pos);
        }
    }

    /// Position on the greatest item `< target`, or invalidate if none
    /// exists.
    pub fn seek_lt(&mut self, target: &T) -> bool {
        self.rewind();
        loop {
            let Some(node) = self.node else {
                return false;
            };
            let (pos, found) = node.search(target);
            self.pos = pos;
            if found || node.is_leaf() {
                return self.prev();
            }
            self.descend(pos);
        }
    }
}

impl<'a, T> Iter<'a, T, SubtreeCount> {
    /// Position on the k-th smallest item (0-based) in O(log N), steering
    /// each descent with the child subtree totals. Returns false when the
    /// tree holds `k` items or fewer.
    pub fn nth(&mut self, k: usize) -> bool {
        self.rewind();
        let mut remaining = k;
        'descent: loop {
            let Some(node) = self.node else {
                return false;
            };
            if node.is_leaf() {
                if remaining < node.len() {
                    self.pos = remaining;
                    return true;
                }
                self.node = None;
                return false;
            }
            for i in 0..node.len() {
                let below = node.child(i).aug.total();
                if remaining < below {
                    self.descend(i);
                    continue 'descent;
                }
                remaining -= below;
                if remaining == 0 {
                    self.pos = i;
                    return true;
                }
                remaining -= 1;
            }
            self.descend(node.len());
        }
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used, reason = "fail fast in tests")]

    use crate::tree::{CountedSet, OrderedSet};

    #[test]
    fn test_empty_tree_cursor() {
        let tree: OrderedSet<i32> = OrderedSet::new();
        let mut it = tree.iter();
        assert!(!it.first());
        assert!(!it.last());
        assert!(!it.next());
        assert!(!it.valid());
        assert_eq!(it.cur(), None);
    }

    #[test]
    fn test_forward_scan_single_leaf() {
        let tree: OrderedSet<i32> = [1, 2].into_iter().collect();
        let mut it = tree.iter();

        assert!(it.first());
        assert_eq!(it.cur(), Some(&1));
        assert!(it.next());
        assert_eq!(it.cur(), Some(&2));
        assert!(!it.next());
        assert!(!it.valid());
    }

    #[test]
    fn test_scan_crosses_separators() {
        let tree: OrderedSet<i32> = (1..=200).collect();
        assert!(tree.height() > 1);

        let mut it = tree.iter();
        let mut seen = Vec::new();
        let mut ok = it.first();
        while ok {
            seen.push(*it.cur().unwrap());
            ok = it.next();
        }
        assert_eq!(seen, (1..=200).collect::<Vec<_>>());
    }

    #[test]
    fn test_backward_scan() {
        let tree: OrderedSet<i32> = (1..=200).collect();
        let mut it = tree.iter();
        let mut seen = Vec::new();
        let mut ok = it.last();
        while ok {
            seen.push(*it.cur().unwrap());
            ok = it.prev();
        }
        assert_eq!(seen, (1..=200).rev().collect::<Vec<_>>());
    }

    #[test]
    fn test_next_prev_are_inverses() {
        let tree: OrderedSet<i32> = (1..=100).collect();
        let mut it = tree.iter();
        assert!(it.seek_ge(&40));
        assert!(it.next());
        assert!(it.prev());
        assert_eq!(it.cur(), Some(&40));
        assert!(it.prev());
        assert!(it.next());
        assert_eq!(it.cur(), Some(&40));
    }

    #[test]
    fn test_seek_ge() {
        let tree: OrderedSet<i32> = (1..=100).map(|x| x * 2).collect();
        let mut it = tree.iter();

        assert!(it.seek_ge(&50));
        assert_eq!(it.cur(), Some(&50));

        assert!(it.seek_ge(&51));
        assert_eq!(it.cur(), Some(&52));

        assert!(it.seek_ge(&-10));
        assert_eq!(it.cur(), Some(&2));

        assert!(!it.seek_ge(&201));
        assert!(!it.valid());
    }

    #[test]
    fn test_seek_lt() {
        let tree: OrderedSet<i32> = (1..=100).map(|x| x * 2).collect();
        let mut it = tree.iter();

        assert!(it.seek_lt(&50));
        assert_eq!(it.cur(), Some(&48));

        assert!(it.seek_lt(&51));
        assert_eq!(it.cur(), Some(&50));

        assert!(it.seek_lt(&1000));
        assert_eq!(it.cur(), Some(&200));

        assert!(!it.seek_lt(&2));
        assert!(!it.valid());
    }

    #[test]
    fn test_seek_then_scan_is_sorted_suffix() {
        let tree: OrderedSet<i32> = (1..=300).collect();
        let mut it = tree.iter();
        let mut seen = Vec::new();
        let mut ok = it.seek_ge(&250);
        while ok {
            seen.push(*it.cur().unwrap());
            ok = it.next();
        }
        assert_eq!(seen, (250..=300).collect::<Vec<_>>());
    }

    #[test]
    fn test_reset_unpositions() {
        let tree: OrderedSet<i32> = (1..=10).collect();
        let mut it = tree.iter();
        assert!(it.first());
        it.reset();
        assert!(!it.valid());
        assert_eq!(it.cur(), None);
    }

    #[test]
    fn test_nth_small() {
        let tree: CountedSet<i32> = [5, 1, 9, 3, 7].into_iter().collect();
        let mut it = tree.iter();
        for (k, expected) in [1, 3, 5, 7, 9].iter().enumerate() {
            assert!(it.nth(k));
            assert_eq!(it.cur(), Some(expected));
        }
        assert!(!it.nth(5));
    }

    #[test]
    fn test_nth_deep_tree_and_scan_after() {
        let tree: CountedSet<i32> = (0..1000).collect();
        let mut it = tree.iter();

        assert!(it.nth(500));
        assert_eq!(it.cur(), Some(&500));

        // The descent stack is intact, so ordinary stepping works from here.
        assert!(it.next());
        assert_eq!(it.cur(), Some(&501));
        assert!(it.prev());
        assert!(it.prev());
        assert_eq!(it.cur(), Some(&499));
    }
}
