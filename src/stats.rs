//! Filepath: src/stats.rs
//!
//! Tree statistics and invariant validation.
//!
//! [`TreeStats::collect`] walks every reachable node in a single pass and is
//! cheap enough for test teardown; [`AugBTree::check_invariants`] runs the
//! same walk while enforcing the structural rules every reachable node must
//! satisfy:
//!
//! - a non-root node holds at least `D - 1` items, the root at least one
//! - an internal node with `k` items has exactly `k + 1` children
//! - items within a node are strictly increasing, and every child's items
//!   lie strictly between the node's bounding items
//! - all leaves sit at the same depth
//! - every augmentation equals a fresh bottom-up recompute
//! - node item counts sum to the tree length
//!
//! Validation observes shared subtrees like any other reader; it is safe to
//! run on one clone while other clones of the tree are in active use.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::augment::{Augment, NodeView};
use crate::node::{MIN_ITEMS, SharedNode};
use crate::tree::AugBTree;

// ============================================================================
//  TreeStats
// ============================================================================

/// Aggregate counts collected from a full tree walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Total number of reachable nodes.
    pub node_count: usize,

    /// Total number of items across all nodes.
    pub item_count: usize,

    /// Number of leaf nodes.
    pub leaf_count: usize,

    /// Nodes whose reference count exceeds one, i.e. nodes shared with at
    /// least one other tree handle.
    pub shared_node_count: usize,

    /// Depth of the leaves (uniform across the tree); 0 when empty.
    pub height: usize,
}

impl TreeStats {
    /// Collect statistics without validating invariants.
    pub fn collect<T, A>(tree: &AugBTree<T, A>) -> Self {
        let mut stats = Self::default();
        if let Some(root) = tree.root() {
            collect_node(root, 1, &mut stats);
        }
        stats
    }
}

fn collect_node<T, A>(node: &SharedNode<T, A>, depth: usize, stats: &mut TreeStats) {
    stats.node_count += 1;
    stats.item_count += node.len();
    if Arc::strong_count(node) > 1 {
        stats.shared_node_count += 1;
    }
    if node.is_leaf() {
        stats.leaf_count += 1;
        stats.height = stats.height.max(depth);
        return;
    }
    for child in &node.children {
        collect_node(child, depth + 1, stats);
    }
}

// ============================================================================
//  InvariantError
// ============================================================================

/// A structural rule violated somewhere in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantError {
    /// A non-root node holds fewer than `D - 1` items, or the root is empty.
    Underflow {
        /// Observed item count.
        len: usize,
    },

    /// An internal node's child count is not `items + 1`, or a leaf carries
    /// children.
    ChildCountMismatch {
        /// Observed item count.
        items: usize,
        /// Observed child count.
        children: usize,
    },

    /// Items within a node are not strictly increasing.
    ItemsOutOfOrder,

    /// A child holds an item outside the open interval between its bounding
    /// separators.
    SeparatorBoundViolated,

    /// Two leaves sit at different depths.
    UnevenLeafDepth {
        /// Depth of the first leaf encountered.
        expected: usize,
        /// Depth of the offending leaf.
        found: usize,
    },

    /// A node's augmentation differs from a fresh bottom-up recompute.
    StaleAugmentation,

    /// Node item counts do not sum to the tree's recorded length.
    LengthMismatch {
        /// The tree's recorded length.
        expected: usize,
        /// Sum of item counts over all nodes.
        actual: usize,
    },
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Underflow { len } => write!(f, "node underflow: {len} items"),

            Self::ChildCountMismatch { items, children } => {
                write!(f, "{items} items but {children} children")
            }

            Self::ItemsOutOfOrder => write!(f, "items within a node are out of order"),

            Self::SeparatorBoundViolated => {
                write!(f, "child item outside its separator bounds")
            }

            Self::UnevenLeafDepth { expected, found } => {
                write!(f, "leaf at depth {found}, expected {expected}")
            }

            Self::StaleAugmentation => write!(f, "augmentation differs from fresh recompute"),

            Self::LengthMismatch { expected, actual } => {
                write!(f, "tree length {expected} but nodes hold {actual} items")
            }
        }
    }
}

impl Error for InvariantError {}

// ============================================================================
//  Validation Walk
// ============================================================================

impl<T: Ord, A: Augment<T> + PartialEq> AugBTree<T, A> {
    /// Verify every reachable node against the structural invariants,
    /// returning the collected statistics on success.
    pub fn check_invariants(&self) -> Result<TreeStats, InvariantError> {
        let mut stats = TreeStats::default();
        let mut leaf_depth = None;
        if let Some(root) = self.root() {
            check_node(root, 1, None, None, true, &mut stats, &mut leaf_depth)?;
        }
        stats.height = leaf_depth.unwrap_or(0);
        if stats.item_count != self.len() {
            return Err(InvariantError::LengthMismatch {
                expected: self.len(),
                actual: stats.item_count,
            });
        }
        Ok(stats)
    }
}

fn check_node<T: Ord, A: Augment<T> + PartialEq>(
    node: &SharedNode<T, A>,
    depth: usize,
    lower: Option<&T>,
    upper: Option<&T>,
    is_root: bool,
    stats: &mut TreeStats,
    leaf_depth: &mut Option<usize>,
) -> Result<(), InvariantError> {
    let len = node.len();
    let min = if is_root { 1 } else { MIN_ITEMS };
    if len < min {
        return Err(InvariantError::Underflow { len });
    }

    let expected_children = if node.is_leaf() { 0 } else { len + 1 };
    if node.children.len() != expected_children {
        return Err(InvariantError::ChildCountMismatch {
            items: len,
            children: node.children.len(),
        });
    }

    if node.items.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(InvariantError::ItemsOutOfOrder);
    }
    if let Some(lower) = lower {
        if node.items[0] <= *lower {
            return Err(InvariantError::SeparatorBoundViolated);
        }
    }
    if let Some(upper) = upper {
        if node.items[len - 1] >= *upper {
            return Err(InvariantError::SeparatorBoundViolated);
        }
    }

    stats.node_count += 1;
    stats.item_count += len;
    if Arc::strong_count(node) > 1 {
        stats.shared_node_count += 1;
    }

    if node.is_leaf() {
        stats.leaf_count += 1;
        let expected = *leaf_depth.get_or_insert(depth);
        if depth != expected {
            return Err(InvariantError::UnevenLeafDepth {
                expected,
                found: depth,
            });
        }
        return check_aug(node);
    }

    for i in 0..=len {
        let child_lower = if i == 0 { lower } else { Some(&node.items[i - 1]) };
        let child_upper = if i == len { upper } else { Some(&node.items[i]) };
        check_node(
            &node.children[i],
            depth + 1,
            child_lower,
            child_upper,
            false,
            stats,
            leaf_depth,
        )?;
    }

    // Children verified, so a recompute against their summaries is trusted.
    check_aug(node)
}

fn check_aug<T, A: Augment<T> + PartialEq>(node: &SharedNode<T, A>) -> Result<(), InvariantError> {
    let mut fresh = A::default();
    fresh.recompute(NodeView::new(&node.items, &node.children));
    if fresh == node.aug {
        Ok(())
    } else {
        Err(InvariantError::StaleAugmentation)
    }
}
