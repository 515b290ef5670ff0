//! # augbtree
//!
//! An in-memory, ordered, copy-on-write B-tree with a pluggable per-node
//! augmentation.
//!
//! ## Design
//!
//! - **Ordered set semantics**: items are kept in strict [`Ord`] order with
//!   no duplicates; inserting an order-equal item replaces in place.
//! - **Copy-on-write**: [`AugBTree::clone`] is O(1) and shares every node.
//!   A write through a shared node lazily copies just the nodes on that
//!   write path, so clones diverge at O(log N) cost per mutation while
//!   untouched subtrees stay physically shared.
//! - **Augmentation**: every node carries a monoidal summary
//!   (see [`Augment`]) kept current through splits, merges and rotations.
//!   The bundled [`SubtreeCount`] summary turns the tree into an
//!   order-statistic set whose iterator finds the k-th smallest item in
//!   O(log N).
//!
//! Writers on one tree handle must be serialized, which `&mut self`
//! enforces; readers on other handles of the same family run freely in
//! parallel, since shared nodes are never mutated in place.
//!
//! ## Example
//!
//! ```
//! use augbtree::CountedSet;
//!
//! let mut tree: CountedSet<u32> = (1..=1000).collect();
//! let snapshot = tree.clone();
//!
//! for x in 1..=500 {
//!     tree.delete(&x);
//! }
//!
//! let mut it = tree.iter();
//! assert!(it.nth(0));
//! assert_eq!(it.cur(), Some(&501));
//!
//! // The snapshot never sees the deletions.
//! assert_eq!(snapshot.len(), 1000);
//! ```

mod augment;
mod iter;
mod node;
pub mod stats;
mod tracing_helpers;
mod tree;

pub use augment::{Augment, NoAug, NodeView, SubtreeCount};
pub use iter::Iter;
pub use node::TREE_DEGREE;
pub use tree::{AugBTree, CountedSet, OrderedSet};
