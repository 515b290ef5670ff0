//! Scenario regression tests for tree operations.
//!
//! Exercises the fixed shapes a degree-16 tree must take on small inputs:
//! root splits, root collapse, clone divergence, order-statistic lookups.

#![expect(clippy::unwrap_used, reason = "fail fast in tests")]

mod common;

use std::cmp::Ordering;

use augbtree::stats::TreeStats;
use augbtree::{CountedSet, OrderedSet, TREE_DEGREE};
use rand::SeedableRng;
use rand::seq::SliceRandom;

fn scan<T: Clone, A>(tree: &augbtree::AugBTree<T, A>) -> Vec<T> {
    let mut out = Vec::with_capacity(tree.len());
    let mut it = tree.iter();
    let mut ok = it.first();
    while ok {
        out.push(it.cur().unwrap().clone());
        ok = it.next();
    }
    out
}

// =============================================================================
// Basic Shape
// =============================================================================

#[test]
fn two_items_single_leaf() {
    common::init_tracing();
    let mut tree = OrderedSet::new();
    tree.set(1);
    tree.set(2);

    let mut it = tree.iter();
    assert!(it.first());
    assert_eq!(it.cur(), Some(&1));
    assert!(it.next());
    assert_eq!(it.cur(), Some(&2));
    assert!(!it.next());
    assert!(!it.valid());

    assert_eq!(tree.len(), 2);
    assert_eq!(tree.height(), 1);
}

#[test]
fn hundred_ordered_inserts_scan_in_order() {
    let tree: OrderedSet<i32> = (1..=100).collect();
    assert_eq!(scan(&tree), (1..=100).collect::<Vec<_>>());
    // 100 items exceed a single leaf (31), so the tree has exactly 2 levels.
    assert_eq!(tree.height(), 2);
}

#[test]
fn root_split_at_thirty_three() {
    // A degree-16 leaf holds 31 items; the 32nd insert splits the root.
    let tree: CountedSet<i32> = (1..=33).collect();
    assert_eq!(tree.height(), 2);

    let stats = tree.check_invariants().unwrap();
    assert_eq!(stats.leaf_count, 2);
    assert_eq!(stats.node_count, 3);

    // Newick form `(leaf)separator(leaf)`: a root with exactly one item
    // renders exactly one parenthesized subtree per child.
    assert_eq!(tree.to_string().matches('(').count(), 2);
}

#[test]
fn deep_tree_shape_is_legal() {
    // Two levels top out at 31 + 32 * 31 = 1023 items for degree 16.
    let max = 2 * TREE_DEGREE as i32 - 1;
    let n = max + (max + 1) * max + 1;
    let tree: CountedSet<i32> = (0..n).collect();
    assert!(tree.height() >= 3);
    tree.check_invariants().unwrap();
    assert_eq!(scan(&tree), (0..n).collect::<Vec<_>>());
}

// =============================================================================
// Clone Divergence
// =============================================================================

#[test]
fn clone_then_delete_evens() {
    common::init_tracing();
    let mut a: OrderedSet<i32> = (1..=50).collect();
    let b = a.clone();

    for x in (2..=50).step_by(2) {
        a.delete(&x);
    }

    assert_eq!(scan(&a), (1..=49).step_by(2).collect::<Vec<_>>());
    assert_eq!(scan(&b), (1..=50).collect::<Vec<_>>());
}

#[test]
fn divergent_clones_share_structure() {
    let mut a: OrderedSet<i32> = (0..1000).collect();
    let b = a.clone();

    a.set(1000);

    // One write path was copied; everything else is still physically shared.
    let stats = TreeStats::collect(&a);
    assert!(stats.shared_node_count > 0);
    assert!(stats.shared_node_count < stats.node_count);

    // Dropping the snapshot returns the tree to sole ownership.
    drop(b);
    assert_eq!(TreeStats::collect(&a).shared_node_count, 0);
}

#[test]
fn reset_leaves_clone_untouched() {
    let mut a: OrderedSet<i32> = (0..100).collect();
    let b = a.clone();
    a.reset();

    assert!(a.is_empty());
    assert_eq!(a.to_string(), ";");
    assert_eq!(b.len(), 100);
    b.check_invariants().unwrap();
}

// =============================================================================
// Order Statistics
// =============================================================================

#[test]
fn nth_on_random_insertion_order() {
    let mut items: Vec<i32> = (1..=1000).collect();
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
    items.shuffle(&mut rng);

    let tree: CountedSet<i32> = items.into_iter().collect();
    tree.check_invariants().unwrap();

    let mut it = tree.iter();
    for k in [0usize, 1, 499, 500, 999] {
        assert!(it.nth(k), "nth({k}) should land on an item");
        assert_eq!(it.cur(), Some(&(k as i32 + 1)));
    }
    assert!(!it.nth(1000));
}

// =============================================================================
// Duplicate Handling
// =============================================================================

#[derive(Clone, Debug)]
struct Keyed {
    key: i32,
    tag: u32,
}

impl PartialEq for Keyed {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for Keyed {}
impl PartialOrd for Keyed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Keyed {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

#[test]
fn order_equal_insert_replaces_in_place() {
    let mut tree: OrderedSet<Keyed> = OrderedSet::new();
    for key in 0..100 {
        tree.set(Keyed { key, tag: 1 });
    }
    tree.set(Keyed { key: 40, tag: 2 });

    assert_eq!(tree.len(), 100);
    let stored: Vec<Keyed> = scan(&tree);
    assert_eq!(stored.len(), 100);
    assert_eq!(stored[40].tag, 2);
    assert!(stored.iter().filter(|k| k.tag == 2).count() == 1);
}

#[test]
fn replacement_through_a_full_child_median() {
    // Filling past one split puts separators in the root; replacing every
    // item, separators included, must touch neither length nor order.
    let mut tree: OrderedSet<Keyed> = (0..40).map(|key| Keyed { key, tag: 1 }).collect();
    for key in 0..40 {
        tree.set(Keyed { key, tag: 2 });
    }
    assert_eq!(tree.len(), 40);
    let stored = scan(&tree);
    assert!(stored.iter().all(|k| k.tag == 2));
    assert_eq!(
        stored.iter().map(|k| k.key).collect::<Vec<_>>(),
        (0..40).collect::<Vec<_>>()
    );
}

// =============================================================================
// Round Trips
// =============================================================================

#[test]
fn insert_then_delete_absent_item_restores_tree() {
    // Structural equality needs a path with no splits or rebalances, so
    // stay within a single leaf.
    let tree: CountedSet<i32> = (0..20).map(|x| x * 2).collect();
    let before = tree.to_string();

    let mut tree = tree;
    tree.set(7);
    tree.delete(&7);

    assert_eq!(tree.to_string(), before);
    tree.check_invariants().unwrap();
}

#[test]
fn insert_then_delete_absent_item_semantically_equal() {
    // Deeper trees may shift node boundaries on the way through, but the
    // contents and summaries stay equivalent.
    let reference: CountedSet<i32> = (0..500).map(|x| x * 2).collect();
    let mut tree = reference.clone();

    tree.set(701);
    tree.delete(&701);

    assert_eq!(scan(&tree), scan(&reference));
    tree.check_invariants().unwrap();
}

#[test]
fn delete_everything_in_random_order() {
    let mut items: Vec<i32> = (0..777).collect();
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    items.shuffle(&mut rng);

    let mut tree: CountedSet<i32> = items.iter().copied().collect();
    for (i, x) in items.iter().enumerate() {
        tree.delete(x);
        if i % 64 == 0 {
            tree.check_invariants().unwrap();
        }
    }
    assert!(tree.is_empty());
    assert_eq!(tree.height(), 0);
}
