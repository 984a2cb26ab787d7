//! Properties of the anchor-region partitioning.

use proptest::prelude::*;
use tesoro::{GroupRegionSelection, RegionSelection, SearchSpace, Topology};

fn star_tree(n_children: usize) -> Topology {
    let mut tree = Topology::new();
    tree.add_root(0).unwrap();
    for i in 1..=n_children {
        tree.add_child(i, 0).unwrap();
    }
    tree.lock().unwrap();
    tree
}

fn balanced_binary_tree() -> Topology {
    let mut tree = Topology::new();
    tree.add_root(0).unwrap();
    tree.add_child(1, 0).unwrap();
    tree.add_child(2, 0).unwrap();
    tree.add_child(3, 1).unwrap();
    tree.add_child(4, 1).unwrap();
    tree.add_child(5, 2).unwrap();
    tree.add_child(6, 2).unwrap();
    tree.lock().unwrap();
    tree
}

#[test]
fn seven_node_binary_split_tiles_the_space_at_every_depth() {
    let space = SearchSpace::symmetric(4, -20.0, 20.0).unwrap();
    let tree = balanced_binary_tree();
    let policy = GroupRegionSelection::new(1, 2).unwrap();

    // Depth 1: the two internal nodes halve the space.
    let left = policy.select(&space, &tree, 1).unwrap();
    let right = policy.select(&space, &tree, 2).unwrap();
    for d in 0..4 {
        assert_eq!(left.anchor(d).low, -20.0);
        assert_eq!(left.anchor(d).high, 0.0);
        assert_eq!(right.anchor(d).low, 0.0);
        assert_eq!(right.anchor(d).high, 20.0);
    }

    // Depth 2: the four leaves tile the full interval without gaps.
    let leaves: Vec<_> = [3, 4, 5, 6]
        .iter()
        .map(|&id| policy.select(&space, &tree, id).unwrap())
        .collect();
    for d in 0..4 {
        let mut spans: Vec<(f64, f64)> = leaves
            .iter()
            .map(|r| (r.anchor(d).low, r.anchor(d).high))
            .collect();
        spans.sort_by(|a, b| a.0.total_cmp(&b.0));
        assert_eq!(spans[0].0, -20.0);
        assert_eq!(spans[spans.len() - 1].1, 20.0);
        for pair in spans.windows(2) {
            assert_eq!(
                pair[0].1, pair[1].0,
                "adjacent leaf anchors must share an endpoint"
            );
        }
    }
}

#[test]
fn four_way_split_anchors_third_child_to_upper_middle_quarter() {
    let space = SearchSpace::symmetric(4, -20.0, 20.0).unwrap();
    let tree = star_tree(4);
    let policy = GroupRegionSelection::new(1, 4).unwrap();
    let region = policy.select(&space, &tree, 3).unwrap();
    for d in 0..4 {
        assert!((region.anchor(d).low - 0.0).abs() < 1e-12);
        assert!((region.anchor(d).high - 10.0).abs() < 1e-12);
    }
}

proptest! {
    /// Every node's anchor stays inside the full search-space bounds.
    #[test]
    fn anchors_are_contained_in_their_dimensions(
        k in 1usize..6,
        n_dims in 1usize..6,
        low in -100.0f64..0.0,
        width in 0.1f64..200.0,
    ) {
        let space = SearchSpace::symmetric(n_dims, low, low + width).unwrap();
        let tree = star_tree(k);
        let policy = GroupRegionSelection::new(1, k).unwrap();
        for id in 0..=k {
            let region = policy.select(&space, &tree, id).unwrap();
            for d in 0..n_dims {
                let anchor = region.anchor(d);
                let dim = region.dim(d);
                prop_assert!(anchor.low >= dim.low);
                prop_assert!(anchor.high <= dim.high);
                prop_assert!(anchor.low <= anchor.high);
            }
        }
    }

    /// Sibling anchors partition the parent interval: no gaps, no overlap
    /// beyond shared endpoints, union equal to the parent span.
    #[test]
    fn sibling_anchors_tile_the_parent_interval(
        k in 2usize..8,
        low in -50.0f64..0.0,
        width in 0.5f64..100.0,
    ) {
        let space = SearchSpace::symmetric(3, low, low + width).unwrap();
        let tree = star_tree(k);
        let policy = GroupRegionSelection::new(1, k).unwrap();
        let regions: Vec<_> = (1..=k)
            .map(|id| policy.select(&space, &tree, id).unwrap())
            .collect();
        for d in 0..3 {
            let mut spans: Vec<(f64, f64)> = regions
                .iter()
                .map(|r| (r.anchor(d).low, r.anchor(d).high))
                .collect();
            spans.sort_by(|a, b| a.0.total_cmp(&b.0));
            prop_assert!((spans[0].0 - low).abs() < 1e-9);
            prop_assert!((spans[spans.len() - 1].1 - (low + width)).abs() < 1e-9);
            for pair in spans.windows(2) {
                prop_assert!((pair[0].1 - pair[1].0).abs() < 1e-9);
            }
        }
    }

    /// The identity configuration hands the full space to every node.
    #[test]
    fn identity_partitioning_keeps_the_full_space(
        n_children in 1usize..5,
        n_dims in 1usize..5,
    ) {
        let space = SearchSpace::symmetric(n_dims, -1.0, 1.0).unwrap();
        let tree = star_tree(n_children);
        let policy = GroupRegionSelection::new(1, 1).unwrap();
        for id in 0..=n_children {
            let region = policy.select(&space, &tree, id).unwrap();
            for d in 0..n_dims {
                prop_assert_eq!(region.anchor(d), space.dim(d));
            }
        }
    }
}
