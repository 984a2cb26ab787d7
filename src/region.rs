//! Anchor-region assignment from tree position.
//!
//! Each node receives an "anchor" sub-region of the search space derived from
//! where it sits in the tree. The node biases its exploration toward the
//! anchor but is not confined to it.

use crate::error::{Result, TesoroError};
use crate::iteration::IterationData;
use crate::space::{Region, SearchSpace, Span};
use crate::tree::Topology;

/// Policy mapping a node's tree coordinate to its anchor sub-region.
pub trait RegionSelection: Send {
    /// Partition the search space along the tree and pick the anchor region
    /// for node `id`. Deterministic: same `(tree, id)` yields the same region.
    fn select(&self, space: &SearchSpace, tree: &Topology, id: usize) -> Result<Region>;

    /// Hook to recompute the anchor each iteration. The default keeps the
    /// current region unchanged.
    fn recalculate(
        &self,
        _iteration: &IterationData,
        _space: &SearchSpace,
        current: Region,
        _tree: &Topology,
        _id: usize,
    ) -> Region {
        current
    }
}

/// Anchor selection by grouped-dimension partitioning.
///
/// Dimensions are divided into `groups` groups and every group is cut into
/// `segments` equal slices. Walking from the root to the node, the node's
/// position among its siblings is decomposed in base `segments` across the
/// groups, and each group's dimensions are narrowed to the addressed slice of
/// the parent's partition. `(1, 1)` leaves every node with the full space.
#[derive(Debug, Clone, Copy)]
pub struct GroupRegionSelection {
    groups: usize,
    segments: usize,
}

impl GroupRegionSelection {
    /// Create the policy. Both counts must be at least 1.
    pub fn new(groups: usize, segments: usize) -> Result<Self> {
        if groups == 0 {
            return Err(TesoroError::InvalidParameter {
                name: "groups",
                value: groups as f64,
            });
        }
        if segments == 0 {
            return Err(TesoroError::InvalidParameter {
                name: "segments",
                value: segments as f64,
            });
        }
        Ok(Self { groups, segments })
    }

    /// Narrow `region` to the slice addressed by `child_pos`.
    fn slice(&self, region: &Region, child_pos: usize) -> Result<Region> {
        let k = self.segments;
        // Decompose the sibling position in base `segments`, one digit per group.
        let mut coord = vec![0usize; self.groups];
        let mut pos = child_pos;
        for g in (0..self.groups).rev() {
            let base = k.pow(g as u32);
            if base <= pos {
                coord[g] = pos / base;
                pos %= base;
            }
        }

        let n_dims = region.n_dims();
        let dim_per_group = (n_dims / self.groups).max(1);
        let mut anchors = Vec::with_capacity(n_dims);
        for d in 0..n_dims {
            let g = (d / dim_per_group).min(self.groups - 1);
            let part = region.anchor(d);
            let delta = part.width() / k as f64;
            let minimum = part.low + coord[g] as f64 * delta;
            let maximum = if coord[g] < k - 1 {
                (minimum + delta).min(part.high)
            } else {
                part.high
            };
            anchors.push(Span::new(minimum, maximum)?);
        }
        Region::new(region.dims().to_vec(), anchors)
    }
}

impl RegionSelection for GroupRegionSelection {
    fn select(&self, space: &SearchSpace, tree: &Topology, id: usize) -> Result<Region> {
        if !tree.contains(id) {
            return Err(TesoroError::UnknownNode { id });
        }
        let root = tree.root().ok_or_else(|| TesoroError::Config {
            reason: "the topology has no root".to_string(),
        })?;

        // Path from the root down to the node, root excluded.
        let mut path = Vec::new();
        let mut cursor = id;
        while cursor != root {
            path.push(cursor);
            cursor = tree
                .parent_of(cursor)?
                .ok_or(TesoroError::UnknownNode { id: cursor })?;
        }
        path.reverse();

        let mut region = space.full_region();
        for step in path {
            let child_pos = tree.child_position(step)?;
            region = self.slice(&region, child_pos)?;
        }
        Ok(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn star_tree(n_children: usize) -> Topology {
        let mut tree = Topology::new();
        tree.add_root(0).unwrap();
        for i in 1..=n_children {
            tree.add_child(i, 0).unwrap();
        }
        tree.lock().unwrap();
        tree
    }

    #[test]
    fn test_identity_configuration_keeps_full_space() {
        let space = SearchSpace::symmetric(3, -5.0, 5.0).unwrap();
        let tree = star_tree(4);
        let policy = GroupRegionSelection::new(1, 1).unwrap();
        for id in 0..=4 {
            let region = policy.select(&space, &tree, id).unwrap();
            for d in 0..3 {
                assert_eq!(region.anchor(d), space.dim(d));
            }
        }
    }

    #[test]
    fn test_four_way_split_of_symmetric_space() {
        // SearchSpace [-20, 20]^4, one group, four segments: the child at
        // sibling position 2 anchors every dimension to [0, 10].
        let space = SearchSpace::symmetric(4, -20.0, 20.0).unwrap();
        let tree = star_tree(4);
        let policy = GroupRegionSelection::new(1, 4).unwrap();
        let region = policy.select(&space, &tree, 3).unwrap();
        for d in 0..4 {
            let a = region.anchor(d);
            assert!((a.low - 0.0).abs() < 1e-12);
            assert!((a.high - 10.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_root_keeps_full_space() {
        let space = SearchSpace::symmetric(4, -20.0, 20.0).unwrap();
        let tree = star_tree(4);
        let policy = GroupRegionSelection::new(1, 4).unwrap();
        let region = policy.select(&space, &tree, 0).unwrap();
        for d in 0..4 {
            assert_eq!(region.anchor(d), space.dim(d));
        }
    }

    #[test]
    fn test_nested_levels_narrow_recursively() {
        // Two levels deep with K=2: grandchild slices its parent's half again.
        let mut tree = Topology::new();
        tree.add_root(0).unwrap();
        tree.add_child(1, 0).unwrap();
        tree.add_child(2, 0).unwrap();
        tree.add_child(3, 2).unwrap();
        tree.add_child(4, 2).unwrap();
        tree.lock().unwrap();

        let space = SearchSpace::symmetric(2, 0.0, 8.0).unwrap();
        let policy = GroupRegionSelection::new(1, 2).unwrap();

        let child = policy.select(&space, &tree, 2).unwrap();
        assert_eq!(*child.anchor(0), Span::new(4.0, 8.0).unwrap());

        let grandchild = policy.select(&space, &tree, 4).unwrap();
        assert_eq!(*grandchild.anchor(0), Span::new(6.0, 8.0).unwrap());
    }

    #[test]
    fn test_two_groups_address_dimensions_independently() {
        // 4 dimensions, 2 groups of 2, K=2: sibling position 3 = (1, 1) in
        // base 2, so both groups take their upper halves.
        let space = SearchSpace::symmetric(4, 0.0, 1.0).unwrap();
        let tree = star_tree(4);
        let policy = GroupRegionSelection::new(2, 2).unwrap();
        let region = policy.select(&space, &tree, 4).unwrap();
        for d in 0..4 {
            assert_eq!(*region.anchor(d), Span::new(0.5, 1.0).unwrap());
        }

        // Sibling position 1 = (1, 0): group 0 upper half, group 1 lower half.
        let region = policy.select(&space, &tree, 2).unwrap();
        assert_eq!(*region.anchor(0), Span::new(0.5, 1.0).unwrap());
        assert_eq!(*region.anchor(1), Span::new(0.5, 1.0).unwrap());
        assert_eq!(*region.anchor(2), Span::new(0.0, 0.5).unwrap());
        assert_eq!(*region.anchor(3), Span::new(0.0, 0.5).unwrap());
    }

    #[test]
    fn test_unknown_node_is_rejected() {
        let space = SearchSpace::symmetric(2, 0.0, 1.0).unwrap();
        let tree = star_tree(2);
        let policy = GroupRegionSelection::new(1, 2).unwrap();
        assert!(policy.select(&space, &tree, 17).is_err());
    }
}
