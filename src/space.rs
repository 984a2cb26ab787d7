//! Search-space geometry: bounded intervals, regions and anchors.
//!
//! A [`Region`] pairs every dimension of the search space with an "anchor"
//! partition, the sub-interval a node biases its exploration toward. A
//! [`SearchSpace`] is simply a region whose anchors span the full dimensions.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TesoroError};

/// A closed interval `[low, high]` along one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Lower bound (inclusive)
    pub low: f64,
    /// Upper bound (inclusive)
    pub high: f64,
}

impl Span {
    /// Create a span, validating the ordering of its bounds.
    pub fn new(low: f64, high: f64) -> Result<Self> {
        if !(low <= high) {
            return Err(TesoroError::InvalidParameter {
                name: "span",
                value: low,
            });
        }
        Ok(Self { low, high })
    }

    /// Interval length.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    /// Whether `value` lies inside the interval (bounds included).
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }

    /// Whether `other` is fully contained in this interval.
    #[must_use]
    pub fn covers(&self, other: &Span) -> bool {
        other.low >= self.low && other.high <= self.high
    }
}

/// A region of the search space: the full dimensions plus one anchor
/// partition per dimension.
///
/// Invariants: one anchor per dimension, each anchor contained in its
/// dimension, sequential index identifies the dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    dims: Vec<Span>,
    anchors: Vec<Span>,
}

impl Region {
    /// Build a region from explicit dimensions and anchors.
    pub fn new(dims: Vec<Span>, anchors: Vec<Span>) -> Result<Self> {
        if dims.is_empty() {
            return Err(TesoroError::Config {
                reason: "a region needs at least one dimension".to_string(),
            });
        }
        if dims.len() != anchors.len() {
            return Err(TesoroError::ShapeMismatch {
                expected: dims.len(),
                got: anchors.len(),
            });
        }
        for (dim, anchor) in dims.iter().zip(anchors.iter()) {
            if !dim.covers(anchor) {
                return Err(TesoroError::Config {
                    reason: format!(
                        "anchor [{}, {}] escapes dimension [{}, {}]",
                        anchor.low, anchor.high, dim.low, dim.high
                    ),
                });
            }
        }
        Ok(Self { dims, anchors })
    }

    /// Number of dimensions.
    #[must_use]
    pub fn n_dims(&self) -> usize {
        self.dims.len()
    }

    /// Full dimension `i`.
    #[must_use]
    pub fn dim(&self, i: usize) -> &Span {
        &self.dims[i]
    }

    /// Anchor partition for dimension `i`.
    #[must_use]
    pub fn anchor(&self, i: usize) -> &Span {
        &self.anchors[i]
    }

    /// All dimensions in sequential order.
    #[must_use]
    pub fn dims(&self) -> &[Span] {
        &self.dims
    }

    /// All anchors in sequential order.
    #[must_use]
    pub fn anchors(&self) -> &[Span] {
        &self.anchors
    }

    /// Replace the anchor of dimension `i`, keeping the containment invariant.
    pub fn set_anchor(&mut self, i: usize, anchor: Span) -> Result<()> {
        if i >= self.dims.len() {
            return Err(TesoroError::InvalidIndex {
                index: i,
                len: self.dims.len(),
            });
        }
        if !self.dims[i].covers(&anchor) {
            return Err(TesoroError::Config {
                reason: format!(
                    "anchor [{}, {}] escapes dimension [{}, {}]",
                    anchor.low, anchor.high, self.dims[i].low, self.dims[i].high
                ),
            });
        }
        self.anchors[i] = anchor;
        Ok(())
    }
}

/// The full bounded search space.
///
/// Structurally a [`Region`] whose anchors equal their dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpace {
    region: Region,
}

impl SearchSpace {
    /// Create a search space from dimension bounds.
    pub fn new(dims: Vec<Span>) -> Result<Self> {
        let anchors = dims.clone();
        Ok(Self {
            region: Region::new(dims, anchors)?,
        })
    }

    /// Create an `n`-dimensional space with identical bounds per dimension.
    pub fn symmetric(n: usize, low: f64, high: f64) -> Result<Self> {
        let span = Span::new(low, high)?;
        Self::new(vec![span; n])
    }

    /// Number of dimensions.
    #[must_use]
    pub fn n_dims(&self) -> usize {
        self.region.n_dims()
    }

    /// Dimension `i`.
    #[must_use]
    pub fn dim(&self, i: usize) -> &Span {
        self.region.dim(i)
    }

    /// A region covering the whole space (anchor equals dimension everywhere).
    #[must_use]
    pub fn full_region(&self) -> Region {
        self.region.clone()
    }

    /// The underlying region view.
    #[must_use]
    pub fn as_region(&self) -> &Region {
        &self.region
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_rejects_inverted_bounds() {
        assert!(Span::new(1.0, -1.0).is_err());
        assert!(Span::new(-1.0, 1.0).is_ok());
    }

    #[test]
    fn test_span_contains_and_covers() {
        let outer = Span::new(-20.0, 20.0).unwrap();
        let inner = Span::new(0.0, 10.0).unwrap();
        assert!(outer.contains(0.0));
        assert!(outer.contains(-20.0));
        assert!(!outer.contains(20.5));
        assert!(outer.covers(&inner));
        assert!(!inner.covers(&outer));
    }

    #[test]
    fn test_region_anchor_must_fit_dimension() {
        let dims = vec![Span::new(-1.0, 1.0).unwrap()];
        let bad = vec![Span::new(-2.0, 0.0).unwrap()];
        assert!(Region::new(dims.clone(), bad).is_err());
        let good = vec![Span::new(-0.5, 0.5).unwrap()];
        assert!(Region::new(dims, good).is_ok());
    }

    #[test]
    fn test_region_dimension_anchor_count_must_match() {
        let dims = vec![Span::new(0.0, 1.0).unwrap(); 3];
        let anchors = vec![Span::new(0.0, 1.0).unwrap(); 2];
        assert!(matches!(
            Region::new(dims, anchors),
            Err(TesoroError::ShapeMismatch { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn test_search_space_full_region_has_anchor_equal_dim() {
        let space = SearchSpace::symmetric(4, -20.0, 20.0).unwrap();
        let region = space.full_region();
        for i in 0..4 {
            assert_eq!(region.dim(i), region.anchor(i));
        }
    }

    #[test]
    fn test_set_anchor_enforces_containment() {
        let space = SearchSpace::symmetric(2, 0.0, 10.0).unwrap();
        let mut region = space.full_region();
        assert!(region.set_anchor(0, Span::new(2.0, 4.0).unwrap()).is_ok());
        assert!(region.set_anchor(1, Span::new(-1.0, 4.0).unwrap()).is_err());
        assert!(region.set_anchor(5, Span::new(2.0, 4.0).unwrap()).is_err());
    }
}
