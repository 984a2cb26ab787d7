//! Candidate solutions.
//!
//! A [`Solution`] is one population individual: an ordered list of
//! [`Position`]s (one per dimension), its [`Fitness`] and the constraints it
//! has violated. Widths of the three tuples are per-run constants described
//! by a [`SolutionShape`].

mod position;

pub use position::{Fitness, Position, Violation};

use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TesoroError};
use crate::space::Region;

/// Tuple widths shared by every solution of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionShape {
    /// Values per position (per dimension)
    pub position_width: usize,
    /// Values per fitness
    pub fitness_width: usize,
    /// Values per violation record
    pub violation_width: usize,
}

impl Default for SolutionShape {
    fn default() -> Self {
        Self {
            position_width: 1,
            fitness_width: 1,
            violation_width: 1,
        }
    }
}

/// One population individual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    positions: Vec<Position>,
    fitness: Fitness,
    violation: Violation,
}

impl Solution {
    /// Create an `n`-dimensional solution with scalar tuples.
    #[must_use]
    pub fn new(n_dims: usize) -> Self {
        Self::with_shape(n_dims, SolutionShape::default())
    }

    /// Create an `n`-dimensional solution with the given tuple widths.
    #[must_use]
    pub fn with_shape(n_dims: usize, shape: SolutionShape) -> Self {
        let n = n_dims.max(1);
        Self {
            positions: (0..n).map(|_| Position::new(shape.position_width)).collect(),
            fitness: Fitness::new(shape.fitness_width),
            violation: Violation::new(shape.violation_width),
        }
    }

    /// Number of dimensions.
    #[must_use]
    pub fn n_dims(&self) -> usize {
        self.positions.len()
    }

    /// The tuple widths of this solution.
    #[must_use]
    pub fn shape(&self) -> SolutionShape {
        SolutionShape {
            position_width: self.positions[0].width(),
            fitness_width: self.fitness.width(),
            violation_width: self.violation.width(),
        }
    }

    /// Position of dimension `i`.
    #[must_use]
    pub fn position(&self, i: usize) -> &Position {
        &self.positions[i]
    }

    /// Mutable position of dimension `i`.
    pub fn position_mut(&mut self, i: usize) -> &mut Position {
        &mut self.positions[i]
    }

    /// The fitness record.
    #[must_use]
    pub fn fitness(&self) -> &Fitness {
        &self.fitness
    }

    /// Mutable fitness record.
    pub fn fitness_mut(&mut self) -> &mut Fitness {
        &mut self.fitness
    }

    /// The violation record.
    #[must_use]
    pub fn violation(&self) -> &Violation {
        &self.violation
    }

    /// Mutable violation record.
    pub fn violation_mut(&mut self) -> &mut Violation {
        &mut self.violation
    }

    /// Overwrite positions, fitness and violation from a peer of matching
    /// dimensionality and shape.
    pub fn assign_from(&mut self, other: &Solution) -> Result<()> {
        if self.positions.len() != other.positions.len() {
            return Err(TesoroError::ShapeMismatch {
                expected: self.positions.len(),
                got: other.positions.len(),
            });
        }
        for (mine, theirs) in self.positions.iter_mut().zip(other.positions.iter()) {
            mine.assign(theirs)?;
        }
        self.fitness.assign_slice(other.fitness.values())?;
        self.violation.assign_slice(other.violation.values())?;
        Ok(())
    }

    /// Flatten all positions into a contiguous buffer of
    /// `n_dims * position_width` values, dimension-major.
    #[must_use]
    pub fn flat_positions(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.positions.len() * self.positions[0].width());
        for p in &self.positions {
            out.extend_from_slice(p.values());
        }
        out
    }

    /// Overwrite all positions from a flat dimension-major buffer.
    pub fn load_flat_positions(&mut self, buffer: &[f64]) -> Result<()> {
        let width = self.positions[0].width();
        let expected = self.positions.len() * width;
        if buffer.len() != expected {
            return Err(TesoroError::ShapeMismatch {
                expected,
                got: buffer.len(),
            });
        }
        for (i, p) in self.positions.iter_mut().enumerate() {
            p.assign_slice(&buffer[i * width..(i + 1) * width])?;
        }
        Ok(())
    }

    /// Redraw this solution uniformly inside the anchor partition of `region`.
    pub fn reset(&mut self, region: &Region, rng: &mut dyn RngCore) -> Result<()> {
        self.check_region(region)?;
        for (i, position) in self.positions.iter_mut().enumerate() {
            let anchor = region.anchor(i);
            let value = uniform_in(rng, anchor.low, anchor.high);
            position.fill(value);
            position.clamp_upper(anchor.high);
            position.clamp_lower(anchor.low);
        }
        Ok(())
    }

    /// Redraw this solution around a bias solution.
    ///
    /// Per dimension, with probability one half the position is drawn from a
    /// Gaussian centred slightly around the bias's internal value range, and
    /// otherwise copied verbatim from the bias. Bounds are re-clamped to the
    /// anchor partition afterwards.
    pub fn reset_with_bias(
        &mut self,
        region: &Region,
        bias: &Solution,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        self.check_region(region)?;
        if bias.n_dims() != self.n_dims() {
            return Err(TesoroError::ShapeMismatch {
                expected: self.n_dims(),
                got: bias.n_dims(),
            });
        }
        for (i, position) in self.positions.iter_mut().enumerate() {
            let anchor = region.anchor(i);
            let source = bias.position(i);
            if uniform_in(rng, 0.0, 1.0) < 0.5 {
                let value = gaussian_in(rng, source.lower() * 0.99, source.upper() * 1.01);
                position.fill(value);
            } else {
                position.assign(source)?;
            }
            position.clamp_upper(anchor.high);
            position.clamp_lower(anchor.low);
        }
        Ok(())
    }

    fn check_region(&self, region: &Region) -> Result<()> {
        if region.n_dims() != self.positions.len() {
            return Err(TesoroError::ShapeMismatch {
                expected: self.positions.len(),
                got: region.n_dims(),
            });
        }
        Ok(())
    }
}

/// Uniform draw over `[low, high]`, degenerate intervals included.
pub(crate) fn uniform_in(rng: &mut dyn RngCore, low: f64, high: f64) -> f64 {
    use rand::Rng;
    if low == high {
        low
    } else {
        rng.random_range(low..=high)
    }
}

/// Gaussian draw mapped onto `[low, high]`: `N(0.5, 1)` clamped to
/// `[0, 1.1]` scales the interval, so values concentrate near the middle but
/// may slightly overshoot the upper end.
fn gaussian_in(rng: &mut dyn RngCore, low: f64, high: f64) -> f64 {
    if low == high {
        return low;
    }
    let z: f64 = StandardNormal.sample(&mut *rng);
    let q = (0.5 + z).clamp(0.0, 1.1);
    low + q * (high - low)
}
