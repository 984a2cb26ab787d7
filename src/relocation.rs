//! Population relocation between iterations.
//!
//! Slots not filled by inbound neighbour data are re-anchored and pulled
//! toward the parent best by a Beta-distributed fraction. The attraction can
//! follow the spent runtime linearly or the stagnation-aware Iterative
//! Partitioning schedule.

use rand::RngCore;
use rand_distr::{Beta, Distribution};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TesoroError};
use crate::iteration::IterationData;
use crate::solution::Solution;
use crate::space::Region;

/// Fitness ratio under which two successive bests count as stagnant.
const STAGNATION_THRESHOLD: f64 = 5e-5;

/// Boost curve shapes available to Iterative Partitioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoostCurve {
    /// `−Br·step + Br`
    Linear,
    /// `Br / (1 + exp(12·Br·step − 6·Br))`
    Sigmoid,
    /// `Br / exp(12·Br·step)`
    Exponential,
}

impl BoostCurve {
    /// Curve value for the given coefficient and step, clamped to 1.
    #[must_use]
    pub fn value(&self, coefficient: f64, step: f64) -> f64 {
        let raw = match self {
            BoostCurve::Linear => -coefficient * step + coefficient,
            BoostCurve::Sigmoid => {
                coefficient / (1.0 + (12.0 * coefficient * step - 6.0 * coefficient).exp())
            }
            BoostCurve::Exponential => coefficient / (12.0 * coefficient * step).exp(),
        };
        raw.min(1.0)
    }
}

/// How the displacement rate is derived each iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Displacement {
    /// Rate equals the share of the run already spent.
    Linear,
    /// Stagnation-aware boost schedule.
    IterativePartitioning {
        /// Boost curve shape
        curve: BoostCurve,
        /// User coefficient `Br`
        coefficient: f64,
        /// Stagnation streaks tolerated before re-seeding the curve
        max_tries: usize,
    },
}

impl Displacement {
    /// The Iterative Partitioning mode with its usual configuration.
    #[must_use]
    pub fn iterative_partitioning() -> Self {
        Displacement::IterativePartitioning {
            curve: BoostCurve::Exponential,
            coefficient: 1.0,
            max_tries: 3,
        }
    }
}

/// Strategy relocating the unfilled population slots once per iteration.
pub trait RelocationStrategy: Send {
    /// Re-anchor `population` inside `region` and move each member toward
    /// the parent best recorded in `data`.
    fn apply(
        &mut self,
        region: &Region,
        population: &mut [Solution],
        data: &IterationData,
        rng: &mut dyn RngCore,
    ) -> Result<()>;
}

/// Beta-distribution relocation.
///
/// Each relocated member is redrawn inside the anchor, then for every
/// dimension moved by `new = pos − q·(pos − parent_best)` with
/// `q ~ Beta(beta_max − b, b)` and
/// `b = beta_start·beta_max·max(δ, 1e-5)^beta_accel`.
#[derive(Debug, Clone)]
pub struct BetaRelocation {
    beta_start: f64,
    beta_max: f64,
    beta_accel: f64,
    displacement: Displacement,

    boost: f64,
    max_boost: f64,
    tries: usize,
    prev_best: f64,
    first_pass: bool,
    displacement_rate: f64,
}

impl Default for BetaRelocation {
    fn default() -> Self {
        Self {
            beta_start: 0.99,
            beta_max: 1.0,
            beta_accel: 1.0,
            displacement: Displacement::Linear,
            boost: -1.0,
            max_boost: 0.0,
            tries: 0,
            prev_best: 0.0,
            first_pass: true,
            displacement_rate: 0.0,
        }
    }
}

impl BetaRelocation {
    /// Create a Beta relocation strategy, validating the parameter ranges.
    pub fn new(beta_start: f64, beta_max: f64, beta_accel: f64) -> Result<Self> {
        if !(beta_start > 0.0 && beta_start <= 1.0) {
            return Err(TesoroError::InvalidParameter {
                name: "beta_start",
                value: beta_start,
            });
        }
        if beta_max < 1.0 {
            return Err(TesoroError::InvalidParameter {
                name: "beta_max",
                value: beta_max,
            });
        }
        if beta_accel < 1.0 {
            return Err(TesoroError::InvalidParameter {
                name: "beta_accel",
                value: beta_accel,
            });
        }
        Ok(Self {
            beta_start,
            beta_max,
            beta_accel,
            ..Self::default()
        })
    }

    /// Switch the displacement mode.
    #[must_use]
    pub fn with_displacement(mut self, displacement: Displacement) -> Self {
        self.displacement = displacement;
        self
    }

    /// The displacement rate computed on the last call.
    #[must_use]
    pub fn displacement_rate(&self) -> f64 {
        self.displacement_rate
    }

    /// Iterative Partitioning boost bookkeeping.
    fn attraction(
        &mut self,
        curve: BoostCurve,
        coefficient: f64,
        max_tries: usize,
        step: f64,
        current: f64,
        previous: f64,
    ) -> f64 {
        let decay = 1.0 / max_tries as f64;
        if self.boost <= 0.0 {
            self.max_boost = curve.value(coefficient, 0.0);
            self.boost = self.max_boost;
        } else if (1.0 - current / previous).abs() < STAGNATION_THRESHOLD {
            let floor = self.max_boost * decay;
            if (self.boost * 1e4) as i64 <= (floor * 1e4) as i64 {
                self.tries += 1;
                if self.tries == max_tries {
                    self.max_boost = curve.value(coefficient, 0.0);
                    self.tries = 0;
                } else {
                    self.max_boost = curve.value(coefficient, step);
                }
                self.boost = self.max_boost;
            } else {
                self.boost -= self.max_boost * decay;
            }
            if self.boost < 1e-30 {
                return self.attraction(curve, coefficient, max_tries, step, current, previous);
            }
        } else {
            self.tries = 0;
        }
        self.boost
    }

    fn displacement_for(&mut self, data: &IterationData) -> f64 {
        match self.displacement {
            Displacement::Linear => data.percentage_runtime(),
            Displacement::IterativePartitioning {
                curve,
                coefficient,
                max_tries,
            } => {
                let best = data.general_best().fitness().first();
                let previous = if self.first_pass {
                    self.first_pass = false;
                    best
                } else {
                    self.prev_best
                };
                let rate = self.attraction(
                    curve,
                    coefficient,
                    max_tries.max(1),
                    data.percentage_runtime(),
                    best,
                    previous,
                );
                self.prev_best = best;
                rate
            }
        }
    }
}

impl RelocationStrategy for BetaRelocation {
    fn apply(
        &mut self,
        region: &Region,
        population: &mut [Solution],
        data: &IterationData,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        if population.is_empty() {
            return Ok(());
        }

        self.displacement_rate = self.displacement_for(data);

        let b = self.beta_start
            * self.beta_max
            * self.displacement_rate.max(1e-5).powf(self.beta_accel);
        // Both shape parameters must stay strictly positive.
        let alpha = (self.beta_max - b).max(f64::EPSILON);
        let shape =
            Beta::new(alpha, b.max(f64::EPSILON)).map_err(|_| TesoroError::InvalidParameter {
                name: "beta_shape",
                value: b,
            })?;

        let parent_best = data.parent_best();
        let n = region.n_dims();
        for member in population.iter_mut() {
            member.reset(region, rng)?;
            for j in 0..n {
                let q = shape.sample(&mut *rng);
                let mut pull = member.position(j).clone();
                pull.sub(parent_best.position(j))?;
                pull.scale(q);
                let dim = *region.dim(j);
                let position = member.position_mut(j);
                position.sub(&pull)?;
                position.clamp_upper(dim.high);
                position.clamp_lower(dim.low);
            }
        }
        Ok(())
    }
}
