//! Classic stochastic hill climbing.
//!
//! Each pass perturbs single dimensions of the population members with a
//! small probability, keeping moves that improve the member. `next` returns
//! after one sweep that improved the best individual, or flags itself stuck
//! after a streak of barren sweeps.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TesoroError};
use crate::search::{Search, SearchContext};
use crate::solution::uniform_in;

/// Hill-Climbing search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HillClimbing {
    /// Probability of perturbing a given dimension (default: 0.05)
    pub move_probability: f64,
    /// Step width as a fraction of a uniform draw over the dimension
    /// (default: 1e-3)
    pub step: f64,
    /// Population size this algorithm prefers (default: 1)
    pub preferred_population: usize,
    /// Barren sweeps tolerated before reporting stuck (default: 5)
    pub no_improve_limit: usize,

    #[serde(skip)]
    evals: usize,
    #[serde(skip)]
    best: usize,
    #[serde(skip)]
    stuck: bool,
}

impl Default for HillClimbing {
    fn default() -> Self {
        Self {
            move_probability: 0.05,
            step: 1e-3,
            preferred_population: 1,
            no_improve_limit: 5,
            evals: 0,
            best: 0,
            stuck: false,
        }
    }
}

impl HillClimbing {
    /// Create a hill climber with explicit move probability, step width and
    /// preferred population size.
    #[must_use]
    pub fn new(move_probability: f64, step: f64, preferred_population: usize) -> Self {
        Self {
            move_probability,
            step,
            preferred_population: preferred_population.max(1),
            ..Self::default()
        }
    }

    /// Set the no-improvement streak tolerated before reporting stuck.
    #[must_use]
    pub fn with_no_improve_limit(mut self, limit: usize) -> Self {
        self.no_improve_limit = limit.max(1);
        self
    }
}

impl Search for HillClimbing {
    fn name(&self) -> &'static str {
        "HillClimbing"
    }

    fn preferred_population_size(&self) -> usize {
        self.preferred_population
    }

    fn startup(&mut self, ctx: &mut SearchContext<'_>) -> Result<()> {
        if ctx.population.is_empty() {
            return Err(TesoroError::Config {
                reason: "the population size must be greater than zero".to_string(),
            });
        }
        self.evals = 0;
        self.stuck = false;
        self.best = 0;
        for i in 1..ctx.population.len() {
            if ctx
                .fitness
                .better(&ctx.population[i], &ctx.population[self.best])
            {
                self.best = i;
            }
        }
        Ok(())
    }

    fn next(&mut self, ctx: &mut SearchContext<'_>, m: usize) -> Result<()> {
        let p = ctx.population.len();
        let n = ctx.space.n_dims();
        let mut candidate = ctx.population[0].clone();
        let mut no_improve = 0;
        let mut found = false;

        while !found && no_improve < self.no_improve_limit && self.evals < m {
            for i in 0..p {
                if self.evals >= m {
                    break;
                }
                for d in 0..n {
                    if self.evals >= m {
                        break;
                    }
                    if uniform_in(ctx.rng, 0.0, 1.0) > self.move_probability {
                        continue;
                    }
                    candidate.assign_from(&ctx.population[i])?;
                    let dim = ctx.space.dim(d);
                    let nudge = self.step * uniform_in(ctx.rng, dim.low, dim.high);
                    candidate.position_mut(d).add_scalar(nudge);
                    candidate.position_mut(d).clamp_upper(dim.high);
                    candidate.position_mut(d).clamp_lower(dim.low);
                    ctx.fitness.apply(&mut candidate);
                    self.evals += 1;
                    if ctx.fitness.better(&candidate, &ctx.population[i]) {
                        ctx.population[i].assign_from(&candidate)?;
                        if i != self.best
                            && ctx
                                .fitness
                                .better(&ctx.population[i], &ctx.population[self.best])
                        {
                            found = true;
                            self.best = i;
                        }
                    }
                }
            }
            if !found {
                no_improve += 1;
            }
        }
        if no_improve == self.no_improve_limit {
            self.stuck = true;
        }
        Ok(())
    }

    fn finalize(&mut self, _ctx: &mut SearchContext<'_>) {}

    fn is_stuck(&self) -> bool {
        self.stuck
    }

    fn evals(&self) -> usize {
        self.evals
    }

    fn best_index(&self) -> usize {
        self.best
    }
}
