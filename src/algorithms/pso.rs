//! Classic Particle Swarm Optimization.
//!
//! Velocity update per particle and dimension:
//!
//! ```text
//! v = w·v + c₁·r₁·(pbest − x) + c₂·r₂·(gbest − x)
//! x = x + v
//! ```
//!
//! with the inertia `w` decaying linearly over the evaluation budget.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TesoroError};
use crate::search::{Search, SearchContext};
use crate::solution::{uniform_in, Position, Solution};

/// Particle Swarm search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticleSwarm {
    /// Inertia weight w (default: 0.729)
    pub inertia: f64,
    /// Cognitive coefficient c₁ (default: 1.49445)
    pub cognitive: f64,
    /// Social coefficient c₂ (default: 1.49445)
    pub social: f64,
    /// Population size this algorithm prefers (default: 12)
    pub preferred_population: usize,
    /// Barren passes tolerated before reporting stuck (default: 5)
    pub no_improve_limit: usize,

    #[serde(skip)]
    personal_best: Vec<Solution>,
    #[serde(skip)]
    velocities: Vec<Vec<Position>>,
    #[serde(skip)]
    evals: usize,
    #[serde(skip)]
    best: usize,
    #[serde(skip)]
    stuck: bool,
}

impl Default for ParticleSwarm {
    fn default() -> Self {
        Self {
            inertia: 0.729,
            cognitive: 1.494_45,
            social: 1.494_45,
            preferred_population: 12,
            no_improve_limit: 5,
            personal_best: Vec::new(),
            velocities: Vec::new(),
            evals: 0,
            best: 0,
            stuck: false,
        }
    }
}

impl ParticleSwarm {
    /// Create a swarm with explicit coefficients and preferred size.
    #[must_use]
    pub fn new(inertia: f64, cognitive: f64, social: f64, preferred_population: usize) -> Self {
        Self {
            inertia,
            cognitive,
            social,
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

impl Search for ParticleSwarm {
    fn name(&self) -> &'static str {
        "PSO"
    }

    fn preferred_population_size(&self) -> usize {
        self.preferred_population
    }

    fn startup(&mut self, ctx: &mut SearchContext<'_>) -> Result<()> {
        let p = ctx.population.len();
        if p == 0 {
            return Err(TesoroError::Config {
                reason: "the population size must be greater than zero".to_string(),
            });
        }
        let n = ctx.space.n_dims();
        let width = ctx.population[0].position(0).width();
        self.evals = 0;
        self.best = 0;
        self.stuck = false;

        if self.personal_best.len() != p {
            self.personal_best = ctx.population.to_vec();
            self.velocities = vec![vec![Position::new(width); n]; p];
        }
        for i in 0..p {
            for v in &mut self.velocities[i] {
                v.fill(uniform_in(ctx.rng, 0.0, 1.0));
            }
            self.personal_best[i].assign_from(&ctx.population[i])?;
            if i != self.best
                && ctx
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
        let decay = self.inertia / m as f64;
        let mut current_inertia = self.inertia - decay * self.evals as f64;
        let mut no_improve = 0;
        let mut found = false;

        while !found && self.evals < m && no_improve < self.no_improve_limit {
            for i in 0..p {
                for j in 0..n {
                    let dim = ctx.space.dim(j);

                    // c₁·r₁·(pbest − x)
                    let mut pull = self.personal_best[i].position(j).clone();
                    pull.sub(ctx.population[i].position(j))?;
                    pull.scale(self.cognitive * uniform_in(ctx.rng, 0.0, 1.0));

                    // c₂·r₂·(gbest − x)
                    let mut drift = ctx.population[self.best].position(j).clone();
                    drift.sub(ctx.population[i].position(j))?;
                    drift.scale(self.social * uniform_in(ctx.rng, 0.0, 1.0));
                    drift.add(&pull)?;

                    let velocity = &mut self.velocities[i][j];
                    velocity.scale(current_inertia);
                    velocity.add(&drift)?;

                    let position = ctx.population[i].position_mut(j);
                    position.add(velocity)?;
                    position.clamp_upper(dim.high);
                    position.clamp_lower(dim.low);
                }
                ctx.fitness.apply(&mut ctx.population[i]);
                self.evals += 1;
            }
            for i in 0..p {
                if ctx.fitness.better(&ctx.population[i], &self.personal_best[i]) {
                    self.personal_best[i].assign_from(&ctx.population[i])?;
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
            if !found {
                no_improve += 1;
            }
            current_inertia -= decay;
        }
        if no_improve == self.no_improve_limit {
            self.stuck = true;
        }
        Ok(())
    }

    fn finalize(&mut self, ctx: &mut SearchContext<'_>) {
        // Hand the personal bests back as the outgoing population.
        for (member, best) in ctx.population.iter_mut().zip(self.personal_best.iter()) {
            member.clone_from(best);
        }
    }

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::Sphere;
    use crate::search::FitnessPolicy;
    use crate::space::SearchSpace;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn prepared_population(n: usize, count: usize, space: &SearchSpace, seed: u64) -> Vec<Solution> {
        let region = space.full_region();
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                let mut s = Solution::new(n);
                s.reset(&region, &mut rng).unwrap();
                Sphere.apply(&mut s);
                s
            })
            .collect()
    }

    #[test]
    fn test_swarm_reduces_sphere_fitness() {
        let space = SearchSpace::symmetric(5, -5.0, 5.0).unwrap();
        let mut population = prepared_population(5, 10, &space, 42);
        let mut rng = StdRng::seed_from_u64(7);
        let mut pso = ParticleSwarm::new(0.9, 0.7, 0.7, 10);
        let mut ctx = SearchContext {
            population: &mut population,
            fitness: &Sphere,
            space: &space,
            rng: &mut rng,
        };
        pso.startup(&mut ctx).unwrap();
        let before = ctx.population[pso.best_index()].fitness().first();
        for _ in 0..50 {
            pso.next(&mut ctx, 5000).unwrap();
            if pso.is_stuck() {
                break;
            }
        }
        pso.finalize(&mut ctx);
        let after = ctx.population[pso.best_index()].fitness().first();
        assert!(after <= before, "fitness degraded from {before} to {after}");
    }

    #[test]
    fn test_positions_stay_inside_bounds() {
        let space = SearchSpace::symmetric(3, -2.0, 2.0).unwrap();
        let mut population = prepared_population(3, 6, &space, 11);
        let mut rng = StdRng::seed_from_u64(13);
        let mut pso = ParticleSwarm::new(0.9, 1.5, 1.5, 6);
        let mut ctx = SearchContext {
            population: &mut population,
            fitness: &Sphere,
            space: &space,
            rng: &mut rng,
        };
        pso.startup(&mut ctx).unwrap();
        for _ in 0..10 {
            pso.next(&mut ctx, 2000).unwrap();
        }
        for member in ctx.population.iter() {
            for j in 0..3 {
                let v = member.position(j).first();
                assert!((-2.0..=2.0).contains(&v), "position {v} escaped bounds");
            }
        }
    }

    #[test]
    fn test_evals_reset_on_startup() {
        let space = SearchSpace::symmetric(2, -1.0, 1.0).unwrap();
        let mut population = prepared_population(2, 4, &space, 3);
        let mut rng = StdRng::seed_from_u64(4);
        let mut pso = ParticleSwarm::default();
        let mut ctx = SearchContext {
            population: &mut population,
            fitness: &Sphere,
            space: &space,
            rng: &mut rng,
        };
        pso.startup(&mut ctx).unwrap();
        pso.next(&mut ctx, 100).unwrap();
        assert!(pso.evals() > 0);
        pso.startup(&mut ctx).unwrap();
        assert_eq!(pso.evals(), 0);
    }
}
