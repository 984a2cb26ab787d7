//! External collaborator contracts: fitness policies and search algorithms.
//!
//! The engine never optimizes anything by itself. It drives a pluggable
//! [`Search`] through a convergence controller and evaluates candidates via a
//! [`FitnessPolicy`]. Both are capability interfaces an application
//! implements for its own problem.

use rand::RngCore;

use crate::error::{Result, TesoroError};
use crate::solution::{Fitness, Solution};
use crate::space::SearchSpace;
use crate::tree::Topology;

/// The objective being optimized.
pub trait FitnessPolicy: Send {
    /// Evaluate `solution` and store the result in its fitness record.
    fn apply(&self, solution: &mut Solution);

    /// Whether `first` is strictly better than `second`.
    fn first_is_better(&self, first: &Fitness, second: &Fitness) -> bool;

    /// Solution-level comparison, delegating to the fitness records.
    fn better(&self, first: &Solution, second: &Solution) -> bool {
        self.first_is_better(first.fitness(), second.fitness())
    }

    /// Overwrite `fitness` with the worst representable value.
    fn set_worst(&self, fitness: &mut Fitness);

    /// Overwrite `fitness` with the best representable value.
    fn set_best(&self, fitness: &mut Fitness);

    /// Lower estimate of the achievable fitness, used by convergence control.
    fn min_estimated(&self) -> f64;
}

/// Everything a search algorithm borrows for one optimization pass: the
/// population it works on, the objective, the full search space and the
/// node's random source.
pub struct SearchContext<'a> {
    /// Population to optimize in place
    pub population: &'a mut [Solution],
    /// Objective function
    pub fitness: &'a dyn FitnessPolicy,
    /// Full search space bounds
    pub space: &'a SearchSpace,
    /// Random source of the owning node
    pub rng: &'a mut dyn RngCore,
}

impl<'a> SearchContext<'a> {
    /// Fitness of the individual at `index`.
    #[must_use]
    pub fn fitness_of(&self, index: usize) -> &Fitness {
        self.population[index].fitness()
    }
}

/// A pluggable population-based optimization algorithm.
///
/// The engine calls `startup` once per iteration, then `next` repeatedly
/// under convergence control, then `finalize`. `next` must spend at most `m`
/// fitness evaluations and return as soon as it finds one strict improvement
/// of the best individual (or gives up after its internal no-improvement
/// streak, flagging [`is_stuck`](Search::is_stuck)).
pub trait Search: Send {
    /// Human-readable algorithm name, for tracking.
    fn name(&self) -> &'static str;

    /// The population size this algorithm would like to work with.
    fn preferred_population_size(&self) -> usize;

    /// Prepare for a fresh optimization over the context's population.
    fn startup(&mut self, ctx: &mut SearchContext<'_>) -> Result<()>;

    /// Optimize until the next improvement, spending at most `m` evaluations
    /// in total since `startup`.
    fn next(&mut self, ctx: &mut SearchContext<'_>, m: usize) -> Result<()>;

    /// Post-processing once the convergence controller is done.
    fn finalize(&mut self, ctx: &mut SearchContext<'_>);

    /// Whether the algorithm detected a strong stagnation.
    fn is_stuck(&self) -> bool;

    /// Fitness evaluations spent since the last `startup`.
    fn evals(&self) -> usize;

    /// Index of the best individual in the context's population.
    fn best_index(&self) -> usize;
}

/// A registered search algorithm together with its scoring state.
pub struct SearchScore {
    search: Box<dyn Search>,
    weight: f64,
    score: f64,
    frequency: f64,
    deprecation: f64,
}

impl SearchScore {
    /// Wrap a search algorithm with the given selection weight.
    #[must_use]
    pub fn new(search: Box<dyn Search>, weight: f64) -> Self {
        Self {
            search,
            weight,
            score: 1.0,
            frequency: 1.0,
            deprecation: 1.0,
        }
    }

    /// The wrapped algorithm.
    #[must_use]
    pub fn search(&self) -> &dyn Search {
        self.search.as_ref()
    }

    /// Mutable access to the wrapped algorithm.
    pub fn search_mut(&mut self) -> &mut dyn Search {
        self.search.as_mut()
    }

    /// Selection weight.
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Current score.
    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Overwrite the score.
    pub fn set_score(&mut self, score: f64) {
        self.score = score;
    }

    /// Selection frequency.
    #[must_use]
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Overwrite the selection frequency.
    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency;
    }

    /// Deprecation factor.
    #[must_use]
    pub fn deprecation(&self) -> f64 {
        self.deprecation
    }

    /// Overwrite the deprecation factor.
    pub fn set_deprecation(&mut self, deprecation: f64) {
        self.deprecation = deprecation;
    }
}

/// Chooses which registered algorithm runs next and ranks it afterwards.
pub trait AlgorithmSelection: Send {
    /// Pick the index of the next algorithm to run.
    fn apply(
        &mut self,
        node_id: usize,
        tree: &Topology,
        algorithms: &[SearchScore],
    ) -> Result<usize>;

    /// Score the algorithm that just ran.
    #[allow(clippy::too_many_arguments)]
    fn rank(
        &mut self,
        node_id: usize,
        tree: &Topology,
        algorithms: &mut [SearchScore],
        executed: usize,
        obtained: &Fitness,
        current_evals: usize,
        total_evals: u64,
    ) -> Result<()>;
}

/// Cycles through the registered algorithms in order.
#[derive(Debug, Default)]
pub struct RoundRobinSelection {
    cursor: Option<usize>,
}

impl AlgorithmSelection for RoundRobinSelection {
    fn apply(
        &mut self,
        _node_id: usize,
        _tree: &Topology,
        algorithms: &[SearchScore],
    ) -> Result<usize> {
        if algorithms.is_empty() {
            return Err(TesoroError::Config {
                reason: "the list of search algorithms is empty".to_string(),
            });
        }
        let next = match self.cursor {
            Some(prev) => (prev + 1) % algorithms.len(),
            None => 0,
        };
        self.cursor = Some(next);
        Ok(next)
    }

    fn rank(
        &mut self,
        _node_id: usize,
        _tree: &Topology,
        algorithms: &mut [SearchScore],
        executed: usize,
        _obtained: &Fitness,
        _current_evals: usize,
        _total_evals: u64,
    ) -> Result<()> {
        if algorithms.is_empty() {
            return Err(TesoroError::Config {
                reason: "the list of search algorithms is empty".to_string(),
            });
        }
        algorithms[executed].set_score(1.0);
        Ok(())
    }
}

/// Always runs the first registered algorithm.
#[derive(Debug, Default)]
pub struct SingleSelection;

impl AlgorithmSelection for SingleSelection {
    fn apply(
        &mut self,
        _node_id: usize,
        _tree: &Topology,
        algorithms: &[SearchScore],
    ) -> Result<usize> {
        if algorithms.is_empty() {
            return Err(TesoroError::Config {
                reason: "the list of search algorithms is empty".to_string(),
            });
        }
        Ok(0)
    }

    fn rank(
        &mut self,
        _node_id: usize,
        _tree: &Topology,
        algorithms: &mut [SearchScore],
        _executed: usize,
        _obtained: &Fitness,
        _current_evals: usize,
        _total_evals: u64,
    ) -> Result<()> {
        if algorithms.is_empty() {
            return Err(TesoroError::Config {
                reason: "the list of search algorithms is empty".to_string(),
            });
        }
        algorithms[0].set_score(1.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::HillClimbing;

    fn scores(n: usize) -> Vec<SearchScore> {
        (0..n)
            .map(|_| SearchScore::new(Box::new(HillClimbing::default()), 1.0))
            .collect()
    }

    #[test]
    fn test_round_robin_cycles_in_order() {
        let tree = Topology::new();
        let algorithms = scores(3);
        let mut policy = RoundRobinSelection::default();
        let picks: Vec<usize> = (0..7)
            .map(|_| policy.apply(0, &tree, &algorithms).unwrap())
            .collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_single_selection_always_first() {
        let tree = Topology::new();
        let algorithms = scores(3);
        let mut policy = SingleSelection;
        for _ in 0..5 {
            assert_eq!(policy.apply(0, &tree, &algorithms).unwrap(), 0);
        }
    }

    #[test]
    fn test_empty_algorithm_list_is_rejected() {
        let tree = Topology::new();
        let mut policy = RoundRobinSelection::default();
        assert!(policy.apply(0, &tree, &[]).is_err());
    }

    #[test]
    fn test_search_score_defaults() {
        let score = SearchScore::new(Box::new(HillClimbing::default()), 2.5);
        assert_eq!(score.weight(), 2.5);
        assert_eq!(score.score(), 1.0);
        assert_eq!(score.frequency(), 1.0);
        assert_eq!(score.deprecation(), 1.0);
    }
}
