//! The per-node search group.
//!
//! One group owns the node's population and the registered search
//! algorithms. Each engine iteration the group asks the selection policy for
//! the next algorithm, runs it under convergence control, lifts the
//! iteration best and folds it into the best-list and the general best.

use rand::RngCore;
use tracing::debug;

use crate::best_list::{BestList, BestListUpdate};
use crate::convergence::ConvergenceControl;
use crate::error::{Result, TesoroError};
use crate::search::{AlgorithmSelection, FitnessPolicy, SearchContext, SearchScore};
use crate::solution::{uniform_in, Solution, SolutionShape};
use crate::space::{Region, SearchSpace};
use crate::tree::Topology;

pub(crate) struct SearchGroup {
    node_id: usize,
    algorithms: Vec<SearchScore>,
    selection: Box<dyn AlgorithmSelection>,
    convergence: Box<dyn ConvergenceControl>,
    population: Vec<Solution>,
    iteration_best: Solution,
    improved_general_best: bool,
    last_executed: Option<usize>,
}

impl SearchGroup {
    pub(crate) fn new(
        node_id: usize,
        algorithms: Vec<SearchScore>,
        selection: Box<dyn AlgorithmSelection>,
        convergence: Box<dyn ConvergenceControl>,
        n_dims: usize,
        shape: SolutionShape,
    ) -> Result<Self> {
        if algorithms.is_empty() {
            return Err(TesoroError::Config {
                reason: "at least one search algorithm must be provided".to_string(),
            });
        }
        let population_size = algorithms
            .iter()
            .map(|score| score.search().preferred_population_size())
            .max()
            .unwrap_or(0);
        if population_size == 0 {
            return Err(TesoroError::Config {
                reason: "the population size must be greater than zero".to_string(),
            });
        }
        let population = (0..population_size)
            .map(|_| Solution::with_shape(n_dims, shape))
            .collect();
        Ok(Self {
            node_id,
            algorithms,
            selection,
            convergence,
            population,
            iteration_best: Solution::with_shape(n_dims, shape),
            improved_general_best: false,
            last_executed: None,
        })
    }

    pub(crate) fn population(&self) -> &[Solution] {
        &self.population
    }

    pub(crate) fn population_mut(&mut self) -> &mut [Solution] {
        &mut self.population
    }

    pub(crate) fn population_size(&self) -> usize {
        self.population.len()
    }

    pub(crate) fn iteration_best(&self) -> &Solution {
        &self.iteration_best
    }

    /// Copy the iteration best into population slot 0.
    pub(crate) fn promote_iteration_best(&mut self) -> Result<()> {
        self.population[0].assign_from(&self.iteration_best)
    }

    pub(crate) fn improved_general_best(&self) -> bool {
        self.improved_general_best
    }

    pub(crate) fn last_algorithm_name(&self) -> Option<&'static str> {
        self.last_executed
            .map(|idx| self.algorithms[idx].search().name())
    }

    /// Evaluation budget of the convergence controller.
    pub(crate) fn convergence_budget(&self) -> usize {
        self.convergence.budget()
    }

    /// Fill the population and evaluate every member.
    ///
    /// Slots are claimed in priority order: startup solutions (root only),
    /// one verbatim bias slot (root only), bias-influenced resets split
    /// 50/50 between "near the bias" and "inside the anchor", and plain
    /// anchored resets for everything else. Seeds the best-list with the
    /// resulting general best and charges one evaluation per member.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn reset_population(
        &mut self,
        region: &Region,
        is_root: bool,
        startup_solutions: &[Solution],
        bias: Option<&Solution>,
        fitness: &dyn FitnessPolicy,
        best_list: &mut BestList,
        update: &dyn BestListUpdate,
        general_best: &mut Solution,
        evals: &mut u64,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        let mut has_used_bias = false;
        for i in 0..self.population.len() {
            if is_root && i < startup_solutions.len() {
                self.population[i].assign_from(&startup_solutions[i])?;
            } else if let Some(bias) = bias {
                if is_root && !has_used_bias {
                    has_used_bias = true;
                    self.population[i].assign_from(bias)?;
                } else if uniform_in(rng, 0.0, 1.0) < 0.5 {
                    self.population[i].reset_with_bias(region, bias, rng)?;
                } else {
                    self.population[i].reset(region, rng)?;
                }
            } else {
                self.population[i].reset(region, rng)?;
            }

            fitness.apply(&mut self.population[i]);
            if i == 0 || fitness.better(&self.population[i], &self.iteration_best) {
                self.iteration_best.assign_from(&self.population[i])?;
            }
        }
        if fitness.better(&self.iteration_best, general_best) {
            general_best.assign_from(&self.iteration_best)?;
        }
        update.apply(best_list, general_best, fitness)?;
        *evals += self.population.len() as u64;
        Ok(())
    }

    /// One complete search-group execution.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn run(
        &mut self,
        tree: &Topology,
        space: &SearchSpace,
        fitness: &dyn FitnessPolicy,
        update: &dyn BestListUpdate,
        best_list: &mut BestList,
        general_best: &mut Solution,
        evals: &mut u64,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        self.improved_general_best = false;
        let selected = self.selection.apply(self.node_id, tree, &self.algorithms)?;

        {
            let mut ctx = SearchContext {
                population: &mut self.population,
                fitness,
                space,
                rng,
            };
            self.convergence
                .run(self.algorithms[selected].search_mut(), &mut ctx)?;
        }

        let current_evals = self.algorithms[selected].search().evals();
        *evals += current_evals as u64;
        let best_index = self.algorithms[selected].search().best_index();
        self.iteration_best.assign_from(&self.population[best_index])?;
        update.apply(best_list, &self.iteration_best, fitness)?;
        if fitness.better(&self.iteration_best, general_best) {
            general_best.assign_from(&self.iteration_best)?;
            self.improved_general_best = true;
        }

        let obtained = self.iteration_best.fitness().clone();
        self.selection.rank(
            self.node_id,
            tree,
            &mut self.algorithms,
            selected,
            &obtained,
            current_evals,
            *evals,
        )?;
        self.last_executed = Some(selected);
        debug!(
            node = self.node_id,
            algorithm = self.algorithms[selected].search().name(),
            evals = current_evals,
            best = self.iteration_best.fitness().first(),
            "search group executed"
        );
        Ok(())
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::HillClimbing;
    use crate::best_list::ConvergentUpdate;
    use crate::convergence::CsmOn;
    use crate::objective::Sphere;
    use crate::search::RoundRobinSelection;
    use crate::space::SearchSpace;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn group(population: usize) -> SearchGroup {
        let algorithms = vec![SearchScore::new(
            Box::new(HillClimbing::new(0.5, 0.05, population)),
            1.0,
        )];
        SearchGroup::new(
            0,
            algorithms,
            Box::new(RoundRobinSelection::default()),
            Box::new(CsmOn::new(200, 0.2, 0.0).unwrap()),
            3,
            SolutionShape::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_population_sized_to_max_preference() {
        let algorithms = vec![
            SearchScore::new(Box::new(HillClimbing::new(0.5, 0.05, 4)), 1.0),
            SearchScore::new(Box::new(HillClimbing::new(0.5, 0.05, 9)), 1.0),
        ];
        let group = SearchGroup::new(
            0,
            algorithms,
            Box::new(RoundRobinSelection::default()),
            Box::new(CsmOn::new(100, 0.2, 0.0).unwrap()),
            2,
            SolutionShape::default(),
        )
        .unwrap();
        assert_eq!(group.population_size(), 9);
    }

    #[test]
    fn test_empty_algorithm_list_rejected() {
        let result = SearchGroup::new(
            0,
            Vec::new(),
            Box::new(RoundRobinSelection::default()),
            Box::new(CsmOn::new(100, 0.2, 0.0).unwrap()),
            2,
            SolutionShape::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_reset_population_seeds_best_list_and_counts_evals() {
        let space = SearchSpace::symmetric(3, -5.0, 5.0).unwrap();
        let region = space.full_region();
        let mut group = group(4);
        let mut best_list = BestList::new(2).unwrap();
        let mut general_best = Solution::new(3);
        Sphere.set_worst(general_best.fitness_mut());
        let mut evals = 0;
        let mut rng = StdRng::seed_from_u64(31);
        group
            .reset_population(
                &region,
                true,
                &[],
                None,
                &Sphere,
                &mut best_list,
                &ConvergentUpdate,
                &mut general_best,
                &mut evals,
                &mut rng,
            )
            .unwrap();
        assert_eq!(evals, 4);
        assert!(!best_list.is_empty());
        assert!(general_best.fitness().first() < f64::MAX);
    }

    #[test]
    fn test_startup_solutions_claim_leading_slots_on_root() {
        let space = SearchSpace::symmetric(2, -5.0, 5.0).unwrap();
        let region = space.full_region();
        let mut group = group(3);
        let mut seed = Solution::new(2);
        seed.position_mut(0).fill(1.25);
        seed.position_mut(1).fill(-1.25);

        let mut best_list = BestList::new(1).unwrap();
        let mut general_best = Solution::new(2);
        Sphere.set_worst(general_best.fitness_mut());
        let mut evals = 0;
        let mut rng = StdRng::seed_from_u64(5);
        group
            .reset_population(
                &region,
                true,
                &[seed.clone()],
                None,
                &Sphere,
                &mut best_list,
                &ConvergentUpdate,
                &mut general_best,
                &mut evals,
                &mut rng,
            )
            .unwrap();
        assert_eq!(group.population()[0].position(0).first(), 1.25);
        assert_eq!(group.population()[0].position(1).first(), -1.25);
    }

    #[test]
    fn test_run_updates_iteration_best_and_general_best() {
        let space = SearchSpace::symmetric(3, -5.0, 5.0).unwrap();
        let region = space.full_region();
        let tree = {
            let mut t = Topology::new();
            t.add_root(0).unwrap();
            t.lock().unwrap();
            t
        };
        let mut group = group(4);
        let mut best_list = BestList::new(2).unwrap();
        let mut general_best = Solution::new(3);
        Sphere.set_worst(general_best.fitness_mut());
        let mut evals = 0;
        let mut rng = StdRng::seed_from_u64(23);
        group
            .reset_population(
                &region,
                true,
                &[],
                None,
                &Sphere,
                &mut best_list,
                &ConvergentUpdate,
                &mut general_best,
                &mut evals,
                &mut rng,
            )
            .unwrap();
        let before_evals = evals;
        group
            .run(
                &tree,
                &space,
                &Sphere,
                &ConvergentUpdate,
                &mut best_list,
                &mut general_best,
                &mut evals,
                &mut rng,
            )
            .unwrap();
        assert!(evals >= before_evals);
        assert!(group.last_algorithm_name().is_some());
        // The general best can only match or improve on the iteration best.
        assert!(general_best.fitness().first() <= group.iteration_best().fitness().first());
    }
}
