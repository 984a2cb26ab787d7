//! The per-node coordination engine.
//!
//! [`TreasureHuntBuilder`] assembles the collaborators and budgets;
//! [`TreasureHunt::run`] executes the node's whole life cycle: population
//! reset, startup barrier, the asynchronous iteration loop exchanging
//! candidates with the tree neighbours, the residual drain once the budgets
//! are spent, and the tree-ordered finalize handshake.
//!
//! Everything inside a node is single-threaded and cooperative around the
//! messaging substrate: the only suspension points are non-blocking channel
//! tests, the residual-drain polling sleeps, and the two synchronous
//! handshakes.

use std::thread;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::algorithms::HillClimbing;
use crate::best_list::{
    BestList, BestListSelection, BestListUpdate, ConvergentUpdate, RandomSelection,
};
use crate::comm::{
    Candidate, Endpoint, Message, Tag, STATUS_RESIDUAL, STATUS_RUNNING, STATUS_TERMINATED,
};
use crate::convergence::{ConvergenceControl, CsmOn};
use crate::error::{Result, TesoroError};
use crate::iteration::IterationData;
use crate::region::{GroupRegionSelection, RegionSelection};
use crate::relocation::{BetaRelocation, RelocationStrategy};
use crate::search::{
    AlgorithmSelection, FitnessPolicy, RoundRobinSelection, Search, SearchContext, SearchScore,
};
use crate::search_group::SearchGroup;
use crate::solution::{Solution, SolutionShape};
use crate::space::{Region, SearchSpace};
use crate::tree::Topology;

/// Default evaluation budget handed to the convergence controller.
const DEFAULT_CONVERGENCE_BUDGET: usize = 3000;
/// Default relaxation floor of the convergence controller.
const DEFAULT_RELAXATION_FLOOR: f64 = 0.2;

/// Configures and builds a [`TreasureHunt`] node.
///
/// Required: the locked tree, the search space, the fitness policy, at least
/// one search algorithm and at least one positive budget. Everything else
/// falls back to the documented defaults.
pub struct TreasureHuntBuilder {
    topology: Option<Topology>,
    search_space: Option<SearchSpace>,
    fitness: Option<Box<dyn FitnessPolicy>>,
    region_selection: Option<Box<dyn RegionSelection>>,
    relocation: Option<Box<dyn RelocationStrategy>>,
    best_list_update: Option<Box<dyn BestListUpdate>>,
    best_list_selection: Option<Box<dyn BestListSelection>>,
    convergence: Option<Box<dyn ConvergenceControl>>,
    local_search: Option<Box<dyn Search>>,
    algorithm_selection: Option<Box<dyn AlgorithmSelection>>,
    algorithms: Vec<SearchScore>,
    best_list_size: usize,
    max_evaluations: u64,
    max_time_seconds: u64,
    max_iterations: u64,
    bias: Option<Solution>,
    startup_solutions: Vec<Solution>,
    shape: SolutionShape,
    seed: Option<u64>,
    drain_poll: Duration,
}

impl Default for TreasureHuntBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreasureHuntBuilder {
    /// Start an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            topology: None,
            search_space: None,
            fitness: None,
            region_selection: None,
            relocation: None,
            best_list_update: None,
            best_list_selection: None,
            convergence: None,
            local_search: None,
            algorithm_selection: None,
            algorithms: Vec::new(),
            best_list_size: 1,
            max_evaluations: 0,
            max_time_seconds: 0,
            max_iterations: 0,
            bias: None,
            startup_solutions: Vec::new(),
            shape: SolutionShape::default(),
            seed: None,
            drain_poll: Duration::from_secs(1),
        }
    }

    /// Set the tree topology shared by all nodes.
    #[must_use]
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = Some(topology);
        self
    }

    /// Set the full search space (required).
    #[must_use]
    pub fn with_search_space(mut self, space: SearchSpace) -> Self {
        self.search_space = Some(space);
        self
    }

    /// Set the objective (required).
    #[must_use]
    pub fn with_fitness_policy(mut self, fitness: Box<dyn FitnessPolicy>) -> Self {
        self.fitness = Some(fitness);
        self
    }

    /// Set the anchor-region selection policy.
    #[must_use]
    pub fn with_region_selection(mut self, policy: Box<dyn RegionSelection>) -> Self {
        self.region_selection = Some(policy);
        self
    }

    /// Set the relocation strategy.
    #[must_use]
    pub fn with_relocation(mut self, strategy: Box<dyn RelocationStrategy>) -> Self {
        self.relocation = Some(strategy);
        self
    }

    /// Set the best-list update policy.
    #[must_use]
    pub fn with_best_list_update(mut self, policy: Box<dyn BestListUpdate>) -> Self {
        self.best_list_update = Some(policy);
        self
    }

    /// Set the best-list selection policy.
    #[must_use]
    pub fn with_best_list_selection(mut self, policy: Box<dyn BestListSelection>) -> Self {
        self.best_list_selection = Some(policy);
        self
    }

    /// Set the convergence control policy.
    #[must_use]
    pub fn with_convergence_control(mut self, policy: Box<dyn ConvergenceControl>) -> Self {
        self.convergence = Some(policy);
        self
    }

    /// Set the local search used to refine inbound child candidates.
    #[must_use]
    pub fn with_local_search(mut self, search: Box<dyn Search>) -> Self {
        self.local_search = Some(search);
        self
    }

    /// Set the search-algorithm selection policy.
    #[must_use]
    pub fn with_algorithm_selection(mut self, policy: Box<dyn AlgorithmSelection>) -> Self {
        self.algorithm_selection = Some(policy);
        self
    }

    /// Register a search algorithm with its selection weight.
    #[must_use]
    pub fn add_search_algorithm(mut self, search: Box<dyn Search>, weight: f64) -> Self {
        self.algorithms.push(SearchScore::new(search, weight));
        self
    }

    /// Set the best-list capacity (default: 1).
    #[must_use]
    pub fn with_best_list_size(mut self, size: usize) -> Self {
        self.best_list_size = size;
        self
    }

    /// Cap the number of fitness evaluations (0 = unlimited).
    #[must_use]
    pub fn with_max_evaluations(mut self, max: u64) -> Self {
        self.max_evaluations = max;
        self
    }

    /// Cap the wall-clock runtime in seconds (0 = unlimited).
    #[must_use]
    pub fn with_max_time_seconds(mut self, max: u64) -> Self {
        self.max_time_seconds = max;
        self
    }

    /// Cap the number of engine iterations (0 = unlimited).
    #[must_use]
    pub fn with_max_iterations(mut self, max: u64) -> Self {
        self.max_iterations = max;
        self
    }

    /// Bias the root's exploration toward a known solution.
    #[must_use]
    pub fn with_bias(mut self, bias: Solution) -> Self {
        self.bias = Some(bias);
        self
    }

    /// Seed part of the root's population with known solutions.
    #[must_use]
    pub fn with_startup_solutions(mut self, solutions: Vec<Solution>) -> Self {
        self.startup_solutions = solutions;
        self
    }

    /// Set the tuple widths used by every solution of the run.
    #[must_use]
    pub fn with_shape(mut self, shape: SolutionShape) -> Self {
        self.shape = shape;
        self
    }

    /// Fix the node's random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Polling interval of the residual-drain and finalize waits
    /// (default: one second).
    #[must_use]
    pub fn with_drain_poll_interval(mut self, interval: Duration) -> Self {
        self.drain_poll = interval;
        self
    }

    /// Validate the configuration and build the node bound to `endpoint`.
    pub fn build(self, endpoint: Endpoint) -> Result<TreasureHunt> {
        let mut topology = self.topology.ok_or_else(|| TesoroError::Config {
            reason: "the tree topology must be provided".to_string(),
        })?;
        let space = self.search_space.ok_or_else(|| TesoroError::Config {
            reason: "the search space must be provided".to_string(),
        })?;
        let fitness = self.fitness.ok_or_else(|| TesoroError::Config {
            reason: "the fitness policy must be provided".to_string(),
        })?;
        if self.max_evaluations == 0 && self.max_time_seconds == 0 && self.max_iterations == 0 {
            return Err(TesoroError::Config {
                reason: "at least one budget limit must be provided: \
                         [iterations, evaluations, seconds]"
                    .to_string(),
            });
        }
        if !topology.is_locked() {
            topology.lock()?;
        }

        let node_id = endpoint.node_id();
        if !topology.contains(node_id) {
            return Err(TesoroError::UnknownNode { id: node_id });
        }
        let parent = topology.parent_of(node_id)?;
        let children = topology.children_of(node_id)?.to_vec();
        let is_root = parent.is_none();
        let level = topology.level_of(node_id)?;
        debug!(
            node = node_id,
            level,
            children = children.len(),
            "constructing node"
        );

        let region_selection = self.region_selection.map_or_else(
            || {
                GroupRegionSelection::new(1, 1)
                    .map(|p| Box::new(p) as Box<dyn RegionSelection>)
            },
            Ok,
        )?;
        let sub_region = region_selection.select(&space, &topology, node_id)?;

        let relocation = self
            .relocation
            .unwrap_or_else(|| Box::new(BetaRelocation::default()));
        let best_list_update = self
            .best_list_update
            .unwrap_or_else(|| Box::new(ConvergentUpdate));
        let best_list_selection = self
            .best_list_selection
            .unwrap_or_else(|| Box::new(RandomSelection));
        let convergence = self.convergence.map_or_else(
            || {
                CsmOn::new(
                    DEFAULT_CONVERGENCE_BUDGET,
                    DEFAULT_RELAXATION_FLOOR,
                    fitness.min_estimated(),
                )
                .map(|c| Box::new(c) as Box<dyn ConvergenceControl>)
            },
            Ok,
        )?;
        let local_search = self
            .local_search
            .unwrap_or_else(|| Box::new(HillClimbing::new(0.05, 1e-3, 1)));
        let algorithm_selection = self
            .algorithm_selection
            .unwrap_or_else(|| Box::new(RoundRobinSelection::default()));

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let n_dims = space.n_dims();
        let mut best_list = BestList::new(self.best_list_size)?;
        let mut general_best = Solution::with_shape(n_dims, self.shape);
        // Start from the worst fitness so the first comparison always wins.
        fitness.set_worst(general_best.fitness_mut());
        let parent_best = Solution::with_shape(n_dims, self.shape);

        let mut evals: u64 = 0;
        let bias = if is_root {
            if let Some(mut bias) = self.bias {
                fitness.apply(&mut bias);
                best_list_update.apply(&mut best_list, &bias, fitness.as_ref())?;
                evals += 1;
                info!(
                    node = node_id,
                    fitness = bias.fitness().first(),
                    "bias evaluated"
                );
                Some(bias)
            } else {
                None
            }
        } else {
            None
        };

        let mut search_group = SearchGroup::new(
            node_id,
            self.algorithms,
            algorithm_selection,
            convergence,
            n_dims,
            self.shape,
        )?;
        let startup_solutions = if is_root { self.startup_solutions } else { Vec::new() };
        search_group.reset_population(
            &sub_region,
            is_root,
            &startup_solutions,
            bias.as_ref(),
            fitness.as_ref(),
            &mut best_list,
            best_list_update.as_ref(),
            &mut general_best,
            &mut evals,
            &mut rng,
        )?;

        let iteration_data = IterationData::new(
            search_group.population(),
            self.max_time_seconds,
            self.max_evaluations,
            self.max_iterations,
        );
        let local_budget = (search_group.convergence_budget() / 100).max(1);
        let child_status = vec![0; children.len()];

        Ok(TreasureHunt {
            topology,
            node_id,
            parent,
            children,
            space,
            sub_region,
            fitness,
            region_selection,
            relocation,
            best_list_update,
            best_list_selection,
            local_search,
            local_budget,
            search_group,
            best_list,
            general_best,
            parent_best,
            iteration_data,
            endpoint,
            child_status,
            bias,
            max_evaluations: self.max_evaluations,
            max_time_seconds: self.max_time_seconds,
            max_iterations: self.max_iterations,
            drain_poll: self.drain_poll,
            evals,
            executed: false,
            rng,
        })
    }
}

/// One node of the cooperative optimizer.
pub struct TreasureHunt {
    topology: Topology,
    node_id: usize,
    parent: Option<usize>,
    children: Vec<usize>,
    space: SearchSpace,
    sub_region: Region,
    fitness: Box<dyn FitnessPolicy>,
    region_selection: Box<dyn RegionSelection>,
    relocation: Box<dyn RelocationStrategy>,
    best_list_update: Box<dyn BestListUpdate>,
    best_list_selection: Box<dyn BestListSelection>,
    local_search: Box<dyn Search>,
    local_budget: usize,
    search_group: SearchGroup,
    best_list: BestList,
    general_best: Solution,
    parent_best: Solution,
    iteration_data: IterationData,
    endpoint: Endpoint,
    child_status: Vec<i32>,
    bias: Option<Solution>,
    max_evaluations: u64,
    max_time_seconds: u64,
    max_iterations: u64,
    drain_poll: Duration,
    evals: u64,
    executed: bool,
    rng: StdRng,
}

impl TreasureHunt {
    /// This node's id in the topology.
    #[must_use]
    pub fn node_id(&self) -> usize {
        self.node_id
    }

    /// Total fitness evaluations performed so far.
    #[must_use]
    pub fn evaluations(&self) -> u64 {
        self.evals
    }

    /// A clone of the general best. `None` until [`run`](Self::run) has
    /// completed.
    #[must_use]
    pub fn best_solution(&self) -> Option<Solution> {
        self.executed.then(|| self.general_best.clone())
    }

    /// A clone of the best-list. `None` until [`run`](Self::run) has
    /// completed.
    #[must_use]
    pub fn best_list(&self) -> Option<BestList> {
        self.executed.then(|| self.best_list.clone())
    }

    /// Execute the node until its budgets are spent and the whole sub-tree
    /// has finalized.
    pub fn run(&mut self) -> Result<()> {
        info!(node = self.node_id, "node running");
        let started = Instant::now();
        self.startup_barrier()?;

        let n_dims = self.space.n_dims();
        let shape = self.general_best.shape();
        let mut inbound = Solution::with_shape(n_dims, shape);
        let mut has_children_improved = false;
        let mut t: u64 = 1;

        loop {
            self.search_group.run(
                &self.topology,
                &self.space,
                self.fitness.as_ref(),
                self.best_list_update.as_ref(),
                &mut self.best_list,
                &mut self.general_best,
                &mut self.evals,
                &mut self.rng,
            )?;

            // Publish the general best to the parent when it improved, by
            // own search or through a child.
            if let Some(parent) = self.parent {
                if self.search_group.improved_general_best() || has_children_improved {
                    self.send_best(parent, Tag::ChildToParent, STATUS_RUNNING)?;
                } else {
                    debug!(node = self.node_id, "no improvement to publish");
                }
            }

            // Slot 0 always keeps the iteration best.
            self.search_group.promote_iteration_best()?;
            has_children_improved = false;
            let mut pop_seq = 1;
            let population_size = self.search_group.population_size();

            if !self.children.is_empty() {
                // Collect from children: drain each inbound queue, refine the
                // freshest payload locally and install it in the population.
                for i in 0..self.children.len() {
                    if pop_seq >= population_size {
                        break;
                    }
                    if self.child_status[i] == STATUS_TERMINATED {
                        continue;
                    }
                    let child = self.children[i];
                    let Some(Message::Candidate(candidate)) =
                        self.endpoint.drain_latest(child, Tag::ChildToParent)?
                    else {
                        continue;
                    };
                    self.child_status[i] = candidate.status;
                    load_candidate(&mut inbound, &candidate)?;
                    debug!(
                        node = self.node_id,
                        child,
                        status = candidate.status,
                        fitness = inbound.fitness().first(),
                        "received child candidate"
                    );

                    self.refine_locally(&mut inbound)?;
                    if self.fitness.better(&inbound, &self.general_best) {
                        self.general_best.assign_from(&inbound)?;
                        has_children_improved = true;
                    }
                    self.best_list_update.apply(
                        &mut self.best_list,
                        &inbound,
                        self.fitness.as_ref(),
                    )?;
                    self.search_group.population_mut()[pop_seq].assign_from(&inbound)?;
                    pop_seq += 1;
                }

                // Gift one best-list pick to every still-active child.
                let gift = self.best_list_selection.apply(
                    &self.best_list,
                    self.fitness.as_ref(),
                    &mut self.rng,
                )?;
                for i in 0..self.children.len() {
                    if self.child_status[i] < 0 {
                        continue;
                    }
                    self.send_solution(self.children[i], Tag::ParentToChild, &gift, 0)?;
                }
            }

            // Latch the parent best; fall back to the own general best when
            // the parent stayed quiet this iteration.
            let mut latched = false;
            if t > 1 {
                if let Some(parent) = self.parent {
                    if let Some(Message::Candidate(candidate)) =
                        self.endpoint.drain_latest(parent, Tag::ParentToChild)?
                    {
                        load_candidate(&mut self.parent_best, &candidate)?;
                        latched = true;
                    }
                }
            }
            if !latched {
                self.parent_best.assign_from(&self.general_best)?;
            }

            if let Some(bias) = self.bias.clone() {
                if pop_seq < population_size {
                    self.search_group.population_mut()[pop_seq].reset_with_bias(
                        &self.sub_region,
                        &bias,
                        &mut self.rng,
                    )?;
                    pop_seq += 1;
                }
            }

            // Budget check before spending effort on relocation.
            let elapsed = started.elapsed().as_secs_f64();
            let run_next_iteration = (self.max_iterations == 0 || t < self.max_iterations)
                && (self.max_evaluations == 0 || self.evals < self.max_evaluations)
                && (self.max_time_seconds == 0 || elapsed < self.max_time_seconds as f64);

            if run_next_iteration {
                self.iteration_data.set_iteration(t);
                self.iteration_data.set_evaluations(self.evals);
                self.iteration_data.set_elapsed_seconds(elapsed);
                self.iteration_data
                    .set_population(self.search_group.population());
                self.iteration_data.set_general_best(&self.general_best);
                self.iteration_data.set_parent_best(&self.parent_best);
                self.iteration_data
                    .set_iteration_best(self.search_group.iteration_best());

                if pop_seq < population_size {
                    self.sub_region = self.region_selection.recalculate(
                        &self.iteration_data,
                        &self.space,
                        self.sub_region.clone(),
                        &self.topology,
                        self.node_id,
                    );
                    self.relocation.apply(
                        &self.sub_region,
                        &mut self.search_group.population_mut()[pop_seq..],
                        &self.iteration_data,
                        &mut self.rng,
                    )?;
                    for slot in pop_seq..population_size {
                        self.fitness
                            .apply(&mut self.search_group.population_mut()[slot]);
                        self.evals += 1;
                    }
                }
            }

            info!(
                node = self.node_id,
                iteration = t,
                evals = self.evals,
                algorithm = self.search_group.last_algorithm_name().unwrap_or(""),
                best = self.general_best.fitness().first(),
                iteration_best = self.search_group.iteration_best().fitness().first(),
                "iteration finished"
            );
            t += 1;
            if !run_next_iteration {
                break;
            }
        }

        info!(node = self.node_id, "search phase completed");
        self.residual_drain(&mut inbound)?;
        self.finalize_handshake()?;
        self.executed = true;
        info!(node = self.node_id, evals = self.evals, "node finished");
        Ok(())
    }

    /// Synchronise the whole tree once: leaves release their parents, the
    /// signal cascades up to the root.
    fn startup_barrier(&mut self) -> Result<()> {
        if self.topology.len() <= 1 {
            return Ok(());
        }
        if self.children.is_empty() {
            if let Some(parent) = self.parent {
                self.endpoint
                    .send(parent, Tag::Startup, Message::Signal(STATUS_RUNNING))?;
                debug!(node = self.node_id, parent, "startup signal sent");
            }
        } else {
            for i in 0..self.children.len() {
                let child = self.children[i];
                match self.endpoint.recv(child, Tag::Startup)? {
                    Message::Signal(status) => self.child_status[i] = status,
                    Message::Candidate(_) => {
                        return Err(TesoroError::ChannelClosed { peer: child });
                    }
                }
                debug!(node = self.node_id, child, "startup signal received");
            }
            if let Some(parent) = self.parent {
                self.endpoint
                    .send(parent, Tag::Startup, Message::Signal(STATUS_RUNNING))?;
                debug!(node = self.node_id, parent, "startup signal forwarded");
            }
        }
        Ok(())
    }

    /// Refine an inbound candidate with the local search, charging the spent
    /// evaluations to this node.
    fn refine_locally(&mut self, candidate: &mut Solution) -> Result<()> {
        let single = std::slice::from_mut(candidate);
        let mut ctx = SearchContext {
            population: single,
            fitness: self.fitness.as_ref(),
            space: &self.space,
            rng: &mut self.rng,
        };
        self.local_search.startup(&mut ctx)?;
        self.local_search.next(&mut ctx, self.local_budget)?;
        self.local_search.finalize(&mut ctx);
        self.evals += self.local_search.evals() as u64;
        Ok(())
    }

    /// Post-budget phase: keep messages flowing until every child reports
    /// terminated, then report terminated upstream.
    fn residual_drain(&mut self, inbound: &mut Solution) -> Result<()> {
        if let Some(parent) = self.parent {
            // From here on this sub-tree only intensifies; parent data is
            // stale by definition.
            let _ = self.endpoint.drain_latest(parent, Tag::ParentToChild)?;
            self.send_best(parent, Tag::ChildToParent, STATUS_RESIDUAL)?;
            debug!(node = self.node_id, parent, "entered residual drain");
        }

        if !self.children.is_empty() {
            // One more broadcast of the final general best.
            for i in 0..self.children.len() {
                if self.child_status[i] < 0 {
                    continue;
                }
                self.send_best(self.children[i], Tag::ParentToChild, 0)?;
            }

            loop {
                let active = self
                    .child_status
                    .iter()
                    .filter(|&&status| status != STATUS_TERMINATED)
                    .count();
                if active == 0 {
                    break;
                }
                debug!(node = self.node_id, active, "waiting for children");
                thread::sleep(self.drain_poll);

                for i in 0..self.children.len() {
                    if self.child_status[i] == STATUS_TERMINATED {
                        continue;
                    }
                    let child = self.children[i];
                    let Some(Message::Candidate(candidate)) =
                        self.endpoint.drain_latest(child, Tag::ChildToParent)?
                    else {
                        continue;
                    };
                    self.child_status[i] = candidate.status;
                    load_candidate(inbound, &candidate)?;
                    self.refine_locally(inbound)?;

                    if self.fitness.better(inbound, &self.general_best) {
                        self.general_best.assign_from(inbound)?;
                        debug!(
                            node = self.node_id,
                            child,
                            fitness = self.general_best.fitness().first(),
                            "late improvement from child"
                        );
                        // Keep propagating: up to the parent, across to the
                        // siblings of the sender.
                        if let Some(parent) = self.parent {
                            self.send_best(parent, Tag::ChildToParent, STATUS_RESIDUAL)?;
                        }
                        for j in 0..self.children.len() {
                            if j == i || self.child_status[j] < 0 {
                                continue;
                            }
                            self.send_best(self.children[j], Tag::ParentToChild, 0)?;
                        }
                    }
                }
            }
            debug!(node = self.node_id, "all children terminated");
        }

        if let Some(parent) = self.parent {
            self.send_best(parent, Tag::ChildToParent, STATUS_TERMINATED)?;
            debug!(node = self.node_id, parent, "terminated status sent");
        }
        Ok(())
    }

    /// Tree-ordered termination: the root broadcasts the finalize signal
    /// down, leaves acknowledge back up, internal nodes relay both ways.
    fn finalize_handshake(&mut self) -> Result<()> {
        if let Some(parent) = self.parent {
            loop {
                // Stale gifts may still be queued; keep discarding them.
                let _ = self.endpoint.drain_latest(parent, Tag::ParentToChild)?;
                if self.endpoint.try_recv(parent, Tag::Finalize)?.is_some() {
                    debug!(node = self.node_id, parent, "finalize signal received");
                    break;
                }
                thread::sleep(self.drain_poll);
            }
        }

        for &child in &self.children {
            self.endpoint
                .send(child, Tag::Finalize, Message::Signal(1))?;
            debug!(node = self.node_id, child, "finalize signal sent");
        }

        if self.topology.len() > 1 {
            if self.children.is_empty() {
                if let Some(parent) = self.parent {
                    self.endpoint
                        .send(parent, Tag::Finalize, Message::Signal(1))?;
                    debug!(node = self.node_id, parent, "finalize confirmed");
                }
            } else {
                for &child in &self.children {
                    self.endpoint.recv(child, Tag::Finalize)?;
                    debug!(node = self.node_id, child, "finalize confirmation received");
                }
                if let Some(parent) = self.parent {
                    self.endpoint
                        .send(parent, Tag::Finalize, Message::Signal(1))?;
                    debug!(node = self.node_id, parent, "finalize confirmed");
                }
            }
        }
        Ok(())
    }

    fn send_best(&self, to: usize, tag: Tag, status: i32) -> Result<()> {
        self.endpoint.send(
            to,
            tag,
            Message::Candidate(Candidate {
                positions: self.general_best.flat_positions(),
                fitness: self.general_best.fitness().values().to_vec(),
                status,
            }),
        )
    }

    fn send_solution(&self, to: usize, tag: Tag, solution: &Solution, status: i32) -> Result<()> {
        self.endpoint.send(
            to,
            tag,
            Message::Candidate(Candidate {
                positions: solution.flat_positions(),
                fitness: solution.fitness().values().to_vec(),
                status,
            }),
        )
    }
}

fn load_candidate(target: &mut Solution, candidate: &Candidate) -> Result<()> {
    target.load_flat_positions(&candidate.positions)?;
    target.fitness_mut().assign_slice(&candidate.fitness)?;
    Ok(())
}
