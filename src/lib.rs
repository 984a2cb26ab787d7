//! Tesoro: cooperative distributed metaheuristic optimization.
//!
//! Multiple optimizer nodes are arranged as a rooted tree. Each node explores
//! its own anchor region of a bounded real-valued search space with pluggable
//! population-based algorithms, and asynchronously exchanges its best
//! candidates with its tree parent and children: improvements flow up,
//! best-list gifts flow down, and nobody ever waits for a slow neighbour.
//!
//! # Quick Start
//!
//! ```
//! use tesoro::{
//!     Mesh, ParticleSwarm, SearchSpace, Sphere, Topology, TreasureHuntBuilder,
//! };
//!
//! // A single-node "tree" optimizing the 3-dimensional sphere function.
//! let mut tree = Topology::new();
//! tree.add_root(0).unwrap();
//! tree.lock().unwrap();
//!
//! let endpoint = Mesh::for_topology(&tree).unwrap().remove(&0).unwrap();
//! let mut node = TreasureHuntBuilder::new()
//!     .with_topology(tree)
//!     .with_search_space(SearchSpace::symmetric(3, -5.0, 5.0).unwrap())
//!     .with_fitness_policy(Box::new(Sphere))
//!     .add_search_algorithm(Box::new(ParticleSwarm::new(0.9, 0.7, 0.7, 8)), 1.0)
//!     .with_max_iterations(2)
//!     .with_seed(42)
//!     .build(endpoint)
//!     .unwrap();
//!
//! node.run().unwrap();
//! let best = node.best_solution().unwrap();
//! assert!(best.fitness().first() < f64::MAX);
//! ```
//!
//! # Modules
//!
//! - [`solution`]: positions, fitness tuples and candidate solutions
//! - [`space`]: bounded search spaces, regions and anchors
//! - [`tree`]: the node topology
//! - [`region`]: anchor-region assignment from tree position
//! - [`best_list`]: bounded top-solution sets and their policies
//! - [`relocation`]: Beta-distribution population relocation
//! - [`convergence`]: the CSMOn stop criterion
//! - [`search`]: the `Search` and `FitnessPolicy` contracts
//! - [`algorithms`]: bundled Hill-Climbing and PSO searches
//! - [`comm`]: the asynchronous messaging substrate
//! - [`engine`]: the per-node coordination engine

pub mod algorithms;
pub mod best_list;
pub mod comm;
pub mod convergence;
pub mod engine;
pub mod error;
pub mod iteration;
pub mod objective;
pub mod region;
pub mod relocation;
pub mod search;
pub(crate) mod search_group;
pub mod solution;
pub mod space;
pub mod tree;

pub use algorithms::{HillClimbing, ParticleSwarm};
pub use best_list::{
    BestList, BestListSelection, BestListUpdate, ConvergentUpdate, DivergentUpdate,
    RandomSelection,
};
pub use comm::{Candidate, Endpoint, Mesh, Message, Tag};
pub use convergence::{ConvergenceControl, CsmOn};
pub use engine::{TreasureHunt, TreasureHuntBuilder};
pub use error::{Result, TesoroError};
pub use iteration::IterationData;
pub use objective::{Rosenbrock, Sphere};
pub use region::{GroupRegionSelection, RegionSelection};
pub use relocation::{BetaRelocation, BoostCurve, Displacement, RelocationStrategy};
pub use search::{
    AlgorithmSelection, FitnessPolicy, RoundRobinSelection, Search, SearchContext, SearchScore,
    SingleSelection,
};
pub use solution::{Fitness, Position, Solution, SolutionShape, Violation};
pub use space::{Region, SearchSpace, Span};
pub use tree::Topology;
