//! Bundled search algorithms.
//!
//! The engine treats every optimizer as an external [`Search`](crate::search::Search)
//! collaborator; these two classics ship in-tree because the engine's local
//! refinement step needs a default, and because they make the demos
//! self-contained.

mod hill_climbing;
mod pso;

pub use hill_climbing::HillClimbing;
pub use pso::ParticleSwarm;
