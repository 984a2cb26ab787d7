//! Seven cooperating nodes over a balanced binary tree.
//!
//! Every node runs in its own thread, standing in for one process per node
//! on a cluster. The search space is halved at every tree level, so each
//! node anchors its exploration to a progressively narrower slice while
//! improvements travel up to the root.
//!
//! Run with: `cargo run --example seven_nodes`

use std::thread;
use std::time::Duration;

use tesoro::{
    GroupRegionSelection, HillClimbing, Mesh, ParticleSwarm, Rosenbrock, SearchSpace, Solution,
    Topology, TreasureHuntBuilder,
};

const DIMENSIONS: usize = 20;

fn print_solution(solution: &Solution) {
    print!("{{ ");
    for i in 0..solution.n_dims() {
        print!("{:.4} ", solution.position(i).first());
    }
    println!("}}");
}

fn run_node(tree: Topology, endpoint: tesoro::Endpoint) -> tesoro::Result<()> {
    let id = endpoint.node_id();
    let mut node = TreasureHuntBuilder::new()
        .with_topology(tree)
        .with_search_space(SearchSpace::symmetric(DIMENSIONS, -20.0, 20.0)?)
        .with_fitness_policy(Box::new(Rosenbrock))
        .with_region_selection(Box::new(GroupRegionSelection::new(1, 2)?))
        .add_search_algorithm(Box::new(ParticleSwarm::new(1.1, 0.9, 0.9, 12)), 1.0)
        .add_search_algorithm(Box::new(HillClimbing::new(1.0, 0.2, 12)), 1.0)
        .add_search_algorithm(Box::new(ParticleSwarm::new(0.9, 0.7, 0.7, 12)), 1.0)
        .add_search_algorithm(Box::new(HillClimbing::new(0.5, 0.1, 12)), 1.0)
        .with_best_list_size(2)
        .with_max_time_seconds(10)
        .with_drain_poll_interval(Duration::from_millis(100))
        .build(endpoint)?;

    node.run()?;

    let best = node.best_solution().expect("run completed");
    println!(
        "[{id}] Best Result: Num.Evals = {}, Fitness = {:.6}",
        node.evaluations(),
        best.fitness().first()
    );
    if id == 0 {
        print!("Overall Best Solution: ");
        print_solution(&best);
        if let Some(best_list) = node.best_list() {
            for (i, stored) in best_list.iter().enumerate() {
                print!("BestList[{i}]: ");
                print_solution(stored);
            }
        }
    }
    Ok(())
}

fn main() -> tesoro::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut tree = Topology::new();
    tree.add_root(0)?;
    tree.add_child(1, 0)?;
    tree.add_child(2, 0)?;
    tree.add_child(3, 1)?;
    tree.add_child(4, 1)?;
    tree.add_child(5, 2)?;
    tree.add_child(6, 2)?;
    tree.lock()?;

    let mut endpoints = Mesh::for_topology(&tree)?;
    let mut handles = Vec::new();
    for &id in tree.node_ids() {
        let endpoint = endpoints
            .remove(&id)
            .expect("the mesh carries every node's endpoint");
        let tree = tree.clone();
        handles.push(thread::spawn(move || run_node(tree, endpoint)));
    }
    for handle in handles {
        handle
            .join()
            .expect("node thread panicked")
            .expect("node failed");
    }
    Ok(())
}
