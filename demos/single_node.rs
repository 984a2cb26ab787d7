//! A single node with one swarm optimizing the Rosenbrock valley.
//!
//! Run with: `cargo run --example single_node`

use tesoro::{
    Mesh, ParticleSwarm, Rosenbrock, SearchSpace, SingleSelection, Solution, Topology,
    TreasureHuntBuilder,
};

fn print_solution(solution: &Solution) {
    print!("{{ ");
    for i in 0..solution.n_dims() {
        print!("{:.4} ", solution.position(i).first());
    }
    println!("}}");
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
    tree.lock()?;

    let mut endpoints = Mesh::for_topology(&tree)?;
    let endpoint = endpoints
        .remove(&0)
        .expect("the mesh always carries the root endpoint");

    let mut node = TreasureHuntBuilder::new()
        .with_topology(tree)
        .with_search_space(SearchSpace::symmetric(50, -20.0, 20.0)?)
        .with_fitness_policy(Box::new(Rosenbrock))
        .with_algorithm_selection(Box::new(SingleSelection))
        .add_search_algorithm(Box::new(ParticleSwarm::new(0.9, 0.7, 0.7, 12)), 1.0)
        .with_best_list_size(2)
        .with_max_time_seconds(5)
        .build(endpoint)?;

    node.run()?;

    let best = node.best_solution().expect("run completed");
    println!(
        "[{}] Best Result: Num.Evals = {}, Fitness = {:.6}",
        node.node_id(),
        node.evaluations(),
        best.fitness().first()
    );
    print!("Overall Best Solution: ");
    print_solution(&best);
    Ok(())
}
