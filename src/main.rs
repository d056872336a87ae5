use neat_rsu::{Config, DatasetRecord, GenerationDriver, RegressionEvaluator};

/// A handful of synthetic vehicle/RSU samples, standing in for a real dataset file. Loading an
/// actual CSV of recorded contacts is left to a caller embedding this crate; this binary only
/// demonstrates driving evolution to convergence against some data.
fn demo_dataset() -> Vec<DatasetRecord> {
    vec![
        DatasetRecord::new([0.1, 0.2, 0.0, 5.0, 0.9, 0.1], 2.0),
        DatasetRecord::new([0.4, 0.1, 1.0, 8.0, 0.3, 0.7], 1.1),
        DatasetRecord::new([0.9, 0.8, 0.5, 12.0, 0.1, 0.2], 0.4),
        DatasetRecord::new([0.2, 0.2, 0.2, 3.0, 0.8, 0.8], 2.6),
        DatasetRecord::new([0.6, 0.5, 0.9, 10.0, 0.4, 0.5], 0.9),
    ]
}

fn main() {
    env_logger::init();

    let mut config = Config::default();
    config.population_size = 150;
    config.generations = 50;
    config.seed = 0xC0FFEE;

    if let Err(e) = config.validate() {
        eprintln!("invalid configuration: {e}");
        std::process::exit(1);
    }

    const SENSORY: usize = 6;
    const ACTION: usize = 1;

    let evaluator = RegressionEvaluator::new(demo_dataset());
    let mut driver = GenerationDriver::new(config, SENSORY, ACTION);
    driver.run(&evaluator);

    match driver.population.fittest() {
        Some(best) => println!(
            "generation {}: fittest genome {} scored {:.4}",
            driver.generation,
            best.id,
            best.fitness()
        ),
        None => println!("generation {}: population collapsed", driver.generation),
    }
}
