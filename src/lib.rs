pub mod compatibility;
pub mod config;
pub mod constants;
pub mod crossover;
pub mod driver;
pub mod error;
pub mod fitness;
pub mod gene;
pub mod genome;
pub mod graphviz;
pub mod innovation;
pub mod population;
pub mod random;
pub mod species;

pub use config::Config;
pub use driver::GenerationDriver;
pub use error::{NeatError, Result};
pub use fitness::{DatasetRecord, FitnessEvaluator, RegressionEvaluator};
pub use gene::{ConnectionGene, NodeGene, NodeKind};
pub use genome::{Genome, PerturbStdev};
pub use innovation::InnovationRegistry;
pub use population::{Population, PopulationStats};
pub use species::{Representative, Species};
