use criterion::Criterion;
use neat_rsu::{random::seeded_rng, Config, Genome, InnovationRegistry, Population};

fn flat_generation(size: usize, registry: &mut InnovationRegistry) -> Vec<Genome> {
    (0..size as u64)
        .map(|id| {
            let mut rng = seeded_rng(id + 1);
            let mut g = Genome::new(id, 6, 1, registry);
            for _ in 0..(id % 7) {
                g.mutate_add_connection(&mut rng, registry);
                g.mutate_add_node(&mut rng, registry);
            }
            g
        })
        .collect()
}

fn bench_speciate(bench: &mut Criterion) {
    let config = Config::default();
    let mut registry = InnovationRegistry::new(0);
    let genomes = flat_generation(150, &mut registry);

    bench.bench_function("speciate-150", |b| {
        b.iter_batched(
            || {
                let mut reg = InnovationRegistry::new(registry.head());
                (
                    Population::new(6, 1, 1, config.compat_threshold, &mut reg),
                    genomes.clone(),
                )
            },
            |(mut population, genomes)| population.speciate(genomes, &config),
            criterion::BatchSize::SmallInput,
        )
    });
}

pub fn benches() {
    let mut criterion = Criterion::default().sample_size(200).significance_level(0.1);
    bench_speciate(&mut criterion);
}

fn main() {
    benches();
    criterion::Criterion::default()
        .configure_from_args()
        .final_summary();
}
