use criterion::Criterion;
use neat_rsu::{crossover::mate_genomes, random::seeded_rng, Genome, InnovationRegistry};

fn divergent_genome(id: u64, registry: &mut InnovationRegistry) -> Genome {
    let mut rng = seeded_rng(id.wrapping_mul(31) + 1);
    let mut g = Genome::new(id, 6, 1, registry);
    for _ in 0..100 {
        g.mutate_add_connection(&mut rng, registry);
        g.mutate_add_node(&mut rng, registry);
    }
    g
}

fn bench_crossover(bench: &mut Criterion) {
    let mut registry = InnovationRegistry::new(0);
    let mut fitter = divergent_genome(0, &mut registry);
    let mut other = divergent_genome(1, &mut registry);
    fitter.set_fitness(10.0);
    other.set_fitness(1.0);

    let mut rng = seeded_rng(99);
    bench.bench_function("crossover-divergent", |b| {
        b.iter(|| mate_genomes(&fitter, &other, 2, &mut rng, 0.75))
    });
}

pub fn benches() {
    let mut criterion = Criterion::default().sample_size(500).significance_level(0.1);
    bench_crossover(&mut criterion);
}

fn main() {
    benches();
    criterion::Criterion::default()
        .configure_from_args()
        .final_summary();
}
