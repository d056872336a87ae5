use criterion::Criterion;
use neat_rsu::random::seeded_rng;
use rand::RngCore;

fn bench_wyrng(bench: &mut Criterion) {
    let mut rng = seeded_rng(0xC0FFEE);
    bench.bench_function("wyrng-next-u64", |b| b.iter(|| rng.next_u64()));
}

pub fn benches() {
    let mut criterion = Criterion::default().sample_size(1000).significance_level(0.1);
    bench_wyrng(&mut criterion);
}

fn main() {
    benches();
    criterion::Criterion::default()
        .configure_from_args()
        .final_summary();
}
