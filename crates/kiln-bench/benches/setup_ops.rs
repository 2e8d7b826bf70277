//! Criterion benchmarks for grid preparation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kiln_bench::{library, precursors, prepared_state, reference_profile};
use kiln_setup::random_noise;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Benchmark: nucleation, growth and tuning of a 10³ grid.
fn bench_prepare_1k(c: &mut Criterion) {
    let config = reference_profile(5);

    let mut group = c.benchmark_group("prepare");
    group.sample_size(20);
    group.bench_function("prepare_1k", |b| {
        b.iter(|| black_box(prepared_state(&config).unwrap().site_count()));
    });
    group.finish();
}

/// Benchmark: random-noise scattering of a 20³ grid.
fn bench_random_noise_8k(c: &mut Criterion) {
    let lib = library();
    let ratios = precursors();
    let mut rng = ChaCha8Rng::seed_from_u64(5);

    c.bench_function("random_noise_8k", |b| {
        b.iter(|| {
            let state = random_noise(lib.phases(), &ratios, 20, 0.97, &mut rng).unwrap();
            black_box(state.site_count())
        });
    });
}

criterion_group!(benches, bench_prepare_1k, bench_random_noise_8k);
criterion_main!(benches);
