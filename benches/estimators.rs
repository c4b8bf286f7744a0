use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::{Array1, Array2};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use infer_viz::stats::{
    occupancy_matrix, weighted_histogram, weighted_histogram_2d, PAIR_BINS, PAIR_RANGE,
    SCALAR_BINS,
};
use infer_viz::weights::normalize_log_weights;

const N: usize = 100_000;

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(42);
    let log_w: Vec<f64> = (0..N).map(|_| rng.gen_range(-20.0..0.0)).collect();
    let values = Array1::from_shape_fn(N, |_| rng.gen_range(-3.0..3.0));
    let pairs = Array2::from_shape_fn((N, 2), |_| rng.gen_range(-6.0..6.0));
    let states = Array2::from_shape_fn((N / 100, 50), |_| rng.gen_range(0..4usize));

    c.bench_function("Normalize log weights", |b| {
        b.iter(|| normalize_log_weights(black_box(Some(&log_w[..])), N))
    });

    let Ok(weights) = normalize_log_weights(Some(&log_w), N) else {
        return;
    };
    c.bench_function("Weighted histogram", |b| {
        b.iter(|| weighted_histogram(black_box(values.view()), weights.view(), SCALAR_BINS))
    });
    c.bench_function("Weighted 2-D histogram", |b| {
        b.iter(|| {
            weighted_histogram_2d(
                black_box(pairs.view()),
                weights.view(),
                PAIR_BINS,
                [PAIR_RANGE, PAIR_RANGE],
            )
        })
    });

    let path_weights = Array1::from_elem(N / 100, 100.0 / N as f64);
    c.bench_function("Occupancy matrix", |b| {
        b.iter(|| occupancy_matrix(black_box(states.view()), path_weights.view()))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
