use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use eddytrack::contour::extraction::extract;
use eddytrack::grid::GridField;

/// Square grid of `n × n` cells at 0.25 degree with random Gaussian eddies and noise.
fn random_grid(n: usize, eddies: usize, rng: &mut StdRng) -> GridField {
    let lon: Vec<f64> = (0..n).map(|i| i as f64 * 0.25).collect();
    let lat: Vec<f64> = (0..n).map(|j| -20.0 + j as f64 * 0.25).collect();
    let span = (n - 1) as f64 * 0.25;
    let bumps: Vec<(f64, f64, f64)> = (0..eddies)
        .map(|_| {
            (
                rng.random_range(0.0..span),
                rng.random_range(-20.0..-20.0 + span),
                rng.random_range(-25.0..25.0),
            )
        })
        .collect();
    let values = DMatrix::from_fn(n, n, |i, j| {
        let bump: f64 = bumps
            .iter()
            .map(|&(x, y, a)| {
                let d2 = (lon[i] - x).powi(2) + (lat[j] - y).powi(2);
                a * (-d2 / 0.72).exp()
            })
            .sum();
        bump + rng.random_range(-0.5..0.5)
    });
    GridField::new(lon, lat, values, DMatrix::from_element(n, n, false), f64::NAN).unwrap()
}

fn bench_extract_all_levels(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let levels: Vec<f64> = (-30..=30).map(f64::from).collect();

    let mut group = c.benchmark_group("contour_extraction");
    for n in [64usize, 128, 256] {
        let grid = random_grid(n, n / 8, &mut rng);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &grid, |b, grid| {
            b.iter(|| {
                let count: usize = extract(black_box(grid), levels.clone(), 0)
                    .map(|(_, contours)| contours.len())
                    .sum();
                black_box(count)
            })
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(20);
    targets = bench_extract_all_levels
);
criterion_main!(benches);
