use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use hifitime::Epoch;
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use eddytrack::config::EddyConfig;
use eddytrack::constants::RADEG;
use eddytrack::grid::GridField;
use eddytrack::pipeline::EddyTracker;

/// 20 × 15 degree regional frame at 0.25 degree with `eddies` random Gaussian eddies.
fn regional_frame(eddies: usize, rng: &mut StdRng) -> GridField {
    let (nx, ny) = (81, 61);
    let lon: Vec<f64> = (0..nx).map(|i| -30.0 + i as f64 * 0.25).collect();
    let lat: Vec<f64> = (0..ny).map(|j| 25.0 + j as f64 * 0.25).collect();
    let bumps: Vec<(f64, f64, f64)> = (0..eddies)
        .map(|_| {
            let sign = if rng.random::<bool>() { 1.0 } else { -1.0 };
            (
                rng.random_range(-28.0..-12.0),
                rng.random_range(27.0..38.0),
                sign * rng.random_range(5.0..25.0),
            )
        })
        .collect();
    let values = DMatrix::from_fn(nx, ny, |i, j| {
        bumps
            .iter()
            .map(|&(x, y, a)| {
                let dx = (lon[i] - x) * (y * RADEG).cos();
                let d2 = dx * dx + (lat[j] - y).powi(2);
                a * (-d2 / 0.72).exp()
            })
            .sum::<f64>()
            + rng.random_range(-0.2..0.2)
    });
    GridField::new(lon, lat, values, DMatrix::from_element(nx, ny, false), f64::NAN).unwrap()
}

fn bench_identify(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xEDD1E5);
    let config = EddyConfig::builder()
        .radius_bounds(0.3, 3.0)
        .build()
        .unwrap();
    let tracker = EddyTracker::new(config);
    let epoch = Epoch::from_mjd_utc(58_000.0);

    c.bench_function("identify_frame/regional_12_eddies", |b| {
        b.iter_batched(
            || regional_frame(12, &mut rng),
            |grid| {
                let eddies = tracker.identify_grid(black_box(grid), epoch).unwrap();
                black_box(eddies.len())
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = bench_identify
);
criterion_main!(benches);
