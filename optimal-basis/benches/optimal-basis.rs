#![allow(clippy::needless_return)]

use optimal_basis::{optimal_radial_basis_hypers, Frames, Hypers, OptimizerOptions};
use optimal_basis::calculators::DummyExpansion;
use optimal_basis::systems::test_utils::{test_systems, TEST_SPECIES};

use criterion::{BenchmarkGroup, Criterion, measurement::WallTime, SamplingMode};
use criterion::{black_box, criterion_group, criterion_main};

fn run_optimal_basis(mut group: BenchmarkGroup<WallTime>, n_batches: usize, test_mode: bool) {
    let n_systems = if test_mode { 3 } else { 60 };
    let batches = (0..n_batches).map(|_| test_systems(n_systems)).collect::<Vec<_>>();

    for &max_radial in black_box(&[4, 8]) {
        let hypers = Hypers::try_from(serde_json::json!({
            "max_radial": max_radial,
            "max_angular": 4,
            "cutoff": 4.0,
            "species": TEST_SPECIES,
            "normalize": true,
            "soap_type": "PowerSpectrum",
        })).unwrap();

        group.bench_function(&format!("max_radial = {}", max_radial), |b| b.iter(|| {
            optimal_radial_basis_hypers::<DummyExpansion>(
                &hypers, Frames::Batches(&batches), OptimizerOptions::default()
            ).unwrap()
        }));
    }
}

fn optimal_basis(c: &mut Criterion) {
    let test_mode = std::env::args().any(|arg| arg == "--test");

    let mut group = c.benchmark_group("Optimal radial basis/single batch");
    group.noise_threshold(0.05);
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(10);

    run_optimal_basis(group, 1, test_mode);

    let mut group = c.benchmark_group("Optimal radial basis/4 batches");
    group.noise_threshold(0.05);
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(10);

    run_optimal_basis(group, 4, test_mode);

    if !test_mode {
        time_graph::enable_data_collection(true);
        let hypers = Hypers::try_from(serde_json::json!({
            "max_radial": 6,
            "max_angular": 4,
            "cutoff": 4.0,
            "species": TEST_SPECIES,
        })).unwrap();
        let systems = test_systems(60);
        optimal_radial_basis_hypers::<DummyExpansion>(
            &hypers, Frames::Single(&systems), OptimizerOptions::default()
        ).unwrap();
        println!("{}", time_graph::get_full_graph().as_table());
        time_graph::enable_data_collection(false);
    }
}

criterion_group!(all, optimal_basis);
criterion_main!(all);
