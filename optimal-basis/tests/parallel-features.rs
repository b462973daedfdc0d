use std::num::NonZeroUsize;

use serde_json::json;

use optimal_basis::{Calculator, Error, Hypers, Representation};
use optimal_basis::{features_in_parallel, features_by_species_in_parallel};
use optimal_basis::{ParallelOptions, WorkerCount};
use optimal_basis::calculators::DummyExpansion;
use optimal_basis::systems::test_utils::{test_systems, TEST_SPECIES};

fn hypers() -> Hypers {
    Hypers::try_from(json!({
        "max_radial": 4,
        "max_angular": 2,
        "cutoff": 3.5,
        "species": TEST_SPECIES,
    })).unwrap()
}

fn options(chunk_size: usize, n_workers: usize) -> ParallelOptions {
    ParallelOptions {
        chunk_size: chunk_size,
        n_workers: WorkerCount::Exactly(NonZeroUsize::new(n_workers).unwrap()),
    }
}

#[test]
fn flat_features_do_not_depend_on_chunks() {
    let systems = test_systems(23);

    let mut calculator = DummyExpansion::new(&hypers()).unwrap();
    let refs = systems.iter().collect::<Vec<_>>();
    let reference = calculator.compute(&refs).unwrap().features();

    for &chunk_size in &[1, 4, 7, 23, 50] {
        for &n_workers in &[1, 3] {
            let features = features_in_parallel::<DummyExpansion>(
                &systems, &hypers(), options(chunk_size, n_workers)
            ).unwrap();
            assert_eq!(features, reference, "chunk_size={}, n_workers={}", chunk_size, n_workers);
        }
    }

    let features = features_in_parallel::<DummyExpansion>(&systems, &hypers(), Default::default()).unwrap();
    assert_eq!(features, reference);
}

#[test]
fn features_by_species_do_not_depend_on_chunks() {
    let systems = test_systems(17);

    let mut calculator = DummyExpansion::new(&hypers()).unwrap();
    let refs = systems.iter().collect::<Vec<_>>();
    let reference = calculator.compute(&refs).unwrap().features_by_species();

    for &chunk_size in &[1, 2, 5, 17] {
        let features = features_by_species_in_parallel::<DummyExpansion>(
            &systems, &hypers(), options(chunk_size, 4)
        ).unwrap();

        assert_eq!(features.keys().collect::<Vec<_>>(), reference.keys().collect::<Vec<_>>());
        for (species, values) in &reference {
            assert_eq!(&features[species], values, "species={}, chunk_size={}", species, chunk_size);
        }
    }
}

#[test]
fn empty_structures() {
    let error = features_in_parallel::<DummyExpansion>(&[], &hypers(), Default::default()).unwrap_err();
    assert_eq!(
        error.to_string(),
        "invalid parameter: can not compute features for an empty list of structures"
    );
}

#[test]
fn zero_chunk_size() {
    let systems = test_systems(3);
    let options = ParallelOptions { chunk_size: 0, ..Default::default() };
    let error = features_in_parallel::<DummyExpansion>(&systems, &hypers(), options).unwrap_err();
    assert_eq!(error.to_string(), "invalid parameter: chunk size must be a positive integer, got 0");
}

#[test]
fn calculator_errors() {
    let systems = test_systems(6);

    // invalid hyper-parameters, creating the calculator fails in all workers
    let mut invalid = hypers();
    invalid.insert("soap_type", "PowerSpectrum");
    let error = features_in_parallel::<DummyExpansion>(&systems, &invalid, options(2, 2)).unwrap_err();
    assert!(matches!(error, Error::Json(_)));

    // only one of the chunks contains an unknown species
    let mut systems = systems;
    systems[5].add_atom(26, [0.0, 0.0, 0.0]);
    let error = features_by_species_in_parallel::<DummyExpansion>(&systems, &hypers(), options(2, 2)).unwrap_err();
    assert_eq!(
        error.to_string(),
        "invalid parameter: species 26 is not part of the species of this calculator ([1, 6, 8])"
    );
}

#[test]
fn worker_panic() {
    let systems = test_systems(4);

    let mut panicking = hypers();
    panicking.insert("name", "panic-test: oops");
    let error = features_in_parallel::<DummyExpansion>(&systems, &panicking, options(1, 2)).unwrap_err();
    match error {
        Error::Panic(message) => assert_eq!(message, "panic-test: oops"),
        other => panic!("expected a panic error, got {}", other),
    }
}

/// Calculator returning a different set of species depending on the structures
struct InconsistentSpecies;

struct InconsistentOutput(Vec<i32>);

impl Representation for InconsistentOutput {
    fn features(&self) -> ndarray::Array2<f64> {
        ndarray::Array2::zeros((self.0.len(), 1))
    }

    fn features_by_species(&self) -> optimal_basis::SpeciesFeatures {
        self.0.iter().map(|&species| (species, ndarray::Array2::zeros((1, 1)))).collect()
    }
}

impl Calculator for InconsistentSpecies {
    type Structure = i32;
    type Output = InconsistentOutput;

    fn new(_: &Hypers) -> Result<Self, Error> {
        Ok(InconsistentSpecies)
    }

    fn compute(&mut self, structures: &[&i32]) -> Result<InconsistentOutput, Error> {
        Ok(InconsistentOutput(structures.iter().map(|&&s| s).collect()))
    }
}

#[test]
fn inconsistent_species() {
    let structures = [1, 8, 1, 6];
    let error = features_by_species_in_parallel::<InconsistentSpecies>(
        &structures, &Hypers::new(), options(2, 2)
    ).unwrap_err();
    assert_eq!(
        error.to_string(),
        "invalid parameter: chunk 1 contains features for species [1, 6], but the first chunk contains species [1, 8]"
    );

    // flat features are fine
    let features = features_in_parallel::<InconsistentSpecies>(&structures, &Hypers::new(), options(2, 2)).unwrap();
    assert_eq!(features.shape(), [4, 1]);
}
