use std::collections::BTreeMap;

use ndarray::Array2;

use crate::{Error, Hypers};

/// Identifier of an atomic species, usually the atomic number
pub type Species = i32;

/// Features split by species, with one array (environments x properties) per
/// species
pub type SpeciesFeatures = BTreeMap<Species, Array2<f64>>;

/// The result of running a [`Calculator`] on a set of structures
pub trait Representation {
    /// Get all the features in a single array, with one row per environment
    fn features(&self) -> Array2<f64>;

    /// Get the features separated by species of the central atom
    fn features_by_species(&self) -> SpeciesFeatures;
}

/// A `Calculator` computes a representation for a list of structures.
///
/// Calculators are created from a set of hyper-parameters. When running in
/// parallel, each worker creates its own calculator from the same
/// hyper-parameters, so calculators don't need to be `Send` or `Sync`.
pub trait Calculator: Sized {
    /// Type of the atomic structures this calculator knows how to handle
    type Structure: Sync;
    /// Type of the representation returned by `compute`
    type Output: Representation + Send;

    /// Create a new calculator with the given hyper-parameters
    fn new(hypers: &Hypers) -> Result<Self, Error>;

    /// Compute the representation of all the given `structures`. The rows of
    /// the output must follow the order of `structures`.
    fn compute(&mut self, structures: &[&Self::Structure]) -> Result<Self::Output, Error>;
}
