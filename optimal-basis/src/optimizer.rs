use ndarray::Zip;

use log::{info, warn};

use crate::calculator::{Calculator, Representation};
use crate::parallel::{features_by_species_in_parallel, ParallelOptions};
use crate::pca::{BasisReduction, RadialBasisPca, RadialCovariance};
use crate::{Error, Hypers};

/// Structures used to estimate the optimal radial basis
#[derive(Debug)]
pub enum Frames<'a, S> {
    /// A single list of structures
    Single(&'a [S]),
    /// Structures split in multiple batches. The covariance is computed
    /// separately for each batch, and accumulated.
    Batches(&'a [Vec<S>]),
}

impl<'a, S> Frames<'a, S> {
    /// Get the structures as a list of batches
    pub fn batches(&self) -> Vec<&'a [S]> {
        match *self {
            Frames::Single(structures) => vec![structures],
            Frames::Batches(batches) => batches.iter().map(Vec::as_slice).collect(),
        }
    }

    /// Total number of structures
    pub fn len(&self) -> usize {
        match *self {
            Frames::Single(structures) => structures.len(),
            Frames::Batches(batches) => batches.iter().map(Vec::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Options for the radial basis optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(serde::Serialize, serde::Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct OptimizerOptions {
    /// Number of radial basis functions used for the intermediate spherical
    /// expansion. Defaults to twice the `max_radial` of the hyper-parameters.
    #[serde(default)]
    pub expanded_max_radial: Option<usize>,
    /// Parallelization options for the first batch of structures
    #[serde(default)]
    pub parallel: ParallelOptions,
}

/// Running average of the radial covariance over batches of structures
#[derive(Debug, Clone)]
pub struct CovarianceAccumulator {
    covariance: RadialCovariance,
    n_structures: usize,
}

impl CovarianceAccumulator {
    /// Start accumulating from the `covariance` of `n_structures` structures.
    /// The species in this initial covariance are the only ones accumulated.
    pub fn new(covariance: RadialCovariance, n_structures: usize) -> CovarianceAccumulator {
        CovarianceAccumulator { covariance, n_structures }
    }

    /// Add the `covariance` of a new batch of `n_structures` structures to the
    /// running average.
    ///
    /// Both the current average and the new covariance are weighted by their
    /// number of structures. Nothing is modified if this function returns an
    /// error.
    pub fn add(&mut self, covariance: &RadialCovariance, n_structures: usize) -> Result<(), Error> {
        if n_structures == 0 {
            return Ok(());
        }

        for (species, current) in &self.covariance {
            let batch = covariance.get(species).ok_or_else(|| Error::InvalidParameter(format!(
                "missing covariance for species {} in the new batch", species
            )))?;

            if batch.dim() != current.dim() {
                return Err(Error::InvalidParameter(format!(
                    "covariance for species {} has shape {:?} in the new batch, expected {:?}",
                    species, batch.shape(), current.shape()
                )));
            }
        }

        for species in covariance.keys() {
            if !self.covariance.contains_key(species) {
                warn!("ignoring covariance for species {} which was not present in the first batch", species);
            }
        }

        let previous = self.n_structures as f64;
        let new = n_structures as f64;
        let total = previous + new;
        for (species, current) in &mut self.covariance {
            Zip::from(current).and(&covariance[species]).for_each(|value, &batch| {
                *value = (*value * previous + batch * new) / total;
            });
        }
        self.n_structures += n_structures;

        Ok(())
    }

    /// Number of structures included in the covariance
    pub fn n_structures(&self) -> usize {
        self.n_structures
    }

    pub fn covariance(&self) -> &RadialCovariance {
        &self.covariance
    }

    pub fn into_covariance(self) -> RadialCovariance {
        self.covariance
    }
}

/// Compute an optimal radial basis following Goscinski et al,
/// arXiv:2105.08717, using calculators of type `C` to compute the spherical
/// expansion.
///
/// `hypers` are the hyper-parameters of the desired representation, and
/// `max_radial` in there indicates the size of the optimal basis. The
/// covariance is estimated from `frames`, incrementally if they are given as
/// multiple batches. Only the first batch is computed in parallel.
///
/// The returned hyper-parameters are a copy of `hypers`, containing the
/// projection matrices in `optimization.RadialDimReduction`.
#[time_graph::instrument(name = "optimal_radial_basis_hypers")]
pub fn optimal_radial_basis_hypers<C: Calculator>(
    hypers: &Hypers,
    frames: Frames<'_, C::Structure>,
    options: OptimizerOptions,
) -> Result<Hypers, Error> {
    optimal_radial_basis_hypers_with::<C, _>(hypers, frames, options, &RadialBasisPca)
}

/// Same as [`optimal_radial_basis_hypers`], using a custom `reduction` to go
/// from features to projection matrices.
pub fn optimal_radial_basis_hypers_with<C: Calculator, R: BasisReduction>(
    hypers: &Hypers,
    frames: Frames<'_, C::Structure>,
    options: OptimizerOptions,
    reduction: &R,
) -> Result<Hypers, Error> {
    let max_radial = hypers.max_radial()?;
    let expansion_hypers = hypers.spherical_expansion(options.expanded_max_radial)?;

    let batches = frames.batches();
    let (first, others) = match batches.split_first() {
        Some((first, others)) => (*first, others),
        None => {
            return Err(Error::InvalidParameter(
                "can not optimize the radial basis without any structures".into()
            ));
        }
    };

    info!(
        "optimizing radial basis from {} structures in {} batches, with {} intermediate radial functions",
        frames.len(), batches.len(), expansion_hypers.max_radial()?
    );

    let features = features_by_species_in_parallel::<C>(first, &expansion_hypers, options.parallel)?;
    let covariance = reduction.covariance(&expansion_hypers, &features)?;
    let mut accumulator = CovarianceAccumulator::new(covariance, first.len());

    if !others.is_empty() {
        let mut calculator = C::new(&expansion_hypers)?;
        for (batch_i, batch) in others.iter().enumerate() {
            if batch.is_empty() {
                warn!("skipping empty batch {} of structures", batch_i + 1);
                continue;
            }

            let structures = batch.iter().collect::<Vec<_>>();
            let features = calculator.compute(&structures)?.features_by_species();
            let covariance = reduction.covariance(&expansion_hypers, &features)?;
            accumulator.add(&covariance, batch.len())?;
        }
    }

    let pca = reduction.pca(accumulator.covariance())?;
    let projections = reduction.projections(&pca, max_radial)?;

    return hypers.with_radial_projections(&projections);
}
