//! Estimation of the optimal radial basis from the covariance of spherical
//! expansion coefficients, following Goscinski et al, arXiv:2105.08717.
//!
//! The spherical expansion features for a given species are expected to be
//! stored with one row per environment, and properties ordered as `n` (radial
//! index) major, then `l`, then `m`, i.e. the coefficient `c_{nlm}` is in
//! column `n * (max_angular + 1)^2 + l^2 + (l + m)`.

use std::collections::BTreeMap;

use ndarray::{s, Array2, Array3, Axis};

use crate::math::SymmetricEigen;
use crate::{Error, Hypers, Species, SpeciesFeatures};

/// Covariance of the radial basis, for each species. Each array has shape
/// `(max_angular + 1, max_radial, max_radial)`, containing one covariance
/// matrix for each angular channel `l`.
pub type RadialCovariance = BTreeMap<Species, Array3<f64>>;

/// Principal components of the radial covariance
#[derive(Debug, Clone, Default)]
pub struct RadialPca {
    /// Eigenvalues of the covariance, in decreasing order. Each array has
    /// shape `(max_angular + 1, max_radial)`
    pub eigenvalues: BTreeMap<Species, Array2<f64>>,
    /// Eigenvectors of the covariance. Each array has shape `(max_angular + 1,
    /// max_radial, max_radial)`, with `eigenvectors[s][[l, .., k]]` the
    /// eigenvector associated with `eigenvalues[s][[l, k]]`.
    pub eigenvectors: BTreeMap<Species, Array3<f64>>,
}

/// Projection matrices from the expanded radial basis to the optimal one.
///
/// For each species, the array has shape `(max_angular + 1, max_radial,
/// expanded_max_radial)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RadialProjections(BTreeMap<Species, Array3<f64>>);

impl RadialProjections {
    pub fn new() -> RadialProjections {
        RadialProjections(BTreeMap::new())
    }

    pub fn insert(&mut self, species: Species, projection: Array3<f64>) -> Option<Array3<f64>> {
        self.0.insert(species, projection)
    }

    pub fn get(&self, species: Species) -> Option<&Array3<f64>> {
        self.0.get(&species)
    }

    pub fn species(&self) -> impl Iterator<Item = Species> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert the projections to the format used in hyper-parameters: a JSON
    /// object with one entry for each species, containing one matrix (as a
    /// list of rows) for each angular channel.
    pub fn to_json(&self) -> Result<serde_json::Value, Error> {
        let mut json = serde_json::Map::new();
        for (species, projection) in &self.0 {
            let matrices = projection.outer_iter()
                .map(|matrix| matrix.outer_iter().map(|row| row.to_vec()).collect::<Vec<_>>())
                .collect::<Vec<_>>();
            json.insert(species.to_string(), serde_json::to_value(matrices)?);
        }
        return Ok(serde_json::Value::Object(json));
    }
}

/// Strategy used to go from spherical expansion features to radial basis
/// projections. The optimizer only goes through this trait, making it possible
/// to replace the default implementation ([`RadialBasisPca`]).
pub trait BasisReduction {
    /// Compute the radial covariance of `features`, created by a calculator
    /// with the given `hypers`
    fn covariance(&self, hypers: &Hypers, features: &SpeciesFeatures) -> Result<RadialCovariance, Error>;

    /// Get the principal components of the `covariance`
    fn pca(&self, covariance: &RadialCovariance) -> Result<RadialPca, Error>;

    /// Build the projection matrices onto the first `max_radial` principal
    /// components
    fn projections(&self, pca: &RadialPca, max_radial: usize) -> Result<RadialProjections, Error>;
}

/// Default implementation of [`BasisReduction`], using the functions in this
/// module.
#[derive(Debug, Clone, Copy, Default)]
pub struct RadialBasisPca;

impl BasisReduction for RadialBasisPca {
    fn covariance(&self, hypers: &Hypers, features: &SpeciesFeatures) -> Result<RadialCovariance, Error> {
        radial_basis_covariance(hypers, features)
    }

    fn pca(&self, covariance: &RadialCovariance) -> Result<RadialPca, Error> {
        radial_basis_pca(covariance)
    }

    fn projections(&self, pca: &RadialPca, max_radial: usize) -> Result<RadialProjections, Error> {
        radial_basis_projections(pca, max_radial)
    }
}

/// Compute the covariance of the radial basis for each species and angular
/// channel, averaged over all environments:
///
/// $$ C^l_{nn'} = \frac{1}{N_{env}} \sum_{i} \sum_m c^i_{nlm} c^i_{n'lm} $$
///
/// `max_radial` and `max_angular` are taken from `hypers`, which should be
/// the hyper-parameters used to compute the features.
pub fn radial_basis_covariance(hypers: &Hypers, features: &SpeciesFeatures) -> Result<RadialCovariance, Error> {
    let max_radial = hypers.max_radial()?;
    let n_angular = hypers.max_angular()? + 1;
    let n_lm = n_angular * n_angular;

    let mut covariance = RadialCovariance::new();
    for (&species, values) in features {
        let n_environments = values.nrows();
        if n_environments == 0 {
            return Err(Error::InvalidParameter(format!(
                "there are no environments for species {} in the features", species
            )));
        }

        if values.ncols() != max_radial * n_lm {
            return Err(Error::InvalidParameter(format!(
                "expected {} properties for species {} with max_radial={} and max_angular={}, got {}",
                max_radial * n_lm, species, max_radial, n_angular - 1, values.ncols()
            )));
        }

        let values = values.to_shape((n_environments, max_radial, n_lm))?;
        let mut species_covariance = Array3::zeros((n_angular, max_radial, max_radial));
        for (l, mut covariance_l) in species_covariance.axis_iter_mut(Axis(0)).enumerate() {
            let n_m = 2 * l + 1;
            // (environment, n, m) => (n, environment x m)
            let values_l = values.slice(s![.., .., (l * l)..(l * l + n_m)]).permuted_axes([1, 0, 2]);
            let values_l = values_l.to_shape((max_radial, n_environments * n_m))?;

            covariance_l.assign(&values_l.dot(&values_l.t()));
            covariance_l /= n_environments as f64;
        }

        covariance.insert(species, species_covariance);
    }

    log::debug!("computed radial covariance for {} species", covariance.len());
    return Ok(covariance);
}

/// Diagonalize the covariance matrices of each species and angular channel
pub fn radial_basis_pca(covariance: &RadialCovariance) -> Result<RadialPca, Error> {
    let mut pca = RadialPca::default();
    for (&species, species_covariance) in covariance {
        let (n_angular, n_radial, n_radial_2) = species_covariance.dim();
        if n_radial != n_radial_2 {
            return Err(Error::InvalidParameter(format!(
                "covariance matrices for species {} must be square, got {}x{}",
                species, n_radial, n_radial_2
            )));
        }

        let mut eigenvalues = Array2::zeros((n_angular, n_radial));
        let mut eigenvectors = Array3::zeros((n_angular, n_radial, n_radial));
        for (l, covariance_l) in species_covariance.outer_iter().enumerate() {
            // remove rounding errors breaking the symmetry
            let symmetric = (&covariance_l + &covariance_l.t()) / 2.0;
            let eigen = SymmetricEigen::new(symmetric.view())?;

            eigenvalues.row_mut(l).assign(&eigen.eigenvalues);
            eigenvectors.index_axis_mut(Axis(0), l).assign(&eigen.eigenvectors);
        }

        pca.eigenvalues.insert(species, eigenvalues);
        pca.eigenvectors.insert(species, eigenvectors);
    }

    return Ok(pca);
}

/// Create the projection matrices onto the `max_radial` principal components
/// with the largest eigenvalues
pub fn radial_basis_projections(pca: &RadialPca, max_radial: usize) -> Result<RadialProjections, Error> {
    if max_radial == 0 {
        return Err(Error::InvalidParameter("max_radial must be at least 1".into()));
    }

    let mut projections = RadialProjections::new();
    for (&species, eigenvectors) in &pca.eigenvectors {
        let expanded_max_radial = eigenvectors.dim().2;
        if max_radial > expanded_max_radial {
            return Err(Error::InvalidParameter(format!(
                "can not project {} radial basis functions onto {} for species {}",
                expanded_max_radial, max_radial, species
            )));
        }

        let projection = eigenvectors.slice(s![.., .., ..max_radial])
            .permuted_axes([0, 2, 1])
            .as_standard_layout()
            .into_owned();

        projections.insert(species, projection);
    }

    return Ok(projections);
}
