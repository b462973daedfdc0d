use ndarray::{Array2, Axis};

use crate::calculator::{Calculator, Representation};
use crate::systems::SimpleSystem;
use crate::{Error, Hypers, Species, SpeciesFeatures};

/// Hyper-parameters for [`DummyExpansion`]
#[derive(Debug, Clone)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DummyExpansionParameters {
    /// Number of radial channels
    pub max_radial: usize,
    /// Maximal angular channel
    pub max_angular: usize,
    /// Spherical cutoff for atomic environments
    pub cutoff: f64,
    /// All the species that can appear in the structures
    pub species: Vec<Species>,
    /// Unused name parameter. Names containing `panic-test:` make the
    /// calculation panic.
    #[serde(default)]
    pub name: String,
    /// Accepted and ignored, to allow passing the hyper-parameters of an
    /// optimized representation
    #[serde(default)]
    pub optimization: Option<serde_json::Value>,
}

/// A fake spherical expansion, used to test the parallel feature extraction
/// and the radial basis optimization without an actual descriptor library.
///
/// Each atom is a center, and its features are smooth functions of the
/// positions of the neighbors within the cutoff, laid out as `n` major, then
/// `l` and `m`. The features are deterministic and independent of the other
/// structures passed in the same call.
#[doc(hidden)]
#[derive(Debug, Clone)]
pub struct DummyExpansion {
    parameters: DummyExpansionParameters,
}

/// Output of [`DummyExpansion`]
#[doc(hidden)]
#[derive(Debug, Clone)]
pub struct DummyExpansionOutput {
    /// all species known by the calculator, sorted
    species: Vec<Species>,
    /// species of the center for each row of `values`
    centers: Vec<Species>,
    values: Array2<f64>,
}

impl Representation for DummyExpansionOutput {
    fn features(&self) -> Array2<f64> {
        self.values.clone()
    }

    fn features_by_species(&self) -> SpeciesFeatures {
        let mut features = SpeciesFeatures::new();
        for &species in &self.species {
            let rows = self.centers.iter()
                .enumerate()
                .filter(|&(_, &center)| center == species)
                .map(|(i, _)| i)
                .collect::<Vec<_>>();
            features.insert(species, self.values.select(Axis(0), &rows));
        }
        return features;
    }
}

impl DummyExpansion {
    pub fn parameters(&self) -> &DummyExpansionParameters {
        &self.parameters
    }

    fn n_properties(&self) -> usize {
        let n_angular = self.parameters.max_angular + 1;
        self.parameters.max_radial * n_angular * n_angular
    }

    fn radial(&self, n: usize, distance: f64) -> f64 {
        let cutoff = self.parameters.cutoff;
        let center = n as f64 * cutoff / self.parameters.max_radial as f64;
        let smooth_cutoff = (1.0 - distance / cutoff).powi(2);
        f64::exp(-(distance - center).powi(2)) * smooth_cutoff
    }

    fn angular(l: usize, m: isize, direction: [f64; 3]) -> f64 {
        let phi = f64::atan2(direction[1], direction[0]);
        let polar = direction[2].powi(l as i32);
        if m >= 0 {
            polar * f64::cos(m as f64 * phi)
        } else {
            polar * f64::sin(-m as f64 * phi)
        }
    }

    fn compute_system(&self, system: &SimpleSystem, values: &mut Array2<f64>, first_row: usize) {
        let n_angular = self.parameters.max_angular + 1;
        let n_lm = n_angular * n_angular;

        for center in 0..system.size() {
            let mut row = values.row_mut(first_row + center);
            for n in 0..self.parameters.max_radial {
                // contribution of the central atom
                row[n * n_lm] += self.radial(n, 0.0);
            }

            for neighbor in 0..system.size() {
                if neighbor == center {
                    continue;
                }

                let vector = system.vector(center, neighbor);
                let distance = f64::sqrt(vector.iter().map(|v| v * v).sum());
                if distance >= self.parameters.cutoff {
                    continue;
                }

                let direction = [vector[0] / distance, vector[1] / distance, vector[2] / distance];
                let weight = 1.0 + 0.1 * f64::from(system.species()[neighbor]).abs().sqrt();
                for n in 0..self.parameters.max_radial {
                    let radial = weight * self.radial(n, distance);
                    for l in 0..n_angular {
                        for m in -(l as isize)..=(l as isize) {
                            let lm = l * l + (l as isize + m) as usize;
                            row[n * n_lm + lm] += radial * DummyExpansion::angular(l, m, direction);
                        }
                    }
                }
            }
        }
    }
}

impl Calculator for DummyExpansion {
    type Structure = SimpleSystem;
    type Output = DummyExpansionOutput;

    fn new(hypers: &Hypers) -> Result<DummyExpansion, Error> {
        let mut parameters = hypers.parse::<DummyExpansionParameters>()?;

        if parameters.max_radial == 0 {
            return Err(Error::InvalidParameter("max_radial must be at least 1".into()));
        }

        if !(parameters.cutoff.is_finite() && parameters.cutoff > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "cutoff must be a positive number, got {}", parameters.cutoff
            )));
        }

        if parameters.species.is_empty() {
            return Err(Error::InvalidParameter("species can not be empty".into()));
        }

        parameters.species.sort_unstable();
        parameters.species.dedup();

        Ok(DummyExpansion { parameters })
    }

    fn compute(&mut self, structures: &[&SimpleSystem]) -> Result<DummyExpansionOutput, Error> {
        if self.parameters.name.contains("panic-test:") {
            panic!("{}", self.parameters.name);
        }

        let mut centers = Vec::new();
        for system in structures {
            for species in system.species() {
                if self.parameters.species.binary_search(species).is_err() {
                    return Err(Error::InvalidParameter(format!(
                        "species {} is not part of the species of this calculator ({:?})",
                        species, self.parameters.species
                    )));
                }
                centers.push(*species);
            }
        }

        let mut values = Array2::zeros((centers.len(), self.n_properties()));
        let mut first_row = 0;
        for system in structures {
            self.compute_system(system, &mut values, first_row);
            first_row += system.size();
        }

        Ok(DummyExpansionOutput {
            species: self.parameters.species.clone(),
            centers: centers,
            values: values,
        })
    }
}
