//! Parallel computation of atomistic representations, and construction of an
//! optimal radial basis for the spherical expansion following Goscinski et
//! al, arXiv:2105.08717.
//!
//! The descriptor itself is computed by an external [`Calculator`]; this
//! crate splits structures between worker threads, merges the resulting
//! features, and derives projection matrices onto the optimal radial basis
//! from the covariance of the spherical expansion coefficients.

#![warn(clippy::all, clippy::pedantic)]

// disable some style lints
#![allow(clippy::needless_return, clippy::must_use_candidate, clippy::comparison_chain)]
#![allow(clippy::redundant_field_names, clippy::redundant_closure_for_method_calls)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::module_name_repetitions)]

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap, clippy::cast_lossless, clippy::cast_sign_loss)]

// Tests lints
#![cfg_attr(test, allow(clippy::float_cmp))]

pub(crate) mod math;

mod errors;
pub use self::errors::Error;

pub mod chunks;
pub use self::chunks::grouper;

mod hypers;
pub use self::hypers::{Hypers, DEFAULT_SPLINE_ACCURACY};

mod calculator;
pub use self::calculator::{Calculator, Representation, Species, SpeciesFeatures};

pub mod parallel;
pub use self::parallel::{features_in_parallel, features_by_species_in_parallel};
pub use self::parallel::{ParallelOptions, WorkerCount};

pub mod pca;
pub use self::pca::{BasisReduction, RadialBasisPca};

mod optimizer;
pub use self::optimizer::{Frames, OptimizerOptions, CovarianceAccumulator};
pub use self::optimizer::{optimal_radial_basis_hypers, optimal_radial_basis_hypers_with};

pub mod systems;
pub use self::systems::SimpleSystem;

pub mod calculators;
