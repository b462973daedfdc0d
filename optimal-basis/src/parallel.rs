use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;

use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;

use crate::calculator::{Calculator, Representation};
use crate::chunks::grouper;
use crate::{Error, Hypers, Species, SpeciesFeatures};

/// Default number of structures given to each worker
pub const DEFAULT_CHUNK_SIZE: usize = 25;

/// How many worker threads to use for a calculation.
///
/// In JSON, this is represented by an integer: `-1` to use all available
/// cores, or a positive number of threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum WorkerCount {
    /// Use as many workers as there are logical cores (or as requested by
    /// the `RAYON_NUM_THREADS` environment variable)
    #[default]
    All,
    /// Use exactly this number of workers
    Exactly(NonZeroUsize),
}

impl WorkerCount {
    /// Create a new pool of threads with the requested number of workers
    pub fn thread_pool(self) -> Result<rayon::ThreadPool, Error> {
        let n_threads = match self {
            // rayon uses its default when asked for 0 threads
            WorkerCount::All => 0,
            WorkerCount::Exactly(n) => n.get(),
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .thread_name(|i| format!("optimal-basis-worker-{}", i))
            .build()?;

        return Ok(pool);
    }
}

impl TryFrom<i64> for WorkerCount {
    type Error = Error;

    fn try_from(value: i64) -> Result<WorkerCount, Error> {
        if value == -1 {
            return Ok(WorkerCount::All);
        }

        usize::try_from(value).ok()
            .and_then(NonZeroUsize::new)
            .map(WorkerCount::Exactly)
            .ok_or_else(|| Error::InvalidParameter(format!(
                "the number of workers must be -1 (all cores) or a positive integer, got {}", value
            )))
    }
}

impl From<WorkerCount> for i64 {
    fn from(workers: WorkerCount) -> i64 {
        match workers {
            WorkerCount::All => -1,
            WorkerCount::Exactly(n) => i64::try_from(n.get()).unwrap_or(i64::MAX),
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

/// Options controlling how structures are split between workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ParallelOptions {
    /// Number of structures given to each worker at once
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Number of worker threads. `-1` uses all available cores.
    #[serde(default)]
    #[schemars(with = "i64")]
    pub n_workers: WorkerCount,
}

impl Default for ParallelOptions {
    fn default() -> ParallelOptions {
        ParallelOptions {
            chunk_size: DEFAULT_CHUNK_SIZE,
            n_workers: WorkerCount::All,
        }
    }
}

/// Compute the features of `structures` with calculators of type `C`, and
/// return them as a single array.
///
/// The structures are split in chunks of `options.chunk_size`, and each chunk
/// is sent to a worker thread which creates its own calculator from `hypers`.
/// The features of all chunks are then concatenated in the same order as
/// `structures`.
#[time_graph::instrument(name = "features_in_parallel")]
pub fn features_in_parallel<C: Calculator>(
    structures: &[C::Structure],
    hypers: &Hypers,
    options: ParallelOptions,
) -> Result<Array2<f64>, Error> {
    let outputs = compute_in_parallel::<C>(structures, hypers, options)?;

    let features = outputs.iter().map(|output| output.features()).collect::<Vec<_>>();
    let views = features.iter().map(|array| array.view()).collect::<Vec<_>>();

    return Ok(ndarray::concatenate(Axis(0), &views)?);
}

/// Compute the features of `structures` with calculators of type `C`,
/// separated by species.
///
/// This works like [`features_in_parallel`], and the arrays for each species
/// are concatenated separately. All chunks must produce the same set of
/// species, see [`concatenate_by_species`].
#[time_graph::instrument(name = "features_by_species_in_parallel")]
pub fn features_by_species_in_parallel<C: Calculator>(
    structures: &[C::Structure],
    hypers: &Hypers,
    options: ParallelOptions,
) -> Result<SpeciesFeatures, Error> {
    let outputs = compute_in_parallel::<C>(structures, hypers, options)?;

    let features = outputs.iter()
        .map(|output| output.features_by_species())
        .collect::<Vec<_>>();

    return concatenate_by_species(features);
}

/// Concatenate the arrays associated with each species in `chunks`, keeping
/// the order of the chunks.
///
/// The species in the first chunk define the species of the result, and all
/// other chunks must contain exactly the same species.
pub fn concatenate_by_species(chunks: Vec<SpeciesFeatures>) -> Result<SpeciesFeatures, Error> {
    let mut chunks = chunks.into_iter();
    let first = match chunks.next() {
        Some(first) => first,
        None => return Ok(SpeciesFeatures::new()),
    };

    let species = first.keys().copied().collect::<Vec<_>>();
    let mut parts = first.into_iter()
        .map(|(species, values)| (species, vec![values]))
        .collect::<BTreeMap<Species, Vec<Array2<f64>>>>();

    for (chunk_i, chunk) in chunks.enumerate() {
        if !chunk.keys().eq(species.iter()) {
            return Err(Error::InvalidParameter(format!(
                "chunk {} contains features for species {:?}, but the first chunk contains species {:?}",
                chunk_i + 1, chunk.keys().collect::<Vec<_>>(), species
            )));
        }

        for ((_, values), (_, part)) in chunk.into_iter().zip(parts.iter_mut()) {
            part.push(values);
        }
    }

    let mut merged = SpeciesFeatures::new();
    for (species, arrays) in parts {
        let views = arrays.iter().map(|array| array.view()).collect::<Vec<ArrayView2<f64>>>();
        merged.insert(species, ndarray::concatenate(Axis(0), &views)?);
    }

    return Ok(merged);
}

/// Run the calculator over all chunks of `structures`, returning the output
/// for each chunk in order.
fn compute_in_parallel<C: Calculator>(
    structures: &[C::Structure],
    hypers: &Hypers,
    options: ParallelOptions,
) -> Result<Vec<C::Output>, Error> {
    let chunks = grouper(options.chunk_size, structures)?.collect::<Vec<_>>();
    if chunks.is_empty() {
        return Err(Error::InvalidParameter(
            "can not compute features for an empty list of structures".into()
        ));
    }

    let pool = options.n_workers.thread_pool()?;
    log::debug!(
        "computing features for {} structures in {} chunks with {} workers",
        structures.len(), chunks.len(), pool.current_num_threads()
    );

    return pool.install(|| {
        chunks.par_iter()
            .map(|chunk| compute_chunk::<C>(hypers, chunk))
            .collect::<Result<Vec<_>, Error>>()
    });
}

/// Create a calculator and run it on a single chunk. Panics are turned into
/// errors, so that they are reported as failure of the whole calculation.
fn compute_chunk<C: Calculator>(hypers: &Hypers, chunk: &[&C::Structure]) -> Result<C::Output, Error> {
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        let mut calculator = C::new(hypers)?;
        calculator.compute(chunk)
    }));

    match result {
        Ok(output) => output,
        Err(payload) => Err(Error::from(payload)),
    }
}
