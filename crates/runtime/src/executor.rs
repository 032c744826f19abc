//! Batch Monte-Carlo executor
//!
//! Splits an iteration budget into privately-seeded batches, runs them on
//! the rayon pool — one `EvalState` per batch, reset between iterations —
//! and merges the partial distributions. Per-batch seeds derive from the run
//! seed and batch index, so a run is reproducible for a given config
//! regardless of thread scheduling.

use rayon::prelude::*;
use tracing::debug;

use dicesim_dsl::{EvalState, Mulberry32, SimParams, Simulation};

use crate::distribution::Distribution;
use crate::error::{ExecError, Result};

/// Iteration budget and seeding for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    pub iterations: u64,
    /// Iterations per batch; also the granularity of parallelism.
    pub batch_size: u64,
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            iterations: 100_000,
            batch_size: 10_000,
            seed: 0,
        }
    }
}

/// Run one simulation for the configured number of iterations and return
/// the outcome distribution.
pub fn run_simulation(
    sim: &Simulation,
    params: SimParams,
    config: &RunConfig,
) -> Result<Distribution> {
    if let Some(message) = sim.error() {
        return Err(ExecError::InvalidSimulation {
            id: sim.id(),
            message: message.to_string(),
        });
    }
    let batch_size = config.batch_size.max(1);
    let batches = config.iterations.div_ceil(batch_size);
    debug!(id = %sim.id(), iterations = config.iterations, batches, "running simulation");

    (0..batches)
        .into_par_iter()
        .map(|batch| {
            let iterations = batch_size.min(config.iterations - batch * batch_size);
            run_batch(sim, params, batch_seed(config.seed, batch), iterations)
        })
        .try_reduce(Distribution::new, |mut merged, part| {
            merged.merge(&part);
            Ok(merged)
        })
}

/// One batch: a private RNG stream and a reused state.
fn run_batch(
    sim: &Simulation,
    params: SimParams,
    seed: u64,
    iterations: u64,
) -> Result<Distribution> {
    let mut state = EvalState::new(params, Box::new(Mulberry32::from_seed(seed)));
    let mut dist = Distribution::new();
    for _ in 0..iterations {
        state.reset();
        dist.record(sim.run(&mut state)?);
    }
    Ok(dist)
}

/// Mix the run seed with the batch index so each batch gets an independent
/// stream (splitmix-style avalanche).
fn batch_seed(seed: u64, batch: u64) -> u64 {
    let mut h = seed ^ (batch.wrapping_add(1)).wrapping_mul(0x9e37_79b9_7f4a_7c15);
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h
}
