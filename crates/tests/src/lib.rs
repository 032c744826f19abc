//! Integration test harness for dicesim.
//!
//! Utilities for end-to-end testing of the full pipeline:
//! parse script → compile → evaluate → aggregate.

use dicesim_dsl::{
    evaluate, parse_expression, parse_script, EvalError, EvalState, FixedRolls, Mulberry32,
    ParsedScript, RollSource, SimParams, Simulation,
};
use dicesim_runtime::{Distribution, Stats};

/// Nominal parameters used throughout the tests: AC 10, PB 2, level 1, no
/// save modifier.
pub fn nominal_params() -> SimParams {
    SimParams::new(10, 2, 1, 0)
}

/// Evaluate an expression once with an arbitrary injected roll source.
pub fn eval_expr(
    text: &str,
    params: SimParams,
    rng: Box<dyn RollSource>,
) -> Result<f64, EvalError> {
    let expr = parse_expression(text).expect("expression should parse");
    let mut state = EvalState::new(params, rng);
    evaluate(&expr, &mut state)
}

/// Evaluate an expression once with scripted d20 faces (smaller dice scale
/// the same unit samples down).
pub fn eval_fixed(text: &str, faces: &[i64], params: SimParams) -> f64 {
    eval_expr(text, params, Box::new(FixedRolls::d20(faces))).expect("expression should evaluate")
}

/// Sample an expression repeatedly with a seeded RNG, resetting state
/// between iterations, and collect the outcome distribution.
pub fn sample(text: &str, params: SimParams, iterations: u64, seed: u32) -> Distribution {
    sample_with_crit(text, params, iterations, seed, false)
}

/// Like [`sample`], optionally holding the crit flag set for every
/// iteration (for exercising crit-doubling dice in isolation).
pub fn sample_with_crit(
    text: &str,
    params: SimParams,
    iterations: u64,
    seed: u32,
    crit: bool,
) -> Distribution {
    let expr = parse_expression(text).expect("expression should parse");
    let mut state = EvalState::new(params, Box::new(Mulberry32::new(seed)));
    let mut dist = Distribution::new();
    for _ in 0..iterations {
        state.reset();
        if crit {
            state.push_crit(true);
        }
        let value = evaluate(&expr, &mut state).expect("expression should evaluate");
        dist.record(value);
    }
    dist
}

/// Summary stats of a sampling run.
pub fn sample_stats(text: &str, params: SimParams, iterations: u64, seed: u32) -> Stats {
    Stats::from_distribution(&sample(text, params, iterations, seed))
        .expect("distribution should not be empty")
}

/// A parsed script plus lookup helpers.
pub struct TestHarness {
    pub script: ParsedScript,
}

impl TestHarness {
    /// Parse a script, panicking on any script-level error.
    pub fn from_source(source: &str) -> Self {
        let script = parse_script(source);
        assert!(
            script.errors.is_empty(),
            "script errors: {:?}",
            script.errors
        );
        Self { script }
    }

    /// Parse a script, keeping script-level errors for inspection.
    pub fn from_source_lenient(source: &str) -> Self {
        Self {
            script: parse_script(source),
        }
    }

    /// Look up one simulation by name and level.
    pub fn sim(&self, name: &str, level: i64) -> &Simulation {
        self.script
            .sims
            .get(name)
            .and_then(|sims| sims.iter().find(|s| s.level() == level))
            .unwrap_or_else(|| panic!("no simulation {name}@{level}"))
    }
}
