//! Runtime errors

use thiserror::Error;

use dicesim_dsl::EvalError;

/// Result type for simulation runs.
pub type Result<T> = std::result::Result<T, ExecError>;

/// Errors surfaced while driving a simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecError {
    #[error("simulation {id} cannot run: {message}")]
    InvalidSimulation { id: String, message: String },

    #[error(transparent)]
    Eval(#[from] EvalError),
}
