//! Compiled simulations
//!
//! A [`Simulation`] is one `name@level` pairing of a compiled expression.
//! Definitions with a level range expand into several simulations that share
//! one tree and one source record.

use std::sync::Arc;

use crate::ast::Expression;
use crate::error::EvalError;
use crate::eval::evaluate;
use crate::state::EvalState;

/// The definition text a simulation came from, with its position in the
/// enclosing script (zero-based line index and physical line count) for
/// error highlighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionSource {
    pub text: String,
    pub line_start: usize,
    pub line_count: usize,
}

impl DefinitionSource {
    /// A source record for a definition that did not come from a script.
    pub fn inline(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            line_start: 0,
            line_count: 1,
        }
    }
}

/// One compiled simulation.
#[derive(Debug, Clone)]
pub struct Simulation {
    name: String,
    level: i64,
    source: Arc<DefinitionSource>,
    raw_expression: Arc<str>,
    root: Arc<Expression>,
    error: Option<String>,
}

impl Simulation {
    pub(crate) fn new(
        name: String,
        level: i64,
        source: Arc<DefinitionSource>,
        raw_expression: Arc<str>,
        root: Arc<Expression>,
        error: Option<String>,
    ) -> Self {
        Self {
            name,
            level,
            source,
            raw_expression,
            root,
            error,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> i64 {
        self.level
    }

    /// `name@level`, unique within one parsed script.
    pub fn id(&self) -> String {
        format!("{}@{}", self.name, self.level)
    }

    pub fn source(&self) -> &DefinitionSource {
        &self.source
    }

    /// The cleaned (comment- and whitespace-free) expression text that was
    /// compiled.
    pub fn raw_expression(&self) -> &str {
        &self.raw_expression
    }

    pub fn root(&self) -> &Arc<Expression> {
        &self.root
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn set_error(&mut self, message: String) {
        self.error = Some(message);
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    /// Evaluate the compiled tree once against the given state.
    pub fn run<'e>(&'e self, state: &mut EvalState<'e>) -> Result<f64, EvalError> {
        evaluate(&self.root, state)
    }
}
