//! Parse and evaluation errors

use thiserror::Error;

/// Errors raised while compiling expression text into a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Unbalanced parentheses in expression \"{text}\"")]
    UnbalancedParens { text: String },

    #[error("Expression \"{text}\" is nested too deeply")]
    TooDeep { text: String },

    #[error("Invalid expression: \"{text}\"")]
    InvalidExpression { text: String },

    #[error("Invalid syntax in \"{text}\": {operator} expected {expected} operands but got {actual}")]
    Arity {
        text: String,
        operator: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Type of \"{text}\" was expected to be one of \"Variable, Function\", but was \"{actual}\"")]
    BadAssignTarget { text: String, actual: &'static str },

    #[error("Simulation definition \"{definition}\" is not correctly formatted.")]
    DefinitionFormat { definition: String },

    #[error("Invalid level specification \"{levels}\" in \"{definition}\"")]
    BadLevels { levels: String, definition: String },
}

/// Errors raised while evaluating a compiled tree.
///
/// These only cover conditions that cannot be rejected at parse time; the
/// repeat count, for example, is the value of an arbitrary sub-expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Cannot repeat a negative ({count}) number of times: {text}")]
    NegativeRepeat { count: f64, text: String },

    #[error("Evaluation depth limit exceeded in \"{text}\" (self-referencing function?)")]
    DepthLimit { text: String },
}
