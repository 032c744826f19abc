//! Recursive-descent parser over the operator registry
//!
//! Tries each operator descriptor in registry order against the whole text;
//! the first descriptor that splits the text wins and its operands are
//! parsed recursively. Terminals are tried only after every operator has
//! failed. There is no separate precedence table — registry order is the
//! precedence.

use crate::ast::Expression;
use crate::error::ParseError;
use crate::registry::{OPERATORS, TERMINALS};
use crate::splitter::split;

/// Upper bound on tree depth. Long operator chains nest one level per
/// operand, so this bounds both pathological paren towers and very long
/// formulas; past it the parse fails instead of exhausting the stack.
const MAX_NESTING: usize = 500;

/// Parse one whitespace-free expression into a tree.
pub fn parse_expression(text: &str) -> Result<Expression, ParseError> {
    parse_nested(text, 0)
}

fn parse_nested(text: &str, depth: usize) -> Result<Expression, ParseError> {
    if depth > MAX_NESTING {
        return Err(ParseError::TooDeep {
            text: text.to_string(),
        });
    }

    for op in OPERATORS {
        let outcome = split(text, op)?;
        // A single operand spanning the whole input inside one redundant
        // `( … )` wrap is pure grouping: recurse on the unwrapped text. No
        // dedicated group node exists, which makes stripping idempotent.
        if outcome.operands.len() == 1
            && outcome.paren_resets == 1
            && text.starts_with('(')
            && text.ends_with(')')
        {
            return parse_nested(outcome.operands[0], depth + 1);
        }
        if let Some(matched) = outcome.matched {
            if outcome.operands.len() == op.arity() {
                let operands = outcome
                    .operands
                    .iter()
                    .map(|operand| parse_nested(operand, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                return op.build(text, matched, operands);
            }
            // Wrong operand count (e.g. a dangling operator): this
            // descriptor does not apply; later descriptors still might.
        }
    }

    for term in TERMINALS {
        if let Some(kind) = term.match_text(text) {
            return Ok(Expression::new(kind, text, Vec::new()));
        }
    }

    Err(ParseError::InvalidExpression {
        text: text.to_string(),
    })
}
