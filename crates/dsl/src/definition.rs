//! Definition parsing
//!
//! A definition is one `name@levelSpec: expression` record. The level spec
//! expands to a set of levels that all share the same compiled tree;
//! expression-level failures are captured on the produced simulations rather
//! than propagated, so one bad definition never aborts a batch.

use std::sync::Arc;

use indexmap::IndexSet;

use crate::ast::Expression;
use crate::error::ParseError;
use crate::parser::parse_expression;
use crate::rng::Mulberry32;
use crate::simulation::{DefinitionSource, Simulation};
use crate::state::{EvalState, SimParams};

/// Seed for the post-parse test evaluation; any fixed value keeps the check
/// deterministic.
const CHECK_SEED: u32 = 0xd1ce;

/// Expand a level spec such as `"1-5,7,9,11-20"` into its ordered,
/// de-duplicated values. Returns `None` when any piece is not a
/// non-negative integer or a range is inverted.
pub fn parse_ranges(spec: &str) -> Option<Vec<i64>> {
    let mut values = IndexSet::new();
    for piece in spec.split(',') {
        match piece.split_once('-') {
            Some((lo, hi)) => {
                let from = parse_level(lo)?;
                let to = parse_level(hi)?;
                if from > to {
                    return None;
                }
                values.extend(from..=to);
            }
            None => {
                values.insert(parse_level(piece)?);
            }
        }
    }
    Some(values.into_iter().collect())
}

fn parse_level(part: &str) -> Option<i64> {
    let n = part.trim().parse::<i64>().ok()?;
    (n >= 0).then_some(n)
}

/// Blank out whole-line comments; the `#` must be the first non-whitespace
/// character (elsewhere `#` is the repeat operator).
pub(crate) fn strip_comment_line(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        ""
    } else {
        line
    }
}

/// Parse one definition into its expanded simulations.
///
/// Format errors (missing `:`, bad level spec) fail the whole definition;
/// expression errors are recorded per-simulation with a trivial `0` tree in
/// place of the failed compile.
pub fn parse_definition(source: DefinitionSource) -> Result<Vec<Simulation>, ParseError> {
    let definition = source.text.trim();
    let (head, expr_text) = match definition.split_once(':') {
        Some((head, rest)) if !rest.is_empty() => (head, rest),
        _ => {
            return Err(ParseError::DefinitionFormat {
                definition: definition.to_string(),
            })
        }
    };

    let (name, levels) = match head.split_once('@') {
        Some((name, spec)) => {
            let levels = parse_ranges(spec).ok_or_else(|| ParseError::BadLevels {
                levels: spec.trim().to_string(),
                definition: definition.to_string(),
            })?;
            (name.trim(), levels)
        }
        None => (head.trim(), vec![0]),
    };

    let raw: String = expr_text
        .lines()
        .map(strip_comment_line)
        .collect::<Vec<_>>()
        .join("\n")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let (root, error) = match parse_expression(&raw) {
        Ok(expr) => (Arc::new(expr), None),
        Err(e) => (Arc::new(Expression::zero()), Some(e.to_string())),
    };

    let name = name.to_string();
    let source = Arc::new(source);
    let raw: Arc<str> = raw.into();
    Ok(levels
        .into_iter()
        .map(|level| {
            Simulation::new(
                name.clone(),
                level,
                Arc::clone(&source),
                Arc::clone(&raw),
                Arc::clone(&root),
                error.clone(),
            )
        })
        .collect())
}

/// [`parse_definition`], plus one test evaluation of each error-free
/// simulation against a nominal state, so latent runtime errors (a negative
/// repeat count, say) surface now instead of mid-run.
pub fn parse_definition_checked(source: DefinitionSource) -> Result<Vec<Simulation>, ParseError> {
    let mut sims = parse_definition(source)?;
    for sim in &mut sims {
        if sim.error().is_some() {
            continue;
        }
        let params = SimParams::new(10, 2, sim.level(), 0);
        let result = {
            let mut state = EvalState::new(params, Box::new(Mulberry32::new(CHECK_SEED)));
            sim.run(&mut state)
        };
        if let Err(e) = result {
            sim.set_error(e.to_string());
        }
    }
    Ok(sims)
}
