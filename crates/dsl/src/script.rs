//! Script parsing
//!
//! A script is a sequence of definition lines. A definition whose expression
//! opens a paren it does not close continues onto the following physical
//! lines until the parens balance or another definition header appears; an
//! unterminated block is reported as a single error spanning the consumed
//! lines without disturbing any definition after it.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::definition::{parse_definition_checked, strip_comment_line};
use crate::simulation::{DefinitionSource, Simulation};

/// A definition header: a name (anything without `:`, `#` or `@`), a level
/// spec, and the expression remainder.
static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^:#@]+@[- \t,\d]+:(.*)").unwrap());

/// A script-level error with the physical lines it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    /// Zero-based index of the first offending line.
    pub line_start: usize,
    /// Number of lines the offending definition spans, when known.
    pub line_count: Option<usize>,
    pub message: String,
}

/// Result of parsing a whole script.
#[derive(Debug, Default)]
pub struct ParsedScript {
    /// Valid simulations grouped by name, in order of first appearance.
    pub sims: IndexMap<String, Vec<Simulation>>,
    pub errors: Vec<LineError>,
}

impl ParsedScript {
    /// Simulation names in order of first appearance.
    pub fn names(&self) -> Vec<&str> {
        self.sims.keys().map(String::as_str).collect()
    }

    /// All simulations in script order.
    pub fn all(&self) -> impl Iterator<Item = &Simulation> {
        self.sims.values().flatten()
    }
}

/// Parse a whole script, recovering from malformed definitions.
pub fn parse_script(text: &str) -> ParsedScript {
    let lines: Vec<&str> = text.lines().collect();
    let mut script = ParsedScript::default();

    let mut i = 0;
    while i < lines.len() {
        let start = i;
        let line = lines[i];
        if strip_comment_line(line).trim().is_empty() {
            i += 1;
            continue;
        }

        let Some(caps) = HEADER_RE.captures(line) else {
            script.errors.push(LineError {
                line_start: start,
                line_count: None,
                message: "Invalid name@level: definition".to_string(),
            });
            i += 1;
            continue;
        };
        let matched = caps.get(0).map_or(line, |m| m.as_str());
        let expr_part = caps.get(1).map_or("", |m| m.as_str());

        let mut definition = line.to_string();
        if expr_part.contains('(') {
            let mut depth: i64 = 0;
            let mut l = i;
            let mut current = expr_part;
            loop {
                // A new header ends the block — the unbalanced definition is
                // reported on its own and parsing resumes at the header.
                if l != i && HEADER_RE.is_match(current) {
                    break;
                }
                for c in current.chars() {
                    if c == '(' {
                        depth += 1;
                    } else if c == ')' {
                        depth -= 1;
                    }
                }
                l += 1;
                if depth <= 0 || l >= lines.len() {
                    break;
                }
                current = lines[l];
            }
            let continuation = lines[i + 1..l].join("\n");
            definition = format!("{}\n{}", matched.trim(), continuation)
                .trim()
                .to_string();
            i = l - 1;
        }

        let line_count = 1 + i - start;
        let source = DefinitionSource {
            text: definition,
            line_start: start,
            line_count,
        };
        match parse_definition_checked(source) {
            Ok(sims) => {
                // One error channel: a definition with any failed expansion
                // is reported as a script error, not as runnable sims.
                match sims.iter().find_map(Simulation::error) {
                    Some(message) => script.errors.push(LineError {
                        line_start: start,
                        line_count: Some(line_count),
                        message: message.to_string(),
                    }),
                    None => {
                        for sim in sims {
                            script
                                .sims
                                .entry(sim.name().to_string())
                                .or_default()
                                .push(sim);
                        }
                    }
                }
            }
            Err(e) => script.errors.push(LineError {
                line_start: start,
                line_count: Some(line_count),
                message: e.to_string(),
            }),
        }
        i += 1;
    }

    script
}
