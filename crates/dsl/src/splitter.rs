//! Paren-aware operator splitter
//!
//! Scans a raw expression left to right at paren depth zero, looking for the
//! first match of one operator descriptor. The text before the match and the
//! text after it become the operand chunks; recursion in the parser handles
//! any further occurrences, which is what gives binary operators their exact
//! arity of two.

use crate::error::ParseError;
use crate::registry::Operator;

/// Result of scanning one expression for one operator descriptor.
#[derive(Debug, PartialEq, Eq)]
pub struct SplitOutcome<'t> {
    /// Non-empty operand chunks, with redundant single paren wraps stripped.
    pub operands: Vec<&'t str>,
    /// The matched operator token, if the scan found one.
    pub matched: Option<&'t str>,
    /// How many times the final chunk's paren depth returned to exactly
    /// zero. A value of 1 on a chunk spanning the whole input marks a
    /// redundant grouping wrap.
    pub paren_resets: u32,
}

/// Split `text` at the first top-level occurrence of `op`.
///
/// Fails with a syntax error when the parentheses never re-balance. Chunk
/// boundaries are tracked as byte indices into `text`, so stripping a
/// redundant wrap is a slice adjustment, not a copy.
pub fn split<'t>(text: &'t str, op: Operator) -> Result<SplitOutcome<'t>, ParseError> {
    let mut operands = Vec::new();
    let mut matched: Option<&'t str> = None;
    let mut depth: i32 = 0;
    let mut resets: u32 = 0;
    let mut chunk_start = 0;
    let mut i = 0;

    while i < text.len() {
        // `text` is whitespace-stripped expression text; all structurally
        // significant characters are ASCII, so per-char scanning is safe.
        let c = match text[i..].chars().next() {
            Some(c) => c,
            None => break,
        };
        if c == '(' {
            depth += 1;
        } else if c == ')' {
            depth -= 1;
            if depth == 0 {
                resets += 1;
            }
        }
        if depth == 0 && matched.is_none() {
            if let Some(len) = op.match_at(text, i) {
                push_chunk(&mut operands, &text[chunk_start..i], resets);
                matched = Some(&text[i..i + len]);
                i += len;
                chunk_start = i;
                resets = 0;
                continue;
            }
        }
        i += c.len_utf8();
    }

    if depth != 0 {
        return Err(ParseError::UnbalancedParens {
            text: text.to_string(),
        });
    }
    push_chunk(&mut operands, &text[chunk_start..], resets);
    Ok(SplitOutcome {
        operands,
        matched,
        paren_resets: resets,
    })
}

/// Append a chunk, stripping a redundant single wrap and dropping empties
/// (an absent left operand means the descriptor cannot apply, not that it
/// has an empty operand).
fn push_chunk<'t>(operands: &mut Vec<&'t str>, chunk: &'t str, resets: u32) {
    let chunk = if resets == 1 && chunk.starts_with('(') && chunk.ends_with(')') {
        &chunk[1..chunk.len() - 1]
    } else {
        chunk
    };
    if !chunk.is_empty() {
        operands.push(chunk);
    }
}
