//! Operator and terminal registry
//!
//! The grammar is defined entirely by two ordered lists: [`OPERATORS`]
//! (binary descriptors first, then unary) and [`TERMINALS`]. The parser
//! tries operators in list order and splits at the first top-level match, so
//! list order IS operator precedence; reordering the registry changes the
//! language.

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{ExprKind, Expression, RollMod, RollSpec, SaveVantage, StoreKind};
use crate::error::ParseError;

static ATTACK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^=atk(?::(\d+))?(?::(adv|dis)(\d+)?)?>").unwrap());
static SAVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^=sav:(\d+)(?::(adv|dis))?>").unwrap());
static ROLL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d*)([dD])(\d+)((?:(?:kh|kl|rrle|rrlt|rrge|rrgt|rreq)\d+)*)$").unwrap()
});
static ROLL_MOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(kh|kl|rrle|rrlt|rrge|rrgt|rreq)(\d+)").unwrap());
static VARIABLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\$(\w+)$").unwrap());
static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^@(\w+)$").unwrap());

/// One operator descriptor: how to find its token and how to build its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Discard,
    Assign,
    AssignEval,
    Check,
    Attack,
    Save,
    Or,
    And,
    Ge,
    Gt,
    Le,
    Lt,
    Ne,
    Eq,
    Add,
    Sub,
    Mul,
    Div,
    Repeat,
    Not,
    Negate,
}

/// The ordered operator registry. Binary operators first — earliest entries
/// bind loosest — then the unary operators, tried only after every binary
/// descriptor has failed to split the text.
pub const OPERATORS: [Operator; 21] = [
    Operator::Discard,
    Operator::Assign,
    Operator::AssignEval,
    Operator::Check,
    Operator::Attack,
    Operator::Save,
    Operator::Or,
    Operator::And,
    Operator::Ge,
    Operator::Gt,
    Operator::Le,
    Operator::Lt,
    Operator::Ne,
    Operator::Eq,
    Operator::Add,
    Operator::Sub,
    Operator::Mul,
    Operator::Div,
    Operator::Repeat,
    Operator::Not,
    Operator::Negate,
];

impl Operator {
    /// Required operand count: exactly 2 for binary, exactly 1 for unary.
    pub fn arity(self) -> usize {
        match self {
            Self::Not | Self::Negate => 1,
            _ => 2,
        }
    }

    /// Display name, used in arity error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Discard => "Discard",
            Self::Assign => "Assign",
            Self::AssignEval => "Assign (and Evaluate)",
            Self::Check => "Check",
            Self::Attack => "Attack",
            Self::Save => "Save",
            Self::Or => "Or",
            Self::And => "And",
            Self::Ge => "Greater Than Or Equal To",
            Self::Gt => "Greater Than",
            Self::Le => "Less Than Or Equal To",
            Self::Lt => "Less Than",
            Self::Ne => "Not Equal To",
            Self::Eq => "Equal To",
            Self::Add => "Add",
            Self::Sub => "Subtract",
            Self::Mul => "Multiply",
            Self::Div => "Divide",
            Self::Repeat => "Repeat",
            Self::Not => "Not",
            Self::Negate => "Negative",
        }
    }

    /// Attempt to match this operator's token at byte position `at`.
    ///
    /// Returns the token length on a hit. Binary operators never match at
    /// position 0 (a leading `-` is negation, not subtraction) and carry
    /// the boundary guards the grammar needs to keep multi-character tokens
    /// (`:=`, `=>`, `=atk>`, `<=`, …) from being split apart; unary
    /// operators match only at position 0.
    pub fn match_at(self, text: &str, at: usize) -> Option<usize> {
        if self.arity() == 2 && at == 0 {
            return None;
        }
        if self.arity() == 1 && at != 0 {
            return None;
        }
        let rest = &text[at..];
        match self {
            Self::Discard => literal(rest, ";"),
            Self::Assign => literal(rest, ":="),
            Self::AssignEval => literal(rest, "=").filter(|_| {
                !matches!(prev_char(text, at), Some('=' | '<' | '>' | '!' | ':' | '&' | '|'))
                    && !matches!(next_char(rest, 1), Some(c) if c == '=' || c == '>' || c.is_ascii_alphabetic())
            }),
            Self::Check => literal(rest, "=>"),
            Self::Attack => regex_props_len(&ATTACK_RE, rest, attack_props),
            Self::Save => regex_props_len(&SAVE_RE, rest, save_props),
            Self::Or => literal(rest, "||"),
            Self::And => literal(rest, "&&"),
            Self::Ge => literal(rest, ">="),
            Self::Gt => literal(rest, ">").filter(|_| {
                prev_char(text, at) != Some('=') && next_char(rest, 1) != Some('=')
            }),
            Self::Le => literal(rest, "<="),
            Self::Lt => literal(rest, "<").filter(|_| {
                prev_char(text, at) != Some('=') && next_char(rest, 1) != Some('=')
            }),
            Self::Ne => literal(rest, "!=").filter(|_| next_char(rest, 2) != Some('>')),
            Self::Eq => literal(rest, "==").filter(|_| next_char(rest, 2) != Some('>')),
            Self::Add => literal(rest, "+"),
            Self::Sub => literal(rest, "-").filter(|_| {
                !matches!(
                    prev_char(text, at),
                    Some('-' | '+' | '*' | '/' | '=' | '>' | '<' | '|' | '&')
                ) && next_char(rest, 1) != Some('>')
            }),
            Self::Mul => literal(rest, "*"),
            Self::Div => literal(rest, "/"),
            Self::Repeat => literal(rest, "#"),
            Self::Not => literal(rest, "!"),
            Self::Negate => literal(rest, "-"),
        }
    }

    /// Construct the node for this operator from the matched token text and
    /// the parsed operands.
    pub fn build(
        self,
        raw: &str,
        matched: &str,
        operands: Vec<Expression>,
    ) -> Result<Expression, ParseError> {
        let expected = self.arity();
        if operands.len() != expected {
            return Err(ParseError::Arity {
                text: raw.to_string(),
                operator: self.name(),
                expected,
                actual: operands.len(),
            });
        }
        let kind = match self {
            Self::Discard => ExprKind::Discard,
            Self::Assign => ExprKind::Assign(assign_target(&operands[0])?),
            Self::AssignEval => ExprKind::AssignEval(assign_target(&operands[0])?),
            Self::Check => ExprKind::Check,
            Self::Attack => attack_props(
                &ATTACK_RE
                    .captures(matched)
                    .ok_or_else(|| invalid(matched))?,
            )
            .ok_or_else(|| invalid(matched))?,
            Self::Save => save_props(
                &SAVE_RE.captures(matched).ok_or_else(|| invalid(matched))?,
            )
            .ok_or_else(|| invalid(matched))?,
            Self::Or => ExprKind::Or,
            Self::And => ExprKind::And,
            Self::Ge => ExprKind::Ge,
            Self::Gt => ExprKind::Gt,
            Self::Le => ExprKind::Le,
            Self::Lt => ExprKind::Lt,
            Self::Ne => ExprKind::Ne,
            Self::Eq => ExprKind::Eq,
            Self::Add => ExprKind::Add,
            Self::Sub => ExprKind::Sub,
            Self::Mul => ExprKind::Mul,
            Self::Div => ExprKind::Div,
            Self::Repeat => ExprKind::Repeat,
            Self::Not => ExprKind::Not,
            Self::Negate => ExprKind::Negate,
        };
        Ok(Expression::new(kind, raw, operands))
    }
}

fn invalid(text: &str) -> ParseError {
    ParseError::InvalidExpression {
        text: text.to_string(),
    }
}

fn literal(rest: &str, token: &str) -> Option<usize> {
    rest.starts_with(token).then(|| token.len())
}

fn prev_char(text: &str, at: usize) -> Option<char> {
    text[..at].chars().next_back()
}

fn next_char(rest: &str, after: usize) -> Option<char> {
    rest[after..].chars().next()
}

/// Match an anchored pattern and confirm its captures yield valid
/// properties, so malformed numbers surface as a non-match rather than a
/// panic downstream.
fn regex_props_len(
    re: &Regex,
    rest: &str,
    props: fn(&regex::Captures<'_>) -> Option<ExprKind>,
) -> Option<usize> {
    let caps = re.captures(rest)?;
    props(&caps)?;
    caps.get(0).map(|m| m.len())
}

fn attack_props(caps: &regex::Captures<'_>) -> Option<ExprKind> {
    let crit_min = match caps.get(1) {
        Some(m) => m.as_str().parse::<u32>().ok()?,
        None => 20,
    };
    let vantage = match caps.get(2).map(|m| m.as_str()) {
        Some(kind) => {
            let degree = match caps.get(3) {
                Some(m) => m.as_str().parse::<i32>().ok()?,
                None => 2,
            };
            if kind == "adv" {
                degree
            } else {
                -degree
            }
        }
        None => 0,
    };
    Some(ExprKind::Attack { crit_min, vantage })
}

fn save_props(caps: &regex::Captures<'_>) -> Option<ExprKind> {
    let success_percent = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let vantage = match caps.get(2).map(|m| m.as_str()) {
        Some("adv") => SaveVantage::Advantage,
        Some("dis") => SaveVantage::Disadvantage,
        _ => SaveVantage::None,
    };
    Some(ExprKind::Save {
        success_percent,
        vantage,
    })
}

fn assign_target(target: &Expression) -> Result<StoreKind, ParseError> {
    match target.kind() {
        ExprKind::Variable(_) => Ok(StoreKind::Variable),
        ExprKind::Function(_) => Ok(StoreKind::Function),
        other => Err(ParseError::BadAssignTarget {
            text: target.raw().to_string(),
            actual: other.name(),
        }),
    }
}

// =============================================================================
// Terminals
// =============================================================================

/// One terminal descriptor, matched against the whole remaining text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Number,
    Roll,
    ArmorClass,
    SaveMod,
    ProfBonus,
    Level,
    CritMult,
    CritBinary,
    Empty,
    Variable,
    Function,
}

/// Terminal registry, tried in order once no operator matched.
pub const TERMINALS: [Terminal; 11] = [
    Terminal::Number,
    Terminal::Roll,
    Terminal::ArmorClass,
    Terminal::SaveMod,
    Terminal::ProfBonus,
    Terminal::Level,
    Terminal::CritMult,
    Terminal::CritBinary,
    Terminal::Empty,
    Terminal::Variable,
    Terminal::Function,
];

impl Terminal {
    /// Match the whole text against this terminal, producing the node kind.
    ///
    /// Integer literals only; floating-point literals match nothing and so
    /// fail the parse.
    pub fn match_text(self, text: &str) -> Option<ExprKind> {
        match self {
            Self::Number => {
                if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
                    text.parse::<f64>().ok().map(ExprKind::Number)
                } else {
                    None
                }
            }
            Self::Roll => roll_spec(text).map(ExprKind::Roll),
            Self::ArmorClass => (text == "AC").then_some(ExprKind::ArmorClass),
            Self::SaveMod => (text == "SM").then_some(ExprKind::SaveMod),
            Self::ProfBonus => (text == "PB").then_some(ExprKind::ProfBonus),
            Self::Level => (text == "LV").then_some(ExprKind::Level),
            Self::CritMult => (text == "CM").then_some(ExprKind::CritMult),
            Self::CritBinary => (text == "CB").then_some(ExprKind::CritBinary),
            Self::Empty => text.is_empty().then_some(ExprKind::Empty),
            Self::Variable => VARIABLE_RE
                .captures(text)
                .map(|c| ExprKind::Variable(c[1].to_string())),
            Self::Function => FUNCTION_RE
                .captures(text)
                .map(|c| ExprKind::Function(c[1].to_string())),
        }
    }
}

fn roll_spec(text: &str) -> Option<RollSpec> {
    let caps = ROLL_RE.captures(text)?;
    let count = match &caps[1] {
        "" => 1,
        digits => digits.parse::<u32>().ok()?,
    };
    let sides = caps[3].parse::<u32>().ok()?;
    let crit_double = &caps[2] == "D";
    let mut mods = Vec::new();
    for m in ROLL_MOD_RE.captures_iter(&caps[4]) {
        let n = &m[2];
        mods.push(match &m[1] {
            "kh" => RollMod::KeepHighest(n.parse().ok()?),
            "kl" => RollMod::KeepLowest(n.parse().ok()?),
            "rrle" => RollMod::RerollLe(n.parse().ok()?),
            "rrlt" => RollMod::RerollLt(n.parse().ok()?),
            "rrge" => RollMod::RerollGe(n.parse().ok()?),
            "rrgt" => RollMod::RerollGt(n.parse().ok()?),
            _ => RollMod::RerollEq(n.parse().ok()?),
        });
    }
    Some(RollSpec {
        count,
        sides,
        crit_double,
        mods,
    })
}
