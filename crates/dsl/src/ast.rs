//! Expression tree for the damage-formula language
//!
//! Nodes are built by the parser and never mutated afterwards. A node owns
//! its operand sub-trees; evaluation is a tree-walk dispatching on
//! [`ExprKind`].

/// What an assignment stores into: the variable registry or the function
/// registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Variable,
    Function,
}

/// Advantage state for a saving throw (single extra die).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveVantage {
    #[default]
    None,
    Advantage,
    Disadvantage,
}

/// A post-roll operation applied to the dice buffer, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollMod {
    /// `khN`: keep the highest N dice.
    KeepHighest(u32),
    /// `klN`: keep the lowest N dice.
    KeepLowest(u32),
    /// `rrleN`: reroll each die <= N, once per die.
    RerollLe(i64),
    /// `rrltN`: reroll each die < N, once per die.
    RerollLt(i64),
    /// `rrgeN`: reroll each die >= N, once per die.
    RerollGe(i64),
    /// `rrgtN`: reroll each die > N, once per die.
    RerollGt(i64),
    /// `rreqN`: reroll each die == N, once per die.
    RerollEq(i64),
}

/// A parsed dice-roll terminal, e.g. `4d6rrle2kh2` or `1D12`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollSpec {
    /// Number of dice rolled.
    pub count: u32,
    /// Faces per die.
    pub sides: u32,
    /// True for the uppercase-D form: the dice count is doubled while the
    /// crit flag is set.
    pub crit_double: bool,
    /// Suffix chain, applied in source order.
    pub mods: Vec<RollMod>,
}

/// Node type tag plus type-specific parsed properties.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // Binary operators, in registry order.
    Discard,
    Assign(StoreKind),
    AssignEval(StoreKind),
    Check,
    Attack { crit_min: u32, vantage: i32 },
    Save { success_percent: u32, vantage: SaveVantage },
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

    // Unary operators.
    Not,
    Negate,

    // Terminals.
    Number(f64),
    Roll(RollSpec),
    ArmorClass,
    SaveMod,
    ProfBonus,
    Level,
    CritMult,
    CritBinary,
    Empty,
    Variable(String),
    Function(String),
}

impl ExprKind {
    /// Human-readable type name, used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Discard => "Discard",
            Self::Assign(_) => "Assign",
            Self::AssignEval(_) => "Assign (and Evaluate)",
            Self::Check => "Check",
            Self::Attack { .. } => "Attack",
            Self::Save { .. } => "Save",
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
            Self::Number(_) => "Number",
            Self::Roll(_) => "Roll Dice",
            Self::ArmorClass => "Armor Class",
            Self::SaveMod => "Save Modifier",
            Self::ProfBonus => "Proficiency Bonus",
            Self::Level => "Level",
            Self::CritMult => "Critical Multiplier",
            Self::CritBinary => "Critical Binary",
            Self::Empty => "Empty",
            Self::Variable(_) => "Variable",
            Self::Function(_) => "Function",
        }
    }
}

/// An immutable, compiled expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    kind: ExprKind,
    raw: String,
    operands: Vec<Expression>,
}

impl Expression {
    pub fn new(kind: ExprKind, raw: impl Into<String>, operands: Vec<Expression>) -> Self {
        Self {
            kind,
            raw: raw.into(),
            operands,
        }
    }

    /// The trivial `0` literal, used as the tree for failed compilations so
    /// downstream code can treat every simulation uniformly.
    pub fn zero() -> Self {
        Self::new(ExprKind::Number(0.0), "0", Vec::new())
    }

    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    /// The source slice this node was parsed from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn operands(&self) -> &[Expression] {
        &self.operands
    }

    /// Depth-first pre-order traversal of this node and all descendants.
    ///
    /// Explicit stack, restartable; used for static analysis such as
    /// discovering which parameters a simulation references.
    pub fn iter(&self) -> ExprIter<'_> {
        ExprIter { stack: vec![self] }
    }

    /// True if any node in the tree satisfies the predicate.
    pub fn any(&self, mut pred: impl FnMut(&ExprKind) -> bool) -> bool {
        self.iter().any(|e| pred(&e.kind))
    }
}

/// Stack-based DFS iterator over an expression tree.
pub struct ExprIter<'a> {
    stack: Vec<&'a Expression>,
}

impl<'a> Iterator for ExprIter<'a> {
    type Item = &'a Expression;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Push in reverse so operands come off the stack in source order.
        for child in node.operands.iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}
