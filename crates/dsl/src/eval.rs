//! Tree-walk evaluator
//!
//! Dispatches on [`ExprKind`]; all mutation goes through the passed
//! [`EvalState`]. Operand evaluation order and short-circuiting follow the
//! grammar contract exactly — several operators deliberately skip operand
//! evaluation, which callers can observe through assignment side effects.

use crate::ast::{ExprKind, Expression, RollMod, RollSpec, SaveVantage, StoreKind};
use crate::error::EvalError;
use crate::state::EvalState;

/// Bound on evaluation depth. A stored function that references itself
/// recurses forever; this turns that into an ordinary error instead of a
/// native stack overflow.
const MAX_EVAL_DEPTH: usize = 1_000;

/// Evaluate a compiled expression against the given state.
pub fn evaluate<'e>(expr: &'e Expression, state: &mut EvalState<'e>) -> Result<f64, EvalError> {
    state.depth += 1;
    if state.depth > MAX_EVAL_DEPTH {
        state.depth -= 1;
        return Err(EvalError::DepthLimit {
            text: expr.raw().to_string(),
        });
    }
    let result = eval_node(expr, state);
    state.depth -= 1;
    result
}

fn eval_node<'e>(expr: &'e Expression, state: &mut EvalState<'e>) -> Result<f64, EvalError> {
    let ops = expr.operands();
    match expr.kind() {
        ExprKind::Discard => {
            evaluate(&ops[0], state)?;
            evaluate(&ops[1], state)
        }
        ExprKind::Assign(target) => {
            assign(*target, &ops[0], &ops[1], state)?;
            Ok(0.0)
        }
        ExprKind::AssignEval(target) => match target {
            StoreKind::Variable => assign(*target, &ops[0], &ops[1], state),
            StoreKind::Function => {
                assign(*target, &ops[0], &ops[1], state)?;
                // Documented quirk: a freshly assigned function is evaluated
                // immediately once, side effects and all.
                evaluate(&ops[1], state)
            }
        },
        ExprKind::Check => {
            if evaluate(&ops[0], state)? != 0.0 {
                evaluate(&ops[1], state)
            } else {
                Ok(0.0)
            }
        }
        ExprKind::Attack { crit_min, vantage } => {
            let droll = vantage_roll(state, *vantage);
            let crit_miss = state.params().nat1_auto_miss && droll == 1;
            let crit = droll >= i64::from(*crit_min);
            // On a crit the attack hits outright; the to-hit operand is not
            // evaluated at all.
            let hits = !crit_miss
                && (crit
                    || evaluate(&ops[0], state)? + droll as f64 >= state.params().ac as f64);
            if hits {
                state.push_crit(crit);
                let result = evaluate(&ops[1], state);
                state.pop_crit();
                result
            } else {
                Ok(0.0)
            }
        }
        ExprKind::Save {
            success_percent,
            vantage,
        } => {
            let mut droll = state.roll(20);
            match vantage {
                SaveVantage::Advantage => droll = droll.max(state.roll(20)),
                SaveVantage::Disadvantage => droll = droll.min(state.roll(20)),
                SaveVantage::None => {}
            }
            let damage = evaluate(&ops[1], state)?;
            let dc = evaluate(&ops[0], state)?;
            if (droll + state.params().sm) as f64 >= dc {
                Ok((damage * f64::from(*success_percent) / 100.0).floor())
            } else {
                Ok(damage)
            }
        }
        ExprKind::Or => {
            let left = evaluate(&ops[0], state)?;
            if left != 0.0 {
                Ok(left)
            } else {
                evaluate(&ops[1], state)
            }
        }
        ExprKind::And => {
            let left = evaluate(&ops[0], state)?;
            if left == 0.0 {
                Ok(left)
            } else {
                evaluate(&ops[1], state)
            }
        }
        ExprKind::Ge => compare(ops, state, |l, r| l >= r),
        ExprKind::Gt => compare(ops, state, |l, r| l > r),
        ExprKind::Le => compare(ops, state, |l, r| l <= r),
        ExprKind::Lt => compare(ops, state, |l, r| l < r),
        ExprKind::Ne => compare(ops, state, |l, r| l != r),
        ExprKind::Eq => compare(ops, state, |l, r| l == r),
        ExprKind::Add => Ok(evaluate(&ops[0], state)? + evaluate(&ops[1], state)?),
        ExprKind::Sub => Ok(evaluate(&ops[0], state)? - evaluate(&ops[1], state)?),
        ExprKind::Mul => Ok(evaluate(&ops[0], state)? * evaluate(&ops[1], state)?),
        ExprKind::Div => Ok((evaluate(&ops[0], state)? / evaluate(&ops[1], state)?).floor()),
        ExprKind::Repeat => {
            let count = evaluate(&ops[0], state)?;
            if count < 0.0 {
                return Err(EvalError::NegativeRepeat {
                    count,
                    text: expr.raw().to_string(),
                });
            }
            let mut total = 0.0;
            for _ in 0..count as u64 {
                total += evaluate(&ops[1], state)?;
            }
            Ok(total)
        }
        ExprKind::Not => Ok(if evaluate(&ops[0], state)? == 0.0 {
            1.0
        } else {
            0.0
        }),
        ExprKind::Negate => Ok(-evaluate(&ops[0], state)?),
        ExprKind::Number(value) => Ok(*value),
        ExprKind::Roll(spec) => Ok(eval_roll(spec, state)),
        ExprKind::ArmorClass => Ok(state.params().ac as f64),
        ExprKind::SaveMod => Ok(state.params().sm as f64),
        ExprKind::ProfBonus => Ok(state.params().pb as f64),
        ExprKind::Level => Ok(state.params().level as f64),
        ExprKind::CritMult => Ok(if state.crit() { 2.0 } else { 1.0 }),
        ExprKind::CritBinary => Ok(if state.crit() { 1.0 } else { 0.0 }),
        ExprKind::Empty => Ok(0.0),
        ExprKind::Variable(name) => Ok(state.var(name)),
        ExprKind::Function(name) => match state.func(name) {
            Some(stored) => evaluate(stored, state),
            None => Ok(0.0),
        },
    }
}

fn assign<'e>(
    target: StoreKind,
    target_expr: &'e Expression,
    value_expr: &'e Expression,
    state: &mut EvalState<'e>,
) -> Result<f64, EvalError> {
    match (target, target_expr.kind()) {
        (StoreKind::Variable, ExprKind::Variable(name)) => {
            let value = evaluate(value_expr, state)?;
            state.set_var(name, value);
            Ok(value)
        }
        (StoreKind::Function, ExprKind::Function(name)) => {
            state.set_func(name, value_expr);
            Ok(0.0)
        }
        // Unreachable for parser-built trees: the target kind was checked
        // at parse time.
        _ => Ok(0.0),
    }
}

fn compare<'e>(
    ops: &'e [Expression],
    state: &mut EvalState<'e>,
    cmp: fn(f64, f64) -> bool,
) -> Result<f64, EvalError> {
    let left = evaluate(&ops[0], state)?;
    let right = evaluate(&ops[1], state)?;
    Ok(if cmp(left, right) { 1.0 } else { 0.0 })
}

/// Roll a d20 with a signed advantage degree: +N rolls N dice keeping the
/// highest, -N keeps the lowest, 0 and ±1 are a plain roll.
fn vantage_roll(state: &mut EvalState<'_>, vantage: i32) -> i64 {
    let mut droll = state.roll(20);
    let degree = vantage.unsigned_abs();
    for _ in 1..degree {
        let extra = state.roll(20);
        droll = if vantage > 0 {
            droll.max(extra)
        } else {
            droll.min(extra)
        };
    }
    droll
}

fn eval_roll(spec: &RollSpec, state: &mut EvalState<'_>) -> f64 {
    let mut count = spec.count as usize;
    if spec.crit_double && state.crit() {
        count *= 2;
    }
    let mut rolls: Vec<i64> = (0..count).map(|_| state.roll(spec.sides)).collect();
    for modifier in &spec.mods {
        match *modifier {
            RollMod::KeepHighest(n) => {
                rolls.sort_unstable_by(|a, b| b.cmp(a));
                rolls.truncate(n as usize);
            }
            RollMod::KeepLowest(n) => {
                rolls.sort_unstable();
                rolls.truncate(n as usize);
            }
            RollMod::RerollLe(t) => reroll(&mut rolls, state, spec.sides, |r| r <= t),
            RollMod::RerollLt(t) => reroll(&mut rolls, state, spec.sides, |r| r < t),
            RollMod::RerollGe(t) => reroll(&mut rolls, state, spec.sides, |r| r >= t),
            RollMod::RerollGt(t) => reroll(&mut rolls, state, spec.sides, |r| r > t),
            RollMod::RerollEq(t) => reroll(&mut rolls, state, spec.sides, |r| r == t),
        }
    }
    rolls.iter().sum::<i64>() as f64
}

/// Replace each die meeting the condition with one fresh roll — once per
/// die, never recursively.
fn reroll(rolls: &mut [i64], state: &mut EvalState<'_>, sides: u32, cond: impl Fn(i64) -> bool) {
    for r in rolls.iter_mut() {
        if cond(*r) {
            *r = state.roll(sides);
        }
    }
}
