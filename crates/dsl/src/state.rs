//! Per-iteration evaluation state
//!
//! One [`EvalState`] is owned by exactly one in-flight evaluation run. The
//! static parameters survive [`EvalState::reset`], so a state (and its
//! allocations) can be reused across many Monte-Carlo iterations.

use std::collections::HashMap;

use crate::ast::Expression;
use crate::rng::RollSource;

/// Read-only parameters a simulation is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimParams {
    /// Target armor class (`AC`).
    pub ac: i64,
    /// Attacker proficiency bonus (`PB`).
    pub pb: i64,
    /// Character level (`LV`).
    pub level: i64,
    /// Target saving-throw modifier (`SM`).
    pub sm: i64,
    /// Whether a natural 1 on an attack roll misses regardless of
    /// modifiers. The grammar has existed both with and without this rule,
    /// so it is an explicit switch rather than a buried constant.
    pub nat1_auto_miss: bool,
}

impl SimParams {
    pub fn new(ac: i64, pb: i64, level: i64, sm: i64) -> Self {
        Self {
            ac,
            pb,
            level,
            sm,
            nat1_auto_miss: true,
        }
    }

    /// Derive the standard parameter set for a level/AC pairing: the
    /// proficiency bonus follows the usual `(7 + level) / 4` progression and
    /// the save modifier tracks AC with an optional flat offset.
    pub fn for_level(level: i64, ac: i64, sm_offset: i64) -> Self {
        Self::new(ac, (7 + level) / 4, level, ac - 10 + sm_offset)
    }
}

/// Mutable environment threaded through every evaluator call.
pub struct EvalState<'e> {
    params: SimParams,
    crit_stack: Vec<bool>,
    vars: HashMap<String, f64>,
    funcs: HashMap<String, &'e Expression>,
    rng: Box<dyn RollSource>,
    /// Current evaluation depth; bounded by the evaluator to keep
    /// self-referencing functions from exhausting the native stack.
    pub(crate) depth: usize,
}

impl<'e> EvalState<'e> {
    pub fn new(params: SimParams, rng: Box<dyn RollSource>) -> Self {
        Self {
            params,
            crit_stack: Vec::new(),
            vars: HashMap::new(),
            funcs: HashMap::new(),
            rng,
            depth: 0,
        }
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Whether the innermost enclosing attack was a critical hit.
    pub fn crit(&self) -> bool {
        self.crit_stack.last().copied().unwrap_or(false)
    }

    pub fn push_crit(&mut self, crit: bool) {
        self.crit_stack.push(crit);
    }

    pub fn pop_crit(&mut self) {
        self.crit_stack.pop();
    }

    /// Current value of a variable; unset variables read as 0.
    pub fn var(&self, name: &str) -> f64 {
        self.vars.get(name).copied().unwrap_or(0.0)
    }

    pub fn set_var(&mut self, name: &str, value: f64) {
        self.vars.insert(name.to_string(), value);
    }

    /// The expression stored under a function name, if any. Callers
    /// re-evaluate it on every reference; results are never cached.
    pub fn func(&self, name: &str) -> Option<&'e Expression> {
        self.funcs.get(name).copied()
    }

    pub fn set_func(&mut self, name: &str, expr: &'e Expression) {
        self.funcs.insert(name.to_string(), expr);
    }

    /// Roll one die with the given number of sides.
    pub fn roll(&mut self, sides: u32) -> i64 {
        (self.rng.next_unit() * f64::from(sides)).floor() as i64 + 1
    }

    /// Clear all dynamic state for the next iteration, keeping the static
    /// parameters, the RNG stream, and the map allocations.
    pub fn reset(&mut self) {
        self.crit_stack.clear();
        self.vars.clear();
        self.funcs.clear();
        self.depth = 0;
    }
}

impl std::fmt::Debug for EvalState<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalState")
            .field("params", &self.params)
            .field("crit_stack", &self.crit_stack)
            .field("vars", &self.vars)
            .field("funcs", &self.funcs.keys())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Mulberry32;

    fn state() -> EvalState<'static> {
        EvalState::new(SimParams::new(10, 2, 1, 0), Box::new(Mulberry32::new(7)))
    }

    #[test]
    fn crit_reads_top_of_stack_or_false() {
        let mut s = state();
        assert!(!s.crit());
        s.push_crit(true);
        assert!(s.crit());
        s.push_crit(false);
        assert!(!s.crit());
        s.pop_crit();
        assert!(s.crit());
        s.pop_crit();
        assert!(!s.crit());
    }

    #[test]
    fn unset_variables_default_to_zero() {
        let mut s = state();
        assert_eq!(s.var("a"), 0.0);
        s.set_var("a", 3.5);
        assert_eq!(s.var("a"), 3.5);
    }

    #[test]
    fn reset_clears_dynamic_state_only() {
        let mut s = state();
        s.set_var("a", 1.0);
        s.push_crit(true);
        s.reset();
        assert_eq!(s.var("a"), 0.0);
        assert!(!s.crit());
        assert_eq!(s.params().ac, 10);
    }

    #[test]
    fn rolls_stay_in_die_range() {
        let mut s = state();
        for _ in 0..1_000 {
            let r = s.roll(6);
            assert!((1..=6).contains(&r));
        }
    }

    #[test]
    fn for_level_derives_proficiency_and_save_mod() {
        let p = SimParams::for_level(1, 15, 0);
        assert_eq!(p.pb, 2);
        assert_eq!(p.sm, 5);
        let p = SimParams::for_level(9, 16, -2);
        assert_eq!(p.pb, 4);
        assert_eq!(p.sm, 4);
        let p = SimParams::for_level(17, 18, 0);
        assert_eq!(p.pb, 6);
    }
}
