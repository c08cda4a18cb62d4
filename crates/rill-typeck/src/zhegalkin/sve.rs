//! Successive variable elimination over Zhegalkin expressions.
//!
//! Solves equations of the form `e ≡ ∅` by eliminating one flexible
//! variable at a time, in ascending identity order, so that the computed
//! unifier is canonical per equivalence class of queries. Rigid variables
//! are never eliminated: a residual expression over rigid variables only
//! has a unifier exactly when it is already the empty constant.

use std::fmt;

use rustc_hash::FxHashMap;

use rill_types::VarId;

use super::expr::{ZhegalkinExpr, ZhegalkinVar};

/// A substitution from effect variables to Zhegalkin expressions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZhegalkinSubst {
    bindings: FxHashMap<VarId, ZhegalkinExpr>,
}

impl ZhegalkinSubst {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn singleton(var: ZhegalkinVar, e: ZhegalkinExpr) -> Self {
        let mut bindings = FxHashMap::default();
        bindings.insert(var.id, e);
        ZhegalkinSubst { bindings }
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn get(&self, id: VarId) -> Option<&ZhegalkinExpr> {
        self.bindings.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VarId, &ZhegalkinExpr)> {
        self.bindings.iter()
    }

    /// Apply the substitution to an expression.
    pub fn apply(&self, e: &ZhegalkinExpr) -> ZhegalkinExpr {
        let mut result = e.clone();
        for var in e.free_vars() {
            if let Some(replacement) = self.bindings.get(&var.id) {
                result = result.substitute_var(var, replacement);
            }
        }
        result
    }

    /// Extend with a binding for `var`, applying the new binding to the
    /// range of the existing bindings first so the result stays idempotent.
    pub fn extended(mut self, var: ZhegalkinVar, e: ZhegalkinExpr) -> Self {
        let single = ZhegalkinSubst::singleton(var, e.clone());
        for bound in self.bindings.values_mut() {
            *bound = single.apply(bound);
        }
        self.bindings.entry(var.id).or_insert(e);
        self
    }
}

impl std::hash::Hash for ZhegalkinSubst {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // Order-independent: xor the hashes of the individual bindings.
        let mut acc: u64 = 0;
        for (id, e) in &self.bindings {
            let mut h = rustc_hash::FxHasher::default();
            std::hash::Hash::hash(id, &mut h);
            std::hash::Hash::hash(e, &mut h);
            acc ^= std::hash::Hasher::finish(&h);
        }
        state.write_u64(acc);
    }
}

impl fmt::Display for ZhegalkinSubst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        let mut entries: Vec<_> = self.bindings.iter().collect();
        entries.sort_by_key(|(id, _)| **id);
        for (i, (id, e)) in entries.into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "x{} ↦ {}", id.0, e)?;
        }
        write!(f, "}}")
    }
}

/// Solve `e ≡ ∅` for the flexible variables of `e`.
///
/// For the least flexible variable `x`, split into `t0 = e[x ↦ ∅]` and
/// `t1 = e[x ↦ ⊤]`, recursively solve `t0 ⊗ t1 ≡ ∅`, and bind `x` to the
/// Boole reproductive solution `σ(t0) ∪ (c ⊗ ¬σ(t1))` for a fresh flexible
/// variable `c`. The base case has no flexible variables left and succeeds
/// exactly when the residual is the empty constant.
pub fn successive_variable_elimination(
    e: &ZhegalkinExpr,
    fresh: &mut impl FnMut() -> ZhegalkinVar,
) -> Option<ZhegalkinSubst> {
    let flexible: Vec<ZhegalkinVar> =
        e.free_vars().into_iter().filter(|v| v.flexible).collect();
    eliminate(e, &flexible, fresh)
}

fn eliminate(
    e: &ZhegalkinExpr,
    flexible: &[ZhegalkinVar],
    fresh: &mut impl FnMut() -> ZhegalkinVar,
) -> Option<ZhegalkinSubst> {
    match flexible.split_first() {
        None => {
            if e.is_zero() {
                Some(ZhegalkinSubst::empty())
            } else {
                None
            }
        }
        Some((x, rest)) => {
            let t0 = e.assign_bottom(*x);
            let t1 = e.assign_top(*x);
            let se = eliminate(&t0.inter(&t1), rest, fresh)?;
            let c = ZhegalkinExpr::from_var(fresh());
            let solution = se.apply(&t0).union(&c.inter(&se.apply(&t1).not()));
            Some(se.extended(*x, solution))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zhegalkin::cst::ZhegalkinCst;
    use rill_common::EffectSym;

    fn var(id: u32) -> ZhegalkinVar {
        ZhegalkinVar::flexible(VarId(id))
    }

    fn fresh_from(start: u32) -> impl FnMut() -> ZhegalkinVar {
        let mut next = start;
        move || {
            next += 1;
            ZhegalkinVar::flexible(VarId(next))
        }
    }

    /// Check that a solution actually zeroes the equation under arbitrary
    /// instantiations of the parameter variables.
    fn assert_sound(e: &ZhegalkinExpr, subst: &ZhegalkinSubst) {
        let applied = subst.apply(e);
        let io = ZhegalkinCst::singleton(EffectSym::new("IO"));
        let candidates = [ZhegalkinCst::empty(), ZhegalkinCst::universe(), io];
        let params = applied.free_vars();
        // Exhaustively assign every remaining parameter over the candidate
        // constants (the formulas in these tests stay tiny).
        let mut assignment = FxHashMap::default();
        check_all(&applied, &params, &candidates, &mut assignment);
    }

    fn check_all(
        e: &ZhegalkinExpr,
        params: &[ZhegalkinVar],
        candidates: &[ZhegalkinCst],
        assignment: &mut FxHashMap<VarId, ZhegalkinCst>,
    ) {
        match params.split_first() {
            None => {
                assert!(
                    e.eval(assignment).is_empty(),
                    "unsound solution: {} under {:?}",
                    e,
                    assignment
                );
            }
            Some((p, rest)) => {
                for c in candidates {
                    assignment.insert(p.id, c.clone());
                    check_all(e, rest, candidates, assignment);
                }
                assignment.remove(&p.id);
            }
        }
    }

    #[test]
    fn solves_bare_variable_to_empty() {
        let e = ZhegalkinExpr::from_var(var(1));
        let subst = successive_variable_elimination(&e, &mut fresh_from(100)).expect("unifier");
        assert!(subst.apply(&e).is_zero());
    }

    #[test]
    fn solves_var_xor_universe() {
        // x ⊕ ⊤ ≡ ∅ forces x = ⊤.
        let e = ZhegalkinExpr::from_var(var(1)).xor(&ZhegalkinExpr::one());
        let subst = successive_variable_elimination(&e, &mut fresh_from(100)).expect("unifier");
        assert_eq!(subst.apply(&e), ZhegalkinExpr::zero());
        assert_eq!(subst.get(VarId(1)), Some(&ZhegalkinExpr::one()));
    }

    #[test]
    fn fails_on_nonempty_constant() {
        let e = ZhegalkinExpr::from_cst(ZhegalkinCst::singleton(EffectSym::new("IO")));
        assert!(successive_variable_elimination(&e, &mut fresh_from(100)).is_none());
    }

    #[test]
    fn fails_on_rigid_only_residual() {
        let e = ZhegalkinExpr::from_var(ZhegalkinVar::rigid(VarId(1)));
        assert!(successive_variable_elimination(&e, &mut fresh_from(100)).is_none());
    }

    #[test]
    fn two_variable_equation_is_sound() {
        // x1 ⊕ x2 ≡ ∅, i.e. x1 = x2: the solution is parametric.
        let e = ZhegalkinExpr::from_var(var(1)).xor(&ZhegalkinExpr::from_var(var(2)));
        let subst = successive_variable_elimination(&e, &mut fresh_from(100)).expect("unifier");
        assert_sound(&e, &subst);
    }

    #[test]
    fn var_equals_constant_is_sound() {
        // x1 ⊕ {IO} ≡ ∅ forces x1 = {IO}.
        let io = ZhegalkinExpr::from_cst(ZhegalkinCst::singleton(EffectSym::new("IO")));
        let e = ZhegalkinExpr::from_var(var(1)).xor(&io);
        let subst = successive_variable_elimination(&e, &mut fresh_from(100)).expect("unifier");
        assert_sound(&e, &subst);
        assert_eq!(subst.get(VarId(1)), Some(&io));
    }

    #[test]
    fn mixed_rigid_flexible_equation() {
        // x1 ⊕ r ≡ ∅ where r is rigid: forces x1 = r.
        let rigid = ZhegalkinExpr::from_var(ZhegalkinVar::rigid(VarId(9)));
        let e = ZhegalkinExpr::from_var(var(1)).xor(&rigid);
        let subst = successive_variable_elimination(&e, &mut fresh_from(100)).expect("unifier");
        assert_sound(&e, &subst);
    }

    #[test]
    fn elimination_order_is_deterministic() {
        let e = ZhegalkinExpr::from_var(var(2)).xor(&ZhegalkinExpr::from_var(var(1)));
        let s1 = successive_variable_elimination(&e, &mut fresh_from(100)).expect("unifier");
        let s2 = successive_variable_elimination(&e, &mut fresh_from(100)).expect("unifier");
        assert_eq!(s1, s2);
    }
}
