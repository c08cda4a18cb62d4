//! Zhegalkin polynomials over constant effect sets.
//!
//! An expression has the canonical form `c0 ⊕ ⊕ᵢ (cᵢ ⊗ x_{i,1} ⊗ … ⊗
//! x_{i,kᵢ})`. Invariants maintained by every operation:
//!
//! - each term's variable list is sorted, distinct, and nonempty;
//! - no term has the empty constant;
//! - no two terms share the same variable list (terms are merged by xor);
//! - the term list is sorted by variable list.
//!
//! Under these invariants structural equality coincides with semantic
//! equality, which is what makes the form usable as a cache key and makes
//! `e ≡ ∅` decidable by looking at the representation.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use rustc_hash::FxHashMap;

use rill_types::VarId;

use super::cst::ZhegalkinCst;

/// An effect variable inside a Zhegalkin expression. Rigid variables are
/// never eliminated by SVE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZhegalkinVar {
    pub id: VarId,
    pub flexible: bool,
}

impl ZhegalkinVar {
    pub fn flexible(id: VarId) -> Self {
        Self { id, flexible: true }
    }

    pub fn rigid(id: VarId) -> Self {
        Self { id, flexible: false }
    }
}

impl fmt::Display for ZhegalkinVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.flexible {
            write!(f, "x{}", self.id.0)
        } else {
            write!(f, "x{}!", self.id.0)
        }
    }
}

/// One term `c ⊗ x₁ ⊗ … ⊗ xₖ`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZhegalkinTerm {
    pub cst: ZhegalkinCst,
    /// Sorted, distinct, nonempty.
    pub vars: Vec<ZhegalkinVar>,
}

impl fmt::Display for ZhegalkinTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cst)?;
        for v in &self.vars {
            write!(f, " ∩ {}", v)?;
        }
        Ok(())
    }
}

/// A Zhegalkin polynomial `c0 ⊕ t₁ ⊕ … ⊕ tₙ` in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZhegalkinExpr {
    pub cst: ZhegalkinCst,
    pub terms: Vec<ZhegalkinTerm>,
}

impl ZhegalkinExpr {
    /// The empty set (the zero of the algebra).
    pub fn zero() -> Self {
        ZhegalkinExpr { cst: ZhegalkinCst::empty(), terms: Vec::new() }
    }

    /// The universe (the one of the algebra).
    pub fn one() -> Self {
        ZhegalkinExpr { cst: ZhegalkinCst::universe(), terms: Vec::new() }
    }

    /// A bare constant.
    pub fn from_cst(cst: ZhegalkinCst) -> Self {
        ZhegalkinExpr { cst, terms: Vec::new() }
    }

    /// A bare variable: `∅ ⊕ (⊤ ⊗ x)`.
    pub fn from_var(var: ZhegalkinVar) -> Self {
        ZhegalkinExpr {
            cst: ZhegalkinCst::empty(),
            terms: vec![ZhegalkinTerm { cst: ZhegalkinCst::universe(), vars: vec![var] }],
        }
    }

    /// Whether this is structurally (hence semantically) the empty set.
    pub fn is_zero(&self) -> bool {
        self.cst.is_empty() && self.terms.is_empty()
    }

    /// Whether this is a bare constant.
    pub fn as_cst(&self) -> Option<&ZhegalkinCst> {
        if self.terms.is_empty() {
            Some(&self.cst)
        } else {
            None
        }
    }

    /// All variables occurring in the expression, in ascending order.
    pub fn free_vars(&self) -> Vec<ZhegalkinVar> {
        let mut set = BTreeSet::new();
        for term in &self.terms {
            for v in &term.vars {
                set.insert(*v);
            }
        }
        set.into_iter().collect()
    }

    /// Rebuild a canonical expression from an accumulator of
    /// variable-combination -> constant.
    fn from_acc(cst: ZhegalkinCst, acc: BTreeMap<Vec<ZhegalkinVar>, ZhegalkinCst>) -> Self {
        let terms = acc
            .into_iter()
            .filter(|(_, c)| !c.is_empty())
            .map(|(vars, cst)| ZhegalkinTerm { cst, vars })
            .collect();
        ZhegalkinExpr { cst, terms }
    }

    /// Fold the expression's terms into an accumulator keyed by variable
    /// combination, xor-merging constants on collision.
    fn accumulate(&self, acc: &mut BTreeMap<Vec<ZhegalkinVar>, ZhegalkinCst>) {
        for term in &self.terms {
            match acc.get_mut(&term.vars) {
                Some(c) => *c = c.xor(&term.cst),
                None => {
                    acc.insert(term.vars.clone(), term.cst.clone());
                }
            }
        }
    }

    // ── Algebra ─────────────────────────────────────────────────────────

    /// Exclusive or: `a ⊕ b`.
    pub fn xor(&self, other: &Self) -> Self {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }
        let cst = self.cst.xor(&other.cst);
        let mut acc = BTreeMap::new();
        self.accumulate(&mut acc);
        other.accumulate(&mut acc);
        ZhegalkinExpr::from_acc(cst, acc)
    }

    /// Intersection: `a ⊗ b`, by distributing terms.
    pub fn inter(&self, other: &Self) -> Self {
        // Intersection with the universe returns the other argument
        // unchanged; with the empty set, the empty set.
        if self.is_zero() || other.is_zero() {
            return ZhegalkinExpr::zero();
        }
        if let Some(c) = self.as_cst() {
            if c.is_universe() {
                return other.clone();
            }
        }
        if let Some(c) = other.as_cst() {
            if c.is_universe() {
                return self.clone();
            }
        }
        let cst = self.cst.inter(&other.cst);
        let mut acc: BTreeMap<Vec<ZhegalkinVar>, ZhegalkinCst> = BTreeMap::new();
        let mut add = |vars: Vec<ZhegalkinVar>, c: ZhegalkinCst| {
            if c.is_empty() {
                return;
            }
            match acc.get_mut(&vars) {
                Some(old) => *old = old.xor(&c),
                None => {
                    acc.insert(vars, c);
                }
            }
        };
        // c_a ⊗ t for every term t of b.
        for t in &other.terms {
            add(t.vars.clone(), self.cst.inter(&t.cst));
        }
        // s ⊗ c_b for every term s of a.
        for s in &self.terms {
            add(s.vars.clone(), s.cst.inter(&other.cst));
        }
        // s ⊗ t pairwise: constants intersect, variable lists merge.
        for s in &self.terms {
            for t in &other.terms {
                let c = s.cst.inter(&t.cst);
                if c.is_empty() {
                    continue;
                }
                let mut vars: BTreeSet<ZhegalkinVar> = s.vars.iter().copied().collect();
                vars.extend(t.vars.iter().copied());
                add(vars.into_iter().collect(), c);
            }
        }
        ZhegalkinExpr::from_acc(cst, acc)
    }

    /// Union: `a ∪ b = a ⊕ b ⊕ (a ⊗ b)`.
    pub fn union(&self, other: &Self) -> Self {
        self.xor(other).xor(&self.inter(other))
    }

    /// Complement: `¬a = ⊤ ⊕ a`.
    pub fn not(&self) -> Self {
        ZhegalkinExpr::one().xor(self)
    }

    // ── Variable assignment & substitution ──────────────────────────────

    /// `e[x ↦ ∅]`: drop every term mentioning `x`.
    pub fn assign_bottom(&self, x: ZhegalkinVar) -> Self {
        let terms = self.terms.iter().filter(|t| !t.vars.contains(&x)).cloned().collect();
        ZhegalkinExpr { cst: self.cst.clone(), terms }
    }

    /// `e[x ↦ ⊤]`: erase `x` from every term, merging collisions.
    pub fn assign_top(&self, x: ZhegalkinVar) -> Self {
        let mut acc = BTreeMap::new();
        for term in &self.terms {
            let vars: Vec<ZhegalkinVar> =
                term.vars.iter().copied().filter(|v| *v != x).collect();
            if vars.is_empty() {
                // The term collapses into the constant; handled below.
                continue;
            }
            match acc.get_mut(&vars) {
                Some(c) => {
                    let merged: ZhegalkinCst = term.cst.xor(c);
                    *c = merged;
                }
                None => {
                    acc.insert(vars, term.cst.clone());
                }
            }
        }
        let mut cst = self.cst.clone();
        for term in &self.terms {
            if term.vars.len() == 1 && term.vars[0] == x {
                cst = cst.xor(&term.cst);
            }
        }
        ZhegalkinExpr::from_acc(cst, acc)
    }

    /// Substitute an expression for a variable, renormalizing.
    pub fn substitute_var(&self, x: ZhegalkinVar, e: &ZhegalkinExpr) -> Self {
        if !self.terms.iter().any(|t| t.vars.contains(&x)) {
            return self.clone();
        }
        let mut result = ZhegalkinExpr::from_cst(self.cst.clone());
        for term in &self.terms {
            let mut term_expr = ZhegalkinExpr::from_cst(term.cst.clone());
            for v in &term.vars {
                let factor = if *v == x { e.clone() } else { ZhegalkinExpr::from_var(*v) };
                term_expr = term_expr.inter(&factor);
            }
            result = result.xor(&term_expr);
        }
        result
    }

    /// Evaluate under a total assignment of variables to constant sets.
    /// Unassigned variables evaluate to the empty set. Used by the property
    /// tests to cross-check the algebra against plain set semantics.
    pub fn eval(&self, assignment: &FxHashMap<VarId, ZhegalkinCst>) -> ZhegalkinCst {
        let mut result = self.cst.clone();
        for term in &self.terms {
            let mut value = term.cst.clone();
            for v in &term.vars {
                let bound = assignment.get(&v.id).cloned().unwrap_or_else(ZhegalkinCst::empty);
                value = value.inter(&bound);
            }
            result = result.xor(&value);
        }
        result
    }
}

impl fmt::Display for ZhegalkinExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cst)?;
        for term in &self.terms {
            write!(f, " ⊕ ({})", term)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_common::EffectSym;

    fn var(id: u32) -> ZhegalkinVar {
        ZhegalkinVar::flexible(VarId(id))
    }

    fn cst(names: &[&str]) -> ZhegalkinCst {
        ZhegalkinCst::from_symbols(names.iter().map(|n| EffectSym::new(*n)))
    }

    #[test]
    fn xor_cancels_itself() {
        let e = ZhegalkinExpr::from_var(var(1)).union(&ZhegalkinExpr::from_cst(cst(&["A"])));
        assert!(e.xor(&e).is_zero());
    }

    #[test]
    fn union_with_zero_is_identity() {
        let e = ZhegalkinExpr::from_var(var(1));
        assert_eq!(e.union(&ZhegalkinExpr::zero()), e);
    }

    #[test]
    fn inter_with_one_is_identity_without_rebuilding() {
        let e = ZhegalkinExpr::from_var(var(1)).union(&ZhegalkinExpr::from_cst(cst(&["A"])));
        assert_eq!(e.inter(&ZhegalkinExpr::one()), e);
        assert_eq!(ZhegalkinExpr::one().inter(&e), e);
    }

    #[test]
    fn double_complement_is_identity() {
        let e = ZhegalkinExpr::from_var(var(1)).union(&ZhegalkinExpr::from_cst(cst(&["A"])));
        assert_eq!(e.not().not(), e);
    }

    #[test]
    fn idempotent_intersection() {
        let x = ZhegalkinExpr::from_var(var(1));
        assert_eq!(x.inter(&x), x);
    }

    #[test]
    fn union_is_commutative_in_normal_form() {
        let a = ZhegalkinExpr::from_var(var(1)).union(&ZhegalkinExpr::from_cst(cst(&["A"])));
        let b = ZhegalkinExpr::from_var(var(2));
        assert_eq!(a.union(&b), b.union(&a));
    }

    #[test]
    fn distributivity_example_normalizes_regardless_of_operand_order() {
        // (x1 ∪ x2) ∩ (x1 ∪ x3) = x1 ∪ (x2 ∩ x3)
        let x1 = ZhegalkinExpr::from_var(var(1));
        let x2 = ZhegalkinExpr::from_var(var(2));
        let x3 = ZhegalkinExpr::from_var(var(3));
        let lhs = x1.union(&x2).inter(&x1.union(&x3));
        let rhs = x1.union(&x2.inter(&x3));
        assert_eq!(lhs, rhs);
        let flipped = x3.union(&x1).inter(&x2.union(&x1));
        assert_eq!(flipped, rhs);
    }

    #[test]
    fn assign_top_and_bottom() {
        // e = {A} ⊕ (⊤ ⊗ x1) ⊕ ({B} ⊗ x1 ⊗ x2)
        let e = ZhegalkinExpr::from_cst(cst(&["A"]))
            .xor(&ZhegalkinExpr::from_var(var(1)))
            .xor(&ZhegalkinExpr::from_var(var(1)).inter(&ZhegalkinExpr::from_var(var(2)).inter(&ZhegalkinExpr::from_cst(cst(&["B"])))));
        let bot = e.assign_bottom(var(1));
        assert_eq!(bot, ZhegalkinExpr::from_cst(cst(&["A"])));
        let top = e.assign_top(var(1));
        // {A} ⊕ ⊤ ⊕ ({B} ⊗ x2)
        let expected = ZhegalkinExpr::from_cst(cst(&["A"]).xor(&ZhegalkinCst::universe()))
            .xor(&ZhegalkinExpr::from_var(var(2)).inter(&ZhegalkinExpr::from_cst(cst(&["B"]))));
        assert_eq!(top, expected);
    }

    #[test]
    fn substitute_var_matches_assign() {
        let e = ZhegalkinExpr::from_cst(cst(&["A"]))
            .xor(&ZhegalkinExpr::from_var(var(1)).inter(&ZhegalkinExpr::from_cst(cst(&["B"]))));
        assert_eq!(e.substitute_var(var(1), &ZhegalkinExpr::zero()), e.assign_bottom(var(1)));
        assert_eq!(e.substitute_var(var(1), &ZhegalkinExpr::one()), e.assign_top(var(1)));
    }

    #[test]
    fn eval_agrees_with_algebra() {
        let x1 = ZhegalkinExpr::from_var(var(1));
        let e = x1.union(&ZhegalkinExpr::from_cst(cst(&["A"])));
        let mut asg = FxHashMap::default();
        asg.insert(VarId(1), cst(&["B"]));
        assert_eq!(e.eval(&asg), cst(&["A", "B"]));
    }
}
