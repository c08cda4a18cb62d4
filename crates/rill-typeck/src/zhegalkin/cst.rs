//! Constant effect sets.
//!
//! A [`ZhegalkinCst`] is a finite set of effect symbols or the complement
//! of one. Cofinite sets are needed because the algebra has a universe
//! constant and a complement operation; the complement of a finite set is
//! not finite. Sets are kept sorted and deduplicated (`BTreeSet`), so
//! structural equality is set equality.

use std::collections::BTreeSet;
use std::fmt;

use rill_common::EffectSym;

/// A constant set of effect symbols, finite or cofinite.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ZhegalkinCst {
    /// Exactly these symbols.
    Finite(BTreeSet<EffectSym>),
    /// Every symbol except these.
    Cofinite(BTreeSet<EffectSym>),
}

impl ZhegalkinCst {
    /// The empty set.
    pub fn empty() -> Self {
        ZhegalkinCst::Finite(BTreeSet::new())
    }

    /// The universe set.
    pub fn universe() -> Self {
        ZhegalkinCst::Cofinite(BTreeSet::new())
    }

    /// The singleton set `{sym}`.
    pub fn singleton(sym: EffectSym) -> Self {
        let mut s = BTreeSet::new();
        s.insert(sym);
        ZhegalkinCst::Finite(s)
    }

    pub fn from_symbols(syms: impl IntoIterator<Item = EffectSym>) -> Self {
        ZhegalkinCst::Finite(syms.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ZhegalkinCst::Finite(s) if s.is_empty())
    }

    pub fn is_universe(&self) -> bool {
        matches!(self, ZhegalkinCst::Cofinite(s) if s.is_empty())
    }

    /// Set complement.
    pub fn complement(&self) -> Self {
        match self {
            ZhegalkinCst::Finite(s) => ZhegalkinCst::Cofinite(s.clone()),
            ZhegalkinCst::Cofinite(s) => ZhegalkinCst::Finite(s.clone()),
        }
    }

    /// Set union.
    pub fn union(&self, other: &Self) -> Self {
        use ZhegalkinCst::*;
        // Union with the universe is the universe; with the empty set, the
        // other argument unchanged.
        if self.is_universe() || other.is_empty() {
            return self.clone();
        }
        if other.is_universe() || self.is_empty() {
            return other.clone();
        }
        match (self, other) {
            (Finite(a), Finite(b)) => Finite(a.union(b).cloned().collect()),
            (Finite(a), Cofinite(b)) => Cofinite(b.difference(a).cloned().collect()),
            (Cofinite(a), Finite(b)) => Cofinite(a.difference(b).cloned().collect()),
            (Cofinite(a), Cofinite(b)) => Cofinite(a.intersection(b).cloned().collect()),
        }
    }

    /// Set intersection. Intersection with the universe returns the other
    /// argument without allocation.
    pub fn inter(&self, other: &Self) -> Self {
        use ZhegalkinCst::*;
        if self.is_universe() || other.is_empty() {
            return other.clone();
        }
        if other.is_universe() || self.is_empty() {
            return self.clone();
        }
        match (self, other) {
            (Finite(a), Finite(b)) => Finite(a.intersection(b).cloned().collect()),
            (Finite(a), Cofinite(b)) => Finite(a.difference(b).cloned().collect()),
            (Cofinite(a), Finite(b)) => Finite(b.difference(a).cloned().collect()),
            (Cofinite(a), Cofinite(b)) => Cofinite(a.union(b).cloned().collect()),
        }
    }

    /// Symmetric difference, the ⊕ of the algebra.
    pub fn xor(&self, other: &Self) -> Self {
        use ZhegalkinCst::*;
        match (self, other) {
            (Finite(a), Finite(b)) => Finite(a.symmetric_difference(b).cloned().collect()),
            (Finite(a), Cofinite(b)) => Cofinite(a.symmetric_difference(b).cloned().collect()),
            (Cofinite(a), Finite(b)) => Cofinite(a.symmetric_difference(b).cloned().collect()),
            (Cofinite(a), Cofinite(b)) => Finite(a.symmetric_difference(b).cloned().collect()),
        }
    }
}

impl fmt::Display for ZhegalkinCst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_set = |s: &BTreeSet<EffectSym>, f: &mut fmt::Formatter<'_>| -> fmt::Result {
            write!(f, "{{")?;
            for (i, sym) in s.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", sym)?;
            }
            write!(f, "}}")
        };
        match self {
            ZhegalkinCst::Finite(s) => write_set(s, f),
            ZhegalkinCst::Cofinite(s) if s.is_empty() => write!(f, "Univ"),
            ZhegalkinCst::Cofinite(s) => {
                write!(f, "~")?;
                write_set(s, f)
            }
        }
    }
}
