//! Kinds classify type terms.
//!
//! Every type variable and constructor carries a kind; unification checks
//! kind subsumption before binding a variable. `Record`, `Schema`, and
//! `Bool` are transparently subkinds of `Star`; `Wild` stands for a kind
//! the earlier kind-inference stage could not determine and is compatible
//! with everything.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of a type term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// The kind of ordinary value types.
    Star,
    /// The kind of boolean formula types.
    Bool,
    /// The kind of effect formulas.
    Effect,
    /// The kind of record rows.
    Record,
    /// The kind of schema rows.
    Schema,
    /// An undetermined kind, compatible with any other.
    Wild,
    /// A type-level function kind.
    Arrow(Box<Kind>, Box<Kind>),
}

impl Kind {
    /// Build `k1 -> k2`.
    pub fn arrow(k1: Kind, k2: Kind) -> Kind {
        Kind::Arrow(Box::new(k1), Box::new(k2))
    }

    /// Build the curried kind `ks_1 -> ... -> ks_n -> ret`.
    pub fn arrow_chain(ks: impl IntoIterator<Item = Kind>, ret: Kind) -> Kind {
        let ks: Vec<Kind> = ks.into_iter().collect();
        ks.into_iter().rev().fold(ret, |acc, k| Kind::arrow(k, acc))
    }

    /// Subkinding: whether `self <: other`.
    ///
    /// `Record`, `Schema`, and `Bool` are subkinds of `Star`; `Wild` is
    /// compatible in both directions; arrows are pointwise.
    pub fn sub_kind_of(&self, other: &Kind) -> bool {
        match (self, other) {
            (Kind::Wild, _) | (_, Kind::Wild) => true,
            (Kind::Record, Kind::Star) => true,
            (Kind::Schema, Kind::Star) => true,
            (Kind::Bool, Kind::Star) => true,
            (Kind::Arrow(a1, r1), Kind::Arrow(a2, r2)) => {
                a1.sub_kind_of(a2) && r1.sub_kind_of(r2)
            }
            (k1, k2) => k1 == k2,
        }
    }

    /// The result kind after applying one argument, if this is an arrow.
    pub fn apply(&self) -> Option<&Kind> {
        match self {
            Kind::Arrow(_, r) => Some(r),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Star => write!(f, "Type"),
            Kind::Bool => write!(f, "Bool"),
            Kind::Effect => write!(f, "Eff"),
            Kind::Record => write!(f, "RecordRow"),
            Kind::Schema => write!(f, "SchemaRow"),
            Kind::Wild => write!(f, "?"),
            Kind::Arrow(k1, k2) => match k1.as_ref() {
                Kind::Arrow(..) => write!(f, "({}) -> {}", k1, k2),
                _ => write!(f, "{} -> {}", k1, k2),
            },
        }
    }
}
