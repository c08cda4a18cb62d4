//! Typing constraints and their provenance.
//!
//! Constraints are emitted by the generator against the typing context and
//! consumed by the solver. Provenance records why a constraint exists; it
//! is preserved through substitution and consumed only by error reporting.

use std::fmt;

use rill_common::{ClassSym, SourceLocation};
use rill_types::{Level, Type, TypeVarSym};

use crate::subst::Substitution;

/// Why a constraint was emitted.
#[derive(Debug, Clone)]
pub enum Provenance {
    /// A pattern was matched against a scrutinee.
    Match { loc: SourceLocation },
    /// An ascription or declared signature fixed the expected type.
    ExpectType { loc: SourceLocation },
    /// The `idx`-th argument of a call to a named symbol.
    ExpectArgument { name: String, idx: usize, loc: SourceLocation },
    /// A region was exited.
    RegionExit { loc: SourceLocation },
    /// Plain structural requirement at a source location.
    Source { loc: SourceLocation },
}

impl Provenance {
    pub fn loc(&self) -> SourceLocation {
        match self {
            Provenance::Match { loc }
            | Provenance::ExpectType { loc }
            | Provenance::ExpectArgument { loc, .. }
            | Provenance::RegionExit { loc }
            | Provenance::Source { loc } => *loc,
        }
    }
}

/// A constraint to be solved.
#[derive(Debug, Clone)]
pub enum TypingConstraint {
    /// `tpe1 ≡ tpe2`.
    Equality(Type, Type, Provenance),
    /// `arg` must satisfy class `sym`.
    Class(ClassSym, Type, SourceLocation),
    /// `external ≡ internal[region ↦ Pure]`; the nested constraints are
    /// solved first.
    Purification {
        region: TypeVarSym,
        external: Type,
        internal: Type,
        level: Level,
        prov: Provenance,
        nested: Vec<TypingConstraint>,
    },
}

impl TypingConstraint {
    /// Apply a substitution, preserving provenance.
    pub fn apply(&self, subst: &Substitution) -> TypingConstraint {
        match self {
            TypingConstraint::Equality(t1, t2, prov) => {
                TypingConstraint::Equality(subst.apply(t1), subst.apply(t2), prov.clone())
            }
            TypingConstraint::Class(sym, arg, loc) => {
                TypingConstraint::Class(sym.clone(), subst.apply(arg), *loc)
            }
            TypingConstraint::Purification { region, external, internal, level, prov, nested } => {
                TypingConstraint::Purification {
                    region: region.clone(),
                    external: subst.apply(external),
                    internal: subst.apply(internal),
                    level: *level,
                    prov: prov.clone(),
                    nested: nested.iter().map(|c| c.apply(subst)).collect(),
                }
            }
        }
    }

    pub fn loc(&self) -> SourceLocation {
        match self {
            TypingConstraint::Equality(_, _, prov) => prov.loc(),
            TypingConstraint::Class(_, _, loc) => *loc,
            TypingConstraint::Purification { prov, .. } => prov.loc(),
        }
    }
}

impl fmt::Display for TypingConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypingConstraint::Equality(t1, t2, _) => write!(f, "{} ≡ {}", t1, t2),
            TypingConstraint::Class(sym, arg, _) => write!(f, "{}[{}]", sym, arg),
            TypingConstraint::Purification { region, external, internal, nested, .. } => write!(
                f,
                "{} ≡ {}[{} ↦ Pure] ({} nested)",
                external,
                internal,
                region,
                nested.len()
            ),
        }
    }
}
