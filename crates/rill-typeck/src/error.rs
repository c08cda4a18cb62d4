//! Structured compilation messages.
//!
//! Every error carries machine-readable fields and source locations, never
//! a pre-formatted string; rendering happens in [`crate::diagnostics`].
//! Messages order by (source, offset, code), which coincides with the
//! (source, line, column, kind) order of the rendered output since byte
//! offsets are monotone in (line, column).

use std::fmt;

use rill_common::{AssocTypeSym, ClassSym, SigSym, SourceLocation};
use rill_types::{Kind, Type, TypeVarSym};

use crate::constraint::Provenance;

/// A type or effect error.
#[derive(Debug, Clone)]
pub enum TypeError {
    /// Two types that should be equal are not. `full1`/`full2` are the
    /// outer types of the failed constraint; `tpe1`/`tpe2` the mismatching
    /// subterms.
    MismatchedTypes {
        tpe1: Type,
        tpe2: Type,
        full1: Type,
        full2: Type,
        prov: Provenance,
    },
    /// A variable occurs in its own binding, e.g. `a ≡ List[a]`.
    OccursCheck {
        var: TypeVarSym,
        tpe: Type,
        prov: Provenance,
    },
    /// An associated type with a ground argument has no matching clause.
    IrreducibleAssocType {
        sym: AssocTypeSym,
        arg: Type,
        loc: SourceLocation,
    },
    /// The effect unifier found no solution (SVE returned none).
    UnsupportedEquality {
        eff1: Type,
        eff2: Type,
        prov: Provenance,
    },
    /// A ground class constraint has no matching instance.
    MissingInstance {
        class: ClassSym,
        arg: Type,
        loc: SourceLocation,
    },
    /// A class constraint still mentions free variables at the end of the
    /// definition, so no instance can be chosen.
    AmbiguousInstance {
        class: ClassSym,
        arg: Type,
        loc: SourceLocation,
    },
    /// A native member reference could not be resolved against the host
    /// environment even though its argument became ground.
    IrreducibleNativeType {
        member: String,
        loc: SourceLocation,
    },
    /// The resolved AST referenced a symbol the environments do not know.
    UnknownSymbol {
        name: String,
        loc: SourceLocation,
    },
    /// A construct this front-end has no semantics for.
    UnsupportedConstruct {
        name: String,
        loc: SourceLocation,
    },
    /// The per-definition wall-clock budget was exceeded.
    Timeout {
        def: String,
        loc: SourceLocation,
    },
}

/// A kind error. Kind errors abort the current definition.
#[derive(Debug, Clone)]
pub enum KindError {
    MismatchedKinds {
        k1: Kind,
        k2: Kind,
        loc: SourceLocation,
    },
    UnexpectedKind {
        expected: Kind,
        actual: Kind,
        loc: SourceLocation,
    },
    UninferrableKind {
        loc: SourceLocation,
    },
}

/// An error in an instance declaration, reported by the instance checker
/// before solving begins.
#[derive(Debug, Clone)]
pub enum InstanceError {
    /// Two instances of the same class unify.
    OverlappingInstances {
        class: ClassSym,
        loc1: SourceLocation,
        loc2: SourceLocation,
    },
    /// An instance head is not a type constructor applied to distinct
    /// variables.
    ComplexInstanceType {
        class: ClassSym,
        tpe: Type,
        loc: SourceLocation,
    },
    /// A type variable occurs twice in an instance head.
    DuplicateTypeVariableOccurrence {
        class: ClassSym,
        var: TypeVarSym,
        loc: SourceLocation,
    },
    /// An instance does not implement a signature without a default.
    MissingImplementation {
        class: ClassSym,
        sig: SigSym,
        loc: SourceLocation,
    },
    /// An implementation's declared signature differs from the class's.
    MismatchedSignatures {
        class: ClassSym,
        sig: SigSym,
        expected: Type,
        found: Type,
        loc: SourceLocation,
    },
    /// An instance implements a signature the class does not declare.
    ExtraneousDefinition {
        class: ClassSym,
        sig: SigSym,
        loc: SourceLocation,
    },
}

/// Safety messages surfaced through the core's error channel on behalf of
/// the downstream Datalog safety pass.
#[derive(Debug, Clone)]
pub enum SafetyError {
    IllegalNonPositivelyBoundVariable {
        name: String,
        loc: SourceLocation,
    },
    IllegalRelationalUseOfLatticeVariable {
        name: String,
        loc: SourceLocation,
    },
}

/// Any message the front-end can emit.
#[derive(Debug, Clone)]
pub enum CompilationMessage {
    Type(TypeError),
    Kind(KindError),
    Instance(InstanceError),
    Safety(SafetyError),
}

impl CompilationMessage {
    /// A stable machine-readable code per kind.
    pub fn code(&self) -> &'static str {
        match self {
            CompilationMessage::Type(e) => match e {
                TypeError::MismatchedTypes { .. } => "E1001",
                TypeError::OccursCheck { .. } => "E1002",
                TypeError::IrreducibleAssocType { .. } => "E1003",
                TypeError::UnsupportedEquality { .. } => "E1004",
                TypeError::MissingInstance { .. } => "E1005",
                TypeError::AmbiguousInstance { .. } => "E1006",
                TypeError::IrreducibleNativeType { .. } => "E1007",
                TypeError::UnknownSymbol { .. } => "E1008",
                TypeError::UnsupportedConstruct { .. } => "E1009",
                TypeError::Timeout { .. } => "E1010",
            },
            CompilationMessage::Kind(e) => match e {
                KindError::MismatchedKinds { .. } => "E2001",
                KindError::UnexpectedKind { .. } => "E2002",
                KindError::UninferrableKind { .. } => "E2003",
            },
            CompilationMessage::Instance(e) => match e {
                InstanceError::OverlappingInstances { .. } => "E3001",
                InstanceError::ComplexInstanceType { .. } => "E3002",
                InstanceError::DuplicateTypeVariableOccurrence { .. } => "E3003",
                InstanceError::MissingImplementation { .. } => "E3004",
                InstanceError::MismatchedSignatures { .. } => "E3005",
                InstanceError::ExtraneousDefinition { .. } => "E3006",
            },
            CompilationMessage::Safety(e) => match e {
                SafetyError::IllegalNonPositivelyBoundVariable { .. } => "E4001",
                SafetyError::IllegalRelationalUseOfLatticeVariable { .. } => "E4002",
            },
        }
    }

    /// The primary source location.
    pub fn loc(&self) -> SourceLocation {
        match self {
            CompilationMessage::Type(e) => match e {
                TypeError::MismatchedTypes { prov, .. } => prov.loc(),
                TypeError::OccursCheck { prov, .. } => prov.loc(),
                TypeError::IrreducibleAssocType { loc, .. } => *loc,
                TypeError::UnsupportedEquality { prov, .. } => prov.loc(),
                TypeError::MissingInstance { loc, .. } => *loc,
                TypeError::AmbiguousInstance { loc, .. } => *loc,
                TypeError::IrreducibleNativeType { loc, .. } => *loc,
                TypeError::UnknownSymbol { loc, .. } => *loc,
                TypeError::UnsupportedConstruct { loc, .. } => *loc,
                TypeError::Timeout { loc, .. } => *loc,
            },
            CompilationMessage::Kind(e) => match e {
                KindError::MismatchedKinds { loc, .. }
                | KindError::UnexpectedKind { loc, .. }
                | KindError::UninferrableKind { loc } => *loc,
            },
            CompilationMessage::Instance(e) => match e {
                InstanceError::OverlappingInstances { loc1, .. } => *loc1,
                InstanceError::ComplexInstanceType { loc, .. }
                | InstanceError::DuplicateTypeVariableOccurrence { loc, .. }
                | InstanceError::MissingImplementation { loc, .. }
                | InstanceError::MismatchedSignatures { loc, .. }
                | InstanceError::ExtraneousDefinition { loc, .. } => *loc,
            },
            CompilationMessage::Safety(e) => match e {
                SafetyError::IllegalNonPositivelyBoundVariable { loc, .. }
                | SafetyError::IllegalRelationalUseOfLatticeVariable { loc, .. } => *loc,
            },
        }
    }

    /// Secondary locations worth an excerpt of their own.
    pub fn secondary_locs(&self) -> Vec<SourceLocation> {
        match self {
            CompilationMessage::Instance(InstanceError::OverlappingInstances {
                loc2, ..
            }) => vec![*loc2],
            _ => Vec::new(),
        }
    }

    /// The key for the stable output ordering.
    pub fn sort_key(&self) -> (u32, u32, u32, &'static str) {
        let loc = self.loc();
        (loc.source.0, loc.span.start, loc.span.end, self.code())
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::MismatchedTypes { tpe1, tpe2, .. } => {
                write!(f, "type mismatch: expected `{}`, found `{}`", tpe1, tpe2)
            }
            TypeError::OccursCheck { var, tpe, .. } => {
                write!(f, "infinite type: `{}` occurs in `{}`", var, tpe)
            }
            TypeError::IrreducibleAssocType { sym, arg, .. } => {
                write!(f, "associated type `{}` has no definition for `{}`", sym, arg)
            }
            TypeError::UnsupportedEquality { eff1, eff2, .. } => {
                write!(f, "effects `{}` and `{}` cannot be made equal", eff1, eff2)
            }
            TypeError::MissingInstance { class, arg, .. } => {
                write!(f, "no instance of `{}` for `{}`", class, arg)
            }
            TypeError::AmbiguousInstance { class, arg, .. } => {
                write!(f, "ambiguous instance of `{}` for `{}`", class, arg)
            }
            TypeError::IrreducibleNativeType { member, .. } => {
                write!(f, "cannot resolve native member `{}`", member)
            }
            TypeError::UnknownSymbol { name, .. } => {
                write!(f, "unknown symbol `{}`", name)
            }
            TypeError::UnsupportedConstruct { name, .. } => {
                write!(f, "unsupported construct `{}`", name)
            }
            TypeError::Timeout { def, .. } => {
                write!(f, "type checking of `{}` exceeded the time budget", def)
            }
        }
    }
}

impl fmt::Display for KindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KindError::MismatchedKinds { k1, k2, .. } => {
                write!(f, "mismatched kinds `{}` and `{}`", k1, k2)
            }
            KindError::UnexpectedKind { expected, actual, .. } => {
                write!(f, "expected kind `{}`, found `{}`", expected, actual)
            }
            KindError::UninferrableKind { .. } => write!(f, "unable to infer kind"),
        }
    }
}

impl fmt::Display for InstanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceError::OverlappingInstances { class, .. } => {
                write!(f, "overlapping instances of `{}`", class)
            }
            InstanceError::ComplexInstanceType { class, tpe, .. } => {
                write!(
                    f,
                    "instance of `{}` has complex head `{}`; expected a type constructor applied to distinct variables",
                    class, tpe
                )
            }
            InstanceError::DuplicateTypeVariableOccurrence { class, var, .. } => {
                write!(f, "type variable `{}` occurs twice in an instance of `{}`", var, class)
            }
            InstanceError::MissingImplementation { class, sig, .. } => {
                write!(f, "instance of `{}` is missing an implementation of `{}`", class, sig)
            }
            InstanceError::MismatchedSignatures { sig, expected, found, .. } => {
                write!(
                    f,
                    "implementation of `{}` has type `{}`, but the class declares `{}`",
                    sig, found, expected
                )
            }
            InstanceError::ExtraneousDefinition { class, sig, .. } => {
                write!(f, "`{}` is not a signature of `{}`", sig, class)
            }
        }
    }
}

impl fmt::Display for SafetyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SafetyError::IllegalNonPositivelyBoundVariable { name, .. } => {
                write!(f, "variable `{}` is not positively bound", name)
            }
            SafetyError::IllegalRelationalUseOfLatticeVariable { name, .. } => {
                write!(f, "lattice variable `{}` used in a relational position", name)
            }
        }
    }
}

impl fmt::Display for CompilationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilationMessage::Type(e) => write!(f, "{}", e),
            CompilationMessage::Kind(e) => write!(f, "{}", e),
            CompilationMessage::Instance(e) => write!(f, "{}", e),
            CompilationMessage::Safety(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_common::{SourceId, Span};

    fn msg_at(start: u32) -> CompilationMessage {
        CompilationMessage::Type(TypeError::UnknownSymbol {
            name: "x".to_string(),
            loc: SourceLocation::new(SourceId(0), Span::new(start, start + 1)),
        })
    }

    #[test]
    fn sort_key_orders_by_offset() {
        let mut msgs = vec![msg_at(20), msg_at(3)];
        msgs.sort_by_key(|m| m.sort_key());
        assert_eq!(msgs[0].loc().span.start, 3);
    }

    #[test]
    fn codes_are_stable_per_kind() {
        assert_eq!(msg_at(0).code(), "E1008");
        let kind_err = CompilationMessage::Kind(KindError::UninferrableKind {
            loc: SourceLocation::new(SourceId(0), Span::new(0, 1)),
        });
        assert_eq!(kind_err.code(), "E2003");
    }
}
