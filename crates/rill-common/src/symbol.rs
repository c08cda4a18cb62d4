//! Symbols: stable identities assigned by the resolver.
//!
//! Every named entity in the resolved AST is referred to by a symbol rather
//! than by pointer. Symbols compare by resolved identity (their fully
//! qualified name), so cyclic references between classes, instances, and
//! associated types are broken by lookup in the relevant environment.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! name_symbol {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            pub fn name(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

name_symbol!(
    /// A top-level definition, e.g. `List.map`.
    DefSym
);
name_symbol!(
    /// An enum declaration.
    EnumSym
);
name_symbol!(
    /// A case of an enum, qualified by its enum, e.g. `Option.Some`.
    CaseSym
);
name_symbol!(
    /// A type class.
    ClassSym
);
name_symbol!(
    /// A signature declared inside a class.
    SigSym
);
name_symbol!(
    /// An associated type declared inside a class, e.g. `Dividable.Aef`.
    AssocTypeSym
);
name_symbol!(
    /// A declared effect, e.g. `DivByZero`.
    EffectSym
);
name_symbol!(
    /// An operation declared inside an effect.
    OpSym
);
name_symbol!(
    /// A Datalog predicate.
    PredSym
);
name_symbol!(
    /// A type alias.
    AliasSym
);
name_symbol!(
    /// A member of the host environment reachable through native interop.
    NativeMemberSym
);

/// A local variable binder. Identity is the resolver-assigned index; the
/// text is kept for display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarSym {
    pub id: u32,
    pub text: String,
}

impl VarSym {
    pub fn new(id: u32, text: impl Into<String>) -> Self {
        Self { id, text: text.into() }
    }
}

impl PartialEq for VarSym {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for VarSym {}

impl std::hash::Hash for VarSym {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for VarSym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}
