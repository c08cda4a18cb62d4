//! Kind and type representation for the Rill type and effect system.
//!
//! - [`kind`]: kinds with subkinding (`Record`/`Schema`/`Bool` under `Star`)
//! - [`ty`]: the immutable [`ty::Type`] term, constructors, variables,
//!   schemes, and the rigidity environment

pub mod kind;
pub mod ty;

pub use kind::Kind;
pub use ty::{
    ClassConstraint, Level, RigidityEnv, Scheme, Type, TypeConstructor, TypeVarSym, VarId,
};
