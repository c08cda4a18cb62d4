//! Shared foundation types for the Rill compiler.
//!
//! - [`span`]: byte-offset spans, source locations, and line/column lookup
//! - [`symbol`]: resolver-assigned identities for named entities

pub mod span;
pub mod symbol;

pub use span::{LineIndex, SourceId, SourceLocation, Span};
pub use symbol::{
    AliasSym, AssocTypeSym, CaseSym, ClassSym, DefSym, EffectSym, EnumSym, NativeMemberSym, OpSym,
    PredSym, SigSym, VarSym,
};
