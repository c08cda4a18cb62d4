//! The typed AST produced by the front-end.
//!
//! Same shape as the resolved AST, with every expression node carrying a
//! `tpe` and an `eff` field containing fully substituted types. Remaining
//! free variables are flexible and belong to the enclosing definition;
//! generalizing them into schemes is a downstream pass.

use rustc_hash::FxHashMap;
use serde::Serialize;

use rill_common::{
    CaseSym, DefSym, EffectSym, NativeMemberSym, OpSym, PredSym, SigSym, SourceLocation, VarSym,
};
use rill_types::{Type, TypeVarSym};

use crate::resolved::{Constant, Denotation, DefSpec, Polarity, SourceFile};

/// The root of a typed compilation unit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TypedRoot {
    /// Typed top-level definitions. Instance method bodies appear here
    /// under their qualified name (`Class.sig$Type`).
    pub defs: FxHashMap<DefSym, TypedDef>,
    pub sources: Vec<SourceFile>,
}

/// A typed definition: the declared spec, the typed body, and the inferred
/// (still ungeneralized) definition type.
#[derive(Debug, Clone, Serialize)]
pub struct TypedDef {
    pub sym: DefSym,
    pub spec: DefSpec,
    pub exp: TypedExpr,
    pub tpe: Type,
    pub eff: Type,
    pub loc: SourceLocation,
}

/// A typed expression.
#[derive(Debug, Clone, Serialize)]
pub struct TypedExpr {
    pub kind: TypedExprKind,
    pub tpe: Type,
    pub eff: Type,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub enum TypedExprKind {
    Cst(Constant),
    Var(VarSym),
    Def(DefSym),
    Sig(SigSym),
    Lambda {
        bnd: VarSym,
        bnd_tpe: Type,
        body: Box<TypedExpr>,
    },
    Apply {
        exp: Box<TypedExpr>,
        args: Vec<TypedExpr>,
    },
    Let {
        bnd: VarSym,
        e1: Box<TypedExpr>,
        e2: Box<TypedExpr>,
    },
    IfThenElse {
        e1: Box<TypedExpr>,
        e2: Box<TypedExpr>,
        e3: Box<TypedExpr>,
    },
    Stm {
        e1: Box<TypedExpr>,
        e2: Box<TypedExpr>,
    },
    Match {
        scrutinee: Box<TypedExpr>,
        rules: Vec<TypedMatchRule>,
    },
    Tuple(Vec<TypedExpr>),
    Tag {
        sym: CaseSym,
        args: Vec<TypedExpr>,
    },
    RecordEmpty,
    RecordExtend {
        label: String,
        value: Box<TypedExpr>,
        rest: Box<TypedExpr>,
    },
    RecordSelect {
        exp: Box<TypedExpr>,
        label: String,
    },
    Region {
        sym: TypeVarSym,
        bnd: VarSym,
        body: Box<TypedExpr>,
    },
    Ascribe {
        exp: Box<TypedExpr>,
    },
    Do {
        op: OpSym,
        args: Vec<TypedExpr>,
    },
    TryWith {
        exp: Box<TypedExpr>,
        effect: EffectSym,
        rules: Vec<TypedHandlerRule>,
    },
    FixpointConstraintSet(Vec<TypedFixpointConstraint>),
    NativeInvoke {
        member: NativeMemberSym,
        args: Vec<TypedExpr>,
    },
    /// Kept in the tree so downstream passes see the node; always paired
    /// with an `UnsupportedConstruct` message.
    Unsupported(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct TypedMatchRule {
    pub pat: TypedPattern,
    pub guard: Option<TypedExpr>,
    pub exp: TypedExpr,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypedHandlerRule {
    pub op: OpSym,
    pub fparams: Vec<(VarSym, Type)>,
    pub exp: TypedExpr,
}

/// A typed pattern.
#[derive(Debug, Clone, Serialize)]
pub struct TypedPattern {
    pub kind: TypedPatternKind,
    pub tpe: Type,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub enum TypedPatternKind {
    Wildcard,
    Var(VarSym),
    Cst(Constant),
    Tag { sym: CaseSym, pats: Vec<TypedPattern> },
    Tuple(Vec<TypedPattern>),
}

#[derive(Debug, Clone, Serialize)]
pub struct TypedFixpointConstraint {
    pub head: TypedHeadAtom,
    pub body: Vec<TypedBodyAtom>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypedHeadAtom {
    pub pred: PredSym,
    pub den: Denotation,
    pub terms: Vec<TypedExpr>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypedBodyAtom {
    pub pred: PredSym,
    pub den: Denotation,
    pub polarity: Polarity,
    pub terms: Vec<TypedPattern>,
    pub loc: SourceLocation,
}
