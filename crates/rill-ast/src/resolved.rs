//! The resolved AST consumed by the type and effect inferencer.
//!
//! Names and modules are already resolved: every reference is a symbol, and
//! every type annotation is a fully kinded [`Type`]. The root is a rooted
//! acyclic graph of declarations plus the source table. The whole tree is
//! serde-deserializable so the driver can consume a resolver snapshot.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use rill_common::{
    AssocTypeSym, CaseSym, ClassSym, DefSym, EffectSym, EnumSym, NativeMemberSym, OpSym, PredSym,
    SigSym, SourceLocation, VarSym,
};
use rill_types::{ClassConstraint, Kind, Type, TypeVarSym};

/// One source file of the compilation: display name plus full text, used
/// only for diagnostics rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
}

/// The root of a resolved compilation unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Root {
    pub defs: FxHashMap<DefSym, Def>,
    pub enums: FxHashMap<EnumSym, Enum>,
    pub classes: FxHashMap<ClassSym, Class>,
    pub instances: FxHashMap<ClassSym, Vec<Instance>>,
    pub effects: FxHashMap<EffectSym, EffectDecl>,
    pub natives: FxHashMap<NativeMemberSym, NativeSignature>,
    pub sources: Vec<SourceFile>,
}

/// A top-level definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Def {
    pub sym: DefSym,
    pub spec: DefSpec,
    pub exp: Expr,
    pub loc: SourceLocation,
}

/// The declared signature of a definition, signature, or operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefSpec {
    /// Explicitly quantified variables; rigid while checking the body.
    pub quantifiers: Vec<TypeVarSym>,
    /// Declared class constraints.
    pub constraints: Vec<ClassConstraint>,
    pub fparams: Vec<FormalParam>,
    pub ret_tpe: Type,
    pub eff: Type,
}

/// A formal parameter. The type may be omitted on lambda parameters, in
/// which case inference introduces a fresh variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormalParam {
    pub bnd: VarSym,
    pub tpe: Option<Type>,
    pub loc: SourceLocation,
}

/// An enum declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enum {
    pub sym: EnumSym,
    pub quantifiers: Vec<TypeVarSym>,
    pub cases: Vec<Case>,
    pub loc: SourceLocation,
}

/// One case of an enum. Field types may mention the enum's quantifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub sym: CaseSym,
    pub enum_sym: EnumSym,
    pub tpes: Vec<Type>,
    pub loc: SourceLocation,
}

/// A type class declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub sym: ClassSym,
    pub quantifier: TypeVarSym,
    pub super_classes: Vec<ClassSym>,
    pub assoc_types: Vec<AssocTypeDecl>,
    pub sigs: Vec<Sig>,
    pub loc: SourceLocation,
}

/// An associated type declared inside a class, e.g.
/// `type Aef: Eff = Pure` on a `Dividable` class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssocTypeDecl {
    pub sym: AssocTypeSym,
    pub kind: Kind,
    /// Default right-hand side used when an instance gives no clause.
    pub default: Option<Type>,
    pub loc: SourceLocation,
}

/// A signature declared inside a class. Its spec may mention the class
/// quantifier and the class's associated types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sig {
    pub sym: SigSym,
    pub class: ClassSym,
    pub spec: DefSpec,
    /// Optional default implementation.
    pub exp: Option<Expr>,
    pub loc: SourceLocation,
}

/// An instance declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub class: ClassSym,
    /// The instance head, e.g. `List[a]`.
    pub tpe: Type,
    pub quantifiers: Vec<TypeVarSym>,
    pub constraints: Vec<ClassConstraint>,
    pub assoc_defs: Vec<AssocTypeClause>,
    pub defs: Vec<InstanceDef>,
    pub loc: SourceLocation,
}

/// A definitional clause for an associated type: `arg ↦ ret`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssocTypeClause {
    pub sym: AssocTypeSym,
    pub arg: Type,
    pub ret: Type,
    pub loc: SourceLocation,
}

/// A signature implementation inside an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceDef {
    pub sym: SigSym,
    pub spec: DefSpec,
    pub exp: Expr,
    pub loc: SourceLocation,
}

/// An effect declaration with its operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectDecl {
    pub sym: EffectSym,
    pub ops: Vec<OpDecl>,
    pub loc: SourceLocation,
}

/// An operation declared inside an effect. Performing it adds the effect
/// symbol of the enclosing declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpDecl {
    pub sym: OpSym,
    pub effect: EffectSym,
    pub spec: DefSpec,
    pub loc: SourceLocation,
}

/// The host signature of a native member: its value type and effect once
/// resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeSignature {
    pub tpe: Type,
    pub eff: Type,
}

/// A literal constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Unit,
    Bool(bool),
    Char(char),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    BigInt(String),
    Float32(f32),
    Float64(f64),
    Str(String),
}

/// A resolved expression. Every node carries its source location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    Cst {
        cst: Constant,
        loc: SourceLocation,
    },
    Var {
        sym: VarSym,
        loc: SourceLocation,
    },
    Def {
        sym: DefSym,
        loc: SourceLocation,
    },
    Sig {
        sym: SigSym,
        loc: SourceLocation,
    },
    Lambda {
        fparam: FormalParam,
        body: Box<Expr>,
        loc: SourceLocation,
    },
    Apply {
        exp: Box<Expr>,
        args: Vec<Expr>,
        loc: SourceLocation,
    },
    Let {
        bnd: VarSym,
        e1: Box<Expr>,
        e2: Box<Expr>,
        loc: SourceLocation,
    },
    IfThenElse {
        e1: Box<Expr>,
        e2: Box<Expr>,
        e3: Box<Expr>,
        loc: SourceLocation,
    },
    Stm {
        e1: Box<Expr>,
        e2: Box<Expr>,
        loc: SourceLocation,
    },
    Match {
        scrutinee: Box<Expr>,
        rules: Vec<MatchRule>,
        loc: SourceLocation,
    },
    Tuple {
        elms: Vec<Expr>,
        loc: SourceLocation,
    },
    Tag {
        sym: CaseSym,
        args: Vec<Expr>,
        loc: SourceLocation,
    },
    RecordEmpty {
        loc: SourceLocation,
    },
    RecordExtend {
        label: String,
        value: Box<Expr>,
        rest: Box<Expr>,
        loc: SourceLocation,
    },
    RecordSelect {
        exp: Box<Expr>,
        label: String,
        loc: SourceLocation,
    },
    /// A scoped region `region rc { body }`. The symbol is the region's
    /// effect variable, assigned by the resolver; inference marks it rigid
    /// for the extent of the body and purifies it on exit. The binder is
    /// the value-level region handle, typed `Region[r]`, which the
    /// reference-cell operations consume.
    Region {
        sym: TypeVarSym,
        bnd: VarSym,
        body: Box<Expr>,
        loc: SourceLocation,
    },
    Ascribe {
        exp: Box<Expr>,
        tpe: Option<Type>,
        eff: Option<Type>,
        loc: SourceLocation,
    },
    Do {
        op: OpSym,
        args: Vec<Expr>,
        loc: SourceLocation,
    },
    TryWith {
        exp: Box<Expr>,
        effect: EffectSym,
        rules: Vec<HandlerRule>,
        loc: SourceLocation,
    },
    FixpointConstraintSet {
        cs: Vec<FixpointConstraint>,
        loc: SourceLocation,
    },
    NativeInvoke {
        member: NativeMemberSym,
        args: Vec<Expr>,
        loc: SourceLocation,
    },
    /// A construct this front-end has no semantics for; flagged as
    /// `UnsupportedConstruct` rather than guessed at.
    Unsupported {
        name: String,
        loc: SourceLocation,
    },
}

impl Expr {
    pub fn loc(&self) -> SourceLocation {
        match self {
            Expr::Cst { loc, .. }
            | Expr::Var { loc, .. }
            | Expr::Def { loc, .. }
            | Expr::Sig { loc, .. }
            | Expr::Lambda { loc, .. }
            | Expr::Apply { loc, .. }
            | Expr::Let { loc, .. }
            | Expr::IfThenElse { loc, .. }
            | Expr::Stm { loc, .. }
            | Expr::Match { loc, .. }
            | Expr::Tuple { loc, .. }
            | Expr::Tag { loc, .. }
            | Expr::RecordEmpty { loc }
            | Expr::RecordExtend { loc, .. }
            | Expr::RecordSelect { loc, .. }
            | Expr::Region { loc, .. }
            | Expr::Ascribe { loc, .. }
            | Expr::Do { loc, .. }
            | Expr::TryWith { loc, .. }
            | Expr::FixpointConstraintSet { loc, .. }
            | Expr::NativeInvoke { loc, .. }
            | Expr::Unsupported { loc, .. } => *loc,
        }
    }
}

/// One rule of a match expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRule {
    pub pat: Pattern,
    pub guard: Option<Expr>,
    pub exp: Expr,
}

/// One rule of a try-with handler: an operation, its parameters, and the
/// handling body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerRule {
    pub op: OpSym,
    pub fparams: Vec<FormalParam>,
    pub exp: Expr,
}

/// A resolved pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Pattern {
    Wildcard {
        loc: SourceLocation,
    },
    Var {
        sym: VarSym,
        loc: SourceLocation,
    },
    Cst {
        cst: Constant,
        loc: SourceLocation,
    },
    Tag {
        sym: CaseSym,
        pats: Vec<Pattern>,
        loc: SourceLocation,
    },
    Tuple {
        elms: Vec<Pattern>,
        loc: SourceLocation,
    },
}

impl Pattern {
    pub fn loc(&self) -> SourceLocation {
        match self {
            Pattern::Wildcard { loc }
            | Pattern::Var { loc, .. }
            | Pattern::Cst { loc, .. }
            | Pattern::Tag { loc, .. }
            | Pattern::Tuple { loc, .. } => *loc,
        }
    }
}

/// Whether a predicate is interpreted relationally or as a lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Denotation {
    Relational,
    Latticenal,
}

/// The polarity of a body atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    Positive,
    Negative,
}

/// A Datalog constraint `head :- body`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixpointConstraint {
    pub head: HeadAtom,
    pub body: Vec<BodyAtom>,
    pub loc: SourceLocation,
}

/// A head atom `P(t1, ..., tn)` whose terms are expressions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadAtom {
    pub pred: PredSym,
    pub den: Denotation,
    pub terms: Vec<Expr>,
    pub loc: SourceLocation,
}

/// A body atom whose terms are patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyAtom {
    pub pred: PredSym,
    pub den: Denotation,
    pub polarity: Polarity,
    pub terms: Vec<Pattern>,
    pub loc: SourceLocation,
}
