//! Type representation for the Rill type and effect system.
//!
//! Defines the core [`Type`] term, type constructors ([`TypeConstructor`]),
//! type variables ([`TypeVarSym`]), polymorphic schemes ([`Scheme`]), and the
//! rigidity environment. Types are immutable tagged trees; function types
//! carry an effect formula in a fixed position, and effect formulas are
//! themselves types of kind `Eff` built from `Pure`, `Univ`, effect
//! constants, variables, and the `Union`/`Intersection`/`Complement`
//! connectives.
//!
//! Structural equality sees through [`Type::Alias`]: an alias is equal to
//! its expansion. Source locations are carried for error reporting and are
//! never part of identity.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use rill_common::{AliasSym, AssocTypeSym, EffectSym, EnumSym, NativeMemberSym, PredSym, SourceLocation};
use rustc_hash::FxHashSet;

use crate::kind::Kind;

/// A type variable identity, unique within one definition's inference run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VarId(pub u32);

/// The region-nesting level at which a variable was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Level(pub u32);

impl Level {
    pub const TOP: Level = Level(0);

    pub fn next(self) -> Level {
        Level(self.0 + 1)
    }
}

/// A type variable: identity, kind, creation level, and an optional display
/// name taken from an explicit quantifier.
///
/// Identity is the `id` alone; kind, level, and text are carried for kind
/// checking, escape detection, and error messages but never compared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeVarSym {
    pub id: VarId,
    pub kind: Kind,
    pub level: Level,
    pub text: Option<String>,
}

impl TypeVarSym {
    pub fn new(id: VarId, kind: Kind, level: Level) -> Self {
        Self { id, kind, level, text: None }
    }

    pub fn with_text(id: VarId, kind: Kind, level: Level, text: impl Into<String>) -> Self {
        Self { id, kind, level, text: Some(text.into()) }
    }
}

impl PartialEq for TypeVarSym {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeVarSym {}

impl Hash for TypeVarSym {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeVarSym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.text {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "?{}", self.id.0),
        }
    }
}

/// A type constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeConstructor {
    Unit,
    Bool,
    Char,
    Str,
    BigInt,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    /// A function type with `arity` value parameters. Fully applied as
    /// `Arrow(n) eff t1 ... tn ret`.
    Arrow(usize),
    /// A tuple with `arity` components.
    Tuple(usize),
    /// A declared enum with its kind (accounting for type parameters).
    Enum(EnumSym, Kind),
    /// The empty record row `{}`.
    RecordRowEmpty,
    /// A record row extension `{ label = t | rest }`.
    RecordRowExtend(String),
    /// The empty schema row `#{}`.
    SchemaRowEmpty,
    /// A schema row extension `#{ P(..) | rest }`.
    SchemaRowExtend(PredSym),
    /// A relational predicate type, applied to the tuple of its term types.
    Relation,
    /// A lattice predicate type, applied to the tuple of its term types.
    Lattice,
    /// An atomic effect constant.
    Effect(EffectSym),
    /// The empty effect set.
    Pure,
    /// The universe effect set.
    Univ,
    /// Effect-formula complement.
    Complement,
    /// Effect-formula union.
    Union,
    /// Effect-formula intersection.
    Intersection,
}

impl TypeConstructor {
    /// The kind of this constructor.
    pub fn kind(&self) -> Kind {
        use TypeConstructor::*;
        match self {
            Unit | Bool | Char | Str | BigInt | Int8 | Int16 | Int32 | Int64 | Float32
            | Float64 => Kind::Star,
            Arrow(arity) => {
                // eff, `arity` parameters, then the result type.
                let args =
                    std::iter::once(Kind::Effect).chain(std::iter::repeat(Kind::Star).take(arity + 1));
                Kind::arrow_chain(args, Kind::Star)
            }
            Tuple(arity) => Kind::arrow_chain(std::iter::repeat(Kind::Star).take(*arity), Kind::Star),
            Enum(_, kind) => kind.clone(),
            RecordRowEmpty => Kind::Record,
            RecordRowExtend(_) => Kind::arrow_chain([Kind::Star, Kind::Record], Kind::Record),
            SchemaRowEmpty => Kind::Schema,
            SchemaRowExtend(_) => Kind::arrow_chain([Kind::Star, Kind::Schema], Kind::Schema),
            Relation | Lattice => Kind::arrow(Kind::Star, Kind::Star),
            Effect(_) | Pure | Univ => Kind::Effect,
            Complement => Kind::arrow(Kind::Effect, Kind::Effect),
            Union | Intersection => Kind::arrow_chain([Kind::Effect, Kind::Effect], Kind::Effect),
        }
    }

    /// Whether this constructor belongs to the effect-formula fragment.
    pub fn is_effect_connective(&self) -> bool {
        matches!(
            self,
            TypeConstructor::Effect(_)
                | TypeConstructor::Pure
                | TypeConstructor::Univ
                | TypeConstructor::Complement
                | TypeConstructor::Union
                | TypeConstructor::Intersection
        )
    }
}

/// A Rill type term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Type {
    /// A type or effect variable.
    Var(TypeVarSym),
    /// A constructor.
    Cst(TypeConstructor, SourceLocation),
    /// Curried application; kinds must line up.
    Apply(Box<Type>, Box<Type>, SourceLocation),
    /// A named abbreviation, structurally equal to its expansion. The alias
    /// is retained only so error messages can show the name the user wrote.
    Alias(AliasSym, Vec<Type>, Box<Type>, SourceLocation),
    /// An unreduced associated type invocation.
    AssocType(AssocTypeSym, Box<Type>, Kind, SourceLocation),
    /// A host-interop member whose value type is known once the argument is
    /// ground.
    NativeToType(Box<Type>, SourceLocation),
    /// A host-interop member whose effect is known once the argument is
    /// ground.
    NativeToEff(Box<Type>, SourceLocation),
    /// An unresolved host member reference; opaque and rigid until its
    /// embedded argument types become ground.
    UnresolvedNative(NativeMemberSym, SourceLocation),
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // Aliases are transparent: compare the expansion.
            (Type::Alias(_, _, exp, _), rhs) => exp.as_ref() == rhs,
            (lhs, Type::Alias(_, _, exp, _)) => lhs == exp.as_ref(),
            (Type::Var(a), Type::Var(b)) => a == b,
            (Type::Cst(a, _), Type::Cst(b, _)) => a == b,
            (Type::Apply(h1, a1, _), Type::Apply(h2, a2, _)) => h1 == h2 && a1 == a2,
            (Type::AssocType(s1, a1, _, _), Type::AssocType(s2, a2, _, _)) => {
                s1 == s2 && a1 == a2
            }
            (Type::NativeToType(a, _), Type::NativeToType(b, _)) => a == b,
            (Type::NativeToEff(a, _), Type::NativeToEff(b, _)) => a == b,
            (Type::UnresolvedNative(a, _), Type::UnresolvedNative(b, _)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            // Keep Hash consistent with alias-transparent equality.
            Type::Alias(_, _, exp, _) => exp.hash(state),
            Type::Var(sym) => {
                0u8.hash(state);
                sym.hash(state);
            }
            Type::Cst(tc, _) => {
                1u8.hash(state);
                tc.hash(state);
            }
            Type::Apply(h, a, _) => {
                2u8.hash(state);
                h.hash(state);
                a.hash(state);
            }
            Type::AssocType(sym, arg, _, _) => {
                3u8.hash(state);
                sym.hash(state);
                arg.hash(state);
            }
            Type::NativeToType(t, _) => {
                4u8.hash(state);
                t.hash(state);
            }
            Type::NativeToEff(t, _) => {
                5u8.hash(state);
                t.hash(state);
            }
            Type::UnresolvedNative(m, _) => {
                6u8.hash(state);
                m.hash(state);
            }
        }
    }
}

impl Type {
    // ── Smart Constructors ──────────────────────────────────────────────

    pub fn cst(tc: TypeConstructor, loc: SourceLocation) -> Type {
        Type::Cst(tc, loc)
    }

    pub fn unit(loc: SourceLocation) -> Type {
        Type::Cst(TypeConstructor::Unit, loc)
    }

    pub fn bool(loc: SourceLocation) -> Type {
        Type::Cst(TypeConstructor::Bool, loc)
    }

    pub fn int32(loc: SourceLocation) -> Type {
        Type::Cst(TypeConstructor::Int32, loc)
    }

    pub fn float64(loc: SourceLocation) -> Type {
        Type::Cst(TypeConstructor::Float64, loc)
    }

    pub fn str(loc: SourceLocation) -> Type {
        Type::Cst(TypeConstructor::Str, loc)
    }

    pub fn pure(loc: SourceLocation) -> Type {
        Type::Cst(TypeConstructor::Pure, loc)
    }

    pub fn univ(loc: SourceLocation) -> Type {
        Type::Cst(TypeConstructor::Univ, loc)
    }

    pub fn effect(sym: EffectSym, loc: SourceLocation) -> Type {
        Type::Cst(TypeConstructor::Effect(sym), loc)
    }

    pub fn apply(head: Type, arg: Type, loc: SourceLocation) -> Type {
        Type::Apply(Box::new(head), Box::new(arg), loc)
    }

    /// Apply `head` to all of `args` in order.
    pub fn apply_all(head: Type, args: impl IntoIterator<Item = Type>, loc: SourceLocation) -> Type {
        args.into_iter().fold(head, |acc, arg| Type::apply(acc, arg, loc))
    }

    /// Build the function type `(params) -> result \ eff`.
    pub fn arrow(params: Vec<Type>, eff: Type, result: Type, loc: SourceLocation) -> Type {
        let arity = params.len();
        let head = Type::Cst(TypeConstructor::Arrow(arity), loc);
        let args = std::iter::once(eff).chain(params).chain(std::iter::once(result));
        Type::apply_all(head, args, loc)
    }

    /// Build the tuple type `(t1, ..., tn)`.
    pub fn tuple(tpes: Vec<Type>, loc: SourceLocation) -> Type {
        let head = Type::Cst(TypeConstructor::Tuple(tpes.len()), loc);
        Type::apply_all(head, tpes, loc)
    }

    /// Build the effect union `a + b`, simplifying `Pure` operands away.
    pub fn union(a: Type, b: Type, loc: SourceLocation) -> Type {
        match (&a, &b) {
            (Type::Cst(TypeConstructor::Pure, _), _) => b,
            (_, Type::Cst(TypeConstructor::Pure, _)) => a,
            _ => Type::apply_all(Type::Cst(TypeConstructor::Union, loc), [a, b], loc),
        }
    }

    /// Union of arbitrarily many effects; `Pure` when empty.
    pub fn union_all(effs: impl IntoIterator<Item = Type>, loc: SourceLocation) -> Type {
        effs.into_iter()
            .reduce(|a, b| Type::union(a, b, loc))
            .unwrap_or_else(|| Type::pure(loc))
    }

    /// Build the effect intersection `a & b`, simplifying `Univ` operands
    /// away.
    pub fn intersection(a: Type, b: Type, loc: SourceLocation) -> Type {
        match (&a, &b) {
            (Type::Cst(TypeConstructor::Univ, _), _) => b,
            (_, Type::Cst(TypeConstructor::Univ, _)) => a,
            _ => Type::apply_all(Type::Cst(TypeConstructor::Intersection, loc), [a, b], loc),
        }
    }

    /// Build the effect complement `~a`.
    pub fn complement(a: Type, loc: SourceLocation) -> Type {
        Type::apply(Type::Cst(TypeConstructor::Complement, loc), a, loc)
    }

    /// Build the effect difference `a - b` as `a & ~b`.
    pub fn difference(a: Type, b: Type, loc: SourceLocation) -> Type {
        Type::intersection(a, Type::complement(b, loc), loc)
    }

    /// Build the record row `{ label = tpe | rest }`.
    pub fn record_extend(label: impl Into<String>, tpe: Type, rest: Type, loc: SourceLocation) -> Type {
        let head = Type::Cst(TypeConstructor::RecordRowExtend(label.into()), loc);
        Type::apply_all(head, [tpe, rest], loc)
    }

    /// Build the schema row `#{ pred = tpe | rest }`.
    pub fn schema_extend(pred: PredSym, tpe: Type, rest: Type, loc: SourceLocation) -> Type {
        let head = Type::Cst(TypeConstructor::SchemaRowExtend(pred), loc);
        Type::apply_all(head, [tpe, rest], loc)
    }

    // ── Views ───────────────────────────────────────────────────────────

    /// The source location of the outermost node. Variables do not carry a
    /// location of their own and fall back to a synthesized one.
    pub fn loc(&self) -> SourceLocation {
        match self {
            Type::Var(_) => SourceLocation::zero(rill_common::SourceId(0)),
            Type::Cst(_, loc)
            | Type::Apply(_, _, loc)
            | Type::Alias(_, _, _, loc)
            | Type::AssocType(_, _, _, loc)
            | Type::NativeToType(_, loc)
            | Type::NativeToEff(_, loc)
            | Type::UnresolvedNative(_, loc) => *loc,
        }
    }

    /// Flatten a curried application into its head constructor and argument
    /// list. A non-application returns itself with no arguments.
    pub fn head_and_args(&self) -> (&Type, Vec<&Type>) {
        let mut args = Vec::new();
        let mut cur = self;
        while let Type::Apply(head, arg, _) = cur {
            args.push(arg.as_ref());
            cur = head.as_ref();
        }
        args.reverse();
        (cur, args)
    }

    /// Decompose a fully applied arrow into `(params, eff, result)`.
    pub fn arrow_parts(&self) -> Option<(Vec<&Type>, &Type, &Type)> {
        let (head, args) = self.head_and_args();
        match head {
            Type::Cst(TypeConstructor::Arrow(arity), _) if args.len() == arity + 2 => {
                let eff = args[0];
                let result = args[args.len() - 1];
                let params = args[1..args.len() - 1].to_vec();
                Some((params, eff, result))
            }
            _ => None,
        }
    }

    /// The kind of this term.
    pub fn kind(&self) -> Kind {
        match self {
            Type::Var(sym) => sym.kind.clone(),
            Type::Cst(tc, _) => tc.kind(),
            Type::Apply(head, _, _) => head.kind().apply().cloned().unwrap_or(Kind::Wild),
            Type::Alias(_, _, exp, _) => exp.kind(),
            Type::AssocType(_, _, kind, _) => kind.clone(),
            Type::NativeToType(_, _) => Kind::Star,
            Type::NativeToEff(_, _) => Kind::Effect,
            Type::UnresolvedNative(_, _) => Kind::Star,
        }
    }

    /// Collect the free type variables in order of first appearance.
    pub fn free_vars(&self) -> Vec<TypeVarSym> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        self.collect_free_vars(&mut seen, &mut out);
        out
    }

    fn collect_free_vars(&self, seen: &mut FxHashSet<VarId>, out: &mut Vec<TypeVarSym>) {
        match self {
            Type::Var(sym) => {
                if seen.insert(sym.id) {
                    out.push(sym.clone());
                }
            }
            Type::Cst(_, _) | Type::UnresolvedNative(_, _) => {}
            Type::Apply(head, arg, _) => {
                head.collect_free_vars(seen, out);
                arg.collect_free_vars(seen, out);
            }
            Type::Alias(_, args, exp, _) => {
                // The expansion mentions exactly the variables the alias
                // arguments mention, but walk both to keep first-appearance
                // order faithful to the displayed form.
                for arg in args {
                    arg.collect_free_vars(seen, out);
                }
                exp.collect_free_vars(seen, out);
            }
            Type::AssocType(_, arg, _, _) => arg.collect_free_vars(seen, out),
            Type::NativeToType(t, _) | Type::NativeToEff(t, _) => t.collect_free_vars(seen, out),
        }
    }

    /// Whether a specific variable occurs in this term.
    pub fn mentions_var(&self, id: VarId) -> bool {
        match self {
            Type::Var(sym) => sym.id == id,
            Type::Cst(_, _) | Type::UnresolvedNative(_, _) => false,
            Type::Apply(head, arg, _) => head.mentions_var(id) || arg.mentions_var(id),
            Type::Alias(_, _, exp, _) => exp.mentions_var(id),
            Type::AssocType(_, arg, _, _) => arg.mentions_var(id),
            Type::NativeToType(t, _) | Type::NativeToEff(t, _) => t.mentions_var(id),
        }
    }

    /// Whether the term contains no variables.
    pub fn is_ground(&self) -> bool {
        match self {
            Type::Var(_) => false,
            Type::Cst(_, _) | Type::UnresolvedNative(_, _) => true,
            Type::Apply(head, arg, _) => head.is_ground() && arg.is_ground(),
            Type::Alias(_, _, exp, _) => exp.is_ground(),
            Type::AssocType(_, arg, _, _) => arg.is_ground(),
            Type::NativeToType(t, _) | Type::NativeToEff(t, _) => t.is_ground(),
        }
    }

    /// Unfold the outermost alias, if any.
    pub fn unfold_alias(&self) -> &Type {
        match self {
            Type::Alias(_, _, exp, _) => exp.unfold_alias(),
            other => other,
        }
    }

    /// Replace every occurrence of the variable `from` by `to`, by
    /// structural rewrite. Used to purify regions, where `from` is rigid
    /// and no unification is involved.
    pub fn replace_var(&self, from: VarId, to: &Type) -> Type {
        match self {
            Type::Var(sym) if sym.id == from => to.clone(),
            Type::Var(_) | Type::Cst(_, _) | Type::UnresolvedNative(_, _) => self.clone(),
            Type::Apply(head, arg, loc) => Type::Apply(
                Box::new(head.replace_var(from, to)),
                Box::new(arg.replace_var(from, to)),
                *loc,
            ),
            Type::Alias(sym, args, exp, loc) => Type::Alias(
                sym.clone(),
                args.iter().map(|a| a.replace_var(from, to)).collect(),
                Box::new(exp.replace_var(from, to)),
                *loc,
            ),
            Type::AssocType(sym, arg, kind, loc) => Type::AssocType(
                sym.clone(),
                Box::new(arg.replace_var(from, to)),
                kind.clone(),
                *loc,
            ),
            Type::NativeToType(t, loc) => {
                Type::NativeToType(Box::new(t.replace_var(from, to)), *loc)
            }
            Type::NativeToEff(t, loc) => Type::NativeToEff(Box::new(t.replace_var(from, to)), *loc),
        }
    }

    /// A small structural size measure, used to bound hashing for cache
    /// keys and as the well-founded measure unification decreases.
    pub fn size(&self) -> usize {
        match self {
            Type::Var(_) | Type::Cst(_, _) | Type::UnresolvedNative(_, _) => 1,
            Type::Apply(head, arg, _) => 1 + head.size() + arg.size(),
            Type::Alias(_, _, exp, _) => exp.size(),
            Type::AssocType(_, arg, _, _) => 1 + arg.size(),
            Type::NativeToType(t, _) | Type::NativeToEff(t, _) => 1 + t.size(),
        }
    }
}

// ── Display ─────────────────────────────────────────────────────────────

/// Rendering follows surface syntax: arrows as `(a, b) -> c \ eff` (with a
/// pure effect omitted), records as `{ l = t | r }`, schemas as `#{ ... }`,
/// effect formulas with `+`, `&`, and `~`.
impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type(self, f)
    }
}

fn write_type(tpe: &Type, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match tpe {
        Type::Var(sym) => write!(f, "{}", sym),
        Type::Alias(sym, args, _, _) => {
            write!(f, "{}", sym)?;
            if !args.is_empty() {
                write!(f, "[")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, "]")?;
            }
            Ok(())
        }
        Type::AssocType(sym, arg, _, _) => write!(f, "{}[{}]", sym, arg),
        Type::NativeToType(t, _) => write!(f, "native_type({})", t),
        Type::NativeToEff(t, _) => write!(f, "native_eff({})", t),
        Type::UnresolvedNative(member, _) => write!(f, "native {}", member),
        Type::Cst(tc, _) => write_constructor(tc, &[], f),
        Type::Apply(_, _, _) => {
            let (head, args) = tpe.head_and_args();
            match head {
                Type::Cst(tc, _) => write_constructor(tc, &args, f),
                other => {
                    write!(f, "{}", other)?;
                    write!(f, "[")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", a)?;
                    }
                    write!(f, "]")
                }
            }
        }
    }
}

fn write_constructor(tc: &TypeConstructor, args: &[&Type], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    use TypeConstructor::*;
    let plain = |name: &str, f: &mut fmt::Formatter<'_>| -> fmt::Result {
        write!(f, "{}", name)?;
        if !args.is_empty() {
            write!(f, "[")?;
            for (i, a) in args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", a)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    };
    match tc {
        Unit => plain("Unit", f),
        Bool => plain("Bool", f),
        Char => plain("Char", f),
        Str => plain("String", f),
        BigInt => plain("BigInt", f),
        Int8 => plain("Int8", f),
        Int16 => plain("Int16", f),
        Int32 => plain("Int32", f),
        Int64 => plain("Int64", f),
        Float32 => plain("Float32", f),
        Float64 => plain("Float64", f),
        Enum(sym, _) => plain(sym.name(), f),
        Relation => plain("Relation", f),
        Lattice => plain("Lattice", f),
        Arrow(arity) if args.len() == arity + 2 => {
            let eff = args[0];
            let result = args[args.len() - 1];
            let params = &args[1..args.len() - 1];
            write!(f, "(")?;
            for (i, p) in params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", p)?;
            }
            write!(f, ") -> {}", result)?;
            if !matches!(eff, Type::Cst(TypeConstructor::Pure, _)) {
                write!(f, " \\ {}", eff)?;
            }
            Ok(())
        }
        Arrow(arity) => plain(&format!("Arrow{}", arity), f),
        Tuple(arity) if args.len() == *arity => {
            write!(f, "(")?;
            for (i, a) in args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", a)?;
            }
            write!(f, ")")
        }
        Tuple(arity) => plain(&format!("Tuple{}", arity), f),
        RecordRowEmpty => write!(f, "{{}}"),
        RecordRowExtend(label) if args.len() == 2 => {
            write!(f, "{{ {} = {} | {} }}", label, args[0], args[1])
        }
        RecordRowExtend(label) => plain(&format!("{{ {} }}", label), f),
        SchemaRowEmpty => write!(f, "#{{}}"),
        SchemaRowExtend(pred) if args.len() == 2 => {
            write!(f, "#{{ {} = {} | {} }}", pred, args[0], args[1])
        }
        SchemaRowExtend(pred) => plain(&format!("#{{ {} }}", pred), f),
        Effect(sym) => plain(sym.name(), f),
        Pure => plain("Pure", f),
        Univ => plain("Univ", f),
        Complement if args.len() == 1 => write!(f, "~{}", args[0]),
        Complement => plain("~", f),
        Union if args.len() == 2 => write!(f, "({} + {})", args[0], args[1]),
        Union => plain("+", f),
        Intersection if args.len() == 2 => write!(f, "({} & {})", args[0], args[1]),
        Intersection => plain("&", f),
    }
}

// ── Schemes & Class Constraints ─────────────────────────────────────────

/// A class membership requirement `class[arg]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassConstraint {
    pub class: rill_common::ClassSym,
    pub arg: Type,
    pub loc: SourceLocation,
}

/// A polymorphic type scheme: a type quantified over a prefix of variables
/// with a set of class constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scheme {
    pub quantifiers: Vec<TypeVarSym>,
    pub constraints: Vec<ClassConstraint>,
    pub base: Type,
}

impl Scheme {
    /// A monomorphic scheme.
    pub fn mono(base: Type) -> Self {
        Scheme { quantifiers: Vec::new(), constraints: Vec::new(), base }
    }
}

// ── Rigidity ────────────────────────────────────────────────────────────

/// The set of variables that may unify only with themselves.
///
/// Rigid variables model universal quantification: quantifiers of the
/// definition under inference and region variables. The set only ever
/// grows during one definition.
#[derive(Debug, Clone, Default)]
pub struct RigidityEnv {
    rigid: FxHashSet<VarId>,
}

impl RigidityEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_rigid(&self, id: VarId) -> bool {
        self.rigid.contains(&id)
    }

    pub fn rigidify(&mut self, id: VarId) {
        self.rigid.insert(id);
    }

    pub fn len(&self) -> usize {
        self.rigid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rigid.is_empty()
    }
}
