//! Built-in definitions seeded into the definition environment.
//!
//! The `lib` configuration option picks how much of the standard root
//! environment a compilation starts with: `nix` gives a bare environment,
//! `min` the region-aware reference cells, `all` additionally the small
//! I/O and arithmetic surface.

use rill_common::{DefSym, EffectSym, EnumSym, SourceId, SourceLocation};
use rill_types::{ClassConstraint, Kind, Level, Scheme, Type, TypeConstructor, TypeVarSym, VarId};

use crate::registry::Registries;

/// Which standard library level to seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdLib {
    /// No built-ins at all.
    Nix,
    /// Reference cells only.
    Min,
    /// Reference cells plus the small I/O and arithmetic surface.
    #[default]
    All,
}

fn loc() -> SourceLocation {
    SourceLocation::zero(SourceId(0))
}

fn star(id: u32) -> TypeVarSym {
    TypeVarSym::with_text(VarId(id), Kind::Star, Level::TOP, format!("a{id}"))
}

fn eff(id: u32) -> TypeVarSym {
    TypeVarSym::with_text(VarId(id), Kind::Effect, Level::TOP, "r")
}

/// `Ref[a, r]`: a mutable cell holding an `a` inside region `r`.
fn ref_tpe(elm: Type, region: Type) -> Type {
    let ctor = TypeConstructor::Enum(
        EnumSym::new("Ref"),
        Kind::arrow_chain([Kind::Star, Kind::Effect], Kind::Star),
    );
    Type::apply_all(Type::Cst(ctor, loc()), [elm, region], loc())
}

/// `Region[r]`: the value-level handle of a scoped region. Binding a
/// `region rc { .. }` expression gives `rc` this type; the reference-cell
/// operations take it to tie their effect to the region variable.
pub fn region_handle_type(region: Type, at: SourceLocation) -> Type {
    let ctor = TypeConstructor::Enum(
        EnumSym::new("Region"),
        Kind::arrow(Kind::Effect, Kind::Star),
    );
    Type::apply(Type::Cst(ctor, at), region, at)
}

fn scheme(quantifiers: Vec<TypeVarSym>, params: Vec<Type>, eff: Type, ret: Type) -> Scheme {
    Scheme {
        quantifiers,
        constraints: Vec::<ClassConstraint>::new(),
        base: Type::arrow(params, eff, ret, loc()),
    }
}

/// Seed the definition environment with the chosen library level.
pub fn register(reg: &mut Registries, lib: StdLib) {
    if lib == StdLib::Nix {
        return;
    }

    // Reference cells: the operations of a region-scoped mutable cell.
    // Their effect is the cell's region variable, so using them inside
    // `region r { .. }` charges the region and purifies on exit.
    let a = star(0);
    let r = eff(1);
    reg.defs.insert(
        DefSym::new("Ref.fresh"),
        scheme(
            vec![a.clone(), r.clone()],
            vec![
                region_handle_type(Type::Var(r.clone()), loc()),
                Type::Var(a.clone()),
            ],
            Type::Var(r.clone()),
            ref_tpe(Type::Var(a.clone()), Type::Var(r.clone())),
        ),
    );
    reg.defs.insert(
        DefSym::new("Ref.get"),
        scheme(
            vec![a.clone(), r.clone()],
            vec![ref_tpe(Type::Var(a.clone()), Type::Var(r.clone()))],
            Type::Var(r.clone()),
            Type::Var(a.clone()),
        ),
    );
    reg.defs.insert(
        DefSym::new("Ref.put"),
        scheme(
            vec![a.clone(), r.clone()],
            vec![
                ref_tpe(Type::Var(a.clone()), Type::Var(r.clone())),
                Type::Var(a.clone()),
            ],
            Type::Var(r),
            Type::unit(loc()),
        ),
    );

    if lib == StdLib::Min {
        return;
    }

    // The `all` surface.
    let io = Type::effect(EffectSym::new("IO"), loc());
    let p = star(0);
    reg.defs.insert(
        DefSym::new("println"),
        scheme(vec![p.clone()], vec![Type::Var(p)], io, Type::unit(loc())),
    );
    for name in ["Int32.add", "Int32.sub", "Int32.mul"] {
        reg.defs.insert(
            DefSym::new(name),
            scheme(
                Vec::new(),
                vec![Type::int32(loc()), Type::int32(loc())],
                Type::pure(loc()),
                Type::int32(loc()),
            ),
        );
    }
    reg.defs.insert(
        DefSym::new("String.concat"),
        scheme(
            Vec::new(),
            vec![Type::str(loc()), Type::str(loc())],
            Type::pure(loc()),
            Type::str(loc()),
        ),
    );
}
