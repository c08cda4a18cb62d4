//! Effect inference end to end: regions and purification, algebraic
//! effects with handlers, and associated effects reduced per instance.

mod common;

use common::*;

use rill_ast::resolved::{
    AssocTypeClause, AssocTypeDecl, Class, Constant, DefSpec, EffectDecl, Expr, HandlerRule,
    Instance, InstanceDef, OpDecl, Sig,
};
use rill_common::{AssocTypeSym, ClassSym, DefSym, EffectSym, OpSym, SigSym, VarSym};
use rill_types::{Kind, Type};

// ── Regions (purification) ──────────────────────────────────────────────

/// `Ref.get(Ref.fresh(rc, 42))`: allocate and read a cell in region `rc`.
fn deref_fresh(rc_id: u32) -> Expr {
    let fresh = Expr::Apply {
        exp: Box::new(Expr::Def { sym: DefSym::new("Ref.fresh"), loc: loc() }),
        args: vec![var_exp(rc_id, "rc"), int(42)],
        loc: loc(),
    };
    Expr::Apply {
        exp: Box::new(Expr::Def { sym: DefSym::new("Ref.get"), loc: loc() }),
        args: vec![fresh],
        loc: loc(),
    }
}

#[test]
fn region_purifies_to_a_pure_external_effect() {
    // def f(): Int32 \ Pure = region rc { Ref.get(Ref.fresh(rc, 42)) }
    // The internal effect is the region variable; the external effect is
    // required to be Pure by the signature, and purification solves it.
    let r = tvar(0, Kind::Effect);
    let region = Expr::Region {
        sym: r.clone(),
        bnd: VarSym::new(0, "rc"),
        body: Box::new(deref_fresh(0)),
        loc: loc(),
    };
    let d = mono_def("f", Vec::new(), Type::int32(loc()), Type::pure(loc()), region);
    let result = check(&root_with_defs(vec![d]));
    assert_no_errors(&result);
    let typed = &result.root.defs[&DefSym::new("f")];
    assert_eq!(typed.exp.eff, Type::pure(loc()));
}

#[test]
fn effects_other_than_the_region_survive_purification() {
    // def f(): Int32 \ Pure = region rc { println(Ref.get(Ref.fresh(rc, 42))) ; 1 }
    // The region part purifies; the IO effect of println does not, so the
    // declared Pure effect fails.
    let print = Expr::Apply {
        exp: Box::new(Expr::Def { sym: DefSym::new("println"), loc: loc() }),
        args: vec![deref_fresh(0)],
        loc: loc(),
    };
    let body = Expr::Stm { e1: Box::new(print), e2: Box::new(int(1)), loc: loc() };
    let r = tvar(0, Kind::Effect);
    let region = Expr::Region {
        sym: r,
        bnd: VarSym::new(0, "rc"),
        body: Box::new(body),
        loc: loc(),
    };
    let d = mono_def("f", Vec::new(), Type::int32(loc()), Type::pure(loc()), region);
    let result = check(&root_with_defs(vec![d]));
    assert_has_code(&result, "E1004");
}

// ── Algebraic effects ───────────────────────────────────────────────────

fn div_by_zero_effect() -> EffectDecl {
    EffectDecl {
        sym: EffectSym::new("DivByZero"),
        ops: vec![OpDecl {
            sym: OpSym::new("DivByZero.raise"),
            effect: EffectSym::new("DivByZero"),
            spec: DefSpec {
                quantifiers: Vec::new(),
                constraints: Vec::new(),
                fparams: Vec::new(),
                ret_tpe: Type::int32(loc()),
                eff: Type::pure(loc()),
            },
            loc: loc(),
        }],
        loc: loc(),
    }
}

fn do_raise() -> Expr {
    Expr::Do { op: OpSym::new("DivByZero.raise"), args: Vec::new(), loc: loc() }
}

#[test]
fn do_adds_the_operations_effect() {
    // def f(): Int32 \ DivByZero = do DivByZero.raise()
    let d = mono_def(
        "f",
        Vec::new(),
        Type::int32(loc()),
        Type::effect(EffectSym::new("DivByZero"), loc()),
        do_raise(),
    );
    let mut root = root_with_defs(vec![d]);
    root.effects.insert(EffectSym::new("DivByZero"), div_by_zero_effect());
    let result = check(&root);
    assert_no_errors(&result);
}

#[test]
fn unhandled_effect_against_a_pure_signature_fails() {
    let d = mono_def("f", Vec::new(), Type::int32(loc()), Type::pure(loc()), do_raise());
    let mut root = root_with_defs(vec![d]);
    root.effects.insert(EffectSym::new("DivByZero"), div_by_zero_effect());
    let result = check(&root);
    assert_has_code(&result, "E1004");
}

#[test]
fn try_with_handler_eliminates_the_effect() {
    // def f(): Int32 \ Pure =
    //   try do DivByZero.raise() with DivByZero { def raise() = -1 }
    let body = Expr::TryWith {
        exp: Box::new(do_raise()),
        effect: EffectSym::new("DivByZero"),
        rules: vec![HandlerRule {
            op: OpSym::new("DivByZero.raise"),
            fparams: Vec::new(),
            exp: int(-1),
        }],
        loc: loc(),
    };
    let d = mono_def("f", Vec::new(), Type::int32(loc()), Type::pure(loc()), body);
    let mut root = root_with_defs(vec![d]);
    root.effects.insert(EffectSym::new("DivByZero"), div_by_zero_effect());
    let result = check(&root);
    assert_no_errors(&result);
    let typed = &result.root.defs[&DefSym::new("f")];
    assert_eq!(typed.exp.eff, Type::pure(loc()));
}

// ── Associated effects (the Dividable scenario) ─────────────────────────

/// trait Dividable { type Aef: Eff = Pure; def div(x: t, y: t): t \ Aef[t] }
fn dividable_class() -> Class {
    let t = tvar(0, Kind::Star);
    let aef = AssocTypeSym::new("Dividable.Aef");
    Class {
        sym: ClassSym::new("Dividable"),
        quantifier: t.clone(),
        super_classes: Vec::new(),
        assoc_types: vec![AssocTypeDecl {
            sym: aef.clone(),
            kind: Kind::Effect,
            default: Some(Type::pure(loc())),
            loc: loc(),
        }],
        sigs: vec![Sig {
            sym: SigSym::new("Dividable.div"),
            class: ClassSym::new("Dividable"),
            spec: DefSpec {
                quantifiers: Vec::new(),
                constraints: Vec::new(),
                fparams: vec![
                    fparam(1, "x", Type::Var(t.clone())),
                    fparam(2, "y", Type::Var(t.clone())),
                ],
                ret_tpe: Type::Var(t.clone()),
                eff: Type::AssocType(aef, Box::new(Type::Var(t)), Kind::Effect, loc()),
            },
            exp: None,
            loc: loc(),
        }],
        loc: loc(),
    }
}

/// instance Dividable[Int32] { type Aef = DivByZero; def div(x, y) = do raise() }
fn dividable_int32() -> Instance {
    Instance {
        class: ClassSym::new("Dividable"),
        tpe: Type::int32(loc()),
        quantifiers: Vec::new(),
        constraints: Vec::new(),
        assoc_defs: vec![AssocTypeClause {
            sym: AssocTypeSym::new("Dividable.Aef"),
            arg: Type::int32(loc()),
            ret: Type::effect(EffectSym::new("DivByZero"), loc()),
            loc: loc(),
        }],
        defs: vec![InstanceDef {
            sym: SigSym::new("Dividable.div"),
            spec: DefSpec {
                quantifiers: Vec::new(),
                constraints: Vec::new(),
                fparams: vec![
                    fparam(1, "x", Type::int32(loc())),
                    fparam(2, "y", Type::int32(loc())),
                ],
                ret_tpe: Type::int32(loc()),
                eff: Type::effect(EffectSym::new("DivByZero"), loc()),
            },
            exp: do_raise(),
            loc: loc(),
        }],
        loc: loc(),
    }
}

/// instance Dividable[Float64] with the default (pure) associated effect.
fn dividable_float64() -> Instance {
    Instance {
        class: ClassSym::new("Dividable"),
        tpe: Type::float64(loc()),
        quantifiers: Vec::new(),
        constraints: Vec::new(),
        assoc_defs: Vec::new(),
        defs: vec![InstanceDef {
            sym: SigSym::new("Dividable.div"),
            spec: DefSpec {
                quantifiers: Vec::new(),
                constraints: Vec::new(),
                fparams: vec![
                    fparam(1, "x", Type::float64(loc())),
                    fparam(2, "y", Type::float64(loc())),
                ],
                ret_tpe: Type::float64(loc()),
                eff: Type::pure(loc()),
            },
            exp: Expr::Var { sym: VarSym::new(1, "x"), loc: loc() },
            loc: loc(),
        }],
        loc: loc(),
    }
}

fn dividable_root() -> rill_ast::resolved::Root {
    let mut root = root_with_defs(Vec::new());
    root.effects.insert(EffectSym::new("DivByZero"), div_by_zero_effect());
    root.classes.insert(ClassSym::new("Dividable"), dividable_class());
    root.instances.insert(
        ClassSym::new("Dividable"),
        vec![dividable_int32(), dividable_float64()],
    );
    root
}

fn call_div(args: Vec<Expr>) -> Expr {
    Expr::Apply {
        exp: Box::new(Expr::Sig { sym: SigSym::new("Dividable.div"), loc: loc() }),
        args,
        loc: loc(),
    }
}

#[test]
fn handled_associated_effect_becomes_pure() {
    // def f(): Int32 \ Pure =
    //   try div(42, 0) with DivByZero { def raise() = -1 }
    let body = Expr::TryWith {
        exp: Box::new(call_div(vec![int(42), int(0)])),
        effect: EffectSym::new("DivByZero"),
        rules: vec![HandlerRule {
            op: OpSym::new("DivByZero.raise"),
            fparams: Vec::new(),
            exp: int(-1),
        }],
        loc: loc(),
    };
    let d = mono_def("f", Vec::new(), Type::int32(loc()), Type::pure(loc()), body);
    let mut root = dividable_root();
    root.defs.insert(d.sym.clone(), d);
    let result = check(&root);
    assert_no_errors(&result);
    let typed = &result.root.defs[&DefSym::new("f")];
    assert_eq!(typed.exp.eff, Type::pure(loc()));
}

#[test]
fn default_associated_effect_is_pure_without_a_handler() {
    // def g(): Float64 \ Pure = div(42.0, 0.0)
    let f64 = |v: f64| Expr::Cst { cst: Constant::Float64(v), loc: loc() };
    let d = mono_def(
        "g",
        Vec::new(),
        Type::float64(loc()),
        Type::pure(loc()),
        call_div(vec![f64(42.0), f64(0.0)]),
    );
    let mut root = dividable_root();
    root.defs.insert(d.sym.clone(), d);
    let result = check(&root);
    assert_no_errors(&result);
}

#[test]
fn unhandled_associated_effect_fails_a_pure_signature() {
    // def h(): Int32 \ Pure = div(42, 0)  -- DivByZero leaks out.
    let d = mono_def(
        "h",
        Vec::new(),
        Type::int32(loc()),
        Type::pure(loc()),
        call_div(vec![int(42), int(0)]),
    );
    let mut root = dividable_root();
    root.defs.insert(d.sym.clone(), d);
    let result = check(&root);
    assert_has_code(&result, "E1004");
}
