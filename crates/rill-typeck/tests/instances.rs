//! Class and instance machinery end to end: entailment against declared
//! constraints and the instance environment, ambiguity and missing
//! instances, and the instance well-formedness checks.

mod common;

use common::*;

use rill_ast::resolved::{Class, DefSpec, Expr, Instance, InstanceDef, Root, Sig};
use rill_common::{ClassSym, SigSym};
use rill_types::{ClassConstraint, Kind, Type};

/// trait Show { def show(x: t): String }
fn show_class() -> Class {
    let t = tvar(0, Kind::Star);
    Class {
        sym: ClassSym::new("Show"),
        quantifier: t.clone(),
        super_classes: Vec::new(),
        assoc_types: Vec::new(),
        sigs: vec![Sig {
            sym: SigSym::new("Show.show"),
            class: ClassSym::new("Show"),
            spec: DefSpec {
                quantifiers: Vec::new(),
                constraints: Vec::new(),
                fparams: vec![fparam(1, "x", Type::Var(t))],
                ret_tpe: Type::str(loc()),
                eff: Type::pure(loc()),
            },
            exp: None,
            loc: loc(),
        }],
        loc: loc(),
    }
}

fn show_instance_for(tpe: Type, at_loc: rill_common::SourceLocation) -> Instance {
    Instance {
        class: ClassSym::new("Show"),
        tpe: tpe.clone(),
        quantifiers: Vec::new(),
        constraints: Vec::new(),
        assoc_defs: Vec::new(),
        defs: vec![InstanceDef {
            sym: SigSym::new("Show.show"),
            spec: DefSpec {
                quantifiers: Vec::new(),
                constraints: Vec::new(),
                fparams: vec![fparam(1, "x", tpe)],
                ret_tpe: Type::str(loc()),
                eff: Type::pure(loc()),
            },
            exp: string("42"),
            loc: at_loc,
        }],
        loc: at_loc,
    }
}

fn show_root() -> Root {
    let mut root = root_with_defs(Vec::new());
    root.classes.insert(ClassSym::new("Show"), show_class());
    root.instances.insert(
        ClassSym::new("Show"),
        vec![show_instance_for(Type::int32(loc()), loc())],
    );
    root
}

fn call_show(arg: Expr) -> Expr {
    Expr::Apply {
        exp: Box::new(Expr::Sig { sym: SigSym::new("Show.show"), loc: at(30, 34) }),
        args: vec![arg],
        loc: at(30, 40),
    }
}

#[test]
fn ground_instance_is_found() {
    // def f(): String = show(42)
    let d = mono_def("f", Vec::new(), Type::str(loc()), Type::pure(loc()), call_show(int(42)));
    let mut root = show_root();
    root.defs.insert(d.sym.clone(), d);
    let result = check(&root);
    assert_no_errors(&result);
}

#[test]
fn missing_instance_is_reported_per_call_site() {
    // def f(): String = show("text")  -- no Show[String] instance.
    let d = mono_def(
        "f",
        Vec::new(),
        Type::str(loc()),
        Type::pure(loc()),
        call_show(string("text")),
    );
    let mut root = show_root();
    root.defs.insert(d.sym.clone(), d);
    let result = check(&root);
    assert_has_code(&result, "E1005");
}

#[test]
fn unconstrained_argument_is_ambiguous_at_the_call_site() {
    // def f[a](x: a): String = show(x)  -- nothing picks an instance.
    let a = tvar(0, Kind::Star);
    let d = def(
        "f",
        spec(
            vec![a.clone()],
            Vec::new(),
            vec![fparam(0, "x", Type::Var(a))],
            Type::str(loc()),
            Type::pure(loc()),
        ),
        call_show(var_exp(0, "x")),
    );
    let mut root = show_root();
    root.defs.insert(d.sym.clone(), d);
    let result = check(&root);
    assert_has_code(&result, "E1006");
    let msg = result.messages.iter().find(|m| m.code() == "E1006").unwrap();
    // Reported at the call site, not at the class declaration.
    assert_eq!(msg.loc().span.start, 30);
}

#[test]
fn declared_constraint_satisfies_the_signature() {
    // def f[a](x: a): String with Show[a] = show(x)
    let a = tvar(0, Kind::Star);
    let d = def(
        "f",
        spec(
            vec![a.clone()],
            vec![ClassConstraint { class: ClassSym::new("Show"), arg: Type::Var(a.clone()), loc: loc() }],
            vec![fparam(0, "x", Type::Var(a))],
            Type::str(loc()),
            Type::pure(loc()),
        ),
        call_show(var_exp(0, "x")),
    );
    let mut root = show_root();
    root.defs.insert(d.sym.clone(), d);
    let result = check(&root);
    assert_no_errors(&result);
}

#[test]
fn superclass_assumption_entails_the_subclass_constraint() {
    // trait Eq; trait Ord: Eq; def f[a](x: a): String with Ord[a] = eq-ish call
    let t = tvar(0, Kind::Star);
    let eq_class = Class {
        sym: ClassSym::new("Eq"),
        quantifier: t.clone(),
        super_classes: Vec::new(),
        assoc_types: Vec::new(),
        sigs: vec![Sig {
            sym: SigSym::new("Eq.same"),
            class: ClassSym::new("Eq"),
            spec: DefSpec {
                quantifiers: Vec::new(),
                constraints: Vec::new(),
                fparams: vec![fparam(1, "x", Type::Var(t.clone())), fparam(2, "y", Type::Var(t.clone()))],
                ret_tpe: Type::bool(loc()),
                eff: Type::pure(loc()),
            },
            exp: None,
            loc: loc(),
        }],
        loc: loc(),
    };
    let ord_class = Class {
        sym: ClassSym::new("Ord"),
        quantifier: t.clone(),
        super_classes: vec![ClassSym::new("Eq")],
        assoc_types: Vec::new(),
        sigs: Vec::new(),
        loc: loc(),
    };

    let a = tvar(0, Kind::Star);
    let body = Expr::Apply {
        exp: Box::new(Expr::Sig { sym: SigSym::new("Eq.same"), loc: loc() }),
        args: vec![var_exp(0, "x"), var_exp(0, "x")],
        loc: loc(),
    };
    let d = def(
        "f",
        spec(
            vec![a.clone()],
            vec![ClassConstraint { class: ClassSym::new("Ord"), arg: Type::Var(a.clone()), loc: loc() }],
            vec![fparam(0, "x", Type::Var(a))],
            Type::bool(loc()),
            Type::pure(loc()),
        ),
        body,
    );
    let mut root = root_with_defs(vec![d]);
    root.classes.insert(ClassSym::new("Eq"), eq_class);
    root.classes.insert(ClassSym::new("Ord"), ord_class);
    let result = check(&root);
    assert_no_errors(&result);
}

// ── Instance well-formedness ────────────────────────────────────────────

#[test]
fn overlapping_instances_are_reported_with_both_locations() {
    let mut root = root_with_defs(Vec::new());
    root.classes.insert(ClassSym::new("Show"), show_class());
    root.instances.insert(
        ClassSym::new("Show"),
        vec![
            show_instance_for(Type::int32(loc()), at(10, 20)),
            show_instance_for(Type::int32(loc()), at(50, 60)),
        ],
    );
    let result = check(&root);
    assert_has_code(&result, "E3001");
    let msg = result.messages.iter().find(|m| m.code() == "E3001").unwrap();
    assert_eq!(msg.loc().span.start, 10);
    assert_eq!(msg.secondary_locs()[0].span.start, 50);
}

#[test]
fn missing_implementation_is_reported() {
    let mut instance = show_instance_for(Type::int32(loc()), loc());
    instance.defs.clear();
    let mut root = root_with_defs(Vec::new());
    root.classes.insert(ClassSym::new("Show"), show_class());
    root.instances.insert(ClassSym::new("Show"), vec![instance]);
    let result = check(&root);
    assert_has_code(&result, "E3004");
}

#[test]
fn extraneous_definition_is_reported() {
    let mut instance = show_instance_for(Type::int32(loc()), loc());
    instance.defs.push(InstanceDef {
        sym: SigSym::new("Show.frobnicate"),
        spec: DefSpec {
            quantifiers: Vec::new(),
            constraints: Vec::new(),
            fparams: Vec::new(),
            ret_tpe: Type::unit(loc()),
            eff: Type::pure(loc()),
        },
        exp: Expr::Cst { cst: rill_ast::resolved::Constant::Unit, loc: loc() },
        loc: loc(),
    });
    let mut root = root_with_defs(Vec::new());
    root.classes.insert(ClassSym::new("Show"), show_class());
    root.instances.insert(ClassSym::new("Show"), vec![instance]);
    let result = check(&root);
    assert_has_code(&result, "E3006");
}

#[test]
fn mismatched_signature_is_reported() {
    let mut instance = show_instance_for(Type::int32(loc()), loc());
    // Wrong return type on the implementation.
    instance.defs[0].spec.ret_tpe = Type::int32(loc());
    instance.defs[0].exp = int(0);
    let mut root = root_with_defs(Vec::new());
    root.classes.insert(ClassSym::new("Show"), show_class());
    root.instances.insert(ClassSym::new("Show"), vec![instance]);
    let result = check(&root);
    assert_has_code(&result, "E3005");
}

#[test]
fn complex_instance_head_is_reported() {
    let mut instance = show_instance_for(Type::int32(loc()), loc());
    // Head is an application with a non-variable argument.
    let list = list_of(Type::int32(loc()));
    instance.tpe = list.clone();
    instance.defs[0].spec.fparams = vec![fparam(1, "x", list)];
    let mut root = root_with_defs(Vec::new());
    root.classes.insert(ClassSym::new("Show"), show_class());
    root.instances.insert(ClassSym::new("Show"), vec![instance]);
    let result = check(&root);
    assert_has_code(&result, "E3002");
}

fn list_of(arg: Type) -> Type {
    let ctor = rill_types::TypeConstructor::Enum(
        rill_common::EnumSym::new("List"),
        Kind::arrow(Kind::Star, Kind::Star),
    );
    Type::apply(Type::Cst(ctor, loc()), arg, loc())
}
