//! End-to-end inference over hand-built resolved ASTs: literals, lambdas,
//! application, let/if/match, records, enums, and Datalog constraint sets.

mod common;

use common::*;

use rill_ast::resolved::{
    BodyAtom, Case, Constant, Denotation, Enum, Expr, FixpointConstraint, FormalParam, HeadAtom,
    MatchRule, Pattern, Polarity,
};
use rill_common::{CaseSym, DefSym, EnumSym, PredSym, VarSym};
use rill_types::{Kind, Type, TypeConstructor};

// ── Scenario: identity ──────────────────────────────────────────────────

#[test]
fn identity_definition_checks_cleanly() {
    // def id[a](x: a): a = x
    let a = tvar(0, Kind::Star);
    let d = def(
        "id",
        spec(
            vec![a.clone()],
            Vec::new(),
            vec![fparam(0, "x", Type::Var(a.clone()))],
            Type::Var(a.clone()),
            Type::pure(loc()),
        ),
        var_exp(0, "x"),
    );
    let result = check(&root_with_defs(vec![d]));
    assert_no_errors(&result);

    let typed = &result.root.defs[&DefSym::new("id")];
    // The parameter keeps its rigid quantifier type; the def is pure.
    assert_eq!(typed.exp.tpe, Type::Var(a.clone()));
    assert_eq!(
        typed.tpe,
        Type::arrow(vec![Type::Var(a.clone())], Type::pure(loc()), Type::Var(a), loc()),
    );
}

#[test]
fn applied_lambda_infers_the_argument_type() {
    // def f(): Int32 = (x -> x)(42)
    let lambda = Expr::Lambda {
        fparam: FormalParam { bnd: VarSym::new(0, "x"), tpe: None, loc: loc() },
        body: Box::new(var_exp(0, "x")),
        loc: loc(),
    };
    let apply = Expr::Apply { exp: Box::new(lambda), args: vec![int(42)], loc: loc() };
    let d = mono_def("f", Vec::new(), Type::int32(loc()), Type::pure(loc()), apply);
    let result = check(&root_with_defs(vec![d]));
    assert_no_errors(&result);
    let typed = &result.root.defs[&DefSym::new("f")];
    assert_eq!(typed.exp.tpe, Type::int32(loc()));
    match &typed.exp.kind {
        rill_ast::typed::TypedExprKind::Apply { exp, .. } => {
            // The lambda's annotation resolved to (Int32) -> Int32.
            let (params, _, result_tpe) = exp.tpe.arrow_parts().expect("arrow");
            assert_eq!(*params[0], Type::int32(loc()));
            assert_eq!(*result_tpe, Type::int32(loc()));
        }
        other => panic!("expected Apply, got {:?}", other),
    }
}

#[test]
fn let_and_if_propagate_types() {
    // def f(b: Bool): Int32 = let y = 1; if (b) y else 2
    let body = Expr::Let {
        bnd: VarSym::new(1, "y"),
        e1: Box::new(int(1)),
        e2: Box::new(Expr::IfThenElse {
            e1: Box::new(var_exp(0, "b")),
            e2: Box::new(var_exp(1, "y")),
            e3: Box::new(int(2)),
            loc: loc(),
        }),
        loc: loc(),
    };
    let d = mono_def(
        "f",
        vec![fparam(0, "b", Type::bool(loc()))],
        Type::int32(loc()),
        Type::pure(loc()),
        body,
    );
    let result = check(&root_with_defs(vec![d]));
    assert_no_errors(&result);
}

#[test]
fn string_body_for_int_definition_is_a_mismatch() {
    let d = mono_def(
        "bad",
        Vec::new(),
        Type::int32(loc()),
        Type::pure(loc()),
        string("hello"),
    );
    let result = check(&root_with_defs(vec![d]));
    assert_has_code(&result, "E1001");
}

#[test]
fn self_application_fails_the_occurs_check() {
    // def f(): Int32 = (x -> x(x))(...)  -- the lambda alone suffices.
    let lambda = Expr::Lambda {
        fparam: FormalParam { bnd: VarSym::new(0, "x"), tpe: None, loc: loc() },
        body: Box::new(Expr::Apply {
            exp: Box::new(var_exp(0, "x")),
            args: vec![var_exp(0, "x")],
            loc: loc(),
        }),
        loc: loc(),
    };
    let d = mono_def(
        "f",
        Vec::new(),
        Type::Var(tvar(10, Kind::Star)),
        Type::pure(loc()),
        lambda,
    );
    let result = check(&root_with_defs(vec![d]));
    assert_has_code(&result, "E1002");
}

#[test]
fn unknown_symbol_is_reported_and_checking_continues() {
    let d = mono_def(
        "f",
        Vec::new(),
        Type::int32(loc()),
        Type::pure(loc()),
        Expr::Def { sym: DefSym::new("Nope.nothing"), loc: loc() },
    );
    let ok = mono_def("g", Vec::new(), Type::int32(loc()), Type::pure(loc()), int(5));
    let result = check(&root_with_defs(vec![d, ok]));
    assert_has_code(&result, "E1008");
    assert_eq!(result.messages.len(), 1);
}

// ── Enums and matching ──────────────────────────────────────────────────

fn option_enum() -> Enum {
    let a = tvar(0, Kind::Star);
    Enum {
        sym: EnumSym::new("Option"),
        quantifiers: vec![a.clone()],
        cases: vec![
            Case {
                sym: CaseSym::new("Option.None"),
                enum_sym: EnumSym::new("Option"),
                tpes: Vec::new(),
                loc: loc(),
            },
            Case {
                sym: CaseSym::new("Option.Some"),
                enum_sym: EnumSym::new("Option"),
                tpes: vec![Type::Var(a)],
                loc: loc(),
            },
        ],
        loc: loc(),
    }
}

fn option_of(arg: Type) -> Type {
    let ctor = TypeConstructor::Enum(EnumSym::new("Option"), Kind::arrow(Kind::Star, Kind::Star));
    Type::apply(Type::Cst(ctor, loc()), arg, loc())
}

#[test]
fn match_on_enum_unifies_patterns_and_branches() {
    // def get(x: Option[Int32]): Int32 = match x {
    //   case None    => 0
    //   case Some(y) => y
    // }
    let rules = vec![
        MatchRule {
            pat: Pattern::Tag { sym: CaseSym::new("Option.None"), pats: Vec::new(), loc: loc() },
            guard: None,
            exp: int(0),
        },
        MatchRule {
            pat: Pattern::Tag {
                sym: CaseSym::new("Option.Some"),
                pats: vec![Pattern::Var { sym: VarSym::new(1, "y"), loc: loc() }],
                loc: loc(),
            },
            guard: None,
            exp: var_exp(1, "y"),
        },
    ];
    let body = Expr::Match { scrutinee: Box::new(var_exp(0, "x")), rules, loc: loc() };
    let d = mono_def(
        "get",
        vec![fparam(0, "x", option_of(Type::int32(loc())))],
        Type::int32(loc()),
        Type::pure(loc()),
        body,
    );
    let mut root = root_with_defs(vec![d]);
    root.enums.insert(EnumSym::new("Option"), option_enum());
    let result = check(&root);
    assert_no_errors(&result);
}

#[test]
fn guard_must_be_boolean() {
    let rules = vec![MatchRule {
        pat: Pattern::Wildcard { loc: loc() },
        guard: Some(int(1)),
        exp: int(0),
    }];
    let body = Expr::Match { scrutinee: Box::new(int(7)), rules, loc: loc() };
    let d = mono_def("f", Vec::new(), Type::int32(loc()), Type::pure(loc()), body);
    let result = check(&root_with_defs(vec![d]));
    assert_has_code(&result, "E1001");
}

#[test]
fn tag_construction_instantiates_the_enum() {
    // def some(): Option[Int32] = Some(1)
    let body = Expr::Tag { sym: CaseSym::new("Option.Some"), args: vec![int(1)], loc: loc() };
    let d = mono_def(
        "some",
        Vec::new(),
        option_of(Type::int32(loc())),
        Type::pure(loc()),
        body,
    );
    let mut root = root_with_defs(vec![d]);
    root.enums.insert(EnumSym::new("Option"), option_enum());
    let result = check(&root);
    assert_no_errors(&result);
    let typed = &result.root.defs[&DefSym::new("some")];
    assert_eq!(typed.exp.tpe, option_of(Type::int32(loc())));
}

// ── Records ─────────────────────────────────────────────────────────────

#[test]
fn record_select_finds_the_label_regardless_of_order() {
    // def f(): Int32 = { y = true, x = 1 }.x
    let record = Expr::RecordExtend {
        label: "y".to_string(),
        value: Box::new(Expr::Cst { cst: Constant::Bool(true), loc: loc() }),
        rest: Box::new(Expr::RecordExtend {
            label: "x".to_string(),
            value: Box::new(int(1)),
            rest: Box::new(Expr::RecordEmpty { loc: loc() }),
            loc: loc(),
        }),
        loc: loc(),
    };
    let body = Expr::RecordSelect { exp: Box::new(record), label: "x".to_string(), loc: loc() };
    let d = mono_def("f", Vec::new(), Type::int32(loc()), Type::pure(loc()), body);
    let result = check(&root_with_defs(vec![d]));
    assert_no_errors(&result);
}

#[test]
fn selecting_a_missing_label_is_a_mismatch() {
    let record = Expr::RecordExtend {
        label: "x".to_string(),
        value: Box::new(int(1)),
        rest: Box::new(Expr::RecordEmpty { loc: loc() }),
        loc: loc(),
    };
    let body = Expr::RecordSelect { exp: Box::new(record), label: "nope".to_string(), loc: loc() };
    let d = mono_def("f", Vec::new(), Type::int32(loc()), Type::pure(loc()), body);
    let result = check(&root_with_defs(vec![d]));
    assert_has_code(&result, "E1001");
}

// ── Datalog ─────────────────────────────────────────────────────────────

#[test]
fn constraint_set_unifies_predicate_schemas_positionally() {
    // def facts(): _ = #{ Edge(1, 2). Path(x) :- Edge(x, _). }
    let cs = vec![
        FixpointConstraint {
            head: HeadAtom {
                pred: PredSym::new("Edge"),
                den: Denotation::Relational,
                terms: vec![int(1), int(2)],
                loc: loc(),
            },
            body: Vec::new(),
            loc: loc(),
        },
        FixpointConstraint {
            head: HeadAtom {
                pred: PredSym::new("Path"),
                den: Denotation::Relational,
                terms: vec![var_exp(3, "x")],
                loc: loc(),
            },
            body: vec![BodyAtom {
                pred: PredSym::new("Edge"),
                den: Denotation::Relational,
                polarity: Polarity::Positive,
                terms: vec![
                    Pattern::Var { sym: VarSym::new(3, "x"), loc: loc() },
                    Pattern::Wildcard { loc: loc() },
                ],
                loc: loc(),
            }],
            loc: loc(),
        },
    ];
    let body = Expr::FixpointConstraintSet { cs, loc: loc() };
    // The set's schema row stays open; ascribe nothing and return it.
    let d = mono_def(
        "facts",
        Vec::new(),
        Type::Var(tvar(20, Kind::Schema)),
        Type::pure(loc()),
        body,
    );
    let result = check(&root_with_defs(vec![d]));
    assert_no_errors(&result);
}

#[test]
fn conflicting_predicate_arity_is_a_mismatch() {
    // Edge(1, 2) vs Edge(1): same predicate, different tuple widths.
    let cs = vec![
        FixpointConstraint {
            head: HeadAtom {
                pred: PredSym::new("Edge"),
                den: Denotation::Relational,
                terms: vec![int(1), int(2)],
                loc: loc(),
            },
            body: Vec::new(),
            loc: loc(),
        },
        FixpointConstraint {
            head: HeadAtom {
                pred: PredSym::new("Edge"),
                den: Denotation::Relational,
                terms: vec![int(1)],
                loc: loc(),
            },
            body: Vec::new(),
            loc: loc(),
        },
    ];
    let body = Expr::FixpointConstraintSet { cs, loc: loc() };
    let d = mono_def(
        "facts",
        Vec::new(),
        Type::Var(tvar(20, Kind::Schema)),
        Type::pure(loc()),
        body,
    );
    let result = check(&root_with_defs(vec![d]));
    assert_has_code(&result, "E1001");
}

// ── Native interop ──────────────────────────────────────────────────────

#[test]
fn native_invoke_reduces_once_arguments_are_ground() {
    use rill_ast::resolved::NativeSignature;
    use rill_common::NativeMemberSym;

    // def f(): Int32 \ Host = native host.clock.now(1)
    let member = NativeMemberSym::new("host.clock.now");
    let host = rill_common::EffectSym::new("Host");
    let body = Expr::NativeInvoke { member: member.clone(), args: vec![int(1)], loc: loc() };
    let d = mono_def(
        "f",
        Vec::new(),
        Type::int32(loc()),
        Type::effect(host.clone(), loc()),
        body,
    );
    let mut root = root_with_defs(vec![d]);
    root.natives.insert(
        member,
        NativeSignature { tpe: Type::int32(loc()), eff: Type::effect(host, loc()) },
    );
    let result = check(&root);
    assert_no_errors(&result);
}

#[test]
fn unknown_native_member_is_irreducible() {
    use rill_common::NativeMemberSym;

    let member = NativeMemberSym::new("host.missing");
    let body = Expr::NativeInvoke { member, args: vec![int(1)], loc: loc() };
    let d = mono_def("f", Vec::new(), Type::int32(loc()), Type::pure(loc()), body);
    let result = check(&root_with_defs(vec![d]));
    assert_has_code(&result, "E1007");
}
