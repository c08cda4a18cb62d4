//! Shared builders for integration tests: small resolved ASTs constructed
//! by hand, checked through the full pipeline.
#![allow(dead_code)]

use rill_ast::resolved::{Constant, Def, DefSpec, Expr, FormalParam, Root, SourceFile};
use rill_common::{DefSym, SourceId, SourceLocation, Span, VarSym};
use rill_types::{ClassConstraint, Kind, Level, Type, TypeVarSym, VarId};
use rill_typeck::solve::Budget;
use rill_typeck::zhegalkin::ZhegalkinCache;
use rill_typeck::CheckResult;

pub fn loc() -> SourceLocation {
    SourceLocation::new(SourceId(0), Span::new(0, 1))
}

/// A location with a distinct span, for asserting error positions.
pub fn at(start: u32, end: u32) -> SourceLocation {
    SourceLocation::new(SourceId(0), Span::new(start, end))
}

pub fn tvar(id: u32, kind: Kind) -> TypeVarSym {
    TypeVarSym::new(VarId(id), kind, Level::TOP)
}

pub fn int(value: i32) -> Expr {
    Expr::Cst { cst: Constant::Int32(value), loc: loc() }
}

pub fn string(value: &str) -> Expr {
    Expr::Cst { cst: Constant::Str(value.to_string()), loc: loc() }
}

pub fn var_exp(id: u32, name: &str) -> Expr {
    Expr::Var { sym: VarSym::new(id, name), loc: loc() }
}

pub fn fparam(id: u32, name: &str, tpe: Type) -> FormalParam {
    FormalParam { bnd: VarSym::new(id, name), tpe: Some(tpe), loc: loc() }
}

pub fn spec(
    quantifiers: Vec<TypeVarSym>,
    constraints: Vec<ClassConstraint>,
    fparams: Vec<FormalParam>,
    ret_tpe: Type,
    eff: Type,
) -> DefSpec {
    DefSpec { quantifiers, constraints, fparams, ret_tpe, eff }
}

pub fn def(name: &str, spec: DefSpec, exp: Expr) -> Def {
    Def { sym: DefSym::new(name), spec, exp, loc: loc() }
}

pub fn mono_def(name: &str, fparams: Vec<FormalParam>, ret: Type, eff: Type, exp: Expr) -> Def {
    def(name, spec(Vec::new(), Vec::new(), fparams, ret, eff), exp)
}

pub fn root_with_defs(defs: Vec<Def>) -> Root {
    let mut root = Root::default();
    root.sources.push(SourceFile {
        name: "main.rl".to_string(),
        text: "// synthesized by the test harness\n".to_string(),
    });
    for d in defs {
        root.defs.insert(d.sym.clone(), d);
    }
    root
}

pub fn check(root: &Root) -> CheckResult {
    rill_typeck::check_root(
        root,
        rill_typeck::builtins::StdLib::All,
        &ZhegalkinCache::default(),
        &Budget::unlimited(),
    )
}

pub fn assert_no_errors(result: &CheckResult) {
    assert!(
        result.messages.is_empty(),
        "expected no messages, got: {:?}",
        result
            .messages
            .iter()
            .map(|m| format!("[{}] {}", m.code(), m))
            .collect::<Vec<_>>()
    );
}

pub fn assert_has_code(result: &CheckResult, code: &str) {
    assert!(
        result.messages.iter().any(|m| m.code() == code),
        "expected a {} message, got: {:?}",
        code,
        result
            .messages
            .iter()
            .map(|m| format!("[{}] {}", m.code(), m))
            .collect::<Vec<_>>()
    );
}
