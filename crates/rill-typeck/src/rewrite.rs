//! Applies the final substitution to the typed AST.
//!
//! Runs once per definition after solving. Every type and effect
//! annotation is substituted and has its now-ground associated types
//! reduced; variables that remain are flexible and free in the top-level
//! definition, left for the downstream generalizer.

use rill_ast::typed::{
    TypedBodyAtom, TypedExpr, TypedExprKind, TypedFixpointConstraint, TypedHandlerRule,
    TypedHeadAtom, TypedMatchRule, TypedPattern, TypedPatternKind,
};
use rill_types::{Kind, RigidityEnv, Type};

use crate::effect::{from_zhegalkin, to_zhegalkin};
use crate::registry::{reduce_all_assoc, Registries};
use crate::subst::Substitution;
use crate::zhegalkin::ZhegalkinCache;

/// Substitute, reduce associated types, and canonicalize effect formulas.
///
/// Effect annotations are pushed through the Zhegalkin layer so the typed
/// AST carries normal forms (a handled effect reads `Pure`, not
/// `DivByZero & ~DivByZero`). Formulas still containing opaque terms are
/// left as they are.
pub(crate) fn finalize(
    tpe: &Type,
    subst: &Substitution,
    reg: &Registries,
    cache: &ZhegalkinCache,
) -> Type {
    let reduced = reduce_all_assoc(reg, &subst.apply(tpe));
    if reduced.kind() == Kind::Effect {
        if let Ok(z) = to_zhegalkin(&reduced, &RigidityEnv::new(), cache) {
            return from_zhegalkin(&z, reduced.loc());
        }
    }
    reduced
}

/// Rewrite one typed expression tree under the final substitution.
pub fn rewrite_exp(
    exp: &TypedExpr,
    subst: &Substitution,
    reg: &Registries,
    cache: &ZhegalkinCache,
) -> TypedExpr {
    let kind = match &exp.kind {
        TypedExprKind::Cst(c) => TypedExprKind::Cst(c.clone()),
        TypedExprKind::Var(sym) => TypedExprKind::Var(sym.clone()),
        TypedExprKind::Def(sym) => TypedExprKind::Def(sym.clone()),
        TypedExprKind::Sig(sym) => TypedExprKind::Sig(sym.clone()),
        TypedExprKind::Lambda { bnd, bnd_tpe, body } => TypedExprKind::Lambda {
            bnd: bnd.clone(),
            bnd_tpe: finalize(bnd_tpe, subst, reg, cache),
            body: Box::new(rewrite_exp(body, subst, reg, cache)),
        },
        TypedExprKind::Apply { exp, args } => TypedExprKind::Apply {
            exp: Box::new(rewrite_exp(exp, subst, reg, cache)),
            args: args.iter().map(|a| rewrite_exp(a, subst, reg, cache)).collect(),
        },
        TypedExprKind::Let { bnd, e1, e2 } => TypedExprKind::Let {
            bnd: bnd.clone(),
            e1: Box::new(rewrite_exp(e1, subst, reg, cache)),
            e2: Box::new(rewrite_exp(e2, subst, reg, cache)),
        },
        TypedExprKind::IfThenElse { e1, e2, e3 } => TypedExprKind::IfThenElse {
            e1: Box::new(rewrite_exp(e1, subst, reg, cache)),
            e2: Box::new(rewrite_exp(e2, subst, reg, cache)),
            e3: Box::new(rewrite_exp(e3, subst, reg, cache)),
        },
        TypedExprKind::Stm { e1, e2 } => TypedExprKind::Stm {
            e1: Box::new(rewrite_exp(e1, subst, reg, cache)),
            e2: Box::new(rewrite_exp(e2, subst, reg, cache)),
        },
        TypedExprKind::Match { scrutinee, rules } => TypedExprKind::Match {
            scrutinee: Box::new(rewrite_exp(scrutinee, subst, reg, cache)),
            rules: rules
                .iter()
                .map(|r| TypedMatchRule {
                    pat: rewrite_pattern(&r.pat, subst, reg, cache),
                    guard: r.guard.as_ref().map(|g| rewrite_exp(g, subst, reg, cache)),
                    exp: rewrite_exp(&r.exp, subst, reg, cache),
                })
                .collect(),
        },
        TypedExprKind::Tuple(elms) => {
            TypedExprKind::Tuple(elms.iter().map(|e| rewrite_exp(e, subst, reg, cache)).collect())
        }
        TypedExprKind::Tag { sym, args } => TypedExprKind::Tag {
            sym: sym.clone(),
            args: args.iter().map(|a| rewrite_exp(a, subst, reg, cache)).collect(),
        },
        TypedExprKind::RecordEmpty => TypedExprKind::RecordEmpty,
        TypedExprKind::RecordExtend { label, value, rest } => TypedExprKind::RecordExtend {
            label: label.clone(),
            value: Box::new(rewrite_exp(value, subst, reg, cache)),
            rest: Box::new(rewrite_exp(rest, subst, reg, cache)),
        },
        TypedExprKind::RecordSelect { exp, label } => TypedExprKind::RecordSelect {
            exp: Box::new(rewrite_exp(exp, subst, reg, cache)),
            label: label.clone(),
        },
        TypedExprKind::Region { sym, bnd, body } => TypedExprKind::Region {
            sym: sym.clone(),
            bnd: bnd.clone(),
            body: Box::new(rewrite_exp(body, subst, reg, cache)),
        },
        TypedExprKind::Ascribe { exp } => {
            TypedExprKind::Ascribe { exp: Box::new(rewrite_exp(exp, subst, reg, cache)) }
        }
        TypedExprKind::Do { op, args } => TypedExprKind::Do {
            op: op.clone(),
            args: args.iter().map(|a| rewrite_exp(a, subst, reg, cache)).collect(),
        },
        TypedExprKind::TryWith { exp, effect, rules } => TypedExprKind::TryWith {
            exp: Box::new(rewrite_exp(exp, subst, reg, cache)),
            effect: effect.clone(),
            rules: rules
                .iter()
                .map(|r| TypedHandlerRule {
                    op: r.op.clone(),
                    fparams: r
                        .fparams
                        .iter()
                        .map(|(bnd, tpe)| (bnd.clone(), finalize(tpe, subst, reg, cache)))
                        .collect(),
                    exp: rewrite_exp(&r.exp, subst, reg, cache),
                })
                .collect(),
        },
        TypedExprKind::FixpointConstraintSet(cs) => TypedExprKind::FixpointConstraintSet(
            cs.iter()
                .map(|c| TypedFixpointConstraint {
                    head: TypedHeadAtom {
                        pred: c.head.pred.clone(),
                        den: c.head.den,
                        terms: c.head.terms.iter().map(|t| rewrite_exp(t, subst, reg, cache)).collect(),
                        loc: c.head.loc,
                    },
                    body: c
                        .body
                        .iter()
                        .map(|b| TypedBodyAtom {
                            pred: b.pred.clone(),
                            den: b.den,
                            polarity: b.polarity,
                            terms: b.terms.iter().map(|p| rewrite_pattern(p, subst, reg, cache)).collect(),
                            loc: b.loc,
                        })
                        .collect(),
                    loc: c.loc,
                })
                .collect(),
        ),
        TypedExprKind::NativeInvoke { member, args } => TypedExprKind::NativeInvoke {
            member: member.clone(),
            args: args.iter().map(|a| rewrite_exp(a, subst, reg, cache)).collect(),
        },
        TypedExprKind::Unsupported(name) => TypedExprKind::Unsupported(name.clone()),
    };
    TypedExpr {
        kind,
        tpe: finalize(&exp.tpe, subst, reg, cache),
        eff: finalize(&exp.eff, subst, reg, cache),
        loc: exp.loc,
    }
}

fn rewrite_pattern(
    pat: &TypedPattern,
    subst: &Substitution,
    reg: &Registries,
    cache: &ZhegalkinCache,
) -> TypedPattern {
    let kind = match &pat.kind {
        TypedPatternKind::Wildcard => TypedPatternKind::Wildcard,
        TypedPatternKind::Var(sym) => TypedPatternKind::Var(sym.clone()),
        TypedPatternKind::Cst(c) => TypedPatternKind::Cst(c.clone()),
        TypedPatternKind::Tag { sym, pats } => TypedPatternKind::Tag {
            sym: sym.clone(),
            pats: pats.iter().map(|p| rewrite_pattern(p, subst, reg, cache)).collect(),
        },
        TypedPatternKind::Tuple(elms) => {
            TypedPatternKind::Tuple(elms.iter().map(|p| rewrite_pattern(p, subst, reg, cache)).collect())
        }
    };
    TypedPattern { kind, tpe: finalize(&pat.tpe, subst, reg, cache), loc: pat.loc }
}
