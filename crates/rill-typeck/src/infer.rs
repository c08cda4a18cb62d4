//! Constraint generation.
//!
//! A recursive structural walk of the resolved AST. Every expression node
//! gets a type and an effect; constraints are emitted into the typing
//! context in traversal order. The walk never solves anything itself: all
//! equalities, class memberships, and purifications are deferred to the
//! solver.

use rustc_hash::FxHashMap;

use rill_common::SourceLocation;
use rill_types::{ClassConstraint, Kind, RigidityEnv, Scheme, Type, TypeConstructor};

use rill_ast::resolved::{
    BodyAtom, Constant, Def, DefSpec, Denotation, Expr, FixpointConstraint, FormalParam,
    HeadAtom, MatchRule, Pattern,
};
use rill_ast::typed::{
    TypedBodyAtom, TypedExpr, TypedExprKind, TypedFixpointConstraint, TypedHandlerRule,
    TypedHeadAtom, TypedMatchRule, TypedPattern, TypedPatternKind,
};

use crate::constraint::{Provenance, TypingConstraint};
use crate::context::{TypingContext, VarSupply};
use crate::error::{CompilationMessage, TypeError};
use crate::registry::{instantiate, Registries};

/// Everything the solver needs about one definition.
#[derive(Debug)]
pub struct Inference {
    /// The typed body, annotated with pre-substitution types.
    pub exp: TypedExpr,
    /// The definition's own (declared) type.
    pub def_tpe: Type,
    /// The declared effect.
    pub def_eff: Type,
    pub constraints: Vec<TypingConstraint>,
    pub renv: RigidityEnv,
    pub supply: VarSupply,
    /// The declared class constraints, assumed during entailment.
    pub assumptions: Vec<ClassConstraint>,
    /// Errors found during generation (unknown symbols, unsupported
    /// constructs). Generation always completes.
    pub errors: Vec<CompilationMessage>,
}

/// Generate constraints for a top-level definition.
pub fn infer_def(def: &Def, reg: &Registries) -> Inference {
    infer_spec_exp(&def.spec, &def.exp, def.loc, reg)
}

/// Generate constraints for any spec/body pair (top-level definitions,
/// instance method bodies, signature defaults).
pub fn infer_spec_exp(
    spec: &DefSpec,
    exp: &Expr,
    loc: SourceLocation,
    reg: &Registries,
) -> Inference {
    let supply = VarSupply::starting_at(first_free_var_id(spec, exp));
    let mut ctx = TypingContext::new(supply);

    // Declared quantifiers are rigid while checking the body.
    for q in &spec.quantifiers {
        ctx.rigidify(q);
    }

    let mut walker = Walker { reg, ctx, env: FxHashMap::default(), errors: Vec::new() };

    let mut param_tpes = Vec::new();
    for fp in &spec.fparams {
        let tpe = walker.bind_param(fp);
        param_tpes.push(tpe);
    }

    let body = walker.infer_exp(exp);

    // The body must produce the declared type under the declared effect.
    walker.ctx.expect_type(spec.ret_tpe.clone(), body.tpe.clone(), body.loc);
    walker.ctx.expect_type(spec.eff.clone(), body.eff.clone(), body.loc);

    let def_tpe = Type::arrow(param_tpes, spec.eff.clone(), spec.ret_tpe.clone(), loc);
    let Walker { ctx, errors, .. } = walker;
    let (constraints, renv, supply) = ctx.finish();

    Inference {
        exp: body,
        def_tpe,
        def_eff: spec.eff.clone(),
        constraints,
        renv,
        supply,
        assumptions: spec.constraints.clone(),
        errors,
    }
}

/// The fresh-variable supply must start above every identity the resolver
/// assigned inside this definition.
fn first_free_var_id(spec: &DefSpec, exp: &Expr) -> u32 {
    let mut max = 0u32;
    let mut bump = |id: u32| {
        if id >= max {
            max = id + 1;
        }
    };
    for q in &spec.quantifiers {
        bump(q.id.0);
    }
    let mut tpe_ids = |tpe: &Type| tpe.free_vars().iter().map(|v| v.id.0).collect::<Vec<_>>();
    for fp in &spec.fparams {
        if let Some(tpe) = &fp.tpe {
            for id in tpe_ids(tpe) {
                bump(id);
            }
        }
    }
    for id in tpe_ids(&spec.ret_tpe) {
        bump(id);
    }
    for id in tpe_ids(&spec.eff) {
        bump(id);
    }
    for cc in &spec.constraints {
        for id in tpe_ids(&cc.arg) {
            bump(id);
        }
    }
    scan_expr_var_ids(exp, &mut bump);
    max
}

fn scan_expr_var_ids(exp: &Expr, bump: &mut impl FnMut(u32)) {
    let mut scan_tpe = |tpe: &Type, bump: &mut dyn FnMut(u32)| {
        for v in tpe.free_vars() {
            bump(v.id.0);
        }
    };
    match exp {
        Expr::Cst { .. }
        | Expr::Var { .. }
        | Expr::Def { .. }
        | Expr::Sig { .. }
        | Expr::RecordEmpty { .. }
        | Expr::Unsupported { .. } => {}
        Expr::Lambda { fparam, body, .. } => {
            if let Some(tpe) = &fparam.tpe {
                scan_tpe(tpe, bump);
            }
            scan_expr_var_ids(body, bump);
        }
        Expr::Apply { exp, args, .. } => {
            scan_expr_var_ids(exp, bump);
            for a in args {
                scan_expr_var_ids(a, bump);
            }
        }
        Expr::Let { e1, e2, .. } | Expr::Stm { e1, e2, .. } => {
            scan_expr_var_ids(e1, bump);
            scan_expr_var_ids(e2, bump);
        }
        Expr::IfThenElse { e1, e2, e3, .. } => {
            scan_expr_var_ids(e1, bump);
            scan_expr_var_ids(e2, bump);
            scan_expr_var_ids(e3, bump);
        }
        Expr::Match { scrutinee, rules, .. } => {
            scan_expr_var_ids(scrutinee, bump);
            for rule in rules {
                if let Some(g) = &rule.guard {
                    scan_expr_var_ids(g, bump);
                }
                scan_expr_var_ids(&rule.exp, bump);
            }
        }
        Expr::Tuple { elms, .. } => {
            for e in elms {
                scan_expr_var_ids(e, bump);
            }
        }
        Expr::Tag { args, .. } => {
            for a in args {
                scan_expr_var_ids(a, bump);
            }
        }
        Expr::RecordExtend { value, rest, .. } => {
            scan_expr_var_ids(value, bump);
            scan_expr_var_ids(rest, bump);
        }
        Expr::RecordSelect { exp, .. } => scan_expr_var_ids(exp, bump),
        Expr::Region { sym, body, .. } => {
            bump(sym.id.0);
            scan_expr_var_ids(body, bump);
        }
        Expr::Ascribe { exp, tpe, eff, .. } => {
            if let Some(t) = tpe {
                scan_tpe(t, bump);
            }
            if let Some(e) = eff {
                scan_tpe(e, bump);
            }
            scan_expr_var_ids(exp, bump);
        }
        Expr::Do { args, .. } => {
            for a in args {
                scan_expr_var_ids(a, bump);
            }
        }
        Expr::TryWith { exp, rules, .. } => {
            scan_expr_var_ids(exp, bump);
            for rule in rules {
                for fp in &rule.fparams {
                    if let Some(tpe) = &fp.tpe {
                        scan_tpe(tpe, bump);
                    }
                }
                scan_expr_var_ids(&rule.exp, bump);
            }
        }
        Expr::FixpointConstraintSet { cs, .. } => {
            for c in cs {
                for t in &c.head.terms {
                    scan_expr_var_ids(t, bump);
                }
            }
        }
        Expr::NativeInvoke { args, .. } => {
            for a in args {
                scan_expr_var_ids(a, bump);
            }
        }
    }
}

// ── The walker ──────────────────────────────────────────────────────────

struct Walker<'a> {
    reg: &'a Registries,
    ctx: TypingContext,
    /// Local variable types, keyed by the resolver-assigned binder id.
    env: FxHashMap<u32, Type>,
    errors: Vec<CompilationMessage>,
}

impl<'a> Walker<'a> {
    fn bind_param(&mut self, fp: &FormalParam) -> Type {
        let tpe = match &fp.tpe {
            Some(tpe) => tpe.clone(),
            None => Type::Var(self.ctx.fresh_var(Kind::Star)),
        };
        self.env.insert(fp.bnd.id, tpe.clone());
        tpe
    }

    /// Instantiate a scheme at a use site, pushing its class constraints
    /// relocated to the use site so ambiguity reports point at the call.
    fn instantiate_at(&mut self, scheme: &Scheme, loc: SourceLocation) -> Type {
        let ctx = &mut self.ctx;
        let (tpe, ccs) = instantiate(scheme, |q| ctx.fresh_var(q.kind.clone()));
        let relocated = ccs
            .into_iter()
            .map(|cc| ClassConstraint { class: cc.class, arg: cc.arg, loc })
            .collect();
        self.ctx.add_class_constraints(relocated);
        tpe
    }

    fn fresh_star(&mut self) -> Type {
        Type::Var(self.ctx.fresh_var(Kind::Star))
    }

    fn fresh_eff(&mut self) -> Type {
        Type::Var(self.ctx.fresh_var(Kind::Effect))
    }

    fn unknown_symbol(&mut self, name: &str, loc: SourceLocation) -> Type {
        self.errors.push(CompilationMessage::Type(TypeError::UnknownSymbol {
            name: name.to_string(),
            loc,
        }));
        self.fresh_star()
    }

    fn constant_type(&self, cst: &Constant, loc: SourceLocation) -> Type {
        let tc = match cst {
            Constant::Unit => TypeConstructor::Unit,
            Constant::Bool(_) => TypeConstructor::Bool,
            Constant::Char(_) => TypeConstructor::Char,
            Constant::Int8(_) => TypeConstructor::Int8,
            Constant::Int16(_) => TypeConstructor::Int16,
            Constant::Int32(_) => TypeConstructor::Int32,
            Constant::Int64(_) => TypeConstructor::Int64,
            Constant::BigInt(_) => TypeConstructor::BigInt,
            Constant::Float32(_) => TypeConstructor::Float32,
            Constant::Float64(_) => TypeConstructor::Float64,
            Constant::Str(_) => TypeConstructor::Str,
        };
        Type::Cst(tc, loc)
    }

    fn infer_exp(&mut self, exp: &Expr) -> TypedExpr {
        match exp {
            Expr::Cst { cst, loc } => TypedExpr {
                kind: TypedExprKind::Cst(cst.clone()),
                tpe: self.constant_type(cst, *loc),
                eff: Type::pure(*loc),
                loc: *loc,
            },

            Expr::Var { sym, loc } => {
                let tpe = match self.env.get(&sym.id) {
                    Some(tpe) => tpe.clone(),
                    None => self.unknown_symbol(&sym.text, *loc),
                };
                TypedExpr {
                    kind: TypedExprKind::Var(sym.clone()),
                    tpe,
                    eff: Type::pure(*loc),
                    loc: *loc,
                }
            }

            Expr::Def { sym, loc } => {
                let tpe = match self.reg.defs.get(sym) {
                    Some(scheme) => {
                        let scheme = scheme.clone();
                        self.instantiate_at(&scheme, *loc)
                    }
                    None => self.unknown_symbol(sym.name(), *loc),
                };
                TypedExpr {
                    kind: TypedExprKind::Def(sym.clone()),
                    tpe,
                    eff: Type::pure(*loc),
                    loc: *loc,
                }
            }

            Expr::Sig { sym, loc } => {
                let tpe = match self.reg.sigs.get(sym) {
                    Some(scheme) => {
                        let scheme = scheme.clone();
                        self.instantiate_at(&scheme, *loc)
                    }
                    None => self.unknown_symbol(sym.name(), *loc),
                };
                TypedExpr {
                    kind: TypedExprKind::Sig(sym.clone()),
                    tpe,
                    eff: Type::pure(*loc),
                    loc: *loc,
                }
            }

            Expr::Lambda { fparam, body, loc } => {
                let param_tpe = self.bind_param(fparam);
                let body = self.infer_exp(body);
                let tpe = Type::arrow(
                    vec![param_tpe.clone()],
                    body.eff.clone(),
                    body.tpe.clone(),
                    *loc,
                );
                TypedExpr {
                    kind: TypedExprKind::Lambda {
                        bnd: fparam.bnd.clone(),
                        bnd_tpe: param_tpe,
                        body: Box::new(body),
                    },
                    tpe,
                    eff: Type::pure(*loc),
                    loc: *loc,
                }
            }

            Expr::Apply { exp, args, loc } => self.infer_apply(exp, args, *loc),

            Expr::Let { bnd, e1, e2, loc } => {
                let t1 = self.infer_exp(e1);
                self.env.insert(bnd.id, t1.tpe.clone());
                let t2 = self.infer_exp(e2);
                let eff = Type::union(t1.eff.clone(), t2.eff.clone(), *loc);
                let tpe = t2.tpe.clone();
                TypedExpr {
                    kind: TypedExprKind::Let {
                        bnd: bnd.clone(),
                        e1: Box::new(t1),
                        e2: Box::new(t2),
                    },
                    tpe,
                    eff,
                    loc: *loc,
                }
            }

            Expr::IfThenElse { e1, e2, e3, loc } => {
                let t1 = self.infer_exp(e1);
                let t2 = self.infer_exp(e2);
                let t3 = self.infer_exp(e3);
                self.ctx.expect_type(Type::bool(t1.loc), t1.tpe.clone(), t1.loc);
                self.ctx.unify_type(t2.tpe.clone(), t3.tpe.clone(), *loc);
                let tpe = t2.tpe.clone();
                let eff = Type::union_all(
                    [t1.eff.clone(), t2.eff.clone(), t3.eff.clone()],
                    *loc,
                );
                TypedExpr {
                    kind: TypedExprKind::IfThenElse {
                        e1: Box::new(t1),
                        e2: Box::new(t2),
                        e3: Box::new(t3),
                    },
                    tpe,
                    eff,
                    loc: *loc,
                }
            }

            Expr::Stm { e1, e2, loc } => {
                let t1 = self.infer_exp(e1);
                let t2 = self.infer_exp(e2);
                let tpe = t2.tpe.clone();
                let eff = Type::union(t1.eff.clone(), t2.eff.clone(), *loc);
                TypedExpr {
                    kind: TypedExprKind::Stm { e1: Box::new(t1), e2: Box::new(t2) },
                    tpe,
                    eff,
                    loc: *loc,
                }
            }

            Expr::Match { scrutinee, rules, loc } => self.infer_match(scrutinee, rules, *loc),

            Expr::Tuple { elms, loc } => {
                let telms: Vec<TypedExpr> = elms.iter().map(|e| self.infer_exp(e)).collect();
                let tpe = Type::tuple(telms.iter().map(|t| t.tpe.clone()).collect(), *loc);
                let eff = Type::union_all(telms.iter().map(|t| t.eff.clone()), *loc);
                TypedExpr { kind: TypedExprKind::Tuple(telms), tpe, eff, loc: *loc }
            }

            Expr::Tag { sym, args, loc } => {
                let targs: Vec<TypedExpr> = args.iter().map(|a| self.infer_exp(a)).collect();
                let tpe = match self.reg.cases.get(sym).cloned() {
                    Some(case) => {
                        let scheme = Scheme {
                            quantifiers: case.quantifiers.clone(),
                            constraints: Vec::new(),
                            base: Type::tuple(
                                case.tpes
                                    .iter()
                                    .cloned()
                                    .chain(std::iter::once(case.enum_tpe.clone()))
                                    .collect(),
                                *loc,
                            ),
                        };
                        let inst = self.instantiate_at(&scheme, *loc);
                        let (_, parts) = inst.head_and_args();
                        let (field_tpes, enum_tpe) =
                            parts.split_at(parts.len().saturating_sub(1));
                        self.ctx.expect_type_arguments(
                            sym.name(),
                            field_tpes.iter().map(|t| (*t).clone()).collect(),
                            targs.iter().map(|t| t.tpe.clone()).collect(),
                            targs.iter().map(|t| t.loc).collect(),
                        );
                        enum_tpe
                            .first()
                            .map(|t| (*t).clone())
                            .unwrap_or_else(|| self.fresh_star())
                    }
                    None => self.unknown_symbol(sym.name(), *loc),
                };
                let eff = Type::union_all(targs.iter().map(|t| t.eff.clone()), *loc);
                TypedExpr {
                    kind: TypedExprKind::Tag { sym: sym.clone(), args: targs },
                    tpe,
                    eff,
                    loc: *loc,
                }
            }

            Expr::RecordEmpty { loc } => TypedExpr {
                kind: TypedExprKind::RecordEmpty,
                tpe: Type::Cst(TypeConstructor::RecordRowEmpty, *loc),
                eff: Type::pure(*loc),
                loc: *loc,
            },

            Expr::RecordExtend { label, value, rest, loc } => {
                let tvalue = self.infer_exp(value);
                let trest = self.infer_exp(rest);
                let row = Type::Var(self.ctx.fresh_var(Kind::Record));
                self.ctx.unify_type(trest.tpe.clone(), row.clone(), trest.loc);
                let tpe = Type::record_extend(label.clone(), tvalue.tpe.clone(), row, *loc);
                let eff = Type::union(tvalue.eff.clone(), trest.eff.clone(), *loc);
                TypedExpr {
                    kind: TypedExprKind::RecordExtend {
                        label: label.clone(),
                        value: Box::new(tvalue),
                        rest: Box::new(trest),
                    },
                    tpe,
                    eff,
                    loc: *loc,
                }
            }

            Expr::RecordSelect { exp, label, loc } => {
                let texp = self.infer_exp(exp);
                let field = self.fresh_star();
                let tail = Type::Var(self.ctx.fresh_var(Kind::Record));
                let expected = Type::record_extend(label.clone(), field.clone(), tail, *loc);
                self.ctx.unify_type(texp.tpe.clone(), expected, *loc);
                let eff = texp.eff.clone();
                TypedExpr {
                    kind: TypedExprKind::RecordSelect { exp: Box::new(texp), label: label.clone() },
                    tpe: field,
                    eff,
                    loc: *loc,
                }
            }

            Expr::Region { sym, bnd, body, loc } => {
                // The external effect variable lives at the outer level.
                let external = self.fresh_eff();
                self.ctx.enter_region(sym.clone());
                // The handle ties uses of the region to its effect variable.
                let handle = crate::builtins::region_handle_type(Type::Var(sym.clone()), *loc);
                self.env.insert(bnd.id, handle);
                let tbody = self.infer_exp(body);
                self.ctx.exit_region(external.clone(), tbody.eff.clone(), *loc);
                let tpe = tbody.tpe.clone();
                TypedExpr {
                    kind: TypedExprKind::Region {
                        sym: sym.clone(),
                        bnd: bnd.clone(),
                        body: Box::new(tbody),
                    },
                    tpe,
                    eff: external,
                    loc: *loc,
                }
            }

            Expr::Ascribe { exp, tpe, eff, loc } => {
                let texp = self.infer_exp(exp);
                let result_tpe = match tpe {
                    Some(expected) => {
                        self.ctx.expect_type(expected.clone(), texp.tpe.clone(), *loc);
                        expected.clone()
                    }
                    None => texp.tpe.clone(),
                };
                let result_eff = match eff {
                    Some(expected) => {
                        self.ctx.expect_type(expected.clone(), texp.eff.clone(), *loc);
                        expected.clone()
                    }
                    None => texp.eff.clone(),
                };
                TypedExpr {
                    kind: TypedExprKind::Ascribe { exp: Box::new(texp) },
                    tpe: result_tpe,
                    eff: result_eff,
                    loc: *loc,
                }
            }

            Expr::Do { op, args, loc } => {
                let targs: Vec<TypedExpr> = args.iter().map(|a| self.infer_exp(a)).collect();
                let (tpe, op_eff) = match self.reg.ops.get(op).cloned() {
                    Some(decl) => {
                        let params: Vec<Type> = decl
                            .spec
                            .fparams
                            .iter()
                            .map(|fp| {
                                fp.tpe.clone().unwrap_or_else(|| {
                                    Type::Var(self.ctx.fresh_var(Kind::Star))
                                })
                            })
                            .collect();
                        self.ctx.expect_type_arguments(
                            op.name(),
                            params,
                            targs.iter().map(|t| t.tpe.clone()).collect(),
                            targs.iter().map(|t| t.loc).collect(),
                        );
                        (decl.spec.ret_tpe.clone(), Type::effect(decl.effect.clone(), *loc))
                    }
                    None => (self.unknown_symbol(op.name(), *loc), Type::pure(*loc)),
                };
                let eff = Type::union(
                    Type::union_all(targs.iter().map(|t| t.eff.clone()), *loc),
                    op_eff,
                    *loc,
                );
                TypedExpr {
                    kind: TypedExprKind::Do { op: op.clone(), args: targs },
                    tpe,
                    eff,
                    loc: *loc,
                }
            }

            Expr::TryWith { exp, effect, rules, loc } => {
                let tbody = self.infer_exp(exp);
                let mut trules = Vec::new();
                let mut handler_effs = Vec::new();
                for rule in rules {
                    let mut fparams = Vec::new();
                    match self.reg.ops.get(&rule.op).cloned() {
                        Some(decl) => {
                            for (fp, dp) in rule.fparams.iter().zip(&decl.spec.fparams) {
                                let tpe = fp
                                    .tpe
                                    .clone()
                                    .or_else(|| dp.tpe.clone())
                                    .unwrap_or_else(|| {
                                        Type::Var(self.ctx.fresh_var(Kind::Star))
                                    });
                                self.env.insert(fp.bnd.id, tpe.clone());
                                fparams.push((fp.bnd.clone(), tpe));
                            }
                        }
                        None => {
                            self.unknown_symbol(rule.op.name(), *loc);
                            for fp in &rule.fparams {
                                let tpe = self.bind_param(fp);
                                fparams.push((fp.bnd.clone(), tpe));
                            }
                        }
                    }
                    let texp = self.infer_exp(&rule.exp);
                    // Handler clauses produce the value of the whole
                    // expression.
                    self.ctx.unify_type(tbody.tpe.clone(), texp.tpe.clone(), texp.loc);
                    handler_effs.push(texp.eff.clone());
                    trules.push(TypedHandlerRule { op: rule.op.clone(), fparams, exp: texp });
                }
                // The handled symbol is subtracted from the body's effect;
                // the handler clauses' effects are added.
                let handled = Type::effect(effect.clone(), *loc);
                let remaining = Type::difference(tbody.eff.clone(), handled, *loc);
                let eff = Type::union(
                    remaining,
                    Type::union_all(handler_effs, *loc),
                    *loc,
                );
                let tpe = tbody.tpe.clone();
                TypedExpr {
                    kind: TypedExprKind::TryWith {
                        exp: Box::new(tbody),
                        effect: effect.clone(),
                        rules: trules,
                    },
                    tpe,
                    eff,
                    loc: *loc,
                }
            }

            Expr::FixpointConstraintSet { cs, loc } => self.infer_constraint_set(cs, *loc),

            Expr::NativeInvoke { member, args, loc } => {
                let targs: Vec<TypedExpr> = args.iter().map(|a| self.infer_exp(a)).collect();
                let inner = Type::apply(
                    Type::UnresolvedNative(member.clone(), *loc),
                    Type::tuple(targs.iter().map(|t| t.tpe.clone()).collect(), *loc),
                    *loc,
                );
                let tpe = Type::NativeToType(Box::new(inner.clone()), *loc);
                let eff = Type::union(
                    Type::union_all(targs.iter().map(|t| t.eff.clone()), *loc),
                    Type::NativeToEff(Box::new(inner), *loc),
                    *loc,
                );
                TypedExpr {
                    kind: TypedExprKind::NativeInvoke { member: member.clone(), args: targs },
                    tpe,
                    eff,
                    loc: *loc,
                }
            }

            Expr::Unsupported { name, loc } => {
                self.errors.push(CompilationMessage::Type(TypeError::UnsupportedConstruct {
                    name: name.clone(),
                    loc: *loc,
                }));
                let tpe = self.fresh_star();
                TypedExpr {
                    kind: TypedExprKind::Unsupported(name.clone()),
                    tpe,
                    eff: Type::pure(*loc),
                    loc: *loc,
                }
            }
        }
    }

    /// Application. Calls to named symbols check arguments positionally so
    /// mismatches point at the offending argument; everything else goes
    /// through the generic arrow constraint.
    fn infer_apply(&mut self, exp: &Expr, args: &[Expr], loc: SourceLocation) -> TypedExpr {
        let tcallee = self.infer_exp(exp);
        let targs: Vec<TypedExpr> = args.iter().map(|a| self.infer_exp(a)).collect();

        let callee_name = match exp {
            Expr::Def { sym, .. } => Some(sym.name().to_string()),
            Expr::Sig { sym, .. } => Some(sym.name().to_string()),
            _ => None,
        };

        if let (Some(name), Some((params, eff, result))) =
            (callee_name, tcallee.tpe.arrow_parts())
        {
            if params.len() == targs.len() {
                let params: Vec<Type> = params.into_iter().cloned().collect();
                let eff = eff.clone();
                let result = result.clone();
                self.ctx.expect_type_arguments(
                    &name,
                    params,
                    targs.iter().map(|t| t.tpe.clone()).collect(),
                    targs.iter().map(|t| t.loc).collect(),
                );
                let total_eff = Type::union(
                    Type::union_all(targs.iter().map(|t| t.eff.clone()), loc),
                    eff,
                    loc,
                );
                return TypedExpr {
                    kind: TypedExprKind::Apply { exp: Box::new(tcallee), args: targs },
                    tpe: result,
                    eff: total_eff,
                    loc,
                };
            }
        }

        let result = self.fresh_star();
        let lambda_eff = self.fresh_eff();
        let expected = Type::arrow(
            targs.iter().map(|t| t.tpe.clone()).collect(),
            lambda_eff.clone(),
            result.clone(),
            loc,
        );
        self.ctx.unify_type(tcallee.tpe.clone(), expected, loc);
        let eff = Type::union_all(
            std::iter::once(tcallee.eff.clone())
                .chain(targs.iter().map(|t| t.eff.clone()))
                .chain(std::iter::once(lambda_eff)),
            loc,
        );
        TypedExpr {
            kind: TypedExprKind::Apply { exp: Box::new(tcallee), args: targs },
            tpe: result,
            eff,
            loc,
        }
    }

    fn infer_match(&mut self, scrutinee: &Expr, rules: &[MatchRule], loc: SourceLocation) -> TypedExpr {
        let tscrutinee = self.infer_exp(scrutinee);
        let result = self.fresh_star();
        let mut effs = vec![tscrutinee.eff.clone()];
        let mut trules = Vec::new();
        for rule in rules {
            let tpat = self.infer_pattern(&rule.pat);
            self.ctx.unify_type_with(
                tscrutinee.tpe.clone(),
                tpat.tpe.clone(),
                Provenance::Match { loc: tpat.loc },
            );
            let tguard = rule.guard.as_ref().map(|g| {
                let tg = self.infer_exp(g);
                self.ctx.expect_type(Type::bool(tg.loc), tg.tpe.clone(), tg.loc);
                tg
            });
            let texp = self.infer_exp(&rule.exp);
            self.ctx.unify_type(result.clone(), texp.tpe.clone(), texp.loc);
            if let Some(tg) = &tguard {
                effs.push(tg.eff.clone());
            }
            effs.push(texp.eff.clone());
            trules.push(TypedMatchRule { pat: tpat, guard: tguard, exp: texp });
        }
        let eff = Type::union_all(effs, loc);
        TypedExpr {
            kind: TypedExprKind::Match { scrutinee: Box::new(tscrutinee), rules: trules },
            tpe: result,
            eff,
            loc,
        }
    }

    fn infer_pattern(&mut self, pat: &Pattern) -> TypedPattern {
        match pat {
            Pattern::Wildcard { loc } => TypedPattern {
                kind: TypedPatternKind::Wildcard,
                tpe: self.fresh_star(),
                loc: *loc,
            },
            Pattern::Var { sym, loc } => {
                let tpe = self.fresh_star();
                self.env.insert(sym.id, tpe.clone());
                TypedPattern { kind: TypedPatternKind::Var(sym.clone()), tpe, loc: *loc }
            }
            Pattern::Cst { cst, loc } => TypedPattern {
                kind: TypedPatternKind::Cst(cst.clone()),
                tpe: self.constant_type(cst, *loc),
                loc: *loc,
            },
            Pattern::Tag { sym, pats, loc } => {
                let tpats: Vec<TypedPattern> =
                    pats.iter().map(|p| self.infer_pattern(p)).collect();
                let tpe = match self.reg.cases.get(sym).cloned() {
                    Some(case) => {
                        let scheme = Scheme {
                            quantifiers: case.quantifiers.clone(),
                            constraints: Vec::new(),
                            base: Type::tuple(
                                case.tpes
                                    .iter()
                                    .cloned()
                                    .chain(std::iter::once(case.enum_tpe.clone()))
                                    .collect(),
                                *loc,
                            ),
                        };
                        let ctx = &mut self.ctx;
                        let (inst, _) = instantiate(&scheme, |q| ctx.fresh_var(q.kind.clone()));
                        let (_, parts) = inst.head_and_args();
                        let (field_tpes, enum_tpe) =
                            parts.split_at(parts.len().saturating_sub(1));
                        for (tp, expected) in tpats.iter().zip(field_tpes) {
                            self.ctx.unify_type_with(
                                (*expected).clone(),
                                tp.tpe.clone(),
                                Provenance::Match { loc: tp.loc },
                            );
                        }
                        enum_tpe
                            .first()
                            .map(|t| (*t).clone())
                            .unwrap_or_else(|| self.fresh_star())
                    }
                    None => self.unknown_symbol(sym.name(), *loc),
                };
                TypedPattern {
                    kind: TypedPatternKind::Tag { sym: sym.clone(), pats: tpats },
                    tpe,
                    loc: *loc,
                }
            }
            Pattern::Tuple { elms, loc } => {
                let telms: Vec<TypedPattern> =
                    elms.iter().map(|p| self.infer_pattern(p)).collect();
                let tpe = Type::tuple(telms.iter().map(|t| t.tpe.clone()).collect(), *loc);
                TypedPattern { kind: TypedPatternKind::Tuple(telms), tpe, loc: *loc }
            }
        }
    }

    /// Datalog constraint sets: every predicate gets one type per set,
    /// unified positionally across all of its atoms; the set's type is a
    /// schema row over the predicates; the whole expression is pure (head
    /// terms are required to be pure).
    fn infer_constraint_set(&mut self, cs: &[FixpointConstraint], loc: SourceLocation) -> TypedExpr {
        let mut pred_tpes: FxHashMap<rill_common::PredSym, Type> = FxHashMap::default();
        let mut tcs = Vec::new();
        for c in cs {
            // Body atoms bind the variables the head mentions.
            let body: Vec<TypedBodyAtom> = c
                .body
                .iter()
                .map(|b| self.infer_body_atom(b, &mut pred_tpes))
                .collect();
            let head = self.infer_head_atom(&c.head, &mut pred_tpes);
            tcs.push(TypedFixpointConstraint { head, body, loc: c.loc });
        }
        // The set's type: a schema row over the predicates, kept open so
        // separate constraint sets can be composed.
        let mut preds: Vec<_> = pred_tpes.into_iter().collect();
        preds.sort_by(|(a, _), (b, _)| a.cmp(b));
        let tail = Type::Var(self.ctx.fresh_var(Kind::Schema));
        let tpe = preds.into_iter().rev().fold(tail, |rest, (pred, ptpe)| {
            Type::schema_extend(pred, ptpe, rest, loc)
        });
        TypedExpr {
            kind: TypedExprKind::FixpointConstraintSet(tcs),
            tpe,
            eff: Type::pure(loc),
            loc,
        }
    }

    fn pred_type(
        &mut self,
        pred: &rill_common::PredSym,
        den: Denotation,
        terms: Vec<Type>,
        loc: SourceLocation,
        pred_tpes: &mut FxHashMap<rill_common::PredSym, Type>,
    ) -> Type {
        let ctor = match den {
            Denotation::Relational => TypeConstructor::Relation,
            Denotation::Latticenal => TypeConstructor::Lattice,
        };
        let this = Type::apply(Type::Cst(ctor, loc), Type::tuple(terms, loc), loc);
        match pred_tpes.get(pred) {
            Some(existing) => {
                self.ctx.unify_type(existing.clone(), this.clone(), loc);
                existing.clone()
            }
            None => {
                pred_tpes.insert(pred.clone(), this.clone());
                this
            }
        }
    }

    fn infer_head_atom(
        &mut self,
        atom: &HeadAtom,
        pred_tpes: &mut FxHashMap<rill_common::PredSym, Type>,
    ) -> TypedHeadAtom {
        let terms: Vec<TypedExpr> = atom.terms.iter().map(|t| self.infer_exp(t)).collect();
        for t in &terms {
            self.ctx.expect_type(Type::pure(t.loc), t.eff.clone(), t.loc);
        }
        self.pred_type(
            &atom.pred,
            atom.den,
            terms.iter().map(|t| t.tpe.clone()).collect(),
            atom.loc,
            pred_tpes,
        );
        TypedHeadAtom { pred: atom.pred.clone(), den: atom.den, terms, loc: atom.loc }
    }

    fn infer_body_atom(
        &mut self,
        atom: &BodyAtom,
        pred_tpes: &mut FxHashMap<rill_common::PredSym, Type>,
    ) -> TypedBodyAtom {
        let terms: Vec<TypedPattern> =
            atom.terms.iter().map(|p| self.infer_pattern(p)).collect();
        self.pred_type(
            &atom.pred,
            atom.den,
            terms.iter().map(|t| t.tpe.clone()).collect(),
            atom.loc,
            pred_tpes,
        );
        TypedBodyAtom {
            pred: atom.pred.clone(),
            den: atom.den,
            polarity: atom.polarity,
            terms,
            loc: atom.loc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_common::{DefSym, SourceId, Span, VarSym};
    use rill_types::{Level, TypeVarSym, VarId};

    fn loc() -> SourceLocation {
        SourceLocation::new(SourceId(0), Span::new(0, 0))
    }

    fn mono_spec(params: Vec<(u32, &str, Type)>, ret: Type, eff: Type) -> DefSpec {
        DefSpec {
            quantifiers: Vec::new(),
            constraints: Vec::new(),
            fparams: params
                .into_iter()
                .map(|(id, name, tpe)| FormalParam {
                    bnd: VarSym::new(id, name),
                    tpe: Some(tpe),
                    loc: loc(),
                })
                .collect(),
            ret_tpe: ret,
            eff,
        }
    }

    #[test]
    fn literal_is_pure() {
        let reg = Registries::default();
        let spec = mono_spec(Vec::new(), Type::int32(loc()), Type::pure(loc()));
        let exp = Expr::Cst { cst: Constant::Int32(42), loc: loc() };
        let inference = infer_spec_exp(&spec, &exp, loc(), &reg);
        assert_eq!(inference.exp.tpe, Type::int32(loc()));
        assert_eq!(inference.exp.eff, Type::pure(loc()));
        assert!(inference.errors.is_empty());
        // The declared-type and declared-effect expectations.
        assert_eq!(inference.constraints.len(), 2);
    }

    #[test]
    fn identity_def_types_its_parameter() {
        let reg = Registries::default();
        let a = TypeVarSym::with_text(VarId(0), Kind::Star, Level::TOP, "a");
        let spec = DefSpec {
            quantifiers: vec![a.clone()],
            constraints: Vec::new(),
            fparams: vec![FormalParam {
                bnd: VarSym::new(0, "x"),
                tpe: Some(Type::Var(a.clone())),
                loc: loc(),
            }],
            ret_tpe: Type::Var(a.clone()),
            eff: Type::pure(loc()),
        };
        let exp = Expr::Var { sym: VarSym::new(0, "x"), loc: loc() };
        let inference = infer_spec_exp(&spec, &exp, loc(), &reg);
        assert!(inference.renv.is_rigid(a.id));
        assert_eq!(inference.exp.tpe, Type::Var(a));
        // Fresh variables start above the quantifier's id.
        let mut supply = inference.supply;
        assert!(supply.fresh(Kind::Star, Level::TOP).id.0 >= 1);
    }

    #[test]
    fn unknown_def_is_reported_and_recovered() {
        let reg = Registries::default();
        let spec = mono_spec(Vec::new(), Type::int32(loc()), Type::pure(loc()));
        let exp = Expr::Def { sym: DefSym::new("Missing.def"), loc: loc() };
        let inference = infer_spec_exp(&spec, &exp, loc(), &reg);
        assert_eq!(inference.errors.len(), 1);
    }

    #[test]
    fn unsupported_construct_is_flagged() {
        let reg = Registries::default();
        let spec = mono_spec(Vec::new(), Type::int32(loc()), Type::pure(loc()));
        let exp = Expr::Unsupported { name: "VectorStore".to_string(), loc: loc() };
        let inference = infer_spec_exp(&spec, &exp, loc(), &reg);
        match &inference.errors[0] {
            CompilationMessage::Type(TypeError::UnsupportedConstruct { name, .. }) => {
                assert_eq!(name, "VectorStore");
            }
            other => panic!("expected UnsupportedConstruct, got {:?}", other),
        }
    }

    #[test]
    fn region_emits_purification_and_external_effect() {
        let reg = Registries::default();
        let spec = mono_spec(Vec::new(), Type::unit(loc()), Type::pure(loc()));
        let region_var = TypeVarSym::with_text(VarId(0), Kind::Effect, Level::TOP, "r");
        let body = Expr::Ascribe {
            exp: Box::new(Expr::Cst { cst: Constant::Unit, loc: loc() }),
            tpe: None,
            eff: Some(Type::Var(region_var.clone())),
            loc: loc(),
        };
        let exp = Expr::Region {
            sym: region_var.clone(),
            bnd: VarSym::new(9, "rc"),
            body: Box::new(body),
            loc: loc(),
        };
        let inference = infer_spec_exp(&spec, &exp, loc(), &reg);
        assert!(inference.renv.is_rigid(region_var.id));
        let purifications: Vec<_> = inference
            .constraints
            .iter()
            .filter(|c| matches!(c, TypingConstraint::Purification { .. }))
            .collect();
        assert_eq!(purifications.len(), 1);
    }
}
