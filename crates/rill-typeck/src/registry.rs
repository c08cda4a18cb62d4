//! Read-only environments built once per compilation from the resolved AST.
//!
//! The class, instance, equality (associated type), and native environments
//! are shared immutably across all workers. Instance well-formedness is
//! checked here before any definition is solved; entailment of class
//! constraints against the instance environment also lives here.

use rustc_hash::{FxHashMap, FxHashSet};

use rill_common::{AssocTypeSym, CaseSym, ClassSym, DefSym, NativeMemberSym, OpSym, SigSym};
use rill_types::{ClassConstraint, Scheme, Type, TypeConstructor, TypeVarSym, VarId};

use rill_ast::resolved::{
    AssocTypeClause, Class, Instance, NativeSignature, OpDecl, Root, Sig,
};

use crate::error::InstanceError;
use crate::subst::Substitution;

/// Information needed to instantiate an enum case at a use site.
#[derive(Debug, Clone)]
pub struct CaseInfo {
    pub sym: CaseSym,
    pub quantifiers: Vec<TypeVarSym>,
    /// Field types, mentioning the quantifiers.
    pub tpes: Vec<Type>,
    /// The enum type applied to the quantifiers.
    pub enum_tpe: Type,
}

/// The per-compilation environments.
#[derive(Debug, Default)]
pub struct Registries {
    pub classes: FxHashMap<ClassSym, Class>,
    pub instances: FxHashMap<ClassSym, Vec<Instance>>,
    /// Definitional clauses per associated type symbol.
    pub eq_env: FxHashMap<AssocTypeSym, Vec<AssocTypeClause>>,
    pub natives: FxHashMap<NativeMemberSym, NativeSignature>,
    /// Schemes of top-level definitions.
    pub defs: FxHashMap<DefSym, Scheme>,
    /// Schemes of class signatures, with the implicit class constraint on
    /// the class quantifier included.
    pub sigs: FxHashMap<SigSym, Scheme>,
    pub sig_classes: FxHashMap<SigSym, ClassSym>,
    pub ops: FxHashMap<OpSym, OpDecl>,
    pub cases: FxHashMap<CaseSym, CaseInfo>,
}

impl Registries {
    /// Build all environments from a resolved root.
    pub fn from_root(root: &Root) -> Self {
        let mut reg = Registries::default();

        for (sym, def) in &root.defs {
            reg.defs.insert(sym.clone(), spec_to_scheme(&def.spec, None));
        }

        for (sym, class) in &root.classes {
            reg.classes.insert(sym.clone(), class.clone());
            for sig in &class.sigs {
                reg.sigs.insert(sig.sym.clone(), sig_to_scheme(class, sig));
                reg.sig_classes.insert(sig.sym.clone(), sym.clone());
            }
        }

        for (class_sym, instances) in &root.instances {
            reg.instances.insert(class_sym.clone(), instances.clone());
            for inst in instances {
                for clause in &inst.assoc_defs {
                    reg.eq_env.entry(clause.sym.clone()).or_default().push(clause.clone());
                }
                // Associated types with a declared default get an implicit
                // clause for every instance that gives none.
                if let Some(class) = root.classes.get(class_sym) {
                    for decl in &class.assoc_types {
                        let given = inst.assoc_defs.iter().any(|c| c.sym == decl.sym);
                        if !given {
                            if let Some(default) = &decl.default {
                                reg.eq_env.entry(decl.sym.clone()).or_default().push(
                                    AssocTypeClause {
                                        sym: decl.sym.clone(),
                                        arg: inst.tpe.clone(),
                                        ret: default.clone(),
                                        loc: inst.loc,
                                    },
                                );
                            }
                        }
                    }
                }
            }
        }

        for effect in root.effects.values() {
            for op in &effect.ops {
                reg.ops.insert(op.sym.clone(), op.clone());
            }
        }

        for (enum_sym, decl) in &root.enums {
            let head = Type::Cst(
                TypeConstructor::Enum(enum_sym.clone(), decl_kind(decl)),
                decl.loc,
            );
            let enum_tpe = Type::apply_all(
                head,
                decl.quantifiers.iter().map(|q| Type::Var(q.clone())),
                decl.loc,
            );
            for case in &decl.cases {
                reg.cases.insert(
                    case.sym.clone(),
                    CaseInfo {
                        sym: case.sym.clone(),
                        quantifiers: decl.quantifiers.clone(),
                        tpes: case.tpes.clone(),
                        enum_tpe: enum_tpe.clone(),
                    },
                );
            }
        }

        reg.natives = root.natives.clone();
        reg
    }

    /// All clauses for an associated type.
    pub fn assoc_clauses(&self, sym: &AssocTypeSym) -> &[AssocTypeClause] {
        self.eq_env.get(sym).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn decl_kind(decl: &rill_ast::resolved::Enum) -> rill_types::Kind {
    rill_types::Kind::arrow_chain(
        decl.quantifiers.iter().map(|q| q.kind.clone()),
        rill_types::Kind::Star,
    )
}

/// Turn a declared spec into a scheme. The extra constraint, when present,
/// is the implicit class membership of a signature's class quantifier.
fn spec_to_scheme(spec: &rill_ast::resolved::DefSpec, extra: Option<ClassConstraint>) -> Scheme {
    let params: Vec<Type> = spec
        .fparams
        .iter()
        .map(|fp| fp.tpe.clone().expect("top-level parameters are annotated"))
        .collect();
    let base = Type::arrow(params, spec.eff.clone(), spec.ret_tpe.clone(), spec_loc(spec));
    let mut constraints = spec.constraints.clone();
    if let Some(cc) = extra {
        constraints.insert(0, cc);
    }
    Scheme { quantifiers: spec.quantifiers.clone(), constraints, base }
}

fn spec_loc(spec: &rill_ast::resolved::DefSpec) -> rill_common::SourceLocation {
    spec.fparams
        .first()
        .map(|fp| fp.loc)
        .unwrap_or_else(|| spec.ret_tpe.loc())
}

fn sig_to_scheme(class: &Class, sig: &Sig) -> Scheme {
    let implicit = ClassConstraint {
        class: class.sym.clone(),
        arg: Type::Var(class.quantifier.clone()),
        loc: sig.loc,
    };
    let mut scheme = spec_to_scheme(&sig.spec, Some(implicit));
    scheme.quantifiers.insert(0, class.quantifier.clone());
    scheme
}

// ── Instantiation ───────────────────────────────────────────────────────

/// Instantiate a scheme with fresh flexible variables, returning the
/// instantiated type and the instantiated class constraints.
pub fn instantiate(
    scheme: &Scheme,
    mut fresh: impl FnMut(&TypeVarSym) -> TypeVarSym,
) -> (Type, Vec<ClassConstraint>) {
    if scheme.quantifiers.is_empty() {
        return (scheme.base.clone(), scheme.constraints.clone());
    }
    let mut subst = Substitution::empty();
    for q in &scheme.quantifiers {
        let f = fresh(q);
        subst.extend(q.id, Type::Var(f));
    }
    let tpe = subst.apply(&scheme.base);
    let ccs = scheme.constraints.iter().map(|cc| subst.apply_class_constraint(cc)).collect();
    (tpe, ccs)
}

// ── One-way matching ────────────────────────────────────────────────────

/// Match a pattern type (instance head or associated-type clause argument)
/// against a target, binding the pattern's variables. One-way: variables in
/// the target never bind.
pub fn match_type(pattern: &Type, target: &Type) -> Option<Substitution> {
    let mut subst = Substitution::empty();
    if match_into(pattern, target, &mut subst) {
        Some(subst)
    } else {
        None
    }
}

fn match_into(pattern: &Type, target: &Type, subst: &mut Substitution) -> bool {
    let pattern = pattern.unfold_alias();
    let target = target.unfold_alias();
    match (pattern, target) {
        (Type::Var(sym), _) => match subst.get(sym.id) {
            // Non-linear patterns require equal bindings.
            Some(bound) => bound == target,
            None => {
                subst.extend(sym.id, target.clone());
                true
            }
        },
        (Type::Cst(c1, _), Type::Cst(c2, _)) => c1 == c2,
        (Type::Apply(h1, a1, _), Type::Apply(h2, a2, _)) => {
            match_into(h1, h2, subst) && match_into(a1, a2, subst)
        }
        (Type::AssocType(s1, a1, _, _), Type::AssocType(s2, a2, _, _)) => {
            s1 == s2 && match_into(a1, a2, subst)
        }
        _ => false,
    }
}

// ── Associated type reduction ───────────────────────────────────────────

/// The outcome of one reduction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReduceOutcome {
    /// A clause matched; the reduct is returned.
    Reduced(Type),
    /// The argument still contains variables; retry once more is known.
    Blocked,
    /// The argument is ground and no clause matches.
    Irreducible,
}

/// Attempt one reduction step of `sym[arg]` against the equality
/// environment. Clause order is irrelevant: the instance checker rejects
/// overlapping instances, so at most one clause can match.
pub fn reduce_assoc(reg: &Registries, sym: &AssocTypeSym, arg: &Type) -> ReduceOutcome {
    for clause in reg.assoc_clauses(sym) {
        if let Some(subst) = match_type(&clause.arg, arg) {
            return ReduceOutcome::Reduced(subst.apply(&clause.ret));
        }
    }
    if arg.is_ground() {
        ReduceOutcome::Irreducible
    } else {
        ReduceOutcome::Blocked
    }
}

// ── Entailment ──────────────────────────────────────────────────────────

/// The outcome of entailing one class constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entailment {
    Holds,
    /// No instance exists and the argument is ground.
    Missing,
    /// The argument still contains free variables; no instance can be
    /// chosen yet.
    Ambiguous,
}

impl Registries {
    /// Whether `assumption` entails membership of `class`, directly or via
    /// the superclass closure.
    fn assumption_covers(&self, assumption: &ClassConstraint, class: &ClassSym, arg: &Type) -> bool {
        if &assumption.arg != arg {
            return false;
        }
        if &assumption.class == class {
            return true;
        }
        // Walk the superclass closure of the assumed class.
        let mut seen = FxHashSet::default();
        let mut work = vec![assumption.class.clone()];
        while let Some(current) = work.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(decl) = self.classes.get(&current) {
                for sup in &decl.super_classes {
                    if sup == class {
                        return true;
                    }
                    work.push(sup.clone());
                }
            }
        }
        false
    }

    /// Check a class constraint against the instance environment and the
    /// local assumptions (the declared constraints of the enclosing
    /// definition).
    pub fn entail(
        &self,
        class: &ClassSym,
        arg: &Type,
        assumptions: &[ClassConstraint],
    ) -> Entailment {
        for assumption in assumptions {
            if self.assumption_covers(assumption, class, arg) {
                return Entailment::Holds;
            }
        }
        // A bare variable can never select an instance.
        if matches!(arg.unfold_alias(), Type::Var(_)) {
            return Entailment::Ambiguous;
        }
        if let Some(instances) = self.instances.get(class) {
            for inst in instances {
                if let Some(subst) = match_type(&inst.tpe, arg) {
                    // Instance constraints must hold recursively.
                    let all = inst.constraints.iter().all(|cc| {
                        let applied = subst.apply_class_constraint(cc);
                        self.entail(&applied.class, &applied.arg, assumptions) == Entailment::Holds
                    });
                    if all {
                        return Entailment::Holds;
                    }
                }
            }
        }
        if arg.is_ground() {
            Entailment::Missing
        } else {
            Entailment::Ambiguous
        }
    }
}

// ── Instance well-formedness ────────────────────────────────────────────

/// The outer constructor of an instance head, if the head is simple.
fn head_constructor(tpe: &Type) -> Option<&TypeConstructor> {
    let (head, _) = tpe.unfold_alias().head_and_args();
    match head {
        Type::Cst(tc, _) => Some(tc),
        _ => None,
    }
}

/// Check every instance declaration for well-formedness.
///
/// Reports `ComplexInstanceType`, `DuplicateTypeVariableOccurrence`,
/// `OverlappingInstances`, `MissingImplementation`, `ExtraneousDefinition`,
/// and `MismatchedSignatures`.
pub fn check_instances(reg: &Registries) -> Vec<InstanceError> {
    let mut errors = Vec::new();

    for (class_sym, instances) in &reg.instances {
        // Head shape: a constructor applied to distinct variables.
        for inst in instances {
            let (head, args) = inst.tpe.unfold_alias().head_and_args();
            if !matches!(head, Type::Cst(_, _)) {
                errors.push(InstanceError::ComplexInstanceType {
                    class: class_sym.clone(),
                    tpe: inst.tpe.clone(),
                    loc: inst.loc,
                });
                continue;
            }
            let mut seen: FxHashSet<VarId> = FxHashSet::default();
            for arg in &args {
                match arg {
                    Type::Var(sym) => {
                        if !seen.insert(sym.id) {
                            errors.push(InstanceError::DuplicateTypeVariableOccurrence {
                                class: class_sym.clone(),
                                var: sym.clone(),
                                loc: inst.loc,
                            });
                        }
                    }
                    _ => {
                        errors.push(InstanceError::ComplexInstanceType {
                            class: class_sym.clone(),
                            tpe: inst.tpe.clone(),
                            loc: inst.loc,
                        });
                    }
                }
            }
        }

        // Overlap: with simple heads, two instances overlap exactly when
        // they share the outer constructor.
        for (i, inst1) in instances.iter().enumerate() {
            for inst2 in &instances[i + 1..] {
                match (head_constructor(&inst1.tpe), head_constructor(&inst2.tpe)) {
                    (Some(c1), Some(c2)) if c1 == c2 => {
                        errors.push(InstanceError::OverlappingInstances {
                            class: class_sym.clone(),
                            loc1: inst1.loc,
                            loc2: inst2.loc,
                        });
                    }
                    _ => {}
                }
            }
        }

        // Signature coverage and conformance.
        let Some(class) = reg.classes.get(class_sym) else { continue };
        for inst in instances {
            for sig in &class.sigs {
                let implemented = inst.defs.iter().find(|d| d.sym == sig.sym);
                match implemented {
                    None => {
                        if sig.exp.is_none() {
                            errors.push(InstanceError::MissingImplementation {
                                class: class_sym.clone(),
                                sig: sig.sym.clone(),
                                loc: inst.loc,
                            });
                        }
                    }
                    Some(impl_def) => {
                        let expected = expected_sig_type(reg, class, sig, inst);
                        let found = spec_to_scheme(&impl_def.spec, None).base;
                        if alpha_normalize(&expected) != alpha_normalize(&found) {
                            errors.push(InstanceError::MismatchedSignatures {
                                class: class_sym.clone(),
                                sig: sig.sym.clone(),
                                expected,
                                found,
                                loc: impl_def.loc,
                            });
                        }
                    }
                }
            }
            for impl_def in &inst.defs {
                if !class.sigs.iter().any(|s| s.sym == impl_def.sym) {
                    errors.push(InstanceError::ExtraneousDefinition {
                        class: class_sym.clone(),
                        sig: impl_def.sym.clone(),
                        loc: impl_def.loc,
                    });
                }
            }
        }
    }

    errors
}

/// The type an instance's implementation of `sig` must have: the declared
/// signature with the class quantifier replaced by the instance head and
/// the class's associated types reduced under that instance.
fn expected_sig_type(reg: &Registries, class: &Class, sig: &Sig, inst: &Instance) -> Type {
    let scheme = spec_to_scheme(&sig.spec, None);
    let subst = Substitution::singleton(class.quantifier.id, inst.tpe.clone());
    reduce_all_assoc(reg, &subst.apply(&scheme.base))
}

/// Reduce every reducible associated type in a term.
pub fn reduce_all_assoc(reg: &Registries, tpe: &Type) -> Type {
    match tpe {
        Type::AssocType(sym, arg, kind, loc) => {
            let arg = reduce_all_assoc(reg, arg);
            match reduce_assoc(reg, sym, &arg) {
                ReduceOutcome::Reduced(t) => reduce_all_assoc(reg, &t),
                _ => Type::AssocType(sym.clone(), Box::new(arg), kind.clone(), *loc),
            }
        }
        Type::Apply(h, a, loc) => Type::Apply(
            Box::new(reduce_all_assoc(reg, h)),
            Box::new(reduce_all_assoc(reg, a)),
            *loc,
        ),
        Type::Alias(sym, args, exp, loc) => Type::Alias(
            sym.clone(),
            args.clone(),
            Box::new(reduce_all_assoc(reg, exp)),
            *loc,
        ),
        other => other.clone(),
    }
}

/// Remap the variables of a term to sequential identities in order of first
/// appearance, making two alpha-equivalent terms structurally equal.
pub fn alpha_normalize(tpe: &Type) -> Type {
    let mut mapping: FxHashMap<VarId, TypeVarSym> = FxHashMap::default();
    for (i, var) in tpe.free_vars().into_iter().enumerate() {
        mapping.insert(var.id, TypeVarSym::new(VarId(i as u32), var.kind.clone(), var.level));
    }
    rename_vars(tpe, &mapping)
}

/// Simultaneous variable renaming. Unlike substitution application this
/// never chains: a renamed variable is not renamed again.
fn rename_vars(tpe: &Type, mapping: &FxHashMap<VarId, TypeVarSym>) -> Type {
    match tpe {
        Type::Var(sym) => match mapping.get(&sym.id) {
            Some(fresh) => Type::Var(fresh.clone()),
            None => tpe.clone(),
        },
        Type::Cst(_, _) | Type::UnresolvedNative(_, _) => tpe.clone(),
        Type::Apply(h, a, loc) => Type::Apply(
            Box::new(rename_vars(h, mapping)),
            Box::new(rename_vars(a, mapping)),
            *loc,
        ),
        Type::Alias(sym, args, exp, loc) => Type::Alias(
            sym.clone(),
            args.iter().map(|t| rename_vars(t, mapping)).collect(),
            Box::new(rename_vars(exp, mapping)),
            *loc,
        ),
        Type::AssocType(sym, arg, kind, loc) => Type::AssocType(
            sym.clone(),
            Box::new(rename_vars(arg, mapping)),
            kind.clone(),
            *loc,
        ),
        Type::NativeToType(t, loc) => Type::NativeToType(Box::new(rename_vars(t, mapping)), *loc),
        Type::NativeToEff(t, loc) => Type::NativeToEff(Box::new(rename_vars(t, mapping)), *loc),
    }
}
