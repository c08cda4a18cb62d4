//! Constraint-based type and effect inference for Rill.
//!
//! The front-end takes a resolved AST and produces a typed AST in which
//! every expression carries a type and an effect, every class and
//! associated-type constraint is resolved or reported, and every region is
//! purified. Effects are set-algebraic formulas; their unification runs
//! through Zhegalkin polynomials and successive variable elimination.
//!
//! # Architecture
//!
//! - [`zhegalkin`]: effect-set algebra, caches, and the SVE unifier
//! - [`effect`]: conversion between effect types and polynomials
//! - [`subst`]: explicit substitutions with composition
//! - [`constraint`]: typing constraints and provenance
//! - [`context`]: per-definition region/level/rigidity context
//! - [`registry`]: class/instance/equality/native environments
//! - [`unify`]: type unification with row and associated-type handling
//! - [`infer`]: the constraint generator
//! - [`solve`]: the solver driver
//! - [`rewrite`]: final substitution over the typed AST
//! - [`error`], [`diagnostics`]: structured messages and rendering

pub mod builtins;
pub mod constraint;
pub mod context;
pub mod diagnostics;
pub mod effect;
pub mod error;
pub mod infer;
pub mod registry;
pub mod rewrite;
pub mod solve;
pub mod subst;
pub mod unify;
pub mod zhegalkin;

use rustc_hash::FxHashMap;

use rill_ast::resolved::{Def, DefSpec, Expr, Root};
use rill_ast::typed::{TypedDef, TypedRoot};
use rill_common::{DefSym, SourceLocation};
use rill_types::ClassConstraint;

use crate::diagnostics::finalize_messages;
use crate::error::{CompilationMessage, TypeError};
use crate::registry::Registries;
use crate::solve::{Budget, SolveOutcome};
use crate::zhegalkin::ZhegalkinCache;

/// The result of checking one definition.
#[derive(Debug)]
pub struct DefResult {
    pub def: TypedDef,
    pub messages: Vec<CompilationMessage>,
    /// Solver iterations, for statistics.
    pub iterations: u64,
}

/// Type-check one definition end to end: generate constraints, solve them,
/// and rewrite the body under the final substitution.
pub fn check_def(
    def: &Def,
    reg: &Registries,
    cache: &ZhegalkinCache,
    budget: &Budget,
) -> DefResult {
    check_spec_exp(def.sym.clone(), &def.spec, &def.exp, def.loc, reg, cache, budget)
}

/// Type-check any spec/body pair under a definition symbol. Used for
/// top-level definitions, instance method bodies, and signature defaults.
pub fn check_spec_exp(
    sym: DefSym,
    spec: &DefSpec,
    exp: &Expr,
    loc: SourceLocation,
    reg: &Registries,
    cache: &ZhegalkinCache,
    budget: &Budget,
) -> DefResult {
    let inference = infer::infer_spec_exp(spec, exp, loc, reg);
    let mut messages = inference.errors;

    let SolveOutcome { subst, errors, iterations, timed_out } = solve::solve_constraints(
        inference.constraints,
        &inference.renv,
        inference.supply,
        &inference.assumptions,
        reg,
        cache,
        budget,
    );
    messages.extend(errors);
    if timed_out {
        messages.push(CompilationMessage::Type(TypeError::Timeout {
            def: sym.name().to_string(),
            loc,
        }));
    }

    let exp = rewrite::rewrite_exp(&inference.exp, &subst, reg, cache);
    let def = TypedDef {
        sym,
        spec: spec.clone(),
        tpe: subst.apply(&inference.def_tpe),
        eff: rewrite::finalize(&inference.def_eff, &subst, reg, cache),
        exp,
        loc,
    };
    DefResult { def, messages, iterations }
}

/// The result of checking a whole compilation unit.
#[derive(Debug)]
pub struct CheckResult {
    pub root: TypedRoot,
    pub messages: Vec<CompilationMessage>,
    pub iterations: u64,
}

impl CheckResult {
    pub fn has_errors(&self) -> bool {
        !self.messages.is_empty()
    }
}

/// Collect every checkable (symbol, spec, body) triple of a root: the
/// top-level definitions, instance method bodies under their qualified
/// names, and class signature defaults.
pub fn checkable_defs(root: &Root) -> Vec<(DefSym, DefSpec, Expr, SourceLocation)> {
    let mut work: Vec<(DefSym, DefSpec, Expr, SourceLocation)> = Vec::new();
    for (sym, def) in &root.defs {
        work.push((sym.clone(), def.spec.clone(), def.exp.clone(), def.loc));
    }
    for (class_sym, instances) in &root.instances {
        for inst in instances {
            for idef in &inst.defs {
                let qualified = DefSym::new(format!("{}.{}${}", class_sym, idef.sym, inst.tpe));
                work.push((qualified, idef.spec.clone(), idef.exp.clone(), idef.loc));
            }
        }
    }
    for class in root.classes.values() {
        for sig in &class.sigs {
            if let Some(default) = &sig.exp {
                // The default body is checked with the class quantifier
                // rigid and the class constraint assumed.
                let mut spec = sig.spec.clone();
                spec.quantifiers.insert(0, class.quantifier.clone());
                spec.constraints.insert(
                    0,
                    ClassConstraint {
                        class: class.sym.clone(),
                        arg: rill_types::Type::Var(class.quantifier.clone()),
                        loc: sig.loc,
                    },
                );
                let qualified = DefSym::new(format!("{}.{}$default", class.sym, sig.sym));
                work.push((qualified, spec, default.clone(), sig.loc));
            }
        }
    }
    // Deterministic processing order regardless of map iteration.
    work.sort_by(|a, b| a.0.cmp(&b.0));
    work
}

/// Sequentially type-check a whole resolved root with the given standard
/// library seeded.
///
/// The parallel driver in `rillc` partitions the same work across workers;
/// this entry point is the single-threaded reference used by tests.
pub fn check_root(
    root: &Root,
    lib: builtins::StdLib,
    cache: &ZhegalkinCache,
    budget: &Budget,
) -> CheckResult {
    let mut reg = Registries::from_root(root);
    builtins::register(&mut reg, lib);
    let mut messages: Vec<CompilationMessage> = registry::check_instances(&reg)
        .into_iter()
        .map(CompilationMessage::Instance)
        .collect();

    let mut defs: FxHashMap<DefSym, TypedDef> = FxHashMap::default();
    let mut iterations = 0;
    for (sym, spec, exp, loc) in checkable_defs(root) {
        let result = check_spec_exp(sym.clone(), &spec, &exp, loc, &reg, cache, budget);
        messages.extend(result.messages);
        iterations += result.iterations;
        defs.insert(sym, result.def);
    }

    CheckResult {
        root: TypedRoot { defs, sources: root.sources.clone() },
        messages: finalize_messages(messages),
        iterations,
    }
}
