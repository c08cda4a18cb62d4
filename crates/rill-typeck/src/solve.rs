//! The constraint solver.
//!
//! Iterates unification, purification expansion, and class entailment to a
//! fixed point. Failures follow the recoverability policy: equality
//! failures poison their variables and suppress cascading errors; kind and
//! occurs-check failures abort the definition; class-constraint failures
//! are recorded per call site and never stop anything else.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rustc_hash::FxHashSet;

use rill_common::SourceLocation;
use rill_types::{ClassConstraint, Kind, RigidityEnv, Type, VarId};

use crate::constraint::{Provenance, TypingConstraint};
use crate::context::VarSupply;
use crate::error::{CompilationMessage, TypeError};
use crate::registry::{Entailment, Registries};
use crate::subst::Substitution;
use crate::unify::{unify_types, UnifierEnv, UnifyError};
use crate::zhegalkin::ZhegalkinCache;

/// Cooperative limits on one definition's solve.
#[derive(Debug, Clone, Default)]
pub struct Budget {
    pub deadline: Option<Instant>,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Budget {
    pub fn unlimited() -> Self {
        Budget::default()
    }

    pub fn interrupted(&self) -> bool {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        if let Some(cancel) = &self.cancel {
            if cancel.load(Ordering::Relaxed) {
                return true;
            }
        }
        false
    }
}

/// The result of solving one definition's constraints.
#[derive(Debug)]
pub struct SolveOutcome {
    pub subst: Substitution,
    pub errors: Vec<CompilationMessage>,
    /// Solver loop iterations, for `--xstatistics`.
    pub iterations: u64,
    /// Whether the budget expired before the solve finished.
    pub timed_out: bool,
}

/// How many times the deferred-equation queue is retried before leftovers
/// are reported. Each retry requires progress, so this bound is only a
/// backstop.
const MAX_ROUNDS: usize = 64;

/// Solve a definition's constraints.
pub fn solve_constraints(
    constraints: Vec<TypingConstraint>,
    renv: &RigidityEnv,
    supply: VarSupply,
    assumptions: &[ClassConstraint],
    reg: &Registries,
    cache: &ZhegalkinCache,
    budget: &Budget,
) -> SolveOutcome {
    let mut solver = Solver {
        reg,
        renv,
        cache,
        assumptions,
        supply,
        subst: Substitution::empty(),
        tainted: FxHashSet::default(),
        classes: Vec::new(),
        deferred: Vec::new(),
        errors: Vec::new(),
        aborted: false,
        timed_out: false,
        iterations: 0,
        budget,
    };

    solver.process(constraints);

    // Retry deferred equations until nothing changes.
    let mut rounds = 0;
    while !solver.aborted && !solver.timed_out && !solver.deferred.is_empty() && rounds < MAX_ROUNDS
    {
        rounds += 1;
        let before_subst = solver.subst.len();
        let pending: Vec<_> = std::mem::take(&mut solver.deferred);
        let before_deferred = pending.len();
        for (t1, t2, prov) in pending {
            solver.solve_equality(&t1, &t2, prov);
        }
        if solver.subst.len() == before_subst && solver.deferred.len() >= before_deferred {
            break;
        }
    }

    solver.report_leftover_deferred();
    solver.entail_classes();

    debug_assert!(
        solver.subst.domain().all(|id| !renv.is_rigid(id)),
        "the final substitution must bind only flexible variables"
    );

    SolveOutcome {
        subst: solver.subst,
        errors: solver.errors,
        iterations: solver.iterations,
        timed_out: solver.timed_out,
    }
}

struct Solver<'a> {
    reg: &'a Registries,
    renv: &'a RigidityEnv,
    cache: &'a ZhegalkinCache,
    assumptions: &'a [ClassConstraint],
    supply: VarSupply,
    subst: Substitution,
    /// Variables mentioned by failed equalities. Constraints touching them
    /// are suppressed to avoid error cascades.
    tainted: FxHashSet<VarId>,
    classes: Vec<(rill_common::ClassSym, Type, SourceLocation)>,
    deferred: Vec<(Type, Type, Provenance)>,
    errors: Vec<CompilationMessage>,
    aborted: bool,
    timed_out: bool,
    iterations: u64,
    budget: &'a Budget,
}

impl<'a> Solver<'a> {
    fn process(&mut self, constraints: Vec<TypingConstraint>) {
        for c in constraints {
            if self.aborted {
                return;
            }
            if self.budget.interrupted() {
                self.timed_out = true;
                return;
            }
            self.iterations += 1;
            match c {
                TypingConstraint::Equality(t1, t2, prov) => {
                    self.solve_equality(&t1, &t2, prov);
                }
                TypingConstraint::Class(sym, arg, loc) => {
                    self.classes.push((sym, arg, loc));
                }
                TypingConstraint::Purification { region, external, internal, prov, nested, .. } => {
                    // The nested constraints are solved first; their
                    // solution purifies the internal effect.
                    self.process(nested);
                    if self.aborted || self.timed_out {
                        return;
                    }
                    let internal = self.subst.apply(&internal);
                    let purified =
                        internal.replace_var(region.id, &Type::pure(prov.loc()));
                    self.solve_equality(&external, &purified, prov);
                }
            }
        }
    }

    fn is_tainted(&self, tpe: &Type) -> bool {
        tpe.free_vars().iter().any(|v| self.tainted.contains(&v.id))
    }

    fn taint(&mut self, tpe: &Type) {
        for v in tpe.free_vars() {
            self.tainted.insert(v.id);
        }
    }

    fn solve_equality(&mut self, t1: &Type, t2: &Type, prov: Provenance) {
        let a = self.subst.apply(t1);
        let b = self.subst.apply(t2);
        if self.is_tainted(&a) || self.is_tainted(&b) {
            return;
        }
        let env = UnifierEnv { renv: self.renv, reg: self.reg, cache: self.cache };
        match unify_types(&a, &b, &env, &mut self.supply) {
            Ok(result) => {
                self.subst = result.subst.compose(&self.subst);
                for (d1, d2) in result.deferred {
                    self.deferred.push((d1, d2, prov.clone()));
                }
            }
            Err(err) => self.record_unify_error(err, &a, &b, prov),
        }
    }

    fn record_unify_error(&mut self, err: UnifyError, a: &Type, b: &Type, prov: Provenance) {
        match err {
            UnifyError::Mismatch { tpe1, tpe2 } => {
                self.taint(a);
                self.taint(b);
                self.errors.push(CompilationMessage::Type(TypeError::MismatchedTypes {
                    tpe1,
                    tpe2,
                    full1: a.clone(),
                    full2: b.clone(),
                    prov,
                }));
            }
            UnifyError::UnsupportedEquality { eff1, eff2 } => {
                self.taint(a);
                self.taint(b);
                self.errors.push(CompilationMessage::Type(TypeError::UnsupportedEquality {
                    eff1,
                    eff2,
                    prov,
                }));
            }
            UnifyError::IrreducibleAssocType { sym, arg } => {
                self.taint(a);
                self.taint(b);
                self.errors.push(CompilationMessage::Type(TypeError::IrreducibleAssocType {
                    sym,
                    arg,
                    loc: prov.loc(),
                }));
            }
            UnifyError::IrreducibleNative { member } => {
                self.taint(a);
                self.taint(b);
                self.errors.push(CompilationMessage::Type(TypeError::IrreducibleNativeType {
                    member: member.to_string(),
                    loc: prov.loc(),
                }));
            }
            // Incoherent state: stop the definition, keep the message.
            UnifyError::OccursCheck { var, tpe } => {
                self.errors.push(CompilationMessage::Type(TypeError::OccursCheck {
                    var,
                    tpe,
                    prov,
                }));
                self.aborted = true;
            }
            UnifyError::KindMismatch { k1, k2 } => {
                self.errors.push(CompilationMessage::Kind(
                    crate::error::KindError::MismatchedKinds { k1, k2, loc: prov.loc() },
                ));
                self.aborted = true;
            }
        }
    }

    /// Deferred equations that survived every retry round are reported.
    fn report_leftover_deferred(&mut self) {
        if self.aborted || self.timed_out {
            return;
        }
        let leftover: Vec<_> = std::mem::take(&mut self.deferred);
        for (t1, t2, prov) in leftover {
            let a = self.subst.apply(&t1);
            let b = self.subst.apply(&t2);
            if a == b || self.is_tainted(&a) || self.is_tainted(&b) {
                continue;
            }
            if a.kind() == Kind::Effect || b.kind() == Kind::Effect {
                self.errors.push(CompilationMessage::Type(TypeError::UnsupportedEquality {
                    eff1: a,
                    eff2: b,
                    prov,
                }));
            } else {
                self.errors.push(CompilationMessage::Type(TypeError::MismatchedTypes {
                    tpe1: a.clone(),
                    tpe2: b.clone(),
                    full1: a,
                    full2: b,
                    prov,
                }));
            }
        }
    }

    /// Second pass: entail the accumulated class constraints.
    fn entail_classes(&mut self) {
        if self.aborted || self.timed_out {
            return;
        }
        let classes = std::mem::take(&mut self.classes);
        let assumptions: Vec<ClassConstraint> = self
            .assumptions
            .iter()
            .map(|cc| self.subst.apply_class_constraint(cc))
            .collect();
        for (sym, arg, loc) in classes {
            let arg = self.subst.apply(&arg);
            if self.is_tainted(&arg) {
                continue;
            }
            let arg = crate::registry::reduce_all_assoc(self.reg, &arg);
            match self.reg.entail(&sym, &arg, &assumptions) {
                Entailment::Holds => {}
                Entailment::Missing => {
                    self.errors.push(CompilationMessage::Type(TypeError::MissingInstance {
                        class: sym,
                        arg,
                        loc,
                    }));
                }
                Entailment::Ambiguous => {
                    self.errors.push(CompilationMessage::Type(TypeError::AmbiguousInstance {
                        class: sym,
                        arg,
                        loc,
                    }));
                }
            }
        }
    }
}
