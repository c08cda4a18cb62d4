//! Unification of types and effects.
//!
//! Robinson-style structural unification over [`Type`] terms, outside-in,
//! producing an explicit [`Substitution`]. Effect-kinded equations are
//! delegated to the Zhegalkin layer and solved by successive variable
//! elimination; record and schema rows unify with label rearrangement;
//! associated types are reduced one step at a time against the equality
//! environment, with equations deferred while their arguments are still
//! open.

use rill_common::{AssocTypeSym, NativeMemberSym, SourceLocation};
use rill_types::{Kind, RigidityEnv, Type, TypeConstructor, TypeVarSym};

use crate::context::VarSupply;
use crate::effect::to_zhegalkin;
use crate::registry::{reduce_assoc, Registries, ReduceOutcome};
use crate::subst::Substitution;
use crate::zhegalkin::ZhegalkinCache;

/// Read-only inputs of the unifier.
pub struct UnifierEnv<'a> {
    pub renv: &'a RigidityEnv,
    pub reg: &'a Registries,
    pub cache: &'a ZhegalkinCache,
}

/// A failed unification, in terms of the mismatching subterms.
#[derive(Debug, Clone)]
pub enum UnifyError {
    Mismatch { tpe1: Type, tpe2: Type },
    OccursCheck { var: TypeVarSym, tpe: Type },
    KindMismatch { k1: Kind, k2: Kind },
    UnsupportedEquality { eff1: Type, eff2: Type },
    IrreducibleAssocType { sym: AssocTypeSym, arg: Type },
    IrreducibleNative { member: NativeMemberSym },
}

/// A successful unification: the substitution plus equations that must be
/// retried once more variables are known (blocked associated types and
/// native members).
#[derive(Debug, Default)]
pub struct UnifyResult {
    pub subst: Substitution,
    pub deferred: Vec<(Type, Type)>,
}

/// Unify two types under the given environment.
pub fn unify_types(
    tpe1: &Type,
    tpe2: &Type,
    env: &UnifierEnv<'_>,
    supply: &mut VarSupply,
) -> Result<UnifyResult, UnifyError> {
    let mut out = UnifyResult::default();
    go(tpe1, tpe2, env, supply, &mut out)?;
    Ok(out)
}

fn go(
    tpe1: &Type,
    tpe2: &Type,
    env: &UnifierEnv<'_>,
    supply: &mut VarSupply,
    out: &mut UnifyResult,
) -> Result<(), UnifyError> {
    // Work under the substitution accumulated so far, with aliases
    // unfolded; the alias is only ever a display artifact.
    let t1 = out.subst.apply(tpe1);
    let t1 = t1.unfold_alias();
    let t2 = out.subst.apply(tpe2);
    let t2 = t2.unfold_alias();

    if t1 == t2 {
        return Ok(());
    }

    // The whole effect fragment goes through the Boolean algebra.
    if t1.kind() == Kind::Effect || t2.kind() == Kind::Effect {
        return unify_effects(t1, t2, env, out);
    }

    match (t1, t2) {
        // Flexible variables bind; rigid ones unify only with themselves,
        // which the fast path above already covered, or with a term that
        // reduces to them, handled by the reduction arms below.
        (Type::Var(v), other) if !env.renv.is_rigid(v.id) => bind(v, other, out),
        (other, Type::Var(v)) if !env.renv.is_rigid(v.id) => bind(v, other, out),

        // Associated types: one reduction step, then recurse; blocked
        // equations are deferred rather than failed.
        (Type::AssocType(sym, arg, _, _), other) | (other, Type::AssocType(sym, arg, _, _)) => {
            match reduce_assoc(env.reg, sym, arg) {
                ReduceOutcome::Reduced(reduct) => go(&reduct, other, env, supply, out),
                ReduceOutcome::Blocked => {
                    out.deferred.push((t1.clone(), t2.clone()));
                    Ok(())
                }
                ReduceOutcome::Irreducible => Err(UnifyError::IrreducibleAssocType {
                    sym: sym.clone(),
                    arg: arg.as_ref().clone(),
                }),
            }
        }

        // Native members reduce once their argument is ground; otherwise
        // they are opaque and the equation waits.
        (Type::NativeToType(inner, _), other) | (other, Type::NativeToType(inner, _)) => {
            if inner.is_ground() {
                let reduct = resolve_native(inner, env)?;
                go(&reduct, other, env, supply, out)
            } else {
                out.deferred.push((t1.clone(), t2.clone()));
                Ok(())
            }
        }

        // What remains on a variable side is a rigid variable against a
        // different term.
        (Type::Var(_), other) => Err(UnifyError::Mismatch { tpe1: t1.clone(), tpe2: other.clone() }),
        (other, Type::Var(_)) => Err(UnifyError::Mismatch { tpe1: other.clone(), tpe2: t2.clone() }),

        (Type::Cst(c1, _), Type::Cst(c2, _)) => {
            if c1 == c2 {
                Ok(())
            } else {
                Err(UnifyError::Mismatch { tpe1: t1.clone(), tpe2: t2.clone() })
            }
        }

        // Rows unify up to label rearrangement.
        (Type::Apply(_, _, _), Type::Apply(_, _, _))
            if is_row_extend(t1, Kind::Record) && is_row_extend(t2, Kind::Record) =>
        {
            unify_rows(t1, t2, Kind::Record, env, supply, out)
        }
        (Type::Apply(_, _, _), Type::Apply(_, _, _))
            if is_row_extend(t1, Kind::Schema) && is_row_extend(t2, Kind::Schema) =>
        {
            unify_rows(t1, t2, Kind::Schema, env, supply, out)
        }

        (Type::Apply(h1, a1, _), Type::Apply(h2, a2, _)) => {
            go(h1, h2, env, supply, out)?;
            go(a1, a2, env, supply, out)
        }

        _ => Err(UnifyError::Mismatch { tpe1: t1.clone(), tpe2: t2.clone() }),
    }
}

/// Bind a flexible variable, with occurs check and kind subsumption.
fn bind(var: &TypeVarSym, tpe: &Type, out: &mut UnifyResult) -> Result<(), UnifyError> {
    if let Type::Var(other) = tpe {
        if other.id == var.id {
            return Ok(());
        }
    }
    if tpe.mentions_var(var.id) {
        return Err(UnifyError::OccursCheck { var: var.clone(), tpe: tpe.clone() });
    }
    let bound_kind = tpe.kind();
    if !bound_kind.sub_kind_of(&var.kind) {
        return Err(UnifyError::KindMismatch { k1: var.kind.clone(), k2: bound_kind });
    }
    out.subst.extend(var.id, tpe.clone());
    Ok(())
}

// ── Effects ─────────────────────────────────────────────────────────────

fn unify_effects(
    eff1: &Type,
    eff2: &Type,
    env: &UnifierEnv<'_>,
    out: &mut UnifyResult,
) -> Result<(), UnifyError> {
    // Reduce associated types and native members first; if any remain the
    // formula is not yet a pure Boolean term and the equation waits.
    let r1 = normalize_effect(eff1, env)?;
    let r2 = normalize_effect(eff2, env)?;
    if contains_opaque(&r1) || contains_opaque(&r2) {
        out.deferred.push((r1, r2));
        return Ok(());
    }

    let z1 = match to_zhegalkin(&r1, env.renv, env.cache) {
        Ok(z) => z,
        Err(bad) => {
            return Err(UnifyError::KindMismatch { k1: Kind::Effect, k2: bad.kind() });
        }
    };
    let z2 = match to_zhegalkin(&r2, env.renv, env.cache) {
        Ok(z) => z,
        Err(bad) => {
            return Err(UnifyError::KindMismatch { k1: Kind::Effect, k2: bad.kind() });
        }
    };

    // e₁ ⊕ e₂ ≡ ∅ has exactly the unifiers of e₁ ≡ e₂.
    let query = env.cache.xor(&z1, &z2);
    if query.is_zero() {
        return Ok(());
    }
    match env.cache.sve(&query) {
        Some(zsubst) => {
            out.subst = out.subst.promote_effects(&zsubst, eff1.loc());
            Ok(())
        }
        None => Err(UnifyError::UnsupportedEquality { eff1: r1, eff2: r2 }),
    }
}

/// Reduce associated types and ground native members inside an effect
/// formula.
fn normalize_effect(eff: &Type, env: &UnifierEnv<'_>) -> Result<Type, UnifyError> {
    match eff {
        Type::AssocType(sym, arg, _, _) => match reduce_assoc(env.reg, sym, arg) {
            ReduceOutcome::Reduced(t) => normalize_effect(&t, env),
            ReduceOutcome::Blocked => Ok(eff.clone()),
            ReduceOutcome::Irreducible => Err(UnifyError::IrreducibleAssocType {
                sym: sym.clone(),
                arg: arg.as_ref().clone(),
            }),
        },
        Type::NativeToEff(inner, _) => {
            if inner.is_ground() {
                let member_sig = resolve_native_sig(inner, env)?;
                Ok(member_sig.eff)
            } else {
                Ok(eff.clone())
            }
        }
        Type::Alias(_, _, exp, _) => normalize_effect(exp, env),
        Type::Apply(h, a, loc) => Ok(Type::Apply(
            Box::new(normalize_effect(h, env)?),
            Box::new(normalize_effect(a, env)?),
            *loc,
        )),
        other => Ok(other.clone()),
    }
}

/// Whether a formula still contains a node the Boolean algebra cannot see.
fn contains_opaque(tpe: &Type) -> bool {
    match tpe {
        Type::AssocType(_, _, _, _) | Type::NativeToEff(_, _) | Type::NativeToType(_, _) => true,
        Type::Apply(h, a, _) => contains_opaque(h) || contains_opaque(a),
        Type::Alias(_, _, exp, _) => contains_opaque(exp),
        _ => false,
    }
}

// ── Native members ──────────────────────────────────────────────────────

fn resolve_native_sig(
    inner: &Type,
    env: &UnifierEnv<'_>,
) -> Result<rill_ast::resolved::NativeSignature, UnifyError> {
    let (head, _) = inner.unfold_alias().head_and_args();
    match head {
        Type::UnresolvedNative(member, _) => match env.reg.natives.get(member) {
            Some(sig) => Ok(sig.clone()),
            None => Err(UnifyError::IrreducibleNative { member: member.clone() }),
        },
        other => Err(UnifyError::Mismatch { tpe1: inner.clone(), tpe2: other.clone() }),
    }
}

fn resolve_native(inner: &Type, env: &UnifierEnv<'_>) -> Result<Type, UnifyError> {
    resolve_native_sig(inner, env).map(|sig| sig.tpe)
}

// ── Rows ────────────────────────────────────────────────────────────────

/// The label of a row extension, uniformly over record and schema rows.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RowLabel {
    Record(String),
    Schema(rill_common::PredSym),
}

fn is_row_extend(tpe: &Type, row_kind: Kind) -> bool {
    row_label(tpe, &row_kind).is_some()
}

fn row_label(tpe: &Type, row_kind: &Kind) -> Option<RowLabel> {
    let (head, args) = tpe.head_and_args();
    if args.len() != 2 {
        return None;
    }
    match (head, row_kind) {
        (Type::Cst(TypeConstructor::RecordRowExtend(l), _), Kind::Record) => {
            Some(RowLabel::Record(l.clone()))
        }
        (Type::Cst(TypeConstructor::SchemaRowExtend(p), _), Kind::Schema) => {
            Some(RowLabel::Schema(p.clone()))
        }
        _ => None,
    }
}

fn mk_row_extend(label: &RowLabel, field: Type, rest: Type, loc: SourceLocation) -> Type {
    match label {
        RowLabel::Record(l) => Type::record_extend(l.clone(), field, rest, loc),
        RowLabel::Schema(p) => Type::schema_extend(p.clone(), field, rest, loc),
    }
}

/// Unify two row types by rearranging the second to expose the first's
/// leading label.
fn unify_rows(
    row1: &Type,
    row2: &Type,
    row_kind: Kind,
    env: &UnifierEnv<'_>,
    supply: &mut VarSupply,
    out: &mut UnifyResult,
) -> Result<(), UnifyError> {
    let (_, args1) = row1.head_and_args();
    let label1 = row_label(row1, &row_kind).expect("caller checked row shape");
    let field1 = args1[0].clone();
    let rest1 = args1[1].clone();

    let (field2, rest2) = rewrite_row(row2, &label1, &row_kind, env, supply, out)
        .ok_or_else(|| UnifyError::Mismatch { tpe1: row1.clone(), tpe2: row2.clone() })??;
    go(&field1, &field2, env, supply, out)?;
    go(&rest1, &rest2, env, supply, out)
}

/// Rearrange `row` so that `label` comes first. Returns the field type
/// bound to the label and the remainder of the row.
///
/// `None` means the label cannot appear in the row at all; `Some(Err(..))`
/// propagates a binding failure from a flexible row tail.
#[allow(clippy::type_complexity)]
fn rewrite_row(
    row: &Type,
    label: &RowLabel,
    row_kind: &Kind,
    env: &UnifierEnv<'_>,
    supply: &mut VarSupply,
    out: &mut UnifyResult,
) -> Option<Result<(Type, Type), UnifyError>> {
    let row = out.subst.apply(row);
    let row = row.unfold_alias();
    if let Some(l2) = row_label(row, row_kind) {
        let (_, args) = row.head_and_args();
        let field2 = args[0].clone();
        let rest2 = args[1].clone();
        if &l2 == label {
            return Some(Ok((field2, rest2)));
        }
        let inner = rewrite_row(&rest2, label, row_kind, env, supply, out)?;
        return Some(inner.map(|(field, rest)| {
            (field, mk_row_extend(&l2, field2, rest, row.loc()))
        }));
    }
    match row {
        Type::Var(tail) if !env.renv.is_rigid(tail.id) => {
            // Open row: materialize the label and a fresh tail.
            let field_kind = Kind::Star;
            let field = Type::Var(supply.fresh(field_kind, tail.level));
            let rest = Type::Var(supply.fresh(row_kind.clone(), tail.level));
            let extended = mk_row_extend(label, field.clone(), rest.clone(), row.loc());
            if extended.mentions_var(tail.id) {
                return Some(Err(UnifyError::OccursCheck {
                    var: tail.clone(),
                    tpe: extended,
                }));
            }
            out.subst.extend(tail.id, extended);
            Some(Ok((field, rest)))
        }
        _ => None,
    }
}
