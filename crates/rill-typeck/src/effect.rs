//! Conversion between effect-kinded [`Type`] formulas and Zhegalkin
//! polynomials.
//!
//! The unifier delegates every effect equation to the Zhegalkin layer; the
//! two directions here are the seam. Converting to a polynomial fails (with
//! the offending subterm) when the formula still contains an unreduced
//! associated type or a native effect; such equations are deferred rather
//! than solved.

use rill_common::SourceLocation;
use rill_types::{Kind, Level, RigidityEnv, Type, TypeConstructor, TypeVarSym};

use crate::zhegalkin::{ZhegalkinCache, ZhegalkinCst, ZhegalkinExpr, ZhegalkinVar};

/// Convert an effect formula to Zhegalkin normal form.
///
/// Returns `Err` with the first subterm that is not part of the effect
/// algebra (an unreduced associated type, a native effect, or a wrongly
/// kinded term).
pub fn to_zhegalkin(
    tpe: &Type,
    renv: &RigidityEnv,
    cache: &ZhegalkinCache,
) -> Result<ZhegalkinExpr, Type> {
    match tpe {
        Type::Var(sym) => {
            let var = if renv.is_rigid(sym.id) {
                ZhegalkinVar::rigid(sym.id)
            } else {
                ZhegalkinVar::flexible(sym.id)
            };
            Ok(ZhegalkinExpr::from_var(var))
        }
        Type::Cst(TypeConstructor::Pure, _) => Ok(ZhegalkinExpr::zero()),
        Type::Cst(TypeConstructor::Univ, _) => Ok(ZhegalkinExpr::one()),
        Type::Cst(TypeConstructor::Effect(sym), _) => {
            Ok(ZhegalkinExpr::from_cst(ZhegalkinCst::singleton(sym.clone())))
        }
        Type::Alias(_, _, exp, _) => to_zhegalkin(exp, renv, cache),
        Type::Apply(_, _, _) => {
            let (head, args) = tpe.head_and_args();
            match (head, args.as_slice()) {
                (Type::Cst(TypeConstructor::Union, _), [a, b]) => {
                    let za = to_zhegalkin(a, renv, cache)?;
                    let zb = to_zhegalkin(b, renv, cache)?;
                    Ok(cache.union(&za, &zb))
                }
                (Type::Cst(TypeConstructor::Intersection, _), [a, b]) => {
                    let za = to_zhegalkin(a, renv, cache)?;
                    let zb = to_zhegalkin(b, renv, cache)?;
                    Ok(cache.inter(&za, &zb))
                }
                (Type::Cst(TypeConstructor::Complement, _), [a]) => {
                    let za = to_zhegalkin(a, renv, cache)?;
                    Ok(cache.xor(&ZhegalkinExpr::one(), &za))
                }
                _ => Err(tpe.clone()),
            }
        }
        other => Err(other.clone()),
    }
}

/// Render a Zhegalkin polynomial back into an effect formula.
///
/// Xor has no constructor in the type language and is expressed as
/// `(a & ~b) + (~a & b)`. Flexibility of the original variables is
/// irrelevant here: rigidity is always re-derived from the environment.
pub fn from_zhegalkin(expr: &ZhegalkinExpr, loc: SourceLocation) -> Type {
    let mut acc = cst_to_type(&expr.cst, loc);
    for term in &expr.terms {
        let mut term_tpe = cst_to_type(&term.cst, loc);
        for var in &term.vars {
            term_tpe = Type::intersection(term_tpe, var_to_type(*var), loc);
        }
        acc = xor_type(acc, term_tpe, loc);
    }
    acc
}

fn var_to_type(var: ZhegalkinVar) -> Type {
    Type::Var(TypeVarSym::new(var.id, Kind::Effect, Level::TOP))
}

fn cst_to_type(cst: &ZhegalkinCst, loc: SourceLocation) -> Type {
    match cst {
        ZhegalkinCst::Finite(syms) => Type::union_all(
            syms.iter().map(|sym| Type::effect(sym.clone(), loc)),
            loc,
        ),
        ZhegalkinCst::Cofinite(syms) if syms.is_empty() => Type::univ(loc),
        ZhegalkinCst::Cofinite(syms) => Type::complement(
            Type::union_all(syms.iter().map(|sym| Type::effect(sym.clone(), loc)), loc),
            loc,
        ),
    }
}

fn xor_type(a: Type, b: Type, loc: SourceLocation) -> Type {
    // Pure is the xor identity; keep the common cases readable.
    if matches!(a, Type::Cst(TypeConstructor::Pure, _)) {
        return b;
    }
    if matches!(b, Type::Cst(TypeConstructor::Pure, _)) {
        return a;
    }
    let left = Type::intersection(a.clone(), Type::complement(b.clone(), loc), loc);
    let right = Type::intersection(Type::complement(a, loc), b, loc);
    Type::union(left, right, loc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_common::{EffectSym, SourceId, Span};
    use rill_types::VarId;

    fn loc() -> SourceLocation {
        SourceLocation::new(SourceId(0), Span::new(0, 0))
    }

    fn cache() -> ZhegalkinCache {
        ZhegalkinCache::default()
    }

    #[test]
    fn pure_and_univ_convert_to_zero_and_one() {
        let renv = RigidityEnv::new();
        assert_eq!(to_zhegalkin(&Type::pure(loc()), &renv, &cache()), Ok(ZhegalkinExpr::zero()));
        assert_eq!(to_zhegalkin(&Type::univ(loc()), &renv, &cache()), Ok(ZhegalkinExpr::one()));
    }

    #[test]
    fn rigidity_is_taken_from_the_environment() {
        let sym = TypeVarSym::new(VarId(4), Kind::Effect, Level::TOP);
        let mut renv = RigidityEnv::new();
        let flexible = to_zhegalkin(&Type::Var(sym.clone()), &renv, &cache()).unwrap();
        assert!(flexible.free_vars()[0].flexible);
        renv.rigidify(VarId(4));
        let rigid = to_zhegalkin(&Type::Var(sym), &renv, &cache()).unwrap();
        assert!(!rigid.free_vars()[0].flexible);
    }

    #[test]
    fn union_of_constants_round_trips() {
        let renv = RigidityEnv::new();
        let c = cache();
        let eff = Type::union(
            Type::effect(EffectSym::new("IO"), loc()),
            Type::effect(EffectSym::new("Net"), loc()),
            loc(),
        );
        let z = to_zhegalkin(&eff, &renv, &c).unwrap();
        let expected = ZhegalkinCst::from_symbols([EffectSym::new("IO"), EffectSym::new("Net")]);
        assert_eq!(z, ZhegalkinExpr::from_cst(expected));
        let back = from_zhegalkin(&z, loc());
        let z2 = to_zhegalkin(&back, &renv, &c).unwrap();
        assert_eq!(z, z2);
    }

    #[test]
    fn formulas_with_variables_round_trip_to_the_same_normal_form() {
        let renv = RigidityEnv::new();
        let c = cache();
        let x = Type::Var(TypeVarSym::new(VarId(1), Kind::Effect, Level::TOP));
        let eff = Type::difference(
            Type::union(x.clone(), Type::effect(EffectSym::new("IO"), loc()), loc()),
            Type::effect(EffectSym::new("IO"), loc()),
            loc(),
        );
        let z = to_zhegalkin(&eff, &renv, &c).unwrap();
        let back = from_zhegalkin(&z, loc());
        assert_eq!(to_zhegalkin(&back, &renv, &c).unwrap(), z);
    }

    #[test]
    fn assoc_types_do_not_convert() {
        let renv = RigidityEnv::new();
        let assoc = Type::AssocType(
            rill_common::AssocTypeSym::new("Dividable.Aef"),
            Box::new(Type::int32(loc())),
            Kind::Effect,
            loc(),
        );
        assert!(to_zhegalkin(&assoc, &renv, &cache()).is_err());
    }
}
