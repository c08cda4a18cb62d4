//! Substitutions from type-variable identities to types.
//!
//! Application is capture-free by construction since identities are unique
//! within one definition's inference run. Substitutions grow monotonically
//! during solving and are applied once to rewrite the AST at the end.

use rustc_hash::FxHashMap;

use rill_common::SourceLocation;
use rill_types::{ClassConstraint, Type, TypeVarSym, VarId};

use crate::effect::from_zhegalkin;
use crate::zhegalkin::ZhegalkinSubst;

/// A finite map from variable identity to type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    bindings: FxHashMap<VarId, Type>,
}

impl Substitution {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn singleton(id: VarId, tpe: Type) -> Self {
        let mut bindings = FxHashMap::default();
        bindings.insert(id, tpe);
        Substitution { bindings }
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn get(&self, id: VarId) -> Option<&Type> {
        self.bindings.get(&id)
    }

    pub fn domain(&self) -> impl Iterator<Item = VarId> + '_ {
        self.bindings.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VarId, &Type)> {
        self.bindings.iter()
    }

    /// Apply the substitution to a type.
    ///
    /// Bound variables are resolved through the map transitively, so chains
    /// such as `a ↦ b, b ↦ Int32` resolve `a` all the way to `Int32`. The
    /// occurs check guarantees the chains are acyclic.
    pub fn apply(&self, tpe: &Type) -> Type {
        if self.bindings.is_empty() {
            return tpe.clone();
        }
        match tpe {
            Type::Var(sym) => match self.bindings.get(&sym.id) {
                Some(bound) => self.apply(bound),
                None => tpe.clone(),
            },
            Type::Cst(_, _) | Type::UnresolvedNative(_, _) => tpe.clone(),
            Type::Apply(head, arg, loc) => Type::Apply(
                Box::new(self.apply(head)),
                Box::new(self.apply(arg)),
                *loc,
            ),
            Type::Alias(sym, args, exp, loc) => Type::Alias(
                sym.clone(),
                args.iter().map(|a| self.apply(a)).collect(),
                Box::new(self.apply(exp)),
                *loc,
            ),
            Type::AssocType(sym, arg, kind, loc) => Type::AssocType(
                sym.clone(),
                Box::new(self.apply(arg)),
                kind.clone(),
                *loc,
            ),
            Type::NativeToType(t, loc) => Type::NativeToType(Box::new(self.apply(t)), *loc),
            Type::NativeToEff(t, loc) => Type::NativeToEff(Box::new(self.apply(t)), *loc),
        }
    }

    pub fn apply_class_constraint(&self, cc: &ClassConstraint) -> ClassConstraint {
        ClassConstraint { class: cc.class.clone(), arg: self.apply(&cc.arg), loc: cc.loc }
    }

    /// Composition `self ∘ other`: first `other`, then `self`.
    ///
    /// Applies `self` to the range of `other`, then unions in the bindings
    /// of `self` for variables `other` does not bind.
    pub fn compose(&self, other: &Substitution) -> Substitution {
        let mut bindings: FxHashMap<VarId, Type> = other
            .bindings
            .iter()
            .map(|(id, tpe)| (*id, self.apply(tpe)))
            .collect();
        for (id, tpe) in &self.bindings {
            bindings.entry(*id).or_insert_with(|| tpe.clone());
        }
        Substitution { bindings }
    }

    /// Extend with one binding, composing `{id ↦ tpe} ∘ self`.
    pub fn extend(&mut self, id: VarId, tpe: Type) {
        let single = Substitution::singleton(id, tpe);
        *self = single.compose(self);
    }

    /// Promote an effect-unifier substitution into this one.
    ///
    /// Each Zhegalkin binding is rendered back into an effect formula at
    /// the given location.
    pub fn promote_effects(&self, zsubst: &ZhegalkinSubst, loc: SourceLocation) -> Substitution {
        let mut promoted = Substitution::empty();
        for (id, zexpr) in zsubst.iter() {
            promoted.bindings.insert(*id, from_zhegalkin(zexpr, loc));
        }
        promoted.compose(self)
    }

    /// Whether every variable in the domain maps to a type whose kind is a
    /// subkind of the variable's kind. Checked by the solver's invariants.
    pub fn respects_kinds_of(&self, vars: &[TypeVarSym]) -> bool {
        vars.iter().all(|sym| match self.bindings.get(&sym.id) {
            Some(tpe) => tpe.kind().sub_kind_of(&sym.kind),
            None => true,
        })
    }
}
