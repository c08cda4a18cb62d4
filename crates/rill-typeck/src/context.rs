//! The mutable typing context threaded through one definition's inference.
//!
//! Holds the stack of per-region constraint buffers, the level counter, the
//! rigidity environment, and the fresh-variable supply. Never shared across
//! workers; each definition gets its own context.

use rill_common::SourceLocation;
use rill_types::{ClassConstraint, Kind, Level, RigidityEnv, Type, TypeVarSym, VarId};

use crate::constraint::{Provenance, TypingConstraint};

/// The fresh type-variable supply for one definition.
///
/// Starts above every resolver-assigned identity of the definition so
/// freshly created variables can never collide with quantifiers or region
/// symbols.
#[derive(Debug)]
pub struct VarSupply {
    next: u32,
}

impl VarSupply {
    pub fn starting_at(next: u32) -> Self {
        VarSupply { next }
    }

    pub fn fresh(&mut self, kind: Kind, level: Level) -> TypeVarSym {
        let id = self.next;
        self.next += 1;
        TypeVarSym::new(VarId(id), kind, level)
    }
}

/// One frame of the region stack: a constraint buffer, tagged with the
/// region variable when the frame belongs to a `region` expression.
#[derive(Debug)]
struct ScopeFrame {
    constraints: Vec<TypingConstraint>,
    region: Option<TypeVarSym>,
}

/// The typing context.
#[derive(Debug)]
pub struct TypingContext {
    frames: Vec<ScopeFrame>,
    renv: RigidityEnv,
    level: Level,
    supply: VarSupply,
}

impl TypingContext {
    pub fn new(supply: VarSupply) -> Self {
        TypingContext {
            frames: vec![ScopeFrame { constraints: Vec::new(), region: None }],
            renv: RigidityEnv::new(),
            level: Level::TOP,
            supply,
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn rigidity(&self) -> &RigidityEnv {
        &self.renv
    }

    /// Mark a variable rigid. Rigidity is never removed within a
    /// definition.
    pub fn rigidify(&mut self, sym: &TypeVarSym) {
        self.renv.rigidify(sym.id);
    }

    /// A fresh flexible variable at the current level.
    pub fn fresh_var(&mut self, kind: Kind) -> TypeVarSym {
        self.supply.fresh(kind, self.level)
    }

    fn current(&mut self) -> &mut ScopeFrame {
        self.frames.last_mut().expect("the root frame is never popped")
    }

    // ── Constraint emission ─────────────────────────────────────────────

    pub fn unify_type(&mut self, tpe1: Type, tpe2: Type, loc: SourceLocation) {
        self.current()
            .constraints
            .push(TypingConstraint::Equality(tpe1, tpe2, Provenance::Source { loc }));
    }

    pub fn unify_type_with(&mut self, tpe1: Type, tpe2: Type, prov: Provenance) {
        self.current().constraints.push(TypingConstraint::Equality(tpe1, tpe2, prov));
    }

    pub fn expect_type(&mut self, expected: Type, actual: Type, loc: SourceLocation) {
        self.current().constraints.push(TypingConstraint::Equality(
            expected,
            actual,
            Provenance::ExpectType { loc },
        ));
    }

    /// Zip expected against actual argument types of a call to `name`,
    /// emitting one equality per position.
    pub fn expect_type_arguments(
        &mut self,
        name: &str,
        expected: Vec<Type>,
        actual: Vec<Type>,
        locs: Vec<SourceLocation>,
    ) {
        for (idx, ((exp, act), loc)) in
            expected.into_iter().zip(actual).zip(locs).enumerate()
        {
            self.current().constraints.push(TypingConstraint::Equality(
                exp,
                act,
                Provenance::ExpectArgument { name: name.to_string(), idx, loc },
            ));
        }
    }

    pub fn add_class_constraints(&mut self, ccs: Vec<ClassConstraint>) {
        for cc in ccs {
            self.current()
                .constraints
                .push(TypingConstraint::Class(cc.class, cc.arg, cc.loc));
        }
    }

    // ── Regions ─────────────────────────────────────────────────────────

    /// Enter a region: push a fresh buffer tagged with the region variable,
    /// mark it rigid, increment the level.
    pub fn enter_region(&mut self, sym: TypeVarSym) {
        self.renv.rigidify(sym.id);
        self.level = self.level.next();
        self.frames.push(ScopeFrame { constraints: Vec::new(), region: Some(sym) });
    }

    /// Exit the current region, emitting a purification constraint into the
    /// parent buffer with the region's own constraints nested inside.
    ///
    /// # Panics
    ///
    /// Panics when enter/exit are unbalanced; that is an inference bug, not
    /// a user error.
    pub fn exit_region(&mut self, external: Type, internal: Type, loc: SourceLocation) {
        let frame = self.frames.pop().expect("exit_region on empty stack");
        let region = frame.region.expect("exit_region on a non-region frame");
        let level = self.level;
        self.level = Level(self.level.0 - 1);
        self.current().constraints.push(TypingConstraint::Purification {
            region,
            external,
            internal,
            level,
            prov: Provenance::RegionExit { loc },
            nested: frame.constraints,
        });
    }

    /// Finish the definition: the stack must hold exactly the root frame.
    /// Returns the flat constraint list and the state the solver needs.
    pub fn finish(self) -> (Vec<TypingConstraint>, RigidityEnv, VarSupply) {
        let TypingContext { mut frames, renv, level, supply } = self;
        debug_assert_eq!(level, Level::TOP, "unbalanced region levels at end of definition");
        assert_eq!(frames.len(), 1, "unbalanced enter/exit of regions");
        let root = frames.pop().expect("root frame");
        (root.constraints, renv, supply)
    }
}
