//! Shared memoization for the Zhegalkin operators.
//!
//! One [`ZhegalkinCache`] is created per compilation and shared across all
//! workers. Every cached operation is a pure function of its operands, so
//! concurrent last-writer-wins insertion is sound. Each operator's cache
//! has its own enable flag, fixed from the configuration when the cache is
//! constructed, and hit/miss counters surfaced by `--xstatistics`.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use dashmap::DashMap;

use super::cst::ZhegalkinCst;
use super::expr::{ZhegalkinExpr, ZhegalkinVar};
use super::sve::{self, ZhegalkinSubst};
use rill_types::VarId;

/// Which operator caches are enabled.
#[derive(Debug, Clone, Copy)]
pub struct CacheFlags {
    pub union: bool,
    pub inter: bool,
    pub xor: bool,
    pub inter_cst: bool,
    pub sve: bool,
}

impl Default for CacheFlags {
    fn default() -> Self {
        CacheFlags { union: true, inter: true, xor: true, inter_cst: true, sve: true }
    }
}

/// Hit/miss counters for one operator cache.
#[derive(Debug, Default)]
struct Counter {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Counter {
    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }
}

/// A snapshot of all cache counters, for statistics output.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct CacheStats {
    pub union_hits: u64,
    pub union_misses: u64,
    pub inter_hits: u64,
    pub inter_misses: u64,
    pub xor_hits: u64,
    pub xor_misses: u64,
    pub inter_cst_hits: u64,
    pub inter_cst_misses: u64,
    pub sve_hits: u64,
    pub sve_misses: u64,
}

/// Fresh SVE variables are drawn from a reserved high range so they can
/// never collide with variables created by any definition's inference run.
const SVE_FRESH_BASE: u32 = 1 << 30;

/// The shared operator surface over Zhegalkin expressions.
pub struct ZhegalkinCache {
    flags: CacheFlags,
    union: DashMap<(ZhegalkinExpr, ZhegalkinExpr), ZhegalkinExpr>,
    inter: DashMap<(ZhegalkinExpr, ZhegalkinExpr), ZhegalkinExpr>,
    xor: DashMap<(ZhegalkinExpr, ZhegalkinExpr), ZhegalkinExpr>,
    inter_cst: DashMap<(ZhegalkinCst, ZhegalkinExpr), ZhegalkinExpr>,
    sve: DashMap<ZhegalkinExpr, Option<ZhegalkinSubst>>,
    union_ctr: Counter,
    inter_ctr: Counter,
    xor_ctr: Counter,
    inter_cst_ctr: Counter,
    sve_ctr: Counter,
    next_fresh: AtomicU32,
}

impl ZhegalkinCache {
    pub fn new(flags: CacheFlags) -> Self {
        ZhegalkinCache {
            flags,
            union: DashMap::new(),
            inter: DashMap::new(),
            xor: DashMap::new(),
            inter_cst: DashMap::new(),
            sve: DashMap::new(),
            union_ctr: Counter::default(),
            inter_ctr: Counter::default(),
            xor_ctr: Counter::default(),
            inter_cst_ctr: Counter::default(),
            sve_ctr: Counter::default(),
            next_fresh: AtomicU32::new(SVE_FRESH_BASE),
        }
    }

    /// Look up `key` in `map`, or compute, insert, and return.
    fn lookup_or_compute<K, V>(
        enabled: bool,
        map: &DashMap<K, V>,
        ctr: &Counter,
        key: K,
        thunk: impl FnOnce() -> V,
    ) -> V
    where
        K: std::hash::Hash + Eq,
        V: Clone,
    {
        if !enabled {
            return thunk();
        }
        if let Some(hit) = map.get(&key) {
            ctr.hit();
            return hit.value().clone();
        }
        ctr.miss();
        let value = thunk();
        map.insert(key, value.clone());
        value
    }

    pub fn union(&self, a: &ZhegalkinExpr, b: &ZhegalkinExpr) -> ZhegalkinExpr {
        Self::lookup_or_compute(
            self.flags.union,
            &self.union,
            &self.union_ctr,
            (a.clone(), b.clone()),
            || a.union(b),
        )
    }

    pub fn inter(&self, a: &ZhegalkinExpr, b: &ZhegalkinExpr) -> ZhegalkinExpr {
        Self::lookup_or_compute(
            self.flags.inter,
            &self.inter,
            &self.inter_ctr,
            (a.clone(), b.clone()),
            || a.inter(b),
        )
    }

    pub fn xor(&self, a: &ZhegalkinExpr, b: &ZhegalkinExpr) -> ZhegalkinExpr {
        Self::lookup_or_compute(
            self.flags.xor,
            &self.xor,
            &self.xor_ctr,
            (a.clone(), b.clone()),
            || a.xor(b),
        )
    }

    /// Constant-by-expression intersection, with its own cache since the
    /// converter and SVE hit this shape far more often than general
    /// intersections.
    pub fn inter_cst(&self, c: &ZhegalkinCst, e: &ZhegalkinExpr) -> ZhegalkinExpr {
        if c.is_universe() {
            return e.clone();
        }
        Self::lookup_or_compute(
            self.flags.inter_cst,
            &self.inter_cst,
            &self.inter_cst_ctr,
            (c.clone(), e.clone()),
            || ZhegalkinExpr::from_cst(c.clone()).inter(e),
        )
    }

    /// Solve `e ≡ ∅`, memoized by the normalized query.
    pub fn sve(&self, e: &ZhegalkinExpr) -> Option<ZhegalkinSubst> {
        Self::lookup_or_compute(self.flags.sve, &self.sve, &self.sve_ctr, e.clone(), || {
            sve::successive_variable_elimination(e, &mut || self.fresh_var())
        })
    }

    /// A fresh flexible variable from the reserved SVE range.
    pub fn fresh_var(&self) -> ZhegalkinVar {
        let id = self.next_fresh.fetch_add(1, Ordering::Relaxed);
        ZhegalkinVar::flexible(VarId(id))
    }

    /// Drop all memoized entries. Called between compilations.
    pub fn clear_caches(&self) {
        self.union.clear();
        self.inter.clear();
        self.xor.clear();
        self.inter_cst.clear();
        self.sve.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let (union_hits, union_misses) = self.union_ctr.snapshot();
        let (inter_hits, inter_misses) = self.inter_ctr.snapshot();
        let (xor_hits, xor_misses) = self.xor_ctr.snapshot();
        let (inter_cst_hits, inter_cst_misses) = self.inter_cst_ctr.snapshot();
        let (sve_hits, sve_misses) = self.sve_ctr.snapshot();
        CacheStats {
            union_hits,
            union_misses,
            inter_hits,
            inter_misses,
            xor_hits,
            xor_misses,
            inter_cst_hits,
            inter_cst_misses,
            sve_hits,
            sve_misses,
        }
    }
}

impl Default for ZhegalkinCache {
    fn default() -> Self {
        Self::new(CacheFlags::default())
    }
}
