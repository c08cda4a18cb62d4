//! The compilation driver.
//!
//! Partitions the checkable definitions across a rayon pool; each worker
//! runs the generator and solver single-threaded with its own context.
//! Results flow back over a crossbeam channel, messages are deduplicated
//! and stably sorted, and per-definition substitutions are merged into the
//! typed root by sequential reduction. The Zhegalkin caches are the only
//! shared mutable state, and all their operations are pure functions of
//! their inputs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use rill_ast::resolved::Root;
use rill_ast::typed::{TypedDef, TypedRoot};
use rill_common::DefSym;
use rill_typeck::builtins;
use rill_typeck::diagnostics::finalize_messages;
use rill_typeck::error::CompilationMessage;
use rill_typeck::registry::{check_instances, Registries};
use rill_typeck::solve::Budget;
use rill_typeck::zhegalkin::ZhegalkinCache;
use rill_typeck::{check_spec_exp, checkable_defs};

use crate::config::Config;
use crate::stats::{count_lines, PhaseStat, Stats, Throughput};

/// Cooperative cancellation, checked between definitions and between
/// solver phases. Ongoing unification completes to the nearest boundary;
/// no partial state escapes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    fn inner(&self) -> Arc<AtomicBool> {
        self.flag.clone()
    }
}

/// The outcome of one compilation.
#[derive(Debug)]
pub struct CompilationOutcome {
    pub root: TypedRoot,
    pub messages: Vec<CompilationMessage>,
    pub stats: Option<Stats>,
}

impl CompilationOutcome {
    pub fn has_errors(&self) -> bool {
        !self.messages.is_empty()
    }
}

struct DefOutcome {
    sym: DefSym,
    def: TypedDef,
    messages: Vec<CompilationMessage>,
    iterations: u64,
    elapsed_ms: f64,
}

/// Compile a resolved root under the given configuration.
pub fn compile(
    root: &Root,
    config: &Config,
    cancel: &CancelToken,
) -> Result<CompilationOutcome, String> {
    let cache = ZhegalkinCache::new(config.cache_flags());

    // Phase 1: environments and instance well-formedness.
    let instances_started = Instant::now();
    let mut reg = Registries::from_root(root);
    builtins::register(&mut reg, config.std_lib());
    let mut messages: Vec<CompilationMessage> = check_instances(&reg)
        .into_iter()
        .map(CompilationMessage::Instance)
        .collect();
    let instances_ms = instances_started.elapsed().as_secs_f64() * 1000.0;

    // Phase 2: per-definition inference, in parallel.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(|e| format!("failed to build worker pool: {e}"))?;
    let work = checkable_defs(root);
    let (tx, rx) = crossbeam_channel::unbounded::<DefOutcome>();

    let infer_started = Instant::now();
    pool.install(|| {
        work.par_iter().for_each(|(sym, spec, exp, loc)| {
            if cancel.is_cancelled() {
                return;
            }
            let started = Instant::now();
            let budget = Budget {
                deadline: config.timeout.map(|t| started + t),
                cancel: Some(cancel.inner()),
            };
            let result = check_spec_exp(sym.clone(), spec, exp, *loc, &reg, &cache, &budget);
            let _ = tx.send(DefOutcome {
                sym: sym.clone(),
                def: result.def,
                messages: result.messages,
                iterations: result.iterations,
                elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
            });
        });
    });
    drop(tx);

    let mut defs: FxHashMap<DefSym, TypedDef> = FxHashMap::default();
    let mut durations = Vec::new();
    let mut iterations = 0u64;
    for outcome in rx {
        messages.extend(outcome.messages);
        iterations += outcome.iterations;
        durations.push(outcome.elapsed_ms);
        defs.insert(outcome.sym, outcome.def);
    }
    let infer_ms = infer_started.elapsed().as_secs_f64() * 1000.0;

    // Phase 3: stable output order, dedup at render granularity.
    let finalize_started = Instant::now();
    let messages = finalize_messages(messages);
    let finalize_ms = finalize_started.elapsed().as_secs_f64() * 1000.0;

    let stats = config.xstatistics.then(|| Stats {
        threads: config.threads,
        lines: count_lines(&root.sources),
        iterations,
        phases: vec![
            PhaseStat { phase: "instances".to_string(), time: instances_ms },
            PhaseStat { phase: "inference".to_string(), time: infer_ms },
            PhaseStat { phase: "finalize".to_string(), time: finalize_ms },
        ],
        throughput: Throughput::from_durations_ms(&durations),
        cache: cache.stats(),
    });

    Ok(CompilationOutcome {
        root: TypedRoot { defs, sources: root.sources.clone() },
        messages,
        stats,
    })
}
