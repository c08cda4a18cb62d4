//! The Rill compiler front-end CLI.
//!
//! Provides the `rillc` command:
//!
//! - `rillc check <snapshot>` - Type-check a resolved-AST snapshot (JSON)
//!
//! Exit codes: 0 on success, 1 on compilation errors, 2 on internal
//! errors (unreadable or malformed snapshot, worker-pool failure).

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};

use rill_ast::resolved::Root;
use rill_typeck::diagnostics::{render_message, render_message_json, DiagnosticOptions};
use rillc::config::{Config, LibLevel, Verbosity};
use rillc::driver::{compile, CancelToken};

#[cfg(target_env = "musl")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "rillc", version, about = "The Rill compiler front-end")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Type-check a resolved-AST snapshot
    Check {
        /// Path to the resolved-AST snapshot (JSON)
        snapshot: PathBuf,

        /// Which standard libraries to include
        #[arg(long, value_enum, default_value = "all")]
        lib: LibLevel,

        /// Worker count (defaults to the available processors)
        #[arg(long)]
        threads: Option<usize>,

        /// Per-definition wall-clock budget in milliseconds
        #[arg(long)]
        timeout: Option<u64>,

        #[arg(long, value_enum, default_value = "normal")]
        verbosity: Verbosity,

        /// Emit structured JSON diagnostics
        #[arg(long)]
        json: bool,

        /// Emit per-phase timings and cache-hit counts
        #[arg(long = "xstatistics")]
        xstatistics: bool,

        /// Disable the Zhegalkin union cache (debug)
        #[arg(long = "xno-cache-union")]
        xno_cache_union: bool,

        /// Disable the Zhegalkin intersection cache (debug)
        #[arg(long = "xno-cache-inter")]
        xno_cache_inter: bool,

        /// Disable the Zhegalkin xor cache (debug)
        #[arg(long = "xno-cache-xor")]
        xno_cache_xor: bool,

        /// Disable the SVE cache (debug)
        #[arg(long = "xno-cache-sve")]
        xno_cache_sve: bool,

        /// Disable the constant-intersection cache (debug)
        #[arg(long = "xno-cache-inter-cst")]
        xno_cache_inter_cst: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Commands::Check {
            snapshot,
            lib,
            threads,
            timeout,
            verbosity,
            json,
            xstatistics,
            xno_cache_union,
            xno_cache_inter,
            xno_cache_xor,
            xno_cache_sve,
            xno_cache_inter_cst,
        } => {
            let config = Config {
                lib,
                threads: threads.unwrap_or_else(rillc::config::default_threads),
                timeout: timeout.map(Duration::from_millis),
                cache_union: !xno_cache_union,
                cache_inter: !xno_cache_inter,
                cache_xor: !xno_cache_xor,
                cache_sve: !xno_cache_sve,
                cache_inter_cst: !xno_cache_inter_cst,
                verbosity,
                json,
                xstatistics,
            };
            check(&snapshot, &config)
        }
    }
}

fn check(snapshot: &PathBuf, config: &Config) -> ExitCode {
    let text = match std::fs::read_to_string(snapshot) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", snapshot.display(), e);
            return ExitCode::from(2);
        }
    };
    let root: Root = match serde_json::from_str(&text) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("error: malformed snapshot '{}': {}", snapshot.display(), e);
            return ExitCode::from(2);
        }
    };

    let cancel = CancelToken::new();
    let outcome = match compile(&root, config, &cancel) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("internal error: {e}");
            return ExitCode::from(2);
        }
    };

    if config.verbosity > Verbosity::Silent {
        if config.json {
            let values: Vec<_> = outcome
                .messages
                .iter()
                .map(|m| render_message_json(m, &outcome.root.sources))
                .collect();
            println!("{}", serde_json::Value::Array(values));
        } else {
            let options = DiagnosticOptions { color: true, json: false };
            for msg in &outcome.messages {
                eprintln!("{}", render_message(msg, &outcome.root.sources, &options));
            }
            if config.verbosity >= Verbosity::Verbose {
                eprintln!(
                    "checked {} definitions, {} message(s)",
                    outcome.root.defs.len(),
                    outcome.messages.len()
                );
            }
        }
    }

    if let Some(stats) = &outcome.stats {
        match serde_json::to_string(stats) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => eprintln!("internal error: cannot render statistics: {e}"),
        }
    }

    if outcome.has_errors() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
