//! Compiler configuration.
//!
//! Everything the driver recognizes: library level, worker count, the
//! per-definition timeout, the Zhegalkin cache toggles, and output modes.
//! No environment variables are consumed.

use std::time::Duration;

use rill_typeck::builtins::StdLib;
use rill_typeck::zhegalkin::CacheFlags;

/// Which standard libraries to include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LibLevel {
    /// No standard definitions at all.
    Nix,
    /// The minimal region-aware core.
    Min,
    /// Everything.
    All,
}

/// How chatty the driver is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum Verbosity {
    Silent,
    Normal,
    Verbose,
}

/// The resolved compiler configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub lib: LibLevel,
    /// Worker count; defaults to the available parallelism.
    pub threads: usize,
    /// Optional per-definition wall-clock budget.
    pub timeout: Option<Duration>,
    pub cache_union: bool,
    pub cache_inter: bool,
    pub cache_xor: bool,
    pub cache_sve: bool,
    pub cache_inter_cst: bool,
    pub verbosity: Verbosity,
    /// Structured JSON output.
    pub json: bool,
    /// Emit per-phase timings and cache-hit counts.
    pub xstatistics: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            lib: LibLevel::All,
            threads: default_threads(),
            timeout: None,
            cache_union: true,
            cache_inter: true,
            cache_xor: true,
            cache_sve: true,
            cache_inter_cst: true,
            verbosity: Verbosity::Normal,
            json: false,
            xstatistics: false,
        }
    }
}

pub fn default_threads() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

impl Config {
    pub fn cache_flags(&self) -> CacheFlags {
        CacheFlags {
            union: self.cache_union,
            inter: self.cache_inter,
            xor: self.cache_xor,
            inter_cst: self.cache_inter_cst,
            sve: self.cache_sve,
        }
    }

    pub fn std_lib(&self) -> StdLib {
        match self.lib {
            LibLevel::Nix => StdLib::Nix,
            LibLevel::Min => StdLib::Min,
            LibLevel::All => StdLib::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_enables_all_caches() {
        let config = Config::default();
        let flags = config.cache_flags();
        assert!(flags.union && flags.inter && flags.xor && flags.sve && flags.inter_cst);
        assert!(config.threads >= 1);
    }
}
