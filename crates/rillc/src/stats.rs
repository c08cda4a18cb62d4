//! Compilation statistics, emitted as one JSON object under
//! `--xstatistics`.

use serde::Serialize;

use rill_typeck::zhegalkin::CacheStats;

/// Wall-clock time of one driver phase, in milliseconds.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseStat {
    pub phase: String,
    pub time: f64,
}

/// Distribution of per-definition checking rates, in definitions per
/// second.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Throughput {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub median: f64,
}

impl Throughput {
    /// Compute the distribution from per-definition durations in
    /// milliseconds.
    pub fn from_durations_ms(durations: &[f64]) -> Throughput {
        if durations.is_empty() {
            return Throughput { min: 0.0, max: 0.0, avg: 0.0, median: 0.0 };
        }
        let mut rates: Vec<f64> =
            durations.iter().map(|ms| if *ms > 0.0 { 1000.0 / ms } else { f64::MAX }).collect();
        rates.sort_by(|a, b| a.partial_cmp(b).expect("rates are finite or MAX"));
        let min = rates[0];
        let max = rates[rates.len() - 1];
        let avg = rates.iter().sum::<f64>() / rates.len() as f64;
        let median = rates[rates.len() / 2];
        Throughput { min, max, avg, median }
    }
}

/// The single statistics object of a compilation.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub threads: usize,
    /// Total source lines across the compilation unit.
    pub lines: u64,
    /// Total solver iterations across all definitions.
    pub iterations: u64,
    pub phases: Vec<PhaseStat>,
    pub throughput: Throughput,
    pub cache: CacheStats,
}

/// Count the lines of all sources.
pub fn count_lines(sources: &[rill_ast::resolved::SourceFile]) -> u64 {
    sources.iter().map(|s| s.text.lines().count() as u64).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throughput_of_uniform_durations() {
        let t = Throughput::from_durations_ms(&[10.0, 10.0, 10.0]);
        assert_eq!(t.min, 100.0);
        assert_eq!(t.max, 100.0);
        assert_eq!(t.avg, 100.0);
        assert_eq!(t.median, 100.0);
    }

    #[test]
    fn throughput_of_empty_population_is_zero() {
        let t = Throughput::from_durations_ms(&[]);
        assert_eq!(t.min, 0.0);
        assert_eq!(t.max, 0.0);
    }

    #[test]
    fn line_counting() {
        let sources = vec![rill_ast::resolved::SourceFile {
            name: "a.rl".into(),
            text: "one\ntwo\nthree\n".into(),
        }];
        assert_eq!(count_lines(&sources), 3);
    }
}
