//! Run configuration, resolved once at startup.

use crate::io::source::{ExternalSort, InProcessSort, Presorted, SortedSource};
use crate::runner::Runner;

/// How each multi-source input is brought into sorted order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SortStrategy {
    /// Pipe through the system `sort` under `LC_ALL=C`.
    #[default]
    External,
    /// Load and sort in memory.
    InProcess,
    /// Trust the file to be sorted already.
    Presorted,
}

/// Settings for a multi-source run.
#[derive(Clone, Debug)]
pub struct Config {
    /// Worker threads; always at least one.
    pub concurrency: usize,
    /// Sorted-source implementation.
    pub sort: SortStrategy,
    /// Executable for [`SortStrategy::External`]; `sort` when unset.
    pub sort_program: Option<String>,
    /// Extra arguments for the external sort.
    pub sort_args: Vec<String>,
    /// Report per-source failures instead of aborting the batch.
    pub keep_going: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: resolve_concurrency(None),
            sort: SortStrategy::default(),
            sort_program: None,
            sort_args: Vec::new(),
            keep_going: false,
        }
    }
}

/// Requested worker count, or the number of CPUs when unset or zero.
#[must_use]
pub fn resolve_concurrency(requested: Option<usize>) -> usize {
    requested
        .filter(|n| *n > 0)
        .unwrap_or_else(num_cpus::get)
        .max(1)
}

impl Config {
    /// A runner sized by this configuration.
    #[must_use]
    pub fn runner(&self) -> Runner {
        Runner::new(self.concurrency)
    }

    /// The sorted-source implementation this configuration selects.
    #[must_use]
    pub fn sorted_source(&self) -> Box<dyn SortedSource> {
        match self.sort {
            SortStrategy::External => {
                let mut sort = ExternalSort::new().with_args(&self.sort_args);
                if let Some(program) = &self.sort_program {
                    sort = sort.with_program(program);
                }
                Box::new(sort)
            }
            SortStrategy::InProcess => Box::new(InProcessSort),
            SortStrategy::Presorted => Box::new(Presorted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_or_missing_concurrency_falls_back_to_cpus() {
        assert_eq!(resolve_concurrency(Some(3)), 3);
        assert_eq!(resolve_concurrency(Some(0)), num_cpus::get().max(1));
        assert_eq!(resolve_concurrency(None), num_cpus::get().max(1));
    }

    #[test]
    fn strategy_selects_source() {
        let mut config = Config::default();
        assert_eq!(config.sorted_source().name(), "external");
        config.sort = SortStrategy::InProcess;
        assert_eq!(config.sorted_source().name(), "in-process");
        config.sort = SortStrategy::Presorted;
        assert_eq!(config.sorted_source().name(), "presorted");
    }

    #[test]
    fn runner_uses_configured_concurrency() {
        let config = Config {
            concurrency: 5,
            ..Config::default()
        };
        assert_eq!(config.runner().concurrency(), 5);
    }
}
