//! Parallel fan-out over many sources.
//!
//! A [`Runner`] pairs every source with its own open → sort → summarize
//! pipeline and runs the pipelines on a dedicated worker pool of
//! `concurrency` threads. Pipelines share nothing but the read-only
//! [`SortedSource`] and a stop flag. Results always come back in input order,
//! whatever order the workers finish in.
//!
//! Two failure policies are offered:
//!
//! - [`Runner::summarize_all`] aborts the batch on the first failure. Running
//!   pipelines are stopped, sources not yet opened are skipped, and no partial
//!   results are returned.
//! - [`Runner::summarize_each`] isolates failures: every source gets its own
//!   outcome.

use crate::error::{Result, SummaryError};
use crate::io::source::SortedSource;
use crate::summary::{SummaryRecord, summarize};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

/// Summary of one source, tagged with its identifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceResult {
    /// Source identifier as given to the runner.
    #[serde(rename = "_path")]
    pub path: String,
    /// Statistics for the source.
    #[serde(flatten)]
    pub summary: SummaryRecord,
}

/// A source whose pipeline failed under [`Runner::summarize_each`].
#[derive(Debug, Error)]
#[error("source {path} failed: {error}")]
pub struct SourceFailure {
    /// Source identifier as given to the runner.
    pub path: String,
    /// What went wrong.
    pub error: SummaryError,
}

/// Per-source outcome of [`Runner::summarize_each`].
pub type SourceOutcome = std::result::Result<SourceResult, SourceFailure>;

/// Shared flag that stops every pipeline of a runner.
///
/// Cancellation is sticky until [`CancelHandle::reset`] is called.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Ask running pipelines to stop; they fail with [`SummaryError::Cancelled`].
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether [`CancelHandle::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clear a previous cancellation.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Stop condition checked between values: external cancel or batch abort.
struct Stop<'a> {
    external: &'a CancelHandle,
    batch: Option<&'a AtomicBool>,
}

impl Stop<'_> {
    fn is_set(&self) -> bool {
        self.external.is_cancelled() || self.batch.is_some_and(|b| b.load(Ordering::Relaxed))
    }
}

/// Runs summarization pipelines on a fixed-size worker pool.
#[derive(Clone, Debug)]
pub struct Runner {
    concurrency: usize,
    cancel: CancelHandle,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

impl Runner {
    /// Runner with `concurrency` workers (at least one).
    #[must_use]
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            cancel: CancelHandle::default(),
        }
    }

    /// Number of worker threads per batch.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Handle that cancels this runner's pipelines from another thread.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    fn pool(&self) -> Result<ThreadPool> {
        Ok(ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .thread_name(|i| format!("sortstat-worker-{i}"))
            .build()?)
    }

    /// Summarize one source on the calling thread.
    ///
    /// # Errors
    /// Any pipeline error, unwrapped.
    pub fn summarize_source(&self, source: &dyn SortedSource, path: &str) -> Result<SourceResult> {
        let stop = Stop {
            external: &self.cancel,
            batch: None,
        };
        run_pipeline(source, path, &stop)
    }

    /// Summarize every source, aborting the batch on the first failure.
    ///
    /// `result[i]` belongs to `paths[i]`.
    ///
    /// # Errors
    /// The first failure in source order that is not a cancellation it
    /// caused, as [`SummaryError::InSource`]. If the batch was cancelled
    /// externally, the first cancelled source is reported.
    pub fn summarize_all<S>(
        &self,
        source: &dyn SortedSource,
        paths: &[S],
    ) -> Result<Vec<SourceResult>>
    where
        S: AsRef<str> + Sync,
    {
        let pool = self.pool()?;
        let failed = AtomicBool::new(false);
        let stop = Stop {
            external: &self.cancel,
            batch: Some(&failed),
        };
        debug!(
            sources = paths.len(),
            workers = self.concurrency,
            sorter = source.name(),
            "starting batch"
        );

        let outcomes: Vec<Result<SourceResult>> = pool.install(|| {
            paths
                .par_iter()
                .map(|path| {
                    let outcome = run_pipeline(source, path.as_ref(), &stop);
                    if matches!(&outcome, Err(e) if !e.is_cancelled()) {
                        failed.store(true, Ordering::Relaxed);
                    }
                    outcome
                })
                .collect()
        });

        let mut results = Vec::with_capacity(outcomes.len());
        let mut first_cancelled = None;
        for (path, outcome) in paths.iter().zip(outcomes) {
            match outcome {
                Ok(result) => results.push(result),
                Err(SummaryError::Cancelled) => {
                    if first_cancelled.is_none() {
                        first_cancelled = Some(path.as_ref().to_string());
                    }
                }
                Err(error) => {
                    return Err(SummaryError::InSource {
                        path: path.as_ref().to_string(),
                        error: Box::new(error),
                    });
                }
            }
        }
        if let Some(path) = first_cancelled {
            return Err(SummaryError::InSource {
                path,
                error: Box::new(SummaryError::Cancelled),
            });
        }
        Ok(results)
    }

    /// Summarize every source independently, keeping per-source failures.
    ///
    /// `outcomes[i]` belongs to `paths[i]`. Only an external cancel stops
    /// other pipelines.
    ///
    /// # Errors
    /// Only if the worker pool cannot be built.
    pub fn summarize_each<S>(
        &self,
        source: &dyn SortedSource,
        paths: &[S],
    ) -> Result<Vec<SourceOutcome>>
    where
        S: AsRef<str> + Sync,
    {
        let pool = self.pool()?;
        let stop = Stop {
            external: &self.cancel,
            batch: None,
        };
        Ok(pool.install(|| {
            paths
                .par_iter()
                .map(|path| {
                    let path = path.as_ref();
                    run_pipeline(source, path, &stop).map_err(|error| SourceFailure {
                        path: path.to_string(),
                        error,
                    })
                })
                .collect()
        }))
    }
}

fn run_pipeline(source: &dyn SortedSource, path: &str, stop: &Stop<'_>) -> Result<SourceResult> {
    let span = info_span!("source", path);
    let _guard = span.enter();

    if stop.is_set() {
        debug!("skipped, batch stopped");
        return Err(SummaryError::Cancelled);
    }

    let started = Instant::now();
    let outcome = source.open(path).and_then(|lines| {
        debug!(sorter = source.name(), "opened");
        summarize(lines.map(|value| {
            if stop.is_set() {
                Err(SummaryError::Cancelled)
            } else {
                value
            }
        }))
    });

    match outcome {
        Ok(summary) => {
            info!(
                num_values = summary.num_values,
                num_uniques = summary.num_uniques,
                elapsed = ?started.elapsed(),
                "summarized"
            );
            Ok(SourceResult {
                path: path.to_string(),
                summary,
            })
        }
        Err(SummaryError::Cancelled) => {
            debug!("cancelled");
            Err(SummaryError::Cancelled)
        }
        Err(e) => {
            warn!(error = %e, cause = ?std::error::Error::source(&e), "failed");
            Err(e)
        }
    }
}
