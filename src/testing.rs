//! Testing utilities for summarization pipelines.
//!
//! - [`MemorySource`]: an in-memory [`SortedSource`] whose sources can be
//!   slowed down to force a particular completion order.
//! - [`lines_file`] / [`bytes_file`]: temporary input files.
//! - [`assert_approx_eq`]: float comparison for ratios and averages.
//!
//! ```
//! use sortstat::runner::Runner;
//! use sortstat::testing::MemorySource;
//!
//! let source = MemorySource::new()
//!     .with_source("A", ["a", "a", "b"])
//!     .with_source("B", ["x"]);
//! let results = Runner::new(2).summarize_all(&source, &["A", "B"]).unwrap();
//! assert_eq!(results[0].summary.num_values, 3);
//! ```

use crate::error::{Result, SummaryError};
use crate::io::compression::{FinishWrite, auto_detect_writer};
use crate::io::source::{SortedLines, SortedSource};
use std::collections::HashMap;
use std::io::{self, Write};
use std::time::Duration;
use tempfile::NamedTempFile;

/// In-memory [`SortedSource`].
///
/// Values are served exactly as given, without sorting, so unsorted fixtures
/// reach the aggregator unchanged.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    sources: HashMap<String, Vec<Vec<u8>>>,
    open_delays: HashMap<String, Duration>,
    value_delays: HashMap<String, Duration>,
}

impl MemorySource {
    /// No sources.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` with the given values.
    #[must_use]
    pub fn with_source<I, V>(mut self, path: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: AsRef<[u8]>,
    {
        let values = values.into_iter().map(|v| v.as_ref().to_vec()).collect();
        self.sources.insert(path.to_string(), values);
        self
    }

    /// Sleep for `delay` when `path` is opened.
    #[must_use]
    pub fn with_open_delay(mut self, path: &str, delay: Duration) -> Self {
        self.open_delays.insert(path.to_string(), delay);
        self
    }

    /// Sleep for `delay` before each value of `path`.
    #[must_use]
    pub fn with_value_delay(mut self, path: &str, delay: Duration) -> Self {
        self.value_delays.insert(path.to_string(), delay);
        self
    }
}

impl SortedSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn open(&self, path: &str) -> Result<SortedLines> {
        if let Some(delay) = self.open_delays.get(path) {
            std::thread::sleep(*delay);
        }
        let values = self.sources.get(path).cloned().ok_or_else(|| {
            SummaryError::io(path, io::Error::new(io::ErrorKind::NotFound, "no such source"))
        })?;
        let delay = self.value_delays.get(path).copied();
        Ok(SortedLines::new(
            path,
            values.into_iter().map(move |v| {
                if let Some(delay) = delay {
                    std::thread::sleep(delay);
                }
                Ok(v)
            }),
        ))
    }
}

/// Temporary file holding `lines`, each terminated by `\n`.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn lines_file<S: AsRef<[u8]>>(lines: &[S]) -> io::Result<NamedTempFile> {
    bytes_file("", &join_lines(lines))
}

/// Temporary file whose name ends in `suffix`, holding `lines`, compressed
/// according to that suffix (e.g. `.txt.gz`).
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn compressed_lines_file<S: AsRef<[u8]>>(
    suffix: &str,
    lines: &[S],
) -> io::Result<NamedTempFile> {
    let file = tempfile::Builder::new().suffix(suffix).tempfile()?;
    let mut w = auto_detect_writer(file.reopen()?, file.path())?;
    w.write_all(&join_lines(lines))?;
    w.finish()?;
    Ok(file)
}

/// Temporary file whose name ends in `suffix`, holding exactly `bytes`.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn bytes_file(suffix: &str, bytes: &[u8]) -> io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}

fn join_lines<S: AsRef<[u8]>>(lines: &[S]) -> Vec<u8> {
    let mut out = Vec::new();
    for line in lines {
        out.extend_from_slice(line.as_ref());
        out.push(b'\n');
    }
    out
}

/// Assert two floats agree to within `1e-9`.
///
/// # Panics
/// If they do not.
#[track_caller]
pub fn assert_approx_eq(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
