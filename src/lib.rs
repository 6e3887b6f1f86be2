//! # sortstat
//!
//! Distributional statistics over **sorted**, line-delimited byte values,
//! computed in a single pass and constant memory.
//!
//! Because the input is sorted, equal values are adjacent. Grouping them into
//! runs gives the distinct count for free, and folding the runs yields the
//! rest: total count, fill ratio (non-blank fraction), and min / max / average
//! value length. Large external-sort outputs can be summarized without ever
//! materializing them.
//!
//! ## Quick Start
//!
//! ```
//! use sortstat::summarize_values;
//!
//! let record = summarize_values(["", "", "a", "a", "b"])?;
//! assert_eq!(record.num_values, 5);
//! assert_eq!(record.num_fills, 3);
//! assert_eq!(record.num_uniques, 3);
//! assert_eq!(record.min_len, 0);
//! assert_eq!(record.max_len, 1);
//! # Ok::<(), sortstat::SummaryError>(())
//! ```
//!
//! ## Many sources
//!
//! ```no_run
//! use sortstat::{ExternalSort, Runner};
//!
//! let paths = ["first_name.txt", "last_name.txt", "zip.txt.gz"];
//! let results = Runner::default().summarize_all(&ExternalSort::new(), &paths)?;
//! for result in &results {
//!     println!("{}: {} distinct", result.path, result.summary.num_uniques);
//! }
//! # Ok::<(), sortstat::SummaryError>(())
//! ```
//!
//! ## Module Overview
//!
//! - [`run_length`] - run-length aggregation with sortedness checking
//! - [`summary`] - the single-pass summarizer and [`SummaryRecord`]
//! - [`runner`] - parallel fan-out over many sources
//! - [`io`] - line decoding, sorted sources, compression, JSON Lines output,
//!   globbing, column splitting
//! - [`config`] / [`cli`] - configuration and the `sortstat` command line
//! - [`testing`] - in-memory sources and fixtures for tests
//!
//! ## Feature Flags
//!
//! - `io-csv` - split delimited files into per-column sources (`sortstat bigcsv`)
//! - `compression-gzip`, `compression-zstd`, `compression-bzip2`,
//!   `compression-xz` - transparent decompression of sources (all default)

pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod run_length;
pub mod runner;
pub mod summary;
pub mod testing;

pub use config::{Config, SortStrategy};
pub use error::{Result, SummaryError};
pub use io::source::{ExternalSort, InProcessSort, Presorted, SortedLines, SortedSource};
#[cfg(feature = "io-csv")]
pub use io::split::{ColumnSplit, ColumnSplitter};
pub use run_length::{Run, RunLength, aggregate, aggregate_values};
pub use runner::{CancelHandle, Runner, SourceFailure, SourceOutcome, SourceResult};
pub use summary::{Summarizer, SummaryRecord, summarize, summarize_reader, summarize_values};
