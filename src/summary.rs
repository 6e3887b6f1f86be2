//! Single-pass summary statistics over sorted values.
//!
//! A [`Summarizer`] folds the runs produced by [`crate::run_length`] into a
//! [`SummaryRecord`]. It follows the usual accumulator lifecycle: created
//! empty, fed each run once, then consumed by [`Summarizer::finish`].
//!
//! ```
//! use sortstat::summary::summarize_values;
//!
//! let record = summarize_values(["", "", "a", "a", "b"]).unwrap();
//! assert_eq!(record.num_values, 5);
//! assert_eq!(record.num_fills, 3);
//! assert_eq!(record.num_uniques, 3);
//! ```

use crate::error::{Result, SummaryError};
use crate::io::lines::ByteLines;
use crate::run_length::{Run, aggregate};
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// Distributional statistics for one sorted stream.
///
/// Lengths are byte lengths. Records only exist for streams with at least
/// one value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Total number of values.
    pub num_values: u64,
    /// Number of non-blank values.
    pub num_fills: u64,
    /// `num_fills / num_values`.
    pub fill_ratio: f64,
    /// Length of the longest distinct value.
    pub max_len: u64,
    /// Length of the shortest distinct value.
    pub min_len: u64,
    /// Mean value length, weighted by occurrence.
    pub avg_len: f64,
    /// Number of distinct values.
    pub num_uniques: u64,
}

/// Accumulator that turns runs into a [`SummaryRecord`].
#[derive(Clone, Debug, Default)]
pub struct Summarizer {
    num_values: u64,
    num_uniques: u64,
    num_empty: Option<u64>,
    max_len: u64,
    min_len: Option<u64>,
    sum_len: u64,
}

impl Summarizer {
    /// Empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one run.
    ///
    /// # Errors
    /// [`SummaryError::DuplicateBlankRun`] if a blank run was already folded.
    /// Sorted input puts the blank value first, so it can only form one run.
    pub fn add_run<V: AsRef<[u8]>>(&mut self, run: &Run<V>) -> Result<()> {
        let len = run.value.as_ref().len() as u64;
        if len == 0 {
            if self.num_empty.is_some() {
                return Err(SummaryError::DuplicateBlankRun);
            }
            self.num_empty = Some(run.length);
        }
        self.num_values += run.length;
        self.num_uniques += 1;
        self.max_len = self.max_len.max(len);
        self.min_len = Some(self.min_len.map_or(len, |m| m.min(len)));
        self.sum_len += len * run.length;
        Ok(())
    }

    /// Compute the final record.
    ///
    /// # Errors
    /// [`SummaryError::EmptyInput`] if no values were folded.
    #[allow(clippy::cast_precision_loss)]
    pub fn finish(self) -> Result<SummaryRecord> {
        let min_len = match self.min_len {
            Some(m) if self.num_values > 0 => m,
            _ => return Err(SummaryError::EmptyInput),
        };
        let num_fills = self.num_values - self.num_empty.unwrap_or(0);
        let total = self.num_values as f64;
        Ok(SummaryRecord {
            num_values: self.num_values,
            num_fills,
            fill_ratio: num_fills as f64 / total,
            max_len: self.max_len,
            min_len,
            avg_len: self.sum_len as f64 / total,
            num_uniques: self.num_uniques,
        })
    }
}

/// Summarize a fallible, sorted value stream.
///
/// Reads the input once, to exhaustion or to the first error.
///
/// # Errors
/// [`SummaryError::EmptyInput`] for zero values, [`SummaryError::Unsorted`]
/// on an inversion, or whatever error the input yields.
pub fn summarize<I, V>(values: I) -> Result<SummaryRecord>
where
    I: IntoIterator<Item = Result<V>>,
    V: Ord + AsRef<[u8]>,
{
    let mut acc = Summarizer::new();
    for run in aggregate(values) {
        acc.add_run(&run?)?;
    }
    acc.finish()
}

/// Summarize an infallible, sorted value stream.
///
/// # Errors
/// See [`summarize`].
pub fn summarize_values<I, V>(values: I) -> Result<SummaryRecord>
where
    I: IntoIterator<Item = V>,
    V: Ord + AsRef<[u8]>,
{
    summarize(values.into_iter().map(Ok))
}

/// Summarize the newline-delimited values of a sorted reader.
///
/// `path` only labels read failures.
///
/// # Errors
/// See [`summarize`]; read failures become [`SummaryError::SourceIo`].
pub fn summarize_reader<R: BufRead>(path: &str, reader: R) -> Result<SummaryRecord> {
    summarize(ByteLines::new(reader).map(|line| line.map_err(|e| SummaryError::io(path, e))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_without_runs_is_empty_input() {
        assert!(matches!(Summarizer::new().finish(), Err(SummaryError::EmptyInput)));
    }

    #[test]
    fn second_blank_run_is_rejected() {
        let mut acc = Summarizer::new();
        acc.add_run(&Run { value: "", length: 2 }).unwrap();
        acc.add_run(&Run { value: "a", length: 1 }).unwrap();
        assert!(matches!(
            acc.add_run(&Run { value: "", length: 1 }),
            Err(SummaryError::DuplicateBlankRun)
        ));
    }

    #[test]
    fn min_len_tracks_shortest_distinct_value() {
        let mut acc = Summarizer::new();
        acc.add_run(&Run { value: "abc", length: 1 }).unwrap();
        acc.add_run(&Run { value: "b", length: 4 }).unwrap();
        let record = acc.finish().unwrap();
        assert_eq!(record.min_len, 1);
        assert_eq!(record.max_len, 3);
        assert_eq!(record.num_values, 5);
        assert!((record.avg_len - 7.0 / 5.0).abs() < 1e-12);
    }
}
