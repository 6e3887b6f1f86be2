//! Run-length aggregation over sorted value streams.
//!
//! [`aggregate`] groups consecutive equal values into [`Run`]s in a single
//! forward pass. Because the input is sorted, every distinct value forms
//! exactly one run, so the number of runs is the number of distinct values.
//! Only the pending run is held in memory, independent of input size.
//!
//! The sortedness precondition is verified, not assumed: a value that
//! compares less than its predecessor ends the pass with
//! [`SummaryError::Unsorted`].
//!
//! ```
//! use sortstat::run_length::{aggregate_values, Run};
//!
//! let runs: Vec<Run<&str>> = aggregate_values(["a", "a", "b"])
//!     .collect::<sortstat::Result<_>>()
//!     .unwrap();
//! assert_eq!(runs, vec![Run { value: "a", length: 2 }, Run { value: "b", length: 1 }]);
//! ```

use crate::error::{Result, SummaryError};
use std::cmp::Ordering;
use std::iter::FusedIterator;

/// One maximal block of consecutive equal values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Run<V> {
    /// The repeated value.
    pub value: V,
    /// How many times it repeats; always at least 1.
    pub length: u64,
}

impl<V> Run<V> {
    fn start(value: V) -> Self {
        Self { value, length: 1 }
    }
}

/// Lazy run-length adapter returned by [`aggregate`].
///
/// Yields `Ok(Run)` in strictly increasing value order. The first error
/// (empty input, inversion, or an upstream failure) is yielded once, after
/// which the iterator is exhausted.
pub struct RunLength<I, V> {
    inner: I,
    pending: Option<Run<V>>,
    position: u64,
    done: bool,
}

/// Aggregate a fallible, sorted value stream into runs.
///
/// Upstream errors are passed through unchanged.
pub fn aggregate<I, V>(values: I) -> RunLength<I::IntoIter, V>
where
    I: IntoIterator<Item = Result<V>>,
    V: Ord,
{
    RunLength {
        inner: values.into_iter(),
        pending: None,
        position: 0,
        done: false,
    }
}

/// Aggregate an infallible, sorted value stream into runs.
pub fn aggregate_values<I, V>(
    values: I,
) -> RunLength<impl Iterator<Item = Result<V>>, V>
where
    I: IntoIterator<Item = V>,
    V: Ord,
{
    aggregate(values.into_iter().map(Ok))
}

impl<I, V> RunLength<I, V> {
    fn fail(&mut self, err: SummaryError) -> Option<Result<Run<V>>> {
        self.done = true;
        self.pending = None;
        Some(Err(err))
    }
}

impl<I, V> Iterator for RunLength<I, V>
where
    I: Iterator<Item = Result<V>>,
    V: Ord,
{
    type Item = Result<Run<V>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if self.pending.is_none() {
            match self.inner.next() {
                None => return self.fail(SummaryError::EmptyInput),
                Some(Err(e)) => return self.fail(e),
                Some(Ok(v)) => {
                    self.position = 1;
                    self.pending = Some(Run::start(v));
                }
            }
        }

        loop {
            match self.inner.next() {
                None => {
                    self.done = true;
                    return self.pending.take().map(Ok);
                }
                Some(Err(e)) => return self.fail(e),
                Some(Ok(v)) => {
                    self.position += 1;
                    let run = self.pending.as_mut()?;
                    match v.cmp(&run.value) {
                        Ordering::Less => {
                            let position = self.position;
                            return self.fail(SummaryError::Unsorted { position });
                        }
                        Ordering::Equal => run.length += 1,
                        Ordering::Greater => {
                            let finished = std::mem::replace(run, Run::start(v));
                            return Some(Ok(finished));
                        }
                    }
                }
            }
        }
    }
}

impl<I, V> FusedIterator for RunLength<I, V>
where
    I: Iterator<Item = Result<V>>,
    V: Ord,
{
}
