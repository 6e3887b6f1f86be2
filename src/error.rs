//! Error types for summarization pipelines.

use thiserror::Error;

/// Result type alias for summarization operations.
pub type Result<T> = std::result::Result<T, SummaryError>;

/// Errors that can occur while aggregating, summarizing, or orchestrating sources.
///
/// Every variant is fatal for the pipeline that raised it. None of them are
/// retried: an unsorted or empty source stays unsorted or empty.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// The source yielded zero values, so ratios and averages are undefined.
    #[error("empty input: no values to summarize")]
    EmptyInput,

    /// A value compared strictly less than the value before it.
    #[error("unsorted input: value #{position} is less than its predecessor")]
    Unsorted {
        /// 1-based index of the offending value.
        position: u64,
    },

    /// More than one run of the blank (empty) value was folded into one summary.
    #[error("blank value appeared in more than one run")]
    DuplicateBlankRun,

    /// Opening, reading, or closing a sorted source failed.
    #[error("i/o failure on source {path}: {source}")]
    SourceIo {
        /// Identifier of the source being read.
        path: String,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The pipeline stopped because its batch was cancelled.
    #[error("cancelled")]
    Cancelled,

    /// The worker pool could not be created.
    #[error("failed to build worker pool")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// A failure attributed to one source of a multi-source batch.
    #[error("source {path} failed")]
    InSource {
        /// Identifier of the failing source.
        path: String,
        /// What went wrong.
        #[source]
        error: Box<SummaryError>,
    },
}

impl SummaryError {
    /// Build a [`SummaryError::SourceIo`] for `path`.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::SourceIo {
            path: path.into(),
            source,
        }
    }

    /// The underlying error with any [`SummaryError::InSource`] wrapping removed.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::InSource { error, .. } => error.root(),
            other => other,
        }
    }

    /// Whether this error (after unwrapping) is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_unwraps_nested_source_errors() {
        let err = SummaryError::InSource {
            path: "a.txt".into(),
            error: Box::new(SummaryError::Unsorted { position: 7 }),
        };
        assert!(matches!(err.root(), SummaryError::Unsorted { position: 7 }));
        assert!(!err.is_cancelled());
        assert_eq!(err.to_string(), "source a.txt failed");
    }

    #[test]
    fn cancellation_is_detected_through_wrapping() {
        let err = SummaryError::InSource {
            path: "b.txt".into(),
            error: Box::new(SummaryError::Cancelled),
        };
        assert!(err.is_cancelled());
    }
}
