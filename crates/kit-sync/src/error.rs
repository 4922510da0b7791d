use std::fmt;

/// Type-erased error carried through the aggregator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors from coordination primitives.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// An aggregator was asked to wait for fewer than one operation.
    #[error("{label} invalid operation count: {count}")]
    InvalidOperationCount { label: String, count: usize },

    /// The caller's token was cancelled.
    #[error("operation canceled")]
    Canceled,

    /// The caller's token passed its deadline.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// One or more operations reported an error.
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl SyncError {
    /// Returns `true` for either cancellation outcome.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Canceled | Self::DeadlineExceeded)
    }
}

/// Every error observed while waiting on a group of operations.
///
/// Renders as `"{label} {first}, {second}, ..."`.
#[derive(Debug)]
pub struct AggregateError {
    label: String,
    errors: Vec<BoxError>,
}

impl AggregateError {
    pub fn new(label: impl Into<String>, errors: Vec<BoxError>) -> Self {
        Self {
            label: label.into(),
            errors,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn errors(&self) -> &[BoxError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.label.is_empty() {
            write!(f, "{} ", self.label)?;
        }
        for (index, err) in self.errors.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Convenience alias used throughout the sync crate.
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_display_joins_messages() {
        let err = AggregateError::new("worker", vec!["a failed".into(), "b failed".into()]);
        assert_eq!(err.to_string(), "worker a failed, b failed");
        assert_eq!(err.len(), 2);
    }

    #[test]
    fn aggregate_display_without_label() {
        let err = AggregateError::new("", vec!["only".into()]);
        assert_eq!(err.to_string(), "only");
    }

    #[test]
    fn invalid_count_message() {
        let err = SyncError::InvalidOperationCount {
            label: "upload".into(),
            count: 0,
        };
        assert_eq!(err.to_string(), "upload invalid operation count: 0");
        assert!(!err.is_cancellation());
    }
}
