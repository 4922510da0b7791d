/// Errors produced while building or converting foundation types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypeError {
    /// A JSON value has no `TypedValue` counterpart (objects, nested arrays).
    #[error("unsupported JSON value: {0}")]
    UnsupportedJson(&'static str),

    /// A slice element could not be parsed into the requested type.
    #[error("failed to parse slice element {index} ({value:?}): {reason}")]
    Parse {
        index: usize,
        value: String,
        reason: String,
    },
}

/// Result alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;
