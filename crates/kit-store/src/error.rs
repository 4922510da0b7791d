use kit_types::TypeError;

/// Errors from store operations.
///
/// Callers rely on telling the first three apart: a missing value, a value
/// of the wrong shape, and an unreadable snapshot.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key is missing or holds an explicit null and the load was not
    /// nullable.
    #[error("undefined value: {key}")]
    UndefinedValue { key: String },

    /// The key holds a value that cannot be read as the requested type.
    #[error("failed to read ({key}): invalid data type: expected {expected}, found {found}")]
    InvalidType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The snapshot is not valid base64 or not a valid payload.
    #[error("snapshot decode error: {0}")]
    Decode(String),

    /// The store could not be serialized.
    #[error("snapshot encode error: {0}")]
    Encode(String),

    /// External data could not be turned into store values.
    #[error("ingest error: {0}")]
    Ingest(#[from] TypeError),
}

impl StoreError {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::UndefinedValue { .. })
    }

    pub fn is_invalid_type(&self) -> bool {
        matches!(self, Self::InvalidType { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
