/// Errors from utility helpers.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UtilError {
    /// A random string was requested from an empty alphabet.
    #[error("alphabet is empty")]
    EmptyAlphabet,
}

pub type UtilResult<T> = Result<T, UtilError>;
