//! # kit-util
//!
//! Small helpers shared by kit binaries:
//!
//! - **SecretGenerator**: random strings and secrets from a caller-owned CSPRNG
//! - **check_error / check_error_fatal**: log an error result with context

pub mod check;
pub mod error;
pub mod random;

pub use check::{check_error, check_error_fatal};
pub use error::{UtilError, UtilResult};
pub use random::{SecretGenerator, RANDOM_STRING_ALPHABET, SECRET_LEN};
