use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{UtilError, UtilResult};

/// Characters used by [`SecretGenerator::random_string`]: the URL-safe
/// unreserved set.
pub const RANDOM_STRING_ALPHABET: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-._~";

/// Length of strings produced by [`SecretGenerator::secret`].
pub const SECRET_LEN: usize = 32;

/// Random string generator over an owned RNG.
///
/// The default generator is a `StdRng` seeded from the operating system.
/// Any other [`Rng`] can be supplied with [`SecretGenerator::with_rng`],
/// e.g. a seeded one for reproducible output.
#[derive(Debug)]
pub struct SecretGenerator<R = StdRng> {
    rng: R,
}

impl SecretGenerator<StdRng> {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for SecretGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> SecretGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// `len` characters drawn uniformly from [`RANDOM_STRING_ALPHABET`].
    pub fn random_string(&mut self, len: usize) -> String {
        let alphabet = RANDOM_STRING_ALPHABET.as_bytes();
        (0..len)
            .map(|_| char::from(alphabet[self.rng.gen_range(0..alphabet.len())]))
            .collect()
    }

    /// `len` characters drawn uniformly from `alphabet`.
    pub fn random_string_from(&mut self, len: usize, alphabet: &str) -> UtilResult<String> {
        let chars: Vec<char> = alphabet.chars().collect();
        if chars.is_empty() {
            return Err(UtilError::EmptyAlphabet);
        }
        Ok((0..len)
            .map(|_| chars[self.rng.gen_range(0..chars.len())])
            .collect())
    }

    /// A [`SECRET_LEN`]-character random string.
    pub fn secret(&mut self) -> String {
        self.random_string(SECRET_LEN)
    }
}
