use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::SyncResult;

/// Default finite retry budget.
pub const DEFAULT_ATTEMPTS: u32 = 5;
/// Default Fibonacci index cap for infinite mode.
pub const DEFAULT_WRAP_AROUND: u32 = 11;
/// Largest index whose Fibonacci number fits in a `u64`.
const MAX_FIB_INDEX: u64 = 93;

/// Retry budget of a [`DelaySequencer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempts {
    /// Report exhaustion after this many delays.
    Finite(u32),
    /// Never exhaust; cycle the index at the wrap-around bound instead.
    Infinite,
}

/// Serializable sequencer settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    /// Finite retry budget; ignored when `infinite` is set.
    pub attempts: u32,
    pub infinite: bool,
    /// Index cap used in infinite mode.
    pub wrap_around: u32,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            infinite: false,
            wrap_around: DEFAULT_WRAP_AROUND,
        }
    }
}

/// Fibonacci backoff generator.
///
/// Successive delays are `fib(1), fib(2), fib(3), ...` seconds, i.e.
/// 1s, 1s, 2s, 3s, 5s, ...
///
/// - **Finite**: once `attempts` delays have been produced the next call
///   returns `None` and restarts the sequence.
/// - **Infinite**: past `wrap_around` the index silently restarts at 1;
///   every call produces a delay.
///
/// Fibonacci numbers are memoized in a table that never grows past the
/// effective index bound, and are kept across [`reset`](Self::reset).
#[derive(Clone, Debug)]
pub struct DelaySequencer {
    fib: Vec<u64>,
    attempts: Attempts,
    wrap_around: u32,
    counter: u64,
}

impl DelaySequencer {
    /// A finite sequencer with the default budget and wrap-around.
    pub fn new() -> Self {
        Self {
            fib: vec![0, 1],
            attempts: Attempts::Finite(DEFAULT_ATTEMPTS),
            wrap_around: DEFAULT_WRAP_AROUND,
            counter: 1,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = Attempts::Finite(attempts);
        self
    }

    pub fn infinite(mut self) -> Self {
        self.attempts = Attempts::Infinite;
        self
    }

    pub fn with_wrap_around(mut self, wrap_around: u32) -> Self {
        self.wrap_around = wrap_around;
        self
    }

    pub fn from_config(config: &DelayConfig) -> Self {
        let sequencer = Self::new().with_wrap_around(config.wrap_around);
        if config.infinite {
            sequencer.infinite()
        } else {
            sequencer.with_attempts(config.attempts)
        }
    }

    pub fn attempts(&self) -> Attempts {
        self.attempts
    }

    pub fn wrap_around(&self) -> u32 {
        self.wrap_around
    }

    /// Index of the next delay (starts at 1).
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Next delay, or `None` once a finite budget is spent.
    pub fn get_delay(&mut self) -> Option<Duration> {
        match self.attempts {
            Attempts::Finite(limit) if self.counter > u64::from(limit) => {
                debug!(attempts = limit, "delay budget exhausted");
                self.reset();
                return None;
            }
            Attempts::Infinite if self.counter > u64::from(self.wrap_around) => {
                debug!(wrap_around = self.wrap_around, "delay index wrapped");
                self.reset();
            }
            _ => {}
        }

        let secs = self.fibonacci(self.counter);
        self.counter += 1;
        Some(Duration::from_secs(secs))
    }

    /// Block the current thread for the next delay.
    ///
    /// Returns `false`, without sleeping, once the budget is spent.
    pub fn delay(&mut self) -> bool {
        match self.get_delay() {
            Some(duration) => {
                std::thread::sleep(duration);
                true
            }
            None => false,
        }
    }

    /// Async form of [`delay`](Self::delay).
    pub async fn delay_async(&mut self) -> bool {
        match self.get_delay() {
            Some(duration) => {
                tokio::time::sleep(duration).await;
                true
            }
            None => false,
        }
    }

    /// [`delay_async`](Self::delay_async) that gives up early when `cancel`
    /// fires.
    pub async fn delay_cancellable(&mut self, cancel: &CancelToken) -> SyncResult<bool> {
        cancel.check()?;
        let Some(duration) = self.get_delay() else {
            return Ok(false);
        };
        tokio::select! {
            () = tokio::time::sleep(duration) => Ok(true),
            err = cancel.cancelled() => Err(err),
        }
    }

    /// Restart the sequence at index 1.
    pub fn reset(&mut self) {
        self.counter = 1;
    }

    fn fibonacci(&mut self, n: u64) -> u64 {
        if n > MAX_FIB_INDEX {
            return u64::MAX;
        }
        // n <= MAX_FIB_INDEX, so the table stays small.
        let n = n as usize;
        while self.fib.len() <= n {
            let len = self.fib.len();
            self.fib.push(self.fib[len - 1].saturating_add(self.fib[len - 2]));
        }
        self.fib[n]
    }
}

impl Default for DelaySequencer {
    fn default() -> Self {
        Self::new()
    }
}
