//! Concurrency coordination for kit.
//!
//! - [`DelaySequencer`] paces a retrying caller with Fibonacci backoff.
//! - [`CompletionAggregator`] waits for a known number of concurrent
//!   operations and folds every error they report into one value.
//! - [`FanIn`] and [`spawn_all`] build the completion signal and error
//!   stream for the aggregator from a countdown of remaining operations.
//! - [`CancelToken`] is the cancellation handle (with optional deadline)
//!   threaded through the async helpers here and in `kit-fs`.

pub mod aggregate;
pub mod cancel;
pub mod delay;
pub mod error;

pub use aggregate::{spawn_all, CancelPolicy, CompletionAggregator, FanIn, Reporter};
pub use cancel::CancelToken;
pub use delay::{Attempts, DelayConfig, DelaySequencer, DEFAULT_ATTEMPTS, DEFAULT_WRAP_AROUND};
pub use error::{AggregateError, BoxError, SyncError, SyncResult};
