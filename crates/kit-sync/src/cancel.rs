use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{SyncError, SyncResult};

/// Cloneable cancellation handle with an optional deadline.
///
/// Clones share the cancel flag. [`CancelToken::with_timeout`] and
/// [`CancelToken::with_deadline`] derive a token that shares the flag but
/// expires no later than the given instant.
#[derive(Clone, Debug)]
pub struct CancelToken {
    flag: Arc<watch::Sender<bool>>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that is never cancelled unless [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag: Arc::new(flag),
            deadline: None,
        }
    }

    /// Derive a token that also expires at `deadline`.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        };
        Self {
            flag: Arc::clone(&self.flag),
            deadline: Some(deadline),
        }
    }

    /// Derive a token that also expires after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Cancel this token and every clone or derivative of it.
    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.check().is_err()
    }

    /// `Ok` while the token is live; the cancellation error otherwise.
    pub fn check(&self) -> SyncResult<()> {
        if *self.flag.borrow() {
            return Err(SyncError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(SyncError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Resolve once the token is cancelled or its deadline passes.
    pub async fn cancelled(&self) -> SyncError {
        if let Err(err) = self.check() {
            return err;
        }

        let mut rx = self.flag.subscribe();
        let flagged = async move {
            loop {
                if *rx.borrow_and_update() {
                    return;
                }
                // The sender lives in `self`, so the channel cannot close here.
                if rx.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        };
        let expiry = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            () = flagged => SyncError::Canceled,
            () = expiry => SyncError::DeadlineExceeded,
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
