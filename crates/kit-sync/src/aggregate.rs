use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::error::{AggregateError, BoxError, SyncError, SyncResult};

/// When a [`CompletionAggregator`] consults its cancellation token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CancelPolicy {
    /// Only before waiting starts. Once waiting, the aggregator runs until
    /// completion or until the error stream closes.
    #[default]
    AtEntry,
    /// Before waiting and while waiting.
    Throughout,
}

/// Fan-in wait over a known number of concurrent operations.
///
/// Waits on a one-shot completion signal and a multi-producer error stream.
/// Errors are never fail-fast: every error received before the wait ends
/// is folded into one [`AggregateError`].
#[derive(Clone, Debug)]
pub struct CompletionAggregator {
    label: String,
    operations: usize,
    policy: CancelPolicy,
}

impl CompletionAggregator {
    /// `label` prefixes the combined error message; use the singular form
    /// ("upload", not "uploads").
    pub fn new(label: impl Into<String>, operations: usize) -> Self {
        Self {
            label: label.into(),
            operations,
            policy: CancelPolicy::default(),
        }
    }

    pub fn with_cancel_policy(mut self, policy: CancelPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn operations(&self) -> usize {
        self.operations
    }

    /// Wait until `done` fires or `errors` closes.
    ///
    /// A dropped `done` sender counts as firing. When `done` fires, errors
    /// already queued on `errors` are still collected. Neither channel is
    /// touched if the operation count is zero or `cancel` is already
    /// cancelled.
    pub async fn wait<E>(
        &self,
        cancel: &CancelToken,
        mut done: oneshot::Receiver<()>,
        mut errors: mpsc::Receiver<E>,
    ) -> SyncResult<()>
    where
        E: Into<BoxError>,
    {
        if self.operations < 1 {
            return Err(SyncError::InvalidOperationCount {
                label: self.label.clone(),
                count: self.operations,
            });
        }
        cancel.check()?;

        let watch_cancel = self.policy == CancelPolicy::Throughout;
        let mut collected: Vec<BoxError> = Vec::new();

        loop {
            tokio::select! {
                biased;

                received = errors.recv() => match received {
                    Some(err) => collected.push(err.into()),
                    None => {
                        debug!(label = %self.label, "error stream closed");
                        break;
                    }
                },
                _ = &mut done => {
                    while let Ok(err) = errors.try_recv() {
                        collected.push(err.into());
                    }
                    debug!(label = %self.label, "operations completed");
                    break;
                }
                err = cancel.cancelled(), if watch_cancel => {
                    warn!(
                        label = %self.label,
                        collected = collected.len(),
                        "wait cancelled; collected errors dropped"
                    );
                    return Err(err);
                }
            }
        }

        if collected.is_empty() {
            Ok(())
        } else {
            debug!(label = %self.label, errors = collected.len(), "operations reported errors");
            Err(AggregateError::new(self.label.clone(), collected).into())
        }
    }
}

/// Countdown shared by the [`Reporter`]s of one [`FanIn`].
struct Countdown {
    remaining: AtomicUsize,
    done: Mutex<Option<oneshot::Sender<()>>>,
}

impl Countdown {
    fn finish_one(&self) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            let sender = self
                .done
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(sender) = sender {
                // The waiter may already have returned.
                let _ = sender.send(());
            }
        }
    }
}

/// Completion handle for exactly one operation of a [`FanIn`].
///
/// Calling [`report`](Self::report) or dropping the reporter marks the
/// operation finished. An error is queued before the operation is counted,
/// so the waiter always sees it.
pub struct Reporter<E> {
    countdown: Arc<Countdown>,
    errors: mpsc::Sender<E>,
}

impl<E> Reporter<E> {
    /// Record the operation's outcome and mark it finished.
    pub fn report(self, result: Result<(), E>) {
        if let Err(err) = result {
            // Capacity equals the number of reporters and each reports once,
            // so the only failure is a waiter that has already gone away.
            if self.errors.try_send(err).is_err() {
                debug!("fan-in waiter gone; error discarded");
            }
        }
    }
}

impl<E> Drop for Reporter<E> {
    fn drop(&mut self) {
        self.countdown.finish_one();
    }
}

/// Explicit completion state machine feeding a [`CompletionAggregator`].
///
/// Hands out one [`Reporter`] per operation; the last report fires the
/// completion signal.
pub struct FanIn<E> {
    aggregator: CompletionAggregator,
    done: oneshot::Receiver<()>,
    errors: mpsc::Receiver<E>,
}

impl<E> FanIn<E>
where
    E: Into<BoxError>,
{
    /// Create the wait side and `operations` reporters.
    pub fn new(label: impl Into<String>, operations: usize) -> SyncResult<(Self, Vec<Reporter<E>>)> {
        let label = label.into();
        if operations < 1 {
            return Err(SyncError::InvalidOperationCount {
                label,
                count: operations,
            });
        }

        let (done_tx, done_rx) = oneshot::channel();
        let (errors_tx, errors_rx) = mpsc::channel(operations);
        let countdown = Arc::new(Countdown {
            remaining: AtomicUsize::new(operations),
            done: Mutex::new(Some(done_tx)),
        });

        let reporters = (0..operations)
            .map(|_| Reporter {
                countdown: Arc::clone(&countdown),
                errors: errors_tx.clone(),
            })
            .collect();

        let fan_in = Self {
            aggregator: CompletionAggregator::new(label, operations),
            done: done_rx,
            errors: errors_rx,
        };
        Ok((fan_in, reporters))
    }

    pub fn with_cancel_policy(mut self, policy: CancelPolicy) -> Self {
        self.aggregator = self.aggregator.with_cancel_policy(policy);
        self
    }

    /// Wait for every reporter; see [`CompletionAggregator::wait`].
    pub async fn wait(self, cancel: &CancelToken) -> SyncResult<()> {
        self.aggregator.wait(cancel, self.done, self.errors).await
    }
}

/// Run every operation on its own tokio task and aggregate their errors.
///
/// A task that panics is reported as an error. Nothing is spawned if
/// `operations` is empty or `cancel` is already cancelled.
pub async fn spawn_all<F, E>(
    cancel: &CancelToken,
    label: impl Into<String>,
    operations: Vec<F>,
) -> SyncResult<()>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    let (fan_in, reporters) = FanIn::<BoxError>::new(label, operations.len())?;
    cancel.check()?;

    for (operation, reporter) in operations.into_iter().zip(reporters) {
        let task = tokio::spawn(operation);
        tokio::spawn(async move {
            let outcome = match task.await {
                Ok(result) => result.map_err(Into::into),
                Err(join_err) => Err(BoxError::from(join_err.to_string())),
            };
            reporter.report(outcome);
        });
    }

    fan_in.wait(cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn channels<E>(capacity: usize) -> (
        oneshot::Sender<()>,
        oneshot::Receiver<()>,
        mpsc::Sender<E>,
        mpsc::Receiver<E>,
    ) {
        let (done_tx, done_rx) = oneshot::channel();
        let (err_tx, err_rx) = mpsc::channel(capacity);
        (done_tx, done_rx, err_tx, err_rx)
    }

    // -----------------------------------------------------------------------
    // CompletionAggregator
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn zero_operations_rejected() {
        let (_done_tx, done_rx, _err_tx, err_rx) = channels::<String>(1);
        let err = CompletionAggregator::new("worker", 0)
            .wait(&CancelToken::new(), done_rx, err_rx)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidOperationCount { count: 0, .. }));
    }

    #[tokio::test]
    async fn all_errors_before_completion_are_combined() {
        let (done_tx, done_rx, err_tx, err_rx) = channels::<String>(5);
        let aggregator = CompletionAggregator::new("worker", 3);

        let mut workers = Vec::new();
        for id in 0..3 {
            let err_tx = err_tx.clone();
            workers.push(tokio::spawn(async move {
                err_tx.send(format!("failure {id}")).await.unwrap();
            }));
        }
        drop(err_tx);
        tokio::spawn(async move {
            for worker in workers {
                worker.await.unwrap();
            }
            let _ = done_tx.send(());
        });

        let err = aggregator
            .wait(&CancelToken::new(), done_rx, err_rx)
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("worker "));
        for id in 0..3 {
            assert!(message.contains(&format!("failure {id}")), "{message}");
        }
        match err {
            SyncError::Aggregate(agg) => assert_eq!(agg.len(), 3),
            other => panic!("expected aggregate, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn completion_without_errors_is_ok() {
        let (done_tx, done_rx, _err_tx, err_rx) = channels::<String>(1);
        done_tx.send(()).unwrap();
        let result = CompletionAggregator::new("worker", 3)
            .wait(&CancelToken::new(), done_rx, err_rx)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn queued_errors_drained_after_completion() {
        let (done_tx, done_rx, err_tx, err_rx) = channels::<&'static str>(4);
        err_tx.send("late but queued").await.unwrap();
        done_tx.send(()).unwrap();

        let err = CompletionAggregator::new("job", 1)
            .wait(&CancelToken::new(), done_rx, err_rx)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "job late but queued");
    }

    #[tokio::test]
    async fn dropped_done_sender_counts_as_completion() {
        let (done_tx, done_rx, _err_tx, err_rx) = channels::<String>(1);
        drop(done_tx);
        let result = CompletionAggregator::new("job", 2)
            .wait(&CancelToken::new(), done_rx, err_rx)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn closed_error_stream_ends_wait() {
        let (_done_tx, done_rx, err_tx, err_rx) = channels::<String>(2);
        err_tx.send("boom".into()).await.unwrap();
        drop(err_tx);

        let err = CompletionAggregator::new("job", 2)
            .wait(&CancelToken::new(), done_rx, err_rx)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "job boom");
    }

    #[tokio::test]
    async fn cancelled_at_entry_leaves_channels_untouched() {
        let (_done_tx, done_rx, err_tx, err_rx) = channels::<String>(2);
        err_tx.send("unread".into()).await.unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = CompletionAggregator::new("job", 1)
            .wait(&cancel, done_rx, err_rx)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn at_entry_policy_ignores_mid_wait_cancellation() {
        let (done_tx, done_rx, _err_tx, err_rx) = channels::<String>(1);
        let cancel = CancelToken::new().with_timeout(Duration::from_secs(1));

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            let _ = done_tx.send(());
        });

        let result = CompletionAggregator::new("job", 1)
            .wait(&cancel, done_rx, err_rx)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn throughout_policy_aborts_mid_wait() {
        let (_done_tx, done_rx, _err_tx, err_rx) = channels::<String>(1);
        let cancel = CancelToken::new().with_timeout(Duration::from_secs(1));

        let err = CompletionAggregator::new("job", 1)
            .with_cancel_policy(CancelPolicy::Throughout)
            .wait(&cancel, done_rx, err_rx)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::DeadlineExceeded));
    }

    // -----------------------------------------------------------------------
    // FanIn
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn fan_in_fires_after_last_report() {
        let (fan_in, mut reporters) = FanIn::<String>::new("step", 3).unwrap();
        let last = reporters.pop().unwrap();
        for reporter in reporters {
            reporter.report(Ok(()));
        }

        let waiter = tokio::spawn(async move { fan_in.wait(&CancelToken::new()).await });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        last.report(Err("step three failed".to_string()));
        let err = waiter.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "step step three failed");
    }

    #[tokio::test]
    async fn fan_in_dropped_reporter_counts() {
        let (fan_in, reporters) = FanIn::<String>::new("step", 2).unwrap();
        drop(reporters);
        assert!(fan_in.wait(&CancelToken::new()).await.is_ok());
    }

    #[test]
    fn fan_in_rejects_zero() {
        assert!(matches!(
            FanIn::<String>::new("step", 0),
            Err(SyncError::InvalidOperationCount { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // spawn_all
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn spawn_all_collects_every_failure() {
        let operations: Vec<_> = (0..5u32)
            .map(|i| async move {
                tokio::task::yield_now().await;
                if i % 2 == 0 {
                    Err(format!("op {i} failed"))
                } else {
                    Ok(())
                }
            })
            .collect();

        let err = spawn_all(&CancelToken::new(), "op", operations)
            .await
            .unwrap_err();
        let SyncError::Aggregate(agg) = err else {
            panic!("expected aggregate error");
        };
        assert_eq!(agg.len(), 3);
        let message = agg.to_string();
        for i in [0, 2, 4] {
            assert!(message.contains(&format!("op {i} failed")));
        }
    }

    #[tokio::test]
    async fn spawn_all_reports_panics() {
        let operations = vec![async {
            if true {
                panic!("exploded");
            }
            Ok::<(), String>(())
        }];
        let err = spawn_all(&CancelToken::new(), "task", operations)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Aggregate(_)));
    }

    #[tokio::test]
    async fn spawn_all_success() {
        let operations: Vec<_> = (0..4).map(|_| async { Ok::<(), String>(()) }).collect();
        assert!(spawn_all(&CancelToken::new(), "task", operations).await.is_ok());
    }

    #[tokio::test]
    async fn spawn_all_empty_is_invalid() {
        let operations: Vec<std::future::Ready<Result<(), String>>> = Vec::new();
        let err = spawn_all(&CancelToken::new(), "task", operations)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidOperationCount { count: 0, .. }));
    }
}
