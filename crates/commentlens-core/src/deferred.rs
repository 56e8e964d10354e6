//! Deferred tasks with a cancellation handle
//!
//! A task is spawned onto the tokio runtime, optionally after a delay, and
//! receives a [`CancellationToken`] it polls at its own safe points.
//! Cancelling before the delay elapses prevents the task from starting.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawner for deferred work
pub struct DeferredTask;

impl DeferredTask {
    /// Run `f` immediately on the runtime
    pub fn spawn<T, F, Fut>(f: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Self::spawn_after(Duration::ZERO, f)
    }

    /// Run `f` after `delay` unless cancelled first
    pub fn spawn_after<T, F, Fut>(delay: Duration, f: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let token = CancellationToken::new();
        let child = token.clone();

        let join = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::select! {
                    _ = child.cancelled() => return None,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            if child.is_cancelled() {
                return None;
            }
            Some(f(child).await)
        });

        TaskHandle { token, join }
    }
}

/// Handle to a deferred task
pub struct TaskHandle<T> {
    token: CancellationToken,
    join: JoinHandle<Option<T>>,
}

impl<T> TaskHandle<T> {
    /// Request cancellation. Work already in progress decides for itself
    /// when to stop.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token shared with the task, e.g. to wire a signal handler to it
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the task. Returns [`Error::Cancelled`] if it never started.
    pub async fn join(self) -> Result<T> {
        match self.join.await {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(Error::Cancelled),
            Err(e) => Err(Error::internal(format!("deferred task failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_task_runs_to_completion() {
        let handle = DeferredTask::spawn(|_token| async { 40 + 2 });
        assert_eq!(handle.join().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_cancel_before_delay_prevents_start() {
        let handle = DeferredTask::spawn_after(Duration::from_secs(60), |_token| async { 1 });
        handle.cancel();

        assert!(handle.is_cancelled());
        assert!(matches!(handle.join().await, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_running_task_observes_cancellation() {
        let handle = DeferredTask::spawn(|token| async move {
            let mut rounds = 0u32;
            while !token.is_cancelled() && rounds < 1_000 {
                rounds += 1;
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            rounds
        });

        tokio::time::sleep(Duration::from_millis(5)).await;
        handle.cancel();

        let rounds = handle.join().await.unwrap();
        assert!(rounds < 1_000);
    }
}
