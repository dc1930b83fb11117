//! Auth bridge: runs account-side operations on a bounded worker pool.
//!
//! [`AuthBridge::submit`] spawns the operation at once and hands back an
//! [`AuthTask`]. At most `workers` operations run at a time; with one worker
//! every auth call in the process is serialized. Waiting is always bounded:
//! an operation still running when the timeout expires is aborted.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::{BridgeError, ChatId};

// ─── AuthBridge ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct AuthBridge {
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl AuthBridge {
    /// `workers` is clamped to at least one.
    pub fn new(workers: usize, timeout: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start `fut` on the pool. `op` names it in logs and errors.
    pub fn submit<F, T>(&self, op: &'static str, chat: ChatId, fut: F) -> AuthTask<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permits = self.permits.clone();
        let handle = tokio::spawn(async move {
            let _permit = permits.acquire_owned().await;
            log::debug!("[sessiongate] chat {chat}: {op} running");
            fut.await
        });
        AuthTask { op, chat, handle, timeout: self.timeout }
    }
}

// ─── AuthTask ─────────────────────────────────────────────────────────────────

/// Handle to one submitted operation.
///
/// Dropping the handle does not stop the operation; call [`AuthTask::cancel`].
pub struct AuthTask<T> {
    op:      &'static str,
    chat:    ChatId,
    handle:  JoinHandle<T>,
    timeout: Duration,
}

impl<T> AuthTask<T> {
    pub fn op(&self) -> &'static str {
        self.op
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Abort the operation. A later [`AuthTask::wait`] reports
    /// [`BridgeError::Cancelled`] unless it had already completed.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Wait for the result, at most the bridge's timeout.
    pub async fn wait(self) -> Result<T, BridgeError> {
        let limit = self.timeout;
        self.wait_for(limit).await
    }

    /// Wait for the result, at most `limit`. On expiry the operation is aborted.
    pub async fn wait_for(mut self, limit: Duration) -> Result<T, BridgeError> {
        let op = self.op;
        match tokio::time::timeout(limit, &mut self.handle).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) if e.is_cancelled() => Err(BridgeError::Cancelled { op }),
            Ok(Err(_)) => Err(BridgeError::Panicked { op }),
            Err(_) => {
                self.handle.abort();
                log::warn!("[sessiongate] chat {}: {op} timed out after {limit:?}, aborted", self.chat);
                Err(BridgeError::Timeout { op, after: limit })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn returns_operation_result() {
        let bridge = AuthBridge::new(2, Duration::from_secs(5));
        let task = bridge.submit("add", 1, async { 40 + 2 });
        assert_eq!(task.wait().await.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_and_aborts() {
        let bridge = AuthBridge::new(1, Duration::from_secs(3));
        let task = bridge.submit("hang", 1, async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        match task.wait().await {
            Err(BridgeError::Timeout { op, after }) => {
                assert_eq!(op, "hang");
                assert_eq!(after, Duration::from_secs(3));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancel_is_reported() {
        let bridge = AuthBridge::new(1, Duration::from_secs(60));
        let task = bridge.submit("slow", 1, std::future::pending::<()>());
        task.cancel();
        assert!(matches!(task.wait().await, Err(BridgeError::Cancelled { op: "slow" })));
    }

    #[tokio::test]
    async fn panic_is_reported() {
        let bridge = AuthBridge::new(1, Duration::from_secs(60));
        let task = bridge.submit("boom", 1, async {
            let missing: Option<()> = None;
            missing.expect("boom")
        });
        assert!(matches!(task.wait().await, Err(BridgeError::Panicked { op: "boom" })));
    }

    #[tokio::test(start_paused = true)]
    async fn single_worker_serializes() {
        let bridge = AuthBridge::new(1, Duration::from_secs(60));
        let running = Arc::new(AtomicUsize::new(0));
        let peak    = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..4).map(|chat| {
            let running = running.clone();
            let peak    = peak.clone();
            bridge.submit("op", chat, async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            })
        }).collect();

        for t in tasks { t.wait().await.unwrap(); }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}
