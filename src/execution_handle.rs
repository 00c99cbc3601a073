//! Execution handle for controlling and observing one invocation
//!
//! The [`ExecutionHandle`] is returned by
//! [`Executor::execute`](crate::executor::Executor::execute). It lets the
//! caller cancel the invocation before delivery, inspect its status, or wait
//! for it to settle during shutdown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::AbortHandle;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Execution {execution_id} did not settle within {timeout:?}"))]
    Timeout {
        execution_id: String,
        timeout: Duration,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Lifecycle of a single invocation
///
/// `Created → Running → {Completed, Failed, Cancelled}`. A cancelled
/// invocation may also skip `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ExecutionStatus {
    Created = 0,
    Running = 1,
    Completed = 2,
    Failed = 3,
    Cancelled = 4,
}

impl ExecutionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        match self {
            ExecutionStatus::Created | ExecutionStatus::Running => false,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled => {
                true
            }
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ExecutionStatus::Created,
            1 => ExecutionStatus::Running,
            2 => ExecutionStatus::Completed,
            3 => ExecutionStatus::Failed,
            _ => ExecutionStatus::Cancelled,
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExecutionStatus::Created => "created",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// State shared between the running task and its handle
///
/// Every transition is a single compare-and-swap on `status`, so exactly one
/// of "finish" and "cancel" can win for a given invocation. `settled` is only
/// published after delivery has returned.
#[derive(Debug)]
pub(crate) struct ExecutionState {
    status: AtomicU8,
    settled: watch::Sender<ExecutionStatus>,
}

impl ExecutionState {
    pub(crate) fn new() -> Self {
        let (settled, _) = watch::channel(ExecutionStatus::Created);
        Self {
            status: AtomicU8::new(ExecutionStatus::Created as u8),
            settled,
        }
    }

    pub(crate) fn status(&self) -> ExecutionStatus {
        ExecutionStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Created → Running. Fails if the invocation was cancelled first.
    pub(crate) fn begin(&self) -> bool {
        self.transition(ExecutionStatus::Created, ExecutionStatus::Running)
    }

    /// Running → Completed/Failed. The winner of this swap owns delivery.
    pub(crate) fn finish(&self, terminal: ExecutionStatus) -> bool {
        self.transition(ExecutionStatus::Running, terminal)
    }

    /// Created/Running → Cancelled. No-op once terminal.
    pub(crate) fn cancel(&self) -> bool {
        let mut current = self.status();
        while !current.is_terminal() {
            match self.status.compare_exchange(
                current as u8,
                ExecutionStatus::Cancelled as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = ExecutionStatus::from_u8(actual),
            }
        }
        false
    }

    pub(crate) fn settle(&self, status: ExecutionStatus) {
        self.settled.send_replace(status);
    }

    fn subscribe(&self) -> watch::Receiver<ExecutionStatus> {
        self.settled.subscribe()
    }

    fn transition(&self, from: ExecutionStatus, to: ExecutionStatus) -> bool {
        self.status
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Moves the invocation to `Cancelled` if its task is dropped before settling
///
/// Covers tasks aborted by scope shutdown or runtime teardown, which would
/// otherwise leave waiters hanging on a `Running` invocation.
pub(crate) struct SettleOnDrop(pub(crate) Arc<ExecutionState>);

impl Drop for SettleOnDrop {
    fn drop(&mut self) {
        if self.0.cancel() {
            self.0.settle(ExecutionStatus::Cancelled);
        }
    }
}

/// Handle for controlling and observing one invocation
///
/// Dropping the handle detaches from the invocation; it keeps running and
/// still delivers. Its task stays tracked by the scope it was submitted to.
///
/// # Examples
///
/// ```
/// use interactor::{Executor, ExecutionScope, ExecutionStatus, FnOperation, Outcome};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let scope = Arc::new(ExecutionScope::current("example")?);
/// let slow = FnOperation::new("slow", |ms: u64| async move {
///     tokio::time::sleep(Duration::from_millis(ms)).await;
///     Outcome::Success(ms)
/// });
/// let executor = Executor::new(Arc::new(slow), scope);
///
/// let handle = executor.execute(10_000, |_| unreachable!("cancelled"))?;
/// assert!(handle.cancel());
/// assert_eq!(handle.wait().await, ExecutionStatus::Cancelled);
/// # Ok(())
/// # }
/// ```
pub struct ExecutionHandle {
    execution_id: String,
    operation: String,
    submitted_at: DateTime<Utc>,
    state: Arc<ExecutionState>,
    abort: AbortHandle,
}

impl ExecutionHandle {
    #[must_use]
    pub(crate) fn new(
        execution_id: String,
        operation: String,
        state: Arc<ExecutionState>,
        abort: AbortHandle,
    ) -> Self {
        Self {
            execution_id,
            operation,
            submitted_at: Utc::now(),
            state,
            abort,
        }
    }

    /// Unique id of this invocation, as used in log fields
    #[must_use]
    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    #[must_use]
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    #[must_use]
    pub fn status(&self) -> ExecutionStatus {
        self.state.status()
    }

    /// Cancel the invocation
    ///
    /// Returns `true` if this call cancelled it; the callback will then never
    /// run and the operation is aborted at its next suspension point. Returns
    /// `false` if the invocation already completed, failed or was cancelled,
    /// in which case nothing changes.
    #[must_use = "`false` means the invocation had already settled"]
    pub fn cancel(&self) -> bool {
        if !self.state.cancel() {
            return false;
        }
        self.abort.abort();
        self.state.settle(ExecutionStatus::Cancelled);
        tracing::debug!(
            execution_id = %self.execution_id,
            operation = %self.operation,
            "Execution cancelled"
        );
        true
    }

    /// Wait until the invocation has settled
    ///
    /// For completed and failed invocations this resolves after the result
    /// callback returned.
    pub async fn wait(&self) -> ExecutionStatus {
        let mut settled = self.state.subscribe();
        settled
            .wait_for(|status| status.is_terminal())
            .await
            .map(|status| *status)
            .unwrap_or_else(|_| self.status())
    }

    /// Wait until the invocation has settled, giving up after `timeout`
    ///
    /// # Errors
    /// Returns [`Error::Timeout`] if the invocation is still in flight.
    pub async fn wait_timeout(&self, timeout: Duration) -> Result<ExecutionStatus> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| Error::Timeout {
                execution_id: self.execution_id.clone(),
                timeout,
            })
    }
}

impl fmt::Debug for ExecutionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionHandle")
            .field("execution_id", &self.execution_id)
            .field("operation", &self.operation)
            .field("submitted_at", &self.submitted_at)
            .field("status", &self.status())
            .finish()
    }
}
