//! Runs one [`Operation`] off the caller's thread and delivers its outcome
//!
//! [`Executor::execute`] returns immediately. The operation runs on the
//! [`Scheduler`] the executor was built with, its outcome (or its panic,
//! normalized into a failure) is handed to the caller's callback exactly once,
//! unless the returned [`ExecutionHandle`] cancelled it first.

use crate::config::ExecutorConfig;
use crate::execution_handle::{ExecutionHandle, ExecutionState, ExecutionStatus, SettleOnDrop};
use crate::operation::Operation;
use crate::outcome::{ErrorInfo, ErrorKind, Outcome, panic_message};
use crate::scheduler::{self, Scheduler};
use futures::FutureExt;
use snafu::prelude::*;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Failed to submit operation {operation}: {source}"))]
    Submit {
        operation: String,
        source: scheduler::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Executes an operation asynchronously, one invocation per [`execute`](Self::execute) call
///
/// The callback passed to `execute` runs on a runtime worker thread. If it
/// panics, the panic is caught and logged at error level; it is the caller's
/// bug and does not change the invocation's status.
///
/// Panics are caught after the process panic hook has run. The default hook
/// still prints the panic message (and a backtrace under `RUST_BACKTRACE`) to
/// stderr even though the panic is then delivered as a [`Outcome::Failure`].
/// Install a custom hook with [`std::panic::set_hook`] to silence it.
///
/// # Examples
///
/// ```
/// use interactor::{Executor, ExecutionScope, FnOperation, Outcome};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let scope = Arc::new(ExecutionScope::current("example")?);
/// let op = FnOperation::new("answer", |n: u32| async move { Outcome::Success(n + 1) });
/// let executor = Executor::new(Arc::new(op), scope);
///
/// let (tx, rx) = tokio::sync::oneshot::channel();
/// executor.execute(41, move |outcome| {
///     let _ = tx.send(outcome);
/// })?;
///
/// assert_eq!(rx.await?, Outcome::Success(42));
/// # Ok(())
/// # }
/// ```
pub struct Executor<O: Operation> {
    operation: Arc<O>,
    scheduler: Arc<dyn Scheduler>,
    run_timeout: Option<Duration>,
}

impl<O: Operation> Executor<O> {
    #[must_use]
    pub fn new(operation: Arc<O>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            operation,
            scheduler,
            run_timeout: None,
        }
    }

    #[must_use]
    pub fn from_config(
        operation: Arc<O>,
        scheduler: Arc<dyn Scheduler>,
        config: &ExecutorConfig,
    ) -> Self {
        Self {
            operation,
            scheduler,
            run_timeout: config.run_timeout(),
        }
    }

    /// Fail runs that take longer than `timeout` with an [`ErrorKind::Timeout`] failure
    #[must_use]
    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn operation(&self) -> &Arc<O> {
        &self.operation
    }

    /// Run the operation with `params` and deliver its outcome to `on_result`
    ///
    /// Returns as soon as the work is submitted. `params` is moved into the
    /// invocation and dropped once it finishes.
    ///
    /// # Errors
    /// Returns [`Error::Submit`] if the scheduler rejects the work, e.g. because
    /// its scope was shut down. `on_result` is not called in that case.
    pub fn execute<F>(&self, params: O::Params, on_result: F) -> Result<ExecutionHandle>
    where
        F: FnOnce(Outcome<O::Output>) + Send + 'static,
    {
        let execution_id = uuid::Uuid::new_v4().to_string();
        let operation_name = self.operation.name().to_string();
        let state = Arc::new(ExecutionState::new());

        let invocation = Invocation {
            execution_id: execution_id.clone(),
            operation: Arc::clone(&self.operation),
            run_timeout: self.run_timeout,
            guard: SettleOnDrop(Arc::clone(&state)),
        };

        let abort = self
            .scheduler
            .submit(Box::pin(invocation.run(params, on_result)))
            .context(SubmitSnafu {
                operation: operation_name.clone(),
            })?;

        tracing::debug!(
            execution_id = %execution_id,
            operation = %operation_name,
            "Operation submitted"
        );

        Ok(ExecutionHandle::new(execution_id, operation_name, state, abort))
    }
}

impl<O: Operation> Clone for Executor<O> {
    fn clone(&self) -> Self {
        Self {
            operation: Arc::clone(&self.operation),
            scheduler: Arc::clone(&self.scheduler),
            run_timeout: self.run_timeout,
        }
    }
}

impl<O: Operation> std::fmt::Debug for Executor<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("operation", &self.operation.name())
            .field("scheduler", &"<scheduler>")
            .field("run_timeout", &self.run_timeout)
            .finish()
    }
}

/// Everything one submitted task owns
struct Invocation<O: Operation> {
    execution_id: String,
    operation: Arc<O>,
    run_timeout: Option<Duration>,
    guard: SettleOnDrop,
}

impl<O: Operation> Invocation<O> {
    async fn run<F>(self, params: O::Params, on_result: F)
    where
        F: FnOnce(Outcome<O::Output>) + Send + 'static,
    {
        let state = Arc::clone(&self.guard.0);
        if !state.begin() {
            tracing::debug!(execution_id = %self.execution_id, "Cancelled before start");
            return;
        }

        tracing::debug!(
            execution_id = %self.execution_id,
            operation = %self.operation.name(),
            "Operation started"
        );

        let outcome = self.normalized_run(params).await;
        let terminal = if outcome.is_success() {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::Failed
        };

        if !state.finish(terminal) {
            tracing::debug!(execution_id = %self.execution_id, "Cancelled before delivery");
            return;
        }

        tracing::debug!(
            execution_id = %self.execution_id,
            status = %terminal,
            "Delivering outcome"
        );
        deliver(&self.execution_id, on_result, outcome);
        state.settle(terminal);
    }

    /// Run the operation, turning panics and an elapsed deadline into failures
    async fn normalized_run(&self, params: O::Params) -> Outcome<O::Output> {
        let run = AssertUnwindSafe(self.operation.run(params)).catch_unwind();

        let caught = match self.run_timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(caught) => caught,
                Err(_) => {
                    return Outcome::Failure(ErrorInfo::new(
                        ErrorKind::Timeout,
                        format!("operation did not finish within {limit:?}"),
                    ));
                }
            },
            None => run.await,
        };

        caught.unwrap_or_else(|payload| {
            tracing::debug!(
                execution_id = %self.execution_id,
                "Operation panicked, delivering as failure"
            );
            Outcome::Failure(ErrorInfo::from_panic(&*payload))
        })
    }
}

fn deliver<T, F>(execution_id: &str, on_result: F, outcome: Outcome<T>)
where
    F: FnOnce(Outcome<T>),
{
    if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(move || on_result(outcome))) {
        tracing::error!(
            execution_id,
            panic = %panic_message(&*payload),
            "Result callback panicked"
        );
    }
}
