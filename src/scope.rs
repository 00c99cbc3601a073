//! Application-owned execution scope
//!
//! An [`ExecutionScope`] tracks every task submitted through it so that the
//! application can drain or abort outstanding work on shutdown. It either
//! borrows an existing tokio runtime through its [`Handle`] or owns a
//! dedicated one built from [`ScopeConfig`].

use crate::config::ScopeConfig;
use crate::scheduler::{self, Scheduler, Task};
use snafu::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};
use tokio::task::{AbortHandle, JoinSet};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("No tokio runtime is running on this thread: {source}"))]
    NoRuntime {
        source: tokio::runtime::TryCurrentError,
    },

    #[snafu(display("Failed to build runtime for scope '{scope}': {source}"))]
    Runtime {
        scope: String,
        source: std::io::Error,
    },

    #[snafu(display("Scope '{scope}' does not own its runtime"))]
    NotOwned { scope: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Tracks and owns the tasks launched by executors
///
/// # Examples
///
/// ```
/// use interactor::{Executor, ExecutionScope, FnOperation, Outcome};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let scope = Arc::new(ExecutionScope::current("app")?);
/// let op = Arc::new(FnOperation::new("echo", |s: String| async move { Outcome::Success(s) }));
/// let executor = Executor::new(op, scope.clone());
///
/// let _handle = executor.execute("hi".to_string(), |outcome| println!("{outcome:?}"))?;
///
/// // On application teardown
/// let aborted = scope.shutdown(Duration::from_secs(5)).await;
/// assert_eq!(aborted, 0);
/// # Ok(())
/// # }
/// ```
pub struct ExecutionScope {
    name: String,
    handle: Handle,
    runtime: Mutex<Option<Runtime>>,
    tasks: Mutex<JoinSet<()>>,
    closed: AtomicBool,
}

impl ExecutionScope {
    /// Create a scope on the runtime of the calling thread
    ///
    /// # Errors
    /// Returns an error if called outside a tokio runtime.
    pub fn current(name: impl Into<String>) -> Result<Self> {
        let handle = Handle::try_current().context(NoRuntimeSnafu)?;
        Ok(Self::from_handle(name, handle))
    }

    /// Create a scope that spawns onto an existing runtime
    #[must_use]
    pub fn from_handle(name: impl Into<String>, handle: Handle) -> Self {
        let name = name.into();
        tracing::info!(scope = %name, "Execution scope created on existing runtime");
        Self {
            name,
            handle,
            runtime: Mutex::new(None),
            tasks: Mutex::new(JoinSet::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Create a scope that owns a dedicated multi-threaded runtime
    ///
    /// Use this when the caller has no runtime of its own. Tear it down with
    /// [`shutdown_blocking`](Self::shutdown_blocking) from a non-async thread.
    ///
    /// # Errors
    /// Returns an error if the runtime cannot be built.
    pub fn with_runtime(name: impl Into<String>, config: &ScopeConfig) -> Result<Self> {
        let name = name.into();
        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder.enable_all().thread_name(config.thread_name.clone());
        if let Some(threads) = config.worker_threads {
            builder.worker_threads(threads);
        }
        let runtime = builder.build().context(RuntimeSnafu { scope: name.clone() })?;

        tracing::info!(
            scope = %name,
            worker_threads = ?config.worker_threads,
            "Execution scope created with dedicated runtime"
        );

        Ok(Self {
            name,
            handle: runtime.handle().clone(),
            runtime: Mutex::new(Some(runtime)),
            tasks: Mutex::new(JoinSet::new()),
            closed: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of submitted tasks that have not finished yet
    #[must_use]
    pub fn active_tasks(&self) -> usize {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        reap_finished(&mut tasks);
        tasks.len()
    }

    /// Close the scope, wait up to `grace` for outstanding tasks, then abort the rest
    ///
    /// Returns the number of tasks that had to be aborted. Aborted invocations
    /// end up `Cancelled` and never deliver. Calling this twice is harmless.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        let mut tasks = {
            let mut guard = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            self.closed.store(true, Ordering::Release);
            std::mem::take(&mut *guard)
        };

        tracing::info!(
            scope = %self.name,
            outstanding = tasks.len(),
            "Shutting down execution scope"
        );

        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = tasks.join_next().await {
                log_join_failure(&self.name, joined);
            }
        })
        .await;

        if drained.is_ok() {
            return 0;
        }

        let aborted = tasks.len();
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}

        tracing::warn!(
            scope = %self.name,
            aborted,
            grace_ms = grace.as_millis(),
            "Grace period elapsed, aborted outstanding tasks"
        );
        aborted
    }

    /// Shut down a scope built with [`with_runtime`](Self::with_runtime) and stop its runtime
    ///
    /// Must be called from outside any async context.
    ///
    /// # Errors
    /// Returns [`Error::NotOwned`] if the scope borrows someone else's runtime.
    pub fn shutdown_blocking(&self, grace: Duration) -> Result<usize> {
        let runtime = self
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .context(NotOwnedSnafu {
                scope: self.name.clone(),
            })?;

        let aborted = runtime.block_on(self.shutdown(grace));
        runtime.shutdown_timeout(grace);
        Ok(aborted)
    }
}

impl Scheduler for ExecutionScope {
    fn submit(&self, task: Task) -> scheduler::Result<AbortHandle> {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        ensure!(
            !self.closed.load(Ordering::Acquire),
            scheduler::ClosedSnafu {
                scope: self.name.clone()
            }
        );
        reap_finished(&mut tasks);
        Ok(tasks.spawn_on(task, &self.handle))
    }
}

impl Drop for ExecutionScope {
    fn drop(&mut self) {
        let runtime = self
            .runtime
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(runtime) = runtime {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for ExecutionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionScope")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .field("tasks", &"<join set>")
            .finish()
    }
}

fn reap_finished(tasks: &mut JoinSet<()>) {
    while let Some(joined) = tasks.try_join_next() {
        if let Err(e) = joined {
            tracing::debug!("Reaped task ended abnormally: {}", e);
        }
    }
}

fn log_join_failure(scope: &str, joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            tracing::error!(scope, "Task panicked outside result normalization: {}", e);
        }
    }
}
