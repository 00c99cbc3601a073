//! Scheduling seam between the executor and the application's runtime
//!
//! The executor never spawns on an implicit global runtime. It submits each
//! invocation to a [`Scheduler`] handed to it at construction time, normally
//! an [`ExecutionScope`](crate::scope::ExecutionScope) owned by the
//! surrounding application.

use futures::future::BoxFuture;
use snafu::prelude::*;
use tokio::task::AbortHandle;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Scope '{scope}' is closed and accepts no new tasks"))]
    Closed { scope: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// A unit of work submitted by the executor
pub type Task = BoxFuture<'static, ()>;

/// Pluggable execution context for submitted tasks
pub trait Scheduler: Send + Sync {
    /// Spawn `task` and return a handle that can abort it
    ///
    /// # Errors
    /// Returns [`Error::Closed`] if the scheduler no longer accepts work.
    fn submit(&self, task: Task) -> Result<AbortHandle>;
}
