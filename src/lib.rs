//! # Interactor - single-shot asynchronous operations
//!
//! Interactor runs one parameterized unit of business logic off the caller's
//! thread and delivers exactly one typed [`Outcome`] to a caller-supplied
//! callback.
//!
//! ## Guarantees
//!
//! - **Exactly-once delivery**: the callback runs once per invocation, after the
//!   operation has fully finished, unless the invocation was cancelled first
//! - **Failure as data**: a panic inside an operation is caught and delivered as
//!   [`Outcome::Failure`] with an [`ErrorKind::Panic`] payload
//! - **Deterministic cancellation**: completion and cancellation race on one
//!   atomic transition; whichever lands first wins
//! - **Owned task lifetime**: every invocation runs inside an application-owned
//!   [`ExecutionScope`] that can drain or abort outstanding work on shutdown
//!
//! ## Core Modules
//!
//! - [`operation`] - The [`Operation`] extension point
//! - [`executor`] - Submission, panic containment and delivery
//! - [`execution_handle`] - Cancellation and status of one invocation
//! - [`scope`] - Task tracking and runtime ownership
//! - [`outcome`] - The success/failure model
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use interactor::{ErrorInfo, ErrorKind, ExecutionScope, Executor, Operation, Outcome};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct LoadBalance;
//!
//! #[async_trait]
//! impl Operation for LoadBalance {
//!     type Params = u64;
//!     type Output = i64;
//!
//!     async fn run(&self, account: u64) -> Outcome<i64> {
//!         if account == 0 {
//!             return Outcome::Failure(ErrorInfo::new(ErrorKind::InvalidInput, "no account"));
//!         }
//!         Outcome::Success(1_250)
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let scope = Arc::new(ExecutionScope::current("app")?);
//! let executor = Executor::new(Arc::new(LoadBalance), scope.clone());
//!
//! let handle = executor.execute(7, |outcome| match outcome {
//!     Outcome::Success(balance) => println!("balance: {balance}"),
//!     Outcome::Failure(info) => eprintln!("failed: {info}"),
//! })?;
//!
//! // Not interested any more? Nothing will be delivered after this.
//! if !handle.cancel() {
//!     println!("already delivered");
//! }
//!
//! scope.shutdown(Duration::from_secs(5)).await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! Scopes and executors can be configured via:
//! - Configuration file (`interactor.yaml`)
//! - Environment variables (prefix: `INTERACTOR__`)
//!
//! See [`config::InteractorConfig`] for available options.

pub mod config;
pub mod execution_handle;
pub mod executor;
pub mod operation;
pub mod outcome;
pub mod scheduler;
pub mod scope;

// Re-export commonly used types for convenience
pub use execution_handle::{ExecutionHandle, ExecutionStatus};
pub use executor::Executor;
pub use operation::{FnOperation, Operation};
pub use outcome::{ErrorInfo, ErrorKind, Outcome};
pub use scheduler::Scheduler;
pub use scope::ExecutionScope;
