use async_trait::async_trait;
use clap::Parser;
use console::style;
use interactor::config::InteractorConfig;
use interactor::{ExecutionScope, Executor, Operation, Outcome};
use snafu::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

use super::{ExecuteSnafu, Result, ScopeSnafu, print_outcome, print_submitted, print_undelivered};

#[derive(Parser, Debug)]
pub struct SleepArgs {
    /// How long the operation sleeps before succeeding
    #[arg(long, value_name = "MILLIS", default_value_t = 1000)]
    pub millis: u64,

    /// Cancel the invocation after this many milliseconds
    #[arg(long, value_name = "MILLIS")]
    pub cancel_after_ms: Option<u64>,
}

/// Sleeps for the given number of milliseconds and reports it back
struct Nap;

#[async_trait]
impl Operation for Nap {
    type Params = u64;
    type Output = u64;

    async fn run(&self, millis: u64) -> Outcome<u64> {
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Outcome::Success(millis)
    }

    fn name(&self) -> &str {
        "sleep"
    }
}

pub async fn handle_sleep(args: SleepArgs, config: &InteractorConfig) -> Result<()> {
    let scope = Arc::new(ExecutionScope::current("cli").context(ScopeSnafu)?);
    let executor = Executor::from_config(Arc::new(Nap), scope.clone(), &config.executor);

    let (tx, mut rx) = oneshot::channel();
    let handle = executor
        .execute(args.millis, move |outcome| {
            let _ = tx.send(outcome);
        })
        .context(ExecuteSnafu)?;
    print_submitted(&handle);

    if let Some(after) = args.cancel_after_ms {
        tokio::time::sleep(Duration::from_millis(after)).await;
        if handle.cancel() {
            println!("{} Cancelled after {}ms", style("→").cyan(), after);
        }
    }

    let status = handle.wait().await;
    tracing::debug!(execution_id = %handle.execution_id(), %status, "Execution settled");

    match rx.try_recv() {
        Ok(outcome) => print_outcome(&outcome)?,
        Err(_) => print_undelivered(&handle),
    }

    scope.shutdown(config.scope.shutdown_grace()).await;
    Ok(())
}
