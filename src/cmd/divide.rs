use async_trait::async_trait;
use clap::Parser;
use interactor::config::InteractorConfig;
use interactor::{ExecutionScope, Executor, Operation, Outcome};
use snafu::prelude::*;
use std::sync::Arc;
use tokio::sync::oneshot;

use super::{ExecuteSnafu, Result, ScopeSnafu, print_outcome, print_submitted, print_undelivered};

#[derive(Parser, Debug)]
pub struct DivideArgs {
    /// Dividend
    #[arg(long, allow_hyphen_values = true)]
    pub numerator: i64,

    /// Divisor; zero makes the operation panic, which is delivered as a failure
    #[arg(long, allow_hyphen_values = true)]
    pub denominator: i64,
}

/// Integer division with no guard against a zero divisor
struct Divide;

#[async_trait]
impl Operation for Divide {
    type Params = (i64, i64);
    type Output = i64;

    async fn run(&self, params: (i64, i64)) -> Outcome<i64> {
        let (numerator, denominator) = params;
        Outcome::Success(numerator / denominator)
    }

    fn name(&self) -> &str {
        "divide"
    }
}

pub async fn handle_divide(args: DivideArgs, config: &InteractorConfig) -> Result<()> {
    let scope = Arc::new(ExecutionScope::current("cli").context(ScopeSnafu)?);
    let executor = Executor::from_config(Arc::new(Divide), scope.clone(), &config.executor);

    let (tx, rx) = oneshot::channel();
    let handle = executor
        .execute((args.numerator, args.denominator), move |outcome| {
            let _ = tx.send(outcome);
        })
        .context(ExecuteSnafu)?;
    print_submitted(&handle);

    match rx.await {
        Ok(outcome) => print_outcome(&outcome)?,
        Err(_) => print_undelivered(&handle),
    }

    scope.shutdown(config.scope.shutdown_grace()).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use interactor::ErrorKind;

    #[tokio::test]
    async fn test_divide_operation() {
        assert_eq!(Divide.run((84, -2)).await, Outcome::Success(-42));
    }

    #[tokio::test]
    async fn test_zero_denominator_is_delivered_not_raised() {
        let scope = Arc::new(ExecutionScope::current("divide-test").unwrap());
        let executor = Executor::new(Arc::new(Divide), scope);
        let (tx, rx) = oneshot::channel();
        executor
            .execute((84, 0), move |outcome| {
                let _ = tx.send(outcome);
            })
            .unwrap();
        assert_eq!(rx.await.unwrap().failure().unwrap().kind, ErrorKind::Panic);

        let args = DivideArgs {
            numerator: 84,
            denominator: 0,
        };
        handle_divide(args, &InteractorConfig::default()).await.unwrap();
    }
}
