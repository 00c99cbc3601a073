use console::style;
use interactor::{ExecutionHandle, Outcome};
use serde::Serialize;
use snafu::prelude::*;

pub mod divide;
pub mod sleep;

pub use divide::{DivideArgs, handle_divide};
pub use sleep::{SleepArgs, handle_sleep};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Scope error: {source}"))]
    Scope { source: interactor::scope::Error },

    #[snafu(display("Execution error: {source}"))]
    Execute { source: interactor::executor::Error },

    #[snafu(display("JSON serialization error: {source}"))]
    Json { source: serde_json::Error },
}

pub type Result<T> = std::result::Result<T, Error>;

fn print_submitted(handle: &ExecutionHandle) {
    println!(
        "{} Submitted {} as {}",
        style("→").cyan(),
        style(handle.operation()).bold(),
        handle.execution_id()
    );
}

fn print_outcome<T: Serialize>(outcome: &Outcome<T>) -> Result<()> {
    let rendered = serde_json::to_string_pretty(outcome).context(JsonSnafu)?;
    match outcome {
        Outcome::Success(_) => println!("{} Delivered success", style("✓").green()),
        Outcome::Failure(_) => println!("{} Delivered failure", style("✗").red()),
    }
    println!("{rendered}");
    Ok(())
}

fn print_undelivered(handle: &ExecutionHandle) {
    println!(
        "{} Nothing delivered for {} (status: {})",
        style("•").yellow(),
        handle.execution_id(),
        handle.status()
    );
}
