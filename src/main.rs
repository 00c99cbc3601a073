use clap::{Parser, Subcommand};
use interactor::config::InteractorConfig;
use snafu::prelude::*;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cmd;

use cmd::{DivideArgs, SleepArgs, handle_divide, handle_sleep};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Configuration error: {source}"))]
    Config {
        source: interactor::config::Error,
    },

    #[snafu(display("Command failed: {source}"))]
    Command { source: cmd::Error },
}

#[derive(Parser, Debug)]
#[command(name = "interactor")]
#[command(author = "Armin Graf")]
#[command(version = "0.1.0")]
#[command(about = "Run sample operations through the interactor executor", long_about = None)]
struct Cli {
    /// Configuration file (defaults to interactor.yaml and INTERACTOR__* variables)
    #[arg(short = 'c', long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Divide two integers; a zero divisor is delivered as a failure
    Divide(DivideArgs),
    /// Run a slow operation, optionally cancelling it
    Sleep(SleepArgs),
}

/// Initialize tracing/logging with indicatif integration
fn init_tracing(verbose: bool) {
    let indicatif_layer = tracing_indicatif::IndicatifLayer::new();

    let filter_layer = if verbose {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"))
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(indicatif_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => InteractorConfig::load_from(path),
        None => InteractorConfig::load(),
    }
    .context(ConfigSnafu)?;

    match cli.command {
        Commands::Divide(args) => handle_divide(args, &config).await.context(CommandSnafu),
        Commands::Sleep(args) => handle_sleep(args, &config).await.context(CommandSnafu),
    }
}
