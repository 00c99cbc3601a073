use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Failed to load configuration: {source}"))]
    Load { source: config::ConfigError },

    #[snafu(display("Failed to load configuration from {}: {source}", path.display()))]
    LoadFile {
        path: PathBuf,
        source: config::ConfigError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Global configuration for interactor
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InteractorConfig {
    #[serde(default)]
    pub scope: ScopeConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

/// Configuration for an [`ExecutionScope`](crate::scope::ExecutionScope)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Worker threads for a scope that owns its runtime (defaults to the CPU count)
    pub worker_threads: Option<usize>,

    /// Thread name for a scope that owns its runtime
    pub thread_name: String,

    /// How long shutdown waits for in-flight operations before aborting them
    pub shutdown_grace_ms: u64,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            thread_name: "interactor-worker".to_string(),
            shutdown_grace_ms: 5000,
        }
    }
}

impl ScopeConfig {
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Configuration for an [`Executor`](crate::executor::Executor)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExecutorConfig {
    /// Deadline for a single run; exceeding it delivers a timeout failure
    pub run_timeout_ms: Option<u64>,
}

impl ExecutorConfig {
    #[must_use]
    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_ms.map(Duration::from_millis)
    }
}

impl InteractorConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (INTERACTOR__*) (highest priority)
    /// 2. Config file in ~/.config/interactor/interactor.yaml
    /// 3. Config file interactor.yaml in the current directory
    /// 4. Defaults (lowest priority)
    ///
    /// # Errors
    /// Returns [`Error::Load`] if a source is malformed or a value has the wrong type.
    pub fn load() -> Result<Self> {
        Self::layered().context(LoadSnafu)
    }

    fn layered() -> std::result::Result<Self, config::ConfigError> {
        let config_builder = config::Config::builder()
            .add_source(config::Config::try_from(&InteractorConfig::default())?)
            .add_source(
                config::File::with_name("interactor")
                    .format(config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                config::File::with_name(&format!(
                    "{}/.config/interactor/interactor",
                    std::env::var("HOME").unwrap_or_else(|_| ".".to_string())
                ))
                .format(config::FileFormat::Yaml)
                .required(false),
            )
            .add_source(
                config::Environment::with_prefix("INTERACTOR")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = config_builder.build()?;
        config.try_deserialize()
    }

    /// Load configuration from an explicit YAML file layered over the defaults
    ///
    /// # Errors
    /// Returns [`Error::LoadFile`] if the file is missing or malformed.
    pub fn load_from(path: &Path) -> Result<Self> {
        config::Config::builder()
            .add_source(
                config::Config::try_from(&InteractorConfig::default())
                    .context(LoadFileSnafu { path })?,
            )
            .add_source(config::File::from(path).format(config::FileFormat::Yaml))
            .build()
            .and_then(|built| built.try_deserialize())
            .context(LoadFileSnafu { path })
    }
}
