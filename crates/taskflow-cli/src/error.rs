use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] taskflow_core::Error),
    /// Failure whose notification has already been printed.
    #[error("{0}")]
    Reported(taskflow_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid task id '{0}'")]
    InvalidTaskId(String),
    #[error("Nothing to change. Pass --title and/or --description.")]
    NothingToEdit,
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CliError {
    /// Whether `main` still needs to print this error.
    pub const fn needs_report(&self) -> bool {
        !matches!(self, Self::Reported(_))
    }
}
