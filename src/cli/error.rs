//! CLI-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),

    #[error("rule document is invalid: {0}")]
    Invalid(String),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => crate::exitcode::USAGE,
            CliError::Invalid(_) => crate::exitcode::DATAERR,
            CliError::Application(e) => match e {
                ApplicationError::Domain(DomainError::InvalidDocument(_)) => {
                    crate::exitcode::DATAERR
                }
                ApplicationError::Domain(_) => crate::exitcode::SOFTWARE,
                ApplicationError::RuleFileNotFound(_) => crate::exitcode::NOINPUT,
                ApplicationError::RuleFileExists(_) => crate::exitcode::CANTCREAT,
                ApplicationError::Config { .. } => crate::exitcode::CONFIG,
                ApplicationError::OperationFailed { .. } => crate::exitcode::IOERR,
            },
        }
    }
}
