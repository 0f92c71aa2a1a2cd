//! Error types for orgsync
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, missing file, invalid config)
//! - 3: Data error (unparseable org text, unresolvable remote listing)
//! - 4: Operation failed (io, store corruption, lock contention)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the orgsync CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const DATA_ERROR: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for orgsync operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Data errors (exit code 3)
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid timestamp '{0}'")]
    InvalidStamp(String),

    #[error("No task with id {0}")]
    TaskNotFound(String),

    #[error("Remote listing stalled: {remaining} item(s) with unresolvable parents")]
    StalledListing { remaining: usize },

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::FileNotFound(_) | Error::InvalidConfig(_) | Error::InvalidArgument(_) => {
                exit_codes::USER_ERROR
            }

            // Data errors
            Error::Parse { .. }
            | Error::InvalidStamp(_)
            | Error::TaskNotFound(_)
            | Error::StalledListing { .. } => exit_codes::DATA_ERROR,

            // Operation failures
            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }
}

/// Result type alias for orgsync operations
pub type Result<T> = std::result::Result<T, Error>;
