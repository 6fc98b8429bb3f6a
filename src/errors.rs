use std::{io, path::PathBuf};

use crate::models::ExitStatusLike;

/// Error type shared by the catalog, the move engine and the coordinator.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    /// No catalog entry matched the request.
    #[error("not found: {0}")]
    NotFound(String),

    /// The recovery target is already occupied.
    #[error("refusing to overwrite existing path: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// A storage key collided with a live or retired entry.
    #[error("catalog constraint violated: {0}")]
    ConstraintViolation(String),

    /// File system I/O failure.
    #[error("I/O error while accessing {}", .0.display())]
    Io(PathBuf, #[source] io::Error),

    /// An argument was rejected before any side effect happened.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A required input is missing.
    #[error("missing required value: {0}")]
    MissingValue(String),

    /// Platform-specific behavior not available in this environment.
    #[error("unsupported platform behavior: {0}")]
    UnsupportedPlatform(String),

    /// The catalog database failed.
    #[error("catalog error")]
    Database(#[from] rusqlite::Error),
}

impl CoreError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn missing(message: impl Into<String>) -> Self {
        Self::MissingValue(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, error: io::Error) -> Self {
        Self::Io(path.into(), error)
    }

    /// Underlying I/O error kind, if this is an I/O failure.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io(_, err) => Some(err.kind()),
            _ => None,
        }
    }

    /// Process exit status a command should report for this error.
    pub fn exit_status(&self) -> ExitStatusLike {
        match self {
            Self::NotFound(_) => ExitStatusLike::NotFound,
            Self::AlreadyExists(_) | Self::ConstraintViolation(_) => ExitStatusLike::Conflict,
            Self::InvalidArgument(_) | Self::MissingValue(_) => ExitStatusLike::InvalidInput,
            Self::Io(..) | Self::UnsupportedPlatform(_) | Self::Database(_) => ExitStatusLike::Error,
        }
    }
}

/// Shared result alias for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
