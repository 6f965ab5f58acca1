//! Error types for taskflow-core

use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

/// Result type alias using taskflow-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by session and task store operations.
///
/// By the time an operation returns one of these, its rollback and user
/// notification have already happened.
#[derive(Error, Debug)]
pub enum Error {
    /// No authenticated session
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Session state transition that is not allowed
    #[error("Session invariant violated: {0}")]
    InvariantViolation(String),

    /// Client-side validation failure; no request was issued
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The server rejected the credential and the session was terminated
    #[error("Session expired")]
    SessionExpired,

    /// The session the request started under ended before it completed
    #[error("Session ended before the request completed")]
    Superseded,

    /// Remote API failure
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Persistent session store failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}
