/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use super::types::Tag;
use miette::Diagnostic;
use thiserror::Error;

/// Completion queue errors
///
/// These are synchronous contract errors. Asynchronous failures travel
/// through the callback channel as a [`Status`](super::types::Status).
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum CompletionError {
    #[error("Completion queue is shut down")]
    #[diagnostic(
        code(completion::queue_closed),
        help("Register operations before calling shutdown(), or create a new queue.")
    )]
    QueueClosed,

    #[error("Unknown completion tag {0}")]
    #[diagnostic(
        code(completion::unknown_tag),
        help("The tag was issued by another queue or never issued at all. Tags whose completion was already recorded report AlreadyCompleted.")
    )]
    UnknownTag(Tag),

    #[error("Completion for tag {0} was already delivered")]
    #[diagnostic(
        code(completion::already_completed),
        help("Each tag accepts exactly one notification. Late completions after a forced cancel are rejected.")
    )]
    AlreadyCompleted(Tag),

    #[error("Failed to spawn worker thread: {0}")]
    #[diagnostic(
        code(completion::worker_spawn),
        help("Check thread limits for the process.")
    )]
    WorkerSpawn(String),
}

/// Admin client errors returned synchronously from issue calls
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum AdminError {
    #[error("Invalid argument: {0}")]
    #[diagnostic(
        code(admin::invalid_argument),
        help("The callback already received an INVALID_ARGUMENT status; nothing was sent.")
    )]
    InvalidArgument(String),

    #[error("Completion queue is shut down")]
    #[diagnostic(code(admin::queue_closed))]
    QueueClosed,

    #[error("Request encoding failed: {0}")]
    #[diagnostic(code(admin::encoding))]
    Encoding(String),
}

impl From<CompletionError> for AdminError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::QueueClosed => AdminError::QueueClosed,
            other => AdminError::InvalidArgument(other.to_string()),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    #[diagnostic(code(config::invalid_value))]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

pub type CompletionResult<T> = Result<T, CompletionError>;
pub type AdminResult<T> = Result<T, AdminError>;
