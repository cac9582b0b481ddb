//! Error handling for the FabScan control plane
//!
//! Provides the error types shared by every layer of the server:
//! - Worker errors (mailbox delivery and blocking replies)
//! - Event bus errors (routing and queueing)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

pub use crate::event_bus::EventBusError;

/// Worker actor error type
///
/// Represents failures talking to the scan worker through its mailbox,
/// either on delivery or while waiting for a blocking reply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// The worker's mailbox no longer accepts messages
    #[error("Worker mailbox is closed")]
    MailboxClosed,

    /// The worker dropped the reply channel without answering
    #[error("Worker dropped the reply for {command}")]
    ReplyDropped {
        /// Worker command that went unanswered.
        command: String,
    },

    /// No reply arrived within the configured bound
    #[error("Worker did not reply to {command} within {timeout_ms}ms")]
    Timeout {
        /// Worker command that timed out.
        command: String,
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// The worker answered with a failure
    #[error("Worker failed to handle {command}: {reason}")]
    Failed {
        /// Worker command that failed.
        command: String,
        /// Failure reported by the worker.
        reason: String,
    },
}

impl WorkerError {
    /// Build a failure reply for a worker command
    pub fn failed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        WorkerError::Failed {
            command: command.into(),
            reason: reason.into(),
        }
    }
}

/// Main error type for the FabScan control plane
///
/// A unified error type that can represent any error raised while
/// processing a command. This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Worker mailbox error
    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// Event bus error
    #[error(transparent)]
    EventBus(#[from] EventBusError),

    /// Payload could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Worker(WorkerError::Timeout { .. }))
    }

    /// Check if this is a worker error
    pub fn is_worker_error(&self) -> bool {
        matches!(self, Error::Worker(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
