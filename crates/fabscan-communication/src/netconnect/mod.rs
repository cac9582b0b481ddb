//! netconnectd client
//!
//! netconnectd is the local daemon that owns Wi-Fi and access point
//! configuration. It listens on a Unix stream socket and speaks
//! NUL-terminated JSON (see [`framing`]). Every request opens a fresh
//! connection; nothing is pooled.

pub mod client;
pub mod framing;
pub mod transport;
pub mod wifi;

pub use client::{NetConnectClient, NetConnectConfig, NetConnectService};
pub use transport::{Connector, ReadWrite, UnixSocketConnector, DEFAULT_SOCKET_PATH};
pub use wifi::{WifiCredentials, WifiNetwork};

use serde_json::Value;
use std::io;
use thiserror::Error;

/// Errors talking to netconnectd
///
/// Every failure of a daemon round trip ends up here; nothing below this
/// type panics or escapes as a raw I/O error.
#[derive(Error, Debug)]
pub enum NetConnectError {
    /// The daemon socket could not be opened
    #[error("Failed to connect to netconnectd at {path}: {reason}")]
    Connect {
        /// Socket path that was tried.
        path: String,
        /// Underlying error text.
        reason: String,
    },

    /// A read or write hit the socket timeout
    #[error("Timed out talking to netconnectd")]
    Timeout,

    /// Any other socket error
    #[error("I/O error talking to netconnectd: {0}")]
    Io(#[source] io::Error),

    /// The daemon closed the socket before sending a terminator
    #[error("netconnectd closed the connection before the end of the message")]
    ConnectionClosed,

    /// The response grew past the configured limit without a terminator
    #[error("netconnectd response exceeded {limit} bytes")]
    ResponseTooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// The response body was not valid JSON
    #[error("Malformed response from netconnectd: {0}")]
    Malformed(String),

    /// The daemon answered with an `error` field
    #[error("{0}")]
    Daemon(String),

    /// The daemon answered with neither `result` nor `error`
    #[error("unknown response")]
    UnknownResponse {
        /// The decoded reply, kept for diagnostics.
        raw: Value,
    },

    /// Request parameters were missing or could not be encoded
    #[error("Invalid parameters for {verb}: {reason}")]
    InvalidParameters {
        /// Daemon verb or netconnect command.
        verb: String,
        /// What was wrong.
        reason: String,
    },

    /// A successful result did not have the expected shape
    #[error("Unexpected {verb} result: {reason}")]
    UnexpectedResult {
        /// Daemon verb.
        verb: String,
        /// Decoding error text.
        reason: String,
    },
}

impl From<io::Error> for NetConnectError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => NetConnectError::Timeout,
            _ => NetConnectError::Io(err),
        }
    }
}

/// Result of one netconnectd call: the daemon's `result` value or a failure
pub type NetConnectResult<T> = std::result::Result<T, NetConnectError>;
