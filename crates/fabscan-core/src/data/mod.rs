//! Scanner data model
//!
//! Lifecycle state, the client command vocabulary and the handle used to
//! address a single client connection.

mod command;
mod state;

pub use command::{Command, CommandKind, NetConnectCommand};
pub use state::ScannerState;

use serde::{Deserialize, Serialize};

/// Handle of a connected client (one websocket connection)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Wrap a transport-assigned connection identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
