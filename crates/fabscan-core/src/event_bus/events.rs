//! Event type definitions for the event bus.
//!
//! Every message routed through the bus is an [`AppEvent`]. The variant
//! decides the event kind, which is what subscribers filter on. Events are
//! cloneable and serializable so the transport layer can forward them to
//! browser clients unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::{ClientId, Command, NetConnectCommand, ScannerState};

/// Root event enum for all bus traffic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppEvent {
    /// A client issued a command
    Command {
        /// Connection the command arrived on.
        client: ClientId,
        /// The command and its fields.
        #[serde(flatten)]
        command: Command,
    },
    /// A new client connection was opened
    OnClientConnected {
        /// The new connection.
        client: ClientId,
    },
    /// The scanner changed lifecycle state
    OnStateChanged {
        /// State after the transition.
        state: ScannerState,
    },
    /// Reply to `GET_CONFIG`
    OnGetConfig {
        /// Requesting connection.
        client: ClientId,
        /// Configuration snapshot.
        config: Value,
    },
    /// Reply to `GET_SETTINGS`
    OnGetSettings {
        /// Requesting connection.
        client: ClientId,
        /// Settings snapshot.
        settings: Value,
    },
    /// Greeting sent to a freshly connected client
    OnClientInit(ClientInit),
    /// Successful netconnectd response
    OnNetConnect {
        /// Requesting connection.
        client: ClientId,
        /// Normalized daemon response.
        response: Value,
        /// Netconnect function that produced it.
        command: NetConnectCommand,
    },
}

/// Upgrade availability as reported by the upgrade checker
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpgradeInfo {
    /// Whether a newer release exists.
    pub available: bool,
    /// Latest known release version.
    pub version: String,
}

/// Initialization message for a newly connected client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInit {
    /// Connection being greeted.
    pub client: ClientId,
    /// Current scanner state.
    pub state: ScannerState,
    /// Server version, prefixed with `v.`.
    pub server_version: String,
    /// Firmware / hardware description from the worker, or `undefined`.
    pub firmware_version: String,
    /// Upgrade availability.
    pub upgrade: UpgradeInfo,
}

impl AppEvent {
    /// Get the kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            AppEvent::Command { .. } => EventKind::Command,
            AppEvent::OnClientConnected { .. } => EventKind::OnClientConnected,
            AppEvent::OnStateChanged { .. } => EventKind::OnStateChanged,
            AppEvent::OnGetConfig { .. } => EventKind::OnGetConfig,
            AppEvent::OnGetSettings { .. } => EventKind::OnGetSettings,
            AppEvent::OnClientInit(_) => EventKind::OnClientInit,
            AppEvent::OnNetConnect { .. } => EventKind::OnNetConnect,
        }
    }

    /// Client this event is addressed to or originated from, if any
    pub fn client(&self) -> Option<&ClientId> {
        match self {
            AppEvent::Command { client, .. }
            | AppEvent::OnClientConnected { client }
            | AppEvent::OnGetConfig { client, .. }
            | AppEvent::OnGetSettings { client, .. }
            | AppEvent::OnNetConnect { client, .. } => Some(client),
            AppEvent::OnClientInit(init) => Some(&init.client),
            AppEvent::OnStateChanged { .. } => None,
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            AppEvent::Command { client, command } => format!("{} from {}", command, client),
            AppEvent::OnClientConnected { client } => format!("Client {} connected", client),
            AppEvent::OnStateChanged { state } => format!("State changed to {}", state),
            AppEvent::OnGetConfig { client, .. } => format!("Config for {}", client),
            AppEvent::OnGetSettings { client, .. } => format!("Settings for {}", client),
            AppEvent::OnClientInit(init) => {
                format!("Init for {} in state {}", init.client, init.state)
            }
            AppEvent::OnNetConnect { client, command, .. } => {
                format!("Netconnect {} response for {}", command, client)
            }
        }
    }
}

/// Event kind for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Command,
    OnClientConnected,
    OnStateChanged,
    OnGetConfig,
    OnGetSettings,
    OnClientInit,
    OnNetConnect,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::Command => "COMMAND",
            EventKind::OnClientConnected => "ON_CLIENT_CONNECTED",
            EventKind::OnStateChanged => "ON_STATE_CHANGED",
            EventKind::OnGetConfig => "ON_GET_CONFIG",
            EventKind::OnGetSettings => "ON_GET_SETTINGS",
            EventKind::OnClientInit => "ON_CLIENT_INIT",
            EventKind::OnNetConnect => "ON_NET_CONNECT",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_event_is_flat_on_the_wire() {
        let event = AppEvent::Command {
            client: ClientId::new("ws-1"),
            command: Command::HardwareTestFunction {
                device: "turntable".to_string(),
            },
        };

        let value = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(
            value,
            json!({
                "kind": "COMMAND",
                "client": "ws-1",
                "command": "HARDWARE_TEST_FUNCTION",
                "device": "turntable"
            })
        );

        let back: AppEvent = serde_json::from_value(value).expect("deserialize event");
        assert_eq!(back, event);
    }

    #[test]
    fn test_client_init_shape() {
        let event = AppEvent::OnClientInit(ClientInit {
            client: ClientId::new("ws-2"),
            state: ScannerState::Idle,
            server_version: "v.0.6.0".to_string(),
            firmware_version: "undefined".to_string(),
            upgrade: UpgradeInfo {
                available: true,
                version: "0.7.0".to_string(),
            },
        });

        let value = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(value["kind"], "ON_CLIENT_INIT");
        assert_eq!(value["state"], "IDLE");
        assert_eq!(value["upgrade"], json!({"available": true, "version": "0.7.0"}));
    }

    #[test]
    fn test_kind_display_matches_serialized_tag() {
        let event = AppEvent::OnStateChanged {
            state: ScannerState::Scanning,
        };
        let value = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(value["kind"], event.kind().to_string());
        assert!(event.client().is_none());
    }
}
