//! netconnectd request/response client
//!
//! Maps the client-facing [`NetConnectCommand`]s to daemon verbs and runs
//! one socket round trip per verb.

use fabscan_core::NetConnectCommand;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use super::framing::{self, DEFAULT_CHUNK_SIZE};
use super::transport::{Connector, UnixSocketConnector, DEFAULT_SOCKET_PATH};
use super::wifi::{DaemonWifiEntry, WifiCredentials, WifiNetwork};
use super::{NetConnectError, NetConnectResult};

/// Client configuration
#[derive(Debug, Clone)]
pub struct NetConnectConfig {
    /// Daemon socket path.
    pub socket_path: PathBuf,
    /// Read/write timeout per socket operation.
    pub timeout: Duration,
    /// Bytes requested per read.
    pub chunk_size: usize,
    /// Upper bound on an unterminated response.
    pub max_response_bytes: usize,
}

impl Default for NetConnectConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            timeout: Duration::from_secs(10),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_response_bytes: 1024 * 1024,
        }
    }
}

/// Dispatch seam used by the device controller
pub trait NetConnectService: Send + Sync {
    /// Run a netconnect command and return the response sent to the client
    fn call(&self, command: NetConnectCommand, data: Option<&Value>) -> NetConnectResult<Value>;
}

#[derive(Serialize)]
struct NoParams {}

#[derive(Serialize)]
struct ListWifiParams {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    force: bool,
}

/// netconnectd client
pub struct NetConnectClient {
    connector: Box<dyn Connector>,
    config: NetConnectConfig,
}

impl NetConnectClient {
    /// Create a client talking to the daemon's Unix socket
    pub fn new(config: NetConnectConfig) -> Self {
        let connector = UnixSocketConnector::new(config.socket_path.clone(), config.timeout);
        Self::with_connector(Box::new(connector), config)
    }

    /// Create a client over a custom connector
    pub fn with_connector(connector: Box<dyn Connector>, config: NetConnectConfig) -> Self {
        Self { connector, config }
    }

    pub fn config(&self) -> &NetConnectConfig {
        &self.config
    }

    /// Send one request and classify the reply
    ///
    /// The connection is opened here and dropped (closed) before returning,
    /// whatever the outcome.
    pub fn send_message<P: Serialize>(&self, verb: &str, params: &P) -> NetConnectResult<Value> {
        let request = framing::encode_request(verb, params)?;
        let result = self
            .round_trip(&request)
            .and_then(|raw| framing::decode_response(&raw))
            .and_then(framing::classify_response);

        match &result {
            Ok(value) => tracing::debug!("netconnectd {} -> {}", verb, value),
            Err(NetConnectError::UnknownResponse { raw }) => {
                tracing::warn!("Unknown response from netconnectd to {}: {}", verb, raw)
            }
            Err(e) => tracing::warn!("Request {} to netconnectd went wrong: {}", verb, e),
        }
        result
    }

    fn round_trip(&self, request: &[u8]) -> NetConnectResult<Vec<u8>> {
        let mut stream = self.connector.connect()?;
        stream.write_all(request)?;
        stream.flush()?;
        framing::read_message(
            &mut *stream,
            self.config.chunk_size,
            self.config.max_response_bytes,
        )
    }

    /// List visible networks, optionally forcing a rescan
    pub fn list_wifi(&self, force: bool) -> NetConnectResult<Vec<WifiNetwork>> {
        if force {
            tracing::info!("Forcing wifi refresh...");
        }
        let content = self.send_message("list_wifi", &ListWifiParams { force })?;
        let entries: Vec<DaemonWifiEntry> =
            serde_json::from_value(content).map_err(|e| NetConnectError::UnexpectedResult {
                verb: "list_wifi".to_string(),
                reason: e.to_string(),
            })?;
        Ok(entries.into_iter().map(WifiNetwork::from).collect())
    }

    /// Query the daemon's connection status
    pub fn status(&self) -> NetConnectResult<Value> {
        self.send_message("status", &NoParams {})
    }

    pub fn forget_wifi(&self) -> NetConnectResult<()> {
        self.send_message("forget_wifi", &NoParams {}).map(drop)
    }

    pub fn start_ap(&self) -> NetConnectResult<()> {
        self.send_message("start_ap", &NoParams {}).map(drop)
    }

    pub fn stop_ap(&self) -> NetConnectResult<()> {
        self.send_message("stop_ap", &NoParams {}).map(drop)
    }

    /// Factory reset the daemon's network configuration
    pub fn reset(&self) -> NetConnectResult<()> {
        self.send_message("reset", &NoParams {}).map(drop)
    }

    /// Configure a network, then switch to it
    ///
    /// `start_wifi` is only sent once `config_wifi` succeeded; a failed
    /// configuration is returned as is.
    pub fn configure_wifi(&self, credentials: &WifiCredentials) -> NetConnectResult<()> {
        self.send_message("config_wifi", credentials)?;
        self.send_message("start_wifi", &NoParams {})?;
        Ok(())
    }
}

impl NetConnectService for NetConnectClient {
    fn call(&self, command: NetConnectCommand, data: Option<&Value>) -> NetConnectResult<Value> {
        match command {
            NetConnectCommand::GetWifiList => {
                let force = data
                    .and_then(|d| d.get("force"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                let networks = self.list_wifi(force)?;
                serde_json::to_value(networks).map_err(|e| NetConnectError::UnexpectedResult {
                    verb: "list_wifi".to_string(),
                    reason: e.to_string(),
                })
            }
            NetConnectCommand::GetStatus => self.status(),
            NetConnectCommand::ForgetWifi => self.forget_wifi().map(|_| Value::Null),
            NetConnectCommand::StartAp => self.start_ap().map(|_| Value::Null),
            NetConnectCommand::StopAp => self.stop_ap().map(|_| Value::Null),
            NetConnectCommand::Reset => self.reset().map(|_| Value::Null),
            NetConnectCommand::ConfigureWifi => {
                let data = data.ok_or_else(|| NetConnectError::InvalidParameters {
                    verb: command.to_string(),
                    reason: "missing ssid/psk".to_string(),
                })?;
                let credentials = WifiCredentials::deserialize(data).map_err(|e| {
                    NetConnectError::InvalidParameters {
                        verb: command.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                self.configure_wifi(&credentials).map(|_| Value::Null)
            }
        }
    }
}

impl std::fmt::Debug for NetConnectClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetConnectClient")
            .field("peer", &self.connector.describe())
            .field("config", &self.config)
            .finish()
    }
}
