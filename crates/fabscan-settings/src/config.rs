//! Server configuration
//!
//! One file, JSON or TOML by extension, with a section per component.
//! Every field has a default so an absent or partial file is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "FABSCAN_CONFIG";

/// netconnectd client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConnectSettings {
    /// Daemon socket path
    pub socket_path: PathBuf,
    /// Socket read/write timeout in milliseconds
    pub timeout_ms: u64,
    /// Bytes requested per read
    pub chunk_size: usize,
    /// Largest accepted response
    pub max_response_bytes: usize,
}

impl Default for NetConnectSettings {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/var/run/netconnectd.sock"),
            timeout_ms: 10_000,
            chunk_size: 16,
            max_response_bytes: 1024 * 1024,
        }
    }
}

impl NetConnectSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Worker mailbox settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Bound on blocking worker calls; absent waits forever
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask_timeout_ms: Option<u64>,
}

impl WorkerSettings {
    pub fn ask_timeout(&self) -> Option<Duration> {
        self.ask_timeout_ms.map(Duration::from_millis)
    }
}

/// Event bus settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusSettings {
    /// Capacity of the outbound broadcast channel
    pub channel_capacity: usize,
    /// How often an idle dispatcher re-checks for shutdown, in milliseconds
    pub idle_wait_ms: u64,
}

impl Default for EventBusSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            idle_wait_ms: 50,
        }
    }
}

impl EventBusSettings {
    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }
}

/// Locations of the config and settings documents served to clients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings_path: Option<PathBuf>,
}

/// Complete server configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub netconnect: NetConnectSettings,
    pub worker: WorkerSettings,
    pub event_bus: EventBusSettings,
    pub documents: DocumentSettings,
}

impl ServerConfig {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let shown = path.display().to_string();
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let is_toml = path.extension().is_some_and(|ext| ext == "toml");
        if !is_json && !is_toml {
            return Err(ConfigError::UnsupportedFormat(shown).into());
        }

        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: shown.clone(),
            source,
        })?;

        let config: Self = if is_json {
            serde_json::from_str(&content).map_err(|source| SettingsError::Json {
                path: shown.clone(),
                source,
            })?
        } else {
            toml::from_str(&content).map_err(|source| SettingsError::Toml {
                path: shown.clone(),
                source,
            })?
        };

        config.validate()?;
        tracing::debug!("Loaded server config from {}", shown);
        Ok(config)
    }

    /// Resolve the config location and load it, falling back to defaults
    pub fn load(cli_path: Option<&Path>) -> SettingsResult<Self> {
        let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        let default_path = dirs::config_dir()
            .map(|dir| dir.join("fabscan").join("server.toml"))
            .filter(|path| path.is_file());

        match resolve_path(cli_path, env_path, default_path) {
            Some(path) => Self::load_from_file(&path),
            None => {
                tracing::info!("No server config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        let net = &self.netconnect;
        if net.timeout_ms == 0 {
            return Err(ConfigError::out_of_range("netconnect.timeout_ms", 0));
        }
        if net.chunk_size == 0 {
            return Err(ConfigError::out_of_range("netconnect.chunk_size", 0));
        }
        if net.max_response_bytes < net.chunk_size {
            return Err(ConfigError::out_of_range(
                "netconnect.max_response_bytes",
                net.max_response_bytes,
            ));
        }
        if self.worker.ask_timeout_ms == Some(0) {
            return Err(ConfigError::out_of_range("worker.ask_timeout_ms", 0));
        }
        if self.event_bus.channel_capacity == 0 {
            return Err(ConfigError::out_of_range("event_bus.channel_capacity", 0));
        }
        if self.event_bus.idle_wait_ms == 0 {
            return Err(ConfigError::out_of_range("event_bus.idle_wait_ms", 0));
        }
        Ok(())
    }
}

/// Pick the config file: explicit argument, then environment, then the
/// per-user default location
pub fn resolve_path(
    cli_path: Option<&Path>,
    env_path: Option<PathBuf>,
    default_path: Option<PathBuf>,
) -> Option<PathBuf> {
    cli_path
        .map(Path::to_path_buf)
        .or(env_path)
        .or(default_path)
}
