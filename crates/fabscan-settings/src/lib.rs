//! # FabScan Settings
//!
//! Server configuration (`ServerConfig`) and the JSON config/settings
//! documents that clients query with GET_CONFIG and GET_SETTINGS.

pub mod config;
pub mod documents;
pub mod error;

pub use config::{
    resolve_path, DocumentSettings, EventBusSettings, NetConnectSettings, ServerConfig,
    WorkerSettings, CONFIG_ENV_VAR,
};
pub use documents::{JsonDocument, SharedDocument};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
