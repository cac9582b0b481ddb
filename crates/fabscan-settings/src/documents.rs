//! Config and settings documents
//!
//! GET_CONFIG and GET_SETTINGS reply with a snapshot of a JSON object.
//! Accepted UPDATE_CONFIG and UPDATE_SETTINGS payloads are merged into the
//! same object, so the next snapshot reflects them.

use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

use crate::error::{ConfigError, SettingsError, SettingsResult};

/// A JSON object shared between the controller and the scan worker
pub trait SharedDocument: Send + Sync {
    /// Point-in-time copy
    fn snapshot(&self) -> Value;

    /// Apply an update payload
    ///
    /// Top-level keys of an object payload overwrite existing keys; any
    /// other payload replaces the document.
    fn merge(&self, update: &Value);
}

/// Shared, replaceable JSON object
#[derive(Debug, Clone)]
pub struct JsonDocument {
    name: String,
    value: Arc<RwLock<Value>>,
}

impl JsonDocument {
    /// Wrap an existing value
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value: Arc::new(RwLock::new(value)),
        }
    }

    /// Empty JSON object
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Value::Object(Map::new()))
    }

    /// Load from a JSON file, or start empty when no path is configured
    pub fn load(name: impl Into<String>, path: Option<&Path>) -> SettingsResult<Self> {
        let name = name.into();
        let Some(path) = path else {
            return Ok(Self::empty(name));
        };

        let shown = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: shown.clone(),
            source,
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|source| SettingsError::Json {
            path: shown.clone(),
            source,
        })?;
        if !value.is_object() {
            return Err(ConfigError::NotAnObject(name).into());
        }

        tracing::debug!("Loaded {} document from {}", name, shown);
        Ok(Self::new(name, value))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Swap in a new value; readers see either the old or the new one
    pub fn replace(&self, value: Value) {
        *self.value.write() = value;
    }
}

impl SharedDocument for JsonDocument {
    fn snapshot(&self) -> Value {
        self.value.read().clone()
    }

    fn merge(&self, update: &Value) {
        let mut current = self.value.write();
        match (&mut *current, update) {
            (Value::Object(fields), Value::Object(changes)) => {
                for (key, value) in changes {
                    fields.insert(key.clone(), value.clone());
                }
            }
            (slot, _) => *slot = update.clone(),
        }
        tracing::trace!("Updated {} document", self.name);
    }
}
