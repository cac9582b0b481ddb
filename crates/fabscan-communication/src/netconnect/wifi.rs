use serde::{Deserialize, Serialize};

/// A visible Wi-Fi network, as reported to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiNetwork {
    pub ssid: String,
    /// BSSID of the access point.
    pub address: String,
    /// Signal quality as reported by the daemon.
    pub quality: i64,
    pub encrypted: bool,
}

/// A `list_wifi` entry as netconnectd reports it
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DaemonWifiEntry {
    ssid: String,
    address: String,
    signal: i64,
    encrypted: bool,
}

impl From<DaemonWifiEntry> for WifiNetwork {
    fn from(entry: DaemonWifiEntry) -> Self {
        Self {
            ssid: entry.ssid,
            address: entry.address,
            quality: entry.signal,
            encrypted: entry.encrypted,
        }
    }
}

/// Parameters of `config_wifi`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiCredentials {
    pub ssid: String,
    pub psk: String,
    /// Reconfigure even if the network is already known.
    #[serde(default)]
    pub force: bool,
}
