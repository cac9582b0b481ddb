//! # FabScan Communication
//!
//! Clients for the local daemons the scanner server talks to. Currently
//! that is netconnectd, which owns the Wi-Fi and access point setup.

pub mod netconnect;

pub use netconnect::{
    Connector, NetConnectClient, NetConnectConfig, NetConnectError, NetConnectResult,
    NetConnectService, ReadWrite, UnixSocketConnector, WifiCredentials, WifiNetwork,
    DEFAULT_SOCKET_PATH,
};
