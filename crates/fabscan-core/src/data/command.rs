use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A client command together with its command-specific fields
///
/// On the wire a command is a flat object tagged by `command`, e.g.
/// `{"command": "UPDATE_SETTINGS", "settings": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Enter settings (preview) mode.
    Scan,
    /// Start scanning with the current settings.
    Start,
    /// Leave settings mode, or stop a running scan or calibration.
    Stop,
    /// Start a calibration run.
    Calibrate,
    /// Run a named hardware self test on the worker.
    HardwareTestFunction {
        /// Device whose test function should run.
        device: String,
    },
    /// Generate a mesh from a finished scan.
    Meshing {
        /// Scan to mesh.
        scan_id: String,
        /// Mesh filter script name.
        filter: String,
        /// Output file format.
        format: String,
    },
    /// The worker finished a scan.
    Complete,
    /// The worker hit an internal error.
    ScannerError,
    /// Upgrade the server software.
    UpgradeServer,
    /// Restart the server process.
    RestartServer,
    /// Reboot the host.
    RebootSystem,
    /// Power the host off.
    ShutdownSystem,
    /// The worker finished calibrating.
    CalibrationComplete,
    /// Forward a network configuration request to netconnectd.
    #[serde(rename = "NETCONNECT")]
    NetConnect {
        /// Netconnect function to call.
        function: NetConnectCommand,
        /// Function parameters, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    /// Read the current scan settings.
    GetSettings,
    /// Replace scan settings while in settings mode.
    UpdateSettings {
        /// New settings document.
        settings: Value,
    },
    /// Read the current scanner configuration.
    GetConfig,
    /// Replace the scanner configuration.
    UpdateConfig {
        /// New configuration document.
        config: Value,
    },
}

/// Payload-free identifier of a [`Command`]
///
/// Used as the key of the controller's transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Scan,
    Start,
    Stop,
    Calibrate,
    HardwareTestFunction,
    Meshing,
    Complete,
    ScannerError,
    UpgradeServer,
    RestartServer,
    RebootSystem,
    ShutdownSystem,
    CalibrationComplete,
    NetConnect,
    GetSettings,
    UpdateSettings,
    GetConfig,
    UpdateConfig,
}

impl CommandKind {
    /// Every command kind, in declaration order
    pub const ALL: [CommandKind; 18] = [
        CommandKind::Scan,
        CommandKind::Start,
        CommandKind::Stop,
        CommandKind::Calibrate,
        CommandKind::HardwareTestFunction,
        CommandKind::Meshing,
        CommandKind::Complete,
        CommandKind::ScannerError,
        CommandKind::UpgradeServer,
        CommandKind::RestartServer,
        CommandKind::RebootSystem,
        CommandKind::ShutdownSystem,
        CommandKind::CalibrationComplete,
        CommandKind::NetConnect,
        CommandKind::GetSettings,
        CommandKind::UpdateSettings,
        CommandKind::GetConfig,
        CommandKind::UpdateConfig,
    ];

    /// Wire name of the command
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Scan => "SCAN",
            CommandKind::Start => "START",
            CommandKind::Stop => "STOP",
            CommandKind::Calibrate => "CALIBRATE",
            CommandKind::HardwareTestFunction => "HARDWARE_TEST_FUNCTION",
            CommandKind::Meshing => "MESHING",
            CommandKind::Complete => "COMPLETE",
            CommandKind::ScannerError => "SCANNER_ERROR",
            CommandKind::UpgradeServer => "UPGRADE_SERVER",
            CommandKind::RestartServer => "RESTART_SERVER",
            CommandKind::RebootSystem => "REBOOT_SYSTEM",
            CommandKind::ShutdownSystem => "SHUTDOWN_SYSTEM",
            CommandKind::CalibrationComplete => "CALIBRATION_COMPLETE",
            CommandKind::NetConnect => "NETCONNECT",
            CommandKind::GetSettings => "GET_SETTINGS",
            CommandKind::UpdateSettings => "UPDATE_SETTINGS",
            CommandKind::GetConfig => "GET_CONFIG",
            CommandKind::UpdateConfig => "UPDATE_CONFIG",
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Command {
    /// Get the payload-free kind of this command
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Scan => CommandKind::Scan,
            Command::Start => CommandKind::Start,
            Command::Stop => CommandKind::Stop,
            Command::Calibrate => CommandKind::Calibrate,
            Command::HardwareTestFunction { .. } => CommandKind::HardwareTestFunction,
            Command::Meshing { .. } => CommandKind::Meshing,
            Command::Complete => CommandKind::Complete,
            Command::ScannerError => CommandKind::ScannerError,
            Command::UpgradeServer => CommandKind::UpgradeServer,
            Command::RestartServer => CommandKind::RestartServer,
            Command::RebootSystem => CommandKind::RebootSystem,
            Command::ShutdownSystem => CommandKind::ShutdownSystem,
            Command::CalibrationComplete => CommandKind::CalibrationComplete,
            Command::NetConnect { .. } => CommandKind::NetConnect,
            Command::GetSettings => CommandKind::GetSettings,
            Command::UpdateSettings { .. } => CommandKind::UpdateSettings,
            Command::GetConfig => CommandKind::GetConfig,
            Command::UpdateConfig { .. } => CommandKind::UpdateConfig,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::NetConnect { function, .. } => write!(f, "NETCONNECT({})", function),
            other => f.write_str(other.kind().as_str()),
        }
    }
}

/// High-level network configuration requests served by netconnectd
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetConnectCommand {
    /// List visible Wi-Fi networks.
    GetWifiList,
    /// Query daemon connection status.
    GetStatus,
    /// Forget the configured Wi-Fi network.
    ForgetWifi,
    /// Start the access point.
    StartAp,
    /// Stop the access point.
    StopAp,
    /// Configure a Wi-Fi network and switch to it.
    ConfigureWifi,
    /// Factory reset the daemon.
    Reset,
}

impl NetConnectCommand {
    /// Wire name of the command
    pub fn as_str(&self) -> &'static str {
        match self {
            NetConnectCommand::GetWifiList => "GET_WIFI_LIST",
            NetConnectCommand::GetStatus => "GET_STATUS",
            NetConnectCommand::ForgetWifi => "FORGET_WIFI",
            NetConnectCommand::StartAp => "START_AP",
            NetConnectCommand::StopAp => "STOP_AP",
            NetConnectCommand::ConfigureWifi => "CONFIGURE_WIFI",
            NetConnectCommand::Reset => "RESET",
        }
    }
}

impl std::fmt::Display for NetConnectCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
