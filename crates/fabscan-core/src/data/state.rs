use serde::{Deserialize, Serialize};

/// Lifecycle state of the scanner
///
/// Exactly one state is active at a time. Only the device controller
/// changes it, and every change is announced as `ON_STATE_CHANGED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScannerState {
    /// Waiting for a client to start something.
    #[default]
    Idle,
    /// Preview mode; scan settings can be adjusted.
    Settings,
    /// A scan is running on the worker.
    Scanning,
    /// Calibration is running on the worker.
    Calibrating,
    /// The server is about to be upgraded.
    Upgrading,
}

impl ScannerState {
    /// Every state, in declaration order
    pub const ALL: [ScannerState; 5] = [
        ScannerState::Idle,
        ScannerState::Settings,
        ScannerState::Scanning,
        ScannerState::Calibrating,
        ScannerState::Upgrading,
    ];

    /// Wire name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            ScannerState::Idle => "IDLE",
            ScannerState::Settings => "SETTINGS",
            ScannerState::Scanning => "SCANNING",
            ScannerState::Calibrating => "CALIBRATING",
            ScannerState::Upgrading => "UPGRADING",
        }
    }
}

impl std::fmt::Display for ScannerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
