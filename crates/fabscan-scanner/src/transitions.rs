//! Command transition table
//!
//! Every command the controller acts on has one or more rows here. A row
//! applies when its precondition holds for the current state; the first
//! matching row wins. A command with no matching row is ignored.

use fabscan_core::{CommandKind, ScannerState};

use crate::worker::WorkerCommand;

/// When a row applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    Any,
    In(ScannerState),
    /// An upgrade was reported available on the last client connect.
    UpgradeAvailable,
}

impl Precondition {
    pub fn holds(&self, state: ScannerState, upgrade_available: bool) -> bool {
        match self {
            Precondition::Any => true,
            Precondition::In(required) => *required == state,
            Precondition::UpgradeAvailable => upgrade_available,
        }
    }
}

/// Side effect of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Nothing,
    /// Fire-and-forget worker message
    Tell(WorkerCommand),
    /// Blocking worker call
    Ask(WorkerCommand),
    /// Start mesh generation in the background
    LaunchMeshing,
    /// Reply to the client with a config snapshot
    ReplyConfig,
    /// Reply to the client with a settings snapshot
    ReplySettings,
    /// Call netconnectd
    NetConnect,
}

impl Action {
    /// Worker command sent by this action, if any
    pub fn worker_command(&self) -> Option<WorkerCommand> {
        match self {
            Action::Tell(command) | Action::Ask(command) => Some(*command),
            _ => None,
        }
    }
}

/// State after a row ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Unchanged,
    To(ScannerState),
}

impl Next {
    pub fn resolve(&self, current: ScannerState) -> ScannerState {
        match self {
            Next::Unchanged => current,
            Next::To(state) => *state,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub command: CommandKind,
    pub precondition: Precondition,
    pub action: Action,
    pub next: Next,
}

const fn row(
    command: CommandKind,
    precondition: Precondition,
    action: Action,
    next: Next,
) -> Transition {
    Transition {
        command,
        precondition,
        action,
        next,
    }
}

use Action::*;
use CommandKind as C;
use Next::*;
use Precondition::*;
use ScannerState as S;

/// The controller's complete behaviour
pub const TRANSITIONS: &[Transition] = &[
    row(C::Scan, In(S::Idle), Tell(WorkerCommand::SettingsModeOn), To(S::Settings)),
    row(C::UpdateSettings, In(S::Settings), Tell(WorkerCommand::UpdateSettings), Unchanged),
    row(C::UpdateConfig, Any, Tell(WorkerCommand::UpdateConfig), Unchanged),
    row(C::Start, In(S::Settings), Tell(WorkerCommand::Start), To(S::Scanning)),
    row(C::Stop, In(S::Scanning), Ask(WorkerCommand::Stop), To(S::Idle)),
    row(C::Stop, In(S::Settings), Tell(WorkerCommand::SettingsModeOff), To(S::Idle)),
    row(C::Stop, In(S::Calibrating), Ask(WorkerCommand::StopCalibration), To(S::Idle)),
    row(C::Stop, In(S::Idle), Nothing, Unchanged),
    row(C::HardwareTestFunction, Any, Ask(WorkerCommand::CallHardwareTestFunction), Unchanged),
    row(C::Calibrate, Any, Tell(WorkerCommand::StartCalibration), To(S::Calibrating)),
    row(C::CalibrationComplete, Any, Nothing, To(S::Idle)),
    row(C::Complete, Any, Nothing, To(S::Idle)),
    row(C::ScannerError, Any, Nothing, To(S::Settings)),
    row(C::Meshing, Any, LaunchMeshing, Unchanged),
    row(C::UpgradeServer, UpgradeAvailable, Nothing, To(S::Upgrading)),
    row(C::GetConfig, Any, ReplyConfig, Unchanged),
    row(C::GetSettings, Any, ReplySettings, Unchanged),
    row(C::NetConnect, Any, NetConnect, Unchanged),
];

/// Find the row that applies to `command` in `state`
pub fn lookup(
    command: CommandKind,
    state: ScannerState,
    upgrade_available: bool,
) -> Option<&'static Transition> {
    TRANSITIONS
        .iter()
        .find(|t| t.command == command && t.precondition.holds(state, upgrade_available))
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::Action::*;
    use super::Next::*;
    use fabscan_core::{CommandKind as C, ScannerState as S};

    #[test]
    fn test_scan_only_from_idle() {
        let t = lookup(C::Scan, S::Idle, false).unwrap();
        assert_eq!(t.action, Tell(WorkerCommand::SettingsModeOn));
        assert_eq!(t.next, To(S::Settings));

        for state in [S::Settings, S::Scanning, S::Calibrating, S::Upgrading] {
            assert!(lookup(C::Scan, state, false).is_none());
        }
    }

    #[test]
    fn test_stop_rows() {
        assert_eq!(
            lookup(C::Stop, S::Scanning, false).unwrap().action,
            Ask(WorkerCommand::Stop)
        );
        assert_eq!(
            lookup(C::Stop, S::Settings, false).unwrap().action,
            Tell(WorkerCommand::SettingsModeOff)
        );
        assert_eq!(
            lookup(C::Stop, S::Calibrating, false).unwrap().action,
            Ask(WorkerCommand::StopCalibration)
        );
        let idle = lookup(C::Stop, S::Idle, false).unwrap();
        assert_eq!((idle.action, idle.next), (Nothing, Unchanged));
        assert!(lookup(C::Stop, S::Upgrading, false).is_none());
    }

    #[test]
    fn test_upgrade_needs_availability() {
        assert!(lookup(C::UpgradeServer, S::Idle, false).is_none());
        assert_eq!(
            lookup(C::UpgradeServer, S::Scanning, true).unwrap().next,
            To(S::Upgrading)
        );
    }

    #[test]
    fn test_supervisor_commands_have_no_rows() {
        for kind in [C::RestartServer, C::RebootSystem, C::ShutdownSystem] {
            assert!(TRANSITIONS.iter().all(|t| t.command != kind));
        }
    }

    #[test]
    fn test_rows_for_a_command_are_disjoint() {
        for state in S::ALL {
            for kind in CommandKind::ALL {
                for upgrade in [false, true] {
                    let matching = TRANSITIONS
                        .iter()
                        .filter(|t| t.command == kind && t.precondition.holds(state, upgrade))
                        .count();
                    assert!(matching <= 1, "{:?} in {:?} matches {} rows", kind, state, matching);
                }
            }
        }
    }
}
