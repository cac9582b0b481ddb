//! # FabScan Scanner
//!
//! The command side of the scanner server:
//!
//! - [`worker`]: the scan worker's mailbox contract (tell / ask)
//! - [`transitions`]: the state machine as a table
//! - [`controller`]: [`DeviceController`], which applies the table
//! - [`supervisor`]: restart/reboot/shutdown/upgrade requests
//! - [`meshing`] and [`upgrade`]: collaborators behind traits

pub mod controller;
pub mod meshing;
pub mod supervisor;
pub mod transitions;
pub mod upgrade;
pub mod worker;

pub use controller::{CommandOutcome, DeviceController, UNKNOWN_FIRMWARE};
pub use meshing::{MeshGenerator, MeshRequest, MeshingLauncher, UnconfiguredMeshGenerator};
pub use supervisor::{ExitRequest, ServerSupervisor};
pub use transitions::{lookup, Action, Next, Precondition, Transition, TRANSITIONS};
pub use upgrade::{NoUpgrade, UpgradeChecker};
pub use worker::{
    mailbox, Envelope, MailboxHandle, WorkerCommand, WorkerInbox, WorkerMailbox, WorkerMessage,
    CONFIG_FIELD, DEVICE_TEST_FIELD, SETTINGS_FIELD,
};
