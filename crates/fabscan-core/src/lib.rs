//! # FabScan Core
//!
//! Core types and the event bus for the FabScan control plane.
//! Provides the scanner lifecycle state, the client command vocabulary,
//! bus events and the shared error taxonomy.

pub mod data;
pub mod error;
pub mod event_bus;
pub mod types;

pub use data::{ClientId, Command, CommandKind, NetConnectCommand, ScannerState};

pub use error::{Error, Result, WorkerError};

// Re-export event bus for convenience
pub use event_bus::{
    AppEvent, ClientInit, DispatcherHandle, EventBus, EventBusConfig, EventBusError, EventFilter,
    EventKind, SubscriptionId, UpgradeInfo,
};

// Re-export type aliases for convenience
pub use types::{
    thread_safe_none, thread_safe_rw, thread_safe_vec, ThreadSafeOption, ThreadSafeRw,
    ThreadSafeVec,
};
