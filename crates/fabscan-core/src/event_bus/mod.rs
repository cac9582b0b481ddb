//! # Event Bus Module
//!
//! Decoupled communication between the transport layer, the device
//! controller and the netconnect client.
//!
//! ## Overview
//!
//! - `broadcast` delivers an event to every subscriber of its kind
//! - `send_to_client` does the same for replies that name one client
//! - `enqueue` parks a command until the single draining thread picks it up,
//!   which is what keeps command processing ordered and single-threaded
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fabscan_core::event_bus::{AppEvent, EventBus, EventFilter, EventKind};
//! use std::sync::Arc;
//!
//! let bus = Arc::new(EventBus::new());
//! bus.subscribe(EventFilter::kind(EventKind::OnStateChanged), |event| {
//!     println!("{}", event.description());
//! });
//!
//! let dispatcher = bus.spawn_dispatcher()?;
//! bus.enqueue(AppEvent::Command { client, command: Command::Scan })?;
//! dispatcher.shutdown()?;
//! ```

mod bus;
mod events;
mod queue;

pub use bus::*;
pub use events::*;
