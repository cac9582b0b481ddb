//! # FabScan
//!
//! Control plane of the FabScan 3D scanner server:
//!
//! 1. **fabscan-core** - commands, states, events and the event bus
//! 2. **fabscan-communication** - netconnectd socket client
//! 3. **fabscan-settings** - server configuration and config/settings documents
//! 4. **fabscan-scanner** - device controller, worker mailbox, supervisor
//! 5. **fabscan** - this crate: logging, wiring and the `fabscan-server` binary
//!
//! The server binary drives the command loop from a line-oriented console
//! (one JSON event per line on stdin, outbound events on stdout). The scan
//! worker and the browser transport are separate processes.

pub mod console;

use anyhow::Context;
use fabscan_communication::{NetConnectClient, NetConnectConfig};
use fabscan_core::{EventBus, EventBusConfig, WorkerError};
use fabscan_scanner::{mailbox, DeviceController, ExitRequest, ServerSupervisor, WorkerInbox};
use fabscan_settings::{JsonDocument, ServerConfig};
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

pub use fabscan_core::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Environment variable selecting the log format (`json` or `pretty`)
pub const LOG_FORMAT_ENV_VAR: &str = "FABSCAN_LOG_FORMAT";

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - RUST_LOG environment variable support (default `info`)
/// - Pretty console output, or JSON lines when `FABSCAN_LOG_FORMAT=json`
/// - Logs go to stderr; stdout carries the console protocol
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV_VAR).is_ok_and(|format| format == "json");

    if json {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_line_number(true)
            .json();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_line_number(true)
            .pretty();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}

/// Answer the mailbox while no scan worker is attached
///
/// Told messages are logged and dropped; asked messages fail, which the
/// controller already tolerates.
pub fn spawn_detached_worker(mut inbox: WorkerInbox) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("scan-worker".to_string())
        .spawn(move || {
            while let Some(envelope) = inbox.blocking_recv() {
                let command = envelope.message().command;
                tracing::debug!("No scan worker attached, dropping {}", command);
                if envelope.expects_reply() {
                    envelope.reply(Err(WorkerError::failed(
                        command.as_str(),
                        "no scan worker attached",
                    )));
                }
            }
        })
}

/// Build every component from `config` and run the command loop
///
/// Returns once the bus was closed, either by a lifecycle command or
/// because the console input ended. The result says what the host should
/// do next.
pub fn run(config: &ServerConfig) -> anyhow::Result<Option<ExitRequest>> {
    tracing::info!("FabScan server v.{} (built {})", VERSION, BUILD_DATE);

    let bus = Arc::new(EventBus::with_config(EventBusConfig {
        channel_capacity: config.event_bus.channel_capacity,
        idle_wait: config.event_bus.idle_wait(),
    }));

    let documents = &config.documents;
    let scanner_config = JsonDocument::load("config", documents.config_path.as_deref())
        .context("loading scanner config document")?;
    let scanner_settings = JsonDocument::load("settings", documents.settings_path.as_deref())
        .context("loading scanner settings document")?;

    let netconnect = NetConnectClient::new(NetConnectConfig {
        socket_path: config.netconnect.socket_path.clone(),
        timeout: config.netconnect.timeout(),
        chunk_size: config.netconnect.chunk_size,
        max_response_bytes: config.netconnect.max_response_bytes,
    });

    let (worker, inbox) = mailbox();
    let worker_thread = spawn_detached_worker(inbox).context("starting scan worker")?;

    let controller = Arc::new(
        DeviceController::new(Arc::clone(&bus), Arc::new(worker))
            .with_netconnect(Arc::new(netconnect))
            .with_documents(Arc::new(scanner_config), Arc::new(scanner_settings))
            .with_ask_timeout(config.worker.ask_timeout())
            .with_version(VERSION),
    );
    controller.attach();

    let supervisor = Arc::new(ServerSupervisor::new(Arc::clone(&bus)));
    supervisor.attach();

    console::attach_output(&bus);
    let dispatcher = bus.spawn_dispatcher()?;
    console::spawn_input(Arc::clone(&bus)).context("starting console input")?;

    dispatcher.wait()?;

    // The controller holds the last mailbox handle; dropping it lets the
    // detached worker finish.
    drop(controller);
    if worker_thread.join().is_err() {
        tracing::warn!("Scan worker thread panicked");
    }

    let request = supervisor.exit_request();
    tracing::info!("FabScan server exit. Bye!");
    Ok(request)
}

/// Load the configuration from `path` (or the usual locations) and run
pub fn run_from(path: Option<&Path>) -> anyhow::Result<Option<ExitRequest>> {
    let config = ServerConfig::load(path).context("loading server configuration")?;
    run(&config)
}
