//! Device controller
//!
//! Owns the scanner state and turns client commands into worker messages
//! according to [`TRANSITIONS`](crate::transitions::TRANSITIONS). Commands
//! arrive through the bus's command queue, so all state changes happen on
//! the draining thread, one command at a time.

use fabscan_communication::{NetConnectClient, NetConnectConfig, NetConnectService};
use fabscan_core::{
    thread_safe_rw, AppEvent, ClientId, ClientInit, Command, EventBus, EventFilter, EventKind,
    NetConnectCommand, Result, ScannerState, SubscriptionId, ThreadSafeRw, UpgradeInfo,
};
use fabscan_settings::{JsonDocument, SharedDocument};
use serde_json::Value;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::meshing::{MeshRequest, MeshingLauncher};
use crate::transitions::{self, Action, Next, Transition};
use crate::upgrade::{NoUpgrade, UpgradeChecker};
use crate::worker::{
    WorkerCommand, WorkerMailbox, WorkerMessage, CONFIG_FIELD, DEVICE_TEST_FIELD, SETTINGS_FIELD,
};

/// Firmware version reported when the worker cannot be asked
pub const UNKNOWN_FIRMWARE: &str = "undefined";

/// What [`DeviceController::handle_command`] did
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// No row applied in the current state
    Ignored,
    /// A row applied
    Handled {
        previous: ScannerState,
        current: ScannerState,
        /// Reply to a blocking worker call, kept for the caller
        reply: Option<Value>,
    },
}

/// Scanner state machine
pub struct DeviceController {
    state: ThreadSafeRw<ScannerState>,
    upgrade: ThreadSafeRw<UpgradeInfo>,
    bus: Arc<EventBus>,
    worker: Arc<dyn WorkerMailbox>,
    netconnect: Arc<dyn NetConnectService>,
    upgrade_checker: Arc<dyn UpgradeChecker>,
    meshing: MeshingLauncher,
    config: Arc<dyn SharedDocument>,
    settings: Arc<dyn SharedDocument>,
    ask_timeout: Option<Duration>,
    version: String,
}

impl DeviceController {
    /// Create a controller in IDLE with default collaborators
    pub fn new(bus: Arc<EventBus>, worker: Arc<dyn WorkerMailbox>) -> Self {
        Self {
            state: thread_safe_rw(ScannerState::Idle),
            upgrade: thread_safe_rw(UpgradeInfo::default()),
            bus,
            worker,
            netconnect: Arc::new(NetConnectClient::new(NetConnectConfig::default())),
            upgrade_checker: Arc::new(NoUpgrade),
            meshing: MeshingLauncher::default(),
            config: Arc::new(JsonDocument::empty("config")),
            settings: Arc::new(JsonDocument::empty("settings")),
            ask_timeout: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_netconnect(mut self, netconnect: Arc<dyn NetConnectService>) -> Self {
        self.netconnect = netconnect;
        self
    }

    pub fn with_upgrade_checker(mut self, checker: Arc<dyn UpgradeChecker>) -> Self {
        self.upgrade_checker = checker;
        self
    }

    pub fn with_meshing(mut self, meshing: MeshingLauncher) -> Self {
        self.meshing = meshing;
        self
    }

    /// Documents served by GET_CONFIG and GET_SETTINGS and updated by
    /// UPDATE_CONFIG and UPDATE_SETTINGS
    pub fn with_documents(
        mut self,
        config: Arc<dyn SharedDocument>,
        settings: Arc<dyn SharedDocument>,
    ) -> Self {
        self.config = config;
        self.settings = settings;
        self
    }

    /// Bound blocking worker calls; `None` waits forever
    pub fn with_ask_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.ask_timeout = timeout;
        self
    }

    /// Version reported to clients, without the `v.` prefix
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Current state; safe to call from any thread
    pub fn state(&self) -> ScannerState {
        *self.state.read()
    }

    /// Upgrade status from the last client connect
    pub fn upgrade_info(&self) -> UpgradeInfo {
        self.upgrade.read().clone()
    }

    /// Subscribe to commands and client connects on `self.bus`
    ///
    /// The subscription holds a weak reference; dropping the last `Arc`
    /// turns it into a no-op.
    pub fn attach(self: &Arc<Self>) -> SubscriptionId {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.bus.subscribe(
            EventFilter::Kinds(vec![EventKind::Command, EventKind::OnClientConnected]),
            move |event| {
                if let Some(controller) = weak.upgrade() {
                    controller.handle_event(event);
                }
            },
        )
    }

    /// Process one bus event, logging failures
    pub fn handle_event(&self, event: AppEvent) {
        match event {
            AppEvent::Command { client, command } => {
                let name = command.kind();
                if let Err(e) = self.handle_command(&client, command) {
                    tracing::error!("Failed to process {} from {}: {}", name, client, e);
                }
            }
            AppEvent::OnClientConnected { client } => self.on_client_connected(&client),
            other => tracing::trace!("Controller ignores {}", other.kind()),
        }
    }

    /// Apply one command to the state machine
    pub fn handle_command(&self, client: &ClientId, command: Command) -> Result<CommandOutcome> {
        let previous = self.state();
        let upgrade_available = self.upgrade.read().available;

        let Some(transition) = transitions::lookup(command.kind(), previous, upgrade_available)
        else {
            tracing::debug!("Ignoring {} in state {}", command.kind(), previous);
            return Ok(CommandOutcome::Ignored);
        };

        let reply = self.apply(client, command, transition, previous)?;
        Ok(CommandOutcome::Handled {
            previous,
            current: self.state(),
            reply,
        })
    }

    fn apply(
        &self,
        client: &ClientId,
        command: Command,
        transition: &Transition,
        previous: ScannerState,
    ) -> Result<Option<Value>> {
        match transition.action {
            Action::Ask(worker_command) => {
                let message = self.worker_message(worker_command, &command);
                let answer = self.worker.ask(message, self.ask_timeout);
                match transition.next {
                    // Leaving a state happens whatever the worker answered.
                    Next::To(next) => {
                        self.set_state(next);
                        match answer {
                            Ok(value) => Ok(Some(value)),
                            Err(e) => {
                                tracing::warn!(
                                    "{} failed while leaving {}: {}",
                                    worker_command,
                                    previous,
                                    e
                                );
                                Ok(None)
                            }
                        }
                    }
                    Next::Unchanged => Ok(Some(answer?)),
                }
            }
            action => {
                if let Next::To(next) = transition.next {
                    self.set_state(next);
                }
                self.perform(client, command, action)?;
                Ok(None)
            }
        }
    }

    /// Non-blocking actions; `apply` handles `Ask` itself
    fn perform(&self, client: &ClientId, command: Command, action: Action) -> Result<()> {
        match action {
            Action::Nothing | Action::Ask(_) => {}
            Action::Tell(worker_command) => {
                let message = self.worker_message(worker_command, &command);
                self.worker.tell(message)?;
                self.record_update(&command);
            }
            Action::LaunchMeshing => {
                if let Command::Meshing {
                    scan_id,
                    filter,
                    format,
                } = command
                {
                    self.meshing.launch(MeshRequest {
                        scan_id,
                        filter,
                        format,
                    })?;
                }
            }
            Action::ReplyConfig => {
                self.reply(AppEvent::OnGetConfig {
                    client: client.clone(),
                    config: self.config.snapshot(),
                });
            }
            Action::ReplySettings => {
                self.reply(AppEvent::OnGetSettings {
                    client: client.clone(),
                    settings: self.settings.snapshot(),
                });
            }
            Action::NetConnect => {
                if let Command::NetConnect { function, data } = command {
                    self.call_netconnect(client, function, data.as_ref());
                }
            }
        }
        Ok(())
    }

    fn worker_message(&self, worker_command: WorkerCommand, command: &Command) -> WorkerMessage {
        let message = WorkerMessage::new(worker_command);
        match command {
            Command::UpdateSettings { settings } => message.with(SETTINGS_FIELD, settings.clone()),
            Command::UpdateConfig { config } => message.with(CONFIG_FIELD, config.clone()),
            Command::HardwareTestFunction { device } => {
                message.with(DEVICE_TEST_FIELD, device.clone())
            }
            _ => message,
        }
    }

    /// Keep the served documents in step with what the worker was told
    fn record_update(&self, command: &Command) {
        match command {
            Command::UpdateSettings { settings } => self.settings.merge(settings),
            Command::UpdateConfig { config } => self.config.merge(config),
            _ => {}
        }
    }

    /// Netconnect failures stay server-side; only successes reach the client
    fn call_netconnect(&self, client: &ClientId, function: NetConnectCommand, data: Option<&Value>) {
        match self.netconnect.call(function, data) {
            Ok(response) => self.reply(AppEvent::OnNetConnect {
                client: client.clone(),
                response,
                command: function,
            }),
            Err(e) => tracing::warn!("netconnect {} for {} failed: {}", function, client, e),
        }
    }

    /// Greet a new client and nudge the worker to report its status
    pub fn on_client_connected(&self, client: &ClientId) {
        let firmware_version = match self
            .worker
            .ask(WorkerMessage::new(WorkerCommand::GetHardwareInfo), self.ask_timeout)
        {
            Ok(Value::String(info)) => info,
            Ok(other) => other.to_string(),
            Err(e) => {
                tracing::debug!("No hardware info for {}: {}", client, e);
                UNKNOWN_FIRMWARE.to_string()
            }
        };

        let upgrade = self.upgrade_checker.check(&self.version);
        tracing::debug!(
            "Upgrade available: {} {}",
            upgrade.available,
            upgrade.version
        );
        *self.upgrade.write() = upgrade.clone();

        self.reply(AppEvent::OnClientInit(ClientInit {
            client: client.clone(),
            state: self.state(),
            server_version: format!("v.{}", self.version),
            firmware_version,
            upgrade,
        }));

        for notify in [
            WorkerCommand::NotifyHardwareState,
            WorkerCommand::NotifyIfNotCalibrated,
        ] {
            if let Err(e) = self.worker.tell(WorkerMessage::new(notify)) {
                tracing::warn!("Failed to send {}: {}", notify, e);
            }
        }
    }

    fn reply(&self, event: AppEvent) {
        if let Err(e) = self.bus.send_to_client(event) {
            tracing::debug!("Client reply not delivered: {}", e);
        }
    }

    /// The only writer of the state; announces every change
    fn set_state(&self, state: ScannerState) {
        *self.state.write() = state;
        tracing::info!("Scanner state: {}", state);
        if let Err(e) = self.bus.broadcast(AppEvent::OnStateChanged { state }) {
            tracing::debug!("State change not delivered: {}", e);
        }
    }
}

impl std::fmt::Debug for DeviceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceController")
            .field("state", &self.state())
            .field("upgrade", &self.upgrade_info())
            .field("ask_timeout", &self.ask_timeout)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}
