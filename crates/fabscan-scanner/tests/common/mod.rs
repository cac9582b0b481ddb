#![allow(dead_code)]

use fabscan_communication::{NetConnectResult, NetConnectService};
use fabscan_core::{
    thread_safe_vec, AppEvent, ClientId, Command, CommandKind, EventBus, EventFilter, EventKind,
    NetConnectCommand, ScannerState, ThreadSafeVec, UpgradeInfo, WorkerError,
};
use fabscan_scanner::{DeviceController, WorkerCommand, WorkerMailbox, WorkerMessage};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Tell,
    Ask,
}

/// Worker mailbox that records every message and answers asks from a script
#[derive(Default)]
pub struct MockWorker {
    sent: Mutex<Vec<(Mode, WorkerMessage)>>,
    replies: Mutex<HashMap<WorkerCommand, Result<Value, WorkerError>>>,
}

impl MockWorker {
    pub fn reply_to(&self, command: WorkerCommand, reply: Result<Value, WorkerError>) {
        self.replies.lock().insert(command, reply);
    }

    pub fn sent(&self) -> Vec<(Mode, WorkerMessage)> {
        self.sent.lock().clone()
    }

    pub fn commands(&self) -> Vec<(Mode, WorkerCommand)> {
        self.sent
            .lock()
            .iter()
            .map(|(mode, message)| (*mode, message.command))
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl WorkerMailbox for MockWorker {
    fn tell(&self, message: WorkerMessage) -> Result<(), WorkerError> {
        self.sent.lock().push((Mode::Tell, message));
        Ok(())
    }

    fn ask(&self, message: WorkerMessage, _timeout: Option<Duration>) -> Result<Value, WorkerError> {
        let command = message.command;
        self.sent.lock().push((Mode::Ask, message));
        self.replies
            .lock()
            .get(&command)
            .cloned()
            .unwrap_or(Ok(Value::Null))
    }
}

/// netconnect service that records calls and replays scripted results
#[derive(Default)]
pub struct MockNetConnect {
    calls: Mutex<Vec<(NetConnectCommand, Option<Value>)>>,
    results: Mutex<VecDeque<NetConnectResult<Value>>>,
}

impl MockNetConnect {
    pub fn push_result(&self, result: NetConnectResult<Value>) {
        self.results.lock().push_back(result);
    }

    pub fn calls(&self) -> Vec<(NetConnectCommand, Option<Value>)> {
        self.calls.lock().clone()
    }
}

impl NetConnectService for MockNetConnect {
    fn call(&self, command: NetConnectCommand, data: Option<&Value>) -> NetConnectResult<Value> {
        self.calls.lock().push((command, data.cloned()));
        self.results.lock().pop_front().unwrap_or(Ok(Value::Null))
    }
}

pub struct Fixture {
    pub bus: Arc<EventBus>,
    pub worker: Arc<MockWorker>,
    pub netconnect: Arc<MockNetConnect>,
    pub controller: Arc<DeviceController>,
    events: ThreadSafeVec<AppEvent>,
}

pub fn client() -> ClientId {
    ClientId::new("ws-1")
}

pub fn upgrade(available: bool) -> UpgradeInfo {
    UpgradeInfo {
        available,
        version: if available { "0.7.0" } else { "0.6.0" }.to_string(),
    }
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_upgrade(false)
    }

    /// Controller whose upgrade checker reports `available`
    pub fn with_upgrade(available: bool) -> Self {
        let bus = Arc::new(EventBus::new());
        let worker = Arc::new(MockWorker::default());
        let netconnect = Arc::new(MockNetConnect::default());
        let controller = DeviceController::new(bus.clone(), worker.clone())
            .with_netconnect(netconnect.clone())
            .with_upgrade_checker(Arc::new(move |_: &str| upgrade(available)))
            .with_version("0.6.0");
        let controller = Arc::new(controller);

        let events = thread_safe_vec();
        let sink = events.clone();
        bus.subscribe(
            EventFilter::Kinds(vec![
                EventKind::OnStateChanged,
                EventKind::OnGetConfig,
                EventKind::OnGetSettings,
                EventKind::OnClientInit,
                EventKind::OnNetConnect,
            ]),
            move |event| sink.lock().push(event),
        );

        Self {
            bus,
            worker,
            netconnect,
            controller,
            events,
        }
    }

    /// Fixture already in `state`, with the upgrade flag primed and all
    /// recordings cleared
    pub fn in_state(state: ScannerState, upgrade_available: bool) -> Self {
        let fixture = Self::with_upgrade(upgrade_available);
        fixture.controller.on_client_connected(&client());
        let path: &[Command] = match state {
            ScannerState::Idle => &[],
            ScannerState::Settings => &[Command::Scan],
            ScannerState::Scanning => &[Command::Scan, Command::Start],
            ScannerState::Calibrating => &[Command::Calibrate],
            ScannerState::Upgrading => &[Command::UpgradeServer],
        };
        for command in path {
            fixture.command(command.clone());
        }
        assert_eq!(fixture.controller.state(), state, "could not reach {}", state);
        fixture.worker.clear();
        fixture.events.lock().clear();
        fixture
    }

    pub fn command(&self, command: Command) -> fabscan_core::Result<fabscan_scanner::CommandOutcome> {
        self.controller.handle_command(&client(), command)
    }

    pub fn events(&self) -> Vec<AppEvent> {
        self.events.lock().clone()
    }

    pub fn states(&self) -> Vec<ScannerState> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                AppEvent::OnStateChanged { state } => Some(*state),
                _ => None,
            })
            .collect()
    }
}

/// A representative command of each kind
pub fn sample(kind: CommandKind) -> Command {
    match kind {
        CommandKind::Scan => Command::Scan,
        CommandKind::Start => Command::Start,
        CommandKind::Stop => Command::Stop,
        CommandKind::Calibrate => Command::Calibrate,
        CommandKind::HardwareTestFunction => Command::HardwareTestFunction {
            device: "LASER".to_string(),
        },
        CommandKind::Meshing => Command::Meshing {
            scan_id: "scan-1".to_string(),
            filter: "default_meshing.mlx".to_string(),
            format: "ply".to_string(),
        },
        CommandKind::Complete => Command::Complete,
        CommandKind::ScannerError => Command::ScannerError,
        CommandKind::UpgradeServer => Command::UpgradeServer,
        CommandKind::RestartServer => Command::RestartServer,
        CommandKind::RebootSystem => Command::RebootSystem,
        CommandKind::ShutdownSystem => Command::ShutdownSystem,
        CommandKind::CalibrationComplete => Command::CalibrationComplete,
        CommandKind::NetConnect => Command::NetConnect {
            function: NetConnectCommand::GetStatus,
            data: None,
        },
        CommandKind::GetSettings => Command::GetSettings,
        CommandKind::UpdateSettings => Command::UpdateSettings {
            settings: json!({"resolution": 1}),
        },
        CommandKind::GetConfig => Command::GetConfig,
        CommandKind::UpdateConfig => Command::UpdateConfig {
            config: json!({"laser": {"numbers": 1}}),
        },
    }
}
