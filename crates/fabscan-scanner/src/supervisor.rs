//! Server lifecycle requests
//!
//! Restart, reboot, shutdown and upgrade end the command loop. The
//! supervisor records which one was asked for and closes the bus; acting
//! on it is left to the process that embeds the server.

use fabscan_core::{
    thread_safe_none, AppEvent, Command, EventBus, EventFilter, EventKind, ScannerState,
    SubscriptionId, ThreadSafeOption,
};
use std::sync::{Arc, Weak};

/// What the host should do once the command loop has stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitRequest {
    /// Install the new release, then restart
    Upgrade,
    Restart,
    Reboot,
    Shutdown,
}

impl ExitRequest {
    /// Whether the server process should come back up
    pub fn restarts_server(&self) -> bool {
        matches!(self, ExitRequest::Upgrade | ExitRequest::Restart)
    }

    /// Request triggered by an event, if any
    ///
    /// An upgrade is only requested once the controller accepted it and
    /// entered UPGRADING.
    pub fn from_event(event: &AppEvent) -> Option<Self> {
        match event {
            AppEvent::Command { command, .. } => match command {
                Command::RestartServer => Some(ExitRequest::Restart),
                Command::RebootSystem => Some(ExitRequest::Reboot),
                Command::ShutdownSystem => Some(ExitRequest::Shutdown),
                _ => None,
            },
            AppEvent::OnStateChanged {
                state: ScannerState::Upgrading,
            } => Some(ExitRequest::Upgrade),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExitRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExitRequest::Upgrade => "upgrade",
            ExitRequest::Restart => "restart",
            ExitRequest::Reboot => "reboot",
            ExitRequest::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

/// Watches for lifecycle requests and stops the command loop
#[derive(Debug)]
pub struct ServerSupervisor {
    bus: Arc<EventBus>,
    request: ThreadSafeOption<ExitRequest>,
}

impl ServerSupervisor {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            request: thread_safe_none(),
        }
    }

    /// Subscribe to commands and state changes
    pub fn attach(self: &Arc<Self>) -> SubscriptionId {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.bus.subscribe(
            EventFilter::Kinds(vec![EventKind::Command, EventKind::OnStateChanged]),
            move |event| {
                if let Some(supervisor) = weak.upgrade() {
                    if let Some(request) = ExitRequest::from_event(&event) {
                        supervisor.request_exit(request);
                    }
                }
            },
        )
    }

    /// Record a request and close the bus
    ///
    /// Only the first request counts; returns false for later ones.
    pub fn request_exit(&self, request: ExitRequest) -> bool {
        {
            let mut current = self.request.lock();
            if let Some(existing) = *current {
                tracing::debug!("Ignoring {} request, {} already pending", request, existing);
                return false;
            }
            *current = Some(request);
        }
        tracing::info!("Server {} requested, stopping command loop", request);
        self.bus.close();
        true
    }

    /// The recorded request, if any
    pub fn exit_request(&self) -> Option<ExitRequest> {
        *self.request.lock()
    }
}
