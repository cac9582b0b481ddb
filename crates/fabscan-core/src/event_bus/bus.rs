//! Event Bus implementation.
//!
//! Provides the EventBus struct: synchronous subscriber dispatch, an async
//! broadcast channel for transport tasks, and the FIFO command queue that
//! serializes all command processing onto one draining thread.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::events::{AppEvent, EventKind};
use super::queue::{CommandQueue, Dequeued};

/// Subscription handle for unsubscribing from events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new unique subscription ID
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// Filter to receive only specific event kinds
#[derive(Debug, Clone, Default)]
pub enum EventFilter {
    /// Receive all events.
    #[default]
    All,
    /// Receive events matching any of these kinds.
    Kinds(Vec<EventKind>),
}

impl EventFilter {
    /// Filter for a single kind
    pub fn kind(kind: EventKind) -> Self {
        EventFilter::Kinds(vec![kind])
    }

    /// Check if an event matches this filter
    pub fn matches(&self, event: &AppEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Kinds(kinds) => kinds.contains(&event.kind()),
        }
    }
}

/// Type alias for event handler functions
type EventHandler = Arc<dyn Fn(AppEvent) + Send + Sync>;

/// Configuration for the event bus
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Channel capacity for broadcast.
    pub channel_capacity: usize,
    /// How long the draining thread sleeps on an empty queue before
    /// re-checking for shutdown.
    pub idle_wait: Duration,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            idle_wait: Duration::from_millis(50),
        }
    }
}

/// Error types for event bus operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventBusError {
    /// No subscribers are listening
    #[error("No active subscribers")]
    NoSubscribers,
    /// A client reply was sent without a client handle
    #[error("{kind} event carries no client handle")]
    MissingClient {
        /// Kind of the rejected event.
        kind: EventKind,
    },
    /// The command queue no longer accepts events
    #[error("Command queue is closed")]
    QueueClosed,
    /// The draining thread could not be started
    #[error("Failed to start event dispatcher: {0}")]
    DispatcherSpawn(String),
    /// The draining thread panicked
    #[error("Event dispatcher panicked")]
    DispatcherPanicked,
}

/// Central event bus
///
/// One instance is constructed at startup and shared (`Arc`) with every
/// component that publishes or subscribes.
pub struct EventBus {
    /// Broadcast channel sender
    sender: broadcast::Sender<AppEvent>,
    /// Registered synchronous handlers
    handlers: Arc<RwLock<HashMap<SubscriptionId, (EventFilter, EventHandler)>>>,
    /// Commands waiting for the draining thread
    queue: CommandQueue,
    /// Configuration
    config: EventBusConfig,
}

impl EventBus {
    /// Create a new event bus with default configuration
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Create a new event bus with custom configuration
    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity);
        Self {
            sender,
            handlers: Arc::new(RwLock::new(HashMap::new())),
            queue: CommandQueue::new(),
            config,
        }
    }

    /// Publish an event to every subscriber of its kind
    ///
    /// Handlers run on the calling thread before this returns. Returns the
    /// number of async receivers that will also see the event.
    pub fn broadcast(&self, event: AppEvent) -> Result<usize, EventBusError> {
        tracing::trace!("Broadcast: {}", event.description());
        self.deliver(event)
    }

    /// Publish a reply addressed to a single client
    ///
    /// Delivery is the same as [`broadcast`](Self::broadcast); the transport
    /// layer uses the event's `client` field to route it to one connection.
    pub fn send_to_client(&self, event: AppEvent) -> Result<usize, EventBusError> {
        let Some(client) = event.client() else {
            return Err(EventBusError::MissingClient { kind: event.kind() });
        };
        tracing::debug!("Client message for {}: {}", client, event.kind());
        self.deliver(event)
    }

    /// Append an event to the command queue
    ///
    /// The event is delivered later, in FIFO order, by the draining thread.
    pub fn enqueue(&self, event: AppEvent) -> Result<(), EventBusError> {
        if self.queue.push(event) {
            Ok(())
        } else {
            Err(EventBusError::QueueClosed)
        }
    }

    /// Deliver every event currently queued, oldest first
    ///
    /// Returns the number of events delivered.
    pub fn dispatch_pending(&self) -> usize {
        let mut delivered = 0;
        while let Some(event) = self.queue.try_pop() {
            let _ = self.deliver(event);
            delivered += 1;
        }
        delivered
    }

    /// Wait up to `timeout` for one queued event and deliver it
    ///
    /// Returns false if nothing was delivered.
    pub fn dispatch_next(&self, timeout: Duration) -> bool {
        match self.queue.pop_timeout(timeout) {
            Dequeued::Event(event) => {
                let _ = self.deliver(event);
                true
            }
            Dequeued::Empty | Dequeued::Closed => false,
        }
    }

    /// Drain the command queue until it is closed
    ///
    /// This is the body of the draining thread: it blocks while the queue
    /// is empty and returns once [`close`](Self::close) was called and all
    /// remaining events were delivered.
    pub fn run_dispatch_loop(&self) {
        tracing::info!("Event dispatcher started");
        loop {
            match self.queue.pop_timeout(self.config.idle_wait) {
                Dequeued::Event(event) => {
                    let _ = self.deliver(event);
                }
                Dequeued::Empty => continue,
                Dequeued::Closed => break,
            }
        }
        tracing::info!("Event dispatcher stopped");
    }

    /// Start the draining thread
    pub fn spawn_dispatcher(self: &Arc<Self>) -> Result<DispatcherHandle, EventBusError> {
        let bus = Arc::clone(self);
        let thread = std::thread::Builder::new()
            .name("event-dispatcher".to_string())
            .spawn(move || bus.run_dispatch_loop())
            .map_err(|e| EventBusError::DispatcherSpawn(e.to_string()))?;

        Ok(DispatcherHandle {
            bus: Arc::clone(self),
            thread: Some(thread),
        })
    }

    /// Stop accepting queued events and let the dispatcher finish
    pub fn close(&self) {
        self.queue.close();
    }

    /// Whether the command queue has been closed
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    /// Number of events waiting in the command queue
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Subscribe to events with a synchronous handler
    ///
    /// The handler is called on the publishing thread (for queued events,
    /// the draining thread), so a slow handler delays all later events.
    pub fn subscribe<F>(&self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: Fn(AppEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        let mut handlers = self.handlers.write();
        handlers.insert(id, (filter, Arc::new(handler)));
        tracing::debug!("Subscription {} added", id);
        id
    }

    /// Get a receiver for manual event polling
    ///
    /// Used by async transport tasks that forward events to clients.
    pub fn receiver(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Unsubscribe from events
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let removed = handlers.remove(&id).is_some();
        if removed {
            tracing::debug!("Subscription {} removed", id);
        }
        removed
    }

    /// Get the number of active subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Get the current configuration
    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    fn deliver(&self, event: AppEvent) -> Result<usize, EventBusError> {
        // Handlers may publish from inside their callback, so the lock is
        // released before any of them runs.
        let matching: Vec<(SubscriptionId, EventHandler)> = self
            .handlers
            .read()
            .iter()
            .filter(|(_, (filter, _))| filter.matches(&event))
            .map(|(id, (_, handler))| (*id, Arc::clone(handler)))
            .collect();

        for (id, handler) in &matching {
            let event = event.clone();
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                tracing::error!("Subscriber {} panicked while handling an event", id);
            }
        }

        match self.sender.send(event) {
            Ok(count) => Ok(count),
            Err(_) => {
                if matching.is_empty() {
                    Err(EventBusError::NoSubscribers)
                } else {
                    Ok(0)
                }
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("queued", &self.queued_len())
            .field("config", &self.config)
            .finish()
    }
}

/// Handle to the running draining thread
#[derive(Debug)]
pub struct DispatcherHandle {
    bus: Arc<EventBus>,
    thread: Option<JoinHandle<()>>,
}

impl DispatcherHandle {
    /// Close the queue and wait for the draining thread to finish
    pub fn shutdown(mut self) -> Result<(), EventBusError> {
        self.bus.close();
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| EventBusError::DispatcherPanicked),
            None => Ok(()),
        }
    }

    /// Wait for the draining thread to finish after someone else closed
    /// the bus
    pub fn wait(mut self) -> Result<(), EventBusError> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| EventBusError::DispatcherPanicked),
            None => Ok(()),
        }
    }
}

impl Drop for DispatcherHandle {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.bus.close();
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ClientId, Command, ScannerState};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn command(client: &str, command: Command) -> AppEvent {
        AppEvent::Command {
            client: ClientId::new(client),
            command,
        }
    }

    #[test]
    fn test_event_bus_creation() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.queued_len(), 0);
    }

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let bus = EventBus::new();

        let id = bus.subscribe(EventFilter::All, |_| {});
        assert_eq!(bus.subscriber_count(), 1);

        assert!(bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(), 0);

        // Double unsubscribe should return false
        assert!(!bus.unsubscribe(id));
    }

    #[test]
    fn test_broadcast_without_subscribers() {
        let bus = EventBus::new();
        let result = bus.broadcast(AppEvent::OnStateChanged {
            state: ScannerState::Idle,
        });
        assert_eq!(result, Err(EventBusError::NoSubscribers));
    }

    #[test]
    fn test_event_filtering() {
        let bus = EventBus::new();
        let command_count = Arc::new(AtomicUsize::new(0));
        let state_count = Arc::new(AtomicUsize::new(0));

        let cc = command_count.clone();
        bus.subscribe(EventFilter::kind(EventKind::Command), move |_| {
            cc.fetch_add(1, Ordering::SeqCst);
        });

        let sc = state_count.clone();
        bus.subscribe(EventFilter::kind(EventKind::OnStateChanged), move |_| {
            sc.fetch_add(1, Ordering::SeqCst);
        });

        bus.broadcast(command("a", Command::Scan)).ok();
        bus.broadcast(AppEvent::OnStateChanged {
            state: ScannerState::Settings,
        })
        .ok();
        bus.broadcast(AppEvent::OnStateChanged {
            state: ScannerState::Idle,
        })
        .ok();

        assert_eq!(command_count.load(Ordering::SeqCst), 1);
        assert_eq!(state_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_send_to_client_requires_client() {
        let bus = EventBus::new();
        bus.subscribe(EventFilter::All, |_| {});

        let err = bus
            .send_to_client(AppEvent::OnStateChanged {
                state: ScannerState::Idle,
            })
            .expect_err("state change has no client");
        assert_eq!(
            err,
            EventBusError::MissingClient {
                kind: EventKind::OnStateChanged
            }
        );

        let sent = bus.send_to_client(AppEvent::OnGetConfig {
            client: ClientId::new("ws-9"),
            config: serde_json::json!({}),
        });
        assert!(sent.is_ok());
    }

    #[test]
    fn test_queue_is_fifo() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        bus.subscribe(EventFilter::kind(EventKind::Command), move |event| {
            if let Some(client) = event.client() {
                sink.lock().push(client.to_string());
            }
        });

        for i in 0..20 {
            bus.enqueue(command(&format!("c{}", i), Command::GetConfig))
                .expect("queue open");
        }
        // Nothing is delivered until the queue is drained
        assert!(seen.lock().is_empty());

        assert_eq!(bus.dispatch_pending(), 20);
        let expected: Vec<String> = (0..20).map(|i| format!("c{}", i)).collect();
        assert_eq!(*seen.lock(), expected);
    }

    #[test]
    fn test_handler_may_publish_while_dispatching() {
        let bus = Arc::new(EventBus::new());
        let states = Arc::new(AtomicUsize::new(0));

        let inner = Arc::clone(&bus);
        bus.subscribe(EventFilter::kind(EventKind::Command), move |_| {
            inner
                .broadcast(AppEvent::OnStateChanged {
                    state: ScannerState::Settings,
                })
                .ok();
        });
        let counter = states.clone();
        bus.subscribe(EventFilter::kind(EventKind::OnStateChanged), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.enqueue(command("a", Command::Scan)).expect("queue open");
        bus.dispatch_pending();
        assert_eq!(states.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_handler_does_not_stop_delivery() {
        let bus = EventBus::new();
        let delivered = Arc::new(AtomicUsize::new(0));

        bus.subscribe(EventFilter::All, |_| panic!("broken subscriber"));
        let counter = delivered.clone();
        bus.subscribe(EventFilter::All, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.enqueue(command("a", Command::Stop)).expect("queue open");
        bus.enqueue(command("b", Command::Stop)).expect("queue open");
        bus.dispatch_pending();

        assert_eq!(delivered.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_dispatcher_thread_drains_then_stops() {
        let bus = Arc::new(EventBus::with_config(EventBusConfig {
            idle_wait: Duration::from_millis(5),
            ..Default::default()
        }));
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        bus.subscribe(EventFilter::All, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let dispatcher = bus.spawn_dispatcher().expect("spawn dispatcher");
        for _ in 0..10 {
            bus.enqueue(command("a", Command::GetSettings))
                .expect("queue open");
        }
        dispatcher.shutdown().expect("clean shutdown");

        assert_eq!(seen.load(Ordering::SeqCst), 10);
        assert_eq!(
            bus.enqueue(command("a", Command::GetSettings)),
            Err(EventBusError::QueueClosed)
        );
    }

    #[test]
    fn test_handler_can_close_the_bus() {
        let bus = Arc::new(EventBus::with_config(EventBusConfig {
            idle_wait: Duration::from_millis(5),
            ..Default::default()
        }));
        let weak = Arc::downgrade(&bus);
        bus.subscribe(EventFilter::kind(EventKind::Command), move |event| {
            if let AppEvent::Command {
                command: Command::RestartServer,
                ..
            } = event
            {
                if let Some(bus) = weak.upgrade() {
                    bus.close();
                }
            }
        });

        let dispatcher = bus.spawn_dispatcher().expect("spawn dispatcher");
        bus.enqueue(command("a", Command::RestartServer))
            .expect("queue open");
        dispatcher.wait().expect("dispatcher exits");
        assert!(bus.is_closed());
    }

    #[test]
    fn test_filter_matches() {
        let event = command("x", Command::Start);

        assert!(EventFilter::All.matches(&event));
        assert!(EventFilter::kind(EventKind::Command).matches(&event));
        assert!(!EventFilter::kind(EventKind::OnClientInit).matches(&event));
        assert!(
            EventFilter::Kinds(vec![EventKind::OnClientConnected, EventKind::Command])
                .matches(&event)
        );
    }

    #[tokio::test]
    async fn test_async_receiver() {
        let bus = EventBus::new();
        let mut receiver = bus.receiver();

        bus.broadcast(AppEvent::OnStateChanged {
            state: ScannerState::Calibrating,
        })
        .ok();

        let received = receiver.try_recv();
        match received {
            Ok(AppEvent::OnStateChanged { state }) => {
                assert_eq!(state, ScannerState::Calibrating)
            }
            other => panic!("Wrong event received: {:?}", other),
        }
    }
}
