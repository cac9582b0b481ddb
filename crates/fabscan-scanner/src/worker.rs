//! Scan worker mailbox
//!
//! The scan worker runs on its own thread and is reached only through its
//! mailbox. A message is either told (fire-and-forget) or asked, in which
//! case the caller blocks until the worker replies or the optional timeout
//! expires.

use fabscan_core::WorkerError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::mpsc as std_mpsc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Extra field carrying a settings document
pub const SETTINGS_FIELD: &str = "SETTINGS";
/// Extra field carrying a configuration document
pub const CONFIG_FIELD: &str = "CONFIG";
/// Extra field naming the device under test
pub const DEVICE_TEST_FIELD: &str = "DEVICE_TEST";

/// Commands understood by the scan worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerCommand {
    SettingsModeOn,
    SettingsModeOff,
    UpdateSettings,
    UpdateConfig,
    Start,
    Stop,
    StartCalibration,
    StopCalibration,
    CallHardwareTestFunction,
    GetHardwareInfo,
    NotifyHardwareState,
    NotifyIfNotCalibrated,
}

impl WorkerCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerCommand::SettingsModeOn => "SETTINGS_MODE_ON",
            WorkerCommand::SettingsModeOff => "SETTINGS_MODE_OFF",
            WorkerCommand::UpdateSettings => "UPDATE_SETTINGS",
            WorkerCommand::UpdateConfig => "UPDATE_CONFIG",
            WorkerCommand::Start => "START",
            WorkerCommand::Stop => "STOP",
            WorkerCommand::StartCalibration => "START_CALIBRATION",
            WorkerCommand::StopCalibration => "STOP_CALIBRATION",
            WorkerCommand::CallHardwareTestFunction => "CALL_HARDWARE_TEST_FUNCTION",
            WorkerCommand::GetHardwareInfo => "GET_HARDWARE_INFO",
            WorkerCommand::NotifyHardwareState => "NOTIFY_HARDWARE_STATE",
            WorkerCommand::NotifyIfNotCalibrated => "NOTIFY_IF_NOT_CALIBRATED",
        }
    }
}

impl std::fmt::Display for WorkerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mailbox message: `{"COMMAND": <worker command>, <extra fields>}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerMessage {
    #[serde(rename = "COMMAND")]
    pub command: WorkerCommand,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkerMessage {
    /// Message without extra fields
    pub fn new(command: WorkerCommand) -> Self {
        Self {
            command,
            extra: Map::new(),
        }
    }

    /// Attach an extra field
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// The two delivery modes of the worker mailbox
pub trait WorkerMailbox: Send + Sync {
    /// Deliver without waiting for the worker
    fn tell(&self, message: WorkerMessage) -> Result<(), WorkerError>;

    /// Deliver and block until the worker replies
    ///
    /// `None` waits indefinitely.
    fn ask(&self, message: WorkerMessage, timeout: Option<Duration>) -> Result<Value, WorkerError>;
}

type Reply = Result<Value, WorkerError>;

/// A message as received by the worker
#[derive(Debug)]
pub struct Envelope {
    message: WorkerMessage,
    reply: Option<std_mpsc::SyncSender<Reply>>,
}

impl Envelope {
    pub fn message(&self) -> &WorkerMessage {
        &self.message
    }

    /// Whether the sender is blocked waiting for [`reply`](Self::reply)
    pub fn expects_reply(&self) -> bool {
        self.reply.is_some()
    }

    /// Answer an asked message; a told message ignores the reply
    pub fn reply(self, result: Reply) {
        if let Some(reply) = self.reply {
            let _ = reply.send(result);
        }
    }
}

/// Sending half of a channel-backed mailbox
#[derive(Debug, Clone)]
pub struct MailboxHandle {
    sender: mpsc::UnboundedSender<Envelope>,
}

/// Receiving half, owned by the worker thread
#[derive(Debug)]
pub struct WorkerInbox {
    receiver: mpsc::UnboundedReceiver<Envelope>,
}

impl WorkerInbox {
    /// Block the current (non-async) thread for the next message
    ///
    /// Returns `None` once every [`MailboxHandle`] is gone.
    pub fn blocking_recv(&mut self) -> Option<Envelope> {
        self.receiver.blocking_recv()
    }

    /// Wait for the next message from an async task
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.receiver.recv().await
    }

    /// Take a message if one is waiting
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.receiver.try_recv().ok()
    }
}

/// Create a connected mailbox handle and worker inbox
pub fn mailbox() -> (MailboxHandle, WorkerInbox) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (MailboxHandle { sender }, WorkerInbox { receiver })
}

impl WorkerMailbox for MailboxHandle {
    fn tell(&self, message: WorkerMessage) -> Result<(), WorkerError> {
        tracing::trace!("tell {}", message.command);
        self.sender
            .send(Envelope {
                message,
                reply: None,
            })
            .map_err(|_| WorkerError::MailboxClosed)
    }

    fn ask(&self, message: WorkerMessage, timeout: Option<Duration>) -> Result<Value, WorkerError> {
        let command = message.command;
        let (reply, answer) = std_mpsc::sync_channel(1);
        tracing::trace!("ask {}", command);
        self.sender
            .send(Envelope {
                message,
                reply: Some(reply),
            })
            .map_err(|_| WorkerError::MailboxClosed)?;

        let dropped = || WorkerError::ReplyDropped {
            command: command.to_string(),
        };
        match timeout {
            None => answer.recv().map_err(|_| dropped())?,
            Some(timeout) => match answer.recv_timeout(timeout) {
                Ok(result) => result,
                Err(std_mpsc::RecvTimeoutError::Timeout) => Err(WorkerError::Timeout {
                    command: command.to_string(),
                    timeout_ms: whole_millis(timeout),
                }),
                Err(std_mpsc::RecvTimeoutError::Disconnected) => Err(dropped()),
            },
        }
    }
}

/// Milliseconds in `timeout`, saturating at `u64::MAX`
fn whole_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_millis_saturate() {
        assert_eq!(whole_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(whole_millis(Duration::MAX), u64::MAX);
    }
    use serde_json::json;
    use std::thread;

    #[test]
    fn test_message_wire_shape() {
        let message = WorkerMessage::new(WorkerCommand::CallHardwareTestFunction)
            .with(DEVICE_TEST_FIELD, "LASER");
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"COMMAND": "CALL_HARDWARE_TEST_FUNCTION", "DEVICE_TEST": "LASER"})
        );

        let parsed: WorkerMessage =
            serde_json::from_value(json!({"COMMAND": "UPDATE_CONFIG", "CONFIG": {"a": 1}}))
                .unwrap();
        assert_eq!(parsed.command, WorkerCommand::UpdateConfig);
        assert_eq!(parsed.get(CONFIG_FIELD), Some(&json!({"a": 1})));
    }

    #[test]
    fn test_tell_does_not_expect_reply() {
        let (handle, mut inbox) = mailbox();
        handle
            .tell(WorkerMessage::new(WorkerCommand::SettingsModeOn))
            .unwrap();

        let envelope = inbox.try_recv().unwrap();
        assert!(!envelope.expects_reply());
        assert_eq!(envelope.message().command, WorkerCommand::SettingsModeOn);
    }

    #[test]
    fn test_ask_waits_for_reply() {
        let (handle, mut inbox) = mailbox();
        let worker = thread::spawn(move || {
            let envelope = inbox.blocking_recv().unwrap();
            assert!(envelope.expects_reply());
            envelope.reply(Ok(json!("FabScanPi HAT v1.2")));
        });

        let reply = handle
            .ask(WorkerMessage::new(WorkerCommand::GetHardwareInfo), None)
            .unwrap();
        assert_eq!(reply, json!("FabScanPi HAT v1.2"));
        worker.join().unwrap();
    }

    #[test]
    fn test_ask_times_out() {
        let (handle, _inbox) = mailbox();
        let err = handle
            .ask(
                WorkerMessage::new(WorkerCommand::Stop),
                Some(Duration::from_millis(20)),
            )
            .unwrap_err();
        assert_eq!(
            err,
            WorkerError::Timeout {
                command: "STOP".to_string(),
                timeout_ms: 20
            }
        );
    }

    #[test]
    fn test_dropped_envelope_is_reported() {
        let (handle, mut inbox) = mailbox();
        let worker = thread::spawn(move || {
            let envelope = inbox.blocking_recv().unwrap();
            drop(envelope);
        });

        let err = handle
            .ask(WorkerMessage::new(WorkerCommand::StopCalibration), None)
            .unwrap_err();
        assert_eq!(
            err,
            WorkerError::ReplyDropped {
                command: "STOP_CALIBRATION".to_string()
            }
        );
        worker.join().unwrap();
    }

    #[test]
    fn test_closed_mailbox() {
        let (handle, inbox) = mailbox();
        drop(inbox);
        assert_eq!(
            handle.tell(WorkerMessage::new(WorkerCommand::Start)),
            Err(WorkerError::MailboxClosed)
        );
    }
}
