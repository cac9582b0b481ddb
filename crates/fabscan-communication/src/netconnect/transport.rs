//! Socket transport for netconnectd
//!
//! The client only needs "open a fresh bidirectional byte stream"; the
//! [`Connector`] trait hides whether that is the daemon's Unix socket or a
//! scripted stream in tests.

use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use super::{NetConnectError, NetConnectResult};

/// Well-known netconnectd socket path
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/netconnectd.sock";

/// Trait for socket I/O operations
pub trait ReadWrite: Read + Write + Send {}
impl<T: Read + Write + Send> ReadWrite for T {}

/// Opens one stream per request
///
/// The returned stream is closed when it is dropped.
pub trait Connector: Send + Sync {
    /// Open a new connection to the daemon
    fn connect(&self) -> NetConnectResult<Box<dyn ReadWrite>>;

    /// Human-readable peer address for logging
    fn describe(&self) -> String;
}

/// Unix domain stream socket connector
#[derive(Debug, Clone)]
pub struct UnixSocketConnector {
    path: PathBuf,
    timeout: Duration,
}

impl UnixSocketConnector {
    /// Create a connector for `path`; `timeout` bounds the connect and every read and write
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for UnixSocketConnector {
    fn default() -> Self {
        Self::new(DEFAULT_SOCKET_PATH, Duration::from_secs(10))
    }
}

impl Connector for UnixSocketConnector {
    fn connect(&self) -> NetConnectResult<Box<dyn ReadWrite>> {
        let connect_error = |e: std::io::Error| NetConnectError::Connect {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        };

        let path = self.path.clone();
        let stream = connect_within(self.timeout, move || UnixStream::connect(path))
            .map_err(|e| match e.kind() {
                io::ErrorKind::TimedOut => NetConnectError::Timeout,
                _ => connect_error(e),
            })?;
        stream
            .set_read_timeout(Some(self.timeout))
            .map_err(connect_error)?;
        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(connect_error)?;

        tracing::trace!("Connected to netconnectd at {}", self.path.display());
        Ok(Box::new(stream))
    }

    fn describe(&self) -> String {
        format!("unix:{}", self.path.display())
    }
}

/// Run a blocking connect on a helper thread and give up after `timeout`
///
/// A connect still pending at the deadline finishes in the background and
/// its stream is dropped.
fn connect_within<T, F>(timeout: Duration, connect: F) -> io::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> io::Result<T> + Send + 'static,
{
    let (sender, receiver) = mpsc::sync_channel(1);
    std::thread::Builder::new()
        .name("netconnect-connect".to_string())
        .spawn(move || {
            let _ = sender.send(connect());
        })?;

    match receiver.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "connect did not complete in time",
        )),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(io::Error::other(
            "connect thread exited without a result",
        )),
    }
}
