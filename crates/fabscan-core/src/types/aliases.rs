//! Type aliases for the shared-state wrappers used across the server.
//!
//! The controller, the supervisor and the test doubles share small
//! pieces of state between the draining thread and connection threads.
//! These aliases give those wrappers one name everywhere.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fabscan_core::types::*;
//!
//! let state: ThreadSafeRw<ScannerState> = thread_safe_rw(ScannerState::Idle);
//! let sent: ThreadSafeVec<String> = thread_safe_vec();
//! ```

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// A thread-safe optional wrapper for state that is set at most once.
pub type ThreadSafeOption<T> = Arc<Mutex<Option<T>>>;

/// A thread-safe vector, mostly used to record calls in tests.
pub type ThreadSafeVec<T> = Arc<Mutex<Vec<T>>>;

/// A thread-safe reader-writer lock wrapper for read-heavy workloads.
///
/// The scanner state is written by the draining thread only and read by
/// any connection thread, which is exactly this access pattern.
pub type ThreadSafeRw<T> = Arc<RwLock<T>>;

/// Create a new `ThreadSafeOption<T>` initialized to `None`.
#[inline]
pub fn thread_safe_none<T>() -> ThreadSafeOption<T> {
    Arc::new(Mutex::new(None))
}

/// Create a new empty `ThreadSafeVec<T>`.
#[inline]
pub fn thread_safe_vec<T>() -> ThreadSafeVec<T> {
    Arc::new(Mutex::new(Vec::new()))
}

/// Create a new `ThreadSafeRw<T>` from a value.
#[inline]
pub fn thread_safe_rw<T>(value: T) -> ThreadSafeRw<T> {
    Arc::new(RwLock::new(value))
}
