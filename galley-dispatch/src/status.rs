//! Connection status and status-change listeners

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Bridge connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    Error,
    NotInstalled,
}

impl ConnectionStatus {
    /// Whether `self -> next` is a legal edge
    ///
    /// ```text
    /// not-installed --(bridge found)--> disconnected
    /// disconnected|error --connect()--> connecting
    /// connecting --(open)--> connected
    /// connecting --(timeout/fail)--> error
    /// connected --(closed)--> disconnected
    /// any --(transport error)--> error
    /// any --disconnect()--> disconnected
    /// disconnected|error|not-installed --(bridge missing)--> not-installed
    /// ```
    pub fn can_transition_to(self, next: ConnectionStatus) -> bool {
        use ConnectionStatus::*;
        match (self, next) {
            (_, Error) | (_, Disconnected) => true,
            (Disconnected | Error, Connecting) => true,
            (Connecting, Connected) => true,
            (Disconnected | Error | NotInstalled, NotInstalled) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
            Self::NotInstalled => "not-installed",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Out-of-band events for the UI (toasts, banners)
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Bridge agent not found within the wait bound
    BridgeUnavailable,
    /// Connect attempt timed out
    ConnectionTimeout,
    /// Connect attempt failed before the timeout
    ConnectFailed { reason: String },
    /// Link dropped unexpectedly
    ConnectionLost { reason: String },
    /// Automatic reconnect scheduled
    ReconnectScheduled { attempt: u32, delay: Duration },
    /// Automatic reconnects stopped at the cap
    ReconnectExhausted { attempts: u32 },
    /// A submitted job failed
    PrintFailed { printer: String, error: String },
}

type Listener = Arc<dyn Fn(ConnectionStatus) + Send + Sync>;

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Ordered registry of status-change callbacks
#[derive(Clone, Default)]
pub struct StatusListeners {
    table: Arc<Mutex<ListenerTable>>,
}

impl StatusListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; it stays registered until the returned
    /// [`Subscription`] is dropped or unsubscribed
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        let mut table = self.table.lock();
        let id = table.next_id;
        table.next_id += 1;
        table.entries.push((id, Arc::new(callback)));

        Subscription {
            id,
            table: Arc::downgrade(&self.table),
        }
    }

    /// Call every listener in registration order
    ///
    /// A panicking listener is logged and skipped; the others still run.
    pub fn emit(&self, status: ConnectionStatus) {
        // Snapshot so listeners may (un)subscribe without deadlocking
        let listeners: Vec<(u64, Listener)> = self.table.lock().entries.clone();

        for (id, listener) in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(status))).is_err() {
                tracing::error!(listener_id = id, status = %status, "Status listener panicked");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.table.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unsubscribe token returned by [`StatusListeners::subscribe`]
#[must_use = "dropping a Subscription unregisters the listener"]
pub struct Subscription {
    id: u64,
    table: Weak<Mutex<ListenerTable>>,
}

impl Subscription {
    /// Unregister the listener
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Keep the listener registered for the lifetime of the listener table
    pub fn detach(self) {
        std::mem::forget(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            table.lock().entries.retain(|(id, _)| *id != self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
