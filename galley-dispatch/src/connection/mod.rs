//! Bridge connection state machine
//!
//! [`BridgeConnection`] owns the connection status and every background task
//! tied to it (bridge wait, close watcher, heartbeat, reconnect timer).
//!
//! - At most one connection attempt is in flight; concurrent `connect()`
//!   callers share it.
//! - `disconnect()` bumps the generation counter, so tasks started for an
//!   earlier generation become no-ops even if they were not aborted in time.
//! - Status listeners are called outside the state lock.

mod reconnect;

pub use reconnect::{BACKOFF_FACTOR, ReconnectPolicy};

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::bridge::{BridgeLoader, BridgeTransport, CloseSignal};
use crate::config::ConnectionConfig;
use crate::error::TransportError;
use crate::status::{ConnectionStatus, Notification, StatusListeners, Subscription};

/// Notification channel capacity
const NOTIFICATION_CAPACITY: usize = 64;

type SharedAttempt = Shared<BoxFuture<'static, bool>>;

struct State {
    status: ConnectionStatus,
    generation: u64,
    /// Automatic reconnect attempts used since the last success
    attempts: u32,
    in_flight: Option<(u64, SharedAttempt)>,
    cancel: CancellationToken,
    retry: Option<JoinHandle<()>>,
    watcher: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
}

impl State {
    /// Move along a legal edge; returns the status to announce
    fn advance(&mut self, next: ConnectionStatus) -> Option<ConnectionStatus> {
        if self.status == next {
            return None;
        }
        if !self.status.can_transition_to(next) {
            warn!(from = %self.status, to = %next, "Illegal status transition ignored");
            return None;
        }
        debug!(from = %self.status, to = %next, "Connection status changed");
        self.status = next;
        Some(next)
    }

    /// Clear the in-flight slot if it belongs to `generation`
    fn settle(&mut self, generation: u64) {
        if matches!(self.in_flight, Some((g, _)) if g == generation) {
            self.in_flight = None;
        }
    }

    fn stop_session(&mut self) {
        if let Some(h) = self.watcher.take() {
            h.abort();
        }
        if let Some(h) = self.heartbeat.take() {
            h.abort();
        }
    }
}

struct Inner {
    transport: Arc<dyn BridgeTransport>,
    loader: BridgeLoader,
    config: ConnectionConfig,
    policy: ReconnectPolicy,
    state: Mutex<State>,
    listeners: StatusListeners,
    notifications: broadcast::Sender<Notification>,
}

/// Persistent connection to the bridge agent
///
/// Cheap to clone; clones share the same connection.
#[derive(Clone)]
pub struct BridgeConnection {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for BridgeConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConnection")
            .field("status", &self.status())
            .field("transport", &self.inner.transport)
            .finish()
    }
}

impl BridgeConnection {
    pub fn new(transport: Arc<dyn BridgeTransport>, config: ConnectionConfig) -> Self {
        let loader = BridgeLoader::new(
            transport.clone(),
            config.bridge_wait,
            config.bridge_poll_interval,
        );
        let policy = ReconnectPolicy::new(config.reconnect_base_delay, config.max_reconnect_attempts);
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                transport,
                loader,
                config,
                policy,
                state: Mutex::new(State {
                    status: ConnectionStatus::Disconnected,
                    generation: 0,
                    attempts: 0,
                    in_flight: None,
                    cancel: CancellationToken::new(),
                    retry: None,
                    watcher: None,
                    heartbeat: None,
                }),
                listeners: StatusListeners::new(),
                notifications,
            }),
        }
    }

    /// Connect to the bridge; `true` once connected
    ///
    /// Already connected resolves immediately. A call made while an attempt
    /// is in flight awaits that attempt. Once automatic retries are
    /// exhausted, calling this grants a fresh retry budget.
    #[instrument(skip(self))]
    pub async fn connect(&self) -> bool {
        loop {
            let (attempt, stale) = {
                let mut st = self.inner.state.lock();
                let joined = st
                    .in_flight
                    .as_ref()
                    .map(|(generation, attempt)| (attempt.clone(), *generation != st.generation));
                match joined {
                    Some(joined) => joined,
                    None => {
                        if st.status == ConnectionStatus::Connected {
                            if self.inner.transport.is_active() {
                                return true;
                            }
                            // Silent drop not yet seen by the heartbeat
                            st.generation += 1;
                            st.stop_session();
                            let change = st.advance(ConnectionStatus::Disconnected);
                            drop(st);
                            self.inner.announce([change]);
                            continue;
                        }
                        if self.inner.policy.is_exhausted(st.attempts) {
                            st.attempts = 0;
                        }
                        if let Some(retry) = st.retry.take() {
                            retry.abort();
                        }
                        (Inner::start_attempt(&self.inner, &mut st), false)
                    }
                }
            };

            let connected = attempt.await;
            // An attempt from before a disconnect() says nothing about this call
            if !stale {
                return connected;
            }
        }
    }

    /// Close the link and stop every background task
    #[instrument(skip(self))]
    pub async fn disconnect(&self) {
        let change = {
            let mut st = self.inner.state.lock();
            st.generation += 1;
            st.cancel.cancel();
            st.cancel = CancellationToken::new();
            if let Some(h) = st.retry.take() {
                h.abort();
            }
            st.stop_session();
            st.attempts = 0;
            st.advance(ConnectionStatus::Disconnected)
        };
        // Announce before awaiting close: a connect() racing it must be heard last
        self.inner.announce([change]);

        if let Err(e) = self.inner.transport.close().await {
            warn!(error = %e, "Bridge close failed");
        }
        info!("Disconnected from print bridge");
    }

    /// Host window regained focus: reset the retry budget and reconnect if needed
    pub async fn focus_regained(&self) -> bool {
        self.inner.state.lock().attempts = 0;
        self.connect().await
    }

    /// Wake a pending bridge wait immediately
    pub fn bridge_announced(&self) {
        self.inner.loader.announce();
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected && self.inner.transport.is_active()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.state.lock().status
    }

    /// Automatic reconnect attempts used since the last successful open
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.state.lock().attempts
    }

    /// Register a status-change callback
    pub fn on_status_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        self.inner.listeners.subscribe(callback)
    }

    /// Subscribe to out-of-band notifications
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.notifications.subscribe()
    }

    pub(crate) fn transport(&self) -> &Arc<dyn BridgeTransport> {
        &self.inner.transport
    }

    /// A request on the open link found it dead; take the close path now
    pub(crate) fn link_failed(&self, next: ConnectionStatus, reason: &str) {
        let generation = self.inner.state.lock().generation;
        Inner::link_lost(&self.inner, generation, next, reason);
    }

    pub(crate) fn notify(&self, notification: Notification) {
        self.inner.notify(notification);
    }
}

impl Inner {
    fn announce<I>(&self, changes: I)
    where
        I: IntoIterator<Item = Option<ConnectionStatus>>,
    {
        for status in changes.into_iter().flatten() {
            self.listeners.emit(status);
        }
    }

    fn notify(&self, notification: Notification) {
        // No receivers is fine
        let _ = self.notifications.send(notification);
    }

    /// Spawn an attempt and publish it as the in-flight one
    fn start_attempt(inner: &Arc<Self>, st: &mut State) -> SharedAttempt {
        let generation = st.generation;
        let cancel = st.cancel.clone();
        let task_inner = inner.clone();

        let handle = tokio::spawn(async move { task_inner.attempt(generation, cancel).await });
        let attempt = async move {
            match handle.await {
                Ok(connected) => connected,
                Err(e) => {
                    error!(error = %e, "Connection attempt task failed");
                    false
                }
            }
        }
        .boxed()
        .shared();

        st.in_flight = Some((generation, attempt.clone()));
        attempt
    }

    async fn attempt(self: Arc<Self>, generation: u64, cancel: CancellationToken) -> bool {
        if !self.loader.ensure_available(&cancel).await {
            let change = {
                let mut st = self.state.lock();
                st.settle(generation);
                if st.generation != generation || cancel.is_cancelled() {
                    return false;
                }
                let change = st.advance(ConnectionStatus::NotInstalled);
                self.notify(Notification::BridgeUnavailable);
                self.schedule_reconnect(&mut st);
                change
            };
            self.announce([change]);
            return false;
        }

        let changes = {
            let mut st = self.state.lock();
            if st.generation != generation {
                st.settle(generation);
                return false;
            }
            let found = if st.status == ConnectionStatus::NotInstalled {
                st.advance(ConnectionStatus::Disconnected)
            } else {
                None
            };
            [found, st.advance(ConnectionStatus::Connecting)]
        };
        self.announce(changes);
        info!(generation, "Connecting to print bridge");

        let opened = tokio::time::timeout(self.config.connect_timeout, self.transport.open()).await;

        // Drop whatever a timed-out open left behind
        if opened.is_err() {
            if let Err(e) = self.transport.close().await {
                debug!(error = %e, "Cleanup after connect timeout failed");
            }
        }

        let (change, outcome) = {
            let mut st = self.state.lock();
            if st.generation != generation {
                (None, None)
            } else {
                st.settle(generation);
                match opened {
                    Ok(Ok(signal)) => {
                        let change = st.advance(ConnectionStatus::Connected);
                        st.attempts = 0;
                        self.start_session(&mut st, generation, signal);
                        (change, Some(true))
                    }
                    Ok(Err(e)) => {
                        let change = st.advance(ConnectionStatus::Error);
                        self.notify(connect_failure(e));
                        self.schedule_reconnect(&mut st);
                        (change, Some(false))
                    }
                    Err(_) => {
                        let change = st.advance(ConnectionStatus::Error);
                        self.notify(Notification::ConnectionTimeout);
                        self.schedule_reconnect(&mut st);
                        (change, Some(false))
                    }
                }
            }
        };

        match outcome {
            Some(connected) => {
                self.announce([change]);
                if connected {
                    info!(generation, "Connected to print bridge");
                } else {
                    warn!(generation, "Connection attempt failed");
                }
                connected
            }
            None => {
                // Superseded by disconnect(): release anything we opened, then the slot
                if self.transport.is_active() {
                    if let Err(e) = self.transport.close().await {
                        debug!(error = %e, "Closing superseded link failed");
                    }
                }
                self.state.lock().settle(generation);
                false
            }
        }
    }

    fn start_session(self: &Arc<Self>, st: &mut State, generation: u64, signal: CloseSignal) {
        st.stop_session();
        let weak = Arc::downgrade(self);
        st.watcher = Some(reconnect::spawn_close_watcher(weak.clone(), generation, signal));
        st.heartbeat = reconnect::spawn_heartbeat(weak, generation, self.config.heartbeat_interval);
    }

    /// Schedule the next automatic attempt, or report exhaustion
    fn schedule_reconnect(self: &Arc<Self>, st: &mut State) {
        if let Some(h) = st.retry.take() {
            h.abort();
        }

        if self.policy.is_exhausted(st.attempts) {
            warn!(attempts = st.attempts, "Automatic reconnects exhausted");
            self.notify(Notification::ReconnectExhausted {
                attempts: st.attempts,
            });
            return;
        }

        let delay = self.policy.delay_for(st.attempts);
        st.attempts += 1;
        info!(attempt = st.attempts, delay_ms = delay.as_millis() as u64, "Reconnect scheduled");
        self.notify(Notification::ReconnectScheduled {
            attempt: st.attempts,
            delay,
        });
        st.retry = Some(reconnect::spawn_retry(
            Arc::downgrade(self),
            st.generation,
            delay,
        ));
    }

    /// Timer-driven attempt
    async fn retry(inner: &Arc<Self>, generation: u64) {
        let attempt = {
            let mut st = inner.state.lock();
            if st.generation != generation {
                return;
            }
            // This task is the scheduled retry; drop its own handle
            st.retry = None;
            if st.in_flight.is_some() || st.status == ConnectionStatus::Connected {
                return;
            }
            Self::start_attempt(inner, &mut st)
        };
        attempt.await;
    }

    /// The link of `generation` ended; move on and schedule recovery
    fn link_lost(inner: &Arc<Self>, generation: u64, next: ConnectionStatus, reason: &str) {
        let change = {
            let mut st = inner.state.lock();
            if st.generation != generation || st.status != ConnectionStatus::Connected {
                return;
            }
            st.generation += 1;
            st.stop_session();
            let change = st.advance(next);
            warn!(reason, "Print bridge link lost");
            inner.notify(Notification::ConnectionLost {
                reason: reason.to_string(),
            });
            inner.schedule_reconnect(&mut st);
            change
        };
        inner.announce([change]);
    }
}

fn connect_failure(err: TransportError) -> Notification {
    match err {
        TransportError::Timeout(_) => Notification::ConnectionTimeout,
        other => Notification::ConnectFailed {
            reason: other.to_string(),
        },
    }
}
