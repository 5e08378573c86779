//! Shared fixtures: an in-process fake bridge and config helpers

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use galley_dispatch::{
    BridgeConnection, BridgeTransport, CloseSignal, ConnectionConfig, ConnectionStatus, DeviceJob,
    Layout, MemoryStationStore, Notification, PrintDispatcher, StationRegistry, Subscription,
    TransportError, TransportEvent, TransportResult,
};
use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};

#[derive(Debug, Default)]
struct FakeState {
    present: bool,
    active: bool,
    open_delay: Duration,
    close_delay: Duration,
    open_error: Option<TransportError>,
    list_error: Option<TransportError>,
    submit_error: Option<TransportError>,
    close_tx: Option<oneshot::Sender<TransportEvent>>,
    printers: Vec<String>,
    default_printer: Option<String>,
    opens: usize,
    submitted: Vec<DeviceJob>,
}

/// Scriptable bridge transport
#[derive(Debug, Default)]
pub struct FakeTransport {
    state: Mutex<FakeState>,
}

impl FakeTransport {
    /// Bridge present, opens succeed
    pub fn new() -> Arc<Self> {
        let fake = Self::default();
        fake.state.lock().present = true;
        Arc::new(fake)
    }

    /// Bridge not installed
    pub fn absent() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_present(&self, present: bool) {
        self.state.lock().present = present;
    }

    pub fn set_open_delay(&self, delay: Duration) {
        self.state.lock().open_delay = delay;
    }

    /// `close()` tears the link down, then suspends for `delay`
    pub fn set_close_delay(&self, delay: Duration) {
        self.state.lock().close_delay = delay;
    }

    pub fn fail_opens(&self, error: Option<TransportError>) {
        self.state.lock().open_error = error;
    }

    pub fn fail_list(&self, error: Option<TransportError>) {
        self.state.lock().list_error = error;
    }

    pub fn fail_submit(&self, error: Option<TransportError>) {
        self.state.lock().submit_error = error;
    }

    pub fn set_printers(&self, printers: &[&str], default: Option<&str>) {
        let mut st = self.state.lock();
        st.printers = printers.iter().map(|p| p.to_string()).collect();
        st.default_printer = default.map(str::to_string);
    }

    /// End the link with a close event
    pub fn drop_link(&self, event: TransportEvent) {
        let mut st = self.state.lock();
        st.active = false;
        if let Some(tx) = st.close_tx.take() {
            let _ = tx.send(event);
        }
    }

    /// Link dies without any close event
    pub fn go_silent(&self) {
        self.state.lock().active = false;
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().opens
    }

    pub fn submitted(&self) -> Vec<DeviceJob> {
        self.state.lock().submitted.clone()
    }
}

#[async_trait]
impl BridgeTransport for FakeTransport {
    async fn probe(&self) -> bool {
        self.state.lock().present
    }

    async fn open(&self) -> TransportResult<CloseSignal> {
        let delay = {
            let mut st = self.state.lock();
            st.opens += 1;
            st.open_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut st = self.state.lock();
        if let Some(e) = st.open_error.clone() {
            return Err(e);
        }
        let (tx, rx) = oneshot::channel();
        st.close_tx = Some(tx);
        st.active = true;
        Ok(rx)
    }

    fn is_active(&self) -> bool {
        self.state.lock().active
    }

    async fn close(&self) -> TransportResult<()> {
        let delay = {
            let mut st = self.state.lock();
            st.active = false;
            st.close_tx = None;
            st.close_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn list_printers(&self) -> TransportResult<Vec<String>> {
        let st = self.state.lock();
        match st.list_error.clone() {
            Some(e) => Err(e),
            None => Ok(st.printers.clone()),
        }
    }

    async fn default_printer(&self) -> TransportResult<Option<String>> {
        Ok(self.state.lock().default_printer.clone())
    }

    async fn submit(&self, job: &DeviceJob) -> TransportResult<()> {
        let mut st = self.state.lock();
        if !st.active {
            return Err(TransportError::Closed);
        }
        if let Some(e) = st.submit_error.clone() {
            return Err(e);
        }
        st.submitted.push(job.clone());
        Ok(())
    }
}

/// Timings used across tests (virtual time)
pub fn test_config() -> ConnectionConfig {
    ConnectionConfig::new()
        .with_bridge_wait(Duration::from_secs(5), Duration::from_millis(100))
        .with_connect_timeout(Duration::from_secs(10))
        .with_heartbeat_interval(Duration::from_secs(30))
        .with_reconnect_base_delay(Duration::from_secs(1))
        .with_max_reconnect_attempts(5)
}

pub fn connection(fake: &Arc<FakeTransport>, config: ConnectionConfig) -> BridgeConnection {
    BridgeConnection::new(fake.clone(), config)
}

/// Dispatcher over the fake bridge and an in-memory station store
pub fn dispatcher(fake: &Arc<FakeTransport>) -> (PrintDispatcher, Arc<MemoryStationStore>) {
    let store = Arc::new(MemoryStationStore::new());
    let stations = Arc::new(StationRegistry::load(store.clone()));
    let dispatcher = PrintDispatcher::new(connection(fake, test_config()), stations, Layout::default());
    (dispatcher, store)
}

/// Record every status change
pub fn record_statuses(connection: &BridgeConnection) -> (Arc<Mutex<Vec<ConnectionStatus>>>, Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let sub = connection.on_status_change(move |s| sink.lock().push(s));
    (seen, sub)
}

/// Everything currently buffered on a notification receiver
pub fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}
