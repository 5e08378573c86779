//! TCP bridge transport
//!
//! Frames are a 4-byte little-endian length followed by a UTF-8 JSON body.
//!
//! Request:  `{ "id": <uuid>, "call": "print", "params": {...} }`
//! Response: `{ "id": <uuid>, "result": ..., "error": null | "reason" }`
//!
//! Responses are matched to pending requests by id. A read failure or EOF
//! fires the [`CloseSignal`] and fails every pending request.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{BridgeTransport, CloseSignal, DeviceJob, TransportEvent};
use crate::config::ConnectionConfig;
use crate::error::{TransportError, TransportResult};

/// Largest frame accepted from the agent
const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Probe connect timeout
const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Serialize)]
struct BridgeRequest<'a> {
    id: Uuid,
    call: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    id: Uuid,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

type PendingMap = Arc<Mutex<HashMap<Uuid, oneshot::Sender<BridgeResponse>>>>;

#[derive(Debug)]
struct Link {
    writer: Arc<tokio::sync::Mutex<OwnedWriteHalf>>,
    reader_task: JoinHandle<()>,
}

/// Bridge transport over a local TCP socket
#[derive(Debug)]
pub struct TcpBridgeTransport {
    addr: String,
    connect_timeout: Duration,
    request_timeout: Duration,
    link: Mutex<Option<Link>>,
    active: Arc<AtomicBool>,
    pending: PendingMap,
}

impl TcpBridgeTransport {
    pub fn new(addr: impl Into<String>) -> Self {
        let defaults = ConnectionConfig::default();
        Self {
            addr: addr.into(),
            connect_timeout: defaults.connect_timeout,
            request_timeout: defaults.request_timeout,
            link: Mutex::new(None),
            active: Arc::new(AtomicBool::new(false)),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self::new(config.bridge_addr.clone())
            .with_connect_timeout(config.connect_timeout)
            .with_request_timeout(config.request_timeout)
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send one request and wait for the matching response
    async fn request(&self, call: &str, params: Value) -> TransportResult<Value> {
        let writer = self
            .link
            .lock()
            .as_ref()
            .map(|link| link.writer.clone())
            .ok_or(TransportError::Closed)?;

        if !self.active.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        let id = Uuid::new_v4();
        let body = serde_json::to_vec(&BridgeRequest { id, call, params })
            .map_err(|e| TransportError::Protocol(e.to_string()))?;

        let mut frame = Vec::with_capacity(4 + body.len());
        frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
        frame.extend_from_slice(&body);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let written = {
            let mut w = writer.lock().await;
            w.write_all(&frame).await
        };
        if let Err(e) = written {
            self.pending.lock().remove(&id);
            self.active.store(false, Ordering::SeqCst);
            return Err(TransportError::Unreachable(format!("{}: {}", self.addr, e)));
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => match response.error {
                Some(reason) => Err(TransportError::Rejected(reason)),
                None => Ok(response.result),
            },
            Ok(Err(_)) => Err(TransportError::Closed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(TransportError::Timeout(format!("{} timed out", call)))
            }
        }
    }

    fn teardown(&self) -> Option<Link> {
        self.active.store(false, Ordering::SeqCst);
        let link = self.link.lock().take();
        // Dropping the senders fails every waiter with Closed
        self.pending.lock().clear();
        link
    }
}

#[async_trait]
impl BridgeTransport for TcpBridgeTransport {
    #[instrument(skip(self), fields(addr = %self.addr))]
    async fn probe(&self) -> bool {
        match tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(error = %e, "Bridge probe refused");
                false
            }
            Err(_) => {
                debug!("Bridge probe timeout");
                false
            }
        }
    }

    #[instrument(skip(self), fields(addr = %self.addr))]
    async fn open(&self) -> TransportResult<CloseSignal> {
        if let Some(stale) = self.teardown() {
            stale.reader_task.abort();
        }

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| TransportError::Timeout(format!("Connection timeout: {}", self.addr)))?
            .map_err(|e| TransportError::Unreachable(format!("{}: {}", self.addr, e)))?;

        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "set_nodelay failed");
        }

        let (reader, writer) = stream.into_split();
        let (close_tx, close_rx) = oneshot::channel();

        self.active.store(true, Ordering::SeqCst);
        let reader_task = tokio::spawn(read_loop(
            reader,
            self.pending.clone(),
            self.active.clone(),
            close_tx,
        ));

        *self.link.lock() = Some(Link {
            writer: Arc::new(tokio::sync::Mutex::new(writer)),
            reader_task,
        });

        // Handshake: the agent must answer before the link counts as open
        if let Err(e) = self.request("ping", Value::Null).await {
            warn!(error = %e, "Bridge handshake failed");
            if let Some(link) = self.teardown() {
                link.reader_task.abort();
            }
            return Err(e);
        }

        info!("Bridge link open");
        Ok(close_rx)
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    #[instrument(skip(self), fields(addr = %self.addr))]
    async fn close(&self) -> TransportResult<()> {
        if let Some(link) = self.teardown() {
            link.reader_task.abort();
            let mut w = link.writer.lock().await;
            if let Err(e) = w.shutdown().await {
                debug!(error = %e, "Shutdown after close failed");
            }
            info!("Bridge link closed");
        }
        Ok(())
    }

    async fn list_printers(&self) -> TransportResult<Vec<String>> {
        let result = self.request("printers.list", Value::Null).await?;
        serde_json::from_value(result).map_err(|e| TransportError::Protocol(e.to_string()))
    }

    async fn default_printer(&self) -> TransportResult<Option<String>> {
        let result = self.request("printers.default", Value::Null).await?;
        serde_json::from_value(result).map_err(|e| TransportError::Protocol(e.to_string()))
    }

    #[instrument(skip(self, job), fields(printer = %job.printer_name, bytes = job.payload.len()))]
    async fn submit(&self, job: &DeviceJob) -> TransportResult<()> {
        let params = serde_json::to_value(job).map_err(|e| TransportError::Protocol(e.to_string()))?;
        self.request("print", params).await?;
        Ok(())
    }
}

/// Dispatch incoming frames to pending requests until the link ends
async fn read_loop(
    mut reader: OwnedReadHalf,
    pending: PendingMap,
    active: Arc<AtomicBool>,
    close_tx: oneshot::Sender<TransportEvent>,
) {
    let event = loop {
        match read_frame(&mut reader).await {
            Ok(bytes) => match serde_json::from_slice::<BridgeResponse>(&bytes) {
                Ok(response) => {
                    let waiter = pending.lock().remove(&response.id);
                    match waiter {
                        Some(tx) => {
                            let _ = tx.send(response);
                        }
                        None => debug!(id = %response.id, "Unsolicited bridge frame"),
                    }
                }
                Err(e) => warn!(error = %e, "Malformed bridge frame"),
            },
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break TransportEvent::Closed,
            Err(e) => break TransportEvent::Failed(e.to_string()),
        }
    };

    active.store(false, Ordering::SeqCst);
    pending.lock().clear();
    debug!(?event, "Bridge link ended");
    let _ = close_tx.send(event);
}

async fn read_frame(reader: &mut OwnedReadHalf) -> std::io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_le_bytes(len_buf) as usize;

    if len > MAX_FRAME_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("frame too large: {} bytes", len),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}
