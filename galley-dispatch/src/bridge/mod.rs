//! Bridge agent transport
//!
//! The bridge agent is a locally running process that owns the physical
//! printers. Everything the dispatcher needs from it goes through
//! [`BridgeTransport`], so tests can substitute a fake.

mod loader;
mod tcp;

pub use loader::BridgeLoader;
pub use tcp::TcpBridgeTransport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::TransportResult;

/// Payload text encoding the bridge should apply before writing to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PayloadEncoding {
    #[default]
    #[serde(rename = "UTF-8")]
    Utf8,
    #[serde(rename = "GBK")]
    Gbk,
    #[serde(rename = "CP858")]
    Cp858,
    #[serde(rename = "ISO-8859-1")]
    Latin1,
}

/// Device control language of the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeviceLanguage {
    #[default]
    #[serde(rename = "ESCPOS")]
    EscPos,
    #[serde(rename = "STARPRNT")]
    StarPrnt,
    #[serde(rename = "ZPL")]
    Zpl,
}

/// Job handed to the bridge for one physical printer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceJob {
    pub printer_name: String,
    pub encoding: PayloadEncoding,
    pub device_language: DeviceLanguage,
    pub payload: String,
}

/// How an open link ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Orderly close by the peer
    Closed,
    /// Link failed
    Failed(String),
}

/// Fires once when an open link ends on its own.
///
/// A dropped sender counts as [`TransportEvent::Closed`]. Explicit
/// [`BridgeTransport::close`] calls may or may not fire it.
pub type CloseSignal = oneshot::Receiver<TransportEvent>;

/// Bridge agent transport
#[async_trait]
pub trait BridgeTransport: Send + Sync + std::fmt::Debug + 'static {
    /// Capability probe: is the agent present and accepting connections
    async fn probe(&self) -> bool;

    /// Open the persistent link
    async fn open(&self) -> TransportResult<CloseSignal>;

    /// Whether the link is currently usable
    fn is_active(&self) -> bool;

    /// Close the link
    async fn close(&self) -> TransportResult<()>;

    /// Names of every printer the agent can see
    async fn list_printers(&self) -> TransportResult<Vec<String>>;

    /// The system default printer, if any
    async fn default_printer(&self) -> TransportResult<Option<String>>;

    /// Submit a job for printing
    async fn submit(&self, job: &DeviceJob) -> TransportResult<()>;
}
