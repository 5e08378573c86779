//! # galley-dispatch
//!
//! Printer dispatch for a restaurant POS: keeps a connection to the local
//! print bridge agent alive, routes logical stations to physical printers and
//! formats tickets and receipts as ESC/POS.
//!
//! ```text
//! caller ──► PrintDispatcher ──► StationRegistry (station → printer)
//!                  │
//!                  └──► BridgeConnection ──► BridgeTransport ──► bridge agent
//! ```
//!
//! ## Modules
//!
//! - [`bridge`]: transport trait, TCP transport, bridge loader
//! - [`connection`]: connection state machine, heartbeat and reconnect
//! - [`registry`]: discovered printers
//! - [`stations`]: persisted station routing table
//! - [`format`]: ticket and receipt formatter
//! - [`dispatcher`]: the facade
//!
//! ## Example
//!
//! ```no_run
//! use galley_dispatch::{DispatchConfig, PrintDispatcher, PrintOptions, PrintTarget};
//!
//! # async fn run() -> galley_dispatch::DispatchResult<()> {
//! let dispatcher = PrintDispatcher::from_config(&DispatchConfig::from_env())?;
//! if dispatcher.connect().await {
//!     dispatcher
//!         .print_raw(&PrintTarget::station("kitchen"), "\x1B@Hello\n", PrintOptions::default())
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod logger;
pub mod registry;
pub mod stations;
pub mod status;

pub use bridge::{
    BridgeLoader, BridgeTransport, CloseSignal, DeviceJob, DeviceLanguage, PayloadEncoding,
    TcpBridgeTransport, TransportEvent,
};
pub use config::{ConnectionConfig, DispatchConfig};
pub use connection::{BridgeConnection, ReconnectPolicy};
pub use dispatcher::{PrintDispatcher, PrintOptions, PrintTarget};
pub use error::{DispatchError, DispatchResult, TransportError, TransportResult};
pub use format::{Layout, Locale, ReceiptData, TicketData, TicketItem};
pub use registry::{PrinterDescriptor, PrinterRegistry};
pub use stations::{
    MemoryStationStore, NewStation, RedbStationStore, Station, StationPatch, StationRegistry,
    StationStore, StationStoreError,
};
pub use status::{ConnectionStatus, Notification, StatusListeners, Subscription};
