//! Print dispatcher
//!
//! The facade callers use: resolve a logical target to a printer, check the
//! connection, submit one device job and report a typed result. Jobs are
//! never queued, buffered or retried.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use galley_printer::{Align, EscPosWriter};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::bridge::{DeviceJob, DeviceLanguage, PayloadEncoding, TcpBridgeTransport};
use crate::config::DispatchConfig;
use crate::connection::BridgeConnection;
use crate::error::{DispatchError, DispatchResult, TransportError};
use crate::format::{self, Layout, ReceiptData, TicketData};
use crate::logger::print_audit;
use crate::registry::{PrinterDescriptor, PrinterRegistry};
use crate::stations::{RedbStationStore, StationRegistry};
use crate::status::{ConnectionStatus, Notification, Subscription};

/// Where a job should go
///
/// An explicit printer name wins over the station lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrintTarget {
    pub station: Option<String>,
    pub printer: Option<String>,
}

impl PrintTarget {
    pub fn station(id: impl Into<String>) -> Self {
        Self {
            station: Some(id.into()),
            printer: None,
        }
    }

    pub fn printer(name: impl Into<String>) -> Self {
        Self {
            station: None,
            printer: Some(name.into()),
        }
    }
}

impl fmt::Display for PrintTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.printer, &self.station) {
            (Some(printer), _) => write!(f, "printer:{}", printer),
            (None, Some(station)) => write!(f, "station:{}", station),
            (None, None) => f.write_str("none"),
        }
    }
}

/// Per-job overrides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrintOptions {
    pub encoding: PayloadEncoding,
    pub device_language: DeviceLanguage,
}

/// Printer-dispatch facade
#[derive(Debug)]
pub struct PrintDispatcher {
    connection: BridgeConnection,
    printers: PrinterRegistry,
    stations: Arc<StationRegistry>,
    layout: Layout,
}

impl PrintDispatcher {
    pub fn new(connection: BridgeConnection, stations: Arc<StationRegistry>, layout: Layout) -> Self {
        Self {
            printers: PrinterRegistry::new(connection.clone()),
            connection,
            stations,
            layout,
        }
    }

    /// TCP bridge transport plus redb station storage under the data directory
    pub fn from_config(config: &DispatchConfig) -> DispatchResult<Self> {
        std::fs::create_dir_all(&config.data_dir)
            .map_err(|e| DispatchError::Storage(format!("{}: {}", config.data_dir.display(), e)))?;

        let store = RedbStationStore::open(config.station_db_path())?;
        let stations = Arc::new(StationRegistry::load(Arc::new(store)));

        let transport = Arc::new(TcpBridgeTransport::from_config(&config.connection));
        let connection = BridgeConnection::new(transport, config.connection.clone());

        let layout = Layout {
            width: config.paper_width,
            ..Layout::default()
        };

        Ok(Self::new(connection, stations, layout))
    }

    // ========== Connection ==========

    pub async fn connect(&self) -> bool {
        self.connection.connect().await
    }

    pub async fn disconnect(&self) {
        self.connection.disconnect().await
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    pub fn on_status_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        self.connection.on_status_change(callback)
    }

    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.connection.notifications()
    }

    pub async fn focus_regained(&self) -> bool {
        self.connection.focus_regained().await
    }

    pub fn connection(&self) -> &BridgeConnection {
        &self.connection
    }

    // ========== Printers and stations ==========

    pub async fn refresh_printers(&self) -> bool {
        self.printers.refresh_printers().await
    }

    pub fn available_printers(&self) -> Vec<PrinterDescriptor> {
        self.printers.available_printers()
    }

    pub fn default_printer(&self) -> Option<String> {
        self.printers.default_printer()
    }

    /// Station routing table
    pub fn stations(&self) -> &StationRegistry {
        &self.stations
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    // ========== Printing ==========

    /// Resolve a target to a printer name without touching the transport
    pub fn resolve_target(&self, target: &PrintTarget) -> DispatchResult<String> {
        if let Some(printer) = target.printer.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            return Ok(printer.to_string());
        }

        let Some(station_id) = target.station.as_deref() else {
            return Err(DispatchError::InvalidTarget);
        };

        let station = self
            .stations
            .station(station_id)
            .ok_or_else(|| DispatchError::UnknownStation(station_id.to_string()))?;

        station
            .printer_name
            .ok_or_else(|| DispatchError::ConfigurationMissing {
                station: station_id.to_string(),
            })
    }

    /// Submit `content` to the printer behind `target`
    ///
    /// `Ok(())` means the bridge accepted the job.
    #[instrument(skip(self, content, options), fields(target = %target, bytes = content.len()))]
    pub async fn print_raw(
        &self,
        target: &PrintTarget,
        content: &str,
        options: PrintOptions,
    ) -> DispatchResult<()> {
        let printer_name = self.resolve_target(target).inspect_err(|e| {
            warn!(error = %e, code = e.code(), "Print target not resolved");
        })?;

        if !self.connection.is_connected() {
            warn!(printer = %printer_name, "Print rejected: bridge not connected");
            return Err(DispatchError::NotConnected);
        }

        let job = DeviceJob {
            printer_name,
            encoding: options.encoding,
            device_language: options.device_language,
            payload: content.to_string(),
        };
        let target_desc = target.to_string();

        match self.connection.transport().submit(&job).await {
            Ok(()) => {
                print_audit!(job.printer_name.as_str(), target_desc.as_str(), content.len(), "submitted");
                info!(printer = %job.printer_name, "Print job submitted");
                Ok(())
            }
            Err(e) => {
                let link_down = match &e {
                    TransportError::Closed => Some(ConnectionStatus::Disconnected),
                    TransportError::Unreachable(_) => Some(ConnectionStatus::Error),
                    _ => None,
                };
                let err = DispatchError::from_submission(&job.printer_name, e);
                if let Some(next) = link_down {
                    self.connection.link_failed(next, &err.to_string());
                }
                print_audit!(job.printer_name.as_str(), target_desc.as_str(), content.len(), err.code());
                warn!(printer = %job.printer_name, error = %err, "Print job failed");
                self.connection.notify(Notification::PrintFailed {
                    printer: job.printer_name.clone(),
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Print the general ticket
    pub async fn print_ticket(&self, target: &PrintTarget, data: &TicketData) -> DispatchResult<()> {
        let content = format::format_ticket(data, &self.layout);
        self.print_raw(target, &content, PrintOptions::default()).await
    }

    /// Print the items of `station` to that station's printer
    ///
    /// `Ok(false)` if no item belongs to the station; nothing is sent.
    pub async fn print_station_ticket(&self, station: &str, data: &TicketData) -> DispatchResult<bool> {
        if data.items_for_station(station).next().is_none() {
            debug!(station, "No items for station, ticket skipped");
            return Ok(false);
        }

        let content = format::format_station_ticket(data, station, &self.layout);
        self.print_raw(&PrintTarget::station(station), &content, PrintOptions::default())
            .await?;
        Ok(true)
    }

    pub async fn print_receipt(&self, target: &PrintTarget, data: &ReceiptData) -> DispatchResult<()> {
        let content = format::format_receipt(data, &self.layout);
        self.print_raw(target, &content, PrintOptions::default()).await
    }

    /// Pulse the cash drawer wired to the printer behind `target`
    pub async fn open_cash_drawer(&self, target: &PrintTarget) -> DispatchResult<()> {
        let mut w = EscPosWriter::new(self.layout.width);
        w.initialize().open_drawer();
        self.print_raw(target, &w.finish(), PrintOptions::default()).await
    }

    /// Print a short page exercising alignment, styles and columns
    pub async fn print_test_page(&self, target: &PrintTarget) -> DispatchResult<()> {
        let content = test_page(&self.layout, &target.to_string());
        self.print_raw(target, &content, PrintOptions::default()).await
    }
}

fn test_page(layout: &Layout, target_desc: &str) -> String {
    let width = layout.width;
    let mut w = EscPosWriter::new(width);
    w.initialize();

    w.align_center()
        .size_double()
        .bold_on()
        .line("PRINT TEST")
        .size_normal()
        .bold_off()
        .line(target_desc)
        .line(&layout.locale.format_datetime(Utc::now()))
        .align_left()
        .eq_sep();

    let price = layout.locale.format_money(rust_decimal::Decimal::new(1900, 2));
    w.line_lr("Left", "Right");
    w.columns(&[
        ("Qty", 3, Align::Right),
        ("Item", width.saturating_sub(16), Align::Left),
        ("Price", 11, Align::Right),
    ]);
    w.columns(&[
        ("2", 3, Align::Right),
        ("Burger", width.saturating_sub(16), Align::Left),
        (price.as_str(), 11, Align::Right),
    ]);
    w.dash_sep();
    w.bold_on().line("Bold").bold_off();
    w.size_double_height().line("Double height").size_normal();
    w.line(&"0123456789".repeat(width / 10 + 1)[..width]);

    w.feed(3).cut();
    w.finish()
}
