//! Printer registry
//!
//! Cached view of the printers the bridge can see. The list is replaced as a
//! whole on every successful refresh and left untouched on failure.

use std::collections::HashSet;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::connection::BridgeConnection;

/// One physical printer known to the bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterDescriptor {
    pub name: String,
    pub is_default: bool,
}

#[derive(Debug)]
pub struct PrinterRegistry {
    connection: BridgeConnection,
    printers: RwLock<Vec<PrinterDescriptor>>,
}

impl PrinterRegistry {
    pub fn new(connection: BridgeConnection) -> Self {
        Self {
            connection,
            printers: RwLock::new(Vec::new()),
        }
    }

    /// Re-discover printers; `false` leaves the previous list in place
    #[instrument(skip(self))]
    pub async fn refresh_printers(&self) -> bool {
        if !self.connection.is_connected() && !self.connection.connect().await {
            warn!("Printer refresh skipped: bridge not connected");
            return false;
        }

        let transport = self.connection.transport();

        let names = match transport.list_printers().await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "Printer discovery failed");
                return false;
            }
        };

        let default = match transport.default_printer().await {
            Ok(default) => default,
            Err(e) => {
                warn!(error = %e, "Default printer lookup failed");
                return false;
            }
        };

        let printers = build_descriptors(names, default.as_deref());
        info!(count = printers.len(), default = ?default, "Printers discovered");
        *self.printers.write() = printers;
        true
    }

    /// Cached printers from the last successful refresh
    pub fn available_printers(&self) -> Vec<PrinterDescriptor> {
        self.printers.read().clone()
    }

    /// Cached system default printer
    pub fn default_printer(&self) -> Option<String> {
        self.printers
            .read()
            .iter()
            .find(|p| p.is_default)
            .map(|p| p.name.clone())
    }
}

/// Collapse duplicates (first wins) and flag the default
fn build_descriptors(names: Vec<String>, default: Option<&str>) -> Vec<PrinterDescriptor> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .map(|name| PrinterDescriptor {
            is_default: default == Some(name.as_str()),
            name,
        })
        .collect()
}
