//! Station routing table
//!
//! Maps logical print destinations ("kitchen", "bar") to physical printer
//! names. The built-in stations always exist; everything else is user data.
//!
//! Mutations are applied to a copy, persisted, then committed, so a storage
//! failure leaves the in-memory table untouched.

mod storage;

pub use storage::{
    MemoryStationStore, RedbStationStore, STATIONS_KEY, StationStore, StationStoreError,
    StationStoreResult,
};

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Built-in station ids, in display order
pub const BUILTIN_STATIONS: [&str; 4] = ["cashier", "kitchen", "bar", "general"];

/// A logical print destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub printer_name: Option<String>,
}

impl Station {
    pub fn is_builtin(&self) -> bool {
        is_builtin(&self.id)
    }
}

/// Input for [`StationRegistry::add_station`]
#[derive(Debug, Clone, Default)]
pub struct NewStation {
    pub name: String,
    pub description: Option<String>,
    pub printer_name: Option<String>,
}

impl NewStation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_printer(mut self, printer_name: impl Into<String>) -> Self {
        self.printer_name = Some(printer_name.into());
        self
    }
}

/// Partial update for [`StationRegistry::update_station`]
///
/// `None` leaves a field unchanged; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct StationPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub printer_name: Option<Option<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StationDocument {
    stations: Vec<Station>,
}

pub fn is_builtin(id: &str) -> bool {
    BUILTIN_STATIONS.contains(&id)
}

fn builtin_station(id: &str) -> Station {
    let (name, description) = match id {
        "cashier" => ("Cashier", "Front counter receipts"),
        "kitchen" => ("Kitchen", "Hot line order tickets"),
        "bar" => ("Bar", "Drinks tickets"),
        _ => ("General", "Everything else"),
    };
    Station {
        id: id.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        printer_name: None,
    }
}

fn default_stations() -> Vec<Station> {
    BUILTIN_STATIONS.iter().map(|id| builtin_station(id)).collect()
}

/// Blank printer names mean "not configured"
fn normalize_printer(printer_name: Option<String>) -> Option<String> {
    printer_name
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}

/// Parse a stored document, restoring missing built-ins
///
/// Returns the stations and whether the result differs from what is stored.
fn heal(raw: Option<String>) -> (Vec<Station>, bool) {
    let Some(raw) = raw else {
        info!("No station configuration stored, using defaults");
        return (default_stations(), true);
    };

    let doc: StationDocument = match serde_json::from_str(&raw) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(error = %e, "Station configuration unreadable, restoring defaults");
            return (default_stations(), true);
        }
    };

    let mut changed = false;
    let mut seen = HashSet::new();
    let mut stations = Vec::with_capacity(doc.stations.len());
    for mut station in doc.stations {
        if !seen.insert(station.id.clone()) {
            warn!(station_id = %station.id, "Duplicate station id dropped");
            changed = true;
            continue;
        }
        let normalized = normalize_printer(station.printer_name.clone());
        if normalized != station.printer_name {
            station.printer_name = normalized;
            changed = true;
        }
        stations.push(station);
    }

    for id in BUILTIN_STATIONS {
        if !seen.contains(id) {
            info!(station_id = id, "Restoring missing built-in station");
            stations.push(builtin_station(id));
            changed = true;
        }
    }

    (stations, changed)
}

/// Persisted station → printer mapping
#[derive(Debug)]
pub struct StationRegistry {
    store: Arc<dyn StationStore>,
    stations: RwLock<Vec<Station>>,
}

impl StationRegistry {
    /// Load the table from `store`
    ///
    /// Never fails: missing or malformed configuration falls back to the
    /// built-ins. Storage errors are logged.
    pub fn load(store: Arc<dyn StationStore>) -> Self {
        let registry = Self {
            store,
            stations: RwLock::new(default_stations()),
        };
        if let Err(e) = registry.reload() {
            warn!(error = %e, "Station configuration could not be loaded or persisted");
        }
        registry
    }

    /// Reload from storage, re-persisting if built-ins had to be restored
    ///
    /// A failed read leaves both the stored document and the in-memory table
    /// untouched. The in-memory table is refreshed even when a re-persist fails.
    #[instrument(skip(self))]
    pub fn reload(&self) -> StationStoreResult<()> {
        let raw = self.store.load().inspect_err(|e| {
            warn!(error = %e, "Station storage unreadable, keeping current table");
        })?;

        let (stations, changed) = heal(raw);
        let persisted = if changed { self.persist(&stations) } else { Ok(()) };
        *self.stations.write() = stations;
        persisted
    }

    /// Snapshot of every station
    pub fn stations(&self) -> Vec<Station> {
        self.stations.read().clone()
    }

    pub fn station(&self, id: &str) -> Option<Station> {
        self.stations.read().iter().find(|s| s.id == id).cloned()
    }

    /// Printer assigned to a station; `None` means "not configured"
    pub fn printer_for_station(&self, id: &str) -> Option<String> {
        self.stations
            .read()
            .iter()
            .find(|s| s.id == id)
            .and_then(|s| s.printer_name.clone())
    }

    /// Create a station with a fresh id
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub fn add_station(&self, new: NewStation) -> StationStoreResult<Station> {
        let station = Station {
            id: format!("station-{}", uuid::Uuid::new_v4()),
            name: new.name,
            description: new.description,
            printer_name: normalize_printer(new.printer_name),
        };

        self.mutate(|stations| {
            stations.push(station.clone());
            true
        })?;

        info!(station_id = %station.id, "Station added");
        Ok(station)
    }

    /// Merge `patch` into a station; `Ok(None)` for unknown ids
    #[instrument(skip(self, patch))]
    pub fn update_station(&self, id: &str, patch: StationPatch) -> StationStoreResult<Option<Station>> {
        let mut updated = None;
        self.mutate(|stations| {
            let Some(station) = stations.iter_mut().find(|s| s.id == id) else {
                return false;
            };
            if let Some(name) = patch.name {
                station.name = name;
            }
            if let Some(description) = patch.description {
                station.description = description;
            }
            if let Some(printer_name) = patch.printer_name {
                station.printer_name = normalize_printer(printer_name);
            }
            updated = Some(station.clone());
            true
        })?;
        Ok(updated)
    }

    /// Remove a user station; built-ins and unknown ids yield `false`
    #[instrument(skip(self))]
    pub fn delete_station(&self, id: &str) -> StationStoreResult<bool> {
        if is_builtin(id) {
            warn!("Refusing to delete built-in station");
            return Ok(false);
        }

        let removed = self.mutate(|stations| {
            let before = stations.len();
            stations.retain(|s| s.id != id);
            stations.len() != before
        })?;

        if removed {
            info!("Station deleted");
        }
        Ok(removed)
    }

    /// Set or clear the printer of a station; `false` for unknown ids
    #[instrument(skip(self))]
    pub fn assign_printer(
        &self,
        station_id: &str,
        printer_name: Option<String>,
    ) -> StationStoreResult<bool> {
        let printer_name = normalize_printer(printer_name);
        let assigned = self.mutate(|stations| {
            match stations.iter_mut().find(|s| s.id == station_id) {
                Some(station) => {
                    station.printer_name = printer_name.clone();
                    true
                }
                None => false,
            }
        })?;

        if assigned {
            info!(printer = ?printer_name, "Station printer assigned");
        }
        Ok(assigned)
    }

    /// Apply `f` to a copy; persist and commit only if it reports a change
    fn mutate<F>(&self, f: F) -> StationStoreResult<bool>
    where
        F: FnOnce(&mut Vec<Station>) -> bool,
    {
        let mut guard = self.stations.write();
        let mut next = guard.clone();
        if !f(&mut next) {
            return Ok(false);
        }
        self.persist(&next)?;
        *guard = next;
        Ok(true)
    }

    fn persist(&self, stations: &[Station]) -> StationStoreResult<()> {
        let doc = StationDocument {
            stations: stations.to_vec(),
        };
        self.store.save(&serde_json::to_string(&doc)?)
    }
}
