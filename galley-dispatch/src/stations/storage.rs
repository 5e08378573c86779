//! Durable storage for the station routing document
//!
//! The whole table is one JSON document under a fixed key, so stores only
//! deal in raw text; parsing and self-healing live in the registry.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use thiserror::Error;

/// Settings table: key = setting name, value = JSON document
const SETTINGS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("settings");

/// Key of the station routing document
pub const STATIONS_KEY: &str = "printer_stations";

#[derive(Debug, Error)]
pub enum StationStoreError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StationStoreResult<T> = Result<T, StationStoreError>;

/// Key/value backend for the station document
pub trait StationStore: Send + Sync + std::fmt::Debug {
    /// Raw document, `None` if never written
    fn load(&self) -> StationStoreResult<Option<String>>;

    /// Replace the document
    fn save(&self, document: &str) -> StationStoreResult<()>;
}

/// redb-backed station store
#[derive(Clone)]
pub struct RedbStationStore {
    db: Arc<Database>,
}

impl std::fmt::Debug for RedbStationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStationStore").finish_non_exhaustive()
    }
}

impl RedbStationStore {
    /// Open or create the database file
    pub fn open(path: impl AsRef<Path>) -> StationStoreResult<Self> {
        Self::init(Database::create(path)?)
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> StationStoreResult<Self> {
        Self::init(Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?)
    }

    fn init(db: Database) -> StationStoreResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SETTINGS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }
}

impl StationStore for RedbStationStore {
    fn load(&self) -> StationStoreResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SETTINGS_TABLE)?;
        Ok(table.get(STATIONS_KEY)?.map(|guard| guard.value().to_string()))
    }

    fn save(&self, document: &str) -> StationStoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SETTINGS_TABLE)?;
            table.insert(STATIONS_KEY, document)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

/// Volatile store for tests and hosts without a data directory
#[derive(Debug, Default)]
pub struct MemoryStationStore {
    document: Mutex<Option<String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing raw document (possibly malformed)
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(document.into())),
            ..Self::default()
        }
    }

    /// Make every subsequent `load` fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `save` fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current raw document
    pub fn document(&self) -> Option<String> {
        self.document.lock().clone()
    }
}

impl StationStore for MemoryStationStore {
    fn load(&self) -> StationStoreResult<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StationStoreError::Unavailable("reads disabled".into()));
        }
        Ok(self.document.lock().clone())
    }

    fn save(&self, document: &str) -> StationStoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StationStoreError::Unavailable("writes disabled".into()));
        }
        *self.document.lock() = Some(document.to_string());
        Ok(())
    }
}
