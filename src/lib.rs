//! Catalog sync for a local creature reference browser.
//!
//! Fetches the fixed PokeAPI catalog (index page, then one detail call per
//! entry), normalizes each payload into a flat record, and commits the records
//! into a local DuckDB store exactly once. Presentation code reads the store
//! and toggles the favorite flag through [`RecordQuery`](queries::RecordQuery).
//!
//! # Quick start
//!
//! ```no_run
//! use dex_sync::DexSync;
//!
//! let dex = DexSync::builder().build().unwrap();
//!
//! // Wait for the sync started by `build()`
//! let status = dex.wait();
//! println!("{:?}", status);
//!
//! // List stored records and flag one as a favorite
//! let records = dex.records().list().unwrap();
//! dex.records().toggle_favorite(records[0].id).unwrap();
//! ```

#[cfg(feature = "async")]
pub mod async_client;
pub mod client;
pub mod config;
pub mod decoder;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod queries;
pub mod sql_builder;
pub mod store;

#[cfg(feature = "async")]
pub use async_client::AsyncDexSync;
pub use client::{CatalogClient, CatalogSource};
pub use config::{PresenceCheck, SyncConfig};
pub use error::{DecodeError, DexError, NetworkError, Result, StoreError};
pub use models::{CatalogItem, PersistedRecord};
pub use orchestrator::{SyncOrchestrator, SyncReport, SyncStatus};
pub use sql_builder::SqlBuilder;
pub use store::{DuckDbStore, RecordFilter, Store};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// The orchestrator wired to the HTTP client and the DuckDB store.
pub type DexOrchestrator = SyncOrchestrator<CatalogClient, Arc<DuckDbStore>>;

// ---------------------------------------------------------------------------
// DexSyncBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`DexSync`] instance.
///
/// Use [`DexSync::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](DexSyncBuilder::build).
pub struct DexSyncBuilder {
    data_dir: Option<PathBuf>,
    in_memory: bool,
    config: SyncConfig,
    presence: Option<PresenceCheck>,
    sync_on_build: bool,
}

impl Default for DexSyncBuilder {
    fn default() -> Self {
        Self {
            data_dir: None,
            in_memory: false,
            config: SyncConfig::default(),
            presence: None,
            sync_on_build: true,
        }
    }
}

impl DexSyncBuilder {
    /// Directory holding the database file.
    ///
    /// If not set, the platform data directory is used (e.g.
    /// `~/.local/share/dex-sync` on Linux).
    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Keep records in an in-memory database instead of a file.
    pub fn in_memory(mut self, in_memory: bool) -> Self {
        self.in_memory = in_memory;
        self
    }

    /// Catalog endpoint. Defaults to the public PokeAPI pokemon endpoint.
    pub fn base_url(mut self, url: &str) -> Self {
        self.config.base_url = url.to_string();
        self
    }

    /// Number of catalog entries, used as the index page size and as the last
    /// boundary id of the default presence check. Defaults to 386.
    pub fn catalog_size(mut self, size: u32) -> Self {
        self.config.catalog_size = size;
        self
    }

    /// Maximum number of detail requests in flight. Defaults to 8.
    pub fn fan_out(mut self, workers: usize) -> Self {
        self.config.fan_out = workers;
        self
    }

    /// HTTP request timeout. Defaults to 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Override the presence check.
    ///
    /// The default is the boundary-id check over `1..=catalog_size`.
    pub fn presence(mut self, presence: PresenceCheck) -> Self {
        self.presence = Some(presence);
        self
    }

    /// Whether `build()` starts the background sync. Defaults to `true`.
    pub fn sync_on_build(mut self, enabled: bool) -> Self {
        self.sync_on_build = enabled;
        self
    }

    /// Open the store, wire the client and orchestrator, and (unless
    /// disabled) start the single background sync attempt.
    pub fn build(self) -> Result<DexSync> {
        let mut sync_config = self.config;
        sync_config.presence = self
            .presence
            .unwrap_or_else(|| PresenceCheck::boundary(sync_config.catalog_size));
        sync_config.validate()?;

        let (store, db_path) = if self.in_memory {
            (DuckDbStore::open_in_memory()?, None)
        } else {
            let dir = self.data_dir.unwrap_or_else(config::default_data_dir);
            let path = dir.join(config::DB_FILE);
            (DuckDbStore::open(&path)?, Some(path))
        };
        let store = Arc::new(store);

        let client = CatalogClient::new(&sync_config)?;
        let orchestrator = Arc::new(SyncOrchestrator::new(
            client,
            Arc::clone(&store),
            sync_config.presence,
        ));

        let background = if self.sync_on_build {
            Some(SyncOrchestrator::spawn(&orchestrator))
        } else {
            None
        };

        Ok(DexSync {
            store,
            orchestrator,
            background: Mutex::new(background),
            db_path,
        })
    }
}

// ---------------------------------------------------------------------------
// DexSync
// ---------------------------------------------------------------------------

/// Entry point: owns the store and the orchestrator.
///
/// Created via [`DexSync::builder()`].
pub struct DexSync {
    store: Arc<DuckDbStore>,
    orchestrator: Arc<DexOrchestrator>,
    background: Mutex<Option<JoinHandle<SyncStatus>>>,
    db_path: Option<PathBuf>,
}

impl DexSync {
    /// Create a new builder.
    pub fn builder() -> DexSyncBuilder {
        DexSyncBuilder::default()
    }

    /// Current sync status.
    pub fn status(&self) -> SyncStatus {
        self.orchestrator.status()
    }

    /// Subscribe to status changes; the current status arrives first.
    pub fn subscribe(&self) -> flume::Receiver<SyncStatus> {
        self.orchestrator.subscribe()
    }

    /// Block until the background attempt started by `build()` finishes.
    ///
    /// Returns the current status right away when no background attempt
    /// is pending.
    pub fn wait(&self) -> SyncStatus {
        let handle = self
            .background
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match handle {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                SyncStatus::Failed(Arc::new(DexError::TaskJoin(
                    "sync thread panicked".into(),
                )))
            }),
            None => self.status(),
        }
    }

    /// Run a fresh sync attempt on the calling thread.
    pub fn sync(&self) -> SyncStatus {
        self.orchestrator.run()
    }

    /// Access the record query interface.
    pub fn records(&self) -> queries::RecordQuery<'_, DuckDbStore> {
        queries::RecordQuery::new(&*self.store)
    }

    /// Return a shared handle to the underlying store.
    pub fn store(&self) -> Arc<DuckDbStore> {
        Arc::clone(&self.store)
    }

    /// Path of the database file, or `None` for an in-memory store.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for DexSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = match &self.db_path {
            Some(path) => path.display().to_string(),
            None => ":memory:".to_string(),
        };
        let status = match self.status() {
            SyncStatus::NotStarted => "not started",
            SyncStatus::Fetching => "fetching",
            SyncStatus::Success(_) => "success",
            SyncStatus::Failed(_) => "failed",
        };
        write!(f, "DexSync(db={}, status={})", location, status)
    }
}
