//! Async wrapper around [`DexSync`] for use in async runtimes (Tokio, etc.).
//!
//! Runs every blocking operation (HTTP, DuckDB, joining the sync thread) on the
//! blocking thread pool via [`tokio::task::spawn_blocking`], keeping the async
//! event loop free.
//!
//! # Example
//!
//! ```no_run
//! use dex_sync::AsyncDexSync;
//!
//! #[tokio::main]
//! async fn main() {
//!     let dex = AsyncDexSync::builder().build().await.unwrap();
//!
//!     let status = dex.wait().await.unwrap();
//!     println!("{:?}", status);
//!
//!     let favorites = dex.run(|d| d.records().favorites()).await.unwrap();
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::PresenceCheck;
use crate::error::{DexError, Result};
use crate::orchestrator::SyncStatus;
use crate::DexSync;

// ---------------------------------------------------------------------------
// AsyncDexSyncBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing an [`AsyncDexSync`] instance.
#[derive(Default)]
pub struct AsyncDexSyncBuilder {
    data_dir: Option<PathBuf>,
    in_memory: bool,
    base_url: Option<String>,
    catalog_size: Option<u32>,
    fan_out: Option<usize>,
    timeout: Option<Duration>,
    presence: Option<PresenceCheck>,
    sync_on_build: Option<bool>,
}

impl AsyncDexSyncBuilder {
    /// Directory holding the database file.
    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Keep records in an in-memory database instead of a file.
    pub fn in_memory(mut self, in_memory: bool) -> Self {
        self.in_memory = in_memory;
        self
    }

    /// Catalog endpoint.
    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.to_string());
        self
    }

    /// Number of catalog entries.
    pub fn catalog_size(mut self, size: u32) -> Self {
        self.catalog_size = Some(size);
        self
    }

    /// Maximum number of detail requests in flight.
    pub fn fan_out(mut self, workers: usize) -> Self {
        self.fan_out = Some(workers);
        self
    }

    /// HTTP request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the presence check.
    pub fn presence(mut self, presence: PresenceCheck) -> Self {
        self.presence = Some(presence);
        self
    }

    /// Whether `build()` starts the background sync.
    pub fn sync_on_build(mut self, enabled: bool) -> Self {
        self.sync_on_build = Some(enabled);
        self
    }

    /// Build the async wrapper.
    ///
    /// Opening the store runs on the blocking thread pool.
    pub async fn build(self) -> Result<AsyncDexSync> {
        tokio::task::spawn_blocking(move || {
            let mut builder = DexSync::builder().in_memory(self.in_memory);
            if let Some(dir) = self.data_dir {
                builder = builder.data_dir(dir);
            }
            if let Some(url) = self.base_url {
                builder = builder.base_url(&url);
            }
            if let Some(size) = self.catalog_size {
                builder = builder.catalog_size(size);
            }
            if let Some(workers) = self.fan_out {
                builder = builder.fan_out(workers);
            }
            if let Some(timeout) = self.timeout {
                builder = builder.timeout(timeout);
            }
            if let Some(presence) = self.presence {
                builder = builder.presence(presence);
            }
            if let Some(enabled) = self.sync_on_build {
                builder = builder.sync_on_build(enabled);
            }
            let dex = builder.build()?;
            Ok(AsyncDexSync {
                inner: Arc::new(dex),
            })
        })
        .await
        .map_err(|e| DexError::TaskJoin(e.to_string()))?
    }
}

// ---------------------------------------------------------------------------
// AsyncDexSync
// ---------------------------------------------------------------------------

/// Async wrapper around [`DexSync`].
///
/// [`DexSync`] is already `Send + Sync`, so the wrapper only shares it behind
/// an [`Arc`] and moves blocking calls off the event loop.
#[derive(Clone)]
pub struct AsyncDexSync {
    inner: Arc<DexSync>,
}

impl AsyncDexSync {
    /// Create a new builder for configuring the async wrapper.
    pub fn builder() -> AsyncDexSyncBuilder {
        AsyncDexSyncBuilder::default()
    }

    /// Wrap an already built [`DexSync`].
    pub fn from_sync(dex: DexSync) -> Self {
        Self {
            inner: Arc::new(dex),
        }
    }

    /// Run a blocking operation on the blocking thread pool.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&DexSync) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let dex = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&dex))
            .await
            .map_err(|e| DexError::TaskJoin(e.to_string()))?
    }

    /// Current sync status. Never blocks on I/O.
    pub fn status(&self) -> SyncStatus {
        self.inner.status()
    }

    /// Subscribe to status changes; use `recv_async()` on the receiver.
    pub fn subscribe(&self) -> flume::Receiver<SyncStatus> {
        self.inner.subscribe()
    }

    /// Wait for the background attempt started at build time.
    pub async fn wait(&self) -> Result<SyncStatus> {
        self.run(|d| Ok(d.wait())).await
    }

    /// Run a fresh sync attempt.
    pub async fn sync(&self) -> Result<SyncStatus> {
        self.run(|d| Ok(d.sync())).await
    }

    /// Flip a record's favorite flag and return the new value.
    pub async fn toggle_favorite(&self, id: u32) -> Result<bool> {
        self.run(move |d| d.records().toggle_favorite(id)).await
    }
}
