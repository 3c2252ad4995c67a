//! Sync orchestration: presence check, fetch, sort, commit.
//!
//! One attempt moves `Fetching` to either `Success` or `Failed`. Status changes
//! are published through a [`StatusBoard`] so every observer sees the same
//! sequence.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crate::client::CatalogSource;
use crate::config::PresenceCheck;
use crate::error::{DexError, Result, StoreError};
use crate::models::PersistedRecord;
use crate::store::Store;

// ---------------------------------------------------------------------------
// SyncStatus
// ---------------------------------------------------------------------------

/// Observable state of the orchestrator.
#[derive(Debug, Clone)]
pub enum SyncStatus {
    NotStarted,
    Fetching,
    Success(SyncReport),
    Failed(Arc<DexError>),
}

impl SyncStatus {
    /// True for `Success` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Success(_) | SyncStatus::Failed(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SyncStatus::Success(_))
    }

    pub fn error(&self) -> Option<&DexError> {
        match self {
            SyncStatus::Failed(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// What a successful attempt did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// The presence check passed and nothing was fetched or written.
    pub skipped: bool,
    pub created: usize,
    /// Fetched items whose id was already stored (kept as-is).
    pub already_present: usize,
}

// ---------------------------------------------------------------------------
// StatusBoard
// ---------------------------------------------------------------------------

struct BoardState {
    current: SyncStatus,
    subscribers: Vec<flume::Sender<SyncStatus>>,
}

/// Holds the current status and fans each change out to subscribers.
///
/// A single lock covers both the value and the subscriber list, so no
/// observer can see changes out of order.
pub struct StatusBoard {
    state: Mutex<BoardState>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self {
            state: Mutex::new(BoardState {
                current: SyncStatus::NotStarted,
                subscribers: Vec::new(),
            }),
        }
    }
}

impl StatusBoard {
    fn lock(&self) -> MutexGuard<'_, BoardState> {
        // The state is a plain value; a panicking holder cannot leave it torn.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn current(&self) -> SyncStatus {
        self.lock().current.clone()
    }

    /// Receive every status change from now on, starting with the current one.
    pub fn subscribe(&self) -> flume::Receiver<SyncStatus> {
        let (tx, rx) = flume::unbounded();
        let mut state = self.lock();
        if tx.send(state.current.clone()).is_ok() {
            state.subscribers.push(tx);
        }
        rx
    }

    fn publish(&self, status: SyncStatus) {
        let mut state = self.lock();
        state.current = status.clone();
        state.subscribers.retain(|tx| tx.send(status.clone()).is_ok());
    }
}

// ---------------------------------------------------------------------------
// SyncOrchestrator
// ---------------------------------------------------------------------------

/// Drives sync attempts against a catalog source and a store.
///
/// The store is handed in at construction; there is no ambient global.
pub struct SyncOrchestrator<C, S> {
    source: C,
    store: S,
    presence: PresenceCheck,
    status: StatusBoard,
    attempt_lock: Mutex<()>,
}

impl<C: CatalogSource, S: Store> SyncOrchestrator<C, S> {
    pub fn new(source: C, store: S, presence: PresenceCheck) -> Self {
        Self {
            source,
            store,
            presence,
            status: StatusBoard::default(),
            attempt_lock: Mutex::new(()),
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.status.current()
    }

    pub fn subscribe(&self) -> flume::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub fn source(&self) -> &C {
        &self.source
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one sync attempt on the calling thread and return its final status.
    ///
    /// Attempts never overlap: a second caller waits for the running one.
    pub fn run(&self) -> SyncStatus {
        let _attempt = self.attempt_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.status.publish(SyncStatus::Fetching);

        let terminal = match self.attempt() {
            Ok(report) => {
                tracing::info!(
                    skipped = report.skipped,
                    created = report.created,
                    already_present = report.already_present,
                    "catalog sync finished"
                );
                SyncStatus::Success(report)
            }
            Err(e) => {
                tracing::warn!(error = %e, "catalog sync failed");
                SyncStatus::Failed(Arc::new(e))
            }
        };
        self.status.publish(terminal.clone());
        terminal
    }

    /// Whether the store already holds the catalog, per the configured check.
    pub fn catalog_present(&self) -> Result<bool> {
        let present = match self.presence {
            PresenceCheck::BoundaryIds { first, last } => self.store.exists(&[first, last])?,
            PresenceCheck::FullCount { expected } => self.store.count()? >= expected,
        };
        Ok(present)
    }

    fn attempt(&self) -> Result<SyncReport> {
        if self.catalog_present()? {
            tracing::info!("catalog already populated; using stored records");
            return Ok(SyncReport {
                skipped: true,
                ..SyncReport::default()
            });
        }

        let mut items = self.source.fetch_catalog()?;
        items.sort_by_key(|item| item.id);

        let mut report = SyncReport::default();
        for item in items {
            let record = PersistedRecord::from_item(item);
            match self.store.create(&record) {
                Ok(()) => report.created += 1,
                Err(StoreError::DuplicateId(id)) => {
                    tracing::debug!(id, "record already stored; keeping existing row");
                    report.already_present += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(report)
    }
}

impl<C, S> SyncOrchestrator<C, S>
where
    C: CatalogSource + 'static,
    S: Store + 'static,
{
    /// Start one attempt on a background thread.
    pub fn spawn(this: &Arc<Self>) -> JoinHandle<SyncStatus> {
        let this = Arc::clone(this);
        thread::spawn(move || this.run())
    }
}
