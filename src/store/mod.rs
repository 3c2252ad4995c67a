//! The persistence boundary.
//!
//! The sync core only needs a narrow contract from local storage; anything
//! implementing [`Store`] can back it. [`DuckDbStore`] is the bundled
//! implementation.

mod database;

pub use database::DuckDbStore;

use crate::error::StoreError;
use crate::models::PersistedRecord;

/// Optional filter for [`Store::query_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordFilter {
    #[default]
    All,
    FavoritesOnly,
}

/// Narrow contract over the local record store.
///
/// Implementations must be safe to share between the sync worker and
/// readers. Each `create` or `update` call is its own transaction.
pub trait Store: Send + Sync {
    /// True when every id in `ids` has a stored record.
    fn exists(&self, ids: &[u32]) -> Result<bool, StoreError>;

    /// Number of stored records.
    fn count(&self) -> Result<u64, StoreError>;

    /// Insert a new record. An id that is already stored fails with
    /// [`StoreError::DuplicateId`] and leaves the stored row untouched.
    fn create(&self, record: &PersistedRecord) -> Result<(), StoreError>;

    fn find(&self, id: u32) -> Result<Option<PersistedRecord>, StoreError>;

    /// All matching records, ascending by id.
    fn query_all(&self, filter: RecordFilter) -> Result<Vec<PersistedRecord>, StoreError>;

    /// Set the favorite flag. Unknown ids fail with [`StoreError::NotFound`].
    fn update(&self, id: u32, favorite: bool) -> Result<(), StoreError>;
}

impl<S: Store + ?Sized> Store for std::sync::Arc<S> {
    fn exists(&self, ids: &[u32]) -> Result<bool, StoreError> {
        (**self).exists(ids)
    }

    fn count(&self) -> Result<u64, StoreError> {
        (**self).count()
    }

    fn create(&self, record: &PersistedRecord) -> Result<(), StoreError> {
        (**self).create(record)
    }

    fn find(&self, id: u32) -> Result<Option<PersistedRecord>, StoreError> {
        (**self).find(id)
    }

    fn query_all(&self, filter: RecordFilter) -> Result<Vec<PersistedRecord>, StoreError> {
        (**self).query_all(filter)
    }

    fn update(&self, id: u32, favorite: bool) -> Result<(), StoreError> {
        (**self).update(id, favorite)
    }
}
