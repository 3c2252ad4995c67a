//! Record queries for the presentation layer: list, detail and the favorite flag.

use crate::error::{Result, StoreError};
use crate::models::PersistedRecord;
use crate::store::{RecordFilter, Store};

// ---------------------------------------------------------------------------
// RecordQuery
// ---------------------------------------------------------------------------

/// Read access to stored records plus the one write the UI is allowed: the
/// favorite flag.
pub struct RecordQuery<'a, S: Store + ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> RecordQuery<'a, S> {
    /// Create a new `RecordQuery` bound to the given store.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Every stored record, ascending by id.
    pub fn list(&self) -> Result<Vec<PersistedRecord>> {
        Ok(self.store.query_all(RecordFilter::All)?)
    }

    /// Favorite records only, ascending by id.
    pub fn favorites(&self) -> Result<Vec<PersistedRecord>> {
        Ok(self.store.query_all(RecordFilter::FavoritesOnly)?)
    }

    /// List either everything or favorites, as a list view toggle would.
    pub fn list_filtered(&self, favorites_only: bool) -> Result<Vec<PersistedRecord>> {
        if favorites_only {
            self.favorites()
        } else {
            self.list()
        }
    }

    pub fn get(&self, id: u32) -> Result<Option<PersistedRecord>> {
        Ok(self.store.find(id)?)
    }

    pub fn count(&self) -> Result<u64> {
        Ok(self.store.count()?)
    }

    pub fn set_favorite(&self, id: u32, favorite: bool) -> Result<()> {
        Ok(self.store.update(id, favorite)?)
    }

    /// Flip the favorite flag and return its new value.
    pub fn toggle_favorite(&self, id: u32) -> Result<bool> {
        let record = self.store.find(id)?.ok_or(StoreError::NotFound(id))?;
        let favorite = !record.favorite;
        self.store.update(id, favorite)?;
        Ok(favorite)
    }
}
