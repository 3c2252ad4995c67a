use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{DexError, NetworkError, Result};

pub const CATALOG_BASE: &str = "https://pokeapi.co/api/v2/pokemon/";
/// Number of entries in the fixed catalog (generations I-III).
pub const CATALOG_SIZE: u32 = 386;
pub const FIRST_ID: u32 = 1;
pub const DEFAULT_FAN_OUT: usize = 8;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DB_FILE: &str = "dex.duckdb";

pub fn default_data_dir() -> PathBuf {
    if let Some(data) = dirs::data_dir() {
        data.join("dex-sync")
    } else {
        PathBuf::from(".dex-sync")
    }
}

/// How the orchestrator decides that the local store already holds the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceCheck {
    /// Both boundary ids present means populated. Cheap, but blind to holes in
    /// the middle of the range and to failed syncs that wrote both ends.
    BoundaryIds { first: u32, last: u32 },
    /// At least `expected` records stored means populated.
    FullCount { expected: u64 },
}

impl PresenceCheck {
    /// Boundary check over `FIRST_ID..=catalog_size`.
    pub fn boundary(catalog_size: u32) -> Self {
        PresenceCheck::BoundaryIds {
            first: FIRST_ID,
            last: catalog_size,
        }
    }

    pub fn full_count(catalog_size: u32) -> Self {
        PresenceCheck::FullCount {
            expected: u64::from(catalog_size),
        }
    }
}

/// Everything the client and orchestrator need to run a sync attempt.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub base_url: String,
    pub catalog_size: u32,
    pub fan_out: usize,
    pub timeout: Duration,
    pub presence: PresenceCheck,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: CATALOG_BASE.to_string(),
            catalog_size: CATALOG_SIZE,
            fan_out: DEFAULT_FAN_OUT,
            timeout: DEFAULT_TIMEOUT,
            presence: PresenceCheck::boundary(CATALOG_SIZE),
        }
    }
}

impl SyncConfig {
    /// Reject configurations that can never produce a valid sync.
    pub fn validate(&self) -> Result<()> {
        if self.catalog_size == 0 {
            return Err(DexError::InvalidArgument(
                "catalog_size must be at least 1".into(),
            ));
        }
        if self.fan_out == 0 {
            return Err(DexError::InvalidArgument(
                "fan_out must be at least 1".into(),
            ));
        }
        Url::parse(&self.base_url)
            .map_err(|e| NetworkError::BadUrl(format!("{}: {}", self.base_url, e)))?;
        Ok(())
    }
}
