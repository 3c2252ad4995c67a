/// Failures while talking to the remote catalog API.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("Bad URL: {0}")]
    BadUrl(String),

    #[error("Bad response from {url}: HTTP {status}")]
    BadResponse { url: String, status: u16 },

    #[error("Bad data from {url}: {reason}")]
    BadData { url: String, reason: String },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Failures while normalizing one catalog item payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Payload is not a JSON object")]
    NotAnObject,

    #[error("Missing or malformed field: {0}")]
    MissingField(&'static str),
}

/// Failures reported by a [`Store`](crate::store::Store) implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record {0} already exists")]
    DuplicateId(u32),

    #[error("Record {0} not found")]
    NotFound(u32),

    #[error("Corrupt stored record: {0}")]
    Corrupt(String),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DexError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Task join error: {0}")]
    TaskJoin(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, DexError>;
