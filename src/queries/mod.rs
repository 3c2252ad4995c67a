//! Query modules over the local record store.
//!
//! Each module provides a query struct that borrows a [`Store`](crate::store::Store)
//! and exposes methods returning `Result<T>` with typed records.

pub mod records;

pub use records::RecordQuery;
