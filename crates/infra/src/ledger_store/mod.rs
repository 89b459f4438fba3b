//! Persistence boundary for the ledger document.
//!
//! Defines the `LedgerStore` abstraction plus a JSON-file backend (production)
//! and an in-memory backend (tests/dev).

pub mod in_memory;
pub mod json_file;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use json_file::JsonFileStore;
pub use r#trait::{LedgerStore, StoreError};
