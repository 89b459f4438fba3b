//! Infrastructure layer: persistence, configuration, clock and the engine
//! that ties them to the pure ledger.

pub mod clock;
pub mod config;
pub mod document;
pub mod engine;
pub mod ledger_store;

mod integration_tests;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{BankConfig, ConfigError};
pub use document::{LedgerDocument, LoadedLedger, SCHEMA_VERSION};
pub use engine::{EngineError, LedgerEngine};
pub use ledger_store::{InMemoryLedgerStore, JsonFileStore, LedgerStore, StoreError};
