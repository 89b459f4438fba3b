use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::document::LedgerDocument;

/// Persistence operation error.
///
/// These are **infrastructure errors** (disk, encoding, schema) as opposed to
/// domain errors (validation, balances, authorization).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ledger document (de)serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unsupported ledger schema version {found} (newest supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("corrupt ledger document: {0}")]
    Corrupt(String),

    #[error("ledger lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Durable home of the single ledger document.
///
/// A store is responsible for durability only: it never inspects or validates
/// ledger contents beyond decoding them.
///
/// Implementations must:
/// - return `Ok(None)` when nothing has been persisted yet
/// - make `save` all-or-nothing (a reader never observes a torn document)
pub trait LedgerStore: Send + Sync {
    fn load(&self) -> Result<Option<LedgerDocument>, StoreError>;

    fn save(&self, document: &LedgerDocument) -> Result<(), StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn load(&self) -> Result<Option<LedgerDocument>, StoreError> {
        (**self).load()
    }

    fn save(&self, document: &LedgerDocument) -> Result<(), StoreError> {
        (**self).save(document)
    }
}
