use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::document::LedgerDocument;

use super::r#trait::{LedgerStore, StoreError};

/// In-memory ledger store.
///
/// Intended for tests/dev. Counts saves so callers can assert write-through.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    document: RwLock<Option<LedgerDocument>>,
    saves: AtomicUsize,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already persisted document.
    pub fn with_document(document: LedgerDocument) -> Self {
        Self {
            document: RwLock::new(Some(document)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Last saved document, if any.
    pub fn document(&self) -> Option<LedgerDocument> {
        self.document.read().ok().and_then(|d| d.clone())
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn load(&self) -> Result<Option<LedgerDocument>, StoreError> {
        let document = self.document.read().map_err(|_| StoreError::Poisoned)?;
        Ok(document.clone())
    }

    fn save(&self, document: &LedgerDocument) -> Result<(), StoreError> {
        let mut slot = self.document.write().map_err(|_| StoreError::Poisoned)?;
        *slot = Some(document.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
