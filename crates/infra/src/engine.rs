//! Ledger engine: the single owner of the live ledger.
//!
//! ## Transition flow
//!
//! ```text
//! operation(caller, args)
//!   ↓
//! 1. Take the write lock (mutations are fully serialized)
//!   ↓
//! 2. Clone the live ledger into a draft, stamp `now` from the clock
//!   ↓
//! 3. Apply the domain operation to the draft (validates before mutating)
//!   ↓
//! 4. Persist the draft through the `LedgerStore`
//!   ↓
//! 5. Swap the draft in as the live ledger
//! ```
//!
//! A domain error at step 3 or a storage error at step 4 drops the draft, so
//! the live ledger only ever holds persisted state. Queries take the read lock
//! and see a consistent snapshot.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDateTime;
use thiserror::Error;

use guildbank_auth::Caller;
use guildbank_core::{ActorId, BankError, BankResult, RequestId};
use guildbank_ledger::{
    ActionKind, BalanceSnapshot, HistoryWindow, ItemRecord, Ledger, PendingRequest, Withdrawal,
};

use crate::clock::{Clock, SystemClock};
use crate::document::LedgerDocument;
use crate::ledger_store::{LedgerStore, StoreError};

#[derive(Debug, Error)]
pub enum EngineError {
    /// The operation was rejected; nothing changed.
    #[error(transparent)]
    Domain(#[from] BankError),

    /// Loading or persisting failed; the live ledger is unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    pub fn as_domain(&self) -> Option<&BankError> {
        match self {
            EngineError::Domain(err) => Some(err),
            EngineError::Store(_) => None,
        }
    }
}

/// Owns the ledger for the lifetime of the process.
///
/// `LedgerEngine` is `Send + Sync`; share it as `Arc<LedgerEngine<_>>`.
pub struct LedgerEngine<S> {
    ledger: RwLock<Ledger>,
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S> std::fmt::Debug for LedgerEngine<S>
where
    S: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEngine")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl<S> LedgerEngine<S>
where
    S: LedgerStore,
{
    /// Load the ledger from `store` (or start empty) using the system clock.
    pub fn open(store: S) -> Result<Self, StoreError> {
        Self::open_with_clock(store, Arc::new(SystemClock))
    }

    /// Load the ledger from `store`. An older document is upgraded and
    /// written back once before the engine is returned.
    pub fn open_with_clock(store: S, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let ledger = match store.load()? {
            None => {
                tracing::info!("no ledger document found; starting empty");
                Ledger::empty()
            }
            Some(document) => {
                let version = document.schema_version;
                let loaded = document.into_ledger()?;
                if loaded.upgraded {
                    store.save(&LedgerDocument::from_ledger(&loaded.ledger))?;
                    tracing::info!(
                        from_version = version,
                        to_version = crate::document::SCHEMA_VERSION,
                        "ledger document upgraded"
                    );
                }
                tracing::info!(
                    revision = loaded.ledger.revision(),
                    balance = loaded.ledger.balance(),
                    items = loaded.ledger.items().len(),
                    history = loaded.ledger.history().len(),
                    "ledger loaded"
                );
                loaded.ledger
            }
        };

        Ok(Self {
            ledger: RwLock::new(ledger),
            store,
            clock,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<'_, Ledger>, StoreError> {
        self.ledger.write().map_err(|_| StoreError::Poisoned)
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<'_, Ledger>, StoreError> {
        self.ledger.read().map_err(|_| StoreError::Poisoned)
    }

    /// Run one mutating operation as an atomic, persisted transition.
    fn transition<T, F>(
        &self,
        kind: ActionKind,
        caller: &Caller,
        apply: F,
    ) -> Result<T, EngineError>
    where
        F: FnOnce(&mut Ledger, NaiveDateTime) -> BankResult<T>,
    {
        let operation = kind.event_type();
        let mut live = self.write_lock()?;
        let mut draft = (*live).clone();
        let at = self.clock.now();

        let value = match apply(&mut draft, at) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(
                    operation,
                    actor = %caller.actor,
                    error = err.kind(),
                    "ledger operation rejected: {err}"
                );
                return Err(err.into());
            }
        };

        if let Err(err) = self.store.save(&LedgerDocument::from_ledger(&draft)) {
            tracing::error!(
                operation,
                actor = %caller.actor,
                "failed to persist ledger: {err}"
            );
            return Err(err.into());
        }

        *live = draft;
        tracing::info!(
            operation,
            actor = %caller.actor,
            revision = live.revision(),
            "ledger transition committed"
        );
        Ok(value)
    }

    fn read<T, F>(&self, query: F) -> Result<T, EngineError>
    where
        F: FnOnce(&Ledger) -> T,
    {
        let ledger = self.read_lock()?;
        Ok(query(&*ledger))
    }

    pub fn deposit_currency(&self, caller: &Caller, amount: i64) -> Result<i64, EngineError> {
        self.transition(ActionKind::DepositCurrency, caller, |ledger, at| {
            ledger.deposit_currency(caller, amount, at)
        })
    }

    pub fn deposit_item(
        &self,
        caller: &Caller,
        item_name: &str,
        quantity: i64,
    ) -> Result<ItemRecord, EngineError> {
        self.transition(ActionKind::DepositItem, caller, |ledger, at| {
            ledger.deposit_item(caller, item_name, quantity, at)
        })
    }

    pub fn request_withdraw_currency(
        &self,
        caller: &Caller,
        amount: i64,
    ) -> Result<PendingRequest, EngineError> {
        self.transition(ActionKind::RequestWithdrawCurrency, caller, |ledger, at| {
            ledger.request_withdraw_currency(caller, amount, at)
        })
    }

    pub fn request_withdraw_item(
        &self,
        caller: &Caller,
        item_name: &str,
        quantity: i64,
    ) -> Result<PendingRequest, EngineError> {
        self.transition(ActionKind::RequestWithdrawItem, caller, |ledger, at| {
            ledger.request_withdraw_item(caller, item_name, quantity, at)
        })
    }

    pub fn cancel_withdraw_request(
        &self,
        caller: &Caller,
        request_id: RequestId,
    ) -> Result<PendingRequest, EngineError> {
        self.transition(ActionKind::CancelWithdraw, caller, |ledger, at| {
            ledger.cancel_withdraw_request(caller, request_id, at)
        })
    }

    pub fn approve_withdraw_currency(
        &self,
        caller: &Caller,
        amount: i64,
        requester: Option<&ActorId>,
    ) -> Result<Withdrawal, EngineError> {
        self.transition(ActionKind::ApproveWithdrawCurrency, caller, |ledger, at| {
            ledger.approve_withdraw_currency(caller, amount, requester, at)
        })
    }

    pub fn approve_withdraw_item(
        &self,
        caller: &Caller,
        item_name: &str,
        quantity: i64,
        requester: Option<&ActorId>,
    ) -> Result<Withdrawal, EngineError> {
        self.transition(ActionKind::ApproveWithdrawItem, caller, |ledger, at| {
            ledger.approve_withdraw_item(caller, item_name, quantity, requester, at)
        })
    }

    pub fn admin_delete_currency(&self, caller: &Caller, amount: i64) -> Result<i64, EngineError> {
        self.transition(ActionKind::AdminDeleteCurrency, caller, |ledger, at| {
            ledger.admin_delete_currency(caller, amount, at)
        })
    }

    pub fn admin_delete_item(
        &self,
        caller: &Caller,
        item_name: &str,
        quantity: i64,
    ) -> Result<i64, EngineError> {
        self.transition(ActionKind::AdminDeleteItem, caller, |ledger, at| {
            ledger.admin_delete_item(caller, item_name, quantity, at)
        })
    }

    pub fn erase_history(&self, caller: &Caller) -> Result<usize, EngineError> {
        let erased = self.transition(ActionKind::HistoryErased, caller, |ledger, _| {
            ledger.erase_history(caller)
        })?;
        tracing::info!(actor = %caller.actor, erased, "transaction history erased");
        Ok(erased)
    }

    pub fn query_balance(&self) -> Result<BalanceSnapshot, EngineError> {
        self.read(Ledger::query_balance)
    }

    pub fn query_history(&self, limit: usize) -> Result<HistoryWindow, EngineError> {
        self.read(|ledger| ledger.query_history(limit))?
            .map_err(EngineError::from)
    }

    pub fn pending_requests(&self) -> Result<Vec<PendingRequest>, EngineError> {
        self.read(Ledger::pending_requests)
    }

    pub fn contributions(&self) -> Result<Vec<(ActorId, i64)>, EngineError> {
        self.read(Ledger::contributions)
    }

    /// Copy of the whole live ledger.
    pub fn snapshot(&self) -> Result<Ledger, EngineError> {
        self.read(Ledger::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::ledger_store::InMemoryLedgerStore;
    use guildbank_auth::Privilege;
    use guildbank_ledger::TIMESTAMP_FORMAT;

    fn clock() -> Arc<dyn Clock> {
        let at = NaiveDateTime::parse_from_str("2024-05-01 18:30:00", TIMESTAMP_FORMAT).unwrap();
        Arc::new(FixedClock::new(at))
    }

    fn engine() -> LedgerEngine<Arc<InMemoryLedgerStore>> {
        LedgerEngine::open_with_clock(Arc::new(InMemoryLedgerStore::new()), clock()).unwrap()
    }

    /// Store whose saves always fail.
    #[derive(Debug, Default)]
    struct BrokenStore;

    impl LedgerStore for BrokenStore {
        fn load(&self) -> Result<Option<LedgerDocument>, StoreError> {
            Ok(None)
        }

        fn save(&self, _document: &LedgerDocument) -> Result<(), StoreError> {
            Err(StoreError::io(
                "guild_bank.json",
                std::io::Error::other("disk full"),
            ))
        }
    }

    #[test]
    fn committed_transitions_are_saved() {
        let engine = engine();
        let alice = Caller::member("1001", "Alice");

        assert_eq!(engine.deposit_currency(&alice, 100).unwrap(), 100);
        assert_eq!(engine.store().saves(), 1);

        let saved = engine.store().document().unwrap();
        assert_eq!(saved.mesos, 100);
        assert_eq!(saved.revision, 1);
        assert_eq!(saved.history.len(), 1);
    }

    #[test]
    fn rejected_operations_do_not_save() {
        let engine = engine();
        let alice = Caller::member("1001", "Alice");

        let err = engine.deposit_currency(&alice, 0).unwrap_err();
        assert!(matches!(err.as_domain(), Some(BankError::InvalidAmount(_))));
        assert_eq!(engine.store().saves(), 0);
        assert_eq!(engine.snapshot().unwrap(), Ledger::empty());
    }

    #[test]
    fn failed_save_leaves_ledger_unchanged() {
        let engine = LedgerEngine::open_with_clock(BrokenStore, clock()).unwrap();
        let alice = Caller::member("1001", "Alice");

        let err = engine.deposit_currency(&alice, 50).unwrap_err();
        assert!(matches!(err, EngineError::Store(StoreError::Io { .. })));
        assert_eq!(engine.query_balance().unwrap().balance, 0);
        assert_eq!(engine.query_history(10).unwrap(), HistoryWindow::Empty);
    }

    #[test]
    fn queries_see_committed_state() {
        let engine = engine();
        let alice = Caller::member("1001", "Alice");
        let admin = Caller::new("9", "Goddess", Privilege::Administrator);

        engine.deposit_currency(&alice, 200).unwrap();
        engine.deposit_item(&alice, "Red Potion", 5).unwrap();
        engine.request_withdraw_currency(&alice, 50).unwrap();
        assert_eq!(engine.pending_requests().unwrap().len(), 1);

        let withdrawal = engine.approve_withdraw_currency(&admin, 50, None).unwrap();
        assert_eq!(withdrawal.remaining, 150);
        assert!(engine.pending_requests().unwrap().is_empty());

        assert_eq!(
            engine.contributions().unwrap(),
            vec![(ActorId::new("1001"), 200)]
        );
        assert_eq!(engine.snapshot().unwrap().revision(), 4);
    }

    #[test]
    fn zero_history_limit_is_rejected() {
        let engine = engine();
        assert!(matches!(
            engine.query_history(0),
            Err(EngineError::Domain(BankError::InvalidAmount(_)))
        ));
    }

    #[test]
    fn engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LedgerEngine<Arc<InMemoryLedgerStore>>>();
        assert_send_sync::<LedgerEngine<crate::ledger_store::JsonFileStore>>();
    }
}
