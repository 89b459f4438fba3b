//! Integration tests for the full pipeline.
//!
//! Tests: Caller → LedgerEngine → Ledger → LedgerStore (JSON file) → reload
//!
//! Verifies:
//! - The end-to-end guild bank scenario produces the expected state and history
//! - Committed state survives a restart; rejected operations never reach disk
//! - Version-1 documents are upgraded once and reload idempotently
//! - Concurrent callers are fully serialized

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    use chrono::{NaiveDateTime, TimeDelta};

    use guildbank_auth::{Caller, StaticPolicy};
    use guildbank_core::{ActorId, BankError};
    use guildbank_ledger::{ActionKind, HistoryWindow, TIMESTAMP_FORMAT};

    use crate::clock::{Clock, FixedClock};
    use crate::document::{LedgerDocument, SCHEMA_VERSION};
    use crate::engine::{EngineError, LedgerEngine};
    use crate::ledger_store::{InMemoryLedgerStore, JsonFileStore, LedgerStore};

    fn clock() -> Arc<dyn Clock> {
        let start = NaiveDateTime::parse_from_str("2024-05-01 18:30:00", TIMESTAMP_FORMAT).unwrap();
        Arc::new(FixedClock::ticking(start, TimeDelta::seconds(1)))
    }

    fn open(path: &Path) -> LedgerEngine<JsonFileStore> {
        LedgerEngine::open_with_clock(JsonFileStore::new(path), clock()).unwrap()
    }

    fn policy() -> StaticPolicy {
        StaticPolicy::default()
            .with_owner("1")
            .with_administrator("9")
    }

    fn caller(id: &str, name: &str) -> Caller {
        Caller::resolve(id, name, &policy())
    }

    fn domain(err: EngineError) -> BankError {
        match err {
            EngineError::Domain(err) => err,
            other => panic!("expected a domain error, got {other:?}"),
        }
    }

    #[test]
    fn guild_bank_scenario_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guild_bank.json");
        let engine = open(&path);

        let alice = caller("1001", "Alice");
        let bob = caller("1002", "Bob");
        let admin = caller("9", "Goddess");
        let owner = caller("1", "Guild Master");

        assert_eq!(engine.deposit_currency(&alice, 100).unwrap(), 100);
        engine.deposit_item(&bob, "Red Potion", 5).unwrap();
        let record = engine.deposit_item(&alice, "red potion", 3).unwrap();
        assert_eq!(record.quantity, 8);
        assert_eq!(record.display_name, "Red Potion");

        engine.request_withdraw_currency(&bob, 40).unwrap();
        assert!(matches!(
            domain(engine.approve_withdraw_currency(&bob, 40, None).unwrap_err()),
            BankError::Unauthorized(_)
        ));
        let withdrawal = engine.approve_withdraw_currency(&admin, 40, None).unwrap();
        assert_eq!(withdrawal.remaining, 60);
        assert_eq!(
            domain(engine.approve_withdraw_currency(&admin, 40, None).unwrap_err()),
            BankError::NoMatchingRequest
        );
        assert!(matches!(
            domain(engine.approve_withdraw_currency(&admin, 999, None).unwrap_err()),
            BankError::InsufficientFunds { requested: 999, available: 60 }
        ));

        engine.request_withdraw_item(&alice, "RED POTION", 2).unwrap();
        let withdrawal = engine
            .approve_withdraw_item(&admin, "red potion", 2, Some(&ActorId::new("1001")))
            .unwrap();
        assert_eq!(withdrawal.remaining, 6);

        assert_eq!(engine.admin_delete_item(&owner, "Red Potion", 6).unwrap(), 0);
        assert!(engine.query_balance().unwrap().items.is_empty());

        let contributions = engine.contributions().unwrap();
        assert_eq!(contributions, vec![(ActorId::new("1001"), 100)]);

        match engine.query_history(3).unwrap() {
            HistoryWindow::Entries(entries) => {
                let lines: Vec<String> = entries.iter().map(ToString::to_string).collect();
                assert_eq!(
                    lines,
                    vec![
                        "[2024-05-01 18:30:08] Alice requested to withdraw 2 Red Potion(s).",
                        "[2024-05-01 18:30:09] Alice withdrew 2 Red Potion(s), approved by Goddess.",
                        "[2024-05-01 18:30:10] Guild Master removed 6 Red Potion(s) from the bank.",
                    ]
                );
            }
            HistoryWindow::Empty => panic!("history should not be empty"),
        }

        assert!(matches!(
            domain(engine.erase_history(&admin).unwrap_err()),
            BankError::Unauthorized(_)
        ));
        assert_eq!(engine.erase_history(&owner).unwrap(), 8);
        assert_eq!(engine.query_history(10).unwrap(), HistoryWindow::Empty);
    }

    #[test]
    fn committed_state_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guild_bank.json");

        let before = {
            let engine = open(&path);
            let alice = caller("1001", "Alice");
            engine.deposit_currency(&alice, 250).unwrap();
            engine.deposit_item(&alice, "Elixir", 2).unwrap();
            engine.request_withdraw_currency(&alice, 100).unwrap();
            let _ = engine.deposit_currency(&alice, -5).unwrap_err();
            engine.snapshot().unwrap()
        };

        let reopened = open(&path);
        let after = reopened.snapshot().unwrap();
        assert_eq!(after, before);
        assert_eq!(after.revision(), 3);
        assert_eq!(reopened.pending_requests().unwrap().len(), 1);

        // The request survives the restart and can still be approved.
        let admin = caller("9", "Goddess");
        reopened.approve_withdraw_currency(&admin, 100, None).unwrap();
        assert_eq!(reopened.query_balance().unwrap().balance, 150);
    }

    #[test]
    fn item_request_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guild_bank.json");

        let request = {
            let engine = open(&path);
            let alice = caller("1001", "Alice");
            engine.deposit_item(&alice, "Red Potion", 5).unwrap();
            engine.request_withdraw_item(&alice, "red potion", 2).unwrap()
        };

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let stored = &raw["pending_requests"][0];
        assert_eq!(stored["asset"], "item");
        assert_eq!(stored["key"], "red potion");
        assert_eq!(stored["display_name"], "Red Potion");
        assert_eq!(stored["quantity"], 2);
        assert_eq!(stored["status"]["state"], "pending");

        let reopened = open(&path);
        assert_eq!(reopened.pending_requests().unwrap(), vec![request.clone()]);

        let admin = caller("9", "Goddess");
        let withdrawal = reopened
            .approve_withdraw_item(&admin, "RED POTION", 2, None)
            .unwrap();
        assert_eq!(withdrawal.request.id, request.id);
        assert_eq!(withdrawal.remaining, 3);
        assert!(reopened.pending_requests().unwrap().is_empty());
    }

    #[test]
    fn legacy_file_is_upgraded_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guild_bank.json");
        fs::write(
            &path,
            r#"{
    "mesos": 300,
    "items": {
        "Red Potion": 4,
        "elixir": { "original_name": "Elixir", "quantity": 1 }
    },
    "history": [
        "[2024-05-01 18:30:00] Alice deposited 300 mesos.",
        "[2024-05-01 18:31:00] Bob requested to withdraw 20 mesos."
    ],
    "contributions": { "1001": 300 }
}"#,
        )
        .unwrap();

        let engine = open(&path);
        let upgraded: LedgerDocument =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(upgraded.schema_version, SCHEMA_VERSION);
        assert_eq!(upgraded.pending_requests.len(), 1);
        assert!(upgraded.items.contains_key("red potion"));

        let balance = engine.query_balance().unwrap();
        assert_eq!(balance.balance, 300);
        assert_eq!(balance.items.len(), 2);
        assert_eq!(balance.items[1].display_name, "Red Potion");
        // Pure read: asking again changes nothing.
        assert_eq!(engine.query_balance().unwrap(), balance);

        let pending = engine.pending_requests().unwrap();
        assert_eq!(pending[0].requester_name, "Bob");

        // Legacy requests carry the name as actor id; admins can still approve.
        let admin = caller("9", "Goddess");
        engine
            .approve_withdraw_currency(&admin, 20, Some(&ActorId::new("Bob")))
            .unwrap();

        let first = engine.snapshot().unwrap();
        drop(engine);
        let rewritten = fs::read_to_string(&path).unwrap();
        let again = open(&path);
        assert_eq!(again.snapshot().unwrap(), first);
        assert_eq!(fs::read_to_string(&path).unwrap(), rewritten);
    }

    #[test]
    fn newer_schema_refuses_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guild_bank.json");
        fs::write(&path, r#"{ "schema_version": 99, "mesos": 1 }"#).unwrap();

        let err = LedgerEngine::open(JsonFileStore::new(&path)).unwrap_err();
        assert!(err.to_string().contains("99"));
    }

    #[test]
    fn concurrent_deposits_are_serialized() {
        const THREADS: usize = 8;
        const DEPOSITS: usize = 25;

        let store = Arc::new(InMemoryLedgerStore::new());
        let engine = Arc::new(LedgerEngine::open_with_clock(store.clone(), clock()).unwrap());

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let engine = engine.clone();
                std::thread::spawn(move || {
                    let member = Caller::member(format!("member-{t}"), format!("Member {t}"));
                    for _ in 0..DEPOSITS {
                        engine.deposit_currency(&member, 10).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let ledger = engine.snapshot().unwrap();
        let total = (THREADS * DEPOSITS) as i64 * 10;
        assert_eq!(ledger.balance(), total);
        assert_eq!(ledger.revision(), (THREADS * DEPOSITS) as u64);
        assert_eq!(ledger.history().len(), THREADS * DEPOSITS);
        assert_eq!(store.saves(), THREADS * DEPOSITS);
        assert_eq!(store.load().unwrap().unwrap().mesos, total);
        assert!(ledger
            .contributions()
            .iter()
            .all(|(_, amount)| *amount == DEPOSITS as i64 * 10));
    }

    #[test]
    fn history_kinds_match_operations() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let engine = LedgerEngine::open_with_clock(store, clock()).unwrap();
        let alice = caller("1001", "Alice");

        engine.deposit_currency(&alice, 10).unwrap();
        let request = engine.request_withdraw_currency(&alice, 10).unwrap();
        engine.cancel_withdraw_request(&alice, request.id).unwrap();

        let kinds: Vec<ActionKind> = engine
            .snapshot()
            .unwrap()
            .history()
            .iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                ActionKind::DepositCurrency,
                ActionKind::RequestWithdrawCurrency,
                ActionKind::CancelWithdraw,
            ]
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Deposit(i64),
            DepositItem(&'static str, i64),
            Request(i64),
            Approve(i64),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (-5i64..200).prop_map(Op::Deposit),
                (prop::sample::select(vec!["Red Potion", "red potion", "Elixir", " "]), -2i64..10)
                    .prop_map(|(name, qty)| Op::DepositItem(name, qty)),
                (-5i64..200).prop_map(Op::Request),
                (-5i64..200).prop_map(Op::Approve),
            ]
        }

        proptest! {
            #[test]
            fn reopening_restores_the_committed_ledger(ops in prop::collection::vec(op(), 0..40)) {
                let store = Arc::new(InMemoryLedgerStore::new());
                let engine = LedgerEngine::open_with_clock(store.clone(), clock()).unwrap();
                let member = caller("1001", "Alice");
                let admin = caller("9", "Goddess");

                let mut committed = 0u64;
                for op in ops {
                    let ok = match op {
                        Op::Deposit(amount) => engine.deposit_currency(&member, amount).is_ok(),
                        Op::DepositItem(name, qty) => {
                            engine.deposit_item(&member, name, qty).is_ok()
                        }
                        Op::Request(amount) => {
                            engine.request_withdraw_currency(&member, amount).is_ok()
                        }
                        Op::Approve(amount) => engine
                            .approve_withdraw_currency(&admin, amount, None)
                            .is_ok(),
                    };
                    if ok {
                        committed += 1;
                    }
                }

                let live = engine.snapshot().unwrap();
                prop_assert_eq!(live.revision(), committed);
                prop_assert_eq!(store.saves() as u64, committed);

                let reopened = LedgerEngine::open_with_clock(store.clone(), clock()).unwrap();
                prop_assert_eq!(reopened.snapshot().unwrap(), live);
            }
        }
    }
}
