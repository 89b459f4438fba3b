//! Guild bank ledger (mesos balance, item stock, contributions, history).
//!
//! Pure domain logic only: no IO, no locking, no persistence concerns.
//! Every operation validates completely before it mutates anything.

pub mod entry;
pub mod item;
pub mod ledger;
pub mod pending;

pub use entry::{ActionKind, TransactionEntry, TIMESTAMP_FORMAT};
pub use item::{ItemKey, ItemRecord, ItemSnapshot};
pub use ledger::{BalanceSnapshot, HistoryWindow, Ledger, LedgerParts, Withdrawal};
pub use pending::{PendingRegistry, PendingRequest, RequestStatus, WithdrawAsset};
