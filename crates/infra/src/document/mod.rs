//! Persisted shape of the ledger and its versioned upgrade.
//!
//! ## Versions
//!
//! - **1** (no `schema_version` field): items map to either a bare integer or
//!   `{original_name, quantity}`, keys are not reliably lowercased, history is a
//!   list of `[timestamp] sentence` strings and there is no request registry.
//! - **2**: items are always records under lowercased keys, history entries
//!   are structured, pending requests are persisted.
//!
//! Upgrading happens once, when a document is turned into a [`Ledger`]; the
//! engine then persists the upgraded document.

pub mod legacy;

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use guildbank_core::ActorId;
use guildbank_ledger::{
    ItemKey, ItemRecord, Ledger, LedgerParts, PendingRegistry, PendingRequest, RequestStatus,
    TransactionEntry, WithdrawAsset,
};

use crate::ledger_store::StoreError;
use legacy::LegacyAction;

/// Newest schema version this build reads and writes.
pub const SCHEMA_VERSION: u32 = 2;

fn legacy_version() -> u32 {
    1
}

/// The ledger as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDocument {
    #[serde(default = "legacy_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub mesos: i64,
    #[serde(default)]
    pub items: BTreeMap<String, StoredItem>,
    #[serde(default)]
    pub history: Vec<StoredEntry>,
    #[serde(default)]
    pub contributions: BTreeMap<String, i64>,
    #[serde(default)]
    pub pending_requests: Vec<PendingRequest>,
}

impl Default for LedgerDocument {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            revision: 0,
            mesos: 0,
            items: BTreeMap::new(),
            history: Vec::new(),
            contributions: BTreeMap::new(),
            pending_requests: Vec::new(),
        }
    }
}

/// An item entry; version 1 allowed a bare quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredItem {
    Record { original_name: String, quantity: i64 },
    Count(i64),
}

/// A history entry; version 1 stored formatted lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredEntry {
    Structured(TransactionEntry),
    Line(String),
}

/// Outcome of decoding a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedLedger {
    pub ledger: Ledger,
    /// `true` when the document was in an older or non-canonical shape and
    /// should be written back.
    pub upgraded: bool,
}

impl LedgerDocument {
    pub fn from_ledger(ledger: &Ledger) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            revision: ledger.revision(),
            mesos: ledger.balance(),
            items: ledger
                .items()
                .iter()
                .map(|(key, record)| {
                    (
                        key.as_str().to_string(),
                        StoredItem::Record {
                            original_name: record.display_name.clone(),
                            quantity: record.quantity,
                        },
                    )
                })
                .collect(),
            history: ledger
                .history()
                .iter()
                .cloned()
                .map(StoredEntry::Structured)
                .collect(),
            contributions: ledger
                .contributions_map()
                .iter()
                .map(|(actor, total)| (actor.as_str().to_string(), *total))
                .collect(),
            pending_requests: ledger.requests().all().to_vec(),
        }
    }

    /// Decode (and if needed upgrade) into a ledger, checking its invariants.
    pub fn into_ledger(self) -> Result<LoadedLedger, StoreError> {
        if self.schema_version > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: self.schema_version,
                supported: SCHEMA_VERSION,
            });
        }

        let mut upgraded = self.schema_version < SCHEMA_VERSION;

        let (items, items_changed) = upgrade_items(self.items);
        upgraded |= items_changed;

        let mut history = Vec::with_capacity(self.history.len());
        let mut legacy_actions = Vec::new();
        for stored in self.history {
            match stored {
                StoredEntry::Structured(entry) => history.push(entry),
                StoredEntry::Line(line) => {
                    upgraded = true;
                    let parsed = legacy::parse_line(&line);
                    legacy_actions.push((parsed.entry.timestamp, parsed.action));
                    history.push(parsed.entry);
                }
            }
        }

        let mut pending = self.pending_requests;
        if self.schema_version < SCHEMA_VERSION {
            pending.extend(rebuild_requests(legacy_actions));
        }

        let ledger = Ledger::from_parts(LedgerParts {
            balance: self.mesos,
            items,
            contributions: self
                .contributions
                .into_iter()
                .map(|(actor, total)| (ActorId::new(actor), total))
                .collect(),
            history,
            pending,
            revision: self.revision,
        });
        ledger.check_invariants().map_err(StoreError::Corrupt)?;

        Ok(LoadedLedger { ledger, upgraded })
    }
}

/// Re-key items by normalized name, turning bare counts into records.
///
/// Colliding keys are merged (quantities summed, first display name kept);
/// blank names and non-positive quantities are dropped.
fn upgrade_items(stored: BTreeMap<String, StoredItem>) -> (BTreeMap<ItemKey, ItemRecord>, bool) {
    let mut changed = false;
    let mut items: BTreeMap<ItemKey, ItemRecord> = BTreeMap::new();

    for (raw_key, stored) in stored {
        let (display_name, quantity) = match stored {
            StoredItem::Record {
                original_name,
                quantity,
            } => (original_name, quantity),
            StoredItem::Count(quantity) => {
                changed = true;
                (raw_key.clone(), quantity)
            }
        };

        let Ok(key) = ItemKey::parse(&raw_key) else {
            tracing::warn!(key = %raw_key, "dropping item with blank name");
            changed = true;
            continue;
        };
        if quantity <= 0 {
            tracing::warn!(key = %raw_key, quantity, "dropping item with non-positive quantity");
            changed = true;
            continue;
        }
        if key.as_str() != raw_key {
            changed = true;
        }

        match items.get_mut(&key) {
            Some(existing) => {
                changed = true;
                existing.quantity = existing.quantity.saturating_add(quantity);
            }
            None => {
                items.insert(
                    key,
                    ItemRecord {
                        display_name,
                        quantity,
                    },
                );
            }
        }
    }

    (items, changed)
}

/// Rebuild the request registry from version-1 history.
///
/// Every legacy request becomes a pending request; each legacy approval
/// fulfils the oldest still-pending request of the same user and asset.
fn rebuild_requests(actions: Vec<(NaiveDateTime, LegacyAction)>) -> Vec<PendingRequest> {
    let mut registry = PendingRegistry::default();

    for (at, action) in actions {
        match action {
            LegacyAction::Request { name, asset } => {
                registry.register(PendingRequest::new(ActorId::new(name.clone()), name, asset, at));
            }
            LegacyAction::Approve {
                user,
                approver,
                asset,
            } => {
                let found = registry
                    .oldest_pending(|r| r.requester_name == user && same_asset(&r.asset, &asset));
                if let Some(index) = found {
                    registry.resolve(
                        index,
                        RequestStatus::Fulfilled {
                            by: ActorId::new(approver),
                            at,
                        },
                    );
                }
            }
            LegacyAction::Deposit { .. } | LegacyAction::Unknown => {}
        }
    }

    registry.all().to_vec()
}

fn same_asset(a: &WithdrawAsset, b: &WithdrawAsset) -> bool {
    match (a, b) {
        (WithdrawAsset::Mesos { amount: x }, WithdrawAsset::Mesos { amount: y }) => x == y,
        (
            WithdrawAsset::Item {
                key: ka,
                quantity: qa,
                ..
            },
            WithdrawAsset::Item {
                key: kb,
                quantity: qb,
                ..
            },
        ) => ka == kb && qa == qb,
        _ => false,
    }
}
