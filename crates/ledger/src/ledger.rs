use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use guildbank_auth::{authorize, Caller, Privilege};
use guildbank_core::{ensure_positive, ActorId, BankError, BankResult, RequestId};

use crate::entry::{ActionKind, TransactionEntry};
use crate::item::{ItemKey, ItemRecord, ItemSnapshot};
use crate::pending::{PendingRegistry, PendingRequest, RequestStatus, WithdrawAsset};

/// Raw ledger contents, used to restore a ledger from storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerParts {
    pub balance: i64,
    pub items: BTreeMap<ItemKey, ItemRecord>,
    pub contributions: BTreeMap<ActorId, i64>,
    pub history: Vec<TransactionEntry>,
    pub pending: Vec<PendingRequest>,
    pub revision: u64,
}

/// `query_balance` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub balance: i64,
    /// Sorted by item key.
    pub items: Vec<ItemSnapshot>,
}

/// `query_history` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryWindow {
    /// Nothing has been recorded (or the history was erased).
    Empty,
    /// Most recent entries, oldest first.
    Entries(Vec<TransactionEntry>),
}

/// Result of an approved withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    /// The request, now fulfilled.
    pub request: PendingRequest,
    /// Balance (mesos) or remaining stock (items) after the payout.
    pub remaining: i64,
}

/// The guild bank ledger.
///
/// Holds the mesos balance, item stock, per-actor contribution totals, the
/// transaction history and the pending-withdrawal registry.
///
/// Invariants:
/// - `balance >= 0`
/// - every item record has `quantity > 0`
/// - contributions never decrease
/// - `revision` grows by exactly one per successful mutation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    balance: i64,
    items: BTreeMap<ItemKey, ItemRecord>,
    contributions: BTreeMap<ActorId, i64>,
    history: Vec<TransactionEntry>,
    pending: PendingRegistry,
    revision: u64,
}

impl Ledger {
    /// Empty ledger (first start, no persisted document).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_parts(parts: LedgerParts) -> Self {
        Self {
            balance: parts.balance,
            items: parts.items,
            contributions: parts.contributions,
            history: parts.history,
            pending: PendingRegistry::from_requests(parts.pending),
            revision: parts.revision,
        }
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn items(&self) -> &BTreeMap<ItemKey, ItemRecord> {
        &self.items
    }

    pub fn item(&self, name: &str) -> Option<&ItemRecord> {
        let key = ItemKey::parse(name).ok()?;
        self.items.get(&key)
    }

    pub fn contributions_map(&self) -> &BTreeMap<ActorId, i64> {
        &self.contributions
    }

    pub fn contribution_of(&self, actor: &ActorId) -> i64 {
        self.contributions.get(actor).copied().unwrap_or(0)
    }

    pub fn history(&self) -> &[TransactionEntry] {
        &self.history
    }

    pub fn requests(&self) -> &PendingRegistry {
        &self.pending
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Check the structural invariants (used when restoring from storage).
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.balance < 0 {
            return Err(format!("negative balance: {}", self.balance));
        }
        if let Some((key, record)) = self.items.iter().find(|(_, r)| r.quantity <= 0) {
            return Err(format!(
                "item '{key}' has non-positive quantity {}",
                record.quantity
            ));
        }
        if let Some((actor, total)) = self.contributions.iter().find(|(_, t)| **t < 0) {
            return Err(format!("contribution of '{actor}' is negative: {total}"));
        }
        Ok(())
    }

    fn record(
        &mut self,
        caller: &Caller,
        kind: ActionKind,
        description: String,
        at: NaiveDateTime,
    ) {
        self.history.push(TransactionEntry::new(
            at,
            caller.actor.clone(),
            kind,
            description,
        ));
        self.revision += 1;
    }

    fn ensure_funds(&self, amount: i64) -> BankResult<()> {
        if amount > self.balance {
            return Err(BankError::InsufficientFunds {
                requested: amount,
                available: self.balance,
            });
        }
        Ok(())
    }

    fn stock_of(&self, key: &ItemKey, name: &str, quantity: i64) -> BankResult<&ItemRecord> {
        let record = self
            .items
            .get(key)
            .ok_or_else(|| BankError::ItemNotFound(name.trim().to_string()))?;
        if quantity > record.quantity {
            return Err(BankError::InsufficientStock {
                item: record.display_name.clone(),
                requested: quantity,
                available: record.quantity,
            });
        }
        Ok(record)
    }

    /// Take `quantity` out of an item record that has already been checked by
    /// [`Ledger::stock_of`]; empty records are removed. Returns what remains.
    fn take_stock(&mut self, key: &ItemKey, quantity: i64) -> i64 {
        let remaining = match self.items.get_mut(key) {
            Some(record) => {
                record.quantity -= quantity;
                record.quantity
            }
            None => 0,
        };
        if remaining <= 0 {
            self.items.remove(key);
        }
        remaining.max(0)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Deposits
    // ─────────────────────────────────────────────────────────────────────

    /// Deposit mesos. Returns the new balance.
    pub fn deposit_currency(
        &mut self,
        caller: &Caller,
        amount: i64,
        at: NaiveDateTime,
    ) -> BankResult<i64> {
        ensure_positive(amount, "amount")?;

        let balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| BankError::invalid_amount("balance would overflow"))?;
        let contribution = self
            .contribution_of(&caller.actor)
            .checked_add(amount)
            .ok_or_else(|| BankError::invalid_amount("contribution would overflow"))?;

        self.balance = balance;
        self.contributions.insert(caller.actor.clone(), contribution);
        self.record(
            caller,
            ActionKind::DepositCurrency,
            format!("{} deposited {amount} mesos.", caller.display_name),
            at,
        );
        Ok(balance)
    }

    /// Deposit items. Returns the updated record.
    pub fn deposit_item(
        &mut self,
        caller: &Caller,
        item_name: &str,
        quantity: i64,
        at: NaiveDateTime,
    ) -> BankResult<ItemRecord> {
        ensure_positive(quantity, "quantity")?;
        let key = ItemKey::parse(item_name)?;

        let record = match self.items.get(&key) {
            Some(existing) => ItemRecord {
                display_name: existing.display_name.clone(),
                quantity: existing
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| BankError::invalid_amount("stock would overflow"))?,
            },
            None => ItemRecord {
                display_name: item_name.trim().to_string(),
                quantity,
            },
        };

        self.items.insert(key, record.clone());
        self.record(
            caller,
            ActionKind::DepositItem,
            format!(
                "{} deposited {quantity} {}(s).",
                caller.display_name,
                item_name.trim()
            ),
            at,
        );
        Ok(record)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Withdrawal requests
    // ─────────────────────────────────────────────────────────────────────

    /// Ask to withdraw mesos. The balance is only checked, not reserved.
    pub fn request_withdraw_currency(
        &mut self,
        caller: &Caller,
        amount: i64,
        at: NaiveDateTime,
    ) -> BankResult<PendingRequest> {
        ensure_positive(amount, "amount")?;
        self.ensure_funds(amount)?;

        let asset = WithdrawAsset::Mesos { amount };
        let description = format!(
            "{} requested to withdraw {}.",
            caller.display_name,
            asset.describe()
        );
        let request = PendingRequest::new(
            caller.actor.clone(),
            caller.display_name.clone(),
            asset,
            at,
        );

        self.pending.register(request.clone());
        self.record(caller, ActionKind::RequestWithdrawCurrency, description, at);
        Ok(request)
    }

    /// Ask to withdraw items. Stock is only checked, not reserved.
    pub fn request_withdraw_item(
        &mut self,
        caller: &Caller,
        item_name: &str,
        quantity: i64,
        at: NaiveDateTime,
    ) -> BankResult<PendingRequest> {
        ensure_positive(quantity, "quantity")?;
        let key = ItemKey::parse(item_name)?;
        let record = self.stock_of(&key, item_name, quantity)?;

        let asset = WithdrawAsset::Item {
            key,
            display_name: record.display_name.clone(),
            quantity,
        };
        let description = format!(
            "{} requested to withdraw {}.",
            caller.display_name,
            asset.describe()
        );
        let request = PendingRequest::new(
            caller.actor.clone(),
            caller.display_name.clone(),
            asset,
            at,
        );

        self.pending.register(request.clone());
        self.record(caller, ActionKind::RequestWithdrawItem, description, at);
        Ok(request)
    }

    /// Cancel a pending request. Allowed for the requester and for administrators.
    pub fn cancel_withdraw_request(
        &mut self,
        caller: &Caller,
        request_id: RequestId,
        at: NaiveDateTime,
    ) -> BankResult<PendingRequest> {
        let index = self
            .pending
            .position(request_id)
            .filter(|idx| self.pending.at(*idx).is_some_and(|r| r.is_pending()))
            .ok_or(BankError::NoMatchingRequest)?;

        let (requester, requester_name, what) = match self.pending.at(index) {
            Some(r) => (r.requester.clone(), r.requester_name.clone(), r.asset.describe()),
            None => return Err(BankError::NoMatchingRequest),
        };
        if requester != caller.actor {
            authorize(caller, Privilege::Administrator)?;
        }

        let request = self
            .pending
            .resolve(
                index,
                RequestStatus::Cancelled {
                    by: caller.actor.clone(),
                    at,
                },
            )
            .ok_or(BankError::NoMatchingRequest)?;

        let description = if requester == caller.actor {
            format!("{} cancelled their request to withdraw {what}.", caller.display_name)
        } else {
            format!(
                "{} cancelled the request by {requester_name} to withdraw {what}.",
                caller.display_name
            )
        };
        self.record(caller, ActionKind::CancelWithdraw, description, at);
        Ok(request)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Approvals (administrators)
    // ─────────────────────────────────────────────────────────────────────

    /// Approve the most recent pending mesos request for `amount`
    /// (optionally only one made by `requester`).
    pub fn approve_withdraw_currency(
        &mut self,
        caller: &Caller,
        amount: i64,
        requester: Option<&ActorId>,
        at: NaiveDateTime,
    ) -> BankResult<Withdrawal> {
        authorize(caller, Privilege::Administrator)?;
        ensure_positive(amount, "amount")?;
        self.ensure_funds(amount)?;

        let index = self
            .pending
            .latest_pending(|r| {
                r.asset == WithdrawAsset::Mesos { amount }
                    && requester.is_none_or(|who| &r.requester == who)
            })
            .ok_or(BankError::NoMatchingRequest)?;

        let request = self
            .pending
            .resolve(
                index,
                RequestStatus::Fulfilled {
                    by: caller.actor.clone(),
                    at,
                },
            )
            .ok_or(BankError::NoMatchingRequest)?;
        self.balance -= amount;

        self.record(
            caller,
            ActionKind::ApproveWithdrawCurrency,
            format!(
                "{} withdrew {amount} mesos, approved by {}.",
                request.requester_name, caller.display_name
            ),
            at,
        );
        Ok(Withdrawal {
            request,
            remaining: self.balance,
        })
    }

    /// Approve the most recent pending item request for `quantity` of `item_name`.
    pub fn approve_withdraw_item(
        &mut self,
        caller: &Caller,
        item_name: &str,
        quantity: i64,
        requester: Option<&ActorId>,
        at: NaiveDateTime,
    ) -> BankResult<Withdrawal> {
        authorize(caller, Privilege::Administrator)?;
        ensure_positive(quantity, "quantity")?;
        let key = ItemKey::parse(item_name)?;
        let display_name = self.stock_of(&key, item_name, quantity)?.display_name.clone();

        let index = self
            .pending
            .latest_pending(|r| {
                let same_item = matches!(
                    &r.asset,
                    WithdrawAsset::Item { key: k, quantity: q, .. } if *k == key && *q == quantity
                );
                same_item && requester.is_none_or(|who| &r.requester == who)
            })
            .ok_or(BankError::NoMatchingRequest)?;

        let request = self
            .pending
            .resolve(
                index,
                RequestStatus::Fulfilled {
                    by: caller.actor.clone(),
                    at,
                },
            )
            .ok_or(BankError::NoMatchingRequest)?;
        let remaining = self.take_stock(&key, quantity);

        self.record(
            caller,
            ActionKind::ApproveWithdrawItem,
            format!(
                "{} withdrew {quantity} {display_name}(s), approved by {}.",
                request.requester_name, caller.display_name
            ),
            at,
        );
        Ok(Withdrawal { request, remaining })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Owner-only maintenance
    // ─────────────────────────────────────────────────────────────────────

    /// Remove mesos without a request. Returns the new balance.
    pub fn admin_delete_currency(
        &mut self,
        caller: &Caller,
        amount: i64,
        at: NaiveDateTime,
    ) -> BankResult<i64> {
        authorize(caller, Privilege::Owner)?;
        ensure_positive(amount, "amount")?;
        self.ensure_funds(amount)?;

        self.balance -= amount;
        self.record(
            caller,
            ActionKind::AdminDeleteCurrency,
            format!("{} removed {amount} mesos from the bank.", caller.display_name),
            at,
        );
        Ok(self.balance)
    }

    /// Remove items without a request. Returns the remaining stock.
    pub fn admin_delete_item(
        &mut self,
        caller: &Caller,
        item_name: &str,
        quantity: i64,
        at: NaiveDateTime,
    ) -> BankResult<i64> {
        authorize(caller, Privilege::Owner)?;
        ensure_positive(quantity, "quantity")?;
        let key = ItemKey::parse(item_name)?;
        let display_name = self.stock_of(&key, item_name, quantity)?.display_name.clone();

        let remaining = self.take_stock(&key, quantity);
        self.record(
            caller,
            ActionKind::AdminDeleteItem,
            format!(
                "{} removed {quantity} {display_name}(s) from the bank.",
                caller.display_name
            ),
            at,
        );
        Ok(remaining)
    }

    /// Clear the history. Returns how many entries were erased.
    ///
    /// Nothing is appended afterwards: the history reads as empty until the
    /// next action. Resolved requests go with it; pending ones are kept.
    pub fn erase_history(&mut self, caller: &Caller) -> BankResult<usize> {
        authorize(caller, Privilege::Owner)?;

        let erased = self.history.len();
        self.history.clear();
        self.pending.prune_resolved();
        self.revision += 1;
        Ok(erased)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    pub fn query_balance(&self) -> BalanceSnapshot {
        BalanceSnapshot {
            balance: self.balance,
            items: self
                .items
                .iter()
                .map(|(key, record)| ItemSnapshot {
                    key: key.clone(),
                    display_name: record.display_name.clone(),
                    quantity: record.quantity,
                })
                .collect(),
        }
    }

    /// The most recent `limit` entries, oldest first.
    pub fn query_history(&self, limit: usize) -> BankResult<HistoryWindow> {
        if limit == 0 {
            return Err(BankError::invalid_amount("history limit must be positive"));
        }
        if self.history.is_empty() {
            return Ok(HistoryWindow::Empty);
        }
        let start = self.history.len().saturating_sub(limit);
        Ok(HistoryWindow::Entries(self.history[start..].to_vec()))
    }

    /// Pending requests, oldest first.
    pub fn pending_requests(&self) -> Vec<PendingRequest> {
        self.pending.pending().cloned().collect()
    }

    /// Contribution totals, largest first.
    pub fn contributions(&self) -> Vec<(ActorId, i64)> {
        let mut totals: Vec<(ActorId, i64)> = self
            .contributions
            .iter()
            .map(|(actor, total)| (actor.clone(), *total))
            .collect();
        totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        totals
    }
}
