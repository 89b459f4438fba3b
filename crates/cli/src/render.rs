//! User-facing messages for command results.

use guildbank_core::{ActorId, BankError};
use guildbank_ledger::{BalanceSnapshot, HistoryWindow, ItemRecord, PendingRequest, Withdrawal};

pub fn deposited(name: &str, amount: i64, balance: i64) -> String {
    format!("✅ {name} deposited {amount} mesos into the Guild Bank! (balance: {balance})")
}

pub fn deposited_item(name: &str, quantity: i64, record: &ItemRecord) -> String {
    format!(
        "✅ {name} deposited {quantity} {}(s) into the Guild Bank! (in stock: {})",
        record.display_name, record.quantity
    )
}

pub fn requested(request: &PendingRequest) -> String {
    format!(
        "⚠️ {} requested to withdraw {}. An admin needs to approve. (request {})",
        request.requester_name,
        request.asset.describe(),
        request.id
    )
}

pub fn approved(withdrawal: &Withdrawal, approver: &str) -> String {
    format!(
        "✅ {} withdrawn by {}, approved by {approver}.",
        withdrawal.request.asset.describe(),
        withdrawal.request.requester_name
    )
}

pub fn cancelled(request: &PendingRequest) -> String {
    format!(
        "🚫 Request by {} to withdraw {} cancelled.",
        request.requester_name,
        request.asset.describe()
    )
}

pub fn deleted(what: &str, remaining: i64) -> String {
    format!("🗑️ Removed {what} from the Guild Bank. ({remaining} left)")
}

pub fn balance(snapshot: &BalanceSnapshot) -> String {
    let items = if snapshot.items.is_empty() {
        "No items stored.".to_string()
    } else {
        snapshot
            .items
            .iter()
            .map(|item| format!("{}: {}", item.display_name, item.quantity))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!("🏦 Guild Bank:\n💰 Mesos: {}\n📦 Items:\n{items}", snapshot.balance)
}

pub fn history(window: &HistoryWindow) -> String {
    match window {
        HistoryWindow::Empty => "📜 No transactions recorded.".to_string(),
        HistoryWindow::Entries(entries) => {
            let lines: Vec<String> = entries.iter().map(ToString::to_string).collect();
            format!("📜 Guild Bank History:\n{}", lines.join("\n"))
        }
    }
}

pub fn pending(requests: &[PendingRequest]) -> String {
    if requests.is_empty() {
        return "📭 No pending withdrawal requests.".to_string();
    }
    let lines: Vec<String> = requests
        .iter()
        .map(|r| {
            format!(
                "{} | {} ({}) | {} | {}",
                r.id,
                r.requester_name,
                r.requester,
                r.asset.describe(),
                r.requested_at.format(guildbank_ledger::TIMESTAMP_FORMAT)
            )
        })
        .collect();
    format!("⏳ Pending requests:\n{}", lines.join("\n"))
}

pub fn contributions(totals: &[(ActorId, i64)]) -> String {
    if totals.is_empty() {
        return "🤝 No contributions yet.".to_string();
    }
    let lines: Vec<String> = totals
        .iter()
        .enumerate()
        .map(|(rank, (actor, total))| format!("{}. {actor}: {total} mesos", rank + 1))
        .collect();
    format!("🤝 Contributions:\n{}", lines.join("\n"))
}

pub fn erase_prompt() -> String {
    "⚠️ Are you sure you want to erase the bank history? Re-run with --yes to confirm.".to_string()
}

pub fn erased(count: usize) -> String {
    format!("✅ Bank history erased ({count} entries).")
}

/// Message for an operation the ledger rejected.
pub fn rejection(err: &BankError) -> String {
    match err {
        BankError::InvalidAmount(_) => "❌ Amount must be a positive number.".to_string(),
        BankError::InvalidItemName => "❌ Item name must not be empty.".to_string(),
        BankError::InsufficientFunds { .. } => "❌ Not enough mesos in the bank.".to_string(),
        BankError::InsufficientStock {
            item, available, ..
        } => format!("❌ Not enough {item} in the bank (only {available})."),
        BankError::ItemNotFound(item) => format!("❌ {item} is not stored in the bank."),
        BankError::Unauthorized(_) => "❌ You are not allowed to do that.".to_string(),
        BankError::NoMatchingRequest => "❌ No matching pending withdrawal request.".to_string(),
    }
}
