use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use guildbank_core::ActorId;

/// Timestamp layout used in history lines: `2024-05-01 18:30:00`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Kind of action recorded in the history.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    DepositCurrency,
    DepositItem,
    RequestWithdrawCurrency,
    RequestWithdrawItem,
    ApproveWithdrawCurrency,
    ApproveWithdrawItem,
    /// A pending withdrawal request was cancelled.
    CancelWithdraw,
    AdminDeleteCurrency,
    AdminDeleteItem,
    /// The history was cleared. Never stored as an entry (the history is left
    /// empty); only labels the transition in logs.
    HistoryErased,
    /// Imported history line whose action could not be recognised.
    Legacy,
}

impl ActionKind {
    /// Stable name (e.g. "bank.currency.deposited"), used in logs.
    pub fn event_type(&self) -> &'static str {
        match self {
            ActionKind::DepositCurrency => "bank.currency.deposited",
            ActionKind::DepositItem => "bank.item.deposited",
            ActionKind::RequestWithdrawCurrency => "bank.currency.withdraw_requested",
            ActionKind::RequestWithdrawItem => "bank.item.withdraw_requested",
            ActionKind::ApproveWithdrawCurrency => "bank.currency.withdraw_approved",
            ActionKind::ApproveWithdrawItem => "bank.item.withdraw_approved",
            ActionKind::CancelWithdraw => "bank.withdraw.cancelled",
            ActionKind::AdminDeleteCurrency => "bank.currency.deleted",
            ActionKind::AdminDeleteItem => "bank.item.deleted",
            ActionKind::HistoryErased => "bank.history.erased",
            ActionKind::Legacy => "bank.legacy",
        }
    }
}

/// One history record (immutable once appended).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEntry {
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
    pub actor: ActorId,
    pub kind: ActionKind,
    /// Human-readable sentence, e.g. `Alice deposited 100 mesos.`
    pub description: String,
}

impl TransactionEntry {
    pub fn new(
        timestamp: NaiveDateTime,
        actor: ActorId,
        kind: ActionKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            actor,
            kind,
            description: description.into(),
        }
    }
}

/// Renders as a history line: `[2024-05-01 18:30:00] Alice deposited 100 mesos.`
impl core::fmt::Display for TransactionEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.description
        )
    }
}

/// Serde adapter writing `NaiveDateTime` in [`TIMESTAMP_FORMAT`].
pub mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2024-05-01 18:30:00", TIMESTAMP_FORMAT).unwrap()
    }

    #[test]
    fn renders_history_line() {
        let entry = TransactionEntry::new(
            at(),
            ActorId::new("u1"),
            ActionKind::DepositCurrency,
            "Alice deposited 100 mesos.",
        );
        assert_eq!(entry.to_string(), "[2024-05-01 18:30:00] Alice deposited 100 mesos.");
    }

    #[test]
    fn serializes_with_history_timestamp_format() {
        let entry = TransactionEntry::new(at(), ActorId::new("u1"), ActionKind::DepositItem, "x");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["timestamp"], "2024-05-01 18:30:00");
        assert_eq!(json["kind"], "deposit_item");

        let back: TransactionEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
