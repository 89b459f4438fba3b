//! Parsing of version-1 history lines.
//!
//! Version 1 stored history as plain sentences such as
//! `[2024-05-01 18:30:00] Alice deposited 100 mesos.`; these helpers recover
//! the structured action behind each sentence.

use chrono::{DateTime, NaiveDateTime, Utc};

use guildbank_core::ActorId;
use guildbank_ledger::{ActionKind, ItemKey, TransactionEntry, WithdrawAsset, TIMESTAMP_FORMAT};

/// What a legacy sentence describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyAction {
    Deposit {
        name: String,
        asset: WithdrawAsset,
    },
    Request {
        name: String,
        asset: WithdrawAsset,
    },
    Approve {
        user: String,
        approver: String,
        asset: WithdrawAsset,
    },
    Unknown,
}

impl LegacyAction {
    fn kind(&self) -> ActionKind {
        match self {
            LegacyAction::Deposit {
                asset: WithdrawAsset::Mesos { .. },
                ..
            } => ActionKind::DepositCurrency,
            LegacyAction::Deposit { .. } => ActionKind::DepositItem,
            LegacyAction::Request {
                asset: WithdrawAsset::Mesos { .. },
                ..
            } => ActionKind::RequestWithdrawCurrency,
            LegacyAction::Request { .. } => ActionKind::RequestWithdrawItem,
            LegacyAction::Approve {
                asset: WithdrawAsset::Mesos { .. },
                ..
            } => ActionKind::ApproveWithdrawCurrency,
            LegacyAction::Approve { .. } => ActionKind::ApproveWithdrawItem,
            LegacyAction::Unknown => ActionKind::Legacy,
        }
    }

    /// Name of whoever performed the action.
    fn actor(&self) -> Option<&str> {
        match self {
            LegacyAction::Deposit { name, .. } | LegacyAction::Request { name, .. } => Some(name),
            LegacyAction::Approve { approver, .. } => Some(approver),
            LegacyAction::Unknown => None,
        }
    }
}

/// A parsed history line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyLine {
    pub entry: TransactionEntry,
    pub action: LegacyAction,
}

/// Actor recorded for lines that do not name one.
pub const UNKNOWN_ACTOR: &str = "unknown";

/// Parse one `[timestamp] sentence` line. Never fails: unrecognised lines are
/// kept verbatim as [`ActionKind::Legacy`] entries.
pub fn parse_line(line: &str) -> LegacyLine {
    let (timestamp, text) = split_timestamp(line);
    let action = parse_sentence(text);

    let actor = ActorId::new(action.actor().unwrap_or(UNKNOWN_ACTOR));
    let entry = TransactionEntry::new(
        timestamp.unwrap_or(DateTime::<Utc>::UNIX_EPOCH.naive_utc()),
        actor,
        action.kind(),
        text,
    );

    LegacyLine { entry, action }
}

fn split_timestamp(line: &str) -> (Option<NaiveDateTime>, &str) {
    let trimmed = line.trim();
    let parsed = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.split_once("] "))
        .and_then(|(ts, text)| {
            NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT)
                .ok()
                .map(|ts| (ts, text))
        });

    match parsed {
        Some((ts, text)) => (Some(ts), text.trim()),
        None => (None, trimmed),
    }
}

fn parse_sentence(text: &str) -> LegacyAction {
    let Some(text) = text.strip_suffix('.') else {
        return LegacyAction::Unknown;
    };

    if let Some((user, rest)) = text.split_once(" withdrew ") {
        if let Some((what, approver)) = rest.rsplit_once(", approved by ") {
            if let Some(asset) = parse_asset(what) {
                return LegacyAction::Approve {
                    user: user.to_string(),
                    approver: approver.to_string(),
                    asset,
                };
            }
        }
        return LegacyAction::Unknown;
    }

    if let Some((name, what)) = text.split_once(" requested to withdraw ") {
        return match parse_asset(what) {
            Some(asset) => LegacyAction::Request {
                name: name.to_string(),
                asset,
            },
            None => LegacyAction::Unknown,
        };
    }

    if let Some((name, what)) = text.split_once(" deposited ") {
        return match parse_asset(what) {
            Some(asset) => LegacyAction::Deposit {
                name: name.to_string(),
                asset,
            },
            None => LegacyAction::Unknown,
        };
    }

    LegacyAction::Unknown
}

/// `"100 mesos"` or `"3 Red Potion(s)"`.
fn parse_asset(what: &str) -> Option<WithdrawAsset> {
    let (count, rest) = what.trim().split_once(' ')?;
    let count: i64 = count.parse().ok()?;

    if rest == "mesos" {
        return Some(WithdrawAsset::Mesos { amount: count });
    }

    let display_name = rest.strip_suffix("(s)")?.trim();
    let key = ItemKey::parse(display_name).ok()?;
    Some(WithdrawAsset::Item {
        key,
        display_name: display_name.to_string(),
        quantity: count,
    })
}
