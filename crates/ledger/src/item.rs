use serde::{Deserialize, Serialize};

use guildbank_core::{BankError, BankResult};

/// Case-insensitive lookup key of an item ("Red Potion" and "red potion" share one).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(String);

impl ItemKey {
    /// Normalize a user-supplied item name into its lookup key.
    ///
    /// Names are trimmed and lowercased; blank names are rejected.
    pub fn parse(name: &str) -> BankResult<Self> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(BankError::InvalidItemName);
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stock entry for one item type.
///
/// Invariant: `quantity > 0` while the record is held by a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Casing of the first deposit, kept for display.
    pub display_name: String,
    pub quantity: i64,
}

/// Read-only view of one item record, as returned by balance queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub key: ItemKey,
    pub display_name: String,
    pub quantity: i64,
}
