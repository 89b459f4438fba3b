use serde::{Deserialize, Serialize};

/// Privilege level of a caller.
///
/// Levels are ordered: every level includes the capabilities of the ones below.
/// - `Administrator` may approve withdrawals.
/// - `Owner` (guild owner or bot owner) may additionally delete funds/items and
///   erase history.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    #[default]
    Member,
    Administrator,
    Owner,
}

impl Privilege {
    pub fn satisfies(self, required: Privilege) -> bool {
        self >= required
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Privilege::Member => "member",
            Privilege::Administrator => "administrator",
            Privilege::Owner => "owner",
        }
    }
}

impl core::fmt::Display for Privilege {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_satisfies_everything() {
        assert!(Privilege::Owner.satisfies(Privilege::Administrator));
        assert!(Privilege::Owner.satisfies(Privilege::Member));
        assert!(Privilege::Administrator.satisfies(Privilege::Administrator));
        assert!(!Privilege::Administrator.satisfies(Privilege::Owner));
        assert!(!Privilege::Member.satisfies(Privilege::Administrator));
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Privilege::Administrator).unwrap(), "\"administrator\"");
    }
}
