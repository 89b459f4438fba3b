use std::collections::HashSet;

use guildbank_core::ActorId;

use crate::Privilege;

/// Injected capability: maps an actor to its privilege level.
///
/// The dispatcher owns the mapping (guild roles, server owner, bot owner, ...);
/// the ledger only ever sees the resulting [`Privilege`].
pub trait PrivilegePolicy: Send + Sync {
    fn privilege_of(&self, actor: &ActorId) -> Privilege;

    fn is_privileged(&self, actor: &ActorId) -> bool {
        self.privilege_of(actor).satisfies(Privilege::Administrator)
    }
}

impl<F> PrivilegePolicy for F
where
    F: Fn(&ActorId) -> Privilege + Send + Sync,
{
    fn privilege_of(&self, actor: &ActorId) -> Privilege {
        self(actor)
    }
}

/// Fixed owner/administrator sets (typically loaded from configuration).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticPolicy {
    owners: HashSet<ActorId>,
    administrators: HashSet<ActorId>,
}

impl StaticPolicy {
    pub fn new<O, A>(owners: O, administrators: A) -> Self
    where
        O: IntoIterator<Item = ActorId>,
        A: IntoIterator<Item = ActorId>,
    {
        Self {
            owners: owners.into_iter().collect(),
            administrators: administrators.into_iter().collect(),
        }
    }

    pub fn with_owner(mut self, actor: impl Into<ActorId>) -> Self {
        self.owners.insert(actor.into());
        self
    }

    pub fn with_administrator(mut self, actor: impl Into<ActorId>) -> Self {
        self.administrators.insert(actor.into());
        self
    }
}

impl PrivilegePolicy for StaticPolicy {
    fn privilege_of(&self, actor: &ActorId) -> Privilege {
        // Owners win when an id appears in both sets.
        if self.owners.contains(actor) {
            Privilege::Owner
        } else if self.administrators.contains(actor) {
            Privilege::Administrator
        } else {
            Privilege::Member
        }
    }
}
