use serde::{Deserialize, Serialize};

use guildbank_core::ActorId;

use crate::{Privilege, PrivilegePolicy};

/// A fully resolved caller for authorization decisions.
///
/// Construction is the dispatcher's job: it knows how to map a platform user to
/// an [`ActorId`], a display name and a [`Privilege`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub actor: ActorId,
    /// Name used in history descriptions (e.g. the chat nickname).
    pub display_name: String,
    pub privilege: Privilege,
}

impl Caller {
    pub fn new(
        actor: impl Into<ActorId>,
        display_name: impl Into<String>,
        privilege: Privilege,
    ) -> Self {
        Self {
            actor: actor.into(),
            display_name: display_name.into(),
            privilege,
        }
    }

    pub fn member(actor: impl Into<ActorId>, display_name: impl Into<String>) -> Self {
        Self::new(actor, display_name, Privilege::Member)
    }

    /// Resolve the caller's privilege through an injected policy.
    pub fn resolve<P>(
        actor: impl Into<ActorId>,
        display_name: impl Into<String>,
        policy: &P,
    ) -> Self
    where
        P: PrivilegePolicy + ?Sized,
    {
        let actor = actor.into();
        let privilege = policy.privilege_of(&actor);
        Self {
            actor,
            display_name: display_name.into(),
            privilege,
        }
    }

    pub fn is_privileged(&self) -> bool {
        self.privilege.satisfies(Privilege::Administrator)
    }
}
