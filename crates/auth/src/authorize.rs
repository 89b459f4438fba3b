use thiserror::Error;

use guildbank_core::BankError;

use crate::{Caller, Privilege};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: '{actor}' is {actual}, requires {required}")]
    Forbidden {
        actor: String,
        required: Privilege,
        actual: Privilege,
    },
}

impl From<AuthzError> for BankError {
    fn from(value: AuthzError) -> Self {
        BankError::unauthorized(value.to_string())
    }
}

/// Authorize a caller against a required privilege level.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(caller: &Caller, required: Privilege) -> Result<(), AuthzError> {
    if caller.privilege.satisfies(required) {
        return Ok(());
    }

    tracing::debug!(
        actor = %caller.actor,
        required = %required,
        actual = %caller.privilege,
        "authorization denied"
    );

    Err(AuthzError::Forbidden {
        actor: caller.actor.to_string(),
        required,
        actual: caller.privilege,
    })
}
