//! `guildbank-auth`: caller identity and privilege checks.
//!
//! This crate is intentionally decoupled from any chat platform or role
//! directory: the dispatcher resolves privileges and hands them in.

pub mod authorize;
pub mod policy;
pub mod principal;
pub mod privilege;

pub use authorize::{authorize, AuthzError};
pub use policy::{PrivilegePolicy, StaticPolicy};
pub use principal::Caller;
pub use privilege::Privilege;
