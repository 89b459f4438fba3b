//! `guildbank-core`: shared building blocks for the guild bank.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::{ensure_positive, BankError, BankResult};
pub use id::{ActorId, RequestId};
