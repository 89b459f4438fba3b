//! Runtime configuration, read from `GUILD_BANK_*` environment variables.

use std::path::PathBuf;

use guildbank_auth::StaticPolicy;
use guildbank_core::ActorId;
use guildbank_observability::{LogFormat, UnknownLogFormat};

pub const ENV_DATA_FILE: &str = "GUILD_BANK_FILE";
pub const ENV_HISTORY_LIMIT: &str = "GUILD_BANK_HISTORY_LIMIT";
pub const ENV_OWNERS: &str = "GUILD_BANK_OWNERS";
pub const ENV_ADMINS: &str = "GUILD_BANK_ADMINS";
pub const ENV_LOG_FORMAT: &str = "GUILD_BANK_LOG_FORMAT";

pub const DEFAULT_DATA_FILE: &str = "guild_bank.json";
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("GUILD_BANK_LOG_FORMAT: {0}")]
    InvalidLogFormat(#[from] UnknownLogFormat),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankConfig {
    pub data_file: PathBuf,
    /// Window used by `history` when the caller gives no limit.
    pub history_limit: usize,
    pub owners: Vec<ActorId>,
    pub administrators: Vec<ActorId>,
    pub log_format: LogFormat,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            history_limit: DEFAULT_HISTORY_LIMIT,
            owners: Vec::new(),
            administrators: Vec::new(),
            log_format: LogFormat::default(),
        }
    }
}

impl BankConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(path) = get(ENV_DATA_FILE) {
            config.data_file = PathBuf::from(path.trim());
        }
        if let Some(raw) = get(ENV_HISTORY_LIMIT) {
            config.history_limit = match raw.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => limit,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        var: ENV_HISTORY_LIMIT,
                        value: raw,
                    });
                }
            };
        }
        if let Some(raw) = get(ENV_OWNERS) {
            config.owners = parse_ids(&raw);
        }
        if let Some(raw) = get(ENV_ADMINS) {
            config.administrators = parse_ids(&raw);
        }
        if let Some(raw) = get(ENV_LOG_FORMAT) {
            config.log_format = raw.parse()?;
        }

        Ok(config)
    }

    /// Privilege policy from the configured owner/administrator ids.
    pub fn policy(&self) -> StaticPolicy {
        StaticPolicy::new(self.owners.iter().cloned(), self.administrators.iter().cloned())
    }
}

fn parse_ids(raw: &str) -> Vec<ActorId> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ActorId::from)
        .collect()
}
