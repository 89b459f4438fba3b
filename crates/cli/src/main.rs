//! Guild bank CLI - reference dispatcher.
//!
//! Resolves the caller's privilege from configuration, runs one engine
//! operation against the JSON ledger file and prints the outcome.

mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use guildbank_auth::{authorize, Caller, Privilege};
use guildbank_core::{ActorId, BankError, RequestId};
use guildbank_infra::{BankConfig, EngineError, JsonFileStore, LedgerEngine};

#[derive(Parser)]
#[command(name = "guildbank")]
#[command(about = "Guild Bank - shared mesos and item ledger", long_about = None)]
struct Cli {
    /// Ledger file (overrides GUILD_BANK_FILE)
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// Id of the acting user
    #[arg(short, long, global = true, default_value = "")]
    actor: String,

    /// Display name used in history (defaults to the actor id)
    #[arg(short, long, global = true)]
    name: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deposit mesos into the bank
    Deposit { amount: i64 },

    /// Deposit items into the bank
    DepositItem { item: String, quantity: i64 },

    /// Ask to withdraw mesos (needs an admin's approval)
    RequestWithdraw { amount: i64 },

    /// Ask to withdraw items (needs an admin's approval)
    RequestWithdrawItem { item: String, quantity: i64 },

    /// Approve a pending mesos withdrawal (admins only)
    ApproveWithdraw {
        amount: i64,
        /// Only approve a request made by this user id
        #[arg(long)]
        user: Option<String>,
    },

    /// Approve a pending item withdrawal (admins only)
    ApproveWithdrawItem {
        item: String,
        quantity: i64,
        /// Only approve a request made by this user id
        #[arg(long)]
        user: Option<String>,
    },

    /// Cancel a pending request (the requester or an admin)
    CancelRequest { request_id: RequestId },

    /// Remove mesos without a request (owners only)
    Delete { amount: i64 },

    /// Remove items without a request (owners only)
    DeleteItem { item: String, quantity: i64 },

    /// Show the mesos balance and stored items
    Balance,

    /// Show the most recent transactions
    History {
        /// Number of entries (defaults to GUILD_BANK_HISTORY_LIMIT)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List pending withdrawal requests
    Pending,

    /// Show contribution totals
    Contributions,

    /// Erase the transaction history (owners only)
    EraseHistory {
        /// Confirm the erase
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = BankConfig::from_env().context("invalid configuration")?;
    if let Some(data) = cli.data {
        config.data_file = data;
    }
    guildbank_observability::init_with(config.log_format);

    if cli.actor.trim().is_empty() && mutates(&cli.command) {
        anyhow::bail!("--actor is required for this command");
    }

    let engine = LedgerEngine::open(JsonFileStore::new(&config.data_file))
        .with_context(|| format!("failed to open ledger {}", config.data_file.display()))?;

    let actor = cli.actor.trim().to_string();
    let name = cli.name.unwrap_or_else(|| actor.clone());
    let caller = Caller::resolve(actor, name, &config.policy());

    match run(&engine, &caller, &config, cli.command) {
        Ok(message) => {
            println!("{message}");
            Ok(ExitCode::SUCCESS)
        }
        Err(EngineError::Domain(err)) => {
            println!("{}", render::rejection(&err));
            Ok(ExitCode::FAILURE)
        }
        Err(EngineError::Store(err)) => Err(err).context("ledger storage failed"),
    }
}

fn mutates(command: &Commands) -> bool {
    !matches!(
        command,
        Commands::Balance | Commands::History { .. } | Commands::Pending | Commands::Contributions
    )
}

fn run(
    engine: &LedgerEngine<JsonFileStore>,
    caller: &Caller,
    config: &BankConfig,
    command: Commands,
) -> Result<String, EngineError> {
    let name = caller.display_name.as_str();

    let message = match command {
        Commands::Deposit { amount } => {
            let balance = engine.deposit_currency(caller, amount)?;
            render::deposited(name, amount, balance)
        }
        Commands::DepositItem { item, quantity } => {
            let record = engine.deposit_item(caller, &item, quantity)?;
            render::deposited_item(name, quantity, &record)
        }
        Commands::RequestWithdraw { amount } => {
            render::requested(&engine.request_withdraw_currency(caller, amount)?)
        }
        Commands::RequestWithdrawItem { item, quantity } => {
            render::requested(&engine.request_withdraw_item(caller, &item, quantity)?)
        }
        Commands::ApproveWithdraw { amount, user } => {
            let requester = user.map(ActorId::from);
            let withdrawal = engine.approve_withdraw_currency(caller, amount, requester.as_ref())?;
            render::approved(&withdrawal, name)
        }
        Commands::ApproveWithdrawItem {
            item,
            quantity,
            user,
        } => {
            let requester = user.map(ActorId::from);
            let withdrawal =
                engine.approve_withdraw_item(caller, &item, quantity, requester.as_ref())?;
            render::approved(&withdrawal, name)
        }
        Commands::CancelRequest { request_id } => {
            render::cancelled(&engine.cancel_withdraw_request(caller, request_id)?)
        }
        Commands::Delete { amount } => {
            let remaining = engine.admin_delete_currency(caller, amount)?;
            render::deleted(&format!("{amount} mesos"), remaining)
        }
        Commands::DeleteItem { item, quantity } => {
            let remaining = engine.admin_delete_item(caller, &item, quantity)?;
            render::deleted(&format!("{quantity} {}(s)", item.trim()), remaining)
        }
        Commands::Balance => render::balance(&engine.query_balance()?),
        Commands::History { limit } => {
            render::history(&engine.query_history(limit.unwrap_or(config.history_limit))?)
        }
        Commands::Pending => render::pending(&engine.pending_requests()?),
        Commands::Contributions => render::contributions(&engine.contributions()?),
        Commands::EraseHistory { yes: false } => erase_prompt_for(caller)?,
        Commands::EraseHistory { yes: true } => render::erased(engine.erase_history(caller)?),
    };

    tracing::debug!(actor = %caller.actor, privilege = %caller.privilege, "command handled");
    Ok(message)
}

/// Only owners are asked to confirm; anyone else is refused before the prompt.
fn erase_prompt_for(caller: &Caller) -> Result<String, EngineError> {
    authorize(caller, Privilege::Owner).map_err(BankError::from)?;
    Ok(render::erase_prompt())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "guildbank",
            "approve-withdraw",
            "40",
            "--user",
            "1002",
            "--actor",
            "9",
            "--name",
            "Goddess",
        ])
        .unwrap();

        assert_eq!(cli.actor, "9");
        assert_eq!(cli.name.as_deref(), Some("Goddess"));
        match cli.command {
            Commands::ApproveWithdraw { amount, user } => {
                assert_eq!(amount, 40);
                assert_eq!(user.as_deref(), Some("1002"));
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn erase_history_needs_confirmation_flag() {
        let cli = Cli::try_parse_from(["guildbank", "--actor", "1", "erase-history"]).unwrap();
        assert!(matches!(cli.command, Commands::EraseHistory { yes: false }));
        assert!(mutates(&cli.command));

        let cli = Cli::try_parse_from(["guildbank", "balance"]).unwrap();
        assert!(!mutates(&cli.command));
    }

    #[test]
    fn erase_prompt_is_shown_to_owners_only() {
        let owner = Caller::new("1", "Guild Master", Privilege::Owner);
        assert_eq!(erase_prompt_for(&owner).unwrap(), render::erase_prompt());

        for caller in [
            Caller::member("1001", "Alice"),
            Caller::new("9", "Goddess", Privilege::Administrator),
        ] {
            let err = erase_prompt_for(&caller).unwrap_err();
            assert!(matches!(err.as_domain(), Some(BankError::Unauthorized(_))));
        }
    }

    #[test]
    fn rejects_malformed_request_ids() {
        assert!(Cli::try_parse_from(["guildbank", "cancel-request", "not-a-uuid"]).is_err());
    }
}
