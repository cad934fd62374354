//! # CLI Interface
//!
//! Defines the command-line argument structure for `tollroad-node` using
//! `clap` derive. Subcommands: `init`, `tx`, `query`, `export`,
//! `check-invariants` and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Toll-road user vault node.
///
/// Delivers vault transactions against a local sled database, answers
/// queries, and imports/exports genesis state. Results are printed to
/// stdout as JSON; logs go to stderr.
#[derive(Parser, Debug)]
#[command(
    name = "tollroad-node",
    about = "Toll-road user vault node",
    version,
    propagate_version = true
)]
pub struct TollroadCli {
    /// Node home directory holding `config.toml` and the database.
    #[arg(long, global = true, env = "TOLLROAD_HOME", default_value = "~/.tollroad")]
    pub home: PathBuf,

    /// Path to the node configuration file (TOML).
    ///
    /// When omitted, the node looks for `config.toml` in the home directory.
    #[arg(long, short = 'c', global = true, env = "TOLLROAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format. Overrides the configuration file.
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the home directory and, optionally, import genesis.
    Init(InitArgs),
    /// Deliver a vault transaction on behalf of `--from`.
    Tx(TxArgs),
    /// Read-only queries.
    #[command(subcommand)]
    Query(QueryCommand),
    /// Print the current state as genesis JSON.
    Export,
    /// Verify that the pool matches the vaults.
    CheckInvariants,
    /// Print version information and exit.
    Version,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Genesis file (JSON) to import into the fresh database.
    #[arg(long)]
    pub genesis: Option<PathBuf>,
}

/// Arguments for the `tx` subcommand.
#[derive(Parser, Debug)]
pub struct TxArgs {
    /// Address of the account sending the transaction.
    #[arg(long)]
    pub from: String,

    #[command(subcommand)]
    pub command: TxCommand,
}

#[derive(Subcommand, Debug)]
pub enum TxCommand {
    /// Lock `balance` of `token` into a new vault.
    CreateUserVault {
        road_operator_index: String,
        token: String,
        balance: u64,
    },
    /// Set a new balance on an existing vault.
    UpdateUserVault {
        road_operator_index: String,
        token: String,
        balance: u64,
        /// Owner of the vault; defaults to `--from`.
        #[arg(long)]
        owner: Option<String>,
    },
    /// Delete a vault and refund its balance.
    DeleteUserVault {
        road_operator_index: String,
        token: String,
        /// Owner of the vault; defaults to `--from`.
        #[arg(long)]
        owner: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum QueryCommand {
    /// List vaults, optionally of one owner.
    ListUserVault {
        #[arg(long)]
        owner: Option<String>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one vault.
    ShowUserVault {
        owner: String,
        road_operator_index: String,
        token: String,
    },
    /// Show the balances of an account.
    Balance {
        address: String,
        #[arg(long)]
        denom: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        TollroadCli::command().debug_assert();
    }

    #[test]
    fn parses_update_with_owner() {
        let cli = TollroadCli::try_parse_from([
            "tollroad-node",
            "--home",
            "/tmp/x",
            "tx",
            "--from",
            "cosmos1abc",
            "update-user-vault",
            "op1",
            "tkn",
            "80",
            "--owner",
            "cosmos1def",
        ])
        .unwrap();

        match cli.command {
            Commands::Tx(TxArgs {
                from,
                command: TxCommand::UpdateUserVault { balance, owner, .. },
            }) => {
                assert_eq!(from, "cosmos1abc");
                assert_eq!(balance, 80);
                assert_eq!(owner.as_deref(), Some("cosmos1def"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn negative_balance_is_rejected() {
        let result = TollroadCli::try_parse_from([
            "tollroad-node",
            "tx",
            "--from",
            "cosmos1abc",
            "create-user-vault",
            "op1",
            "tkn",
            "-5",
        ]);
        assert!(result.is_err());
    }
}
