// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Toll-Road Vault Node
//!
//! Entry point for the `tollroad-node` binary. Parses CLI arguments, loads
//! the node configuration, initializes logging, and runs one command
//! against the local database.
//!
//! - `init`             - create the home directory and import genesis
//! - `tx`               - deliver a create/update/delete vault transaction
//! - `query`            - list or show vaults, show account balances
//! - `export`           - print the current state as genesis JSON
//! - `check-invariants` - verify the pool against the vaults
//! - `version`          - print build version information
//!
//! Command results go to stdout as JSON. A rejected transaction prints
//! `{"code": "<reason>", "log": "..."}` and exits with status 1.

mod app;
mod cli;
mod config;
mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::{json, Value};

use tollroad_contracts::msgs::{MsgCreateUserVault, MsgDeleteUserVault, MsgUpdateUserVault};
use tollroad_contracts::{PageRequest, VaultMsg};
use tollroad_protocol::events::VaultEvent;
use tollroad_protocol::genesis::GenesisState;
use tollroad_protocol::vault::VaultKey;

use app::App;
use cli::{Commands, InitArgs, QueryCommand, TollroadCli, TxArgs, TxCommand};
use config::{NodeConfig, CONFIG_FILE, DATA_DIR};

fn main() -> Result<ExitCode> {
    let cli = TollroadCli::parse();

    let home = config::expand_home(&cli.home);
    let config_path = cli
        .config
        .as_deref()
        .map(config::expand_home)
        .unwrap_or_else(|| home.join(CONFIG_FILE));
    let node_config = NodeConfig::load(&config_path)?;

    logging::init_logging(
        &node_config.log_level,
        cli.log_format.unwrap_or(node_config.log_format),
    );

    match cli.command {
        Commands::Init(args) => init_home(&home, &config_path, args),
        Commands::Tx(args) => run_tx(&open_app(&home, &node_config)?, args),
        Commands::Query(query) => run_query(&open_app(&home, &node_config)?, query),
        Commands::Export => {
            let genesis = open_app(&home, &node_config)?.export()?;
            print_json(&genesis)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::CheckInvariants => check_invariants(&open_app(&home, &node_config)?),
        Commands::Version => {
            print_version();
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Creates the home directory, writes a default config and imports genesis.
fn init_home(home: &Path, config_path: &Path, args: InitArgs) -> Result<ExitCode> {
    tracing::info!(home = %home.display(), "initializing node");

    std::fs::create_dir_all(home)
        .with_context(|| format!("failed to create home directory: {}", home.display()))?;
    if NodeConfig::write_default(config_path)? {
        tracing::info!(path = %config_path.display(), "default config written");
    }
    let node_config = NodeConfig::load(config_path)?;

    let genesis = match &args.genesis {
        Some(path) => read_genesis(path)?,
        None => GenesisState::default(),
    };

    let app = App::open(&home.join(DATA_DIR), node_config.params())?;
    if !app.init_genesis(&genesis)? {
        if args.genesis.is_some() {
            bail!("node at {} is already initialized", home.display());
        }
        tracing::info!("node already initialized, nothing to do");
    }

    println!("Node initialized.");
    println!("  Home     : {}", home.display());
    println!("  Config   : {}", config_path.display());
    println!("  Vaults   : {}", genesis.user_vault_list.len());
    println!("  Accounts : {}", genesis.balances.len());
    Ok(ExitCode::SUCCESS)
}

fn read_genesis(path: &Path) -> Result<GenesisState> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read genesis file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("invalid genesis JSON in {}", path.display()))
}

/// Opens the database of an initialized home directory.
fn open_app(home: &Path, node_config: &NodeConfig) -> Result<App> {
    let data_dir: PathBuf = home.join(DATA_DIR);
    if !data_dir.exists() {
        bail!(
            "no database at {}; run `tollroad-node init` first",
            data_dir.display()
        );
    }
    let app = App::open(&data_dir, node_config.params())?;
    if !app.is_initialized()? {
        bail!("database at {} has no genesis; run `tollroad-node init`", data_dir.display());
    }
    Ok(app)
}

fn run_tx(app: &App, args: TxArgs) -> Result<ExitCode> {
    let msg: VaultMsg = match args.command {
        TxCommand::CreateUserVault {
            road_operator_index,
            token,
            balance,
        } => MsgCreateUserVault {
            road_operator_index,
            token,
            balance,
        }
        .into(),
        TxCommand::UpdateUserVault {
            road_operator_index,
            token,
            balance,
            owner,
        } => MsgUpdateUserVault {
            owner,
            road_operator_index,
            token,
            balance,
        }
        .into(),
        TxCommand::DeleteUserVault {
            road_operator_index,
            token,
            owner,
        } => MsgDeleteUserVault {
            owner,
            road_operator_index,
            token,
        }
        .into(),
    };

    match app.deliver(&args.from, &msg) {
        Ok(outcome) => {
            print_json(&json!({
                "code": 0,
                "sequence": outcome.sequence,
                "txhash": outcome.tx_hash,
                "vault": outcome.vault,
                "events": outcome.events.iter().map(render_event).collect::<Vec<_>>(),
            }))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            print_json(&json!({ "code": err.code(), "log": err.to_string() }))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run_query(app: &App, query: QueryCommand) -> Result<ExitCode> {
    match query {
        QueryCommand::ListUserVault {
            owner,
            offset,
            limit,
        } => {
            let page = PageRequest::new(offset, limit);
            print_json(&app.list_user_vaults(owner.as_deref(), &page)?)?;
        }
        QueryCommand::ShowUserVault {
            owner,
            road_operator_index,
            token,
        } => {
            let key = VaultKey::new(owner, road_operator_index, token);
            match app.show_user_vault(&key) {
                Ok(response) => print_json(&response)?,
                Err(err) => {
                    print_json(&json!({ "code": err.code(), "log": err.to_string() }))?;
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        QueryCommand::Balance { address, denom } => {
            print_json(&app.balance(&address, denom.as_deref())?)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn check_invariants(app: &App) -> Result<ExitCode> {
    match app.check_invariants()? {
        Ok(()) => {
            print_json(&json!({ "ok": true, "vaults": app.db().vault_count() }))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(violation) => {
            tracing::error!(%violation, "invariant broken");
            print_json(&json!({ "ok": false, "violation": violation.to_string() }))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Event in the `{type, attributes: [{key, value}]}` shape indexers expect.
fn render_event(event: &VaultEvent) -> Value {
    let attributes: Vec<Value> = event
        .attributes()
        .into_iter()
        .map(|(key, value)| json!({ "key": key, "value": value }))
        .collect();
    json!({ "type": event.event_type(), "attributes": attributes })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{text}");
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("tollroad-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol      {}", tollroad_protocol::config::PROTOCOL_VERSION);
    println!("rustc         {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
