//! # Application
//!
//! Binds the vault state machine to the sled database. Every transaction
//! runs inside one [`TollroadDB::transact`] call, so a transition either
//! commits all of its balance and vault writes together or none of them.
//! Events are gathered per attempt and only surface once the commit
//! succeeded.

use std::path::Path;

use anyhow::{bail, Context};
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use tollroad_contracts::query::{
    list_user_vaults, show_user_vault, QueryAllUserVaultResponse, QueryBalanceResponse,
    QueryGetUserVaultResponse,
};
use tollroad_contracts::{MsgError, PageRequest, QueryError, VaultError, VaultMsg, VaultService};
use tollroad_protocol::config::{Params, MODULE_ACCOUNT};
use tollroad_protocol::events::{EventLog, VaultEvent};
use tollroad_protocol::genesis::{self, GenesisError, GenesisState};
use tollroad_protocol::invariants::{self, InvariantViolation};
use tollroad_protocol::storage::{DbError, TollroadDB};
use tollroad_protocol::vault::{UserVault, VaultKey};

/// Why a transaction was not committed.
#[derive(Debug, Error)]
pub enum DeliverError {
    /// The message failed stateless validation.
    #[error(transparent)]
    Invalid(#[from] MsgError),

    /// The state machine refused the transition.
    #[error(transparent)]
    Rejected(#[from] VaultError),

    /// The database could not run the transaction.
    #[error("database error: {0}")]
    Db(#[from] DbError),

    /// The transaction could not be encoded for hashing.
    #[error("failed to encode transaction: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl DeliverError {
    pub fn code(&self) -> &'static str {
        match self {
            DeliverError::Invalid(e) => e.code(),
            DeliverError::Rejected(e) => e.code(),
            DeliverError::Db(_) => "store_error",
            DeliverError::Encoding(_) => "encoding_error",
        }
    }
}

/// A committed transaction.
#[derive(Debug, Clone, Serialize)]
pub struct TxOutcome {
    /// 1-based position of this transaction among all committed ones.
    pub sequence: u64,
    pub tx_hash: String,
    /// The vault after the transition (the removed vault for deletions).
    pub vault: UserVault,
    pub events: Vec<VaultEvent>,
}

pub struct App {
    db: TollroadDB,
    params: Params,
}

impl App {
    /// Open (or create) the database under `data_dir`.
    pub fn open(data_dir: &Path, params: Params) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_dir).with_context(|| {
            format!("failed to create data directory: {}", data_dir.display())
        })?;
        let db = TollroadDB::open(data_dir)
            .with_context(|| format!("failed to open database at {}", data_dir.display()))?;
        tracing::debug!(path = %data_dir.display(), "database opened");
        Ok(Self::from_db(db, params))
    }

    pub fn from_db(db: TollroadDB, params: Params) -> Self {
        Self { db, params }
    }

    pub fn db(&self) -> &TollroadDB {
        &self.db
    }

    pub fn is_initialized(&self) -> Result<bool, DbError> {
        self.db.is_initialized()
    }

    /// Validate and import `genesis` into an uninitialized database.
    ///
    /// Returns `false` without touching anything if genesis was already
    /// imported.
    pub fn init_genesis(&self, genesis: &GenesisState) -> anyhow::Result<bool> {
        if self.db.is_initialized()? {
            return Ok(false);
        }
        if self.db.vault_count() > 0 || !self.db.list_balances()?.is_empty() {
            bail!("database holds state but no genesis marker; refusing to import");
        }

        genesis
            .validate(&self.params)
            .context("invalid genesis state")?;

        let genesis_time = genesis.genesis_time.unwrap_or_else(Utc::now);
        self.db
            .transact(|ctx| -> Result<(), GenesisError> {
                genesis::init_genesis(genesis, ctx.vaults(), ctx.bank())?;
                ctx.set_genesis_time(genesis_time)?;
                Ok(())
            })??;

        tracing::info!(%genesis_time, "genesis committed");
        Ok(true)
    }

    /// Validate `msg` and run it as one atomic transaction.
    pub fn deliver(&self, caller: &str, msg: &VaultMsg) -> Result<TxOutcome, DeliverError> {
        if let Err(err) = msg.validate_basic(caller, &self.params.address_prefix) {
            tracing::warn!(caller, msg_type = msg.msg_type(), error = %err, "invalid message");
            return Err(err.into());
        }

        let result = self.db.transact(|ctx| -> Result<_, DeliverError> {
            let log = EventLog::new();
            let service = VaultService::new(ctx.vaults(), ctx.bank(), &log);
            let vault = service.execute(caller, msg)?;
            let sequence = ctx.next_sequence().map_err(VaultError::from)?;
            let tx_hash = tx_hash(sequence, caller, msg)?;
            Ok((sequence, tx_hash, vault, log.drain()))
        })?;

        match result {
            Ok((sequence, tx_hash, vault, events)) => {
                for event in &events {
                    tracing::info!(
                        event = event.event_type(),
                        owner = %event.owner,
                        road_operator_index = %event.road_operator_index,
                        token = %event.token,
                        balance = ?event.balance,
                        sequence,
                        "vault event"
                    );
                }
                Ok(TxOutcome {
                    sequence,
                    tx_hash,
                    vault,
                    events,
                })
            }
            Err(err) => {
                tracing::warn!(
                    caller,
                    msg_type = msg.msg_type(),
                    code = err.code(),
                    error = %err,
                    "transaction rejected"
                );
                Err(err)
            }
        }
    }

    pub fn show_user_vault(&self, key: &VaultKey) -> Result<QueryGetUserVaultResponse, QueryError> {
        show_user_vault(&self.db, key)
    }

    pub fn list_user_vaults(
        &self,
        owner: Option<&str>,
        page: &PageRequest,
    ) -> Result<QueryAllUserVaultResponse, DbError> {
        let vaults = match owner {
            Some(owner) => self.db.list_vaults_by_owner(owner)?,
            None => self.db.list_vaults()?,
        };
        Ok(list_user_vaults(vaults, page))
    }

    /// Balances of `address`; with `denom`, just that one (zero if absent).
    pub fn balance(&self, address: &str, denom: Option<&str>) -> Result<QueryBalanceResponse, DbError> {
        let entries = match denom {
            Some(denom) => vec![(denom.to_string(), self.db.balance(address, denom)?)],
            None => self.db.balances_of(address)?,
        };
        Ok(QueryBalanceResponse::new(address, entries))
    }

    pub fn export(&self) -> Result<GenesisState, DbError> {
        Ok(genesis::export_genesis(
            self.db.list_vaults()?,
            self.db.list_balances()?,
            MODULE_ACCOUNT,
            self.db.genesis_time()?,
        ))
    }

    /// Outer error: the database failed. Inner error: the books are off.
    pub fn check_invariants(&self) -> Result<Result<(), InvariantViolation>, DbError> {
        let vaults = self.db.list_vaults()?;
        let pools = self.db.pool_balances()?;
        Ok(invariants::check_all(&vaults, &pools))
    }
}

/// Upper-case hex SHA-256 of the JSON encoding of `(sequence, caller, msg)`.
pub fn tx_hash(sequence: u64, caller: &str, msg: &VaultMsg) -> Result<String, serde_json::Error> {
    let preimage = serde_json::to_vec(&(sequence, caller, msg))?;
    Ok(hex::encode_upper(Sha256::digest(&preimage)))
}
