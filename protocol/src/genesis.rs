//! # Genesis State
//!
//! Import and export of the module's full state: account balances plus the
//! list of user vaults. The pool (module account) balance is never part of
//! the file. It is derived from the vault list on import, which makes the
//! conservation invariant hold from block zero.
//!
//! ```json
//! {
//!   "genesisTime": "2026-01-01T00:00:00Z",
//!   "balances": [{ "address": "cosmos1...", "denom": "tkn", "amount": 1000 }],
//!   "userVaultList": [
//!     { "owner": "cosmos1...", "roadOperatorIndex": "op1", "token": "tkn", "balance": 50 }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bank::{validate_denom, BalanceStore, Bank, BankError, DenomError};
use crate::config::Params;
use crate::identity::{validate_address, AddressError};
use crate::storage::StoreError;
use crate::vault::{UserVault, VaultStore};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("duplicated index for user vault {0}")]
    DuplicateVault(String),

    #[error("user vault {0} has zero balance")]
    ZeroVaultBalance(String),

    #[error("user vault {0} has an empty road operator index")]
    EmptyRoadOperatorIndex(String),

    #[error("duplicated balance entry for {address} in {denom}")]
    DuplicateBalance { address: String, denom: String },

    #[error("invalid address {address}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: AddressError,
    },

    #[error(transparent)]
    InvalidDenom(#[from] DenomError),

    #[error("balances of the module account {0} are derived, not imported")]
    ReservedAccount(String),

    #[error("vault total for {0} overflows u64")]
    PoolOverflow(String),

    #[error(transparent)]
    Bank(#[from] BankError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A pre-funded account balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisBalance {
    pub address: String,
    pub denom: String,
    pub amount: u64,
}

/// Complete module state at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub balances: Vec<GenesisBalance>,
    #[serde(default)]
    pub user_vault_list: Vec<UserVault>,
}

impl GenesisState {
    /// Structural validation. Does not touch any store.
    pub fn validate(&self, params: &Params) -> Result<(), GenesisError> {
        let check_address = |address: &str| {
            validate_address(address, &params.address_prefix).map_err(|source| {
                GenesisError::InvalidAddress {
                    address: address.to_string(),
                    source,
                }
            })
        };

        let mut seen_balances = BTreeSet::new();
        for entry in &self.balances {
            if entry.address == params.module_account {
                return Err(GenesisError::ReservedAccount(entry.address.clone()));
            }
            check_address(&entry.address)?;
            validate_denom(&entry.denom)?;
            if !seen_balances.insert((entry.address.as_str(), entry.denom.as_str())) {
                return Err(GenesisError::DuplicateBalance {
                    address: entry.address.clone(),
                    denom: entry.denom.clone(),
                });
            }
        }

        let mut seen_vaults = BTreeSet::new();
        for vault in &self.user_vault_list {
            let key = vault.key();
            check_address(&vault.owner)?;
            validate_denom(&vault.token)?;
            if vault.road_operator_index.is_empty() {
                return Err(GenesisError::EmptyRoadOperatorIndex(key.to_string()));
            }
            if vault.balance == 0 {
                return Err(GenesisError::ZeroVaultBalance(key.to_string()));
            }
            if !seen_vaults.insert(key.clone()) {
                return Err(GenesisError::DuplicateVault(key.to_string()));
            }
        }

        self.pool_totals().map(|_| ())
    }

    /// Pool balance per denomination implied by the vault list.
    pub fn pool_totals(&self) -> Result<BTreeMap<String, u64>, GenesisError> {
        let mut totals: BTreeMap<String, u64> = BTreeMap::new();
        for vault in &self.user_vault_list {
            let total = totals.entry(vault.token.clone()).or_default();
            *total = total
                .checked_add(vault.balance)
                .ok_or_else(|| GenesisError::PoolOverflow(vault.token.clone()))?;
        }
        Ok(totals)
    }
}

// ---------------------------------------------------------------------------
// Import / Export
// ---------------------------------------------------------------------------

/// Write `genesis` into empty stores. Call [`GenesisState::validate`] first.
///
/// Account balances are minted as listed, vaults are stored as listed, and
/// the module account receives exactly the vault total of each denomination.
pub fn init_genesis<S, B>(
    genesis: &GenesisState,
    vaults: &S,
    bank: &Bank<B>,
) -> Result<(), GenesisError>
where
    S: VaultStore,
    B: BalanceStore,
{
    let pools = genesis.pool_totals()?;

    for entry in &genesis.balances {
        bank.mint(&entry.address, &entry.denom, entry.amount)?;
    }
    for vault in &genesis.user_vault_list {
        vaults.put(vault)?;
    }
    for (denom, total) in &pools {
        bank.mint(bank.module_account(), denom, *total)?;
    }

    tracing::info!(
        accounts = genesis.balances.len(),
        vaults = genesis.user_vault_list.len(),
        pools = pools.len(),
        "genesis state imported"
    );
    Ok(())
}

/// Assemble a genesis state from a full listing of vaults and balances.
///
/// Entries of `module_account` are dropped; they are re-derived on import.
pub fn export_genesis(
    mut vaults: Vec<UserVault>,
    balances: Vec<(String, String, u64)>,
    module_account: &str,
    genesis_time: Option<DateTime<Utc>>,
) -> GenesisState {
    vaults.sort_by_key(|v| v.key());

    let mut balances: Vec<GenesisBalance> = balances
        .into_iter()
        .filter(|(address, _, amount)| address != module_account && *amount > 0)
        .map(|(address, denom, amount)| GenesisBalance {
            address,
            denom,
            amount,
        })
        .collect();
    balances.sort_by(|a, b| (&a.address, &a.denom).cmp(&(&b.address, &b.denom)));

    GenesisState {
        genesis_time,
        balances,
        user_vault_list: vaults,
    }
}
