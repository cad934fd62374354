//! # Module Invariants
//!
//! Checks that must hold between any two transitions:
//!
//! - **Positive balance** - every stored vault has `balance > 0`.
//! - **Conservation** - for every denomination, the module account holds
//!   exactly the sum of the balances of the vaults in that denomination.
//!
//! Key uniqueness needs no check: every store is keyed by [`VaultKey`].
//!
//! A broken invariant means the books no longer balance. The node reports
//! it and exits non-zero; it never tries to repair anything.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::vault::UserVault;

/// A violated module invariant.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A stored vault holds nothing.
    #[error("user vault {key} has zero balance")]
    ZeroBalance { key: String },

    /// Pool and vaults disagree for a denomination.
    #[error("pool holds {pool}{denom} but vaults sum to {vaults}{denom}")]
    PoolMismatch { denom: String, pool: u64, vaults: u128 },
}

/// Every vault has a positive balance.
pub fn check_positive_balances(vaults: &[UserVault]) -> Result<(), InvariantViolation> {
    match vaults.iter().find(|v| v.balance == 0) {
        Some(vault) => Err(InvariantViolation::ZeroBalance {
            key: vault.key().to_string(),
        }),
        None => Ok(()),
    }
}

/// Sum of vault balances per denomination, without overflow.
pub fn vault_totals(vaults: &[UserVault]) -> BTreeMap<String, u128> {
    let mut totals: BTreeMap<String, u128> = BTreeMap::new();
    for vault in vaults {
        *totals.entry(vault.token.clone()).or_default() += u128::from(vault.balance);
    }
    totals
}

/// For every denomination seen in either `vaults` or `pools`, the pool
/// balance equals the vault total.
///
/// `pools` maps denomination to the module account balance. Missing
/// entries read as zero.
pub fn check_conservation(
    vaults: &[UserVault],
    pools: &BTreeMap<String, u64>,
) -> Result<(), InvariantViolation> {
    let totals = vault_totals(vaults);
    let denoms: BTreeSet<&String> = totals.keys().chain(pools.keys()).collect();

    for denom in denoms {
        let pool = pools.get(denom).copied().unwrap_or(0);
        let sum = totals.get(denom).copied().unwrap_or(0);
        if u128::from(pool) != sum {
            return Err(InvariantViolation::PoolMismatch {
                denom: denom.clone(),
                pool,
                vaults: sum,
            });
        }
    }
    Ok(())
}

/// Run every invariant, stopping at the first violation.
pub fn check_all(
    vaults: &[UserVault],
    pools: &BTreeMap<String, u64>,
) -> Result<(), InvariantViolation> {
    check_positive_balances(vaults)?;
    check_conservation(vaults, pools)
}
