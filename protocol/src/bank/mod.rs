//! # Bank Module - Custody Ledger
//!
//! Holds account balances per denomination and moves funds between user
//! accounts and the pooled module account that backs every vault.
//!
//! ## Architecture
//!
//! ```text
//! mod.rs     - CustodyLedger / BalanceStore traits, BankError, Bank<B>
//! memory.rs  - MemoryBalances: in-memory balance store
//! denom.rs   - token denomination validation
//! ```
//!
//! [`Bank`] is generic over where balances live. The same transfer logic
//! runs over [`MemoryBalances`] in tests and over the sled transactional
//! view [`crate::storage::DbBalances`] in the node, so the only thing the
//! node adds is the commit boundary.
//!
//! ## Transfer Rules
//!
//! 1. A zero amount is a successful no-op.
//! 2. Every check (sufficient funds, no overflow on the receiving side)
//!    happens before any balance is written. A failed transfer leaves both
//!    sides untouched.
//! 3. A balance that reaches zero is removed from the store.

pub mod denom;
pub mod memory;

pub use denom::{validate_denom, DenomError};
pub use memory::MemoryBalances;

use thiserror::Error;

use crate::config::MODULE_ACCOUNT;
use crate::storage::{StoreError, StoreResult};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while moving funds.
#[derive(Debug, Error)]
pub enum BankError {
    /// The sending account holds less than the requested amount.
    #[error("insufficient funds: {account} holds {available}{denom}, requested {requested}{denom}")]
    InsufficientFunds {
        account: String,
        denom: String,
        available: u64,
        requested: u64,
    },

    /// The module account holds less than it owes. Only reachable when the
    /// pool no longer matches the vaults it backs.
    #[error("pool insufficient: module account holds {available}{denom}, owes {requested}{denom}")]
    PoolInsufficient {
        denom: String,
        available: u64,
        requested: u64,
    },

    /// Crediting the receiving account would overflow `u64`.
    #[error("balance overflow crediting {amount}{denom} to {account}")]
    Overflow {
        account: String,
        denom: String,
        amount: u64,
    },

    /// The balance store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Raw `(account, denom) -> amount` storage underneath a [`Bank`].
pub trait BalanceStore {
    /// Current balance; absent entries read as zero.
    fn balance(&self, account: &str, denom: &str) -> StoreResult<u64>;

    /// Overwrite a balance. Setting zero removes the entry.
    fn set_balance(&self, account: &str, denom: &str, amount: u64) -> StoreResult<()>;
}

impl<T: BalanceStore + ?Sized> BalanceStore for &T {
    fn balance(&self, account: &str, denom: &str) -> StoreResult<u64> {
        (**self).balance(account, denom)
    }

    fn set_balance(&self, account: &str, denom: &str, amount: u64) -> StoreResult<()> {
        (**self).set_balance(account, denom, amount)
    }
}

/// Atomic transfers between user accounts and the pooled module account.
pub trait CustodyLedger {
    /// Move `amount` of `denom` from `from` into the pool.
    fn transfer_in(&self, from: &str, denom: &str, amount: u64) -> Result<(), BankError>;

    /// Move `amount` of `denom` from the pool to `to`.
    fn transfer_out(&self, denom: &str, to: &str, amount: u64) -> Result<(), BankError>;

    /// Current pool balance of `denom`.
    fn pool_balance(&self, denom: &str) -> Result<u64, BankError>;

    /// Name of the pooled account. It can never own a vault.
    fn module_account(&self) -> &str;
}

impl<T: CustodyLedger + ?Sized> CustodyLedger for &T {
    fn transfer_in(&self, from: &str, denom: &str, amount: u64) -> Result<(), BankError> {
        (**self).transfer_in(from, denom, amount)
    }

    fn transfer_out(&self, denom: &str, to: &str, amount: u64) -> Result<(), BankError> {
        (**self).transfer_out(denom, to, amount)
    }

    fn pool_balance(&self, denom: &str) -> Result<u64, BankError> {
        (**self).pool_balance(denom)
    }

    fn module_account(&self) -> &str {
        (**self).module_account()
    }
}

// ---------------------------------------------------------------------------
// Bank
// ---------------------------------------------------------------------------

/// Custody ledger over any [`BalanceStore`].
#[derive(Debug)]
pub struct Bank<B> {
    balances: B,
    module_account: String,
}

/// Bank over in-memory balances. The usual test fixture.
pub type MemoryBank = Bank<MemoryBalances>;

impl MemoryBank {
    /// Empty in-memory bank using the default module account.
    pub fn in_memory() -> Self {
        Bank::new(MemoryBalances::new(), MODULE_ACCOUNT)
    }
}

impl<B: BalanceStore> Bank<B> {
    pub fn new(balances: B, module_account: impl Into<String>) -> Self {
        Self {
            balances,
            module_account: module_account.into(),
        }
    }

    /// Name of the pooled account.
    pub fn module_account(&self) -> &str {
        &self.module_account
    }

    /// The underlying balance store.
    pub fn balances(&self) -> &B {
        &self.balances
    }

    /// Balance of any account, including the module account.
    pub fn balance(&self, account: &str, denom: &str) -> Result<u64, BankError> {
        Ok(self.balances.balance(account, denom)?)
    }

    /// Create funds out of thin air. Genesis import and tests only; never
    /// reachable from a vault transition.
    pub fn mint(&self, account: &str, denom: &str, amount: u64) -> Result<(), BankError> {
        let current = self.balances.balance(account, denom)?;
        let updated = current.checked_add(amount).ok_or_else(|| BankError::Overflow {
            account: account.to_string(),
            denom: denom.to_string(),
            amount,
        })?;
        self.balances.set_balance(account, denom, updated)?;
        Ok(())
    }

    /// Move funds between two accounts. All checks precede all writes. A
    /// transfer to the sending account only checks funds.
    fn send(&self, from: &str, to: &str, denom: &str, amount: u64) -> Result<(), BankError> {
        if amount == 0 {
            return Ok(());
        }

        let from_balance = self.balances.balance(from, denom)?;

        let debited = from_balance
            .checked_sub(amount)
            .ok_or_else(|| BankError::InsufficientFunds {
                account: from.to_string(),
                denom: denom.to_string(),
                available: from_balance,
                requested: amount,
            })?;
        if from == to {
            return Ok(());
        }
        let to_balance = self.balances.balance(to, denom)?;
        let credited = to_balance
            .checked_add(amount)
            .ok_or_else(|| BankError::Overflow {
                account: to.to_string(),
                denom: denom.to_string(),
                amount,
            })?;

        self.balances.set_balance(from, denom, debited)?;
        self.balances.set_balance(to, denom, credited)?;

        tracing::debug!(from, to, denom, amount, "funds moved");
        Ok(())
    }
}

impl<B: BalanceStore> CustodyLedger for Bank<B> {
    fn transfer_in(&self, from: &str, denom: &str, amount: u64) -> Result<(), BankError> {
        self.send(from, &self.module_account, denom, amount)
    }

    fn transfer_out(&self, denom: &str, to: &str, amount: u64) -> Result<(), BankError> {
        self.send(&self.module_account, to, denom, amount)
            .map_err(|err| match err {
                BankError::InsufficientFunds {
                    denom,
                    available,
                    requested,
                    ..
                } => BankError::PoolInsufficient {
                    denom,
                    available,
                    requested,
                },
                other => other,
            })
    }

    fn pool_balance(&self, denom: &str) -> Result<u64, BankError> {
        self.balance(&self.module_account, denom)
    }

    fn module_account(&self) -> &str {
        &self.module_account
    }
}
