//! In-memory balance store.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::BalanceStore;
use crate::storage::StoreResult;

/// One non-zero balance: `(account, denom, amount)`.
pub type BalanceEntry = (String, String, u64);

/// `(account, denom) -> amount`, zero entries elided.
#[derive(Debug, Default)]
pub struct MemoryBalances {
    balances: RwLock<BTreeMap<(String, String), u64>>,
}

impl MemoryBalances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every non-zero balance, ordered by account then denomination.
    pub fn entries(&self) -> Vec<BalanceEntry> {
        self.balances
            .read()
            .iter()
            .map(|((account, denom), amount)| (account.clone(), denom.clone(), *amount))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.read().is_empty()
    }
}

impl BalanceStore for MemoryBalances {
    fn balance(&self, account: &str, denom: &str) -> StoreResult<u64> {
        let key = (account.to_string(), denom.to_string());
        Ok(self.balances.read().get(&key).copied().unwrap_or(0))
    }

    fn set_balance(&self, account: &str, denom: &str, amount: u64) -> StoreResult<()> {
        let key = (account.to_string(), denom.to_string());
        let mut balances = self.balances.write();
        if amount == 0 {
            balances.remove(&key);
        } else {
            balances.insert(key, amount);
        }
        Ok(())
    }
}
