//! The keyed vault store capability.
//!
//! [`VaultStore`] is all the state machine knows about persistence. Two
//! implementations ship with the workspace: [`MemoryVaultStore`] here, and
//! the sled transactional view [`crate::storage::DbVaults`] used by the
//! node.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::user_vault::{UserVault, VaultKey};
use crate::storage::StoreResult;

/// Keyed persistence for user vaults.
///
/// Methods take `&self`: implementations use interior mutability (a lock,
/// or a sled transaction buffer). Writes must be visible to subsequent
/// reads through the same handle.
pub trait VaultStore {
    /// Fetch the vault stored under `key`, if any.
    fn get(&self, key: &VaultKey) -> StoreResult<Option<UserVault>>;

    /// Insert or overwrite the record under `vault.key()`.
    fn put(&self, vault: &UserVault) -> StoreResult<()>;

    /// Remove the record under `key`. Removing an absent key is a no-op.
    fn delete(&self, key: &VaultKey) -> StoreResult<()>;

    /// Whether a record exists under `key`.
    fn contains(&self, key: &VaultKey) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

impl<T: VaultStore + ?Sized> VaultStore for &T {
    fn get(&self, key: &VaultKey) -> StoreResult<Option<UserVault>> {
        (**self).get(key)
    }

    fn put(&self, vault: &UserVault) -> StoreResult<()> {
        (**self).put(vault)
    }

    fn delete(&self, key: &VaultKey) -> StoreResult<()> {
        (**self).delete(key)
    }

    fn contains(&self, key: &VaultKey) -> StoreResult<bool> {
        (**self).contains(key)
    }
}

// ---------------------------------------------------------------------------
// MemoryVaultStore
// ---------------------------------------------------------------------------

/// In-memory vault store, ordered by key.
#[derive(Debug, Default)]
pub struct MemoryVaultStore {
    vaults: RwLock<BTreeMap<VaultKey, UserVault>>,
}

impl MemoryVaultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored vault, in key order.
    pub fn vaults(&self) -> Vec<UserVault> {
        self.vaults.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.vaults.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vaults.read().is_empty()
    }
}

impl VaultStore for MemoryVaultStore {
    fn get(&self, key: &VaultKey) -> StoreResult<Option<UserVault>> {
        Ok(self.vaults.read().get(key).cloned())
    }

    fn put(&self, vault: &UserVault) -> StoreResult<()> {
        self.vaults.write().insert(vault.key(), vault.clone());
        Ok(())
    }

    fn delete(&self, key: &VaultKey) -> StoreResult<()> {
        self.vaults.write().remove(key);
        Ok(())
    }

    fn contains(&self, key: &VaultKey) -> StoreResult<bool> {
        Ok(self.vaults.read().contains_key(key))
    }
}
