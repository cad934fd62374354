//! # TollroadDB - Persistent Storage Engine
//!
//! The persistence layer for user vaults and account balances, built on
//! sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! | Tree          | Key                                | Value                |
//! |---------------|------------------------------------|----------------------|
//! | `user_vaults` | `key(owner, operator, token)`      | `bincode(UserVault)` |
//! | `balances`    | `key(account, denom)`              | amount (8B BE)       |
//! | `metadata`    | key (UTF-8)                        | value (bytes)        |
//!
//! `key(..)` is the length-prefixed composite encoding from
//! [`super::encode_composite_key`].
//!
//! ## Atomicity
//!
//! [`TollroadDB::transact`] runs a closure inside one sled transaction over
//! all three trees. The closure sees the trees through [`TxContext`], which
//! implements the vault store and the custody ledger. Writes are buffered
//! and land on disk together only if the closure returns `Ok`. An `Err`, or
//! a panic unwinding out of the closure, commits nothing.
//!
//! sled may re-run the closure when it detects a conflict, so the closure
//! must not have side effects outside the transaction.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use sled::transaction::{
    ConflictableTransactionError, TransactionError, TransactionalTree, UnabortableTransactionError,
};
use sled::{Db, IVec, Transactional, Tree};

use super::{decode_composite_key, encode_composite_key, StoreError, StoreResult};
use crate::bank::{BalanceStore, Bank};
use crate::config::{MODULE_ACCOUNT, TREE_BALANCES, TREE_METADATA, TREE_USER_VAULTS};
use crate::vault::{UserVault, VaultKey, VaultStore};

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupted key in tree {0}")]
    CorruptKey(&'static str),
}

pub type DbResult<T> = Result<T, DbError>;

// ---------------------------------------------------------------------------
// Metadata Keys
// ---------------------------------------------------------------------------

/// Number of transitions committed through the node.
const META_SEQUENCE: &[u8] = b"committed_sequence";

/// RFC 3339 timestamp written when genesis is imported.
const META_GENESIS_TIME: &[u8] = b"genesis_time";

// ---------------------------------------------------------------------------
// Encoding helpers
// ---------------------------------------------------------------------------

fn decode_u64(bytes: &[u8]) -> Option<u64> {
    <[u8; 8]>::try_from(bytes).ok().map(u64::from_be_bytes)
}

fn decode_vault(bytes: &[u8]) -> Result<UserVault, String> {
    bincode::deserialize(bytes).map_err(|e| e.to_string())
}


// ---------------------------------------------------------------------------
// TollroadDB
// ---------------------------------------------------------------------------

/// Persistent storage for the vault module.
///
/// Cheap to clone: sled handles are reference counted. sled takes an
/// exclusive lock on the data directory, so one process owns it at a time.
#[derive(Debug, Clone)]
pub struct TollroadDB {
    /// The underlying sled database handle.
    db: Db,
    /// Vault records keyed by encoded [`VaultKey`].
    user_vaults: Tree,
    /// Account balances keyed by encoded (account, denom).
    balances: Tree,
    /// Sequence counter and genesis marker.
    metadata: Tree,
}

impl TollroadDB {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is removed when dropped.
    pub fn open_temporary() -> DbResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let user_vaults = db.open_tree(TREE_USER_VAULTS)?;
        let balances = db.open_tree(TREE_BALANCES)?;
        let metadata = db.open_tree(TREE_METADATA)?;

        Ok(Self {
            db,
            user_vaults,
            balances,
            metadata,
        })
    }

    // -- Atomic execution ---------------------------------------------------

    /// Run `f` as one atomic unit over vaults, balances and metadata.
    ///
    /// The outer `Result` reports database failures; the inner one is
    /// whatever `f` returned. Nothing is written when `f` returns `Err`.
    pub fn transact<T, E, F>(&self, f: F) -> DbResult<Result<T, E>>
    where
        F: Fn(&TxContext<'_>) -> Result<T, E>,
    {
        let result = (&self.user_vaults, &self.balances, &self.metadata).transaction(
            |(vaults, balances, metadata)| {
                let conflict = Cell::new(false);
                let ctx = TxContext {
                    vaults: DbVaults {
                        tree: TxTree::new(vaults, &conflict),
                    },
                    bank: Bank::new(
                        DbBalances {
                            tree: TxTree::new(balances, &conflict),
                        },
                        MODULE_ACCOUNT,
                    ),
                    metadata: TxTree::new(metadata, &conflict),
                };
                let outcome = f(&ctx);
                if conflict.get() {
                    // sled retries the closure from scratch
                    return Err(ConflictableTransactionError::Conflict);
                }
                outcome.map_err(ConflictableTransactionError::Abort)
            },
        );

        match result {
            Ok(value) => {
                self.db.flush()?;
                Ok(Ok(value))
            }
            Err(TransactionError::Abort(err)) => Ok(Err(err)),
            Err(TransactionError::Storage(err)) => Err(DbError::Sled(err)),
        }
    }

    // -- Vault reads --------------------------------------------------------

    /// Fetch a single vault.
    pub fn get_vault(&self, key: &VaultKey) -> DbResult<Option<UserVault>> {
        match self.user_vaults.get(key.to_bytes())? {
            Some(bytes) => Ok(Some(decode_vault(&bytes).map_err(DbError::Serialization)?)),
            None => Ok(None),
        }
    }

    /// Every vault, in key order.
    pub fn list_vaults(&self) -> DbResult<Vec<UserVault>> {
        self.collect_vaults(self.user_vaults.iter())
    }

    /// Every vault owned by `owner`, in key order.
    pub fn list_vaults_by_owner(&self, owner: &str) -> DbResult<Vec<UserVault>> {
        self.collect_vaults(self.user_vaults.scan_prefix(VaultKey::owner_prefix(owner)))
    }

    fn collect_vaults(
        &self,
        iter: impl Iterator<Item = sled::Result<(IVec, IVec)>>,
    ) -> DbResult<Vec<UserVault>> {
        let mut vaults = Vec::new();
        for entry in iter {
            let (_key, value) = entry?;
            vaults.push(decode_vault(&value).map_err(DbError::Serialization)?);
        }
        Ok(vaults)
    }

    /// Number of stored vaults.
    pub fn vault_count(&self) -> usize {
        self.user_vaults.len()
    }

    // -- Balance reads ------------------------------------------------------

    /// Balance of `account` in `denom`; zero when absent.
    pub fn balance(&self, account: &str, denom: &str) -> DbResult<u64> {
        match self.balances.get(encode_composite_key(&[account, denom]))? {
            Some(bytes) => decode_u64(&bytes).ok_or(DbError::CorruptKey(TREE_BALANCES)),
            None => Ok(0),
        }
    }

    /// Every non-zero balance as `(account, denom, amount)`.
    pub fn list_balances(&self) -> DbResult<Vec<(String, String, u64)>> {
        self.collect_balances(self.balances.iter())
    }

    /// Every non-zero balance of one account as `(denom, amount)`.
    pub fn balances_of(&self, account: &str) -> DbResult<Vec<(String, u64)>> {
        let entries = self.collect_balances(self.balances.scan_prefix(encode_composite_key(&[account])))?;
        Ok(entries
            .into_iter()
            .map(|(_, denom, amount)| (denom, amount))
            .collect())
    }

    /// Module account balance per denomination.
    pub fn pool_balances(&self) -> DbResult<BTreeMap<String, u64>> {
        Ok(self.balances_of(MODULE_ACCOUNT)?.into_iter().collect())
    }

    fn collect_balances(
        &self,
        iter: impl Iterator<Item = sled::Result<(IVec, IVec)>>,
    ) -> DbResult<Vec<(String, String, u64)>> {
        let mut entries = Vec::new();
        for entry in iter {
            let (key, value) = entry?;
            let mut parts = decode_composite_key(&key)
                .filter(|parts| parts.len() == 2)
                .ok_or(DbError::CorruptKey(TREE_BALANCES))?;
            let amount = decode_u64(&value).ok_or(DbError::CorruptKey(TREE_BALANCES))?;
            let denom = parts.pop().unwrap_or_default();
            let account = parts.pop().unwrap_or_default();
            entries.push((account, denom, amount));
        }
        Ok(entries)
    }

    // -- Metadata -----------------------------------------------------------

    /// Number of transitions committed so far.
    pub fn sequence(&self) -> DbResult<u64> {
        match self.metadata.get(META_SEQUENCE)? {
            Some(bytes) => decode_u64(&bytes).ok_or(DbError::CorruptKey(TREE_METADATA)),
            None => Ok(0),
        }
    }

    /// When genesis was imported, if it has been.
    pub fn genesis_time(&self) -> DbResult<Option<DateTime<Utc>>> {
        match self.metadata.get(META_GENESIS_TIME)? {
            Some(bytes) => {
                let text = std::str::from_utf8(&bytes)
                    .map_err(|e| DbError::Serialization(e.to_string()))?;
                let time = DateTime::parse_from_rfc3339(text)
                    .map_err(|e| DbError::Serialization(e.to_string()))?;
                Ok(Some(time.with_timezone(&Utc)))
            }
            None => Ok(None),
        }
    }

    /// Whether genesis has been imported.
    pub fn is_initialized(&self) -> DbResult<bool> {
        Ok(self.metadata.contains_key(META_GENESIS_TIME)?)
    }

    /// Force a flush of all pending writes to disk.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

/// Direct access outside any transaction. Queries and tooling only; vault
/// transitions always go through [`TollroadDB::transact`].
impl VaultStore for TollroadDB {
    fn get(&self, key: &VaultKey) -> StoreResult<Option<UserVault>> {
        self.get_vault(key)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn put(&self, vault: &UserVault) -> StoreResult<()> {
        let bytes =
            bincode::serialize(vault).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.user_vaults
            .insert(vault.key().to_bytes(), bytes)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    fn delete(&self, key: &VaultKey) -> StoreResult<()> {
        self.user_vaults
            .remove(key.to_bytes())
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Transactional views
// ---------------------------------------------------------------------------

/// A transactional tree that remembers whether sled reported a conflict.
///
/// Conflicts surface to the closure as [`StoreError::Conflict`], and
/// [`TollroadDB::transact`] hands them back to sled for a retry whatever
/// the closure returned.
#[derive(Clone, Copy)]
struct TxTree<'a> {
    tree: &'a TransactionalTree,
    conflict: &'a Cell<bool>,
}

impl<'a> TxTree<'a> {
    fn new(tree: &'a TransactionalTree, conflict: &'a Cell<bool>) -> Self {
        Self { tree, conflict }
    }

    fn error(&self, err: UnabortableTransactionError) -> StoreError {
        match err {
            UnabortableTransactionError::Conflict => {
                self.conflict.set(true);
                StoreError::Conflict
            }
            UnabortableTransactionError::Storage(e) => StoreError::Backend(e.to_string()),
        }
    }

    fn get(&self, key: impl AsRef<[u8]>) -> StoreResult<Option<IVec>> {
        self.tree.get(key).map_err(|e| self.error(e))
    }

    fn insert(&self, key: impl AsRef<[u8]>, value: Vec<u8>) -> StoreResult<()> {
        self.tree
            .insert(key.as_ref(), value)
            .map(drop)
            .map_err(|e| self.error(e))
    }

    fn remove(&self, key: impl AsRef<[u8]>) -> StoreResult<()> {
        self.tree
            .remove(key.as_ref())
            .map(drop)
            .map_err(|e| self.error(e))
    }
}

/// What a [`TollroadDB::transact`] closure gets to work with.
pub struct TxContext<'a> {
    vaults: DbVaults<'a>,
    bank: Bank<DbBalances<'a>>,
    metadata: TxTree<'a>,
}

impl<'a> TxContext<'a> {
    /// Vault store bound to this transaction.
    pub fn vaults(&self) -> &DbVaults<'a> {
        &self.vaults
    }

    /// Custody ledger bound to this transaction.
    pub fn bank(&self) -> &Bank<DbBalances<'a>> {
        &self.bank
    }

    /// Bump and return the committed-transition counter. Takes effect only
    /// if the transaction commits.
    pub fn next_sequence(&self) -> StoreResult<u64> {
        let current = match self.metadata.get(META_SEQUENCE)? {
            Some(bytes) => decode_u64(&bytes)
                .ok_or_else(|| StoreError::Serialization("invalid sequence bytes".to_string()))?,
            None => 0,
        };
        let next = current + 1;
        self.metadata
            .insert(META_SEQUENCE, next.to_be_bytes().to_vec())?;
        Ok(next)
    }

    /// Record the genesis timestamp. Marks the database as initialized.
    pub fn set_genesis_time(&self, time: DateTime<Utc>) -> StoreResult<()> {
        self.metadata
            .insert(META_GENESIS_TIME, time.to_rfc3339().into_bytes())
    }
}

/// [`VaultStore`] over the `user_vaults` tree inside a transaction.
pub struct DbVaults<'a> {
    tree: TxTree<'a>,
}

impl VaultStore for DbVaults<'_> {
    fn get(&self, key: &VaultKey) -> StoreResult<Option<UserVault>> {
        match self.tree.get(key.to_bytes())? {
            Some(bytes) => Ok(Some(decode_vault(&bytes).map_err(StoreError::Serialization)?)),
            None => Ok(None),
        }
    }

    fn put(&self, vault: &UserVault) -> StoreResult<()> {
        let bytes =
            bincode::serialize(vault).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.tree.insert(vault.key().to_bytes(), bytes)
    }

    fn delete(&self, key: &VaultKey) -> StoreResult<()> {
        self.tree.remove(key.to_bytes())
    }
}

/// [`BalanceStore`] over the `balances` tree inside a transaction.
pub struct DbBalances<'a> {
    tree: TxTree<'a>,
}

impl BalanceStore for DbBalances<'_> {
    fn balance(&self, account: &str, denom: &str) -> StoreResult<u64> {
        match self.tree.get(encode_composite_key(&[account, denom]))? {
            Some(bytes) => decode_u64(&bytes)
                .ok_or_else(|| StoreError::Serialization("invalid balance bytes".to_string())),
            None => Ok(0),
        }
    }

    fn set_balance(&self, account: &str, denom: &str, amount: u64) -> StoreResult<()> {
        let key = encode_composite_key(&[account, denom]);
        if amount == 0 {
            self.tree.remove(key)
        } else {
            self.tree.insert(key, amount.to_be_bytes().to_vec())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
