//! # User Vault Contract
//!
//! A user vault escrows one token for one (owner, road operator) pair. The
//! funds live in the pooled module account; the vault record says how much
//! of the pool belongs to whom. The lifecycle is:
//!
//! 1. **Create** - the owner locks an initial, positive balance.
//! 2. **Update** - the owner sets a new positive balance; the difference
//!    moves into or out of the pool.
//! 3. **Delete** - the whole balance returns to the owner and the record
//!    disappears.
//!
//! Every transition moves funds before it touches the record. When moving
//! funds *into* the pool fails, the transition is rejected and nothing has
//! changed. When moving funds *out of* the pool fails, the pool no longer
//! covers the vaults it backs; there is no sane way to continue, and the
//! service halts with a panic.

use thiserror::Error;
use tollroad_protocol::bank::{BankError, CustodyLedger};
use tollroad_protocol::events::{EventSink, VaultEvent};
use tollroad_protocol::storage::StoreError;
use tollroad_protocol::vault::{UserVault, VaultKey, VaultStore};

use crate::msgs::VaultMsg;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a vault transition is rejected.
///
/// A rejected transition has no side effects: no funds moved, no record
/// changed, no event emitted.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Create on a key that already holds a vault.
    #[error("index already set: user vault {key} exists")]
    AlreadyExists { key: String },

    /// Create or update with a zero balance.
    #[error("invalid balance ({balance}): must be positive")]
    InvalidAmount { balance: u64 },

    /// Update or delete on a key that holds no vault.
    #[error("index not set: user vault {key} not found")]
    NotFound { key: String },

    /// The caller does not own the targeted vault.
    #[error("incorrect owner: {caller} may not modify user vault {key}")]
    Unauthorized { caller: String, key: String },

    /// The owner cannot cover the amount moving into the pool.
    #[error("insufficient funds: {account} holds {available}{denom}, requires {requested}{denom}")]
    InsufficientFunds {
        account: String,
        denom: String,
        available: u64,
        requested: u64,
    },

    /// Any other recoverable ledger refusal (e.g. overflow on credit).
    #[error("ledger error: {0}")]
    Ledger(BankError),

    /// The vault store or balance store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl VaultError {
    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::AlreadyExists { .. } => "already_exists",
            VaultError::InvalidAmount { .. } => "invalid_amount",
            VaultError::NotFound { .. } => "not_found",
            VaultError::Unauthorized { .. } => "unauthorized",
            VaultError::InsufficientFunds { .. } => "insufficient_funds",
            VaultError::Ledger(_) => "ledger_error",
            VaultError::Store(_) => "store_error",
        }
    }
}

impl From<BankError> for VaultError {
    fn from(err: BankError) -> Self {
        match err {
            BankError::InsufficientFunds {
                account,
                denom,
                available,
                requested,
            } => VaultError::InsufficientFunds {
                account,
                denom,
                available,
                requested,
            },
            BankError::Store(e) => VaultError::Store(e),
            other => VaultError::Ledger(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// The vault state machine.
///
/// Owns nothing but its three capabilities. Wrap a `VaultService` around
/// references (`&MemoryVaultStore`, `&Bank<_>`, `&EventLog`) to share
/// state with the caller.
#[derive(Debug)]
pub struct VaultService<S, L, E> {
    store: S,
    ledger: L,
    events: E,
}

impl<S, L, E> VaultService<S, L, E>
where
    S: VaultStore,
    L: CustodyLedger,
    E: EventSink,
{
    pub fn new(store: S, ledger: L, events: E) -> Self {
        Self {
            store,
            ledger,
            events,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    /// Run the transition a message asks for on behalf of `caller`.
    ///
    /// The message is assumed to have passed
    /// [`VaultMsg::validate_basic`] already.
    pub fn execute(&self, caller: &str, msg: &VaultMsg) -> Result<UserVault, VaultError> {
        match msg {
            VaultMsg::CreateUserVault(m) => {
                self.create_vault(caller, &m.road_operator_index, &m.token, m.balance)
            }
            VaultMsg::UpdateUserVault(m) => self.update_vault(caller, &msg.key(caller), m.balance),
            VaultMsg::DeleteUserVault(_) => self.delete_vault(caller, &msg.key(caller)),
        }
    }

    /// Open a vault owned by `caller` and lock `balance` into the pool.
    ///
    /// # Errors
    ///
    /// [`VaultError::AlreadyExists`] if the caller already has a vault for
    /// this operator and token, [`VaultError::InvalidAmount`] for a zero
    /// balance, [`VaultError::InsufficientFunds`] if the caller cannot
    /// cover it.
    pub fn create_vault(
        &self,
        caller: &str,
        road_operator_index: &str,
        token: &str,
        balance: u64,
    ) -> Result<UserVault, VaultError> {
        let key = VaultKey::new(caller, road_operator_index, token);
        self.reject_module_caller(caller, &key)?;

        if self.store.contains(&key)? {
            return Err(VaultError::AlreadyExists {
                key: key.to_string(),
            });
        }
        if balance == 0 {
            return Err(VaultError::InvalidAmount { balance });
        }

        self.ledger.transfer_in(caller, token, balance)?;

        let vault = UserVault::new(key, balance);
        self.store.put(&vault)?;
        self.events.emit(VaultEvent::created(&vault));

        tracing::debug!(vault = %vault.key(), balance, "user vault created");
        Ok(vault)
    }

    /// Replace the balance of an existing vault.
    ///
    /// An increase pulls the difference from the owner. A decrease returns
    /// it; if the pool cannot pay, this panics.
    pub fn update_vault(
        &self,
        caller: &str,
        key: &VaultKey,
        balance: u64,
    ) -> Result<UserVault, VaultError> {
        let current = self.authorized_vault(caller, key)?;
        if balance == 0 {
            return Err(VaultError::InvalidAmount { balance });
        }

        if balance >= current.balance {
            self.ledger
                .transfer_in(caller, &key.token, balance - current.balance)?;
        } else {
            let refund = current.balance - balance;
            if let Err(err) = self.ledger.transfer_out(&key.token, caller, refund) {
                return Err(ledger_fault(key, err));
            }
        }

        let vault = current.with_balance(balance);
        self.store.put(&vault)?;
        self.events.emit(VaultEvent::updated(&vault));

        tracing::debug!(
            vault = %key,
            from = current.balance,
            to = balance,
            "user vault updated"
        );
        Ok(vault)
    }

    /// Return the full balance to the owner and remove the vault.
    ///
    /// Panics if the pool cannot pay the balance back.
    pub fn delete_vault(&self, caller: &str, key: &VaultKey) -> Result<UserVault, VaultError> {
        let current = self.authorized_vault(caller, key)?;

        if let Err(err) = self
            .ledger
            .transfer_out(&key.token, caller, current.balance)
        {
            return Err(ledger_fault(key, err));
        }

        self.store.delete(key)?;
        self.events.emit(VaultEvent::deleted(key));

        tracing::debug!(vault = %key, refunded = current.balance, "user vault deleted");
        Ok(current)
    }

    /// The pool account cannot hold a vault of its own.
    fn reject_module_caller(&self, caller: &str, key: &VaultKey) -> Result<(), VaultError> {
        if caller == self.ledger.module_account() {
            return Err(VaultError::Unauthorized {
                caller: caller.to_string(),
                key: key.to_string(),
            });
        }
        Ok(())
    }

    /// Load the vault under `key` and check that `caller` owns it.
    fn authorized_vault(&self, caller: &str, key: &VaultKey) -> Result<UserVault, VaultError> {
        self.reject_module_caller(caller, key)?;
        let vault = self
            .store
            .get(key)?
            .ok_or_else(|| VaultError::NotFound {
                key: key.to_string(),
            })?;

        if vault.owner != caller {
            return Err(VaultError::Unauthorized {
                caller: caller.to_string(),
                key: key.to_string(),
            });
        }
        Ok(vault)
    }
}

/// Handle a failed payout from the pool.
///
/// Store failures are returned so the enclosing transaction can abort. Any
/// other refusal means the pool is short of what it owes, and the process
/// halts.
fn ledger_fault(key: &VaultKey, err: BankError) -> VaultError {
    match err {
        BankError::Store(e) => VaultError::Store(e),
        other => {
            tracing::error!(vault = %key, error = %other, "pool cannot pay out vault funds");
            panic!("bank error: {other}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollroad_protocol::bank::{BalanceStore, MemoryBank};
    use tollroad_protocol::config::MODULE_ACCOUNT;
    use tollroad_protocol::events::{EventLog, VaultEventKind};
    use tollroad_protocol::vault::MemoryVaultStore;

    const ALICE: &str = "alice";
    const BOB: &str = "bob";

    struct Fixture {
        store: MemoryVaultStore,
        bank: MemoryBank,
        log: EventLog,
    }

    impl Fixture {
        fn new() -> Self {
            let bank = MemoryBank::in_memory();
            bank.mint(ALICE, "tkn", 1_000).unwrap();
            bank.mint(BOB, "tkn", 1_000).unwrap();
            Self {
                store: MemoryVaultStore::new(),
                bank,
                log: EventLog::new(),
            }
        }

        fn service(&self) -> VaultService<&MemoryVaultStore, &MemoryBank, &EventLog> {
            VaultService::new(&self.store, &self.bank, &self.log)
        }
    }

    fn key(owner: &str) -> VaultKey {
        VaultKey::new(owner, "op1", "tkn")
    }

    #[test]
    fn create_locks_funds() {
        let fx = Fixture::new();
        let vault = fx.service().create_vault(ALICE, "op1", "tkn", 50).unwrap();

        assert_eq!(vault.owner, ALICE);
        assert_eq!(vault.balance, 50);
        assert_eq!(fx.bank.balance(ALICE, "tkn").unwrap(), 950);
        assert_eq!(fx.bank.pool_balance("tkn").unwrap(), 50);
        assert_eq!(fx.log.events()[0].kind, VaultEventKind::Created);
    }

    #[test]
    fn create_twice_is_rejected() {
        let fx = Fixture::new();
        let service = fx.service();
        service.create_vault(ALICE, "op1", "tkn", 50).unwrap();

        let err = service.create_vault(ALICE, "op1", "tkn", 50).unwrap_err();
        assert!(matches!(err, VaultError::AlreadyExists { .. }));
        assert_eq!(err.code(), "already_exists");
        assert_eq!(fx.bank.pool_balance("tkn").unwrap(), 50);
        assert_eq!(fx.log.len(), 1);
    }

    #[test]
    fn create_with_zero_balance_is_rejected() {
        let fx = Fixture::new();
        let err = fx.service().create_vault(ALICE, "op1", "tkn", 0).unwrap_err();
        assert!(matches!(err, VaultError::InvalidAmount { balance: 0 }));
        assert!(fx.store.is_empty());
        assert!(fx.log.is_empty());
    }

    #[test]
    fn create_without_funds_leaves_no_record() {
        let fx = Fixture::new();
        let err = fx
            .service()
            .create_vault(ALICE, "op1", "tkn", 5_000)
            .unwrap_err();
        assert!(matches!(
            err,
            VaultError::InsufficientFunds {
                available: 1_000,
                requested: 5_000,
                ..
            }
        ));
        assert!(fx.store.is_empty());
        assert_eq!(fx.bank.balance(ALICE, "tkn").unwrap(), 1_000);
    }

    #[test]
    fn update_by_other_user_is_unauthorized() {
        let fx = Fixture::new();
        let service = fx.service();
        service.create_vault(ALICE, "op1", "tkn", 50).unwrap();

        let err = service.update_vault(BOB, &key(ALICE), 10).unwrap_err();
        assert_eq!(err.code(), "unauthorized");
        assert_eq!(fx.store.get(&key(ALICE)).unwrap().unwrap().balance, 50);
        assert_eq!(fx.bank.balance(BOB, "tkn").unwrap(), 1_000);
    }

    #[test]
    fn update_missing_vault_is_not_found() {
        let fx = Fixture::new();
        let err = fx.service().update_vault(ALICE, &key(ALICE), 10).unwrap_err();
        assert!(matches!(err, VaultError::NotFound { .. }));
    }

    #[test]
    fn update_to_zero_is_rejected() {
        let fx = Fixture::new();
        let service = fx.service();
        service.create_vault(ALICE, "op1", "tkn", 50).unwrap();
        let err = service.update_vault(ALICE, &key(ALICE), 0).unwrap_err();
        assert!(matches!(err, VaultError::InvalidAmount { .. }));
        assert_eq!(fx.bank.pool_balance("tkn").unwrap(), 50);
    }

    #[test]
    fn update_increase_pulls_difference() {
        let fx = Fixture::new();
        let service = fx.service();
        service.create_vault(ALICE, "op1", "tkn", 50).unwrap();

        let vault = service.update_vault(ALICE, &key(ALICE), 80).unwrap();
        assert_eq!(vault.balance, 80);
        assert_eq!(fx.bank.balance(ALICE, "tkn").unwrap(), 920);
        assert_eq!(fx.bank.pool_balance("tkn").unwrap(), 80);
        assert_eq!(fx.log.events()[1].balance, Some(80));
    }

    #[test]
    fn update_decrease_refunds_difference() {
        let fx = Fixture::new();
        let service = fx.service();
        service.create_vault(ALICE, "op1", "tkn", 50).unwrap();

        service.update_vault(ALICE, &key(ALICE), 20).unwrap();
        assert_eq!(fx.bank.balance(ALICE, "tkn").unwrap(), 980);
        assert_eq!(fx.bank.pool_balance("tkn").unwrap(), 20);
    }

    #[test]
    fn update_to_same_balance_moves_nothing() {
        let fx = Fixture::new();
        let service = fx.service();
        service.create_vault(ALICE, "op1", "tkn", 50).unwrap();

        service.update_vault(ALICE, &key(ALICE), 50).unwrap();
        assert_eq!(fx.bank.pool_balance("tkn").unwrap(), 50);
        assert_eq!(fx.log.len(), 2);
    }

    #[test]
    fn update_increase_beyond_funds_changes_nothing() {
        let fx = Fixture::new();
        let service = fx.service();
        service.create_vault(ALICE, "op1", "tkn", 50).unwrap();

        let err = service.update_vault(ALICE, &key(ALICE), 2_000).unwrap_err();
        assert_eq!(err.code(), "insufficient_funds");
        assert_eq!(fx.store.get(&key(ALICE)).unwrap().unwrap().balance, 50);
        assert_eq!(fx.log.len(), 1);
    }

    #[test]
    fn delete_refunds_everything() {
        let fx = Fixture::new();
        let service = fx.service();
        service.create_vault(ALICE, "op1", "tkn", 80).unwrap();

        let removed = service.delete_vault(ALICE, &key(ALICE)).unwrap();
        assert_eq!(removed.balance, 80);
        assert!(fx.store.is_empty());
        assert_eq!(fx.bank.balance(ALICE, "tkn").unwrap(), 1_000);
        assert_eq!(fx.bank.pool_balance("tkn").unwrap(), 0);

        let last = fx.log.events().pop().unwrap();
        assert_eq!(last.kind, VaultEventKind::Deleted);
        assert_eq!(last.balance, None);
    }

    #[test]
    fn delete_by_other_user_is_unauthorized() {
        let fx = Fixture::new();
        let service = fx.service();
        service.create_vault(ALICE, "op1", "tkn", 80).unwrap();

        let err = service.delete_vault(BOB, &key(ALICE)).unwrap_err();
        assert!(matches!(err, VaultError::Unauthorized { .. }));
        assert_eq!(fx.store.len(), 1);
    }

    #[test]
    #[should_panic(expected = "bank error")]
    fn delete_with_drained_pool_halts() {
        let fx = Fixture::new();
        let service = fx.service();
        service.create_vault(ALICE, "op1", "tkn", 80).unwrap();

        // Corrupt the pool behind the service's back.
        fx.bank
            .balances()
            .set_balance(MODULE_ACCOUNT, "tkn", 0)
            .unwrap();
        let _ = service.delete_vault(ALICE, &key(ALICE));
    }

    #[test]
    #[should_panic(expected = "bank error")]
    fn decrease_with_drained_pool_halts() {
        let fx = Fixture::new();
        let service = fx.service();
        service.create_vault(ALICE, "op1", "tkn", 80).unwrap();

        fx.bank
            .balances()
            .set_balance(MODULE_ACCOUNT, "tkn", 10)
            .unwrap();
        let _ = service.update_vault(ALICE, &key(ALICE), 20);
    }

    #[test]
    fn separate_owners_have_separate_vaults() {
        let fx = Fixture::new();
        let service = fx.service();
        service.create_vault(ALICE, "op1", "tkn", 50).unwrap();
        service.create_vault(BOB, "op1", "tkn", 30).unwrap();

        assert_eq!(fx.store.len(), 2);
        assert_eq!(fx.bank.pool_balance("tkn").unwrap(), 80);
    }

    #[test]
    fn error_codes_are_stable() {
        let overflow = VaultError::from(BankError::Overflow {
            account: MODULE_ACCOUNT.into(),
            denom: "tkn".into(),
            amount: 1,
        });
        assert_eq!(overflow.code(), "ledger_error");
        assert_eq!(
            VaultError::from(StoreError::Conflict).code(),
            "store_error"
        );
        assert_eq!(VaultError::NotFound { key: "k".into() }.code(), "not_found");
    }

    #[test]
    fn pool_account_cannot_open_vault() {
        let fx = Fixture::new();
        fx.bank.mint(MODULE_ACCOUNT, "tkn", 100).unwrap();
        let service = fx.service();

        let err = service
            .create_vault(MODULE_ACCOUNT, "op1", "tkn", 40)
            .unwrap_err();
        assert_eq!(err.code(), "unauthorized");
        assert!(fx.store.is_empty());
        assert_eq!(fx.bank.pool_balance("tkn").unwrap(), 100);
        assert!(fx.log.events().is_empty());
    }

    #[test]
    fn pool_account_cannot_drain_vault_under_its_name() {
        let fx = Fixture::new();
        let service = fx.service();
        service.create_vault(ALICE, "op1", "tkn", 40).unwrap();
        fx.store
            .put(&UserVault::new(key(MODULE_ACCOUNT), 40))
            .unwrap();

        let err = service
            .delete_vault(MODULE_ACCOUNT, &key(MODULE_ACCOUNT))
            .unwrap_err();
        assert_eq!(err.code(), "unauthorized");
        assert_eq!(fx.bank.pool_balance("tkn").unwrap(), 40);
    }
}
