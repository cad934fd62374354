//! Integration tests for the user vault contract.
//!
//! These tests drive `VaultService` through whole lifecycles, both over the
//! in-memory stores and over the sled database, and check the books after
//! every step: every vault positive, the pool equal to the vault total, and
//! a rejected transition leaving no trace.

use std::collections::BTreeMap;

use proptest::prelude::*;
use tollroad_contracts::msgs::{MsgCreateUserVault, MsgDeleteUserVault, MsgUpdateUserVault};
use tollroad_contracts::{VaultError, VaultMsg, VaultService};
use tollroad_protocol::bank::{BalanceStore, CustodyLedger, MemoryBank};
use tollroad_protocol::config::MODULE_ACCOUNT;
use tollroad_protocol::events::{EventLog, VaultEventKind};
use tollroad_protocol::identity::encode_address;
use tollroad_protocol::invariants;
use tollroad_protocol::storage::TollroadDB;
use tollroad_protocol::vault::{MemoryVaultStore, VaultKey, VaultStore};

const USERS: usize = 3;
const OPERATORS: usize = 2;
const STARTING_FUNDS: u64 = 1_000;

fn user(i: usize) -> String {
    encode_address("cosmos", &[i as u8 + 1; 20]).unwrap()
}

fn operator(i: usize) -> String {
    format!("op{i}")
}

/// Memory-backed world with every user funded.
struct World {
    store: MemoryVaultStore,
    bank: MemoryBank,
    log: EventLog,
}

impl World {
    fn new() -> Self {
        let bank = MemoryBank::in_memory();
        for i in 0..USERS {
            bank.mint(&user(i), "tkn", STARTING_FUNDS).unwrap();
        }
        Self {
            store: MemoryVaultStore::new(),
            bank,
            log: EventLog::new(),
        }
    }

    fn service(&self) -> VaultService<&MemoryVaultStore, &MemoryBank, &EventLog> {
        VaultService::new(&self.store, &self.bank, &self.log)
    }

    fn pools(&self) -> BTreeMap<String, u64> {
        self.bank
            .balances()
            .entries()
            .into_iter()
            .filter(|(account, _, _)| account == MODULE_ACCOUNT)
            .map(|(_, denom, amount)| (denom, amount))
            .collect()
    }

    fn snapshot(&self) -> (Vec<tollroad_protocol::vault::UserVault>, Vec<(String, String, u64)>) {
        (self.store.vaults(), self.bank.balances().entries())
    }

    fn total_supply(&self) -> u128 {
        self.bank
            .balances()
            .entries()
            .iter()
            .map(|(_, _, amount)| u128::from(*amount))
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn full_lifecycle_scenarios() {
    let world = World::new();
    let service = world.service();
    let (alice, bob) = (user(0), user(1));
    let key = VaultKey::new(alice.as_str(), "op1", "tkn");

    // 1. Create on an empty store.
    let vault = service.create_vault(&alice, "op1", "tkn", 50).unwrap();
    assert_eq!(vault.balance, 50);
    assert_eq!(world.bank.pool_balance("tkn").unwrap(), 50);

    // 2. Same key again.
    let err = service.create_vault(&alice, "op1", "tkn", 50).unwrap_err();
    assert!(matches!(err, VaultError::AlreadyExists { .. }));
    assert_eq!(world.bank.pool_balance("tkn").unwrap(), 50);

    // 3. Zero balance.
    let err = service.create_vault(&alice, "op2", "tkn", 0).unwrap_err();
    assert!(matches!(err, VaultError::InvalidAmount { .. }));

    // 4. Bob targets alice's vault.
    let err = service.update_vault(&bob, &key, 10).unwrap_err();
    assert!(matches!(err, VaultError::Unauthorized { .. }));
    assert_eq!(world.bank.balance(&bob, "tkn").unwrap(), STARTING_FUNDS);

    // 5. Increase.
    let vault = service.update_vault(&alice, &key, 80).unwrap();
    assert_eq!(vault.balance, 80);
    assert_eq!(world.bank.pool_balance("tkn").unwrap(), 80);

    // 6. Delete.
    service.delete_vault(&alice, &key).unwrap();
    assert!(world.store.get(&key).unwrap().is_none());
    assert_eq!(world.bank.balance(&alice, "tkn").unwrap(), STARTING_FUNDS);
    assert_eq!(world.bank.pool_balance("tkn").unwrap(), 0);

    let kinds: Vec<_> = world.log.events().into_iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            VaultEventKind::Created,
            VaultEventKind::Updated,
            VaultEventKind::Deleted
        ]
    );
}

#[test]
fn execute_dispatches_messages() {
    let world = World::new();
    let service = world.service();
    let (alice, bob) = (user(0), user(1));

    let create: VaultMsg = MsgCreateUserVault {
        road_operator_index: "op1".into(),
        token: "tkn".into(),
        balance: 40,
    }
    .into();
    create.validate_basic(&alice, "cosmos").unwrap();
    service.execute(&alice, &create).unwrap();

    let hijack: VaultMsg = MsgUpdateUserVault {
        owner: Some(alice.clone()),
        road_operator_index: "op1".into(),
        token: "tkn".into(),
        balance: 1,
    }
    .into();
    hijack.validate_basic(&bob, "cosmos").unwrap();
    let err = service.execute(&bob, &hijack).unwrap_err();
    assert_eq!(err.code(), "unauthorized");

    let delete: VaultMsg = MsgDeleteUserVault {
        owner: None,
        road_operator_index: "op1".into(),
        token: "tkn".into(),
    }
    .into();
    let removed = service.execute(&alice, &delete).unwrap();
    assert_eq!(removed.balance, 40);
    assert!(world.store.is_empty());
}

#[test]
fn sled_backed_transitions_commit_atomically() {
    let db = TollroadDB::open_temporary().unwrap();
    let alice = user(0);
    db.transact(|ctx| ctx.bank().mint(&alice, "tkn", 100))
        .unwrap()
        .unwrap();

    let created = db
        .transact(|ctx| {
            let log = EventLog::new();
            let service = VaultService::new(ctx.vaults(), ctx.bank(), &log);
            service
                .create_vault(&alice, "op1", "tkn", 60)
                .map(|vault| (vault, log.drain()))
        })
        .unwrap()
        .unwrap();
    assert_eq!(created.0.balance, 60);
    assert_eq!(created.1.len(), 1);

    // Rejected increase: nothing from inside the transaction survives.
    let rejected = db
        .transact(|ctx| {
            let service = VaultService::new(ctx.vaults(), ctx.bank(), EventLog::new());
            service.update_vault(&alice, &VaultKey::new(alice.as_str(), "op1", "tkn"), 500)
        })
        .unwrap();
    assert!(matches!(rejected, Err(VaultError::InsufficientFunds { .. })));

    let key = VaultKey::new(alice.as_str(), "op1", "tkn");
    assert_eq!(db.get_vault(&key).unwrap().unwrap().balance, 60);
    assert_eq!(db.balance(&alice, "tkn").unwrap(), 40);
    invariants::check_all(&db.list_vaults().unwrap(), &db.pool_balances().unwrap()).unwrap();
}

#[test]
fn sled_fatal_payout_commits_nothing() {
    let db = TollroadDB::open_temporary().unwrap();
    let alice = user(0);
    db.transact(|ctx| ctx.bank().mint(&alice, "tkn", 100))
        .unwrap()
        .unwrap();
    db.transact(|ctx| {
        VaultService::new(ctx.vaults(), ctx.bank(), EventLog::new())
            .create_vault(&alice, "op1", "tkn", 60)
    })
    .unwrap()
    .unwrap();

    // Drain the pool so the payout cannot be covered.
    db.transact(|ctx| ctx.bank().balances().set_balance(MODULE_ACCOUNT, "tkn", 0))
        .unwrap()
        .unwrap();

    let key = VaultKey::new(alice.as_str(), "op1", "tkn");
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = db.transact(|ctx| {
            VaultService::new(ctx.vaults(), ctx.bank(), EventLog::new()).delete_vault(&alice, &key)
        });
    }));
    assert!(outcome.is_err());
    assert!(db.get_vault(&key).unwrap().is_some());
    assert_eq!(db.balance(&alice, "tkn").unwrap(), 40);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Op {
    Create {
        caller: usize,
        op: usize,
        amount: u64,
    },
    Update {
        caller: usize,
        owner: usize,
        op: usize,
        amount: u64,
    },
    Delete {
        caller: usize,
        owner: usize,
        op: usize,
    },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..USERS, 0..OPERATORS, 0u64..400)
            .prop_map(|(caller, op, amount)| Op::Create { caller, op, amount }),
        (0..USERS, 0..USERS, 0..OPERATORS, 0u64..400).prop_map(|(caller, owner, op, amount)| {
            Op::Update {
                caller,
                owner,
                op,
                amount,
            }
        }),
        (0..USERS, 0..USERS, 0..OPERATORS)
            .prop_map(|(caller, owner, op)| Op::Delete { caller, owner, op }),
    ]
}

fn apply(world: &World, op: &Op) -> Result<(), VaultError> {
    let service = world.service();
    match op {
        Op::Create { caller, op, amount } => service
            .create_vault(&user(*caller), &operator(*op), "tkn", *amount)
            .map(|_| ()),
        Op::Update {
            caller,
            owner,
            op,
            amount,
        } => {
            let key = VaultKey::new(user(*owner), operator(*op), "tkn");
            service.update_vault(&user(*caller), &key, *amount).map(|_| ())
        }
        Op::Delete { caller, owner, op } => {
            let key = VaultKey::new(user(*owner), operator(*op), "tkn");
            service.delete_vault(&user(*caller), &key).map(|_| ())
        }
    }
}

proptest! {
    /// Any sequence of commands keeps every vault positive and the pool
    /// equal to the vault total; rejected commands change nothing; funds
    /// are never created or destroyed.
    #[test]
    fn random_command_sequences_keep_books_balanced(
        ops in prop::collection::vec(op_strategy(), 1..40)
    ) {
        let world = World::new();
        let supply = world.total_supply();
        let mut committed = 0usize;

        for op in &ops {
            let before = world.snapshot();
            match apply(&world, op) {
                Ok(()) => committed += 1,
                Err(_) => {
                    prop_assert_eq!(world.snapshot(), before);
                }
            }

            let vaults = world.store.vaults();
            prop_assert!(invariants::check_all(&vaults, &world.pools()).is_ok());
            prop_assert_eq!(world.total_supply(), supply);
        }

        prop_assert_eq!(world.log.len(), committed);
    }

    /// Only the owner can touch a vault.
    #[test]
    fn non_owner_is_always_rejected(amount in 1u64..500, intruder in 1..USERS) {
        let world = World::new();
        let service = world.service();
        let owner = user(0);
        service.create_vault(&owner, "op1", "tkn", 10).unwrap();
        let key = VaultKey::new(owner.as_str(), "op1", "tkn");

        let update = service.update_vault(&user(intruder), &key, amount);
        let is_unauthorized = matches!(update, Err(VaultError::Unauthorized { .. }));
        prop_assert!(is_unauthorized);
        let delete = service.delete_vault(&user(intruder), &key);
        let is_unauthorized = matches!(delete, Err(VaultError::Unauthorized { .. }));
        prop_assert!(is_unauthorized);
        prop_assert_eq!(world.store.get(&key).unwrap().map(|v| v.balance), Some(10));
    }

    /// Create followed by delete restores the owner's external balance.
    #[test]
    fn create_then_delete_restores_funds(amount in 1u64..=STARTING_FUNDS) {
        let world = World::new();
        let service = world.service();
        let owner = user(0);

        service.create_vault(&owner, "op1", "tkn", amount).unwrap();
        service
            .delete_vault(&owner, &VaultKey::new(owner.as_str(), "op1", "tkn"))
            .unwrap();

        prop_assert_eq!(world.bank.balance(&owner, "tkn").unwrap(), STARTING_FUNDS);
        prop_assert_eq!(world.bank.pool_balance("tkn").unwrap(), 0);
    }
}
