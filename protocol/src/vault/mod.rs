//! # Vault Module - User Vault Records & Their Store
//!
//! A user vault is an escrowed balance of one token, owned by one account
//! and scoped to one road operator. The vault record says how much is
//! escrowed; the funds themselves sit in the module account of the
//! custody ledger (see [`crate::bank`]).
//!
//! ## Architecture
//!
//! ```text
//! user_vault.rs - UserVault record and its (owner, operator, token) key
//! store.rs      - VaultStore capability + in-memory implementation
//! ```
//!
//! ## Invariants
//!
//! 1. **One record per key.** The store is keyed by [`VaultKey`]; a second
//!    `put` under the same key overwrites.
//! 2. **No empty vaults.** A stored vault always has `balance > 0`. The
//!    store does not enforce this, the state machine does.
//! 3. **Owner is part of the key.** Ownership can never change in place.

pub mod store;
pub mod user_vault;

pub use store::{MemoryVaultStore, VaultStore};
pub use user_vault::{UserVault, VaultKey};
