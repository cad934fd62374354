//! # Toll-Road Vault Contracts
//!
//! The escrow logic of the toll-road module. A user locks funds into a
//! vault scoped to one road operator and one token; the funds sit in the
//! pooled module account until the user reduces or deletes the vault.
//!
//! - **User Vault** - the `VaultService` state machine: create, update and
//!   delete transitions with authorization and custody bookkeeping.
//! - **Messages** - the command messages users submit, plus the stateless
//!   checks every message passes before it reaches the state machine.
//! - **Queries** - read-only lookups and paginated listings.
//!
//! ## Design Principles
//!
//! 1. Funds move first, the record changes second. A record is never
//!    written unless the matching transfer succeeded.
//! 2. All monetary arithmetic is checked. The ledger refuses to overflow,
//!    and the service never computes a delta that could.
//! 3. Persistence, custody and event delivery are capabilities passed in
//!    by the caller, so the same transitions run over in-memory fakes in
//!    tests and over sled in the node.

pub mod msgs;
pub mod query;
pub mod user_vault;

pub use msgs::{MsgCreateUserVault, MsgDeleteUserVault, MsgError, MsgUpdateUserVault, VaultMsg};
pub use query::{PageRequest, PageResponse, QueryError};
pub use user_vault::{VaultError, VaultService};
