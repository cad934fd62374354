// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Toll-Road Vaults - Protocol Library
//!
//! Everything a user vault needs except the state machine itself: the
//! record and its key, the keyed store it lives in, the custody ledger that
//! holds the pooled funds, the event vocabulary, genesis import/export, and
//! the invariant checks that prove the books balance.
//!
//! ## Architecture
//!
//! - **config** - Module constants and parameters.
//! - **identity** - Bech32 account address validation.
//! - **vault** - `UserVault`, `VaultKey`, and the `VaultStore` capability.
//! - **bank** - The `CustodyLedger` capability over a balance store.
//! - **events** - Facts emitted after each successful transition.
//! - **genesis** - Initial state import, export and validation.
//! - **invariants** - Positive-balance and conservation checks.
//! - **storage** - Store errors, composite keys, and the sled database.
//!
//! The state machine that ties these together lives in the
//! `tollroad-contracts` crate; it only ever sees the traits defined here,
//! so it runs unchanged over the in-memory fakes and over sled.

pub mod bank;
pub mod config;
pub mod events;
pub mod genesis;
pub mod identity;
pub mod invariants;
pub mod storage;
pub mod vault;
