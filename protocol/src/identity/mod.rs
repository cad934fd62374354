//! # Identity Module
//!
//! Account identities are bech32 addresses (`cosmos1...` by default). The
//! vault module never authenticates anyone itself: the delivering
//! environment establishes who the caller is and hands over the address.
//! What this module does is make sure an address is well-formed and
//! canonical before it becomes part of a vault key, so that one account
//! cannot appear under two spellings.
//!
//! - Bech32 (not Bech32m) for encoding, matching the account address
//!   format of the chain the vaults live on. Decoding accepts either
//!   checksum.
//! - Canonical form is lowercase. Bech32 itself is case-insensitive, but
//!   vault keys compare bytes.

pub mod address;

pub use address::{encode_address, validate_address, AddressError};
