//! # Storage Module
//!
//! Persistence plumbing shared by every store in the workspace: the error
//! type that store capabilities report, the composite key encoding, and the
//! sled-backed database used by the node.
//!
//! ## Architecture
//!
//! ```text
//! mod.rs  - StoreError, composite key encoding
//! db.rs   - TollroadDB: sled trees + atomic transition commits
//! ```
//!
//! ## Composite Keys
//!
//! Vault keys and balance keys are tuples of strings. Each component is
//! written as a 4-byte big-endian length followed by its UTF-8 bytes. No
//! separator character is reserved, so a denomination like `ibc/27A6...`
//! cannot alias another key, and all keys of one owner share a common
//! byte prefix for range scans.

pub mod db;

pub use db::{DbBalances, DbError, DbResult, DbVaults, TollroadDB, TxContext};

/// Errors reported by store capabilities ([`crate::vault::VaultStore`],
/// [`crate::bank::BalanceStore`]).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A stored value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The storage backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A concurrent writer touched the same keys; the enclosing transaction
    /// was abandoned.
    #[error("write conflict: transaction abandoned")]
    Conflict,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Encode a tuple of strings into an unambiguous, prefix-scannable key.
pub fn encode_composite_key(parts: &[&str]) -> Vec<u8> {
    let capacity = parts.iter().map(|p| 4 + p.len()).sum();
    let mut key = Vec::with_capacity(capacity);
    for part in parts {
        key.extend_from_slice(&(part.len() as u32).to_be_bytes());
        key.extend_from_slice(part.as_bytes());
    }
    key
}

/// Decode a key produced by [`encode_composite_key`].
///
/// Returns `None` for truncated input or invalid UTF-8.
pub fn decode_composite_key(mut bytes: &[u8]) -> Option<Vec<String>> {
    let mut parts = Vec::new();
    while !bytes.is_empty() {
        if bytes.len() < 4 {
            return None;
        }
        let (len_bytes, rest) = bytes.split_at(4);
        let len = u32::from_be_bytes(len_bytes.try_into().ok()?) as usize;
        if rest.len() < len {
            return None;
        }
        let (part, rest) = rest.split_at(len);
        parts.push(String::from_utf8(part.to_vec()).ok()?);
        bytes = rest;
    }
    Some(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_key_decodes_back() {
        let key = encode_composite_key(&["cosmos1abc", "op-1", "ibc/27A6"]);
        let parts = decode_composite_key(&key).unwrap();
        assert_eq!(parts, vec!["cosmos1abc", "op-1", "ibc/27A6"]);
    }

    #[test]
    fn separators_inside_components_do_not_alias() {
        let a = encode_composite_key(&["a/b", "c"]);
        let b = encode_composite_key(&["a", "b/c"]);
        assert_ne!(a, b);
    }

    #[test]
    fn owner_prefix_is_a_byte_prefix() {
        let prefix = encode_composite_key(&["alice"]);
        let full = encode_composite_key(&["alice", "op", "tkn"]);
        assert!(full.starts_with(&prefix));

        // "alice" must not be a prefix match for "alicex".
        let other = encode_composite_key(&["alicex", "op", "tkn"]);
        assert!(!other.starts_with(&prefix));
    }

    #[test]
    fn empty_components_are_preserved() {
        let key = encode_composite_key(&["", "x"]);
        assert_eq!(decode_composite_key(&key).unwrap(), vec!["", "x"]);
    }

    #[test]
    fn truncated_key_is_rejected() {
        let key = encode_composite_key(&["alice", "op"]);
        assert!(decode_composite_key(&key[..key.len() - 1]).is_none());
        assert!(decode_composite_key(&[0, 0]).is_none());
    }
}
