//! The user vault record and its identity key.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::storage::encode_composite_key;

// ---------------------------------------------------------------------------
// VaultKey
// ---------------------------------------------------------------------------

/// Identity of a vault: `(owner, road_operator_index, token)`.
///
/// Ordering is lexicographic over the three fields, which is also the order
/// list queries return vaults in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultKey {
    /// Account that funded the vault.
    pub owner: String,
    /// Opaque identifier of the road operator the vault is scoped to.
    pub road_operator_index: String,
    /// Token denomination held in the vault.
    pub token: String,
}

impl VaultKey {
    pub fn new(
        owner: impl Into<String>,
        road_operator_index: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            road_operator_index: road_operator_index.into(),
            token: token.into(),
        }
    }

    /// Byte encoding used by persistent stores.
    pub fn to_bytes(&self) -> Vec<u8> {
        encode_composite_key(&[&self.owner, &self.road_operator_index, &self.token])
    }

    /// Byte prefix shared by every key owned by `owner`.
    pub fn owner_prefix(owner: &str) -> Vec<u8> {
        encode_composite_key(&[owner])
    }
}

impl fmt::Display for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.owner, self.road_operator_index, self.token)
    }
}

// ---------------------------------------------------------------------------
// UserVault
// ---------------------------------------------------------------------------

/// An escrowed balance of `token`, owned by `owner`, scoped to a road
/// operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserVault {
    /// Account that funded the vault. Immutable.
    pub owner: String,
    /// Road operator the vault is scoped to. Immutable.
    pub road_operator_index: String,
    /// Token denomination. Immutable.
    pub token: String,
    /// Amount of `token` currently escrowed, in smallest units.
    pub balance: u64,
}

impl UserVault {
    pub fn new(key: VaultKey, balance: u64) -> Self {
        Self {
            owner: key.owner,
            road_operator_index: key.road_operator_index,
            token: key.token,
            balance,
        }
    }

    /// The identity key this record is stored under.
    pub fn key(&self) -> VaultKey {
        VaultKey::new(
            self.owner.clone(),
            self.road_operator_index.clone(),
            self.token.clone(),
        )
    }

    /// Same vault with a different balance. Key fields are carried over.
    pub fn with_balance(&self, balance: u64) -> Self {
        Self {
            balance,
            ..self.clone()
        }
    }
}
