//! Read-only queries over vaults and balances.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tollroad_protocol::config::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use tollroad_protocol::storage::StoreError;
use tollroad_protocol::vault::{UserVault, VaultKey, VaultStore};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("user vault {key} not found")]
    NotFound { key: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueryError {
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::NotFound { .. } => "not_found",
            QueryError::Store(_) => "store_error",
        }
    }
}

/// Offset pagination. A missing or zero limit means the default page size;
/// anything above the maximum is clamped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    #[serde(default)]
    pub offset: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl PageRequest {
    pub fn new(offset: usize, limit: Option<usize>) -> Self {
        Self { offset, limit }
    }

    pub fn effective_limit(&self) -> usize {
        match self.limit {
            None | Some(0) => DEFAULT_PAGE_LIMIT,
            Some(limit) => limit.min(MAX_PAGE_LIMIT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    /// Number of items across all pages.
    pub total: u64,
    /// Offset of the next page; absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryGetUserVaultResponse {
    pub user_vault: UserVault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryAllUserVaultResponse {
    pub user_vault: Vec<UserVault>,
    pub pagination: PageResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryBalanceResponse {
    pub address: String,
    pub balances: Vec<Coin>,
}

impl QueryBalanceResponse {
    /// Build from `(denom, amount)` pairs, sorted by denomination.
    pub fn new(address: impl Into<String>, entries: Vec<(String, u64)>) -> Self {
        let mut balances: Vec<Coin> = entries
            .into_iter()
            .map(|(denom, amount)| Coin { denom, amount })
            .collect();
        balances.sort_by(|a, b| a.denom.cmp(&b.denom));
        Self {
            address: address.into(),
            balances,
        }
    }
}

/// Look up one vault by its full key.
pub fn show_user_vault<S: VaultStore>(
    store: &S,
    key: &VaultKey,
) -> Result<QueryGetUserVaultResponse, QueryError> {
    store
        .get(key)?
        .map(|user_vault| QueryGetUserVaultResponse { user_vault })
        .ok_or_else(|| QueryError::NotFound {
            key: key.to_string(),
        })
}

/// One page of `vaults` in key order.
pub fn list_user_vaults(mut vaults: Vec<UserVault>, page: &PageRequest) -> QueryAllUserVaultResponse {
    vaults.sort_by_key(|v| v.key());

    let total = vaults.len();
    let limit = page.effective_limit();
    let start = page.offset.min(total);
    let end = start.saturating_add(limit).min(total);

    let user_vault: Vec<UserVault> = vaults.drain(start..end).collect();
    let next_offset = (end < total).then_some(end as u64);

    QueryAllUserVaultResponse {
        user_vault,
        pagination: PageResponse {
            total: total as u64,
            next_offset,
        },
    }
}
