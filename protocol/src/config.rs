//! # Module Configuration & Constants
//!
//! Every fixed name and limit of the toll-road vault module lives here:
//! the module account that holds pooled vault funds, address and
//! denomination rules, event vocabulary, and storage layout.
//!
//! Changing the event names or the tree names breaks every indexer and
//! every existing data directory, so treat them as frozen.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Module Identity
// ---------------------------------------------------------------------------

/// Name of the module. Shows up in logs and as the event source.
pub const MODULE_NAME: &str = "tollroad";

/// The pooled custody account. Every vault's funds sit here until the
/// vault is reduced or deleted.
///
/// Not a bech32 address on purpose: user identities are always bech32, so
/// the pool can never collide with a user account.
pub const MODULE_ACCOUNT: &str = "tollroad";

/// Module version string reported by the node binary.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Addresses & Denominations
// ---------------------------------------------------------------------------

/// Default bech32 human-readable prefix for account addresses.
pub const DEFAULT_ADDRESS_PREFIX: &str = "cosmos";

/// Maximum decoded address payload length in bytes.
pub const MAX_ADDRESS_LENGTH: usize = 255;

/// Shortest accepted token denomination.
pub const MIN_DENOM_LENGTH: usize = 3;

/// Longest accepted token denomination.
pub const MAX_DENOM_LENGTH: usize = 128;

/// Characters allowed after the leading letter of a denomination.
pub const DENOM_EXTRA_CHARS: &[char] = &['/', ':', '.', '_', '-'];

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

pub const EVENT_USER_VAULT_CREATED: &str = "new-user-vault-created";
pub const EVENT_USER_VAULT_UPDATED: &str = "new-user-vault-updated";
pub const EVENT_USER_VAULT_DELETED: &str = "new-user-vault-deleted";

pub const ATTR_OWNER: &str = "owner";
pub const ATTR_ROAD_OPERATOR_INDEX: &str = "road-operator-index";
pub const ATTR_TOKEN: &str = "token";
pub const ATTR_BALANCE: &str = "balance";

// ---------------------------------------------------------------------------
// Storage Layout
// ---------------------------------------------------------------------------

/// sled tree holding `bincode(UserVault)` keyed by the encoded vault key.
pub const TREE_USER_VAULTS: &str = "user_vaults";

/// sled tree holding big-endian `u64` balances keyed by (account, denom).
pub const TREE_BALANCES: &str = "balances";

/// sled tree for bookkeeping (committed sequence, genesis marker).
pub const TREE_METADATA: &str = "metadata";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Page size used when a list query does not ask for one.
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// Hard cap on a single page. Larger requests are clamped.
pub const MAX_PAGE_LIMIT: usize = 1_000;

// ---------------------------------------------------------------------------
// Params
// ---------------------------------------------------------------------------

/// Runtime parameters of the module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Bech32 prefix every account address must carry.
    pub address_prefix: String,
    /// Account that holds pooled vault funds.
    pub module_account: String,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            address_prefix: DEFAULT_ADDRESS_PREFIX.to_string(),
            module_account: MODULE_ACCOUNT.to_string(),
        }
    }
}
