//! Command messages and their stateless validation.
//!
//! A message names the vault by road operator and token. The owner part of
//! the key defaults to the sender; update and delete may name it
//! explicitly, which only ever succeeds when it equals the sender.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tollroad_protocol::bank::{validate_denom, DenomError};
use tollroad_protocol::identity::{validate_address, AddressError};
use tollroad_protocol::vault::VaultKey;

/// Stateless message checks that failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MsgError {
    #[error("invalid creator address: {0}")]
    InvalidCreator(AddressError),

    #[error("invalid owner address: {0}")]
    InvalidOwner(AddressError),

    #[error("road operator index must not be empty")]
    EmptyRoadOperatorIndex,

    #[error("invalid token: {0}")]
    InvalidToken(DenomError),
}

impl MsgError {
    pub fn code(&self) -> &'static str {
        match self {
            MsgError::InvalidCreator(_) => "invalid_creator",
            MsgError::InvalidOwner(_) => "invalid_owner",
            MsgError::EmptyRoadOperatorIndex => "empty_road_operator_index",
            MsgError::InvalidToken(_) => "invalid_token",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgCreateUserVault {
    pub road_operator_index: String,
    pub token: String,
    pub balance: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgUpdateUserVault {
    /// Owner of the targeted vault; the sender when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub road_operator_index: String,
    pub token: String,
    pub balance: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgDeleteUserVault {
    /// Owner of the targeted vault; the sender when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub road_operator_index: String,
    pub token: String,
}

/// Any command the vault module accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VaultMsg {
    CreateUserVault(MsgCreateUserVault),
    UpdateUserVault(MsgUpdateUserVault),
    DeleteUserVault(MsgDeleteUserVault),
}

impl VaultMsg {
    /// Message type name, as used in logs and the tx hash preimage.
    pub fn msg_type(&self) -> &'static str {
        match self {
            VaultMsg::CreateUserVault(_) => "create_user_vault",
            VaultMsg::UpdateUserVault(_) => "update_user_vault",
            VaultMsg::DeleteUserVault(_) => "delete_user_vault",
        }
    }

    pub fn road_operator_index(&self) -> &str {
        match self {
            VaultMsg::CreateUserVault(m) => &m.road_operator_index,
            VaultMsg::UpdateUserVault(m) => &m.road_operator_index,
            VaultMsg::DeleteUserVault(m) => &m.road_operator_index,
        }
    }

    pub fn token(&self) -> &str {
        match self {
            VaultMsg::CreateUserVault(m) => &m.token,
            VaultMsg::UpdateUserVault(m) => &m.token,
            VaultMsg::DeleteUserVault(m) => &m.token,
        }
    }

    /// Explicitly named owner, if any. Create never names one.
    pub fn owner(&self) -> Option<&str> {
        match self {
            VaultMsg::CreateUserVault(_) => None,
            VaultMsg::UpdateUserVault(m) => m.owner.as_deref(),
            VaultMsg::DeleteUserVault(m) => m.owner.as_deref(),
        }
    }

    /// The vault this message targets when sent by `caller`.
    pub fn key(&self, caller: &str) -> VaultKey {
        VaultKey::new(
            self.owner().unwrap_or(caller),
            self.road_operator_index(),
            self.token(),
        )
    }

    /// Checks that need no state: well-formed addresses, a non-empty
    /// operator index and a valid denomination.
    ///
    /// A zero balance passes here; the state machine rejects it.
    pub fn validate_basic(&self, caller: &str, address_prefix: &str) -> Result<(), MsgError> {
        validate_address(caller, address_prefix).map_err(MsgError::InvalidCreator)?;

        if let Some(owner) = self.owner() {
            validate_address(owner, address_prefix).map_err(MsgError::InvalidOwner)?;
        }

        if self.road_operator_index().is_empty() {
            return Err(MsgError::EmptyRoadOperatorIndex);
        }

        validate_denom(self.token()).map_err(MsgError::InvalidToken)
    }
}

impl From<MsgCreateUserVault> for VaultMsg {
    fn from(msg: MsgCreateUserVault) -> Self {
        VaultMsg::CreateUserVault(msg)
    }
}

impl From<MsgUpdateUserVault> for VaultMsg {
    fn from(msg: MsgUpdateUserVault) -> Self {
        VaultMsg::UpdateUserVault(msg)
    }
}

impl From<MsgDeleteUserVault> for VaultMsg {
    fn from(msg: MsgDeleteUserVault) -> Self {
        VaultMsg::DeleteUserVault(msg)
    }
}
