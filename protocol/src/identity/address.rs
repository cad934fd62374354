//! Bech32 account address encoding and validation.

use bech32::{Bech32, Hrp};
use thiserror::Error;

use crate::config::MAX_ADDRESS_LENGTH;

/// Errors that can occur while validating an account address.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The address string is empty.
    #[error("empty address string is not allowed")]
    Empty,

    /// The string is not valid bech32.
    #[error("bech32 decode error: {0}")]
    Bech32Decode(String),

    /// The address is valid bech32 but not in lowercase canonical form.
    #[error("address {0} is not in canonical lowercase form")]
    NotCanonical(String),

    /// The human-readable prefix does not match the configured one.
    #[error("invalid address prefix: expected '{expected}', got '{got}'")]
    InvalidPrefix {
        /// Prefix required by the module parameters.
        expected: String,
        /// Prefix actually found.
        got: String,
    },

    /// The decoded payload is empty or too long.
    #[error("invalid address data length {0}: must be between 1 and 255 bytes")]
    InvalidDataLength(usize),

    /// The requested prefix is not a valid bech32 human-readable part.
    #[error("invalid bech32 prefix '{0}'")]
    InvalidHrp(String),
}

/// Check that `address` is a canonical bech32 account address carrying
/// `prefix`.
pub fn validate_address(address: &str, prefix: &str) -> Result<(), AddressError> {
    if address.is_empty() {
        return Err(AddressError::Empty);
    }

    let (hrp, data) =
        bech32::decode(address).map_err(|e| AddressError::Bech32Decode(e.to_string()))?;

    if address.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(AddressError::NotCanonical(address.to_string()));
    }

    if hrp.as_str() != prefix {
        return Err(AddressError::InvalidPrefix {
            expected: prefix.to_string(),
            got: hrp.to_string(),
        });
    }

    if data.is_empty() || data.len() > MAX_ADDRESS_LENGTH {
        return Err(AddressError::InvalidDataLength(data.len()));
    }

    Ok(())
}

/// Encode raw account bytes as a bech32 address with `prefix`.
pub fn encode_address(prefix: &str, bytes: &[u8]) -> Result<String, AddressError> {
    if bytes.is_empty() || bytes.len() > MAX_ADDRESS_LENGTH {
        return Err(AddressError::InvalidDataLength(bytes.len()));
    }
    let hrp = Hrp::parse(prefix).map_err(|_| AddressError::InvalidHrp(prefix.to_string()))?;
    bech32::encode::<Bech32>(hrp, bytes).map_err(|e| AddressError::Bech32Decode(e.to_string()))
}
