//! Token denomination rules.
//!
//! A denomination is 3 to 128 characters: an ASCII letter followed by ASCII
//! alphanumerics or any of `/ : . _ -`. That admits `stake`, `uatom` and
//! `ibc/27394FB0...` while keeping whitespace and control characters out of
//! keys and event attributes.

use thiserror::Error;

use crate::config::{DENOM_EXTRA_CHARS, MAX_DENOM_LENGTH, MIN_DENOM_LENGTH};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DenomError {
    #[error("invalid denom length {len}: must be between {min} and {max}")]
    InvalidLength { len: usize, min: usize, max: usize },

    #[error("invalid denom {0:?}: must start with an ASCII letter")]
    InvalidStart(String),

    #[error("invalid denom {denom:?}: unexpected character {ch:?}")]
    InvalidChar { denom: String, ch: char },
}

/// Check that `denom` is a well-formed token denomination.
pub fn validate_denom(denom: &str) -> Result<(), DenomError> {
    let len = denom.chars().count();
    if !(MIN_DENOM_LENGTH..=MAX_DENOM_LENGTH).contains(&len) {
        return Err(DenomError::InvalidLength {
            len,
            min: MIN_DENOM_LENGTH,
            max: MAX_DENOM_LENGTH,
        });
    }

    let mut chars = denom.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return Err(DenomError::InvalidStart(denom.to_string())),
    }

    if let Some(ch) = chars.find(|c| !c.is_ascii_alphanumeric() && !DENOM_EXTRA_CHARS.contains(c)) {
        return Err(DenomError::InvalidChar {
            denom: denom.to_string(),
            ch,
        });
    }

    Ok(())
}
