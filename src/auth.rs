//! API key extraction from `Authorization`-style values.
//!
//! The accepted form is exactly `APIKey <key>`: two parts separated by a
//! single space, the first being the literal scheme name.
use thiserror::Error;

/// Scheme name expected before the key.
pub const API_KEY_SCHEME: &str = "APIKey";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("no authentication info found")]
    Missing,
    #[error("malformed auth header")]
    Malformed,
}

/// Extract the API key from an authorization value.
///
/// # Errors
///
/// - [`AuthError::Missing`] for an empty value
/// - [`AuthError::Malformed`] when the value is not `APIKey <key>`
pub fn api_key_from_header(value: &str) -> Result<&str, AuthError> {
    if value.is_empty() {
        return Err(AuthError::Missing);
    }

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(API_KEY_SCHEME), Some(key), None) if !key.is_empty() => Ok(key),
        _ => Err(AuthError::Malformed),
    }
}
