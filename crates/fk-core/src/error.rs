//! Crate error type.

use crate::store::StoreError;

/// Errors surfaced by user actions and configuration loading.
///
/// Reads never produce these: a failed or malformed read falls back to the
/// documented default. Only writes that could not be persisted, invalid
/// configuration and unusable exemption lengths reach the caller.
#[derive(Debug, thiserror::Error)]
pub enum FokusError {
    #[error("Failed to persist state: {0}")]
    Storage(#[from] StoreError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Invalid exemption duration: {0}")]
    InvalidDuration(String),
}
