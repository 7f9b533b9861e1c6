//! # Terminal Error Types
//!
//! Typed error handling for charge-desk-rs.
//! All terminal operations return `Result<T, DeskError>`.

use thiserror::Error;

/// Core error type for all terminal operations
#[derive(Debug, Error)]
pub enum DeskError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Profile not found in the store
    #[error("Profile not found: {profile_id}")]
    ProfileNotFound { profile_id: String },

    /// Refused to delete the only remaining profile
    #[error("Cannot delete the last remaining profile")]
    LastProfile,

    /// Charge exceeds the profile's configured ceiling
    #[error("Amount {amount} exceeds the profile limit of {limit}")]
    AmountLimitExceeded { amount: i64, limit: i64 },

    /// Currency not supported
    #[error("Unsupported currency: {currency}")]
    UnsupportedCurrency { currency: String },

    /// Missing or invalid session credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Payment processor API error
    #[error("Square error [{code}]: {detail}")]
    ProviderError { code: String, detail: String },

    /// Network/HTTP error communicating with the processor
    #[error("Network error: {0}")]
    NetworkError(String),

    /// OAuth authorization-code exchange failed
    #[error("OAuth exchange failed: {0}")]
    OAuthExchangeFailed(String),

    /// OAuth callback state did not match a pending authorization
    #[error("OAuth state mismatch or expired")]
    OAuthStateMismatch,

    /// Store persistence side-channel failed
    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DeskError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DeskError::NetworkError(_)
                | DeskError::ProviderError { .. }
                | DeskError::PersistenceFailed(_)
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            DeskError::Configuration(_) => 500,
            DeskError::InvalidRequest(_) => 400,
            DeskError::ProfileNotFound { .. } => 404,
            DeskError::LastProfile => 409,
            DeskError::AmountLimitExceeded { .. } => 400,
            DeskError::UnsupportedCurrency { .. } => 400,
            DeskError::Unauthorized(_) => 401,
            DeskError::ProviderError { .. } => 502,
            DeskError::NetworkError(_) => 503,
            DeskError::OAuthExchangeFailed(_) => 502,
            DeskError::OAuthStateMismatch => 403,
            DeskError::PersistenceFailed(_) => 500,
            DeskError::Internal(_) => 500,
            DeskError::Serialization(_) => 500,
        }
    }
}

/// Result type alias for terminal operations
pub type DeskResult<T> = Result<T, DeskError>;
