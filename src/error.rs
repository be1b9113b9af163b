//! Caller-facing error taxonomy for the credential lifecycle.

use std::fmt;

use thiserror::Error;

/// Transport-level failure detail carried by [`CredentialError::RefreshFailed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    /// The token endpoint answered with a non-success status outside the
    /// invalid-grant class.
    Status(u16),
    /// The exchange never completed.
    Network(String),
}

impl fmt::Display for RefreshFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "status {status}"),
            Self::Network(message) => write!(f, "network error: {message}"),
        }
    }
}

/// Errors surfaced by [`RefreshCoordinator`](crate::RefreshCoordinator).
///
/// `Clone` because concurrent callers join a single in-flight refresh and
/// each receives its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// Nothing is stored; interactive re-authentication is required upstream.
    #[error("no stored credentials")]
    NoCredentials,
    /// The provider rejected the refresh grant; re-authentication required.
    #[error("refresh token expired or revoked")]
    RefreshTokenExpired,
    /// Transient transport or server failure. Retryable on the caller's own
    /// cadence; never retried internally.
    #[error("token refresh failed: {0}")]
    RefreshFailed(RefreshFailure),
    /// Durable persistence failed after a successful exchange. The rotated
    /// credential is retained in memory and persistence is retried on the
    /// next call, so the rotation is not lost.
    #[error("failed to persist refreshed credential: {0}")]
    StoreWriteFailed(String),
}

impl CredentialError {
    /// Whether the user must re-authenticate interactively. Lets the UI
    /// route to a login flow instead of a generic error banner.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::NoCredentials | Self::RefreshTokenExpired)
    }
}
