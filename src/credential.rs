use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Proactive refresh window: a refresh started this many minutes before
/// expiry has time to complete before the usage API starts rejecting the
/// access token.
const REFRESH_WINDOW_MINUTES: i64 = 5;

/// The canonical OAuth credential record for the authenticated identity.
///
/// `scopes`, `subscription_type` and `rate_limit_tier` are immutable across
/// refreshes; only the token pair and expiry change, always together and
/// never partially.
///
/// # Example
/// ```
/// use chrono::{Duration, Utc};
/// use quotabar::Credential;
///
/// let credential = Credential {
///     access_token: "at".to_string(),
///     refresh_token: "rt".to_string(),
///     expires_at: Utc::now() + Duration::hours(8),
///     scopes: vec!["usage:read".to_string()],
///     subscription_type: None,
///     rate_limit_tier: None,
/// };
/// assert!(!credential.should_refresh(Utc::now()));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute UTC expiry of `access_token`. Stored absolute rather than as
    /// a duration so it cannot drift relative to whichever clock computed it.
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit_tier: Option<String>,
}

impl Credential {
    /// Whether the access token is already past its expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether a refresh should be started now rather than waiting for the
    /// token to actually expire.
    pub fn should_refresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::minutes(REFRESH_WINDOW_MINUTES) >= self.expires_at
    }

    /// Whether this record can mint a new access token on demand. An expired
    /// access token with a usable refresh token still counts.
    pub fn is_refreshable(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// Build the successor credential from a refresh exchange.
    ///
    /// `now` is the moment the result is applied, not the moment the HTTP
    /// response arrived, so request latency does not accumulate into the
    /// expiry across repeated refreshes.
    pub fn apply_refresh(&self, result: &RefreshResult, now: DateTime<Utc>) -> Credential {
        Credential {
            access_token: result.access_token.clone(),
            refresh_token: result.refresh_token.clone(),
            expires_at: now + Duration::seconds(result.expires_in),
            scopes: self.scopes.clone(),
            subscription_type: self.subscription_type.clone(),
            rate_limit_tier: self.rate_limit_tier.clone(),
        }
    }
}

// Tokens are capabilities; keep them out of logs even via `{:?}`.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .field("subscription_type", &self.subscription_type)
            .field("rate_limit_tier", &self.rate_limit_tier)
            .finish()
    }
}

/// Output of a successful refresh-token exchange, as answered by the token
/// endpoint: a fresh token pair and a relative lifetime in seconds.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshResult {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

impl fmt::Debug for RefreshResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshResult")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}
