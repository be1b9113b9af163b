//! OAuth endpoint configuration for the refresh exchange.

use std::env;

const TOKEN_URL_ENV: &str = "QUOTABAR_OAUTH_TOKEN_URL";
const CLIENT_ID_ENV: &str = "QUOTABAR_OAUTH_CLIENT_ID";

/// Provider endpoint settings for the refresh-token exchange.
///
/// The embedding application supplies both values; [`overridden_from_env`]
/// lets either be swapped at runtime for a staging endpoint.
///
/// [`overridden_from_env`]: OAuthConfig::overridden_from_env
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    /// Token endpoint accepting the `refresh_token` grant.
    pub token_url: String,
    /// OAuth client identifier of this application.
    pub client_id: String,
}

impl OAuthConfig {
    pub fn new(token_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            token_url: token_url.into(),
            client_id: client_id.into(),
        }
    }

    /// Apply `QUOTABAR_OAUTH_TOKEN_URL` / `QUOTABAR_OAUTH_CLIENT_ID`
    /// overrides on top of the configured values.
    pub fn overridden_from_env(mut self) -> Self {
        if let Ok(value) = env::var(TOKEN_URL_ENV) {
            self.token_url = value;
        }
        if let Ok(value) = env::var(CLIENT_ID_ENV) {
            self.client_id = value;
        }
        self
    }
}
