//! Network refresh-token exchange against the provider's token endpoint.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::config::OAuthConfig;
use crate::credential::RefreshResult;

/// Failure classes of the refresh exchange. The coordinator maps these onto
/// the caller-facing taxonomy.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The provider rejected the refresh grant itself; the refresh token is
    /// spent or revoked.
    #[error("refresh grant rejected (status {status})")]
    InvalidGrant { status: u16 },
    /// Any other non-success answer.
    #[error("token endpoint answered with status {0}")]
    Status(u16),
    /// The exchange never completed.
    #[error("network: {0}")]
    Network(String),
    /// A success status with an undecodable body.
    #[error("token endpoint answered with an invalid body: {0}")]
    InvalidBody(String),
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
}

/// POSTs the `refresh_token` grant to the token endpoint.
pub struct RefreshTransport {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
}

impl RefreshTransport {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            token_url: config.token_url,
            client_id: config.client_id,
        }
    }

    /// Exchange `refresh_token` for a fresh token pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshResult, TransportError> {
        let response = self
            .client
            .post(&self.token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST
            || status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
        {
            return Err(TransportError::InvalidGrant {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let payload: RefreshResponse = response
            .json()
            .await
            .map_err(|err| TransportError::InvalidBody(err.to_string()))?;
        Ok(RefreshResult {
            access_token: payload.access_token,
            refresh_token: payload.refresh_token,
            expires_in: payload.expires_in,
        })
    }
}
