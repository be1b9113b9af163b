//! Credential record encoding.
//!
//! Two formats: the crate's own flat JSON payload (stored in the secret
//! store, ISO-8601 expiry) and the companion CLI's nested document (a
//! `providerOAuth` member with an epoch-millisecond expiry). Both legs are
//! pure functions of their inputs.

use chrono::{TimeZone, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::credential::Credential;

/// Decode failures for the companion document, one variant per required
/// field so diagnostics can tell a malformed mirror from an absent one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompanionSchemaError {
    #[error("companion document has no providerOAuth member")]
    MissingOAuthSection,
    #[error("companion credential is missing accessToken")]
    MissingAccessToken,
    #[error("companion credential is missing refreshToken")]
    MissingRefreshToken,
    #[error("companion credential is missing expiresAt")]
    MissingExpiresAt,
    #[error("companion credential has an out-of-range expiresAt")]
    InvalidExpiresAt,
    #[error("companion document is not valid JSON: {0}")]
    Malformed(String),
}

/// Serialize the credential to its stored JSON form.
pub fn encode(credential: &Credential) -> Result<String, serde_json::Error> {
    serde_json::to_string(credential)
}

/// Parse a stored payload.
///
/// Corrupt data decodes to `None`: re-authentication recovers it, while a
/// surfaced error would be actionable by nobody. A record with an empty
/// refresh token is corrupt by definition, since it can never be renewed.
pub fn decode(raw: &str) -> Option<Credential> {
    let credential = match serde_json::from_str::<Credential>(raw) {
        Ok(credential) => credential,
        Err(err) => {
            debug!(error = %err, "stored credential payload did not decode; treating as absent");
            return None;
        }
    };
    if credential.refresh_token.is_empty() {
        debug!("stored credential has an empty refresh token; treating as absent");
        return None;
    }
    Some(credential)
}

/// Render the credential as the companion CLI's document shape:
/// `{ "providerOAuth": { … } }` with an epoch-millisecond expiry.
pub fn to_companion_schema(credential: &Credential) -> Value {
    let mut oauth = Map::new();
    oauth.insert(
        "accessToken".to_string(),
        Value::from(credential.access_token.clone()),
    );
    oauth.insert(
        "refreshToken".to_string(),
        Value::from(credential.refresh_token.clone()),
    );
    oauth.insert(
        "expiresAt".to_string(),
        Value::from(credential.expires_at.timestamp_millis()),
    );
    oauth.insert("scopes".to_string(), Value::from(credential.scopes.clone()));
    if let Some(subscription) = &credential.subscription_type {
        oauth.insert(
            "subscriptionType".to_string(),
            Value::from(subscription.clone()),
        );
    }
    if let Some(tier) = &credential.rate_limit_tier {
        oauth.insert("rateLimitTier".to_string(), Value::from(tier.clone()));
    }

    let mut document = Map::new();
    document.insert("providerOAuth".to_string(), Value::Object(oauth));
    Value::Object(document)
}

/// Wire shape of the companion CLI's `providerOAuth` member. Every field is
/// optional here so each required one can be reported individually.
#[derive(Debug, Deserialize)]
struct CompanionOAuth {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
    #[serde(rename = "refreshToken")]
    refresh_token: Option<String>,
    #[serde(rename = "expiresAt")]
    expires_at: Option<i64>,
    #[serde(rename = "scopes")]
    scopes: Option<Vec<String>>,
    #[serde(rename = "subscriptionType")]
    subscription_type: Option<String>,
    #[serde(rename = "rateLimitTier")]
    rate_limit_tier: Option<String>,
}

/// Decode a companion document into the canonical record.
pub fn from_companion_schema(document: &Value) -> Result<Credential, CompanionSchemaError> {
    let oauth_member = document
        .get("providerOAuth")
        .filter(|member| !member.is_null())
        .ok_or(CompanionSchemaError::MissingOAuthSection)?;
    let oauth: CompanionOAuth = serde_json::from_value(oauth_member.clone())
        .map_err(|err| CompanionSchemaError::Malformed(err.to_string()))?;

    let access_token = oauth
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or(CompanionSchemaError::MissingAccessToken)?;
    let refresh_token = oauth
        .refresh_token
        .filter(|token| !token.is_empty())
        .ok_or(CompanionSchemaError::MissingRefreshToken)?;
    let expires_ms = oauth
        .expires_at
        .ok_or(CompanionSchemaError::MissingExpiresAt)?;
    let expires_at = Utc
        .timestamp_millis_opt(expires_ms)
        .single()
        .ok_or(CompanionSchemaError::InvalidExpiresAt)?;

    Ok(Credential {
        access_token,
        refresh_token,
        expires_at,
        scopes: oauth.scopes.unwrap_or_default(),
        subscription_type: oauth.subscription_type,
        rate_limit_tier: oauth.rate_limit_tier,
    })
}
