//! Canonical credential persistence: a memory cache in front of the secret
//! store, with one owner for both.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::codec;
use crate::credential::Credential;
use crate::secret::{SecretStore, StoreError};

/// Secret-store key for the full credential record.
pub const CREDENTIALS_KEY: &str = "oauthCredentials";
/// Secret-store key for the bare access token, for collaborators that only
/// need an "is a session configured" check without decoding the record.
pub const SESSION_KEY: &str = "sessionKey";

/// Single owner of the canonical credential record.
///
/// Every read and write is serialized through one lock, so a save in
/// progress is never observed half-applied, and the cache is updated only
/// after the backend write succeeds, never ahead of durable state.
pub struct CredentialStore {
    secrets: Arc<dyn SecretStore>,
    cached: Mutex<Option<Credential>>,
}

impl CredentialStore {
    pub fn new(secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            secrets,
            cached: Mutex::new(None),
        }
    }

    /// The stored credential, from cache when warm.
    ///
    /// Backend read failures and corrupt payloads are treated as absent:
    /// re-authentication recovers both, whereas a surfaced error here is
    /// actionable by nobody.
    pub async fn get(&self) -> Option<Credential> {
        let mut cached = self.cached.lock().await;
        if let Some(credential) = cached.as_ref() {
            return Some(credential.clone());
        }
        let raw = match self.secrets.get(CREDENTIALS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                debug!(error = %err, "credential read failed; treating as absent");
                return None;
            }
        };
        let credential = codec::decode(&raw)?;
        *cached = Some(credential.clone());
        Some(credential)
    }

    /// Durably persist `credential`, then update the cache.
    ///
    /// The session key mirrors the bare access token on every successful
    /// save. A failure on either write leaves the cache untouched; the
    /// caller retries and the retry rewrites both keys.
    pub async fn save(&self, credential: Credential) -> Result<(), StoreError> {
        let payload =
            codec::encode(&credential).map_err(|err| StoreError::Encode(err.to_string()))?;
        let mut cached = self.cached.lock().await;
        self.secrets.set(CREDENTIALS_KEY, &payload)?;
        self.secrets.set(SESSION_KEY, &credential.access_token)?;
        *cached = Some(credential);
        Ok(())
    }

    /// Remove the record and the session key and clear the cache.
    /// Idempotent: absent keys are not an error, and backend failures are
    /// logged rather than surfaced so a disconnect always takes effect
    /// locally.
    pub async fn delete(&self) {
        let mut cached = self.cached.lock().await;
        for key in [CREDENTIALS_KEY, SESSION_KEY] {
            if let Err(err) = self.secrets.remove(key) {
                warn!(key, error = %err, "failed to remove stored secret");
            }
        }
        *cached = None;
    }
}
