#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quotabar::credential::Credential;
use quotabar::secret::{SecretStore, StoreError};
use quotabar::sync::{CredentialSynchronizer, SyncError};
use tokio::sync::Notify;

/// In-memory secret store with switchable write failure.
#[derive(Default)]
pub struct InMemorySecretStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("store lock poisoned")
            .get(key)
            .cloned()
    }

    pub fn seed(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .expect("store lock poisoned")
            .insert(key.to_string(), value.to_string());
    }
}

impl SecretStore for InMemorySecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected write failure".to_string()));
        }
        self.seed(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .expect("store lock poisoned")
            .remove(key);
        Ok(())
    }
}

/// Synchronizer double that records push attempts and can be told to fail.
#[derive(Default)]
pub struct RecordingSynchronizer {
    attempts: Mutex<Vec<Credential>>,
    fail: AtomicBool,
    notify: Notify,
}

impl RecordingSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_pushes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> Vec<Credential> {
        self.attempts.lock().expect("sync lock poisoned").clone()
    }

    /// Wait until the detached mirror task has attempted a push.
    pub async fn pushed(&self) {
        self.notify.notified().await;
    }
}

#[async_trait]
impl CredentialSynchronizer for RecordingSynchronizer {
    async fn push(&self, credential: &Credential) -> Result<(), SyncError> {
        self.attempts
            .lock()
            .expect("sync lock poisoned")
            .push(credential.clone());
        let failing = self.fail.load(Ordering::SeqCst);
        self.notify.notify_one();
        if failing {
            return Err(SyncError::Io("injected mirror failure".to_string()));
        }
        Ok(())
    }
}

pub fn credential(
    access_token: &str,
    refresh_token: &str,
    expires_at: DateTime<Utc>,
) -> Credential {
    Credential {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.to_string(),
        expires_at,
        scopes: vec!["usage:read".to_string(), "profile".to_string()],
        subscription_type: Some("pro".to_string()),
        rate_limit_tier: Some("tier-2".to_string()),
    }
}
