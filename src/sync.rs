//! Mirroring refreshed credentials into the provider CLI's own store.
//!
//! The menu-bar app and the CLI share one logical identity but each keeps
//! its own credential store. The two run concurrently, so this is
//! eventually-consistent best-effort replication, not a transaction: partial
//! failure (our store updated, the CLI's not) is an accepted, logged
//! outcome, repaired by the next successful push.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::codec::{self, CompanionSchemaError};
use crate::credential::Credential;

/// The CLI's credential file, relative to the user home.
const CLI_CREDENTIALS_REL_PATH: &str = ".provider/credentials.json";

/// Mirror failure; always non-fatal to the caller's own refresh.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error("companion store io: {0}")]
    Io(String),
    #[error("companion document: {0}")]
    Schema(#[from] CompanionSchemaError),
    #[error("companion document encoding: {0}")]
    Encode(String),
}

/// Best-effort replication of a refreshed credential into the companion
/// application's store.
#[async_trait]
pub trait CredentialSynchronizer: Send + Sync {
    async fn push(&self, credential: &Credential) -> Result<(), SyncError>;
}

/// File-backed mirror into the provider CLI's credential document.
///
/// The CLI owns that document and may keep unrelated members in it; `push`
/// replaces only the `providerOAuth` member and leaves the rest untouched.
pub struct CliCredentialMirror {
    path: PathBuf,
}

impl CliCredentialMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The CLI's default credential file under `home_dir`, or the user home
    /// when `None`.
    pub fn in_home(home_dir: Option<PathBuf>) -> Self {
        let base = home_dir.unwrap_or_else(user_home_dir);
        Self {
            path: base.join(CLI_CREDENTIALS_REL_PATH),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and decode the CLI's current credential, if any.
    ///
    /// `Ok(None)` means no document or no `providerOAuth` member; the CLI
    /// has simply never authenticated. A present-but-malformed member
    /// surfaces its field-specific error.
    pub fn load(&self) -> Result<Option<Credential>, SyncError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(SyncError::Io(err.to_string())),
        };
        let document: Value = serde_json::from_str(&raw)
            .map_err(|err| CompanionSchemaError::Malformed(err.to_string()))?;
        match codec::from_companion_schema(&document) {
            Ok(credential) => Ok(Some(credential)),
            Err(CompanionSchemaError::MissingOAuthSection) => Ok(None),
            Err(err) => Err(SyncError::Schema(err)),
        }
    }

    fn read_document(&self) -> Result<Value, SyncError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(Value::Object(Map::new()))
            }
            Err(err) => return Err(SyncError::Io(err.to_string())),
        };
        match serde_json::from_str(&raw) {
            Ok(Value::Object(document)) => Ok(Value::Object(document)),
            // A mangled document must not wedge mirroring forever; start a
            // fresh one.
            Ok(_) | Err(_) => {
                debug!(path = %self.path.display(), "companion document unreadable; rewriting");
                Ok(Value::Object(Map::new()))
            }
        }
    }
}

#[async_trait]
impl CredentialSynchronizer for CliCredentialMirror {
    async fn push(&self, credential: &Credential) -> Result<(), SyncError> {
        let mut document = self.read_document()?;
        let mirrored = codec::to_companion_schema(credential);
        if let (Some(target), Some(update)) = (document.as_object_mut(), mirrored.as_object()) {
            for (key, value) in update {
                target.insert(key.clone(), value.clone());
            }
        }

        let serialized = serde_json::to_string_pretty(&document)
            .map_err(|err| SyncError::Encode(err.to_string()))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| SyncError::Io(err.to_string()))?;
        }
        fs::write(&self.path, serialized).map_err(|err| SyncError::Io(err.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .map_err(|err| SyncError::Io(err.to_string()))?;
        }
        Ok(())
    }
}

fn user_home_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
