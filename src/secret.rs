//! Opaque key→string secret storage.
//!
//! Two backends: the macOS login Keychain (driven through the `security`
//! command-line tool) and a file-per-key store for other platforms and
//! development. All credential persistence goes through
//! [`CredentialStore`](crate::CredentialStore); nothing else writes to
//! these keys.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

use thiserror::Error;

/// Keychain service name under which Quotabar stores its secrets.
const KEYCHAIN_SERVICE: &str = "Quotabar-credentials";

/// Backend failure while reading or writing a secret.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("secret store backend: {0}")]
    Backend(String),
    #[error("credential record encoding: {0}")]
    Encode(String),
}

/// Persistent key→string storage with at-least-once durability per write.
pub trait SecretStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// The platform default: the login Keychain on macOS, a 0600 file store
/// elsewhere.
pub fn default_secret_store() -> Arc<dyn SecretStore> {
    #[cfg(target_os = "macos")]
    {
        Arc::new(KeychainSecretStore::new(KEYCHAIN_SERVICE))
    }
    #[cfg(not(target_os = "macos"))]
    {
        Arc::new(FileSecretStore::new(FileSecretStore::default_dir()))
    }
}

/// macOS Keychain backend.
///
/// Shells out to `security` rather than linking the Security framework;
/// the tool is present on every macOS install and the call volume here is
/// a handful of operations per token lifetime.
pub struct KeychainSecretStore {
    service: String,
}

impl KeychainSecretStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<std::process::Output, StoreError> {
        Command::new("security")
            .args(args)
            .output()
            .map_err(|err| StoreError::Backend(format!("security: {err}")))
    }
}

impl SecretStore for KeychainSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let output = self.run(&["find-generic-password", "-s", &self.service, "-a", key, "-w"])?;
        if output.status.success() {
            let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if value.is_empty() {
                return Ok(None);
            }
            return Ok(Some(value));
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_not_found(&stderr) {
            Ok(None)
        } else {
            Err(StoreError::Backend(stderr.trim().to_string()))
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        // -U updates in place when the item already exists.
        let output = self.run(&[
            "add-generic-password",
            "-U",
            "-s",
            &self.service,
            "-a",
            key,
            "-w",
            value,
        ])?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(StoreError::Backend(stderr.trim().to_string()))
        }
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let output = self.run(&["delete-generic-password", "-s", &self.service, "-a", key])?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_not_found(&stderr) {
            Ok(())
        } else {
            Err(StoreError::Backend(stderr.trim().to_string()))
        }
    }
}

fn is_not_found(stderr: &str) -> bool {
    stderr.to_lowercase().contains("could not be found")
}

/// File-per-key backend; files are created with mode 0600.
pub struct FileSecretStore {
    dir: PathBuf,
}

impl FileSecretStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `~/.quotabar/secrets`, falling back to a relative path when the home
    /// directory cannot be resolved.
    pub fn default_dir() -> PathBuf {
        directories::UserDirs::new()
            .map(|dirs| dirs.home_dir().join(".quotabar").join("secrets"))
            .unwrap_or_else(|| PathBuf::from(".quotabar/secrets"))
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Backend(err.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|err| StoreError::Backend(err.to_string()))?;
        let path = self.key_path(key);
        fs::write(&path, value).map_err(|err| StoreError::Backend(err.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
                .map_err(|err| StoreError::Backend(err.to_string()))?;
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::Backend(err.to_string())),
        }
    }
}
