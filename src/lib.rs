//! Quotabar credential subsystem.
//!
//! Keeps the OAuth credential of the Quotabar menu-bar usage monitor valid
//! without user intervention: decides when the access token needs renewal,
//! performs the renewal exactly once under concurrent triggers, persists the
//! result durably before anything observes it, and mirrors it into the
//! provider CLI's own credential store.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use quotabar::prelude::*;
//! use quotabar::secret::default_secret_store;
//!
//! # async fn example() -> Result<(), quotabar::CredentialError> {
//! let store = Arc::new(CredentialStore::new(default_secret_store()));
//! let transport = RefreshTransport::new(
//!     OAuthConfig::new("https://id.example.com/oauth/token", "quotabar-menu").overridden_from_env(),
//! );
//! let mirror = Arc::new(CliCredentialMirror::in_home(None));
//!
//! let coordinator = RefreshCoordinator::new(store, transport, mirror);
//! let credential = coordinator.obtain_valid_credential().await?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod coordinator;
pub mod credential;
pub mod error;
pub mod prelude;
pub mod secret;
pub mod store;
pub mod sync;
pub mod transport;

pub use config::OAuthConfig;
pub use coordinator::RefreshCoordinator;
pub use credential::{Credential, RefreshResult};
pub use error::{CredentialError, RefreshFailure};
pub use secret::{FileSecretStore, KeychainSecretStore, SecretStore, StoreError};
pub use store::CredentialStore;
pub use sync::{CliCredentialMirror, CredentialSynchronizer, SyncError};
pub use transport::{RefreshTransport, TransportError};
