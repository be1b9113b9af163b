//! Convenience re-exports for common use.

pub use crate::config::OAuthConfig;
pub use crate::coordinator::RefreshCoordinator;
pub use crate::credential::{Credential, RefreshResult};
pub use crate::error::{CredentialError, RefreshFailure};
pub use crate::store::CredentialStore;
pub use crate::sync::{CliCredentialMirror, CredentialSynchronizer};
pub use crate::transport::RefreshTransport;
