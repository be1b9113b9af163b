//! Refresh decision and execution.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::credential::Credential;
use crate::error::{CredentialError, RefreshFailure};
use crate::store::CredentialStore;
use crate::sync::CredentialSynchronizer;
use crate::transport::{RefreshTransport, TransportError};

type SharedRefresh = Shared<BoxFuture<'static, Result<Credential, CredentialError>>>;

/// Decides whether a refresh is needed, runs at most one at a time,
/// persists the outcome and mirrors it into the companion store.
///
/// The provider rotates the refresh token on every use, so two concurrent
/// refreshes with the same stale token race: the loser's token is already
/// invalidated by the winner and the call fails as if the user had been
/// logged out. Concurrent callers therefore join the in-flight attempt and
/// share its result, success or failure, instead of starting a second
/// exchange.
pub struct RefreshCoordinator {
    store: Arc<CredentialStore>,
    transport: Arc<RefreshTransport>,
    synchronizer: Arc<dyn CredentialSynchronizer>,
    /// The in-flight attempt, tagged with a generation so a completing
    /// awaiter only ever clears its own attempt, never a newer one.
    in_flight: Mutex<Option<(u64, SharedRefresh)>>,
    generation: AtomicU64,
    /// Rotated but not yet durably persisted (the save failed). Persistence
    /// is retried before anything else so the rotation is never lost.
    pending: Arc<Mutex<Option<Credential>>>,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<CredentialStore>,
        transport: RefreshTransport,
        synchronizer: Arc<dyn CredentialSynchronizer>,
    ) -> Self {
        Self {
            store,
            transport: Arc::new(transport),
            synchronizer,
            in_flight: Mutex::new(None),
            generation: AtomicU64::new(0),
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// A credential valid for at least the next few minutes, refreshing and
    /// persisting first when required.
    ///
    /// An in-flight refresh, once started, is never abandoned: the provider
    /// may have rotated the refresh token server-side even if a caller
    /// stops waiting, so callers that time out retry this method and join
    /// whatever attempt is still running.
    pub async fn obtain_valid_credential(&self) -> Result<Credential, CredentialError> {
        self.retry_pending_persist().await?;

        let stored = self
            .store
            .get()
            .await
            .ok_or(CredentialError::NoCredentials)?;
        if !stored.should_refresh(Utc::now()) {
            return Ok(stored);
        }
        self.join_refresh().await
    }

    /// `true` while a stored credential can still mint access tokens on
    /// demand. Deliberately `true` for an expired access token: an
    /// expired-but-refreshable credential needs a refresh, not a login, and
    /// callers must not conflate the two.
    pub async fn has_valid_credential(&self) -> bool {
        self.store
            .get()
            .await
            .is_some_and(|credential| credential.is_refreshable())
    }

    /// User-initiated disconnect: forget the identity everywhere this
    /// process owns it.
    pub async fn disconnect(&self) {
        *self.pending.lock().await = None;
        self.store.delete().await;
    }

    /// Persist a credential left over from a refresh whose save failed,
    /// before anything else happens: its refresh token is the only live
    /// one, and losing it means a forced re-login.
    async fn retry_pending_persist(&self) -> Result<(), CredentialError> {
        let mut pending = self.pending.lock().await;
        let Some(credential) = pending.clone() else {
            return Ok(());
        };
        match self.store.save(credential).await {
            Ok(()) => {
                *pending = None;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "retained credential still failed to persist");
                Err(CredentialError::StoreWriteFailed(err.to_string()))
            }
        }
    }

    async fn join_refresh(&self) -> Result<Credential, CredentialError> {
        let (generation, attempt) = {
            let mut slot = self.in_flight.lock().await;
            match slot.as_ref() {
                Some((generation, attempt)) => (*generation, attempt.clone()),
                None => {
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                    let attempt = Self::execute_refresh(
                        self.store.clone(),
                        self.transport.clone(),
                        self.synchronizer.clone(),
                        self.pending.clone(),
                    )
                    .boxed()
                    .shared();
                    *slot = Some((generation, attempt.clone()));
                    (generation, attempt)
                }
            }
        };

        let result = attempt.await;
        let mut slot = self.in_flight.lock().await;
        if matches!(slot.as_ref(), Some((current, _)) if *current == generation) {
            *slot = None;
        }
        result
    }

    async fn execute_refresh(
        store: Arc<CredentialStore>,
        transport: Arc<RefreshTransport>,
        synchronizer: Arc<dyn CredentialSynchronizer>,
        pending: Arc<Mutex<Option<Credential>>>,
    ) -> Result<Credential, CredentialError> {
        // A caller that read a stale credential may become leader of a
        // second-generation attempt after the first already succeeded;
        // re-read before spending the rotation.
        let current = store.get().await.ok_or(CredentialError::NoCredentials)?;
        if !current.should_refresh(Utc::now()) {
            return Ok(current);
        }

        let exchanged = match transport.refresh(&current.refresh_token).await {
            Ok(result) => result,
            Err(TransportError::InvalidGrant { status }) => {
                debug!(status, "refresh grant rejected; re-authentication required");
                return Err(CredentialError::RefreshTokenExpired);
            }
            Err(TransportError::Status(status)) => {
                return Err(CredentialError::RefreshFailed(RefreshFailure::Status(
                    status,
                )));
            }
            Err(TransportError::Network(message)) | Err(TransportError::InvalidBody(message)) => {
                return Err(CredentialError::RefreshFailed(RefreshFailure::Network(
                    message,
                )));
            }
        };

        let refreshed = current.apply_refresh(&exchanged, Utc::now());
        if let Err(err) = store.save(refreshed.clone()).await {
            warn!(error = %err, "refreshed credential failed to persist; retaining for retry");
            *pending.lock().await = Some(refreshed);
            return Err(CredentialError::StoreWriteFailed(err.to_string()));
        }

        // Local commit done; mirror to the companion store off the caller's
        // path. A slow or unreachable companion must never delay this call,
        // and its failure never affects the outcome.
        let mirrored = refreshed.clone();
        tokio::spawn(async move {
            if let Err(err) = synchronizer.push(&mirrored).await {
                warn!(error = %err, "companion credential mirror failed");
            }
        });

        Ok(refreshed)
    }
}
