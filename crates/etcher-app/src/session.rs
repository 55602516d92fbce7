//! Session Manager
//!
//! Owns the signed-in [`Identity`]. Concurrent `login` calls share a single
//! delegation flow; `logout` drops the identity and invalidates any flow
//! still in progress so it cannot sign the session back in.
//!
//! ```text
//! Unauthenticated ──login──► Authenticating ──ok──► Authenticated
//!        ▲                        │                      │
//!        └────────failure─────────┘                      │
//!        └──────────────logout / expiry──────────────────┘
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use etcher_core::effects::{DelegationProvider, DelegationRequest};
use etcher_core::{Dynamic, EtcherConfig, EtcherError, Identity, Principal, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;

/// Authentication state published to the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// No identity
    #[default]
    Unauthenticated,
    /// A delegation flow is running
    Authenticating,
    /// Signed in until `expires_at`
    Authenticated {
        /// Signed-in principal
        principal: Principal,
        /// End of the delegation lifetime
        expires_at: Instant,
    },
}

impl SessionStatus {
    /// Whether an identity is held.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

type LoginFlow = Shared<BoxFuture<'static, Result<Identity>>>;

struct SessionInner {
    provider: Arc<dyn DelegationProvider>,
    provider_url: String,
    ttl: Duration,
    identity: RwLock<Option<Identity>>,
    /// Flow shared by concurrent `login` callers.
    in_flight: Mutex<Option<LoginFlow>>,
    status: Dynamic<SessionStatus>,
    /// Bumped by `logout`; a flow started under an older epoch is discarded.
    epoch: AtomicU64,
}

/// Holds the current identity and runs sign-in.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("provider_url", &self.inner.provider_url)
            .field("ttl", &self.inner.ttl)
            .field("status", &self.inner.status.get())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Session manager delegating through `provider` with the configured
    /// identity provider and TTL.
    pub fn new(provider: Arc<dyn DelegationProvider>, config: &EtcherConfig) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                provider,
                provider_url: config.identity_provider_url(),
                ttl: config.session_ttl(),
                identity: RwLock::new(None),
                in_flight: Mutex::new(None),
                status: Dynamic::new(SessionStatus::Unauthenticated),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Sign in, or return the identity already held.
    ///
    /// Callers arriving while a flow runs wait for that same flow; the
    /// provider is asked at most once per flow.
    pub async fn login(&self) -> Result<Identity> {
        if let Some(identity) = self.current_identity() {
            return Ok(identity);
        }

        let flow = {
            let mut slot = self.inner.in_flight.lock();
            match slot.as_ref() {
                Some(flow) => {
                    tracing::debug!("Joining in-flight login");
                    flow.clone()
                }
                None => {
                    let epoch = self.inner.epoch.load(Ordering::Acquire);
                    let flow = run_flow(self.inner.clone(), epoch).boxed().shared();
                    *slot = Some(flow.clone());
                    self.inner.status.set(SessionStatus::Authenticating);
                    tracing::info!(provider = %self.inner.provider_url, "Starting login");
                    flow
                }
            }
        };
        flow.await
    }

    /// Drop the identity. Idempotent.
    pub fn logout(&self) {
        let mut slot = self.inner.in_flight.lock();
        self.inner.epoch.fetch_add(1, Ordering::AcqRel);
        let aborted_flow = slot.take().is_some();
        let previous = self.inner.identity.write().take();
        self.inner.status.set(SessionStatus::Unauthenticated);
        drop(slot);

        if let Some(identity) = previous {
            tracing::info!(principal = %identity.principal(), "Logged out");
        } else if aborted_flow {
            tracing::info!("Logged out during login");
        }
    }

    /// Identity if signed in and not expired.
    pub fn current_identity(&self) -> Option<Identity> {
        let identity = self.inner.identity.read().clone()?;
        if !identity.is_expired() {
            return Some(identity);
        }

        let mut slot = self.inner.identity.write();
        // Only clear if nobody replaced it meanwhile.
        if slot.as_ref().is_some_and(|held| held.same_session(&identity)) {
            slot.take();
            self.inner.status.set(SessionStatus::Unauthenticated);
            tracing::info!(principal = %identity.principal(), "Session expired");
        }
        None
    }

    /// Identity or [`EtcherError::NotAuthenticated`].
    pub fn require_identity(&self) -> Result<Identity> {
        self.current_identity().ok_or(EtcherError::NotAuthenticated)
    }

    /// Current status.
    pub fn status(&self) -> SessionStatus {
        self.inner.status.get()
    }

    /// Observable status cell.
    pub fn status_signal(&self) -> Dynamic<SessionStatus> {
        self.inner.status.clone()
    }
}

async fn run_flow(inner: Arc<SessionInner>, epoch: u64) -> Result<Identity> {
    let request = DelegationRequest {
        provider_url: inner.provider_url.clone(),
        max_time_to_live: inner.ttl,
    };
    let outcome = inner.provider.delegate(request).await;

    let mut slot = inner.in_flight.lock();
    if inner.epoch.load(Ordering::Acquire) != epoch {
        tracing::debug!("Discarding login superseded by logout");
        return Err(EtcherError::auth("login superseded by logout"));
    }
    slot.take();

    match outcome {
        Ok(delegation) => {
            let Some(expires_at) = Instant::now().checked_add(inner.ttl) else {
                inner.status.set(SessionStatus::Unauthenticated);
                tracing::warn!(ttl = ?inner.ttl, "Session TTL overflows the clock");
                return Err(EtcherError::config("Session TTL is out of range"));
            };
            let identity = Identity::new(delegation.principal, delegation.credential, expires_at);
            *inner.identity.write() = Some(identity.clone());
            inner.status.set(SessionStatus::Authenticated {
                principal: identity.principal().clone(),
                expires_at: identity.expires_at(),
            });
            tracing::info!(principal = %identity.principal(), "Logged in");
            Ok(identity)
        }
        Err(error) => {
            inner.status.set(SessionStatus::Unauthenticated);
            tracing::warn!(%error, "Login failed");
            Err(EtcherError::auth(error.to_string()))
        }
    }
}
