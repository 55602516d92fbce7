//! Signing identity held by the session layer.
//!
//! An [`Identity`] is a capability token: cloning it shares the same
//! credential allocation, the credential bytes themselves are never copied
//! out into other components.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Textual principal of a signed-in caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Wrap a textual principal.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Principal text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

struct IdentityInner {
    principal: Principal,
    credential: Vec<u8>,
    expires_at: Instant,
}

/// Opaque signing credential obtained through delegation.
#[derive(Clone)]
pub struct Identity {
    inner: Arc<IdentityInner>,
}

impl Identity {
    /// Create an identity that stays valid until `expires_at`.
    pub fn new(principal: Principal, credential: Vec<u8>, expires_at: Instant) -> Self {
        Self {
            inner: Arc::new(IdentityInner {
                principal,
                credential,
                expires_at,
            }),
        }
    }

    /// Principal this identity signs for.
    pub fn principal(&self) -> &Principal {
        &self.inner.principal
    }

    /// Delegated credential bytes, borrowed for the duration of a call.
    pub fn credential(&self) -> &[u8] {
        &self.inner.credential
    }

    /// Instant after which the delegation is no longer accepted.
    pub fn expires_at(&self) -> Instant {
        self.inner.expires_at
    }

    /// Whether the delegation has lapsed at `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.inner.expires_at
    }

    /// Whether the delegation has lapsed.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Whether both handles refer to the same delegation.
    pub fn same_session(&self, other: &Identity) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("principal", &self.inner.principal)
            .field("expires_at", &self.inner.expires_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_clone_shares_credential() {
        let identity = Identity::new(
            Principal::new("aaaaa-aa"),
            vec![1, 2, 3],
            Instant::now() + Duration::from_secs(60),
        );
        let copy = identity.clone();
        assert!(identity.same_session(&copy));
        assert_eq!(copy.credential().as_ptr(), identity.credential().as_ptr());
    }

    #[test]
    fn test_expiry() {
        let now = Instant::now();
        let identity = Identity::new(Principal::new("p"), vec![], now + Duration::from_secs(10));
        assert!(!identity.is_expired_at(now));
        assert!(identity.is_expired_at(now + Duration::from_secs(10)));
    }

    #[test]
    fn test_debug_hides_credential() {
        let identity = Identity::new(
            Principal::new("p"),
            vec![0xde, 0xad],
            Instant::now() + Duration::from_secs(1),
        );
        let rendered = format!("{identity:?}");
        assert!(rendered.contains("principal"));
        assert!(!rendered.contains("222"));
        assert!(!rendered.contains("credential"));
    }
}
