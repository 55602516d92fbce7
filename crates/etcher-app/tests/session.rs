//! Session manager: login coalescing, failure, logout and expiry.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use etcher_app::{SessionManager, SessionStatus};
use etcher_core::effects::DelegationError;
use etcher_core::{EtcherConfig, EtcherError, InterfaceGeneration, Principal};
use etcher_testkit::{test_config, MockDelegationProvider};

fn config() -> EtcherConfig {
    test_config(InterfaceGeneration::OptionalFields)
}

fn manager(provider: &MockDelegationProvider, config: &EtcherConfig) -> SessionManager {
    SessionManager::new(Arc::new(provider.clone()), config)
}

#[tokio::test(start_paused = true)]
async fn concurrent_logins_share_one_delegation_flow() {
    let provider = MockDelegationProvider::succeeding("user-1").with_delay(Duration::from_secs(2));
    let session = manager(&provider, &config());

    let (first, second) = tokio::join!(session.login(), session.login());
    let first = first.unwrap();
    let second = second.unwrap();

    assert_eq!(provider.calls(), 1, "second login must join the first flow");
    assert!(
        first.same_session(&second),
        "both callers receive the same identity"
    );
    assert_eq!(first.principal(), &Principal::new("user-1"));
    assert!(session.status().is_authenticated());
}

#[tokio::test(start_paused = true)]
async fn status_is_authenticating_while_flow_runs() {
    let provider = MockDelegationProvider::succeeding("user-1").with_delay(Duration::from_secs(5));
    let session = manager(&provider, &config());

    let background = session.clone();
    let task = tokio::spawn(async move { background.login().await });
    tokio::task::yield_now().await;

    assert_eq!(session.status(), SessionStatus::Authenticating);
    assert!(session.current_identity().is_none());

    // Joins the running flow instead of starting another.
    let joined = session.login().await.unwrap();
    let spawned = task.await.unwrap().unwrap();
    assert!(joined.same_session(&spawned));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn login_returns_held_identity_without_new_flow() {
    let provider = MockDelegationProvider::succeeding("user-1");
    let session = manager(&provider, &config());

    let first = session.login().await.unwrap();
    let second = session.login().await.unwrap();
    assert!(first.same_session(&second));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn delegation_request_carries_provider_and_ttl() {
    let provider = MockDelegationProvider::succeeding("user-1");
    let config = EtcherConfig {
        session_ttl_secs: 900,
        ..config()
    };
    let session = manager(&provider, &config);
    session.login().await.unwrap();

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].provider_url, config.identity_provider_url());
    assert_eq!(requests[0].max_time_to_live, Duration::from_secs(900));
}

#[tokio::test]
async fn failed_delegation_leaves_session_signed_out() {
    let provider = MockDelegationProvider::failing(DelegationError::Cancelled);
    let session = manager(&provider, &config());

    let result = session.login().await;
    assert_matches!(result, Err(EtcherError::Auth { .. }));
    assert_eq!(session.status(), SessionStatus::Unauthenticated);
    assert!(session.current_identity().is_none());
    assert_matches!(
        session.require_identity(),
        Err(EtcherError::NotAuthenticated)
    );
}

#[tokio::test]
async fn login_can_be_retried_after_failure() {
    let provider = MockDelegationProvider::failing(DelegationError::Rejected {
        reason: "denied".to_string(),
    });
    let session = manager(&provider, &config());
    assert!(session.login().await.is_err());

    provider.set_outcome(Ok(etcher_core::effects::Delegation {
        principal: Principal::new("user-2"),
        credential: b"fresh".to_vec(),
    }));
    let identity = session.login().await.unwrap();
    assert_eq!(identity.principal(), &Principal::new("user-2"));
    assert_eq!(provider.calls(), 2, "a failed flow is not reused");
}

#[tokio::test]
async fn logout_is_idempotent() {
    let provider = MockDelegationProvider::succeeding("user-1");
    let session = manager(&provider, &config());
    session.login().await.unwrap();

    session.logout();
    session.logout();

    assert_eq!(session.status(), SessionStatus::Unauthenticated);
    assert!(session.current_identity().is_none());
}

#[tokio::test(start_paused = true)]
async fn logout_during_login_discards_the_flow() {
    let provider = MockDelegationProvider::succeeding("user-1").with_delay(Duration::from_secs(3));
    let session = manager(&provider, &config());

    let background = session.clone();
    let task = tokio::spawn(async move { background.login().await });
    tokio::task::yield_now().await;
    session.logout();

    let result = task.await.unwrap();
    assert_matches!(result, Err(EtcherError::Auth { .. }));
    assert_eq!(session.status(), SessionStatus::Unauthenticated);
    assert!(
        session.current_identity().is_none(),
        "a superseded flow must not sign the session back in"
    );
}

#[tokio::test(start_paused = true)]
async fn identity_expires_after_ttl() {
    let provider = MockDelegationProvider::succeeding("user-1");
    let config = EtcherConfig {
        session_ttl_secs: 60,
        ..config()
    };
    let session = manager(&provider, &config);
    session.login().await.unwrap();

    tokio::time::advance(Duration::from_secs(59)).await;
    assert!(session.current_identity().is_some());

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(session.current_identity().is_none());
    assert_eq!(session.status(), SessionStatus::Unauthenticated);
}

#[tokio::test]
async fn status_signal_follows_transitions() {
    let provider = MockDelegationProvider::succeeding("user-1");
    let session = manager(&provider, &config());
    let mut status = session.status_signal().subscribe();

    session.login().await.unwrap();
    assert!(status.poll().unwrap().is_authenticated());

    session.logout();
    assert_eq!(status.poll(), Some(SessionStatus::Unauthenticated));
}

#[tokio::test(start_paused = true)]
async fn unbounded_ttl_fails_login_instead_of_panicking() {
    let provider = MockDelegationProvider::succeeding("user-1");
    let config = EtcherConfig {
        session_ttl_secs: u64::MAX,
        ..config()
    };
    let session = manager(&provider, &config);

    assert_matches!(session.login().await, Err(EtcherError::Config { .. }));
    assert_eq!(session.status(), SessionStatus::Unauthenticated);
    assert!(session.current_identity().is_none());
}
