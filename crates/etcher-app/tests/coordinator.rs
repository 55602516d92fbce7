//! Workflow coordinator end to end over the scripted service and provider.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use etcher_app::{NoticeLevel, WorkflowCoordinator};
use etcher_core::effects::TransportError;
use etcher_core::{
    ConversionStatus, DepositAddresses, EtcherConfig, EtcherError, InterfaceGeneration,
    MutatingOperation, SchemaError, Txid,
};
use etcher_testkit::{
    init_test_tracing, sample_request, test_config, MockDelegationProvider, MockEtcherService,
    ServiceMethod,
};
use serde_json::json;

struct Harness {
    service: MockEtcherService,
    coordinator: WorkflowCoordinator,
}

fn harness(service: MockEtcherService, generation: InterfaceGeneration) -> Harness {
    init_test_tracing();
    let provider = MockDelegationProvider::succeeding("user-1");
    let coordinator = WorkflowCoordinator::new(
        test_config(generation),
        Arc::new(service.clone()),
        Arc::new(provider),
    )
    .unwrap();
    Harness {
        service,
        coordinator,
    }
}

async fn signed_in(service: MockEtcherService) -> Harness {
    let harness = harness(service, InterfaceGeneration::OptionalFields);
    harness.coordinator.login().await.unwrap();
    harness
}

fn ab() -> Txid {
    Txid::from_hex("ab").unwrap()
}

#[test]
fn invalid_config_is_rejected() {
    let mut config = test_config(InterfaceGeneration::OptionalFields);
    config.tracker.poll_interval_ms = 0;
    let service = MockEtcherService::new(InterfaceGeneration::OptionalFields);
    let result = WorkflowCoordinator::new(
        config,
        Arc::new(service),
        Arc::new(MockDelegationProvider::succeeding("user-1")),
    );
    assert_matches!(result, Err(EtcherError::Config { .. }));
}

#[tokio::test]
async fn operations_require_a_session() {
    let h = harness(
        MockEtcherService::new(InterfaceGeneration::OptionalFields).with_balance(10),
        InterfaceGeneration::OptionalFields,
    );

    assert_matches!(h.coordinator.etch(sample_request()).await, Err(EtcherError::NotAuthenticated));
    assert_matches!(h.coordinator.submit_conversion().await, Err(EtcherError::NotAuthenticated));
    assert_matches!(
        h.coordinator.get_deposit_addresses().await,
        Err(EtcherError::NotAuthenticated)
    );
    assert_eq!(h.service.calls(ServiceMethod::Etch), 0);
    assert_eq!(h.service.calls(ServiceMethod::NativeBalance), 0);

    let notice = h.coordinator.snapshot().notice.unwrap();
    assert_eq!(notice.title, "Sign-in");
}

// ─── Etching ────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn concurrent_etch_reaches_remote_once() {
    let service = MockEtcherService::new(InterfaceGeneration::OptionalFields)
        .with_delay(ServiceMethod::Etch, Duration::from_secs(30));
    let h = signed_in(service).await;

    let (first, second) = tokio::join!(
        h.coordinator.etch(sample_request()),
        h.coordinator.etch(sample_request())
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|r| matches!(
        r,
        Err(EtcherError::ConcurrentOperation {
            in_flight: MutatingOperation::Etch
        })
    )));
    assert_eq!(h.service.calls(ServiceMethod::Etch), 1);

    // Slot is free again.
    h.coordinator.etch(sample_request()).await.unwrap();
    assert_eq!(h.service.calls(ServiceMethod::Etch), 2);
}

#[tokio::test]
async fn etch_publishes_result() {
    let h = signed_in(MockEtcherService::new(InterfaceGeneration::OptionalFields)).await;

    let result = h.coordinator.etch(sample_request()).await.unwrap();
    assert_eq!(result.commit_txid, "commit-txid");
    assert_eq!(result.reveal_txid, "reveal-txid");
    assert_eq!(h.coordinator.snapshot().last_etching, Some(result));

    let sent = h.service.etch_requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0],
        h.coordinator.adapter().encode_etching_request(&sample_request()).unwrap()
    );
}

#[tokio::test]
async fn invalid_request_is_never_sent() {
    let h = signed_in(MockEtcherService::new(InterfaceGeneration::OptionalFields)).await;

    let request = sample_request().with_divisibility(39);
    let result = h.coordinator.etch(request).await;

    assert_matches!(
        result,
        Err(EtcherError::Schema(SchemaError::DivisibilityOutOfRange { value: 39 }))
    );
    assert_eq!(h.service.calls(ServiceMethod::Etch), 0);
    assert!(h.service.etch_requests().is_empty());
    assert_eq!(h.coordinator.snapshot().notice.unwrap().level, NoticeLevel::Warning);
}

#[tokio::test]
async fn etch_transport_failure_is_not_retried() {
    let service = MockEtcherService::new(InterfaceGeneration::OptionalFields);
    service.fail_next(ServiceMethod::Etch, TransportError::unreachable("reset"));
    let h = signed_in(service).await;

    let result = h.coordinator.etch(sample_request()).await;
    assert_matches!(result, Err(EtcherError::Transport(_)));
    assert_eq!(h.service.calls(ServiceMethod::Etch), 1);
    assert_eq!(h.coordinator.snapshot().last_etching, None);
}

#[tokio::test]
async fn malformed_etch_reply_is_reported() {
    let service = MockEtcherService::new(InterfaceGeneration::OptionalFields);
    service.set_etch_response(Ok(json!(["", "reveal"])));
    let h = signed_in(service).await;

    let result = h.coordinator.etch(sample_request()).await;
    assert_matches!(
        result,
        Err(EtcherError::Schema(SchemaError::MalformedResponse { .. }))
    );
    assert_eq!(h.service.calls(ServiceMethod::Etch), 1);
}

// ─── Conversion ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn zero_balance_blocks_submission() {
    let h = signed_in(MockEtcherService::new(InterfaceGeneration::OptionalFields).with_balance(0))
        .await;

    let result = h.coordinator.submit_conversion().await;
    assert_matches!(
        result,
        Err(EtcherError::InsufficientBalance {
            balance: 0,
            minimum: 1
        })
    );
    assert_eq!(h.service.calls(ServiceMethod::SubmitConversion), 0);
    assert_eq!(h.service.calls(ServiceMethod::NativeBalance), 1);
    assert!(h.coordinator.tracking().is_none());
    assert_eq!(h.coordinator.conversion_record(), None);
}

#[tokio::test(start_paused = true)]
async fn submission_is_tracked_to_completion() {
    let service = MockEtcherService::new(InterfaceGeneration::OptionalFields)
        .with_balance(50_000)
        .with_next_block_index(42)
        .with_statuses([
            ConversionStatus::Signing,
            ConversionStatus::Sending { txid: ab() },
            ConversionStatus::Confirmed { txid: ab() },
        ]);
    let h = signed_in(service).await;

    let block_index = h.coordinator.submit_conversion().await.unwrap();
    assert_eq!(block_index, 42);

    let handle = h.coordinator.tracking().unwrap();
    assert_eq!(handle.block_index(), 42);
    let record = handle.wait().await.unwrap();
    assert_eq!(h.coordinator.conversion_record(), Some(record));

    // Let the notice watcher run.
    tokio::time::sleep(Duration::from_millis(1)).await;
    let notice = h.coordinator.snapshot().notice.unwrap();
    assert_eq!(notice.level, NoticeLevel::Success);
    assert_eq!(h.service.calls(ServiceMethod::SubmitConversion), 1);
}

#[tokio::test(start_paused = true)]
async fn balance_query_is_retried() {
    let service = MockEtcherService::new(InterfaceGeneration::OptionalFields).with_balance(5);
    service.fail_next(ServiceMethod::NativeBalance, TransportError::unreachable("a"));
    service.fail_next(ServiceMethod::NativeBalance, TransportError::unreachable("b"));
    let h = signed_in(service).await;

    h.coordinator.submit_conversion().await.unwrap();
    assert_eq!(h.service.calls(ServiceMethod::NativeBalance), 3);
    assert_eq!(h.service.calls(ServiceMethod::SubmitConversion), 1);
    h.coordinator.cancel_tracking();
}

#[tokio::test(start_paused = true)]
async fn balance_outage_surfaces_remote_unavailable() {
    let service = MockEtcherService::new(InterfaceGeneration::OptionalFields).with_balance(5);
    for _ in 0..3 {
        service.fail_next(ServiceMethod::NativeBalance, TransportError::unreachable("down"));
    }
    let h = signed_in(service).await;

    let result = h.coordinator.submit_conversion().await;
    assert_matches!(
        result,
        Err(EtcherError::RemoteUnavailable {
            operation: "native_balance",
            attempts: 3,
            ..
        })
    );
    assert_eq!(h.service.calls(ServiceMethod::SubmitConversion), 0);
}

#[tokio::test]
async fn submit_transport_failure_is_not_retried() {
    let service = MockEtcherService::new(InterfaceGeneration::OptionalFields).with_balance(5);
    service.fail_next(
        ServiceMethod::SubmitConversion,
        TransportError::Timeout { timeout_ms: 10_000 },
    );
    let h = signed_in(service).await;

    let result = h.coordinator.submit_conversion().await;
    assert_matches!(result, Err(EtcherError::Transport(TransportError::Timeout { .. })));
    assert_eq!(h.service.calls(ServiceMethod::SubmitConversion), 1);
    assert!(h.coordinator.tracking().is_none());
}

#[tokio::test(start_paused = true)]
async fn new_submission_replaces_previous_tracking() {
    let service = MockEtcherService::new(InterfaceGeneration::OptionalFields).with_balance(5);
    let h = signed_in(service).await;

    let first = h.coordinator.submit_conversion().await.unwrap();
    let first_handle = h.coordinator.tracking().unwrap();
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    let second = h.coordinator.submit_conversion().await.unwrap();
    assert_ne!(first, second);
    assert_matches!(first_handle.wait().await, Err(EtcherError::Cancelled));

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(
        h.coordinator.conversion_record().map(|r| r.block_index),
        Some(second)
    );
    h.coordinator.cancel_tracking();
}

#[tokio::test(start_paused = true)]
async fn logout_stops_tracking_but_keeps_record() {
    let service = MockEtcherService::new(InterfaceGeneration::OptionalFields)
        .with_balance(5)
        .with_statuses([ConversionStatus::Signing]);
    let h = signed_in(service).await;

    h.coordinator.submit_conversion().await.unwrap();
    let handle = h.coordinator.tracking().unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    h.coordinator.logout();
    assert_matches!(handle.wait().await, Err(EtcherError::Cancelled));
    let polls = h.service.calls(ServiceMethod::ConversionStatus);
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(h.service.calls(ServiceMethod::ConversionStatus), polls);
    assert_eq!(
        h.coordinator.conversion_record().map(|r| r.status),
        Some(ConversionStatus::Signing)
    );
    assert!(h.coordinator.tracking().is_none());
}

// ─── Queries ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn deposit_addresses_are_cached_per_session() {
    let addresses = DepositAddresses {
        native: "bcrt1qxyz".to_string(),
        ledger_asset: "ledger-xyz".to_string(),
    };
    let service = MockEtcherService::new(InterfaceGeneration::OptionalFields)
        .with_addresses(addresses.clone());
    let h = signed_in(service).await;

    assert_eq!(h.coordinator.get_deposit_addresses().await.unwrap(), addresses);
    assert_eq!(h.coordinator.get_deposit_addresses().await.unwrap(), addresses);
    assert_eq!(h.service.calls(ServiceMethod::NativeDepositAddress), 1);
    assert_eq!(h.service.calls(ServiceMethod::LedgerDepositAddress), 1);
    assert_eq!(h.coordinator.snapshot().deposit_addresses, Some(addresses.clone()));

    h.coordinator.logout();
    assert_eq!(h.coordinator.snapshot().deposit_addresses, None);

    h.coordinator.login().await.unwrap();
    h.coordinator.get_deposit_addresses().await.unwrap();
    assert_eq!(h.service.calls(ServiceMethod::NativeDepositAddress), 2);
}

#[tokio::test]
async fn fee_estimation_needs_newest_interface() {
    for generation in [InterfaceGeneration::LegacyFlat, InterfaceGeneration::RangedTerms] {
        let h = harness(MockEtcherService::new(generation).with_fee(42), generation);
        h.coordinator.login().await.unwrap();

        let result = h.coordinator.estimate_conversion_fee().await;
        assert_matches!(
            result,
            Err(EtcherError::Unsupported { generation: g, .. }) if g == generation
        );
        assert_eq!(h.service.calls(ServiceMethod::EstimateConversionFee), 0);
    }

    let h = signed_in(MockEtcherService::new(InterfaceGeneration::OptionalFields).with_fee(42))
        .await;
    assert_eq!(h.coordinator.estimate_conversion_fee().await.unwrap(), 42);
}

#[tokio::test]
async fn notices_can_be_dismissed() {
    let h = signed_in(MockEtcherService::new(InterfaceGeneration::OptionalFields)).await;
    let mut notices = h.coordinator.signals().notice.subscribe();

    let _ = h.coordinator.submit_conversion().await;
    assert!(notices.poll().flatten().is_some());

    h.coordinator.dismiss_notice();
    assert_eq!(h.coordinator.snapshot().notice, None);
}

#[tokio::test]
async fn session_signal_is_shared() {
    let h = harness(
        MockEtcherService::new(InterfaceGeneration::OptionalFields),
        InterfaceGeneration::OptionalFields,
    );
    assert!(!h.coordinator.snapshot().session.is_authenticated());

    h.coordinator.login().await.unwrap();
    assert!(h.coordinator.snapshot().session.is_authenticated());
    assert!(h.coordinator.current_identity().is_some());

    h.coordinator.logout();
    assert!(!h.coordinator.snapshot().session.is_authenticated());
}

#[test]
fn default_config_is_valid() {
    assert!(EtcherConfig::default().validate().is_ok());
}
