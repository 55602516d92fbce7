//! Remote service proxy: method names, call kinds, arguments and reply shapes.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_matches::assert_matches;
use etcher_app::RemoteServiceProxy;
use etcher_core::effects::{methods, CallKind, EtcherService, TransportError};
use etcher_core::{InterfaceGeneration, Principal, SchemaAdapter};
use etcher_testkit::{sample_request, test_identity, ScriptedTransport};
use serde_json::json;

fn proxy() -> RemoteServiceProxy<ScriptedTransport> {
    RemoteServiceProxy::new(ScriptedTransport::new())
}

#[tokio::test]
async fn address_and_balance_calls() {
    let proxy = proxy();
    proxy
        .transport()
        .reply(methods::NATIVE_DEPOSIT_ADDRESS, Ok(json!("bcrt1qabc")))
        .reply(methods::LEDGER_DEPOSIT_ADDRESS, Ok(json!("ledger-abc")))
        .reply(methods::NATIVE_BALANCE, Ok(json!("12345")));
    let identity = test_identity("user-1");

    assert_eq!(proxy.native_deposit_address(&identity).await.unwrap(), "bcrt1qabc");
    assert_eq!(proxy.ledger_deposit_address(&identity).await.unwrap(), "ledger-abc");
    assert_eq!(proxy.native_balance(&identity).await.unwrap(), 12_345);

    let calls = proxy.transport().calls();
    let seen: Vec<_> = calls
        .iter()
        .map(|call| (call.method.as_str(), call.kind))
        .collect();
    assert_eq!(
        seen,
        vec![
            ("get_deposit_address_for_bitcoin", CallKind::Update),
            ("get_deposit_address_for_ckbtc", CallKind::Query),
            ("get_btc_balance", CallKind::Update),
        ]
    );
    assert!(calls.iter().all(|call| call.args == json!([])));
    assert!(calls.iter().all(|call| call.principal == Principal::new("user-1")));
}

#[tokio::test]
async fn conversion_calls() {
    let proxy = proxy();
    proxy
        .transport()
        .reply(methods::SUBMIT_CONVERSION, Ok(json!(77)))
        .reply(methods::CONVERSION_STATUS, Ok(json!({"Signing": null})));
    let identity = test_identity("user-1");

    let block_index = proxy.submit_conversion(&identity).await.unwrap();
    assert_eq!(block_index, 77);
    let status = proxy.conversion_status(&identity, block_index).await.unwrap();
    assert_eq!(status, json!({"Signing": null}));

    let calls = proxy.transport().calls();
    assert_eq!(calls[0].method, "confirm_and_convert_ckbtc");
    assert_eq!(calls[0].kind, CallKind::Update);
    assert_eq!(calls[1].method, "query_converstion_status");
    assert_eq!(calls[1].kind, CallKind::Query);
    assert_eq!(calls[1].args, json!([77]));
}

#[tokio::test]
async fn etch_forwards_encoded_request() {
    let proxy = proxy();
    proxy
        .transport()
        .reply(methods::ETCH, Ok(json!(["c0ffee", "beef"])));
    let identity = test_identity("user-1");
    let adapter = SchemaAdapter::new(InterfaceGeneration::RangedTerms);
    let wire = adapter.encode_etching_request(&sample_request()).unwrap();

    let reply = proxy.etch(&identity, wire.clone()).await.unwrap();
    let result = adapter.decode_etching_result(&reply).unwrap();
    assert_eq!(result.commit_txid, "c0ffee");
    assert_eq!(result.reveal_txid, "beef");

    let calls = proxy.transport().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "etch_rune");
    assert_eq!(calls[0].kind, CallKind::Update);
    assert_eq!(calls[0].args, json!([wire]));
}

#[tokio::test]
async fn fee_estimate_is_a_query() {
    let proxy = proxy();
    proxy
        .transport()
        .reply(methods::ESTIMATE_CONVERSION_FEE, Ok(json!(1_500)));
    let identity = test_identity("user-1");

    assert_eq!(proxy.estimate_conversion_fee(&identity).await.unwrap(), 1_500);
    assert_eq!(proxy.transport().calls()[0].kind, CallKind::Query);
}

#[tokio::test]
async fn unexpected_reply_shapes_are_decode_errors() {
    let proxy = proxy();
    proxy
        .transport()
        .reply(methods::NATIVE_BALANCE, Ok(json!("lots")))
        .reply(methods::NATIVE_DEPOSIT_ADDRESS, Ok(json!(42)))
        .reply(methods::SUBMIT_CONVERSION, Ok(json!(-1)));
    let identity = test_identity("user-1");

    assert_matches!(
        proxy.native_balance(&identity).await,
        Err(TransportError::Decode { .. })
    );
    assert_matches!(
        proxy.native_deposit_address(&identity).await,
        Err(TransportError::Decode { .. })
    );
    assert_matches!(
        proxy.submit_conversion(&identity).await,
        Err(TransportError::Decode { .. })
    );
}

#[tokio::test]
async fn transport_errors_pass_through_unretried() {
    let proxy = proxy();
    proxy.transport().reply(
        methods::SUBMIT_CONVERSION,
        Err(TransportError::unreachable("connection reset")),
    );
    let identity = test_identity("user-1");

    assert_eq!(
        proxy.submit_conversion(&identity).await,
        Err(TransportError::unreachable("connection reset"))
    );
    assert_eq!(proxy.transport().calls().len(), 1);

    // Nothing scripted for the status method.
    assert_matches!(
        proxy.conversion_status(&identity, 1).await,
        Err(TransportError::Rejected { .. })
    );
}
