//! Property test strategies for etcher types
//!
//! Composable proptest strategies for the canonical model. Generated values
//! are always valid inputs: requests pass local validation and windows carry
//! at least one bound.
//!
//! # Example
//!
//! ```rust,ignore
//! use etcher_testkit::strategies::arb_etching_request;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn request_is_valid(request in arb_etching_request()) {
//!         prop_assert!(request.validate().is_ok());
//!     }
//! }
//! ```

use proptest::option;
use proptest::prelude::*;

// Re-export proptest for convenience
pub use proptest;

use etcher_core::types::MAX_DIVISIBILITY;
use etcher_core::{
    Account, ConversionStatus, EtchingRequest, MintWindow, ReimbursementDeposit,
    ReimbursementReason, Txid,
};

/// Block bound, with zero drawn often since it is a wire sentinel.
fn arb_bound() -> impl Strategy<Value = u64> {
    prop_oneof![1 => Just(0u64), 4 => 1u64..10_000_000]
}

/// Mint window with at least one bound set.
pub fn arb_mint_window() -> impl Strategy<Value = MintWindow> {
    (
        any::<bool>(),
        option::of(arb_bound()),
        option::of(arb_bound()),
    )
        .prop_filter("window needs a bound", |(_, start, stop)| {
            start.is_some() || stop.is_some()
        })
        .prop_map(|(height, start, stop)| {
            if height {
                MintWindow::Height { start, stop }
            } else {
                MintWindow::Offset { start, stop }
            }
        })
}

/// Valid etching request.
pub fn arb_etching_request() -> impl Strategy<Value = EtchingRequest> {
    (
        "[A-Z]{1,26}",
        any::<char>(),
        0..=MAX_DIVISIBILITY,
        option::of(any::<u128>()),
        option::of(any::<u128>()),
        option::of(any::<u128>()),
        any::<bool>(),
        option::of(arb_mint_window()),
        option::of(1u64..2_000),
    )
        .prop_map(
            |(rune_name, symbol, divisibility, amount, cap, premine, turbo, mint_window, fee_rate)| {
                EtchingRequest {
                    symbol,
                    rune_name,
                    divisibility,
                    amount,
                    cap,
                    premine,
                    turbo,
                    mint_window,
                    fee_rate,
                }
            },
        )
}

/// Non-empty transaction id.
pub fn arb_txid() -> impl Strategy<Value = Txid> {
    proptest::collection::vec(any::<u8>(), 1..=32).prop_map(Txid::new)
}

/// Reimbursement with either reason.
pub fn arb_reimbursement() -> impl Strategy<Value = ReimbursementDeposit> {
    let reason = prop_oneof![
        Just(ReimbursementReason::CallFailed),
        (any::<u64>(), "[a-z0-9-]{5,27}").prop_map(|(kyt_fee, kyt_provider)| {
            ReimbursementReason::TaintedDestination {
                kyt_fee,
                kyt_provider,
            }
        }),
    ];
    (
        "[a-z0-9-]{5,63}",
        option::of(proptest::collection::vec(any::<u8>(), 32)),
        any::<u64>(),
        any::<u64>(),
        reason,
    )
        .prop_map(|(owner, subaccount, mint_block_index, amount, reason)| {
            ReimbursementDeposit {
                account: Account { owner, subaccount },
                mint_block_index,
                amount,
                reason,
            }
        })
}

/// Any conversion status.
pub fn arb_conversion_status() -> impl Strategy<Value = ConversionStatus> {
    prop_oneof![
        Just(ConversionStatus::Pending),
        Just(ConversionStatus::Signing),
        arb_txid().prop_map(|txid| ConversionStatus::Submitted { txid }),
        arb_txid().prop_map(|txid| ConversionStatus::Sending { txid }),
        arb_txid().prop_map(|txid| ConversionStatus::Confirmed { txid }),
        Just(ConversionStatus::AmountTooLow),
        arb_reimbursement().prop_map(ConversionStatus::WillReimburse),
        arb_reimbursement().prop_map(ConversionStatus::Reimbursed),
        Just(ConversionStatus::Unknown),
    ]
}

/// Arbitrary JSON, for decoder totality checks.
pub fn arb_wire_value() -> impl Strategy<Value = serde_json::Value> {
    let leaf = prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::from),
        any::<i64>().prop_map(serde_json::Value::from),
        ".{0,24}".prop_map(serde_json::Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::from),
            proptest::collection::hash_map("[A-Za-z_]{1,14}", inner, 0..3).prop_map(|map| {
                serde_json::Value::Object(map.into_iter().collect())
            }),
        ]
    })
}
