//! Oldest interface: every scalar required, window as four flat bounds.
//!
//! Absent canonical values are sent as `0`/`false`, and a window pair whose
//! bounds are both zero is read as "not set". Decoding therefore yields the
//! defaults, not `None`, for anything that was absent when encoded. A window
//! whose set bounds are all zero would vanish on the way, so it is rejected.

use serde::{Deserialize, Serialize};

use super::{
    join_window, nat, split_window, symbol_from, InterfaceGeneration, InterfaceStrategy,
    SchemaError, WireValue,
};
use crate::types::{EtchingRequest, MintWindow};

#[derive(Debug, Serialize, Deserialize)]
struct FlatEtchingArgs {
    rune: String,
    symbol: u32,
    divisibility: u8,
    #[serde(with = "nat")]
    amount: u128,
    #[serde(with = "nat")]
    cap: u128,
    #[serde(default, with = "nat::option")]
    premine: Option<u128>,
    height_start: u64,
    height_stop: u64,
    offset_start: u64,
    offset_stop: u64,
    turbo: bool,
    #[serde(default)]
    fee_rate: Option<u64>,
}

#[derive(Debug)]
pub(super) struct LegacyFlat;

impl InterfaceStrategy for LegacyFlat {
    fn generation(&self) -> InterfaceGeneration {
        InterfaceGeneration::LegacyFlat
    }

    fn encode_etching(&self, request: &EtchingRequest) -> Result<WireValue, SchemaError> {
        if let Some(window) = &request.mint_window {
            let (start, stop) = window.bounds();
            if start.unwrap_or_default() == 0 && stop.unwrap_or_default() == 0 {
                return Err(SchemaError::UnrepresentableMintWindow {
                    generation: self.generation(),
                    kind: window.kind(),
                });
            }
        }
        let ((height_start, height_stop), (offset_start, offset_stop)) =
            split_window(request.mint_window.as_ref());
        let args = FlatEtchingArgs {
            rune: request.rune_name.clone(),
            symbol: request.symbol_codepoint(),
            divisibility: request.divisibility,
            amount: request.amount.unwrap_or_default(),
            cap: request.cap.unwrap_or_default(),
            premine: request.premine,
            height_start: height_start.unwrap_or_default(),
            height_stop: height_stop.unwrap_or_default(),
            offset_start: offset_start.unwrap_or_default(),
            offset_stop: offset_stop.unwrap_or_default(),
            turbo: request.turbo,
            fee_rate: request.fee_rate,
        };
        serde_json::to_value(args).map_err(|e| SchemaError::shape(self.generation(), e))
    }

    fn decode_etching(&self, wire: &WireValue) -> Result<EtchingRequest, SchemaError> {
        let args: FlatEtchingArgs = serde_json::from_value(wire.clone())
            .map_err(|e| SchemaError::shape(self.generation(), e))?;
        Ok(EtchingRequest {
            symbol: symbol_from(args.symbol)?,
            rune_name: args.rune,
            divisibility: args.divisibility,
            amount: Some(args.amount),
            cap: Some(args.cap),
            premine: args.premine,
            turbo: args.turbo,
            mint_window: mint_window_from_flat(
                args.height_start,
                args.height_stop,
                args.offset_start,
                args.offset_stop,
            )?,
            fee_rate: args.fee_rate,
        })
    }
}

/// Rebuild a window from the four flat bounds.
///
/// A pair counts as set when either bound is non-zero. Both pairs set is
/// ambiguous and rejected outright.
pub fn mint_window_from_flat(
    height_start: u64,
    height_stop: u64,
    offset_start: u64,
    offset_stop: u64,
) -> Result<Option<MintWindow>, SchemaError> {
    let pair = |start: u64, stop: u64| {
        if start == 0 && stop == 0 {
            (None, None)
        } else {
            (Some(start), Some(stop))
        }
    };
    join_window(
        pair(height_start, height_stop),
        pair(offset_start, offset_stop),
    )
}
