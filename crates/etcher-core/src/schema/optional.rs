//! Newest interface: optional fields with remote-side defaults.
//!
//! Conversion status arrives as free text here.

use serde::{Deserialize, Serialize};

use super::{
    join_window, nat, split_window, status, symbol_from, InterfaceGeneration, InterfaceStrategy,
    SchemaError, WireValue,
};
use crate::types::{ConversionStatus, EtchingRequest};

type Bounds = (Option<u64>, Option<u64>);

#[derive(Debug, Serialize, Deserialize)]
struct EtchingArgs {
    rune: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    symbol: Option<u32>,
    #[serde(default)]
    divisibility: u8,
    #[serde(
        default,
        with = "nat::option",
        skip_serializing_if = "Option::is_none"
    )]
    amount: Option<u128>,
    #[serde(
        default,
        with = "nat::option",
        skip_serializing_if = "Option::is_none"
    )]
    cap: Option<u128>,
    #[serde(
        default,
        with = "nat::option",
        skip_serializing_if = "Option::is_none"
    )]
    premine: Option<u128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    height: Option<Bounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    offset: Option<Bounds>,
    #[serde(default)]
    turbo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fee_rate: Option<u64>,
}

#[derive(Debug)]
pub(super) struct OptionalFields;

impl InterfaceStrategy for OptionalFields {
    fn generation(&self) -> InterfaceGeneration {
        InterfaceGeneration::OptionalFields
    }

    fn encode_etching(&self, request: &EtchingRequest) -> Result<WireValue, SchemaError> {
        let (height, offset) = split_window(request.mint_window.as_ref());
        let present = |bounds: Bounds| (bounds != (None, None)).then_some(bounds);
        let args = EtchingArgs {
            rune: request.rune_name.clone(),
            symbol: Some(request.symbol_codepoint()),
            divisibility: request.divisibility,
            amount: request.amount,
            cap: request.cap,
            premine: request.premine,
            height: present(height),
            offset: present(offset),
            turbo: request.turbo,
            fee_rate: request.fee_rate,
        };
        serde_json::to_value(args).map_err(|e| SchemaError::shape(self.generation(), e))
    }

    fn decode_etching(&self, wire: &WireValue) -> Result<EtchingRequest, SchemaError> {
        let args: EtchingArgs = serde_json::from_value(wire.clone())
            .map_err(|e| SchemaError::shape(self.generation(), e))?;
        let codepoint = args
            .symbol
            .ok_or_else(|| SchemaError::shape(self.generation(), "missing symbol"))?;
        Ok(EtchingRequest {
            symbol: symbol_from(codepoint)?,
            rune_name: args.rune,
            divisibility: args.divisibility,
            amount: args.amount,
            cap: args.cap,
            premine: args.premine,
            turbo: args.turbo,
            mint_window: join_window(
                args.height.unwrap_or_default(),
                args.offset.unwrap_or_default(),
            )?,
            fee_rate: args.fee_rate,
        })
    }

    fn encode_status(&self, status: &ConversionStatus) -> WireValue {
        WireValue::String(status::encode_status_text(status))
    }
}
