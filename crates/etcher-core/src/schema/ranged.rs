//! Second interface: optional scalars, terms carrying `(start, stop)` tuples.

use serde::{Deserialize, Serialize};

use super::{
    join_window, nat, split_window, symbol_from, InterfaceGeneration, InterfaceStrategy,
    SchemaError, WireValue,
};
use crate::types::EtchingRequest;

type Bounds = (Option<u64>, Option<u64>);

#[derive(Debug, Serialize, Deserialize)]
struct TermsArgs {
    #[serde(default, with = "nat::option")]
    cap: Option<u128>,
    #[serde(default, with = "nat::option")]
    amount: Option<u128>,
    #[serde(default)]
    height: Bounds,
    #[serde(default)]
    offset: Bounds,
}

#[derive(Debug, Serialize, Deserialize)]
struct EtchingArgs {
    #[serde(default)]
    divisibility: Option<u8>,
    #[serde(default)]
    rune: Option<String>,
    #[serde(default, with = "nat::option")]
    premine: Option<u128>,
    terms: TermsArgs,
    #[serde(default)]
    symbol: Option<u32>,
    #[serde(default)]
    turbo: bool,
    #[serde(default)]
    fee_rate: Option<u64>,
}

#[derive(Debug)]
pub(super) struct RangedTerms;

impl InterfaceStrategy for RangedTerms {
    fn generation(&self) -> InterfaceGeneration {
        InterfaceGeneration::RangedTerms
    }

    fn encode_etching(&self, request: &EtchingRequest) -> Result<WireValue, SchemaError> {
        let (height, offset) = split_window(request.mint_window.as_ref());
        let etching = EtchingArgs {
            divisibility: Some(request.divisibility),
            rune: Some(request.rune_name.clone()),
            premine: request.premine,
            terms: TermsArgs {
                cap: request.cap,
                amount: request.amount,
                height,
                offset,
            },
            symbol: Some(request.symbol_codepoint()),
            turbo: request.turbo,
            fee_rate: request.fee_rate,
        };
        serde_json::to_value(etching).map_err(|e| SchemaError::shape(self.generation(), e))
    }

    fn decode_etching(&self, wire: &WireValue) -> Result<EtchingRequest, SchemaError> {
        let etching: EtchingArgs = serde_json::from_value(wire.clone())
            .map_err(|e| SchemaError::shape(self.generation(), e))?;
        let rune_name = etching
            .rune
            .ok_or_else(|| SchemaError::shape(self.generation(), "missing rune"))?;
        let codepoint = etching
            .symbol
            .ok_or_else(|| SchemaError::shape(self.generation(), "missing symbol"))?;
        Ok(EtchingRequest {
            symbol: symbol_from(codepoint)?,
            rune_name,
            divisibility: etching.divisibility.unwrap_or_default(),
            amount: etching.terms.amount,
            cap: etching.terms.cap,
            premine: etching.premine,
            turbo: etching.turbo,
            mint_window: join_window(etching.terms.height, etching.terms.offset)?,
            fee_rate: etching.fee_rate,
        })
    }
}
