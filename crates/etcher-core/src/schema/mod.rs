//! # Schema Adapter
//!
//! The remote service has gone through three incompatible interface
//! generations. Everything generation-specific lives behind
//! [`SchemaAdapter`]; call sites only see the canonical model.
//!
//! ```text
//!                         ┌──────────────────────────┐
//!  EtchingRequest ───────►│ SchemaAdapter            │──► WireValue
//!  ConversionStatus ◄─────│   strategy per generation │◄── WireValue
//!                         └──────────────────────────┘
//!                           │ LegacyFlat     four flat window scalars, required fields
//!                           │ RangedTerms    optional terms with (start, stop) tuples
//!                           │ OptionalFields fully optional, remote defaults, text status
//! ```
//!
//! The generation is picked once from configuration. Large integers travel
//! as decimal strings so no JSON consumer truncates them.

mod flat;
mod nat;
mod optional;
mod ranged;
mod status;

pub use flat::mint_window_from_flat;
pub use status::{decode_status_text, encode_status_text};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::EtcherError;
use crate::types::{ConversionStatus, EtchingRequest, EtchingResult, MintWindow};

/// Untyped wire payload exchanged with the remote service.
pub type WireValue = serde_json::Value;

/// Interface generation the adapter speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceGeneration {
    /// Required scalars, four flat window bounds
    LegacyFlat,
    /// Optional terms with height and offset tuples
    RangedTerms,
    /// Fully optional fields with remote-side defaults, text status
    #[default]
    OptionalFields,
}

impl InterfaceGeneration {
    /// All known generations, oldest first.
    pub const ALL: [InterfaceGeneration; 3] =
        [Self::LegacyFlat, Self::RangedTerms, Self::OptionalFields];

    /// Configuration name of this generation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LegacyFlat => "legacy_flat",
            Self::RangedTerms => "ranged_terms",
            Self::OptionalFields => "optional_fields",
        }
    }

    /// Only the newest generation exposes fee estimation.
    pub fn supports_fee_estimation(&self) -> bool {
        matches!(self, Self::OptionalFields)
    }

    fn strategy(&self) -> Arc<dyn InterfaceStrategy> {
        match self {
            Self::LegacyFlat => Arc::new(flat::LegacyFlat),
            Self::RangedTerms => Arc::new(ranged::RangedTerms),
            Self::OptionalFields => Arc::new(optional::OptionalFields),
        }
    }
}

impl fmt::Display for InterfaceGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterfaceGeneration {
    type Err = EtcherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|generation| generation.as_str() == s.trim())
            .ok_or_else(|| EtcherError::config(format!("unknown interface generation '{s}'")))
    }
}

/// Request or response that cannot be mapped between the canonical model and
/// the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum SchemaError {
    /// Both height and offset bounds were supplied
    #[error("mint window carries both height and offset bounds")]
    AmbiguousMintWindow,

    /// A window was supplied without any bound
    #[error("{kind} mint window has neither start nor stop")]
    EmptyMintWindow {
        /// `"height"` or `"offset"`
        kind: &'static str,
    },

    /// Window the generation cannot tell apart from "no window"
    #[error("{kind} mint window with only zero bounds cannot be sent to the {generation} interface")]
    UnrepresentableMintWindow {
        /// Generation in use
        generation: InterfaceGeneration,
        /// `"height"` or `"offset"`
        kind: &'static str,
    },

    /// Divisibility above the protocol maximum
    #[error("divisibility {value} exceeds 38")]
    DivisibilityOutOfRange {
        /// Offending value
        value: u32,
    },

    /// Symbol is not a Unicode scalar value
    #[error("symbol {codepoint:#x} is not a valid code point")]
    InvalidSymbol {
        /// Offending code point
        codepoint: u32,
    },

    /// Payload does not match the generation's shape
    #[error("invalid {generation} payload: {reason}")]
    InvalidShape {
        /// Generation whose shape was expected
        generation: InterfaceGeneration,
        /// Deserializer message
        reason: String,
    },

    /// Remote response failed validation
    #[error("malformed response: {reason}")]
    MalformedResponse {
        /// What was wrong
        reason: String,
    },
}

impl SchemaError {
    pub(crate) fn shape(generation: InterfaceGeneration, reason: impl fmt::Display) -> Self {
        Self::InvalidShape {
            generation,
            reason: reason.to_string(),
        }
    }
}

/// Per-generation encode/decode rules.
trait InterfaceStrategy: Send + Sync + fmt::Debug {
    fn generation(&self) -> InterfaceGeneration;

    /// Encode an already validated request.
    fn encode_etching(&self, request: &EtchingRequest) -> Result<WireValue, SchemaError>;

    fn decode_etching(&self, wire: &WireValue) -> Result<EtchingRequest, SchemaError>;

    fn encode_status(&self, status: &ConversionStatus) -> WireValue {
        status::encode_structured(status)
    }

    fn decode_status(&self, wire: &WireValue) -> ConversionStatus {
        status::decode(wire)
    }
}

/// Translates between the canonical model and one interface generation.
#[derive(Debug, Clone)]
pub struct SchemaAdapter {
    strategy: Arc<dyn InterfaceStrategy>,
}

impl SchemaAdapter {
    /// Adapter for `generation`.
    pub fn new(generation: InterfaceGeneration) -> Self {
        Self {
            strategy: generation.strategy(),
        }
    }

    /// Generation this adapter speaks.
    pub fn generation(&self) -> InterfaceGeneration {
        self.strategy.generation()
    }

    /// Whether the remote side offers fee estimation.
    pub fn supports_fee_estimation(&self) -> bool {
        self.generation().supports_fee_estimation()
    }

    /// Encode a request for the wire.
    ///
    /// Deterministic. Absent optional fields are omitted where the wire shape
    /// allows it and replaced by their documented default (`0`, `false`)
    /// where it does not.
    pub fn encode_etching_request(&self, request: &EtchingRequest) -> Result<WireValue, SchemaError> {
        request.validate()?;
        self.strategy.encode_etching(request)
    }

    /// Decode a wire request back into the canonical model.
    pub fn decode_etching_request(&self, wire: &WireValue) -> Result<EtchingRequest, SchemaError> {
        let request = self.strategy.decode_etching(wire)?;
        request.validate()?;
        Ok(request)
    }

    /// Classify a wire status. Total: anything unrecognised is `Unknown`.
    pub fn decode_conversion_status(&self, wire: &WireValue) -> ConversionStatus {
        self.strategy.decode_status(wire)
    }

    /// Render a status the way this generation delivers it.
    pub fn encode_conversion_status(&self, status: &ConversionStatus) -> WireValue {
        self.strategy.encode_status(status)
    }

    /// Validate the `(commit, reveal)` pair returned by an etching.
    pub fn decode_etching_result(&self, wire: &WireValue) -> Result<EtchingResult, SchemaError> {
        let (commit_txid, reveal_txid) = match wire {
            WireValue::Array(items) if items.len() == 2 => (text_item(&items[0])?, text_item(&items[1])?),
            WireValue::Object(map) => (
                text_item(map.get("commit_txid").unwrap_or(&WireValue::Null))?,
                text_item(map.get("reveal_txid").unwrap_or(&WireValue::Null))?,
            ),
            other => {
                return Err(SchemaError::MalformedResponse {
                    reason: format!("expected a (commit, reveal) pair, got {other}"),
                })
            }
        };
        Ok(EtchingResult {
            commit_txid,
            reveal_txid,
        })
    }
}

impl Default for SchemaAdapter {
    fn default() -> Self {
        Self::new(InterfaceGeneration::default())
    }
}

fn text_item(value: &WireValue) -> Result<String, SchemaError> {
    match value.as_str().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(SchemaError::MalformedResponse {
            reason: format!("transaction id must be non-empty text, got {value}"),
        }),
    }
}

/// Split a canonical window into `(height, offset)` bound pairs.
pub(crate) fn split_window(
    window: Option<&MintWindow>,
) -> ((Option<u64>, Option<u64>), (Option<u64>, Option<u64>)) {
    match window {
        Some(MintWindow::Height { start, stop }) => ((*start, *stop), (None, None)),
        Some(MintWindow::Offset { start, stop }) => ((None, None), (*start, *stop)),
        None => ((None, None), (None, None)),
    }
}

/// Rebuild a window from bound pairs; both kinds at once are ambiguous.
pub(crate) fn join_window(
    height: (Option<u64>, Option<u64>),
    offset: (Option<u64>, Option<u64>),
) -> Result<Option<MintWindow>, SchemaError> {
    let has_height = height != (None, None);
    let has_offset = offset != (None, None);
    match (has_height, has_offset) {
        (true, true) => Err(SchemaError::AmbiguousMintWindow),
        (true, false) => Ok(Some(MintWindow::Height {
            start: height.0,
            stop: height.1,
        })),
        (false, true) => Ok(Some(MintWindow::Offset {
            start: offset.0,
            stop: offset.1,
        })),
        (false, false) => Ok(None),
    }
}

/// Decode a code point into the canonical symbol.
pub(crate) fn symbol_from(codepoint: u32) -> Result<char, SchemaError> {
    char::from_u32(codepoint).ok_or(SchemaError::InvalidSymbol { codepoint })
}
