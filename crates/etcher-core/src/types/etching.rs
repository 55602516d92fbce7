//! Canonical etching request and result.

use serde::{Deserialize, Serialize};

use crate::schema::SchemaError;

/// Highest divisibility a rune may declare.
pub const MAX_DIVISIBILITY: u8 = 38;

/// Block bounds during which minting is open.
///
/// A window is expressed either in absolute block heights or in offsets from
/// the etching block, never both. Each bound is optional; at least one must
/// be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MintWindow {
    /// Absolute block heights
    Height {
        /// First height at which minting opens
        start: Option<u64>,
        /// Height at which minting closes
        stop: Option<u64>,
    },
    /// Offsets relative to the etching block
    Offset {
        /// First offset at which minting opens
        start: Option<u64>,
        /// Offset at which minting closes
        stop: Option<u64>,
    },
}

impl MintWindow {
    /// `(start, stop)` regardless of the bound kind.
    pub fn bounds(&self) -> (Option<u64>, Option<u64>) {
        match *self {
            Self::Height { start, stop } | Self::Offset { start, stop } => (start, stop),
        }
    }

    /// A window with neither bound set.
    pub fn is_empty(&self) -> bool {
        self.bounds() == (None, None)
    }

    /// `"height"` or `"offset"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Height { .. } => "height",
            Self::Offset { .. } => "offset",
        }
    }
}

/// Request to etch a new rune.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtchingRequest {
    /// Currency symbol, a single code point
    pub symbol: char,
    /// Rune name; alphabet rules are enforced by the remote service
    pub rune_name: String,
    /// Decimal places, `0..=38`
    pub divisibility: u8,
    /// Supply per mint operation; `None` leaves terms open
    pub amount: Option<u128>,
    /// Maximum number of mints; `None` means uncapped
    pub cap: Option<u128>,
    /// Supply reserved for the etcher; `None` means zero
    pub premine: Option<u128>,
    /// Opt in to future protocol changes
    pub turbo: bool,
    /// Height or offset bounds for minting
    pub mint_window: Option<MintWindow>,
    /// Fee rate in sat/vB; `None` lets the remote service choose
    pub fee_rate: Option<u64>,
}

impl EtchingRequest {
    /// Minimal request with open terms.
    pub fn new(rune_name: impl Into<String>, symbol: char) -> Self {
        Self {
            symbol,
            rune_name: rune_name.into(),
            divisibility: 0,
            amount: None,
            cap: None,
            premine: None,
            turbo: false,
            mint_window: None,
            fee_rate: None,
        }
    }

    /// Set divisibility.
    pub fn with_divisibility(mut self, divisibility: u8) -> Self {
        self.divisibility = divisibility;
        self
    }

    /// Set the per-mint amount and the mint cap.
    pub fn with_terms(mut self, amount: Option<u128>, cap: Option<u128>) -> Self {
        self.amount = amount;
        self.cap = cap;
        self
    }

    /// Set the premine.
    pub fn with_premine(mut self, premine: u128) -> Self {
        self.premine = Some(premine);
        self
    }

    /// Set the turbo flag.
    pub fn with_turbo(mut self, turbo: bool) -> Self {
        self.turbo = turbo;
        self
    }

    /// Set the mint window.
    pub fn with_mint_window(mut self, window: MintWindow) -> Self {
        self.mint_window = Some(window);
        self
    }

    /// Set an explicit fee rate.
    pub fn with_fee_rate(mut self, fee_rate: u64) -> Self {
        self.fee_rate = Some(fee_rate);
        self
    }

    /// Symbol as a numeric code point.
    pub fn symbol_codepoint(&self) -> u32 {
        u32::from(self.symbol)
    }

    /// Local checks that do not need the remote service.
    ///
    /// Rune-name alphabet rules are left to the remote side.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.divisibility > MAX_DIVISIBILITY {
            return Err(SchemaError::DivisibilityOutOfRange {
                value: u32::from(self.divisibility),
            });
        }
        if let Some(window) = &self.mint_window {
            if window.is_empty() {
                return Err(SchemaError::EmptyMintWindow {
                    kind: window.kind(),
                });
            }
        }
        Ok(())
    }
}

/// Transaction ids returned by a successful etching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtchingResult {
    /// Commit transaction id
    pub commit_txid: String,
    /// Reveal transaction id
    pub reveal_txid: String,
}
