use async_trait::async_trait;
use serde::Serialize;

use crate::schema::WireValue;
use crate::types::{BlockIndex, Identity};

/// Error type for remote calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum TransportError {
    /// No connection to the remote service
    #[error("Remote unreachable: {message}")]
    Unreachable {
        /// Underlying failure
        message: String,
    },

    /// No reply within the call deadline
    #[error("Timeout after {timeout_ms}ms")]
    Timeout {
        /// Deadline that elapsed
        timeout_ms: u64,
    },

    /// The remote side refused the call
    #[error("Call rejected ({code}): {message}")]
    Rejected {
        /// Reject code reported by the platform
        code: u32,
        /// Reject message
        message: String,
    },

    /// Reply did not have the expected shape
    #[error("Undecodable reply: {message}")]
    Decode {
        /// What was wrong with the reply
        message: String,
    },
}

impl TransportError {
    /// Create an unreachable error
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// How a call is executed by the remote platform.
///
/// Independent of idempotency: some read-only methods run as updates because
/// they reach other services on the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Answered by a single replica, no consensus
    Query,
    /// Goes through consensus
    Update,
}

/// Method names exported by the remote service.
pub mod methods {
    use super::CallKind;

    /// Native currency deposit address
    pub const NATIVE_DEPOSIT_ADDRESS: &str = "get_deposit_address_for_bitcoin";
    /// Ledger asset deposit address
    pub const LEDGER_DEPOSIT_ADDRESS: &str = "get_deposit_address_for_ckbtc";
    /// Native currency balance
    pub const NATIVE_BALANCE: &str = "get_btc_balance";
    /// Convert the deposited balance
    pub const SUBMIT_CONVERSION: &str = "confirm_and_convert_ckbtc";
    /// Status of one conversion.
    ///
    /// The misspelling is part of the deployed interface.
    pub const CONVERSION_STATUS: &str = "query_converstion_status";
    /// Etch a rune
    pub const ETCH: &str = "etch_rune";
    /// Conversion fee, newest interface only
    pub const ESTIMATE_CONVERSION_FEE: &str = "estimate_conversion_fee";

    /// Call kind of a known method; `None` for anything else.
    pub fn kind_of(method: &str) -> Option<CallKind> {
        match method {
            LEDGER_DEPOSIT_ADDRESS | CONVERSION_STATUS | ESTIMATE_CONVERSION_FEE => {
                Some(CallKind::Query)
            }
            NATIVE_DEPOSIT_ADDRESS | NATIVE_BALANCE | SUBMIT_CONVERSION | ETCH => {
                Some(CallKind::Update)
            }
            _ => None,
        }
    }
}

/// Untyped wire to the remote service.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Invoke `method` with `args` on behalf of `identity`.
    async fn call(
        &self,
        identity: &Identity,
        kind: CallKind,
        method: &str,
        args: WireValue,
    ) -> Result<WireValue, TransportError>;
}

/// Typed call surface of the remote etcher service.
///
/// Status and etching payloads stay as [`WireValue`]s here; only the schema
/// adapter interprets them.
#[async_trait]
pub trait EtcherService: Send + Sync {
    /// Native-currency deposit address of the caller.
    async fn native_deposit_address(&self, identity: &Identity) -> Result<String, TransportError>;

    /// Wrapped-asset deposit account of the caller.
    async fn ledger_deposit_address(&self, identity: &Identity) -> Result<String, TransportError>;

    /// Native balance in the smallest unit.
    async fn native_balance(&self, identity: &Identity) -> Result<u64, TransportError>;

    /// Submit a conversion; not idempotent.
    async fn submit_conversion(&self, identity: &Identity) -> Result<BlockIndex, TransportError>;

    /// Raw status of the conversion keyed by `block_index`.
    async fn conversion_status(
        &self,
        identity: &Identity,
        block_index: BlockIndex,
    ) -> Result<WireValue, TransportError>;

    /// Etch a rune from an encoded request; not idempotent.
    async fn etch(&self, identity: &Identity, request: WireValue)
        -> Result<WireValue, TransportError>;

    /// Fee the minter will charge for a conversion.
    async fn estimate_conversion_fee(&self, identity: &Identity) -> Result<u64, TransportError>;
}
