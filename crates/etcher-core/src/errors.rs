//! Unified error type for etcher operations
//!
//! One enum covers the whole taxonomy so callers can match on the failure
//! class without unwrapping layers of wrappers:
//!
//! - `Auth`: delegation failed or was rejected; the session stays signed out
//! - `Schema`: the request could not be expressed on the wire; nothing was sent
//! - `Tracking`: polling ran out of retries; the record is kept
//! - `ConcurrentOperation`: a mutating call is already in flight
//! - `RemoteUnavailable`: a read-only query kept failing after retries
//! - `Transport`: a mutating call failed on the wire; never retried

use std::fmt;

use serde::Serialize;

use crate::effects::TransportError;
use crate::schema::{InterfaceGeneration, SchemaError};
use crate::types::BlockIndex;

/// Mutating operations guarded by the coordinator's single in-flight slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MutatingOperation {
    /// Deposit-to-ledger-asset conversion submission
    SubmitConversion,
    /// Rune etching
    Etch,
}

impl fmt::Display for MutatingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubmitConversion => write!(f, "conversion submission"),
            Self::Etch => write!(f, "etching"),
        }
    }
}

/// Unified error type for all etcher operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum EtcherError {
    /// Delegation failed or was rejected
    #[error("Authentication failed: {reason}")]
    Auth {
        /// Reason reported by the provider
        reason: String,
    },

    /// An operation needs a signed-in session
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Request could not be mapped onto the wire
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Polling exhausted its retry budget
    #[error("Tracking of block {block_index} stopped after {attempts} failed polls: {last_error}")]
    Tracking {
        /// Conversion being tracked
        block_index: BlockIndex,
        /// Consecutive failed polls
        attempts: u32,
        /// Last transport failure
        last_error: TransportError,
    },

    /// A mutating operation is already in flight
    #[error("Another {in_flight} is already in flight")]
    ConcurrentOperation {
        /// Operation holding the slot
        in_flight: MutatingOperation,
    },

    /// Read-only query kept failing
    #[error("Remote service unavailable for {operation} after {attempts} attempts: {last_error}")]
    RemoteUnavailable {
        /// Query that failed
        operation: &'static str,
        /// Attempts made
        attempts: u32,
        /// Last transport failure
        last_error: TransportError,
    },

    /// Mutating call failed on the wire
    #[error("Transport error: {0}")]
    Transport(TransportError),

    /// Balance guard rejected a conversion
    #[error("Insufficient balance: {balance} (minimum {minimum})")]
    InsufficientBalance {
        /// Balance observed
        balance: u64,
        /// Required minimum
        minimum: u64,
    },

    /// Operation is not offered by the configured interface generation
    #[error("{operation} is not supported by the {generation} interface")]
    Unsupported {
        /// Operation requested
        operation: &'static str,
        /// Generation in use
        generation: InterfaceGeneration,
    },

    /// Tracking was cancelled before a terminal status
    #[error("Tracking cancelled")]
    Cancelled,

    /// Configuration is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong
        message: String,
    },
}

impl EtcherError {
    /// Create an authentication error
    pub fn auth(reason: impl Into<String>) -> Self {
        Self::Auth {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Failure class for frontend handling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Auth { .. } | Self::NotAuthenticated => ErrorCategory::Auth,
            Self::Schema(_) | Self::InsufficientBalance { .. } | Self::Config { .. } => {
                ErrorCategory::Input
            }
            Self::Tracking { .. } | Self::RemoteUnavailable { .. } | Self::Transport(_) => {
                ErrorCategory::Network
            }
            Self::ConcurrentOperation { .. } => ErrorCategory::Conflict,
            Self::Unsupported { .. } | Self::Cancelled => ErrorCategory::Operation,
        }
    }

    /// Whether calling again without changing anything may succeed.
    ///
    /// Mutating transport failures are not retryable: the remote side may
    /// already have acted on the first call.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Auth { .. }
            | Self::NotAuthenticated
            | Self::Tracking { .. }
            | Self::ConcurrentOperation { .. }
            | Self::RemoteUnavailable { .. } => true,
            Self::Transport(_)
            | Self::Schema(_)
            | Self::InsufficientBalance { .. }
            | Self::Unsupported { .. }
            | Self::Cancelled
            | Self::Config { .. } => false,
        }
    }
}

/// High-level error categories for frontend error handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCategory {
    /// Correctable by changing the request or settings
    Input,
    /// Sign-in required or rejected
    Auth,
    /// Remote service or connectivity
    Network,
    /// Another operation holds the slot
    Conflict,
    /// Everything else
    Operation,
}

impl ErrorCategory {
    /// Short label for this category.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Input => "Input",
            Self::Auth => "Sign-in",
            Self::Network => "Network",
            Self::Conflict => "Busy",
            Self::Operation => "Operation",
        }
    }

    /// Hint for the user on how to resolve this category of error.
    pub fn resolution_hint(&self) -> &'static str {
        match self {
            Self::Input => "Check the request and try again",
            Self::Auth => "Sign in again",
            Self::Network => "Check your connection and retry",
            Self::Conflict => "Wait for the running operation to finish",
            Self::Operation => "The operation could not be completed",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Standard Result type for etcher operations
pub type Result<T> = std::result::Result<T, EtcherError>;
