use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::types::Principal;

/// Error type for the delegation flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum DelegationError {
    /// Provider refused to delegate
    #[error("Delegation rejected: {reason}")]
    Rejected {
        /// Reason given by the provider
        reason: String,
    },

    /// User abandoned the flow
    #[error("Delegation window closed by the user")]
    Cancelled,

    /// Provider could not be reached
    #[error("Identity provider unavailable: {message}")]
    ProviderUnavailable {
        /// Underlying failure
        message: String,
    },
}

/// Parameters of one sign-in attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationRequest {
    /// Identity provider to delegate through
    pub provider_url: String,
    /// Longest lifetime the delegation may have
    pub max_time_to_live: Duration,
}

/// Successful delegation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegation {
    /// Principal the credential signs for
    pub principal: Principal,
    /// Opaque delegated credential
    pub credential: Vec<u8>,
}

/// External authentication provider.
#[async_trait]
pub trait DelegationProvider: Send + Sync {
    /// Run the interactive flow until the provider reports success or failure.
    async fn delegate(&self, request: DelegationRequest) -> Result<Delegation, DelegationError>;
}
