//! Scripted delegation provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use etcher_core::effects::{Delegation, DelegationError, DelegationProvider, DelegationRequest};
use etcher_core::Principal;
use parking_lot::Mutex;

#[derive(Debug)]
struct ProviderState {
    outcome: Result<Delegation, DelegationError>,
    delay: Option<Duration>,
    requests: Vec<DelegationRequest>,
}

/// [`DelegationProvider`] double with a fixed outcome.
#[derive(Debug, Clone)]
pub struct MockDelegationProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl MockDelegationProvider {
    /// Provider that signs `principal` in.
    pub fn succeeding(principal: &str) -> Self {
        Self::with_outcome(Ok(Delegation {
            principal: Principal::new(principal),
            credential: format!("delegation-for-{principal}").into_bytes(),
        }))
    }

    /// Provider that always fails with `error`.
    pub fn failing(error: DelegationError) -> Self {
        Self::with_outcome(Err(error))
    }

    fn with_outcome(outcome: Result<Delegation, DelegationError>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ProviderState {
                outcome,
                delay: None,
                requests: Vec::new(),
            })),
        }
    }

    /// Hold every flow open for `delay` before answering.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.state.lock().delay = Some(delay);
        self
    }

    /// Replace the outcome of subsequent flows.
    pub fn set_outcome(&self, outcome: Result<Delegation, DelegationError>) {
        self.state.lock().outcome = outcome;
    }

    /// Number of flows started.
    pub fn calls(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Requests received, oldest first.
    pub fn requests(&self) -> Vec<DelegationRequest> {
        self.state.lock().requests.clone()
    }
}

#[async_trait]
impl DelegationProvider for MockDelegationProvider {
    async fn delegate(&self, request: DelegationRequest) -> Result<Delegation, DelegationError> {
        let delay = {
            let mut state = self.state.lock();
            state.requests.push(request);
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state.lock().outcome.clone()
    }
}
