//! Scripted remote service.
//!
//! `MockEtcherService` answers every [`EtcherService`] call from in-memory
//! state. Conversion statuses are played back from a queue, encoded through
//! the schema adapter of the chosen generation so the client decodes exactly
//! what a real deployment of that generation would send. Once the queue is
//! drained the last entry repeats.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use etcher_core::effects::{EtcherService, TransportError};
use etcher_core::{
    BlockIndex, ConversionStatus, DepositAddresses, Identity, InterfaceGeneration,
    SchemaAdapter, WireValue,
};
use parking_lot::Mutex;
use serde_json::json;

/// Call surface of [`EtcherService`], for counters and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceMethod {
    /// `native_deposit_address`
    NativeDepositAddress,
    /// `ledger_deposit_address`
    LedgerDepositAddress,
    /// `native_balance`
    NativeBalance,
    /// `submit_conversion`
    SubmitConversion,
    /// `conversion_status`
    ConversionStatus,
    /// `etch`
    Etch,
    /// `estimate_conversion_fee`
    EstimateConversionFee,
}

type StatusReply = Result<WireValue, TransportError>;

#[derive(Debug)]
struct MockState {
    addresses: DepositAddresses,
    balance: u64,
    fee: u64,
    next_block_index: BlockIndex,
    statuses: VecDeque<StatusReply>,
    last_status: Option<StatusReply>,
    etch_response: Result<WireValue, TransportError>,
    etch_requests: Vec<WireValue>,
    status_queries: Vec<BlockIndex>,
    failures: HashMap<ServiceMethod, VecDeque<TransportError>>,
    delays: HashMap<ServiceMethod, Duration>,
    calls: HashMap<ServiceMethod, u32>,
}

/// Scripted [`EtcherService`] double.
#[derive(Debug, Clone)]
pub struct MockEtcherService {
    adapter: SchemaAdapter,
    state: Arc<Mutex<MockState>>,
}

impl MockEtcherService {
    /// Service speaking `generation`, with a zero balance and no statuses.
    pub fn new(generation: InterfaceGeneration) -> Self {
        Self {
            adapter: SchemaAdapter::new(generation),
            state: Arc::new(Mutex::new(MockState {
                addresses: DepositAddresses {
                    native: "bcrt1qmockdepositaddress".to_string(),
                    ledger_asset: "mock-ledger-account".to_string(),
                },
                balance: 0,
                fee: 0,
                next_block_index: 1,
                statuses: VecDeque::new(),
                last_status: None,
                etch_response: Ok(json!(["commit-txid", "reveal-txid"])),
                etch_requests: Vec::new(),
                status_queries: Vec::new(),
                failures: HashMap::new(),
                delays: HashMap::new(),
                calls: HashMap::new(),
            })),
        }
    }

    /// Set the native balance.
    pub fn with_balance(self, balance: u64) -> Self {
        self.set_balance(balance);
        self
    }

    /// Queue statuses to be returned by successive polls.
    pub fn with_statuses(self, statuses: impl IntoIterator<Item = ConversionStatus>) -> Self {
        for status in statuses {
            self.push_status(status);
        }
        self
    }

    /// Set the fee returned by fee estimation.
    pub fn with_fee(self, fee: u64) -> Self {
        self.state.lock().fee = fee;
        self
    }

    /// Set the deposit addresses.
    pub fn with_addresses(self, addresses: DepositAddresses) -> Self {
        self.state.lock().addresses = addresses;
        self
    }

    /// Block index the next submission returns.
    pub fn with_next_block_index(self, block_index: BlockIndex) -> Self {
        self.state.lock().next_block_index = block_index;
        self
    }

    /// Delay every call to `method` by `delay`.
    pub fn with_delay(self, method: ServiceMethod, delay: Duration) -> Self {
        self.state.lock().delays.insert(method, delay);
        self
    }

    /// Change the native balance.
    pub fn set_balance(&self, balance: u64) {
        self.state.lock().balance = balance;
    }

    /// Queue one status, encoded for this service's generation.
    pub fn push_status(&self, status: ConversionStatus) {
        let wire = self.adapter.encode_conversion_status(&status);
        self.state.lock().statuses.push_back(Ok(wire));
    }

    /// Queue a raw wire status, bypassing the adapter.
    pub fn push_raw_status(&self, wire: WireValue) {
        self.state.lock().statuses.push_back(Ok(wire));
    }

    /// Queue a failed poll.
    pub fn push_status_error(&self, error: TransportError) {
        self.state.lock().statuses.push_back(Err(error));
    }

    /// Make the next call to `method` fail with `error`.
    ///
    /// Stacks: calling this twice fails the next two calls.
    pub fn fail_next(&self, method: ServiceMethod, error: TransportError) {
        self.state
            .lock()
            .failures
            .entry(method)
            .or_default()
            .push_back(error);
    }

    /// Reply returned by etching.
    pub fn set_etch_response(&self, response: Result<WireValue, TransportError>) {
        self.state.lock().etch_response = response;
    }

    /// Number of calls made to `method`, failed ones included.
    pub fn calls(&self, method: ServiceMethod) -> u32 {
        self.state.lock().calls.get(&method).copied().unwrap_or(0)
    }

    /// Encoded etching requests received, oldest first.
    pub fn etch_requests(&self) -> Vec<WireValue> {
        self.state.lock().etch_requests.clone()
    }

    /// Block indexes polled, oldest first.
    pub fn status_queries(&self) -> Vec<BlockIndex> {
        self.state.lock().status_queries.clone()
    }

    /// Count the call, wait out any configured delay, then consume an
    /// injected failure if one is queued.
    async fn enter(&self, method: ServiceMethod) -> Result<(), TransportError> {
        let delay = {
            let mut state = self.state.lock();
            *state.calls.entry(method).or_default() += 1;
            state.delays.get(&method).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self
            .state
            .lock()
            .failures
            .get_mut(&method)
            .and_then(VecDeque::pop_front);
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl EtcherService for MockEtcherService {
    async fn native_deposit_address(&self, _identity: &Identity) -> Result<String, TransportError> {
        self.enter(ServiceMethod::NativeDepositAddress).await?;
        Ok(self.state.lock().addresses.native.clone())
    }

    async fn ledger_deposit_address(&self, _identity: &Identity) -> Result<String, TransportError> {
        self.enter(ServiceMethod::LedgerDepositAddress).await?;
        Ok(self.state.lock().addresses.ledger_asset.clone())
    }

    async fn native_balance(&self, _identity: &Identity) -> Result<u64, TransportError> {
        self.enter(ServiceMethod::NativeBalance).await?;
        Ok(self.state.lock().balance)
    }

    async fn submit_conversion(&self, _identity: &Identity) -> Result<BlockIndex, TransportError> {
        self.enter(ServiceMethod::SubmitConversion).await?;
        let mut state = self.state.lock();
        let block_index = state.next_block_index;
        state.next_block_index += 1;
        Ok(block_index)
    }

    async fn conversion_status(
        &self,
        _identity: &Identity,
        block_index: BlockIndex,
    ) -> Result<WireValue, TransportError> {
        self.enter(ServiceMethod::ConversionStatus).await?;
        let mut state = self.state.lock();
        state.status_queries.push(block_index);
        match state.statuses.pop_front() {
            Some(reply) => {
                state.last_status = Some(reply.clone());
                reply
            }
            None => state.last_status.clone().unwrap_or_else(|| {
                Ok(self
                    .adapter
                    .encode_conversion_status(&ConversionStatus::Pending))
            }),
        }
    }

    async fn etch(
        &self,
        _identity: &Identity,
        request: WireValue,
    ) -> Result<WireValue, TransportError> {
        self.state.lock().etch_requests.push(request);
        self.enter(ServiceMethod::Etch).await?;
        self.state.lock().etch_response.clone()
    }

    async fn estimate_conversion_fee(&self, _identity: &Identity) -> Result<u64, TransportError> {
        self.enter(ServiceMethod::EstimateConversionFee).await?;
        Ok(self.state.lock().fee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test_identity;

    #[tokio::test]
    async fn test_statuses_repeat_last() {
        let service = MockEtcherService::new(InterfaceGeneration::RangedTerms)
            .with_statuses([ConversionStatus::Signing, ConversionStatus::AmountTooLow]);
        let identity = test_identity("aaaaa-aa");
        let adapter = SchemaAdapter::new(InterfaceGeneration::RangedTerms);

        let mut seen = Vec::new();
        for _ in 0..3 {
            let wire = service.conversion_status(&identity, 4).await.unwrap();
            seen.push(adapter.decode_conversion_status(&wire));
        }
        assert_eq!(
            seen,
            vec![
                ConversionStatus::Signing,
                ConversionStatus::AmountTooLow,
                ConversionStatus::AmountTooLow
            ]
        );
        assert_eq!(service.status_queries(), vec![4, 4, 4]);
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed() {
        let service = MockEtcherService::new(InterfaceGeneration::OptionalFields).with_balance(9);
        let identity = test_identity("aaaaa-aa");
        service.fail_next(ServiceMethod::NativeBalance, TransportError::unreachable("down"));

        assert!(service.native_balance(&identity).await.is_err());
        assert_eq!(service.native_balance(&identity).await.unwrap(), 9);
        assert_eq!(service.calls(ServiceMethod::NativeBalance), 2);
    }
}
