//! Remote Service Proxy
//!
//! Typed [`EtcherService`] over an untyped [`RemoteTransport`]. Each
//! operation maps to one remote method; replies are shape-checked here and
//! status/etching payloads are handed back untouched for the schema adapter.
//!
//! The proxy never retries. Retry policy belongs to the caller, which knows
//! whether an operation is idempotent.

use async_trait::async_trait;
use etcher_core::effects::{methods, CallKind, EtcherService, RemoteTransport, TransportError};
use etcher_core::{BlockIndex, Identity, WireValue};
use serde_json::json;

/// [`EtcherService`] backed by a [`RemoteTransport`].
#[derive(Debug, Clone)]
pub struct RemoteServiceProxy<T> {
    transport: T,
}

impl<T: RemoteTransport> RemoteServiceProxy<T> {
    /// Wrap a transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn invoke(
        &self,
        identity: &Identity,
        method: &'static str,
        args: WireValue,
    ) -> Result<WireValue, TransportError> {
        let kind = methods::kind_of(method).unwrap_or(CallKind::Update);
        tracing::trace!(method, ?kind, principal = %identity.principal(), "Remote call");
        let result = self.transport.call(identity, kind, method, args).await;
        if let Err(error) = &result {
            tracing::debug!(method, %error, "Remote call failed");
        }
        result
    }
}

fn text_reply(method: &str, reply: WireValue) -> Result<String, TransportError> {
    match reply {
        WireValue::String(text) => Ok(text),
        other => Err(TransportError::decode(format!(
            "{method}: expected text, got {other}"
        ))),
    }
}

/// Naturals may arrive as JSON numbers or decimal strings.
fn nat_reply(method: &str, reply: WireValue) -> Result<u64, TransportError> {
    let parsed = match &reply {
        WireValue::Number(number) => number.as_u64(),
        WireValue::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        TransportError::decode(format!("{method}: expected a natural number, got {reply}"))
    })
}

#[async_trait]
impl<T: RemoteTransport> EtcherService for RemoteServiceProxy<T> {
    async fn native_deposit_address(&self, identity: &Identity) -> Result<String, TransportError> {
        let method = methods::NATIVE_DEPOSIT_ADDRESS;
        text_reply(method, self.invoke(identity, method, json!([])).await?)
    }

    async fn ledger_deposit_address(&self, identity: &Identity) -> Result<String, TransportError> {
        let method = methods::LEDGER_DEPOSIT_ADDRESS;
        text_reply(method, self.invoke(identity, method, json!([])).await?)
    }

    async fn native_balance(&self, identity: &Identity) -> Result<u64, TransportError> {
        let method = methods::NATIVE_BALANCE;
        nat_reply(method, self.invoke(identity, method, json!([])).await?)
    }

    async fn submit_conversion(&self, identity: &Identity) -> Result<BlockIndex, TransportError> {
        let method = methods::SUBMIT_CONVERSION;
        nat_reply(method, self.invoke(identity, method, json!([])).await?)
    }

    async fn conversion_status(
        &self,
        identity: &Identity,
        block_index: BlockIndex,
    ) -> Result<WireValue, TransportError> {
        self.invoke(identity, methods::CONVERSION_STATUS, json!([block_index]))
            .await
    }

    async fn etch(
        &self,
        identity: &Identity,
        request: WireValue,
    ) -> Result<WireValue, TransportError> {
        self.invoke(identity, methods::ETCH, json!([request])).await
    }

    async fn estimate_conversion_fee(&self, identity: &Identity) -> Result<u64, TransportError> {
        let method = methods::ESTIMATE_CONVERSION_FEE;
        nat_reply(method, self.invoke(identity, method, json!([])).await?)
    }
}
