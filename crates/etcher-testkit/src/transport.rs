//! Scripted wire-level transport.
//!
//! Replies are set per method name; every call is recorded so tests can
//! check which remote method was invoked, with what kind and arguments.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use etcher_core::effects::{CallKind, RemoteTransport, TransportError};
use etcher_core::{Identity, Principal, WireValue};
use parking_lot::Mutex;

/// One call seen by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Caller principal
    pub principal: Principal,
    /// Query or update
    pub kind: CallKind,
    /// Remote method name
    pub method: String,
    /// Encoded arguments
    pub args: WireValue,
}

#[derive(Debug, Default)]
struct TransportState {
    replies: HashMap<String, VecDeque<Result<WireValue, TransportError>>>,
    calls: Vec<RecordedCall>,
}

/// [`RemoteTransport`] answering from per-method reply queues.
///
/// The last reply queued for a method repeats. Methods without replies fail
/// with [`TransportError::Rejected`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<TransportState>>,
}

impl ScriptedTransport {
    /// Transport with no replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for `method`.
    pub fn reply(&self, method: &str, reply: Result<WireValue, TransportError>) -> &Self {
        self.state
            .lock()
            .replies
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Calls made so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }
}

#[async_trait]
impl RemoteTransport for ScriptedTransport {
    async fn call(
        &self,
        identity: &Identity,
        kind: CallKind,
        method: &str,
        args: WireValue,
    ) -> Result<WireValue, TransportError> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall {
            principal: identity.principal().clone(),
            kind,
            method: method.to_string(),
            args,
        });
        let Some(queue) = state.replies.get_mut(method) else {
            return Err(TransportError::Rejected {
                code: 3,
                message: format!("no reply scripted for {method}"),
            });
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(TransportError::unreachable("reply queue empty")))
        }
    }
}
