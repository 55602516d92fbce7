//! Effect traits at the edges of the client.
//!
//! # Effect Classification
//!
//! - **Remote service**: [`EtcherService`] is the typed call surface for the
//!   backend; [`RemoteTransport`] is the untyped wire underneath it.
//! - **Delegation**: [`DelegationProvider`] runs the interactive sign-in flow
//!   and hands back a delegated credential.
//!
//! Implementations live in `etcher-app` (proxy over a transport) and in
//! `etcher-testkit` (scripted doubles).

mod delegation;
mod service;

pub use delegation::{Delegation, DelegationError, DelegationProvider, DelegationRequest};
pub use service::{methods, CallKind, EtcherService, RemoteTransport, TransportError};
