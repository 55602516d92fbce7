//! # Etcher Core
//!
//! Pure domain layer for the rune etcher client: the canonical data model,
//! the error taxonomy, the schema adapter that hides the three remote
//! interface generations, configuration, reactive cells and the effect
//! traits through which the orchestration layer reaches the remote service
//! and the delegation provider.
//!
//! Nothing in this crate performs I/O on its own. Remote calls go through
//! [`effects::EtcherService`] / [`effects::RemoteTransport`], sign-in goes
//! through [`effects::DelegationProvider`].

pub mod config;
pub mod effects;
pub mod errors;
pub mod reactive;
pub mod schema;
pub mod types;

pub use config::{EtcherConfig, TrackerConfig, DEFAULT_BACKEND_CANISTER_ID};
pub use errors::{ErrorCategory, EtcherError, MutatingOperation, Result};
pub use reactive::{Dynamic, Subscription};
pub use schema::{InterfaceGeneration, SchemaAdapter, SchemaError, WireValue};
pub use types::{
    Account, BitcoinNetwork, BlockIndex, ConversionRecord, ConversionStatus, DepositAddresses,
    EtchingRequest, EtchingResult, Identity, MintWindow, Principal, ReimbursementDeposit,
    ReimbursementReason, StatusTransition, Txid,
};
