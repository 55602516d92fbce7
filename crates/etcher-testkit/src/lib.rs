//! Etcher Testing Infrastructure
//!
//! Scripted doubles for the two effect seams of the client, fixtures and
//! proptest strategies for the canonical model.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! etcher-testkit = { path = "../etcher-testkit" }
//! ```
//!
//! ```rust,ignore
//! use etcher_testkit::*;
//!
//! let service = MockEtcherService::new(InterfaceGeneration::OptionalFields)
//!     .with_balance(50_000)
//!     .with_statuses([ConversionStatus::Signing]);
//! let provider = MockDelegationProvider::succeeding("aaaaa-aa");
//! ```

pub mod fixtures;
pub mod mock_provider;
pub mod mock_service;
pub mod strategies;
pub mod transport;

pub use fixtures::*;
pub use mock_provider::MockDelegationProvider;
pub use mock_service::{MockEtcherService, ServiceMethod};
pub use transport::{RecordedCall, ScriptedTransport};
