//! # Etcher App
//!
//! Orchestration layer of the rune etcher client.
//!
//! ```text
//!   frontend ──► WorkflowCoordinator ──► SessionManager ──► DelegationProvider
//!                   │      │
//!                   │      └──────────► ConversionTracker ─┐
//!                   ▼                                      ▼
//!              SchemaAdapter ◄──────────────────── EtcherService (RemoteServiceProxy)
//!                                                          │
//!                                                    RemoteTransport
//! ```
//!
//! State the frontend renders is published through [`WorkflowSignals`];
//! nothing here blocks on user interaction.

pub mod coordinator;
pub mod proxy;
pub mod retry;
pub mod session;
pub mod signals;
pub mod tracker;

pub use coordinator::WorkflowCoordinator;
pub use proxy::RemoteServiceProxy;
pub use retry::QueryRetryPolicy;
pub use session::{SessionManager, SessionStatus};
pub use signals::{Notice, NoticeLevel, WorkflowSignals, WorkflowSnapshot};
pub use tracker::{ConversionTracker, TrackingHandle, TrackingOutcome};
