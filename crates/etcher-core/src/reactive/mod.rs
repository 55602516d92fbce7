//! # Reactive Primitives
//!
//! Observable state published by the orchestration layer: session status,
//! deposit addresses, the tracked conversion and user-facing notices are all
//! [`Dynamic`] cells a frontend subscribes to.

mod dynamic;

pub use dynamic::{Dynamic, Subscription};
