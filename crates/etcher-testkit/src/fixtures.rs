//! Common test fixtures.

use std::time::Duration;

use etcher_core::{
    EtcherConfig, EtchingRequest, Identity, InterfaceGeneration, MintWindow, Principal,
    TrackerConfig,
};
use tokio::time::Instant;

/// Configuration with short timings, suitable for paused-clock tests.
pub fn test_config(generation: InterfaceGeneration) -> EtcherConfig {
    EtcherConfig {
        interface_generation: generation,
        tracker: TrackerConfig {
            poll_interval_ms: 1_000,
            max_poll_retries: 3,
        },
        query_retries: 2,
        query_retry_backoff_ms: 10,
        ..EtcherConfig::default()
    }
}

/// Identity for `principal`, valid for an hour.
pub fn test_identity(principal: &str) -> Identity {
    Identity::new(
        Principal::new(principal),
        format!("credential-{principal}").into_bytes(),
        Instant::now() + Duration::from_secs(3600),
    )
}

/// A fully specified etching request.
pub fn sample_request() -> EtchingRequest {
    EtchingRequest::new("UNCOMMONGOODS", '\u{29C9}')
        .with_divisibility(2)
        .with_terms(Some(1_000), Some(21_000_000))
        .with_premine(500)
        .with_mint_window(MintWindow::Height {
            start: Some(840_000),
            stop: Some(1_050_000),
        })
}

/// Install a test tracing subscriber honouring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
