//! Client configuration.
//!
//! Loaded from a `.toml` or `.json` file, then overridden by `ETCHER_*`
//! environment variables, then validated.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{EtcherError, Result};
use crate::schema::InterfaceGeneration;
use crate::types::BitcoinNetwork;

/// Identifier of the remote etcher service.
pub const DEFAULT_BACKEND_CANISTER_ID: &str = "pvxnv-ciaaa-aaaag-qjunq-cai";

const ENV_PREFIX: &str = "ETCHER_";

/// Longest delegation the identity provider grants: 30 days.
pub const MAX_SESSION_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Poll cadence of the conversion tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Fixed interval between status polls
    pub poll_interval_ms: u64,
    /// Consecutive failed polls tolerated before tracking gives up
    pub max_poll_retries: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            max_poll_retries: 5,
        }
    }
}

impl TrackerConfig {
    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtcherConfig {
    /// Chain the deployment runs against
    pub network: BitcoinNetwork,
    /// Remote service identifier
    pub backend_canister_id: String,
    /// Identity provider override; derived from `network` when unset
    pub identity_provider_url: Option<String>,
    /// Maximum lifetime requested for a delegation
    pub session_ttl_secs: u64,
    /// Wire generation the schema adapter speaks
    pub interface_generation: InterfaceGeneration,
    /// Tracker settings
    pub tracker: TrackerConfig,
    /// Transparent retries for read-only queries
    pub query_retries: u32,
    /// Delay between query retries
    pub query_retry_backoff_ms: u64,
    /// Smallest native balance for which a conversion is submitted
    pub min_conversion_balance: u64,
}

impl Default for EtcherConfig {
    fn default() -> Self {
        Self {
            network: BitcoinNetwork::default(),
            backend_canister_id: DEFAULT_BACKEND_CANISTER_ID.to_string(),
            identity_provider_url: None,
            session_ttl_secs: 60 * 60,
            interface_generation: InterfaceGeneration::default(),
            tracker: TrackerConfig::default(),
            query_retries: 3,
            query_retry_backoff_ms: 250,
            min_conversion_balance: 1,
        }
    }
}

impl EtcherConfig {
    /// Read a configuration file; the format follows the extension.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EtcherError::config(format!("Failed to read {}: {e}", path.display()))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| EtcherError::config(format!("Invalid TOML: {e}"))),
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| EtcherError::config(format!("Invalid JSON: {e}"))),
            _ => Err(EtcherError::config(format!(
                "Unsupported config format: {}",
                path.display()
            ))),
        }
    }

    /// Apply `ETCHER_*` overrides from the process environment.
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply `ETCHER_*` overrides from an explicit variable list.
    ///
    /// Variables without the prefix are ignored; unknown `ETCHER_*` keys are
    /// rejected so typos do not pass silently.
    pub fn merge_with_vars<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let name = name.to_lowercase();
            self.set_from_string(&name, value.as_ref()).map_err(|e| {
                tracing::warn!(variable = key.as_ref(), "Rejected configuration override");
                e
            })?;
        }
        Ok(())
    }

    /// Set one field from its textual form.
    pub fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
            value
                .trim()
                .parse()
                .map_err(|_| EtcherError::config(format!("Invalid value '{value}' for {key}")))
        }

        match key {
            "network" => self.network = value.parse()?,
            "backend_canister_id" => self.backend_canister_id = value.trim().to_string(),
            "identity_provider_url" => {
                let url = value.trim();
                self.identity_provider_url = (!url.is_empty()).then(|| url.to_string());
            }
            "session_ttl_secs" => self.session_ttl_secs = parse(key, value)?,
            "interface_generation" => self.interface_generation = value.parse()?,
            "poll_interval_ms" | "tracker.poll_interval_ms" => {
                self.tracker.poll_interval_ms = parse(key, value)?
            }
            "max_poll_retries" | "tracker.max_poll_retries" => {
                self.tracker.max_poll_retries = parse(key, value)?
            }
            "query_retries" => self.query_retries = parse(key, value)?,
            "query_retry_backoff_ms" => self.query_retry_backoff_ms = parse(key, value)?,
            "min_conversion_balance" => self.min_conversion_balance = parse(key, value)?,
            _ => {
                return Err(EtcherError::config(format!(
                    "Unknown configuration key: {key}"
                )))
            }
        }
        Ok(())
    }

    /// Reject settings the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.backend_canister_id.trim().is_empty() {
            return Err(EtcherError::config("Backend canister id cannot be empty"));
        }
        if self.session_ttl_secs == 0 {
            return Err(EtcherError::config("Session TTL cannot be 0"));
        }
        if self.session_ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(EtcherError::config(format!(
                "Session TTL of {} seconds exceeds the {MAX_SESSION_TTL_SECS} second maximum",
                self.session_ttl_secs
            )));
        }
        if self.tracker.poll_interval_ms == 0 {
            return Err(EtcherError::config("Poll interval cannot be 0"));
        }
        if self.min_conversion_balance == 0 {
            return Err(EtcherError::config(
                "Minimum conversion balance must be positive",
            ));
        }
        if let Some(url) = &self.identity_provider_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(EtcherError::config(format!(
                    "Identity provider URL must be http(s): {url}"
                )));
            }
        }
        Ok(())
    }

    /// Identity provider to delegate through.
    pub fn identity_provider_url(&self) -> String {
        self.identity_provider_url
            .clone()
            .unwrap_or_else(|| self.network.default_identity_provider().to_string())
    }

    /// Maximum delegation lifetime.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Delay between query retries.
    pub fn query_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.query_retry_backoff_ms)
    }
}
