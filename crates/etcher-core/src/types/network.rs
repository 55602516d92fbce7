use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::EtcherError;

/// Identity provider used when talking to a local replica.
pub const LOCAL_IDENTITY_PROVIDER: &str = "http://rdmx6-jaaaa-aaaaa-aaadq-cai.localhost:4943";

/// Public identity provider.
pub const PUBLIC_IDENTITY_PROVIDER: &str = "https://identity.ic0.app/";

/// Bitcoin network the remote service settles on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitcoinNetwork {
    /// Bitcoin mainnet
    Mainnet,
    /// Bitcoin testnet
    Testnet,
    /// Local regtest node
    #[default]
    Regtest,
}

impl BitcoinNetwork {
    /// Lower-case network name as used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Regtest => "regtest",
        }
    }

    /// Whether this network only exists on a local replica.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Regtest)
    }

    /// Identity provider to delegate to when none is configured explicitly.
    pub fn default_identity_provider(&self) -> &'static str {
        if self.is_local() {
            LOCAL_IDENTITY_PROVIDER
        } else {
            PUBLIC_IDENTITY_PROVIDER
        }
    }
}

impl fmt::Display for BitcoinNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BitcoinNetwork {
    type Err = EtcherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "regtest" => Ok(Self::Regtest),
            other => Err(EtcherError::config(format!("unknown network '{other}'"))),
        }
    }
}
