//! Canonical, interface-generation independent data model.

mod conversion;
mod etching;
mod identity;
mod network;

pub use conversion::{
    Account, BlockIndex, ConversionRecord, ConversionStatus, ReimbursementDeposit,
    ReimbursementReason, StatusTransition, Txid,
};
pub use etching::{EtchingRequest, EtchingResult, MintWindow, MAX_DIVISIBILITY};
pub use identity::{Identity, Principal};
pub use network::{BitcoinNetwork, LOCAL_IDENTITY_PROVIDER, PUBLIC_IDENTITY_PROVIDER};

use serde::{Deserialize, Serialize};

/// Deposit addresses for one signed-in identity.
///
/// Both addresses are derived remotely from the caller's principal, so they
/// stay fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositAddresses {
    /// Address that accepts native currency deposits.
    pub native: String,
    /// Ledger account that accepts wrapped-asset deposits.
    pub ledger_asset: String,
}
