//! Conversion status alphabet and the record the tracker maintains.
//!
//! # Transition rules
//!
//! ```text
//! Pending -> Signing -> Submitted -> Sending -> Confirmed     (terminal)
//! Pending -> AmountTooLow                                      (terminal)
//! (non-terminal) -> WillReimburse -> Reimbursed                (terminal)
//! (any non-terminal) -> Unknown                                (terminal by policy)
//! ```
//!
//! Polls may skip intermediate stages, so any forward edge along these paths
//! is accepted. Backward edges are stale responses and are discarded. Once a
//! terminal status is stored the record never changes again.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ledger block index returned when a conversion is submitted.
pub type BlockIndex = u64;

/// Raw chain transaction id.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Txid(Vec<u8>);

impl Txid {
    /// Wrap raw txid bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parse a hex-encoded txid.
    pub fn from_hex(text: &str) -> Option<Self> {
        hex::decode(text.trim()).ok().map(Self)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lower-case hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txid({})", self.to_hex())
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Ledger account a reimbursement is paid to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    /// Owning principal, textual
    pub owner: String,
    /// 32-byte subaccount, if any
    pub subaccount: Option<Vec<u8>>,
}

/// Why the minter is refunding a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReimbursementReason {
    /// The outbound call failed
    CallFailed,
    /// The destination failed a compliance check
    TaintedDestination {
        /// Fee charged by the check
        kyt_fee: u64,
        /// Principal of the check provider
        kyt_provider: String,
    },
}

/// Refund the minter has scheduled or completed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReimbursementDeposit {
    /// Destination of the refund
    pub account: Account,
    /// Ledger block of the refund mint
    pub mint_block_index: u64,
    /// Refunded amount in the smallest unit
    pub amount: u64,
    /// Reason for the refund
    pub reason: ReimbursementReason,
}

/// Settlement status of one conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversionStatus {
    /// Waiting to be picked up
    Pending,
    /// Minter is signing the transaction
    Signing,
    /// Transaction handed to the chain
    Submitted {
        /// Chain transaction
        txid: Txid,
    },
    /// Transaction being (re)broadcast
    Sending {
        /// Chain transaction
        txid: Txid,
    },
    /// Transaction confirmed
    Confirmed {
        /// Chain transaction
        txid: Txid,
    },
    /// Rejected: amount below the minimum
    AmountTooLow,
    /// Refund scheduled
    WillReimburse(ReimbursementDeposit),
    /// Refund completed
    Reimbursed(ReimbursementDeposit),
    /// Anything the adapter could not classify
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Pending,
    Signing,
    Submitted,
    Sending,
    Confirmed,
    AmountTooLow,
    WillReimburse,
    Reimbursed,
    Unknown,
}

impl ConversionStatus {
    /// Wire tag of this variant.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Signing => "Signing",
            Self::Submitted { .. } => "Submitted",
            Self::Sending { .. } => "Sending",
            Self::Confirmed { .. } => "Confirmed",
            Self::AmountTooLow => "AmountTooLow",
            Self::WillReimburse(_) => "WillReimburse",
            Self::Reimbursed(_) => "Reimbursed",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether polling stops once this status is observed.
    ///
    /// `Unknown` is terminal by policy: it is never retried.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Confirmed { .. } | Self::AmountTooLow | Self::Reimbursed(_) | Self::Unknown
        )
    }

    /// Whether this status ends the conversion successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    /// Chain transaction, when the status carries one.
    pub fn txid(&self) -> Option<&Txid> {
        match self {
            Self::Submitted { txid } | Self::Sending { txid } | Self::Confirmed { txid } => {
                Some(txid)
            }
            _ => None,
        }
    }

    /// Refund details, when the status carries them.
    pub fn reimbursement(&self) -> Option<&ReimbursementDeposit> {
        match self {
            Self::WillReimburse(deposit) | Self::Reimbursed(deposit) => Some(deposit),
            _ => None,
        }
    }

    fn stage(&self) -> Stage {
        match self {
            Self::Pending => Stage::Pending,
            Self::Signing => Stage::Signing,
            Self::Submitted { .. } => Stage::Submitted,
            Self::Sending { .. } => Stage::Sending,
            Self::Confirmed { .. } => Stage::Confirmed,
            Self::AmountTooLow => Stage::AmountTooLow,
            Self::WillReimburse(_) => Stage::WillReimburse,
            Self::Reimbursed(_) => Stage::Reimbursed,
            Self::Unknown => Stage::Unknown,
        }
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.txid() {
            Some(txid) => write!(f, "{} ({txid})", self.tag()),
            None => f.write_str(self.tag()),
        }
    }
}

fn stage_allows(from: Stage, to: Stage) -> bool {
    use Stage::*;
    match to {
        Unknown | WillReimburse | Reimbursed => true,
        Pending => false,
        Signing => matches!(from, Pending),
        Submitted => matches!(from, Pending | Signing),
        Sending => matches!(from, Pending | Signing | Submitted),
        Confirmed => matches!(from, Pending | Signing | Submitted | Sending),
        AmountTooLow => matches!(from, Pending),
    }
}

/// Effect of applying a poll response to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    /// The record moved to the new status
    Advanced,
    /// Same status as already stored
    Unchanged,
    /// Stale, out-of-order or post-terminal response; ignored
    Discarded,
}

/// One deposit-to-ledger-asset conversion attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRecord {
    /// Polling key returned at submission
    pub block_index: BlockIndex,
    /// Last accepted status
    pub status: ConversionStatus,
    /// Last chain transaction seen for this conversion
    pub txid: Option<Txid>,
    /// Refund details, only in reimbursement states
    pub reimbursement: Option<ReimbursementDeposit>,
}

impl ConversionRecord {
    /// Fresh record for a just-submitted conversion.
    pub fn new(block_index: BlockIndex) -> Self {
        Self {
            block_index,
            status: ConversionStatus::Pending,
            txid: None,
            reimbursement: None,
        }
    }

    /// Whether the record is frozen.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Fold one poll response into the record.
    pub fn apply(&mut self, status: ConversionStatus) -> StatusTransition {
        if self.status.is_terminal() {
            return StatusTransition::Discarded;
        }
        if self.status == status {
            return StatusTransition::Unchanged;
        }

        let from = self.status.stage();
        let to = status.stage();
        // Same stage with a new payload, e.g. a rebroadcast under a new txid.
        if from != to && !stage_allows(from, to) {
            return StatusTransition::Discarded;
        }

        if let Some(txid) = status.txid() {
            self.txid = Some(txid.clone());
        }
        self.reimbursement = status.reimbursement().cloned();
        self.status = status;
        StatusTransition::Advanced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txid(byte: u8) -> Txid {
        Txid::new(vec![byte; 4])
    }

    fn deposit() -> ReimbursementDeposit {
        ReimbursementDeposit {
            account: Account {
                owner: "owner".to_string(),
                subaccount: None,
            },
            mint_block_index: 9,
            amount: 1_000,
            reason: ReimbursementReason::CallFailed,
        }
    }

    #[test]
    fn test_happy_path_advances() {
        let mut record = ConversionRecord::new(7);
        assert_eq!(record.apply(ConversionStatus::Signing), StatusTransition::Advanced);
        assert_eq!(
            record.apply(ConversionStatus::Submitted { txid: txid(1) }),
            StatusTransition::Advanced
        );
        assert_eq!(
            record.apply(ConversionStatus::Confirmed { txid: txid(1) }),
            StatusTransition::Advanced
        );
        assert!(record.is_terminal());
        assert_eq!(record.txid, Some(txid(1)));
    }

    #[test]
    fn test_terminal_is_frozen() {
        let mut record = ConversionRecord::new(7);
        record.apply(ConversionStatus::AmountTooLow);
        assert_eq!(record.apply(ConversionStatus::Pending), StatusTransition::Discarded);
        assert_eq!(
            record.apply(ConversionStatus::Confirmed { txid: txid(2) }),
            StatusTransition::Discarded
        );
        assert_eq!(record.status, ConversionStatus::AmountTooLow);
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut record = ConversionRecord::new(1);
        record.apply(ConversionStatus::Sending { txid: txid(3) });
        assert_eq!(record.apply(ConversionStatus::Signing), StatusTransition::Discarded);
        assert_eq!(record.apply(ConversionStatus::Pending), StatusTransition::Discarded);
        assert_eq!(record.status, ConversionStatus::Sending { txid: txid(3) });
    }

    #[test]
    fn test_pending_repeat_is_noop() {
        let mut record = ConversionRecord::new(1);
        assert_eq!(record.apply(ConversionStatus::Pending), StatusTransition::Unchanged);
    }

    #[test]
    fn test_amount_too_low_only_from_pending() {
        let mut record = ConversionRecord::new(1);
        record.apply(ConversionStatus::Signing);
        assert_eq!(
            record.apply(ConversionStatus::AmountTooLow),
            StatusTransition::Discarded
        );
    }

    #[test]
    fn test_reimbursement_path() {
        let mut record = ConversionRecord::new(1);
        record.apply(ConversionStatus::Submitted { txid: txid(5) });
        assert_eq!(
            record.apply(ConversionStatus::WillReimburse(deposit())),
            StatusTransition::Advanced
        );
        assert_eq!(record.reimbursement, Some(deposit()));
        assert_eq!(
            record.apply(ConversionStatus::Sending { txid: txid(5) }),
            StatusTransition::Discarded
        );
        assert_eq!(
            record.apply(ConversionStatus::Reimbursed(deposit())),
            StatusTransition::Advanced
        );
        assert!(record.is_terminal());
        // txid from before the diversion is kept for inspection
        assert_eq!(record.txid, Some(txid(5)));
    }

    #[test]
    fn test_rebroadcast_updates_txid() {
        let mut record = ConversionRecord::new(1);
        record.apply(ConversionStatus::Sending { txid: txid(1) });
        assert_eq!(
            record.apply(ConversionStatus::Sending { txid: txid(2) }),
            StatusTransition::Advanced
        );
        assert_eq!(record.txid, Some(txid(2)));
    }

    #[test]
    fn test_unknown_is_terminal() {
        let mut record = ConversionRecord::new(1);
        assert_eq!(record.apply(ConversionStatus::Unknown), StatusTransition::Advanced);
        assert_eq!(record.apply(ConversionStatus::Signing), StatusTransition::Discarded);
    }

    #[test]
    fn test_txid_hex() {
        let id = Txid::from_hex("abff").unwrap();
        assert_eq!(id.as_bytes(), &[0xab, 0xff]);
        assert_eq!(id.to_string(), "abff");
        assert!(Txid::from_hex("zz").is_none());
    }
}
