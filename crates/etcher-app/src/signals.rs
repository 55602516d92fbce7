//! Reactive state surface read by the frontend.
//!
//! One [`Dynamic`] cell per view. Only the coordinator, the session manager
//! and the tracker write to these; the frontend subscribes and renders.

use etcher_core::{
    ConversionRecord, ConversionStatus, DepositAddresses, Dynamic, ErrorCategory, EtcherError,
    EtchingResult,
};
use serde::Serialize;

use crate::session::SessionStatus;

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NoticeLevel {
    /// Informational
    Info,
    /// A workflow step completed
    Success,
    /// Recoverable by the user
    Warning,
    /// Failure
    Error,
}

impl NoticeLevel {
    fn for_category(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::Conflict | ErrorCategory::Input => Self::Warning,
            ErrorCategory::Auth | ErrorCategory::Network | ErrorCategory::Operation => Self::Error,
        }
    }
}

/// Message for the user, shown until dismissed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Severity
    pub level: NoticeLevel,
    /// Short heading
    pub title: String,
    /// Body text
    pub message: String,
}

impl Notice {
    /// Create a notice.
    pub fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
        }
    }

    /// Notice for a failed workflow step.
    pub fn from_error(error: &EtcherError) -> Self {
        let category = error.category();
        Self::new(
            NoticeLevel::for_category(category),
            category.label(),
            format!("{error}. {}", category.resolution_hint()),
        )
    }

    /// Notice for a conversion that reached a terminal status; `None` otherwise.
    pub fn for_conversion(record: &ConversionRecord) -> Option<Self> {
        let block_index = record.block_index;
        let notice = match &record.status {
            ConversionStatus::Confirmed { txid } => Self::new(
                NoticeLevel::Success,
                "Conversion confirmed",
                format!("Conversion {block_index} confirmed in transaction {txid}"),
            ),
            ConversionStatus::AmountTooLow => Self::new(
                NoticeLevel::Warning,
                "Amount too low",
                format!("Conversion {block_index} was rejected: the deposit does not cover the fees"),
            ),
            ConversionStatus::Reimbursed(deposit) => Self::new(
                NoticeLevel::Warning,
                "Conversion reimbursed",
                format!(
                    "Conversion {block_index} was reimbursed: {} returned to {}",
                    deposit.amount, deposit.account.owner
                ),
            ),
            ConversionStatus::Unknown => Self::new(
                NoticeLevel::Error,
                "Unknown conversion status",
                format!("Conversion {block_index} reported a status this client does not recognize"),
            ),
            _ => return None,
        };
        Some(notice)
    }
}

/// All state cells the frontend observes.
#[derive(Debug, Clone, Default)]
pub struct WorkflowSignals {
    /// Sign-in state, shared with the session manager
    pub session: Dynamic<SessionStatus>,
    /// Addresses of the signed-in identity, once fetched
    pub deposit_addresses: Dynamic<Option<DepositAddresses>>,
    /// Most recent conversion, written by the tracker
    pub conversion: Dynamic<Option<ConversionRecord>>,
    /// Result of the last successful etching
    pub last_etching: Dynamic<Option<EtchingResult>>,
    /// Pending message for the user
    pub notice: Dynamic<Option<Notice>>,
}

impl WorkflowSignals {
    /// Signals sharing `session` with the session manager.
    pub fn with_session(session: Dynamic<SessionStatus>) -> Self {
        Self {
            session,
            ..Self::default()
        }
    }

    /// Current value of every cell.
    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            session: self.session.get(),
            deposit_addresses: self.deposit_addresses.get(),
            conversion: self.conversion.get(),
            last_etching: self.last_etching.get(),
            notice: self.notice.get(),
        }
    }
}

/// Point-in-time copy of [`WorkflowSignals`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct WorkflowSnapshot {
    pub session: SessionStatus,
    pub deposit_addresses: Option<DepositAddresses>,
    pub conversion: Option<ConversionRecord>,
    pub last_etching: Option<EtchingResult>,
    pub notice: Option<Notice>,
}
