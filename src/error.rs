//! Error types for the ATM core and its ledger collaborators.

use thiserror::Error;

use crate::atm::OperationKind;

/// Failure reported by an external collaborator (wallet provider or ledger contract).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("call reverted: {0}")]
    Reverted(String),
    #[error("transport: {0}")]
    Transport(String),
}

/// Errors surfaced by the ATM core.
///
/// Validation errors never reach the ledger; ledger failures are reported
/// after a failure notification has been appended.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AtmError {
    #[error("wallet provider is required to connect")]
    ProviderUnavailable,
    #[error("wallet connection rejected: {0}")]
    ConnectionRejected(String),
    #[error("session is {state}, contract binding required")]
    SessionNotReady { state: &'static str },
    #[error("malformed amount: {0:?}")]
    MalformedAmount(String),
    #[error("invalid campaign selected: {0}")]
    InvalidCampaign(u32),
    #[error("donation amount must be at least {minimum}")]
    BelowMinimumDonation { minimum: String },
    #[error("balance sync failed: {0}")]
    SyncFailure(LedgerError),
    #[error("submission failed: {0}")]
    Submission(LedgerError),
    #[error("confirmation failed: {0}")]
    Confirmation(LedgerError),
    #[error("{0} already in flight")]
    OperationInFlight(OperationKind),
    #[error("duplicate campaign id {0}")]
    DuplicateCampaign(u32),
    #[error("config: {0}")]
    Config(String),
}

impl AtmError {
    /// Input was rejected before any ledger interaction.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AtmError::MalformedAmount(_)
                | AtmError::InvalidCampaign(_)
                | AtmError::BelowMinimumDonation { .. }
        )
    }

    /// A submitted call failed; a failure notification was recorded.
    pub fn is_ledger_failure(&self) -> bool {
        matches!(self, AtmError::Submission(_) | AtmError::Confirmation(_))
    }
}

pub type AtmResult<T> = Result<T, AtmError>;
