//! # Payout Transfers
//!
//! The external value transfer performed by a withdrawal. Settlement itself
//! lives outside the protocol; the ledger only needs to know whether the
//! transfer went through so it can restore the balance when it did not.

use parking_lot::Mutex;
use thiserror::Error;

use surety_core::{AccountId, Amount};

/// Failure reported by a [`PayoutTransfer`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransferError(pub String);

/// Moves withdrawn funds to a passenger.
///
/// Called after the passenger's balance has been zeroed and outside the
/// ledger lock, so implementations may re-enter the protocol.
pub trait PayoutTransfer: Send + Sync {
    fn transfer(&self, to: &AccountId, amount: Amount) -> Result<(), TransferError>;
}

/// Records transfers in memory. Used by the in-process deployment and tests.
#[derive(Debug, Default)]
pub struct RecordingTransfer {
    sent: Mutex<Vec<(AccountId, Amount)>>,
    fail_with: Mutex<Option<String>>,
}

impl RecordingTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent transfers fail with `reason` (`None` to recover).
    pub fn set_failure(&self, reason: Option<&str>) {
        *self.fail_with.lock() = reason.map(str::to_string);
    }

    /// All successful transfers in order.
    pub fn sent(&self) -> Vec<(AccountId, Amount)> {
        self.sent.lock().clone()
    }

    /// Sum of successful transfers to `to`.
    pub fn total_to(&self, to: &AccountId) -> Amount {
        self.sent
            .lock()
            .iter()
            .filter(|(who, _)| who == to)
            .fold(Amount::ZERO, |acc, (_, amount)| acc.saturating_add(*amount))
    }
}

impl PayoutTransfer for RecordingTransfer {
    fn transfer(&self, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        if let Some(reason) = self.fail_with.lock().clone() {
            return Err(TransferError(reason));
        }
        self.sent.lock().push((to.clone(), amount));
        Ok(())
    }
}
