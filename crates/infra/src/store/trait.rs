use std::sync::Arc;

use thiserror::Error;

use backoffice_accounting::{Balances, LedgerEntry, LedgerSummary};
use backoffice_core::{ExpectedVersion, ReceiptId, TransferId};
use backoffice_treasury::{PaymentReceipt, TransferSnapshot};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A compare-and-set expectation did not hold; someone else wrote first.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// The changeset itself is malformed (e.g. entries that do not balance).
    #[error("invalid write: {0}")]
    InvalidWrite(String),

    /// A stored row could not be mapped back into a domain value.
    #[error("corrupt row: {0}")]
    Decode(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// A transfer state to persist, guarded by the version it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferWrite {
    pub transfer: TransferSnapshot,
    pub expected: ExpectedVersion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptWrite {
    pub receipt: PaymentReceipt,
    pub expected: ExpectedVersion,
}

/// Everything one operation writes. Applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    pub entries: Vec<LedgerEntry>,
    pub transfer: Option<TransferWrite>,
    pub receipt: Option<ReceiptWrite>,
}

impl Changeset {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.transfer.is_none() && self.receipt.is_none()
    }

    /// Checks shared by every backend, run before anything is written.
    pub fn validate(&self) -> Result<(), StoreError> {
        let total: i128 = self.entries.iter().map(|e| e.amount_cents as i128).sum();
        if total != 0 {
            return Err(StoreError::InvalidWrite(format!(
                "entries do not balance (off by {total} cents)"
            )));
        }
        if self.entries.iter().any(|e| e.amount_cents == 0) {
            return Err(StoreError::InvalidWrite("zero-amount entry".to_string()));
        }
        // Aggregate writes are compare-and-set; blind overwrites are refused.
        let blind = self
            .transfer
            .as_ref()
            .map(|w| w.expected)
            .into_iter()
            .chain(self.receipt.as_ref().map(|w| w.expected))
            .any(|e| e == ExpectedVersion::Any);
        if blind {
            return Err(StoreError::InvalidWrite(
                "transfer and receipt writes need an expected version".to_string(),
            ));
        }
        Ok(())
    }
}

/// What a ledger reset removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetOutcome {
    pub entries_removed: u64,
    pub transfers_removed: u64,
}

/// Persistent state of the books: ledger entries, transfers, receipts.
///
/// Implementations must:
/// - apply a [`Changeset`] atomically (all rows or none)
/// - reject a transfer/receipt write whose `expected` version does not match
///   the stored one with [`StoreError::Concurrency`]
/// - never modify or delete ledger entries outside [`BookStore::reset_ledger`]
#[async_trait::async_trait]
pub trait BookStore: Send + Sync {
    async fn commit(&self, changes: Changeset) -> Result<(), StoreError>;

    /// Per-account totals over every entry.
    async fn balances(&self) -> Result<Balances, StoreError>;

    /// Balances plus the `recent_limit` newest entries, read consistently.
    async fn summary(&self, recent_limit: usize) -> Result<LedgerSummary, StoreError>;

    async fn get_transfer(&self, id: TransferId) -> Result<Option<TransferSnapshot>, StoreError>;

    /// Newest first.
    async fn list_transfers(&self) -> Result<Vec<TransferSnapshot>, StoreError>;

    async fn get_receipt(&self, id: ReceiptId) -> Result<Option<PaymentReceipt>, StoreError>;

    /// Newest first.
    async fn list_receipts(&self) -> Result<Vec<PaymentReceipt>, StoreError>;

    /// Remove every entry and every ledger-tracked transfer.
    async fn reset_ledger(&self) -> Result<ResetOutcome, StoreError>;
}

#[async_trait::async_trait]
impl<S> BookStore for Arc<S>
where
    S: BookStore + ?Sized,
{
    async fn commit(&self, changes: Changeset) -> Result<(), StoreError> {
        (**self).commit(changes).await
    }

    async fn balances(&self) -> Result<Balances, StoreError> {
        (**self).balances().await
    }

    async fn summary(&self, recent_limit: usize) -> Result<LedgerSummary, StoreError> {
        (**self).summary(recent_limit).await
    }

    async fn get_transfer(&self, id: TransferId) -> Result<Option<TransferSnapshot>, StoreError> {
        (**self).get_transfer(id).await
    }

    async fn list_transfers(&self) -> Result<Vec<TransferSnapshot>, StoreError> {
        (**self).list_transfers().await
    }

    async fn get_receipt(&self, id: ReceiptId) -> Result<Option<PaymentReceipt>, StoreError> {
        (**self).get_receipt(id).await
    }

    async fn list_receipts(&self) -> Result<Vec<PaymentReceipt>, StoreError> {
        (**self).list_receipts().await
    }

    async fn reset_ledger(&self) -> Result<ResetOutcome, StoreError> {
        (**self).reset_ledger().await
    }
}
