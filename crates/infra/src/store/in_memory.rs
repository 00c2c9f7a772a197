use std::collections::HashMap;
use std::sync::RwLock;

use backoffice_accounting::{Balances, LedgerEntry, LedgerSummary};
use backoffice_core::{ExpectedVersion, ReceiptId, TransferId};
use backoffice_treasury::{PaymentReceipt, TransferSnapshot};

use super::r#trait::{BookStore, Changeset, ResetOutcome, StoreError};

#[derive(Debug, Default)]
struct Books {
    /// Append order; the last element is the newest entry.
    entries: Vec<LedgerEntry>,
    transfers: HashMap<TransferId, TransferSnapshot>,
    receipts: HashMap<ReceiptId, PaymentReceipt>,
}

/// In-memory book store.
///
/// Intended for tests/dev. A whole changeset is applied under one write lock.
#[derive(Debug, Default)]
pub struct InMemoryBookStore {
    books: RwLock<Books>,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Books>, StoreError> {
        self.books
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Books>, StoreError> {
        self.books
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))
    }
}

fn check(kind: &str, id: impl core::fmt::Display, expected: ExpectedVersion, stored: Option<u64>) -> Result<(), StoreError> {
    if expected.matches(stored) {
        Ok(())
    } else {
        Err(StoreError::Concurrency(format!(
            "{kind} {id}: expected {expected:?}, found {stored:?}"
        )))
    }
}

#[async_trait::async_trait]
impl BookStore for InMemoryBookStore {
    async fn commit(&self, changes: Changeset) -> Result<(), StoreError> {
        changes.validate()?;
        let mut books = self.write()?;

        // Verify every expectation before touching anything.
        if let Some(w) = &changes.transfer {
            let stored = books.transfers.get(&w.transfer.id).map(|t| t.version);
            check("transfer", w.transfer.id, w.expected, stored)?;
        }
        if let Some(w) = &changes.receipt {
            let stored = books.receipts.get(&w.receipt.id).map(|r| r.version);
            check("receipt", w.receipt.id, w.expected, stored)?;
        }

        books.entries.extend(changes.entries);
        if let Some(w) = changes.transfer {
            books.transfers.insert(w.transfer.id, w.transfer);
        }
        if let Some(w) = changes.receipt {
            books.receipts.insert(w.receipt.id, w.receipt);
        }
        Ok(())
    }

    async fn balances(&self) -> Result<Balances, StoreError> {
        let books = self.read()?;
        Ok(Balances::from_entries(&books.entries))
    }

    async fn summary(&self, recent_limit: usize) -> Result<LedgerSummary, StoreError> {
        let books = self.read()?;
        let balances = Balances::from_entries(&books.entries);
        let recent = books.entries.iter().rev().take(recent_limit).cloned().collect();
        Ok(LedgerSummary::build(&balances, recent, books.entries.len() as u64))
    }

    async fn get_transfer(&self, id: TransferId) -> Result<Option<TransferSnapshot>, StoreError> {
        Ok(self.read()?.transfers.get(&id).cloned())
    }

    async fn list_transfers(&self) -> Result<Vec<TransferSnapshot>, StoreError> {
        let mut items: Vec<_> = self.read()?.transfers.values().cloned().collect();
        items.sort_by(|a, b| (b.planned_at, b.id).cmp(&(a.planned_at, a.id)));
        Ok(items)
    }

    async fn get_receipt(&self, id: ReceiptId) -> Result<Option<PaymentReceipt>, StoreError> {
        Ok(self.read()?.receipts.get(&id).cloned())
    }

    async fn list_receipts(&self) -> Result<Vec<PaymentReceipt>, StoreError> {
        let mut items: Vec<_> = self.read()?.receipts.values().cloned().collect();
        items.sort_by(|a, b| (b.received_at, b.id).cmp(&(a.received_at, a.id)));
        Ok(items)
    }

    async fn reset_ledger(&self) -> Result<ResetOutcome, StoreError> {
        let mut books = self.write()?;
        let entries_removed = books.entries.len() as u64;
        books.entries.clear();

        let before = books.transfers.len();
        books.transfers.retain(|_, t| !t.ledger_tracked);
        let transfers_removed = (before - books.transfers.len()) as u64;

        Ok(ResetOutcome {
            entries_removed,
            transfers_removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TransferWrite;
    use backoffice_accounting::{
        AccountCode, EntryDetails, LedgerOperation, Movement, prepare_posting,
    };
    use backoffice_treasury::{PlanTransfer, Transfer, TransferCommand, TransferMethod};
    use backoffice_core::Aggregate;
    use chrono::Utc;

    fn income(cents: i64) -> Vec<LedgerEntry> {
        let op = LedgerOperation::CashIncome(Movement {
            amount_cents: cents,
            details: EntryDetails::default(),
        });
        prepare_posting(&op, None, Utc::now()).unwrap().entries
    }

    fn planned(ledger_tracked: bool) -> TransferSnapshot {
        let id = TransferId::new();
        let cmd = TransferCommand::Plan(PlanTransfer {
            transfer_id: id,
            from_account: "BANK_FULTON".to_string(),
            to_account: "KRAKEN".to_string(),
            method: TransferMethod::Ach,
            amount_cents: 1_000,
            receipt_id: None,
            notes: None,
            ledger_tracked,
            occurred_at: Utc::now(),
        });
        let (t, _) = Transfer::empty(id).execute(&cmd).unwrap();
        t.into_snapshot()
    }

    #[tokio::test]
    async fn commit_appends_and_summarizes() {
        let store = InMemoryBookStore::new();
        store
            .commit(Changeset {
                entries: income(2_500),
                ..Default::default()
            })
            .await
            .unwrap();

        let summary = store.summary(1).await.unwrap();
        assert_eq!(summary.entry_count, 2);
        assert_eq!(summary.recent_entries.len(), 1);
        assert_eq!(summary.balance_of(AccountCode::CashOnHand), 2_500);
        assert_eq!(store.balances().await.unwrap().total(), 0);
    }

    #[tokio::test]
    async fn unbalanced_changesets_are_refused() {
        let store = InMemoryBookStore::new();
        let mut entries = income(100);
        entries.pop();
        let err = store
            .commit(Changeset {
                entries,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidWrite(_)));
        assert_eq!(store.summary(10).await.unwrap().entry_count, 0);
    }

    #[tokio::test]
    async fn stale_transfer_write_leaves_nothing_behind() {
        let store = InMemoryBookStore::new();
        let transfer = planned(false);
        store
            .commit(Changeset {
                transfer: Some(TransferWrite {
                    transfer: transfer.clone(),
                    expected: ExpectedVersion::New,
                }),
                ..Default::default()
            })
            .await
            .unwrap();

        let err = store
            .commit(Changeset {
                entries: income(100),
                transfer: Some(TransferWrite {
                    transfer,
                    expected: ExpectedVersion::New,
                }),
                receipt: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));
        assert_eq!(store.summary(10).await.unwrap().entry_count, 0);
    }

    #[tokio::test]
    async fn blind_transfer_writes_are_refused() {
        let store = InMemoryBookStore::new();
        let err = store
            .commit(Changeset {
                entries: income(100),
                transfer: Some(TransferWrite {
                    transfer: planned(false),
                    expected: ExpectedVersion::Any,
                }),
                receipt: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidWrite(_)));
        assert_eq!(store.summary(10).await.unwrap().entry_count, 0);
        assert!(store.list_transfers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reset_keeps_manual_transfers() {
        let store = InMemoryBookStore::new();
        for tracked in [true, false] {
            store
                .commit(Changeset {
                    entries: income(100),
                    transfer: Some(TransferWrite {
                        transfer: planned(tracked),
                        expected: ExpectedVersion::New,
                    }),
                    receipt: None,
                })
                .await
                .unwrap();
        }

        let outcome = store.reset_ledger().await.unwrap();
        assert_eq!(outcome.entries_removed, 4);
        assert_eq!(outcome.transfers_removed, 1);

        let remaining = store.list_transfers().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(!remaining[0].ledger_tracked);
    }
}
