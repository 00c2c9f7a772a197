//! Back-office orchestration: the only writer to the books.
//!
//! ```text
//! request
//!   ↓
//! 1. Parse into a typed command (pure)
//!   ↓
//! 2. Load the transfer/receipt it touches, remembering its version
//!   ↓
//! 3. Decide entries and the next aggregate state (pure)
//!   ↓
//! 4. Commit everything as one changeset (compare-and-set on versions)
//!   ↓
//! 5. Read back the summary
//! ```

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use backoffice_accounting::{
    AccountCode, AccountKind, EntryDetails, LedgerAction, LedgerCommand, LedgerEntry,
    LedgerOperation, LedgerRequest, LedgerSummary, Movement, prepare_posting,
};
use backoffice_core::{
    Aggregate, AggregateRoot, DomainError, ExpectedVersion, ReceiptId, TransferId,
};
use backoffice_treasury::{
    NewReceipt, PaymentReceipt, PlanTransfer, Transfer, TransferCommand, TransferEvent,
    TransferMethod, TransferSnapshot, TransferStatus, UpdateTransfer,
};

use crate::config::Environment;
use crate::store::{BookStore, Changeset, ReceiptWrite, ResetOutcome, StoreError, TransferWrite};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Deterministic business failure; safe to show to the caller.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Storage failed for reasons unrelated to the request.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency(msg) => ServiceError::Domain(DomainError::Conflict(msg)),
            other => ServiceError::Store(other),
        }
    }
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Domain(e) => e.code(),
            ServiceError::Store(_) => "storage_error",
        }
    }
}

/// Result of one `POST /ledger` style request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerOutcome {
    pub action: LedgerAction,
    /// Entries written by this request (empty for summary/reset).
    pub entries: Vec<LedgerEntry>,
    /// Transfer created or advanced by this request.
    pub transfer: Option<TransferSnapshot>,
    pub reset: Option<ResetOutcome>,
    pub summary: LedgerSummary,
}

/// Input for a manually planned transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransfer {
    pub from_account: String,
    pub to_account: String,
    pub method: TransferMethod,
    pub amount_cents: i64,
    pub receipt_id: Option<ReceiptId>,
    pub notes: Option<String>,
}

/// Partial update of a transfer. `status` is still a raw string here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferPatch {
    pub status: Option<String>,
    pub bank_ref: Option<String>,
    pub kraken_ref: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug)]
pub struct BackOffice<S> {
    store: S,
    environment: Environment,
    recent_limit: usize,
}

impl<S> BackOffice<S> {
    pub fn new(store: S, environment: Environment, recent_limit: usize) -> Self {
        Self {
            store,
            environment,
            recent_limit,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }
}

impl<S: BookStore> BackOffice<S> {
    /// Parse and execute a raw ledger request.
    #[instrument(skip(self, request), fields(action = %request.action))]
    pub async fn handle_ledger_request(
        &self,
        request: LedgerRequest,
    ) -> Result<LedgerOutcome, ServiceError> {
        let command = LedgerCommand::parse(request)?;
        self.execute_ledger(command).await
    }

    pub async fn execute_ledger(&self, command: LedgerCommand) -> Result<LedgerOutcome, ServiceError> {
        let action = command.action();

        let (entries, transfer, reset) = match command {
            LedgerCommand::Summary => (Vec::new(), None, None),
            LedgerCommand::Reset => (Vec::new(), None, Some(self.reset_ledger().await?)),
            LedgerCommand::Post(op) => {
                let (entries, transfer) = self.post(op).await?;
                (entries, transfer, None)
            }
            LedgerCommand::CompleteTransfer {
                transfer_id,
                details,
            } => {
                let (entries, transfer) = self
                    .close_exchange_transfer(transfer_id, TransferStatus::Confirmed, details)
                    .await?;
                (entries, Some(transfer), None)
            }
            LedgerCommand::CancelTransfer {
                transfer_id,
                details,
            } => {
                let (entries, transfer) = self
                    .close_exchange_transfer(transfer_id, TransferStatus::Canceled, details)
                    .await?;
                (entries, Some(transfer), None)
            }
        };

        let summary = self.summary().await?;
        warn_on_overdraft(&entries, &summary);

        Ok(LedgerOutcome {
            action,
            entries,
            transfer,
            reset,
            summary,
        })
    }

    pub async fn summary(&self) -> Result<LedgerSummary, ServiceError> {
        Ok(self.store.summary(self.recent_limit).await?)
    }

    /// Post a money-moving operation. Exchange transfers also open a
    /// ledger-tracked transfer, already SUBMITTED, in the same commit.
    async fn post(
        &self,
        op: LedgerOperation,
    ) -> Result<(Vec<LedgerEntry>, Option<TransferSnapshot>), ServiceError> {
        let now = Utc::now();

        let transfer = if op.is_exchange_transfer() {
            Some(open_exchange_transfer(&op, now)?)
        } else {
            None
        };

        let posting = prepare_posting(&op, transfer.as_ref().map(|t| t.id), now)?;

        self.store
            .commit(Changeset {
                entries: posting.entries.clone(),
                transfer: transfer.clone().map(|transfer| TransferWrite {
                    transfer,
                    expected: ExpectedVersion::New,
                }),
                receipt: None,
            })
            .await?;

        info!(
            action = %posting.action,
            posting_id = %posting.id,
            amount_cents = op.movement().amount_cents,
            transfer_id = ?transfer.as_ref().map(|t| t.id),
            "ledger posting committed"
        );

        Ok((posting.entries, transfer))
    }

    /// `completeTransfer` / `cancelTransfer`: only exchange transfers hold
    /// funds in `KRAKEN_PENDING`.
    async fn close_exchange_transfer(
        &self,
        transfer_id: TransferId,
        status: TransferStatus,
        details: EntryDetails,
    ) -> Result<(Vec<LedgerEntry>, TransferSnapshot), ServiceError> {
        let current = self.load_transfer(transfer_id).await?;
        if !current.is_ledger_tracked() {
            return Err(DomainError::invalid_operation(format!(
                "transfer {transfer_id} has no funds in {}; update its status instead",
                AccountCode::KrakenPending
            ))
            .into());
        }

        let update = UpdateTransfer {
            status: Some(status),
            occurred_at: Utc::now(),
            ..Default::default()
        };
        self.advance_transfer(current, update, details).await
    }

    #[instrument(skip(self))]
    async fn reset_ledger(&self) -> Result<ResetOutcome, ServiceError> {
        if self.environment.is_production() {
            return Err(DomainError::forbidden("resetLedger is disabled in production").into());
        }

        let outcome = self.store.reset_ledger().await?;
        warn!(
            environment = %self.environment,
            entries_removed = outcome.entries_removed,
            transfers_removed = outcome.transfers_removed,
            "ledger reset"
        );
        Ok(outcome)
    }

    /// Plan a transfer, optionally funded by an existing receipt.
    #[instrument(skip(self, input), fields(method = %input.method, amount_cents = input.amount_cents))]
    pub async fn create_transfer(&self, input: NewTransfer) -> Result<TransferSnapshot, ServiceError> {
        let transfer_id = TransferId::new();
        let plan = TransferCommand::Plan(PlanTransfer {
            transfer_id,
            from_account: input.from_account,
            to_account: input.to_account,
            method: input.method,
            amount_cents: input.amount_cents,
            receipt_id: input.receipt_id,
            notes: input.notes,
            ledger_tracked: false,
            occurred_at: Utc::now(),
        });
        let (transfer, _) = Transfer::empty(transfer_id).execute(&plan)?;

        let receipt = match input.receipt_id {
            Some(receipt_id) => {
                let mut receipt = self.load_receipt(receipt_id).await?;
                let expected = ExpectedVersion::Exact(receipt.version);
                receipt.link_transfer(transfer_id)?;
                Some(ReceiptWrite { receipt, expected })
            }
            None => None,
        };

        let snapshot = transfer.into_snapshot();
        self.store
            .commit(Changeset {
                entries: Vec::new(),
                transfer: Some(TransferWrite {
                    transfer: snapshot.clone(),
                    expected: ExpectedVersion::New,
                }),
                receipt,
            })
            .await?;

        info!(transfer_id = %snapshot.id, "transfer planned");
        Ok(snapshot)
    }

    /// Apply a status change and/or reference edits.
    ///
    /// Confirming a ledger-tracked transfer settles it on the ledger in the
    /// same commit, exactly as `completeTransfer` does.
    #[instrument(skip(self, patch), fields(status = ?patch.status))]
    pub async fn update_transfer(
        &self,
        transfer_id: TransferId,
        patch: TransferPatch,
    ) -> Result<TransferSnapshot, ServiceError> {
        let status = match patch.status.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => Some(s.parse::<TransferStatus>()?),
            _ => None,
        };
        let update = UpdateTransfer {
            status,
            bank_ref: patch.bank_ref,
            kraken_ref: patch.kraken_ref,
            notes: patch.notes,
            occurred_at: Utc::now(),
        };

        let current = self.load_transfer(transfer_id).await?;
        let (_, transfer) = self
            .advance_transfer(current, update, EntryDetails::default())
            .await?;
        Ok(transfer)
    }

    /// The single path that moves a stored transfer forward.
    ///
    /// A ledger-tracked transfer leaves `KRAKEN_PENDING` in the same commit
    /// as its terminal status: into `KRAKEN` when confirmed, back to
    /// `BANK_FULTON` when canceled.
    async fn advance_transfer(
        &self,
        current: Transfer,
        update: UpdateTransfer,
        details: EntryDetails,
    ) -> Result<(Vec<LedgerEntry>, TransferSnapshot), ServiceError> {
        let expected = ExpectedVersion::Exact(current.version());
        let (next, events) = current.execute(&TransferCommand::Update(update))?;

        let reached = events.iter().find_map(|e| match e {
            TransferEvent::StatusChanged(c) if c.to.is_terminal() => Some(c.to),
            _ => None,
        });

        let entries = match reached {
            Some(status) if next.is_ledger_tracked() => {
                let transfer_id = next.id_typed();
                let details = if details == EntryDetails::default() {
                    EntryDetails {
                        note: Some(format!(
                            "Transfer {transfer_id} {}",
                            status.as_str().to_ascii_lowercase()
                        )),
                        ..Default::default()
                    }
                } else {
                    details
                };
                let movement = Movement {
                    amount_cents: next.amount_cents(),
                    details,
                };
                let op = if status == TransferStatus::Confirmed {
                    LedgerOperation::SettleTransfer {
                        transfer_id,
                        movement,
                    }
                } else {
                    LedgerOperation::ReverseTransfer {
                        transfer_id,
                        movement,
                    }
                };
                prepare_posting(&op, None, next.snapshot().updated_at)?.entries
            }
            _ => Vec::new(),
        };

        let snapshot = next.into_snapshot();
        self.store
            .commit(Changeset {
                entries: entries.clone(),
                transfer: Some(TransferWrite {
                    transfer: snapshot.clone(),
                    expected,
                }),
                receipt: None,
            })
            .await?;

        for event in &events {
            info!(
                transfer_id = %snapshot.id,
                event_type = event.event_type(),
                version = snapshot.version,
                "transfer updated"
            );
        }
        if !entries.is_empty() {
            info!(
                transfer_id = %snapshot.id,
                status = %snapshot.status,
                amount_cents = snapshot.amount_cents,
                "pending transfer closed on the ledger"
            );
        }

        Ok((entries, snapshot))
    }

    pub async fn get_transfer(&self, transfer_id: TransferId) -> Result<TransferSnapshot, ServiceError> {
        Ok(self.load_transfer(transfer_id).await?.into_snapshot())
    }

    pub async fn list_transfers(&self) -> Result<Vec<TransferSnapshot>, ServiceError> {
        Ok(self.store.list_transfers().await?)
    }

    #[instrument(skip(self, input), fields(method = %input.method, amount_cents = input.amount_cents))]
    pub async fn create_receipt(&self, input: NewReceipt) -> Result<PaymentReceipt, ServiceError> {
        let receipt = PaymentReceipt::record(input, Utc::now())?;
        self.store
            .commit(Changeset {
                receipt: Some(ReceiptWrite {
                    receipt: receipt.clone(),
                    expected: ExpectedVersion::New,
                }),
                ..Default::default()
            })
            .await?;

        info!(receipt_id = %receipt.id, "payment receipt recorded");
        Ok(receipt)
    }

    pub async fn get_receipt(&self, receipt_id: ReceiptId) -> Result<PaymentReceipt, ServiceError> {
        self.load_receipt(receipt_id).await
    }

    pub async fn list_receipts(&self) -> Result<Vec<PaymentReceipt>, ServiceError> {
        Ok(self.store.list_receipts().await?)
    }

    async fn load_transfer(&self, transfer_id: TransferId) -> Result<Transfer, ServiceError> {
        let snapshot = self
            .store
            .get_transfer(transfer_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("transfer {transfer_id} not found")))?;
        Ok(Transfer::from_snapshot(snapshot))
    }

    async fn load_receipt(&self, receipt_id: ReceiptId) -> Result<PaymentReceipt, ServiceError> {
        Ok(self
            .store
            .get_receipt(receipt_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("receipt {receipt_id} not found")))?)
    }
}

/// PLANNED then SUBMITTED: the bank leg has already left when the entry is booked.
fn open_exchange_transfer(
    op: &LedgerOperation,
    now: chrono::DateTime<Utc>,
) -> Result<TransferSnapshot, DomainError> {
    let method = match op {
        LedgerOperation::WireToKraken(_) => TransferMethod::Wire,
        _ => TransferMethod::Ach,
    };
    let movement = op.movement();
    let transfer_id = TransferId::new();

    let plan = TransferCommand::Plan(PlanTransfer {
        transfer_id,
        from_account: AccountCode::BankFulton.code(),
        to_account: AccountCode::Kraken.code(),
        method,
        amount_cents: movement.amount_cents,
        receipt_id: None,
        notes: movement.details.note.clone(),
        ledger_tracked: true,
        occurred_at: now,
    });
    let submit = TransferCommand::Update(UpdateTransfer {
        status: Some(TransferStatus::Submitted),
        occurred_at: now,
        ..Default::default()
    });

    let (planned, _) = Transfer::empty(transfer_id).execute(&plan)?;
    let (submitted, _) = planned.execute(&submit)?;
    Ok(submitted.into_snapshot())
}

/// Overdrafts are allowed; a negative asset balance is only reported.
fn warn_on_overdraft(entries: &[LedgerEntry], summary: &LedgerSummary) {
    for entry in entries.iter().filter(|e| e.amount_cents < 0) {
        if entry.account.kind() != AccountKind::Asset {
            continue;
        }
        let balance = summary.balance_of(entry.account);
        if balance < 0 {
            warn!(account = %entry.account, balance_cents = balance, "asset account overdrawn");
        }
    }
}
