//! Postgres-backed book store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Concurrency` |
//! | Database (check constraint violation) | `23514` | `InvalidWrite` |
//! | Database (other) | Any other | `Storage` |
//! | PoolClosed / network / other | N/A | `Storage` |
//!
//! A compare-and-set miss (zero rows affected by a versioned `UPDATE`, or an
//! `INSERT ... ON CONFLICT DO NOTHING` that inserted nothing) is reported as
//! `Concurrency` and rolls the whole changeset back.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};
use uuid::Uuid;

use backoffice_accounting::{
    AccountCode, Balances, EntryDetails, LedgerAction, LedgerEntry, LedgerSummary,
};
use backoffice_core::{EntryId, ExpectedVersion, PostingId, ReceiptId, TransferId};
use backoffice_treasury::{
    PaymentReceipt, ReceiptMethod, ReceiptStatus, TransferMethod, TransferSnapshot, TransferStatus,
};

use super::r#trait::{BookStore, Changeset, ReceiptWrite, ResetOutcome, StoreError, TransferWrite};

/// Idempotent schema bootstrap, run on connect.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS ledger_entries (
        seq BIGSERIAL PRIMARY KEY,
        id UUID NOT NULL UNIQUE,
        posting_id UUID NOT NULL,
        account TEXT NOT NULL,
        amount_cents BIGINT NOT NULL CHECK (amount_cents <> 0),
        action TEXT NOT NULL,
        note TEXT,
        client_name TEXT,
        vendor TEXT,
        receipt_ref TEXT,
        transfer_id UUID,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS ledger_entries_account_idx ON ledger_entries (account)",
    r#"
    CREATE TABLE IF NOT EXISTS treasury_transfers (
        id UUID PRIMARY KEY,
        from_account TEXT NOT NULL,
        to_account TEXT NOT NULL,
        method TEXT NOT NULL,
        amount_cents BIGINT NOT NULL CHECK (amount_cents > 0),
        status TEXT NOT NULL,
        planned_at TIMESTAMPTZ NOT NULL,
        submitted_at TIMESTAMPTZ,
        confirmed_at TIMESTAMPTZ,
        canceled_at TIMESTAMPTZ,
        bank_ref TEXT,
        kraken_ref TEXT,
        notes TEXT,
        receipt_id UUID,
        ledger_tracked BOOLEAN NOT NULL DEFAULT FALSE,
        updated_at TIMESTAMPTZ NOT NULL,
        version BIGINT NOT NULL CHECK (version > 0)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS payment_receipts (
        id UUID PRIMARY KEY,
        method TEXT NOT NULL,
        amount_cents BIGINT NOT NULL CHECK (amount_cents > 0),
        status TEXT NOT NULL,
        payer_name TEXT,
        reference TEXT,
        note TEXT,
        transfer_id UUID,
        received_at TIMESTAMPTZ NOT NULL,
        version BIGINT NOT NULL CHECK (version > 0)
    )
    "#,
];

const ENTRY_COLUMNS: &str = "id, posting_id, account, amount_cents, action, note, client_name, \
     vendor, receipt_ref, transfer_id, created_at";

const TRANSFER_COLUMNS: &str = "id, from_account, to_account, method, amount_cents, status, \
     planned_at, submitted_at, confirmed_at, canceled_at, bank_ref, kraken_ref, notes, \
     receipt_id, ledger_tracked, updated_at, version";

const RECEIPT_COLUMNS: &str = "id, method, amount_cents, status, payer_name, reference, note, \
     transfer_id, received_at, version";

/// Postgres-backed book store.
///
/// Uses SQLx connection pool which is thread-safe (Arc + Send + Sync).
/// `commit` runs inside one transaction; reads that must agree with each
/// other (the ledger summary) share a `REPEATABLE READ` transaction.
#[derive(Debug, Clone)]
pub struct PostgresBookStore {
    pool: Arc<PgPool>,
}

impl PostgresBookStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and make sure the schema exists.
    #[instrument(skip(database_url), err)]
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

#[async_trait::async_trait]
impl BookStore for PostgresBookStore {
    #[instrument(
        skip(self, changes),
        fields(
            entry_count = changes.entries.len(),
            transfer_id = ?changes.transfer.as_ref().map(|w| w.transfer.id),
            receipt_id = ?changes.receipt.as_ref().map(|w| w.receipt.id)
        ),
        err
    )]
    async fn commit(&self, changes: Changeset) -> Result<(), StoreError> {
        changes.validate()?;
        if changes.is_empty() {
            return Ok(());
        }

        let mut tx = self.begin().await?;

        // Dropping `tx` on an early return rolls everything back.
        for entry in &changes.entries {
            insert_entry(&mut tx, entry).await?;
        }
        if let Some(write) = &changes.transfer {
            write_transfer(&mut tx, write).await?;
        }
        if let Some(write) = &changes.receipt {
            write_receipt(&mut tx, write).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn balances(&self) -> Result<Balances, StoreError> {
        let mut tx = self.begin().await?;
        let balances = load_balances(&mut tx).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(balances)
    }

    #[instrument(skip(self), fields(entry_count = tracing::field::Empty), err)]
    async fn summary(&self, recent_limit: usize) -> Result<LedgerSummary, StoreError> {
        let mut tx = self.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_isolation", e))?;

        let balances = load_balances(&mut tx).await?;

        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries ORDER BY seq DESC LIMIT $1"
        ))
        .bind(recent_limit as i64)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("recent_entries", e))?;
        let recent = rows
            .iter()
            .map(|row| LedgerEntry::try_from(decode::<EntryRow>(row)?))
            .collect::<Result<Vec<_>, _>>()?;

        let count: i64 = sqlx::query("SELECT COUNT(*) AS total FROM ledger_entries")
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("entry_count", e))?
            .try_get("total")
            .map_err(|e| StoreError::Decode(format!("failed to read count: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Span::current().record("entry_count", count);
        Ok(LedgerSummary::build(&balances, recent, count as u64))
    }

    #[instrument(skip(self), fields(transfer_id = %id), err)]
    async fn get_transfer(&self, id: TransferId) -> Result<Option<TransferSnapshot>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM treasury_transfers WHERE id = $1"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_transfer", e))?;

        row.map(|row| TransferSnapshot::try_from(decode::<TransferRow>(&row)?))
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_transfers(&self) -> Result<Vec<TransferSnapshot>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM treasury_transfers ORDER BY planned_at DESC, id DESC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_transfers", e))?;

        rows.iter()
            .map(|row| TransferSnapshot::try_from(decode::<TransferRow>(row)?))
            .collect()
    }

    #[instrument(skip(self), fields(receipt_id = %id), err)]
    async fn get_receipt(&self, id: ReceiptId) -> Result<Option<PaymentReceipt>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM payment_receipts WHERE id = $1"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_receipt", e))?;

        row.map(|row| PaymentReceipt::try_from(decode::<ReceiptRow>(&row)?))
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_receipts(&self) -> Result<Vec<PaymentReceipt>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM payment_receipts ORDER BY received_at DESC, id DESC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_receipts", e))?;

        rows.iter()
            .map(|row| PaymentReceipt::try_from(decode::<ReceiptRow>(row)?))
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn reset_ledger(&self) -> Result<ResetOutcome, StoreError> {
        let mut tx = self.begin().await?;

        let entries_removed = sqlx::query("DELETE FROM ledger_entries")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("reset_entries", e))?
            .rows_affected();

        let transfers_removed = sqlx::query("DELETE FROM treasury_transfers WHERE ledger_tracked")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("reset_transfers", e))?
            .rows_affected();

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(ResetOutcome {
            entries_removed,
            transfers_removed,
        })
    }
}

async fn load_balances(tx: &mut Transaction<'_, Postgres>) -> Result<Balances, StoreError> {
    let rows = sqlx::query(
        r#"
        SELECT account, SUM(amount_cents)::BIGINT AS total
        FROM ledger_entries
        GROUP BY account
        "#,
    )
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("balances", e))?;

    let mut totals = Vec::with_capacity(rows.len());
    for row in rows {
        let account: String = row
            .try_get("account")
            .map_err(|e| StoreError::Decode(format!("failed to read account: {e}")))?;
        let total: i64 = row
            .try_get("total")
            .map_err(|e| StoreError::Decode(format!("failed to read total: {e}")))?;
        totals.push((parse_column::<AccountCode>("account", &account)?, total));
    }
    Ok(Balances::from_totals(totals))
}

async fn insert_entry(tx: &mut Transaction<'_, Postgres>, e: &LedgerEntry) -> Result<(), StoreError> {
    sqlx::query(&format!(
        "INSERT INTO ledger_entries ({ENTRY_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
    ))
    .bind(*e.id.as_uuid())
    .bind(*e.posting_id.as_uuid())
    .bind(e.account.code())
    .bind(e.amount_cents)
    .bind(e.action.as_str())
    .bind(e.details.note.as_deref())
    .bind(e.details.client_name.as_deref())
    .bind(e.details.vendor.as_deref())
    .bind(e.details.receipt_ref.as_deref())
    .bind(e.transfer_id.map(|id| *id.as_uuid()))
    .bind(e.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|err| map_sqlx_error("insert_entry", err))?;
    Ok(())
}

async fn write_transfer(tx: &mut Transaction<'_, Postgres>, w: &TransferWrite) -> Result<(), StoreError> {
    let t = &w.transfer;
    let version = version_to_row(t.version)?;

    let affected = match w.expected {
        ExpectedVersion::Exact(expected) => sqlx::query(
            r#"
            UPDATE treasury_transfers SET
                status = $2,
                submitted_at = $3,
                confirmed_at = $4,
                canceled_at = $5,
                bank_ref = $6,
                kraken_ref = $7,
                notes = $8,
                updated_at = $9,
                version = $10
            WHERE id = $1 AND version = $11
            "#,
        )
        .bind(*t.id.as_uuid())
        .bind(t.status.as_str())
        .bind(t.submitted_at)
        .bind(t.confirmed_at)
        .bind(t.canceled_at)
        .bind(t.bank_ref.as_deref())
        .bind(t.kraken_ref.as_deref())
        .bind(t.notes.as_deref())
        .bind(t.updated_at)
        .bind(version)
        .bind(version_to_row(expected)?)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("update_transfer", e))?
        .rows_affected(),
        ExpectedVersion::New => sqlx::query(&format!(
            "INSERT INTO treasury_transfers ({TRANSFER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             ON CONFLICT (id) DO NOTHING"
        ))
        .bind(*t.id.as_uuid())
        .bind(t.from_account.as_str())
        .bind(t.to_account.as_str())
        .bind(t.method.as_str())
        .bind(t.amount_cents)
        .bind(t.status.as_str())
        .bind(t.planned_at)
        .bind(t.submitted_at)
        .bind(t.confirmed_at)
        .bind(t.canceled_at)
        .bind(t.bank_ref.as_deref())
        .bind(t.kraken_ref.as_deref())
        .bind(t.notes.as_deref())
        .bind(t.receipt_id.map(|id| *id.as_uuid()))
        .bind(t.ledger_tracked)
        .bind(t.updated_at)
        .bind(version)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_transfer", e))?
        .rows_affected(),
        ExpectedVersion::Any => return Err(blind_write("transfer", t.id)),
    };

    if affected == 0 {
        return Err(StoreError::Concurrency(format!(
            "transfer {}: expected {:?}",
            t.id, w.expected
        )));
    }
    Ok(())
}

async fn write_receipt(tx: &mut Transaction<'_, Postgres>, w: &ReceiptWrite) -> Result<(), StoreError> {
    let r = &w.receipt;
    let version = version_to_row(r.version)?;

    let affected = match w.expected {
        ExpectedVersion::Exact(expected) => sqlx::query(
            r#"
            UPDATE payment_receipts SET
                status = $2,
                payer_name = $3,
                reference = $4,
                note = $5,
                transfer_id = $6,
                version = $7
            WHERE id = $1 AND version = $8
            "#,
        )
        .bind(*r.id.as_uuid())
        .bind(r.status.as_str())
        .bind(r.payer_name.as_deref())
        .bind(r.reference.as_deref())
        .bind(r.note.as_deref())
        .bind(r.transfer_id.map(|id| *id.as_uuid()))
        .bind(version)
        .bind(version_to_row(expected)?)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("update_receipt", e))?
        .rows_affected(),
        ExpectedVersion::New => sqlx::query(&format!(
            "INSERT INTO payment_receipts ({RECEIPT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (id) DO NOTHING"
        ))
        .bind(*r.id.as_uuid())
        .bind(r.method.as_str())
        .bind(r.amount_cents)
        .bind(r.status.as_str())
        .bind(r.payer_name.as_deref())
        .bind(r.reference.as_deref())
        .bind(r.note.as_deref())
        .bind(r.transfer_id.map(|id| *id.as_uuid()))
        .bind(r.received_at)
        .bind(version)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_receipt", e))?
        .rows_affected(),
        ExpectedVersion::Any => return Err(blind_write("receipt", r.id)),
    };

    if affected == 0 {
        return Err(StoreError::Concurrency(format!(
            "receipt {}: expected {:?}",
            r.id, w.expected
        )));
    }
    Ok(())
}

/// Map SQLx errors to `StoreError` (see module docs).
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Concurrency(msg),
                Some("23514") => StoreError::InvalidWrite(msg),
                _ => StoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Storage(format!("connection pool closed in {operation}"))
        }
        _ => StoreError::Storage(format!("sqlx error in {operation}: {err}")),
    }
}

fn decode<'r, T: FromRow<'r, PgRow>>(row: &'r PgRow) -> Result<T, StoreError> {
    T::from_row(row).map_err(|e| StoreError::Decode(e.to_string()))
}

fn parse_column<T>(column: &str, value: &str) -> Result<T, StoreError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    value
        .parse()
        .map_err(|e| StoreError::Decode(format!("bad {column} '{value}': {e}")))
}

fn version_from_row(version: i64) -> Result<u64, StoreError> {
    u64::try_from(version).map_err(|_| StoreError::Decode(format!("negative version {version}")))
}

fn version_to_row(version: u64) -> Result<i64, StoreError> {
    i64::try_from(version)
        .map_err(|_| StoreError::InvalidWrite(format!("version {version} exceeds BIGINT")))
}

fn blind_write(kind: &str, id: impl std::fmt::Display) -> StoreError {
    StoreError::InvalidWrite(format!("{kind} {id}: writes need an expected version"))
}

#[derive(Debug)]
struct EntryRow {
    id: Uuid,
    posting_id: Uuid,
    account: String,
    amount_cents: i64,
    action: String,
    note: Option<String>,
    client_name: Option<String>,
    vendor: Option<String>,
    receipt_ref: Option<String>,
    transfer_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for EntryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(EntryRow {
            id: row.try_get("id")?,
            posting_id: row.try_get("posting_id")?,
            account: row.try_get("account")?,
            amount_cents: row.try_get("amount_cents")?,
            action: row.try_get("action")?,
            note: row.try_get("note")?,
            client_name: row.try_get("client_name")?,
            vendor: row.try_get("vendor")?,
            receipt_ref: row.try_get("receipt_ref")?,
            transfer_id: row.try_get("transfer_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<EntryRow> for LedgerEntry {
    type Error = StoreError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(LedgerEntry {
            id: EntryId::from_uuid(row.id),
            posting_id: PostingId::from_uuid(row.posting_id),
            account: parse_column::<AccountCode>("account", &row.account)?,
            amount_cents: row.amount_cents,
            action: parse_column::<LedgerAction>("action", &row.action)?,
            details: EntryDetails {
                note: row.note,
                client_name: row.client_name,
                vendor: row.vendor,
                receipt_ref: row.receipt_ref,
            },
            transfer_id: row.transfer_id.map(TransferId::from_uuid),
            created_at: row.created_at,
        })
    }
}

#[derive(Debug)]
struct TransferRow {
    id: Uuid,
    from_account: String,
    to_account: String,
    method: String,
    amount_cents: i64,
    status: String,
    planned_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
    confirmed_at: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
    bank_ref: Option<String>,
    kraken_ref: Option<String>,
    notes: Option<String>,
    receipt_id: Option<Uuid>,
    ledger_tracked: bool,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl<'r> FromRow<'r, PgRow> for TransferRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(TransferRow {
            id: row.try_get("id")?,
            from_account: row.try_get("from_account")?,
            to_account: row.try_get("to_account")?,
            method: row.try_get("method")?,
            amount_cents: row.try_get("amount_cents")?,
            status: row.try_get("status")?,
            planned_at: row.try_get("planned_at")?,
            submitted_at: row.try_get("submitted_at")?,
            confirmed_at: row.try_get("confirmed_at")?,
            canceled_at: row.try_get("canceled_at")?,
            bank_ref: row.try_get("bank_ref")?,
            kraken_ref: row.try_get("kraken_ref")?,
            notes: row.try_get("notes")?,
            receipt_id: row.try_get("receipt_id")?,
            ledger_tracked: row.try_get("ledger_tracked")?,
            updated_at: row.try_get("updated_at")?,
            version: row.try_get("version")?,
        })
    }
}

impl TryFrom<TransferRow> for TransferSnapshot {
    type Error = StoreError;

    fn try_from(row: TransferRow) -> Result<Self, Self::Error> {
        Ok(TransferSnapshot {
            id: TransferId::from_uuid(row.id),
            from_account: row.from_account,
            to_account: row.to_account,
            method: parse_column::<TransferMethod>("method", &row.method)?,
            amount_cents: row.amount_cents,
            status: parse_column::<TransferStatus>("status", &row.status)?,
            planned_at: row.planned_at,
            submitted_at: row.submitted_at,
            confirmed_at: row.confirmed_at,
            canceled_at: row.canceled_at,
            bank_ref: row.bank_ref,
            kraken_ref: row.kraken_ref,
            notes: row.notes,
            receipt_id: row.receipt_id.map(ReceiptId::from_uuid),
            ledger_tracked: row.ledger_tracked,
            updated_at: row.updated_at,
            version: version_from_row(row.version)?,
        })
    }
}

#[derive(Debug)]
struct ReceiptRow {
    id: Uuid,
    method: String,
    amount_cents: i64,
    status: String,
    payer_name: Option<String>,
    reference: Option<String>,
    note: Option<String>,
    transfer_id: Option<Uuid>,
    received_at: DateTime<Utc>,
    version: i64,
}

impl<'r> FromRow<'r, PgRow> for ReceiptRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ReceiptRow {
            id: row.try_get("id")?,
            method: row.try_get("method")?,
            amount_cents: row.try_get("amount_cents")?,
            status: row.try_get("status")?,
            payer_name: row.try_get("payer_name")?,
            reference: row.try_get("reference")?,
            note: row.try_get("note")?,
            transfer_id: row.try_get("transfer_id")?,
            received_at: row.try_get("received_at")?,
            version: row.try_get("version")?,
        })
    }
}

impl TryFrom<ReceiptRow> for PaymentReceipt {
    type Error = StoreError;

    fn try_from(row: ReceiptRow) -> Result<Self, Self::Error> {
        Ok(PaymentReceipt {
            id: ReceiptId::from_uuid(row.id),
            method: parse_column::<ReceiptMethod>("method", &row.method)?,
            amount_cents: row.amount_cents,
            status: parse_column::<ReceiptStatus>("status", &row.status)?,
            payer_name: row.payer_name,
            reference: row.reference,
            note: row.note,
            transfer_id: row.transfer_id.map(TransferId::from_uuid),
            received_at: row.received_at,
            version: version_from_row(row.version)?,
        })
    }
}
