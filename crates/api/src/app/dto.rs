use serde::Deserialize;
use serde_json::{Value, json};

use backoffice_accounting::{LedgerEntry, LedgerRequest, LedgerSummary};
use backoffice_core::{DomainError, DomainResult, ReceiptId, TransferId, cents_to_usd, usd_to_cents};
use backoffice_infra::{LedgerOutcome, NewTransfer, TransferPatch};
use backoffice_treasury::{
    NewReceipt, PaymentReceipt, ReceiptMethod, ReceiptStatus, TransferMethod, TransferSnapshot,
};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRequestBody {
    pub action: Option<String>,
    /// Kept raw so a non-numeric value is an amount error, not a body error.
    pub amount_usd: Option<Value>,
    pub client_name: Option<String>,
    pub note: Option<String>,
    pub transfer_id: Option<String>,
    pub category: Option<String>,
    pub vendor: Option<String>,
    pub paid_from: Option<String>,
    pub receipt_ref: Option<String>,
}

impl LedgerRequestBody {
    pub fn into_request(self) -> DomainResult<LedgerRequest> {
        let action = self
            .action
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .ok_or_else(|| DomainError::invalid_operation("action is required"))?;

        Ok(LedgerRequest {
            action,
            amount_usd: parse_amount(self.amount_usd)?,
            client_name: self.client_name,
            note: self.note,
            transfer_id: self.transfer_id,
            category: self.category,
            vendor: self.vendor,
            paid_from: self.paid_from,
            receipt_ref: self.receipt_ref,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTransferRequest {
    pub status: Option<String>,
    pub bank_ref: Option<String>,
    pub kraken_ref: Option<String>,
    pub notes: Option<String>,
}

impl From<UpdateTransferRequest> for TransferPatch {
    fn from(body: UpdateTransferRequest) -> Self {
        TransferPatch {
            status: body.status,
            bank_ref: body.bank_ref,
            kraken_ref: body.kraken_ref,
            notes: body.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransferRequest {
    pub from_account: Option<String>,
    pub to_account: Option<String>,
    pub method: Option<String>,
    pub amount_usd: Option<Value>,
    pub receipt_id: Option<String>,
    pub notes: Option<String>,
}

impl CreateTransferRequest {
    pub fn into_new_transfer(self) -> DomainResult<NewTransfer> {
        let method = required(self.method, "method")?.parse::<TransferMethod>()?;
        let amount_usd = parse_amount(self.amount_usd)?
            .ok_or_else(|| DomainError::invalid_amount("amountUsd is required"))?;
        let receipt_id = match self.receipt_id.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => Some(parse_receipt_id(s)?),
            _ => None,
        };

        Ok(NewTransfer {
            from_account: self.from_account.unwrap_or_default(),
            to_account: self.to_account.unwrap_or_default(),
            method,
            amount_cents: usd_to_cents(amount_usd)?,
            receipt_id,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReceiptRequest {
    pub method: Option<String>,
    pub amount_usd: Option<Value>,
    pub status: Option<String>,
    pub payer_name: Option<String>,
    pub reference: Option<String>,
    pub note: Option<String>,
}

impl CreateReceiptRequest {
    pub fn into_new_receipt(self) -> DomainResult<NewReceipt> {
        let method = required(self.method, "method")?.parse::<ReceiptMethod>()?;
        let amount_usd = parse_amount(self.amount_usd)?
            .ok_or_else(|| DomainError::invalid_amount("amountUsd is required"))?;
        let status = match self.status.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.parse::<ReceiptStatus>()?,
            _ => ReceiptStatus::default(),
        };

        Ok(NewReceipt {
            method,
            amount_cents: usd_to_cents(amount_usd)?,
            status,
            payer_name: self.payer_name,
            reference: self.reference,
            note: self.note,
        })
    }
}

/// `amountUsd` may arrive as a JSON number or a numeric string.
pub fn parse_amount(raw: Option<Value>) -> DomainResult<Option<f64>> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| DomainError::invalid_amount("amountUsd must be a number")),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| DomainError::invalid_amount(format!("amountUsd '{s}' is not a number"))),
        Some(_) => Err(DomainError::invalid_amount("amountUsd must be a number")),
    }
}

fn required(value: Option<String>, field: &str) -> DomainResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DomainError::validation(format!("{field} is required")))
}

/// Path ids are opaque: one that cannot name a record is not found.
pub fn parse_transfer_id(raw: &str) -> DomainResult<TransferId> {
    raw.parse::<TransferId>()
        .map_err(|_| DomainError::not_found(format!("transfer {raw} not found")))
}

pub fn parse_receipt_id(raw: &str) -> DomainResult<ReceiptId> {
    raw.parse::<ReceiptId>()
        .map_err(|_| DomainError::not_found(format!("receipt {raw} not found")))
}

// -------------------------
// Response mapping
// -------------------------

pub fn entry_to_json(e: &LedgerEntry) -> Value {
    json!({
        "id": e.id.to_string(),
        "postingId": e.posting_id.to_string(),
        "account": e.account.code(),
        "amountCents": e.amount_cents,
        "action": e.action.as_str(),
        "note": e.details.note,
        "clientName": e.details.client_name,
        "vendor": e.details.vendor,
        "receiptRef": e.details.receipt_ref,
        "transferId": e.transfer_id.map(|id| id.to_string()),
        "createdAt": e.created_at.to_rfc3339(),
    })
}

pub fn summary_to_json(s: &LedgerSummary) -> Value {
    json!({
        "accounts": s.accounts.iter().map(|a| json!({
            "id": a.account.code(),
            "name": a.name,
            "kind": a.kind.as_str(),
            "balanceCents": a.balance_cents,
            "balanceUsd": cents_to_usd(a.balance_cents),
        })).collect::<Vec<_>>(),
        "recentEntries": s.recent_entries.iter().map(entry_to_json).collect::<Vec<_>>(),
        "entryCount": s.entry_count,
    })
}

pub fn transfer_to_json(t: &TransferSnapshot) -> Value {
    json!({
        "id": t.id.to_string(),
        "fromAccount": t.from_account,
        "toAccount": t.to_account,
        "method": t.method.as_str(),
        "amountCents": t.amount_cents,
        "amountUsd": cents_to_usd(t.amount_cents),
        "status": t.status.as_str(),
        "plannedAt": t.planned_at.to_rfc3339(),
        "submittedAt": t.submitted_at.map(|d| d.to_rfc3339()),
        "confirmedAt": t.confirmed_at.map(|d| d.to_rfc3339()),
        "canceledAt": t.canceled_at.map(|d| d.to_rfc3339()),
        "bankRef": t.bank_ref,
        "krakenRef": t.kraken_ref,
        "notes": t.notes,
        "receiptId": t.receipt_id.map(|id| id.to_string()),
        "ledgerTracked": t.ledger_tracked,
        "updatedAt": t.updated_at.to_rfc3339(),
        "version": t.version,
    })
}

pub fn receipt_to_json(r: &PaymentReceipt) -> Value {
    json!({
        "id": r.id.to_string(),
        "method": r.method.as_str(),
        "amountCents": r.amount_cents,
        "amountUsd": cents_to_usd(r.amount_cents),
        "status": r.status.as_str(),
        "payerName": r.payer_name,
        "reference": r.reference,
        "note": r.note,
        "transferId": r.transfer_id.map(|id| id.to_string()),
        "receivedAt": r.received_at.to_rfc3339(),
    })
}

pub fn ledger_outcome_to_json(out: &LedgerOutcome) -> Value {
    let mut result = json!({
        "action": out.action.as_str(),
        "entries": out.entries.iter().map(entry_to_json).collect::<Vec<_>>(),
    });
    if let Some(t) = &out.transfer {
        result["transfer"] = transfer_to_json(t);
    }
    if let Some(r) = &out.reset {
        result["reset"] = json!({
            "entriesRemoved": r.entries_removed,
            "transfersRemoved": r.transfers_removed,
        });
    }

    json!({
        "result": result,
        "summary": summary_to_json(&out.summary),
    })
}
