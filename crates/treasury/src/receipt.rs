use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use backoffice_core::{DomainError, DomainResult, ReceiptId, TransferId};

/// How the money arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReceiptMethod {
    Cash,
    Ach,
    Wire,
    Check,
    Stripe,
    Zelle,
    Other,
}

impl ReceiptMethod {
    pub const ALL: [ReceiptMethod; 7] = [
        ReceiptMethod::Cash,
        ReceiptMethod::Ach,
        ReceiptMethod::Wire,
        ReceiptMethod::Check,
        ReceiptMethod::Stripe,
        ReceiptMethod::Zelle,
        ReceiptMethod::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptMethod::Cash => "CASH",
            ReceiptMethod::Ach => "ACH",
            ReceiptMethod::Wire => "WIRE",
            ReceiptMethod::Check => "CHECK",
            ReceiptMethod::Stripe => "STRIPE",
            ReceiptMethod::Zelle => "ZELLE",
            ReceiptMethod::Other => "OTHER",
        }
    }
}

impl fmt::Display for ReceiptMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReceiptMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        ReceiptMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == upper)
            .ok_or_else(|| DomainError::validation(format!("unknown receipt method '{}'", s.trim())))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReceiptStatus {
    Pending,
    #[default]
    Received,
    Failed,
    Refunded,
}

impl ReceiptStatus {
    pub const ALL: [ReceiptStatus; 4] = [
        ReceiptStatus::Pending,
        ReceiptStatus::Received,
        ReceiptStatus::Failed,
        ReceiptStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptStatus::Pending => "PENDING",
            ReceiptStatus::Received => "RECEIVED",
            ReceiptStatus::Failed => "FAILED",
            ReceiptStatus::Refunded => "REFUNDED",
        }
    }
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReceiptStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        ReceiptStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == upper)
            .ok_or_else(|| DomainError::validation(format!("unknown receipt status '{}'", s.trim())))
    }
}

/// Input for recording a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReceipt {
    pub method: ReceiptMethod,
    pub amount_cents: i64,
    pub status: ReceiptStatus,
    pub payer_name: Option<String>,
    pub reference: Option<String>,
    pub note: Option<String>,
}

/// Money already received. Independent of the ledger; may fund one transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub id: ReceiptId,
    pub method: ReceiptMethod,
    pub amount_cents: i64,
    pub status: ReceiptStatus,
    pub payer_name: Option<String>,
    pub reference: Option<String>,
    pub note: Option<String>,
    pub transfer_id: Option<TransferId>,
    pub received_at: DateTime<Utc>,
    pub version: u64,
}

impl PaymentReceipt {
    pub fn record(input: NewReceipt, now: DateTime<Utc>) -> DomainResult<Self> {
        if input.amount_cents <= 0 {
            return Err(DomainError::invalid_amount("amount must be greater than zero"));
        }

        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Ok(Self {
            id: ReceiptId::new(),
            method: input.method,
            amount_cents: input.amount_cents,
            status: input.status,
            payer_name: clean(input.payer_name),
            reference: clean(input.reference),
            note: clean(input.note),
            transfer_id: None,
            received_at: now,
            version: 1,
        })
    }

    /// Mark this receipt as the funding source of a transfer. A receipt funds at most one.
    pub fn link_transfer(&mut self, transfer_id: TransferId) -> DomainResult<()> {
        match self.transfer_id {
            Some(existing) if existing == transfer_id => Ok(()),
            Some(existing) => Err(DomainError::conflict(format!(
                "receipt {} is already linked to transfer {existing}",
                self.id
            ))),
            None => {
                self.transfer_id = Some(transfer_id);
                self.version += 1;
                Ok(())
            }
        }
    }
}
