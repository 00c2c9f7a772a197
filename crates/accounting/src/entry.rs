use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use backoffice_core::{EntryId, PostingId, TransferId};

use crate::account::AccountCode;
use crate::command::LedgerAction;

/// Free-form context attached to every leg of a posting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDetails {
    pub note: Option<String>,
    pub client_name: Option<String>,
    pub vendor: Option<String>,
    pub receipt_ref: Option<String>,
}

impl EntryDetails {
    /// Trims every field and drops the empty ones.
    pub fn normalized(self) -> Self {
        fn clean(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        Self {
            note: clean(self.note),
            client_name: clean(self.client_name),
            vendor: clean(self.vendor),
            receipt_ref: clean(self.receipt_ref),
        }
    }
}

/// One leg of a double-entry posting (immutable once written).
///
/// `amount_cents` is signed: debits are positive, credits negative.
/// Corrections are new offsetting postings, never edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub posting_id: PostingId,
    pub account: AccountCode,
    pub amount_cents: i64,
    pub action: LedgerAction,
    #[serde(flatten)]
    pub details: EntryDetails,
    pub transfer_id: Option<TransferId>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn is_debit(&self) -> bool {
        self.amount_cents > 0
    }
}

/// The legs written by one ledger operation. Always sums to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub id: PostingId,
    pub action: LedgerAction,
    pub entries: Vec<LedgerEntry>,
}

impl Posting {
    pub fn total(&self) -> i128 {
        self.entries.iter().map(|e| e.amount_cents as i128).sum()
    }

    pub fn is_balanced(&self) -> bool {
        !self.entries.is_empty() && self.total() == 0
    }
}
