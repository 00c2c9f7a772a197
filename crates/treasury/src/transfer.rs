use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use backoffice_core::{Aggregate, AggregateRoot, DomainError, ReceiptId, TransferId};

/// Rail used to move the funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransferMethod {
    Ach,
    Wire,
}

impl TransferMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferMethod::Ach => "ACH",
            TransferMethod::Wire => "WIRE",
        }
    }
}

impl fmt::Display for TransferMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACH" => Ok(TransferMethod::Ach),
            "WIRE" => Ok(TransferMethod::Wire),
            other => Err(DomainError::validation(format!(
                "method must be ACH or WIRE (got '{other}')"
            ))),
        }
    }
}

/// Transfer status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransferStatus {
    Planned,
    Submitted,
    Confirmed,
    Canceled,
}

impl TransferStatus {
    pub const ALL: [TransferStatus; 4] = [
        TransferStatus::Planned,
        TransferStatus::Submitted,
        TransferStatus::Confirmed,
        TransferStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Planned => "PLANNED",
            TransferStatus::Submitted => "SUBMITTED",
            TransferStatus::Confirmed => "CONFIRMED",
            TransferStatus::Canceled => "CANCELED",
        }
    }

    /// The complete transition table.
    pub fn allowed_transitions(&self) -> &'static [TransferStatus] {
        match self {
            TransferStatus::Planned => &[TransferStatus::Submitted, TransferStatus::Canceled],
            TransferStatus::Submitted => &[TransferStatus::Confirmed, TransferStatus::Canceled],
            TransferStatus::Confirmed | TransferStatus::Canceled => &[],
        }
    }

    pub fn can_transition_to(&self, next: TransferStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        TransferStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == upper)
            .ok_or_else(|| {
                DomainError::invalid_status(format!(
                    "invalid status '{}'. Expected one of: PLANNED, SUBMITTED, CONFIRMED, CANCELED",
                    s.trim()
                ))
            })
    }
}

/// Persisted form of a transfer. Only storage adapters should build one by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSnapshot {
    pub id: TransferId,
    pub from_account: String,
    pub to_account: String,
    pub method: TransferMethod,
    pub amount_cents: i64,
    pub status: TransferStatus,
    pub planned_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub bank_ref: Option<String>,
    pub kraken_ref: Option<String>,
    pub notes: Option<String>,
    pub receipt_id: Option<ReceiptId>,
    pub ledger_tracked: bool,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

/// Aggregate root: a tracked movement of funds.
///
/// Status only changes through [`TransferCommand`]s, and only along
/// [`TransferStatus::allowed_transitions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    state: TransferSnapshot,
    created: bool,
}

impl Transfer {
    /// Empty, not-yet-planned transfer.
    pub fn empty(id: TransferId) -> Self {
        let epoch = DateTime::<Utc>::default();
        Self {
            state: TransferSnapshot {
                id,
                from_account: String::new(),
                to_account: String::new(),
                method: TransferMethod::Ach,
                amount_cents: 0,
                status: TransferStatus::Planned,
                planned_at: epoch,
                submitted_at: None,
                confirmed_at: None,
                canceled_at: None,
                bank_ref: None,
                kraken_ref: None,
                notes: None,
                receipt_id: None,
                ledger_tracked: false,
                updated_at: epoch,
                version: 0,
            },
            created: false,
        }
    }

    pub fn from_snapshot(state: TransferSnapshot) -> Self {
        Self {
            state,
            created: true,
        }
    }

    pub fn snapshot(&self) -> &TransferSnapshot {
        &self.state
    }

    pub fn into_snapshot(self) -> TransferSnapshot {
        self.state
    }

    pub fn id_typed(&self) -> TransferId {
        self.state.id
    }

    pub fn status(&self) -> TransferStatus {
        self.state.status
    }

    pub fn amount_cents(&self) -> i64 {
        self.state.amount_cents
    }

    pub fn method(&self) -> TransferMethod {
        self.state.method
    }

    pub fn is_ledger_tracked(&self) -> bool {
        self.state.ledger_tracked
    }

    pub fn receipt_id(&self) -> Option<ReceiptId> {
        self.state.receipt_id
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Transfer {
    type Id = TransferId;

    fn id(&self) -> &Self::Id {
        &self.state.id
    }

    fn version(&self) -> u64 {
        self.state.version
    }
}

/// Command: PlanTransfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTransfer {
    pub transfer_id: TransferId,
    pub from_account: String,
    pub to_account: String,
    pub method: TransferMethod,
    pub amount_cents: i64,
    pub receipt_id: Option<ReceiptId>,
    pub notes: Option<String>,
    pub ledger_tracked: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateTransfer (status and/or references).
///
/// A reference supplied as an empty string clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTransfer {
    pub status: Option<TransferStatus>,
    pub bank_ref: Option<String>,
    pub kraken_ref: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl UpdateTransfer {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.bank_ref.is_none()
            && self.kraken_ref.is_none()
            && self.notes.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferCommand {
    Plan(PlanTransfer),
    Update(UpdateTransfer),
}

/// Event: TransferPlanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPlanned {
    pub transfer_id: TransferId,
    pub from_account: String,
    pub to_account: String,
    pub method: TransferMethod,
    pub amount_cents: i64,
    pub receipt_id: Option<ReceiptId>,
    pub notes: Option<String>,
    pub ledger_tracked: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReferencesUpdated. `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencesUpdated {
    pub bank_ref: Option<String>,
    pub kraken_ref: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub from: TransferStatus,
    pub to: TransferStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferEvent {
    TransferPlanned(TransferPlanned),
    ReferencesUpdated(ReferencesUpdated),
    StatusChanged(StatusChanged),
}

impl TransferEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            TransferEvent::TransferPlanned(_) => "treasury.transfer.planned",
            TransferEvent::ReferencesUpdated(_) => "treasury.transfer.references_updated",
            TransferEvent::StatusChanged(_) => "treasury.transfer.status_changed",
        }
    }
}

impl Aggregate for Transfer {
    type Command = TransferCommand;
    type Event = TransferEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            TransferEvent::TransferPlanned(e) => {
                self.state = TransferSnapshot {
                    id: e.transfer_id,
                    from_account: e.from_account.clone(),
                    to_account: e.to_account.clone(),
                    method: e.method,
                    amount_cents: e.amount_cents,
                    status: TransferStatus::Planned,
                    planned_at: e.occurred_at,
                    submitted_at: None,
                    confirmed_at: None,
                    canceled_at: None,
                    bank_ref: None,
                    kraken_ref: None,
                    notes: e.notes.clone(),
                    receipt_id: e.receipt_id,
                    ledger_tracked: e.ledger_tracked,
                    updated_at: e.occurred_at,
                    version: self.state.version,
                };
                self.created = true;
            }
            TransferEvent::ReferencesUpdated(e) => {
                fn set(field: &mut Option<String>, value: &Option<String>) {
                    if let Some(v) = value {
                        *field = if v.is_empty() { None } else { Some(v.clone()) };
                    }
                }
                set(&mut self.state.bank_ref, &e.bank_ref);
                set(&mut self.state.kraken_ref, &e.kraken_ref);
                set(&mut self.state.notes, &e.notes);
                self.state.updated_at = e.occurred_at;
            }
            TransferEvent::StatusChanged(e) => {
                self.state.status = e.to;
                match e.to {
                    TransferStatus::Submitted => self.state.submitted_at = Some(e.occurred_at),
                    TransferStatus::Confirmed => self.state.confirmed_at = Some(e.occurred_at),
                    TransferStatus::Canceled => self.state.canceled_at = Some(e.occurred_at),
                    TransferStatus::Planned => {}
                }
                self.state.updated_at = e.occurred_at;
            }
        }

        self.state.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TransferCommand::Plan(cmd) => self.handle_plan(cmd),
            TransferCommand::Update(cmd) => self.handle_update(cmd),
        }
    }
}

impl Transfer {
    fn handle_plan(&self, cmd: &PlanTransfer) -> Result<Vec<TransferEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("transfer already exists"));
        }
        if cmd.amount_cents <= 0 {
            return Err(DomainError::invalid_amount("amount must be greater than zero"));
        }

        let from_account = cmd.from_account.trim();
        let to_account = cmd.to_account.trim();
        if from_account.is_empty() || to_account.is_empty() {
            return Err(DomainError::validation("fromAccount and toAccount are required"));
        }
        if from_account == to_account {
            return Err(DomainError::validation(
                "fromAccount and toAccount must be different",
            ));
        }

        Ok(vec![TransferEvent::TransferPlanned(TransferPlanned {
            transfer_id: cmd.transfer_id,
            from_account: from_account.to_string(),
            to_account: to_account.to_string(),
            method: cmd.method,
            amount_cents: cmd.amount_cents,
            receipt_id: cmd.receipt_id,
            notes: cmd
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            ledger_tracked: cmd.ledger_tracked,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateTransfer) -> Result<Vec<TransferEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found("transfer not found"));
        }
        if cmd.is_empty() {
            return Err(DomainError::NoOp);
        }

        // Validate the transition before anything is emitted: a rejected
        // status change must not half-apply reference updates.
        let status_change = match cmd.status {
            Some(next) => {
                let current = self.state.status;
                if !current.can_transition_to(next) {
                    return Err(DomainError::invalid_transition(transition_error(current, next)));
                }
                Some(StatusChanged {
                    from: current,
                    to: next,
                    occurred_at: cmd.occurred_at,
                })
            }
            None => None,
        };

        let mut events = Vec::with_capacity(2);
        if cmd.bank_ref.is_some() || cmd.kraken_ref.is_some() || cmd.notes.is_some() {
            let trim = |v: &Option<String>| v.as_deref().map(|s| s.trim().to_string());
            events.push(TransferEvent::ReferencesUpdated(ReferencesUpdated {
                bank_ref: trim(&cmd.bank_ref),
                kraken_ref: trim(&cmd.kraken_ref),
                notes: trim(&cmd.notes),
                occurred_at: cmd.occurred_at,
            }));
        }
        if let Some(change) = status_change {
            events.push(TransferEvent::StatusChanged(change));
        }
        Ok(events)
    }
}

fn transition_error(current: TransferStatus, next: TransferStatus) -> String {
    let allowed = current.allowed_transitions();
    let allowed = if allowed.is_empty() {
        "none".to_string()
    } else {
        allowed
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!("Cannot transition from {current} to {next}. Allowed: {allowed}")
}
