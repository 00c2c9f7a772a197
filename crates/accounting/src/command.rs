//! Ledger actions and the typed commands parsed from admin requests.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use backoffice_core::{DomainError, DomainResult, TransferId, usd_to_cents};

use crate::account::{AccountCode, ExpenseCategory};
use crate::entry::EntryDetails;

/// Every action the ledger endpoint understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LedgerAction {
    RecordCashIncome,
    RecordOwnerDraw,
    RecordCapitalContribution,
    DepositCashToBank,
    AchToKraken,
    WireToKraken,
    RecordExpense,
    CompleteTransfer,
    CancelTransfer,
    GetLedgerSummary,
    ResetLedger,
}

impl LedgerAction {
    pub const ALL: [LedgerAction; 11] = [
        LedgerAction::RecordCashIncome,
        LedgerAction::RecordOwnerDraw,
        LedgerAction::RecordCapitalContribution,
        LedgerAction::DepositCashToBank,
        LedgerAction::AchToKraken,
        LedgerAction::WireToKraken,
        LedgerAction::RecordExpense,
        LedgerAction::CompleteTransfer,
        LedgerAction::CancelTransfer,
        LedgerAction::GetLedgerSummary,
        LedgerAction::ResetLedger,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerAction::RecordCashIncome => "recordCashIncome",
            LedgerAction::RecordOwnerDraw => "recordOwnerDraw",
            LedgerAction::RecordCapitalContribution => "recordCapitalContribution",
            LedgerAction::DepositCashToBank => "depositCashToBank",
            LedgerAction::AchToKraken => "achToKraken",
            LedgerAction::WireToKraken => "wireToKraken",
            LedgerAction::RecordExpense => "recordExpense",
            LedgerAction::CompleteTransfer => "completeTransfer",
            LedgerAction::CancelTransfer => "cancelTransfer",
            LedgerAction::GetLedgerSummary => "getLedgerSummary",
            LedgerAction::ResetLedger => "resetLedger",
        }
    }

    fn snake_case(&self) -> &'static str {
        match self {
            LedgerAction::RecordCashIncome => "record_cash_income",
            LedgerAction::RecordOwnerDraw => "record_owner_draw",
            LedgerAction::RecordCapitalContribution => "record_capital_contribution",
            LedgerAction::DepositCashToBank => "deposit_cash_to_bank",
            LedgerAction::AchToKraken => "ach_to_kraken",
            LedgerAction::WireToKraken => "wire_to_kraken",
            LedgerAction::RecordExpense => "record_expense",
            LedgerAction::CompleteTransfer => "complete_transfer",
            LedgerAction::CancelTransfer => "cancel_transfer",
            LedgerAction::GetLedgerSummary => "get_ledger_summary",
            LedgerAction::ResetLedger => "reset_ledger",
        }
    }

    /// Actions that post money and therefore require a positive `amountUsd`.
    pub fn requires_amount(&self) -> bool {
        !matches!(
            self,
            LedgerAction::CompleteTransfer
                | LedgerAction::CancelTransfer
                | LedgerAction::GetLedgerSummary
                | LedgerAction::ResetLedger
        )
    }
}

impl fmt::Display for LedgerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerAction {
    type Err = DomainError;

    /// Accepts camelCase or snake_case names, plus the short forms
    /// `reset` and `summary`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "reset" => return Ok(LedgerAction::ResetLedger),
            "summary" => return Ok(LedgerAction::GetLedgerSummary),
            _ => {}
        }
        LedgerAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s || a.snake_case() == s)
            .ok_or_else(|| DomainError::invalid_operation(format!("unknown ledger action '{s}'")))
    }
}

/// Which account an expense is paid from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaidFrom {
    #[default]
    Cash,
    Bank,
}

impl PaidFrom {
    pub fn account(&self) -> AccountCode {
        match self {
            PaidFrom::Cash => AccountCode::CashOnHand,
            PaidFrom::Bank => AccountCode::BankFulton,
        }
    }
}

impl FromStr for PaidFrom {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaidFrom::Cash),
            "bank" => Ok(PaidFrom::Bank),
            other => Err(DomainError::validation(format!(
                "paidFrom must be 'cash' or 'bank' (got '{other}')"
            ))),
        }
    }
}

/// Untyped ledger request, as received from the admin API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerRequest {
    pub action: String,
    pub amount_usd: Option<f64>,
    pub client_name: Option<String>,
    pub note: Option<String>,
    pub transfer_id: Option<String>,
    pub category: Option<String>,
    pub vendor: Option<String>,
    pub paid_from: Option<String>,
    pub receipt_ref: Option<String>,
}

/// An amount plus the context recorded on each leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movement {
    pub amount_cents: i64,
    pub details: EntryDetails,
}

/// A money-moving ledger operation. Each maps to exactly one debit/credit pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOperation {
    CashIncome(Movement),
    OwnerDraw(Movement),
    CapitalContribution(Movement),
    DepositCashToBank(Movement),
    AchToKraken(Movement),
    WireToKraken(Movement),
    Expense {
        movement: Movement,
        category: ExpenseCategory,
        paid_from: PaidFrom,
    },
    /// Clears an exchange transfer out of `KRAKEN_PENDING` once it lands.
    SettleTransfer {
        transfer_id: TransferId,
        movement: Movement,
    },
    /// Returns a canceled exchange transfer from `KRAKEN_PENDING` to the bank.
    ReverseTransfer {
        transfer_id: TransferId,
        movement: Movement,
    },
}

impl LedgerOperation {
    pub fn action(&self) -> LedgerAction {
        match self {
            LedgerOperation::CashIncome(_) => LedgerAction::RecordCashIncome,
            LedgerOperation::OwnerDraw(_) => LedgerAction::RecordOwnerDraw,
            LedgerOperation::CapitalContribution(_) => LedgerAction::RecordCapitalContribution,
            LedgerOperation::DepositCashToBank(_) => LedgerAction::DepositCashToBank,
            LedgerOperation::AchToKraken(_) => LedgerAction::AchToKraken,
            LedgerOperation::WireToKraken(_) => LedgerAction::WireToKraken,
            LedgerOperation::Expense { .. } => LedgerAction::RecordExpense,
            LedgerOperation::SettleTransfer { .. } => LedgerAction::CompleteTransfer,
            LedgerOperation::ReverseTransfer { .. } => LedgerAction::CancelTransfer,
        }
    }

    /// `(debit, credit)` accounts for this operation.
    pub fn legs(&self) -> (AccountCode, AccountCode) {
        match self {
            LedgerOperation::CashIncome(_) => (AccountCode::CashOnHand, AccountCode::Revenue),
            LedgerOperation::OwnerDraw(_) => (AccountCode::OwnerEquity, AccountCode::CashOnHand),
            LedgerOperation::CapitalContribution(_) => {
                (AccountCode::CashOnHand, AccountCode::OwnerEquity)
            }
            LedgerOperation::DepositCashToBank(_) => {
                (AccountCode::BankFulton, AccountCode::CashOnHand)
            }
            LedgerOperation::AchToKraken(_) | LedgerOperation::WireToKraken(_) => {
                (AccountCode::KrakenPending, AccountCode::BankFulton)
            }
            LedgerOperation::Expense {
                category,
                paid_from,
                ..
            } => (AccountCode::Expense(*category), paid_from.account()),
            LedgerOperation::SettleTransfer { .. } => {
                (AccountCode::Kraken, AccountCode::KrakenPending)
            }
            LedgerOperation::ReverseTransfer { .. } => {
                (AccountCode::BankFulton, AccountCode::KrakenPending)
            }
        }
    }

    pub fn movement(&self) -> &Movement {
        match self {
            LedgerOperation::CashIncome(m)
            | LedgerOperation::OwnerDraw(m)
            | LedgerOperation::CapitalContribution(m)
            | LedgerOperation::DepositCashToBank(m)
            | LedgerOperation::AchToKraken(m)
            | LedgerOperation::WireToKraken(m) => m,
            LedgerOperation::Expense { movement, .. } => movement,
            LedgerOperation::SettleTransfer { movement, .. }
            | LedgerOperation::ReverseTransfer { movement, .. } => movement,
        }
    }

    /// Transfer an operation closes out, if any.
    pub fn closes_transfer(&self) -> Option<TransferId> {
        match self {
            LedgerOperation::SettleTransfer { transfer_id, .. }
            | LedgerOperation::ReverseTransfer { transfer_id, .. } => Some(*transfer_id),
            _ => None,
        }
    }

    pub fn is_exchange_transfer(&self) -> bool {
        matches!(
            self,
            LedgerOperation::AchToKraken(_) | LedgerOperation::WireToKraken(_)
        )
    }
}

/// A fully-parsed ledger request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCommand {
    Post(LedgerOperation),
    /// Amount comes from the transfer itself, so it is resolved later.
    CompleteTransfer {
        transfer_id: TransferId,
        details: EntryDetails,
    },
    CancelTransfer {
        transfer_id: TransferId,
        details: EntryDetails,
    },
    Summary,
    Reset,
}

impl LedgerCommand {
    pub fn action(&self) -> LedgerAction {
        match self {
            LedgerCommand::Post(op) => op.action(),
            LedgerCommand::CompleteTransfer { .. } => LedgerAction::CompleteTransfer,
            LedgerCommand::CancelTransfer { .. } => LedgerAction::CancelTransfer,
            LedgerCommand::Summary => LedgerAction::GetLedgerSummary,
            LedgerCommand::Reset => LedgerAction::ResetLedger,
        }
    }

    /// Validate a raw request. Nothing is posted here.
    pub fn parse(req: LedgerRequest) -> DomainResult<Self> {
        let action: LedgerAction = req.action.parse()?;

        let details = EntryDetails {
            note: req.note,
            client_name: req.client_name,
            vendor: req.vendor,
            receipt_ref: req.receipt_ref,
        }
        .normalized();

        let amount_usd = req.amount_usd;

        let op = match action {
            LedgerAction::GetLedgerSummary => return Ok(LedgerCommand::Summary),
            LedgerAction::ResetLedger => return Ok(LedgerCommand::Reset),
            LedgerAction::CompleteTransfer => {
                let transfer_id = transfer_ref(req.transfer_id)?;
                return Ok(LedgerCommand::CompleteTransfer {
                    transfer_id,
                    details,
                });
            }
            LedgerAction::CancelTransfer => {
                let transfer_id = transfer_ref(req.transfer_id)?;
                return Ok(LedgerCommand::CancelTransfer {
                    transfer_id,
                    details,
                });
            }
            LedgerAction::RecordCashIncome => LedgerOperation::CashIncome(movement(amount_usd, details)?),
            LedgerAction::RecordOwnerDraw => LedgerOperation::OwnerDraw(movement(amount_usd, details)?),
            LedgerAction::RecordCapitalContribution => {
                LedgerOperation::CapitalContribution(movement(amount_usd, details)?)
            }
            LedgerAction::DepositCashToBank => LedgerOperation::DepositCashToBank(movement(amount_usd, details)?),
            LedgerAction::AchToKraken => LedgerOperation::AchToKraken(movement(amount_usd, details)?),
            LedgerAction::WireToKraken => LedgerOperation::WireToKraken(movement(amount_usd, details)?),
            LedgerAction::RecordExpense => {
                let movement = movement(amount_usd, details)?;
                let category = req
                    .category
                    .as_deref()
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| DomainError::invalid_category("category is required"))?
                    .parse::<ExpenseCategory>()?;
                let paid_from = match req.paid_from.as_deref() {
                    Some(s) if !s.trim().is_empty() => s.parse::<PaidFrom>()?,
                    _ => PaidFrom::default(),
                };
                LedgerOperation::Expense {
                    movement,
                    category,
                    paid_from,
                }
            }
        };

        Ok(LedgerCommand::Post(op))
    }
}

/// Ids are opaque to callers: one that cannot name a transfer is simply not found.
fn transfer_ref(raw: Option<String>) -> DomainResult<TransferId> {
    let raw = raw
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DomainError::validation("transferId is required"))?;
    raw.parse::<TransferId>()
        .map_err(|_| DomainError::not_found(format!("transfer {raw} not found")))
}

fn movement(amount_usd: Option<f64>, details: EntryDetails) -> DomainResult<Movement> {
    let amount_usd =
        amount_usd.ok_or_else(|| DomainError::invalid_amount("amountUsd is required"))?;
    Ok(Movement {
        amount_cents: usd_to_cents(amount_usd)?,
        details,
    })
}
