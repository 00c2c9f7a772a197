//! Accounting module (double-entry ledger over a closed set of accounts).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.
//! Storage appends the postings decided here and derives balances from them.

pub mod account;
pub mod command;
pub mod entry;
pub mod ledger;

pub use account::{AccountCode, AccountKind, ExpenseCategory};
pub use command::{LedgerAction, LedgerCommand, LedgerOperation, LedgerRequest, Movement, PaidFrom};
pub use entry::{EntryDetails, LedgerEntry, Posting};
pub use ledger::{AccountBalance, Balances, LedgerSummary, prepare_posting};
