//! Treasury module: transfer workflow and payment receipts.
//!
//! Pure domain logic only. The transfer status table lives in
//! [`transfer::TransferStatus::allowed_transitions`].

pub mod receipt;
pub mod transfer;

pub use receipt::{NewReceipt, PaymentReceipt, ReceiptMethod, ReceiptStatus};
pub use transfer::{
    PlanTransfer, Transfer, TransferCommand, TransferEvent, TransferMethod, TransferSnapshot,
    TransferStatus, UpdateTransfer,
};
