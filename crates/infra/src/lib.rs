//! Infrastructure layer: configuration, storage, and the back-office service.
//!
//! Domain crates stay pure; this crate composes them with a [`store::BookStore`]
//! and is the only place that writes.

pub mod config;
pub mod service;
pub mod store;


pub use config::{AppConfig, ConfigError, Environment};
pub use service::{BackOffice, LedgerOutcome, NewTransfer, ServiceError, TransferPatch};
pub use store::{
    BookStore, Changeset, InMemoryBookStore, PostgresBookStore, ReceiptWrite, ResetOutcome,
    StoreError, TransferWrite,
};
