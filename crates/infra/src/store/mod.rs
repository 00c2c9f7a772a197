//! Book storage boundary.
//!
//! Every write the service makes goes through [`BookStore::commit`], which
//! applies a [`Changeset`] atomically and enforces compare-and-set on the
//! transfer and receipt it carries.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryBookStore;
pub use postgres::PostgresBookStore;
pub use r#trait::{BookStore, Changeset, ReceiptWrite, ResetOutcome, StoreError, TransferWrite};
