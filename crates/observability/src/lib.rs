//! Tracing/logging setup shared by every binary.

pub mod subscriber;

pub use subscriber::{LogFormat, init, init_with};
