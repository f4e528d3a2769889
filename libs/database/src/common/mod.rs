//! Utilities independent of any particular store

pub mod retry;

pub use retry::{RetryConfig, retry, retry_if, retry_with_backoff};
