//! Utility modules for quill-bridge

pub mod retry;

pub use retry::{poll_until, retry_with_policy, Backoff, RetryPolicy, RetryReport};
