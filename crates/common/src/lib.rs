//! # Tablecat Common
//!
//! Cross-cutting utilities with no domain knowledge:
//! - Error classification trait shared by all classified error types
//! - Generic retry policy and executor with exponential backoff
//!
//! Higher layers (core, infra, api) build on these primitives; nothing in
//! this crate knows about databases, HTTP, or configuration.

pub mod error;
pub mod retry;

pub use error::ErrorClassification;
pub use retry::{Jitter, Retrier, RetryPolicy};
