//! Error handling.
//!
//! This module provides:
//! - Error type definitions (`AuthError` and the errors it wraps)
//! - Status code categorization and user-facing failure messages
//!
//! Errors fall into two groups:
//! - **Fatal**: protocol violations, unsupported schemes, redirect and
//!   credential-acquisition failures, surfaced to the caller
//! - **Recovered**: malformed challenges and scheme-level challenge
//!   rejections (`BadChallenge`), logged and skipped

mod categorization;
mod types;

// Re-export public API
pub use categorization::{auth_failure_message, categorize_status, StatusCategory};
pub use types::{
    AuthError, BadChallenge, ConfigValidationError, InitializationError, RedirectError, Result,
    TransportError,
};
