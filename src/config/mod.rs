//! Configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, limits, redirect codes, IVOA identifiers)
//! - HTTP header name constants
//! - The `AuthConfig` struct and logging option types

mod constants;
mod headers;
mod types;

// Re-export all constants
pub use constants::*;
pub use headers::*;
pub use types::{AuthConfig, LogFormat, LogLevel};
