//! Initialization of shared resources.
//!
//! This module provides functions to set up:
//! - Logging (plain coloured or JSON lines, via `env_logger`)
//! - The HTTP transport used by `AuthManager`
//!
//! All initialization functions return `InitializationError` on failure.

mod client;
mod logger;

// Re-export public API
pub use client::init_transport;
pub use logger::{init_logger, init_logger_with};
