//! services/companion/src/error.rs
//!
//! Defines the primary error type for the companion service.
//!
//! Only startup can fail with it: once the controller is running, storage and
//! model failures are recovered where they happen.

use crate::config::ConfigError;
use calmmind_core::ports::PortError;

/// The primary error type for the `companion` service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from a storage port during setup.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents a standard Input/Output error (e.g., reading the terminal).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
