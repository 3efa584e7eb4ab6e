//! Error types for the simulation harness.

use lineage_core::ConfigError;
use lineage_env::EnvError;
use thiserror::Error;

/// Errors that can stop a simulated run.
#[derive(Debug, Error)]
pub enum SimError {
    /// The hooks raised a fatal error (e.g. duplicate track id)
    #[error("Hook failed: {0}")]
    Hook(String),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A transport parameter is out of range
    #[error("Invalid transport parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// A finished event broke a bookkeeping invariant
    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
