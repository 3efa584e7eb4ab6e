//! Error types for the transport-engine abstraction.

use thiserror::Error;

/// Errors raised on the engine side of the callback boundary.
#[derive(Debug, Error)]
pub enum EnvError {
    /// A primary batch could not be turned into tracks
    #[error("Invalid primary batch {index}: {reason}")]
    InvalidPrimary { index: usize, reason: String },

    /// The hooks rejected a callback
    #[error("Hook error: {0}")]
    HookError(String),

    /// Writing event output failed
    #[error("Export error: {0}")]
    ExportError(String),
}

impl EnvError {
    /// Creates a hook error.
    pub fn hook(msg: impl Into<String>) -> Self {
        Self::HookError(msg.into())
    }

    /// Creates an export error.
    pub fn export(msg: impl std::fmt::Display) -> Self {
        Self::ExportError(msg.to_string())
    }
}
