//! Error types for particle bookkeeping.

use lineage_env::TrackId;
use thiserror::Error;

/// Errors that can occur while maintaining the particle table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParticleListError {
    /// Track ids are unique per event once offset; a repeat means the
    /// offset bookkeeping upstream is broken.
    #[error("Duplicate track id: {0}")]
    DuplicateTrack(TrackId),

    /// Payload of an archived particle was requested.
    #[error("Particle {0} is archived; its payload is no longer available")]
    Archived(TrackId),

    /// No entry exists for the requested id.
    #[error("Particle not found: {0}")]
    ParticleNotFound(TrackId),

    /// Adding the run-wide offset to an engine id overflowed.
    #[error("Track id {track_id} cannot be shifted by offset {offset}")]
    TrackIdOverflow { track_id: TrackId, offset: i32 },

    /// The parent map walked back onto an id it already visited.
    #[error("Parent map cycle starting at {start}: revisited {revisited}")]
    ParentCycle { start: TrackId, revisited: TrackId },
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
