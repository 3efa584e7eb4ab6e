//! Per-callback data handed over by the transport engine.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Identifier of a simulated track.
///
/// The engine numbers tracks from 1 within one pass; the bookkeeping layer
/// adds a run-wide offset so that ids stay unique across passes. Parent ids
/// of 0 (or below) denote "no simulated parent".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackId(pub i32);

impl TrackId {
    /// Sentinel meaning "no particle".
    pub const NONE: TrackId = TrackId(i32::MIN);

    /// Parent id carried by primary particles.
    pub const PRIMARY_PARENT: TrackId = TrackId(0);

    /// Returns this id shifted by a track-id offset, or `None` when the
    /// shifted id does not fit in an `i32`.
    pub fn offset_by(self, offset: i32) -> Option<Self> {
        self.0.checked_add(offset).map(Self)
    }

    /// True for parent ids that mean "this is a primary".
    pub fn is_primary_parent(self) -> bool {
        self.0 <= 0
    }

    /// True for the "no particle" sentinel.
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    /// Returns the raw integer.
    pub fn get(self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            write!(f, "<none>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Marks a track as originating from a user-supplied primary particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrimaryTag {
    /// Index of the truth batch (generator record) the primary came from
    pub truth_index: usize,

    /// Index of the primary within that batch
    pub particle_index: usize,
}

/// Everything the engine knows about a track when it starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackInfo {
    /// Engine-assigned id (not yet offset)
    pub track_id: TrackId,

    /// Engine-assigned parent id (not yet offset)
    pub parent_id: TrackId,

    /// PDG particle code (0 for optical photons)
    pub pdg_code: i32,

    /// Rest mass (MeV)
    pub mass: f64,

    /// Kinetic energy at creation (MeV)
    pub kinetic_energy: f64,

    /// Name of the process that created this track; `None` for primaries
    pub creator_process: Option<String>,

    /// Statistical weight
    pub weight: f64,

    /// Polarization vector
    pub polarization: Vector3<f64>,

    /// Present when the track is a user-supplied primary
    pub primary: Option<PrimaryTag>,
}

impl TrackInfo {
    /// Creator process name, or "none" when the engine did not report one.
    pub fn creator_process_name(&self) -> &str {
        self.creator_process.as_deref().unwrap_or("none")
    }
}

/// One end of a step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepPoint {
    /// Position (mm)
    pub position: Vector3<f64>,

    /// Global time (ns)
    pub global_time: f64,

    /// Momentum (MeV)
    pub momentum: Vector3<f64>,

    /// Total energy (MeV)
    pub total_energy: f64,
}

/// A single transport step of the current track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepInfo {
    pub pre: StepPoint,
    pub post: StepPoint,

    /// Process that limited the step
    pub post_process: String,

    /// Step length (mm)
    pub step_length: f64,

    /// Time spent in the step (ns)
    pub delta_time: f64,

    /// Velocity the engine reports for the track (mm/ns)
    pub velocity: f64,

    /// PDG code of the stepping track
    pub pdg_code: i32,
}

/// What the engine reports when a track stops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackEnd {
    /// Final statistical weight
    pub weight: f64,

    /// Process that ended the last step
    pub end_process: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_id_offset() {
        assert_eq!(TrackId(3).offset_by(100), Some(TrackId(103)));
        assert_eq!(TrackId(0).offset_by(0), Some(TrackId::PRIMARY_PARENT));
        assert_eq!(TrackId(i32::MAX - 1).offset_by(2), None);
    }

    #[test]
    fn test_primary_parent() {
        assert!(TrackId(0).is_primary_parent());
        assert!(TrackId(-4).is_primary_parent());
        assert!(TrackId::NONE.is_primary_parent());
        assert!(!TrackId(1).is_primary_parent());
    }

    #[test]
    fn test_display() {
        assert_eq!(TrackId(42).to_string(), "42");
        assert_eq!(TrackId::NONE.to_string(), "<none>");
    }

    #[test]
    fn test_creator_process_name() {
        let track = TrackInfo {
            track_id: TrackId(1),
            parent_id: TrackId(0),
            pdg_code: 13,
            mass: 105.7,
            kinetic_energy: 1000.0,
            creator_process: None,
            weight: 1.0,
            polarization: Vector3::zeros(),
            primary: None,
        };
        assert_eq!(track.creator_process_name(), "none");
    }
}
