//! Particle records: identity, kinematics, trajectory and parentage of one
//! simulated particle.

use crate::trajectory::{Trajectory, TrajectoryPoint};
use lineage_env::TrackId;
use nalgebra::{Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// Creation-process label carried by primaries.
pub const PRIMARY_PROCESS: &str = "primary";

/// Creation-process label when the engine reports none for a secondary.
pub const UNKNOWN_PROCESS: &str = "unknown";

/// One simulated particle.
///
/// The parent id is fixed at construction. Daughters are filled in once,
/// at the end of the event, from the complete particle table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleRecord {
    // === Identity ===
    track_id: TrackId,
    pdg_code: i32,

    /// Rest mass (GeV)
    mass: f64,

    process: String,
    end_process: String,
    weight: f64,
    polarization: Vector3<f64>,

    // === Parentage ===
    parent_id: TrackId,
    daughters: Vec<TrackId>,

    // === Trajectory ===
    trajectory: Trajectory,
}

impl ParticleRecord {
    /// Create a particle with an empty trajectory.
    pub fn new(
        track_id: TrackId,
        pdg_code: i32,
        process: impl Into<String>,
        parent_id: TrackId,
        mass: f64,
    ) -> Self {
        Self {
            track_id,
            pdg_code,
            mass,
            process: process.into(),
            end_process: String::new(),
            weight: 1.0,
            polarization: Vector3::zeros(),
            parent_id,
            daughters: Vec::new(),
            trajectory: Trajectory::new(),
        }
    }

    pub fn track_id(&self) -> TrackId {
        self.track_id
    }

    pub fn pdg_code(&self) -> i32 {
        self.pdg_code
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Creation process ("primary" for primaries).
    pub fn process(&self) -> &str {
        &self.process
    }

    /// Process that ended the particle; empty until the track ends.
    pub fn end_process(&self) -> &str {
        &self.end_process
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn polarization(&self) -> &Vector3<f64> {
        &self.polarization
    }

    pub fn parent_id(&self) -> TrackId {
        self.parent_id
    }

    /// True if the particle has no simulated parent.
    pub fn is_primary(&self) -> bool {
        self.parent_id.is_primary_parent()
    }

    pub fn daughters(&self) -> &[TrackId] {
        &self.daughters
    }

    pub fn num_daughters(&self) -> usize {
        self.daughters.len()
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn num_trajectory_points(&self) -> usize {
        self.trajectory.count()
    }

    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    pub fn set_end_process(&mut self, process: impl Into<String>) {
        self.end_process = process.into();
    }

    pub fn set_polarization(&mut self, polarization: Vector3<f64>) {
        self.polarization = polarization;
    }

    pub fn add_trajectory_point(
        &mut self,
        position: Vector4<f64>,
        momentum: Vector4<f64>,
        process: impl Into<String>,
    ) {
        self.trajectory.append(position, momentum, process);
    }

    pub(crate) fn add_daughter(&mut self, daughter: TrackId) {
        self.daughters.push(daughter);
    }

    pub(crate) fn clear_daughters(&mut self) {
        self.daughters.clear();
    }

    /// Production vertex [x, y, z, t], if any point was recorded.
    pub fn vertex(&self) -> Option<&Vector4<f64>> {
        self.trajectory.first().map(|p| &p.position)
    }

    /// Last recorded position.
    pub fn end_position(&self) -> Option<&Vector4<f64>> {
        self.trajectory.last().map(|p| &p.position)
    }

    /// Total energy (GeV) at trajectory point `index`.
    pub fn energy(&self, index: usize) -> Option<f64> {
        self.trajectory.get(index).map(|p| p.momentum.w)
    }

    /// Momentum magnitude (GeV) at trajectory point `index`.
    pub fn momentum(&self, index: usize) -> Option<f64> {
        self.trajectory.get(index).map(|p| p.momentum.xyz().norm())
    }

    /// Kinetic energy (GeV) at trajectory point `index`.
    pub fn kinetic_energy(&self, index: usize) -> Option<f64> {
        self.energy(index).map(|e| e - self.mass)
    }

    pub fn point(&self, index: usize) -> Option<&TrajectoryPoint> {
        self.trajectory.get(index)
    }
}

/// What remains of a particle after archival: enough for lineage queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedParticle {
    pub track_id: TrackId,
    pub parent_id: TrackId,
    pub daughters: Vec<TrackId>,
}

impl From<ParticleRecord> for ArchivedParticle {
    fn from(record: ParticleRecord) -> Self {
        Self {
            track_id: record.track_id,
            parent_id: record.parent_id,
            daughters: record.daughters,
        }
    }
}
