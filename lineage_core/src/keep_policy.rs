//! Keep policies: decide whether a particle not yet kept must be retained.

use nalgebra::{Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// Predicate evaluated on every trajectory point added to an undecided
/// particle. Once it answers `true` the particle is kept for good.
///
/// Implementations must not rely on being called again after a `true`.
pub trait KeepPolicy {
    /// `position` is the point just added, [x, y, z, t] in cm/ns.
    fn must_keep(&self, position: &Vector4<f64>) -> bool;
}

impl<F> KeepPolicy for F
where
    F: Fn(&Vector4<f64>) -> bool,
{
    fn must_keep(&self, position: &Vector4<f64>) -> bool {
        self(position)
    }
}

/// Axis-aligned box (cm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vector3<f64>,
    pub max: Vector3<f64>,
}

impl BoundingBox {
    pub fn new(min: Vector3<f64>, max: Vector3<f64>) -> Self {
        Self { min, max }
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: &Vector3<f64>) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }
}

/// Keeps particles that pass through any of a set of volumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeFilter {
    volumes: Vec<BoundingBox>,
}

impl VolumeFilter {
    pub fn new(volumes: Vec<BoundingBox>) -> Self {
        Self { volumes }
    }

    pub fn volumes(&self) -> &[BoundingBox] {
        &self.volumes
    }
}

impl KeepPolicy for VolumeFilter {
    fn must_keep(&self, position: &Vector4<f64>) -> bool {
        let point = position.xyz();
        self.volumes.iter().any(|volume| volume.contains(&point))
    }
}
