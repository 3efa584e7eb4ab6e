//! Trajectory buffer: the ordered samples of one particle in flight.
//!
//! Positions are 4-vectors `[x, y, z, t]` in cm/ns and momenta are
//! `[px, py, pz, E]` in GeV. Points are only ever appended.

use nalgebra::{Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// Label of the first point of every trajectory.
pub const START_LABEL: &str = "Start";

/// A single trajectory sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    /// Four-position [x, y, z, t] (cm, ns)
    pub position: Vector4<f64>,

    /// Four-momentum [px, py, pz, E] (GeV)
    pub momentum: Vector4<f64>,

    /// Process that produced this point ("Start" for the vertex)
    pub process: String,
}

impl TrajectoryPoint {
    /// Spatial part of the position.
    #[inline]
    pub fn position3(&self) -> Vector3<f64> {
        self.position.xyz()
    }
}

/// Append-only sequence of trajectory points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a point; earlier points are never touched.
    pub fn append(&mut self, position: Vector4<f64>, momentum: Vector4<f64>, process: impl Into<String>) {
        self.points.push(TrajectoryPoint {
            position,
            momentum,
            process: process.into(),
        });
    }

    /// Number of stored points.
    pub fn count(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TrajectoryPoint> {
        self.points.get(index)
    }

    pub fn first(&self) -> Option<&TrajectoryPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&TrajectoryPoint> {
        self.points.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrajectoryPoint> {
        self.points.iter()
    }

    /// Sum of straight-line distances between consecutive points (cm).
    pub fn total_length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| (pair[1].position3() - pair[0].position3()).norm())
            .sum()
    }
}
