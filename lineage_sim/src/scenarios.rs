//! Scenario definitions for the lineage simulator.

use crate::engine::{pdg, PrimarySpec, TruthBatch};
use lineage_core::{BoundingBox, ParticleListConfig, VolumeFilter};
use lineage_env::units;
use nalgebra::Vector3;

/// Energy cut used by the energy_cut scenario (GeV)
pub const SCENARIO_ENERGY_CUT: f64 = 0.01;

/// Scenario identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Default configuration, every secondary kept
    Baseline,

    /// Secondaries below 10 MeV collapse into their ancestors
    EnergyCut,

    /// EM-shower daughters are not materialized
    ShowerCollapse,

    /// Only particles entering the detector volume keep their payload
    VolumeFilter,

    /// Consecutive events share one tracker; ids must never be reused
    MultiPass,
}

impl ScenarioId {
    /// Returns all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Baseline,
            ScenarioId::EnergyCut,
            ScenarioId::ShowerCollapse,
            ScenarioId::VolumeFilter,
            ScenarioId::MultiPass,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Baseline => "baseline",
            ScenarioId::EnergyCut => "energy_cut",
            ScenarioId::ShowerCollapse => "shower_collapse",
            ScenarioId::VolumeFilter => "volume_filter",
            ScenarioId::MultiPass => "multi_pass",
        }
    }

    /// Returns the scenario description.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Baseline => "Full genealogy with default settings",
            ScenarioId::EnergyCut => "Low-energy secondaries collapse into their tracked ancestor",
            ScenarioId::ShowerCollapse => "EM-shower daughters collapse into the shower's origin",
            ScenarioId::VolumeFilter => "Particles never entering the detector are archived",
            ScenarioId::MultiPass => "Track ids stay unique across passes until the run is reset",
        }
    }

    /// Tracker configuration for this scenario, derived from `base`.
    pub fn tracker_config(&self, base: &ParticleListConfig) -> ParticleListConfig {
        let mut config = base.clone();
        match self {
            ScenarioId::EnergyCut => config.energy_cut = SCENARIO_ENERGY_CUT,
            ScenarioId::ShowerCollapse => config.keep_em_shower_daughters = false,
            ScenarioId::Baseline | ScenarioId::VolumeFilter | ScenarioId::MultiPass => {}
        }
        config
    }

    /// Keep policy installed on the tracker, if any.
    pub fn keep_policy(&self) -> Option<VolumeFilter> {
        match self {
            ScenarioId::VolumeFilter => Some(detector_volume()),
            _ => None,
        }
    }

    /// Events simulated per seed, given the requested count.
    pub fn event_count(&self, requested: usize) -> usize {
        match self {
            ScenarioId::MultiPass => requested.max(3),
            _ => requested,
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "baseline" => Ok(ScenarioId::Baseline),
            "energy_cut" | "energycut" => Ok(ScenarioId::EnergyCut),
            "shower_collapse" | "showercollapse" | "shower" => Ok(ScenarioId::ShowerCollapse),
            "volume_filter" | "volumefilter" | "volume" => Ok(ScenarioId::VolumeFilter),
            "multi_pass" | "multipass" => Ok(ScenarioId::MultiPass),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

/// The detector box: x, y in [-100, 100] cm, z in [0, 300] cm.
pub fn detector_volume() -> VolumeFilter {
    VolumeFilter::new(vec![BoundingBox::new(
        Vector3::new(-100.0, -100.0, 0.0),
        Vector3::new(100.0, 100.0, 300.0),
    )])
}

/// Two generator records: a beam spill and a cosmic overlay.
pub fn standard_batches() -> Vec<TruthBatch> {
    let beam_axis = Vector3::new(0.0, 0.0, 1.0);
    let beam = TruthBatch::new(
        "beam",
        vec![
            PrimarySpec::new(pdg::MUON, 2.0 * units::GEV, Vector3::zeros(), beam_axis),
            PrimarySpec::new(pdg::PROTON, 800.0 * units::MEV, Vector3::zeros(), beam_axis),
            PrimarySpec::new(pdg::PION, 400.0 * units::MEV, Vector3::zeros(), beam_axis),
        ],
    );

    // Enters the detector from above
    let cosmic_origin = Vector3::new(0.0, 200.0 * units::CM, 50.0 * units::CM);
    let down = Vector3::new(0.0, -1.0, 0.0);
    let cosmic = TruthBatch::new(
        "cosmic",
        vec![
            PrimarySpec::new(pdg::ANTI_MUON, 4.0 * units::GEV, cosmic_origin, down),
            PrimarySpec::new(pdg::GAMMA, 300.0 * units::MEV, cosmic_origin, down),
        ],
    );

    vec![beam, cosmic]
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_core::KeepPolicy;
    use nalgebra::Vector4;

    #[test]
    fn test_names_round_trip() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
        }
        assert!("nope".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_tracker_config_overrides() {
        let base = ParticleListConfig::default();
        assert_eq!(ScenarioId::EnergyCut.tracker_config(&base).energy_cut, SCENARIO_ENERGY_CUT);
        assert!(!ScenarioId::ShowerCollapse.tracker_config(&base).keep_em_shower_daughters);
        assert_eq!(ScenarioId::Baseline.tracker_config(&base), base);
    }

    #[test]
    fn test_only_volume_filter_has_policy() {
        assert!(ScenarioId::VolumeFilter.keep_policy().is_some());
        assert!(ScenarioId::Baseline.keep_policy().is_none());
    }

    #[test]
    fn test_detector_volume() {
        let volume = detector_volume();
        assert!(volume.must_keep(&Vector4::new(0.0, 0.0, 150.0, 0.0)));
        assert!(!volume.must_keep(&Vector4::new(0.0, 200.0, 50.0, 0.0)));
    }

    #[test]
    fn test_standard_batches() {
        let batches = standard_batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].particles.len(), 3);
        assert_eq!(batches[1].particles[0].kinetic_energy, 4000.0);
    }
}
