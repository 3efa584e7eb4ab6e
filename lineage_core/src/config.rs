//! Runtime configuration for the lineage tracker.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Creator-process substrings that mark a secondary as part of an EM shower:
/// conversion, pair production, Compton scattering, photoelectric effect,
/// bremsstrahlung, ionization and annihilation.
pub const DEFAULT_EM_SHOWER_PROCESSES: &[&str] = &[
    "conv",
    "LowEnConversion",
    "Pair",
    "compt",
    "Compt",
    "Brem",
    "phot",
    "Photo",
    "Ion",
    "annihil",
];

/// Step-process substrings of voxelization/readout bookkeeping steps.
pub const DEFAULT_IGNORED_STEP_PROCESSES: &[&str] = &["LArVoxel", "OpDetReadout"];

/// Configuration for the LineageTracker.
///
/// Every field has a default, so a JSON file only needs to name the values
/// it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleListConfig {
    /// Secondaries below this kinetic energy (GeV) are not materialized (default: 0.0)
    pub energy_cut: f64,

    /// Store every non-bookkeeping step point, not only the start point (default: true)
    pub store_trajectories: bool,

    /// Keep secondaries produced by EM-shower processes (default: true)
    pub keep_em_shower_daughters: bool,

    /// Case-sensitive substrings identifying EM-shower creator processes
    pub em_shower_processes: Vec<String>,

    /// Substrings identifying steps that never contribute a trajectory point
    pub ignored_step_processes: Vec<String>,

    /// Apply the optical-photon step-time correction (default: true)
    pub correct_photon_timing: bool,

    /// Velocity mismatch (mm/ns) above which the correction kicks in (default: 0.0001)
    pub velocity_tolerance: f64,
}

impl Default for ParticleListConfig {
    fn default() -> Self {
        Self {
            energy_cut: 0.0,
            store_trajectories: true,
            keep_em_shower_daughters: true,
            em_shower_processes: DEFAULT_EM_SHOWER_PROCESSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignored_step_processes: DEFAULT_IGNORED_STEP_PROCESSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            correct_photon_timing: true,
            velocity_tolerance: 0.0001,
        }
    }
}

impl ParticleListConfig {
    /// Parse a configuration from JSON text and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject values the tracker cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.energy_cut.is_finite() || self.energy_cut < 0.0 {
            return Err(ConfigError::Invalid {
                field: "energy_cut",
                reason: format!("must be a finite, non-negative energy, got {}", self.energy_cut),
            });
        }
        if !self.velocity_tolerance.is_finite() || self.velocity_tolerance < 0.0 {
            return Err(ConfigError::Invalid {
                field: "velocity_tolerance",
                reason: format!("must be finite and non-negative, got {}", self.velocity_tolerance),
            });
        }
        Ok(())
    }

    /// True if a creator process name belongs to an EM shower.
    pub fn is_em_shower_process(&self, process: &str) -> bool {
        self.em_shower_processes
            .iter()
            .any(|needle| process.contains(needle.as_str()))
    }

    /// True if a step process is pure bookkeeping (voxel readout and the like).
    pub fn is_ignored_step_process(&self, process: &str) -> bool {
        self.ignored_step_processes
            .iter()
            .any(|needle| process.contains(needle.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ParticleListConfig::default();
        assert_eq!(config.energy_cut, 0.0);
        assert!(config.store_trajectories);
        assert!(config.keep_em_shower_daughters);
        assert_eq!(config.em_shower_processes.len(), 10);
    }

    #[test]
    fn test_em_shower_substring_match() {
        let config = ParticleListConfig::default();
        assert!(config.is_em_shower_process("compt"));
        assert!(config.is_em_shower_process("eIoni"));
        assert!(config.is_em_shower_process("muPairProd"));
        assert!(config.is_em_shower_process("eBrem"));
        assert!(!config.is_em_shower_process("Decay"));
        assert!(!config.is_em_shower_process("hadElastic"));
        // Case-sensitive: "ion" alone is not "Ion"
        assert!(!config.is_em_shower_process("ionInelastic"));
    }

    #[test]
    fn test_ignored_step_process() {
        let config = ParticleListConfig::default();
        assert!(config.is_ignored_step_process("LArVoxelReadoutProcess"));
        assert!(config.is_ignored_step_process("OpDetReadoutProcess"));
        assert!(!config.is_ignored_step_process("eIoni"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            ParticleListConfig::from_json_str(r#"{ "energy_cut": 0.01, "keep_em_shower_daughters": false }"#)
                .unwrap();
        assert_eq!(config.energy_cut, 0.01);
        assert!(!config.keep_em_shower_daughters);
        assert!(config.store_trajectories);
        assert_eq!(config.ignored_step_processes.len(), 2);
    }

    #[test]
    fn test_negative_energy_cut_rejected() {
        let result = ParticleListConfig::from_json_str(r#"{ "energy_cut": -1.0 }"#);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { field: "energy_cut", .. })
        ));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let result = ParticleListConfig::from_json_str("{ energy_cut: }");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
