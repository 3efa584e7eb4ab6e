//! Toy transport engine.
//!
//! A deterministic, seeded cascade generator that drives any
//! `TransportHooks` implementation exactly like a real engine would:
//! - Primaries get ids 1..N in truth-batch order
//! - Secondaries get the next free id when created
//! - Tracks are taken from a LIFO stack, so a parent always finishes before
//!   its children start, and later siblings are transported first
//!
//! Units follow `lineage_env::units`: mm, ns, MeV.

use crate::error::SimError;
use lineage_env::{EnvError, PrimaryTag, StepInfo, StepPoint, TrackEnd, TrackId, TrackInfo, TransportHooks};
use nalgebra::Vector3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp, Normal};
use std::collections::BTreeMap;
use tracing::debug;

/// Speed of light (mm/ns)
pub const SPEED_OF_LIGHT: f64 = 299.792458;

/// Refractive index seen by optical photons
const REFRACTIVE_INDEX: f64 = 1.38;

/// Energy of a scintillation photon (MeV)
const SCINTILLATION_ENERGY: f64 = 9.7e-6;

/// Electron rest mass (MeV)
const ELECTRON_MASS: f64 = 0.511;

/// PDG codes used by the toy engine.
pub mod pdg {
    pub const OPTICAL_PHOTON: i32 = 0;
    pub const ELECTRON: i32 = 11;
    pub const POSITRON: i32 = -11;
    pub const MUON: i32 = 13;
    pub const ANTI_MUON: i32 = -13;
    pub const GAMMA: i32 = 22;
    pub const PION: i32 = 211;
    pub const PROTON: i32 = 2212;
    pub const NEUTRON: i32 = 2112;
}

/// Rest mass (MeV) of the particles the toy engine knows.
pub fn mass_of(pdg_code: i32) -> f64 {
    match pdg_code.abs() {
        pdg::ELECTRON => ELECTRON_MASS,
        pdg::MUON => 105.658,
        pdg::PION => 139.570,
        pdg::PROTON => 938.272,
        pdg::NEUTRON => 939.565,
        _ => 0.0,
    }
}

fn is_charged(pdg_code: i32) -> bool {
    matches!(pdg_code.abs(), pdg::ELECTRON | pdg::MUON | pdg::PION | pdg::PROTON)
}

// ============================================================================
// INPUT
// ============================================================================

/// A user-supplied primary particle.
#[derive(Debug, Clone)]
pub struct PrimarySpec {
    pub pdg_code: i32,

    /// Kinetic energy (MeV)
    pub kinetic_energy: f64,

    /// Start position (mm)
    pub position: Vector3<f64>,

    /// Direction of flight (normalized on use)
    pub direction: Vector3<f64>,
}

impl PrimarySpec {
    pub fn new(pdg_code: i32, kinetic_energy: f64, position: Vector3<f64>, direction: Vector3<f64>) -> Self {
        Self {
            pdg_code,
            kinetic_energy,
            position,
            direction,
        }
    }
}

/// One generator record: a batch of primaries that belong together.
#[derive(Debug, Clone)]
pub struct TruthBatch {
    pub label: String,
    pub particles: Vec<PrimarySpec>,
}

impl TruthBatch {
    pub fn new(label: &str, particles: Vec<PrimarySpec>) -> Self {
        Self {
            label: label.to_string(),
            particles,
        }
    }
}

/// Tunables of the toy engine.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Mean step length (mm)
    pub mean_step_length: f64,

    /// Tracks stop below this kinetic energy (MeV)
    pub tracking_cut: f64,

    /// Continuous energy loss of charged particles (MeV/mm)
    pub dedx: f64,

    /// Per-track step limit
    pub max_steps: usize,

    /// Per-event track limit; the stack is abandoned beyond it
    pub max_tracks: usize,

    /// Chance that a step ends in a discrete interaction
    pub interaction_probability: f64,

    /// Chance that a step is a voxel-readout bookkeeping step
    pub voxel_step_probability: f64,

    /// Chance that a charged step emits a scintillation photon
    pub scintillation_probability: f64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mean_step_length: 20.0,
            tracking_cut: 1.0,
            dedx: 0.21, // 2.1 MeV/cm
            max_steps: 60,
            max_tracks: 400,
            interaction_probability: 0.15,
            voxel_step_probability: 0.1,
            scintillation_probability: 0.02,
        }
    }
}

// ============================================================================
// OUTPUT
// ============================================================================

/// Result of one simulated event.
#[derive(Debug)]
pub struct EventOutcome<O> {
    /// Whatever the hooks produced at end of event
    pub output: O,

    /// Engine (un-offset) id of every primary and where it came from
    pub primaries: BTreeMap<TrackId, PrimaryTag>,

    pub tracks_transported: usize,
    pub steps: usize,
}

struct PendingTrack {
    info: TrackInfo,
    position: Vector3<f64>,
    direction: Vector3<f64>,
    time: f64,
}

/// A discrete interaction: process name, products (pdg, kinetic energy)
/// and whether the incoming particle is destroyed.
struct Interaction {
    process: &'static str,
    products: Vec<(i32, f64)>,
    absorbed: bool,
}

// ============================================================================
// TOY TRANSPORT
// ============================================================================

/// The deterministic cascade generator.
pub struct ToyTransport {
    rng: ChaCha8Rng,
    config: TransportConfig,
    step_length: Exp<f64>,
    scatter: Normal<f64>,
    spread: Normal<f64>,
}

impl ToyTransport {
    /// Creates an engine seeded with `seed`.
    pub fn new(seed: u64, config: TransportConfig) -> Result<Self, SimError> {
        let probabilities = [
            ("interaction_probability", config.interaction_probability),
            ("voxel_step_probability", config.voxel_step_probability),
            ("scintillation_probability", config.scintillation_probability),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(SimError::InvalidParameter {
                    name,
                    reason: format!("probability {} outside [0, 1]", value),
                });
            }
        }
        if config.tracking_cut <= 0.0 {
            return Err(SimError::InvalidParameter {
                name: "tracking_cut",
                reason: "must be positive".to_string(),
            });
        }

        let step_length = Exp::new(1.0 / config.mean_step_length).map_err(|e| SimError::InvalidParameter {
            name: "mean_step_length",
            reason: e.to_string(),
        })?;
        let scatter = Normal::new(0.0, 0.05).map_err(|e| SimError::InvalidParameter {
            name: "scatter",
            reason: e.to_string(),
        })?;
        let spread = Normal::new(0.0, 0.5).map_err(|e| SimError::InvalidParameter {
            name: "spread",
            reason: e.to_string(),
        })?;

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            config,
            step_length,
            scatter,
            spread,
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Transport every primary of `batches` and their descendants through `hooks`.
    pub fn simulate_event<H: TransportHooks>(
        &mut self,
        batches: &[TruthBatch],
        hooks: &mut H,
    ) -> Result<EventOutcome<H::Output>, SimError> {
        validate_batches(batches)?;

        hooks.begin_of_event();

        let mut next_id = 1;
        let mut primaries = BTreeMap::new();
        let mut stack = Vec::new();
        for (truth_index, batch) in batches.iter().enumerate() {
            for (particle_index, spec) in batch.particles.iter().enumerate() {
                let track_id = TrackId(next_id);
                next_id += 1;

                let tag = PrimaryTag {
                    truth_index,
                    particle_index,
                };
                primaries.insert(track_id, tag);
                stack.push(PendingTrack {
                    info: TrackInfo {
                        track_id,
                        parent_id: TrackId::PRIMARY_PARENT,
                        pdg_code: spec.pdg_code,
                        mass: mass_of(spec.pdg_code),
                        kinetic_energy: spec.kinetic_energy,
                        creator_process: None,
                        weight: 1.0,
                        polarization: Vector3::zeros(),
                        primary: Some(tag),
                    },
                    position: spec.position,
                    direction: spec.direction.normalize(),
                    time: 0.0,
                });
            }
        }
        // First primary on top of the stack
        stack.reverse();

        let mut tracks_transported = 0;
        let mut steps = 0;
        while let Some(track) = stack.pop() {
            if tracks_transported >= self.config.max_tracks {
                debug!(
                    "track budget of {} exhausted, abandoning {} tracks",
                    self.config.max_tracks,
                    stack.len() + 1
                );
                break;
            }
            tracks_transported += 1;

            hooks
                .pre_tracking(&track.info)
                .map_err(|e| SimError::Hook(e.to_string()))?;
            let (secondaries, end, track_steps) = self.transport(&track, &mut next_id, hooks);
            hooks.post_tracking(Some(&end));

            steps += track_steps;
            stack.extend(secondaries);
        }

        debug!("event done: {} tracks, {} steps", tracks_transported, steps);

        Ok(EventOutcome {
            output: hooks.end_of_event(),
            primaries,
            tracks_transported,
            steps,
        })
    }

    /// Step one track to its end, returning its secondaries.
    fn transport<H: TransportHooks>(
        &mut self,
        track: &PendingTrack,
        next_id: &mut i32,
        hooks: &mut H,
    ) -> (Vec<PendingTrack>, TrackEnd, usize) {
        let pdg_code = track.info.pdg_code;
        let mass = track.info.mass;
        let charged = is_charged(pdg_code);
        let optical = pdg_code == pdg::OPTICAL_PHOTON;

        let mut kinetic_energy = track.info.kinetic_energy;
        let mut position = track.position;
        let mut direction = track.direction;
        let mut time = track.time;
        let mut secondaries = Vec::new();
        let mut end_process = String::from("Transportation");
        let mut steps = 0;

        for step_index in 0..self.config.max_steps {
            let pre = step_point(position, time, direction, kinetic_energy, mass);
            let velocity = velocity(pdg_code, kinetic_energy, mass);

            let voxel = self.rng.gen_bool(self.config.voxel_step_probability);
            let length = if voxel {
                self.rng.gen_range(0.5..3.0)
            } else {
                self.step_length.sample(&mut self.rng).max(0.01)
            };

            // The engine quirk: the first optical-photon step is timed at c
            let delta_time = if optical && step_index == 0 {
                length / SPEED_OF_LIGHT
            } else {
                length / velocity
            };

            position += direction * length;
            time += delta_time;
            if charged {
                kinetic_energy = (kinetic_energy - self.config.dedx * length).max(0.0);
            }

            let mut process = if voxel {
                "LArVoxelReadoutProcess"
            } else {
                continuous_process(pdg_code)
            };

            if !voxel && self.rng.gen_bool(self.config.interaction_probability) {
                let interaction = self.interact(pdg_code, kinetic_energy);
                process = interaction.process;
                for (product_pdg, product_energy) in interaction.products {
                    kinetic_energy = (kinetic_energy - product_energy).max(0.0);
                    secondaries.push(self.secondary(
                        next_id,
                        track.info.track_id,
                        process,
                        product_pdg,
                        product_energy,
                        position,
                        direction,
                        time,
                    ));
                }
                if interaction.absorbed {
                    kinetic_energy = 0.0;
                }
            }

            if charged && !voxel && self.rng.gen_bool(self.config.scintillation_probability) {
                secondaries.push(self.secondary(
                    next_id,
                    track.info.track_id,
                    "Scintillation",
                    pdg::OPTICAL_PHOTON,
                    SCINTILLATION_ENERGY,
                    position,
                    direction,
                    time,
                ));
            }

            let stopped = if optical {
                kinetic_energy <= 0.0
            } else {
                kinetic_energy <= self.config.tracking_cut
            };
            let post = step_point(position, time, direction, kinetic_energy, mass);
            hooks.stepping(&StepInfo {
                pre,
                post,
                post_process: process.to_string(),
                step_length: length,
                delta_time,
                velocity,
                pdg_code,
            });
            end_process = process.to_string();
            steps += 1;

            if stopped {
                break;
            }
            direction = self.scattered(direction, self.scatter);
        }

        let end = TrackEnd {
            weight: track.info.weight,
            end_process,
        };
        (secondaries, end, steps)
    }

    /// Pick a discrete interaction for a particle with `kinetic_energy` left.
    fn interact(&mut self, pdg_code: i32, kinetic_energy: f64) -> Interaction {
        let roll: f64 = self.rng.gen();
        let fraction = self.rng.gen_range(0.05..0.5);

        match pdg_code {
            pdg::OPTICAL_PHOTON => Interaction {
                process: "OpAbsorption",
                products: vec![],
                absorbed: true,
            },
            pdg::GAMMA if kinetic_energy > 2.0 * ELECTRON_MASS && roll < 0.3 => {
                let shared = (kinetic_energy - 2.0 * ELECTRON_MASS) / 2.0;
                Interaction {
                    process: "conv",
                    products: vec![(pdg::ELECTRON, shared), (pdg::POSITRON, shared)],
                    absorbed: true,
                }
            }
            pdg::GAMMA if roll < 0.6 => Interaction {
                process: "phot",
                products: vec![(pdg::ELECTRON, kinetic_energy)],
                absorbed: true,
            },
            pdg::GAMMA => Interaction {
                process: "compt",
                products: vec![(pdg::ELECTRON, kinetic_energy * fraction)],
                absorbed: false,
            },
            pdg::POSITRON if roll < 0.3 => Interaction {
                process: "annihil",
                products: vec![(pdg::GAMMA, ELECTRON_MASS), (pdg::GAMMA, ELECTRON_MASS)],
                absorbed: true,
            },
            pdg::ELECTRON | pdg::POSITRON if roll < 0.5 => Interaction {
                process: "eBrem",
                products: vec![(pdg::GAMMA, kinetic_energy * fraction)],
                absorbed: false,
            },
            pdg::ELECTRON | pdg::POSITRON => Interaction {
                process: "eIoni",
                products: vec![(pdg::ELECTRON, kinetic_energy * fraction * 0.2)],
                absorbed: false,
            },
            pdg::MUON | pdg::ANTI_MUON if roll < 0.05 => Interaction {
                process: "Decay",
                products: vec![(pdg::ELECTRON, kinetic_energy / 3.0)],
                absorbed: true,
            },
            pdg::MUON | pdg::ANTI_MUON => Interaction {
                process: "muIoni",
                products: vec![(pdg::ELECTRON, kinetic_energy * fraction * 0.05)],
                absorbed: false,
            },
            _ if roll < 0.5 => Interaction {
                process: "hadElastic",
                products: vec![],
                absorbed: false,
            },
            code => Interaction {
                process: inelastic_process(code),
                products: vec![
                    (pdg::PROTON, kinetic_energy * 0.3),
                    (pdg::NEUTRON, kinetic_energy * 0.2),
                    (pdg::GAMMA, kinetic_energy * 0.05),
                ],
                absorbed: true,
            },
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn secondary(
        &mut self,
        next_id: &mut i32,
        parent_id: TrackId,
        process: &str,
        pdg_code: i32,
        kinetic_energy: f64,
        position: Vector3<f64>,
        direction: Vector3<f64>,
        time: f64,
    ) -> PendingTrack {
        let track_id = TrackId(*next_id);
        *next_id += 1;

        PendingTrack {
            info: TrackInfo {
                track_id,
                parent_id,
                pdg_code,
                mass: mass_of(pdg_code),
                kinetic_energy,
                creator_process: Some(process.to_string()),
                weight: 1.0,
                polarization: Vector3::zeros(),
                primary: None,
            },
            position,
            direction: self.scattered(direction, self.spread),
            time,
        }
    }

    /// Perturb a direction by Gaussian noise and renormalize.
    fn scattered(&mut self, direction: Vector3<f64>, noise: Normal<f64>) -> Vector3<f64> {
        let kicked = direction
            + Vector3::new(
                noise.sample(&mut self.rng),
                noise.sample(&mut self.rng),
                noise.sample(&mut self.rng),
            );
        if kicked.norm() > 1e-9 {
            kicked.normalize()
        } else {
            direction
        }
    }
}

fn validate_batches(batches: &[TruthBatch]) -> Result<(), EnvError> {
    for (index, batch) in batches.iter().enumerate() {
        for spec in &batch.particles {
            if !spec.kinetic_energy.is_finite() || spec.kinetic_energy <= 0.0 {
                return Err(EnvError::InvalidPrimary {
                    index,
                    reason: format!("kinetic energy {} must be positive", spec.kinetic_energy),
                });
            }
            if spec.direction.norm() < 1e-12 {
                return Err(EnvError::InvalidPrimary {
                    index,
                    reason: "direction has zero length".to_string(),
                });
            }
        }
    }
    Ok(())
}

fn step_point(
    position: Vector3<f64>,
    global_time: f64,
    direction: Vector3<f64>,
    kinetic_energy: f64,
    mass: f64,
) -> StepPoint {
    let momentum = (kinetic_energy * (kinetic_energy + 2.0 * mass)).sqrt();
    StepPoint {
        position,
        global_time,
        momentum: direction * momentum,
        total_energy: kinetic_energy + mass,
    }
}

/// Track velocity (mm/ns).
fn velocity(pdg_code: i32, kinetic_energy: f64, mass: f64) -> f64 {
    if pdg_code == pdg::OPTICAL_PHOTON {
        return SPEED_OF_LIGHT / REFRACTIVE_INDEX;
    }
    if mass == 0.0 {
        return SPEED_OF_LIGHT;
    }
    let total = kinetic_energy + mass;
    let momentum = (kinetic_energy * (kinetic_energy + 2.0 * mass)).sqrt();
    // Keep stopped particles from producing infinite step times
    (SPEED_OF_LIGHT * momentum / total).max(1e-3)
}

fn continuous_process(pdg_code: i32) -> &'static str {
    match pdg_code.abs() {
        pdg::ELECTRON => "eIoni",
        pdg::MUON => "muIoni",
        pdg::PION | pdg::PROTON => "hIoni",
        _ => "Transportation",
    }
}

fn inelastic_process(pdg_code: i32) -> &'static str {
    match pdg_code {
        pdg::PROTON => "protonInelastic",
        pdg::NEUTRON => "neutronInelastic",
        pdg::PION => "pi+Inelastic",
        _ => "hadronInelastic",
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::{CallRecorder, HookCall};
    use std::collections::HashSet;

    fn muon_batch() -> Vec<TruthBatch> {
        vec![TruthBatch::new(
            "beam",
            vec![PrimarySpec::new(
                pdg::MUON,
                1500.0,
                Vector3::zeros(),
                Vector3::new(0.0, 0.0, 1.0),
            )],
        )]
    }

    fn two_batches() -> Vec<TruthBatch> {
        vec![
            TruthBatch::new(
                "beam",
                vec![
                    PrimarySpec::new(pdg::MUON, 1500.0, Vector3::zeros(), Vector3::z()),
                    PrimarySpec::new(pdg::PROTON, 600.0, Vector3::zeros(), Vector3::x()),
                ],
            ),
            TruthBatch::new(
                "cosmic",
                vec![PrimarySpec::new(
                    pdg::GAMMA,
                    300.0,
                    Vector3::new(0.0, 2000.0, 0.0),
                    -Vector3::y(),
                )],
            ),
        ]
    }

    fn record(seed: u64, batches: &[TruthBatch]) -> EventOutcome<Vec<HookCall>> {
        let mut engine = ToyTransport::new(seed, TransportConfig::default()).unwrap();
        let mut recorder = CallRecorder::default();
        engine.simulate_event(batches, &mut recorder).unwrap()
    }

    #[test]
    fn test_primaries_numbered_in_batch_order() {
        let outcome = record(7, &two_batches());

        assert_eq!(outcome.primaries.len(), 3);
        assert_eq!(outcome.primaries[&TrackId(1)].truth_index, 0);
        assert_eq!(outcome.primaries[&TrackId(2)].particle_index, 1);
        assert_eq!(outcome.primaries[&TrackId(3)].truth_index, 1);

        // The first primary is transported first
        match &outcome.output[1] {
            HookCall::PreTracking(info) => assert_eq!(info.track_id, TrackId(1)),
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[test]
    fn test_call_stream_is_well_formed() {
        let outcome = record(11, &two_batches());
        let calls = &outcome.output;

        assert!(matches!(calls.first(), Some(HookCall::BeginOfEvent)));
        assert!(matches!(calls.last(), Some(HookCall::EndOfEvent)));

        let mut in_track = false;
        let mut started = HashSet::new();
        for call in &calls[1..calls.len() - 1] {
            match call {
                HookCall::PreTracking(info) => {
                    assert!(!in_track, "tracks must not interleave");
                    assert!(started.insert(info.track_id), "track ids are unique");
                    if info.primary.is_none() {
                        // Parents are always transported before their children
                        assert!(started.contains(&info.parent_id));
                    }
                    in_track = true;
                }
                HookCall::Stepping(_) => assert!(in_track),
                HookCall::PostTracking(_) => {
                    assert!(in_track);
                    in_track = false;
                }
                HookCall::BeginOfEvent | HookCall::EndOfEvent => panic!("nested event"),
            }
        }
        assert_eq!(started.len(), outcome.tracks_transported);
    }

    #[test]
    fn test_same_seed_same_cascade() {
        let a = record(99, &muon_batch());
        let b = record(99, &muon_batch());
        assert_eq!(a.steps, b.steps);
        assert_eq!(a.tracks_transported, b.tracks_transported);
    }

    #[test]
    fn test_first_optical_step_is_inconsistent() {
        let batch = vec![TruthBatch::new(
            "light",
            vec![PrimarySpec::new(
                pdg::OPTICAL_PHOTON,
                SCINTILLATION_ENERGY,
                Vector3::zeros(),
                Vector3::z(),
            )],
        )];
        let outcome = record(3, &batch);

        let first_step = outcome
            .output
            .iter()
            .find_map(|call| match call {
                HookCall::Stepping(step) => Some(step),
                _ => None,
            })
            .unwrap();
        let step_velocity = first_step.step_length / first_step.delta_time;
        assert!((step_velocity - first_step.velocity).abs() > 1.0);
    }

    #[test]
    fn test_track_budget_respected() {
        let config = TransportConfig {
            max_tracks: 2,
            interaction_probability: 1.0,
            ..Default::default()
        };
        let mut engine = ToyTransport::new(5, config).unwrap();
        let mut recorder = CallRecorder::default();
        let outcome = engine.simulate_event(&two_batches(), &mut recorder).unwrap();
        assert_eq!(outcome.tracks_transported, 2);
    }

    #[test]
    fn test_invalid_primary_rejected() {
        let batch = vec![TruthBatch::new(
            "bad",
            vec![PrimarySpec::new(pdg::MUON, -1.0, Vector3::zeros(), Vector3::z())],
        )];
        let mut engine = ToyTransport::new(1, TransportConfig::default()).unwrap();
        let mut recorder = CallRecorder::default();
        let result = engine.simulate_event(&batch, &mut recorder);
        assert!(matches!(
            result,
            Err(SimError::Env(EnvError::InvalidPrimary { index: 0, .. }))
        ));
    }

    #[test]
    fn test_invalid_probability_rejected() {
        let config = TransportConfig {
            voxel_step_probability: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            ToyTransport::new(1, config),
            Err(SimError::InvalidParameter {
                name: "voxel_step_probability",
                ..
            })
        ));
    }
}
