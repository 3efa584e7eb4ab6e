//! Lineage Simulation Harness
//!
//! Drives `lineage_core::LineageTracker` with a seeded toy transport
//! engine and checks the bookkeeping invariants of every finished event.
//!
//! # Core Principle: Deterministic Cascades
//!
//! All randomness comes from one 64-bit seed, so a failing seed replays
//! the exact same call sequence:
//! - **Engine**: `ToyTransport` generates showers, hadronic interactions,
//!   voxel-readout steps and optical photons through `TransportHooks`
//! - **Checks**: daughter consistency, id ranges and offsets, plus one
//!   targeted check per scenario
//! - **Export**: finished events with truth associations as JSON
//!
//! # Usage
//!
//! ```ignore
//! use lineage_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42, 3).run(ScenarioId::ShowerCollapse);
//! assert!(result.passed);
//! ```

pub mod checks;
pub mod engine;
mod error;
mod exporter;
pub mod recorder;
mod runner;
pub mod scenarios;

pub use engine::{EventOutcome, PrimarySpec, ToyTransport, TransportConfig, TruthBatch};
pub use error::SimError;
pub use exporter::{associate_truth, EventExport, SimExport, TruthAssociation};
pub use runner::{ScenarioResult, ScenarioRunner};
