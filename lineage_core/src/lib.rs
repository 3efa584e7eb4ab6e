//! Lineage Core - Particle Genealogy Bookkeeping for Transport Simulations
//!
//! Builds the per-event particle table from a transport engine's
//! track-begin / step / track-end callbacks:
//! 1. **Trajectory accumulation**: cm/ns/GeV samples per particle
//! 2. **Pruning**: energy cut, EM-shower collapsing, pluggable keep policy
//! 3. **Lineage**: collapsed tracks resolve to the root of their parent chain,
//!    daughter lists are rebuilt once the event is complete
//!
//! The engine itself and the persistence of the final list live outside
//! this crate; see `lineage_env` for the callback boundary.

pub mod config;
pub mod error;
pub mod keep_policy;
pub mod lineage;
pub mod particle;
pub mod particle_table;
pub mod timing;
pub mod tracking;
pub mod trajectory;

// Re-export key types for convenience
pub use config::ParticleListConfig;
pub use error::{ConfigError, ParticleListError};
pub use keep_policy::{BoundingBox, KeepPolicy, VolumeFilter};
pub use lineage::ParentIdMap;
pub use particle::{ArchivedParticle, ParticleRecord};
pub use particle_table::{ParticleList, ParticleTable, TableEntry};
pub use tracking::{CurrentTrack, EventSummary, FinishedEvent, KeepDecision, LineageTracker};
pub use trajectory::{Trajectory, TrajectoryPoint};
