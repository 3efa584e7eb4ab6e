//! The "TRACKING" Controller - Per-Event Genealogy Builder
//!
//! Listens to the transport engine's callbacks and maintains a minimal,
//! self-consistent particle table for one event:
//! - Primaries always get parent id 0
//! - Secondaries from EM-shower processes (optional) and secondaries below
//!   the energy cut are never materialized; they collapse into the tracked
//!   ancestor at the top of their parent chain
//! - A keep policy can archive particles it never asked for
//! - Daughter lists and the track-id offset are settled at event end
//!
//! Track lifecycle: NotStarted -> Tracking -> {Finalized | Dropped}.

use crate::config::ParticleListConfig;
use crate::error::ParticleListError;
use crate::keep_policy::KeepPolicy;
use crate::lineage::ParentIdMap;
use crate::particle::{ParticleRecord, PRIMARY_PROCESS, UNKNOWN_PROCESS};
use crate::particle_table::{ParticleList, ParticleTable};
use crate::timing::corrected_post_step_time;
use crate::trajectory::START_LABEL;
use lineage_env::{units, StepInfo, StepPoint, TrackEnd, TrackId, TrackInfo, TransportHooks};
use nalgebra::Vector4;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

// ============================================================================
// CURRENT TRACK / CURRENT PARTICLE
// ============================================================================

/// What the track currently being transported maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CurrentTrack {
    /// The track has its own particle record.
    Tracked(TrackId),

    /// The track was collapsed; its effects belong to this ancestor.
    CollapsedInto(TrackId),

    /// No particle (between events, or collapsed without a known ancestor).
    #[default]
    Unknown,
}

/// Where energy deposited by the current track should be credited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribution {
    pub track_id: TrackId,

    /// True when the credit goes to an ancestor of a collapsed track.
    pub collapsed: bool,
}

impl CurrentTrack {
    pub fn attribution(&self) -> Option<Attribution> {
        match *self {
            Self::Tracked(track_id) => Some(Attribution {
                track_id,
                collapsed: false,
            }),
            Self::CollapsedInto(track_id) => Some(Attribution {
                track_id,
                collapsed: true,
            }),
            Self::Unknown => None,
        }
    }

    /// Plain track id, `TrackId::NONE` for `Unknown`.
    pub fn track_id(&self) -> TrackId {
        self.attribution()
            .map_or(TrackId::NONE, |attribution| attribution.track_id)
    }
}

/// Keep decision for the particle receiving steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeepDecision {
    /// Waiting for the keep policy; archived if still undecided at track end.
    Undecided,

    /// Kept for good.
    Keep,
}

impl KeepDecision {
    pub fn is_kept(self) -> bool {
        self == Self::Keep
    }
}

#[derive(Debug, Clone, Copy)]
struct CurrentParticle {
    track_id: TrackId,
    keep: KeepDecision,
}

/// Why a track was not materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollapseReason {
    EmShower,
    EnergyCut,
}

// ============================================================================
// EVENT SUMMARY
// ============================================================================

/// Bookkeeping totals for one finished event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    /// Particles handed over with full payload
    pub resident: usize,

    /// Particles dropped by the keep policy
    pub archived: usize,

    /// Tracks collapsed into an ancestor (EM shower or energy cut)
    pub collapsed: usize,

    /// Secondaries whose parent could not be resolved at creation
    pub unresolved_parents: usize,

    /// Resident particles whose parent is not in the table
    pub orphans: usize,

    /// Offset the next pass will add to engine track ids
    pub next_track_id_offset: i32,
}

/// Everything an event hands to the export step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinishedEvent {
    pub summary: EventSummary,
    pub particles: ParticleList,
}

// ============================================================================
// LINEAGE TRACKER (The Controller)
// ============================================================================

/// Stateful driver invoked once per track begin/step/end.
///
/// The track-id offset persists across events and is only reset by
/// `reset_run`; everything else is per event.
pub struct LineageTracker {
    // === Configuration ===
    config: ParticleListConfig,
    keep_policy: Option<Box<dyn KeepPolicy>>,

    // === Per-Event State ===
    table: ParticleTable,
    parent_map: ParentIdMap,
    current_particle: Option<CurrentParticle>,
    current_track: CurrentTrack,
    collapsed_tracks: usize,
    unresolved_parents: usize,

    // === Run-Wide State ===
    track_id_offset: i32,
}

impl LineageTracker {
    /// Create a tracker with the given configuration and no keep policy.
    pub fn new(config: ParticleListConfig) -> Self {
        Self {
            config,
            keep_policy: None,
            table: ParticleTable::new(),
            parent_map: ParentIdMap::new(),
            current_particle: None,
            current_track: CurrentTrack::Unknown,
            collapsed_tracks: 0,
            unresolved_parents: 0,
            track_id_offset: 0,
        }
    }

    /// Create a tracker with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ParticleListConfig::default())
    }

    /// Install a keep policy. New particles then start undecided.
    pub fn with_keep_policy(mut self, policy: impl KeepPolicy + 'static) -> Self {
        self.keep_policy = Some(Box::new(policy));
        self
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn config(&self) -> &ParticleListConfig {
        &self.config
    }

    pub fn track_id_offset(&self) -> i32 {
        self.track_id_offset
    }

    pub fn current_track(&self) -> CurrentTrack {
        self.current_track
    }

    /// Keep decision of the particle receiving steps, if there is one.
    pub fn current_keep(&self) -> Option<KeepDecision> {
        self.current_particle.map(|current| current.keep)
    }

    /// Track id of the particle receiving steps, if there is one.
    pub fn current_particle_id(&self) -> Option<TrackId> {
        self.current_particle.map(|current| current.track_id)
    }

    /// The particle table as accumulated so far.
    pub fn table(&self) -> &ParticleTable {
        &self.table
    }

    pub fn parent_map(&self) -> &ParentIdMap {
        &self.parent_map
    }

    /// Start of a run: forget the track-id offset.
    pub fn reset_run(&mut self) {
        self.track_id_offset = 0;
    }

    // ========================================================================
    // EVENT LIFECYCLE
    // ========================================================================

    /// Clear all per-event state. The track-id offset is kept.
    pub fn on_event_begin(&mut self) {
        self.current_particle = None;
        self.table.clear();
        self.parent_map.clear();
        self.current_track = CurrentTrack::Unknown;
        self.collapsed_tracks = 0;
        self.unresolved_parents = 0;
    }

    /// Settle daughter lists and the next track-id offset.
    ///
    /// An empty event leaves the offset untouched.
    pub fn on_event_end(&mut self) -> EventSummary {
        let orphans = self.table.rebuild_daughters();

        if let Some(highest) = self.table.highest_id() {
            self.track_id_offset = match highest.get().checked_add(1) {
                Some(next) => next,
                None => {
                    error!("track id {} leaves no room for a next offset; ids of the next pass will collide", highest);
                    i32::MAX
                }
            };
        }

        let summary = EventSummary {
            resident: self.table.resident_count(),
            archived: self.table.archived_count(),
            collapsed: self.collapsed_tracks,
            unresolved_parents: self.unresolved_parents,
            orphans,
            next_track_id_offset: self.track_id_offset,
        };

        info!(
            "event finished: {} kept, {} archived, {} collapsed, {} orphans, next offset {}",
            summary.resident, summary.archived, summary.collapsed, summary.orphans, summary.next_track_id_offset
        );
        summary
    }

    /// Move the event's particles out, leaving the table empty.
    pub fn take_list(&mut self) -> ParticleList {
        self.current_particle = None;
        self.table.take_all()
    }

    // ========================================================================
    // TRACK LIFECYCLE
    // ========================================================================

    /// A track starts: materialize it, collapse it, or re-parent it.
    ///
    /// Fails when the offset track id is already in the table or the offset
    /// does not fit.
    pub fn on_track_begin(&mut self, track: &TrackInfo) -> Result<(), ParticleListError> {
        self.current_particle = None;
        self.current_track = CurrentTrack::Unknown;

        let track_id = self.shifted(track.track_id)?;
        self.current_track = CurrentTrack::Tracked(track_id);

        let mut parent_id;
        let process = if track.primary.is_some() {
            // Primaries from every truth batch share parent 0
            parent_id = TrackId::PRIMARY_PARENT;
            PRIMARY_PROCESS.to_string()
        } else {
            parent_id = self.shifted(track.parent_id)?;

            let process = track
                .creator_process
                .clone()
                .unwrap_or_else(|| UNKNOWN_PROCESS.to_string());

            if !self.config.keep_em_shower_daughters && self.config.is_em_shower_process(&process) {
                self.collapse(track_id, parent_id, CollapseReason::EmShower);
                return Ok(());
            }

            if track.kinetic_energy / units::GEV < self.config.energy_cut {
                self.collapse(track_id, parent_id, CollapseReason::EnergyCut);
                return Ok(());
            }

            if !self.table.is_known(parent_id) {
                parent_id = self.reparent(track_id, parent_id);
            }

            process
        };

        let mut record = ParticleRecord::new(
            track_id,
            track.pdg_code,
            process,
            parent_id,
            track.mass / units::GEV,
        );
        record.set_polarization(track.polarization);
        self.table.add(record)?;

        let keep = if self.keep_policy.is_some() {
            KeepDecision::Undecided
        } else {
            KeepDecision::Keep
        };
        self.current_particle = Some(CurrentParticle { track_id, keep });
        Ok(())
    }

    /// The current track stepped: extend its trajectory.
    pub fn on_step(&mut self, step: &StepInfo) {
        let Some(current) = self.current_particle else {
            return;
        };

        let post_time = if self.config.correct_photon_timing {
            corrected_post_step_time(step, self.config.velocity_tolerance)
        } else {
            step.post.global_time
        };

        // The vertex time is only reliable once the first step exists
        let needs_start = self
            .table
            .find(current.track_id)
            .is_some_and(|record| record.num_trajectory_points() == 0);
        if needs_start {
            let (position, momentum) = four_vectors(&step.pre, step.pre.global_time);
            self.add_point_to_current(position, momentum, START_LABEL);
        }

        let ignore_process = self.config.is_ignored_step_process(&step.post_process);
        debug!(
            "step of {}: process='{}' ignore_process={} store_trajectories={}",
            current.track_id, step.post_process, ignore_process, self.config.store_trajectories
        );

        if self.config.store_trajectories && !ignore_process {
            let (position, momentum) = four_vectors(&step.post, post_time);
            self.add_point_to_current(position, momentum, &step.post_process);
        }
    }

    /// The current track stopped: archive it or record how it ended.
    pub fn on_track_end(&mut self, end: Option<&TrackEnd>) {
        let Some(current) = self.current_particle.take() else {
            return;
        };

        if !current.keep.is_kept() {
            if let Err(e) = self.table.archive(current.track_id) {
                error!("failed to archive particle {}: {}", current.track_id, e);
            }
            return;
        }

        let Some(end) = end else {
            return;
        };
        match self.table.find_mut(current.track_id) {
            Some(record) => {
                record.set_weight(end.weight);
                record.set_end_process(end.end_process.as_str());
            }
            None => warn!("current particle {} missing from table at track end", current.track_id),
        }
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn shifted(&self, track_id: TrackId) -> Result<TrackId, ParticleListError> {
        track_id
            .offset_by(self.track_id_offset)
            .ok_or(ParticleListError::TrackIdOverflow {
                track_id,
                offset: self.track_id_offset,
            })
    }

    /// Attribute a track to the ultimate ancestor reachable through the
    /// parent map, provided the table knows it.
    fn collapse(&mut self, track_id: TrackId, parent_id: TrackId, reason: CollapseReason) {
        self.parent_map.insert(track_id, parent_id);
        self.collapsed_tracks += 1;

        self.current_track = match self.known_ancestor(track_id) {
            Some(ancestor) => CurrentTrack::CollapsedInto(ancestor),
            None => {
                // e.g. a photoelectron whose parent was itself below the cut
                debug!(
                    "collapsed track {} ({:?}) has no known ancestor",
                    track_id, reason
                );
                CurrentTrack::Unknown
            }
        };
        debug!("track {} collapsed ({:?}) -> {:?}", track_id, reason, self.current_track);
    }

    /// Parent for a secondary whose direct parent is not in the table.
    fn reparent(&mut self, track_id: TrackId, parent_id: TrackId) -> TrackId {
        // Recorded in case this track has daughters that need the walk too
        self.parent_map.insert(track_id, parent_id);

        match self.known_ancestor(parent_id) {
            Some(ancestor) => ancestor,
            None => {
                self.unresolved_parents += 1;
                warn!(
                    "can't find parent id {} in the particle table or the parent map; \
                     keeping it as the mother of track {} to aid debugging",
                    parent_id, track_id
                );
                parent_id
            }
        }
    }

    /// Ultimate ancestor of `track_id` through the parent map, if the table
    /// knows it. Cycles are logged and treated as no ancestor.
    fn known_ancestor(&self, track_id: TrackId) -> Option<TrackId> {
        match self.parent_map.resolve_ancestor(track_id) {
            Ok(ancestor) => ancestor.filter(|id| self.table.is_known(*id)),
            Err(e) => {
                error!("parentage walk for {} aborted: {}", track_id, e);
                None
            }
        }
    }

    fn add_point_to_current(&mut self, position: Vector4<f64>, momentum: Vector4<f64>, process: &str) {
        let Some(current) = self.current_particle.as_mut() else {
            return;
        };
        let Some(record) = self.table.find_mut(current.track_id) else {
            warn!("current particle {} missing from table", current.track_id);
            return;
        };

        record.add_trajectory_point(position, momentum, process);

        if current.keep == KeepDecision::Undecided {
            if let Some(policy) = &self.keep_policy {
                if policy.must_keep(&position) {
                    current.keep = KeepDecision::Keep;
                }
            }
        }
    }
}

/// Engine step point to ([x, y, z, t] in cm/ns, [px, py, pz, E] in GeV).
fn four_vectors(point: &StepPoint, global_time: f64) -> (Vector4<f64>, Vector4<f64>) {
    let position = Vector4::new(
        point.position.x / units::CM,
        point.position.y / units::CM,
        point.position.z / units::CM,
        global_time / units::NS,
    );
    let momentum = Vector4::new(
        point.momentum.x / units::GEV,
        point.momentum.y / units::GEV,
        point.momentum.z / units::GEV,
        point.total_energy / units::GEV,
    );
    (position, momentum)
}

// ============================================================================
// TRANSPORT HOOKS
// ============================================================================

impl TransportHooks for LineageTracker {
    type Output = FinishedEvent;
    type Error = ParticleListError;

    fn begin_of_event(&mut self) {
        self.on_event_begin();
    }

    fn pre_tracking(&mut self, track: &TrackInfo) -> Result<(), Self::Error> {
        self.on_track_begin(track)
    }

    fn stepping(&mut self, step: &StepInfo) {
        self.on_step(step);
    }

    fn post_tracking(&mut self, end: Option<&TrackEnd>) {
        self.on_track_end(end);
    }

    fn end_of_event(&mut self) -> FinishedEvent {
        let summary = self.on_event_end();
        FinishedEvent {
            summary,
            particles: self.take_list(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
