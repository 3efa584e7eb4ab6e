//! The per-event particle table.
//!
//! Owns every particle record of the current event, keyed by offset track
//! id. Archived entries keep only identity and parentage so that lineage
//! queries still resolve through them.

use crate::error::ParticleListError;
use crate::particle::{ArchivedParticle, ParticleRecord};
use lineage_env::TrackId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

// ============================================================================
// TABLE ENTRY
// ============================================================================

/// A particle as stored in the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableEntry {
    /// Full record with trajectory and kinematics.
    Resident(ParticleRecord),

    /// Payload dropped; identity and parentage only.
    Archived(ArchivedParticle),
}

impl TableEntry {
    pub fn track_id(&self) -> TrackId {
        match self {
            Self::Resident(record) => record.track_id(),
            Self::Archived(archived) => archived.track_id,
        }
    }

    pub fn parent_id(&self) -> TrackId {
        match self {
            Self::Resident(record) => record.parent_id(),
            Self::Archived(archived) => archived.parent_id,
        }
    }

    pub fn daughters(&self) -> &[TrackId] {
        match self {
            Self::Resident(record) => record.daughters(),
            Self::Archived(archived) => &archived.daughters,
        }
    }

    pub fn is_archived(&self) -> bool {
        matches!(self, Self::Archived(_))
    }

    /// Full record; an archived entry has none and reports it as an error.
    pub fn record(&self) -> Result<&ParticleRecord, ParticleListError> {
        match self {
            Self::Resident(record) => Ok(record),
            Self::Archived(archived) => Err(ParticleListError::Archived(archived.track_id)),
        }
    }

    pub fn record_mut(&mut self) -> Result<&mut ParticleRecord, ParticleListError> {
        match self {
            Self::Resident(record) => Ok(record),
            Self::Archived(archived) => Err(ParticleListError::Archived(archived.track_id)),
        }
    }
}

// ============================================================================
// PARTICLE TABLE
// ============================================================================

/// Authoritative map from track id to particle for one event.
#[derive(Debug, Default)]
pub struct ParticleTable {
    entries: BTreeMap<TrackId, TableEntry>,
}

impl ParticleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record. Track ids are unique per event, so a repeat is an error.
    pub fn add(&mut self, record: ParticleRecord) -> Result<(), ParticleListError> {
        let track_id = record.track_id();
        if self.entries.contains_key(&track_id) {
            return Err(ParticleListError::DuplicateTrack(track_id));
        }
        self.entries.insert(track_id, TableEntry::Resident(record));
        Ok(())
    }

    /// Resident record for `track_id`, if any.
    pub fn find(&self, track_id: TrackId) -> Option<&ParticleRecord> {
        match self.entries.get(&track_id) {
            Some(TableEntry::Resident(record)) => Some(record),
            _ => None,
        }
    }

    pub fn find_mut(&mut self, track_id: TrackId) -> Option<&mut ParticleRecord> {
        match self.entries.get_mut(&track_id) {
            Some(TableEntry::Resident(record)) => Some(record),
            _ => None,
        }
    }

    /// Entry for `track_id`, resident or archived.
    pub fn entry(&self, track_id: TrackId) -> Option<&TableEntry> {
        self.entries.get(&track_id)
    }

    /// Full record, failing for unknown and archived particles.
    pub fn record(&self, track_id: TrackId) -> Result<&ParticleRecord, ParticleListError> {
        self.entries
            .get(&track_id)
            .ok_or(ParticleListError::ParticleNotFound(track_id))?
            .record()
    }

    pub fn record_mut(&mut self, track_id: TrackId) -> Result<&mut ParticleRecord, ParticleListError> {
        self.entries
            .get_mut(&track_id)
            .ok_or(ParticleListError::ParticleNotFound(track_id))?
            .record_mut()
    }

    /// True for any particle in the table, archived ones included.
    pub fn is_known(&self, track_id: TrackId) -> bool {
        self.entries.contains_key(&track_id)
    }

    /// Parent id straight from the table, archived entries included.
    pub fn mother_of(&self, track_id: TrackId) -> Option<TrackId> {
        self.entries.get(&track_id).map(TableEntry::parent_id)
    }

    /// Drop a particle's payload, keeping id, parent and daughters.
    ///
    /// Archiving an already archived particle changes nothing.
    pub fn archive(&mut self, track_id: TrackId) -> Result<(), ParticleListError> {
        let entry = self
            .entries
            .remove(&track_id)
            .ok_or(ParticleListError::ParticleNotFound(track_id))?;

        let archived = match entry {
            TableEntry::Resident(record) => ArchivedParticle::from(record),
            TableEntry::Archived(archived) => archived,
        };
        self.entries.insert(track_id, TableEntry::Archived(archived));
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Highest id in the table (archived entries count too).
    pub fn highest_id(&self) -> Option<TrackId> {
        self.entries.keys().next_back().copied()
    }

    /// Number of entries, archived ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resident_count(&self) -> usize {
        self.entries.values().filter(|e| !e.is_archived()).count()
    }

    pub fn archived_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_archived()).count()
    }

    /// Entries in ascending track-id order.
    pub fn iter(&self) -> impl Iterator<Item = &TableEntry> {
        self.entries.values()
    }

    /// Rebuild every resident record's daughter list from parent ids.
    ///
    /// Each resident particle with a positive parent id is appended to its
    /// parent's list when that parent is resident. Returns the number of
    /// orphans (parent not in the table).
    pub fn rebuild_daughters(&mut self) -> usize {
        for entry in self.entries.values_mut() {
            if let TableEntry::Resident(record) = entry {
                record.clear_daughters();
            }
        }

        let links: Vec<(TrackId, TrackId)> = self
            .entries
            .values()
            .filter(|entry| !entry.is_archived())
            .map(|entry| (entry.track_id(), entry.parent_id()))
            .filter(|(_, parent_id)| !parent_id.is_primary_parent())
            .collect();

        let mut orphans = 0;
        for (track_id, parent_id) in links {
            match self.entries.get_mut(&parent_id) {
                Some(TableEntry::Resident(parent)) => parent.add_daughter(track_id),
                Some(TableEntry::Archived(_)) => {}
                None => {
                    debug!("particle {} is an orphan: parent {} not in table", track_id, parent_id);
                    orphans += 1;
                }
            }
        }
        orphans
    }

    /// Move the whole table out, leaving it empty.
    pub fn take_all(&mut self) -> ParticleList {
        ParticleList {
            entries: std::mem::take(&mut self.entries),
        }
    }
}

// ============================================================================
// PARTICLE LIST (hand-off product)
// ============================================================================

/// A finalized event's particles, moved out of the table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticleList {
    entries: BTreeMap<TrackId, TableEntry>,
}

impl ParticleList {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, track_id: TrackId) -> Option<&TableEntry> {
        self.entries.get(&track_id)
    }

    /// Resident records in ascending track-id order.
    pub fn records(&self) -> impl Iterator<Item = &ParticleRecord> {
        self.entries.values().filter_map(|entry| entry.record().ok())
    }

    /// Archived particles in ascending track-id order.
    pub fn archived(&self) -> impl Iterator<Item = &ArchivedParticle> {
        self.entries.values().filter_map(|entry| match entry {
            TableEntry::Archived(archived) => Some(archived),
            TableEntry::Resident(_) => None,
        })
    }

    /// Consume the list, keeping the resident records by value.
    pub fn into_records(self) -> Vec<ParticleRecord> {
        self.entries
            .into_values()
            .filter_map(|entry| match entry {
                TableEntry::Resident(record) => Some(record),
                TableEntry::Archived(_) => None,
            })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
