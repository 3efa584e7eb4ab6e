//! JSON exporter for finished events.
//!
//! Flattens each event's particle list into an output collection and pairs
//! every exported particle with the truth batch its primary came from.

use lineage_core::{EventSummary, ParticleList, ParticleRecord};
use lineage_env::{PrimaryTag, TrackId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use tracing::debug;

/// Links one exported particle to its generator record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruthAssociation {
    /// Index of the truth batch
    pub truth_index: usize,

    /// Position of the particle in `EventExport::particles`
    pub particle_index: usize,

    pub track_id: TrackId,
}

/// Find the truth tag of the primary `track_id` descends from.
///
/// `primaries` is keyed by engine ids; the list holds ids shifted by
/// `track_id_offset`. The walk is bounded by the list size, so a broken
/// chain yields `None` instead of looping.
pub fn primary_tag_of(
    list: &ParticleList,
    primaries: &BTreeMap<TrackId, PrimaryTag>,
    track_id_offset: i32,
    track_id: TrackId,
) -> Option<PrimaryTag> {
    let mut current = track_id;
    for _ in 0..=list.len() {
        let entry = list.get(current)?;
        if entry.parent_id().is_primary_parent() {
            return primaries.get(&TrackId(current.get() - track_id_offset)).copied();
        }
        current = entry.parent_id();
    }
    None
}

/// Pair every resident particle of `list` with its truth batch.
///
/// `particle_index` follows the iteration order of `list.records()`.
pub fn associate_truth(
    list: &ParticleList,
    primaries: &BTreeMap<TrackId, PrimaryTag>,
    track_id_offset: i32,
) -> Vec<TruthAssociation> {
    list.records()
        .enumerate()
        .filter_map(|(particle_index, record)| {
            let tag = primary_tag_of(list, primaries, track_id_offset, record.track_id());
            if tag.is_none() {
                debug!("no primary ancestor for particle {}", record.track_id());
            }
            tag.map(|tag| TruthAssociation {
                truth_index: tag.truth_index,
                particle_index,
                track_id: record.track_id(),
            })
        })
        .collect()
}

/// One exported event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventExport {
    pub event_index: usize,

    /// Offset that was added to the engine ids of this event
    pub track_id_offset: i32,

    pub summary: EventSummary,

    /// Resident particles in ascending track-id order
    pub particles: Vec<ParticleRecord>,

    /// Archived particles, ids only
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub archived: Vec<TrackId>,

    pub associations: Vec<TruthAssociation>,
}

impl EventExport {
    /// Builds the export of one event, consuming its particle list.
    pub fn build(
        event_index: usize,
        track_id_offset: i32,
        summary: EventSummary,
        list: ParticleList,
        primaries: &BTreeMap<TrackId, PrimaryTag>,
    ) -> Self {
        let associations = associate_truth(&list, primaries, track_id_offset);
        let archived = list.archived().map(|a| a.track_id).collect();
        Self {
            event_index,
            track_id_offset,
            summary,
            particles: list.into_records(),
            archived,
            associations,
        }
    }
}

/// Complete run export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    pub events: Vec<EventExport>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            events: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    pub fn add_event(&mut self, event: EventExport) {
        self.events.push(event);
    }

    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    pub fn total_particles(&self) -> usize {
        self.events.iter().map(|e| e.particles.len()).sum()
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_core::ParticleTable;

    fn tag(truth_index: usize, particle_index: usize) -> PrimaryTag {
        PrimaryTag {
            truth_index,
            particle_index,
        }
    }

    /// Two primaries from different batches with offset 10:
    /// 11 <- 13 <- 14 and 12 <- 15, plus 16 whose parent is missing.
    fn event() -> (ParticleList, BTreeMap<TrackId, PrimaryTag>) {
        let mut table = ParticleTable::new();
        for (id, parent) in [(11, 0), (12, 0), (13, 11), (14, 13), (15, 12), (16, 99)] {
            table
                .add(ParticleRecord::new(TrackId(id), 13, "muIoni", TrackId(parent), 0.1))
                .unwrap();
        }
        table.archive(TrackId(13)).unwrap();

        let mut primaries = BTreeMap::new();
        primaries.insert(TrackId(1), tag(0, 0));
        primaries.insert(TrackId(2), tag(1, 0));
        (table.take_all(), primaries)
    }

    #[test]
    fn test_walks_through_archived_particles() {
        let (list, primaries) = event();
        assert_eq!(primary_tag_of(&list, &primaries, 10, TrackId(14)), Some(tag(0, 0)));
        assert_eq!(primary_tag_of(&list, &primaries, 10, TrackId(15)), Some(tag(1, 0)));
        assert_eq!(primary_tag_of(&list, &primaries, 10, TrackId(16)), None);
    }

    #[test]
    fn test_associations_index_exported_particles() {
        let (list, primaries) = event();
        let export = EventExport::build(0, 10, EventSummary::default(), list, &primaries);

        // 13 is archived, 16 has no ancestor
        assert_eq!(export.particles.len(), 5);
        assert_eq!(export.archived, vec![TrackId(13)]);
        assert_eq!(export.associations.len(), 4);
        for assoc in &export.associations {
            assert_eq!(export.particles[assoc.particle_index].track_id(), assoc.track_id);
        }
        let truth_of_15 = export
            .associations
            .iter()
            .find(|a| a.track_id == TrackId(15))
            .map(|a| a.truth_index);
        assert_eq!(truth_of_15, Some(1));
    }

    #[test]
    fn test_parent_cycle_terminates() {
        let mut table = ParticleTable::new();
        table.add(ParticleRecord::new(TrackId(3), 11, "eIoni", TrackId(4), 0.0)).unwrap();
        table.add(ParticleRecord::new(TrackId(4), 11, "eIoni", TrackId(3), 0.0)).unwrap();
        let list = table.take_all();
        assert_eq!(primary_tag_of(&list, &BTreeMap::new(), 0, TrackId(3)), None);
    }

    #[test]
    fn test_export_serializes() {
        let (list, primaries) = event();
        let mut export = SimExport::new("baseline", 42);
        export.add_event(EventExport::build(0, 10, EventSummary::default(), list, &primaries));
        export.finalize(true, None);

        let json = serde_json::to_string(&export).unwrap();
        assert!(json.contains("\"scenario\":\"baseline\""));
        assert!(!json.contains("failure_reason"));
        assert_eq!(export.total_particles(), 5);
    }
}
