//! Lineage resolution through the raw parent map.
//!
//! Tracks that never become particle records (collapsed showers, tracks
//! below the energy cut) still record `track -> parent` here, so that their
//! own secondaries can be attributed to the ancestor at the top of the
//! chain. Callers check that ancestor against the particle table.

use crate::error::ParticleListError;
use lineage_env::TrackId;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Per-event side table of engine-reported parent ids.
#[derive(Debug, Default, Clone)]
pub struct ParentIdMap {
    parents: HashMap<TrackId, TrackId>,
}

impl ParentIdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the parent of a track.
    pub fn insert(&mut self, track_id: TrackId, parent_id: TrackId) {
        self.parents.insert(track_id, parent_id);
    }

    pub fn get(&self, track_id: TrackId) -> Option<TrackId> {
        self.parents.get(&track_id).copied()
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn clear(&mut self) {
        self.parents.clear();
    }

    /// Walk the map upward from `track_id` as far as it goes.
    ///
    /// Returns the last parent id found, which is the most distant ancestor
    /// reachable through the map. `Ok(None)` means `track_id` itself has no
    /// entry. The result need not be a particle in the table.
    ///
    /// A walk that revisits an id fails with `ParentCycle` instead of
    /// looping.
    pub fn resolve_ancestor(&self, track_id: TrackId) -> Result<Option<TrackId>, ParticleListError> {
        let mut visited = HashSet::new();
        visited.insert(track_id);

        let mut ancestor = None;
        let mut current = track_id;
        while let Some(parent_id) = self.get(current) {
            debug!("parentage for {} -> {}", current, parent_id);
            if !visited.insert(parent_id) {
                return Err(ParticleListError::ParentCycle {
                    start: track_id,
                    revisited: parent_id,
                });
            }
            ancestor = Some(parent_id);
            current = parent_id;
        }

        debug!("final parent id for {}: {:?}", track_id, ancestor);
        Ok(ancestor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(edges: &[(i32, i32)]) -> ParentIdMap {
        let mut map = ParentIdMap::new();
        for &(track, parent) in edges {
            map.insert(TrackId(track), TrackId(parent));
        }
        map
    }

    #[test]
    fn test_no_entry_means_no_ancestor() {
        let map = map_of(&[(5, 4)]);
        assert_eq!(map.resolve_ancestor(TrackId(9)).unwrap(), None);
    }

    #[test]
    fn test_single_hop() {
        let map = map_of(&[(5, 4)]);
        assert_eq!(map.resolve_ancestor(TrackId(5)).unwrap(), Some(TrackId(4)));
    }

    #[test]
    fn test_walks_to_most_distant_ancestor() {
        // 7 -> 6 -> 5 -> 2 (2 has no entry)
        let map = map_of(&[(7, 6), (6, 5), (5, 2), (3, 1)]);
        assert_eq!(map.resolve_ancestor(TrackId(7)).unwrap(), Some(TrackId(2)));
    }

    #[test]
    fn test_self_reference_detected() {
        let map = map_of(&[(4, 4)]);
        assert_eq!(
            map.resolve_ancestor(TrackId(4)),
            Err(ParticleListError::ParentCycle {
                start: TrackId(4),
                revisited: TrackId(4),
            })
        );
    }

    #[test]
    fn test_cycle_detected() {
        let map = map_of(&[(10, 11), (11, 12), (12, 11)]);
        assert!(matches!(
            map.resolve_ancestor(TrackId(10)),
            Err(ParticleListError::ParentCycle { revisited: TrackId(11), .. })
        ));
    }

    #[test]
    fn test_walk_passes_over_intermediate_ids() {
        // 9 -> 8 -> 3 -> 1; the walk does not stop at 3 even if 3 was kept
        let map = map_of(&[(9, 8), (8, 3), (3, 1)]);
        assert_eq!(map.resolve_ancestor(TrackId(9)).unwrap(), Some(TrackId(1)));
        assert_eq!(map.resolve_ancestor(TrackId(3)).unwrap(), Some(TrackId(1)));
    }
}
