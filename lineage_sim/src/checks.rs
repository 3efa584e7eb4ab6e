//! Invariant checks over finished events.
//!
//! Each check returns `Err(reason)` with a human-readable failure reason,
//! which the runner reports as the scenario's `failure_reason`.

use lineage_core::particle::PRIMARY_PROCESS;
use lineage_core::trajectory::START_LABEL;
use lineage_core::{EventSummary, KeepPolicy, ParticleList, ParticleListConfig, TableEntry, VolumeFilter};
use lineage_env::TrackId;

/// Kinetic-energy slack (GeV) when comparing against the energy cut.
const ENERGY_TOLERANCE: f64 = 1e-9;

pub type CheckResult = Result<(), String>;

/// Checks every event must pass regardless of configuration.
///
/// `offset_before` is the tracker offset at the start of the event.
pub fn check_event(list: &ParticleList, offset_before: i32, summary: &EventSummary) -> CheckResult {
    check_id_range(list, offset_before, summary)?;
    check_daughters(list)?;
    check_primaries(list)?;
    check_start_points(list)
}

/// All ids lie in `(offset_before, next_offset)`, and the next offset is
/// one past the highest id.
fn check_id_range(list: &ParticleList, offset_before: i32, summary: &EventSummary) -> CheckResult {
    let next = summary.next_track_id_offset;
    let ids: Vec<TrackId> = list.records().map(|r| r.track_id()).chain(list.archived().map(|a| a.track_id)).collect();

    match ids.iter().max() {
        Some(highest) if next != highest.get() + 1 => {
            return Err(format!("next offset {} is not one past highest id {}", next, highest));
        }
        None if next != offset_before => {
            return Err(format!("empty event moved offset {} -> {}", offset_before, next));
        }
        _ => {}
    }

    match ids.iter().find(|id| id.get() <= offset_before) {
        Some(id) => Err(format!("track id {} not above pre-event offset {}", id, offset_before)),
        None => Ok(()),
    }
}

/// Daughter lists and parent ids agree for resident particles.
fn check_daughters(list: &ParticleList) -> CheckResult {
    for record in list.records() {
        for &daughter in record.daughters() {
            match list.get(daughter) {
                Some(TableEntry::Resident(child)) if child.parent_id() == record.track_id() => {}
                Some(TableEntry::Resident(child)) => {
                    return Err(format!(
                        "particle {} lists daughter {} whose parent is {}",
                        record.track_id(),
                        daughter,
                        child.parent_id()
                    ));
                }
                _ => {
                    return Err(format!(
                        "particle {} lists daughter {} which is not resident",
                        record.track_id(),
                        daughter
                    ));
                }
            }
        }

        if let Some(TableEntry::Resident(parent)) = list.get(record.parent_id()) {
            if !parent.daughters().contains(&record.track_id()) {
                return Err(format!(
                    "particle {} missing from daughters of {}",
                    record.track_id(),
                    parent.track_id()
                ));
            }
        }
    }
    Ok(())
}

/// Primaries carry a primary parent id and the primary label.
fn check_primaries(list: &ParticleList) -> CheckResult {
    for record in list.records() {
        if record.parent_id().is_primary_parent() && record.process() != PRIMARY_PROCESS {
            return Err(format!(
                "particle {} has parent {} but process '{}'",
                record.track_id(),
                record.parent_id(),
                record.process()
            ));
        }
    }
    Ok(())
}

/// The first trajectory point of every resident particle is its start point.
fn check_start_points(list: &ParticleList) -> CheckResult {
    for record in list.records() {
        if let Some(first) = record.trajectory().first() {
            if first.process != START_LABEL {
                return Err(format!(
                    "particle {} starts with '{}' instead of '{}'",
                    record.track_id(),
                    first.process,
                    START_LABEL
                ));
            }
        }
    }
    Ok(())
}

/// No non-primary particle was materialized below the cut (GeV).
pub fn check_energy_cut(list: &ParticleList, energy_cut: f64) -> CheckResult {
    for record in list.records().filter(|r| !r.is_primary()) {
        if let Some(kinetic_energy) = record.kinetic_energy(0) {
            if kinetic_energy + ENERGY_TOLERANCE < energy_cut {
                return Err(format!(
                    "particle {} kept with {:.6} GeV below cut {} GeV",
                    record.track_id(),
                    kinetic_energy,
                    energy_cut
                ));
            }
        }
    }
    Ok(())
}

/// No particle created by an EM-shower process was materialized.
pub fn check_no_em_shower_daughters(list: &ParticleList, config: &ParticleListConfig) -> CheckResult {
    match list
        .records()
        .find(|r| !r.is_primary() && config.is_em_shower_process(r.process()))
    {
        Some(record) => Err(format!(
            "shower daughter {} ('{}') was kept",
            record.track_id(),
            record.process()
        )),
        None => Ok(()),
    }
}

/// Every resident particle touched one of the filter's volumes.
pub fn check_volume_containment(list: &ParticleList, filter: &VolumeFilter) -> CheckResult {
    for record in list.records() {
        let touched = record.trajectory().iter().any(|p| filter.must_keep(&p.position));
        if !touched {
            return Err(format!("particle {} kept without entering a volume", record.track_id()));
        }
    }
    Ok(())
}

/// Ids of a later pass lie strictly above every id of the earlier one.
pub fn check_pass_ordering(previous_highest: Option<TrackId>, list: &ParticleList) -> CheckResult {
    let Some(previous) = previous_highest else {
        return Ok(());
    };
    let lowest = list
        .records()
        .map(|r| r.track_id())
        .chain(list.archived().map(|a| a.track_id))
        .min();
    match lowest {
        Some(lowest) if lowest <= previous => Err(format!(
            "pass reuses id {} at or below previous highest {}",
            lowest, previous
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_core::{BoundingBox, ParticleRecord, ParticleTable};
    use nalgebra::{Vector3, Vector4};

    fn record(id: i32, parent: i32, process: &str) -> ParticleRecord {
        let mut record = ParticleRecord::new(TrackId(id), 11, process, TrackId(parent), 0.000511);
        record.add_trajectory_point(Vector4::new(0.0, 0.0, 1.0, 0.0), Vector4::new(0.0, 0.0, 0.1, 0.1), START_LABEL);
        record
    }

    fn finished(records: Vec<ParticleRecord>) -> (ParticleList, EventSummary) {
        let mut table = ParticleTable::new();
        for r in records {
            table.add(r).unwrap();
        }
        let orphans = table.rebuild_daughters();
        let summary = EventSummary {
            resident: table.resident_count(),
            orphans,
            next_track_id_offset: table.highest_id().map_or(0, |id| id.get() + 1),
            ..Default::default()
        };
        (table.take_all(), summary)
    }

    #[test]
    fn test_consistent_event_passes() {
        let (list, summary) = finished(vec![record(1, 0, "primary"), record(2, 1, "eIoni"), record(3, 2, "eBrem")]);
        assert_eq!(check_event(&list, 0, &summary), Ok(()));
    }

    #[test]
    fn test_wrong_offset_detected() {
        let (list, mut summary) = finished(vec![record(1, 0, "primary")]);
        summary.next_track_id_offset = 5;
        assert!(check_event(&list, 0, &summary).is_err());
    }

    #[test]
    fn test_id_below_offset_detected() {
        let (list, summary) = finished(vec![record(3, 0, "primary")]);
        assert!(check_event(&list, 3, &summary).is_err());
    }

    #[test]
    fn test_primary_label_checked() {
        let (list, summary) = finished(vec![record(1, 0, "eIoni")]);
        assert!(check_event(&list, 0, &summary).unwrap_err().contains("process"));
    }

    #[test]
    fn test_energy_cut_check() {
        // Kinetic energy at the start point is 0.1 - 0.000511 GeV
        let (list, _) = finished(vec![record(1, 0, "primary"), record(2, 1, "eIoni")]);
        assert!(check_energy_cut(&list, 0.05).is_ok());
        assert!(check_energy_cut(&list, 0.2).is_err());
    }

    #[test]
    fn test_em_shower_check() {
        let config = ParticleListConfig::default();
        let (list, _) = finished(vec![record(1, 0, "primary"), record(2, 1, "hadElastic")]);
        assert!(check_no_em_shower_daughters(&list, &config).is_ok());

        let (list, _) = finished(vec![record(1, 0, "primary"), record(2, 1, "compt")]);
        assert!(check_no_em_shower_daughters(&list, &config).is_err());
    }

    #[test]
    fn test_volume_check() {
        let (list, _) = finished(vec![record(1, 0, "primary")]);
        let inside = VolumeFilter::new(vec![BoundingBox::new(Vector3::zeros(), Vector3::new(5.0, 5.0, 5.0))]);
        let elsewhere = VolumeFilter::new(vec![BoundingBox::new(Vector3::new(10.0, 10.0, 10.0), Vector3::new(20.0, 20.0, 20.0))]);
        assert!(check_volume_containment(&list, &inside).is_ok());
        assert!(check_volume_containment(&list, &elsewhere).is_err());
    }

    #[test]
    fn test_pass_ordering() {
        let (list, _) = finished(vec![record(5, 0, "primary"), record(6, 5, "eIoni")]);
        assert!(check_pass_ordering(None, &list).is_ok());
        assert!(check_pass_ordering(Some(TrackId(4)), &list).is_ok());
        assert!(check_pass_ordering(Some(TrackId(5)), &list).is_err());
    }
}
