//! Scenario runner - drives the toy engine through a LineageTracker and
//! checks every finished event.

use crate::checks;
use crate::engine::{ToyTransport, TransportConfig};
use crate::error::SimError;
use crate::exporter::{EventExport, SimExport};
use crate::scenarios::{self, ScenarioId};

use lineage_core::{FinishedEvent, LineageTracker, ParticleListConfig};
use lineage_env::TrackId;
use tracing::{debug, error, info};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether every event passed its checks
    pub passed: bool,

    /// Events simulated
    pub events: usize,

    /// Resident particles over all events
    pub total_particles: usize,

    /// Archived particles over all events
    pub total_archived: usize,

    /// Collapsed tracks over all events
    pub total_collapsed: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,
}

impl ScenarioResult {
    /// One-line report: info when the run passed, error otherwise.
    pub fn log(&self) {
        if self.passed {
            info!(
                "{} seed={} ok: {} events, {} kept, {} archived, {} collapsed",
                self.scenario.name(),
                self.seed,
                self.events,
                self.total_particles,
                self.total_archived,
                self.total_collapsed
            );
        } else {
            error!("{} seed={} failed: {}", self.scenario.name(), self.seed, self.failure_message());
        }
    }

    pub fn failure_message(&self) -> &str {
        self.failure_reason.as_deref().unwrap_or("unknown")
    }

    /// Machine-readable form used by the CLI's `--json` report.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "scenario": self.scenario.name(),
            "seed": self.seed,
            "passed": self.passed,
            "events": self.events,
            "particles": self.total_particles,
            "archived": self.total_archived,
            "collapsed": self.total_collapsed,
            "failure_reason": self.failure_reason,
        })
    }
}

#[derive(Debug, Default)]
struct RunTotals {
    events: usize,
    particles: usize,
    archived: usize,
    collapsed: usize,
}

/// Runs lineage scenarios.
pub struct ScenarioRunner {
    /// Engine and tracker seed
    seed: u64,

    /// Events per scenario
    events: usize,

    /// Tracker configuration each scenario starts from
    base_config: ParticleListConfig,

    transport: TransportConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64, events: usize) -> Self {
        Self {
            seed,
            events,
            base_config: ParticleListConfig::default(),
            transport: TransportConfig::default(),
        }
    }

    /// Sets the tracker configuration scenarios derive from.
    pub fn with_config(mut self, config: ParticleListConfig) -> Self {
        self.base_config = config;
        self
    }

    /// Sets the toy engine parameters.
    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        let outcome = self.execute(scenario, None);
        self.result(scenario, outcome)
    }

    /// Runs a scenario, recording every event into `export`.
    pub fn run_with_export(&self, scenario: ScenarioId, export: &mut SimExport) -> ScenarioResult {
        info!("Starting scenario: {} (seed={}) with export", scenario.name(), self.seed);
        let outcome = self.execute(scenario, Some(&mut *export));
        let result = self.result(scenario, outcome);
        export.finalize(result.passed, result.failure_reason.clone());
        result
    }

    fn result(&self, scenario: ScenarioId, outcome: Result<RunTotals, SimError>) -> ScenarioResult {
        let (totals, failure_reason) = match outcome {
            Ok(totals) => (totals, None),
            Err(e) => (RunTotals::default(), Some(e.to_string())),
        };
        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: failure_reason.is_none(),
            events: totals.events,
            total_particles: totals.particles,
            total_archived: totals.archived,
            total_collapsed: totals.collapsed,
            failure_reason,
        }
    }

    fn execute(&self, scenario: ScenarioId, mut export: Option<&mut SimExport>) -> Result<RunTotals, SimError> {
        let config = scenario.tracker_config(&self.base_config);
        config.validate()?;

        let mut tracker = LineageTracker::new(config.clone());
        if let Some(policy) = scenario.keep_policy() {
            tracker = tracker.with_keep_policy(policy);
        }
        let mut engine = ToyTransport::new(self.seed, self.transport.clone())?;
        let batches = scenarios::standard_batches();

        let mut totals = RunTotals::default();
        let mut previous_highest: Option<TrackId> = None;

        for event_index in 0..scenario.event_count(self.events) {
            let offset_before = tracker.track_id_offset();
            let outcome = engine.simulate_event(&batches, &mut tracker)?;
            let FinishedEvent { summary, particles } = outcome.output;

            debug!(
                "event {}: {} tracks, {} steps, offset {} -> {}",
                event_index, outcome.tracks_transported, outcome.steps, offset_before, summary.next_track_id_offset
            );

            checks::check_event(&particles, offset_before, &summary).map_err(SimError::Invariant)?;
            if summary.unresolved_parents > 0 {
                return Err(SimError::Invariant(format!(
                    "event {}: {} secondaries without a resolvable parent",
                    event_index, summary.unresolved_parents
                )));
            }

            let scenario_check = match scenario {
                ScenarioId::EnergyCut => checks::check_energy_cut(&particles, config.energy_cut),
                ScenarioId::ShowerCollapse => checks::check_no_em_shower_daughters(&particles, &config),
                ScenarioId::VolumeFilter => checks::check_volume_containment(&particles, &scenarios::detector_volume()),
                ScenarioId::MultiPass => checks::check_pass_ordering(previous_highest, &particles),
                ScenarioId::Baseline => Ok(()),
            };
            scenario_check.map_err(SimError::Invariant)?;

            if !particles.is_empty() {
                previous_highest = Some(TrackId(summary.next_track_id_offset - 1));
            }

            totals.events += 1;
            totals.particles += summary.resident;
            totals.archived += summary.archived;
            totals.collapsed += summary.collapsed;

            if let Some(export) = export.as_deref_mut() {
                export.add_event(EventExport::build(
                    event_index,
                    offset_before,
                    summary,
                    particles,
                    &outcome.primaries,
                ));
            }
        }

        if scenario == ScenarioId::MultiPass {
            self.check_run_reset(&mut tracker, &mut engine, &batches)?;
        }

        info!(
            "{}: {} events, {} particles kept, {} archived, {} tracks collapsed",
            scenario.name(),
            totals.events,
            totals.particles,
            totals.archived,
            totals.collapsed
        );
        Ok(totals)
    }

    /// After a run reset, the first primary gets id 1 again.
    fn check_run_reset(
        &self,
        tracker: &mut LineageTracker,
        engine: &mut ToyTransport,
        batches: &[crate::engine::TruthBatch],
    ) -> Result<(), SimError> {
        tracker.reset_run();
        let outcome = engine.simulate_event(batches, tracker)?;
        let FinishedEvent { summary, particles } = outcome.output;

        checks::check_event(&particles, 0, &summary).map_err(SimError::Invariant)?;
        if particles.get(TrackId(1)).is_none() {
            return Err(SimError::Invariant("first primary is not track 1 after run reset".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_all_scenarios_pass() {
        let runner = ScenarioRunner::new(42, 2);
        for scenario in ScenarioId::all() {
            let result = runner.run(scenario);
            assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
            assert!(result.total_particles > 0);
        }
    }

    #[test]
    fn test_pruning_scenarios_collapse_tracks() {
        let runner = ScenarioRunner::new(7, 2);
        let baseline = runner.run(ScenarioId::Baseline);
        let shower = runner.run(ScenarioId::ShowerCollapse);

        assert_eq!(baseline.total_collapsed, 0);
        assert!(shower.total_collapsed > 0);
        assert!(shower.total_particles < baseline.total_particles);
    }

    #[test]
    fn test_multi_pass_runs_at_least_three_events() {
        let result = ScenarioRunner::new(3, 1).run(ScenarioId::MultiPass);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.events, 3);
    }

    #[test]
    fn test_invalid_config_fails_run() {
        let config = ParticleListConfig {
            energy_cut: -1.0,
            ..Default::default()
        };
        let result = ScenarioRunner::new(1, 1).with_config(config).run(ScenarioId::Baseline);
        assert!(!result.passed);
        assert!(result.failure_reason.is_some());
    }

    #[test]
    fn test_export_collects_events() {
        let runner = ScenarioRunner::new(11, 2);
        let mut export = SimExport::new(ScenarioId::Baseline.name(), 11);
        let result = runner.run_with_export(ScenarioId::Baseline, &mut export);

        assert!(result.passed);
        assert!(export.passed);
        assert_eq!(export.events.len(), 2);
        assert_eq!(export.events[1].track_id_offset, export.events[0].summary.next_track_id_offset);
        // Every primary and its descendants trace back to a truth batch
        for event in &export.events {
            assert_eq!(event.associations.len(), event.particles.len());
        }
    }

    #[test]
    fn test_result_json_reports_failure() {
        let config = ParticleListConfig {
            energy_cut: -1.0,
            ..Default::default()
        };
        let result = ScenarioRunner::new(5, 1).with_config(config).run(ScenarioId::EnergyCut);
        result.log();

        let json = result.to_json();
        assert_eq!(json["scenario"], "energy_cut");
        assert_eq!(json["seed"], 5);
        assert_eq!(json["passed"], false);
        assert_eq!(json["events"], 0);
        assert!(json["failure_reason"].is_string());
        assert_ne!(result.failure_message(), "unknown");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_invariants_hold_for_any_seed(seed in any::<u64>()) {
            let runner = ScenarioRunner::new(seed, 1);
            for scenario in ScenarioId::all() {
                let result = runner.run(scenario);
                prop_assert!(result.passed, "{} seed={}: {:?}", scenario, seed, result.failure_reason);
            }
        }
    }
}
