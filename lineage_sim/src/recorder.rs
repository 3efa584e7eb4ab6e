//! A hooks implementation that only records what the engine called.

use lineage_env::{EnvError, StepInfo, TrackEnd, TrackInfo, TransportHooks};

/// One captured callback.
#[derive(Debug, Clone)]
pub enum HookCall {
    BeginOfEvent,
    PreTracking(TrackInfo),
    Stepping(StepInfo),
    PostTracking(Option<TrackEnd>),
    EndOfEvent,
}

/// Records the raw call stream of an event, for inspecting engine behavior
/// independently of any bookkeeping.
#[derive(Debug, Default)]
pub struct CallRecorder {
    calls: Vec<HookCall>,
}

impl CallRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[HookCall] {
        &self.calls
    }
}

impl TransportHooks for CallRecorder {
    type Output = Vec<HookCall>;
    type Error = EnvError;

    fn begin_of_event(&mut self) {
        self.calls.clear();
        self.calls.push(HookCall::BeginOfEvent);
    }

    fn pre_tracking(&mut self, track: &TrackInfo) -> Result<(), EnvError> {
        self.calls.push(HookCall::PreTracking(track.clone()));
        Ok(())
    }

    fn stepping(&mut self, step: &StepInfo) {
        self.calls.push(HookCall::Stepping(step.clone()));
    }

    fn post_tracking(&mut self, end: Option<&TrackEnd>) {
        self.calls.push(HookCall::PostTracking(end.cloned()));
    }

    fn end_of_event(&mut self) -> Vec<HookCall> {
        self.calls.push(HookCall::EndOfEvent);
        std::mem::take(&mut self.calls)
    }
}
