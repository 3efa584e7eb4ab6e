//! The callback capability a transport engine drives.

use crate::types::{StepInfo, TrackEnd, TrackInfo};

/// Callbacks invoked by the transport engine during one event.
///
/// This single trait replaces separate event/tracking/stepping hook types.
/// All calls are synchronous and strictly sequential; an implementation
/// never sees two tracks in flight at once.
///
/// # Implementations
///
/// - `lineage_core::LineageTracker` - builds the particle genealogy
/// - test recorders in `lineage_sim` - capture the raw call stream
pub trait TransportHooks {
    /// Per-event product handed back from `end_of_event`.
    type Output;

    /// Fatal error a hook may raise from `pre_tracking`.
    type Error: std::error::Error;

    /// A new event starts; per-event state must be cleared.
    fn begin_of_event(&mut self);

    /// A track is about to be transported.
    fn pre_tracking(&mut self, track: &TrackInfo) -> Result<(), Self::Error>;

    /// The current track took one step.
    fn stepping(&mut self, step: &StepInfo);

    /// The current track stopped. `None` when the engine has no track
    /// object to report (aborted tracks).
    fn post_tracking(&mut self, end: Option<&TrackEnd>);

    /// The event is complete; finalize and hand over the product.
    fn end_of_event(&mut self) -> Self::Output;
}
