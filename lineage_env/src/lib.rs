//! Lineage Environment Abstraction Layer
//!
//! This crate describes the transport engine as seen by the bookkeeping
//! layer: the data handed over on every callback and the callback
//! capability itself. Nothing here steps particles; the engine (real or
//! the toy one in `lineage_sim`) owns transport and simply calls the hooks.
//!
//! # Callback Order
//!
//! For one event the engine delivers, strictly sequentially:
//!
//! ```text
//! begin_of_event
//!   pre_tracking(track 1) -> stepping x N -> post_tracking
//!   pre_tracking(track 7) -> stepping x M -> post_tracking
//!   ...
//! end_of_event
//! ```
//!
//! Tracks are never interleaved, but a child may be delivered long after
//! its parent ended and siblings arrive in the engine's stack order.
//!
//! # Example
//!
//! ```ignore
//! use lineage_env::{TransportHooks, TrackInfo};
//!
//! fn replay<H: TransportHooks>(hooks: &mut H, tracks: &[TrackInfo]) -> Result<H::Output, H::Error> {
//!     hooks.begin_of_event();
//!     for track in tracks {
//!         hooks.pre_tracking(track)?;
//!         hooks.post_tracking(None);
//!     }
//!     Ok(hooks.end_of_event())
//! }
//! ```

mod error;
mod hooks;
mod types;
pub mod units;

pub use error::EnvError;
pub use hooks::TransportHooks;
pub use types::{PrimaryTag, StepInfo, StepPoint, TrackEnd, TrackId, TrackInfo};
