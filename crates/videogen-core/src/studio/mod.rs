//! Local video studio.
//!
//! Holds the dashboard's post queue and the set of connected platforms.
//! Generation is simulated: a submitted post flips from `generating` to
//! `generated` after a fixed delay. Nothing here talks to the network.

pub mod error;
pub mod queue;

pub use error::StudioError;
pub use queue::{Studio, StudioEvent};
