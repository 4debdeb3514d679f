//! Hawkes-based temporal attention over event-stream hidden states.
//!
//! Two cooperating pieces:
//!
//! - [`DecayTable`]: precomputed lookup from integer day-gap to decay weight.
//! - [`HawkesAttention`]: for a query index `t`, derives a weight for every
//!   prior index from a self-exciting point-process intensity model (mutual
//!   excitation between event types, decayed by elapsed time) and blends the
//!   hidden-state history into one mixed state.
//!
//! [`MutualIntensity`] supplies the fixed excitation coupling between event
//! types; it is estimated offline and passed in per step.

mod decay;
mod engine;
mod intensity;

#[cfg(test)]
mod tests;

pub use decay::DecayTable;
pub use engine::HawkesAttention;
pub use intensity::MutualIntensity;
