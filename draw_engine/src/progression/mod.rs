//! Outcome progression: the status state machine, worklist propagation,
//! TEAM tie roll-up and qualifier placement.

mod propagator;
mod qualifiers;
mod ties;
mod transitions;

pub use propagator::PropagationReport;
pub(crate) use propagator::Propagator;
pub(crate) use qualifiers::{apply_qualifier_policy, qualifier_progression, winner_participant};
pub use qualifiers::QualifierActions;
pub(crate) use transitions::set_status;
pub use transitions::StatusRequest;
