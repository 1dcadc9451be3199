//! Round robin groups: tallies, finishing order and downstream positioning.

mod connected;
mod playoff;
mod tally;

pub use connected::connected_structure_ids;
pub(crate) use playoff::automated_playoff_positioning;
pub use playoff::PlayoffPlacement;
pub use tally::{GroupTally, ParticipantResult, tally_group, write_tally};
