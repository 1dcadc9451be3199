//! MatchUp derivation.
//!
//! Sides, participants, readiness and targets are computed from the stored
//! records, the position assignments and the link graph on every read.

mod side;
mod tie;
mod view;

pub use side::{SideState, side_state, side_states};
pub use tie::{TieRollup, tie_rollup};
pub use view::{
    MatchUpSide, MatchUpView, ReadinessState, all_draw_match_ups, all_structure_match_ups,
    match_up_view,
};
