use super::propagator::{Propagator, directed};
use crate::matchups::tie_rollup;
use crate::model::{DrawResult, MatchUpStatus};

/// Recompute a TEAM tie from its children and re-direct it when its winner changed
pub(crate) fn recompute_tie(
    propagator: &mut Propagator<'_>,
    structure_id: &str,
    parent_id: &str,
) -> DrawResult<()> {
    let parent = propagator.draw.structure_match_up(structure_id, parent_id)?;
    let before = directed(propagator.draw, structure_id, parent)?;
    let rollup = tie_rollup(parent, propagator.draw.tie_format.as_ref());

    let parent = propagator
        .draw
        .structure_match_up_mut(structure_id, parent_id)?;
    parent.score = rollup.score;
    parent.winning_side = rollup.winning_side;
    parent.produced_exit = false;
    parent.match_up_status = if rollup.winning_side.is_some() {
        MatchUpStatus::Completed
    } else {
        MatchUpStatus::ToBePlayed
    };
    let parent = parent.clone();
    log::debug!(
        "tie {} rolled up to {}-{} (goal {})",
        parent_id,
        rollup.values[0],
        rollup.values[1],
        rollup.value_goal
    );
    propagator.note_match_up(structure_id, &parent);
    propagator.redirect(structure_id, parent_id, before)
}
