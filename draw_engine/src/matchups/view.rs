use serde::{Deserialize, Serialize};

use super::side::{SideState, side_states};
use crate::graph;
use crate::model::{
    DrawDefinition, DrawPosition, DrawResult, MatchUp, MatchUpId, MatchUpStatus, Score, Side,
    StructureId,
};

/// Where a matchUp stands
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadinessState {
    /// At least one side is not yet known
    Pending,
    /// Both sides hold participants and no result exists
    Upcoming,
    /// Decided, or resolved by a bye
    Completed,
}

/// One side of a derived matchUp
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MatchUpSide {
    pub side: Side,
    pub state: SideState,
}

/// Derived, read-only matchUp
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MatchUpView {
    pub match_up_id: MatchUpId,
    pub structure_id: StructureId,
    pub round_number: u32,
    pub round_position: u32,
    pub draw_positions: [Option<DrawPosition>; 2],
    pub sides: [MatchUpSide; 2],
    pub match_up_status: MatchUpStatus,
    pub winning_side: Option<Side>,
    pub score: Option<Score>,
    pub produced_exit: bool,
    pub active: bool,
    pub readiness: ReadinessState,
    pub winner_match_up_id: Option<MatchUpId>,
    pub loser_match_up_id: Option<MatchUpId>,
    pub collection_id: Option<String>,
    pub tie_match_ups: Vec<MatchUpView>,
}

impl MatchUpView {
    pub fn participant_id(&self, side: Side) -> Option<&str> {
        self.sides[side.index()].state.participant_id()
    }

    pub fn winner_participant_id(&self) -> Option<&str> {
        self.winning_side.and_then(|side| self.participant_id(side))
    }

    pub fn loser_participant_id(&self) -> Option<&str> {
        self.winning_side
            .and_then(|side| self.participant_id(side.opposite()))
    }

    pub fn has_bye(&self) -> bool {
        self.sides.iter().any(|side| side.state.is_bye())
    }
}

fn readiness(match_up: &MatchUp, sides: &[SideState; 2]) -> ReadinessState {
    let resolved_bye =
        match_up.match_up_status == MatchUpStatus::Bye && match_up.winning_side.is_some();
    if match_up.is_decided() || resolved_bye {
        ReadinessState::Completed
    } else if sides.iter().all(|side| side.participant_id().is_some()) {
        ReadinessState::Upcoming
    } else {
        ReadinessState::Pending
    }
}

fn build_view(
    draw: &DrawDefinition,
    structure_id: &str,
    match_up: &MatchUp,
    sides: [SideState; 2],
    targets: (Option<MatchUpId>, Option<MatchUpId>),
) -> MatchUpView {
    let [one, two] = sides.clone();
    let tie_match_ups = match_up
        .tie_match_ups
        .iter()
        .map(|child| build_view(draw, structure_id, child, sides.clone(), (None, None)))
        .collect();
    MatchUpView {
        match_up_id: match_up.match_up_id.clone(),
        structure_id: structure_id.to_string(),
        round_number: match_up.round_number,
        round_position: match_up.round_position,
        draw_positions: match_up.draw_positions,
        sides: [
            MatchUpSide {
                side: Side::One,
                state: one,
            },
            MatchUpSide {
                side: Side::Two,
                state: two,
            },
        ],
        match_up_status: match_up.match_up_status,
        winning_side: match_up.winning_side,
        score: match_up.score.clone(),
        produced_exit: match_up.produced_exit,
        active: match_up.is_active(),
        readiness: readiness(match_up, &sides),
        winner_match_up_id: targets.0,
        loser_match_up_id: targets.1,
        collection_id: match_up.collection_id.clone(),
        tie_match_ups,
    }
}

/// Derive the view of a top-level matchUp
pub fn match_up_view(
    draw: &DrawDefinition,
    structure_id: &str,
    match_up: &MatchUp,
) -> DrawResult<MatchUpView> {
    let sides = side_states(draw, structure_id, match_up)?;
    let winner = graph::winner_target(draw, structure_id, &match_up.match_up_id)?
        .map(|target| target.match_up_id);
    let loser = match graph::loser_target(draw, structure_id, &match_up.match_up_id)? {
        Some(target) => draw
            .structure(&target.structure_id)?
            .first_match_up_with(target.draw_position)
            .map(|found| found.match_up_id.clone()),
        None => None,
    };
    Ok(build_view(draw, structure_id, match_up, sides, (winner, loser)))
}

/// Every matchUp of a structure (all groups for a container), in round order
pub fn all_structure_match_ups(
    draw: &DrawDefinition,
    structure_id: &str,
) -> DrawResult<Vec<MatchUpView>> {
    let structure = draw.structure(structure_id)?;
    let mut views = Vec::new();
    for leaf in structure.leaf_structures() {
        let mut match_ups: Vec<&MatchUp> = leaf.match_ups.iter().collect();
        match_ups.sort_by_key(|match_up| (match_up.round_number, match_up.round_position));
        for match_up in match_ups {
            views.push(match_up_view(draw, &leaf.structure_id, match_up)?);
        }
    }
    Ok(views)
}

pub fn all_draw_match_ups(draw: &DrawDefinition) -> DrawResult<Vec<MatchUpView>> {
    let mut views = Vec::new();
    for structure in &draw.structures {
        views.extend(all_structure_match_ups(draw, &structure.structure_id)?);
    }
    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders;
    use crate::model::Occupant;

    #[test]
    fn test_views_cover_every_round() {
        let draw = builders::single_elimination("d", 8);
        let views = all_draw_match_ups(&draw).unwrap();
        assert_eq!(views.len(), 7);
        assert!(views.iter().all(|v| v.readiness == ReadinessState::Pending));
        assert!(views[0].winner_match_up_id.is_some());
        assert!(views[6].winner_match_up_id.is_none());
    }

    #[test]
    fn test_upcoming_when_both_sides_known() {
        let mut draw = builders::single_elimination("d", 4);
        let main = &mut draw.structures[0];
        main.assignment_mut(1).unwrap().occupant = Some(Occupant::Participant("a".to_string()));
        main.assignment_mut(2).unwrap().occupant = Some(Occupant::Participant("b".to_string()));
        let structure_id = main.structure_id.clone();

        let views = all_structure_match_ups(&draw, &structure_id).unwrap();
        assert_eq!(views[0].readiness, ReadinessState::Upcoming);
        assert_eq!(views[0].participant_id(Side::Two), Some("b"));
        assert_eq!(views[1].readiness, ReadinessState::Pending);
    }

    #[test]
    fn test_loser_match_up_resolved_across_structures() {
        let draw = builders::first_match_loser_consolation("d", 8);
        let main_id = draw.structures[0].structure_id.clone();
        let views = all_structure_match_ups(&draw, &main_id).unwrap();
        let consolation_first = draw.structures[1].match_up_at(1, 1).unwrap();
        assert_eq!(
            views[0].loser_match_up_id.as_deref(),
            Some(consolation_first.match_up_id.as_str())
        );
    }
}
