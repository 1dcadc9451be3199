use serde::{Deserialize, Serialize};

use crate::graph::{self, SlotSource};
use crate::model::{
    DrawDefinition, DrawPosition, DrawResult, MatchUp, MatchUpStatus, Occupant, ParticipantId,
    Side,
};

/// What one side of a matchUp currently holds
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SideState {
    Participant {
        draw_position: DrawPosition,
        participant_id: ParticipantId,
    },
    Bye {
        draw_position: DrawPosition,
    },
    Qualifier {
        draw_position: DrawPosition,
    },
    /// Waiting for an occupant
    Pending { draw_position: Option<DrawPosition> },
    /// No occupant will arrive: the source matchUp was an exit pair
    EmptyExit { source_status: MatchUpStatus },
}

impl SideState {
    /// Holds something that can move forward as a winner
    pub fn is_advanceable(&self) -> bool {
        matches!(
            self,
            Self::Participant { .. } | Self::Bye { .. } | Self::Qualifier { .. }
        )
    }

    pub fn is_bye(&self) -> bool {
        matches!(self, Self::Bye { .. })
    }

    pub fn is_empty_exit(&self) -> bool {
        matches!(self, Self::EmptyExit { .. })
    }

    pub fn participant_id(&self) -> Option<&str> {
        match self {
            Self::Participant { participant_id, .. } => Some(participant_id),
            _ => None,
        }
    }

    pub fn draw_position(&self) -> Option<DrawPosition> {
        match self {
            Self::Participant { draw_position, .. }
            | Self::Bye { draw_position }
            | Self::Qualifier { draw_position } => Some(*draw_position),
            Self::Pending { draw_position } => *draw_position,
            Self::EmptyExit { .. } => None,
        }
    }
}

fn source_exit(
    draw: &DrawDefinition,
    structure_id: &str,
    match_up: &MatchUp,
    side: Side,
) -> DrawResult<Option<MatchUpStatus>> {
    let source = match graph::slot_source(draw, structure_id, match_up, side)? {
        SlotSource::Advanced { match_up_id } => draw.structure_match_up(structure_id, &match_up_id)?,
        SlotSource::Linked {
            structure_id,
            match_up_id,
        } => draw.structure_match_up(&structure_id, &match_up_id)?,
        SlotSource::Assigned => return Ok(None),
    };
    Ok(source
        .match_up_status
        .is_exit_pair()
        .then_some(source.match_up_status))
}

/// Derive the state of one side of a top-level matchUp
pub fn side_state(
    draw: &DrawDefinition,
    structure_id: &str,
    match_up: &MatchUp,
    side: Side,
) -> DrawResult<SideState> {
    let structure = draw.structure(structure_id)?;
    if let Some(draw_position) = match_up.draw_position(side) {
        let occupant = structure
            .assignment(draw_position)
            .and_then(|assignment| assignment.occupant.as_ref());
        match occupant {
            Some(Occupant::Participant(participant_id)) => {
                return Ok(SideState::Participant {
                    draw_position,
                    participant_id: participant_id.clone(),
                });
            }
            Some(Occupant::Bye) => return Ok(SideState::Bye { draw_position }),
            Some(Occupant::Qualifier) => return Ok(SideState::Qualifier { draw_position }),
            None => {}
        }
    }
    if let Some(source_status) = source_exit(draw, structure_id, match_up, side)? {
        return Ok(SideState::EmptyExit { source_status });
    }
    Ok(SideState::Pending {
        draw_position: match_up.draw_position(side),
    })
}

pub fn side_states(
    draw: &DrawDefinition,
    structure_id: &str,
    match_up: &MatchUp,
) -> DrawResult<[SideState; 2]> {
    Ok([
        side_state(draw, structure_id, match_up, Side::One)?,
        side_state(draw, structure_id, match_up, Side::Two)?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders;

    #[test]
    fn test_assigned_and_pending_sides() {
        let mut draw = builders::single_elimination("d", 4);
        let main = &mut draw.structures[0];
        main.assignment_mut(1).unwrap().occupant = Some(Occupant::Participant("p1".to_string()));
        main.assignment_mut(2).unwrap().occupant = Some(Occupant::Bye);
        let structure_id = main.structure_id.clone();
        let m1 = main.match_up_at(1, 1).unwrap().clone();
        let m2 = main.match_up_at(1, 2).unwrap().clone();

        let [one, two] = side_states(&draw, &structure_id, &m1).unwrap();
        assert_eq!(one.participant_id(), Some("p1"));
        assert!(two.is_bye());
        assert_eq!(
            side_state(&draw, &structure_id, &m2, Side::One).unwrap(),
            SideState::Pending {
                draw_position: Some(3)
            }
        );
    }

    #[test]
    fn test_empty_exit_below_exit_pair() {
        let mut draw = builders::single_elimination("d", 4);
        let main = &mut draw.structures[0];
        let structure_id = main.structure_id.clone();
        let m1_id = main.match_up_at(1, 1).unwrap().match_up_id.clone();
        main.match_up_mut(&m1_id).unwrap().match_up_status = MatchUpStatus::DoubleDefault;
        let final_match = main.match_up_at(2, 1).unwrap().clone();

        assert_eq!(
            side_state(&draw, &structure_id, &final_match, Side::One).unwrap(),
            SideState::EmptyExit {
                source_status: MatchUpStatus::DoubleDefault
            }
        );
        assert!(
            !side_state(&draw, &structure_id, &final_match, Side::Two)
                .unwrap()
                .is_advanceable()
        );
    }
}
