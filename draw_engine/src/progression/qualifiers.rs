//! Qualifier placement into main-draw placeholder positions.
//!
//! A WINNER link carries the winners of a qualifying round into the qualifier
//! placeholders of a main structure. A placed participant remembers the
//! qualifying matchUp it came from, so a later change to that result swaps or
//! vacates exactly the position it filled. Swaps and removals are refused
//! without error once the main matchUp holding the position is active.

use serde::{Deserialize, Serialize};

use super::propagator::Propagator;
use crate::graph;
use crate::model::{
    DrawDefinition, DrawEntry, DrawError, DrawPosition, DrawResult, EntryStage, EntryStatus,
    LinkType, MatchUp, MatchUpId, Occupant, ParticipantId, StructureShape,
};
use crate::policy::TallyPolicy;
use crate::round_robin::tally_group;

/// What the qualifier policy did after a qualifying result changed
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct QualifierActions {
    pub placed: Option<ParticipantId>,
    /// Participant swapped out for the new winner
    pub replaced: Option<ParticipantId>,
    pub removed: Option<ParticipantId>,
}

/// Participant on the winning side of a decided matchUp
pub(crate) fn winner_participant(
    draw: &DrawDefinition,
    structure_id: &str,
    match_up: &MatchUp,
) -> DrawResult<Option<ParticipantId>> {
    if !match_up.match_up_status.is_directing() {
        return Ok(None);
    }
    let Some(draw_position) = match_up.winning_side.and_then(|side| match_up.draw_position(side))
    else {
        return Ok(None);
    };
    Ok(draw
        .structure(structure_id)?
        .assignment(draw_position)
        .and_then(|assignment| assignment.participant_id())
        .map(str::to_string))
}

fn provenance_position(
    draw: &DrawDefinition,
    structure_id: &str,
    match_up_id: &str,
) -> DrawResult<Option<DrawPosition>> {
    Ok(draw
        .structure(structure_id)?
        .position_assignments
        .iter()
        .find(|assignment| assignment.qualified_from.as_deref() == Some(match_up_id))
        .map(|assignment| assignment.draw_position))
}

/// Lowest unfilled qualifier placeholder among the fed positions of a round
fn open_placeholders(
    draw: &DrawDefinition,
    structure_id: &str,
    round_number: u32,
) -> DrawResult<Vec<DrawPosition>> {
    let structure = draw.structure(structure_id)?;
    let mut positions: Vec<DrawPosition> = graph::fed_positions(structure, round_number)
        .into_iter()
        .filter(|draw_position| {
            structure
                .assignment(*draw_position)
                .is_some_and(|assignment| assignment.is_qualifier())
        })
        .collect();
    positions.sort_unstable();
    Ok(positions)
}

fn add_main_entry(draw: &mut DrawDefinition, participant_id: &str) {
    let entered = draw.entries.iter().any(|entry| {
        entry.participant_id == participant_id && entry.entry_stage == EntryStage::Main
    });
    if !entered {
        draw.entries.push(DrawEntry {
            participant_id: participant_id.to_string(),
            entry_stage: EntryStage::Main,
            entry_status: EntryStatus::Qualifier,
        });
    }
}

fn remove_main_entry(draw: &mut DrawDefinition, participant_id: &str) {
    draw.entries.retain(|entry| {
        !(entry.participant_id == participant_id
            && entry.entry_stage == EntryStage::Main
            && entry.entry_status == EntryStatus::Qualifier)
    });
}

impl Propagator<'_> {
    /// Swap the occupant of a position and record where the new one qualified from
    fn put_qualified(
        &mut self,
        structure_id: &str,
        draw_position: DrawPosition,
        current: &Occupant,
        participant_id: &str,
        qualified_from: Option<&str>,
    ) -> DrawResult<()> {
        self.remove_occupant(structure_id, draw_position, current)?;
        self.place_occupant(
            structure_id,
            draw_position,
            Occupant::Participant(participant_id.to_string()),
        )?;
        if let Some(assignment) = self
            .draw
            .structure_mut(structure_id)?
            .assignment_mut(draw_position)
        {
            assignment.qualified_from = qualified_from.map(str::to_string);
        }
        add_main_entry(self.draw, participant_id);
        self.settle_position(structure_id, draw_position)
    }
}

/// Place, replace or remove the main-draw qualifier fed by a qualifying matchUp
/// after its result changed from `old_winner`.
pub(crate) fn apply_qualifier_policy(
    propagator: &mut Propagator<'_>,
    structure_id: &str,
    match_up_id: &str,
    old_winner: Option<ParticipantId>,
) -> DrawResult<QualifierActions> {
    let mut actions = QualifierActions::default();
    let match_up = propagator.draw.structure_match_up(structure_id, match_up_id)?;
    if propagator.draw.structure(structure_id)?.shape != StructureShape::Elimination {
        return Ok(actions);
    }
    let Some(link) = graph::winner_link(propagator.draw, structure_id, match_up.round_number)
    else {
        return Ok(actions);
    };
    let target_id = link.target.structure_id.clone();
    let target_round = link.target.round_number;
    let new_winner = winner_participant(propagator.draw, structure_id, match_up)?;
    if new_winner == old_winner {
        return Ok(actions);
    }

    let existing = provenance_position(propagator.draw, &target_id, match_up_id)?;
    match (existing, new_winner) {
        (Some(draw_position), Some(new_winner)) => {
            if !propagator.policy.auto_replace_qualifiers {
                return Ok(actions);
            }
            if propagator.is_active_at(&target_id, draw_position)? {
                log::warn!(
                    "qualifier at {} drawPosition {} not replaced: main play has started",
                    target_id,
                    draw_position
                );
                return Ok(actions);
            }
            let current = propagator
                .draw
                .structure(&target_id)?
                .assignment(draw_position)
                .and_then(|assignment| assignment.occupant.clone())
                .ok_or_else(|| DrawError::InvalidDrawPosition {
                    structure_id: target_id.clone(),
                    draw_position,
                })?;
            propagator.put_qualified(
                &target_id,
                draw_position,
                &current,
                &new_winner,
                Some(match_up_id),
            )?;
            if let Some(old_winner) = &old_winner {
                remove_main_entry(propagator.draw, old_winner);
            }
            log::info!(
                "qualifier {} replaced {:?} at {} drawPosition {}",
                new_winner,
                old_winner,
                target_id,
                draw_position
            );
            actions.placed = Some(new_winner);
            actions.replaced = old_winner;
        }
        (Some(draw_position), None) => {
            if !propagator.policy.auto_remove_qualifiers {
                return Ok(actions);
            }
            if propagator.is_active_at(&target_id, draw_position)? {
                log::warn!(
                    "qualifier at {} drawPosition {} not removed: main play has started",
                    target_id,
                    draw_position
                );
                return Ok(actions);
            }
            let Some(old_winner) = old_winner else {
                return Ok(actions);
            };
            let current = Occupant::Participant(old_winner.clone());
            if propagator.remove_occupant(&target_id, draw_position, &current)? {
                propagator.place_occupant(&target_id, draw_position, Occupant::Qualifier)?;
                propagator.settle_position(&target_id, draw_position)?;
                remove_main_entry(propagator.draw, &old_winner);
                log::info!(
                    "qualifier {} removed from {} drawPosition {}",
                    old_winner,
                    target_id,
                    draw_position
                );
                actions.removed = Some(old_winner);
            }
        }
        (None, Some(new_winner)) => {
            if !propagator.policy.auto_place_qualifiers {
                return Ok(actions);
            }
            if propagator
                .draw
                .structure(&target_id)?
                .participant_position(&new_winner)
                .is_some()
            {
                return Ok(actions);
            }
            let Some(draw_position) = open_placeholders(propagator.draw, &target_id, target_round)?
                .into_iter()
                .next()
            else {
                log::warn!(
                    "no open qualifier position in {} round {} for {}",
                    target_id,
                    target_round,
                    new_winner
                );
                return Ok(actions);
            };
            if propagator.is_active_at(&target_id, draw_position)? {
                log::warn!(
                    "qualifier {} not placed: {} drawPosition {} is in play",
                    new_winner,
                    target_id,
                    draw_position
                );
                return Ok(actions);
            }
            propagator.put_qualified(
                &target_id,
                draw_position,
                &Occupant::Qualifier,
                &new_winner,
                Some(match_up_id),
            )?;
            log::info!(
                "qualifier {} placed at {} drawPosition {}",
                new_winner,
                target_id,
                draw_position
            );
            actions.placed = Some(new_winner);
        }
        (None, None) => return Ok(actions),
    }

    propagator.run()?;
    Ok(actions)
}

struct Qualified {
    participant_id: ParticipantId,
    qualified_from: Option<MatchUpId>,
    round_number: u32,
}

/// Place every qualified participant not yet in `structure_id` into open
/// qualifier placeholders, lowest drawPosition first.
pub(crate) fn qualifier_progression(
    propagator: &mut Propagator<'_>,
    structure_id: &str,
    round_number: Option<u32>,
    tally_policy: &TallyPolicy,
) -> DrawResult<Vec<ParticipantId>> {
    let draw = &*propagator.draw;
    let target = draw.structure(structure_id)?;
    let mut links = graph::inbound_links(draw, structure_id, LinkType::Winner);
    links.extend(graph::inbound_links(draw, structure_id, LinkType::Position));

    let mut qualified: Vec<Qualified> = Vec::new();
    for link in links {
        if round_number.is_some_and(|round_number| round_number != link.target.round_number) {
            continue;
        }
        let source = draw.structure(&link.source.structure_id)?;
        match source.shape {
            StructureShape::Elimination => {
                for match_up in source.round_match_ups(link.source.round_number) {
                    if let Some(participant_id) =
                        winner_participant(draw, &source.structure_id, match_up)?
                    {
                        qualified.push(Qualified {
                            participant_id,
                            qualified_from: Some(match_up.match_up_id.clone()),
                            round_number: link.target.round_number,
                        });
                    }
                }
            }
            StructureShape::Container | StructureShape::RoundRobinGroup => {
                let finishing_positions = if link.source.finishing_positions.is_empty() {
                    vec![1]
                } else {
                    link.source.finishing_positions.clone()
                };
                for group in source.leaf_structures() {
                    let tally = tally_group(draw, &group.structure_id, tally_policy)?;
                    if !tally.bracket_complete {
                        continue;
                    }
                    let ordered = tally.finishing_order(draw)?;
                    for finishing_position in &finishing_positions {
                        let index = finishing_position.saturating_sub(1) as usize;
                        if let Some(participant_id) = ordered.get(index) {
                            qualified.push(Qualified {
                                participant_id: participant_id.clone(),
                                qualified_from: None,
                                round_number: link.target.round_number,
                            });
                        }
                    }
                }
            }
            StructureShape::AdHoc => {}
        }
    }
    qualified.retain(|candidate| target.participant_position(&candidate.participant_id).is_none());
    if qualified.is_empty() {
        return Err(DrawError::MissingQualifiedParticipants(structure_id.to_string()));
    }

    let mut assigned = Vec::new();
    for candidate in qualified {
        let Some(draw_position) =
            open_placeholders(propagator.draw, structure_id, candidate.round_number)?
                .into_iter()
                .next()
        else {
            break;
        };
        propagator.put_qualified(
            structure_id,
            draw_position,
            &Occupant::Qualifier,
            &candidate.participant_id,
            candidate.qualified_from.as_deref(),
        )?;
        assigned.push(candidate.participant_id);
    }
    if assigned.is_empty() {
        return Err(DrawError::NoQualifierPositions(structure_id.to_string()));
    }
    propagator.run()?;

    log::info!(
        "qualifier progression placed {} participants into {}",
        assigned.len(),
        structure_id
    );
    Ok(assigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders;
    use crate::model::{MatchUpStatus, Side};
    use crate::policy::ProgressionPolicy;

    fn decide(draw: &mut DrawDefinition, structure_id: &str, match_up_id: &str, side: Side) {
        let match_up = draw.structure_match_up_mut(structure_id, match_up_id).unwrap();
        match_up.match_up_status = MatchUpStatus::Completed;
        match_up.winning_side = Some(side);
    }

    #[test]
    fn test_winner_participant() {
        let mut draw = builders::single_elimination("d", 4);
        let structure_id = draw.structures[0].structure_id.clone();
        for (draw_position, id) in [(1, "a"), (2, "b")] {
            draw.structures[0].assignment_mut(draw_position).unwrap().occupant =
                Some(Occupant::Participant(id.to_string()));
        }
        let match_up_id = draw.structures[0].match_ups[0].match_up_id.clone();
        decide(&mut draw, &structure_id, &match_up_id, Side::Two);
        let match_up = draw.structure_match_up(&structure_id, &match_up_id).unwrap();
        assert_eq!(
            winner_participant(&draw, &structure_id, match_up).unwrap(),
            Some("b".to_string())
        );
    }

    #[test]
    fn test_progression_fills_lowest_placeholder() {
        let mut draw = builders::qualifying_and_main("d", 8, 8, 2);
        let qualifying_id = draw.structures[0].structure_id.clone();
        let main_id = draw.structures[1].structure_id.clone();
        let finals: Vec<MatchUpId> = draw.structures[0]
            .round_match_ups(2)
            .iter()
            .map(|m| m.match_up_id.clone())
            .collect();

        // hand-place the round 2 qualifying participants and decide both matchUps
        for (idx, match_up_id) in finals.iter().enumerate() {
            let base = idx as u32 * 4;
            let match_up = draw
                .structure_match_up_mut(&qualifying_id, match_up_id)
                .unwrap();
            match_up.draw_positions = [Some(base + 1), Some(base + 3)];
            for draw_position in [base + 1, base + 3] {
                draw.structure_mut(&qualifying_id)
                    .unwrap()
                    .assignment_mut(draw_position)
                    .unwrap()
                    .occupant = Some(Occupant::Participant(format!("q{draw_position}")));
            }
            decide(&mut draw, &qualifying_id, match_up_id, Side::One);
        }

        let policy = ProgressionPolicy::default();
        let mut propagator = Propagator::new(&mut draw, &policy);
        let assigned =
            qualifier_progression(&mut propagator, &main_id, None, &TallyPolicy::default())
                .unwrap();
        assert_eq!(assigned, vec!["q1".to_string(), "q5".to_string()]);

        let main = draw.structure(&main_id).unwrap();
        let placed: Vec<DrawPosition> = main
            .position_assignments
            .iter()
            .filter(|assignment| assignment.qualified_from.is_some())
            .map(|assignment| assignment.draw_position)
            .collect();
        assert_eq!(placed.len(), 2);
        assert!(draw.entries.iter().any(|entry| entry.participant_id == "q1"
            && entry.entry_status == EntryStatus::Qualifier));

        let mut propagator = Propagator::new(&mut draw, &policy);
        let err = qualifier_progression(&mut propagator, &main_id, None, &TallyPolicy::default())
            .unwrap_err();
        assert_eq!(err.code(), "MISSING_QUALIFIED_PARTICIPANTS");
    }
}
