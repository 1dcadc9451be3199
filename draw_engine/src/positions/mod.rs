//! Position assignment store.
//!
//! Every occupant change goes through the [`Propagator`] so that BYE
//! resolution and advancement follow immediately. Round robin containers are
//! addressed by the container id; the group holding the drawPosition is
//! resolved here and participant uniqueness is checked across all groups.

use serde::{Deserialize, Serialize};

use crate::model::{
    DrawDefinition, DrawError, DrawPosition, DrawResult, Occupant, ParticipantId, StructureId,
    StructureShape,
};
use crate::progression::Propagator;

/// Requested content of one drawPosition in a bulk assignment
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct AssignmentInput {
    pub draw_position: DrawPosition,
    pub participant_id: Option<ParticipantId>,
    #[serde(default)]
    pub bye: bool,
    #[serde(default)]
    pub qualifier: bool,
}

impl AssignmentInput {
    pub fn participant(draw_position: DrawPosition, participant_id: impl Into<ParticipantId>) -> Self {
        Self {
            draw_position,
            participant_id: Some(participant_id.into()),
            ..Self::default()
        }
    }

    pub fn bye(draw_position: DrawPosition) -> Self {
        Self {
            draw_position,
            bye: true,
            ..Self::default()
        }
    }

    pub fn qualifier(draw_position: DrawPosition) -> Self {
        Self {
            draw_position,
            qualifier: true,
            ..Self::default()
        }
    }

    /// The single occupant this input names
    pub fn occupant(&self) -> DrawResult<Occupant> {
        match (&self.participant_id, self.bye, self.qualifier) {
            (Some(participant_id), false, false) => Ok(Occupant::Participant(participant_id.clone())),
            (None, true, false) => Ok(Occupant::Bye),
            (None, false, true) => Ok(Occupant::Qualifier),
            _ => Err(DrawError::InvalidValues(format!(
                "drawPosition {} needs exactly one of participantId, bye, qualifier",
                self.draw_position
            ))),
        }
    }
}

/// Leaf structure holding a drawPosition: the structure itself, or the
/// container group that declares it
pub fn resolve_position_structure(
    draw: &DrawDefinition,
    structure_id: &str,
    draw_position: DrawPosition,
) -> DrawResult<StructureId> {
    let structure = draw.structure(structure_id)?;
    structure
        .leaf_structures()
        .into_iter()
        .find(|leaf| leaf.assignment(draw_position).is_some())
        .map(|leaf| leaf.structure_id.clone())
        .ok_or_else(|| DrawError::InvalidDrawPosition {
            structure_id: structure_id.to_string(),
            draw_position,
        })
}

/// Reject a participant who is not entered or sits elsewhere in the container
fn check_participant(
    draw: &DrawDefinition,
    structure_id: &str,
    participant_id: &str,
) -> DrawResult<()> {
    if !draw.is_entered(participant_id) {
        return Err(DrawError::ParticipantNotEntered(participant_id.to_string()));
    }
    let scope = match draw.parent_of(structure_id) {
        Some(container) => container,
        None => draw.structure(structure_id)?,
    };
    if scope.is_container() {
        let elsewhere = scope
            .structures
            .iter()
            .filter(|group| group.structure_id != structure_id)
            .find_map(|group| group.participant_position(participant_id));
        if let Some(existing) = elsewhere {
            return Err(DrawError::ParticipantAlreadyAssigned {
                participant_id: participant_id.to_string(),
                draw_position: existing,
            });
        }
    }
    Ok(())
}

fn place(
    propagator: &mut Propagator<'_>,
    structure_id: &str,
    draw_position: DrawPosition,
    occupant: Occupant,
) -> DrawResult<StructureId> {
    let leaf_id = resolve_position_structure(propagator.draw, structure_id, draw_position)?;
    if let Occupant::Participant(participant_id) = &occupant {
        check_participant(propagator.draw, &leaf_id, participant_id)?;
    }
    if propagator.place_occupant(&leaf_id, draw_position, occupant)? {
        propagator.settle_position(&leaf_id, draw_position)?;
    }
    Ok(leaf_id)
}

pub(crate) fn assign_participant(
    propagator: &mut Propagator<'_>,
    structure_id: &str,
    draw_position: DrawPosition,
    participant_id: &str,
) -> DrawResult<()> {
    let occupant = Occupant::Participant(participant_id.to_string());
    place(propagator, structure_id, draw_position, occupant)?;
    propagator.run()
}

/// Place a bye; the opposite occupant advances at once
pub(crate) fn assign_bye(
    propagator: &mut Propagator<'_>,
    structure_id: &str,
    draw_position: DrawPosition,
) -> DrawResult<()> {
    place(propagator, structure_id, draw_position, Occupant::Bye)?;
    propagator.run()
}

pub(crate) fn assign_qualifier(
    propagator: &mut Propagator<'_>,
    structure_id: &str,
    draw_position: DrawPosition,
) -> DrawResult<()> {
    place(propagator, structure_id, draw_position, Occupant::Qualifier)?;
    propagator.run()
}

/// Vacate a drawPosition and unwind anything it advanced.
/// Returns false when the position was already empty.
pub(crate) fn clear_draw_position(
    propagator: &mut Propagator<'_>,
    structure_id: &str,
    draw_position: DrawPosition,
) -> DrawResult<bool> {
    let leaf_id = resolve_position_structure(propagator.draw, structure_id, draw_position)?;
    let current = propagator
        .draw
        .structure(&leaf_id)?
        .assignment(draw_position)
        .and_then(|assignment| assignment.occupant.clone());
    let Some(current) = current else {
        return Ok(false);
    };
    propagator.remove_occupant(&leaf_id, draw_position, &current)?;
    if let Some(assignment) = propagator
        .draw
        .structure_mut(&leaf_id)?
        .assignment_mut(draw_position)
    {
        assignment.tally = None;
        assignment.sub_order = None;
    }
    propagator.settle_position(&leaf_id, draw_position)?;
    propagator.run()?;
    Ok(true)
}

/// Bulk assignment: every input is validated and placed before anything settles
pub(crate) fn set_position_assignments(
    propagator: &mut Propagator<'_>,
    structure_id: &str,
    inputs: &[AssignmentInput],
) -> DrawResult<usize> {
    let mut placed = Vec::new();
    for input in inputs {
        let occupant = input.occupant()?;
        let leaf_id = resolve_position_structure(propagator.draw, structure_id, input.draw_position)?;
        if let Occupant::Participant(participant_id) = &occupant {
            check_participant(propagator.draw, &leaf_id, participant_id)?;
        }
        if propagator.place_occupant(&leaf_id, input.draw_position, occupant)? {
            placed.push((leaf_id, input.draw_position));
        }
    }
    for (leaf_id, draw_position) in placed.iter().rev() {
        propagator.settle_position(leaf_id, *draw_position)?;
    }
    propagator.run()?;
    Ok(placed.len())
}

/// Manual tie-break override on a round robin group position
pub(crate) fn set_sub_order(
    draw: &mut DrawDefinition,
    structure_id: &str,
    draw_position: DrawPosition,
    sub_order: Option<u32>,
) -> DrawResult<()> {
    let leaf_id = resolve_position_structure(draw, structure_id, draw_position)?;
    let group = draw.structure_mut(&leaf_id)?;
    if group.shape != StructureShape::RoundRobinGroup {
        return Err(DrawError::NotRoundRobinGroup(leaf_id));
    }
    let assignment = group
        .assignment_mut(draw_position)
        .ok_or_else(|| DrawError::InvalidDrawPosition {
            structure_id: structure_id.to_string(),
            draw_position,
        })?;
    assignment.sub_order = sub_order;
    Ok(())
}
