use serde::{Deserialize, Serialize};

use super::tally::{GroupTally, tally_group, write_tally};
use crate::graph;
use crate::model::{
    DrawError, DrawPosition, DrawResult, FeedProfile, LinkType, Occupant, StructureId,
    StructureShape,
};
use crate::policy::TallyPolicy;
use crate::progression::Propagator;

/// One position filled by playoff positioning
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayoffPlacement {
    pub structure_id: StructureId,
    pub draw_position: DrawPosition,
    pub occupant: Occupant,
}

fn finisher(
    propagator: &Propagator<'_>,
    tally: &GroupTally,
    finishing_position: u32,
) -> DrawResult<Occupant> {
    let ordered = tally.finishing_order(propagator.draw)?;
    Ok(finishing_position
        .checked_sub(1)
        .and_then(|index| ordered.get(index as usize))
        .map(|participant_id| Occupant::Participant(participant_id.clone()))
        .unwrap_or(Occupant::Bye))
}

/// Place group finishers into every structure fed by a container's POSITION links.
///
/// Finishers are taken finishing position first, then group by group. Missing
/// finishers (groups smaller than the position) become byes.
pub(crate) fn automated_playoff_positioning(
    propagator: &mut Propagator<'_>,
    container_id: &str,
    tally_policy: &TallyPolicy,
) -> DrawResult<Vec<PlayoffPlacement>> {
    let container = propagator.draw.structure(container_id)?;
    if container.shape != StructureShape::Container {
        return Err(DrawError::NotRoundRobinGroup(container_id.to_string()));
    }
    let group_ids: Vec<StructureId> = container
        .leaf_structures()
        .iter()
        .map(|group| group.structure_id.clone())
        .collect();

    let mut tallies = Vec::with_capacity(group_ids.len());
    for group_id in &group_ids {
        tallies.push(tally_group(propagator.draw, group_id, tally_policy)?);
    }
    if propagator.policy.require_completed_structures
        && tallies.iter().any(|tally| !tally.bracket_complete)
    {
        return Err(DrawError::IncompleteSourceStructure(container_id.to_string()));
    }
    for tally in &tallies {
        write_tally(propagator.draw, tally)?;
    }

    let largest_group = tallies
        .iter()
        .map(|tally| tally.participant_results.len() as u32)
        .max()
        .unwrap_or(0);
    let links: Vec<_> = graph::outbound_links(propagator.draw, container_id, LinkType::Position)
        .into_iter()
        .cloned()
        .collect();

    let mut wanted: Vec<PlayoffPlacement> = Vec::new();
    for link in &links {
        let target = propagator.draw.structure(&link.target.structure_id)?;
        let mut positions = graph::fed_positions(target, link.target.round_number);
        if link.target.feed_profile == FeedProfile::BottomUp {
            positions.reverse();
        }
        let finishing_positions: Vec<u32> = if link.source.finishing_positions.is_empty() {
            (1..=largest_group).collect()
        } else {
            link.source.finishing_positions.clone()
        };

        let mut occupants = Vec::new();
        for finishing_position in finishing_positions {
            for tally in &tallies {
                occupants.push(finisher(propagator, tally, finishing_position)?);
            }
        }
        if occupants.len() > positions.len() {
            return Err(DrawError::InvalidLink(format!(
                "{} needs {} positions in {} round {}, found {}",
                container_id,
                occupants.len(),
                link.target.structure_id,
                link.target.round_number,
                positions.len()
            )));
        }
        for (draw_position, occupant) in positions.into_iter().zip(occupants) {
            wanted.push(PlayoffPlacement {
                structure_id: link.target.structure_id.clone(),
                draw_position,
                occupant,
            });
        }
    }

    // vacate stale positions before placing so a participant can move within a structure
    let mut changed = Vec::new();
    for placement in &wanted {
        let current = propagator
            .draw
            .structure(&placement.structure_id)?
            .assignment(placement.draw_position)
            .and_then(|assignment| assignment.occupant.clone());
        match current {
            Some(current) if current == placement.occupant => {}
            Some(current) => {
                propagator.remove_occupant(&placement.structure_id, placement.draw_position, &current)?;
                changed.push(placement.clone());
            }
            None => changed.push(placement.clone()),
        }
    }
    for placement in &changed {
        propagator.place_occupant(
            &placement.structure_id,
            placement.draw_position,
            placement.occupant.clone(),
        )?;
    }
    for placement in changed.iter().rev() {
        propagator.settle_position(&placement.structure_id, placement.draw_position)?;
    }
    propagator.run()?;

    log::info!(
        "playoff positioning from {} placed {} of {} positions",
        container_id,
        changed.len(),
        wanted.len()
    );
    Ok(changed)
}
