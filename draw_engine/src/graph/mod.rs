//! Structure and link graph.
//!
//! Pure topology queries over a [`DrawDefinition`]: where a matchUp's winner
//! and loser go, which positions of a round are fed from another structure,
//! and where each matchUp slot is filled from. Nothing here mutates the draw.

use crate::model::{
    DrawDefinition, DrawError, DrawLink, DrawPosition, DrawResult, FeedProfile, LinkCondition,
    LinkType, MatchUp, MatchUpId, MatchUpStatus, Side, Structure, StructureId, StructureShape,
};

/// A side of a matchUp in the same structure that receives a winner
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SlotTarget {
    pub structure_id: StructureId,
    pub match_up_id: MatchUpId,
    pub side: Side,
}

/// A drawPosition in another structure that receives a loser
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PositionTarget {
    pub structure_id: StructureId,
    pub draw_position: DrawPosition,
}

/// Where a matchUp slot gets its occupant from
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SlotSource {
    /// Winner of a previous-round matchUp in the same structure
    Advanced { match_up_id: MatchUpId },
    /// Loser of a matchUp in another structure, through a LOSER link
    Linked {
        structure_id: StructureId,
        match_up_id: MatchUpId,
    },
    /// Direct position assignment
    Assigned,
}

pub fn find_structure<'a>(draw: &'a DrawDefinition, structure_id: &str) -> DrawResult<&'a Structure> {
    draw.structure(structure_id)
}

/// Container of a round robin group
pub fn parent_structure<'a>(draw: &'a DrawDefinition, structure_id: &str) -> Option<&'a Structure> {
    draw.parent_of(structure_id)
}

pub fn structure_of_match_up<'a>(
    draw: &'a DrawDefinition,
    match_up_id: &str,
) -> DrawResult<&'a Structure> {
    let location = draw.locate_match_up(match_up_id)?;
    draw.structure(&location.structure_id)
}

/// Id under which links refer to a structure: groups are linked through their container
pub fn link_owner_id<'a>(draw: &'a DrawDefinition, structure_id: &'a str) -> &'a str {
    match draw.parent_of(structure_id) {
        Some(parent) => &parent.structure_id,
        None => structure_id,
    }
}

pub fn outbound_links<'a>(
    draw: &'a DrawDefinition,
    structure_id: &str,
    link_type: LinkType,
) -> Vec<&'a DrawLink> {
    draw.links
        .iter()
        .filter(|link| link.link_type == link_type && link.source.structure_id == structure_id)
        .collect()
}

pub fn inbound_links<'a>(
    draw: &'a DrawDefinition,
    structure_id: &str,
    link_type: LinkType,
) -> Vec<&'a DrawLink> {
    draw.links
        .iter()
        .filter(|link| link.link_type == link_type && link.target.structure_id == structure_id)
        .collect()
}

fn source_link<'a>(
    draw: &'a DrawDefinition,
    structure_id: &str,
    round_number: u32,
    link_type: LinkType,
) -> Option<&'a DrawLink> {
    draw.links.iter().find(|link| {
        link.link_type == link_type
            && link.source.structure_id == structure_id
            && link.source.round_number == round_number
            && link.link_condition.is_none()
    })
}

/// LOSER link leaving a round that only routes first-matchUp losers
pub fn first_match_link<'a>(
    draw: &'a DrawDefinition,
    structure_id: &str,
    round_number: u32,
) -> Option<&'a DrawLink> {
    draw.links.iter().find(|link| {
        link.link_type == LinkType::Loser
            && link.source.structure_id == structure_id
            && link.source.round_number == round_number
            && link.link_condition == Some(LinkCondition::FirstMatchUp)
    })
}

/// Round positions start at 1; a stored 0 would wrap the slot arithmetic
fn round_position(match_up: &MatchUp) -> DrawResult<u32> {
    if match_up.round_position == 0 {
        return Err(DrawError::InvalidValues(format!(
            "matchUp {} has round position 0",
            match_up.match_up_id
        )));
    }
    Ok(match_up.round_position)
}

/// WINNER link leaving a structure at a round, e.g. qualifying into main
pub fn winner_link<'a>(
    draw: &'a DrawDefinition,
    structure_id: &str,
    round_number: u32,
) -> Option<&'a DrawLink> {
    source_link(draw, structure_id, round_number, LinkType::Winner)
}

/// Positions of a round that are filled from outside the round's own structure
/// progression: every position in round 1, the side 1 positions of a feed round.
pub fn fed_positions(structure: &Structure, round_number: u32) -> Vec<DrawPosition> {
    if round_number <= 1 {
        let mut positions: Vec<DrawPosition> = structure
            .round_match_ups(1)
            .iter()
            .flat_map(|match_up| match_up.draw_positions.iter().flatten().copied())
            .collect();
        positions.sort_unstable();
        positions.dedup();
        return positions;
    }
    let previous: Vec<DrawPosition> = structure
        .round_match_ups(round_number - 1)
        .iter()
        .flat_map(|match_up| match_up.draw_positions.iter().flatten().copied())
        .collect();
    structure
        .round_match_ups(round_number)
        .iter()
        .filter_map(|match_up| match_up.draw_position(Side::One))
        .filter(|draw_position| !previous.contains(draw_position))
        .collect()
}

fn match_up_in<'a>(structure: &'a Structure, match_up_id: &str) -> DrawResult<&'a MatchUp> {
    structure
        .match_up(match_up_id)
        .ok_or_else(|| DrawError::MatchUpNotFound(match_up_id.to_string()))
}

/// Next-round slot that receives the winner of a matchUp.
///
/// `None` for round robin groups, past the round limit, after the final, and
/// where a WINNER link carries the round's winners to another structure.
pub fn winner_target(
    draw: &DrawDefinition,
    structure_id: &str,
    match_up_id: &str,
) -> DrawResult<Option<SlotTarget>> {
    let structure = draw.structure(structure_id)?;
    let match_up = match_up_in(structure, match_up_id)?;
    if structure.shape != StructureShape::Elimination {
        return Ok(None);
    }
    let round_number = match_up.round_number;
    if structure
        .round_limit
        .is_some_and(|limit| round_number >= limit)
    {
        return Ok(None);
    }
    if winner_link(draw, structure_id, round_number).is_some() {
        return Ok(None);
    }
    let next_round = round_number + 1;
    if structure.round_count(next_round) == 0 {
        return Ok(None);
    }

    let position = round_position(match_up)?;
    let (round_position, side) = if structure.is_feed_round(next_round) {
        (position, Side::Two)
    } else {
        let side = Side::from_index(((position - 1) % 2) as usize);
        (position.div_ceil(2), side)
    };
    let target = structure
        .match_up_at(next_round, round_position)
        .ok_or_else(|| {
            DrawError::MatchUpNotFound(format!(
                "{structure_id} round {next_round} position {round_position}"
            ))
        })?;

    Ok(Some(SlotTarget {
        structure_id: structure_id.to_string(),
        match_up_id: target.match_up_id.clone(),
        side,
    }))
}

/// Position in a linked structure that receives the loser of a matchUp
pub fn loser_target(
    draw: &DrawDefinition,
    structure_id: &str,
    match_up_id: &str,
) -> DrawResult<Option<PositionTarget>> {
    let structure = draw.structure(structure_id)?;
    let match_up = match_up_in(structure, match_up_id)?;
    let Some(link) = source_link(draw, structure_id, match_up.round_number, LinkType::Loser) else {
        return Ok(None);
    };
    let target = draw.structure(&link.target.structure_id)?;
    let mut fed = fed_positions(target, link.target.round_number);
    if link.target.feed_profile == FeedProfile::BottomUp {
        fed.reverse();
    }
    let index = (round_position(match_up)? - 1) as usize;
    let draw_position = fed.get(index).copied().ok_or_else(|| {
        DrawError::InvalidLink(format!(
            "{} round {} has no fed position {} for matchUp {}",
            target.structure_id,
            link.target.round_number,
            index + 1,
            match_up_id
        ))
    })?;

    Ok(Some(PositionTarget {
        structure_id: target.structure_id.clone(),
        draw_position,
    }))
}

/// Positions held for the sides of a matchUp whose previous-round matchUp was
/// resolved by a bye, when a first-matchUp LOSER link leaves the matchUp's round.
///
/// Each side maps to the loser position of its bye-resolved previous matchUp.
pub fn first_match_targets(
    draw: &DrawDefinition,
    structure_id: &str,
    match_up: &MatchUp,
) -> DrawResult<Vec<(Side, PositionTarget)>> {
    if first_match_link(draw, structure_id, match_up.round_number).is_none() {
        return Ok(Vec::new());
    }
    let mut targets = Vec::new();
    for side in [Side::One, Side::Two] {
        let source = slot_source(draw, structure_id, match_up, side)?;
        let SlotSource::Advanced { match_up_id } = source else {
            continue;
        };
        let previous = draw.structure_match_up(structure_id, &match_up_id)?;
        if previous.match_up_status != MatchUpStatus::Bye {
            continue;
        }
        if let Some(target) = loser_target(draw, structure_id, &match_up_id)? {
            targets.push((side, target));
        }
    }
    Ok(targets)
}

/// Whether the loser position of a bye-resolved matchUp in this round is held
/// for a first-matchUp loser of the next round
pub fn holds_first_match_position(
    draw: &DrawDefinition,
    structure_id: &str,
    round_number: u32,
) -> bool {
    first_match_link(draw, structure_id, round_number + 1).is_some()
}

/// Where one side of a matchUp is filled from
pub fn slot_source(
    draw: &DrawDefinition,
    structure_id: &str,
    match_up: &MatchUp,
    side: Side,
) -> DrawResult<SlotSource> {
    let structure = draw.structure(structure_id)?;
    if structure.shape != StructureShape::Elimination {
        return Ok(SlotSource::Assigned);
    }
    let round_number = match_up.round_number;
    let feed_round = structure.is_feed_round(round_number);

    if round_number > 1 && !(feed_round && side == Side::One) {
        let position = round_position(match_up)?;
        let previous_position = if feed_round {
            position
        } else {
            2 * position - 1 + side.index() as u32
        };
        return Ok(match structure.match_up_at(round_number - 1, previous_position) {
            Some(previous) => SlotSource::Advanced {
                match_up_id: previous.match_up_id.clone(),
            },
            None => SlotSource::Assigned,
        });
    }

    let Some(draw_position) = match_up.draw_position(side) else {
        return Ok(SlotSource::Assigned);
    };
    for link in inbound_links(draw, structure_id, LinkType::Loser) {
        if link.target.round_number != round_number {
            continue;
        }
        let source = draw.structure(&link.source.structure_id)?;
        for candidate in source.round_match_ups(link.source.round_number) {
            let target = loser_target(draw, &source.structure_id, &candidate.match_up_id)?;
            if target.is_some_and(|target| target.draw_position == draw_position) {
                return Ok(SlotSource::Linked {
                    structure_id: source.structure_id.clone(),
                    match_up_id: candidate.match_up_id.clone(),
                });
            }
        }
    }
    Ok(SlotSource::Assigned)
}
