use std::collections::BTreeMap;

use crate::graph;
use crate::model::{DrawDefinition, DrawResult, FinishingPosition, LinkType, ParticipantId, StructureId};

/// Structures downstream of a group that already consumed its finishing order.
///
/// Empty when the order did not change. A POSITION-link target of the group's
/// container counts as connected once it holds any of the group's participants.
pub fn connected_structure_ids(
    draw: &DrawDefinition,
    group_id: &str,
    before: &BTreeMap<ParticipantId, u32>,
    after: &BTreeMap<ParticipantId, u32>,
) -> DrawResult<Vec<StructureId>> {
    if before == after {
        return Ok(Vec::new());
    }
    let group = draw.structure(group_id)?;
    let Some(container) = draw.parent_of(group_id) else {
        return Ok(Vec::new());
    };
    if container.finishing_position != FinishingPosition::WinRatio {
        return Ok(Vec::new());
    }
    let group_participants = group.participant_ids();

    let mut connected = Vec::new();
    for link in graph::outbound_links(draw, &container.structure_id, LinkType::Position) {
        let target = draw.structure(&link.target.structure_id)?;
        let consumed = target
            .participant_ids()
            .iter()
            .any(|participant_id| group_participants.contains(participant_id));
        if consumed && !connected.contains(&target.structure_id) {
            connected.push(target.structure_id.clone());
        }
    }
    Ok(connected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders;
    use crate::model::Occupant;

    #[test]
    fn test_unchanged_order_has_no_connected_structures() {
        let draw = builders::round_robin_with_playoff("d", 2, 4, 2);
        let group_id = draw.structures[0].structures[0].structure_id.clone();
        let order = BTreeMap::from([("a".to_string(), 1)]);
        assert!(
            connected_structure_ids(&draw, &group_id, &order, &order)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_playoff_holding_group_participant_is_connected() {
        let mut draw = builders::round_robin_with_playoff("d", 2, 4, 2);
        let group_id = draw.structures[0].structures[0].structure_id.clone();
        let playoff_id = draw.structures[1].structure_id.clone();
        draw.structure_mut(&group_id)
            .unwrap()
            .assignment_mut(1)
            .unwrap()
            .occupant = Some(Occupant::Participant("a".to_string()));

        let before = BTreeMap::from([("a".to_string(), 1)]);
        let after = BTreeMap::from([("a".to_string(), 2)]);
        assert!(
            connected_structure_ids(&draw, &group_id, &before, &after)
                .unwrap()
                .is_empty()
        );

        draw.structure_mut(&playoff_id)
            .unwrap()
            .assignment_mut(1)
            .unwrap()
            .occupant = Some(Occupant::Participant("a".to_string()));
        assert_eq!(
            connected_structure_ids(&draw, &group_id, &before, &after).unwrap(),
            vec![playoff_id]
        );
    }
}
