//! Draw templates.
//!
//! Build the initial structure and link graph for the common draw types.
//! Identifiers are minted with `uuid` v4. Participants are seeded through the
//! position assignment entry points so byes resolve as they are placed.

use uuid::Uuid;

use crate::model::{
    CollectionDefinition, DrawDefinition, DrawEntry, DrawLink, DrawPosition, DrawResult,
    EntryStage, FeedProfile, LinkCondition, LinkType, MatchUp, MatchUpType, Occupant,
    PositionAssignment, Stage, Structure, StructureShape, TieFormat, WinCriteria,
};
use crate::policy::ProgressionPolicy;
use crate::positions::{self, AssignmentInput};
use crate::progression::Propagator;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Incremental draw assembly
#[derive(Debug, Clone)]
pub struct DrawBuilder {
    draw: DrawDefinition,
}

impl DrawBuilder {
    pub fn new(draw_id: impl Into<String>, match_up_type: MatchUpType) -> Self {
        Self {
            draw: DrawDefinition::new(draw_id, match_up_type),
        }
    }

    pub fn name(mut self, draw_name: impl Into<String>) -> Self {
        self.draw.draw_name = draw_name.into();
        self
    }

    pub fn structure(mut self, structure: Structure) -> Self {
        self.draw.structures.push(structure);
        self
    }

    pub fn link(mut self, link: DrawLink) -> Self {
        self.draw.links.push(link);
        self
    }

    pub fn tie_format(mut self, tie_format: TieFormat) -> Self {
        self.draw.tie_format = Some(tie_format);
        self
    }

    pub fn entries(mut self, participant_ids: &[&str], entry_stage: EntryStage) -> Self {
        self.draw.entries.extend(
            participant_ids
                .iter()
                .map(|participant_id| DrawEntry::direct(*participant_id, entry_stage)),
        );
        self
    }

    pub fn build(self) -> DrawDefinition {
        self.draw
    }
}

/// `p1` to `pN`
pub fn participant_ids(count: usize) -> Vec<String> {
    (1..=count).map(|idx| format!("p{idx}")).collect()
}

fn bracket_size(size: u32) -> u32 {
    size.max(2).next_power_of_two()
}

/// Elimination tree with round 1 positions `1..=size`. Sizes are rounded up to
/// a power of two.
pub fn elimination_structure(name: &str, stage: Stage, size: u32) -> Structure {
    let size = bracket_size(size);
    let mut structure = Structure::new(new_id(), name, stage, StructureShape::Elimination);
    structure.position_assignments = (1..=size).map(PositionAssignment::new).collect();

    let mut count = size / 2;
    let mut round_number = 1;
    loop {
        for round_position in 1..=count {
            let draw_positions = if round_number == 1 {
                [Some(2 * round_position - 1), Some(2 * round_position)]
            } else {
                [None, None]
            };
            structure.match_ups.push(MatchUp::new(
                new_id(),
                round_number,
                round_position,
                draw_positions,
            ));
        }
        if count == 1 {
            break;
        }
        count /= 2;
        round_number += 1;
    }
    structure
}

pub fn single_elimination(draw_id: &str, size: u32) -> DrawDefinition {
    DrawBuilder::new(draw_id, MatchUpType::Singles)
        .structure(elimination_structure("Main", Stage::Main, size))
        .build()
}

/// Main draw plus a consolation fed by first-matchUp losers: every round 1
/// loser, and a round 2 loser whose round 1 matchUp was a bye.
pub fn first_match_loser_consolation(draw_id: &str, size: u32) -> DrawDefinition {
    let main = elimination_structure("Main", Stage::Main, size);
    let consolation = elimination_structure("Consolation", Stage::Consolation, bracket_size(size) / 2);
    let mut builder = DrawBuilder::new(draw_id, MatchUpType::Singles).link(DrawLink::new(
        LinkType::Loser,
        (main.structure_id.clone(), 1),
        (consolation.structure_id.clone(), 1),
    ));
    if main.round_count(2) > 0 {
        builder = builder.link(
            DrawLink::new(
                LinkType::Loser,
                (main.structure_id.clone(), 2),
                (consolation.structure_id.clone(), 1),
            )
            .with_link_condition(LinkCondition::FirstMatchUp),
        );
    }
    builder.structure(main).structure(consolation).build()
}

fn push_round(
    structure: &mut Structure,
    round_number: u32,
    count: u32,
    fed_from: Option<&mut DrawPosition>,
) {
    match fed_from {
        Some(next_position) => {
            for round_position in 1..=count {
                let draw_position = *next_position;
                *next_position += 1;
                structure
                    .position_assignments
                    .push(PositionAssignment::new(draw_position));
                structure.match_ups.push(MatchUp::new(
                    new_id(),
                    round_number,
                    round_position,
                    [Some(draw_position), None],
                ));
            }
        }
        None => {
            for round_position in 1..=count {
                structure.match_ups.push(MatchUp::new(
                    new_id(),
                    round_number,
                    round_position,
                    [None, None],
                ));
            }
        }
    }
}

/// Main draw plus a consolation that takes first-round losers and feeds in
/// the losers of every later main round except the final.
///
/// For 16: consolation rounds of 4, 4 (fed 9 to 12), 2, 2 (fed 13 and 14), 1.
pub fn feed_in_consolation(draw_id: &str, size: u32) -> DrawDefinition {
    let size = bracket_size(size).max(8);
    let main = elimination_structure("Main", Stage::Main, size);
    let main_rounds = main.round_numbers().len() as u32;

    let mut consolation = elimination_structure("Consolation", Stage::Consolation, size / 2);
    consolation.match_ups.retain(|match_up| match_up.round_number == 1);
    let mut links = vec![DrawLink::new(
        LinkType::Loser,
        (main.structure_id.clone(), 1),
        (consolation.structure_id.clone(), 1),
    )];

    let mut count = size / 4;
    let mut next_position = size / 2 + 1;
    let mut round_number = 2;
    let mut main_round = 2;
    push_round(&mut consolation, round_number, count, Some(&mut next_position));
    links.push(
        DrawLink::new(
            LinkType::Loser,
            (main.structure_id.clone(), main_round),
            (consolation.structure_id.clone(), round_number),
        )
        .with_feed_profile(FeedProfile::BottomUp),
    );
    while count > 1 {
        count /= 2;
        round_number += 1;
        push_round(&mut consolation, round_number, count, None);
        main_round += 1;
        if main_round >= main_rounds {
            break;
        }
        round_number += 1;
        push_round(&mut consolation, round_number, count, Some(&mut next_position));
        links.push(DrawLink::new(
            LinkType::Loser,
            (main.structure_id.clone(), main_round),
            (consolation.structure_id.clone(), round_number),
        ));
    }

    let mut builder = DrawBuilder::new(draw_id, MatchUpType::Singles)
        .structure(main)
        .structure(consolation);
    for link in links {
        builder = builder.link(link);
    }
    builder.build()
}

/// Round robin schedule by the circle method; odd groups sit one out per round
fn round_robin_group(name: &str, stage: Stage, positions: &[DrawPosition]) -> Structure {
    let mut group = Structure::new(new_id(), name, stage, StructureShape::RoundRobinGroup);
    group.position_assignments = positions.iter().copied().map(PositionAssignment::new).collect();

    let mut slots: Vec<Option<DrawPosition>> = positions.iter().copied().map(Some).collect();
    if slots.len() % 2 == 1 {
        slots.push(None);
    }
    let slot_count = slots.len();
    for round_index in 0..slot_count.saturating_sub(1) {
        let mut round_position = 1;
        for idx in 0..slot_count / 2 {
            if let (Some(a), Some(b)) = (slots[idx], slots[slot_count - 1 - idx]) {
                group.match_ups.push(MatchUp::new(
                    new_id(),
                    round_index as u32 + 1,
                    round_position,
                    [Some(a.min(b)), Some(a.max(b))],
                ));
                round_position += 1;
            }
        }
        if let Some(last) = slots.pop() {
            slots.insert(1, last);
        }
    }
    group
}

/// Container of `groups` groups with consecutive drawPositions
pub fn round_robin_container(name: &str, stage: Stage, groups: u32, group_size: u32) -> Structure {
    let mut container = Structure::new(new_id(), name, stage, StructureShape::Container);
    for group_index in 0..groups {
        let first = group_index * group_size + 1;
        let positions: Vec<DrawPosition> = (first..first + group_size).collect();
        container.structures.push(round_robin_group(
            &format!("Group {}", group_index + 1),
            stage,
            &positions,
        ));
    }
    container
}

pub fn round_robin(draw_id: &str, groups: u32, group_size: u32) -> DrawDefinition {
    DrawBuilder::new(draw_id, MatchUpType::Singles)
        .structure(round_robin_container("Round Robin", Stage::Main, groups, group_size))
        .build()
}

/// Round robin groups whose top `finishers` per group move into an
/// elimination playoff, finishing position first, then group by group
pub fn round_robin_with_playoff(
    draw_id: &str,
    groups: u32,
    group_size: u32,
    finishers: u32,
) -> DrawDefinition {
    let container = round_robin_container("Round Robin", Stage::Main, groups, group_size);
    let playoff = elimination_structure("Playoff", Stage::PlayOff, groups * finishers);
    let link = DrawLink::new(
        LinkType::Position,
        (container.structure_id.clone(), 1),
        (playoff.structure_id.clone(), 1),
    )
    .with_finishing_positions((1..=finishers).collect());
    DrawBuilder::new(draw_id, MatchUpType::Singles)
        .structure(container)
        .structure(playoff)
        .link(link)
        .build()
}

/// Qualifying elimination that stops when `qualifiers` players remain, linked
/// by a WINNER link into qualifier placeholders of the main draw
pub fn qualifying_and_main(
    draw_id: &str,
    qualifying_size: u32,
    main_size: u32,
    qualifiers: u32,
) -> DrawDefinition {
    let qualifying_size = bracket_size(qualifying_size);
    let main_size = bracket_size(main_size);
    let qualifiers = qualifiers.clamp(1, (qualifying_size / 2).min(main_size / 2));
    let round_limit = (qualifying_size / qualifiers.next_power_of_two()).trailing_zeros();

    let mut qualifying = elimination_structure("Qualifying", Stage::Qualifying, qualifying_size);
    qualifying.round_limit = Some(round_limit);
    let mut main = elimination_structure("Main", Stage::Main, main_size);
    let spacing = main_size / qualifiers;
    for index in 0..qualifiers {
        if let Some(assignment) = main.assignment_mut(index * spacing + 2) {
            assignment.occupant = Some(Occupant::Qualifier);
        }
    }

    let link = DrawLink::new(
        LinkType::Winner,
        (qualifying.structure_id.clone(), round_limit),
        (main.structure_id.clone(), 1),
    );
    DrawBuilder::new(draw_id, MatchUpType::Singles)
        .structure(qualifying)
        .structure(main)
        .link(link)
        .build()
}

/// Tie format with singles and doubles collections, each contest worth one
pub fn team_tie_format(singles: u32, doubles: u32) -> TieFormat {
    TieFormat {
        collection_definitions: vec![
            CollectionDefinition {
                collection_id: "singles".to_string(),
                collection_name: "Singles".to_string(),
                match_up_count: singles,
                match_up_value: None,
            },
            CollectionDefinition {
                collection_id: "doubles".to_string(),
                collection_name: "Doubles".to_string(),
                match_up_count: doubles,
                match_up_value: None,
            },
        ],
        win_criteria: WinCriteria::default(),
    }
}

/// Single elimination of TEAM ties; every tie holds one child per collection slot
pub fn team_single_elimination(draw_id: &str, size: u32, tie_format: TieFormat) -> DrawDefinition {
    let mut main = elimination_structure("Main", Stage::Main, size);
    for match_up in &mut main.match_ups {
        for collection in &tie_format.collection_definitions {
            for collection_position in 1..=collection.match_up_count {
                let mut child = MatchUp::new(
                    new_id(),
                    match_up.round_number,
                    match_up.round_position,
                    match_up.draw_positions,
                );
                child.collection_id = Some(collection.collection_id.clone());
                child.collection_position = Some(collection_position);
                match_up.tie_match_ups.push(child);
            }
        }
    }
    DrawBuilder::new(draw_id, MatchUpType::Team)
        .structure(main)
        .tie_format(tie_format)
        .build()
}

/// Add direct-acceptance entries for participants not yet entered at `entry_stage`
pub fn enter_participants_at(
    draw: &mut DrawDefinition,
    participant_ids: &[&str],
    entry_stage: EntryStage,
) {
    for participant_id in participant_ids {
        let entered = draw.entries.iter().any(|entry| {
            entry.participant_id == *participant_id && entry.entry_stage == entry_stage
        });
        if !entered {
            draw.entries
                .push(DrawEntry::direct(*participant_id, entry_stage));
        }
    }
}

pub fn enter_participants(draw: &mut DrawDefinition, participant_ids: &[&str]) {
    enter_participants_at(draw, participant_ids, EntryStage::Main);
}

/// Enter participants at the structure's stage and assign them to
/// drawPositions `1..`
pub fn seed_participants(
    draw: &mut DrawDefinition,
    structure_id: &str,
    participant_ids: &[&str],
) -> DrawResult<()> {
    let entry_stage = match draw.structure(structure_id)?.stage {
        Stage::Qualifying => EntryStage::Qualifying,
        _ => EntryStage::Main,
    };
    enter_participants_at(draw, participant_ids, entry_stage);
    let inputs: Vec<AssignmentInput> = participant_ids
        .iter()
        .zip(1..)
        .map(|(participant_id, draw_position)| AssignmentInput::participant(draw_position, *participant_id))
        .collect();
    let policy = ProgressionPolicy::default();
    let mut propagator = Propagator::new(draw, &policy);
    positions::set_position_assignments(&mut propagator, structure_id, &inputs).map(|_| ())
}
