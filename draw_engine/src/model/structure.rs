//! Structures and their position assignments.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::match_up::MatchUp;
use crate::round_robin::ParticipantResult;

pub type StructureId = String;
pub type MatchUpId = String;
pub type ParticipantId = String;

/// A numbered bracket line within a structure
pub type DrawPosition = u32;

/// Stage a structure belongs to
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Qualifying,
    Main,
    Consolation,
    PlayOff,
    VoluntaryConsolation,
}

/// Shape of a structure
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StructureShape {
    /// Elimination tree
    Elimination,
    /// Holds child structures (round robin groups or further containers)
    Container,
    /// Round robin group inside a container
    RoundRobinGroup,
    /// Rounds without a bracket relationship
    AdHoc,
}

/// Basis of finishing positions within a structure
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishingPosition {
    RoundOutcome,
    WinRatio,
}

/// What occupies a drawPosition. A position holds at most one occupant.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Occupant {
    Participant(ParticipantId),
    Bye,
    /// Placeholder reserved for a qualifying-structure winner
    Qualifier,
}

impl Occupant {
    pub fn participant_id(&self) -> Option<&str> {
        match self {
            Self::Participant(participant_id) => Some(participant_id),
            _ => None,
        }
    }
}

/// Position assignment
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PositionAssignment {
    pub draw_position: DrawPosition,
    pub occupant: Option<Occupant>,
    /// Round robin tally extension
    pub tally: Option<ParticipantResult>,
    /// Manual tie-break override extension
    pub sub_order: Option<u32>,
    /// Qualifying matchUp that placed the current participant
    pub qualified_from: Option<MatchUpId>,
}

impl PositionAssignment {
    pub fn new(draw_position: DrawPosition) -> Self {
        Self {
            draw_position,
            occupant: None,
            tally: None,
            sub_order: None,
            qualified_from: None,
        }
    }

    pub fn participant_id(&self) -> Option<&str> {
        self.occupant.as_ref().and_then(Occupant::participant_id)
    }

    pub fn is_bye(&self) -> bool {
        self.occupant == Some(Occupant::Bye)
    }

    pub fn is_qualifier(&self) -> bool {
        self.occupant == Some(Occupant::Qualifier)
    }

    pub fn is_vacant(&self) -> bool {
        self.occupant.is_none()
    }
}

/// Seed assignment
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SeedAssignment {
    pub seed_number: u32,
    pub participant_id: Option<ParticipantId>,
}

/// Structure
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Structure {
    pub structure_id: StructureId,
    pub structure_name: String,
    pub stage: Stage,
    pub stage_sequence: u32,
    pub shape: StructureShape,
    pub finishing_position: FinishingPosition,
    /// Last round played in this structure (qualifying structures stop early)
    pub round_limit: Option<u32>,
    pub position_assignments: Vec<PositionAssignment>,
    pub seed_assignments: Vec<SeedAssignment>,
    pub match_ups: Vec<MatchUp>,
    /// Child structures of a container
    pub structures: Vec<Structure>,
}

impl Structure {
    pub fn new(
        structure_id: StructureId,
        structure_name: impl Into<String>,
        stage: Stage,
        shape: StructureShape,
    ) -> Self {
        let finishing_position = match shape {
            StructureShape::Container | StructureShape::RoundRobinGroup => {
                FinishingPosition::WinRatio
            }
            StructureShape::Elimination | StructureShape::AdHoc => FinishingPosition::RoundOutcome,
        };
        Self {
            structure_id,
            structure_name: structure_name.into(),
            stage,
            stage_sequence: 1,
            shape,
            finishing_position,
            round_limit: None,
            position_assignments: Vec::new(),
            seed_assignments: Vec::new(),
            match_ups: Vec::new(),
            structures: Vec::new(),
        }
    }

    pub fn is_container(&self) -> bool {
        self.shape == StructureShape::Container
    }

    /// Declared number of drawPositions, across all groups for containers
    pub fn draw_size(&self) -> usize {
        if self.is_container() {
            self.structures.iter().map(Structure::draw_size).sum()
        } else {
            self.position_assignments.len()
        }
    }

    pub fn assignment(&self, draw_position: DrawPosition) -> Option<&PositionAssignment> {
        self.position_assignments
            .iter()
            .find(|assignment| assignment.draw_position == draw_position)
    }

    pub fn assignment_mut(&mut self, draw_position: DrawPosition) -> Option<&mut PositionAssignment> {
        self.position_assignments
            .iter_mut()
            .find(|assignment| assignment.draw_position == draw_position)
    }

    /// Position of a participant in this structure or any of its groups
    pub fn participant_position(&self, participant_id: &str) -> Option<DrawPosition> {
        if self.is_container() {
            return self
                .structures
                .iter()
                .find_map(|child| child.participant_position(participant_id));
        }
        self.position_assignments
            .iter()
            .find(|assignment| assignment.participant_id() == Some(participant_id))
            .map(|assignment| assignment.draw_position)
    }

    /// Every participant placed in this structure or its groups
    pub fn participant_ids(&self) -> BTreeSet<ParticipantId> {
        if self.is_container() {
            return self
                .structures
                .iter()
                .flat_map(|child| child.participant_ids())
                .collect();
        }
        self.position_assignments
            .iter()
            .filter_map(|assignment| assignment.participant_id().map(str::to_string))
            .collect()
    }

    pub fn match_up(&self, match_up_id: &str) -> Option<&MatchUp> {
        self.match_ups
            .iter()
            .find(|match_up| match_up.match_up_id == match_up_id)
    }

    pub fn match_up_mut(&mut self, match_up_id: &str) -> Option<&mut MatchUp> {
        self.match_ups
            .iter_mut()
            .find(|match_up| match_up.match_up_id == match_up_id)
    }

    pub fn match_up_at(&self, round_number: u32, round_position: u32) -> Option<&MatchUp> {
        self.match_ups.iter().find(|match_up| {
            match_up.round_number == round_number && match_up.round_position == round_position
        })
    }

    /// MatchUps of a round ordered by round position
    pub fn round_match_ups(&self, round_number: u32) -> Vec<&MatchUp> {
        let mut match_ups: Vec<&MatchUp> = self
            .match_ups
            .iter()
            .filter(|match_up| match_up.round_number == round_number)
            .collect();
        match_ups.sort_by_key(|match_up| match_up.round_position);
        match_ups
    }

    pub fn round_count(&self, round_number: u32) -> usize {
        self.match_ups
            .iter()
            .filter(|match_up| match_up.round_number == round_number)
            .count()
    }

    pub fn round_numbers(&self) -> Vec<u32> {
        let rounds: BTreeSet<u32> = self.match_ups.iter().map(|m| m.round_number).collect();
        rounds.into_iter().collect()
    }

    /// A feed round has as many matchUps as the round before it; its side 1
    /// positions are fed from another structure.
    pub fn is_feed_round(&self, round_number: u32) -> bool {
        if self.shape != StructureShape::Elimination || round_number < 2 {
            return false;
        }
        let count = self.round_count(round_number);
        count > 0 && count == self.round_count(round_number - 1)
    }

    /// First matchUp (lowest round) containing a drawPosition
    pub fn first_match_up_with(&self, draw_position: DrawPosition) -> Option<&MatchUp> {
        self.match_ups
            .iter()
            .filter(|match_up| match_up.has_draw_position(draw_position))
            .min_by_key(|match_up| (match_up.round_number, match_up.round_position))
    }

    /// Leaf structures: the groups of a container (recursively), or the structure itself
    pub fn leaf_structures(&self) -> Vec<&Structure> {
        if self.is_container() {
            self.structures
                .iter()
                .flat_map(Structure::leaf_structures)
                .collect()
        } else {
            vec![self]
        }
    }
}
