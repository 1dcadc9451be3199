//! Draw definition aggregate: structures, links, entries and tie format.

use serde::{Deserialize, Serialize};

use super::errors::{DrawError, DrawResult};
use super::match_up::MatchUp;
use super::structure::{MatchUpId, ParticipantId, Stage, Structure, StructureId};

/// Contest type of every matchUp in a draw
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchUpType {
    Singles,
    Doubles,
    Team,
}

/// Link types
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkType {
    /// Winners of the source round move on
    Winner,
    /// Losers of the source round move on
    Loser,
    /// Group finishers move on by finishing position
    Position,
}

/// Restriction on which matchUps of the source round a link routes
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkCondition {
    /// Only a participant losing the first matchUp they played moves on, into
    /// the position held by their bye-resolved previous-round matchUp
    FirstMatchUp,
}

/// Order in which a link fills the fed positions of its target round
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedProfile {
    #[default]
    TopDown,
    BottomUp,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct LinkSource {
    pub structure_id: StructureId,
    pub round_number: u32,
    /// Group finishing positions carried by a POSITION link
    #[serde(default)]
    pub finishing_positions: Vec<u32>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct LinkTarget {
    pub structure_id: StructureId,
    pub round_number: u32,
    #[serde(default)]
    pub feed_profile: FeedProfile,
}

/// Directed edge between two structures
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DrawLink {
    pub link_type: LinkType,
    pub source: LinkSource,
    pub target: LinkTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_condition: Option<LinkCondition>,
}

impl DrawLink {
    pub fn new(
        link_type: LinkType,
        source: (impl Into<StructureId>, u32),
        target: (impl Into<StructureId>, u32),
    ) -> Self {
        Self {
            link_type,
            source: LinkSource {
                structure_id: source.0.into(),
                round_number: source.1,
                finishing_positions: Vec::new(),
            },
            target: LinkTarget {
                structure_id: target.0.into(),
                round_number: target.1,
                feed_profile: FeedProfile::TopDown,
            },
            link_condition: None,
        }
    }

    pub fn with_feed_profile(mut self, feed_profile: FeedProfile) -> Self {
        self.target.feed_profile = feed_profile;
        self
    }

    pub fn with_link_condition(mut self, link_condition: LinkCondition) -> Self {
        self.link_condition = Some(link_condition);
        self
    }

    pub fn with_finishing_positions(mut self, finishing_positions: Vec<u32>) -> Self {
        self.source.finishing_positions = finishing_positions;
        self
    }
}

/// Stage a participant was entered into
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStage {
    Qualifying,
    Main,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    DirectAcceptance,
    Qualifier,
    LuckyLoser,
    Wildcard,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DrawEntry {
    pub participant_id: ParticipantId,
    pub entry_stage: EntryStage,
    pub entry_status: EntryStatus,
}

impl DrawEntry {
    pub fn direct(participant_id: impl Into<ParticipantId>, entry_stage: EntryStage) -> Self {
        Self {
            participant_id: participant_id.into(),
            entry_stage,
            entry_status: EntryStatus::DirectAcceptance,
        }
    }
}

/// Collection of child contests within a TEAM tie
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CollectionDefinition {
    pub collection_id: String,
    pub collection_name: String,
    pub match_up_count: u32,
    /// Value of each child contest won (default 1)
    pub match_up_value: Option<u32>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct WinCriteria {
    /// Value needed to win the tie; a majority of the total when absent
    pub value_goal: Option<u32>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct TieFormat {
    pub collection_definitions: Vec<CollectionDefinition>,
    pub win_criteria: WinCriteria,
}

impl TieFormat {
    pub fn collection(&self, collection_id: &str) -> Option<&CollectionDefinition> {
        self.collection_definitions
            .iter()
            .find(|collection| collection.collection_id == collection_id)
    }

    /// Value a child contest contributes to its side of the tie
    pub fn match_up_value(&self, collection_id: Option<&str>) -> u32 {
        collection_id
            .and_then(|id| self.collection(id))
            .and_then(|collection| collection.match_up_value)
            .unwrap_or(1)
    }

    pub fn total_value(&self) -> u32 {
        self.collection_definitions
            .iter()
            .map(|collection| collection.match_up_count * collection.match_up_value.unwrap_or(1))
            .sum()
    }

    pub fn value_goal(&self) -> u32 {
        self.win_criteria
            .value_goal
            .unwrap_or(self.total_value() / 2 + 1)
    }
}

/// Where a matchUp record lives
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatchUpLocation {
    pub structure_id: StructureId,
    pub match_up_id: MatchUpId,
    /// Set when the matchUp is a child contest of a TEAM tie
    pub tie_parent_id: Option<MatchUpId>,
}

/// Draw definition
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DrawDefinition {
    pub draw_id: String,
    pub draw_name: String,
    pub match_up_type: MatchUpType,
    pub structures: Vec<Structure>,
    pub links: Vec<DrawLink>,
    pub entries: Vec<DrawEntry>,
    pub tie_format: Option<TieFormat>,
}

fn find_structure<'a>(structures: &'a [Structure], structure_id: &str) -> Option<&'a Structure> {
    structures.iter().find_map(|structure| {
        if structure.structure_id == structure_id {
            Some(structure)
        } else {
            find_structure(&structure.structures, structure_id)
        }
    })
}

fn find_structure_mut<'a>(
    structures: &'a mut [Structure],
    structure_id: &str,
) -> Option<&'a mut Structure> {
    for structure in structures.iter_mut() {
        if structure.structure_id == structure_id {
            return Some(structure);
        }
        if let Some(found) = find_structure_mut(&mut structure.structures, structure_id) {
            return Some(found);
        }
    }
    None
}

fn collect_structures<'a>(structures: &'a [Structure], out: &mut Vec<&'a Structure>) {
    for structure in structures {
        out.push(structure);
        collect_structures(&structure.structures, out);
    }
}

impl DrawDefinition {
    pub fn new(draw_id: impl Into<String>, match_up_type: MatchUpType) -> Self {
        Self {
            draw_id: draw_id.into(),
            draw_name: String::new(),
            match_up_type,
            structures: Vec::new(),
            links: Vec::new(),
            entries: Vec::new(),
            tie_format: None,
        }
    }

    /// Find a structure at any depth, including round robin groups
    pub fn structure(&self, structure_id: &str) -> DrawResult<&Structure> {
        if structure_id.is_empty() {
            return Err(DrawError::MissingStructure);
        }
        find_structure(&self.structures, structure_id)
            .ok_or_else(|| DrawError::StructureNotFound(structure_id.to_string()))
    }

    pub fn structure_mut(&mut self, structure_id: &str) -> DrawResult<&mut Structure> {
        if structure_id.is_empty() {
            return Err(DrawError::MissingStructure);
        }
        find_structure_mut(&mut self.structures, structure_id)
            .ok_or_else(|| DrawError::StructureNotFound(structure_id.to_string()))
    }

    /// Every structure, containers before their groups
    pub fn all_structures(&self) -> Vec<&Structure> {
        let mut out = Vec::new();
        collect_structures(&self.structures, &mut out);
        out
    }

    /// Container holding a group
    pub fn parent_of(&self, structure_id: &str) -> Option<&Structure> {
        self.all_structures().into_iter().find(|structure| {
            structure
                .structures
                .iter()
                .any(|child| child.structure_id == structure_id)
        })
    }

    pub fn locate_match_up(&self, match_up_id: &str) -> DrawResult<MatchUpLocation> {
        for structure in self.all_structures() {
            for match_up in &structure.match_ups {
                if match_up.match_up_id == match_up_id {
                    return Ok(MatchUpLocation {
                        structure_id: structure.structure_id.clone(),
                        match_up_id: match_up.match_up_id.clone(),
                        tie_parent_id: None,
                    });
                }
                if match_up.tie_match_up(match_up_id).is_some() {
                    return Ok(MatchUpLocation {
                        structure_id: structure.structure_id.clone(),
                        match_up_id: match_up_id.to_string(),
                        tie_parent_id: Some(match_up.match_up_id.clone()),
                    });
                }
            }
        }
        Err(DrawError::MatchUpNotFound(match_up_id.to_string()))
    }

    /// Find a matchUp record, including TEAM tie children
    pub fn match_up(&self, location: &MatchUpLocation) -> DrawResult<&MatchUp> {
        let structure = self.structure(&location.structure_id)?;
        let found = match &location.tie_parent_id {
            Some(parent_id) => structure
                .match_up(parent_id)
                .and_then(|parent| parent.tie_match_up(&location.match_up_id)),
            None => structure.match_up(&location.match_up_id),
        };
        found.ok_or_else(|| DrawError::MatchUpNotFound(location.match_up_id.clone()))
    }

    pub fn match_up_mut(&mut self, location: &MatchUpLocation) -> DrawResult<&mut MatchUp> {
        let structure = self.structure_mut(&location.structure_id)?;
        let found = match &location.tie_parent_id {
            Some(parent_id) => structure
                .match_up_mut(parent_id)
                .and_then(|parent| parent.tie_match_up_mut(&location.match_up_id)),
            None => structure.match_up_mut(&location.match_up_id),
        };
        found.ok_or_else(|| DrawError::MatchUpNotFound(location.match_up_id.clone()))
    }

    /// Find a top-level matchUp by id within a known structure
    pub fn structure_match_up(&self, structure_id: &str, match_up_id: &str) -> DrawResult<&MatchUp> {
        self.structure(structure_id)?
            .match_up(match_up_id)
            .ok_or_else(|| DrawError::MatchUpNotFound(match_up_id.to_string()))
    }

    pub fn structure_match_up_mut(
        &mut self,
        structure_id: &str,
        match_up_id: &str,
    ) -> DrawResult<&mut MatchUp> {
        self.structure_mut(structure_id)?
            .match_up_mut(match_up_id)
            .ok_or_else(|| DrawError::MatchUpNotFound(match_up_id.to_string()))
    }

    pub fn is_entered(&self, participant_id: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.participant_id == participant_id)
    }

    pub fn entry(&self, participant_id: &str) -> Option<&DrawEntry> {
        self.entries
            .iter()
            .find(|entry| entry.participant_id == participant_id)
    }

    pub fn structures_in_stage(&self, stage: Stage) -> Vec<&Structure> {
        self.structures
            .iter()
            .filter(|structure| structure.stage == stage)
            .collect()
    }
}
