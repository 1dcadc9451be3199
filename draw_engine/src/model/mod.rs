//! Draw data model.

pub mod draw;
pub mod errors;
pub mod match_up;
pub mod score;
pub mod status;
pub mod structure;

pub use draw::{
    CollectionDefinition, DrawDefinition, DrawEntry, DrawLink, EntryStage, EntryStatus,
    FeedProfile, LinkCondition, LinkSource, LinkTarget, LinkType, MatchUpLocation, MatchUpType,
    TieFormat, WinCriteria,
};
pub use errors::{DrawError, DrawResult, TagError};
pub use match_up::MatchUp;
pub use score::{Score, SetScore};
pub use status::{MatchUpStatus, Side, StatusCategory};
pub use structure::{
    DrawPosition, FinishingPosition, MatchUpId, Occupant, ParticipantId, PositionAssignment,
    SeedAssignment, Stage, Structure, StructureId, StructureShape,
};
