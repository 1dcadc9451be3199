//! Error types for draw operations.

use thiserror::Error;

use super::status::MatchUpStatus;

/// Draw errors
///
/// Structural lookup failures (`MissingDrawDefinition`, `MissingStructure`, `StructureNotFound`,
/// `MatchUpNotFound`) are fatal for the call that produced them. Everything
/// else is a validation failure caused by caller input. Public entry points wrap
/// the underlying error in [`DrawError::Tagged`] with the name of the operation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DrawError {
    #[error("draw definition not found: {0}")]
    MissingDrawDefinition(String),

    #[error("missing structure id")]
    MissingStructure,

    #[error("structure not found: {0}")]
    StructureNotFound(String),

    #[error("matchUp not found: {0}")]
    MatchUpNotFound(String),

    #[error("invalid drawPosition {draw_position} for structure {structure_id}")]
    InvalidDrawPosition {
        structure_id: String,
        draw_position: u32,
    },

    #[error("invalid matchUp status: {0}")]
    InvalidMatchUpStatus(String),

    #[error("invalid winning side: {0}")]
    InvalidWinningSide(String),

    #[error("invalid score: {0}")]
    InvalidScore(String),

    #[error("invalid values: {0}")]
    InvalidValues(String),

    #[error("drawPosition {draw_position} already assigned in structure {structure_id}")]
    DrawPositionAssigned {
        structure_id: String,
        draw_position: u32,
    },

    #[error("participant {participant_id} already assigned to drawPosition {draw_position}")]
    ParticipantAlreadyAssigned {
        participant_id: String,
        draw_position: u32,
    },

    #[error("participant not entered in draw: {0}")]
    ParticipantNotEntered(String),

    #[error("cannot change winning side: matchUp {0} is active downstream")]
    CannotChangeWinningSide(String),

    #[error("invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: MatchUpStatus,
        to: MatchUpStatus,
    },

    #[error("propagation cycle detected at matchUp {0}")]
    PropagationCycle(String),

    #[error("invalid link: {0}")]
    InvalidLink(String),

    #[error("structure {0} is not a round robin group")]
    NotRoundRobinGroup(String),

    #[error("source structure {0} is incomplete")]
    IncompleteSourceStructure(String),

    #[error("no qualified participants to place in structure {0}")]
    MissingQualifiedParticipants(String),

    #[error("no qualifier positions available in structure {0}")]
    NoQualifierPositions(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("{method}: {source}")]
    Tagged {
        method: &'static str,
        #[source]
        source: Box<DrawError>,
    },
}

impl DrawError {
    /// Stable upper-snake code for the underlying condition
    pub fn code(&self) -> &'static str {
        match self.root() {
            DrawError::MissingDrawDefinition(_) => "MISSING_DRAW_DEFINITION",
            DrawError::MissingStructure => "MISSING_STRUCTURE",
            DrawError::StructureNotFound(_) => "STRUCTURE_NOT_FOUND",
            DrawError::MatchUpNotFound(_) => "MATCHUP_NOT_FOUND",
            DrawError::InvalidDrawPosition { .. } => "INVALID_DRAW_POSITION",
            DrawError::InvalidMatchUpStatus(_) => "INVALID_MATCHUP_STATUS",
            DrawError::InvalidWinningSide(_) => "INVALID_WINNING_SIDE",
            DrawError::InvalidScore(_) => "INVALID_SCORE",
            DrawError::InvalidValues(_) => "INVALID_VALUES",
            DrawError::DrawPositionAssigned { .. } => "DRAW_POSITION_ASSIGNED",
            DrawError::ParticipantAlreadyAssigned { .. } => "PARTICIPANT_ALREADY_ASSIGNED",
            DrawError::ParticipantNotEntered(_) => "PARTICIPANT_NOT_ENTERED",
            DrawError::CannotChangeWinningSide(_) => "CANNOT_CHANGE_WINNING_SIDE",
            DrawError::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            DrawError::PropagationCycle(_) => "PROPAGATION_CYCLE",
            DrawError::InvalidLink(_) => "INVALID_LINK",
            DrawError::NotRoundRobinGroup(_) => "NOT_ROUND_ROBIN_GROUP",
            DrawError::IncompleteSourceStructure(_) => "INCOMPLETE_SOURCE_STRUCTURE",
            DrawError::MissingQualifiedParticipants(_) => "MISSING_QUALIFIED_PARTICIPANTS",
            DrawError::NoQualifierPositions(_) => "NO_QUALIFIER_POSITIONS",
            DrawError::InvalidConfig(_) => "INVALID_CONFIG",
            DrawError::Tagged { .. } => "TAGGED",
        }
    }

    /// The innermost error, with every tag removed
    pub fn root(&self) -> &DrawError {
        match self {
            DrawError::Tagged { source, .. } => source.root(),
            other => other,
        }
    }

    /// Name of the operation that reported the error, if tagged
    pub fn method(&self) -> Option<&'static str> {
        match self {
            DrawError::Tagged { method, .. } => Some(method),
            _ => None,
        }
    }

    /// Whether the error comes from a stale or missing id rather than bad input
    pub fn is_structural(&self) -> bool {
        matches!(
            self.root(),
            DrawError::MissingDrawDefinition(_)
                | DrawError::MissingStructure
                | DrawError::StructureNotFound(_)
                | DrawError::MatchUpNotFound(_)
        )
    }
}

/// Result type for draw operations
pub type DrawResult<T> = Result<T, DrawError>;

/// Attach the originating operation name to an error.
pub trait TagError<T> {
    fn tag(self, method: &'static str) -> DrawResult<T>;
}

impl<T> TagError<T> for DrawResult<T> {
    fn tag(self, method: &'static str) -> DrawResult<T> {
        self.map_err(|err| match err {
            // The outermost public entry point owns the tag.
            DrawError::Tagged { source, .. } => DrawError::Tagged { method, source },
            other => DrawError::Tagged {
                method,
                source: Box::new(other),
            },
        })
    }
}
