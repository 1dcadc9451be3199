//! # Draw Engine
//!
//! Draw structure and match-progression engine for bracket tournaments.
//!
//! A draw is a set of structures (elimination trees, round robin containers
//! and their groups) joined by links. Recording a result moves winners and
//! losers along the link graph, resolves byes and walkovers, re-tallies round
//! robin groups, and fills qualifier placeholders, all in one transactional
//! call.
//!
//! ## Core Modules
//!
//! - [`model`]: Draw definition, structures, matchUps, scores and errors
//! - [`graph`]: Link topology and slot sources
//! - [`matchups`]: Derived matchUp views and team tie rollups
//! - [`progression`]: Status state machine and the propagation worklist
//! - [`positions`]: Position assignment
//! - [`round_robin`]: Group tallies and playoff positioning
//! - [`engine`]: Transactional public entry points
//! - [`shared`]: Async registry for concurrent callers
//! - [`builders`]: Draw templates
//!
//! ## Example
//!
//! ```
//! use draw_engine::{DrawEngine, Side, builders};
//!
//! let mut draw = builders::single_elimination("demo", 4);
//! let structure_id = draw.structures[0].structure_id.clone();
//! builders::seed_participants(&mut draw, &structure_id, &["a", "b", "c", "d"]).unwrap();
//!
//! let engine = DrawEngine::default();
//! let first = draw.structures[0].match_up_at(1, 1).unwrap().match_up_id.clone();
//! engine.set_winning_side(&mut draw, &first, Some(Side::One), None).unwrap();
//!
//! let final_round = draw.structures[0].match_up_at(2, 1).unwrap();
//! assert_eq!(final_round.draw_positions[0], Some(1));
//! ```

/// Draw data model and error types.
pub mod model;
pub use model::{
    DrawDefinition, DrawError, DrawLink, DrawPosition, DrawResult, LinkType, MatchUp,
    MatchUpStatus, MatchUpType, Occupant, Score, Side, Stage, Structure, StructureShape, TieFormat,
};

/// Structure and link topology.
pub mod graph;

/// Derived matchUp views.
pub mod matchups;
pub use matchups::{MatchUpView, ReadinessState};

/// Progression and tally policy.
pub mod policy;
pub use policy::{EngineConfig, PolicyProvider, ProgressionPolicy, StaticPolicy, TallyPolicy};

/// Committed change notifications.
pub mod notifications;
pub use notifications::{AuditRecord, Notification, NotificationSink, RecordingSink};

/// Status transitions and propagation.
pub mod progression;
pub use progression::{PropagationReport, QualifierActions, StatusRequest};

/// Position assignment.
pub mod positions;
pub use positions::AssignmentInput;

/// Round robin tallies and playoff positioning.
pub mod round_robin;
pub use round_robin::{GroupTally, ParticipantResult, PlayoffPlacement};

/// Public entry points.
pub mod engine;
pub use engine::{DrawEngine, MatchUpOutcome, SetMatchUpStatusParams};

/// Shared draw registry.
pub mod shared;
pub use shared::DrawRegistry;

/// Draw templates.
pub mod builders;
