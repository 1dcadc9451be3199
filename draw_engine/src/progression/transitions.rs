//! MatchUp status state machine.
//!
//! A status request is classified into exactly one [`Transition`] by an
//! ordered list of guarded rules (first match wins), then applied. Each
//! transition is its own type; dispatch goes through `enum_dispatch`.
//!
//! Rule order:
//! 1. malformed requests are rejected
//! 2. TEAM tie children, and decided matchUps keeping their winner, only change score
//! 3. an exit pair replacing a decided result undoes it, then runs double-exit advancement
//! 4. any other change to a decided result undoes it before the follow-up rule
//! 5. non-directing statuses are recorded without advancement; TO_BE_PLAYED clears the score
//! 6. BYE is delegated to bye assignment (pre-play only)
//! 7. directing status with a winner advances participants
//! 8. exit pairs run double-exit advancement
//! 9. a bare score updates an undecided matchUp

use enum_dispatch::enum_dispatch;

use super::propagator::{Propagator, directed};
use super::ties::recompute_tie;
use crate::matchups::side_states;
use crate::model::{
    DrawDefinition, DrawError, DrawPosition, DrawResult, MatchUp, MatchUpLocation, MatchUpStatus,
    Occupant, Score, Side, StatusCategory,
};

/// Requested outcome
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatusRequest {
    pub match_up_status: Option<MatchUpStatus>,
    pub winning_side: Option<Side>,
    pub score: Option<Score>,
}

pub(crate) struct TransitionContext<'p, 'a> {
    pub propagator: &'p mut Propagator<'a>,
    pub location: MatchUpLocation,
    /// Status after defaulting (`COMPLETED` for a bare winning side)
    pub status: MatchUpStatus,
    pub winning_side: Option<Side>,
    pub score: Option<Score>,
}

impl TransitionContext<'_, '_> {
    fn structure_id(&self) -> &str {
        &self.location.structure_id
    }

    fn record(&self) -> DrawResult<&MatchUp> {
        self.propagator.draw.match_up(&self.location)
    }

    /// Apply a change to the stored record and note it
    fn update(&mut self, change: impl FnOnce(&mut MatchUp)) -> DrawResult<()> {
        let match_up = self.propagator.draw.match_up_mut(&self.location)?;
        change(match_up);
        let match_up = match_up.clone();
        let structure_id = self.location.structure_id.clone();
        self.propagator.note_match_up(&structure_id, &match_up);
        Ok(())
    }

    /// Reset a decided matchUp and unwind everything it sent forward
    fn undo(&mut self) -> DrawResult<()> {
        let record = self.record()?;
        let before = directed(self.propagator.draw, self.structure_id(), record)?;
        let was_exit_pair = record.match_up_status.is_exit_pair();
        self.update(MatchUp::reset_result)?;

        let structure_id = self.location.structure_id.clone();
        let match_up_id = self.location.match_up_id.clone();
        if was_exit_pair {
            self.propagator
                .push_retract_double_exit(&structure_id, &match_up_id);
        } else if let Some(before) = before {
            self.propagator
                .push_retract(&structure_id, &match_up_id, before);
        }
        self.propagator.run()
    }
}

#[enum_dispatch]
pub(crate) trait ApplyTransition {
    fn apply(&self, ctx: &mut TransitionContext<'_, '_>) -> DrawResult<()>;
}

/// Identical request
#[derive(Debug)]
pub(crate) struct NoChange;

/// Status/score change on a decided matchUp that keeps its winner (rule 2)
#[derive(Debug)]
pub(crate) struct ScoreOnly;

/// Result of a TEAM tie child (rule 2)
#[derive(Debug)]
pub(crate) struct TieChildResult;

/// Rule 3
#[derive(Debug)]
pub(crate) struct ReplaceWithExitPair;

/// Rule 4
#[derive(Debug)]
pub(crate) struct ClearDecided {
    pub follow_up: Box<Transition>,
}

/// Rule 5. Interrupted statuses keep their in-play score; TO_BE_PLAYED drops it
#[derive(Debug)]
pub(crate) struct NonDirecting;

/// Rule 6
#[derive(Debug)]
pub(crate) struct AssignBye {
    pub draw_position: DrawPosition,
}

/// Rule 7
#[derive(Debug)]
pub(crate) struct DirectWinner;

/// Rule 8
#[derive(Debug)]
pub(crate) struct ExitPair;

/// Rule 9
#[derive(Debug)]
pub(crate) struct ModifyScore;

#[enum_dispatch(ApplyTransition)]
#[derive(Debug)]
pub(crate) enum Transition {
    NoChange,
    ScoreOnly,
    TieChildResult,
    ReplaceWithExitPair,
    ClearDecided,
    NonDirecting,
    AssignBye,
    DirectWinner,
    ExitPair,
    ModifyScore,
}

impl ApplyTransition for NoChange {
    fn apply(&self, _ctx: &mut TransitionContext<'_, '_>) -> DrawResult<()> {
        Ok(())
    }
}

impl ApplyTransition for ScoreOnly {
    fn apply(&self, ctx: &mut TransitionContext<'_, '_>) -> DrawResult<()> {
        let before = directed(ctx.propagator.draw, ctx.structure_id(), ctx.record()?)?;
        let status = ctx.status;
        let score = ctx.score.clone();
        ctx.update(|match_up| {
            match_up.match_up_status = status;
            match_up.score = score;
        })?;
        // Re-send what the result directs in case the new status changes it.
        let structure_id = ctx.location.structure_id.clone();
        let match_up_id = ctx.location.match_up_id.clone();
        ctx.propagator.redirect(&structure_id, &match_up_id, before)
    }
}

impl ApplyTransition for TieChildResult {
    fn apply(&self, ctx: &mut TransitionContext<'_, '_>) -> DrawResult<()> {
        let status = ctx.status;
        let winning_side = if status.is_directing() {
            ctx.winning_side.or(ctx.record()?.winning_side)
        } else {
            None
        };
        let score = ctx.score.clone();
        ctx.update(|match_up| {
            match_up.match_up_status = status;
            match_up.winning_side = winning_side;
            match_up.score = score;
            match_up.produced_exit = false;
        })?;
        let structure_id = ctx.location.structure_id.clone();
        let Some(parent_id) = ctx.location.tie_parent_id.clone() else {
            return Ok(());
        };
        recompute_tie(ctx.propagator, &structure_id, &parent_id)
    }
}

impl ApplyTransition for ReplaceWithExitPair {
    fn apply(&self, ctx: &mut TransitionContext<'_, '_>) -> DrawResult<()> {
        ctx.undo()?;
        ExitPair.apply(ctx)
    }
}

impl ApplyTransition for ClearDecided {
    fn apply(&self, ctx: &mut TransitionContext<'_, '_>) -> DrawResult<()> {
        ctx.undo()?;
        self.follow_up.apply(ctx)
    }
}

impl ApplyTransition for NonDirecting {
    fn apply(&self, ctx: &mut TransitionContext<'_, '_>) -> DrawResult<()> {
        let status = ctx.status;
        let score = if status == MatchUpStatus::ToBePlayed {
            None
        } else {
            ctx.score.clone()
        };
        ctx.update(|match_up| {
            match_up.match_up_status = status;
            match_up.winning_side = None;
            match_up.score = score;
            match_up.produced_exit = false;
        })
    }
}

impl ApplyTransition for AssignBye {
    fn apply(&self, ctx: &mut TransitionContext<'_, '_>) -> DrawResult<()> {
        let structure_id = ctx.location.structure_id.clone();
        ctx.propagator
            .place_occupant(&structure_id, self.draw_position, Occupant::Bye)?;
        ctx.propagator
            .settle_position(&structure_id, self.draw_position)?;
        ctx.propagator.run()
    }
}

impl ApplyTransition for DirectWinner {
    fn apply(&self, ctx: &mut TransitionContext<'_, '_>) -> DrawResult<()> {
        let status = ctx.status;
        let winning_side = ctx.winning_side;
        let score = ctx.score.clone();
        ctx.update(|match_up| {
            match_up.match_up_status = status;
            match_up.winning_side = winning_side;
            match_up.score = score;
            match_up.produced_exit = false;
        })?;
        let structure_id = ctx.location.structure_id.clone();
        let match_up_id = ctx.location.match_up_id.clone();
        ctx.propagator.push_advance(&structure_id, &match_up_id);
        ctx.propagator.run()
    }
}

impl ApplyTransition for ExitPair {
    fn apply(&self, ctx: &mut TransitionContext<'_, '_>) -> DrawResult<()> {
        let status = ctx.status;
        ctx.update(|match_up| {
            match_up.match_up_status = status;
            match_up.winning_side = None;
            match_up.score = None;
            match_up.produced_exit = false;
        })?;
        let structure_id = ctx.location.structure_id.clone();
        let match_up_id = ctx.location.match_up_id.clone();
        ctx.propagator.push_double_exit(&structure_id, &match_up_id);
        ctx.propagator.run()
    }
}

impl ApplyTransition for ModifyScore {
    fn apply(&self, ctx: &mut TransitionContext<'_, '_>) -> DrawResult<()> {
        let score = ctx.score.clone();
        ctx.update(|match_up| match_up.score = score)
    }
}

/// Requested status after defaulting, or a score-only request
pub(crate) fn resolve_status(request: &StatusRequest) -> DrawResult<Option<MatchUpStatus>> {
    match (request.match_up_status, request.winning_side, &request.score) {
        (Some(status), _, _) => Ok(Some(status)),
        (None, Some(_), _) => Ok(Some(MatchUpStatus::Completed)),
        (None, None, Some(_)) => Ok(None),
        (None, None, None) => Err(DrawError::InvalidValues(
            "a status, winning side or score is required".to_string(),
        )),
    }
}

fn validate_shape(status: MatchUpStatus, request: &StatusRequest) -> DrawResult<()> {
    if status.is_exit_pair() {
        if request.winning_side.is_some() {
            return Err(DrawError::InvalidWinningSide(format!(
                "{status} has no winning side"
            )));
        }
        if request.score.is_some() {
            return Err(DrawError::InvalidScore(format!("{status} carries no score")));
        }
    } else if status.is_directing() {
        if request.winning_side.is_none() {
            return Err(DrawError::InvalidWinningSide(format!(
                "{status} requires a winning side"
            )));
        }
    } else if request.winning_side.is_some() {
        return Err(DrawError::InvalidWinningSide(format!(
            "{status} takes no winning side"
        )));
    } else if status == MatchUpStatus::Bye && request.score.is_some() {
        return Err(DrawError::InvalidScore("BYE carries no score".to_string()));
    }
    Ok(())
}

/// Both sides must hold participants before a result can be recorded
fn ensure_ready(draw: &DrawDefinition, structure_id: &str, match_up: &MatchUp) -> DrawResult<()> {
    let sides = side_states(draw, structure_id, match_up)?;
    if sides.iter().all(|side| side.participant_id().is_some()) {
        Ok(())
    } else {
        Err(DrawError::InvalidValues(format!(
            "matchUp {} does not have two participants",
            match_up.match_up_id
        )))
    }
}

/// Rules 5 to 8 for a matchUp without a result
fn fresh_transition(
    draw: &DrawDefinition,
    location: &MatchUpLocation,
    match_up: &MatchUp,
    status: MatchUpStatus,
) -> DrawResult<Transition> {
    match status.category() {
        StatusCategory::NonDirecting => Ok(NonDirecting.into()),
        StatusCategory::Bye => {
            if match_up.is_active() || match_up.is_decided() {
                return Err(DrawError::InvalidStatusTransition {
                    from: match_up.match_up_status,
                    to: status,
                });
            }
            let structure = draw.structure(&location.structure_id)?;
            let vacant: Vec<DrawPosition> = match_up
                .draw_positions
                .iter()
                .flatten()
                .copied()
                .filter(|draw_position| {
                    structure
                        .assignment(*draw_position)
                        .is_some_and(|assignment| assignment.is_vacant())
                })
                .collect();
            match vacant.as_slice() {
                [draw_position] => Ok(AssignBye {
                    draw_position: *draw_position,
                }
                .into()),
                _ => Err(DrawError::InvalidValues(format!(
                    "matchUp {} needs exactly one vacant position to take a bye",
                    match_up.match_up_id
                ))),
            }
        }
        StatusCategory::Directing => Ok(DirectWinner.into()),
        StatusCategory::ExitPair => Ok(ExitPair.into()),
    }
}

/// Pick the transition for a request, first matching rule wins
pub(crate) fn classify(
    draw: &DrawDefinition,
    location: &MatchUpLocation,
    request: &StatusRequest,
) -> DrawResult<Transition> {
    let match_up = draw.match_up(location)?;
    let Some(status) = resolve_status(request)? else {
        if location.tie_parent_id.is_some() {
            return Ok(TieChildResult.into());
        }
        return Ok(if match_up.is_decided() {
            ScoreOnly.into()
        } else {
            ModifyScore.into()
        });
    };

    if status == match_up.match_up_status
        && request.winning_side == match_up.winning_side
        && request.score == match_up.score
    {
        return Ok(NoChange.into());
    }
    validate_shape(status, request)?;

    if let Some(parent_id) = &location.tie_parent_id {
        if status == MatchUpStatus::Bye {
            return Err(DrawError::InvalidStatusTransition {
                from: match_up.match_up_status,
                to: status,
            });
        }
        if status.is_decided() {
            let parent = draw.structure_match_up(&location.structure_id, parent_id)?;
            ensure_ready(draw, &location.structure_id, parent)?;
        }
        return Ok(TieChildResult.into());
    }

    if match_up.match_up_status == MatchUpStatus::Bye || match_up.produced_exit {
        return Err(DrawError::InvalidStatusTransition {
            from: match_up.match_up_status,
            to: status,
        });
    }
    if status.is_decided() {
        ensure_ready(draw, &location.structure_id, match_up)?;
    }

    let current = match_up.match_up_status;
    if status.is_directing()
        && current.is_directing()
        && request.winning_side == match_up.winning_side
    {
        return Ok(ScoreOnly.into());
    }
    if status.is_exit_pair() && current.is_decided() {
        return Ok(ReplaceWithExitPair.into());
    }
    if current.is_decided() {
        if status == MatchUpStatus::Bye {
            return Err(DrawError::InvalidStatusTransition {
                from: current,
                to: status,
            });
        }
        let follow_up = fresh_transition(draw, location, match_up, status)?;
        return Ok(ClearDecided {
            follow_up: Box::new(follow_up),
        }
        .into());
    }
    fresh_transition(draw, location, match_up, status)
}

/// Classify a request against the stored record and apply it
pub(crate) fn set_status(
    propagator: &mut Propagator<'_>,
    location: MatchUpLocation,
    request: &StatusRequest,
) -> DrawResult<()> {
    let transition = classify(propagator.draw, &location, request)?;
    let current = propagator.draw.match_up(&location)?.match_up_status;
    let status = resolve_status(request)?.unwrap_or(current);
    log::debug!(
        "matchUp {} {} -> {}: {:?}",
        location.match_up_id,
        current,
        status,
        transition
    );
    let mut ctx = TransitionContext {
        propagator,
        location,
        status,
        winning_side: request.winning_side,
        score: request.score.clone(),
    };
    transition.apply(&mut ctx)
}
