//! Worklist propagation of outcomes through the link graph.
//!
//! Every change to a matchUp's outcome is expressed as steps on an explicit
//! LIFO stack. A step that changes a slot pushes a `Settle` for the matchUp
//! owning that slot; settling re-derives auto-resolved outcomes (byes and
//! produced exits) and pushes further advance/retract steps. Retractions are
//! pushed last so they run before the matching re-advance.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::graph::{self, PositionTarget, SlotTarget};
use crate::matchups::{SideState, side_states};
use crate::model::{
    DrawDefinition, DrawError, DrawPosition, DrawResult, MatchUp, MatchUpId, MatchUpStatus,
    Occupant, Side, StructureId, StructureShape,
};
use crate::notifications::Notification;
use crate::policy::ProgressionPolicy;

/// Occupant sent to a position in a linked structure
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct LoserPlacement {
    pub target: PositionTarget,
    pub occupant: Occupant,
}

/// What a decided matchUp sent forward
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Directed {
    /// Winner drawPosition copied into the next-round slot
    pub winner_position: DrawPosition,
    pub losers: Vec<LoserPlacement>,
}

/// Counters for one propagation call
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PropagationReport {
    pub steps: usize,
    /// Double-exit advancements, including escalations
    pub double_exit_steps: usize,
    pub positions_changed: usize,
}

#[derive(Debug)]
enum Step {
    Advance {
        structure_id: StructureId,
        match_up_id: MatchUpId,
    },
    Settle {
        structure_id: StructureId,
        match_up_id: MatchUpId,
        /// Captured before the caller changed the record; recomputed when absent
        prior: Option<Directed>,
    },
    Retract {
        structure_id: StructureId,
        match_up_id: MatchUpId,
        directed: Directed,
    },
    DoubleExit {
        structure_id: StructureId,
        match_up_id: MatchUpId,
    },
    RetractDoubleExit {
        structure_id: StructureId,
        match_up_id: MatchUpId,
    },
}

impl Step {
    fn match_up_id(&self) -> &str {
        match self {
            Step::Advance { match_up_id, .. }
            | Step::Settle { match_up_id, .. }
            | Step::Retract { match_up_id, .. }
            | Step::DoubleExit { match_up_id, .. }
            | Step::RetractDoubleExit { match_up_id, .. } => match_up_id,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum EdgeKind {
    Advance,
    DoubleExit,
}

type Edge = (MatchUpId, String, EdgeKind, Option<DrawPosition>);

/// What a decided or bye-resolved matchUp directs forward, read from its record
pub(crate) fn directed(
    draw: &DrawDefinition,
    structure_id: &str,
    match_up: &MatchUp,
) -> DrawResult<Option<Directed>> {
    let Some(winning_side) = match_up.winning_side else {
        return Ok(None);
    };
    let status = match_up.match_up_status;
    if !(status.is_directing() || status == MatchUpStatus::Bye) {
        return Ok(None);
    }
    let Some(winner_position) = match_up.draw_position(winning_side) else {
        return Ok(None);
    };
    // A participant loser moves on whatever the status; an empty or bye side sends a bye.
    let structure = draw.structure(structure_id)?;
    let loser = match match_up
        .draw_position(winning_side.opposite())
        .and_then(|draw_position| structure.assignment(draw_position))
        .and_then(|assignment| assignment.occupant.as_ref())
    {
        Some(Occupant::Participant(participant_id)) if status != MatchUpStatus::Bye => {
            Occupant::Participant(participant_id.clone())
        }
        _ => Occupant::Bye,
    };

    let mut losers = Vec::new();
    let held = status == MatchUpStatus::Bye
        && graph::holds_first_match_position(draw, structure_id, match_up.round_number);
    if !held {
        if let Some(target) = graph::loser_target(draw, structure_id, &match_up.match_up_id)? {
            losers.push(LoserPlacement {
                target,
                occupant: loser.clone(),
            });
        }
    }
    for (side, target) in graph::first_match_targets(draw, structure_id, match_up)? {
        let occupant = if side == winning_side {
            Occupant::Bye
        } else {
            loser.clone()
        };
        losers.push(LoserPlacement { target, occupant });
    }
    Ok(Some(Directed {
        winner_position,
        losers,
    }))
}

/// Outcome implied by the side states of an undecided, inactive matchUp
fn auto_resolution(sides: &[SideState; 2]) -> (MatchUpStatus, Option<Side>, bool) {
    match sides {
        [
            SideState::EmptyExit { source_status: one },
            SideState::EmptyExit { source_status: two },
        ] => {
            let status = if *one == MatchUpStatus::DoubleDefault
                && *two == MatchUpStatus::DoubleDefault
            {
                MatchUpStatus::DoubleDefault
            } else {
                MatchUpStatus::DoubleWalkover
            };
            (status, None, true)
        }
        [SideState::EmptyExit { source_status }, other] => (
            source_status.single_exit().unwrap_or(MatchUpStatus::Walkover),
            other.is_advanceable().then_some(Side::Two),
            true,
        ),
        [other, SideState::EmptyExit { source_status }] => (
            source_status.single_exit().unwrap_or(MatchUpStatus::Walkover),
            other.is_advanceable().then_some(Side::One),
            true,
        ),
        [one, two] if one.is_bye() || two.is_bye() => {
            let winning_side = (one.is_advanceable() && two.is_advanceable()).then(|| {
                if one.is_bye() && !two.is_bye() {
                    Side::Two
                } else {
                    Side::One
                }
            });
            (MatchUpStatus::Bye, winning_side, false)
        }
        _ => (MatchUpStatus::ToBePlayed, None, false),
    }
}

fn set_slot(match_up: &mut MatchUp, side: Side, draw_position: Option<DrawPosition>) {
    match_up.draw_positions[side.index()] = draw_position;
    for child in &mut match_up.tie_match_ups {
        child.draw_positions[side.index()] = draw_position;
    }
}

pub(crate) struct Propagator<'a> {
    pub draw: &'a mut DrawDefinition,
    pub policy: &'a ProgressionPolicy,
    stack: Vec<Step>,
    visited: HashSet<Edge>,
    pub report: PropagationReport,
    pub notifications: Vec<Notification>,
    pub modified_structures: BTreeSet<StructureId>,
}

impl<'a> Propagator<'a> {
    pub fn new(draw: &'a mut DrawDefinition, policy: &'a ProgressionPolicy) -> Self {
        Self {
            draw,
            policy,
            stack: Vec::new(),
            visited: HashSet::new(),
            report: PropagationReport::default(),
            notifications: Vec::new(),
            modified_structures: BTreeSet::new(),
        }
    }

    pub fn push_advance(&mut self, structure_id: &str, match_up_id: &str) {
        self.stack.push(Step::Advance {
            structure_id: structure_id.to_string(),
            match_up_id: match_up_id.to_string(),
        });
    }

    pub fn push_double_exit(&mut self, structure_id: &str, match_up_id: &str) {
        self.stack.push(Step::DoubleExit {
            structure_id: structure_id.to_string(),
            match_up_id: match_up_id.to_string(),
        });
    }

    pub fn push_retract(&mut self, structure_id: &str, match_up_id: &str, directed: Directed) {
        self.stack.push(Step::Retract {
            structure_id: structure_id.to_string(),
            match_up_id: match_up_id.to_string(),
            directed,
        });
    }

    pub fn push_retract_double_exit(&mut self, structure_id: &str, match_up_id: &str) {
        self.stack.push(Step::RetractDoubleExit {
            structure_id: structure_id.to_string(),
            match_up_id: match_up_id.to_string(),
        });
    }

    pub fn push_settle(&mut self, structure_id: &str, match_up_id: &str) {
        self.stack.push(Step::Settle {
            structure_id: structure_id.to_string(),
            match_up_id: match_up_id.to_string(),
            prior: None,
        });
    }

    /// Drain the worklist. Visited edges are reset once the phase completes.
    pub fn run(&mut self) -> DrawResult<()> {
        while let Some(step) = self.stack.pop() {
            self.report.steps += 1;
            if self.report.steps > self.policy.max_propagation_steps {
                return Err(DrawError::PropagationCycle(step.match_up_id().to_string()));
            }
            match step {
                Step::Advance {
                    structure_id,
                    match_up_id,
                } => self.advance(&structure_id, &match_up_id)?,
                Step::Settle {
                    structure_id,
                    match_up_id,
                    prior,
                } => self.settle(&structure_id, &match_up_id, prior)?,
                Step::Retract {
                    structure_id,
                    match_up_id,
                    directed,
                } => self.retract(&structure_id, &match_up_id, &directed)?,
                Step::DoubleExit {
                    structure_id,
                    match_up_id,
                } => self.double_exit(&structure_id, &match_up_id)?,
                Step::RetractDoubleExit {
                    structure_id,
                    match_up_id,
                } => self.retract_double_exit(&structure_id, &match_up_id)?,
            }
        }
        self.visited.clear();
        Ok(())
    }

    /// Re-direct a matchUp whose record was changed in place
    pub fn redirect(
        &mut self,
        structure_id: &str,
        match_up_id: &str,
        before: Option<Directed>,
    ) -> DrawResult<()> {
        let match_up = self.draw.structure_match_up(structure_id, match_up_id)?;
        let after = directed(self.draw, structure_id, match_up)?;
        if after != before {
            if after.is_some() {
                self.push_advance(structure_id, match_up_id);
            }
            if let Some(before) = before {
                self.push_retract(structure_id, match_up_id, before);
            }
        }
        self.run()
    }

    fn visit(
        &mut self,
        from: &str,
        to: String,
        kind: EdgeKind,
        draw_position: Option<DrawPosition>,
    ) -> DrawResult<()> {
        if !self
            .visited
            .insert((from.to_string(), to, kind, draw_position))
        {
            return Err(DrawError::PropagationCycle(from.to_string()));
        }
        Ok(())
    }

    pub fn note_match_up(&mut self, structure_id: &str, match_up: &MatchUp) {
        self.modified_structures.insert(structure_id.to_string());
        self.notifications.push(Notification::MatchUpModified {
            structure_id: structure_id.to_string(),
            match_up_id: match_up.match_up_id.clone(),
            match_up_status: match_up.match_up_status,
            winning_side: match_up.winning_side,
        });
    }

    fn note_position(
        &mut self,
        structure_id: &str,
        draw_position: DrawPosition,
        occupant: Option<Occupant>,
    ) {
        self.report.positions_changed += 1;
        self.modified_structures.insert(structure_id.to_string());
        self.notifications.push(Notification::PositionChanged {
            structure_id: structure_id.to_string(),
            draw_position,
            occupant,
        });
    }

    /// MatchUps whose slot for a drawPosition is filled by position assignment:
    /// the first elimination matchUp, or every group matchUp.
    pub fn position_match_ups(
        &self,
        structure_id: &str,
        draw_position: DrawPosition,
    ) -> DrawResult<Vec<MatchUpId>> {
        let structure = self.draw.structure(structure_id)?;
        if structure.shape == StructureShape::Elimination {
            return Ok(structure
                .first_match_up_with(draw_position)
                .map(|match_up| vec![match_up.match_up_id.clone()])
                .unwrap_or_default());
        }
        let mut match_ups: Vec<&MatchUp> = structure
            .match_ups
            .iter()
            .filter(|match_up| match_up.has_draw_position(draw_position))
            .collect();
        match_ups.sort_by_key(|match_up| (match_up.round_number, match_up.round_position));
        Ok(match_ups
            .into_iter()
            .map(|match_up| match_up.match_up_id.clone())
            .collect())
    }

    fn ensure_inactive_at(&self, structure_id: &str, draw_position: DrawPosition) -> DrawResult<()> {
        let structure = self.draw.structure(structure_id)?;
        if let Some(active) = structure
            .match_ups
            .iter()
            .find(|match_up| match_up.has_draw_position(draw_position) && match_up.is_active())
        {
            return Err(DrawError::CannotChangeWinningSide(active.match_up_id.clone()));
        }
        Ok(())
    }

    pub fn is_active_at(&self, structure_id: &str, draw_position: DrawPosition) -> DrawResult<bool> {
        Ok(self.ensure_inactive_at(structure_id, draw_position).is_err())
    }

    /// Put an occupant into an empty position. Returns false when it is already there.
    pub fn place_occupant(
        &mut self,
        structure_id: &str,
        draw_position: DrawPosition,
        occupant: Occupant,
    ) -> DrawResult<bool> {
        let structure = self.draw.structure_mut(structure_id)?;
        if let Occupant::Participant(participant_id) = &occupant {
            match structure.participant_position(participant_id) {
                Some(existing) if existing != draw_position => {
                    return Err(DrawError::ParticipantAlreadyAssigned {
                        participant_id: participant_id.clone(),
                        draw_position: existing,
                    });
                }
                _ => {}
            }
        }
        let assignment =
            structure
                .assignment_mut(draw_position)
                .ok_or_else(|| DrawError::InvalidDrawPosition {
                    structure_id: structure_id.to_string(),
                    draw_position,
                })?;
        match assignment.occupant.clone() {
            Some(existing) if existing == occupant => Ok(false),
            Some(_) => Err(DrawError::DrawPositionAssigned {
                structure_id: structure_id.to_string(),
                draw_position,
            }),
            None => {
                assignment.occupant = Some(occupant.clone());
                self.note_position(structure_id, draw_position, Some(occupant));
                Ok(true)
            }
        }
    }

    /// Remove an occupant from a position when it still holds `expected`.
    /// Returns false when the position holds something else.
    pub fn remove_occupant(
        &mut self,
        structure_id: &str,
        draw_position: DrawPosition,
        expected: &Occupant,
    ) -> DrawResult<bool> {
        let holds_expected = self
            .draw
            .structure(structure_id)?
            .assignment(draw_position)
            .is_some_and(|assignment| assignment.occupant.as_ref() == Some(expected));
        if !holds_expected {
            return Ok(false);
        }
        self.ensure_inactive_at(structure_id, draw_position)?;
        if let Some(assignment) = self
            .draw
            .structure_mut(structure_id)?
            .assignment_mut(draw_position)
        {
            assignment.occupant = None;
            assignment.qualified_from = None;
        }
        self.note_position(structure_id, draw_position, None);
        Ok(true)
    }

    /// Push a settle for every matchUp fed by a position
    pub fn settle_position(&mut self, structure_id: &str, draw_position: DrawPosition) -> DrawResult<()> {
        let match_up_ids = self.position_match_ups(structure_id, draw_position)?;
        for match_up_id in match_up_ids.iter().rev() {
            self.push_settle(structure_id, match_up_id);
        }
        Ok(())
    }

    fn fill_slot(&mut self, target: &SlotTarget, draw_position: DrawPosition) -> DrawResult<bool> {
        let match_up = self
            .draw
            .structure_match_up_mut(&target.structure_id, &target.match_up_id)?;
        match match_up.draw_position(target.side) {
            Some(existing) if existing == draw_position => Ok(false),
            Some(existing) => Err(DrawError::DrawPositionAssigned {
                structure_id: target.structure_id.clone(),
                draw_position: existing,
            }),
            None => {
                set_slot(match_up, target.side, Some(draw_position));
                log::debug!(
                    "drawPosition {} advanced into matchUp {} side {}",
                    draw_position,
                    target.match_up_id,
                    target.side
                );
                Ok(true)
            }
        }
    }

    fn vacate_slot(&mut self, target: &SlotTarget, draw_position: DrawPosition) -> DrawResult<bool> {
        let match_up = self
            .draw
            .structure_match_up(&target.structure_id, &target.match_up_id)?;
        if match_up.draw_position(target.side) != Some(draw_position) {
            return Ok(false);
        }
        if match_up.is_active() {
            return Err(DrawError::CannotChangeWinningSide(match_up.match_up_id.clone()));
        }
        let prior = directed(self.draw, &target.structure_id, match_up)?;
        let match_up = self
            .draw
            .structure_match_up_mut(&target.structure_id, &target.match_up_id)?;
        set_slot(match_up, target.side, None);
        log::debug!(
            "drawPosition {} removed from matchUp {} side {}",
            draw_position,
            target.match_up_id,
            target.side
        );
        self.stack.push(Step::Settle {
            structure_id: target.structure_id.clone(),
            match_up_id: target.match_up_id.clone(),
            prior,
        });
        Ok(true)
    }

    fn advance(&mut self, structure_id: &str, match_up_id: &str) -> DrawResult<()> {
        let match_up = self.draw.structure_match_up(structure_id, match_up_id)?;
        let Some(directed) = directed(self.draw, structure_id, match_up)? else {
            return Ok(());
        };
        let winner_target = graph::winner_target(self.draw, structure_id, match_up_id)?;

        let mut winner_settle = None;
        if let Some(target) = winner_target {
            self.visit(
                match_up_id,
                target.match_up_id.clone(),
                EdgeKind::Advance,
                Some(directed.winner_position),
            )?;
            if self.fill_slot(&target, directed.winner_position)? {
                winner_settle = Some(target);
            }
        }
        let mut loser_settles = Vec::new();
        for LoserPlacement { target, occupant } in directed.losers {
            self.visit(
                match_up_id,
                target.structure_id.clone(),
                EdgeKind::Advance,
                Some(target.draw_position),
            )?;
            if self.place_occupant(&target.structure_id, target.draw_position, occupant)? {
                log::debug!(
                    "matchUp {} loser placed at {} drawPosition {}",
                    match_up_id,
                    target.structure_id,
                    target.draw_position
                );
                loser_settles.push(target);
            }
        }

        // LIFO: the winner side settles first.
        for target in loser_settles.iter().rev() {
            self.settle_position(&target.structure_id, target.draw_position)?;
        }
        if let Some(target) = winner_settle {
            self.push_settle(&target.structure_id, &target.match_up_id);
        }
        Ok(())
    }

    fn retract(&mut self, structure_id: &str, match_up_id: &str, directed: &Directed) -> DrawResult<()> {
        let winner_target = graph::winner_target(self.draw, structure_id, match_up_id)?;

        for LoserPlacement { target, occupant } in &directed.losers {
            if self.remove_occupant(&target.structure_id, target.draw_position, occupant)? {
                self.settle_position(&target.structure_id, target.draw_position)?;
            }
        }
        if let Some(target) = winner_target {
            // pushes its own settle with the pre-removal snapshot
            self.vacate_slot(&target, directed.winner_position)?;
        }
        Ok(())
    }

    fn settle(&mut self, structure_id: &str, match_up_id: &str, prior: Option<Directed>) -> DrawResult<()> {
        let match_up = self.draw.structure_match_up(structure_id, match_up_id)?;
        if match_up.is_active() {
            return Ok(());
        }
        let before = match prior {
            Some(prior) => Some(prior),
            None => directed(self.draw, structure_id, match_up)?,
        };
        let was_exit_pair = match_up.match_up_status.is_exit_pair();
        let sides = side_states(self.draw, structure_id, match_up)?;
        let (status, winning_side, produced) = auto_resolution(&sides);

        let changed = match_up.match_up_status != status
            || match_up.winning_side != winning_side
            || match_up.produced_exit != produced;
        if changed {
            let match_up = self.draw.structure_match_up_mut(structure_id, match_up_id)?;
            match_up.match_up_status = status;
            match_up.winning_side = winning_side;
            match_up.produced_exit = produced;
            match_up.score = None;
            let match_up = match_up.clone();
            log::debug!(
                "matchUp {} resolved to {} (winning side {:?})",
                match_up_id,
                status,
                winning_side
            );
            self.note_match_up(structure_id, &match_up);
        }

        let match_up = self.draw.structure_match_up(structure_id, match_up_id)?;
        let after = directed(self.draw, structure_id, match_up)?;
        if after.is_some() && after != before {
            self.push_advance(structure_id, match_up_id);
        }
        if status.is_exit_pair() && !was_exit_pair {
            self.push_double_exit(structure_id, match_up_id);
        }
        if !status.is_exit_pair() && was_exit_pair {
            self.push_retract_double_exit(structure_id, match_up_id);
        }
        if let Some(before) = before {
            if after.as_ref() != Some(&before) {
                self.push_retract(structure_id, match_up_id, before);
            }
        }
        Ok(())
    }

    fn first_match_targets(
        &self,
        structure_id: &str,
        match_up_id: &str,
    ) -> DrawResult<Vec<PositionTarget>> {
        let match_up = self.draw.structure_match_up(structure_id, match_up_id)?;
        Ok(graph::first_match_targets(self.draw, structure_id, match_up)?
            .into_iter()
            .map(|(_, target)| target)
            .collect())
    }

    fn double_exit(&mut self, structure_id: &str, match_up_id: &str) -> DrawResult<()> {
        self.visit(match_up_id, match_up_id.to_string(), EdgeKind::DoubleExit, None)?;
        self.report.double_exit_steps += 1;
        log::debug!("double exit at matchUp {}", match_up_id);

        let winner_target = graph::winner_target(self.draw, structure_id, match_up_id)?;
        let loser_target = graph::loser_target(self.draw, structure_id, match_up_id)?;
        if let Some(target) = loser_target {
            if self.policy.propagate_bye_on_double_exit {
                self.place_occupant(&target.structure_id, target.draw_position, Occupant::Bye)?;
            }
            self.settle_position(&target.structure_id, target.draw_position)?;
        }
        // held positions would otherwise wait for a loser that never comes
        for target in self.first_match_targets(structure_id, match_up_id)? {
            self.place_occupant(&target.structure_id, target.draw_position, Occupant::Bye)?;
            self.settle_position(&target.structure_id, target.draw_position)?;
        }
        if let Some(target) = winner_target {
            self.push_settle(&target.structure_id, &target.match_up_id);
        }
        Ok(())
    }

    fn retract_double_exit(&mut self, structure_id: &str, match_up_id: &str) -> DrawResult<()> {
        let winner_target = graph::winner_target(self.draw, structure_id, match_up_id)?;
        let loser_target = graph::loser_target(self.draw, structure_id, match_up_id)?;
        if let Some(target) = loser_target {
            if self.policy.propagate_bye_on_double_exit {
                self.remove_occupant(&target.structure_id, target.draw_position, &Occupant::Bye)?;
            } else {
                self.ensure_inactive_at(&target.structure_id, target.draw_position)?;
            }
            self.settle_position(&target.structure_id, target.draw_position)?;
        }
        for target in self.first_match_targets(structure_id, match_up_id)? {
            if self.remove_occupant(&target.structure_id, target.draw_position, &Occupant::Bye)? {
                self.settle_position(&target.structure_id, target.draw_position)?;
            }
        }
        if let Some(target) = winner_target {
            let match_up = self
                .draw
                .structure_match_up(&target.structure_id, &target.match_up_id)?;
            if match_up.is_active() {
                return Err(DrawError::CannotChangeWinningSide(match_up.match_up_id.clone()));
            }
            self.push_settle(&target.structure_id, &target.match_up_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders;
    use crate::matchups::SideState;

    fn participant(draw_position: DrawPosition) -> SideState {
        SideState::Participant {
            draw_position,
            participant_id: format!("p{draw_position}"),
        }
    }

    #[test]
    fn test_auto_resolution_rules() {
        let exit = SideState::EmptyExit {
            source_status: MatchUpStatus::DoubleWalkover,
        };
        let default_exit = SideState::EmptyExit {
            source_status: MatchUpStatus::DoubleDefault,
        };
        let pending = SideState::Pending {
            draw_position: None,
        };
        let bye = SideState::Bye { draw_position: 2 };

        assert_eq!(
            auto_resolution(&[exit.clone(), default_exit.clone()]),
            (MatchUpStatus::DoubleWalkover, None, true)
        );
        assert_eq!(
            auto_resolution(&[default_exit.clone(), default_exit.clone()]),
            (MatchUpStatus::DoubleDefault, None, true)
        );
        assert_eq!(
            auto_resolution(&[default_exit, participant(3)]),
            (MatchUpStatus::Defaulted, Some(Side::Two), true)
        );
        assert_eq!(
            auto_resolution(&[pending.clone(), exit]),
            (MatchUpStatus::Walkover, None, true)
        );
        assert_eq!(
            auto_resolution(&[participant(1), bye.clone()]),
            (MatchUpStatus::Bye, Some(Side::One), false)
        );
        assert_eq!(
            auto_resolution(&[bye.clone(), pending.clone()]),
            (MatchUpStatus::Bye, None, false)
        );
        assert_eq!(
            auto_resolution(&[participant(1), pending]),
            (MatchUpStatus::ToBePlayed, None, false)
        );
    }

    #[test]
    fn test_directed_reads_loser_occupant() {
        let mut draw = builders::first_match_loser_consolation("d", 8);
        let structure_id = draw.structures[0].structure_id.clone();
        let consolation_id = draw.structures[1].structure_id.clone();
        let main = &mut draw.structures[0];
        for (draw_position, id) in [(1, "a"), (2, "b"), (3, "c"), (4, "d")] {
            main.assignment_mut(draw_position).unwrap().occupant =
                Some(Occupant::Participant(id.to_string()));
        }
        let mut match_up = main.match_up_at(1, 1).unwrap().clone();
        assert_eq!(directed(&draw, &structure_id, &match_up).unwrap(), None);

        match_up.match_up_status = MatchUpStatus::Completed;
        match_up.winning_side = Some(Side::Two);
        let first_loser = LoserPlacement {
            target: PositionTarget {
                structure_id: consolation_id.clone(),
                draw_position: 1,
            },
            occupant: Occupant::Participant("a".to_string()),
        };
        assert_eq!(
            directed(&draw, &structure_id, &match_up).unwrap(),
            Some(Directed {
                winner_position: 2,
                losers: vec![first_loser.clone()],
            })
        );

        match_up.match_up_status = MatchUpStatus::Walkover;
        assert_eq!(
            directed(&draw, &structure_id, &match_up).unwrap().unwrap().losers,
            vec![first_loser]
        );

        let mut single = builders::single_elimination("s", 4);
        let single_id = single.structures[0].structure_id.clone();
        for (draw_position, id) in [(1, "a"), (2, "b")] {
            single.structures[0].assignment_mut(draw_position).unwrap().occupant =
                Some(Occupant::Participant(id.to_string()));
        }
        let mut final_four = single.structures[0].match_up_at(1, 1).unwrap().clone();
        final_four.match_up_status = MatchUpStatus::Walkover;
        final_four.winning_side = Some(Side::One);
        assert!(
            directed(&single, &single_id, &final_four)
                .unwrap()
                .unwrap()
                .losers
                .is_empty()
        );
    }

    #[test]
    fn test_bye_holds_position_for_second_round_loser() {
        let mut draw = builders::first_match_loser_consolation("d", 8);
        let structure_id = draw.structures[0].structure_id.clone();
        let consolation_id = draw.structures[1].structure_id.clone();
        let main = &mut draw.structures[0];
        main.assignment_mut(1).unwrap().occupant = Some(Occupant::Participant("a".to_string()));
        main.assignment_mut(2).unwrap().occupant = Some(Occupant::Bye);
        main.assignment_mut(3).unwrap().occupant = Some(Occupant::Participant("c".to_string()));
        let bye_id = main.match_up_at(1, 1).unwrap().match_up_id.clone();
        {
            let bye = main.match_up_mut(&bye_id).unwrap();
            bye.match_up_status = MatchUpStatus::Bye;
            bye.winning_side = Some(Side::One);
        }
        let bye = main.match_up_at(1, 1).unwrap().clone();
        assert!(
            directed(&draw, &structure_id, &bye)
                .unwrap()
                .unwrap()
                .losers
                .is_empty()
        );

        let mut second = draw.structures[0].match_up_at(2, 1).unwrap().clone();
        second.draw_positions = [Some(1), Some(3)];
        second.match_up_status = MatchUpStatus::Completed;
        second.winning_side = Some(Side::Two);
        let held = PositionTarget {
            structure_id: consolation_id,
            draw_position: 1,
        };
        assert_eq!(
            directed(&draw, &structure_id, &second).unwrap().unwrap().losers,
            vec![LoserPlacement {
                target: held.clone(),
                occupant: Occupant::Participant("a".to_string()),
            }]
        );

        second.winning_side = Some(Side::One);
        assert_eq!(
            directed(&draw, &structure_id, &second).unwrap().unwrap().losers,
            vec![LoserPlacement {
                target: held,
                occupant: Occupant::Bye,
            }]
        );
    }

    #[test]
    fn test_bye_placement_advances_opponent() {
        let mut draw = builders::single_elimination("d", 4);
        let structure_id = draw.structures[0].structure_id.clone();
        draw.structures[0].assignment_mut(1).unwrap().occupant =
            Some(Occupant::Participant("a".to_string()));
        let policy = ProgressionPolicy::default();

        let mut propagator = Propagator::new(&mut draw, &policy);
        assert!(propagator.place_occupant(&structure_id, 2, Occupant::Bye).unwrap());
        propagator.settle_position(&structure_id, 2).unwrap();
        propagator.run().unwrap();
        assert_eq!(propagator.report.positions_changed, 1);

        let main = &draw.structures[0];
        assert_eq!(main.match_up_at(1, 1).unwrap().winning_side, Some(Side::One));
        assert_eq!(main.match_up_at(2, 1).unwrap().draw_positions, [Some(1), None]);
    }

    #[test]
    fn test_step_budget_is_enforced() {
        let mut draw = builders::single_elimination("d", 4);
        let structure_id = draw.structures[0].structure_id.clone();
        let match_up_id = draw.structures[0].match_ups[0].match_up_id.clone();
        let policy = ProgressionPolicy {
            max_propagation_steps: 1,
            ..ProgressionPolicy::default()
        };
        let mut propagator = Propagator::new(&mut draw, &policy);
        propagator.push_settle(&structure_id, &match_up_id);
        propagator.push_settle(&structure_id, &match_up_id);
        let err = propagator.run().unwrap_err();
        assert_eq!(err.code(), "PROPAGATION_CYCLE");
    }
}
