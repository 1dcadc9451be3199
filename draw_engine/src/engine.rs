//! Public entry points.
//!
//! Every mutating call runs against a working copy of the draw. The copy
//! replaces the caller's draw only when the whole operation succeeded, and
//! the collected notifications are published after that commit. Errors are
//! tagged with the name of the entry point.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::matchups::{self, MatchUpView};
use crate::model::{
    DrawDefinition, DrawError, DrawPosition, DrawResult, MatchUpId, MatchUpStatus, ParticipantId,
    Score, Side, StructureId, StructureShape, TagError,
};
use crate::notifications::{AuditRecord, NoopSink, Notification, NotificationSink};
use crate::policy::{EngineConfig, PolicyProvider, StaticPolicy, TallyPolicy};
use crate::positions::{self, AssignmentInput};
use crate::progression::{
    self, PropagationReport, Propagator, QualifierActions, StatusRequest, winner_participant,
};
use crate::round_robin::{
    self, GroupTally, ParticipantResult, PlayoffPlacement, connected_structure_ids, tally_group,
    write_tally,
};

/// Parameters of `set_match_up_status`
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SetMatchUpStatusParams {
    pub match_up_id: MatchUpId,
    pub match_up_status: Option<MatchUpStatus>,
    pub winning_side: Option<Side>,
    pub score: Option<Score>,
}

impl SetMatchUpStatusParams {
    pub fn new(match_up_id: impl Into<MatchUpId>, match_up_status: MatchUpStatus) -> Self {
        Self {
            match_up_id: match_up_id.into(),
            match_up_status: Some(match_up_status),
            ..Self::default()
        }
    }

    pub fn with_winning_side(mut self, winning_side: Side) -> Self {
        self.winning_side = Some(winning_side);
        self
    }

    pub fn with_score(mut self, score: Score) -> Self {
        self.score = Some(score);
        self
    }

    fn request(&self) -> StatusRequest {
        StatusRequest {
            match_up_status: self.match_up_status,
            winning_side: self.winning_side,
            score: self.score.clone(),
        }
    }
}

/// Result of a matchUp status change
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct MatchUpOutcome {
    pub qualifier: QualifierActions,
    /// Downstream structures that consumed a group order which has now changed
    pub connected_structure_ids: Vec<StructureId>,
    pub propagation: PropagationReport,
}

impl MatchUpOutcome {
    pub fn qualifier_placed(&self) -> bool {
        self.qualifier.placed.is_some() && self.qualifier.replaced.is_none()
    }

    pub fn qualifier_replaced(&self) -> bool {
        self.qualifier.replaced.is_some()
    }

    pub fn qualifier_removed(&self) -> bool {
        self.qualifier.removed.is_some()
    }
}

/// Draw progression engine
#[derive(Clone)]
pub struct DrawEngine {
    policy: Arc<dyn PolicyProvider>,
    sink: Arc<dyn NotificationSink>,
}

impl Default for DrawEngine {
    fn default() -> Self {
        Self::new(Arc::new(StaticPolicy::default()), Arc::new(NoopSink))
    }
}

impl DrawEngine {
    pub fn new(policy: Arc<dyn PolicyProvider>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { policy, sink }
    }

    /// Engine over a validated static configuration
    pub fn from_config(config: EngineConfig) -> DrawResult<Self> {
        config.validate()?;
        Ok(Self::new(Arc::new(StaticPolicy::new(config)), Arc::new(NoopSink)))
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn PolicyProvider>) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &Arc<dyn PolicyProvider> {
        &self.policy
    }

    /// Run `op` on a working copy; commit and publish only on success
    fn transact<T>(
        &self,
        draw: &mut DrawDefinition,
        method: &'static str,
        detail: serde_json::Value,
        op: impl FnOnce(&mut Propagator<'_>, &TallyPolicy) -> DrawResult<T>,
    ) -> DrawResult<(T, PropagationReport)> {
        let progression = self.policy.progression_policy();
        let tally = self.policy.tally_policy();
        let mut working = draw.clone();

        let (value, notifications, report) = {
            let mut propagator = Propagator::new(&mut working, &progression);
            let value = op(&mut propagator, &tally).tag(method)?;
            (
                value,
                std::mem::take(&mut propagator.notifications),
                propagator.report.clone(),
            )
        };

        *draw = working;
        log::debug!(
            "{} committed on draw {} ({} steps, {} positions changed)",
            method,
            draw.draw_id,
            report.steps,
            report.positions_changed
        );
        for notification in notifications {
            self.sink.publish(notification);
        }
        self.sink.publish(Notification::Audit(AuditRecord::new(
            method,
            &draw.draw_id,
            detail,
        )));
        Ok((value, report))
    }

    /// Set a matchUp's status, winning side and score
    pub fn set_match_up_status(
        &self,
        draw: &mut DrawDefinition,
        params: &SetMatchUpStatusParams,
    ) -> DrawResult<MatchUpOutcome> {
        let detail = json!({
            "matchUpId": params.match_up_id,
            "matchUpStatus": params.match_up_status,
            "winningSide": params.winning_side,
        });
        let request = params.request();
        let (mut outcome, report) =
            self.transact(draw, "setMatchUpStatus", detail, |propagator, tally| {
                apply_result(propagator, tally, &params.match_up_id, &request)
            })?;
        outcome.propagation = report;
        Ok(outcome)
    }

    /// Decide a matchUp for a side, or clear its result with `None`
    pub fn set_winning_side(
        &self,
        draw: &mut DrawDefinition,
        match_up_id: &str,
        winning_side: Option<Side>,
        score: Option<Score>,
    ) -> DrawResult<MatchUpOutcome> {
        let request = StatusRequest {
            match_up_status: match winning_side {
                Some(_) => Some(MatchUpStatus::Completed),
                None => Some(MatchUpStatus::ToBePlayed),
            },
            winning_side,
            score,
        };
        let detail = json!({ "matchUpId": match_up_id, "winningSide": winning_side });
        let (mut outcome, report) =
            self.transact(draw, "setWinningSide", detail, |propagator, tally| {
                apply_result(propagator, tally, match_up_id, &request)
            })?;
        outcome.propagation = report;
        Ok(outcome)
    }

    /// Bulk position assignment. Returns the number of positions that changed.
    pub fn set_position_assignments(
        &self,
        draw: &mut DrawDefinition,
        structure_id: &str,
        assignments: &[AssignmentInput],
    ) -> DrawResult<usize> {
        let detail = json!({ "structureId": structure_id, "assignments": assignments });
        let (placed, _) =
            self.transact(draw, "setPositionAssignments", detail, |propagator, tally| {
                let placed =
                    positions::set_position_assignments(propagator, structure_id, assignments)?;
                refresh_group_tallies(propagator, structure_id, tally)?;
                Ok(placed)
            })?;
        Ok(placed)
    }

    pub fn assign_participant(
        &self,
        draw: &mut DrawDefinition,
        structure_id: &str,
        draw_position: DrawPosition,
        participant_id: &str,
    ) -> DrawResult<()> {
        let detail = json!({
            "structureId": structure_id,
            "drawPosition": draw_position,
            "participantId": participant_id,
        });
        self.transact(draw, "assignParticipant", detail, |propagator, tally| {
            positions::assign_participant(propagator, structure_id, draw_position, participant_id)?;
            refresh_group_tallies(propagator, structure_id, tally)
        })
        .map(|_| ())
    }

    pub fn assign_bye(
        &self,
        draw: &mut DrawDefinition,
        structure_id: &str,
        draw_position: DrawPosition,
    ) -> DrawResult<()> {
        let detail = json!({ "structureId": structure_id, "drawPosition": draw_position });
        self.transact(draw, "assignBye", detail, |propagator, tally| {
            positions::assign_bye(propagator, structure_id, draw_position)?;
            refresh_group_tallies(propagator, structure_id, tally)
        })
        .map(|_| ())
    }

    pub fn assign_qualifier(
        &self,
        draw: &mut DrawDefinition,
        structure_id: &str,
        draw_position: DrawPosition,
    ) -> DrawResult<()> {
        let detail = json!({ "structureId": structure_id, "drawPosition": draw_position });
        self.transact(draw, "assignQualifier", detail, |propagator, tally| {
            positions::assign_qualifier(propagator, structure_id, draw_position)?;
            refresh_group_tallies(propagator, structure_id, tally)
        })
        .map(|_| ())
    }

    /// Vacate a position. Returns false when it was already empty.
    pub fn clear_draw_position(
        &self,
        draw: &mut DrawDefinition,
        structure_id: &str,
        draw_position: DrawPosition,
    ) -> DrawResult<bool> {
        let detail = json!({ "structureId": structure_id, "drawPosition": draw_position });
        self.transact(draw, "clearDrawPosition", detail, |propagator, tally| {
            let cleared = positions::clear_draw_position(propagator, structure_id, draw_position)?;
            refresh_group_tallies(propagator, structure_id, tally)?;
            Ok(cleared)
        })
        .map(|(cleared, _)| cleared)
    }

    pub fn set_sub_order(
        &self,
        draw: &mut DrawDefinition,
        structure_id: &str,
        draw_position: DrawPosition,
        sub_order: Option<u32>,
    ) -> DrawResult<()> {
        let detail = json!({
            "structureId": structure_id,
            "drawPosition": draw_position,
            "subOrder": sub_order,
        });
        self.transact(draw, "setSubOrder", detail, |propagator, tally| {
            positions::set_sub_order(propagator.draw, structure_id, draw_position, sub_order)?;
            refresh_group_tallies(propagator, structure_id, tally)
        })
        .map(|_| ())
    }

    /// Place qualified participants into the qualifier placeholders of a structure
    pub fn qualifier_progression(
        &self,
        draw: &mut DrawDefinition,
        structure_id: &str,
        round_number: Option<u32>,
    ) -> DrawResult<Vec<ParticipantId>> {
        let detail = json!({ "structureId": structure_id, "roundNumber": round_number });
        self.transact(draw, "qualifierProgression", detail, |propagator, tally| {
            progression::qualifier_progression(propagator, structure_id, round_number, tally)
        })
        .map(|(assigned, _)| assigned)
    }

    /// Tally a group, or every group of a container, and store the results on
    /// the position assignments
    pub fn tally_participant_results(
        &self,
        draw: &mut DrawDefinition,
        structure_id: &str,
    ) -> DrawResult<GroupTally> {
        let detail = json!({ "structureId": structure_id });
        self.transact(draw, "tallyParticipantResults", detail, |propagator, tally| {
            let structure = propagator.draw.structure(structure_id)?;
            let group_ids: Vec<StructureId> = match structure.shape {
                StructureShape::Container | StructureShape::RoundRobinGroup => structure
                    .leaf_structures()
                    .iter()
                    .map(|group| group.structure_id.clone())
                    .collect(),
                _ => {
                    return Err(DrawError::NotRoundRobinGroup(structure_id.to_string()));
                }
            };

            let mut participant_results: BTreeMap<ParticipantId, ParticipantResult> =
                BTreeMap::new();
            let mut bracket_complete = true;
            let mut report = Vec::new();
            for group_id in &group_ids {
                let group_tally = tally_group(propagator.draw, group_id, tally)?;
                write_tally(propagator.draw, &group_tally)?;
                bracket_complete &= group_tally.bracket_complete;
                report.extend(group_tally.report);
                participant_results.extend(group_tally.participant_results);
            }
            Ok(GroupTally {
                structure_id: structure_id.to_string(),
                participant_results,
                bracket_complete,
                report,
            })
        })
        .map(|(tally, _)| tally)
    }

    /// Fill playoff structures from a round robin container's finishing orders
    pub fn automated_playoff_positioning(
        &self,
        draw: &mut DrawDefinition,
        container_id: &str,
    ) -> DrawResult<Vec<PlayoffPlacement>> {
        let detail = json!({ "structureId": container_id });
        self.transact(draw, "automatedPlayoffPositioning", detail, |propagator, tally| {
            round_robin::automated_playoff_positioning(propagator, container_id, tally)
        })
        .map(|(placements, _)| placements)
    }

    pub fn all_structure_match_ups(
        &self,
        draw: &DrawDefinition,
        structure_id: &str,
    ) -> DrawResult<Vec<MatchUpView>> {
        matchups::all_structure_match_ups(draw, structure_id).tag("allStructureMatchUps")
    }

    pub fn all_draw_match_ups(&self, draw: &DrawDefinition) -> DrawResult<Vec<MatchUpView>> {
        matchups::all_draw_match_ups(draw).tag("allDrawMatchUps")
    }
}

/// Rewrite the stored tally of every round robin group under a structure
fn refresh_group_tallies(
    propagator: &mut Propagator<'_>,
    structure_id: &str,
    tally_policy: &TallyPolicy,
) -> DrawResult<()> {
    let group_ids: Vec<StructureId> = propagator
        .draw
        .structure(structure_id)?
        .leaf_structures()
        .into_iter()
        .filter(|leaf| leaf.shape == StructureShape::RoundRobinGroup)
        .map(|group| group.structure_id.clone())
        .collect();
    for group_id in &group_ids {
        let group_tally = tally_group(propagator.draw, group_id, tally_policy)?;
        write_tally(propagator.draw, &group_tally)?;
    }
    Ok(())
}

/// Status change followed by qualifier policy and group re-tally
fn apply_result(
    propagator: &mut Propagator<'_>,
    tally_policy: &TallyPolicy,
    match_up_id: &str,
    request: &StatusRequest,
) -> DrawResult<MatchUpOutcome> {
    let location = propagator.draw.locate_match_up(match_up_id)?;
    let structure_id = location.structure_id.clone();
    let top_id = location
        .tie_parent_id
        .clone()
        .unwrap_or_else(|| location.match_up_id.clone());

    let top = propagator.draw.structure_match_up(&structure_id, &top_id)?;
    let old_winner = winner_participant(propagator.draw, &structure_id, top)?;
    let is_group =
        propagator.draw.structure(&structure_id)?.shape == StructureShape::RoundRobinGroup;
    let order_before = if is_group {
        Some(tally_group(propagator.draw, &structure_id, tally_policy)?.order_map())
    } else {
        None
    };

    progression::set_status(propagator, location, request)?;

    let mut outcome = MatchUpOutcome {
        qualifier: progression::apply_qualifier_policy(
            propagator,
            &structure_id,
            &top_id,
            old_winner,
        )?,
        ..MatchUpOutcome::default()
    };

    if let Some(order_before) = order_before {
        let group_tally = tally_group(propagator.draw, &structure_id, tally_policy)?;
        write_tally(propagator.draw, &group_tally)?;
        let order_after = group_tally.order_map();
        outcome.connected_structure_ids =
            connected_structure_ids(propagator.draw, &structure_id, &order_before, &order_after)?;
        for connected_id in &outcome.connected_structure_ids {
            log::warn!(
                "structure {} consumed a finishing order of group {} that has changed",
                connected_id,
                structure_id
            );
            propagator.notifications.push(Notification::StructureModified {
                structure_id: connected_id.clone(),
                reason: format!("finishing order of group {structure_id} changed"),
            });
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders;
    use crate::notifications::RecordingSink;

    fn ready_draw() -> (DrawDefinition, StructureId) {
        let mut draw = builders::single_elimination("d", 4);
        let structure_id = draw.structures[0].structure_id.clone();
        builders::seed_participants(&mut draw, &structure_id, &["a", "b", "c", "d"]).unwrap();
        (draw, structure_id)
    }

    #[test]
    fn test_failed_call_leaves_draw_untouched() {
        let (mut draw, structure_id) = ready_draw();
        let sink = Arc::new(RecordingSink::new());
        let engine = DrawEngine::default().with_sink(sink.clone());
        let before = draw.clone();

        let err = engine
            .assign_participant(&mut draw, &structure_id, 9, "a")
            .unwrap_err();
        assert_eq!(err.method(), Some("assignParticipant"));
        assert_eq!(draw, before);
        assert!(sink.notifications().is_empty());
    }

    #[test]
    fn test_commit_publishes_changes_then_audit() {
        let (mut draw, _) = ready_draw();
        let sink = Arc::new(RecordingSink::new());
        let engine = DrawEngine::default().with_sink(sink.clone());
        let match_up_id = draw.structures[0].match_up_at(1, 1).unwrap().match_up_id.clone();

        let outcome = engine
            .set_winning_side(&mut draw, &match_up_id, Some(Side::One), None)
            .unwrap();
        assert!(outcome.propagation.steps > 0);

        let notifications = sink.notifications();
        assert!(matches!(
            notifications.first(),
            Some(Notification::MatchUpModified { .. })
        ));
        assert!(matches!(notifications.last(), Some(Notification::Audit(_))));
        assert_eq!(sink.audits()[0].method, "setWinningSide");
    }

    #[test]
    fn test_unknown_match_up_is_structural() {
        let (mut draw, _) = ready_draw();
        let engine = DrawEngine::default();
        let err = engine
            .set_match_up_status(
                &mut draw,
                &SetMatchUpStatusParams::new("missing", MatchUpStatus::Suspended),
            )
            .unwrap_err();
        assert!(err.is_structural());
        assert_eq!(err.root(), &DrawError::MatchUpNotFound("missing".to_string()));
    }

    #[test]
    fn test_from_config_validates() {
        let mut config = EngineConfig::default();
        config.progression.max_propagation_steps = 0;
        let err = DrawEngine::from_config(config).err().unwrap();
        assert_eq!(err.code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_position_changes_refresh_group_tally() {
        let mut draw = builders::round_robin("rr", 1, 3);
        let container_id = draw.structures[0].structure_id.clone();
        builders::enter_participants(&mut draw, &["a", "b", "c"]);
        let engine = DrawEngine::default();
        engine
            .set_position_assignments(
                &mut draw,
                &container_id,
                &[
                    AssignmentInput::participant(1, "a"),
                    AssignmentInput::participant(2, "b"),
                ],
            )
            .unwrap();
        let first = draw.structures[0].structures[0]
            .match_ups
            .iter()
            .find(|m| m.has_draw_position(1) && m.has_draw_position(2))
            .unwrap()
            .match_up_id
            .clone();
        engine.set_winning_side(&mut draw, &first, Some(Side::One), None).unwrap();

        let stored = |draw: &DrawDefinition, draw_position| {
            draw.structures[0].structures[0]
                .assignment(draw_position)
                .unwrap()
                .tally
                .clone()
        };
        engine.assign_participant(&mut draw, &container_id, 3, "c").unwrap();
        assert_eq!(stored(&draw, 3).unwrap().match_ups_won, 0);
        assert_eq!(stored(&draw, 1).unwrap().match_ups_won, 1);

        assert!(engine.clear_draw_position(&mut draw, &container_id, 3).unwrap());
        assert_eq!(stored(&draw, 3), None);
        let loser = stored(&draw, 2).unwrap();
        assert_eq!(loser.provisional_order, 2);
        assert!(!loser.ties);
    }
}
