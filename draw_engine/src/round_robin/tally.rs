//! Group tallies and finishing order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::matchups::side_states;
use crate::model::{
    DrawDefinition, DrawError, DrawPosition, DrawResult, MatchUpStatus, ParticipantId, Side,
    StructureId, StructureShape,
};
use crate::policy::{TallyDirective, TallyPolicy};

/// Per-participant group result
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ParticipantResult {
    pub match_ups_won: u32,
    pub match_ups_lost: u32,
    pub sets_won: u32,
    pub sets_lost: u32,
    pub games_won: u32,
    pub games_lost: u32,
    pub walkovers: u32,
    pub defaults: u32,
    pub retirements: u32,
    pub match_ups_ratio: f64,
    pub sets_ratio: f64,
    pub games_ratio: f64,
    /// Current rank, available before the group is complete
    pub provisional_order: u32,
    /// Final rank, only once every matchUp of the group is decided
    pub group_order: Option<u32>,
    /// Shares its rank with another participant
    pub ties: bool,
    /// Manual tie-break override
    pub sub_order: Option<u32>,
}

impl ParticipantResult {
    /// Rank used for progression: final when known, provisional otherwise
    pub fn finishing_order(&self) -> u32 {
        self.group_order.unwrap_or(self.provisional_order)
    }

    fn sets_differential(&self) -> i64 {
        i64::from(self.sets_won) - i64::from(self.sets_lost)
    }

    fn games_differential(&self) -> i64 {
        i64::from(self.games_won) - i64::from(self.games_lost)
    }
}

fn ratio(won: u32, lost: u32) -> f64 {
    let total = won + lost;
    if total == 0 {
        0.0
    } else {
        f64::from(won) / f64::from(total)
    }
}

/// Tally of one round robin group
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GroupTally {
    pub structure_id: StructureId,
    pub participant_results: BTreeMap<ParticipantId, ParticipantResult>,
    /// Every matchUp of the group is decided
    pub bracket_complete: bool,
    /// How each tie was broken
    pub report: Vec<String>,
}

impl GroupTally {
    /// Participants by finishing order, ties broken by drawPosition
    pub fn finishing_order(&self, draw: &DrawDefinition) -> DrawResult<Vec<ParticipantId>> {
        let structure = draw.structure(&self.structure_id)?;
        let mut ordered: Vec<(u32, DrawPosition, ParticipantId)> = self
            .participant_results
            .iter()
            .map(|(participant_id, result)| {
                (
                    result.finishing_order(),
                    structure
                        .participant_position(participant_id)
                        .unwrap_or(DrawPosition::MAX),
                    participant_id.clone(),
                )
            })
            .collect();
        ordered.sort();
        Ok(ordered
            .into_iter()
            .map(|(_, _, participant_id)| participant_id)
            .collect())
    }

    /// Participant id to finishing order
    pub fn order_map(&self) -> BTreeMap<ParticipantId, u32> {
        self.participant_results
            .iter()
            .map(|(participant_id, result)| (participant_id.clone(), result.finishing_order()))
            .collect()
    }
}

struct Ranking<'t> {
    results: &'t BTreeMap<ParticipantId, ParticipantResult>,
    head_to_head: &'t HashMap<(ParticipantId, ParticipantId), ParticipantId>,
    directives: &'t [TallyDirective],
    report: Vec<String>,
}

impl Ranking<'_> {
    fn value(&self, participant_id: &str, directive: TallyDirective) -> f64 {
        let Some(result) = self.results.get(participant_id) else {
            return 0.0;
        };
        match directive {
            TallyDirective::MatchUpsWon => f64::from(result.match_ups_won),
            TallyDirective::MatchUpsRatio => result.match_ups_ratio,
            TallyDirective::SetsDifferential => result.sets_differential() as f64,
            TallyDirective::GamesDifferential => result.games_differential() as f64,
            TallyDirective::SetsRatio => result.sets_ratio,
            TallyDirective::GamesRatio => result.games_ratio,
            TallyDirective::HeadToHead => 0.0,
        }
    }

    fn split(&self, ids: &[ParticipantId], directive: TallyDirective) -> Vec<Vec<ParticipantId>> {
        if directive == TallyDirective::HeadToHead {
            if let [a, b] = ids {
                let key = if a < b {
                    (a.clone(), b.clone())
                } else {
                    (b.clone(), a.clone())
                };
                if let Some(winner) = self.head_to_head.get(&key) {
                    let loser = if winner == a { b } else { a };
                    return vec![vec![winner.clone()], vec![loser.clone()]];
                }
            }
            return vec![ids.to_vec()];
        }

        let mut valued: Vec<(f64, ParticipantId)> = ids
            .iter()
            .map(|participant_id| (self.value(participant_id, directive), participant_id.clone()))
            .collect();
        valued.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        let mut buckets: Vec<Vec<ParticipantId>> = Vec::new();
        let mut last: Option<f64> = None;
        for (value, participant_id) in valued {
            match (last, buckets.last_mut()) {
                (Some(previous), Some(bucket)) if previous == value => bucket.push(participant_id),
                _ => buckets.push(vec![participant_id]),
            }
            last = Some(value);
        }
        buckets
    }

    /// Order `ids` into buckets of equal rank. A directive that separates the
    /// participants restarts the full directive list inside each smaller bucket.
    fn rank(&mut self, ids: Vec<ParticipantId>, start: usize) -> Vec<Vec<ParticipantId>> {
        if ids.len() <= 1 {
            return vec![ids];
        }
        for directive in self.directives.iter().skip(start) {
            let buckets = self.split(&ids, *directive);
            if buckets.len() == 1 {
                continue;
            }
            self.report.push(format!(
                "{:?} separated {} participants into {} groups",
                directive,
                ids.len(),
                buckets.len()
            ));
            return buckets
                .into_iter()
                .flat_map(|bucket| self.rank(bucket, 0))
                .collect();
        }
        vec![ids]
    }
}

/// Tally a round robin group from its matchUps
pub fn tally_group(
    draw: &DrawDefinition,
    structure_id: &str,
    policy: &TallyPolicy,
) -> DrawResult<GroupTally> {
    let group = draw.structure(structure_id)?;
    if group.shape != StructureShape::RoundRobinGroup {
        return Err(DrawError::NotRoundRobinGroup(structure_id.to_string()));
    }

    let mut results: BTreeMap<ParticipantId, ParticipantResult> = group
        .position_assignments
        .iter()
        .filter_map(|assignment| {
            assignment.participant_id().map(|participant_id| {
                (
                    participant_id.to_string(),
                    ParticipantResult {
                        sub_order: assignment.sub_order,
                        ..ParticipantResult::default()
                    },
                )
            })
        })
        .collect();
    let mut head_to_head = HashMap::new();
    let mut bracket_complete = true;

    for match_up in &group.match_ups {
        if match_up.match_up_status == MatchUpStatus::Bye {
            continue;
        }
        if !match_up.is_decided() {
            bracket_complete = false;
            continue;
        }
        let sides = side_states(draw, structure_id, match_up)?;
        let (Some(one), Some(two)) = (sides[0].participant_id(), sides[1].participant_id()) else {
            continue;
        };
        let ids = [one.to_string(), two.to_string()];

        if match_up.match_up_status.is_exit_pair() {
            for participant_id in &ids {
                if let Some(result) = results.get_mut(participant_id) {
                    result.match_ups_lost += 1;
                    match match_up.match_up_status {
                        MatchUpStatus::DoubleDefault => result.defaults += 1,
                        _ => result.walkovers += 1,
                    }
                }
            }
            continue;
        }

        let Some(winning_side) = match_up.winning_side else {
            continue;
        };
        let winner = &ids[winning_side.index()];
        let loser = &ids[winning_side.opposite().index()];
        let key = if one < two {
            (ids[0].clone(), ids[1].clone())
        } else {
            (ids[1].clone(), ids[0].clone())
        };
        head_to_head.insert(key, winner.clone());

        for side in Side::BOTH {
            let Some(result) = results.get_mut(&ids[side.index()]) else {
                continue;
            };
            if let Some(score) = &match_up.score {
                result.sets_won += score.sets_won(side);
                result.sets_lost += score.sets_won(side.opposite());
                result.games_won += score.games_won(side);
                result.games_lost += score.games_won(side.opposite());
            }
        }
        if let Some(result) = results.get_mut(winner) {
            result.match_ups_won += 1;
        }
        if let Some(result) = results.get_mut(loser) {
            result.match_ups_lost += 1;
            match match_up.match_up_status {
                MatchUpStatus::Walkover => result.walkovers += 1,
                MatchUpStatus::Defaulted => result.defaults += 1,
                MatchUpStatus::Retired => result.retirements += 1,
                _ => {}
            }
        }
    }

    for result in results.values_mut() {
        result.match_ups_ratio = ratio(result.match_ups_won, result.match_ups_lost);
        result.sets_ratio = ratio(result.sets_won, result.sets_lost);
        result.games_ratio = ratio(result.games_won, result.games_lost);
    }

    let ids: Vec<ParticipantId> = results.keys().cloned().collect();
    let mut ranking = Ranking {
        results: &results,
        head_to_head: &head_to_head,
        directives: &policy.directives,
        report: Vec::new(),
    };
    let buckets = ranking.rank(ids, 0);
    let mut report = ranking.report;

    let mut orders: Vec<(ParticipantId, u32, bool)> = Vec::new();
    let mut rank = 1u32;
    for mut bucket in buckets {
        let size = bucket.len() as u32;
        let all_sub_ordered = bucket
            .iter()
            .all(|participant_id| results.get(participant_id).and_then(|r| r.sub_order).is_some());
        if size > 1 && all_sub_ordered {
            bucket.sort_by_key(|participant_id| {
                results
                    .get(participant_id)
                    .and_then(|r| r.sub_order)
                    .unwrap_or(u32::MAX)
            });
            report.push(format!("sub order resolved a {size}-way tie"));
            for (offset, participant_id) in bucket.into_iter().enumerate() {
                orders.push((participant_id, rank + offset as u32, false));
            }
        } else {
            if size > 1 {
                report.push(format!("unresolved {size}-way tie at rank {rank}"));
            }
            for participant_id in bucket {
                orders.push((participant_id, rank, size > 1));
            }
        }
        rank += size;
    }

    for (participant_id, order, ties) in orders {
        if let Some(result) = results.get_mut(&participant_id) {
            result.provisional_order = order;
            result.group_order = bracket_complete.then_some(order);
            result.ties = ties;
        }
    }

    Ok(GroupTally {
        structure_id: structure_id.to_string(),
        participant_results: results,
        bracket_complete,
        report,
    })
}

/// Store a tally on the group's position assignments
pub fn write_tally(draw: &mut DrawDefinition, tally: &GroupTally) -> DrawResult<()> {
    let group = draw.structure_mut(&tally.structure_id)?;
    for assignment in &mut group.position_assignments {
        assignment.tally = assignment
            .participant_id()
            .and_then(|participant_id| tally.participant_results.get(participant_id))
            .cloned();
    }
    Ok(())
}
