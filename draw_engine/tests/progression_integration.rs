//! Integration tests for result progression across structures.
//!
//! Covers winner advancement, double exits, loser consolation feeds,
//! qualifier placement, round robin re-tallies, TEAM ties and rollback.

mod common;

use draw_engine::model::{EntryStage, EntryStatus};
use draw_engine::{
    AssignmentInput, DrawEngine, MatchUpStatus, Occupant, ProgressionPolicy, RecordingSink, Score,
    SetMatchUpStatusParams, Side, StaticPolicy, builders,
};
use std::sync::Arc;

fn engine_with(policy: ProgressionPolicy) -> DrawEngine {
    DrawEngine::default().with_policy(Arc::new(StaticPolicy::from(policy)))
}

#[test]
fn test_winner_advances_and_flip_swaps_position() {
    common::init_logging();
    let mut draw = common::seeded_elimination(16);
    let engine = DrawEngine::default();
    let first = common::match_up_id(&draw, 0, 1, 3);

    engine
        .set_winning_side(
            &mut draw,
            &first,
            Some(Side::One),
            Some(Score::from_sets(&[(6, 3), (6, 4)])),
        )
        .unwrap();
    assert_eq!(common::match_up(&draw, 0, 2, 2).draw_positions, [Some(5), None]);

    // reapplying the same result changes nothing downstream
    let before = draw.clone();
    engine
        .set_winning_side(
            &mut draw,
            &first,
            Some(Side::One),
            Some(Score::from_sets(&[(6, 3), (6, 4)])),
        )
        .unwrap();
    assert_eq!(draw.structures, before.structures);

    engine
        .set_winning_side(
            &mut draw,
            &first,
            Some(Side::Two),
            Some(Score::from_sets(&[(3, 6), (4, 6)])),
        )
        .unwrap();
    let next = common::match_up(&draw, 0, 2, 2);
    assert_eq!(next.draw_positions, [Some(6), None]);
    assert_eq!(common::occupant(&draw, 0, 6).as_deref(), Some("p6"));
}

#[test]
fn test_adjacent_double_walkovers_escalate() {
    common::init_logging();
    let mut draw = common::seeded_elimination(16);
    let engine = DrawEngine::default();
    let m1 = common::match_up_id(&draw, 0, 1, 1);
    let m2 = common::match_up_id(&draw, 0, 1, 2);

    engine
        .set_match_up_status(
            &mut draw,
            &SetMatchUpStatusParams::new(m1, MatchUpStatus::DoubleWalkover),
        )
        .unwrap();
    let second_round = common::match_up(&draw, 0, 2, 1);
    assert_eq!(second_round.match_up_status, MatchUpStatus::Walkover);
    assert_eq!(second_round.winning_side, None);
    assert!(second_round.produced_exit);

    let outcome = engine
        .set_match_up_status(
            &mut draw,
            &SetMatchUpStatusParams::new(m2, MatchUpStatus::DoubleWalkover),
        )
        .unwrap();
    assert_eq!(outcome.propagation.double_exit_steps, 2);
    assert_eq!(
        common::match_up(&draw, 0, 2, 1).match_up_status,
        MatchUpStatus::DoubleWalkover
    );
    let third_round = common::match_up(&draw, 0, 3, 1);
    assert_eq!(third_round.match_up_status, MatchUpStatus::Walkover);
    assert_eq!(third_round.winning_side, None);

    // the opponent arriving in round 3 walks straight through
    for position in [3, 4] {
        let id = common::match_up_id(&draw, 0, 1, position);
        engine.set_winning_side(&mut draw, &id, Some(Side::One), None).unwrap();
    }
    let id = common::match_up_id(&draw, 0, 2, 2);
    engine.set_winning_side(&mut draw, &id, Some(Side::One), None).unwrap();

    let third_round = common::match_up(&draw, 0, 3, 1);
    assert_eq!(third_round.winning_side, Some(Side::Two));
    assert_eq!(common::match_up(&draw, 0, 4, 1).draw_positions, [Some(5), None]);
}

#[test]
fn test_first_round_losers_feed_consolation() {
    common::init_logging();
    let mut draw = builders::first_match_loser_consolation("flc", 16);
    common::seed(&mut draw, 0, "p", 16);
    let engine = DrawEngine::default();

    let m1 = common::match_up_id(&draw, 0, 1, 1);
    engine.set_winning_side(&mut draw, &m1, Some(Side::One), None).unwrap();
    assert_eq!(common::occupant(&draw, 1, 1).as_deref(), Some("p2"));

    // a walkover loser still holds a participant to send
    let m2 = common::match_up_id(&draw, 0, 1, 2);
    engine
        .set_match_up_status(
            &mut draw,
            &SetMatchUpStatusParams::new(m2, MatchUpStatus::Walkover).with_winning_side(Side::One),
        )
        .unwrap();
    assert_eq!(common::occupant(&draw, 1, 2).as_deref(), Some("p4"));
    let consolation_first = common::match_up(&draw, 1, 1, 1);
    assert_eq!(consolation_first.match_up_status, MatchUpStatus::ToBePlayed);
    assert_eq!(consolation_first.winning_side, None);
    assert_eq!(common::match_up(&draw, 1, 2, 1).draw_positions, [None, None]);
}

#[test]
fn test_produced_walkover_sends_bye_to_feed_round() {
    common::init_logging();
    let mut draw = builders::feed_in_consolation("fic", 16);
    common::seed(&mut draw, 0, "p", 16);
    let engine = DrawEngine::default();

    let m1 = common::match_up_id(&draw, 0, 1, 1);
    engine
        .set_match_up_status(
            &mut draw,
            &SetMatchUpStatusParams::new(m1, MatchUpStatus::DoubleWalkover),
        )
        .unwrap();
    let m2 = common::match_up_id(&draw, 0, 1, 2);
    engine.set_winning_side(&mut draw, &m2, Some(Side::One), None).unwrap();

    // p3 walks through an empty side; nobody lost, so the feed position gets a bye
    let second_round = common::match_up(&draw, 0, 2, 1);
    assert_eq!(second_round.match_up_status, MatchUpStatus::Walkover);
    assert!(second_round.produced_exit);
    assert_eq!(second_round.winning_side, Some(Side::Two));
    assert!(draw.structures[1].assignment(12).unwrap().is_bye());
    assert_eq!(
        common::match_up(&draw, 1, 2, 4).match_up_status,
        MatchUpStatus::Bye
    );
    assert_eq!(common::occupant(&draw, 1, 2).as_deref(), Some("p4"));
}

/// FMLC 8 with `p1..p7` and a bye at drawPosition 8, so p7 starts in round 2
fn consolation_with_bye() -> (DrawEngine, draw_engine::DrawDefinition) {
    let mut draw = builders::first_match_loser_consolation("flc", 8);
    common::seed(&mut draw, 0, "p", 7);
    let engine = DrawEngine::default();
    let main_id = common::structure_id(&draw, 0);
    engine.assign_bye(&mut draw, &main_id, 8).unwrap();
    let id = common::match_up_id(&draw, 0, 1, 3);
    engine.set_winning_side(&mut draw, &id, Some(Side::One), None).unwrap();
    (engine, draw)
}

#[test]
fn test_second_round_loser_after_bye_feeds_consolation() {
    common::init_logging();
    let (engine, mut draw) = consolation_with_bye();
    assert_eq!(common::match_up(&draw, 0, 1, 4).match_up_status, MatchUpStatus::Bye);
    assert!(draw.structures[1].assignment(4).unwrap().is_vacant());
    assert_eq!(common::occupant(&draw, 1, 3).as_deref(), Some("p6"));
    assert_eq!(
        common::match_up(&draw, 1, 1, 2).match_up_status,
        MatchUpStatus::ToBePlayed
    );

    let second_round = common::match_up_id(&draw, 0, 2, 2);
    assert_eq!(common::match_up(&draw, 0, 2, 2).draw_positions, [Some(5), Some(7)]);
    engine
        .set_winning_side(&mut draw, &second_round, Some(Side::One), None)
        .unwrap();
    assert_eq!(common::occupant(&draw, 1, 4).as_deref(), Some("p7"));
    assert_eq!(
        common::match_up(&draw, 1, 1, 2).match_up_status,
        MatchUpStatus::ToBePlayed
    );

    // once p7 wins, their first matchUp is never lost and the held position becomes a bye
    engine
        .set_winning_side(&mut draw, &second_round, Some(Side::Two), None)
        .unwrap();
    assert!(draw.structures[1].assignment(4).unwrap().is_bye());
    let consolation_second = common::match_up(&draw, 1, 1, 2);
    assert_eq!(consolation_second.match_up_status, MatchUpStatus::Bye);
    assert_eq!(consolation_second.winning_side, Some(Side::One));
    assert_eq!(common::match_up(&draw, 1, 2, 1).draw_positions, [None, Some(3)]);
    assert_eq!(common::match_up(&draw, 0, 3, 1).draw_positions, [None, Some(7)]);
}

#[test]
fn test_second_round_double_exit_releases_held_position() {
    common::init_logging();
    let (engine, mut draw) = consolation_with_bye();
    let second_round = common::match_up_id(&draw, 0, 2, 2);
    engine
        .set_match_up_status(
            &mut draw,
            &SetMatchUpStatusParams::new(second_round.clone(), MatchUpStatus::DoubleWalkover),
        )
        .unwrap();
    assert!(draw.structures[1].assignment(4).unwrap().is_bye());
    assert_eq!(common::match_up(&draw, 1, 1, 2).winning_side, Some(Side::One));

    engine
        .set_match_up_status(
            &mut draw,
            &SetMatchUpStatusParams::new(second_round, MatchUpStatus::ToBePlayed),
        )
        .unwrap();
    assert!(draw.structures[1].assignment(4).unwrap().is_vacant());
    assert_eq!(
        common::match_up(&draw, 1, 1, 2).match_up_status,
        MatchUpStatus::ToBePlayed
    );
}

#[test]
fn test_double_exit_sends_bye_only_under_policy() {
    common::init_logging();
    let m1_status = SetMatchUpStatusParams::new(String::new(), MatchUpStatus::DoubleWalkover);

    let mut draw = builders::first_match_loser_consolation("flc", 8);
    common::seed(&mut draw, 0, "p", 8);
    let engine = DrawEngine::default();
    let m1 = common::match_up_id(&draw, 0, 1, 1);
    let m2 = common::match_up_id(&draw, 0, 1, 2);
    engine
        .set_match_up_status(
            &mut draw,
            &SetMatchUpStatusParams {
                match_up_id: m1.clone(),
                ..m1_status.clone()
            },
        )
        .unwrap();
    assert!(draw.structures[1].assignment(1).unwrap().is_vacant());
    engine.set_winning_side(&mut draw, &m2, Some(Side::One), None).unwrap();
    let consolation_first = common::match_up(&draw, 1, 1, 1);
    assert_eq!(consolation_first.match_up_status, MatchUpStatus::Walkover);
    assert_eq!(consolation_first.winning_side, Some(Side::Two));
    assert_eq!(common::match_up(&draw, 1, 2, 1).draw_positions, [Some(2), None]);

    let mut draw = builders::first_match_loser_consolation("flc", 8);
    common::seed(&mut draw, 0, "p", 8);
    let engine = engine_with(ProgressionPolicy {
        propagate_bye_on_double_exit: true,
        ..ProgressionPolicy::default()
    });
    let m1 = common::match_up_id(&draw, 0, 1, 1);
    let m2 = common::match_up_id(&draw, 0, 1, 2);
    engine
        .set_match_up_status(
            &mut draw,
            &SetMatchUpStatusParams {
                match_up_id: m1,
                ..m1_status
            },
        )
        .unwrap();
    assert!(draw.structures[1].assignment(1).unwrap().is_bye());
    engine.set_winning_side(&mut draw, &m2, Some(Side::One), None).unwrap();
    let consolation_first = common::match_up(&draw, 1, 1, 1);
    assert_eq!(consolation_first.match_up_status, MatchUpStatus::Bye);
    assert_eq!(consolation_first.winning_side, Some(Side::Two));
}

#[test]
fn test_feed_in_consolation_takes_later_round_losers() {
    common::init_logging();
    let mut draw = builders::feed_in_consolation("fic", 16);
    common::seed(&mut draw, 0, "p", 16);
    let engine = DrawEngine::default();

    for position in 1..=8 {
        let id = common::match_up_id(&draw, 0, 1, position);
        engine.set_winning_side(&mut draw, &id, Some(Side::One), None).unwrap();
    }
    for draw_position in 1..=8 {
        let expected = format!("p{}", 2 * draw_position);
        assert_eq!(common::occupant(&draw, 1, draw_position), Some(expected));
    }

    // second round losers fill the feed round bottom up
    let id = common::match_up_id(&draw, 0, 2, 1);
    engine.set_winning_side(&mut draw, &id, Some(Side::One), None).unwrap();
    assert_eq!(common::occupant(&draw, 1, 12).as_deref(), Some("p3"));
    assert_eq!(common::match_up(&draw, 1, 2, 4).draw_positions[0], Some(12));

    for position in 2..=4 {
        let id = common::match_up_id(&draw, 0, 2, position);
        engine.set_winning_side(&mut draw, &id, Some(Side::One), None).unwrap();
    }
    let id = common::match_up_id(&draw, 0, 3, 1);
    engine.set_winning_side(&mut draw, &id, Some(Side::Two), None).unwrap();
    assert_eq!(common::occupant(&draw, 1, 13).as_deref(), Some("p1"));
}

#[test]
fn test_qualifier_is_placed_replaced_then_locked() {
    common::init_logging();
    let mut draw = builders::qualifying_and_main("q", 8, 8, 2);
    common::seed(&mut draw, 0, "q", 8);
    let main_id = common::structure_id(&draw, 1);
    builders::enter_participants(&mut draw, &["m1", "m3", "m4", "m5", "m7", "m8"]);
    let engine = engine_with(ProgressionPolicy::default().with_auto_qualifiers());
    let inputs: Vec<AssignmentInput> = [1, 3, 4, 5, 7, 8]
        .into_iter()
        .map(|draw_position| AssignmentInput::participant(draw_position, format!("m{draw_position}")))
        .collect();
    assert_eq!(
        engine.set_position_assignments(&mut draw, &main_id, &inputs).unwrap(),
        6
    );

    for position in [1, 2] {
        let id = common::match_up_id(&draw, 0, 1, position);
        engine.set_winning_side(&mut draw, &id, Some(Side::One), None).unwrap();
    }
    let qualifying_final = common::match_up_id(&draw, 0, 2, 1);
    let outcome = engine
        .set_winning_side(&mut draw, &qualifying_final, Some(Side::One), None)
        .unwrap();
    assert!(outcome.qualifier_placed());
    assert_eq!(outcome.qualifier.placed.as_deref(), Some("q1"));
    assert_eq!(common::occupant(&draw, 1, 2).as_deref(), Some("q1"));
    assert!(draw.entries.iter().any(|entry| entry.participant_id == "q1"
        && entry.entry_stage == EntryStage::Main
        && entry.entry_status == EntryStatus::Qualifier));

    let outcome = engine
        .set_winning_side(&mut draw, &qualifying_final, Some(Side::Two), None)
        .unwrap();
    assert!(outcome.qualifier_replaced());
    assert_eq!(outcome.qualifier.replaced.as_deref(), Some("q1"));
    assert_eq!(common::occupant(&draw, 1, 2).as_deref(), Some("q3"));

    // main play starts; the same reversal is refused without an error
    let main_first = common::match_up_id(&draw, 1, 1, 1);
    engine
        .set_match_up_status(
            &mut draw,
            &SetMatchUpStatusParams::new(main_first, MatchUpStatus::Incomplete),
        )
        .unwrap();
    let outcome = engine
        .set_winning_side(&mut draw, &qualifying_final, Some(Side::One), None)
        .unwrap();
    assert!(!outcome.qualifier_replaced());
    assert_eq!(common::occupant(&draw, 1, 2).as_deref(), Some("q3"));
    assert_eq!(
        common::match_up(&draw, 0, 2, 1).winning_side,
        Some(Side::One)
    );
}

fn group_match_up_id(draw: &draw_engine::DrawDefinition, pair: [u32; 2]) -> (String, Side, Side) {
    let match_up = draw.structures[0].structures[0]
        .match_ups
        .iter()
        .find(|m| m.has_draw_position(pair[0]) && m.has_draw_position(pair[1]))
        .unwrap();
    let first = match_up.side_of(pair[0]).unwrap();
    (match_up.match_up_id.clone(), first, first.opposite())
}

fn play(
    engine: &DrawEngine,
    draw: &mut draw_engine::DrawDefinition,
    winner: u32,
    loser: u32,
    sets: &[(u32, u32)],
) -> draw_engine::MatchUpOutcome {
    let (id, winning_side, _) = group_match_up_id(draw, [winner, loser]);
    engine
        .set_winning_side(
            draw,
            &id,
            Some(winning_side),
            Some(common::score_for(winning_side, sets)),
        )
        .unwrap()
}

#[test]
fn test_group_retally_flags_consumed_playoff() {
    common::init_logging();
    let mut draw = builders::round_robin_with_playoff("rr", 1, 4, 2);
    let container_id = common::structure_id(&draw, 0);
    let playoff_id = common::structure_id(&draw, 1);
    builders::enter_participants(&mut draw, &["a", "b", "c", "d"]);
    let sink = Arc::new(RecordingSink::new());
    let engine = DrawEngine::default().with_sink(sink.clone());
    let inputs: Vec<AssignmentInput> = ["a", "b", "c", "d"]
        .into_iter()
        .zip(1..)
        .map(|(id, draw_position)| AssignmentInput::participant(draw_position, id))
        .collect();
    engine
        .set_position_assignments(&mut draw, &container_id, &inputs)
        .unwrap();

    play(&engine, &mut draw, 1, 2, &[(6, 3), (6, 3)]);
    play(&engine, &mut draw, 1, 3, &[(6, 2), (6, 2)]);
    play(&engine, &mut draw, 1, 4, &[(6, 1), (6, 1)]);
    play(&engine, &mut draw, 2, 4, &[(6, 0), (6, 0)]);
    play(&engine, &mut draw, 3, 4, &[(6, 4), (6, 4)]);

    let tally = engine
        .tally_participant_results(&mut draw, &container_id)
        .unwrap();
    assert!(!tally.bracket_complete);
    let provisional: Vec<u32> = ["a", "b", "c", "d"]
        .iter()
        .map(|id| tally.participant_results[*id].provisional_order)
        .collect();
    assert_eq!(provisional, vec![1, 2, 3, 4]);
    assert!(tally.participant_results["a"].group_order.is_none());

    play(&engine, &mut draw, 2, 3, &[(7, 5), (7, 5)]);
    let placements = engine
        .automated_playoff_positioning(&mut draw, &container_id)
        .unwrap();
    assert_eq!(placements.len(), 2);
    assert_eq!(common::occupant(&draw, 1, 1).as_deref(), Some("a"));
    assert_eq!(common::occupant(&draw, 1, 2).as_deref(), Some("b"));

    sink.drain();
    let outcome = play(&engine, &mut draw, 3, 2, &[(7, 5), (7, 5)]);
    assert_eq!(outcome.connected_structure_ids, vec![playoff_id.clone()]);
    let group = &draw.structures[0].structures[0];
    let orders: Vec<Option<u32>> = [1, 2, 3, 4]
        .iter()
        .map(|draw_position| {
            group
                .assignment(*draw_position)
                .and_then(|assignment| assignment.tally.as_ref())
                .and_then(|tally| tally.group_order)
        })
        .collect();
    assert_eq!(orders, vec![Some(1), Some(3), Some(2), Some(4)]);
    assert!(sink.notifications().iter().any(|notification| matches!(
        notification,
        draw_engine::Notification::StructureModified { structure_id, .. } if *structure_id == playoff_id
    )));
}

#[test]
fn test_team_tie_rolls_up_and_unwinds() {
    common::init_logging();
    let mut draw = builders::team_single_elimination("t", 4, builders::team_tie_format(2, 1));
    common::seed(&mut draw, 0, "team", 4);
    let engine = DrawEngine::default();
    let children: Vec<String> = common::match_up(&draw, 0, 1, 1)
        .tie_match_ups
        .iter()
        .map(|child| child.match_up_id.clone())
        .collect();
    assert_eq!(children.len(), 3);

    engine
        .set_winning_side(&mut draw, &children[0], Some(Side::One), None)
        .unwrap();
    let tie = common::match_up(&draw, 0, 1, 1);
    assert_eq!(tie.winning_side, None);
    assert!(tie.is_active());

    engine
        .set_winning_side(&mut draw, &children[2], Some(Side::One), None)
        .unwrap();
    let tie = common::match_up(&draw, 0, 1, 1);
    assert_eq!(tie.match_up_status, MatchUpStatus::Completed);
    assert_eq!(tie.winning_side, Some(Side::One));
    let final_round = common::match_up(&draw, 0, 2, 1);
    assert_eq!(final_round.draw_positions, [Some(1), None]);
    assert!(
        final_round
            .tie_match_ups
            .iter()
            .all(|child| child.draw_positions == [Some(1), None])
    );

    engine
        .set_winning_side(&mut draw, &children[2], Some(Side::Two), None)
        .unwrap();
    assert_eq!(common::match_up(&draw, 0, 1, 1).winning_side, None);
    assert_eq!(common::match_up(&draw, 0, 2, 1).draw_positions, [None, None]);
}

#[test]
fn test_bye_status_fills_the_vacant_position() {
    common::init_logging();
    let mut draw = builders::single_elimination("b", 4);
    common::seed(&mut draw, 0, "p", 3);
    let engine = DrawEngine::default();
    let second = common::match_up_id(&draw, 0, 1, 2);

    engine
        .set_match_up_status(&mut draw, &SetMatchUpStatusParams::new(second, MatchUpStatus::Bye))
        .unwrap();
    assert_eq!(
        draw.structures[0].assignment(4).unwrap().occupant,
        Some(Occupant::Bye)
    );
    assert_eq!(common::match_up(&draw, 0, 2, 1).draw_positions, [None, Some(3)]);
}

#[test]
fn test_failed_loser_retraction_commits_nothing() {
    common::init_logging();
    let mut draw = builders::first_match_loser_consolation("flc", 8);
    common::seed(&mut draw, 0, "p", 8);
    let engine = DrawEngine::default();
    for position in [1, 2] {
        let id = common::match_up_id(&draw, 0, 1, position);
        engine.set_winning_side(&mut draw, &id, Some(Side::One), None).unwrap();
    }
    let consolation_first = common::match_up_id(&draw, 1, 1, 1);
    engine
        .set_winning_side(&mut draw, &consolation_first, Some(Side::One), None)
        .unwrap();

    let before = draw.clone();
    let m1 = common::match_up_id(&draw, 0, 1, 1);
    let err = engine
        .set_winning_side(&mut draw, &m1, Some(Side::Two), None)
        .unwrap_err();
    assert_eq!(err.code(), "CANNOT_CHANGE_WINNING_SIDE");
    assert_eq!(err.method(), Some("setWinningSide"));
    assert_eq!(draw, before);
}
