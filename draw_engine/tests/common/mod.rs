#![allow(dead_code)]

//! Helpers shared by the integration tests.

use draw_engine::{DrawDefinition, DrawPosition, MatchUp, Score, Side, builders};

/// Route engine logs through the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn structure_id(draw: &DrawDefinition, index: usize) -> String {
    draw.structures[index].structure_id.clone()
}

pub fn match_up(draw: &DrawDefinition, index: usize, round: u32, position: u32) -> &MatchUp {
    draw.structures[index]
        .match_up_at(round, position)
        .expect("matchUp exists")
}

pub fn match_up_id(draw: &DrawDefinition, index: usize, round: u32, position: u32) -> String {
    match_up(draw, index, round, position).match_up_id.clone()
}

/// Participant ids `{prefix}1..{prefix}N` seeded into drawPositions 1..N
pub fn seed(draw: &mut DrawDefinition, index: usize, prefix: &str, count: usize) {
    let ids: Vec<String> = (1..=count).map(|idx| format!("{prefix}{idx}")).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let structure_id = structure_id(draw, index);
    builders::seed_participants(draw, &structure_id, &refs).expect("seeding succeeds");
}

/// Single elimination with `p1..pN` in drawPositions 1..N
pub fn seeded_elimination(size: u32) -> DrawDefinition {
    let mut draw = builders::single_elimination("main", size);
    seed(&mut draw, 0, "p", size as usize);
    draw
}

/// Participant occupying a drawPosition of a top-level structure
pub fn occupant(draw: &DrawDefinition, index: usize, draw_position: DrawPosition) -> Option<String> {
    draw.structures[index]
        .assignment(draw_position)
        .and_then(|assignment| assignment.participant_id())
        .map(str::to_string)
}

/// Orient a score given from the winner's perspective
pub fn score_for(side: Side, sets: &[(u32, u32)]) -> Score {
    let oriented: Vec<(u32, u32)> = sets
        .iter()
        .map(|&(won, lost)| if side == Side::One { (won, lost) } else { (lost, won) })
        .collect();
    Score::from_sets(&oriented)
}
