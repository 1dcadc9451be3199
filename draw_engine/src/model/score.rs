//! Resolved scores as supplied by the scoring collaborator.

use serde::{Deserialize, Serialize};

use super::status::Side;

/// Score of a single set
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SetScore {
    pub set_number: u32,
    pub side1_score: u32,
    pub side2_score: u32,
    pub side1_tiebreak: Option<u32>,
    pub side2_tiebreak: Option<u32>,
    /// Explicit set winner; derived from games when absent
    pub winning_side: Option<Side>,
}

impl SetScore {
    pub fn new(set_number: u32, side1_score: u32, side2_score: u32) -> Self {
        Self {
            set_number,
            side1_score,
            side2_score,
            side1_tiebreak: None,
            side2_tiebreak: None,
            winning_side: None,
        }
    }

    pub fn with_tiebreak(mut self, side1: u32, side2: u32) -> Self {
        self.side1_tiebreak = Some(side1);
        self.side2_tiebreak = Some(side2);
        self
    }

    pub fn set_winner(&self) -> Option<Side> {
        if self.winning_side.is_some() {
            return self.winning_side;
        }
        match self.side1_score.cmp(&self.side2_score) {
            std::cmp::Ordering::Greater => Some(Side::One),
            std::cmp::Ordering::Less => Some(Side::Two),
            std::cmp::Ordering::Equal => {
                match (self.side1_tiebreak, self.side2_tiebreak) {
                    (Some(a), Some(b)) if a > b => Some(Side::One),
                    (Some(a), Some(b)) if b > a => Some(Side::Two),
                    _ => None,
                }
            }
        }
    }

    pub fn games(&self, side: Side) -> u32 {
        match side {
            Side::One => self.side1_score,
            Side::Two => self.side2_score,
        }
    }
}

/// Already-resolved matchUp score
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Score {
    pub sets: Vec<SetScore>,
}

impl Score {
    pub fn new(sets: Vec<SetScore>) -> Self {
        Self { sets }
    }

    /// Build a score from `(side1, side2)` game counts, one tuple per set
    pub fn from_sets(sets: &[(u32, u32)]) -> Self {
        Self {
            sets: sets
                .iter()
                .enumerate()
                .map(|(idx, &(side1, side2))| SetScore::new(idx as u32 + 1, side1, side2))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn sets_won(&self, side: Side) -> u32 {
        self.sets
            .iter()
            .filter(|set| set.set_winner() == Some(side))
            .count() as u32
    }

    pub fn games_won(&self, side: Side) -> u32 {
        self.sets.iter().map(|set| set.games(side)).sum()
    }

    /// Side with more sets, if any
    pub fn leader(&self) -> Option<Side> {
        let one = self.sets_won(Side::One);
        let two = self.sets_won(Side::Two);
        match one.cmp(&two) {
            std::cmp::Ordering::Greater => Some(Side::One),
            std::cmp::Ordering::Less => Some(Side::Two),
            std::cmp::Ordering::Equal => None,
        }
    }
}
