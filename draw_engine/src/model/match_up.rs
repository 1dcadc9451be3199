//! Stored matchUp records.
//!
//! A structure keeps one record per contest. Sides, participants, readiness and
//! targets are never stored; they are derived from position assignments and
//! topology by [`crate::matchups`].

use serde::{Deserialize, Serialize};

use super::score::Score;
use super::status::{MatchUpStatus, Side};
use super::structure::{DrawPosition, MatchUpId};

/// MatchUp record
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MatchUp {
    pub match_up_id: MatchUpId,
    pub round_number: u32,
    pub round_position: u32,
    /// Side 1 and side 2 drawPositions. Later elimination rounds start empty and
    /// are filled by advancement; fed positions are always side 1.
    pub draw_positions: [Option<DrawPosition>; 2],
    pub match_up_status: MatchUpStatus,
    pub winning_side: Option<Side>,
    pub score: Option<Score>,
    /// Status was generated by an upstream exit pair rather than set by a caller
    pub produced_exit: bool,
    pub collection_id: Option<String>,
    pub collection_position: Option<u32>,
    /// Child contests of a TEAM tie
    pub tie_match_ups: Vec<MatchUp>,
}

impl MatchUp {
    pub fn new(
        match_up_id: MatchUpId,
        round_number: u32,
        round_position: u32,
        draw_positions: [Option<DrawPosition>; 2],
    ) -> Self {
        Self {
            match_up_id,
            round_number,
            round_position,
            draw_positions,
            match_up_status: MatchUpStatus::ToBePlayed,
            winning_side: None,
            score: None,
            produced_exit: false,
            collection_id: None,
            collection_position: None,
            tie_match_ups: Vec::new(),
        }
    }

    /// Play has happened or a caller recorded a status other than
    /// TO_BE_PLAYED/BYE. Auto-resolved records (BYE, produced exits) are not
    /// active and can be unwound by upstream changes.
    pub fn is_active(&self) -> bool {
        if self.score.is_some() {
            return true;
        }
        if self
            .tie_match_ups
            .iter()
            .any(|tie_match_up| tie_match_up.is_active())
        {
            return true;
        }
        !self.produced_exit
            && !matches!(
                self.match_up_status,
                MatchUpStatus::ToBePlayed | MatchUpStatus::Bye
            )
    }

    pub fn is_decided(&self) -> bool {
        self.match_up_status.is_decided()
    }

    pub fn has_draw_position(&self, draw_position: DrawPosition) -> bool {
        self.draw_positions.contains(&Some(draw_position))
    }

    pub fn side_of(&self, draw_position: DrawPosition) -> Option<Side> {
        self.draw_positions
            .iter()
            .position(|dp| *dp == Some(draw_position))
            .map(Side::from_index)
    }

    pub fn draw_position(&self, side: Side) -> Option<DrawPosition> {
        self.draw_positions[side.index()]
    }

    pub fn is_tie(&self) -> bool {
        !self.tie_match_ups.is_empty()
    }

    /// Drop status, winner and score, returning the record to TO_BE_PLAYED
    pub fn reset_result(&mut self) {
        self.match_up_status = MatchUpStatus::ToBePlayed;
        self.winning_side = None;
        self.score = None;
        self.produced_exit = false;
    }

    pub fn tie_match_up(&self, match_up_id: &str) -> Option<&MatchUp> {
        self.tie_match_ups
            .iter()
            .find(|tie_match_up| tie_match_up.match_up_id == match_up_id)
    }

    pub fn tie_match_up_mut(&mut self, match_up_id: &str) -> Option<&mut MatchUp> {
        self.tie_match_ups
            .iter_mut()
            .find(|tie_match_up| tie_match_up.match_up_id == match_up_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn match_up() -> MatchUp {
        MatchUp::new("m1".to_string(), 1, 1, [Some(1), Some(2)])
    }

    #[test]
    fn test_new_match_up_is_inactive() {
        let m = match_up();
        assert!(!m.is_active());
        assert!(!m.is_decided());
        assert_eq!(m.side_of(2), Some(Side::Two));
        assert_eq!(m.side_of(3), None);
    }

    #[test]
    fn test_scored_or_caller_status_is_active() {
        let mut m = match_up();
        m.match_up_status = MatchUpStatus::Suspended;
        assert!(m.is_active());

        let mut m = match_up();
        m.score = Some(Score::from_sets(&[(1, 0)]));
        assert!(m.is_active());
    }

    #[test]
    fn test_produced_exit_is_not_active() {
        let mut m = match_up();
        m.match_up_status = MatchUpStatus::Walkover;
        m.produced_exit = true;
        assert!(!m.is_active());
        assert!(m.is_decided());

        m.reset_result();
        assert_eq!(m.match_up_status, MatchUpStatus::ToBePlayed);
        assert!(!m.produced_exit);
    }
}
