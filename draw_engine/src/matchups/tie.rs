use crate::model::{MatchUp, Score, SetScore, Side, TieFormat};

/// Aggregate of a TEAM tie's child results
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TieRollup {
    /// Value won by each side
    pub values: [u32; 2],
    pub value_goal: u32,
    pub winning_side: Option<Side>,
    /// `None` until a child contest has a result
    pub score: Option<Score>,
}

/// Sum child values into the parent's aggregate. Without a tie format every
/// child is worth one and a majority wins.
pub fn tie_rollup(parent: &MatchUp, tie_format: Option<&TieFormat>) -> TieRollup {
    let mut values = [0u32; 2];
    let mut any_result = false;
    for child in &parent.tie_match_ups {
        if child.is_decided() || child.score.is_some() {
            any_result = true;
        }
        let Some(side) = child.winning_side else {
            continue;
        };
        if !child.match_up_status.is_directing() {
            continue;
        }
        let value = tie_format
            .map(|format| format.match_up_value(child.collection_id.as_deref()))
            .unwrap_or(1);
        values[side.index()] += value;
    }

    let value_goal = match tie_format {
        Some(format) if !format.collection_definitions.is_empty() => format.value_goal(),
        _ => parent.tie_match_ups.len() as u32 / 2 + 1,
    };
    let winning_side = if values[0] >= value_goal {
        Some(Side::One)
    } else if values[1] >= value_goal {
        Some(Side::Two)
    } else {
        None
    };
    let score = any_result.then(|| Score::new(vec![SetScore::new(1, values[0], values[1])]));

    TieRollup {
        values,
        value_goal,
        winning_side,
        score,
    }
}
