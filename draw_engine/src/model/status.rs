//! MatchUp statuses and sides.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::errors::DrawError;

/// MatchUp status
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchUpStatus {
    ToBePlayed,
    Bye,
    Completed,
    Walkover,
    Defaulted,
    DoubleWalkover,
    DoubleDefault,
    Cancelled,
    Abandoned,
    Retired,
    Suspended,
    Incomplete,
}

/// How a status participates in progression
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatusCategory {
    /// Implies advancement of the winner (and loser, when linked)
    Directing,
    /// Recorded without any advancement
    NonDirecting,
    /// Both sides exit; no winner
    ExitPair,
    Bye,
}

impl MatchUpStatus {
    pub const ALL: [MatchUpStatus; 12] = [
        MatchUpStatus::ToBePlayed,
        MatchUpStatus::Bye,
        MatchUpStatus::Completed,
        MatchUpStatus::Walkover,
        MatchUpStatus::Defaulted,
        MatchUpStatus::DoubleWalkover,
        MatchUpStatus::DoubleDefault,
        MatchUpStatus::Cancelled,
        MatchUpStatus::Abandoned,
        MatchUpStatus::Retired,
        MatchUpStatus::Suspended,
        MatchUpStatus::Incomplete,
    ];

    pub const fn category(self) -> StatusCategory {
        match self {
            Self::Completed | Self::Walkover | Self::Defaulted | Self::Retired => {
                StatusCategory::Directing
            }
            Self::DoubleWalkover | Self::DoubleDefault => StatusCategory::ExitPair,
            Self::Bye => StatusCategory::Bye,
            Self::ToBePlayed
            | Self::Cancelled
            | Self::Abandoned
            | Self::Incomplete
            | Self::Suspended => StatusCategory::NonDirecting,
        }
    }

    pub const fn is_directing(self) -> bool {
        matches!(self.category(), StatusCategory::Directing)
    }

    pub const fn is_non_directing(self) -> bool {
        matches!(self.category(), StatusCategory::NonDirecting)
    }

    pub const fn is_exit_pair(self) -> bool {
        matches!(self.category(), StatusCategory::ExitPair)
    }

    /// WALKOVER, DEFAULTED or either exit pair
    pub const fn is_exit(self) -> bool {
        matches!(
            self,
            Self::Walkover | Self::Defaulted | Self::DoubleWalkover | Self::DoubleDefault
        )
    }

    /// A result exists: a directing status or an exit pair
    pub const fn is_decided(self) -> bool {
        self.is_directing() || self.is_exit_pair()
    }

    /// The single-sided exit an exit pair hands to each target matchUp
    pub const fn single_exit(self) -> Option<MatchUpStatus> {
        match self {
            Self::DoubleWalkover => Some(Self::Walkover),
            Self::DoubleDefault => Some(Self::Defaulted),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ToBePlayed => "TO_BE_PLAYED",
            Self::Bye => "BYE",
            Self::Completed => "COMPLETED",
            Self::Walkover => "WALKOVER",
            Self::Defaulted => "DEFAULTED",
            Self::DoubleWalkover => "DOUBLE_WALKOVER",
            Self::DoubleDefault => "DOUBLE_DEFAULT",
            Self::Cancelled => "CANCELLED",
            Self::Abandoned => "ABANDONED",
            Self::Retired => "RETIRED",
            Self::Suspended => "SUSPENDED",
            Self::Incomplete => "INCOMPLETE",
        }
    }
}

impl fmt::Display for MatchUpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MatchUpStatus {
    type Err = DrawError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DrawError::InvalidMatchUpStatus(s.to_string()))
    }
}

/// One side of a two-sided matchUp, serialized as `1` or `2`
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::One, Side::Two];

    /// Zero-based index into a `[T; 2]` pair
    pub const fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }

    pub const fn from_index(index: usize) -> Self {
        if index == 0 { Self::One } else { Self::Two }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }

    pub const fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

impl From<Side> for u8 {
    fn from(value: Side) -> Self {
        value.number()
    }
}

impl TryFrom<u8> for Side {
    type Error = DrawError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(DrawError::InvalidWinningSide(other.to_string())),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}
