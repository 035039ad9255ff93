use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// One of the two voting teams. Serialized on the wire as `1` / `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    One,
    Two,
}

impl Team {
    pub fn other(self) -> Team {
        match self {
            Team::One => Team::Two,
            Team::Two => Team::One,
        }
    }

    /// Index into per-team arrays (populations, win counters).
    pub fn index(self) -> usize {
        match self {
            Team::One => 0,
            Team::Two => 1,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Team::One => 1,
            Team::Two => 2,
        }
    }

    pub fn from_number(n: u8) -> Option<Team> {
        match n {
            1 => Some(Team::One),
            2 => Some(Team::Two),
            _ => None,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl Serialize for Team {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.number())
    }
}

impl<'de> Deserialize<'de> for Team {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let n = u8::deserialize(deserializer)?;
        Team::from_number(n).ok_or_else(|| de::Error::custom(format!("invalid team: {n}")))
    }
}

/// Side-to-move color. Serialized as `"w"` / `"b"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeamColor {
    #[serde(rename = "w")]
    White,
    #[serde(rename = "b")]
    Black,
}

impl TeamColor {
    pub fn other(self) -> TeamColor {
        match self {
            TeamColor::White => TeamColor::Black,
            TeamColor::Black => TeamColor::White,
        }
    }
}

/// Color a team plays this game, given the current team-one color.
///
/// The team-one color flips on every new game so sides alternate.
pub fn color_of(team: Team, team_one_color: TeamColor) -> TeamColor {
    match team {
        Team::One => team_one_color,
        Team::Two => team_one_color.other(),
    }
}

/// Inverse of [`color_of`]: which team currently plays `color`.
pub fn team_of(color: TeamColor, team_one_color: TeamColor) -> Team {
    if color == team_one_color {
        Team::One
    } else {
        Team::Two
    }
}
