use std::fmt;

use crate::model::{character_code, Floor};

/// A single turn action. Moves compare structurally, which is how a search
/// node tells which of its legal moves already have a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Placement { character_id: usize, target_floor: Floor },
    Ascension { character_id: usize },
    Voting { vote_yes: bool },
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Move::Placement { character_id, target_floor } => write!(
                f,
                "place {} on {}",
                character_code(character_id).unwrap_or('?'),
                target_floor
            ),
            Move::Ascension { character_id } => {
                write!(f, "promote {}", character_code(character_id).unwrap_or('?'))
            }
            Move::Voting { vote_yes: true } => write!(f, "vote yes"),
            Move::Voting { vote_yes: false } => write!(f, "vote no"),
        }
    }
}
