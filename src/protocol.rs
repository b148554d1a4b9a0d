//! Text records exchanged with the match server.
//!
//! The server answers with plain text: a turn snapshot (header line then
//! `floor,code` board lines, `\r\n` separated), a player roster
//! (`id,name,score` per line) and a hand of character codes. Moves go back
//! as short strings: `"{floor},{code}"`, `"{code}"`, `"s"` or `"n"`.

use rand::Rng;

use crate::error::{KingError, KingResult};
use crate::model::{
    character_code, character_id, no_votes_for, Floor, GamePhase, GameState, Player,
    FAVORITES_PER_PLAYER, ROSTER_SIZE,
};
use crate::moves::Move;
use crate::rules::deal_favorites;

pub const PHASE_POSITIONING: &str = "S";
pub const PHASE_PROMOTION: &str = "P";
pub const PHASE_VOTING: &str = "V";

pub fn phase_from_code(code: &str) -> KingResult<GamePhase> {
    match code.trim() {
        PHASE_POSITIONING => Ok(GamePhase::Placement),
        PHASE_PROMOTION => Ok(GamePhase::Ascension),
        PHASE_VOTING => Ok(GamePhase::Voting),
        other => Err(KingError::InvalidPhaseCode(other.to_string())),
    }
}

pub fn phase_code(phase: GamePhase) -> Option<&'static str> {
    match phase {
        GamePhase::Placement => Some(PHASE_POSITIONING),
        GamePhase::Ascension => Some(PHASE_PROMOTION),
        GamePhase::Voting => Some(PHASE_VOTING),
        GamePhase::EndRound => None,
    }
}

fn records(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

// ---------------------------------------------------------------------------
// Turn snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnHeader {
    /// Server id of the player holding the turn.
    pub player_id: i64,
    pub phase: GamePhase,
}

/// Field 0 is the acting player, field 3 (optional) the phase code.
/// A header without a phase code means positioning.
pub fn parse_turn_header(line: &str) -> KingResult<TurnHeader> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let player_id = fields
        .first()
        .and_then(|f| f.parse::<i64>().ok())
        .ok_or_else(|| KingError::InvalidTurnHeader(line.to_string()))?;
    let phase = match fields.get(3) {
        Some(code) if !code.is_empty() => phase_from_code(code)?,
        _ => GamePhase::Placement,
    };
    Ok(TurnHeader { player_id, phase })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardEntry {
    pub floor: Floor,
    pub character_id: usize,
}

pub fn parse_board_line(line: &str) -> KingResult<BoardEntry> {
    let mut fields = line.split(',').map(str::trim);
    let floor = fields
        .next()
        .and_then(|f| f.parse::<i64>().ok())
        .ok_or_else(|| KingError::InvalidBoardLine(line.to_string()))?;
    let code = fields
        .next()
        .and_then(|f| f.chars().next())
        .ok_or_else(|| KingError::InvalidBoardLine(line.to_string()))?;
    Ok(BoardEntry {
        floor: Floor::from_index(floor)?,
        character_id: character_id(code)?,
    })
}

/// Parse a board made only of `floor,code` lines.
pub fn parse_board(text: &str) -> KingResult<Vec<BoardEntry>> {
    records(text).map(parse_board_line).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSnapshot {
    pub header: TurnHeader,
    pub board: Vec<BoardEntry>,
}

pub fn parse_turn_snapshot(text: &str) -> KingResult<TurnSnapshot> {
    let mut lines = records(text);
    let header = lines
        .next()
        .ok_or_else(|| KingError::InvalidTurnHeader(String::new()))
        .and_then(parse_turn_header)?;
    let board = lines.map(parse_board_line).collect::<KingResult<Vec<_>>>()?;
    Ok(TurnSnapshot { header, board })
}

/// Roster characters that do not appear on the board, in id order.
pub fn available_characters(board: &[BoardEntry]) -> Vec<usize> {
    (0..ROSTER_SIZE)
        .filter(|id| !board.iter().any(|entry| entry.character_id == *id))
        .collect()
}

// ---------------------------------------------------------------------------
// Roster and hand
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub id: i64,
    pub name: String,
    pub score: u32,
}

pub fn parse_roster(text: &str) -> KingResult<Vec<RosterEntry>> {
    records(text)
        .map(|line| {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let bad = || KingError::InvalidPlayerRecord(line.to_string());
            if fields.len() < 3 {
                return Err(bad());
            }
            Ok(RosterEntry {
                id: fields[0].parse().map_err(|_| bad())?,
                name: fields[1].to_string(),
                score: fields[2].parse().map_err(|_| bad())?,
            })
        })
        .collect()
}

/// Favorite character ids from a hand string. Codes may be concatenated or
/// separated by commas or newlines; repeats are ignored.
pub fn parse_hand(text: &str) -> KingResult<Vec<usize>> {
    let mut hand = Vec::with_capacity(FAVORITES_PER_PLAYER);
    for code in text.chars().filter(|c| c.is_alphabetic()) {
        let id = character_id(code)?;
        if !hand.contains(&id) && hand.len() < FAVORITES_PER_PLAYER {
            hand.push(id);
        }
    }
    if hand.len() < FAVORITES_PER_PLAYER {
        return Err(KingError::IncompleteHand {
            need: FAVORITES_PER_PLAYER,
            got: hand.len(),
        });
    }
    Ok(hand)
}

// ---------------------------------------------------------------------------
// Moves on the wire
// ---------------------------------------------------------------------------

pub fn encode_move(mv: &Move) -> String {
    match *mv {
        Move::Placement { character_id, target_floor } => format!(
            "{},{}",
            target_floor.index(),
            character_code(character_id).unwrap_or('?')
        ),
        Move::Ascension { character_id } => character_code(character_id).unwrap_or('?').to_string(),
        Move::Voting { vote_yes: true } => "s".to_string(),
        Move::Voting { vote_yes: false } => "n".to_string(),
    }
}

/// Read a wire move back; the phase decides which shape is expected.
pub fn decode_move(phase: GamePhase, text: &str) -> KingResult<Move> {
    let text = text.trim();
    let bad = || KingError::InvalidWireMove(text.to_string());
    match phase {
        GamePhase::Placement => {
            let entry = parse_board_line(text).map_err(|_| bad())?;
            Ok(Move::Placement {
                character_id: entry.character_id,
                target_floor: entry.floor,
            })
        }
        GamePhase::Ascension => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(code), None) => Ok(Move::Ascension {
                    character_id: character_id(code)?,
                }),
                _ => Err(bad()),
            }
        }
        GamePhase::Voting => match text {
            "s" | "S" => Ok(Move::Voting { vote_yes: true }),
            "n" | "N" => Ok(Move::Voting { vote_yes: false }),
            _ => Err(bad()),
        },
        GamePhase::EndRound => Err(bad()),
    }
}

// ---------------------------------------------------------------------------
// Snapshot -> GameState
// ---------------------------------------------------------------------------

/// Reconstruct a `GameState` from server records.
///
/// Turn order follows the roster. Our favorites come from `hand`; the
/// opponents' favorites are hidden, so each is dealt at random from `rng`.
/// Returns the state and our index in it.
pub fn build_state<R: Rng + ?Sized>(
    snapshot: &TurnSnapshot,
    roster: &[RosterEntry],
    my_id: i64,
    hand: &[usize],
    rng: &mut R,
) -> KingResult<(GameState, usize)> {
    let no_votes = no_votes_for(roster.len())?;
    let seat_of = |server_id: i64| {
        roster
            .iter()
            .position(|entry| entry.id == server_id)
            .ok_or(KingError::UnknownPlayer(server_id))
    };
    let me = seat_of(my_id)?;
    let current = seat_of(snapshot.header.player_id)?;

    let players = roster
        .iter()
        .enumerate()
        .map(|(seat, entry)| {
            let favorites = if seat == me {
                hand.to_vec()
            } else {
                deal_favorites(rng)
            };
            let mut player = Player::new(seat, favorites, no_votes)?;
            player.score = entry.score;
            Ok(player)
        })
        .collect::<KingResult<Vec<_>>>()?;

    let mut state = GameState::new(players)?;
    state.current_player_index = current;
    state.current_phase = snapshot.header.phase;

    for entry in &snapshot.board {
        if let Some(character) = state.character_mut(entry.character_id) {
            character.current_floor = entry.floor;
        }
    }

    state.characters_placed_this_round = match state.current_phase {
        GamePhase::Placement => snapshot
            .board
            .iter()
            .filter(|entry| entry.floor != Floor::Servants)
            .count(),
        _ => state.players.len() * state.characters_to_place_per_player(),
    };

    Ok((state, me))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_without_phase_is_positioning() {
        let header = parse_turn_header("42,1,x").unwrap();
        assert_eq!(header.player_id, 42);
        assert_eq!(header.phase, GamePhase::Placement);
    }

    #[test]
    fn header_with_unknown_phase_fails() {
        assert!(matches!(
            parse_turn_header("42,1,x,Z"),
            Err(KingError::InvalidPhaseCode(_))
        ));
    }

    #[test]
    fn board_line_rejects_bad_floor() {
        assert!(matches!(
            parse_board_line("9,A"),
            Err(KingError::InvalidFloor(9))
        ));
        assert!(parse_board_line("x,A").is_err());
        assert!(matches!(
            parse_board_line("1,Z"),
            Err(KingError::InvalidCharacterCode('Z'))
        ));
    }

    #[test]
    fn decode_rejects_wrong_shape() {
        assert!(decode_move(GamePhase::Voting, "x").is_err());
        assert!(decode_move(GamePhase::Ascension, "AB").is_err());
        assert!(decode_move(GamePhase::EndRound, "s").is_err());
    }
}
