//! Domain model: the castle floors, the 13-character roster, players and
//! the full game snapshot that the rules engine mutates.
//!
//! `GameState` owns every `Character` and `Player` by value, so `clone()`
//! is a full deep copy. Tree search relies on this: each search node and
//! each rollout works on its own independent copy.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::error::{KingError, KingResult};

pub const ROSTER_SIZE: usize = 13;
pub const FAVORITES_PER_PLAYER: usize = 6;
pub const MAX_PER_FLOOR: usize = 4;
pub const MAX_ROUNDS: u32 = 3;
pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 6;

/// Reference ceiling for one round's score.
pub const MAX_SCORE_PER_ROUND: u32 = 33;

/// Normalizer for rollout evaluation: 33 points per round over 3 rounds.
pub const MAX_TOTAL_SCORE: u32 = MAX_SCORE_PER_ROUND * MAX_ROUNDS;

/// Fixed roster: (wire code, display name), indexed by character id.
pub const ROSTER: [(char, &str); ROSTER_SIZE] = [
    ('A', "Adilson Konrad"),
    ('B', "Beatriz Paiva"),
    ('C', "Claro"),
    ('D', "Douglas Baquiao"),
    ('E', "Eduardo Takeo"),
    ('G', "Guilherme Rey"),
    ('H', "Heredia"),
    ('K', "Karin"),
    ('L', "Leonardo Takuno"),
    ('M', "Mario Toledo"),
    ('Q', "Quintas"),
    ('R', "Ranulfo"),
    ('T', "Toshio"),
];

static CODE_TO_ID: Lazy<HashMap<char, usize>> = Lazy::new(|| {
    ROSTER
        .iter()
        .enumerate()
        .map(|(id, (code, _))| (*code, id))
        .collect()
});

/// Character id for a wire code (case-insensitive).
pub fn character_id(code: char) -> KingResult<usize> {
    CODE_TO_ID
        .get(&code.to_ascii_uppercase())
        .copied()
        .ok_or(KingError::InvalidCharacterCode(code))
}

/// Wire code for a character id.
pub fn character_code(id: usize) -> Option<char> {
    ROSTER.get(id).map(|(code, _)| *code)
}

// ---------------------------------------------------------------------------
// Floors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Floor {
    Servants = 0,
    Artisans = 1,
    Merchants = 2,
    Officers = 3,
    Dignitaries = 4,
    Nobles = 5,
    Throne = 6,
}

pub const ALL_FLOORS: [Floor; 7] = [
    Floor::Servants,
    Floor::Artisans,
    Floor::Merchants,
    Floor::Officers,
    Floor::Dignitaries,
    Floor::Nobles,
    Floor::Throne,
];

impl Floor {
    pub fn from_index(index: i64) -> KingResult<Floor> {
        usize::try_from(index)
            .ok()
            .and_then(|i| ALL_FLOORS.get(i).copied())
            .ok_or(KingError::InvalidFloor(index))
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// The floor directly above, `None` on the Throne.
    pub fn above(self) -> Option<Floor> {
        ALL_FLOORS.get(self.index() + 1).copied()
    }

    /// Points a favorite character earns its owner on this floor.
    pub fn points(self) -> u32 {
        match self {
            Floor::Throne => 10,
            Floor::Nobles => 5,
            Floor::Dignitaries => 4,
            Floor::Officers => 3,
            Floor::Merchants => 2,
            Floor::Artisans => 1,
            Floor::Servants => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Floor::Servants => "Servants",
            Floor::Artisans => "Artisans",
            Floor::Merchants => "Merchants",
            Floor::Officers => "Officers",
            Floor::Dignitaries => "Dignitaries",
            Floor::Nobles => "Nobles",
            Floor::Throne => "Throne",
        }
    }
}

impl fmt::Display for Floor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Characters and players
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Character {
    pub id: usize,
    name: &'static str,
    pub current_floor: Floor,
    pub is_eliminated: bool,
}

impl Character {
    pub fn new(id: usize, name: &'static str) -> Character {
        Character {
            id,
            name,
            current_floor: Floor::Servants,
            is_eliminated: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn code(&self) -> char {
        character_code(self.id).unwrap_or('?')
    }

    fn reset(&mut self) {
        self.current_floor = Floor::Servants;
        self.is_eliminated = false;
    }
}

/// No-votes handed out per player for a given table size.
pub fn no_votes_for(num_players: usize) -> KingResult<u32> {
    match num_players {
        2 | 3 => Ok(4),
        4 => Ok(3),
        5 | 6 => Ok(2),
        n => Err(KingError::InvalidConfiguration(format!(
            "unsupported player count {}",
            n
        ))),
    }
}

/// Characters each player places during the placement phase.
pub fn characters_to_place_for(num_players: usize) -> KingResult<usize> {
    match num_players {
        2 => Ok(6),
        3 => Ok(4),
        4 => Ok(3),
        5 | 6 => Ok(2),
        n => Err(KingError::InvalidConfiguration(format!(
            "unsupported player count {}",
            n
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: usize,
    favorites: Vec<usize>,
    pub score: u32,
    pub yes_votes: u32,
    pub no_votes: u32,
}

impl Player {
    /// A player with exactly six distinct favorite character ids.
    pub fn new(id: usize, favorites: Vec<usize>, no_votes: u32) -> KingResult<Player> {
        if favorites.len() != FAVORITES_PER_PLAYER {
            return Err(KingError::InvalidConfiguration(format!(
                "player {} needs {} favorites, got {}",
                id,
                FAVORITES_PER_PLAYER,
                favorites.len()
            )));
        }
        let mut seen = [false; ROSTER_SIZE];
        for &fav in &favorites {
            if fav >= ROSTER_SIZE || seen[fav] {
                return Err(KingError::InvalidConfiguration(format!(
                    "player {} has invalid or duplicate favorite {}",
                    id, fav
                )));
            }
            seen[fav] = true;
        }
        Ok(Player {
            id,
            favorites,
            score: 0,
            yes_votes: 1,
            no_votes,
        })
    }

    pub fn favorites(&self) -> &[usize] {
        &self.favorites
    }

    pub fn is_favorite(&self, character_id: usize) -> bool {
        self.favorites.contains(&character_id)
    }

    pub fn has_no_votes(&self) -> bool {
        self.no_votes > 0
    }

    pub fn use_no_vote(&mut self) -> KingResult<()> {
        if self.no_votes == 0 {
            return Err(KingError::InvalidState(format!(
                "player {} has no no-votes left",
                self.id
            )));
        }
        self.no_votes -= 1;
        Ok(())
    }

    /// Points this player's favorites are worth on the current board.
    /// Eliminated or unknown characters contribute nothing.
    pub fn calculate_score(&self, characters: &[Character]) -> u32 {
        self.favorites
            .iter()
            .filter_map(|&id| characters.iter().find(|c| c.id == id))
            .filter(|c| !c.is_eliminated)
            .map(|c| c.current_floor.points())
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Game state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GamePhase {
    Placement,
    Ascension,
    Voting,
    EndRound,
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GamePhase::Placement => "Placement",
            GamePhase::Ascension => "Ascension",
            GamePhase::Voting => "Voting",
            GamePhase::EndRound => "End of round",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub characters: Vec<Character>,
    pub players: Vec<Player>,
    pub current_round: u32,
    pub current_player_index: usize,
    pub current_phase: GamePhase,
    pub characters_placed_this_round: usize,
    characters_to_place_per_player: usize,
}

impl GameState {
    /// Fresh round-one state: full roster on Servants, placement phase.
    pub fn new(players: Vec<Player>) -> KingResult<GameState> {
        let characters_to_place_per_player = characters_to_place_for(players.len())?;
        let characters = ROSTER
            .iter()
            .enumerate()
            .map(|(id, (_, name))| Character::new(id, name))
            .collect();
        Ok(GameState {
            characters,
            players,
            current_round: 1,
            current_player_index: 0,
            current_phase: GamePhase::Placement,
            characters_placed_this_round: 0,
            characters_to_place_per_player,
        })
    }

    pub fn characters_to_place_per_player(&self) -> usize {
        self.characters_to_place_per_player
    }

    pub fn is_game_over(&self) -> bool {
        self.current_round > MAX_ROUNDS
    }

    pub fn is_placement_phase_complete(&self) -> bool {
        self.characters_placed_this_round >= self.players.len() * self.characters_to_place_per_player
    }

    pub fn character(&self, id: usize) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    pub fn character_mut(&mut self, id: usize) -> Option<&mut Character> {
        self.characters.iter_mut().find(|c| c.id == id)
    }

    /// Non-eliminated characters standing on `floor`.
    pub fn count_on_floor(&self, floor: Floor) -> usize {
        self.characters
            .iter()
            .filter(|c| c.current_floor == floor && !c.is_eliminated)
            .count()
    }

    pub fn characters_on_floor(&self, floor: Floor) -> impl Iterator<Item = &Character> {
        self.characters
            .iter()
            .filter(move |c| c.current_floor == floor && !c.is_eliminated)
    }

    pub fn available_for_placement(&self) -> impl Iterator<Item = &Character> {
        self.characters_on_floor(Floor::Servants)
    }

    /// The character a coronation vote is about: the first non-eliminated
    /// Throne occupant in roster order. A king accepted earlier in the round
    /// stays on the Throne and keeps this spot.
    pub fn throne_occupant(&self) -> Option<&Character> {
        self.characters_on_floor(Floor::Throne).next()
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_player_index)
    }

    pub fn current_player_mut(&mut self) -> Option<&mut Player> {
        self.players.get_mut(self.current_player_index)
    }

    pub fn next_player(&mut self) {
        if !self.players.is_empty() {
            self.current_player_index = (self.current_player_index + 1) % self.players.len();
        }
    }

    /// Advance the phase machine.
    ///
    /// Placement -> Ascension -> EndRound -> Placement of the next round,
    /// and Voting -> Ascension. Leaving EndRound after the last round makes
    /// the state terminal and keeps the phase (and the final board) as is.
    pub fn transition_to_next_phase(&mut self) {
        match self.current_phase {
            GamePhase::Placement => self.current_phase = GamePhase::Ascension,
            GamePhase::Ascension => self.current_phase = GamePhase::EndRound,
            GamePhase::Voting => self.current_phase = GamePhase::Ascension,
            GamePhase::EndRound => {
                self.current_round += 1;
                if self.current_round <= MAX_ROUNDS {
                    self.reset_for_new_round();
                    self.current_phase = GamePhase::Placement;
                }
            }
        }
    }

    fn reset_for_new_round(&mut self) {
        for character in &mut self.characters {
            character.reset();
        }
        self.characters_placed_this_round = 0;
        self.current_player_index = 0;
    }
}
