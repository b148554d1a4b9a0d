//! Rules engine: legal move generation, move application and game setup.
//!
//! All functions are free and stateless. `apply_move` validates a move in
//! full before touching the state, so a rejected move leaves it unchanged.

use rand::seq::index::sample;
use rand::Rng;

use crate::error::{KingError, KingResult};
use crate::model::{
    no_votes_for, Floor, GamePhase, GameState, Player, FAVORITES_PER_PLAYER, MAX_PER_FLOOR,
    ROSTER_SIZE,
};
use crate::moves::Move;

/// Floors a character may be placed on from the Servants floor.
pub const PLACEMENT_FLOORS: [Floor; 4] = [
    Floor::Artisans,
    Floor::Merchants,
    Floor::Officers,
    Floor::Dignitaries,
];

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

/// Build a fresh game where each player's favorites are given explicitly.
pub fn setup_game_with_favorites(favorites: Vec<Vec<usize>>) -> KingResult<GameState> {
    let no_votes = no_votes_for(favorites.len())?;
    let players = favorites
        .into_iter()
        .enumerate()
        .map(|(id, favs)| Player::new(id, favs, no_votes))
        .collect::<KingResult<Vec<_>>>()?;
    GameState::new(players)
}

/// Build a fresh game for `num_players`, dealing each player six distinct
/// favorites at random.
pub fn setup_game<R: Rng + ?Sized>(num_players: usize, rng: &mut R) -> KingResult<GameState> {
    no_votes_for(num_players)?;
    let favorites = (0..num_players)
        .map(|_| deal_favorites(rng))
        .collect();
    setup_game_with_favorites(favorites)
}

/// Six distinct character ids drawn uniformly from the roster.
pub fn deal_favorites<R: Rng + ?Sized>(rng: &mut R) -> Vec<usize> {
    sample(rng, ROSTER_SIZE, FAVORITES_PER_PLAYER).into_vec()
}

// ---------------------------------------------------------------------------
// Move generation
// ---------------------------------------------------------------------------

/// Every legal move for the current phase. Empty when the phase has nothing
/// left to do; the caller must then call `transition_to_next_phase`.
pub fn get_valid_moves(state: &GameState) -> Vec<Move> {
    match state.current_phase {
        GamePhase::Placement => placement_moves(state),
        GamePhase::Ascension => ascension_moves(state),
        GamePhase::Voting => voting_moves(state),
        GamePhase::EndRound => Vec::new(),
    }
}

fn placement_moves(state: &GameState) -> Vec<Move> {
    let open_floors: Vec<Floor> = PLACEMENT_FLOORS
        .iter()
        .copied()
        .filter(|&floor| state.count_on_floor(floor) < MAX_PER_FLOOR)
        .collect();

    state
        .available_for_placement()
        .flat_map(|c| {
            open_floors.iter().map(move |&target_floor| Move::Placement {
                character_id: c.id,
                target_floor,
            })
        })
        .collect()
}

fn ascension_moves(state: &GameState) -> Vec<Move> {
    state
        .characters
        .iter()
        .filter(|c| !c.is_eliminated)
        .filter_map(|c| {
            let target = c.current_floor.above()?;
            if target == Floor::Throne || state.count_on_floor(target) < MAX_PER_FLOOR {
                Some(Move::Ascension { character_id: c.id })
            } else {
                None
            }
        })
        .collect()
}

fn voting_moves(state: &GameState) -> Vec<Move> {
    let mut moves = vec![Move::Voting { vote_yes: true }];
    if state.current_player().is_some_and(Player::has_no_votes) {
        moves.push(Move::Voting { vote_yes: false });
    }
    moves
}

// ---------------------------------------------------------------------------
// Move application
// ---------------------------------------------------------------------------

pub fn apply_move(state: &mut GameState, mv: &Move) -> KingResult<()> {
    match *mv {
        Move::Placement { character_id, target_floor } => {
            apply_placement(state, character_id, target_floor)
        }
        Move::Ascension { character_id } => apply_ascension(state, character_id),
        Move::Voting { vote_yes } => apply_vote(state, vote_yes),
    }
}

fn expect_phase(state: &GameState, phase: GamePhase, mv: &str) -> KingResult<()> {
    if state.current_phase != phase {
        return Err(KingError::InvalidMove(format!(
            "{} is not allowed during the {} phase",
            mv, state.current_phase
        )));
    }
    Ok(())
}

fn apply_placement(state: &mut GameState, character_id: usize, target: Floor) -> KingResult<()> {
    expect_phase(state, GamePhase::Placement, "placement")?;

    if !PLACEMENT_FLOORS.contains(&target) {
        return Err(KingError::InvalidMove(format!(
            "characters cannot be placed on {}",
            target
        )));
    }
    let character = state
        .character(character_id)
        .ok_or_else(|| KingError::InvalidMove(format!("unknown character {}", character_id)))?;
    if character.is_eliminated || character.current_floor != Floor::Servants {
        return Err(KingError::InvalidMove(format!(
            "{} is not available for placement",
            character.name()
        )));
    }
    if state.count_on_floor(target) >= MAX_PER_FLOOR {
        return Err(KingError::InvalidState(format!("{} is full", target)));
    }

    if let Some(character) = state.character_mut(character_id) {
        character.current_floor = target;
    }
    state.characters_placed_this_round += 1;
    state.next_player();

    if state.is_placement_phase_complete() {
        state.transition_to_next_phase();
    }
    Ok(())
}

fn apply_ascension(state: &mut GameState, character_id: usize) -> KingResult<()> {
    expect_phase(state, GamePhase::Ascension, "ascension")?;

    let character = state
        .character(character_id)
        .ok_or_else(|| KingError::InvalidMove(format!("unknown character {}", character_id)))?;
    if character.is_eliminated {
        return Err(KingError::InvalidMove(format!(
            "{} has been eliminated",
            character.name()
        )));
    }
    let target = character.current_floor.above().ok_or_else(|| {
        KingError::InvalidMove(format!("{} is already on the Throne", character.name()))
    })?;
    if target != Floor::Throne && state.count_on_floor(target) >= MAX_PER_FLOOR {
        return Err(KingError::InvalidState(format!("{} is full", target)));
    }

    if let Some(character) = state.character_mut(character_id) {
        character.current_floor = target;
    }

    if target == Floor::Throne {
        state.current_phase = GamePhase::Voting;
    } else {
        state.next_player();
    }
    Ok(())
}

fn apply_vote(state: &mut GameState, vote_yes: bool) -> KingResult<()> {
    expect_phase(state, GamePhase::Voting, "voting")?;

    let voter = state
        .current_player()
        .ok_or_else(|| KingError::InvalidState("no player holds the turn".to_string()))?;
    if !vote_yes && !voter.has_no_votes() {
        return Err(KingError::InvalidState(format!(
            "player {} has no no-votes left",
            voter.id
        )));
    }

    if vote_yes {
        // Every accepted coronation pays out, so several crownings in one
        // round pay out several times.
        let characters = &state.characters;
        for player in &mut state.players {
            player.score += player.calculate_score(characters);
        }
        state.transition_to_next_phase();
        return Ok(());
    }

    if let Some(player) = state.current_player_mut() {
        player.use_no_vote()?;
    }
    if let Some(id) = state.throne_occupant().map(|c| c.id) {
        if let Some(crowned) = state.character_mut(id) {
            crowned.is_eliminated = true;
            crowned.current_floor = Floor::Servants;
        }
    }
    state.next_player();
    state.current_phase = GamePhase::Ascension;
    Ok(())
}
