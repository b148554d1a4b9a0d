use king_me::error::KingError;
use king_me::model::*;
use king_me::moves::Move;
use king_me::rules::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn four_player_state() -> GameState {
    setup_game_with_favorites(vec![
        vec![0, 1, 2, 3, 4, 5],
        vec![6, 7, 8, 9, 10, 11],
        vec![12, 0, 2, 4, 6, 8],
        vec![1, 3, 5, 7, 9, 11],
    ])
    .unwrap()
}

/// Four-player state in the Ascension phase with character 0 on Nobles.
fn ascension_state() -> GameState {
    let mut state = four_player_state();
    state.current_phase = GamePhase::Ascension;
    state.characters_placed_this_round = 12;
    state.characters[0].current_floor = Floor::Nobles;
    state
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

#[test]
fn test_first_placement() {
    let mut state = four_player_state();
    apply_move(
        &mut state,
        &Move::Placement { character_id: 0, target_floor: Floor::Artisans },
    )
    .unwrap();
    assert_eq!(state.characters[0].current_floor, Floor::Artisans);
    assert_eq!(state.characters_placed_this_round, 1);
    assert_eq!(state.current_player_index, 1);
    assert_eq!(state.current_phase, GamePhase::Placement);
}

#[test]
fn test_last_placement_opens_ascension() {
    let mut state = four_player_state();
    let floors = [Floor::Artisans, Floor::Merchants, Floor::Officers];
    for id in 0..12 {
        assert_eq!(state.current_phase, GamePhase::Placement, "placement {}", id);
        let mv = Move::Placement { character_id: id, target_floor: floors[id % 3] };
        apply_move(&mut state, &mv).unwrap();
    }
    assert_eq!(state.characters_placed_this_round, 12);
    assert_eq!(state.current_phase, GamePhase::Ascension);
}

#[test]
fn test_placement_moves_cover_open_floors() {
    let state = four_player_state();
    let moves = get_valid_moves(&state);
    assert_eq!(moves.len(), ROSTER_SIZE * PLACEMENT_FLOORS.len());
    assert!(moves.iter().all(|m| matches!(
        m,
        Move::Placement { target_floor, .. } if PLACEMENT_FLOORS.contains(target_floor)
    )));
}

#[test]
fn test_full_floor_is_not_offered() {
    let mut state = four_player_state();
    for id in 0..MAX_PER_FLOOR {
        state.characters[id].current_floor = Floor::Merchants;
    }
    let moves = get_valid_moves(&state);
    assert!(!moves.iter().any(|m| matches!(
        m,
        Move::Placement { target_floor: Floor::Merchants, .. }
    )));

    let before = state.clone();
    let err = apply_move(
        &mut state,
        &Move::Placement { character_id: 8, target_floor: Floor::Merchants },
    );
    assert!(matches!(err, Err(KingError::InvalidState(_))));
    assert_eq!(state, before);
}

#[test]
fn test_placement_rejects_bad_target_and_character() {
    let mut state = four_player_state();
    state.characters[3].current_floor = Floor::Artisans;
    let before = state.clone();

    for mv in [
        Move::Placement { character_id: 0, target_floor: Floor::Nobles },
        Move::Placement { character_id: 0, target_floor: Floor::Servants },
        Move::Placement { character_id: 3, target_floor: Floor::Merchants },
        Move::Placement { character_id: 99, target_floor: Floor::Merchants },
    ] {
        assert!(
            matches!(apply_move(&mut state, &mv), Err(KingError::InvalidMove(_))),
            "{:?} should be rejected",
            mv
        );
    }
    assert_eq!(state, before);
}

#[test]
fn test_move_outside_its_phase_is_rejected() {
    let mut state = four_player_state();
    let before = state.clone();
    assert!(matches!(
        apply_move(&mut state, &Move::Ascension { character_id: 0 }),
        Err(KingError::InvalidMove(_))
    ));
    assert!(matches!(
        apply_move(&mut state, &Move::Voting { vote_yes: true }),
        Err(KingError::InvalidMove(_))
    ));
    assert_eq!(state, before);
}

// ---------------------------------------------------------------------------
// Ascension and voting
// ---------------------------------------------------------------------------

#[test]
fn test_crowning_opens_vote_without_passing_turn() {
    let mut state = ascension_state();
    state.current_player_index = 2;
    apply_move(&mut state, &Move::Ascension { character_id: 0 }).unwrap();
    assert_eq!(state.characters[0].current_floor, Floor::Throne);
    assert_eq!(state.current_phase, GamePhase::Voting);
    assert_eq!(state.current_player_index, 2);
    assert_eq!(state.throne_occupant().map(|c| c.id), Some(0));
}

#[test]
fn test_ordinary_ascension_passes_turn() {
    let mut state = ascension_state();
    state.characters[5].current_floor = Floor::Artisans;
    apply_move(&mut state, &Move::Ascension { character_id: 5 }).unwrap();
    assert_eq!(state.characters[5].current_floor, Floor::Merchants);
    assert_eq!(state.current_phase, GamePhase::Ascension);
    assert_eq!(state.current_player_index, 1);
}

#[test]
fn test_ascension_into_full_floor_is_blocked() {
    let mut state = ascension_state();
    for id in 1..=MAX_PER_FLOOR {
        state.characters[id].current_floor = Floor::Officers;
    }
    state.characters[8].current_floor = Floor::Merchants;
    assert!(!get_valid_moves(&state).contains(&Move::Ascension { character_id: 8 }));
    assert!(matches!(
        apply_move(&mut state, &Move::Ascension { character_id: 8 }),
        Err(KingError::InvalidState(_))
    ));
}

#[test]
fn test_throne_character_cannot_ascend() {
    let mut state = ascension_state();
    state.characters[4].current_floor = Floor::Throne;
    assert!(!get_valid_moves(&state).contains(&Move::Ascension { character_id: 4 }));
    assert!(matches!(
        apply_move(&mut state, &Move::Ascension { character_id: 4 }),
        Err(KingError::InvalidMove(_))
    ));
}

#[test]
fn test_no_vote_eliminates_the_crowned_character() {
    let mut state = ascension_state();
    state.current_player_index = 1;
    apply_move(&mut state, &Move::Ascension { character_id: 0 }).unwrap();
    assert_eq!(state.players[1].no_votes, 3);

    apply_move(&mut state, &Move::Voting { vote_yes: false }).unwrap();

    assert_eq!(state.players[1].no_votes, 2);
    assert!(state.characters[0].is_eliminated);
    assert_eq!(state.characters[0].current_floor, Floor::Servants);
    assert_eq!(state.current_phase, GamePhase::Ascension);
    assert_eq!(state.current_player_index, 2);
    assert!(state.throne_occupant().is_none());
}

#[test]
fn test_yes_vote_scores_every_player() {
    let mut state = ascension_state();
    state.characters[6].current_floor = Floor::Dignitaries;
    apply_move(&mut state, &Move::Ascension { character_id: 0 }).unwrap();
    apply_move(&mut state, &Move::Voting { vote_yes: true }).unwrap();

    // Character 0 on the Throne (10), character 6 on Dignitaries (4).
    let scores: Vec<u32> = state.players.iter().map(|p| p.score).collect();
    assert_eq!(scores, vec![10, 4, 14, 0]);
    assert_eq!(state.current_phase, GamePhase::Ascension);
    assert!(!state.characters[0].is_eliminated);
}

/// Crown character 0 with a yes vote, then bring character 5 up from Nobles.
fn second_coronation() -> GameState {
    let mut state = ascension_state();
    state.characters[5].current_floor = Floor::Nobles;
    apply_move(&mut state, &Move::Ascension { character_id: 0 }).unwrap();
    apply_move(&mut state, &Move::Voting { vote_yes: true }).unwrap();
    apply_move(&mut state, &Move::Ascension { character_id: 5 }).unwrap();
    state
}

#[test]
fn test_each_accepted_coronation_pays_out() {
    let mut state = ascension_state();
    state.characters[5].current_floor = Floor::Nobles;
    apply_move(&mut state, &Move::Ascension { character_id: 0 }).unwrap();
    apply_move(&mut state, &Move::Voting { vote_yes: true }).unwrap();

    // Character 0 on the Throne (10), character 5 on Nobles (5).
    let scores: Vec<u32> = state.players.iter().map(|p| p.score).collect();
    assert_eq!(scores, vec![15, 0, 10, 5]);

    apply_move(&mut state, &Move::Ascension { character_id: 5 }).unwrap();
    assert_eq!(state.current_phase, GamePhase::Voting);
    apply_move(&mut state, &Move::Voting { vote_yes: true }).unwrap();

    // Both on the Throne now; the board is scored again on top.
    let scores: Vec<u32> = state.players.iter().map(|p| p.score).collect();
    assert_eq!(scores, vec![35, 0, 20, 15]);
}

#[test]
fn test_no_vote_with_two_kings_hits_first_in_roster() {
    let mut state = second_coronation();
    assert_eq!(state.count_on_floor(Floor::Throne), 2);
    assert_eq!(state.throne_occupant().map(|c| c.id), Some(0));

    apply_move(&mut state, &Move::Voting { vote_yes: false }).unwrap();

    assert!(state.characters[0].is_eliminated);
    assert_eq!(state.characters[0].current_floor, Floor::Servants);
    assert!(!state.characters[5].is_eliminated);
    assert_eq!(state.characters[5].current_floor, Floor::Throne);
    assert_eq!(state.throne_occupant().map(|c| c.id), Some(5));
    assert_eq!(state.players[0].no_votes, 2);
}

#[test]
fn test_out_of_no_votes_leaves_only_yes() {
    let mut state = ascension_state();
    apply_move(&mut state, &Move::Ascension { character_id: 0 }).unwrap();
    state.players[0].no_votes = 0;

    assert_eq!(get_valid_moves(&state), vec![Move::Voting { vote_yes: true }]);

    let before = state.clone();
    assert!(matches!(
        apply_move(&mut state, &Move::Voting { vote_yes: false }),
        Err(KingError::InvalidState(_))
    ));
    assert_eq!(state, before);
}

#[test]
fn test_end_round_has_no_moves() {
    let mut state = four_player_state();
    state.current_phase = GamePhase::EndRound;
    assert!(get_valid_moves(&state).is_empty());
}

// ---------------------------------------------------------------------------
// Random playouts
// ---------------------------------------------------------------------------

fn assert_capacity(state: &GameState) {
    for floor in ALL_FLOORS.iter().filter(|&&f| f != Floor::Throne) {
        assert!(
            state.count_on_floor(*floor) <= MAX_PER_FLOOR,
            "{} holds {}",
            floor,
            state.count_on_floor(*floor)
        );
    }
}

#[test]
fn test_every_generated_move_applies_cleanly() {
    let mut rng = StdRng::seed_from_u64(2024);
    for game in 0..30 {
        let players = 2 + game % 5;
        let mut state = setup_game(players, &mut rng).unwrap();
        let mut steps = 0;
        while !state.is_game_over() {
            let moves = get_valid_moves(&state);
            if moves.is_empty() {
                state.transition_to_next_phase();
                continue;
            }
            for mv in &moves {
                let mut probe = state.clone();
                apply_move(&mut probe, mv)
                    .unwrap_or_else(|e| panic!("{:?} rejected in {:?}: {}", mv, state.current_phase, e));
                assert_capacity(&probe);
            }
            let mv = moves[rng.gen_range(0..moves.len())];
            apply_move(&mut state, &mv).unwrap();
            assert_capacity(&state);
            steps += 1;
            assert!(steps < 10_000, "playout did not terminate");
        }
        assert_eq!(state.current_round, MAX_ROUNDS + 1);
    }
}

#[test]
fn test_setup_game_deals_valid_hands() {
    let mut rng = StdRng::seed_from_u64(9);
    for players in MIN_PLAYERS..=MAX_PLAYERS {
        let state = setup_game(players, &mut rng).unwrap();
        assert_eq!(state.players.len(), players);
        for player in &state.players {
            assert_eq!(player.favorites().len(), FAVORITES_PER_PLAYER);
            assert_eq!(player.no_votes, no_votes_for(players).unwrap());
        }
    }
    assert!(setup_game(1, &mut rng).is_err());
    assert!(setup_game(7, &mut rng).is_err());
}
