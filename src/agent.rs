//! Decision agent: one search per decision point, with an optional
//! rule-based policy for coronation votes.

use tracing::debug;

use crate::config::{AgentConfig, VotingPolicy};
use crate::error::KingResult;
use crate::model::{Character, Floor, GamePhase, GameState, Player, MAX_ROUNDS};
use crate::moves::Move;
use crate::search::{ParallelSearch, SearchReport};

/// A chosen move and, when it came from search, the statistics behind it.
#[derive(Debug, Clone)]
pub struct Decision {
    pub mv: Option<Move>,
    pub report: Option<SearchReport>,
}

pub struct DecisionAgent {
    player_id: usize,
    config: AgentConfig,
}

impl DecisionAgent {
    pub fn new(player_id: usize, config: AgentConfig) -> Self {
        DecisionAgent { player_id, config }
    }

    pub fn player_id(&self) -> usize {
        self.player_id
    }

    pub fn make_move(&self, state: &GameState) -> KingResult<Option<Move>> {
        Ok(self.decide(state)?.mv)
    }

    pub fn decide(&self, state: &GameState) -> KingResult<Decision> {
        if state.current_phase == GamePhase::Voting && self.config.voting != VotingPolicy::Search {
            let mv = self.vote(state, self.config.voting);
            debug!(player = self.player_id, policy = self.config.voting.as_str(), ?mv, "rule-based vote");
            return Ok(Decision { mv: Some(mv), report: None });
        }

        let report = ParallelSearch::new(self.config.search.clone()).search(state, self.player_id)?;
        Ok(Decision {
            mv: report.best_move,
            report: Some(report),
        })
    }

    fn vote(&self, state: &GameState, policy: VotingPolicy) -> Move {
        let accept = Move::Voting { vote_yes: true };
        let Some(player) = state.players.get(self.player_id) else {
            return accept;
        };
        let Some(crowned) = state.throne_occupant() else {
            return accept;
        };
        if !player.has_no_votes() {
            return accept;
        }

        let reject = match policy {
            VotingPolicy::Favorites => !player.is_favorite(crowned.id),
            VotingPolicy::Heuristic => VoteAnalysis::new(state, player, crowned).should_reject(),
            VotingPolicy::Search => false,
        };
        Move::Voting { vote_yes: !reject }
    }
}

/// Inputs to the heuristic vote.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteAnalysis {
    pub points_if_accepted: u32,
    pub points_if_rejected: u32,
    /// Value of favorites still low in the castle while rounds remain.
    pub future_opportunity: f64,
    /// Negative when rivals also favor the crowned character.
    pub competitive_advantage: f64,
    pub round: u32,
}

impl VoteAnalysis {
    pub fn new(state: &GameState, player: &Player, crowned: &Character) -> Self {
        VoteAnalysis {
            points_if_accepted: round_points(state, player, crowned.id, true),
            points_if_rejected: round_points(state, player, crowned.id, false),
            future_opportunity: future_opportunity(state, player),
            competitive_advantage: competitive_advantage(state, player, crowned.id),
            round: state.current_round,
        }
    }

    pub fn point_difference(&self) -> f64 {
        self.points_if_rejected as f64 - self.points_if_accepted as f64
    }

    pub fn threshold(&self) -> f64 {
        if self.round == MAX_ROUNDS {
            3.0
        } else {
            5.0
        }
    }

    pub fn should_reject(&self) -> bool {
        self.point_difference() + self.future_opportunity + self.competitive_advantage
            > self.threshold()
    }
}

fn round_points(state: &GameState, player: &Player, crowned_id: usize, crowned_stays: bool) -> u32 {
    player
        .favorites()
        .iter()
        .filter_map(|&id| state.character(id))
        .filter(|c| !c.is_eliminated)
        .map(|c| {
            if c.id != crowned_id {
                c.current_floor.points()
            } else if crowned_stays {
                Floor::Throne.points()
            } else {
                Floor::Servants.points()
            }
        })
        .sum()
}

fn future_opportunity(state: &GameState, player: &Player) -> f64 {
    if state.current_round >= MAX_ROUNDS {
        return 0.0;
    }
    player
        .favorites()
        .iter()
        .filter_map(|&id| state.character(id))
        .filter(|c| !c.is_eliminated && c.current_floor <= Floor::Merchants)
        .map(|c| (3 - c.current_floor.index() as i64) as f64 * 0.5)
        .sum()
}

fn competitive_advantage(state: &GameState, player: &Player, crowned_id: usize) -> f64 {
    let rivals = state
        .players
        .iter()
        .filter(|p| p.id != player.id && p.is_favorite(crowned_id))
        .count();
    let mut advantage = -5.0 * rivals as f64;
    if rivals == 0 && player.is_favorite(crowned_id) {
        advantage += 3.0;
    }
    advantage
}

/// Human-readable sentence for a move, resolved against `state`.
pub fn describe_move(state: &GameState, mv: &Move) -> String {
    let name = |id: usize| state.character(id).map_or("Unknown character", Character::name);
    match *mv {
        Move::Placement { character_id, target_floor } => {
            format!("Place {} on the {} floor", name(character_id), target_floor)
        }
        Move::Ascension { character_id } => {
            let next = state
                .character(character_id)
                .and_then(|c| c.current_floor.above());
            match next {
                Some(floor) => format!("Promote {} to the {} floor", name(character_id), floor),
                None => format!("Promote {} to the next floor", name(character_id)),
            }
        }
        Move::Voting { vote_yes: true } => "Vote YES for the new king".to_string(),
        Move::Voting { vote_yes: false } => "Vote NO for the new king".to_string(),
    }
}
