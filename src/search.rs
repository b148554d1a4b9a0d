//! Parallel Monte Carlo Tree Search driver.
//!
//! Root parallelization: one `SearchTree` is shared by a fixed pool of
//! rayon workers. Each worker repeats
//!
//! 1. **Selection**: descend by UCB1 while nodes are fully expanded.
//! 2. **Expand-or-pick** (under the tree's expansion lock): add a child for
//!    an untried move, or take the best child if another worker already
//!    finished expanding.
//! 3. **Simulation**: uniformly random playout on a private clone, forcing a
//!    phase transition whenever no move is legal.
//! 4. **Backpropagation**: credit the normalized score up to the root.
//!
//! The final answer is the most visited root child.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::config::SearchConfig;
use crate::error::{KingError, KingResult};
use crate::model::{GameState, MAX_TOTAL_SCORE};
use crate::moves::Move;
use crate::node::{ChildSummary, NodeId, SearchTree};
use crate::rules::{apply_move, get_valid_moves};

/// Outcome of one search, with the root statistics behind the choice.
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub best_move: Option<Move>,
    pub iterations: usize,
    pub root_visits: u32,
    pub tree_size: usize,
    pub children: Vec<ChildSummary>,
    pub elapsed: Duration,
}

pub struct ParallelSearch {
    config: SearchConfig,
}

impl ParallelSearch {
    pub fn new(config: SearchConfig) -> Self {
        ParallelSearch { config }
    }

    /// Best move for `player_id` from `state`, or `None` when the root has
    /// no legal move (the caller should force a phase transition).
    pub fn find_best_move(&self, state: &GameState, player_id: usize) -> KingResult<Option<Move>> {
        Ok(self.search(state, player_id)?.best_move)
    }

    pub fn search(&self, state: &GameState, player_id: usize) -> KingResult<SearchReport> {
        self.config.validate()?;
        let start = Instant::now();
        let tree = SearchTree::new(state, player_id);

        let has_moves = tree.with_node(NodeId::ROOT, |root| {
            !root.is_terminal() && !root.legal_moves().is_empty()
        });
        if !has_moves {
            debug!(player_id, phase = %state.current_phase, "no legal move at root");
            return Ok(report(&tree, 0, start));
        }

        let threads = self.config.threads;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| KingError::InvalidConfiguration(e.to_string()))?;

        let deadline = self
            .config
            .time_limit_ms
            .map(|ms| start + Duration::from_millis(ms));
        let completed = AtomicUsize::new(0);
        let base = self.config.iterations_per_thread();
        let remainder = self.config.iterations % threads;

        pool.install(|| {
            (0..threads).into_par_iter().try_for_each(|worker| {
                let budget = base + usize::from(worker < remainder);
                let mut rng = worker_rng(self.config.seed, worker);
                let mut done = 0usize;
                for _ in 0..budget {
                    // Worker 0 always finishes one iteration, so the root has a
                    // child to return however short the deadline is.
                    let must_run = worker == 0 && done == 0;
                    if !must_run && deadline.is_some_and(|d| Instant::now() >= d) {
                        break;
                    }
                    run_iteration(&tree, self.config.exploration, &mut rng)?;
                    done += 1;
                }
                completed.fetch_add(done, Ordering::Relaxed);
                trace!(worker, iterations = done, "worker finished");
                Ok::<(), KingError>(())
            })
        })?;

        let result = report(&tree, completed.load(Ordering::Relaxed), start);
        debug!(
            player_id,
            iterations = result.iterations,
            root_visits = result.root_visits,
            tree_size = result.tree_size,
            children = result.children.len(),
            elapsed_ms = result.elapsed.as_millis() as u64,
            best = ?result.best_move,
            "search finished"
        );
        Ok(result)
    }
}

/// One-shot search with explicit parameters and OS-seeded randomness.
pub fn find_best_move(
    state: &GameState,
    player_id: usize,
    iterations: usize,
    exploration: f64,
    num_threads: usize,
) -> KingResult<Option<Move>> {
    let config = SearchConfig {
        iterations,
        exploration,
        threads: num_threads,
        seed: None,
        time_limit_ms: None,
    };
    ParallelSearch::new(config).find_best_move(state, player_id)
}

fn worker_rng(seed: Option<u64>, worker: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(worker as u64)),
        None => StdRng::from_entropy(),
    }
}

fn report(tree: &SearchTree, iterations: usize, start: Instant) -> SearchReport {
    let best_move = tree
        .robust_child(NodeId::ROOT)
        .and_then(|child| tree.with_node(child, |node| node.mv()));
    SearchReport {
        best_move,
        iterations,
        root_visits: tree.with_node(NodeId::ROOT, |root| root.visits()),
        tree_size: tree.len(),
        children: tree.child_summaries(NodeId::ROOT),
        elapsed: start.elapsed(),
    }
}

fn run_iteration<R: Rng + ?Sized>(
    tree: &SearchTree,
    exploration: f64,
    rng: &mut R,
) -> KingResult<()> {
    let selected = tree.select(exploration);

    let leaf = {
        let _guard = tree.lock_expansion();
        let (terminal, fully_expanded) = tree.with_node(selected, |node| {
            (node.is_terminal(), node.is_fully_expanded())
        });
        if terminal {
            selected
        } else if !fully_expanded {
            tree.expand(selected, rng)?.unwrap_or(selected)
        } else {
            // Either another worker finished expanding this node since
            // selection, or it has no legal move and the rollout will force
            // the transition.
            tree.best_child(selected, exploration).unwrap_or(selected)
        }
    };

    let (state, player_id) = tree.with_node(leaf, |node| (node.state().clone(), node.player_id()));
    let finished = simulate(state, rng)?;
    tree.backpropagate(leaf, evaluate_state(&finished, player_id));
    Ok(())
}

/// Play uniformly random legal moves until the game ends.
pub fn simulate<R: Rng + ?Sized>(mut state: GameState, rng: &mut R) -> KingResult<GameState> {
    while !state.is_game_over() {
        let moves = get_valid_moves(&state);
        if moves.is_empty() {
            state.transition_to_next_phase();
            continue;
        }
        let mv = moves[rng.gen_range(0..moves.len())];
        apply_move(&mut state, &mv)?;
    }
    Ok(state)
}

/// Player's score normalized into `[0, 1]` by the theoretical maximum.
/// Unknown players score 0.
pub fn evaluate_state(state: &GameState, player_id: usize) -> f64 {
    match state.players.get(player_id) {
        Some(player) => (player.score as f64 / MAX_TOTAL_SCORE as f64).min(1.0),
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::setup_game;

    #[test]
    fn rollout_always_terminates() {
        let mut rng = StdRng::seed_from_u64(17);
        for players in 2..=6 {
            let state = setup_game(players, &mut rng).unwrap();
            let finished = simulate(state, &mut rng).unwrap();
            assert!(finished.is_game_over());
        }
    }

    #[test]
    fn worker_rngs_are_reproducible() {
        let mut a = worker_rng(Some(10), 2);
        let mut b = worker_rng(Some(10), 2);
        let mut c = worker_rng(Some(10), 3);
        let xa: u64 = a.gen();
        assert_eq!(xa, b.gen::<u64>());
        assert_ne!(xa, c.gen::<u64>());
    }

    #[test]
    fn evaluation_caps_at_one() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = setup_game(3, &mut rng).unwrap();
        state.players[1].score = 250;
        assert_eq!(evaluate_state(&state, 1), 1.0);
        assert_eq!(evaluate_state(&state, 3), 0.0);
    }
}
