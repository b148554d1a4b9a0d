//! Search tree with arena allocation.
//!
//! Nodes live in one `Vec` and refer to each other by `NodeId`; parents are
//! plain indices used only for backpropagation, so there are no ownership
//! cycles. Two locks guard the tree:
//!
//! - `expansion` is the coarse lock. Whoever holds it may decide to add a
//!   child and is the only writer of the arena.
//! - each node's `stats` mutex serializes its `(visits, total_score)` pair
//!   so concurrent backpropagation never tears an update.
//!
//! The arena itself sits behind an `RwLock` so readers (selection,
//! backpropagation) can run alongside each other.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rand::Rng;

use crate::error::KingResult;
use crate::model::GameState;
use crate::moves::Move;
use crate::rules::{apply_move, get_valid_moves};

/// Index of a node in its tree's arena. Only the tree hands these out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeStats {
    pub visits: u32,
    pub total_score: f64,
}

impl NodeStats {
    pub fn mean(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.total_score / self.visits as f64
        }
    }
}

/// One position in the search tree.
#[derive(Debug)]
pub struct MctsNode {
    state: GameState,
    mv: Option<Move>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Legal moves of `state`, fixed once the node exists.
    legal_moves: Vec<Move>,
    /// Perspective the whole tree is scored from.
    player_id: usize,
    stats: Mutex<NodeStats>,
}

impl MctsNode {
    fn new(state: GameState, mv: Option<Move>, parent: Option<NodeId>, player_id: usize) -> Self {
        let legal_moves = get_valid_moves(&state);
        MctsNode {
            state,
            mv,
            parent,
            children: Vec::new(),
            legal_moves,
            player_id,
            stats: Mutex::new(NodeStats::default()),
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// The move that led here from the parent; `None` at the root.
    pub fn mv(&self) -> Option<Move> {
        self.mv
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn legal_moves(&self) -> &[Move] {
        &self.legal_moves
    }

    pub fn player_id(&self) -> usize {
        self.player_id
    }

    pub fn stats(&self) -> NodeStats {
        *self.lock_stats()
    }

    pub fn visits(&self) -> u32 {
        self.lock_stats().visits
    }

    fn lock_stats(&self) -> MutexGuard<'_, NodeStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one simulation result. Visits and score move together.
    pub fn update(&self, score: f64) {
        let mut stats = self.lock_stats();
        stats.visits += 1;
        stats.total_score += score;
    }

    /// UCB1 priority relative to a parent with `parent_visits` visits.
    /// Unvisited nodes are always preferred.
    pub fn ucb1_score(&self, parent_visits: u32, exploration: f64) -> f64 {
        let stats = self.stats();
        if stats.visits == 0 {
            return f64::INFINITY;
        }
        let parent_visits = parent_visits.max(1) as f64;
        let exploration_term = (2.0 * parent_visits.ln() / stats.visits as f64).sqrt();
        stats.mean() + exploration * exploration_term
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_game_over()
    }

    /// True once there is a child for every legal move.
    pub fn is_fully_expanded(&self) -> bool {
        self.children.len() == self.legal_moves.len()
    }
}

/// Visit summary of one child, for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildSummary {
    pub mv: Move,
    pub visits: u32,
    pub mean_score: f64,
}

/// Shared search tree rooted at `NodeId::ROOT`.
#[derive(Debug)]
pub struct SearchTree {
    nodes: RwLock<Vec<MctsNode>>,
    expansion: Mutex<()>,
}

impl SearchTree {
    /// A tree holding only the root: a private copy of `state` evaluated from
    /// `player_id`'s point of view.
    pub fn new(state: &GameState, player_id: usize) -> Self {
        let root = MctsNode::new(state.clone(), None, None, player_id);
        SearchTree {
            nodes: RwLock::new(vec![root]),
            expansion: Mutex::new(()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<MctsNode>> {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<MctsNode>> {
        self.nodes.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the coarse expand-or-descend lock.
    pub fn lock_expansion(&self) -> MutexGuard<'_, ()> {
        self.expansion.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Run `f` against a node while holding a read view of the arena.
    pub fn with_node<T>(&self, id: NodeId, f: impl FnOnce(&MctsNode) -> T) -> T {
        let nodes = self.read();
        f(&nodes[id.0])
    }

    /// Descend from the root through fully expanded, non-terminal nodes,
    /// picking the best UCB1 child at each step.
    pub fn select(&self, exploration: f64) -> NodeId {
        let nodes = self.read();
        let mut current = NodeId::ROOT;
        loop {
            let node = &nodes[current.0];
            if node.is_terminal() || !node.is_fully_expanded() {
                return current;
            }
            match best_child_in(&nodes, current, exploration) {
                Some(child) => current = child,
                None => return current,
            }
        }
    }

    /// Child with the highest UCB1 score; ties go to the earliest child.
    pub fn best_child(&self, id: NodeId, exploration: f64) -> Option<NodeId> {
        best_child_in(&self.read(), id, exploration)
    }

    /// Most visited child ("robust child"); ties go to the earliest child.
    pub fn robust_child(&self, id: NodeId) -> Option<NodeId> {
        let nodes = self.read();
        let mut best: Option<(NodeId, u32)> = None;
        for &child in &nodes[id.0].children {
            let visits = nodes[child.0].visits();
            if best.map_or(true, |(_, most)| visits > most) {
                best = Some((child, visits));
            }
        }
        best.map(|(child, _)| child)
    }

    /// Add a child for one untried legal move, chosen uniformly at random.
    /// Returns `None` when every legal move already has a child.
    ///
    /// The caller must hold the expansion lock.
    pub fn expand<R: Rng + ?Sized>(&self, id: NodeId, rng: &mut R) -> KingResult<Option<NodeId>> {
        let child = {
            let nodes = self.read();
            let node = &nodes[id.0];
            let untried: Vec<Move> = node
                .legal_moves
                .iter()
                .filter(|mv| {
                    !node
                        .children
                        .iter()
                        .any(|&child| nodes[child.0].mv.as_ref() == Some(*mv))
                })
                .copied()
                .collect();

            if untried.is_empty() {
                return Ok(None);
            }

            let mv = untried[rng.gen_range(0..untried.len())];
            let mut state = node.state.clone();
            apply_move(&mut state, &mv)?;
            MctsNode::new(state, Some(mv), Some(id), node.player_id)
        };

        let mut nodes = self.write();
        let child_id = NodeId(nodes.len());
        nodes.push(child);
        nodes[id.0].children.push(child_id);
        Ok(Some(child_id))
    }

    /// Credit `score` to `leaf` and every ancestor up to the root.
    pub fn backpropagate(&self, leaf: NodeId, score: f64) {
        let nodes = self.read();
        let mut current = Some(leaf);
        while let Some(id) = current {
            let node = &nodes[id.0];
            node.update(score);
            current = node.parent;
        }
    }

    pub fn child_summaries(&self, id: NodeId) -> Vec<ChildSummary> {
        let nodes = self.read();
        nodes[id.0]
            .children
            .iter()
            .filter_map(|&child| {
                let node = &nodes[child.0];
                let stats = node.stats();
                node.mv.map(|mv| ChildSummary {
                    mv,
                    visits: stats.visits,
                    mean_score: stats.mean(),
                })
            })
            .collect()
    }
}

fn best_child_in(nodes: &[MctsNode], id: NodeId, exploration: f64) -> Option<NodeId> {
    let parent = &nodes[id.0];
    let parent_visits = parent.visits();
    let mut best: Option<(NodeId, f64)> = None;
    for &child in &parent.children {
        let score = nodes[child.0].ucb1_score(parent_visits, exploration);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((child, score));
        }
    }
    best.map(|(child, _)| child)
}
