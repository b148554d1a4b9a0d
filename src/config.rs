//! Search and agent configuration.
//!
//! Both structs deserialize from JSON with every field optional; missing
//! fields take the defaults below. CLI flags are layered on top afterwards.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{KingError, KingResult};

pub const DEFAULT_ITERATIONS: usize = 5000;
pub const DEFAULT_EXPLORATION: f64 = 1.414;

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Total iterations, split evenly across workers.
    pub iterations: usize,
    /// UCB1 exploration weight.
    pub exploration: f64,
    /// Worker threads sharing the tree.
    pub threads: usize,
    /// Base seed; worker `i` uses `seed + i`. `None` draws from the OS.
    pub seed: Option<u64>,
    /// Wall-clock budget; workers stop starting new iterations once spent.
    pub time_limit_ms: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            iterations: DEFAULT_ITERATIONS,
            exploration: DEFAULT_EXPLORATION,
            threads: default_threads(),
            seed: None,
            time_limit_ms: None,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> KingResult<()> {
        if self.threads == 0 {
            return Err(KingError::InvalidConfiguration(
                "threads must be at least 1".to_string(),
            ));
        }
        if self.iterations == 0 {
            return Err(KingError::InvalidConfiguration(
                "iterations must be at least 1".to_string(),
            ));
        }
        if !self.exploration.is_finite() || self.exploration < 0.0 {
            return Err(KingError::InvalidConfiguration(format!(
                "exploration must be a non-negative number, got {}",
                self.exploration
            )));
        }
        Ok(())
    }

    /// Iterations each worker runs.
    pub fn iterations_per_thread(&self) -> usize {
        self.iterations / self.threads.max(1)
    }
}

/// How the agent answers a coronation vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingPolicy {
    /// Search the vote like any other decision.
    #[default]
    Search,
    /// Accept iff the crowned character is one of our favorites.
    Favorites,
    /// Weigh point swing, future opportunity and rival exposure.
    Heuristic,
}

impl VotingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            VotingPolicy::Search => "search",
            VotingPolicy::Favorites => "favorites",
            VotingPolicy::Heuristic => "heuristic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub search: SearchConfig,
    pub voting: VotingPolicy,
}

impl AgentConfig {
    pub fn load(path: &Path) -> KingResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: AgentConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> KingResult<()> {
        self.search.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let config: AgentConfig =
            serde_json::from_str(r#"{"search": {"iterations": 200}, "voting": "heuristic"}"#)
                .unwrap();
        assert_eq!(config.search.iterations, 200);
        assert_eq!(config.search.exploration, DEFAULT_EXPLORATION);
        assert_eq!(config.voting, VotingPolicy::Heuristic);
        assert!(config.search.seed.is_none());
    }

    #[test]
    fn validate_rejects_zero_threads() {
        let config = SearchConfig {
            threads: 0,
            ..SearchConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(KingError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn validate_rejects_negative_exploration() {
        let config = SearchConfig {
            exploration: -1.0,
            ..SearchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn iterations_split_evenly() {
        let config = SearchConfig {
            iterations: 1000,
            threads: 3,
            ..SearchConfig::default()
        };
        assert_eq!(config.iterations_per_thread(), 333);
    }
}
