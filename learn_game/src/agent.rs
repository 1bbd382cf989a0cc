//! Tabular Q-learning agent.
//!
//! The agent is plain single-owner state: every operation takes `&mut self`
//! and none of them touch the disk. Operations that change the table return a
//! [`Flush`] hint so the owner can persist a snapshot at a time of its choosing
//! (see [`crate::shared::SharedAgent`]).

use crate::board::{Board, Mark, CELLS};
use crate::config::{AgentConfig, ExplorationSchedule, UpdateRule};
use crate::q_table::QTable;
use crate::state_key::StateKey;
use log::{debug, warn};
use rand::prelude::SliceRandom;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flush {
    NotYet,
    Due,
}

/// A copy of the table to persist. `generation` grows with every snapshot taken
/// from one agent, so an older copy can be told apart from a newer one.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub q: QTable,
    pub generation: u64,
    updates: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStats {
    pub states: usize,
    pub entries: usize,
    pub exploration_rate: f64,
    pub learning_rate: f64,
}

#[derive(Debug)]
pub struct QAgent {
    q: QTable,
    config: AgentConfig,
    exploration_rate: f64,
    trace: Vec<(StateKey, usize)>,
    training: bool,
    updates_since_flush: usize,
    generation: u64,
    rng: StdRng,
}

impl QAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self::with_table(config, QTable::new())
    }

    pub fn with_table(config: AgentConfig, q: QTable) -> Self {
        let rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        QAgent {
            q,
            exploration_rate: config.exploration_rate,
            config,
            trace: Vec::new(),
            training: false,
            updates_since_flush: 0,
            generation: 0,
            rng,
        }
    }

    /// Epsilon-greedy move for `player`, `None` on a full board.
    pub fn select_move(&mut self, board: &Board, player: Mark) -> Option<usize> {
        let available_moves = board.available_moves();
        if available_moves.is_empty() {
            return None;
        }
        let key = board.state_key(player);
        let values = *self.q.entry_or_zero(key);
        let explore = self.rng.gen::<f64>() < self.exploration_rate;
        let mv = if explore {
            available_moves.choose(&mut self.rng).copied()
        } else {
            values.select_max_move(&available_moves, &mut self.rng)
        }?;
        debug!(
            "{key}: {} move {mv} (epsilon {:.4})",
            if explore { "explored" } else { "greedy" },
            self.exploration_rate
        );
        self.trace.push((key, mv));
        self.decay_exploration();
        Some(mv)
    }

    fn decay_exploration(&mut self) {
        let decays = match self.config.schedule {
            ExplorationSchedule::PerMove => true,
            ExplorationSchedule::TrainingOnly => self.training,
            ExplorationSchedule::Fixed => false,
        };
        let floor = self.config.min_exploration_rate;
        if decays && self.exploration_rate > floor {
            self.exploration_rate = (self.exploration_rate * self.config.decay_rate).max(floor);
        }
    }

    /// Updates the value of playing `mv` on `board` with the configured rule.
    /// A missing move leaves the table untouched.
    pub fn apply_reward(&mut self, reward: f64, board: &Board, mv: Option<usize>, player: Mark) -> Flush {
        let Some(mv) = mv else {
            return Flush::NotYet;
        };
        if mv >= CELLS {
            warn!("ignoring reward for out-of-range cell {mv}");
            return Flush::NotYet;
        }
        let key = board.state_key(player);
        let target = match self.config.update_rule {
            UpdateRule::Blend => reward,
            UpdateRule::Bootstrapped => {
                let next = board.with_move(mv, player);
                let next_key = next.state_key(player);
                let max_future = self
                    .q
                    .entry_or_zero(next_key)
                    .max_over(&next.available_moves())
                    .unwrap_or(0.0);
                reward + self.config.discount_factor * max_future
            }
        };
        let value = self.q.blend_toward(key, mv, target, self.config.learning_rate);
        debug!("{key}: cell {mv} -> {value:.4} (reward {reward})");
        self.count_update()
    }

    /// Credits the whole game trace, newest move first, discounting `final_reward`
    /// by one factor of gamma per step back. Clears the trace.
    pub fn apply_batched_reward(&mut self, final_reward: f64) -> Flush {
        if self.trace.is_empty() {
            return Flush::NotYet;
        }
        let mut current = final_reward;
        for (key, action) in std::mem::take(&mut self.trace).into_iter().rev() {
            self.q
                .blend_toward(key, action, current, self.config.learning_rate);
            current *= self.config.discount_factor;
        }
        Flush::Due
    }

    /// Nudges exploration by one step against the human win rate; call once per game.
    pub fn adjust_exploration(&mut self, human_win_rate: f64) {
        let before = self.exploration_rate;
        if human_win_rate > self.config.high_win_rate {
            self.exploration_rate =
                (self.exploration_rate - self.config.adjust_step).max(self.config.min_exploration_rate);
        } else if human_win_rate < self.config.low_win_rate {
            self.exploration_rate =
                (self.exploration_rate + self.config.adjust_step).min(self.config.max_exploration_rate);
        }
        if before != self.exploration_rate {
            debug!(
                "human win rate {human_win_rate:.3}: epsilon {before:.4} -> {:.4}",
                self.exploration_rate
            );
        }
    }

    /// Best stored value among the empty cells; 0 for unseen states.
    pub fn evaluate_state(&self, board: &Board, player: Mark) -> f64 {
        self.q
            .best_value(board.state_key(player), &board.available_moves())
    }

    pub fn stats(&self) -> AgentStats {
        AgentStats {
            states: self.q.len(),
            entries: self.q.legal_entries(),
            exploration_rate: self.exploration_rate,
            learning_rate: self.config.learning_rate,
        }
    }

    fn count_update(&mut self) -> Flush {
        self.updates_since_flush += 1;
        if self.updates_since_flush >= self.config.flush_interval {
            Flush::Due
        } else {
            Flush::NotYet
        }
    }

    pub fn take_snapshot(&mut self) -> Snapshot {
        self.generation += 1;
        Snapshot {
            q: self.q.clone(),
            generation: self.generation,
            updates: self.updates_since_flush,
        }
    }

    /// Call once `snapshot` is on disk; only updates it already holds stop
    /// counting toward the next flush.
    pub fn mark_saved(&mut self, snapshot: &Snapshot) {
        self.updates_since_flush = self.updates_since_flush.saturating_sub(snapshot.updates);
    }

    pub fn table(&self) -> &QTable {
        &self.q
    }

    pub fn trace(&self) -> &[(StateKey, usize)] {
        &self.trace
    }

    pub fn reset_trace(&mut self) {
        self.trace.clear();
    }

    pub fn exploration_rate(&self) -> f64 {
        self.exploration_rate
    }

    pub fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    pub fn is_training(&self) -> bool {
        self.training
    }
}
