use crate::agent::{AgentStats, Flush, QAgent, Snapshot};
use crate::board::{Board, Mark};
use crate::config::AgentConfig;
use crate::store::TableStore;
use log::{debug, error};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A [`QAgent`] behind one lock, plus the store it persists to.
///
/// Table snapshots are taken under the lock and written after it is released,
/// so disk I/O never blocks other requests. Writes go one at a time, and a
/// snapshot older than the one already on disk is dropped.
#[derive(Debug)]
pub struct SharedAgent {
    agent: Mutex<QAgent>,
    store: TableStore,
    saved_generation: Mutex<u64>,
}

impl SharedAgent {
    pub fn new(agent: QAgent, store: TableStore) -> Self {
        SharedAgent {
            agent: Mutex::new(agent),
            store,
            saved_generation: Mutex::new(0),
        }
    }

    pub fn load(config: AgentConfig, store: TableStore) -> Self {
        let q = store.load();
        Self::new(QAgent::with_table(config, q), store)
    }

    fn lock(&self) -> MutexGuard<'_, QAgent> {
        // Every agent operation leaves the table consistent, so a panic
        // elsewhere does not invalidate it.
        self.agent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn select_move(&self, board: &Board, player: Mark) -> Option<usize> {
        self.lock().select_move(board, player)
    }

    pub fn apply_reward(&self, reward: f64, board: &Board, mv: Option<usize>, player: Mark) {
        let snapshot = {
            let mut agent = self.lock();
            match agent.apply_reward(reward, board, mv, player) {
                Flush::Due => Some(agent.take_snapshot()),
                Flush::NotYet => None,
            }
        };
        if let Some(snapshot) = snapshot {
            self.persist(snapshot);
        }
    }

    pub fn apply_batched_reward(&self, final_reward: f64) {
        let snapshot = {
            let mut agent = self.lock();
            match agent.apply_batched_reward(final_reward) {
                Flush::Due => Some(agent.take_snapshot()),
                Flush::NotYet => None,
            }
        };
        if let Some(snapshot) = snapshot {
            self.persist(snapshot);
        }
    }

    pub fn adjust_exploration(&self, human_win_rate: f64) {
        self.lock().adjust_exploration(human_win_rate);
    }

    pub fn evaluate_state(&self, board: &Board, player: Mark) -> f64 {
        self.lock().evaluate_state(board, player)
    }

    pub fn stats(&self) -> AgentStats {
        self.lock().stats()
    }

    pub fn set_training(&self, training: bool) {
        self.lock().set_training(training);
    }

    pub fn reset_trace(&self) {
        self.lock().reset_trace();
    }

    /// Runs `f` with the lock held. Nothing is persisted; call [`SharedAgent::flush`].
    pub fn with_agent<T>(&self, f: impl FnOnce(&mut QAgent) -> T) -> T {
        f(&mut *self.lock())
    }

    /// Writes the current table regardless of the update counter.
    pub fn flush(&self) {
        let snapshot = self.lock().take_snapshot();
        self.persist(snapshot);
    }

    fn persist(&self, snapshot: Snapshot) {
        let mut saved = self
            .saved_generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if snapshot.generation <= *saved {
            debug!(
                "snapshot {} superseded by {}, not writing it",
                snapshot.generation, *saved
            );
            return;
        }
        match self.store.save(&snapshot.q) {
            Ok(()) => {
                *saved = snapshot.generation;
                self.lock().mark_saved(&snapshot);
            }
            Err(err) => error!(
                "failed to save value table to {}, continuing in memory: {err:#}",
                self.store.path().display()
            ),
        }
    }
}
