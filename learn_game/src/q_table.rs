use crate::board::CELLS;
use crate::state_key::StateKey;
use itertools::Itertools;
use rand::{prelude::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

/// Estimated return of playing each of the 9 cells from one state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionValues {
    values: [f64; CELLS],
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QTable {
    qtable: HashMap<StateKey, ActionValues>,
}

impl Deref for ActionValues {
    type Target = [f64; CELLS];
    fn deref(&self) -> &<Self as Deref>::Target {
        &self.values
    }
}

impl DerefMut for ActionValues {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.values
    }
}

impl Deref for QTable {
    type Target = HashMap<StateKey, ActionValues>;
    fn deref(&self) -> &<Self as Deref>::Target {
        &self.qtable
    }
}

impl DerefMut for QTable {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.qtable
    }
}

impl From<[f64; CELLS]> for ActionValues {
    fn from(values: [f64; CELLS]) -> Self {
        ActionValues { values }
    }
}

impl ActionValues {
    /// Highest value among `moves`, `None` when `moves` is empty.
    pub fn max_over(&self, moves: &[usize]) -> Option<f64> {
        moves
            .iter()
            .map(|&mv| self.values[mv])
            .max_by(|value1, value2| value1.total_cmp(value2))
    }
    pub fn best_moves(&self, moves: &[usize]) -> Vec<usize> {
        moves
            .iter()
            .copied()
            .max_set_by(|&mv1, &mv2| self.values[mv1].total_cmp(&self.values[mv2]))
    }
    /// A highest-valued move, ties broken uniformly at random.
    pub fn select_max_move<R: Rng + ?Sized>(&self, moves: &[usize], rng: &mut R) -> Option<usize> {
        self.best_moves(moves).choose(rng).copied()
    }
}

impl QTable {
    pub fn new() -> Self {
        QTable {
            qtable: HashMap::with_capacity(11000),
        }
    }
    pub fn entry_or_zero(&mut self, key: StateKey) -> &mut ActionValues {
        self.qtable.entry(key).or_default()
    }
    pub fn value(&self, key: StateKey, action: usize) -> f64 {
        self.get(&key).map_or(0.0, |values| values[action])
    }
    /// Highest stored value among `moves`; 0 for an unseen state or no moves.
    pub fn best_value(&self, key: StateKey, moves: &[usize]) -> f64 {
        self.get(&key)
            .and_then(|values| values.max_over(moves))
            .unwrap_or(0.0)
    }
    /// Moves `value[key][action]` a `rate` step toward `target`, returning the new value.
    pub fn blend_toward(&mut self, key: StateKey, action: usize, target: f64, rate: f64) -> f64 {
        let value = &mut self.entry_or_zero(key)[action];
        *value += rate * (target - *value);
        *value
    }
    /// Number of stored (state, action) pairs whose action is legal in that state.
    pub fn legal_entries(&self) -> usize {
        self.keys()
            .map(|key| {
                key.decode()
                    .map_or(CELLS, |(board, _)| board.available_moves().len())
            })
            .sum()
    }
}
