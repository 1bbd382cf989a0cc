//! Canonical keys for the value table.
//!
//! A key packs the board and the player to move into one integer:
//!
//! ```text
//! key = 2 * (c0 + 3*c1 + 9*c2 + ... + 3^8*c8) + p
//! ```
//!
//! where `ci` is 0 for an empty cell, 1 for `X` and 2 for `O`, and `p` is 0
//! when `X` is to move and 1 for `O`. Base-3 digits are unique, so every
//! (board, player) pair maps to exactly one key in `0..STATE_KEY_LIMIT` and
//! [`StateKey::decode`] recovers it.

use crate::board::{Board, Mark, CELLS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `2 * 3^9`: one past the largest valid key.
pub const STATE_KEY_LIMIT: u32 = 2 * 19_683;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateKey(u32);

fn cell_code(cell: Option<Mark>) -> u32 {
    match cell {
        None => 0,
        Some(Mark::Cross) => 1,
        Some(Mark::Nought) => 2,
    }
}

fn player_bit(player: Mark) -> u32 {
    match player {
        Mark::Cross => 0,
        Mark::Nought => 1,
    }
}

impl StateKey {
    pub fn encode(board: &Board, player: Mark) -> Self {
        let code = (0..CELLS)
            .rev()
            .fold(0, |acc, index| acc * 3 + cell_code(board.get(index)));
        StateKey(code * 2 + player_bit(player))
    }

    /// Inverse of [`StateKey::encode`]; `None` for integers outside the key range.
    pub fn decode(self) -> Option<(Board, Mark)> {
        if self.0 >= STATE_KEY_LIMIT {
            return None;
        }
        let player = if self.0 % 2 == 0 { Mark::Cross } else { Mark::Nought };
        let mut code = self.0 / 2;
        let mut cells = [None; CELLS];
        for cell in cells.iter_mut() {
            *cell = match code % 3 {
                1 => Some(Mark::Cross),
                2 => Some(Mark::Nought),
                _ => None,
            };
            code /= 3;
        }
        Some((Board::from_cells(cells), player))
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
        (raw < STATE_KEY_LIMIT).then_some(StateKey(raw))
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.decode() {
            Some((board, player)) => write!(f, "{board}/{player}"),
            None => write!(f, "#{}", self.0),
        }
    }
}
