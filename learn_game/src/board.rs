use crate::state_key::StateKey;
use itertools::Itertools;
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, ops::Deref, str::FromStr};

pub const CELLS: usize = 9;

/// Every line that wins the game: 3 rows, 3 columns and both diagonals.
pub const WIN_PATTERNS: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Mark {
    #[serde(rename = "X")]
    Cross,
    #[serde(rename = "O")]
    Nought,
}

impl Mark {
    pub fn other(self) -> Self {
        match self {
            Self::Cross => Mark::Nought,
            Self::Nought => Mark::Cross,
        }
    }
    pub fn as_char(self) -> char {
        match self {
            Self::Cross => 'X',
            Self::Nought => 'O',
        }
    }
    /// Accepts `X`/`O` in either case; `0` is read as a nought.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'X' | 'x' => Some(Mark::Cross),
            'O' | 'o' | '0' => Some(Mark::Nought),
            _ => None,
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    InPlay,
    Drawn,
    /// `line` indexes into [`WIN_PATTERNS`].
    Won { winner: Mark, line: usize },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BoardParseError {
    #[error("a board has 9 cells, got {0}")]
    WrongLength(usize),
    #[error("unknown cell symbol {0:?}")]
    UnknownSymbol(char),
}

/// 3x3 grid addressed by row-major cell index `0..9`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: Array2<Option<Mark>>,
}

impl Deref for Board {
    type Target = Array2<Option<Mark>>;
    fn deref(&self) -> &Self::Target {
        &self.cells
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

fn position(index: usize) -> [usize; 2] {
    [index / 3, index % 3]
}

impl Board {
    pub fn new() -> Self {
        Board {
            cells: Array::from_elem((3, 3), None),
        }
    }
    pub fn from_cells(cells: [Option<Mark>; CELLS]) -> Self {
        Board {
            cells: Array2::from_shape_fn((3, 3), |(row, col)| cells[row * 3 + col]),
        }
    }
    pub fn get(&self, index: usize) -> Option<Mark> {
        self.cells[position(index)]
    }
    pub fn place(&mut self, index: usize, mark: Mark) {
        self.cells[position(index)] = Some(mark);
    }
    pub fn clear(&mut self, index: usize) {
        self.cells[position(index)] = None;
    }
    pub fn with_move(&self, index: usize, mark: Mark) -> Board {
        let mut next = self.clone();
        next.place(index, mark);
        next
    }
    pub fn cells(&self) -> impl Iterator<Item = Option<Mark>> + '_ {
        self.cells.iter().copied()
    }
    pub fn available_moves(&self) -> Vec<usize> {
        self.cells()
            .enumerate()
            .filter(|(_index, value)| value.is_none())
            .map(|(index, _)| index)
            .collect()
    }
    pub fn is_full(&self) -> bool {
        self.cells().all(|cell| cell.is_some())
    }
    pub fn count(&self, mark: Mark) -> usize {
        self.cells().filter(|&cell| cell == Some(mark)).count()
    }
    pub fn winner(&self) -> Option<(Mark, usize)> {
        WIN_PATTERNS
            .iter()
            .enumerate()
            .find_map(|(line, &[a, b, c])| {
                let mark = self.get(a)?;
                (self.get(b) == Some(mark) && self.get(c) == Some(mark)).then_some((mark, line))
            })
    }
    pub fn status(&self) -> GameStatus {
        match self.winner() {
            Some((winner, line)) => GameStatus::Won { winner, line },
            None if self.is_full() => GameStatus::Drawn,
            None => GameStatus::InPlay,
        }
    }
    pub fn state_key(&self, player: Mark) -> StateKey {
        StateKey::encode(self, player)
    }
    /// Multi-line picture of the grid for logs.
    pub fn render(&self) -> String {
        self.to_string()
            .chars()
            .tuples::<(_, _, _)>()
            .map(|(a, b, c)| format!("{a} {b} {c}"))
            .join("\n")
    }
}

/// Compact form: 9 characters, `-` for an empty cell.
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s: String = self
            .cells()
            .map(|cell| cell.map_or('-', Mark::as_char))
            .collect();
        write!(f, "{s}")
    }
}

impl FromStr for Board {
    type Err = BoardParseError;

    /// Parses the compact form; `-`, `.` and space all mean empty.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let symbols: Vec<char> = s.chars().collect();
        if symbols.len() != CELLS {
            return Err(BoardParseError::WrongLength(symbols.len()));
        }
        let mut cells = [None; CELLS];
        for (cell, symbol) in cells.iter_mut().zip(symbols) {
            *cell = match symbol {
                '-' | '.' | ' ' => None,
                other => Some(Mark::from_char(other).ok_or(BoardParseError::UnknownSymbol(other))?),
            };
        }
        Ok(Board::from_cells(cells))
    }
}
