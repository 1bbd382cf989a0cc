use crate::board::{Board, Mark};
use crate::minimax;
use crate::shared::SharedAgent;
use rand::prelude::SliceRandom;
use rand::thread_rng;
use std::str::FromStr;

/// Anything that can answer a move request.
pub trait Player {
    fn get_name(&self) -> &str;
    /// A cell for `mark` to play, `None` when the board is full.
    fn choose_move(&self, board: &Board, mark: Mark) -> Option<usize>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MinimaxPlayer;

/// Uniformly random legal moves; a sparring partner for training.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomPlayer;

impl Player for MinimaxPlayer {
    fn get_name(&self) -> &str {
        "minimax"
    }
    fn choose_move(&self, board: &Board, mark: Mark) -> Option<usize> {
        minimax::best_move(board, mark)
    }
}

impl Player for RandomPlayer {
    fn get_name(&self) -> &str {
        "random"
    }
    fn choose_move(&self, board: &Board, _mark: Mark) -> Option<usize> {
        board.available_moves().choose(&mut thread_rng()).copied()
    }
}

impl Player for SharedAgent {
    fn get_name(&self) -> &str {
        "q-learning"
    }
    fn choose_move(&self, board: &Board, mark: Mark) -> Option<usize> {
        self.select_move(board, mark)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Hard,
    #[default]
    Adaptive,
}

impl Difficulty {
    /// `"hard"` selects the solver; every other tag means the learned policy.
    pub fn from_tag(tag: &str) -> Self {
        if tag.trim().eq_ignore_ascii_case("hard") {
            Difficulty::Hard
        } else {
            Difficulty::Adaptive
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    AiWin,
    HumanWin,
    Tie,
    Ongoing,
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ai_win" => Ok(Outcome::AiWin),
            "human_win" => Ok(Outcome::HumanWin),
            "tie" => Ok(Outcome::Tie),
            "ongoing" => Ok(Outcome::Ongoing),
            other => Err(other.to_owned()),
        }
    }
}

pub fn choose_move_by_difficulty(
    agent: &SharedAgent,
    board: &Board,
    mark: Mark,
    difficulty: Difficulty,
) -> Option<usize> {
    let player: &dyn Player = match difficulty {
        Difficulty::Hard => &MinimaxPlayer,
        Difficulty::Adaptive => agent,
    };
    player.choose_move(board, mark)
}
