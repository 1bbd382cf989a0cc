//! Exhaustive minimax with alpha-beta pruning. The whole game tree is at most
//! nine plies deep, so every search runs to terminal positions.

use crate::board::{Board, GameStatus, Mark};

/// Best cell for `ai` to play, `None` on a full or finished board.
///
/// Equal scores keep the lowest cell index, so the answer is deterministic.
pub fn best_move(board: &Board, ai: Mark) -> Option<usize> {
    solve(board, ai).1
}

/// Score of the position for `ai` to move together with the move reaching it.
///
/// A win scores `10 - depth`, a loss `depth - 10`, a draw `0`, where `depth`
/// counts the plies simulated from `board`.
pub fn solve(board: &Board, ai: Mark) -> (i32, Option<usize>) {
    let mut scratch = board.clone();
    minimax(&mut scratch, ai, 0, true, i32::MIN, i32::MAX)
}

fn minimax(
    board: &mut Board,
    ai: Mark,
    depth: i32,
    is_max: bool,
    mut alpha: i32,
    mut beta: i32,
) -> (i32, Option<usize>) {
    match board.status() {
        GameStatus::Won { winner, .. } if winner == ai => return (10 - depth, None),
        GameStatus::Won { .. } => return (depth - 10, None),
        GameStatus::Drawn => return (0, None),
        GameStatus::InPlay => {}
    }
    let mark = if is_max { ai } else { ai.other() };
    let mut best_score = if is_max { i32::MIN } else { i32::MAX };
    let mut best_move = None;
    for mv in board.available_moves() {
        board.place(mv, mark);
        let (score, _) = minimax(board, ai, depth + 1, !is_max, alpha, beta);
        board.clear(mv);
        if is_max {
            if score > best_score {
                best_score = score;
                best_move = Some(mv);
            }
            alpha = alpha.max(best_score);
        } else {
            if score < best_score {
                best_score = score;
                best_move = Some(mv);
            }
            beta = beta.min(best_score);
        }
        if beta <= alpha {
            break;
        }
    }
    (best_score, best_move)
}
