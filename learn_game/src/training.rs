use crate::board::{Board, GameStatus, Mark};
use crate::config::RewardConfig;
use crate::players::{Outcome, Player};
use crate::shared::SharedAgent;
use log::info;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrainingSummary {
    pub episodes: usize,
    pub wins: usize,
    pub losses: usize,
    pub ties: usize,
}

/// Plays one game from an empty board; `Outcome::AiWin` means `agent` won.
pub fn play_episode(agent: &dyn Player, opponent: &dyn Player, agent_mark: Mark) -> Outcome {
    let mut board = Board::new();
    let mut to_move = Mark::Cross;
    loop {
        match board.status() {
            GameStatus::Won { winner, .. } if winner == agent_mark => return Outcome::AiWin,
            GameStatus::Won { .. } => return Outcome::HumanWin,
            GameStatus::Drawn => return Outcome::Tie,
            GameStatus::InPlay => {}
        }
        let player = if to_move == agent_mark { agent } else { opponent };
        let Some(mv) = player.choose_move(&board, to_move) else {
            return Outcome::Tie;
        };
        board.place(mv, to_move);
        to_move = to_move.other();
    }
}

const FLUSH_EVERY: usize = 1_000;

/// Self-play against `opponent`, alternating who opens. Each finished game is
/// credited to the whole move trace; the table is saved every
/// `FLUSH_EVERY` episodes and once at the end.
pub fn train_rl_agent(
    agent: &SharedAgent,
    opponent: &dyn Player,
    episodes: usize,
    rewards: &RewardConfig,
) -> TrainingSummary {
    let mut summary = TrainingSummary::default();
    agent.set_training(true);
    agent.reset_trace();
    for episode in 0..episodes {
        let agent_mark = if episode % 2 == 0 { Mark::Cross } else { Mark::Nought };
        let outcome = play_episode(agent, opponent, agent_mark);
        agent.with_agent(|q| q.apply_batched_reward(rewards.reward_for(outcome)));
        summary.episodes += 1;
        if summary.episodes % FLUSH_EVERY == 0 {
            agent.flush();
        }
        match outcome {
            Outcome::AiWin => summary.wins += 1,
            Outcome::HumanWin => summary.losses += 1,
            Outcome::Tie | Outcome::Ongoing => summary.ties += 1,
        }
        if summary.episodes % 10_000 == 0 {
            let stats = agent.stats();
            info!(
                "episode {}: {} wins, {} losses, {} ties, {} states, epsilon {:.4}",
                summary.episodes,
                summary.wins,
                summary.losses,
                summary.ties,
                stats.states,
                stats.exploration_rate
            );
        }
    }
    agent.set_training(false);
    agent.flush();
    summary
}
