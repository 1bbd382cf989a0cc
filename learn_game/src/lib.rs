//! Adaptive tic-tac-toe: a tabular Q-learning agent that learns from games
//! against humans, and an exact minimax solver for the hard difficulty.

pub mod agent;
pub mod board;
pub mod config;
pub mod error;
pub mod minimax;
pub mod players;
pub mod q_table;
pub mod service;
pub mod shared;
pub mod state_key;
pub mod stats;
pub mod store;
pub mod training;

pub use agent::{AgentStats, QAgent};
pub use board::{Board, GameStatus, Mark, WIN_PATTERNS};
pub use config::AppConfig;
pub use players::{Difficulty, Outcome, Player};
pub use service::GameService;
pub use shared::SharedAgent;
pub use state_key::StateKey;
