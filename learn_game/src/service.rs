//! Request handlers sitting between the transport and the engines: input
//! validation, engine dispatch, rewards and game statistics.

use crate::agent::AgentStats;
use crate::board::{Board, BoardParseError, GameStatus, Mark, CELLS};
use crate::config::{AppConfig, RewardConfig};
use crate::error::ServiceError;
use crate::players::{choose_move_by_difficulty, Difficulty, Outcome};
use crate::shared::SharedAgent;
use crate::stats::{GameStats, StatsStore};
use crate::store::TableStore;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MoveRequest {
    #[serde(default)]
    pub board: Option<Vec<String>>,
    #[serde(default, rename = "humanPlayer")]
    pub human_player: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameOverRequest {
    #[serde(default)]
    pub board: Option<Vec<String>>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default, rename = "humanPlayer")]
    pub human_player: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MoveResponse {
    Win {
        #[serde(rename = "move", skip_serializing_if = "Option::is_none")]
        mv: Option<usize>,
        winner: Mark,
        line: usize,
    },
    Tie {
        #[serde(rename = "move", skip_serializing_if = "Option::is_none")]
        mv: Option<usize>,
    },
    Continue {
        #[serde(rename = "move")]
        mv: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub games: GameStats,
    pub ai_learning_stats: AgentStats,
}

pub fn parse_player(marker: &str) -> Result<Mark, ServiceError> {
    let mut chars = marker.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Mark::from_char(c),
        _ => None,
    }
    .ok_or_else(|| ServiceError::UnknownPlayer(marker.to_owned()))
}

/// Reads the request board: `"X"`, `"O"` or blank/`"-"` per cell.
pub fn parse_board(cells: &[String]) -> Result<Board, ServiceError> {
    if cells.len() != CELLS {
        return Err(BoardParseError::WrongLength(cells.len()).into());
    }
    let mut parsed = [None; CELLS];
    for (slot, cell) in parsed.iter_mut().zip(cells) {
        let mut chars = cell.trim().chars();
        *slot = match (chars.next(), chars.next()) {
            (None, _) | (Some('-'), None) => None,
            (Some(c), None) => Some(Mark::from_char(c).ok_or(BoardParseError::UnknownSymbol(c))?),
            (Some(c), Some(_)) => return Err(BoardParseError::UnknownSymbol(c).into()),
        };
    }
    Ok(Board::from_cells(parsed))
}

fn required<'a, T: ?Sized>(value: Option<&'a T>, name: &'static str) -> Result<&'a T, ServiceError> {
    value.ok_or(ServiceError::Missing(name))
}

pub struct GameService {
    agent: SharedAgent,
    rewards: RewardConfig,
    stats_store: StatsStore,
    stats: Mutex<GameStats>,
}

impl GameService {
    pub fn new(agent: SharedAgent, rewards: RewardConfig, stats_store: StatsStore) -> Self {
        let stats = stats_store.load();
        GameService {
            agent,
            rewards,
            stats_store,
            stats: Mutex::new(stats),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let agent = SharedAgent::load(config.agent.clone(), TableStore::new(&config.store));
        Self::new(
            agent,
            config.rewards.clone(),
            StatsStore::new(config.service.stats_path.clone()),
        )
    }

    pub fn agent(&self) -> &SharedAgent {
        &self.agent
    }

    /// Answers the human's move with the AI's, reporting the resulting status.
    pub fn make_move(&self, request: &MoveRequest) -> Result<MoveResponse, ServiceError> {
        let cells = required(request.board.as_deref(), "board")?;
        let human = parse_player(required(request.human_player.as_deref(), "humanPlayer")?)?;
        let board = parse_board(cells)?;
        let difficulty = Difficulty::from_tag(request.difficulty.as_deref().unwrap_or("adaptive"));
        let ai = human.other();

        match board.status() {
            GameStatus::Won { winner, line } => {
                return Ok(MoveResponse::Win {
                    mv: None,
                    winner,
                    line,
                })
            }
            GameStatus::Drawn => return Ok(MoveResponse::Tie { mv: None }),
            GameStatus::InPlay => {}
        }

        let adaptive = difficulty == Difficulty::Adaptive;
        if adaptive && board.count(ai) == 0 {
            // First AI move of a new game; anything left over is from an abandoned one.
            self.agent.reset_trace();
        }
        let Some(mv) = choose_move_by_difficulty(&self.agent, &board, ai, difficulty) else {
            return Ok(MoveResponse::Tie { mv: None });
        };

        let (response, outcome) = match board.with_move(mv, ai).status() {
            GameStatus::Won { winner, line } => (
                MoveResponse::Win {
                    mv: Some(mv),
                    winner,
                    line,
                },
                Outcome::AiWin,
            ),
            GameStatus::Drawn => (MoveResponse::Tie { mv: Some(mv) }, Outcome::Tie),
            GameStatus::InPlay => (MoveResponse::Continue { mv }, Outcome::Ongoing),
        };
        if adaptive {
            self.agent
                .apply_reward(self.rewards.reward_for(outcome), &board, Some(mv), ai);
        }
        Ok(response)
    }

    /// Records a finished game and lets the agent learn from it.
    pub fn game_over(&self, request: &GameOverRequest) -> Result<GameStats, ServiceError> {
        let cells = required(request.board.as_deref(), "board")?;
        let result = required(request.result.as_deref(), "result")?;
        parse_player(required(request.human_player.as_deref(), "humanPlayer")?)?;
        parse_board(cells)?;
        let outcome: Outcome = result
            .parse()
            .map_err(ServiceError::UnknownResult)?;
        if outcome == Outcome::Ongoing {
            return Err(ServiceError::GameNotOver(result.to_owned()));
        }
        let adaptive = Difficulty::from_tag(request.difficulty.as_deref().unwrap_or("adaptive"))
            == Difficulty::Adaptive;

        if adaptive {
            if outcome == Outcome::AiWin {
                // The winning move was already credited by make_move.
                self.agent.reset_trace();
            } else {
                self.agent
                    .apply_batched_reward(self.rewards.reward_for(outcome));
            }
        }
        let stats = {
            let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
            stats.record(outcome);
            *stats
        };
        self.save_stats(&stats);
        if adaptive {
            if let Some(rate) = stats.human_win_rate() {
                self.agent.adjust_exploration(rate);
            }
        }
        info!("game over: {outcome:?} ({} games played)", stats.games);
        Ok(stats)
    }

    pub fn stats(&self) -> StatsResponse {
        StatsResponse {
            games: *self.stats.lock().unwrap_or_else(PoisonError::into_inner),
            ai_learning_stats: self.agent.stats(),
        }
    }

    pub fn reset_stats(&self) {
        let stats = GameStats::default();
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner) = stats;
        self.save_stats(&stats);
    }

    fn save_stats(&self, stats: &GameStats) {
        if let Err(err) = self.stats_store.save(stats) {
            error!("failed to save game stats: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::QAgent;
    use crate::config::{AgentConfig, StoreConfig};
    use std::path::Path;

    fn service(dir: &Path) -> GameService {
        let agent = SharedAgent::new(
            QAgent::new(AgentConfig {
                exploration_rate: 0.2,
                seed: Some(9),
                ..AgentConfig::default()
            }),
            TableStore::new(&StoreConfig {
                table_path: dir.join("q.pickle"),
                backups_kept: 1,
            }),
        );
        GameService::new(
            agent,
            RewardConfig::default(),
            StatsStore::new(dir.join("stats.json")),
        )
    }

    fn cells(s: &str) -> Option<Vec<String>> {
        Some(s.chars().map(|c| c.to_string()).collect())
    }

    fn move_request(board: &str, difficulty: &str) -> MoveRequest {
        MoveRequest {
            board: cells(board),
            human_player: Some("X".into()),
            difficulty: Some(difficulty.into()),
        }
    }

    #[test]
    fn parse_board_accepts_blank_cells() {
        let raw: Vec<String> = ["X", "X", " ", "O", "O", "", "-", " ", "0"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(parse_board(&raw).unwrap().to_string(), "XX-OO---O");
        let bad: Vec<String> = vec!["XO".into(); 9];
        assert_eq!(
            parse_board(&bad),
            Err(ServiceError::Board(BoardParseError::UnknownSymbol('X')))
        );
    }

    #[test]
    fn missing_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let request = MoveRequest {
            board: cells("---------"),
            ..MoveRequest::default()
        };
        assert_eq!(
            service.make_move(&request),
            Err(ServiceError::Missing("humanPlayer"))
        );
        assert_eq!(
            service.make_move(&MoveRequest::default()),
            Err(ServiceError::Missing("board"))
        );
    }

    #[test]
    fn hard_move_takes_the_win() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let response = service.make_move(&move_request("XX-OO----", "hard")).unwrap();
        assert_eq!(
            response,
            MoveResponse::Win {
                mv: Some(5),
                winner: Mark::Nought,
                line: 1
            }
        );
        assert_eq!(service.agent().stats().states, 0);
    }

    #[test]
    fn finished_board_is_reported_without_a_move() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let response = service.make_move(&move_request("XXXOO----", "adaptive")).unwrap();
        assert_eq!(
            response,
            MoveResponse::Win {
                mv: None,
                winner: Mark::Cross,
                line: 0
            }
        );
        let response = service.make_move(&move_request("XOXXOOOXX", "adaptive")).unwrap();
        assert_eq!(response, MoveResponse::Tie { mv: None });
    }

    #[test]
    fn adaptive_move_learns_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let response = service.make_move(&move_request("X--------", "whatever")).unwrap();
        assert!(matches!(response, MoveResponse::Continue { mv } if mv != 0));
        assert_eq!(service.agent().stats().states, 1);
    }

    #[test]
    fn last_cell_ends_in_tie() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let response = service.make_move(&move_request("XOXXOOOX-", "adaptive")).unwrap();
        assert_eq!(response, MoveResponse::Tie { mv: Some(8) });
    }

    #[test]
    fn game_over_updates_stats_and_exploration() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        service.make_move(&move_request("X--------", "adaptive")).unwrap();
        let before = service.agent().stats().exploration_rate;
        let stats = service
            .game_over(&GameOverRequest {
                board: cells("XXXOO----"),
                result: Some("human_win".into()),
                human_player: Some("X".into()),
                difficulty: None,
            })
            .unwrap();
        assert_eq!(stats.human_wins, 1);
        assert!(service.agent().stats().exploration_rate < before);
        assert_eq!(StatsStore::new(dir.path().join("stats.json")).load(), stats);
        // A batched update always forces the table to disk.
        assert!(dir.path().join("q.pickle").exists());
    }

    #[test]
    fn game_over_rejects_unknown_results() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let mut request = GameOverRequest {
            board: cells("XXXOO----"),
            result: Some("draw".into()),
            human_player: Some("X".into()),
            difficulty: None,
        };
        assert_eq!(
            service.game_over(&request),
            Err(ServiceError::UnknownResult("draw".into()))
        );
        request.result = Some("ongoing".into());
        assert_eq!(
            service.game_over(&request),
            Err(ServiceError::GameNotOver("ongoing".into()))
        );
    }

    #[test]
    fn reset_stats_zeroes_the_tally() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        service
            .game_over(&GameOverRequest {
                board: cells("XOXXOOOXX"),
                result: Some("tie".into()),
                human_player: Some("O".into()),
                difficulty: Some("hard".into()),
            })
            .unwrap();
        assert_eq!(service.stats().games.ties, 1);
        service.reset_stats();
        assert_eq!(service.stats().games, GameStats::default());
    }

    #[test]
    fn responses_serialise_like_the_wire_format() {
        let json = serde_json::to_value(MoveResponse::Continue { mv: 4 }).unwrap();
        assert_eq!(json, serde_json::json!({"status": "continue", "move": 4}));
        let json = serde_json::to_value(MoveResponse::Win {
            mv: None,
            winner: Mark::Cross,
            line: 6,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"status": "win", "winner": "X", "line": 6}));
    }

    #[test]
    fn ai_win_is_not_credited_twice() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        service.make_move(&move_request("XX-OO----", "adaptive")).unwrap();
        let table = |s: &GameService| s.agent().with_agent(|q| q.table().clone());
        let before = table(&service);
        assert_eq!(service.agent().with_agent(|q| q.trace().len()), 1);

        let request = |result: &str| GameOverRequest {
            board: cells("XX-OOO---"),
            result: Some(result.into()),
            human_player: Some("X".into()),
            difficulty: Some("adaptive".into()),
        };
        assert_eq!(service.game_over(&request("ai_win")).unwrap().ai_wins, 1);
        assert_eq!(table(&service), before);
        assert!(service.agent().with_agent(|q| q.trace().is_empty()));

        service.make_move(&move_request("XX-OO----", "adaptive")).unwrap();
        let before = table(&service);
        service.game_over(&request("human_win")).unwrap();
        assert_ne!(table(&service), before);
    }
}
