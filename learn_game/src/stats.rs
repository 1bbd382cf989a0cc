use crate::players::Outcome;
use anyhow::Context;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    pub games: u64,
    pub human_wins: u64,
    pub ai_wins: u64,
    pub ties: u64,
}

impl GameStats {
    pub fn record(&mut self, outcome: Outcome) {
        self.games += 1;
        match outcome {
            Outcome::HumanWin => self.human_wins += 1,
            Outcome::AiWin => self.ai_wins += 1,
            Outcome::Tie | Outcome::Ongoing => self.ties += 1,
        }
    }

    pub fn human_win_rate(&self) -> Option<f64> {
        (self.games > 0).then(|| self.human_wins as f64 / self.games as f64)
    }
}

#[derive(Debug, Clone)]
pub struct StatsStore {
    path: PathBuf,
}

impl StatsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StatsStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Zeroed stats when the file is missing or unreadable.
    pub fn load(&self) -> GameStats {
        if !self.path.exists() {
            return GameStats::default();
        }
        let read = || -> anyhow::Result<GameStats> {
            let file = File::open(&self.path)?;
            Ok(serde_json::from_reader(BufReader::new(file))?)
        };
        read().unwrap_or_else(|err| {
            warn!("ignoring unreadable stats file {}: {err:#}", self.path.display());
            GameStats::default()
        })
    }

    pub fn save(&self, stats: &GameStats) -> anyhow::Result<()> {
        let json = serde_json::to_string(stats)?;
        fs::write(&self.path, json).with_context(|| format!("writing {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_counts_each_outcome() {
        let mut stats = GameStats::default();
        assert_eq!(stats.human_win_rate(), None);
        stats.record(Outcome::HumanWin);
        stats.record(Outcome::AiWin);
        stats.record(Outcome::Tie);
        stats.record(Outcome::HumanWin);
        assert_eq!(
            stats,
            GameStats {
                games: 4,
                human_wins: 2,
                ai_wins: 1,
                ties: 1
            }
        );
        assert_eq!(stats.human_win_rate(), Some(0.5));
    }

    #[test]
    fn stats_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatsStore::new(dir.path().join("game_stats.json"));
        assert_eq!(store.load(), GameStats::default());
        let stats = GameStats {
            games: 3,
            human_wins: 1,
            ai_wins: 1,
            ties: 1,
        };
        store.save(&stats).unwrap();
        assert_eq!(store.load(), stats);
    }

    #[test]
    fn garbage_file_reads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatsStore::new(dir.path().join("game_stats.json"));
        fs::write(store.path(), "{not json").unwrap();
        assert_eq!(store.load(), GameStats::default());
    }
}
