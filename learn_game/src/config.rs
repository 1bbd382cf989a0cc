use std::path::{Path, PathBuf};

use log::warn;

use crate::error::ConfigError;
use crate::players::Outcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateRule {
    /// `v += lr * (r - v)`: pull the value straight toward the reward.
    Blend,
    /// `v += lr * (r + gamma * max Q(s') - v)`.
    Bootstrapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplorationSchedule {
    PerMove,
    TrainingOnly,
    Fixed,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub exploration_rate: f64,
    pub min_exploration_rate: f64,
    pub max_exploration_rate: f64,
    pub decay_rate: f64,
    pub schedule: ExplorationSchedule,
    pub update_rule: UpdateRule,
    /// Human win rate above which the agent explores less.
    pub high_win_rate: f64,
    /// Human win rate below which the agent explores more.
    pub low_win_rate: f64,
    pub adjust_step: f64,
    pub flush_interval: usize,
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            learning_rate: 0.5,
            discount_factor: 0.9,
            exploration_rate: 0.1,
            min_exploration_rate: 0.01,
            max_exploration_rate: 0.5,
            decay_rate: 0.995,
            schedule: ExplorationSchedule::PerMove,
            update_rule: UpdateRule::Blend,
            high_win_rate: 0.6,
            low_win_rate: 0.3,
            adjust_step: 0.05,
            flush_interval: 100,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub win: f64,
    pub loss: f64,
    pub tie: f64,
    pub ongoing: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        RewardConfig {
            win: 1.0,
            loss: -1.0,
            tie: 0.5,
            ongoing: 0.0,
        }
    }
}

impl RewardConfig {
    pub fn reward_for(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::AiWin => self.win,
            Outcome::HumanWin => self.loss,
            Outcome::Tie => self.tie,
            Outcome::Ongoing => self.ongoing,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub table_path: PathBuf,
    /// Timestamped copies of the previous table kept next to it.
    pub backups_kept: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            table_path: PathBuf::from("q_values.pickle"),
            backups_kept: 5,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub stats_path: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            stats_path: PathBuf::from("game_stats.json"),
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub rewards: RewardConfig,
    pub store: StoreConfig,
    pub service: ServiceConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!("config file '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let agent = &self.agent;
        let check = |ok: bool, message: &str| {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::Validation(message.to_string()))
            }
        };
        check(
            agent.learning_rate > 0.0 && agent.learning_rate <= 1.0,
            "agent.learning_rate must be in (0, 1]",
        )?;
        check(
            (0.0..1.0).contains(&agent.discount_factor),
            "agent.discount_factor must be in [0, 1)",
        )?;
        check(
            (0.0..=1.0).contains(&agent.min_exploration_rate)
                && (0.0..=1.0).contains(&agent.max_exploration_rate),
            "agent exploration bounds must be in [0, 1]",
        )?;
        check(
            agent.min_exploration_rate <= agent.max_exploration_rate,
            "agent.min_exploration_rate must be <= agent.max_exploration_rate",
        )?;
        check(
            (0.0..=1.0).contains(&agent.exploration_rate),
            "agent.exploration_rate must be in [0, 1]",
        )?;
        check(
            agent.decay_rate > 0.0 && agent.decay_rate <= 1.0,
            "agent.decay_rate must be in (0, 1]",
        )?;
        check(
            agent.low_win_rate <= agent.high_win_rate,
            "agent.low_win_rate must be <= agent.high_win_rate",
        )?;
        check(agent.adjust_step >= 0.0, "agent.adjust_step must be >= 0")?;
        check(agent.flush_interval > 0, "agent.flush_interval must be > 0")?;
        Ok(())
    }

    /// Default configuration rendered as TOML, for `game --print-config`.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[agent]
learning_rate = 0.2
update_rule = "bootstrapped"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!((config.agent.learning_rate - 0.2).abs() < 1e-9);
        assert_eq!(config.agent.update_rule, UpdateRule::Bootstrapped);
        assert!((config.agent.discount_factor - 0.9).abs() < 1e-9);
        assert_eq!(config.agent.schedule, ExplorationSchedule::PerMove);
        assert_eq!(config.store.backups_kept, 5);
    }

    #[test]
    fn test_tie_reward_is_configurable() {
        let config: AppConfig = toml::from_str("[rewards]\ntie = 0.2\n").unwrap();
        assert!((config.rewards.reward_for(Outcome::Tie) - 0.2).abs() < 1e-9);
        assert!((config.rewards.reward_for(Outcome::AiWin) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_validation_rejects_bad_learning_rate() {
        let mut config = AppConfig::default();
        config.agent.learning_rate = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_discount_of_one() {
        let mut config = AppConfig::default();
        config.agent.discount_factor = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_inverted_bounds() {
        let mut config = AppConfig::default();
        config.agent.min_exploration_rate = 0.6;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = AppConfig::load_or_default(Path::new("nonexistent_config.toml")).unwrap();
        assert_eq!(config.agent.flush_interval, 100);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
[agent]
schedule = "training_only"
seed = 7

[store]
table_path = "tables/q.pickle"
"#
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.agent.schedule, ExplorationSchedule::TrainingOnly);
        assert_eq!(config.agent.seed, Some(7));
        assert_eq!(config.store.table_path, PathBuf::from("tables/q.pickle"));
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.toml");
        std::fs::write(&path, "[agent]\nexploration_rate = 3.0\n").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_default_toml_roundtrips() {
        let toml_str = AppConfig::default_toml();
        let config: AppConfig = toml::from_str(&toml_str).unwrap();
        config.validate().expect("roundtripped config should be valid");
    }
}
