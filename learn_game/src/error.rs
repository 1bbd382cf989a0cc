use std::path::PathBuf;

use crate::board::BoardParseError;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

/// Malformed requests rejected before they reach the engines.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("missing required data: {0}")]
    Missing(&'static str),

    #[error("invalid board: {0}")]
    Board(#[from] BoardParseError),

    #[error("unknown player marker {0:?}")]
    UnknownPlayer(String),

    #[error("unknown game result {0:?}")]
    UnknownResult(String),

    #[error("game result must be final, got {0:?}")]
    GameNotOver(String),
}
