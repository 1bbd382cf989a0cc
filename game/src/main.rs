mod routes;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use learn_game::players::{MinimaxPlayer, Player, RandomPlayer};
use learn_game::store::{q_table_to_disk_json, TableStore};
use learn_game::training::train_rl_agent;
use learn_game::{AppConfig, GameService};
use log::info;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "game", about = "Adaptive tic-tac-toe engine")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, global = true, default_value = "game.toml")]
    config: PathBuf,

    /// Print the default configuration and exit
    #[arg(long)]
    print_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Answer JSON requests on stdin, one per line
    Serve,
    /// Train the agent by self-play
    Train {
        episodes: usize,
        #[arg(long, value_enum, default_value_t = Opponent::Random)]
        opponent: Opponent,
    },
    /// Write the stored value table as JSON
    Export { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Opponent {
    Random,
    Minimax,
}

impl Opponent {
    fn player(self) -> &'static dyn Player {
        match self {
            Opponent::Random => &RandomPlayer,
            Opponent::Minimax => &MinimaxPlayer,
        }
    }
}

fn serve(service: &GameService) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read request")?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = routes::handle_line(service, &line);
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    service.agent().flush();
    info!("input closed, value table saved");
    Ok(())
}

fn train(config: &AppConfig, episodes: usize, opponent: Opponent) -> anyhow::Result<()> {
    let opponent = opponent.player();
    let service = GameService::from_config(config);
    info!("training for {episodes} episodes against {}", opponent.get_name());
    let summary = train_rl_agent(service.agent(), opponent, episodes, &config.rewards);
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    if cli.print_config {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }
    let config = AppConfig::load_or_default(&cli.config)?;
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&GameService::from_config(&config)),
        Command::Train { episodes, opponent } => train(&config, episodes, opponent),
        Command::Export { path } => {
            let q = TableStore::new(&config.store).load();
            q_table_to_disk_json(&path, &q)?;
            info!("wrote {} states to {}", q.len(), path.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(line: &str) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("game").chain(line.split_whitespace()))
    }

    #[test]
    fn defaults_to_serve() {
        let parsed = cli("").unwrap();
        assert!(parsed.command.is_none());
        assert!(!parsed.print_config);
        assert_eq!(parsed.config, PathBuf::from("game.toml"));
    }

    #[test]
    fn train_with_options() {
        let parsed = cli("train 500 --opponent minimax --config /tmp/x.toml").unwrap();
        match parsed.command {
            Some(Command::Train { episodes, opponent }) => {
                assert_eq!(episodes, 500);
                assert_eq!(opponent, Opponent::Minimax);
            }
            other => panic!("expected train, got {other:?}"),
        }
        assert_eq!(parsed.config, PathBuf::from("/tmp/x.toml"));
    }

    #[test]
    fn export_and_print_config() {
        let parsed = cli("export q.json").unwrap();
        assert!(matches!(parsed.command, Some(Command::Export { path }) if path == PathBuf::from("q.json")));
        assert!(cli("--print-config").unwrap().print_config);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(cli("train lots").is_err());
        assert!(cli("train 10 --opponent oracle").is_err());
        assert!(cli("fly").is_err());
        assert!(cli("export").is_err());
        assert!(cli("--config").is_err());
    }

    #[test]
    fn clap_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
