//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use num_craze_core::Difficulty;

/// Num Craze: reach the target by chaining digits left to right.
#[derive(Debug, Parser)]
#[command(name = "num-craze", version, long_about = None)]
pub(crate) struct Cli {
    /// Directory holding the saved profile, leaderboard and optional config.
    #[arg(long, global = true, default_value = ".num-craze")]
    pub(crate) data_dir: PathBuf,

    /// Config file to read instead of `<data-dir>/num-craze.toml`.
    #[arg(long, global = true)]
    pub(crate) config: Option<PathBuf>,

    /// What to do (defaults to `play`).
    #[command(subcommand)]
    pub(crate) command: Option<Commands>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Sign in and play.
    Play(PlayArgs),
    /// Print the saved leaderboard.
    Leaderboard,
    /// Delete the saved player profile. The leaderboard is kept.
    Forget,
}

/// Options for a game session.
#[derive(Debug, Default, clap::Args)]
pub(crate) struct PlayArgs {
    /// Player name; prompted for when omitted.
    #[arg(long)]
    pub(crate) username: Option<String>,

    /// Difficulty; the saved choice is reused when omitted.
    #[arg(long, value_enum)]
    pub(crate) difficulty: Option<DifficultyArg>,

    /// Seed for reproducible targets and digit pools.
    #[arg(long)]
    pub(crate) seed: Option<u64>,
}

/// Difficulty as spelled on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum DifficultyArg {
    /// Longer timers and smaller targets.
    Normal,
    /// Shorter timers and larger targets.
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(value: DifficultyArg) -> Self {
        match value {
            DifficultyArg::Normal => Difficulty::Normal,
            DifficultyArg::Hard => Difficulty::Hard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_is_optional() {
        let cli = Cli::try_parse_from(["num-craze"]).expect("bare invocation parses");
        assert!(cli.command.is_none());
        assert_eq!(cli.data_dir, PathBuf::from(".num-craze"));
    }

    #[test]
    fn play_flags_parse() {
        let cli = Cli::try_parse_from([
            "num-craze",
            "play",
            "--username",
            "ana",
            "--difficulty",
            "hard",
            "--seed",
            "7",
            "--data-dir",
            "/tmp/nc",
        ])
        .expect("valid flags");

        let Some(Commands::Play(args)) = cli.command else {
            panic!("expected play subcommand");
        };
        assert_eq!(args.username.as_deref(), Some("ana"));
        assert_eq!(args.difficulty, Some(DifficultyArg::Hard));
        assert_eq!(args.seed, Some(7));
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/nc"));
    }
}
