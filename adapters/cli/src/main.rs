#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Num Craze in a terminal.

mod cli;
mod config;
mod driver;
mod file_store;
mod input;
mod render;

use std::{
    io::{self, Write},
    path::Path,
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use num_craze_core::{Command, Difficulty, Event, PlayerProfile, SessionId};
use num_craze_system_leaderboard as leaderboard;
use num_craze_system_persistence::{clear_profile, load_profile, save_profile, sign_in};
use num_craze_system_target_generation::{Config, TargetGenerator};
use num_craze_world::{query, World};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::{
    cli::{Cli, Commands, PlayArgs},
    config::GameConfig,
    driver::Session,
    file_store::FileStore,
    input::UnknownSymbol,
};

/// How long the loop waits for input before advancing the clock anyway.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Entry point for the Num Craze command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let mut store = FileStore::open(&cli.data_dir)
        .with_context(|| format!("failed to open data dir {}", cli.data_dir.display()))?;

    match cli.command.unwrap_or(Commands::Play(PlayArgs::default())) {
        Commands::Play(args) => play(&cli.data_dir, cli.config.as_deref(), args, store),
        Commands::Leaderboard => {
            let entries = leaderboard::load(&store);
            render::leaderboard(&mut io::stdout().lock(), &entries)?;
            Ok(())
        }
        Commands::Forget => {
            clear_profile(&mut store).context("failed to delete the saved profile")?;
            println!("Saved profile deleted.");
            Ok(())
        }
    }
}

fn play(
    data_dir: &Path,
    config_path: Option<&Path>,
    args: PlayArgs,
    mut store: FileStore,
) -> Result<()> {
    let config = GameConfig::load(config_path, data_dir)?;
    let table = config.level_table()?;
    let timing = config.timing()?;
    let saved = load_profile(&store);
    let lines = spawn_reader();

    let username = match args.username {
        Some(username) => username,
        None => prompt_username(&lines, saved.as_ref())?,
    };
    let difficulty = args
        .difficulty
        .map(Difficulty::from)
        .or_else(|| {
            saved
                .as_ref()
                .filter(|profile| profile.username == username.trim())
                .map(|profile| profile.difficulty)
        })
        .unwrap_or_default();
    let profile = sign_in(saved.as_ref(), &username, difficulty)?;
    save_profile(&mut store, &profile).context("failed to save the player profile")?;

    let session_id = SessionId::new(Uuid::new_v4().to_string());
    debug!(session = %session_id, username = %profile.username, %difficulty, "session starting");

    let generator_config = args.seed.map_or_else(Config::from_entropy, Config::seeded);
    let generator = TargetGenerator::new(generator_config, table);
    let world = World::with_timing(profile, session_id, timing);
    let mut session = Session::new(world, generator, store);

    run(&mut session, &lines)
}

fn prompt_username(lines: &Receiver<String>, saved: Option<&PlayerProfile>) -> Result<String> {
    let mut out = io::stdout().lock();
    loop {
        match saved {
            Some(profile) => write!(out, "Player name [{}]: ", profile.username)?,
            None => write!(out, "Player name: ")?,
        }
        out.flush()?;

        let Ok(line) = lines.recv() else {
            bail!("input closed before a player name was entered");
        };
        let line = line.trim();
        if !line.is_empty() {
            return Ok(line.to_owned());
        }
        if let Some(profile) = saved {
            return Ok(profile.username.clone());
        }
    }
}

fn run(session: &mut Session<FileStore>, lines: &Receiver<String>) -> Result<()> {
    let mut out = io::stdout().lock();
    render::opening(&mut out, session.world())?;
    out.flush()?;

    let mut last = Instant::now();
    loop {
        let typed = match lines.recv_timeout(TICK_INTERVAL) {
            Ok(line) => match input::parse_line(&line, query::screen(session.world())) {
                Ok(commands) => commands,
                Err(UnknownSymbol(symbol)) => {
                    writeln!(out, "  Unknown key `{symbol}`.")?;
                    Vec::new()
                }
            },
            Err(RecvTimeoutError::Timeout) => Vec::new(),
            Err(RecvTimeoutError::Disconnected) => vec![Command::Dispose],
        };

        let now = Instant::now();
        let mut commands = vec![Command::Tick { dt: now - last }];
        last = now;
        commands.extend(typed);

        for command in commands {
            let outcome = session.dispatch(command, now_ms());
            render::events(&mut out, &outcome.events)?;
            for standing in &outcome.standings {
                render::standing(&mut out, standing)?;
            }
            if outcome.events.contains(&Event::SessionExited) {
                writeln!(out, "Bye!")?;
                return Ok(());
            }
        }
        out.flush()?;
    }
}

fn spawn_reader() -> Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    let _ = thread::spawn(move || {
        for line in io::stdin().lines() {
            let Ok(line) = line else {
                break;
            };
            if sender.send(line).is_err() {
                break;
            }
        }
    });
    receiver
}

fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}
