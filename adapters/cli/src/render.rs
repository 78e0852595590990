//! Plain-text presentation of world events.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use num_craze_core::{
    AttemptFailure, Digit, Event, InputRejection, LeaderboardEntry, LossCause, Screen, Token,
};
use num_craze_system_leaderboard::Standing;
use num_craze_world::{query, World};

const HELP: &str = "\
Reach the target before the timer runs out.
Type digits and operators (+ - x :) on one line, e.g. `6+4x4+7`.
Expressions are read strictly left to right: 2+3x4 is 20.
A digit typed after a digit replaces it. The round is won the moment the
expression hits the target; `=` forces a check.
Other inputs: `c` clears, `g` gives up, `quit` leaves.";

/// Seconds at which the countdown is announced.
fn announce(remaining: u32) -> bool {
    remaining <= 5 || remaining % 10 == 0
}

fn digits(pool: &[Digit]) -> String {
    pool.iter()
        .map(Digit::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn expression(tokens: &[Token]) -> String {
    tokens.iter().map(Token::to_string).collect()
}

/// Writes the screen the session opens on.
pub(crate) fn opening(out: &mut impl Write, world: &World) -> io::Result<()> {
    writeln!(out, "{}", query::welcome_banner(world))?;
    if query::screen(world) == Screen::Instructions {
        writeln!(out, "{HELP}")?;
        writeln!(out, "Press Enter to start.")?;
    } else {
        writeln!(
            out,
            "Welcome back, {}. Level {} ({}).",
            query::profile(world).username,
            query::level(world),
            query::difficulty(world)
        )?;
    }
    Ok(())
}

/// Writes one line (or none) per event.
pub(crate) fn events(out: &mut impl Write, events: &[Event]) -> io::Result<()> {
    for event in events {
        event_line(out, event)?;
    }
    Ok(())
}

fn event_line(out: &mut impl Write, event: &Event) -> io::Result<()> {
    match event {
        Event::RoundStarted {
            spec,
            target,
            digits: pool,
            ..
        } => writeln!(
            out,
            "Level {}: reach {target} with [{}] in {}s",
            spec.level(),
            digits(pool),
            spec.time_limit_secs()
        ),
        Event::CountdownStarted { seconds, .. } => writeln!(out, "Go! {seconds}s on the clock."),
        Event::CountdownTicked { remaining, .. } if announce(*remaining) => {
            writeln!(out, "  {remaining}s left")
        }
        Event::ExpressionUpdated {
            tokens,
            live_result,
        } => match live_result {
            Some(result) => writeln!(out, "  {} = {result}", expression(tokens)),
            None if tokens.is_empty() => writeln!(out, "  (cleared)"),
            None => writeln!(out, "  {}", expression(tokens)),
        },
        Event::InputRejected { reason } => writeln!(out, "  {}", rejection(*reason)),
        Event::AttemptFailed { failure } => match failure {
            AttemptFailure::Malformed => writeln!(out, "  Finish the expression with a digit."),
            AttemptFailure::Undefined => writeln!(out, "  That does not compute (division by zero)."),
            AttemptFailure::WrongAnswer { result } => writeln!(out, "  {result} is not it. Streak lost."),
        },
        Event::RoundWon {
            result,
            streak,
            encouragement,
            ..
        } => {
            write!(out, "Solved! {result} (streak {streak})")?;
            match encouragement.message() {
                Some(message) => writeln!(out, " {message}"),
                None => writeln!(out),
            }
        }
        Event::RoundLost { cause, .. } => match cause {
            LossCause::TimeExpired => writeln!(out, "Time's up!"),
            LossCause::GaveUp => writeln!(out, "You gave up."),
        },
        Event::ScreenChanged {
            screen: Screen::LevelComplete,
        } => writeln!(out, "Level complete!"),
        Event::RunEnded {
            level, mastered, ..
        } => {
            if *mastered {
                writeln!(out, "You mastered all {level} levels!")
            } else {
                writeln!(out, "Run over at level {level}.")
            }
        }
        Event::RoundSetupRejected { .. } => writeln!(out, "  Preparing the round..."),
        _ => Ok(()),
    }
}

fn rejection(reason: InputRejection) -> &'static str {
    match reason {
        InputRejection::NotPlaying => "No round is running.",
        InputRejection::RoundNotReady => "Hold on, the round is not ready yet.",
        InputRejection::RoundResolved => "This round is already over.",
        InputRejection::DigitUnavailable => "That digit is not on the board.",
        InputRejection::OperatorNotAllowed => "An operator must follow a digit.",
        InputRejection::InvalidTransition => "That is not possible right now.",
    }
}

/// Writes the results screen for a recorded run.
pub(crate) fn standing(out: &mut impl Write, standing: &Standing) -> io::Result<()> {
    writeln!(out, "Your rank: {}", standing.rank)?;
    leaderboard(out, &standing.entries)?;
    writeln!(out, "Press Enter to play again, `new` for a new player, `quit` to leave.")
}

/// Writes the leaderboard table.
pub(crate) fn leaderboard(out: &mut impl Write, entries: &[LeaderboardEntry]) -> io::Result<()> {
    if entries.is_empty() {
        return writeln!(out, "The leaderboard is empty.");
    }

    writeln!(out, "{:>3}  {:<16} {:>5}  {}", "#", "player", "level", "date")?;
    for (index, entry) in entries.iter().enumerate() {
        let date = i64::try_from(entry.completed_at)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map_or_else(|| "-".to_owned(), |at| at.format("%Y-%m-%d").to_string());
        writeln!(
            out,
            "{:>3}  {:<16} {:>5}  {date}",
            index + 1,
            entry.username,
            entry.level_reached.get()
        )?;
    }
    Ok(())
}
