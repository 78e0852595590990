#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Leaderboard ranker that records finished runs and reports placements.
//!
//! Entries are kept sorted by level, highest first, and capped at
//! [`LEADERBOARD_CAPACITY`]. A persisted marker per session identifier makes
//! recording idempotent.

use std::fmt;

use num_craze_core::{Event, KeyValueStore, LeaderboardEntry, Level, SessionId, StoreError};
use thiserror::Error;
use tracing::{debug, warn};

/// Key holding the JSON-encoded leaderboard.
pub const LEADERBOARD_KEY: &str = "runblock_leaderboard";

/// Prefix of the per-session idempotency markers.
pub const SESSION_KEY_PREFIX: &str = "runblock_session_";

/// Maximum number of entries kept.
pub const LEADERBOARD_CAPACITY: usize = 15;

const SESSION_MARKER: &str = "true";

/// Errors raised while recording a run.
#[derive(Debug, Error)]
pub enum LeaderboardError {
    /// The leaderboard could not be encoded.
    #[error("failed to encode leaderboard: {0}")]
    Encode(#[from] serde_json::Error),
    /// The backing store failed to read or write a key.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Placement of a run on the leaderboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rank {
    /// One-based position inside the visible window.
    Position(u32),
    /// Fifteenth place or beyond.
    Saturated,
}

impl Rank {
    fn from_index(index: usize) -> Self {
        let position = index.saturating_add(1);
        if position >= LEADERBOARD_CAPACITY {
            return Self::Saturated;
        }
        u32::try_from(position).map_or(Self::Saturated, Self::Position)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(position) => write!(f, "{position}"),
            Self::Saturated => write!(f, "{LEADERBOARD_CAPACITY}+"),
        }
    }
}

/// Outcome of [`record_if_new`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Recording {
    /// The entry was inserted.
    Inserted,
    /// The session was recorded before; nothing changed.
    AlreadyRecorded,
}

/// Key of the idempotency marker for `session`.
#[must_use]
pub fn session_key(session: &SessionId) -> String {
    format!("{SESSION_KEY_PREFIX}{session}")
}

/// Loads the leaderboard, treating unreadable or corrupt records as empty.
#[must_use]
pub fn load(store: &impl KeyValueStore) -> Vec<LeaderboardEntry> {
    let raw = match store.get(LEADERBOARD_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(error) => {
            warn!(%error, "leaderboard unreadable; starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(error) => {
            warn!(%error, "leaderboard corrupt; starting empty");
            Vec::new()
        }
    }
}

/// Inserts `entry`, re-sorts by level descending and truncates to capacity.
///
/// The sort is stable, so equal levels keep their insertion order.
pub fn insert_ranked(entries: &mut Vec<LeaderboardEntry>, entry: LeaderboardEntry) {
    entries.push(entry);
    entries.sort_by(|a, b| b.level_reached.cmp(&a.level_reached));
    entries.truncate(LEADERBOARD_CAPACITY);
}

/// Appends `entry` unless `session` was already recorded.
///
/// The session marker is written before the leaderboard and removed again when
/// the leaderboard write fails, so a session is never ranked twice. An
/// unreadable marker is an error rather than a reason to record again.
pub fn record_if_new(
    store: &mut impl KeyValueStore,
    session: &SessionId,
    entry: LeaderboardEntry,
) -> Result<Recording, LeaderboardError> {
    let marker = session_key(session);
    if store.get(&marker)?.is_some() {
        return Ok(Recording::AlreadyRecorded);
    }

    let mut entries = load(store);
    insert_ranked(&mut entries, entry);
    let encoded = serde_json::to_string(&entries)?;

    store.set(&marker, SESSION_MARKER)?;
    if let Err(error) = store.set(LEADERBOARD_KEY, &encoded) {
        if let Err(rollback) = store.remove(&marker) {
            warn!(error = %rollback, %session, "session marker left behind after failed write");
        }
        return Err(error.into());
    }
    Ok(Recording::Inserted)
}

/// Ranks the most recent entry of `username` at `level` within `entries`.
///
/// Falls back to the position just past the end when no entry matches.
#[must_use]
pub fn rank_in(entries: &[LeaderboardEntry], username: &str, level: Level) -> Rank {
    let mut latest: Option<(usize, u64)> = None;
    for (index, entry) in entries.iter().enumerate() {
        if entry.username != username || entry.level_reached != level {
            continue;
        }
        if latest.map_or(true, |(_, at)| entry.completed_at > at) {
            latest = Some((index, entry.completed_at));
        }
    }

    Rank::from_index(latest.map_or(entries.len(), |(index, _)| index))
}

/// Ranks the most recent entry of `username` at `level` in the stored leaderboard.
#[must_use]
pub fn rank(store: &impl KeyValueStore, username: &str, level: Level) -> Rank {
    rank_in(&load(store), username, level)
}

/// Result of a finished run, as reported by [`Leaderboard::handle`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Standing {
    /// Run identifier the result was recorded under.
    pub session: SessionId,
    /// Player of the run.
    pub username: String,
    /// Level the run ended on.
    pub level: Level,
    /// Whether the final level was beaten.
    pub mastered: bool,
    /// Placement after recording.
    pub rank: Rank,
    /// Leaderboard after recording.
    pub entries: Vec<LeaderboardEntry>,
}

/// System that records every finished run once.
#[derive(Debug, Default)]
pub struct Leaderboard {
    recorded: u32,
}

impl Leaderboard {
    /// Creates a ranker that has not recorded anything yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of runs this ranker inserted.
    #[must_use]
    pub const fn recorded(&self) -> u32 {
        self.recorded
    }

    /// Records each `RunEnded` in `events`, stamping entries with `now_ms`.
    ///
    /// Write failures are logged; the standing is still reported from what
    /// could be read back.
    pub fn handle(
        &mut self,
        events: &[Event],
        store: &mut impl KeyValueStore,
        now_ms: u64,
        out: &mut Vec<Standing>,
    ) {
        for event in events {
            let Event::RunEnded {
                session,
                username,
                level,
                mastered,
            } = event
            else {
                continue;
            };

            let entry = LeaderboardEntry {
                username: username.clone(),
                level_reached: *level,
                completed_at: now_ms,
            };
            match record_if_new(store, session, entry) {
                Ok(Recording::Inserted) => {
                    self.recorded = self.recorded.saturating_add(1);
                    debug!(%session, %username, level = level.get(), "run recorded");
                }
                Ok(Recording::AlreadyRecorded) => {
                    debug!(%session, "run already recorded");
                }
                Err(error) => warn!(%error, %session, "failed to record run"),
            }

            let entries = load(store);
            out.push(Standing {
                session: session.clone(),
                username: username.clone(),
                level: *level,
                mastered: *mastered,
                rank: rank_in(&entries, username, *level),
                entries,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(username: &str, level: u32, completed_at: u64) -> LeaderboardEntry {
        LeaderboardEntry {
            username: username.to_owned(),
            level_reached: Level::new(level).expect("non-zero level"),
            completed_at,
        }
    }

    #[test]
    fn equal_levels_keep_insertion_order() {
        let mut entries = Vec::new();
        insert_ranked(&mut entries, entry("a", 5, 1));
        insert_ranked(&mut entries, entry("b", 9, 2));
        insert_ranked(&mut entries, entry("c", 5, 3));

        let names: Vec<_> = entries.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn rank_prefers_most_recent_match() {
        let entries = vec![
            entry("ana", 8, 10),
            entry("bea", 8, 50),
            entry("ana", 8, 40),
        ];
        assert_eq!(rank_in(&entries, "ana", Level::new(8).expect("level")), Rank::Position(3));
    }

    #[test]
    fn missing_entry_ranks_past_the_end() {
        let entries = vec![entry("ana", 8, 10)];
        assert_eq!(
            rank_in(&entries, "bea", Level::FIRST),
            Rank::Position(2)
        );
    }

    #[test]
    fn saturated_rank_displays_with_plus() {
        assert_eq!(Rank::Saturated.to_string(), "15+");
        assert_eq!(Rank::Position(3).to_string(), "3");
    }
}
