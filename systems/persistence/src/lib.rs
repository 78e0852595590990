#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Player profile persistence on top of an injected key-value store.
//!
//! The profile lives under a single fixed key as a JSON object. Unreadable or
//! corrupt records never fail a session: they are logged and treated as a
//! first-time player.

use std::collections::HashMap;

use num_craze_core::{Difficulty, Event, KeyValueStore, Level, PlayerProfile, StoreError};
use thiserror::Error;
use tracing::{debug, warn};

/// Key holding the JSON-encoded player profile.
pub const PROFILE_KEY: &str = "runblock_player";

/// Volatile store backing tests and sessions that should leave no trace.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Reports whether the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let _ = self.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let _ = self.values.remove(key);
        Ok(())
    }
}

/// Errors raised while signing in or saving the profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The username was empty after trimming.
    #[error("username must not be empty")]
    EmptyUsername,
    /// The profile could not be encoded.
    #[error("failed to encode profile: {0}")]
    Encode(#[from] serde_json::Error),
    /// The backing store refused the write.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Loads the saved profile, treating unreadable or corrupt records as absent.
#[must_use]
pub fn load_profile(store: &impl KeyValueStore) -> Option<PlayerProfile> {
    let raw = match store.get(PROFILE_KEY) {
        Ok(raw) => raw?,
        Err(error) => {
            warn!(%error, "player profile unreadable; treating as first-time player");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(profile) => Some(profile),
        Err(error) => {
            warn!(%error, "player profile corrupt; treating as first-time player");
            None
        }
    }
}

/// Writes `profile` under [`PROFILE_KEY`].
pub fn save_profile(
    store: &mut impl KeyValueStore,
    profile: &PlayerProfile,
) -> Result<(), ProfileError> {
    let encoded = serde_json::to_string(profile)?;
    store.set(PROFILE_KEY, &encoded)?;
    Ok(())
}

/// Removes the saved profile. The leaderboard is left untouched.
pub fn clear_profile(store: &mut impl KeyValueStore) -> Result<(), StoreError> {
    store.remove(PROFILE_KEY)
}

/// Builds the profile for a player starting a new game.
///
/// The username is trimmed and must not be empty. Every sign-in starts at
/// level one with the chosen difficulty; the instructions are skipped only for
/// a player whose saved profile carries the same name.
pub fn sign_in(
    saved: Option<&PlayerProfile>,
    username: &str,
    difficulty: Difficulty,
) -> Result<PlayerProfile, ProfileError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ProfileError::EmptyUsername);
    }

    let returning = saved.is_some_and(|profile| profile.username == username);
    Ok(PlayerProfile {
        username: username.to_owned(),
        current_level: Level::FIRST,
        is_first_run: !returning,
        difficulty,
    })
}

/// System that writes every profile change through to the store.
#[derive(Debug, Default)]
pub struct Persistence {
    last_saved: Option<PlayerProfile>,
}

impl Persistence {
    /// Creates a system that has not written anything yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile most recently written, if any.
    #[must_use]
    pub fn last_saved(&self) -> Option<&PlayerProfile> {
        self.last_saved.as_ref()
    }

    /// Persists the latest `ProfileChanged` in `events`.
    ///
    /// Write failures are logged and do not interrupt the session; the next
    /// change is attempted again.
    pub fn handle(&mut self, events: &[Event], store: &mut impl KeyValueStore) {
        let latest = events.iter().rev().find_map(|event| match event {
            Event::ProfileChanged { profile } => Some(profile),
            _ => None,
        });
        let Some(profile) = latest else {
            return;
        };
        if self.last_saved.as_ref() == Some(profile) {
            return;
        }

        match save_profile(store, profile) {
            Ok(()) => {
                debug!(
                    username = %profile.username,
                    level = profile.current_level.get(),
                    "player profile saved"
                );
                self.last_saved = Some(profile.clone());
            }
            Err(error) => warn!(%error, "failed to save player profile"),
        }
    }
}
