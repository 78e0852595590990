use num_craze_core::{Difficulty, Event, KeyValueStore, Level, PlayerProfile, StoreError};
use num_craze_system_persistence::{
    clear_profile, load_profile, save_profile, MemoryStore, Persistence, ProfileError, PROFILE_KEY,
};

fn profile(level: u32) -> PlayerProfile {
    PlayerProfile {
        username: "ana".to_owned(),
        current_level: Level::new(level).expect("non-zero level"),
        is_first_run: false,
        difficulty: Difficulty::Normal,
    }
}

/// Store whose every operation fails, standing in for a full or locked disk.
struct BrokenStore;

impl KeyValueStore for BrokenStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Read {
            key: key.to_owned(),
            reason: "device unavailable".to_owned(),
        })
    }

    fn set(&mut self, key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Write {
            key: key.to_owned(),
            reason: "device unavailable".to_owned(),
        })
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.set(key, "")
    }
}

#[test]
fn saved_profile_loads_back() {
    let mut store = MemoryStore::new();
    save_profile(&mut store, &profile(17)).expect("memory store accepts writes");

    assert_eq!(load_profile(&store), Some(profile(17)));
    let raw = store
        .get(PROFILE_KEY)
        .expect("memory store reads")
        .expect("profile present");
    assert!(raw.contains(r#""currentLevel":17"#), "unexpected layout: {raw}");
}

#[test]
fn corrupt_profile_reads_as_first_time_player() {
    let mut store = MemoryStore::new();
    store
        .set(PROFILE_KEY, "{not json")
        .expect("memory store accepts writes");

    assert_eq!(load_profile(&store), None);
}

#[test]
fn unreadable_store_reads_as_first_time_player() {
    assert_eq!(load_profile(&BrokenStore), None);
}

#[test]
fn failed_write_is_reported() {
    let result = save_profile(&mut BrokenStore, &profile(1));
    assert!(matches!(result, Err(ProfileError::Store(StoreError::Write { .. }))));
}

#[test]
fn clearing_removes_only_the_profile() {
    let mut store = MemoryStore::new();
    save_profile(&mut store, &profile(3)).expect("memory store accepts writes");
    store
        .set("runblock_leaderboard", "[]")
        .expect("memory store accepts writes");

    clear_profile(&mut store).expect("memory store accepts removals");

    assert_eq!(load_profile(&store), None);
    assert_eq!(store.len(), 1, "leaderboard must survive a profile reset");
}

#[test]
fn system_persists_latest_profile_change() {
    let mut store = MemoryStore::new();
    let mut persistence = Persistence::new();

    persistence.handle(
        &[
            Event::ProfileChanged {
                profile: profile(4),
            },
            Event::GameStarted,
            Event::ProfileChanged {
                profile: profile(5),
            },
        ],
        &mut store,
    );

    assert_eq!(load_profile(&store), Some(profile(5)));
    assert_eq!(persistence.last_saved(), Some(&profile(5)));
}

#[test]
fn system_survives_write_failures() {
    let mut persistence = Persistence::new();

    persistence.handle(
        &[Event::ProfileChanged {
            profile: profile(2),
        }],
        &mut BrokenStore,
    );

    assert_eq!(persistence.last_saved(), None);
}
