#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Num Craze engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative session world, and pure systems. Adapters submit [`Command`]
//! values describing player intent, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond with new command batches or with writes through an
//! injected [`KeyValueStore`].

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Num Craze.";

/// Highest level a run can reach. Winning it ends the run as mastered.
pub const MAX_LEVEL: Level = Level(999);

/// Commands that express all permissible session mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Leaves the instructions screen and starts playing.
    StartGame,
    /// Supplies the parameters for a round previously announced by `RoundRequested`.
    BeginRound {
        /// Round the parameters belong to.
        round: RoundId,
        /// Resolved time limit and number range for the round's level.
        spec: LevelSpec,
        /// Number the player must reach.
        target: i64,
        /// Digits the player may press during the round.
        digits: Vec<Digit>,
    },
    /// Advances the session clock by the provided delta time.
    Tick {
        /// Duration of real time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Player pressed a digit button.
    PressDigit {
        /// Digit that was pressed.
        digit: Digit,
    },
    /// Player pressed an operator button.
    PressOperator {
        /// Operator that was pressed.
        operator: Operator,
    },
    /// Player wiped the current expression.
    ClearExpression,
    /// Player forced evaluation of the current expression.
    Submit,
    /// Player abandoned the current round.
    GiveUp,
    /// Player asked for a fresh run starting at level one.
    PlayAgain,
    /// Player handed control back to the account screen.
    NewPlayer,
    /// The hosting shell tore the session down.
    Dispose,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// The player left the instructions screen.
    GameStarted,
    /// The player profile changed and should be persisted.
    ProfileChanged {
        /// Profile after the change.
        profile: PlayerProfile,
    },
    /// The world needs parameters for a new round.
    RoundRequested {
        /// Identifier the answering `BeginRound` must carry.
        round: RoundId,
        /// Level being played.
        level: Level,
        /// Difficulty of the run.
        difficulty: Difficulty,
    },
    /// A `BeginRound` command carried parameters the world refused.
    RoundSetupRejected {
        /// Round the rejected parameters were meant for.
        round: RoundId,
        /// Specific reason the setup was refused.
        reason: SetupRejection,
    },
    /// A round was initialised and awaits its countdown.
    RoundStarted {
        /// Identifier of the round.
        round: RoundId,
        /// Time limit and number range in effect.
        spec: LevelSpec,
        /// Number the player must reach.
        target: i64,
        /// Digits available to the player.
        digits: Vec<Digit>,
    },
    /// The round countdown began ticking.
    CountdownStarted {
        /// Round the countdown belongs to.
        round: RoundId,
        /// Whole seconds on the clock when it started.
        seconds: u32,
    },
    /// One second elapsed on the round countdown.
    CountdownTicked {
        /// Round the countdown belongs to.
        round: RoundId,
        /// Whole seconds left after the tick.
        remaining: u32,
    },
    /// The player's expression changed.
    ExpressionUpdated {
        /// Tokens making up the expression after the change.
        tokens: Vec<Token>,
        /// Left-to-right value of the expression when it is complete and defined.
        live_result: Option<f64>,
    },
    /// A player input was refused without changing any state.
    InputRejected {
        /// Specific reason the input was refused.
        reason: InputRejection,
    },
    /// An explicit submission failed. The round keeps running.
    AttemptFailed {
        /// Why the submission failed.
        failure: AttemptFailure,
    },
    /// The player reached the target.
    RoundWon {
        /// Identifier of the round.
        round: RoundId,
        /// Level that was completed.
        level: Level,
        /// Value the expression evaluated to.
        result: f64,
        /// Combo streak after the win.
        streak: u32,
        /// Cosmetic tier unlocked by the streak.
        encouragement: Encouragement,
    },
    /// The round ended without a win.
    RoundLost {
        /// Identifier of the round.
        round: RoundId,
        /// Level that was being played.
        level: Level,
        /// What ended the round.
        cause: LossCause,
    },
    /// The session moved to a new screen.
    ScreenChanged {
        /// Screen that became active.
        screen: Screen,
    },
    /// A run finished and should be recorded on the leaderboard.
    RunEnded {
        /// Identifier of the finished run.
        session: SessionId,
        /// Player that finished the run.
        username: String,
        /// Level reached when the run ended.
        level: Level,
        /// Whether the run ended by winning the final level.
        mastered: bool,
    },
    /// Control returned to the hosting shell.
    SessionExited,
}

/// Ordinal difficulty step. Always at least one.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub struct Level(u32);

impl Level {
    /// Level every run starts from.
    pub const FIRST: Self = Self(1);

    /// Creates a level, returning `None` for zero.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        if value == 0 {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Retrieves the numeric level.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Level that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl TryFrom<u32> for Level {
    type Error = InvalidLevel;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidLevel)
    }
}

impl From<Level> for u32 {
    fn from(level: Level) -> Self {
        level.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a level of zero is decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("levels start at 1")]
pub struct InvalidLevel;

/// Difficulty selected for a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Longer timers and smaller targets.
    #[default]
    Normal,
    /// Shorter timers and larger targets.
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Hard => write!(f, "hard"),
        }
    }
}

/// Time limit and target range resolved for a level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LevelSpec {
    level: Level,
    time_limit_secs: u32,
    min_number: i64,
    max_number: i64,
}

impl LevelSpec {
    /// Creates a level specification.
    ///
    /// Returns `None` for a zero time limit or when `min_number` exceeds `max_number`.
    #[must_use]
    pub const fn new(
        level: Level,
        time_limit_secs: u32,
        min_number: i64,
        max_number: i64,
    ) -> Option<Self> {
        if time_limit_secs == 0 || min_number > max_number {
            return None;
        }
        Some(Self {
            level,
            time_limit_secs,
            min_number,
            max_number,
        })
    }

    /// Same time limit and range, resolved for another level.
    #[must_use]
    pub const fn at_level(self, level: Level) -> Self {
        Self { level, ..self }
    }

    /// Level the specification was resolved for.
    #[must_use]
    pub const fn level(&self) -> Level {
        self.level
    }

    /// Seconds on the countdown when the round starts.
    #[must_use]
    pub const fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    /// Smallest possible target, inclusive.
    #[must_use]
    pub const fn min_number(&self) -> i64 {
        self.min_number
    }

    /// Largest possible target, inclusive.
    #[must_use]
    pub const fn max_number(&self) -> i64 {
        self.max_number
    }

    /// Reports whether `target` lies within the inclusive range.
    #[must_use]
    pub const fn contains(&self, target: i64) -> bool {
        self.min_number <= target && target <= self.max_number
    }
}

/// A single decimal digit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digit(u8);

impl Digit {
    /// Creates a digit, returning `None` for values above nine.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value <= 9 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Numeric value of the digit.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Digit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Arithmetic operators available on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Addition.
    Add,
    /// Subtraction.
    Subtract,
    /// Multiplication, shown as `x`.
    Multiply,
    /// Division, shown as `:`.
    Divide,
}

impl Operator {
    /// All operators in button order.
    pub const ALL: [Self; 4] = [Self::Multiply, Self::Divide, Self::Add, Self::Subtract];

    /// Symbol printed on the board for the operator.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Subtract => '-',
            Self::Multiply => 'x',
            Self::Divide => ':',
        }
    }

    /// Parses a board symbol, also accepting `*` and `/`.
    #[must_use]
    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(Self::Add),
            '-' => Some(Self::Subtract),
            'x' | 'X' | '*' => Some(Self::Multiply),
            ':' | '/' => Some(Self::Divide),
            _ => None,
        }
    }
}

/// Element of the player's expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    /// A single-digit operand.
    Digit(Digit),
    /// An operator joining two operands.
    Operator(Operator),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Digit(digit) => write!(f, "{digit}"),
            Self::Operator(operator) => write!(f, "{}", operator.symbol()),
        }
    }
}

/// Identifier assigned to a round by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoundId(u32);

impl RoundId {
    /// Creates a new round identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a game session, used to keep leaderboard recording idempotent.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps the provided identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Derives the identifier of the `run`-th run inside this session.
    #[must_use]
    pub fn for_run(&self, run: u32) -> Self {
        Self(format!("{}#{run}", self.0))
    }

    /// Borrows the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted identity and progress of the player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    /// Name shown on the leaderboard. Never empty.
    pub username: String,
    /// Level the player is on.
    pub current_level: Level,
    /// Whether the instructions screen should be shown first.
    #[serde(rename = "isFirstTime")]
    pub is_first_run: bool,
    /// Difficulty fixed for the player's runs.
    #[serde(default)]
    pub difficulty: Difficulty,
}

/// Finished run recorded on the leaderboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Player that finished the run.
    pub username: String,
    /// Level reached.
    #[serde(rename = "level")]
    pub level_reached: Level,
    /// Completion time in milliseconds since the Unix epoch.
    #[serde(rename = "timestamp")]
    pub completed_at: u64,
}

/// Screens of the session state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Screen {
    /// How-to-play screen shown to first-time players.
    Instructions,
    /// A round is being set up, played, or celebrated.
    Playing,
    /// Short interlude before the next level starts.
    LevelComplete,
    /// Run finished; results and rankings are shown.
    Leaderboard,
    /// Control returned to the hosting shell.
    Exited,
}

/// Cosmetic encouragement tier unlocked by the combo streak.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Encouragement {
    /// Streak below three.
    None,
    /// Streak of three or more.
    Great,
    /// Streak of five or more.
    Amazing,
    /// Streak of seven or more.
    Unstoppable,
    /// Streak of ten or more.
    OnFire,
}

impl Encouragement {
    /// Resolves the tier for the provided streak.
    #[must_use]
    pub const fn for_streak(streak: u32) -> Self {
        match streak {
            10.. => Self::OnFire,
            7.. => Self::Unstoppable,
            5.. => Self::Amazing,
            3.. => Self::Great,
            _ => Self::None,
        }
    }

    /// Banner text for the tier, or `None` below the first threshold.
    #[must_use]
    pub const fn message(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Great => Some("GREAT!"),
            Self::Amazing => Some("AMAZING!"),
            Self::Unstoppable => Some("UNSTOPPABLE!"),
            Self::OnFire => Some("ON FIRE!"),
        }
    }
}

/// Reasons a player input may be refused by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputRejection {
    /// No round is accepting input on the current screen.
    NotPlaying,
    /// The round parameters have not arrived yet.
    RoundNotReady,
    /// The round already resolved.
    RoundResolved,
    /// The digit is not part of this round's pool.
    DigitUnavailable,
    /// An operator may only follow a digit.
    OperatorNotAllowed,
    /// The command is not valid on the current screen.
    InvalidTransition,
}

/// Reasons a `BeginRound` command may be refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SetupRejection {
    /// The specification was resolved for a different level.
    LevelMismatch,
    /// The target lies outside the specification's range.
    TargetOutOfRange,
    /// No digits were supplied.
    EmptyDigitPool,
}

/// Why an explicit submission failed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AttemptFailure {
    /// The expression ends with an operator.
    Malformed,
    /// Evaluation divided by zero or left the finite range.
    Undefined,
    /// The expression evaluated to a different number.
    WrongAnswer {
        /// Value the expression evaluated to.
        result: f64,
    },
}

/// What ended a lost round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LossCause {
    /// The countdown reached zero.
    TimeExpired,
    /// The player gave up.
    GaveUp,
}

/// Errors surfaced by a [`KeyValueStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading the value stored under `key` failed.
    #[error("failed to read `{key}`: {reason}")]
    Read {
        /// Key being read.
        key: String,
        /// Backend-specific description of the failure.
        reason: String,
    },
    /// Writing or removing the value stored under `key` failed.
    #[error("failed to write `{key}`: {reason}")]
    Write {
        /// Key being written.
        key: String,
        /// Backend-specific description of the failure.
        reason: String,
    },
}

/// Durable string key-value storage injected into persistence-aware systems.
pub trait KeyValueStore {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Deletes the value stored under `key`. Missing keys are not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::{
        Difficulty, Digit, Encouragement, LeaderboardEntry, Level, LevelSpec, Operator,
        PlayerProfile, SessionId,
    };

    #[test]
    fn level_rejects_zero() {
        assert_eq!(Level::new(0), None);
        assert_eq!(Level::new(1), Some(Level::FIRST));
        assert_eq!(Level::FIRST.next().get(), 2);
    }

    #[test]
    fn level_spec_rejects_inverted_range_and_zero_time() {
        assert!(LevelSpec::new(Level::FIRST, 30, 50, 49).is_none());
        assert!(LevelSpec::new(Level::FIRST, 0, 1, 9).is_none());

        let spec = LevelSpec::new(Level::FIRST, 30, 7, 7).expect("single-value range");
        assert!(spec.contains(7));
        let later = spec.at_level(Level::new(9).expect("non-zero"));
        assert_eq!(later.level().get(), 9);
        assert_eq!((later.min_number(), later.max_number()), (7, 7));
    }

    #[test]
    fn digit_rejects_values_above_nine() {
        assert!(Digit::new(9).is_some());
        assert!(Digit::new(10).is_none());
    }

    #[test]
    fn operator_symbols_round_trip() {
        for operator in Operator::ALL {
            assert_eq!(Operator::from_symbol(operator.symbol()), Some(operator));
        }
        assert_eq!(Operator::from_symbol('*'), Some(Operator::Multiply));
        assert_eq!(Operator::from_symbol('/'), Some(Operator::Divide));
        assert_eq!(Operator::from_symbol('%'), None);
    }

    #[test]
    fn encouragement_thresholds_match_streaks() {
        assert_eq!(Encouragement::for_streak(2), Encouragement::None);
        assert_eq!(Encouragement::for_streak(3), Encouragement::Great);
        assert_eq!(Encouragement::for_streak(6), Encouragement::Amazing);
        assert_eq!(Encouragement::for_streak(7), Encouragement::Unstoppable);
        assert_eq!(Encouragement::for_streak(42), Encouragement::OnFire);
        assert_eq!(Encouragement::None.message(), None);
    }

    #[test]
    fn profile_uses_browser_record_layout() {
        let profile = PlayerProfile {
            username: "pedro".to_owned(),
            current_level: Level::new(4).expect("non-zero"),
            is_first_run: false,
            difficulty: Difficulty::Hard,
        };
        let json = serde_json::to_value(&profile).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "username": "pedro",
                "currentLevel": 4,
                "isFirstTime": false,
                "difficulty": "hard",
            })
        );
    }

    #[test]
    fn profile_without_difficulty_defaults_to_normal() {
        let profile: PlayerProfile = serde_json::from_str(
            r#"{"username":"ana","currentLevel":2,"isFirstTime":true}"#,
        )
        .expect("deserialize");
        assert_eq!(profile.difficulty, Difficulty::Normal);
    }

    #[test]
    fn profile_with_level_zero_is_rejected() {
        let result = serde_json::from_str::<PlayerProfile>(
            r#"{"username":"ana","currentLevel":0,"isFirstTime":true,"difficulty":"normal"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn leaderboard_entry_uses_browser_record_layout() {
        let entry = LeaderboardEntry {
            username: "ana".to_owned(),
            level_reached: Level::new(12).expect("non-zero"),
            completed_at: 1_700_000_000_000,
        };
        let json = serde_json::to_string(&entry).expect("serialize");
        assert_eq!(
            json,
            r#"{"username":"ana","level":12,"timestamp":1700000000000}"#
        );
    }

    #[test]
    fn session_runs_are_distinct() {
        let session = SessionId::new("abc");
        assert_eq!(session.for_run(0).as_str(), "abc#0");
        assert_ne!(session.for_run(0), session.for_run(1));
    }
}
