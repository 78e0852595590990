#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure level table mapping a level and difficulty to its time limit and target range.
//!
//! Each difficulty owns an ordered list of brackets. A bracket with an `up_to`
//! threshold covers every level up to and including that threshold that an
//! earlier bracket did not claim; the final bracket has no threshold and covers
//! every remaining level, so lookups never fail.

use num_craze_core::{Difficulty, Level, LevelSpec};
use serde::Deserialize;
use thiserror::Error;

const NORMAL_BOUNDED: [(u32, LevelSpec); 9] = [
    (10, fixed(120, 20, 49)),
    (15, fixed(110, 50, 99)),
    (20, fixed(100, 100, 249)),
    (25, fixed(90, 250, 499)),
    (30, fixed(85, 500, 1_000)),
    (50, fixed(80, 1_000, 2_500)),
    (100, fixed(75, 2_500, 5_000)),
    (200, fixed(70, 5_000, 10_000)),
    (500, fixed(65, 10_000, 50_000)),
];
const NORMAL_OPEN: LevelSpec = fixed(60, 50_000, 100_000);

const HARD_BOUNDED: [(u32, LevelSpec); 7] = [
    (10, fixed(60, 20, 99)),
    (20, fixed(55, 100, 499)),
    (30, fixed(50, 500, 1_000)),
    (50, fixed(50, 1_000, 2_500)),
    (100, fixed(45, 2_500, 5_000)),
    (200, fixed(45, 5_000, 10_000)),
    (500, fixed(40, 10_000, 50_000)),
];
const HARD_OPEN: LevelSpec = fixed(40, 50_000, 100_000);

/// Built-in bracket template. Only evaluated in constants, so a malformed row fails the build.
const fn fixed(time_limit_secs: u32, min_number: i64, max_number: i64) -> LevelSpec {
    match LevelSpec::new(Level::FIRST, time_limit_secs, min_number, max_number) {
        Some(spec) => spec,
        None => panic!("malformed built-in level bracket"),
    }
}

fn lookup(bounded: &[(u32, LevelSpec)], open: LevelSpec, level: Level) -> LevelSpec {
    bounded
        .iter()
        .find(|(up_to, _)| level.get() <= *up_to)
        .map_or(open, |(_, spec)| *spec)
        .at_level(level)
}

/// Resolves the built-in specification for `level` at `difficulty`.
#[must_use]
pub fn level_spec_for(level: Level, difficulty: Difficulty) -> LevelSpec {
    match difficulty {
        Difficulty::Normal => lookup(&NORMAL_BOUNDED, NORMAL_OPEN, level),
        Difficulty::Hard => lookup(&HARD_BOUNDED, HARD_OPEN, level),
    }
}

/// One row of a level table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bracket {
    /// Highest level covered by the bracket, or `None` for the open-ended final bracket.
    #[serde(default)]
    pub up_to: Option<u32>,
    /// Seconds on the countdown for levels in this bracket.
    pub time_limit_secs: u32,
    /// Smallest target, inclusive.
    pub min_number: i64,
    /// Largest target, inclusive.
    pub max_number: i64,
}

impl Bracket {
    /// Creates a bracket covering levels up to and including `up_to`.
    #[must_use]
    pub const fn bounded(up_to: u32, time_limit_secs: u32, min_number: i64, max_number: i64) -> Self {
        Self {
            up_to: Some(up_to),
            time_limit_secs,
            min_number,
            max_number,
        }
    }

    /// Creates the open-ended bracket covering every remaining level.
    #[must_use]
    pub const fn open(time_limit_secs: u32, min_number: i64, max_number: i64) -> Self {
        Self {
            up_to: None,
            time_limit_secs,
            min_number,
            max_number,
        }
    }
}

/// Deserialised replacement tables. Missing difficulties keep the built-in brackets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelTableConfig {
    /// Brackets used for normal runs.
    #[serde(default)]
    pub normal: Option<Vec<Bracket>>,
    /// Brackets used for hard runs.
    #[serde(default)]
    pub hard: Option<Vec<Bracket>>,
}

/// Validated bracket tables for both difficulties.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelTable {
    normal: Tiers,
    hard: Tiers,
}

impl Default for LevelTable {
    fn default() -> Self {
        Self {
            normal: Tiers::builtin(&NORMAL_BOUNDED, NORMAL_OPEN),
            hard: Tiers::builtin(&HARD_BOUNDED, HARD_OPEN),
        }
    }
}

impl LevelTable {
    /// Builds a table from explicit bracket lists, validating both.
    pub fn new(normal: Vec<Bracket>, hard: Vec<Bracket>) -> Result<Self, LevelTableError> {
        Ok(Self {
            normal: Tiers::validate(Difficulty::Normal, normal)?,
            hard: Tiers::validate(Difficulty::Hard, hard)?,
        })
    }

    /// Builds a table from a parsed configuration section.
    pub fn from_config(config: LevelTableConfig) -> Result<Self, LevelTableError> {
        let mut table = Self::default();
        if let Some(normal) = config.normal {
            table.normal = Tiers::validate(Difficulty::Normal, normal)?;
        }
        if let Some(hard) = config.hard {
            table.hard = Tiers::validate(Difficulty::Hard, hard)?;
        }
        Ok(table)
    }

    /// Parses a TOML document containing `[[normal]]` and/or `[[hard]]` bracket arrays.
    pub fn from_toml_str(contents: &str) -> Result<Self, LevelTableError> {
        let config: LevelTableConfig = toml::from_str(contents)?;
        Self::from_config(config)
    }

    /// Resolves the specification for `level` at `difficulty`.
    #[must_use]
    pub fn spec_for(&self, level: Level, difficulty: Difficulty) -> LevelSpec {
        let tiers = match difficulty {
            Difficulty::Normal => &self.normal,
            Difficulty::Hard => &self.hard,
        };
        tiers.lookup(level)
    }
}

/// Validated brackets: the bounded prefix with its thresholds and the open-ended tail.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Tiers {
    bounded: Vec<(u32, LevelSpec)>,
    open: LevelSpec,
}

impl Tiers {
    fn builtin(bounded: &[(u32, LevelSpec)], open: LevelSpec) -> Self {
        Self {
            bounded: bounded.to_vec(),
            open,
        }
    }

    fn validate(difficulty: Difficulty, brackets: Vec<Bracket>) -> Result<Self, LevelTableError> {
        match brackets.last() {
            None => return Err(LevelTableError::Empty { difficulty }),
            Some(last) if last.up_to.is_some() => {
                return Err(LevelTableError::MissingOpenBracket { difficulty })
            }
            Some(_) => {}
        }

        let mut previous = 0;
        let mut bounded = Vec::with_capacity(brackets.len() - 1);
        for (index, bracket) in brackets.iter().enumerate() {
            if bracket.time_limit_secs == 0 {
                return Err(LevelTableError::ZeroTimeLimit { difficulty, index });
            }
            let Some(spec) = LevelSpec::new(
                Level::FIRST,
                bracket.time_limit_secs,
                bracket.min_number,
                bracket.max_number,
            ) else {
                return Err(LevelTableError::InvertedRange { difficulty, index });
            };
            if index + 1 == brackets.len() {
                return Ok(Self {
                    bounded,
                    open: spec,
                });
            }
            let Some(up_to) = bracket.up_to else {
                return Err(LevelTableError::OpenBracketNotLast { difficulty, index });
            };
            if up_to <= previous {
                return Err(LevelTableError::NonAscending { difficulty, index });
            }
            previous = up_to;
            bounded.push((up_to, spec));
        }

        Err(LevelTableError::Empty { difficulty })
    }

    fn lookup(&self, level: Level) -> LevelSpec {
        lookup(&self.bounded, self.open, level)
    }
}

/// Reasons a configured level table may be refused.
#[derive(Debug, Error)]
pub enum LevelTableError {
    /// The TOML document could not be parsed.
    #[error("could not parse level table: {0}")]
    Parse(#[from] toml::de::Error),
    /// A difficulty was given no brackets.
    #[error("{difficulty} level table has no brackets")]
    Empty {
        /// Difficulty whose table is empty.
        difficulty: Difficulty,
    },
    /// The final bracket carries an `up_to` threshold.
    #[error("{difficulty} level table must end with a bracket without `up_to`")]
    MissingOpenBracket {
        /// Difficulty whose table is unbounded at the top.
        difficulty: Difficulty,
    },
    /// A bracket without a threshold appears before the end of the table.
    #[error("{difficulty} bracket {index} has no `up_to` but is not the last bracket")]
    OpenBracketNotLast {
        /// Difficulty of the offending table.
        difficulty: Difficulty,
        /// Position of the offending bracket.
        index: usize,
    },
    /// Thresholds are not strictly ascending and positive.
    #[error("{difficulty} bracket {index} does not raise the level threshold")]
    NonAscending {
        /// Difficulty of the offending table.
        difficulty: Difficulty,
        /// Position of the offending bracket.
        index: usize,
    },
    /// A bracket allows zero seconds.
    #[error("{difficulty} bracket {index} has a zero time limit")]
    ZeroTimeLimit {
        /// Difficulty of the offending table.
        difficulty: Difficulty,
        /// Position of the offending bracket.
        index: usize,
    },
    /// A bracket's minimum exceeds its maximum.
    #[error("{difficulty} bracket {index} has min_number above max_number")]
    InvertedRange {
        /// Difficulty of the offending table.
        difficulty: Difficulty,
        /// Position of the offending bracket.
        index: usize,
    },
}
