#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Target generation system that answers round requests with round parameters.
//!
//! Every `RoundRequested` event is answered with exactly one `BeginRound`
//! command carrying the level specification, a target drawn uniformly from the
//! specification's inclusive range, and the digit pool for the board.

use num_craze_core::{Command, Difficulty, Digit, Event, Level, LevelSpec};
use num_craze_system_level_table::LevelTable;
use rand::{seq::SliceRandom, Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Number of distinct digits offered on the board each round.
pub const DIGIT_POOL_SIZE: usize = 5;

const POOL_SOURCE: [u8; 9] = [1, 2, 3, 4, 5, 6, 7, 8, 9];

/// Configuration parameters required to construct the generator.
#[derive(Clone, Copy, Debug, Default)]
pub struct Config {
    rng_seed: Option<u64>,
}

impl Config {
    /// Creates a configuration drawing from a reproducible seed.
    #[must_use]
    pub const fn seeded(rng_seed: u64) -> Self {
        Self {
            rng_seed: Some(rng_seed),
        }
    }

    /// Creates a configuration drawing from operating-system entropy.
    #[must_use]
    pub const fn from_entropy() -> Self {
        Self { rng_seed: None }
    }
}

/// System that turns round requests into round parameters.
#[derive(Debug)]
pub struct TargetGenerator<R = ChaCha8Rng> {
    rng: R,
    table: LevelTable,
}

impl TargetGenerator<ChaCha8Rng> {
    /// Creates a generator from the provided configuration and level table.
    #[must_use]
    pub fn new(config: Config, table: LevelTable) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::with_rng(rng, table)
    }
}

impl<R: RngCore> TargetGenerator<R> {
    /// Creates a generator drawing from an explicit randomness source.
    #[must_use]
    pub fn with_rng(rng: R, table: LevelTable) -> Self {
        Self { rng, table }
    }

    /// Level table used to resolve specifications.
    #[must_use]
    pub fn table(&self) -> &LevelTable {
        &self.table
    }

    /// Draws a target uniformly from the inclusive range of the level's specification.
    pub fn generate_target(&mut self, level: Level, difficulty: Difficulty) -> i64 {
        let spec = self.table.spec_for(level, difficulty);
        self.draw_within(&spec)
    }

    /// Draws [`DIGIT_POOL_SIZE`] distinct digits from one to nine in random order.
    pub fn draw_digit_pool(&mut self) -> Vec<Digit> {
        let mut pool = POOL_SOURCE;
        pool.shuffle(&mut self.rng);
        pool.iter()
            .take(DIGIT_POOL_SIZE)
            .filter_map(|value| Digit::new(*value))
            .collect()
    }

    /// Consumes world events and emits one `BeginRound` per round request.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            let Event::RoundRequested {
                round,
                level,
                difficulty,
            } = event
            else {
                continue;
            };

            let spec = self.table.spec_for(*level, *difficulty);
            let target = self.draw_within(&spec);
            let digits = self.draw_digit_pool();
            debug!(
                round = round.get(),
                level = level.get(),
                target_number = target,
                "round parameters drawn"
            );
            out.push(Command::BeginRound {
                round: *round,
                spec,
                target,
                digits,
            });
        }
    }

    fn draw_within(&mut self, spec: &LevelSpec) -> i64 {
        self.rng.gen_range(spec.min_number()..=spec.max_number())
    }
}
