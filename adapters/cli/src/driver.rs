//! Pumps commands through the world and the reacting systems until quiescent.

use num_craze_core::{Command, Event, KeyValueStore};
use num_craze_system_leaderboard::{Leaderboard, Standing};
use num_craze_system_persistence::Persistence;
use num_craze_system_target_generation::TargetGenerator;
use num_craze_world::{self as world, World};

/// Everything that happened while handling one command.
#[derive(Debug, Default)]
pub(crate) struct Outcome {
    /// Events in emission order.
    pub(crate) events: Vec<Event>,
    /// Runs recorded on the leaderboard.
    pub(crate) standings: Vec<Standing>,
}

/// A running game: the world plus the systems reacting to it.
#[derive(Debug)]
pub(crate) struct Session<S> {
    world: World,
    generator: TargetGenerator,
    persistence: Persistence,
    leaderboard: Leaderboard,
    store: S,
}

impl<S: KeyValueStore> Session<S> {
    pub(crate) fn new(world: World, generator: TargetGenerator, store: S) -> Self {
        Self {
            world,
            generator,
            persistence: Persistence::new(),
            leaderboard: Leaderboard::new(),
            store,
        }
    }

    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    /// Applies `command` and every command the systems produce in response.
    ///
    /// `now_ms` stamps leaderboard entries recorded along the way.
    pub(crate) fn dispatch(&mut self, command: Command, now_ms: u64) -> Outcome {
        let mut outcome = Outcome::default();
        let mut commands = vec![command];

        while !commands.is_empty() {
            let mut events = Vec::new();
            for command in commands.drain(..) {
                world::apply(&mut self.world, command, &mut events);
            }
            if events.is_empty() {
                break;
            }

            self.persistence.handle(&events, &mut self.store);
            self.leaderboard
                .handle(&events, &mut self.store, now_ms, &mut outcome.standings);
            self.generator.handle(&events, &mut commands);
            outcome.events.extend(events);
        }

        outcome
    }
}
