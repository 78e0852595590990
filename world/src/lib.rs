#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative session state for Num Craze.
//!
//! The world owns the screen state machine, the round being played, the one
//! countdown and the one pending delayed transition. Adapters and systems
//! mutate it only through [`apply`] and observe it through [`query`] and the
//! events it emits.

mod countdown;
mod schedule;

use std::time::Duration;

use num_craze_core::{
    AttemptFailure, Command, Digit, Encouragement, Event, InputRejection, Level, LevelSpec,
    LossCause, Operator, PlayerProfile, RoundId, Screen, SessionId, SetupRejection, MAX_LEVEL,
    WELCOME_BANNER,
};
use num_craze_system_expression::{ExpressionEngine, InputOutcome, SubmitError, Win};
use tracing::{debug, warn};

use crate::{
    countdown::Countdown,
    schedule::{Deferred, Pending},
};

/// Presentation pacing applied between session transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    /// Pause between a round being initialised and its countdown starting.
    pub ready_delay: Duration,
    /// Pause after a win before the round is left.
    pub celebration_delay: Duration,
    /// Length of the level-complete interlude.
    pub level_complete_delay: Duration,
    /// Time to wait for round parameters before asking again.
    pub setup_retry_delay: Duration,
    /// Real time represented by one countdown second.
    pub countdown_period: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            ready_delay: Duration::from_millis(150),
            celebration_delay: Duration::from_millis(1_000),
            level_complete_delay: Duration::from_millis(500),
            setup_retry_delay: Duration::from_millis(500),
            countdown_period: Duration::from_secs(1),
        }
    }
}

/// Lifecycle of a round once its parameters arrived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoundPhase {
    /// Initialised; the countdown has not started yet.
    Preparing,
    /// The countdown is running.
    Running,
    /// The target was reached.
    Won,
    /// Time ran out or the player gave up.
    Lost,
}

/// Represents the authoritative Num Craze session state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    profile: PlayerProfile,
    session: SessionId,
    run: u32,
    screen: Screen,
    timing: Timing,
    next_round: u32,
    requested: Option<RoundId>,
    round: Option<Round>,
    streak: u32,
    countdown: Option<Countdown>,
    pending: Option<Pending>,
}

impl World {
    /// Creates a session for `profile` using the default pacing.
    ///
    /// First-time players start on the instructions screen. Returning players
    /// start playing immediately; the first round is requested on the first tick.
    #[must_use]
    pub fn new(profile: PlayerProfile, session: SessionId) -> Self {
        Self::with_timing(profile, session, Timing::default())
    }

    /// Creates a session with explicit pacing.
    #[must_use]
    pub fn with_timing(profile: PlayerProfile, session: SessionId, timing: Timing) -> Self {
        let (screen, pending) = if profile.is_first_run {
            (Screen::Instructions, None)
        } else {
            (
                Screen::Playing,
                Some(Pending::after(Duration::ZERO, Deferred::RequestRound)),
            )
        };

        Self {
            banner: WELCOME_BANNER,
            profile,
            session,
            run: 0,
            screen,
            timing,
            next_round: 0,
            requested: None,
            round: None,
            streak: 0,
            countdown: None,
            pending,
        }
    }

    fn level(&self) -> Level {
        self.profile.current_level
    }

    fn schedule(&mut self, delay: Duration, action: Deferred) {
        self.pending = Some(Pending::after(delay, action));
    }

    fn stop_timers(&mut self) {
        self.countdown = None;
        self.pending = None;
    }

    fn change_screen(&mut self, screen: Screen, out_events: &mut Vec<Event>) {
        debug!(from = ?self.screen, to = ?screen, "screen changed");
        self.screen = screen;
        out_events.push(Event::ScreenChanged { screen });
    }

    fn enter_playing(&mut self, out_events: &mut Vec<Event>) {
        self.stop_timers();
        self.round = None;
        self.requested = None;
        self.change_screen(Screen::Playing, out_events);
        self.request_round(out_events);
    }

    fn request_round(&mut self, out_events: &mut Vec<Event>) {
        let round = match self.requested {
            Some(round) => {
                warn!(round = round.get(), "round parameters did not arrive; requesting again");
                round
            }
            None => {
                let round = self.allocate_round();
                self.requested = Some(round);
                round
            }
        };

        out_events.push(Event::RoundRequested {
            round,
            level: self.level(),
            difficulty: self.profile.difficulty,
        });
        self.schedule(self.timing.setup_retry_delay, Deferred::RequestRound);
    }

    fn allocate_round(&mut self) -> RoundId {
        self.next_round = self.next_round.saturating_add(1);
        RoundId::new(self.next_round)
    }

    fn active_round(&mut self) -> Result<&mut Round, InputRejection> {
        if self.screen != Screen::Playing {
            return Err(InputRejection::NotPlaying);
        }
        let round = self.round.as_mut().ok_or(InputRejection::RoundNotReady)?;
        if round.is_resolved() {
            return Err(InputRejection::RoundResolved);
        }
        Ok(round)
    }

    fn resolve_win(&mut self, win: Win, out_events: &mut Vec<Event>) {
        self.streak = win.streak;
        let level = self.level();
        let Some(round) = self.round.as_mut() else {
            return;
        };
        round.phase = RoundPhase::Won;
        let id = round.id;

        self.countdown = None;
        out_events.push(Event::RoundWon {
            round: id,
            level,
            result: win.result,
            streak: win.streak,
            encouragement: Encouragement::for_streak(win.streak),
        });
        self.schedule(self.timing.celebration_delay, Deferred::FinishRound(id));
    }

    fn resolve_loss(&mut self, cause: LossCause, out_events: &mut Vec<Event>) {
        self.stop_timers();
        let level = self.level();
        // Losing before any round was requested still loses the one that was due.
        let round = match self.round.as_mut() {
            Some(round) => {
                round.phase = RoundPhase::Lost;
                round.id
            }
            None => match self.requested.take() {
                Some(round) => round,
                None => self.allocate_round(),
            },
        };

        out_events.push(Event::RoundLost {
            round,
            level,
            cause,
        });
        self.end_run(false, out_events);
    }

    fn end_run(&mut self, mastered: bool, out_events: &mut Vec<Event>) {
        self.stop_timers();
        self.change_screen(Screen::Leaderboard, out_events);
        out_events.push(Event::RunEnded {
            session: self.session.for_run(self.run),
            username: self.profile.username.clone(),
            level: self.level(),
            mastered,
        });
    }

    fn record_failure(&mut self, failure: AttemptFailure, out_events: &mut Vec<Event>) {
        self.streak = 0;
        out_events.push(Event::AttemptFailed { failure });
    }

    fn fire(&mut self, action: Deferred, out_events: &mut Vec<Event>) {
        match action {
            Deferred::RequestRound => {
                if self.screen == Screen::Playing && self.round.is_none() {
                    self.request_round(out_events);
                }
            }
            Deferred::StartCountdown(id) => {
                let Some(round) = self.round.as_mut() else {
                    return;
                };
                if round.id != id || round.phase != RoundPhase::Preparing {
                    return;
                }
                round.phase = RoundPhase::Running;
                let seconds = round.time_remaining;
                self.countdown = Some(Countdown::start(id, self.timing.countdown_period));
                out_events.push(Event::CountdownStarted { round: id, seconds });
            }
            Deferred::FinishRound(id) => {
                let won = self
                    .round
                    .as_ref()
                    .is_some_and(|round| round.id == id && round.phase == RoundPhase::Won);
                if !won {
                    return;
                }
                if self.level() >= MAX_LEVEL {
                    self.end_run(true, out_events);
                } else {
                    self.change_screen(Screen::LevelComplete, out_events);
                    self.schedule(self.timing.level_complete_delay, Deferred::AdvanceLevel);
                }
            }
            Deferred::AdvanceLevel => {
                if self.screen != Screen::LevelComplete {
                    return;
                }
                self.profile.current_level = self.level().next();
                out_events.push(Event::ProfileChanged {
                    profile: self.profile.clone(),
                });
                self.enter_playing(out_events);
            }
        }
    }

    fn run_countdown(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let Some(countdown) = self.countdown.as_mut() else {
            return;
        };
        let elapsed = countdown.advance(dt);
        let id = countdown.round();

        let mut expired = false;
        if let Some(round) = self.round.as_mut() {
            if round.id != id || round.phase != RoundPhase::Running {
                self.countdown = None;
                return;
            }
            for _ in 0..elapsed {
                round.time_remaining = round.time_remaining.saturating_sub(1);
                out_events.push(Event::CountdownTicked {
                    round: id,
                    remaining: round.time_remaining,
                });
                if round.time_remaining == 0 {
                    expired = true;
                    break;
                }
            }
        } else {
            self.countdown = None;
            return;
        }

        if expired {
            self.resolve_loss(LossCause::TimeExpired, out_events);
        }
    }
}

/// A round whose parameters arrived.
#[derive(Clone, Debug)]
struct Round {
    id: RoundId,
    spec: LevelSpec,
    digits: Vec<Digit>,
    time_remaining: u32,
    engine: ExpressionEngine,
    phase: RoundPhase,
}

impl Round {
    fn is_resolved(&self) -> bool {
        matches!(self.phase, RoundPhase::Won | RoundPhase::Lost)
    }

    fn expression_event(&self) -> Event {
        Event::ExpressionUpdated {
            tokens: self.engine.expression().tokens().to_vec(),
            live_result: self.engine.live_result(),
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::StartGame => {
            if world.screen != Screen::Instructions {
                reject(InputRejection::InvalidTransition, out_events);
                return;
            }
            world.profile.is_first_run = false;
            out_events.push(Event::GameStarted);
            out_events.push(Event::ProfileChanged {
                profile: world.profile.clone(),
            });
            world.enter_playing(out_events);
        }
        Command::BeginRound {
            round,
            spec,
            target,
            digits,
        } => begin_round(world, round, spec, target, digits, out_events),
        Command::Tick { dt } => advance(world, dt, out_events),
        Command::PressDigit { digit } => {
            let outcome = world.active_round().and_then(|round| {
                if !round.digits.contains(&digit) {
                    return Err(InputRejection::DigitUnavailable);
                }
                let outcome = round.engine.append_digit(digit);
                out_events.push(round.expression_event());
                Ok(outcome)
            });
            settle_input(world, outcome, out_events);
        }
        Command::PressOperator { operator } => press_operator(world, operator, out_events),
        Command::ClearExpression => match world.active_round() {
            Ok(round) => {
                round.engine.clear();
                out_events.push(round.expression_event());
            }
            Err(reason) => reject(reason, out_events),
        },
        Command::Submit => submit(world, out_events),
        Command::GiveUp => {
            if world.screen != Screen::Playing {
                reject(InputRejection::NotPlaying, out_events);
            } else if world.round.as_ref().is_some_and(Round::is_resolved) {
                reject(InputRejection::RoundResolved, out_events);
            } else {
                world.resolve_loss(LossCause::GaveUp, out_events);
            }
        }
        Command::PlayAgain => {
            if world.screen != Screen::Leaderboard {
                reject(InputRejection::InvalidTransition, out_events);
                return;
            }
            world.run = world.run.saturating_add(1);
            world.streak = 0;
            world.profile.current_level = Level::FIRST;
            out_events.push(Event::ProfileChanged {
                profile: world.profile.clone(),
            });
            world.enter_playing(out_events);
        }
        Command::NewPlayer => {
            if world.screen != Screen::Leaderboard {
                reject(InputRejection::InvalidTransition, out_events);
                return;
            }
            exit(world, out_events);
        }
        Command::Dispose => {
            if world.screen != Screen::Exited {
                exit(world, out_events);
            }
        }
    }
}

fn reject(reason: InputRejection, out_events: &mut Vec<Event>) {
    out_events.push(Event::InputRejected { reason });
}

fn exit(world: &mut World, out_events: &mut Vec<Event>) {
    world.stop_timers();
    world.round = None;
    world.requested = None;
    world.change_screen(Screen::Exited, out_events);
    out_events.push(Event::SessionExited);
}

fn begin_round(
    world: &mut World,
    round: RoundId,
    spec: LevelSpec,
    target: i64,
    digits: Vec<Digit>,
    out_events: &mut Vec<Event>,
) {
    if world.screen != Screen::Playing || world.requested != Some(round) {
        debug!(round = round.get(), "ignoring parameters for a stale round");
        return;
    }

    let rejection = if spec.level() != world.level() {
        Some(SetupRejection::LevelMismatch)
    } else if !spec.contains(target) {
        Some(SetupRejection::TargetOutOfRange)
    } else if digits.is_empty() {
        Some(SetupRejection::EmptyDigitPool)
    } else {
        None
    };
    if let Some(reason) = rejection {
        warn!(round = round.get(), ?reason, "refusing round parameters");
        out_events.push(Event::RoundSetupRejected { round, reason });
        return;
    }

    world.requested = None;
    world.round = Some(Round {
        id: round,
        spec,
        digits: digits.clone(),
        time_remaining: spec.time_limit_secs(),
        engine: ExpressionEngine::new(target, world.streak),
        phase: RoundPhase::Preparing,
    });
    out_events.push(Event::RoundStarted {
        round,
        spec,
        target,
        digits,
    });
    world.schedule(world.timing.ready_delay, Deferred::StartCountdown(round));
}

fn advance(world: &mut World, dt: Duration, out_events: &mut Vec<Event>) {
    let mut remaining = dt;
    while let Some(pending) = world.pending.as_mut() {
        let Some((action, leftover)) = pending.consume(remaining) else {
            return;
        };
        world.pending = None;
        world.fire(action, out_events);
        if world.requested.is_some() {
            return;
        }
        remaining = leftover;
    }
    world.run_countdown(remaining, out_events);
}

fn press_operator(world: &mut World, operator: Operator, out_events: &mut Vec<Event>) {
    let outcome = world.active_round().and_then(|round| {
        match round.engine.append_operator(operator) {
            Ok(InputOutcome::Won(win)) => Ok(InputOutcome::Won(win)),
            Ok(outcome) => {
                out_events.push(round.expression_event());
                Ok(outcome)
            }
            Err(_) => Err(InputRejection::OperatorNotAllowed),
        }
    });
    settle_input(world, outcome, out_events);
}

fn settle_input(
    world: &mut World,
    outcome: Result<InputOutcome, InputRejection>,
    out_events: &mut Vec<Event>,
) {
    match outcome {
        Ok(InputOutcome::Won(win)) => world.resolve_win(win, out_events),
        Ok(InputOutcome::Pending { .. }) => {}
        Ok(InputOutcome::Locked) => reject(InputRejection::RoundResolved, out_events),
        Err(reason) => reject(reason, out_events),
    }
}

fn submit(world: &mut World, out_events: &mut Vec<Event>) {
    let result = match world.active_round() {
        Ok(round) => round.engine.submit(),
        Err(reason) => {
            reject(reason, out_events);
            return;
        }
    };

    match result {
        Ok(win) => world.resolve_win(win, out_events),
        Err(SubmitError::Empty) => {}
        Err(SubmitError::Malformed) => world.record_failure(AttemptFailure::Malformed, out_events),
        Err(SubmitError::Undefined(_)) => {
            world.record_failure(AttemptFailure::Undefined, out_events);
        }
        Err(SubmitError::WrongAnswer { result }) => {
            world.record_failure(AttemptFailure::WrongAnswer { result }, out_events);
        }
        Err(SubmitError::Locked) => reject(InputRejection::RoundResolved, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use num_craze_core::{
        Difficulty, Digit, Level, LevelSpec, PlayerProfile, RoundId, Screen, SessionId, Token,
    };

    use super::{Round, RoundPhase, World};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Screen currently shown.
    #[must_use]
    pub fn screen(world: &World) -> Screen {
        world.screen
    }

    /// Profile as the world currently sees it.
    #[must_use]
    pub fn profile(world: &World) -> &PlayerProfile {
        &world.profile
    }

    /// Level being played.
    #[must_use]
    pub fn level(world: &World) -> Level {
        world.profile.current_level
    }

    /// Difficulty of the run.
    #[must_use]
    pub fn difficulty(world: &World) -> Difficulty {
        world.profile.difficulty
    }

    /// Identifier under which the current run is recorded.
    #[must_use]
    pub fn run_session(world: &World) -> SessionId {
        world.session.for_run(world.run)
    }

    /// Combo streak carried into the next win.
    #[must_use]
    pub fn streak(world: &World) -> u32 {
        world
            .round
            .as_ref()
            .map_or(world.streak, |round| round.engine.streak())
    }

    /// Reports whether the round countdown is ticking.
    #[must_use]
    pub fn countdown_running(world: &World) -> bool {
        world.countdown.is_some()
    }

    /// Time left before the pending delayed transition fires, if one is armed.
    #[must_use]
    pub fn pending_delay(world: &World) -> Option<Duration> {
        world.pending.as_ref().map(|pending| pending.remaining())
    }

    /// Captures a read-only view of the round, once its parameters arrived.
    #[must_use]
    pub fn round(world: &World) -> Option<RoundView<'_>> {
        world.round.as_ref().map(|round| RoundView { round })
    }

    /// Read-only view of the round being played.
    #[derive(Clone, Copy, Debug)]
    pub struct RoundView<'a> {
        round: &'a Round,
    }

    impl<'a> RoundView<'a> {
        /// Identifier of the round.
        #[must_use]
        pub fn id(&self) -> RoundId {
            self.round.id
        }

        /// Time limit and target range in effect.
        #[must_use]
        pub fn spec(&self) -> LevelSpec {
            self.round.spec
        }

        /// Number the player must reach.
        #[must_use]
        pub fn target(&self) -> i64 {
            self.round.engine.target()
        }

        /// Digits available on the board.
        #[must_use]
        pub fn digits(&self) -> &'a [Digit] {
            &self.round.digits
        }

        /// Whole seconds left on the countdown.
        #[must_use]
        pub fn time_remaining(&self) -> u32 {
            self.round.time_remaining
        }

        /// Tokens typed so far.
        #[must_use]
        pub fn tokens(&self) -> &'a [Token] {
            self.round.engine.expression().tokens()
        }

        /// Expression typed so far, rendered with board symbols.
        #[must_use]
        pub fn expression_text(&self) -> String {
            self.round.engine.expression().to_string()
        }

        /// Value of the completed expression, if defined.
        #[must_use]
        pub fn live_result(&self) -> Option<f64> {
            self.round.engine.live_result()
        }

        /// Lifecycle phase of the round.
        #[must_use]
        pub fn phase(&self) -> RoundPhase {
            self.round.phase
        }
    }
}
