use std::time::Duration;

use num_craze_core::{
    AttemptFailure, Command, Difficulty, Digit, Encouragement, Event, InputRejection, Level,
    LossCause, Operator, PlayerProfile, RoundId, Screen, SessionId, SetupRejection,
};
use num_craze_system_level_table::level_spec_for;
use num_craze_world::{self as world, query, RoundPhase, World};

fn level(value: u32) -> Level {
    Level::new(value).expect("non-zero level")
}

fn digit(value: u8) -> Digit {
    Digit::new(value).expect("digit between one and nine")
}

fn profile(current_level: Level, is_first_run: bool) -> PlayerProfile {
    PlayerProfile {
        username: "ana".to_owned(),
        current_level,
        is_first_run,
        difficulty: Difficulty::Normal,
    }
}

fn run(world: &mut World, command: Command) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, command, &mut events);
    events
}

fn tick(world: &mut World, millis: u64) -> Vec<Event> {
    run(
        world,
        Command::Tick {
            dt: Duration::from_millis(millis),
        },
    )
}

fn press(world: &mut World, digit_value: u8) -> Vec<Event> {
    run(
        world,
        Command::PressDigit {
            digit: digit(digit_value),
        },
    )
}

fn operator(world: &mut World, operator: Operator) -> Vec<Event> {
    run(world, Command::PressOperator { operator })
}

fn begin(world: &mut World, round: u32, at: Level, target: i64, digits: &[u8]) -> Vec<Event> {
    run(
        world,
        Command::BeginRound {
            round: RoundId::new(round),
            spec: level_spec_for(at, Difficulty::Normal),
            target,
            digits: digits.iter().map(|value| digit(*value)).collect(),
        },
    )
}

/// A returning player at `at` whose first round (target 20) is initialised.
fn playing_round(at: Level) -> World {
    let mut world = World::new(profile(at, false), SessionId::new("s"));
    let _ = tick(&mut world, 0);
    let _ = begin(&mut world, 1, at, 20, &[2, 3, 4, 5, 6]);
    world
}

fn solve_twenty(world: &mut World) -> Vec<Event> {
    let mut events = Vec::new();
    events.extend(press(world, 2));
    events.extend(operator(world, Operator::Add));
    events.extend(press(world, 3));
    events.extend(operator(world, Operator::Multiply));
    events.extend(press(world, 4));
    events
}

fn count(events: &[Event], predicate: impl Fn(&Event) -> bool) -> usize {
    events.iter().filter(|event| predicate(event)).count()
}

#[test]
fn first_run_starts_from_instructions() {
    let mut world = World::new(profile(Level::FIRST, true), SessionId::new("s"));
    assert_eq!(query::screen(&world), Screen::Instructions);

    let events = run(&mut world, Command::StartGame);

    assert_eq!(
        events,
        vec![
            Event::GameStarted,
            Event::ProfileChanged {
                profile: profile(Level::FIRST, false),
            },
            Event::ScreenChanged {
                screen: Screen::Playing,
            },
            Event::RoundRequested {
                round: RoundId::new(1),
                level: Level::FIRST,
                difficulty: Difficulty::Normal,
            },
        ]
    );
    assert!(!query::profile(&world).is_first_run);
}

#[test]
fn start_game_outside_instructions_is_rejected() {
    let mut world = World::new(profile(Level::FIRST, false), SessionId::new("s"));

    let events = run(&mut world, Command::StartGame);

    assert_eq!(
        events,
        vec![Event::InputRejected {
            reason: InputRejection::InvalidTransition,
        }]
    );
}

#[test]
fn countdown_waits_for_round_readiness() {
    let mut world = playing_round(Level::FIRST);
    let round = query::round(&world).expect("round initialised");
    assert_eq!(round.phase(), RoundPhase::Preparing);
    assert_eq!(round.time_remaining(), 120);
    assert!(!query::countdown_running(&world));

    assert!(tick(&mut world, 100).is_empty());
    assert!(!query::countdown_running(&world));

    let events = tick(&mut world, 50);
    assert_eq!(
        events,
        vec![Event::CountdownStarted {
            round: RoundId::new(1),
            seconds: 120,
        }]
    );
    assert!(query::countdown_running(&world));
}

#[test]
fn expired_countdown_loses_exactly_once() {
    let mut world = playing_round(Level::FIRST);

    let events = tick(&mut world, 200_000);

    assert_eq!(
        count(&events, |event| matches!(event, Event::CountdownTicked { .. })),
        120,
        "one tick per elapsed second"
    );
    assert_eq!(
        count(&events, |event| matches!(
            event,
            Event::RoundLost {
                cause: LossCause::TimeExpired,
                ..
            }
        )),
        1
    );
    assert!(events.contains(&Event::RunEnded {
        session: SessionId::new("s#0"),
        username: "ana".to_owned(),
        level: Level::FIRST,
        mastered: false,
    }));
    assert_eq!(query::screen(&world), Screen::Leaderboard);
    assert!(!query::countdown_running(&world));

    assert!(tick(&mut world, 60_000).is_empty(), "no timer survives the loss");
}

#[test]
fn completing_digit_wins_and_advances_level() {
    let mut world = playing_round(Level::FIRST);
    let _ = tick(&mut world, 150);

    let events = solve_twenty(&mut world);
    assert_eq!(
        events.last(),
        Some(&Event::RoundWon {
            round: RoundId::new(1),
            level: Level::FIRST,
            result: 20.0,
            streak: 1,
            encouragement: Encouragement::None,
        })
    );
    assert!(!query::countdown_running(&world), "win stops the countdown");
    assert_eq!(
        query::round(&world).map(|round| round.phase()),
        Some(RoundPhase::Won)
    );

    assert_eq!(
        tick(&mut world, 1_000),
        vec![Event::ScreenChanged {
            screen: Screen::LevelComplete,
        }]
    );

    let events = tick(&mut world, 500);
    assert_eq!(
        events,
        vec![
            Event::ProfileChanged {
                profile: profile(level(2), false),
            },
            Event::ScreenChanged {
                screen: Screen::Playing,
            },
            Event::RoundRequested {
                round: RoundId::new(2),
                level: level(2),
                difficulty: Difficulty::Normal,
            },
        ]
    );
    assert_eq!(query::level(&world), level(2));
    assert_eq!(query::streak(&world), 1);
}

#[test]
fn win_is_not_followed_by_a_loss() {
    let mut world = playing_round(Level::FIRST);
    let _ = tick(&mut world, 150);
    let _ = tick(&mut world, 119_500);
    let _ = solve_twenty(&mut world);

    let events = tick(&mut world, 999);
    assert!(
        !events
            .iter()
            .any(|event| matches!(event, Event::RoundLost { .. })),
        "countdown kept running after the win: {events:?}"
    );
}

#[test]
fn final_level_goes_straight_to_leaderboard() {
    let top = level(999);
    let mut world = World::new(profile(top, false), SessionId::new("s"));
    let _ = tick(&mut world, 0);
    let _ = begin(&mut world, 1, top, 59_049, &[5, 6, 7, 8, 9]);

    for step in 0..5 {
        let _ = press(&mut world, 9);
        if step < 4 {
            let _ = operator(&mut world, Operator::Multiply);
        }
    }
    let events = tick(&mut world, 5_000);

    assert!(!events.contains(&Event::ScreenChanged {
        screen: Screen::LevelComplete,
    }));
    assert_eq!(
        events,
        vec![
            Event::ScreenChanged {
                screen: Screen::Leaderboard,
            },
            Event::RunEnded {
                session: SessionId::new("s#0"),
                username: "ana".to_owned(),
                level: top,
                mastered: true,
            },
        ]
    );
    assert_eq!(query::level(&world), top, "level never exceeds the maximum");
}

#[test]
fn giving_up_before_parameters_arrive_ends_the_run() {
    let mut world = World::new(profile(level(4), false), SessionId::new("s"));
    let _ = tick(&mut world, 0);

    let events = run(&mut world, Command::GiveUp);

    assert_eq!(
        events.first(),
        Some(&Event::RoundLost {
            round: RoundId::new(1),
            level: level(4),
            cause: LossCause::GaveUp,
        })
    );
    assert_eq!(query::screen(&world), Screen::Leaderboard);
    assert!(tick(&mut world, 10_000).is_empty(), "retry was cancelled");

    let late = begin(&mut world, 1, level(4), 30, &[1, 2, 3, 4, 5]);
    assert!(late.is_empty(), "parameters for an abandoned round are ignored");
}

#[test]
fn giving_up_before_the_first_tick_still_loses_a_round() {
    let mut world = World::new(profile(level(4), false), SessionId::new("s"));

    let events = run(&mut world, Command::GiveUp);

    assert_eq!(
        events.first(),
        Some(&Event::RoundLost {
            round: RoundId::new(1),
            level: level(4),
            cause: LossCause::GaveUp,
        })
    );
    assert_eq!(
        count(&events, |event| matches!(event, Event::RunEnded { .. })),
        1
    );
    assert_eq!(query::screen(&world), Screen::Leaderboard);

    let retry = run(&mut world, Command::PlayAgain);
    assert!(
        retry.iter().any(|event| matches!(
            event,
            Event::RoundRequested { round, .. } if *round == RoundId::new(2)
        )),
        "the lost round id is not handed out again: {retry:?}"
    );
}

#[test]
fn play_again_restarts_from_level_one_under_a_new_run() {
    let mut world = playing_round(level(7));
    let _ = run(&mut world, Command::GiveUp);

    let events = run(&mut world, Command::PlayAgain);
    assert_eq!(
        events.first(),
        Some(&Event::ProfileChanged {
            profile: profile(Level::FIRST, false),
        })
    );
    assert_eq!(query::screen(&world), Screen::Playing);
    assert_eq!(query::run_session(&world), SessionId::new("s#1"));

    let events = run(&mut world, Command::GiveUp);
    assert!(events.contains(&Event::RunEnded {
        session: SessionId::new("s#1"),
        username: "ana".to_owned(),
        level: Level::FIRST,
        mastered: false,
    }));
}

#[test]
fn new_player_exits_only_from_leaderboard() {
    let mut world = playing_round(Level::FIRST);
    assert_eq!(
        run(&mut world, Command::NewPlayer),
        vec![Event::InputRejected {
            reason: InputRejection::InvalidTransition,
        }]
    );

    let _ = run(&mut world, Command::GiveUp);
    let events = run(&mut world, Command::NewPlayer);

    assert_eq!(
        events,
        vec![
            Event::ScreenChanged {
                screen: Screen::Exited,
            },
            Event::SessionExited,
        ]
    );
}

#[test]
fn dispose_cancels_pending_work() {
    let mut world = playing_round(Level::FIRST);
    let _ = tick(&mut world, 150);
    assert!(query::countdown_running(&world));

    let events = run(&mut world, Command::Dispose);

    assert_eq!(events.last(), Some(&Event::SessionExited));
    assert!(!query::countdown_running(&world));
    assert_eq!(query::pending_delay(&world), None);
    assert!(tick(&mut world, 500_000).is_empty());
    assert!(run(&mut world, Command::Dispose).is_empty(), "dispose is idempotent");
}

#[test]
fn mismatched_parameters_are_refused() {
    let mut world = World::new(profile(level(3), false), SessionId::new("s"));
    let _ = tick(&mut world, 0);

    let events = begin(&mut world, 1, level(12), 60, &[1, 2, 3, 4, 5]);
    assert_eq!(
        events,
        vec![Event::RoundSetupRejected {
            round: RoundId::new(1),
            reason: SetupRejection::LevelMismatch,
        }]
    );

    let events = begin(&mut world, 1, level(3), 500, &[1, 2, 3, 4, 5]);
    assert_eq!(
        events,
        vec![Event::RoundSetupRejected {
            round: RoundId::new(1),
            reason: SetupRejection::TargetOutOfRange,
        }]
    );
    assert!(query::round(&world).is_none());

    let retry = tick(&mut world, 500);
    assert_eq!(
        retry,
        vec![Event::RoundRequested {
            round: RoundId::new(1),
            level: level(3),
            difficulty: Difficulty::Normal,
        }]
    );
}

#[test]
fn digits_outside_the_pool_are_refused() {
    let mut world = playing_round(Level::FIRST);

    let events = press(&mut world, 9);

    assert_eq!(
        events,
        vec![Event::InputRejected {
            reason: InputRejection::DigitUnavailable,
        }]
    );
    assert!(query::round(&world)
        .expect("round initialised")
        .tokens()
        .is_empty());
}

#[test]
fn operator_needs_a_preceding_digit() {
    let mut world = playing_round(Level::FIRST);

    assert_eq!(
        operator(&mut world, Operator::Divide),
        vec![Event::InputRejected {
            reason: InputRejection::OperatorNotAllowed,
        }]
    );
}

#[test]
fn wrong_submission_breaks_the_streak() {
    let mut world = playing_round(Level::FIRST);
    let _ = press(&mut world, 5);
    let _ = operator(&mut world, Operator::Add);
    let _ = press(&mut world, 6);

    let events = run(&mut world, Command::Submit);

    assert_eq!(
        events,
        vec![Event::AttemptFailed {
            failure: AttemptFailure::WrongAnswer { result: 11.0 },
        }]
    );
    assert_eq!(query::streak(&world), 0);
    assert_eq!(
        query::round(&world).map(|round| round.expression_text()),
        Some("5+6".to_owned()),
        "failed submission keeps the expression"
    );
}

#[test]
fn empty_submission_is_silent() {
    let mut world = playing_round(Level::FIRST);
    assert!(run(&mut world, Command::Submit).is_empty());
}

#[test]
fn clear_resets_the_expression() {
    let mut world = playing_round(Level::FIRST);
    let _ = press(&mut world, 5);
    let _ = operator(&mut world, Operator::Subtract);

    let events = run(&mut world, Command::ClearExpression);

    assert_eq!(
        events,
        vec![Event::ExpressionUpdated {
            tokens: Vec::new(),
            live_result: None,
        }]
    );
}

#[test]
fn input_after_a_win_is_refused() {
    let mut world = playing_round(Level::FIRST);
    let _ = solve_twenty(&mut world);

    assert_eq!(
        press(&mut world, 2),
        vec![Event::InputRejected {
            reason: InputRejection::RoundResolved,
        }]
    );
    assert_eq!(
        run(&mut world, Command::GiveUp),
        vec![Event::InputRejected {
            reason: InputRejection::RoundResolved,
        }]
    );
}
