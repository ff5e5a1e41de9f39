mod support;

use std::time::Duration;

use mystery_core::config::{DEFAULT_CONFIG, MAX_TIME_POWER_ON};
use mystery_core::session::{LatchPosition, SessionEnd};
use mystery_core::unlock::SessionOutcome;

use support::{Hw, MemoryStore, Rig, clock_fix, north_of_target, unlocked_clock};

#[test]
fn day_before_unlock_resets_budget_and_ends_session() {
    let schedule = DEFAULT_CONFIG.schedule;
    let fix = clock_fix(schedule.year, schedule.month, schedule.day - 1, 12);
    let mut rig = Rig::new(DEFAULT_CONFIG, [fix], MemoryStore::with_attempts(1));

    let report = rig.run(false);

    assert_eq!(report.ended_by, SessionEnd::Terminal);
    assert_eq!(report.last_outcome, Some(SessionOutcome::TooEarlyDay));
    assert_eq!(report.evaluations, 1);
    assert_eq!(
        rig.store().attempts(),
        Some(i32::from(DEFAULT_CONFIG.max_attempts))
    );
    assert_eq!(rig.scrolled(), vec!["Not yet today, try again tomorrow!"]);
}

#[test]
fn unlock_day_before_hour_plays_cue_three_times_without_touching_budget() {
    let schedule = DEFAULT_CONFIG.schedule;
    let fix = clock_fix(schedule.year, schedule.month, schedule.day, schedule.hour - 1);
    let mut rig = Rig::new(DEFAULT_CONFIG, [fix], MemoryStore::with_attempts(4));

    let report = rig.run(false);

    assert_eq!(report.last_outcome, Some(SessionOutcome::TooEarlyHour));
    assert_eq!(report.ended_by, SessionEnd::Terminal);
    assert_eq!(rig.scrolled(), vec!["Today is the day, take me with you!"]);
    // Greeting has four pitches, the positive cue two, played three times.
    assert_eq!(rig.tones(), 4 + 2 * 3);
    assert_eq!(rig.store().writes, 0);
    assert_eq!(rig.store().attempts(), Some(4));
}

#[test]
fn missing_location_keeps_polling_until_timeout() {
    let mut rig = Rig::new(DEFAULT_CONFIG, [unlocked_clock()], MemoryStore::with_attempts(3));

    let report = rig.run(false);

    assert_eq!(report.ended_by, SessionEnd::Timeout);
    assert_eq!(report.last_outcome, Some(SessionOutcome::AwaitingLocation));
    assert!(report.evaluations > 1);
    assert!(rig.clock.elapsed() >= MAX_TIME_POWER_ON);
    assert!(rig.clock.elapsed() < MAX_TIME_POWER_ON + Duration::from_secs(2));
    assert_eq!(rig.store().writes, 0);
    assert_eq!(rig.journal.borrow().last(), Some(&Hw::PowerCut));
}

#[test]
fn location_arriving_late_is_still_evaluated() {
    let far = north_of_target(unlocked_clock(), 500.0);
    let mut rig = Rig::new(
        DEFAULT_CONFIG,
        [unlocked_clock(), unlocked_clock(), far],
        MemoryStore::with_attempts(3),
    );

    let report = rig.run(false);

    assert_eq!(report.evaluations, 3);
    assert_eq!(
        report.last_outcome,
        Some(SessionOutcome::OutOfRangeAttemptConsumed)
    );
}

#[test]
fn out_of_range_reading_consumes_one_attempt() {
    let fix = north_of_target(unlocked_clock(), 500.0);
    let mut rig = Rig::new(DEFAULT_CONFIG, [fix], MemoryStore::with_attempts(3));

    let report = rig.run(false);

    assert_eq!(
        report.last_outcome,
        Some(SessionOutcome::OutOfRangeAttemptConsumed)
    );
    assert_eq!(report.attempts_left, Some(2));
    assert_eq!(rig.store().attempts(), Some(2));
    assert_eq!(
        rig.scrolled(),
        vec!["The distance to the target is 500 meters!", "2 attempts left."]
    );
    let distance = report.last_distance_m.expect("distance computed");
    assert!((distance - 500.0).abs() < 0.5);
}

#[test]
fn in_range_reading_counts_down_opens_and_celebrates() {
    let fix = north_of_target(unlocked_clock(), 5.0);
    let mut rig = Rig::new(DEFAULT_CONFIG, [fix], MemoryStore::with_attempts(3));

    let report = rig.run(false);

    assert_eq!(report.last_outcome, Some(SessionOutcome::InRangeAndOpened));
    assert_eq!(
        rig.visible(),
        vec![
            Hw::Static("3".to_owned()),
            Hw::Static("2".to_owned()),
            Hw::Static("1".to_owned()),
            Hw::Latch(LatchPosition::Open),
            Hw::PowerCut,
        ]
    );
    // Greeting plus the fourteen pitches of the celebration.
    assert_eq!(rig.tones(), 4 + 14);
    assert_eq!(rig.store().attempts(), Some(3));
}

#[test]
fn exhausted_budget_skips_distance_and_decrement() {
    let fix = north_of_target(unlocked_clock(), 500.0);
    let mut rig = Rig::new(DEFAULT_CONFIG, [fix], MemoryStore::with_attempts(0));

    let report = rig.run(false);

    assert_eq!(report.last_outcome, Some(SessionOutcome::NoAttemptsLeft));
    assert_eq!(report.last_distance_m, None);
    assert_eq!(rig.store().writes, 0);
    assert_eq!(rig.store().attempts(), Some(0));
    assert_eq!(rig.scrolled(), vec!["No attempts left, ask for help!"]);
}
