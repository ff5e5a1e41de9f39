//! Unlock decision state machine.
//!
//! [`UnlockStateMachine::evaluate`] turns one [`PositionFix`] into exactly one
//! [`SessionOutcome`] plus the effects the session driver has to apply. Gates
//! are checked in a fixed order so the holder learns nothing about the target
//! before the unlock date and hour have passed, and no attempt is spent
//! without a location:
//!
//! 1. clock plausibility
//! 2. unlock day
//! 3. unlock hour
//! 4. location validity
//! 5. remaining attempts
//! 6. distance against the unlock radius
//!
//! Budget mutations happen here, against the injected [`KeyValueStore`]; all
//! presentation and actuation is returned as [`Effect`] values.

use heapless::Vec;

use crate::budget::{AttemptBudget, BudgetError, KeyValueStore};
use crate::config::{BoxConfig, GeoTarget, RetryPolicy, UnlockSchedule};
use crate::fix::PositionFix;
use crate::geo;
use crate::message::Message;
use crate::tunes::MelodyKind;
use crate::tunes::cue::POSITIVE_CUE_REPEATS;

/// Largest number of effects a single evaluation produces.
pub const MAX_EFFECTS: usize = 4;

/// Bounded effect list returned with every evaluation.
pub type EffectList = Vec<Effect, MAX_EFFECTS>;

/// Result category of one evaluation cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionOutcome {
    AwaitingFix,
    TooEarlyDay,
    TooEarlyHour,
    AwaitingLocation,
    InRangeAndOpened,
    OutOfRangeAttemptConsumed,
    NoAttemptsLeft,
}

impl SessionOutcome {
    /// Returns `true` when the session loop should stop after this outcome.
    #[must_use]
    pub const fn is_terminal(self, policy: RetryPolicy) -> bool {
        match self {
            SessionOutcome::AwaitingFix | SessionOutcome::AwaitingLocation => false,
            SessionOutcome::TooEarlyDay
            | SessionOutcome::TooEarlyHour
            | SessionOutcome::InRangeAndOpened
            | SessionOutcome::NoAttemptsLeft => true,
            SessionOutcome::OutOfRangeAttemptConsumed => {
                matches!(policy, RetryPolicy::SingleCheck)
            }
        }
    }

    /// Short label used in logs and transcripts.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            SessionOutcome::AwaitingFix => "awaiting-fix",
            SessionOutcome::TooEarlyDay => "too-early-day",
            SessionOutcome::TooEarlyHour => "too-early-hour",
            SessionOutcome::AwaitingLocation => "awaiting-location",
            SessionOutcome::InRangeAndOpened => "in-range-opened",
            SessionOutcome::OutOfRangeAttemptConsumed => "out-of-range",
            SessionOutcome::NoAttemptsLeft => "no-attempts-left",
        }
    }
}

/// Side effect requested by an evaluation, applied in list order.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Effect {
    /// Scroll a message across the display.
    Show(Message),
    /// Count down from `from` to 1 on the display.
    Countdown { from: u8 },
    /// Drive the latch open.
    OpenLatch,
    /// Play a melody `repeats` times.
    PlayMelody { melody: MelodyKind, repeats: u8 },
}

/// What an evaluation did to the persisted budget.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BudgetChange {
    Untouched,
    Reset { attempts_left: u16 },
    Consumed { attempts_left: u16 },
}

/// Outcome and effects of one evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    pub outcome: SessionOutcome,
    pub effects: EffectList,
    pub budget: BudgetChange,
    /// Distance to the target, only set when it was computed.
    pub distance_m: Option<f64>,
}

impl Evaluation {
    fn new(outcome: SessionOutcome, effects: &[Effect]) -> Self {
        let mut list = EffectList::new();
        for effect in effects {
            if list.push(*effect).is_err() {
                break;
            }
        }
        Self {
            outcome,
            effects: list,
            budget: BudgetChange::Untouched,
            distance_m: None,
        }
    }

    fn with_budget(mut self, budget: BudgetChange) -> Self {
        self.budget = budget;
        self
    }

    fn with_distance(mut self, distance_m: f64) -> Self {
        self.distance_m = Some(distance_m);
        self
    }

    /// Returns `true` when the session should stop under `policy`.
    #[must_use]
    pub fn is_terminal(&self, policy: RetryPolicy) -> bool {
        self.outcome.is_terminal(policy)
    }
}

/// Stateless decision logic bound to one box configuration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UnlockStateMachine {
    target: GeoTarget,
    schedule: UnlockSchedule,
    budget: AttemptBudget,
    countdown_from: u8,
}

impl UnlockStateMachine {
    #[must_use]
    pub const fn new(config: &BoxConfig) -> Self {
        Self {
            target: config.target,
            schedule: config.schedule,
            budget: AttemptBudget::new(config.max_attempts),
            countdown_from: config.countdown_from,
        }
    }

    /// Budget helper bound to the configured maximum.
    #[must_use]
    pub const fn budget(&self) -> &AttemptBudget {
        &self.budget
    }

    /// Evaluates `fix` and applies any budget change to `store`.
    pub fn evaluate<S>(
        &self,
        fix: &PositionFix,
        store: &mut S,
    ) -> Result<Evaluation, BudgetError<S::Error>>
    where
        S: KeyValueStore,
    {
        if !fix.has_plausible_clock() {
            return Ok(Evaluation::new(
                SessionOutcome::AwaitingFix,
                &[Effect::Show(Message::TakeOutside)],
            ));
        }

        if fix.day_key() < self.schedule.day_key() {
            // Every pre-unlock day re-arms the full budget.
            let attempts_left = self.budget.reset(store)?;
            return Ok(Evaluation::new(
                SessionOutcome::TooEarlyDay,
                &[Effect::Show(Message::TryTomorrow)],
            )
            .with_budget(BudgetChange::Reset { attempts_left }));
        }

        if fix.day_hour_key() < self.schedule.day_hour_key() {
            return Ok(Evaluation::new(
                SessionOutcome::TooEarlyHour,
                &[
                    Effect::Show(Message::TodayIsTheDay),
                    Effect::PlayMelody {
                        melody: MelodyKind::PositiveCue,
                        repeats: POSITIVE_CUE_REPEATS,
                    },
                ],
            ));
        }

        if !fix.has_location() {
            return Ok(Evaluation::new(
                SessionOutcome::AwaitingLocation,
                &[Effect::Show(Message::TakeOutside)],
            ));
        }

        if self.budget.get(store)? == 0 {
            return Ok(Evaluation::new(
                SessionOutcome::NoAttemptsLeft,
                &[Effect::Show(Message::NoAttemptsLeft)],
            ));
        }

        let distance = geo::distance_m(
            fix.lat,
            fix.lon,
            self.target.latitude,
            self.target.longitude,
        );

        if distance > self.target.radius_m {
            let attempts_left = self.budget.consume(store)?;
            return Ok(Evaluation::new(
                SessionOutcome::OutOfRangeAttemptConsumed,
                &[
                    Effect::Show(Message::Distance {
                        meters: whole_meters(distance),
                    }),
                    Effect::Show(Message::AttemptsLeft {
                        count: attempts_left,
                    }),
                ],
            )
            .with_budget(BudgetChange::Consumed { attempts_left })
            .with_distance(distance));
        }

        Ok(Evaluation::new(
            SessionOutcome::InRangeAndOpened,
            &[
                Effect::Countdown {
                    from: self.countdown_from,
                },
                Effect::OpenLatch,
                Effect::PlayMelody {
                    melody: MelodyKind::Celebration,
                    repeats: 1,
                },
            ],
        )
        .with_distance(distance))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_meters(distance: f64) -> u32 {
    // Float-to-int casts saturate, so absurd distances pin at u32::MAX.
    libm::round(distance) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CONFIG;

    struct OneSlot(Option<i32>);

    impl KeyValueStore for OneSlot {
        type Error = ();

        fn get_int(&mut self, _: &str, default: i32) -> Result<i32, ()> {
            Ok(self.0.unwrap_or(default))
        }

        fn put_int(&mut self, _: &str, value: i32) -> Result<(), ()> {
            self.0 = Some(value);
            Ok(())
        }
    }

    #[test]
    fn terminality_follows_retry_policy() {
        let out_of_range = SessionOutcome::OutOfRangeAttemptConsumed;
        assert!(out_of_range.is_terminal(RetryPolicy::SingleCheck));
        assert!(!out_of_range.is_terminal(RetryPolicy::UntilTimeout));
        assert!(!SessionOutcome::AwaitingFix.is_terminal(RetryPolicy::SingleCheck));
        assert!(!SessionOutcome::AwaitingLocation.is_terminal(RetryPolicy::SingleCheck));
        assert!(SessionOutcome::NoAttemptsLeft.is_terminal(RetryPolicy::UntilTimeout));
    }

    #[test]
    fn unlock_hour_boundary_is_inclusive() {
        let machine = UnlockStateMachine::new(&DEFAULT_CONFIG);
        let schedule = DEFAULT_CONFIG.schedule;
        let mut fix = PositionFix {
            date_valid: true,
            time_valid: true,
            year: schedule.year,
            month: schedule.month,
            day: schedule.day,
            hour: schedule.hour - 1,
            ..PositionFix::empty()
        };
        let mut store = OneSlot(None);

        let before = machine.evaluate(&fix, &mut store).expect("evaluate");
        assert_eq!(before.outcome, SessionOutcome::TooEarlyHour);

        fix.hour = schedule.hour;
        let at = machine.evaluate(&fix, &mut store).expect("evaluate");
        assert_eq!(at.outcome, SessionOutcome::AwaitingLocation);
        assert_eq!(store.0, None);
    }

    #[test]
    fn fix_exactly_on_the_radius_opens() {
        let schedule = DEFAULT_CONFIG.schedule;
        let target = DEFAULT_CONFIG.target;
        let fix = PositionFix {
            location_valid: true,
            lat: target.latitude + 0.000_3,
            lon: target.longitude,
            date_valid: true,
            time_valid: true,
            year: schedule.year,
            month: schedule.month,
            day: schedule.day,
            hour: schedule.hour,
            ..PositionFix::empty()
        };
        let distance =
            crate::geo::distance_m(fix.lat, fix.lon, target.latitude, target.longitude);
        let with_radius = |radius_m: f64| {
            let target = crate::config::GeoTarget::new(target.latitude, target.longitude, radius_m);
            UnlockStateMachine::new(&crate::config::BoxConfig::new(target, schedule))
        };

        let mut store = OneSlot(Some(3));
        let on_edge = with_radius(distance)
            .evaluate(&fix, &mut store)
            .expect("evaluate");
        assert_eq!(on_edge.outcome, SessionOutcome::InRangeAndOpened);
        assert_eq!(on_edge.budget, BudgetChange::Untouched);
        assert_eq!(store.0, Some(3));

        let one_ulp_smaller = f64::from_bits(distance.to_bits() - 1);
        let beyond = with_radius(one_ulp_smaller)
            .evaluate(&fix, &mut store)
            .expect("evaluate");
        assert_eq!(beyond.outcome, SessionOutcome::OutOfRangeAttemptConsumed);
        assert_eq!(store.0, Some(2));
    }

    #[test]
    fn whole_meters_rounds_to_nearest() {
        assert_eq!(whole_meters(499.4), 499);
        assert_eq!(whole_meters(499.6), 500);
        assert_eq!(whole_meters(f64::MAX), u32::MAX);
    }
}
